
use chrono::{Datelike, Local, NaiveDate};

use crate::models::{parse_publication_date, Article};

const KEY_PREFIX_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CitationFormat {
    Apa,
    Mla,
    Bibtex,
}

impl CitationFormat {
    pub const ALL: [CitationFormat; 3] = [CitationFormat::Apa, CitationFormat::Mla, CitationFormat::Bibtex];

    pub fn label(&self) -> &'static str {
        match self {
            CitationFormat::Apa => "APA",
            CitationFormat::Mla => "MLA",
            CitationFormat::Bibtex => "BibTeX",
        }
    }

    pub fn next(self) -> Self {
        match self {
            CitationFormat::Apa => CitationFormat::Mla,
            CitationFormat::Mla => CitationFormat::Bibtex,
            CitationFormat::Bibtex => CitationFormat::Apa,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitationData {
    pub title: String,
    pub authors: Vec<String>,
    pub journal: Option<String>,
    /// Explicit year; wins over `publication_date`
    pub year: Option<i32>,
    pub publication_date: Option<String>,
    pub url: String,
    pub doi: Option<String>,
}

impl From<&Article> for CitationData {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            authors: article
                .author
                .iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
            journal: article.journal_name.clone(),
            year: None,
            publication_date: article.publication_date.clone(),
            url: article.link.clone(),
            doi: None,
        }
    }
}

/// Explicit year, else the publication date's year, else the year of `today`.
pub fn resolve_year(data: &CitationData, today: NaiveDate) -> i32 {
    data.year
        .or_else(|| {
            data.publication_date
                .as_deref()
                .and_then(parse_publication_date)
                .map(|d| d.year())
        })
        .unwrap_or_else(|| today.year())
}

/// Lowercased alphanumerics of the title, first 20 characters, then the year.
pub fn citation_key(title: &str, year: i32) -> String {
    let prefix: String = title
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(KEY_PREFIX_LEN)
        .collect();
    format!("{prefix}{year}")
}

pub fn format_citation(data: &CitationData, format: CitationFormat) -> String {
    format_citation_on(data, format, Local::now().date_naive())
}

/// Format against a fixed "today" (used for the year fallback and MLA access date).
pub fn format_citation_on(data: &CitationData, format: CitationFormat, today: NaiveDate) -> String {
    let year = resolve_year(data, today);
    let authors = data.authors.join(", ");
    let journal = data.journal.as_deref().filter(|j| !j.trim().is_empty());

    match format {
        CitationFormat::Apa => {
            let mut out = String::new();
            if !authors.is_empty() {
                out.push_str(&format!("{authors}. "));
            }
            out.push_str(&format!("({year}). {}.", data.title));
            if let Some(journal) = journal {
                out.push_str(&format!(" {journal}."));
            }
            out.push_str(&format!(" Retrieved from {}", data.url));
            out
        }
        CitationFormat::Mla => {
            let mut out = String::new();
            if !authors.is_empty() {
                out.push_str(&format!("{authors}. "));
            }
            out.push_str(&format!("\"{}.\"", data.title));
            if let Some(journal) = journal {
                out.push_str(&format!(" {journal},"));
            }
            out.push_str(&format!(" {year}. Web. {}.", today.format("%-m/%-d/%Y")));
            out
        }
        CitationFormat::Bibtex => {
            let author = if authors.is_empty() {
                "Unknown Author".to_string()
            } else {
                escape_bibtex(&authors)
            };
            let journal = journal
                .map(escape_bibtex)
                .unwrap_or_else(|| "Unknown Journal".to_string());

            let mut fields = vec![
                format!("  title={{{}}}", escape_bibtex(&data.title)),
                format!("  author={{{author}}}"),
                format!("  journal={{{journal}}}"),
                format!("  year={{{year}}}"),
                format!("  url={{{}}}", data.url),
            ];
            if let Some(doi) = data.doi.as_deref().filter(|d| !d.is_empty()) {
                fields.push(format!("  doi={{{doi}}}"));
            }

            format!(
                "@article{{{},\n{}\n}}",
                citation_key(&data.title, year),
                fields.join(",\n")
            )
        }
    }
}

/// Escape LaTeX special characters in free-text BibTeX fields.
///
/// URL and DOI fields are left verbatim; accented letters pass through as UTF-8.
fn escape_bibtex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' | '}' | '&' | '%' | '$' | '#' | '_' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> CitationData {
        CitationData {
            title: "A Study of X".to_string(),
            publication_date: Some("2023-05-01".to_string()),
            url: "http://x".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn bibtex_key_from_title_and_year() {
        let out = format_citation_on(&sample(), CitationFormat::Bibtex, day(2025, 1, 1));
        assert!(out.starts_with("@article{astudyofx2023,"), "{out}");
        assert_eq!(
            out,
            "@article{astudyofx2023,\n  title={A Study of X},\n  author={Unknown Author},\n  journal={Unknown Journal},\n  year={2023},\n  url={http://x}\n}"
        );
    }

    #[test]
    fn key_prefix_is_capped_at_twenty_chars() {
        assert_eq!(
            citation_key("CRISPR-Cas9: Genome Editing in Human Cells!", 2021),
            "crisprcas9genomeedit2021"
        );
    }

    #[test]
    fn key_drops_non_ascii_letters() {
        assert_eq!(citation_key("Über die Größe", 2020), "berdiegre2020");
        assert_eq!(citation_key("", 2020), "2020");
    }

    #[test]
    fn year_fallback_chain() {
        let today = day(2026, 10, 19);
        let mut data = sample();
        data.year = Some(1999);
        assert_eq!(resolve_year(&data, today), 1999);

        data.year = None;
        assert_eq!(resolve_year(&data, today), 2023);

        data.publication_date = None;
        assert_eq!(resolve_year(&data, today), 2026);

        data.publication_date = Some("not a date".to_string());
        assert_eq!(resolve_year(&data, today), 2026);
    }

    #[test]
    fn apa_omits_missing_optional_fields() {
        let bare = format_citation_on(&sample(), CitationFormat::Apa, day(2025, 1, 1));
        assert_eq!(bare, "(2023). A Study of X. Retrieved from http://x");

        let mut full = sample();
        full.authors = vec!["Doe, J.".to_string(), "Roe, R.".to_string()];
        full.journal = Some("Nature".to_string());
        let out = format_citation_on(&full, CitationFormat::Apa, day(2025, 1, 1));
        assert_eq!(
            out,
            "Doe, J., Roe, R.. (2023). A Study of X. Nature. Retrieved from http://x"
        );
    }

    #[test]
    fn mla_uses_access_date() {
        let mut data = sample();
        data.authors = vec!["Jane Doe".to_string()];
        data.journal = Some("Cell".to_string());
        let out = format_citation_on(&data, CitationFormat::Mla, day(2026, 3, 7));
        assert_eq!(out, "Jane Doe. \"A Study of X.\" Cell, 2023. Web. 3/7/2026.");
    }

    #[test]
    fn bibtex_escapes_special_characters_and_adds_doi() {
        let data = CitationData {
            title: "Cost & Benefit of 50% {Edge} Cases".to_string(),
            authors: vec!["R_Smith".to_string()],
            journal: Some("J. Econ #5".to_string()),
            year: Some(2020),
            url: "https://example.org/a_b%20c".to_string(),
            doi: Some("10.1000/xyz_1".to_string()),
            ..Default::default()
        };
        let out = format_citation_on(&data, CitationFormat::Bibtex, day(2025, 1, 1));
        assert!(out.contains("title={Cost \\& Benefit of 50\\% \\{Edge\\} Cases}"), "{out}");
        assert!(out.contains("author={R\\_Smith}"));
        assert!(out.contains("journal={J. Econ \\#5}"));
        assert!(out.contains("url={https://example.org/a_b%20c}"));
        assert!(out.ends_with("  doi={10.1000/xyz_1}\n}"));
        assert!(out.starts_with("@article{costbenefitof50edgec2020,"));
    }

    #[test]
    fn builds_from_article() {
        let mut article = crate::models::fixtures::article("a1", "Deep Sea Vents");
        article.author = Some("A. Author".to_string());
        article.journal_name = Some("Science".to_string());
        article.publication_date = Some("2022-11-02T00:00:00+00:00".to_string());

        let data = CitationData::from(&article);
        assert_eq!(data.authors, vec!["A. Author"]);
        assert_eq!(resolve_year(&data, day(2025, 1, 1)), 2022);
        assert_eq!(data.url, "https://journals.example.org/a1");
    }
}
