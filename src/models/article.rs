use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A row of the denormalized `articles_with_metadata` view.
///
/// Plain `articles` rows (collection and saved-article listings) only carry a
/// subset of these columns; the rest default to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub journal_name: Option<String>,
    #[serde(default)]
    pub ticker_symbol: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub level_1_discipline: Option<String>,
    #[serde(default)]
    pub level_2_field: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub category_color: Option<String>,
    #[serde(default)]
    pub category_description: Option<String>,
    #[serde(default)]
    pub combined_tags: Option<Vec<String>>,
    #[serde(default)]
    pub all_tags: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Article {
    /// Tags from both tag columns, first occurrence wins.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        for tag in self
            .combined_tags
            .iter()
            .chain(self.all_tags.iter())
            .flatten()
        {
            if !tags.contains(&tag.as_str()) {
                tags.push(tag.as_str());
            }
        }
        tags
    }

    /// Lowercased title, summary and tag text used for keyword matching.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.title.as_str()];
        if let Some(summary) = self.summary.as_deref() {
            parts.push(summary);
        }
        parts.extend(self.tags());
        parts.join(" ").to_lowercase()
    }

    pub fn published_on(&self) -> Option<NaiveDate> {
        self.publication_date
            .as_deref()
            .and_then(parse_publication_date)
    }
}

/// Parse the date part of a publication date column.
///
/// Accepts plain dates (`2023-05-01`), RFC 3339 timestamps and naive
/// timestamps with either a `T` or a space separator.
pub fn parse_publication_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.date());
        }
    }
    None
}

/// A bookmarked article with the time it was saved.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedArticle {
    pub article: Article,
    pub saved_at: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SavedArticleRow {
    pub created_at: String,
    pub articles: Option<Article>,
}

impl SavedArticleRow {
    /// Rows whose article was deleted upstream come back with a null embed.
    pub fn into_saved(self) -> Option<SavedArticle> {
        self.articles.map(|article| SavedArticle {
            article,
            saved_at: self.created_at,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Article;

    pub fn article(id: &str, title: &str) -> Article {
        Article {
            id: id.to_string(),
            title: title.to_string(),
            link: format!("https://journals.example.org/{id}"),
            summary: None,
            publication_date: None,
            author: None,
            journal_name: None,
            ticker_symbol: None,
            category_id: None,
            level_1_discipline: None,
            level_2_field: None,
            category_name: None,
            category_color: None,
            category_description: None,
            combined_tags: None,
            all_tags: None,
            created_at: None,
        }
    }
}
