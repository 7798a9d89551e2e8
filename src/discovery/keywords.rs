use crate::models::{Article, FeedPreferences, KeywordLogic};

/// Apply include/exclude keyword rules to a page that was already fetched.
///
/// This runs after remote pagination, so a page can come back shorter than
/// the page size even when more matching articles exist further on.
pub fn apply_keyword_rules(articles: Vec<Article>, prefs: &FeedPreferences) -> Vec<Article> {
    if !prefs.has_keyword_rules() {
        return articles;
    }
    let rules = KeywordRules::new(prefs);
    articles.into_iter().filter(|a| rules.keeps(a)).collect()
}

struct KeywordRules {
    include: Vec<String>,
    exclude: Vec<String>,
    logic: KeywordLogic,
}

impl KeywordRules {
    fn new(prefs: &FeedPreferences) -> Self {
        let normalize = |list: &[String]| {
            list.iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect::<Vec<_>>()
        };
        Self {
            include: normalize(&prefs.include_keywords),
            exclude: normalize(&prefs.exclude_keywords),
            logic: prefs.keyword_logic,
        }
    }

    fn keeps(&self, article: &Article) -> bool {
        let text = article.search_text();

        // Exclusion always wins, and any excluded term is enough.
        if self.exclude.iter().any(|k| text.contains(k.as_str())) {
            return false;
        }

        if self.include.is_empty() {
            return true;
        }

        match self.logic {
            KeywordLogic::Or => self.include.iter().any(|k| text.contains(k.as_str())),
            KeywordLogic::And => self.include.iter().all(|k| text.contains(k.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::article;

    fn prefs(include: &[&str], exclude: &[&str], logic: KeywordLogic) -> FeedPreferences {
        FeedPreferences {
            include_keywords: include.iter().map(|s| s.to_string()).collect(),
            exclude_keywords: exclude.iter().map(|s| s.to_string()).collect(),
            keyword_logic: logic,
            ..Default::default()
        }
    }

    fn titles(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn exclusion_beats_inclusion() {
        let page = vec![
            article("1", "CRISPR gene editing advance"),
            article("2", "CRISPR study retracted"),
        ];
        let kept = apply_keyword_rules(page, &prefs(&["CRISPR"], &["retracted"], KeywordLogic::Or));
        assert_eq!(titles(&kept), vec!["CRISPR gene editing advance"]);
    }

    #[test]
    fn and_requires_every_keyword_or_requires_any() {
        let mut both = article("1", "Alpha and beta");
        both.summary = Some("nothing else".to_string());
        let page = vec![both];

        let and = apply_keyword_rules(page.clone(), &prefs(&["alpha", "beta", "gamma"], &[], KeywordLogic::And));
        assert!(and.is_empty());

        let or = apply_keyword_rules(page, &prefs(&["alpha", "beta", "gamma"], &[], KeywordLogic::Or));
        assert_eq!(or.len(), 1);
    }

    #[test]
    fn matches_summary_and_tags_case_insensitively() {
        let mut tagged = article("1", "Untitled");
        tagged.all_tags = Some(vec!["Neuroscience".to_string()]);
        let mut summarized = article("2", "Also untitled");
        summarized.summary = Some("Advances in NEUROscience imaging".to_string());
        let other = article("3", "Astrophysics");

        let kept = apply_keyword_rules(
            vec![tagged, summarized, other],
            &prefs(&["neuroscience"], &[], KeywordLogic::Or),
        );
        assert_eq!(titles(&kept), vec!["Untitled", "Also untitled"]);
    }

    #[test]
    fn empty_include_list_keeps_everything_not_excluded() {
        let page = vec![article("1", "Kept"), article("2", "Preprint withdrawn")];
        let kept = apply_keyword_rules(page, &prefs(&[], &["withdrawn"], KeywordLogic::And));
        assert_eq!(titles(&kept), vec!["Kept"]);

        let untouched = apply_keyword_rules(vec![article("3", "Any")], &FeedPreferences::default());
        assert_eq!(untouched.len(), 1);
    }
}
