use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// How include keywords combine when filtering the discovery feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum KeywordLogic {
    #[default]
    #[serde(rename = "OR")]
    Or,
    #[serde(rename = "AND")]
    And,
}

impl KeywordLogic {
    pub fn label(&self) -> &'static str {
        match self {
            KeywordLogic::Or => "OR",
            KeywordLogic::And => "AND",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            KeywordLogic::Or => KeywordLogic::And,
            KeywordLogic::And => KeywordLogic::Or,
        }
    }
}

impl<'de> Deserialize<'de> for KeywordLogic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value.as_str() {
            Some("AND") => KeywordLogic::And,
            _ => KeywordLogic::Or,
        })
    }
}

/// Discovery feed personalization, stored as one JSON blob per user.
///
/// Decoding never fails on shape: list fields that are missing or not arrays
/// come back empty, non-string list entries are dropped, and an unknown
/// `keyword_logic` falls back to `OR`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPreferences {
    #[serde(default, deserialize_with = "lenient_list")]
    pub include_keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub exclude_keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub preferred_disciplines: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub preferred_fields: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub followed_journals: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub excluded_journals: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub followed_ticker_symbols: Vec<String>,
    #[serde(default)]
    pub keyword_logic: KeywordLogic,
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

impl FeedPreferences {
    /// Decode the stored blob. A missing row, a null blob or a non-object
    /// value all mean "no personalization".
    pub fn from_settings(settings: Option<Value>) -> Option<Self> {
        match settings {
            Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    pub fn has_keyword_rules(&self) -> bool {
        !self.include_keywords.is_empty() || !self.exclude_keywords.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn add_include_keyword(&mut self, keyword: &str) -> bool {
        add_unique(&mut self.include_keywords, keyword)
    }

    pub fn add_exclude_keyword(&mut self, keyword: &str) -> bool {
        add_unique(&mut self.exclude_keywords, keyword)
    }

    pub fn remove_include_keyword(&mut self, keyword: &str) {
        self.include_keywords.retain(|k| k != keyword);
    }

    pub fn remove_exclude_keyword(&mut self, keyword: &str) {
        self.exclude_keywords.retain(|k| k != keyword);
    }

    pub fn toggle_discipline(&mut self, discipline: &str) {
        toggle(&mut self.preferred_disciplines, discipline);
    }

    pub fn toggle_field(&mut self, field: &str) {
        toggle(&mut self.preferred_fields, field);
    }

    pub fn toggle_followed_journal(&mut self, journal: &str) {
        toggle(&mut self.followed_journals, journal);
    }

    pub fn toggle_excluded_journal(&mut self, journal: &str) {
        toggle(&mut self.excluded_journals, journal);
    }

    pub fn toggle_ticker(&mut self, ticker: &str) {
        toggle(&mut self.followed_ticker_symbols, ticker);
    }
}

fn add_unique(list: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

fn toggle(list: &mut Vec<String>, value: &str) {
    if list.iter().any(|v| v == value) {
        list.retain(|v| v != value);
    } else {
        list.push(value.to_string());
    }
}
