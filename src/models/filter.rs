use chrono::NaiveDate;

/// Ad hoc discovery filters for the current view, plus the page cursor.
///
/// Empty strings and `None` bounds mean "no constraint".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub search_query: String,
    pub discipline: String,
    pub field: String,
    pub ticker_symbol: String,
    pub journal: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// 1-based page number
    pub page: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            discipline: String::new(),
            field: String::new(),
            ticker_symbol: String::new(),
            journal: String::new(),
            date_from: None,
            date_to: None,
            page: 1,
        }
    }
}

impl FilterState {
    /// Whether any structured filter (not the search box) is set.
    pub fn has_active_filters(&self) -> bool {
        !self.discipline.is_empty()
            || !self.field.is_empty()
            || !self.ticker_symbol.is_empty()
            || !self.journal.is_empty()
            || self.date_from.is_some()
            || self.date_to.is_some()
    }

    /// Reset structured filters; the search text is kept.
    pub fn clear(&mut self) {
        *self = Self {
            search_query: std::mem::take(&mut self.search_query),
            ..Self::default()
        };
    }

    /// Selecting a discipline invalidates the field chosen under the old one.
    pub fn set_discipline(&mut self, discipline: impl Into<String>) {
        self.discipline = discipline.into();
        self.field.clear();
        self.page = 1;
    }

    pub fn set_field(&mut self, field: impl Into<String>) {
        self.field = field.into();
        self.page = 1;
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
        self.page = 1;
    }

    pub fn set_ticker(&mut self, ticker: impl Into<String>) {
        self.ticker_symbol = ticker.into();
        self.page = 1;
    }

    pub fn set_journal(&mut self, journal: impl Into<String>) {
        self.journal = journal.into();
        self.page = 1;
    }

    pub fn set_dates(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        self.date_from = from;
        self.date_to = to;
        self.page = 1;
    }

    pub fn offset(&self, page_size: usize) -> usize {
        self.page.saturating_sub(1) * page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changing_discipline_resets_field_and_page() {
        let mut filters = FilterState {
            field: "Genetics".to_string(),
            page: 4,
            ..Default::default()
        };
        filters.set_discipline("Physics");
        assert_eq!(filters.discipline, "Physics");
        assert!(filters.field.is_empty());
        assert_eq!(filters.page, 1);
    }

    #[test]
    fn clear_keeps_search_text() {
        let mut filters = FilterState::default();
        filters.set_search("protein");
        filters.set_discipline("Biology");
        filters.set_dates(NaiveDate::from_ymd_opt(2024, 1, 1), None);
        filters.page = 3;
        assert!(filters.has_active_filters());

        filters.clear();
        assert!(!filters.has_active_filters());
        assert_eq!(filters.search_query, "protein");
        assert_eq!(filters.page, 1);
    }

    #[test]
    fn offset_is_zero_based() {
        let mut filters = FilterState::default();
        assert_eq!(filters.offset(12), 0);
        filters.page = 3;
        assert_eq!(filters.offset(12), 24);
        filters.page = 0;
        assert_eq!(filters.offset(12), 0);
    }
}
