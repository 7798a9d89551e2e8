use crate::backend::{literal_search_term, Query};
use crate::models::{FeedPreferences, FilterState};

pub const ARTICLE_VIEW: &str = "articles_with_metadata";

/// Columns the free-text search box matches against.
pub const SEARCH_COLUMNS: &[&str] = &["title", "summary", "author", "journal_name"];

/// Translate the ad hoc filters and saved preferences into one page request.
///
/// Structured filters are AND-ed. Preferred disciplines/fields only apply when
/// no ad hoc discipline or field is selected; excluded journals always apply.
pub fn build_article_query(
    filters: &FilterState,
    preferences: Option<&FeedPreferences>,
    page_size: usize,
) -> Query {
    let mut query = Query::from(ARTICLE_VIEW).select("*");

    let taxonomy_override = !filters.discipline.is_empty() || !filters.field.is_empty();

    if !filters.discipline.is_empty() {
        query = query.eq("level_1_discipline", filters.discipline.as_str());
    }
    if !filters.field.is_empty() {
        query = query.eq("level_2_field", filters.field.as_str());
    }

    if let Some(prefs) = preferences {
        if !taxonomy_override {
            if !prefs.preferred_disciplines.is_empty() {
                query = query.in_list("level_1_discipline", &prefs.preferred_disciplines);
            }
            if !prefs.preferred_fields.is_empty() {
                query = query.in_list("level_2_field", &prefs.preferred_fields);
            }
        }
        if !prefs.excluded_journals.is_empty() {
            query = query.not_in("journal_name", &prefs.excluded_journals);
        }
    }

    if !filters.ticker_symbol.is_empty() {
        query = query.eq("ticker_symbol", filters.ticker_symbol.as_str());
    }
    if !filters.journal.is_empty() {
        query = query.eq("journal_name", filters.journal.as_str());
    }

    if let Some(from) = filters.date_from {
        query = query.gte("publication_date", from.format("%Y-%m-%d").to_string());
    }
    if let Some(to) = filters.date_to {
        // Inclusive of the whole end day for timestamp columns.
        query = query.lte(
            "publication_date",
            format!("{}T23:59:59", to.format("%Y-%m-%d")),
        );
    }

    let term = literal_search_term(&filters.search_query);
    if !term.is_empty() {
        query = query.any_ilike(SEARCH_COLUMNS, &term);
    }

    query
        .order_desc("publication_date")
        .range(filters.offset(page_size), page_size)
        .count_exact()
}
