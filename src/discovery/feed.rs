use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::{Query, RestClient};
use crate::error::Result;
use crate::models::{Article, FeedPreferences, FilterState};

use super::keywords::apply_keyword_rules;
use super::pagination::{page_window, total_pages};
use super::query::build_article_query;

/// One fetched page after keyword post-filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub articles: Vec<Article>,
    /// Exact remote total for the structured query (before keyword rules).
    pub total: u64,
    /// Rows the backend returned for this page before keyword rules.
    pub fetched: usize,
}

// Message for a completed page fetch
pub struct FeedResult {
    pub generation: u64,
    pub result: std::result::Result<FeedPage, String>,
}

pub async fn fetch_page(
    client: &RestClient,
    query: &Query,
    preferences: Option<&FeedPreferences>,
) -> Result<FeedPage> {
    let page = client.select::<Article>(query).await?;
    let fetched = page.rows.len();
    let total = page.total.unwrap_or(fetched as u64);

    let articles = match preferences {
        Some(prefs) => apply_keyword_rules(page.rows, prefs),
        None => page.rows,
    };

    tracing::debug!(
        "Fetched {} articles ({} after keyword rules, {} total)",
        fetched,
        articles.len(),
        total
    );

    Ok(FeedPage {
        articles,
        total,
        fetched,
    })
}

/// View state of the discovery article list.
///
/// Every fetch takes a new generation number; a result is only applied if
/// its generation is still the latest, so a slow response to an old filter
/// can never overwrite a newer one.
pub struct DiscoveryFeed {
    pub filters: FilterState,
    pub articles: Vec<Article>,
    pub total: u64,
    pub fetched: usize,
    pub loading: bool,
    pub last_fetch_failed: bool,
    generation: u64,
    page_size: usize,
}

impl DiscoveryFeed {
    pub fn new(page_size: usize) -> Self {
        Self {
            filters: FilterState::default(),
            articles: Vec::new(),
            total: 0,
            fetched: 0,
            loading: false,
            last_fetch_failed: false,
            generation: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Drop all view state but keep counting generations, so a fetch started
    /// before the reset can never be mistaken for one started after it.
    pub fn reset(&mut self) {
        *self = Self {
            generation: self.generation,
            ..Self::new(self.page_size)
        };
    }

    /// Start a new fetch, superseding any in flight.
    pub fn begin_fetch(&mut self, preferences: Option<&FeedPreferences>) -> (u64, Query) {
        self.generation += 1;
        self.loading = true;
        (
            self.generation,
            build_article_query(&self.filters, preferences, self.page_size),
        )
    }

    pub fn spawn_fetch(
        &mut self,
        client: Arc<RestClient>,
        preferences: Option<FeedPreferences>,
        tx: mpsc::Sender<FeedResult>,
    ) {
        let (generation, query) = self.begin_fetch(preferences.as_ref());
        tokio::spawn(async move {
            let result = fetch_page(&client, &query, preferences.as_ref())
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(FeedResult { generation, result }).await;
        });
    }

    /// Apply a finished fetch. Returns false if it was superseded.
    pub fn apply(&mut self, result: FeedResult) -> bool {
        if result.generation != self.generation {
            tracing::debug!(
                "Discarding stale feed result {} (latest is {})",
                result.generation,
                self.generation
            );
            return false;
        }

        self.loading = false;
        match result.result {
            Ok(page) => {
                self.articles = page.articles;
                self.total = page.total;
                self.fetched = page.fetched;
                self.last_fetch_failed = false;
            }
            Err(e) => {
                // Keep the previous page on screen.
                tracing::warn!("Error fetching articles: {}", e);
                self.last_fetch_failed = true;
            }
        }
        true
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total, self.page_size)
    }

    pub fn page_window(&self) -> Vec<usize> {
        page_window(self.filters.page, self.total_pages())
    }

    /// Move to `page` if it exists. Returns whether the page changed.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        let last = self.total_pages().max(1);
        let page = page.clamp(1, last);
        if page == self.filters.page {
            return false;
        }
        self.filters.page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.filters.page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.go_to_page(self.filters.page.saturating_sub(1))
    }

    /// The page shows fewer cards than the backend returned.
    pub fn is_underfilled(&self) -> bool {
        self.articles.len() < self.fetched
    }
}
