use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

/// Upper bound on distinct cached reads; the least recently used go first.
const MAX_ENTRIES: u64 = 512;

/// A cached read: raw JSON body plus the exact count, if one was requested.
#[derive(Debug, Clone)]
pub struct CachedRead {
    pub table: String,
    pub body: Arc<str>,
    pub total: Option<u64>,
}

/// Process-wide read cache keyed by rendered query.
///
/// Every screen reads through the same cache, so two views of the same data
/// cannot drift apart. Writes invalidate whole tables; entries also expire
/// after `ttl`, which is how rows written outside the app show up.
#[derive(Clone)]
pub struct QueryCache {
    entries: Cache<String, CachedRead>,
}

/// Tables whose cached reads embed data from another table.
fn dependents(table: &str) -> &'static [&'static str] {
    match table {
        "collection_articles" => &["collections"],
        "articles" => &["articles_with_metadata", "user_saved_articles"],
        _ => &[],
    }
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, MAX_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        Self { entries }
    }

    pub async fn get(&self, key: &str) -> Option<CachedRead> {
        self.entries.get(key).await
    }

    pub async fn put(&self, key: String, read: CachedRead) {
        self.entries.insert(key, read).await;
    }

    /// Drop every entry for `table` and for tables that embed it.
    pub async fn invalidate(&self, table: &str) {
        let deps = dependents(table);
        let target = table.to_string();
        let result = self
            .entries
            .invalidate_entries_if(move |_, read| {
                read.table == target || deps.contains(&read.table.as_str())
            });
        match result {
            Ok(_) => tracing::debug!("Invalidated cached reads for {}", table),
            Err(e) => {
                tracing::warn!("Could not invalidate {} selectively, clearing cache: {}", table, e);
                self.entries.invalidate_all();
            }
        }
    }

    pub async fn clear(&self) {
        self.entries.invalidate_all();
    }
}
