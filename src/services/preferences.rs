use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::backend::{Query, RestClient};
use crate::error::Result;
use crate::models::FeedPreferences;

const USER_PREFERENCES: &str = "user_preferences";

#[derive(Debug, Deserialize)]
struct PreferenceRow {
    #[serde(default)]
    discovery_feed_settings: Option<Value>,
}

/// Per-user discovery feed settings, written back whole on every save.
pub struct PreferenceStore {
    rest: Arc<RestClient>,
    user_id: String,
}

impl PreferenceStore {
    pub fn new(rest: Arc<RestClient>, user_id: impl Into<String>) -> Self {
        Self {
            rest,
            user_id: user_id.into(),
        }
    }

    /// `None` when the user has no row or the stored blob is null.
    pub async fn load(&self) -> Result<Option<FeedPreferences>> {
        let query = Query::from(USER_PREFERENCES)
            .select("discovery_feed_settings")
            .eq("user_id", self.user_id.as_str());
        let row: Option<PreferenceRow> = self.rest.select_one(query).await?;
        Ok(row.and_then(|r| FeedPreferences::from_settings(r.discovery_feed_settings)))
    }

    pub async fn save(&self, preferences: &FeedPreferences) -> Result<()> {
        self.write(serde_json::to_value(preferences)?).await?;
        tracing::info!("Saved feed preferences");
        Ok(())
    }

    /// Null the stored settings; the row itself is kept.
    pub async fn clear(&self) -> Result<()> {
        self.write(Value::Null).await?;
        tracing::info!("Cleared feed preferences");
        Ok(())
    }

    async fn write(&self, settings: Value) -> Result<()> {
        let body = json!({
            "user_id": self.user_id,
            "discovery_feed_settings": settings,
        });
        self.rest.upsert(USER_PREFERENCES, &body, "user_id").await
    }
}
