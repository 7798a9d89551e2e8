use serde::{Deserialize, Serialize};

/// A user-owned, named group of articles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CollectionRow")]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
    /// Live membership count from the embedded `collection_articles(count)` aggregate.
    pub article_count: u64,
}

#[derive(Debug, Deserialize)]
struct CountAggregate {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct CollectionRow {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_public: bool,
    user_id: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
    #[serde(default)]
    collection_articles: Vec<CountAggregate>,
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            is_public: row.is_public,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            article_count: row.collection_articles.first().map(|c| c.count).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCollection {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_public: bool,
    pub user_id: String,
}

/// Partial update; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl CollectionUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.is_public.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMembership {
    pub collection_id: String,
    pub article_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionArticle {
    pub article_id: String,
}
