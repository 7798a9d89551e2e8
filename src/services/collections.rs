use std::sync::Arc;

use url::Url;

use crate::backend::{Query, RestClient};
use crate::error::{AppError, Result};
use crate::models::{
    Article, Collection, CollectionArticle, CollectionUpdate, NewCollection, NewMembership,
};

const COLLECTIONS: &str = "collections";
const MEMBERSHIPS: &str = "collection_articles";
const ARTICLES: &str = "articles";
const WITH_COUNT: &str = "*,collection_articles(count)";

pub const ALREADY_IN_COLLECTION: &str = "Article is already in this collection";
pub const ONLY_PUBLIC_SHARED: &str = "Only public collections can be shared";
pub const NOT_PUBLIC: &str = "This collection doesn't exist or is not public";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// The signed-in user's collections.
///
/// Every mutation re-reads the full list afterwards instead of patching
/// `collections` in place.
pub struct CollectionService {
    rest: Arc<RestClient>,
    user_id: String,
    share_base: Url,
    pub collections: Vec<Collection>,
}

impl CollectionService {
    pub fn new(rest: Arc<RestClient>, user_id: impl Into<String>, share_base: Url) -> Self {
        Self {
            rest,
            user_id: user_id.into(),
            share_base,
            collections: Vec::new(),
        }
    }

    pub fn find(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    /// Re-read the list, newest first, with live article counts.
    pub async fn refresh(&mut self) -> Result<&[Collection]> {
        let query = Query::from(COLLECTIONS)
            .select(WITH_COUNT)
            .eq("user_id", self.user_id.as_str())
            .order_desc("created_at");
        self.collections = self.rest.select::<Collection>(&query).await?.rows;
        Ok(&self.collections)
    }

    pub async fn create(
        &mut self,
        name: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> Result<()> {
        let name = required_name(name)?;
        let body = NewCollection {
            name,
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            is_public,
            user_id: self.user_id.clone(),
        };
        self.rest.insert(COLLECTIONS, &body).await?;
        tracing::info!("Created collection {}", body.name);
        self.refresh().await?;
        Ok(())
    }

    pub async fn update(&mut self, id: &str, mut changes: CollectionUpdate) -> Result<()> {
        if let Some(name) = changes.name.take() {
            changes.name = Some(required_name(&name)?);
        }
        if !changes.is_empty() {
            let filter = self.owned(id);
            self.rest.update(&filter, &changes).await?;
        }
        self.refresh().await?;
        Ok(())
    }

    /// Callers confirm with the user before calling this; memberships cascade remotely.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        self.rest.delete(&self.owned(id)).await?;
        // Cached membership reads are stale after the cascade.
        self.rest.cache().invalidate(MEMBERSHIPS).await;
        tracing::info!("Deleted collection {}", id);
        self.refresh().await?;
        Ok(())
    }

    /// Adding an article twice is a benign outcome, not an error.
    pub async fn add_article(&mut self, collection_id: &str, article_id: &str) -> Result<AddOutcome> {
        let body = NewMembership {
            collection_id: collection_id.to_string(),
            article_id: article_id.to_string(),
        };
        let outcome = match self.rest.insert(MEMBERSHIPS, &body).await {
            Ok(()) => AddOutcome::Added,
            Err(e) if e.is_unique_violation() => {
                // The row exists remotely, so cached counts are behind.
                self.rest.cache().invalidate(MEMBERSHIPS).await;
                AddOutcome::AlreadyPresent
            }
            Err(e) => return Err(e),
        };
        self.refresh().await?;
        Ok(outcome)
    }

    pub async fn remove_article(&mut self, collection_id: &str, article_id: &str) -> Result<()> {
        let filter = Query::from(MEMBERSHIPS)
            .eq("collection_id", collection_id)
            .eq("article_id", article_id);
        self.rest.delete(&filter).await?;
        self.refresh().await?;
        Ok(())
    }

    /// Articles in a collection, most recently added first.
    pub async fn articles(&self, collection_id: &str) -> Result<Vec<Article>> {
        let members = Query::from(MEMBERSHIPS)
            .select("article_id")
            .eq("collection_id", collection_id)
            .order_desc("added_at");
        let ids: Vec<String> = self
            .rest
            .select::<CollectionArticle>(&members)
            .await?
            .rows
            .into_iter()
            .map(|m| m.article_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::from(ARTICLES).select("*").in_list("id", &ids);
        let mut articles = self.rest.select::<Article>(&query).await?.rows;
        articles.sort_by_key(|a| ids.iter().position(|id| *id == a.id));
        Ok(articles)
    }

    /// Someone else's collection, readable only when it is public.
    pub async fn get_public(&self, id: &str) -> Result<Collection> {
        let query = Query::from(COLLECTIONS)
            .select(WITH_COUNT)
            .eq("id", id)
            .eq("is_public", "true");
        self.rest
            .select_one(query)
            .await?
            .ok_or_else(|| AppError::Rejected(NOT_PUBLIC.to_string()))
    }

    /// Share link for a public collection. Private collections are refused
    /// before anything leaves the machine.
    pub fn share_link(&self, collection: &Collection) -> Result<String> {
        if !collection.is_public {
            return Err(AppError::Rejected(ONLY_PUBLIC_SHARED.to_string()));
        }
        let mut base = self.share_base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let link = base
            .join(&format!("collection/{}", collection.id))
            .map_err(|e| AppError::Config(format!("invalid share link: {e}")))?;
        Ok(link.to_string())
    }

    fn owned(&self, id: &str) -> Query {
        Query::from(COLLECTIONS)
            .eq("id", id)
            .eq("user_id", self.user_id.as_str())
    }
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Collection name is required".to_string()));
    }
    Ok(name.to_string())
}
