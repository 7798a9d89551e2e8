use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::backend::{Query, RestClient};
use crate::error::{AppError, Result};
use crate::models::{SavedArticle, SavedArticleRow};

const SAVED: &str = "user_saved_articles";
pub const SIGN_IN_TO_SAVE: &str = "Please sign in to save articles";

#[derive(Debug, Deserialize)]
struct SavedId {
    article_id: String,
}

/// The signed-in user's bookmark set, mirrored locally for quick lookups.
pub struct SavedArticles {
    rest: Arc<RestClient>,
    user_id: Option<String>,
    saved: HashSet<String>,
}

impl SavedArticles {
    pub fn new(rest: Arc<RestClient>, user_id: Option<String>) -> Self {
        Self {
            rest,
            user_id,
            saved: HashSet::new(),
        }
    }

    pub fn is_saved(&self, article_id: &str) -> bool {
        self.saved.contains(article_id)
    }

    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let Some(user_id) = &self.user_id else {
            self.saved.clear();
            return Ok(());
        };
        let query = Query::from(SAVED)
            .select("article_id")
            .eq("user_id", user_id.as_str());
        let page = self.rest.select::<SavedId>(&query).await?;
        self.saved = page.rows.into_iter().map(|r| r.article_id).collect();
        Ok(())
    }

    /// Save or unsave depending on the current state. Returns the new state.
    pub async fn toggle(&mut self, article_id: &str) -> Result<bool> {
        let Some(user_id) = self.user_id.clone() else {
            return Err(AppError::Rejected(SIGN_IN_TO_SAVE.to_string()));
        };

        if self.is_saved(article_id) {
            let filter = Query::from(SAVED)
                .eq("user_id", user_id.as_str())
                .eq("article_id", article_id);
            self.rest.delete(&filter).await?;
            self.saved.remove(article_id);
            tracing::info!("Unsaved article {}", article_id);
            Ok(false)
        } else {
            let body = json!({ "user_id": user_id, "article_id": article_id });
            match self.rest.insert(SAVED, &body).await {
                Ok(()) => {}
                // Saved from another session since the last refresh.
                Err(e) if e.is_unique_violation() => {
                    self.rest.cache().invalidate(SAVED).await;
                }
                Err(e) => return Err(e),
            }
            self.saved.insert(article_id.to_string());
            tracing::info!("Saved article {}", article_id);
            Ok(true)
        }
    }

    /// Saved articles with their embedded article fields, most recently saved first.
    pub async fn list_saved(&self) -> Result<Vec<SavedArticle>> {
        let Some(user_id) = &self.user_id else {
            return Ok(Vec::new());
        };
        let query = Query::from(SAVED)
            .select("created_at,articles(id,title,link,summary,publication_date,journal_name)")
            .eq("user_id", user_id.as_str())
            .order_desc("created_at");
        let page = self.rest.select::<SavedArticleRow>(&query).await?;
        Ok(page
            .rows
            .into_iter()
            .filter_map(SavedArticleRow::into_saved)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_client;
    use wiremock::matchers::{any, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn toggle_without_session_is_rejected_locally() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut saved = SavedArticles::new(test_client(&server), None);
        let err = saved.toggle("a1").await.unwrap_err();
        assert_eq!(err.to_string(), SIGN_IN_TO_SAVE);
    }

    #[tokio::test]
    async fn toggle_inserts_then_deletes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_saved_articles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_saved_articles"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/user_saved_articles"))
            .and(query_param("user_id", "eq.u1"))
            .and(query_param("article_id", "eq.a1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut saved = SavedArticles::new(test_client(&server), Some("u1".to_string()));
        saved.refresh().await.unwrap();
        assert!(!saved.is_saved("a1"));

        assert!(saved.toggle("a1").await.unwrap());
        assert!(saved.is_saved("a1"));
        assert!(!saved.toggle("a1").await.unwrap());
        assert_eq!(saved.len(), 0);
    }

    #[tokio::test]
    async fn duplicate_save_counts_as_saved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_saved_articles"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint"
            })))
            .mount(&server)
            .await;

        let mut saved = SavedArticles::new(test_client(&server), Some("u1".to_string()));
        assert!(saved.toggle("a1").await.unwrap());
        assert!(saved.is_saved("a1"));
    }

    #[tokio::test]
    async fn duplicate_save_rereads_the_saved_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_saved_articles"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_saved_articles"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_saved_articles"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"created_at": "2024-05-02T10:00:00Z", "articles": {"id": "a1", "title": "Elsewhere", "link": "l1"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let mut saved = SavedArticles::new(test_client(&server), Some("u1".to_string()));
        assert!(saved.list_saved().await.unwrap().is_empty());
        assert!(saved.toggle("a1").await.unwrap());
        let list = saved.list_saved().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].article.id, "a1");
    }

    #[tokio::test]
    async fn list_saved_skips_dangling_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_saved_articles"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"created_at": "2024-05-02T10:00:00Z", "articles": {"id": "a2", "title": "Newer", "link": "l2"}},
                {"created_at": "2024-05-01T10:00:00Z", "articles": null}
            ])))
            .mount(&server)
            .await;

        let saved = SavedArticles::new(test_client(&server), Some("u1".to_string()));
        let list = saved.list_saved().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].article.title, "Newer");
        assert_eq!(list[0].saved_at, "2024-05-02T10:00:00Z");
    }
}
