use std::sync::Arc;

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_RANGE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};

use super::cache::{CachedRead, QueryCache};
use super::query::Query;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// One page of rows and, when requested, the exact total across all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: Option<u64>,
}

/// Client for the hosted backend's table API (`/rest/v1`) and auth API (`/auth/v1`).
pub struct RestClient {
    client: Client,
    base: Url,
    anon_key: Option<String>,
    access_token: RwLock<Option<String>>,
    cache: Arc<QueryCache>,
}

impl RestClient {
    pub fn new(config: &Config, cache: Arc<QueryCache>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("benchfeed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut base = config.backend()?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client,
            base,
            anon_key: config.anon_key.clone(),
            access_token: RwLock::new(None),
            cache,
        })
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| AppError::Config(format!("invalid endpoint {path}: {e}")))
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.anon_key {
            builder = builder.header("apikey", key);
        }
        let token = self.access_token.read().await.clone();
        if let Some(token) = token.or_else(|| self.anon_key.clone()) {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::from_response(status, &body))
    }

    // Reads

    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Page<T>> {
        let read = self.fetch(query).await?;
        let rows = if query.is_single() {
            vec![serde_json::from_str(&read.body)?]
        } else {
            serde_json::from_str(&read.body)?
        };
        Ok(Page {
            rows,
            total: read.total,
        })
    }

    /// Read at most one row; "no rows" is `Ok(None)`, not an error.
    pub async fn select_one<T: DeserializeOwned>(&self, query: Query) -> Result<Option<T>> {
        match self.select(&query.single()).await {
            Ok(page) => Ok(page.rows.into_iter().next()),
            Err(e) if e.is_not_found_row() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch(&self, query: &Query) -> Result<CachedRead> {
        let key = query.cache_key();
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(hit);
        }

        let url = self.endpoint(&format!("rest/v1/{}", query.table()))?;
        tracing::debug!("GET {}?{}", url, query.query_string());

        let mut builder = self.request(Method::GET, url).await.query(&query.pairs());
        if query.is_count_exact() {
            builder = builder.header("Prefer", "count=exact");
        }
        if query.is_single() {
            builder = builder.header(ACCEPT, SINGLE_OBJECT);
        }

        let response = Self::check(builder.send().await?).await?;
        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(parse_content_range_total);
        let body = response.text().await?;

        let read = CachedRead {
            table: query.table().to_string(),
            body: Arc::from(body),
            total,
        };
        self.cache.put(key, read.clone()).await;
        Ok(read)
    }

    // Writes; each one invalidates cached reads of the table it touches.

    pub async fn insert<B: Serialize>(&self, table: &str, body: &B) -> Result<()> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        tracing::debug!("POST {}", url);
        let response = self
            .request(Method::POST, url)
            .await
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        self.cache.invalidate(table).await;
        Ok(())
    }

    pub async fn upsert<B: Serialize>(&self, table: &str, body: &B, on_conflict: &str) -> Result<()> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        tracing::debug!("UPSERT {} on {}", url, on_conflict);
        let response = self
            .request(Method::POST, url)
            .await
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        self.cache.invalidate(table).await;
        Ok(())
    }

    pub async fn update<B: Serialize>(&self, filter: &Query, body: &B) -> Result<()> {
        let url = self.endpoint(&format!("rest/v1/{}", filter.table()))?;
        tracing::debug!("PATCH {}", url);
        let response = self
            .request(Method::PATCH, url)
            .await
            .query(&filter.filter_pairs())
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        self.cache.invalidate(filter.table()).await;
        Ok(())
    }

    pub async fn delete(&self, filter: &Query) -> Result<()> {
        if filter.predicates().is_empty() {
            return Err(AppError::Validation(format!(
                "refusing to delete from {} without a filter",
                filter.table()
            )));
        }
        let url = self.endpoint(&format!("rest/v1/{}", filter.table()))?;
        tracing::debug!("DELETE {}", url);
        let response = self
            .request(Method::DELETE, url)
            .await
            .query(&filter.filter_pairs())
            .send()
            .await?;
        Self::check(response).await?;
        self.cache.invalidate(filter.table()).await;
        Ok(())
    }

    // Auth endpoints

    pub(crate) async fn auth_call<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Value> {
        let url = self.endpoint(&format!("auth/v1/{path}"))?;
        tracing::debug!("{} {}", method, url);
        let mut builder = self.request(method, url).await.query(query);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = Self::check(builder.send().await?).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Total from a `Content-Range` header such as `0-11/57` or `*/0`.
fn parse_content_range_total(value: &HeaderValue) -> Option<u64> {
    value
        .to_str()
        .ok()?
        .rsplit_once('/')
        .and_then(|(_, total)| total.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_client as client_for;
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: String,
    }

    #[test]
    fn content_range_total() {
        assert_eq!(
            parse_content_range_total(&HeaderValue::from_static("0-11/57")),
            Some(57)
        );
        assert_eq!(
            parse_content_range_total(&HeaderValue::from_static("*/0")),
            Some(0)
        );
        assert_eq!(
            parse_content_range_total(&HeaderValue::from_static("0-11/*")),
            None
        );
    }

    #[tokio::test]
    async fn select_sends_headers_and_reads_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/articles"))
            .and(query_param("id", "eq.a1"))
            .and(header("apikey", "anon"))
            .and(header("Prefer", "count=exact"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Range", "0-0/1")
                    .set_body_json(json!([{"id": "a1"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let query = Query::from("articles").eq("id", "a1").count_exact();
        let page: Page<Row> = client.select(&query).await.unwrap();
        assert_eq!(page.rows, vec![Row { id: "a1".into() }]);
        assert_eq!(page.total, Some(1));

        // Second read is served from the shared cache.
        let again: Page<Row> = client.select(&query).await.unwrap();
        assert_eq!(again, page);
    }

    #[tokio::test]
    async fn writes_invalidate_cached_reads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/collections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/collections"))
            .and(query_param("id", "eq.c1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let query = Query::from("collections");
        let _: Page<Row> = client.select(&query).await.unwrap();
        client
            .update(&Query::from("collections").eq("id", "c1"), &json!({"name": "x"}))
            .await
            .unwrap();
        let _: Page<Row> = client.select(&query).await.unwrap();
    }

    #[tokio::test]
    async fn select_one_maps_no_rows_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_preferences"))
            .and(header("Accept", SINGLE_OBJECT))
            .respond_with(ResponseTemplate::new(406).set_body_json(json!({
                "code": "PGRST116",
                "message": "JSON object requested, multiple (or no) rows returned"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let row: Option<Row> = client
            .select_one(Query::from("user_preferences").eq("user_id", "u1"))
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn backend_errors_carry_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/collection_articles"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .insert("collection_articles", &json!({"collection_id": "c", "article_id": "a"}))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn delete_requires_a_filter() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let err = client.delete(&Query::from("collections")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
