mod auth;
mod cache;
mod client;
mod query;

pub use auth::{AuthClient, Session, SessionStore, SignUpOutcome};
pub use cache::QueryCache;
pub use client::RestClient;
pub use query::{literal_search_term, Query};

#[cfg(test)]
pub(crate) use auth::AuthUser;

#[cfg(test)]
pub(crate) fn test_client(server: &wiremock::MockServer) -> std::sync::Arc<RestClient> {
    let config = crate::config::Config {
        backend_url: Some(server.uri()),
        anon_key: Some("anon".to_string()),
        ..crate::config::Config::default()
    };
    std::sync::Arc::new(
        RestClient::new(&config, std::sync::Arc::new(QueryCache::new(config.cache_ttl())))
            .expect("test client"),
    )
}
