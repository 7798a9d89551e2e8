use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, Result};

use super::client::RestClient;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl AuthUser {
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata
            .get("display_name")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| at <= Utc::now().timestamp())
            .unwrap_or(false)
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    SignedIn(Session),
    /// The backend wants the address confirmed before issuing a session.
    ConfirmationRequired,
}

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

pub fn validate_new_password(password: &str, confirmation: &str) -> Result<()> {
    if password != confirmation {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }
    validate_password(password)
}

/// Persists the session as JSON so later runs stay signed in.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file: {}", e);
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Password auth against the hosted auth service.
pub struct AuthClient {
    rest: Arc<RestClient>,
    store: SessionStore,
}

impl AuthClient {
    pub fn new(rest: Arc<RestClient>, store: SessionStore) -> Self {
        Self { rest, store }
    }

    /// Load the persisted session, refreshing it once if it has expired.
    pub async fn restore(&self) -> Result<Option<Session>> {
        let Some(session) = self.store.load()? else {
            return Ok(None);
        };

        let session = if session.is_expired() {
            match self.refresh(&session.refresh_token).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    tracing::warn!("Session refresh failed, signing out: {}", e);
                    self.store.clear()?;
                    return Ok(None);
                }
            }
        } else {
            session
        };

        self.activate(&session).await?;
        Ok(Some(session))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(AppError::Validation("Please enter your password".to_string()));
        }

        let body = json!({ "email": email.trim(), "password": password });
        let value = self
            .rest
            .auth_call(Method::POST, "token", &[("grant_type", "password")], Some(&body))
            .await?;
        let session: Session = serde_json::from_value(value)?;
        self.activate(&session).await?;
        tracing::info!("Signed in as {}", session.user.id);
        Ok(session)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
        display_name: Option<&str>,
    ) -> Result<SignUpOutcome> {
        validate_email(email)?;
        validate_new_password(password, confirmation)?;

        let mut body = json!({ "email": email.trim(), "password": password });
        if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
            body["data"] = json!({ "display_name": name });
        }

        let value = self
            .rest
            .auth_call(Method::POST, "signup", &[], Some(&body))
            .await?;

        if value.get("access_token").is_some() {
            let session: Session = serde_json::from_value(value)?;
            self.activate(&session).await?;
            Ok(SignUpOutcome::SignedIn(session))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired)
        }
    }

    pub async fn sign_out(&self) -> Result<()> {
        if self.rest.is_authenticated().await {
            if let Err(e) = self
                .rest
                .auth_call::<Value>(Method::POST, "logout", &[], None)
                .await
            {
                tracing::warn!("Remote sign-out failed: {}", e);
            }
        }
        self.rest.set_access_token(None).await;
        self.rest.cache().clear().await;
        self.store.clear()
    }

    pub async fn change_password(
        &self,
        session: &Session,
        password: &str,
        confirmation: &str,
    ) -> Result<()> {
        validate_new_password(password, confirmation)?;
        self.update_user(session, json!({ "password": password }))
            .await
            .map(|_| ())
    }

    /// Store the display name in the user's metadata and return the updated session.
    pub async fn set_display_name(&self, session: &Session, name: &str) -> Result<Session> {
        let user = self
            .update_user(session, json!({ "data": { "display_name": name.trim() } }))
            .await?;
        let updated = Session {
            user,
            ..session.clone()
        };
        self.store.save(&updated)?;
        Ok(updated)
    }

    async fn update_user(&self, session: &Session, body: Value) -> Result<AuthUser> {
        if session.is_expired() {
            return Err(AppError::Auth("session expired, please sign in again".to_string()));
        }
        let value = self
            .rest
            .auth_call(Method::PUT, "user", &[], Some(&body))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let body = json!({ "refresh_token": refresh_token });
        let value = self
            .rest
            .auth_call(Method::POST, "token", &[("grant_type", "refresh_token")], Some(&body))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn activate(&self, session: &Session) -> Result<()> {
        self.rest
            .set_access_token(Some(session.access_token.clone()))
            .await;
        // Reads cached under another identity must not leak into this one.
        self.rest.cache().clear().await;
        self.store.save(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_client;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_json(expires_at: i64) -> Value {
        json!({
            "access_token": "jwt-token",
            "refresh_token": "refresh",
            "expires_at": expires_at,
            "user": {"id": "u1", "email": "ada@example.org", "user_metadata": {"display_name": "Ada"}}
        })
    }

    #[test]
    fn validation_rules() {
        assert!(validate_email("ada@example.org").is_ok());
        assert!(validate_email("  ").is_err());
        assert!(validate_email("ada").is_err());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        let mismatch = validate_new_password("secret1", "secret2").unwrap_err();
        assert_eq!(mismatch.to_string(), "Passwords do not match");
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let auth = AuthClient::new(
            test_client(&server),
            SessionStore::new(dir.path().join("session.json")),
        );
        assert!(auth.sign_up("ada@example.org", "abc", "abc", None).await.is_err());
        assert!(auth.sign_in("not-an-email", "secret").await.is_err());
    }

    #[tokio::test]
    async fn sign_in_persists_and_restores_session() {
        let server = MockServer::start().await;
        let future = Utc::now().timestamp() + 3600;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_partial_json(json!({"email": "ada@example.org"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(future)))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let rest = test_client(&server);
        let auth = AuthClient::new(rest.clone(), store.clone());

        let session = auth.sign_in(" ada@example.org ", "secret").await.unwrap();
        assert_eq!(session.user.display_name(), Some("Ada"));
        assert!(rest.is_authenticated().await);

        let restored = AuthClient::new(test_client(&server), store)
            .restore()
            .await
            .unwrap();
        assert_eq!(restored, Some(session));
    }

    #[tokio::test]
    async fn sign_in_drops_reads_cached_for_the_previous_user() {
        let server = MockServer::start().await;
        let future = Utc::now().timestamp() + 3600;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(future)))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let rest = test_client(&server);
        rest.cache()
            .put(
                "collections?user_id=eq.someone-else".to_string(),
                crate::backend::cache::CachedRead {
                    table: "collections".to_string(),
                    body: Arc::from("[]"),
                    total: None,
                },
            )
            .await;

        let auth = AuthClient::new(rest.clone(), SessionStore::new(dir.path().join("session.json")));
        auth.sign_in("ada@example.org", "secret").await.unwrap();

        assert!(rest
            .cache()
            .get("collections?user_id=eq.someone-else")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn expired_session_is_refreshed_or_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Refresh Token Not Found"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let stale: Session = serde_json::from_value(session_json(1)).unwrap();
        store.save(&stale).unwrap();

        let auth = AuthClient::new(test_client(&server), store.clone());
        assert_eq!(auth.restore().await.unwrap(), None);
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn sign_up_without_session_requires_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .and(body_partial_json(json!({"data": {"display_name": "Ada"}})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "u1", "email": "ada@example.org"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let auth = AuthClient::new(
            test_client(&server),
            SessionStore::new(dir.path().join("session.json")),
        );
        let outcome = auth
            .sign_up("ada@example.org", "secret1", "secret1", Some("Ada"))
            .await
            .unwrap();
        assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
    }
}
