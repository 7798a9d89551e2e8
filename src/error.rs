use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Postgres unique-violation code, surfaced by the backend for duplicate rows.
const UNIQUE_VIOLATION: &str = "23505";
/// PostgREST code for "single object requested, zero rows returned".
const NO_ROWS: &str = "PGRST116";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Backend error ({status}): {message}")]
    Backend {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Error body shapes returned by the REST and auth endpoints.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    message: Option<String>,
    details: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
}

impl AppError {
    /// Build a backend error from a non-success response body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

        let code = parsed.code.map(|c| match c {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });

        let message = parsed
            .message
            .or(parsed.error_description)
            .or(parsed.msg)
            .or(parsed.details)
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body.to_string()
                }
            });

        AppError::Backend {
            status,
            code,
            message,
        }
    }

    pub fn backend_code(&self) -> Option<&str> {
        match self {
            AppError::Backend { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.backend_code() == Some(UNIQUE_VIOLATION)
    }

    pub fn is_not_found_row(&self) -> bool {
        self.backend_code() == Some(NO_ROWS)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AppError::Backend { status, .. } if *status == StatusCode::UNAUTHORIZED
        ) || matches!(self, AppError::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_postgrest_error_body() {
        let err = AppError::from_response(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":null,"hint":null}"#,
        );
        assert!(err.is_unique_violation());
        assert!(!err.is_not_found_row());
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn parses_auth_error_body() {
        let err = AppError::from_response(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.backend_code(), None);
        assert!(err.to_string().contains("Invalid login credentials"));
    }

    #[test]
    fn falls_back_to_raw_body() {
        let err = AppError::from_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.to_string().contains("upstream down"));

        let empty = AppError::from_response(StatusCode::UNAUTHORIZED, "");
        assert!(empty.is_unauthorized());
    }
}
