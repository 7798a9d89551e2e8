use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::{AppError, Result};

const APP_DIR: &str = "benchfeed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the hosted backend, e.g. `https://xyz.example.co`
    #[serde(default)]
    pub backend_url: Option<String>,

    pub anon_key: Option<String>,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How long a cached read may be served before it is fetched again
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Origin used for collection share links; falls back to `backend_url`
    pub share_base_url: Option<String>,

    #[serde(default = "default_session_path")]
    pub session_path: String,
}

fn data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir
}

fn default_session_path() -> String {
    data_dir().join("session.json").to_string_lossy().to_string()
}

fn default_page_size() -> u32 {
    12
}

fn default_request_timeout() -> u64 {
    30
}

fn default_cache_ttl() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            anon_key: None,
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            share_base_url: None,
            session_path: default_session_path(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env();
        Ok(config)
    }

    /// Read the config at `path`, writing defaults there if it does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("BENCHFEED_BACKEND_URL") {
            if !url.trim().is_empty() {
                self.backend_url = Some(url);
            }
        }
        if let Ok(key) = std::env::var("BENCHFEED_ANON_KEY") {
            if !key.trim().is_empty() {
                self.anon_key = Some(key);
            }
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    pub fn log_path() -> PathBuf {
        data_dir().join("benchfeed.log")
    }

    /// Parsed backend URL; every remote call needs one.
    pub fn backend(&self) -> Result<Url> {
        let raw = self
            .backend_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "backend_url is not set; add it to {}",
                    Self::config_path().display()
                ))
            })?;
        Url::parse(raw).map_err(|e| AppError::Config(format!("invalid backend_url: {e}")))
    }

    pub fn share_base(&self) -> Result<Url> {
        match self.share_base_url.as_deref() {
            Some(raw) => {
                Url::parse(raw).map_err(|e| AppError::Config(format!("invalid share_base_url: {e}")))
            }
            None => self.backend(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.max(1))
    }

    pub fn page_size(&self) -> usize {
        self.page_size.max(1) as usize
    }
}
