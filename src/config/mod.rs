use std::env;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use secrecy::SecretString;
use validator::Validate;

use crate::errors::AppError;

pub mod dashboards;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Validate)]
pub struct AppConfig {
    #[validate(url)]
    pub api_base_url: String,
    pub storage_path: PathBuf,
    pub export_dir: PathBuf,
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
    #[validate(range(max = 5000))]
    pub search_debounce_ms: u64,
    #[validate(length(min = 1))]
    pub dashboard: String,
    /// Seeded into client storage at startup when set.
    pub api_token: Option<SecretString>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let config = Self {
            api_base_url: env::var("API_BASE_URL")
                .map_err(|_| AppError::Config("API_BASE_URL must be set".to_string()))?,
            storage_path: env::var("PROPDESK_STORAGE")
                .unwrap_or_else(|_| ".propdesk/storage.json".to_string())
                .into(),
            export_dir: env::var("EXPORT_DIR")
                .unwrap_or_else(|_| ".".to_string())
                .into(),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            search_debounce_ms: env::var("SEARCH_DEBOUNCE_MS")
                .unwrap_or_else(|_| "400".to_string())
                .parse()
                .unwrap_or(400),
            dashboard: env::var("DASHBOARD").unwrap_or_else(|_| "club_memberships".to_string()),
            api_token: env::var("API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty())
                .map(SecretString::from),
        };
        config
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Base URL with a trailing slash so relative joins keep its path.
    pub fn base_url(&self) -> Result<Url, AppError> {
        let mut raw = self.api_base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| AppError::Config(format!("API_BASE_URL: {e}")))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Settings for tests and embedding: defaults with the given base URL.
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            storage_path: PathBuf::from(".propdesk/storage.json"),
            export_dir: PathBuf::from("."),
            request_timeout_secs: 30,
            search_debounce_ms: 400,
            dashboard: "club_memberships".to_string(),
            api_token: None,
        }
    }
}
