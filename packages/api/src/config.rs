//! Backend connection settings.

use serde::{Deserialize, Serialize};

use crate::ApiError;

/// Environment variable overriding [`BackendConfig::base_url`].
pub const API_URL_ENV: &str = "CIVIC_MAP_API_URL";
/// Environment variable overriding [`BackendConfig::city`].
pub const CITY_ENV: &str = "CIVIC_MAP_CITY";
/// Environment variable overriding [`BackendConfig::auth_token`].
pub const API_TOKEN_ENV: &str = "CIVIC_MAP_API_TOKEN";

/// How to reach the complaint backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// API root, e.g. `"https://example.org/api"`. Endpoint paths are
    /// appended to it.
    pub base_url: String,
    /// City passed to the territory endpoint.
    pub city: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries for transient failures (connection errors, 429, 5xx).
    pub max_retries: u32,
    /// Bearer token sent with every request.
    pub auth_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            city: "Karachi".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            auth_token: None,
        }
    }
}

impl BackendConfig {
    /// Applies `CIVIC_MAP_API_URL`, `CIVIC_MAP_CITY` and
    /// `CIVIC_MAP_API_TOKEN` when set.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            self.base_url = url;
        }
        if let Ok(city) = std::env::var(CITY_ENV) {
            self.city = city;
        }
        if let Ok(token) = std::env::var(API_TOKEN_ENV) {
            self.auth_token = Some(token);
        }
        self
    }

    /// Full URL for an endpoint path relative to [`Self::base_url`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the base URL is empty or not HTTP.
    pub fn endpoint(&self, path: &str) -> Result<String, ApiError> {
        let base = self.base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ApiError::Config {
                message: format!("base_url must be an http(s) URL, got {:?}", self.base_url),
            });
        }
        Ok(format!("{base}/{}", path.trim_start_matches('/')))
    }
}
