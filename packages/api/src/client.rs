//! `reqwest` implementation of [`ComplaintBackend`].

use std::time::Duration;

use async_trait::async_trait;
use civic_map_filter::ApiParams;
use civic_map_territory_models::TerritoryLevel;

use crate::config::BackendConfig;
use crate::{ApiError, ComplaintBackend, retry};

/// Talks to the complaint backend over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the base URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: BackendConfig) -> Result<Self, ApiError> {
        config.endpoint("")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("civic-map/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn get_json<Q>(&self, path: &str, query: &Q) -> Result<serde_json::Value, ApiError>
    where
        Q: serde::Serialize + Sync + ?Sized,
    {
        let url = self.config.endpoint(path)?;
        log::debug!("GET {url}");
        retry::send_json(
            || {
                let request = self.client.get(&url).query(query);
                match &self.config.auth_token {
                    Some(token) => request.bearer_auth(token),
                    None => request,
                }
            },
            self.config.max_retries,
        )
        .await
    }
}

#[async_trait]
impl ComplaintBackend for HttpBackend {
    async fn fetch_complaints(&self, params: &ApiParams) -> Result<serde_json::Value, ApiError> {
        self.get_json("complaints", params).await
    }

    async fn fetch_heatmap(&self, params: &ApiParams) -> Result<serde_json::Value, ApiError> {
        self.get_json("complaints/heatmap", params).await
    }

    async fn fetch_territories(
        &self,
        level: TerritoryLevel,
        city: &str,
    ) -> Result<serde_json::Value, ApiError> {
        self.get_json("territories", &[("level", level.as_ref()), ("city", city)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        let config = BackendConfig {
            base_url: "not a url".to_string(),
            ..BackendConfig::default()
        };
        assert!(matches!(
            HttpBackend::new(config),
            Err(ApiError::Config { .. })
        ));
    }

    #[test]
    fn builds_with_defaults() {
        let backend = HttpBackend::new(BackendConfig::default()).unwrap();
        assert_eq!(backend.config().city, "Karachi");
    }
}
