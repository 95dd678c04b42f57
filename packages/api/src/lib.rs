#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Backend client for the civic map engine.
//!
//! The engine talks to the complaint backend through the
//! [`ComplaintBackend`] trait. Implementations return raw JSON so that
//! shape normalization lives with the stores that own the data;
//! [`envelope`] holds the unwrapping rules both stores share.
//! [`client::HttpBackend`] is the `reqwest` implementation.

pub mod client;
pub mod config;
pub mod envelope;
pub mod retry;

use async_trait::async_trait;
use civic_map_filter::ApiParams;
use civic_map_territory_models::TerritoryLevel;

pub use client::HttpBackend;
pub use config::BackendConfig;

/// Errors that can occur while talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Short description.
        message: String,
    },

    /// Invalid client configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

impl ApiError {
    /// Whether repeating the same request may succeed.
    ///
    /// Transport failures, rate limiting and server errors are retryable;
    /// client errors and malformed configuration are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => retry::is_transient(e),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Json(_) | Self::Config { .. } => false,
        }
    }
}

/// The remote operations the engine consumes.
#[async_trait]
pub trait ComplaintBackend: Send + Sync {
    /// `GET complaints?{filters}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not JSON.
    async fn fetch_complaints(&self, params: &ApiParams) -> Result<serde_json::Value, ApiError>;

    /// `GET complaints/heatmap?{filters}`, a list of
    /// `[lat, lng, intensity]` triples.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not JSON.
    async fn fetch_heatmap(&self, params: &ApiParams) -> Result<serde_json::Value, ApiError>;

    /// `GET territories?level={fine|coarse}&city={name}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not JSON.
    async fn fetch_territories(
        &self,
        level: TerritoryLevel,
        city: &str,
    ) -> Result<serde_json::Value, ApiError>;
}
