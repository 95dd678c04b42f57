#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Territory store.
//!
//! Fetches the fine and coarse boundary collections, converts whatever
//! geometry encoding the backend returns into [`geo::MultiPolygon`]s, and
//! caches each level until it is explicitly refreshed.
//!
//! The store does not own a region selection. Lookups take the caller's
//! [`RegionSelection`] so there is only ever one copy of it.
//!
//! [`RegionSelection`]: civic_map_territory_models::RegionSelection

pub mod normalize;
pub mod store;

use civic_map_api::ApiError;
use civic_map_territory_models::TerritoryLevel;

pub use store::TerritoryStore;

/// Errors that can occur while loading territories.
#[derive(Debug, thiserror::Error)]
pub enum TerritoryError {
    /// The backend request for one level failed.
    #[error("Failed to load {level} territories: {source}")]
    Fetch {
        /// Level that failed.
        level: TerritoryLevel,
        /// Underlying backend error.
        #[source]
        source: ApiError,
    },
}

impl TerritoryError {
    /// Whether repeating the request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch { source, .. } => source.is_retryable(),
        }
    }
}
