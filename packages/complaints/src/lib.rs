#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Complaint data store.
//!
//! Fetches complaint records for the current filter, normalizes the
//! backend's varying record shapes into [`Complaint`] values, and keeps
//! the derived statistics and heatmap weights in step with the
//! collection. A failed fetch never clears what is already loaded.
//!
//! [`Complaint`]: civic_map_complaint_models::Complaint

pub mod normalize;
pub mod store;

pub use store::{ComplaintStore, DEFAULT_DEBOUNCE, FetchError, FetchOutcome};
