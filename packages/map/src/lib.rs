#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map orchestrator.
//!
//! [`MapOrchestrator`] owns the filter state, layer visibility and
//! viewport, drives the complaint and territory stores, and redraws the
//! render layers whenever any of them changes. The embedding page talks
//! to the map only through it: filter actions and layer toggles in,
//! selection callbacks and derived views out.

pub mod config;
pub mod orchestrator;
pub mod viewport;

pub use config::{ConfigError, EngineConfig, MapSettings};
pub use orchestrator::{ErrorBanner, MapOrchestrator};
pub use viewport::Viewport;
