#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filter state manager for the civic map.
//!
//! [`FilterState`] and [`LayerVisibility`] are plain values. Every change
//! goes through a transition that consumes the old state and returns the
//! new one (see [`FilterAction`]), so renderers only ever see snapshots.
//!
//! Server query construction ([`FilterState::to_api_params`]) and
//! client-side refinement ([`EffectivePredicate::refine`]) are both
//! derived from the same [`EffectivePredicate`], which keeps the two in
//! agreement.

pub mod action;
pub mod params;
pub mod predicate;
pub mod state;

pub use action::FilterAction;
pub use params::ApiParams;
pub use predicate::EffectivePredicate;
pub use state::{DateRange, FilterOverrides, FilterState, Layer, LayerVisibility, SeverityRange};
