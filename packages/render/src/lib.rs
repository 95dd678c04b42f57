#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map renderers.
//!
//! Three independent layers draw onto a [`MapSurface`]:
//!
//! * [`MarkerLayer`]: one icon per complaint, grouped into clusters when
//!   there are many points and the map is zoomed out.
//! * [`HeatmapLayer`]: a density overlay built from heatmap weights.
//! * [`BoundaryLayer`]: fine or coarse region polygons with hover and
//!   selection styling.
//!
//! Each layer remembers the overlay it added and removes it before adding
//! a replacement, so repeated toggling never leaves duplicates behind.
//! Layers never mutate complaint, territory or filter state; they are
//! handed read-only snapshots.

pub mod boundaries;
pub mod cluster;
pub mod heatmap;
pub mod markers;
pub mod style;
pub mod surface;

pub use boundaries::BoundaryLayer;
pub use cluster::{Cluster, ClusterConfig};
pub use heatmap::{HeatmapLayer, HeatmapOptions};
pub use markers::{Marker, MarkerItem, MarkerLayer, MarkerView};
pub use style::{BoundaryStyle, CategoryStyle, LegendEntry, MarkerIcon};
pub use surface::{BoundaryFeature, MapSurface, Overlay, OverlayId, RecordingSurface};
