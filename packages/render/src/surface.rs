//! The drawing surface the renderers target.

use std::collections::BTreeMap;

use civic_map_complaint_models::{BoundingBox, HeatmapPoint};
use civic_map_territory_models::TerritoryLevel;
use geo::MultiPolygon;

use crate::heatmap::HeatmapOptions;
use crate::markers::MarkerItem;
use crate::style::BoundaryStyle;

/// Handle of an overlay added to a surface.
pub type OverlayId = u64;

/// One polygon feature of a boundary overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    /// Selection key (id for fine regions, name for coarse ones).
    pub key: String,
    /// Display name, used for tooltips.
    pub name: String,
    /// Polygon rings as `[lng, lat]`.
    pub boundary: MultiPolygon<f64>,
    /// Initial style.
    pub style: BoundaryStyle,
}

/// Something a renderer draws.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// Complaint markers and clusters.
    Markers(Vec<MarkerItem>),
    /// Density heatmap.
    Heatmap {
        /// Weighted points.
        points: Vec<HeatmapPoint>,
        /// Rendering options.
        options: HeatmapOptions,
    },
    /// Region polygons of one level.
    Boundaries {
        /// Level drawn.
        level: TerritoryLevel,
        /// Features, addressed by index in [`MapSurface::restyle`].
        features: Vec<BoundaryFeature>,
    },
}

/// A map widget the renderers can draw on.
///
/// Implementations own the overlays; renderers only hold their ids.
pub trait MapSurface {
    /// Adds `overlay` and returns its handle.
    fn add_overlay(&mut self, overlay: Overlay) -> OverlayId;

    /// Removes an overlay. Returns `false` if `id` was not present.
    fn remove_overlay(&mut self, id: OverlayId) -> bool;

    /// Changes the style of one feature of a boundary overlay.
    fn restyle(&mut self, id: OverlayId, feature: usize, style: BoundaryStyle);

    /// Moves the viewport so `bounds` is fully visible.
    fn fit_bounds(&mut self, bounds: BoundingBox);
}

/// A [`MapSurface`] that records what was drawn, for headless use.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    next_id: OverlayId,
    overlays: BTreeMap<OverlayId, Overlay>,
    fits: Vec<BoundingBox>,
    restyles: usize,
}

impl RecordingSurface {
    /// Creates an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlays currently on the surface, in insertion order.
    pub fn overlays(&self) -> impl Iterator<Item = (OverlayId, &Overlay)> {
        self.overlays.iter().map(|(id, overlay)| (*id, overlay))
    }

    /// Overlay with handle `id`.
    #[must_use]
    pub fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(&id)
    }

    /// Number of overlays currently on the surface.
    #[must_use]
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// Number of heatmap overlays currently on the surface.
    #[must_use]
    pub fn heatmap_count(&self) -> usize {
        self.overlays
            .values()
            .filter(|o| matches!(o, Overlay::Heatmap { .. }))
            .count()
    }

    /// Number of marker overlays currently on the surface.
    #[must_use]
    pub fn marker_overlay_count(&self) -> usize {
        self.overlays
            .values()
            .filter(|o| matches!(o, Overlay::Markers(_)))
            .count()
    }

    /// Number of boundary overlays of `level` currently on the surface.
    #[must_use]
    pub fn boundary_count(&self, level: TerritoryLevel) -> usize {
        self.overlays
            .values()
            .filter(|o| matches!(o, Overlay::Boundaries { level: l, .. } if *l == level))
            .count()
    }

    /// Every bounds passed to [`MapSurface::fit_bounds`], oldest first.
    #[must_use]
    pub fn fits(&self) -> &[BoundingBox] {
        &self.fits
    }

    /// Total number of restyle calls.
    #[must_use]
    pub const fn restyle_count(&self) -> usize {
        self.restyles
    }
}

impl MapSurface for RecordingSurface {
    fn add_overlay(&mut self, overlay: Overlay) -> OverlayId {
        self.next_id += 1;
        self.overlays.insert(self.next_id, overlay);
        self.next_id
    }

    fn remove_overlay(&mut self, id: OverlayId) -> bool {
        self.overlays.remove(&id).is_some()
    }

    fn restyle(&mut self, id: OverlayId, feature: usize, style: BoundaryStyle) {
        if let Some(Overlay::Boundaries { features, .. }) = self.overlays.get_mut(&id) {
            if let Some(f) = features.get_mut(feature) {
                f.style = style;
                self.restyles += 1;
            }
        }
    }

    fn fit_bounds(&mut self, bounds: BoundingBox) {
        self.fits.push(bounds);
    }
}
