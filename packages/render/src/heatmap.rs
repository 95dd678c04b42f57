//! The density heatmap layer.

use std::sync::Arc;

use civic_map_complaint_models::HeatmapPoint;
use serde::{Deserialize, Serialize};

use crate::surface::{MapSurface, Overlay, OverlayId};

/// Heatmap rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapOptions {
    /// Point radius in pixels.
    pub radius: f64,
    /// Blur radius in pixels.
    pub blur: f64,
    /// Zoom at which points reach full intensity.
    pub max_zoom: u8,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            radius: 25.0,
            blur: 15.0,
            max_zoom: 17,
        }
    }
}

/// The heatmap layer.
///
/// The overlay is built from a weight list snapshot and never mutated:
/// when the list changes (a different `Arc`) the old overlay is removed
/// and a new one added.
#[derive(Debug, Default)]
pub struct HeatmapLayer {
    options: HeatmapOptions,
    overlay: Option<OverlayId>,
    source: Option<Arc<Vec<HeatmapPoint>>>,
}

impl HeatmapLayer {
    /// Creates a hidden layer.
    #[must_use]
    pub const fn new(options: HeatmapOptions) -> Self {
        Self {
            options,
            overlay: None,
            source: None,
        }
    }

    /// Brings the surface in line with `visible` and `weights`.
    ///
    /// Idempotent: calling it again with the same arguments changes
    /// nothing. Returns `true` if the surface was touched.
    pub fn sync(
        &mut self,
        surface: &mut dyn MapSurface,
        visible: bool,
        weights: &Arc<Vec<HeatmapPoint>>,
    ) -> bool {
        if !visible {
            return self.clear(surface);
        }

        let unchanged = self.overlay.is_some()
            && self
                .source
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, weights));
        if unchanged {
            return false;
        }

        self.clear(surface);
        log::debug!("Building heatmap from {} weights", weights.len());
        self.overlay = Some(surface.add_overlay(Overlay::Heatmap {
            points: weights.as_ref().clone(),
            options: self.options,
        }));
        self.source = Some(Arc::clone(weights));
        true
    }

    /// Removes the overlay. Returns `true` if one was present.
    pub fn clear(&mut self, surface: &mut dyn MapSurface) -> bool {
        self.source = None;
        self.overlay
            .take()
            .is_some_and(|id| surface.remove_overlay(id))
    }

    /// Whether the heatmap is currently drawn.
    #[must_use]
    pub const fn is_shown(&self) -> bool {
        self.overlay.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;

    fn weights(n: u8) -> Arc<Vec<HeatmapPoint>> {
        Arc::new(
            (0..n)
                .map(|i| HeatmapPoint {
                    lat: 24.9,
                    lng: f64::from(i).mul_add(0.01, 67.0),
                    intensity: 0.5,
                })
                .collect(),
        )
    }

    #[test]
    fn repeated_toggling_leaves_one_overlay() {
        let mut surface = RecordingSurface::new();
        let mut layer = HeatmapLayer::default();
        let w = weights(3);

        for _ in 0..5 {
            layer.sync(&mut surface, true, &w);
            layer.sync(&mut surface, true, &w);
            assert_eq!(surface.heatmap_count(), 1);
            layer.sync(&mut surface, false, &w);
            assert_eq!(surface.heatmap_count(), 0);
        }
        assert!(!layer.clear(&mut surface));
    }

    #[test]
    fn same_weights_are_not_rebuilt() {
        let mut surface = RecordingSurface::new();
        let mut layer = HeatmapLayer::default();
        let w = weights(3);

        assert!(layer.sync(&mut surface, true, &w));
        assert!(!layer.sync(&mut surface, true, &Arc::clone(&w)));
        let (first_id, _) = surface.overlays().next().unwrap();

        let replaced = weights(2);
        assert!(layer.sync(&mut surface, true, &replaced));
        assert_eq!(surface.heatmap_count(), 1);
        let (id, overlay) = surface.overlays().next().unwrap();
        assert_ne!(id, first_id);
        assert!(matches!(overlay, Overlay::Heatmap { points, .. } if points.len() == 2));
    }
}
