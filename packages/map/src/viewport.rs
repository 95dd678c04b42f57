//! The visible map area.

use civic_map_complaint_models::{BoundingBox, Coordinates};
use serde::{Deserialize, Serialize};

/// Current viewport bounds and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Visible area.
    pub bounds: BoundingBox,
    /// Zoom level (0 = whole world).
    pub zoom: f64,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(bounds: BoundingBox, zoom: f64) -> Self {
        Self { bounds, zoom }
    }

    /// Centre of the visible area.
    #[must_use]
    pub fn center(&self) -> Coordinates {
        self.bounds.center()
    }
}

impl Default for Viewport {
    /// Central Karachi at city zoom.
    fn default() -> Self {
        Self::new(BoundingBox::new(66.9, 24.75, 67.25, 25.05), 11.0)
    }
}
