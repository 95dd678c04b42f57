//! Category icons and boundary styles.

use civic_map_complaint_models::DEFAULT_CATEGORY;
use civic_map_territory_models::TerritoryLevel;
use serde::Serialize;

/// Marker icon edge length in pixels.
pub const MARKER_SIZE_PX: u32 = 30;

/// Marker icon edge length in pixels while selected.
pub const SELECTED_MARKER_SIZE_PX: u32 = 40;

/// Colour and glyph of one complaint category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryStyle {
    /// CSS colour.
    pub color: &'static str,
    /// Short symbol drawn inside the marker.
    pub glyph: &'static str,
}

/// Known categories, in legend order. The last entry is the fallback.
const CATEGORY_STYLES: &[(&str, CategoryStyle)] = &[
    ("Water", CategoryStyle { color: "#2563eb", glyph: "💧" }),
    ("Roads", CategoryStyle { color: "#ea580c", glyph: "🛣" }),
    ("Garbage", CategoryStyle { color: "#16a34a", glyph: "🗑" }),
    ("Electricity", CategoryStyle { color: "#eab308", glyph: "⚡" }),
    ("Drainage", CategoryStyle { color: "#0891b2", glyph: "🌊" }),
    ("Sewerage", CategoryStyle { color: "#7c3aed", glyph: "🚰" }),
    ("Street Lights", CategoryStyle { color: "#f59e0b", glyph: "💡" }),
    ("Parks", CategoryStyle { color: "#15803d", glyph: "🌳" }),
    (DEFAULT_CATEGORY, FALLBACK),
];

impl CategoryStyle {
    /// Style for `category`. Unknown categories use the fallback style.
    /// Matching ignores ASCII case.
    #[must_use]
    pub fn for_category(category: &str) -> Self {
        CATEGORY_STYLES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(category))
            .map_or(FALLBACK, |(_, style)| *style)
    }
}

const FALLBACK: CategoryStyle = CategoryStyle {
    color: "#6b7280",
    glyph: "📍",
};

/// One row of the map legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    /// Category label.
    pub category: &'static str,
    /// Colour and glyph.
    #[serde(flatten)]
    pub style: CategoryStyle,
}

/// Legend rows for every known category, fallback last.
#[must_use]
pub fn legend() -> Vec<LegendEntry> {
    CATEGORY_STYLES
        .iter()
        .map(|&(category, style)| LegendEntry { category, style })
        .collect()
}

/// Icon of one complaint marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerIcon {
    /// Category colour and glyph.
    pub style: CategoryStyle,
    /// Edge length in pixels.
    pub size_px: u32,
}

impl MarkerIcon {
    /// Icon for a complaint of `category`, enlarged when `selected`.
    #[must_use]
    pub fn new(category: &str, selected: bool) -> Self {
        Self {
            style: CategoryStyle::for_category(category),
            size_px: if selected {
                SELECTED_MARKER_SIZE_PX
            } else {
                MARKER_SIZE_PX
            },
        }
    }
}

/// Stroke and fill of one boundary polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryStyle {
    /// Outline colour.
    pub color: &'static str,
    /// Outline width in pixels.
    pub weight: f64,
    /// Fill opacity in `[0, 1]`.
    pub fill_opacity: f64,
}

impl BoundaryStyle {
    /// Style of a `level` polygon. Hovering raises stroke weight and fill
    /// opacity; selection raises them further and wins over hover.
    #[must_use]
    pub const fn new(level: TerritoryLevel, hovered: bool, selected: bool) -> Self {
        let color = match level {
            TerritoryLevel::Fine => "#3b82f6",
            TerritoryLevel::Coarse => "#8b5cf6",
        };
        let (weight, fill_opacity) = match (hovered, selected) {
            (_, true) => (4.0, 0.35),
            (true, false) => (3.0, 0.2),
            (false, false) => match level {
                TerritoryLevel::Fine => (1.0, 0.05),
                TerritoryLevel::Coarse => (2.0, 0.08),
            },
        };
        Self {
            color,
            weight,
            fill_opacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_categories_use_fallback() {
        let other = CategoryStyle::for_category(DEFAULT_CATEGORY);
        assert_eq!(CategoryStyle::for_category("Potholes on Mars"), other);
        assert_eq!(CategoryStyle::for_category("water").color, "#2563eb");
    }

    #[test]
    fn selected_markers_are_larger() {
        assert!(MarkerIcon::new("Water", true).size_px > MarkerIcon::new("Water", false).size_px);
    }

    #[test]
    fn boundary_emphasis_increases() {
        for level in TerritoryLevel::all() {
            let base = BoundaryStyle::new(*level, false, false);
            let hovered = BoundaryStyle::new(*level, true, false);
            let selected = BoundaryStyle::new(*level, false, true);
            assert!(base.weight < hovered.weight && hovered.weight < selected.weight);
            assert!(base.fill_opacity < hovered.fill_opacity);
            assert!(hovered.fill_opacity < selected.fill_opacity);
            assert_eq!(BoundaryStyle::new(*level, true, true), selected);
        }
    }

    #[test]
    fn legend_serializes_flat() {
        let entries = legend();
        assert_eq!(entries.last().map(|e| e.category), Some(DEFAULT_CATEGORY));
        let value = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(value["category"], "Water");
        assert_eq!(value["color"], "#2563eb");
    }
}
