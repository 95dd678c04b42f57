#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative boundary types.
//!
//! Territories come in two nested levels: fine regions (neighborhood
//! councils, fetched and selected by id) and coarse regions (towns,
//! selected by name). The map keeps at most one region selected at a
//! time; [`RegionSelection`] makes "both selected" unrepresentable.

use civic_map_complaint_models::BoundingBox;
use geo::{BoundingRect, MultiPolygon};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Boundary granularity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TerritoryLevel {
    /// Neighborhood-level regions.
    Fine,
    /// District/town-level regions.
    Coarse,
}

impl TerritoryLevel {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Fine, Self::Coarse]
    }
}

/// The single selected region, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", content = "key", rename_all = "lowercase")]
pub enum RegionSelection {
    /// Nothing selected.
    #[default]
    None,
    /// A fine region, keyed by id.
    Fine(String),
    /// A coarse region, keyed by name.
    Coarse(String),
}

impl RegionSelection {
    /// Selected fine region id.
    #[must_use]
    pub fn fine_id(&self) -> Option<&str> {
        match self {
            Self::Fine(id) => Some(id),
            Self::None | Self::Coarse(_) => None,
        }
    }

    /// Selected coarse region name.
    #[must_use]
    pub fn coarse_name(&self) -> Option<&str> {
        match self {
            Self::Coarse(name) => Some(name),
            Self::None | Self::Fine(_) => None,
        }
    }

    /// Level of the selected region.
    #[must_use]
    pub const fn level(&self) -> Option<TerritoryLevel> {
        match self {
            Self::None => None,
            Self::Fine(_) => Some(TerritoryLevel::Fine),
            Self::Coarse(_) => Some(TerritoryLevel::Coarse),
        }
    }

    /// Whether a region is selected.
    #[must_use]
    pub const fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// One administrative region with its boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Territory {
    /// Backend identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Boundary level.
    pub level: TerritoryLevel,
    /// Enclosing coarse region name (fine regions only).
    pub parent_name: Option<String>,
    /// Polygon rings as `[lng, lat]`.
    pub boundary: MultiPolygon<f64>,
    /// Remaining record properties, passed through to selection callbacks.
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Territory {
    /// Key this territory is selected by: id for fine regions, name for
    /// coarse ones.
    #[must_use]
    pub fn selection_key(&self) -> &str {
        match self.level {
            TerritoryLevel::Fine => &self.id,
            TerritoryLevel::Coarse => &self.name,
        }
    }

    /// The selection that picks this territory.
    #[must_use]
    pub fn to_selection(&self) -> RegionSelection {
        match self.level {
            TerritoryLevel::Fine => RegionSelection::Fine(self.id.clone()),
            TerritoryLevel::Coarse => RegionSelection::Coarse(self.name.clone()),
        }
    }

    /// Whether `selection` picks this territory.
    #[must_use]
    pub fn is_selected_by(&self, selection: &RegionSelection) -> bool {
        selection.level() == Some(self.level)
            && match selection {
                RegionSelection::Fine(key) | RegionSelection::Coarse(key) => {
                    key == self.selection_key()
                }
                RegionSelection::None => false,
            }
    }

    /// Bounding box of the exterior ring of the first polygon only.
    ///
    /// Other polygons of a multipolygon and interior rings are ignored, so
    /// the box undershoots for disjoint regions. Use [`Self::bounds`] for
    /// the full extent.
    #[must_use]
    pub fn first_ring_bounds(&self) -> Option<BoundingBox> {
        let polygon = self.boundary.0.first()?;
        BoundingBox::from_lng_lat(polygon.exterior().coords().map(|c| (c.x, c.y)))
    }

    /// Bounding box over every ring of every polygon.
    #[must_use]
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.boundary
            .bounding_rect()
            .map(|rect| BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    /// Builds the payload handed to territory selection callbacks.
    #[must_use]
    pub fn select_event(&self) -> TerritorySelectEvent {
        TerritorySelectEvent {
            level: self.level,
            id: self.id.clone(),
            name: self.name.clone(),
            parent_name: self.parent_name.clone(),
            properties: self.properties.clone(),
        }
    }
}

/// Payload of a territory selection callback: `{type, id, name, ...props}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritorySelectEvent {
    /// Boundary level, serialized as `type`.
    #[serde(rename = "type")]
    pub level: TerritoryLevel,
    /// Region identifier.
    pub id: String,
    /// Region name.
    pub name: String,
    /// Enclosing coarse region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    /// Remaining record properties.
    #[serde(flatten)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon, polygon};

    fn territory(level: TerritoryLevel, boundary: MultiPolygon<f64>) -> Territory {
        Territory {
            id: "UC12".to_string(),
            name: "Saddar".to_string(),
            level,
            parent_name: None,
            boundary,
            properties: serde_json::Map::new(),
        }
    }

    fn two_squares() -> MultiPolygon<f64> {
        let first = polygon![
            (x: 67.0, y: 24.8),
            (x: 67.1, y: 24.8),
            (x: 67.1, y: 24.9),
            (x: 67.0, y: 24.9),
        ];
        let second = Polygon::new(
            LineString::from(vec![(67.5, 25.0), (67.6, 25.0), (67.6, 25.2), (67.5, 25.0)]),
            vec![],
        );
        MultiPolygon(vec![first, second])
    }

    #[test]
    fn first_ring_bounds_ignore_later_polygons() {
        let t = territory(TerritoryLevel::Fine, two_squares());
        assert_eq!(
            t.first_ring_bounds(),
            Some(BoundingBox::new(67.0, 24.8, 67.1, 24.9))
        );
        assert_eq!(t.bounds(), Some(BoundingBox::new(67.0, 24.8, 67.6, 25.2)));
    }

    #[test]
    fn empty_boundary_has_no_bounds() {
        let t = territory(TerritoryLevel::Fine, MultiPolygon(vec![]));
        assert!(t.first_ring_bounds().is_none());
        assert!(t.bounds().is_none());
    }

    #[test]
    fn selection_keys_follow_level() {
        let fine = territory(TerritoryLevel::Fine, two_squares());
        assert!(fine.is_selected_by(&RegionSelection::Fine("UC12".to_string())));
        assert!(!fine.is_selected_by(&RegionSelection::Coarse("UC12".to_string())));

        let coarse = territory(TerritoryLevel::Coarse, two_squares());
        assert!(coarse.is_selected_by(&RegionSelection::Coarse("Saddar".to_string())));
        assert!(!coarse.is_selected_by(&RegionSelection::Coarse("UC12".to_string())));
        assert!(!coarse.is_selected_by(&RegionSelection::None));
    }

    #[test]
    fn select_event_flattens_properties() {
        let mut t = territory(TerritoryLevel::Coarse, two_squares());
        t.properties
            .insert("population".to_string(), serde_json::json!(1200));
        let value = serde_json::to_value(t.select_event()).unwrap();
        assert_eq!(value["type"], "coarse");
        assert_eq!(value["name"], "Saddar");
        assert_eq!(value["population"], 1200);
        assert!(value.get("parentName").is_none());
    }
}
