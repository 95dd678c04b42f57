#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Complaint record types shared across the civic map engine.
//!
//! A [`Complaint`] is the normalized form of a single citizen report as
//! returned by the backend. Records are immutable once fetched; the
//! complaint store replaces its whole collection on every successful
//! fetch. Missing categorical fields are never rejected, they resolve to
//! the defaults exposed here ([`DEFAULT_CATEGORY`], [`ComplaintStatus::Reported`]
//! and [`DEFAULT_SEVERITY`]).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Category label used when a record carries none.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Severity assumed for records without one.
pub const DEFAULT_SEVERITY: u8 = 5;

/// Lowest valid severity.
pub const MIN_SEVERITY: u8 = 1;

/// Highest valid severity.
pub const MAX_SEVERITY: u8 = 10;

/// Clamps an arbitrary integer into the `1..=10` severity scale.
#[must_use]
pub fn clamp_severity(value: i64) -> u8 {
    let clamped = value.clamp(i64::from(MIN_SEVERITY), i64::from(MAX_SEVERITY));
    u8::try_from(clamped).unwrap_or(DEFAULT_SEVERITY)
}

/// Lifecycle status of a complaint.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComplaintStatus {
    /// Newly submitted, not yet triaged.
    #[default]
    Reported,
    /// Acknowledged and waiting for assignment.
    Pending,
    /// Work has started.
    InProgress,
    /// Fixed.
    Resolved,
    /// Closed without further action.
    Closed,
}

impl ComplaintStatus {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Reported,
            Self::Pending,
            Self::InProgress,
            Self::Resolved,
            Self::Closed,
        ]
    }

    /// Parses a status as the backend spells it.
    ///
    /// Case, surrounding whitespace, and `-`/space separators are
    /// tolerated (`"In Progress"`, `"in-progress"` and `"in_progress"` all
    /// resolve to [`Self::InProgress`]). Unknown values yield `None`.
    #[must_use]
    pub fn from_raw(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        normalized.parse().ok()
    }
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinates {
    /// Creates a position from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside the WGS84 range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Smallest box containing every `(lng, lat)` pair, or `None` for an
    /// empty iterator.
    pub fn from_lng_lat<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        points.into_iter().fold(None, |acc, (lng, lat)| {
            Some(match acc {
                None => Self::new(lng, lat, lng, lat),
                Some(b) => Self::new(
                    b.west.min(lng),
                    b.south.min(lat),
                    b.east.max(lng),
                    b.north.max(lat),
                ),
            })
        })
    }

    /// Whether `point` lies inside the box, edges included.
    #[must_use]
    pub fn contains(&self, point: &Coordinates) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lng >= self.west
            && point.lng <= self.east
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            f64::midpoint(self.south, self.north),
            f64::midpoint(self.west, self.east),
        )
    }
}

/// A `(lat, lng, intensity)` triple used to render point density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Weight in `0.0..=1.0`.
    pub intensity: f64,
}

impl HeatmapPoint {
    /// Returns the point as `[lat, lng, intensity]`.
    #[must_use]
    pub const fn as_triple(&self) -> [f64; 3] {
        [self.lat, self.lng, self.intensity]
    }
}

/// A citizen complaint as normalized from a backend response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    /// Backend identifier.
    pub id: String,
    /// Position, if the record carried a usable one.
    pub coordinates: Option<Coordinates>,
    /// Primary category label.
    pub category: Option<String>,
    /// Lifecycle status.
    pub status: Option<ComplaintStatus>,
    /// Status text the backend sent that matches no known status.
    pub unrecognized_status: Option<String>,
    /// Severity on the `1..=10` scale.
    pub severity: Option<u8>,
    /// Free-text description.
    pub description: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Submission time.
    pub created_at: Option<DateTime<Utc>>,
    /// Fine-grained region identifier.
    pub region_id: Option<String>,
    /// Fine-grained region display name.
    pub region_name: Option<String>,
    /// Coarse-grained region (town) name.
    pub town: Option<String>,
}

impl Complaint {
    /// Creates a complaint carrying only an id; every other field is unset.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            coordinates: None,
            category: None,
            status: None,
            unrecognized_status: None,
            severity: None,
            description: None,
            address: None,
            created_at: None,
            region_id: None,
            region_name: None,
            town: None,
        }
    }

    /// Category label, falling back to [`DEFAULT_CATEGORY`].
    #[must_use]
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }

    /// Status, falling back to [`ComplaintStatus::Reported`].
    #[must_use]
    pub fn status_or_default(&self) -> ComplaintStatus {
        self.status.unwrap_or_default()
    }

    /// Status name for display and counting: the known status, else the
    /// backend's own text, else `reported`.
    #[must_use]
    pub fn status_label(&self) -> String {
        match (&self.status, &self.unrecognized_status) {
            (Some(status), _) => status.to_string(),
            (None, Some(raw)) => raw.clone(),
            (None, None) => ComplaintStatus::default().to_string(),
        }
    }

    /// Severity, falling back to [`DEFAULT_SEVERITY`].
    #[must_use]
    pub fn effective_severity(&self) -> u8 {
        self.severity.unwrap_or(DEFAULT_SEVERITY)
    }

    /// Coordinates, only when they are finite and in range.
    #[must_use]
    pub fn valid_coordinates(&self) -> Option<Coordinates> {
        self.coordinates.filter(Coordinates::is_valid)
    }

    /// Heatmap weight for this record: `severity / 10`.
    ///
    /// Returns `None` when the record has no usable position.
    #[must_use]
    pub fn heatmap_point(&self) -> Option<HeatmapPoint> {
        let coords = self.valid_coordinates()?;
        Some(HeatmapPoint {
            lat: coords.lat,
            lng: coords.lng,
            intensity: f64::from(self.effective_severity()) / 10.0,
        })
    }
}

/// Aggregate counts over one complaint collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStats {
    /// Number of complaints.
    pub total: u64,
    /// Count per category label.
    pub by_category: BTreeMap<String, u64>,
    /// Count per status name.
    pub by_status: BTreeMap<String, u64>,
}

impl DerivedStats {
    /// Computes stats over `complaints`, applying the category and status
    /// defaults to records that lack them. Unrecognized statuses are
    /// counted under the backend's own text.
    #[must_use]
    pub fn from_complaints(complaints: &[Complaint]) -> Self {
        let mut stats = Self::default();
        for complaint in complaints {
            stats.total += 1;
            *stats
                .by_category
                .entry(complaint.category_label().to_string())
                .or_insert(0) += 1;
            *stats
                .by_status
                .entry(complaint.status_label())
                .or_insert(0) += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located(id: &str, severity: Option<u8>) -> Complaint {
        let mut c = Complaint::new(id);
        c.coordinates = Some(Coordinates::new(24.9, 67.0));
        c.severity = severity;
        c
    }

    #[test]
    fn heat_intensity_stays_in_range() {
        for severity in MIN_SEVERITY..=MAX_SEVERITY {
            let point = located("a", Some(severity)).heatmap_point().unwrap();
            assert!(
                (0.1..=1.0).contains(&point.intensity),
                "severity {severity} gave intensity {}",
                point.intensity
            );
        }
    }

    #[test]
    fn missing_severity_weighs_half() {
        let point = located("a", None).heatmap_point().unwrap();
        assert!((point.intensity - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_coordinates_have_no_heat_point() {
        let mut c = Complaint::new("nan");
        c.coordinates = Some(Coordinates::new(f64::NAN, 67.0));
        assert!(c.heatmap_point().is_none());

        c.coordinates = Some(Coordinates::new(91.0, 67.0));
        assert!(c.heatmap_point().is_none());

        assert!(Complaint::new("none").heatmap_point().is_none());
    }

    #[test]
    fn stats_apply_defaults() {
        let mut water = Complaint::new("1");
        water.category = Some("Water".to_string());
        water.status = Some(ComplaintStatus::Resolved);
        let bare = Complaint::new("2");

        let stats = DerivedStats::from_complaints(&[water, bare]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_category.get("Water"), Some(&1));
        assert_eq!(stats.by_category.get(DEFAULT_CATEGORY), Some(&1));
        assert_eq!(stats.by_status.get("resolved"), Some(&1));
        assert_eq!(stats.by_status.get("reported"), Some(&1));
    }

    #[test]
    fn stats_count_unrecognized_status_under_its_own_name() {
        let mut rejected = Complaint::new("1");
        rejected.unrecognized_status = Some("rejected".to_string());
        let stats = DerivedStats::from_complaints(&[rejected, Complaint::new("2")]);
        assert_eq!(stats.by_status.get("rejected"), Some(&1));
        assert_eq!(stats.by_status.get("reported"), Some(&1));
    }

    #[test]
    fn status_parsing_is_lenient() {
        assert_eq!(
            ComplaintStatus::from_raw("In Progress"),
            Some(ComplaintStatus::InProgress)
        );
        assert_eq!(
            ComplaintStatus::from_raw(" in-progress "),
            Some(ComplaintStatus::InProgress)
        );
        assert_eq!(
            ComplaintStatus::from_raw("CLOSED"),
            Some(ComplaintStatus::Closed)
        );
        assert_eq!(ComplaintStatus::from_raw("archived"), None);
    }

    #[test]
    fn severity_clamps_to_scale() {
        assert_eq!(clamp_severity(-3), MIN_SEVERITY);
        assert_eq!(clamp_severity(0), MIN_SEVERITY);
        assert_eq!(clamp_severity(7), 7);
        assert_eq!(clamp_severity(42), MAX_SEVERITY);
    }

    #[test]
    fn bounding_box_contains_edges() {
        let bbox = BoundingBox::new(66.0, 24.0, 68.0, 26.0);
        assert!(bbox.contains(&Coordinates::new(24.0, 66.0)));
        assert!(bbox.contains(&Coordinates::new(25.0, 67.0)));
        assert!(!bbox.contains(&Coordinates::new(26.1, 67.0)));
        assert!(!bbox.contains(&Coordinates::new(25.0, 65.9)));
    }

    #[test]
    fn bounding_box_from_points() {
        let bbox =
            BoundingBox::from_lng_lat([(67.0, 24.9), (67.2, 24.8), (66.9, 25.1)]).unwrap();
        assert_eq!(bbox, BoundingBox::new(66.9, 24.8, 67.2, 25.1));
        assert!(BoundingBox::from_lng_lat(std::iter::empty()).is_none());
    }
}
