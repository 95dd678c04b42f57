//! Filter and layer visibility state.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use civic_map_complaint_models::{ComplaintStatus, MAX_SEVERITY, MIN_SEVERITY, clamp_severity};
use civic_map_territory_models::RegionSelection;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Inclusive severity bounds.
///
/// Both ends are kept inside `1..=10`, but `min > max` is representable:
/// independent slider edits may cross, and reordering is left to the
/// control that owns the sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityRange {
    /// Lower bound.
    pub min: u8,
    /// Upper bound.
    pub max: u8,
}

impl Default for SeverityRange {
    fn default() -> Self {
        Self {
            min: MIN_SEVERITY,
            max: MAX_SEVERITY,
        }
    }
}

impl SeverityRange {
    /// Clamps each bound to `1..=10` independently.
    #[must_use]
    pub fn clamped(min: i64, max: i64) -> Self {
        Self {
            min: clamp_severity(min),
            max: clamp_severity(max),
        }
    }

    /// Whether either bound differs from the full scale.
    #[must_use]
    pub fn is_narrowed(&self) -> bool {
        *self != Self::default()
    }

    /// Whether `severity` lies inside the bounds.
    #[must_use]
    pub const fn contains(&self, severity: u8) -> bool {
        self.min <= severity && severity <= self.max
    }
}

/// Optional submission date bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included.
    pub from: Option<NaiveDate>,
    /// Last day included.
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Whether any bound is set.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }
}

/// The multi-dimensional complaint filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// Selected category labels.
    pub categories: BTreeSet<String>,
    /// Selected status names.
    pub statuses: BTreeSet<String>,
    /// Severity bounds.
    pub severity: SeverityRange,
    /// Submission date bounds.
    pub date_range: DateRange,
    /// Selected region.
    pub region: RegionSelection,
    /// Free-text search.
    pub search_query: String,
}

impl FilterState {
    /// Whether any filter group differs from the defaults.
    #[must_use]
    pub fn has_active_filters(&self) -> bool {
        self.active_filter_count() > 0
    }

    /// Number of non-default filter groups (categories, status, severity,
    /// date, region, search), at most six.
    #[must_use]
    pub fn active_filter_count(&self) -> usize {
        [
            !self.categories.is_empty(),
            !self.statuses.is_empty(),
            self.severity.is_narrowed(),
            self.date_range.is_set(),
            self.region.is_some(),
            !self.search_query.trim().is_empty(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }
}

/// A toggleable map layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Layer {
    /// Point markers.
    Markers,
    /// Density heatmap.
    Heatmap,
    /// Fine region outlines.
    FineBoundaries,
    /// Coarse region outlines.
    CoarseBoundaries,
    /// Marker clustering.
    Clustering,
}

/// Independent on/off flags for each layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerVisibility {
    /// Point markers.
    pub markers: bool,
    /// Density heatmap.
    pub heatmap: bool,
    /// Fine region outlines.
    pub fine_boundaries: bool,
    /// Coarse region outlines.
    pub coarse_boundaries: bool,
    /// Marker clustering.
    pub clustering: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            markers: true,
            heatmap: false,
            fine_boundaries: false,
            coarse_boundaries: false,
            clustering: true,
        }
    }
}

impl LayerVisibility {
    /// Flips one flag.
    #[must_use]
    pub fn toggle(mut self, layer: Layer) -> Self {
        let flag = self.flag_mut(layer);
        *flag = !*flag;
        self
    }

    /// Reads one flag.
    #[must_use]
    pub const fn is_enabled(&self, layer: Layer) -> bool {
        match layer {
            Layer::Markers => self.markers,
            Layer::Heatmap => self.heatmap,
            Layer::FineBoundaries => self.fine_boundaries,
            Layer::CoarseBoundaries => self.coarse_boundaries,
            Layer::Clustering => self.clustering,
        }
    }

    fn flag_mut(&mut self, layer: Layer) -> &mut bool {
        match layer {
            Layer::Markers => &mut self.markers,
            Layer::Heatmap => &mut self.heatmap,
            Layer::FineBoundaries => &mut self.fine_boundaries,
            Layer::CoarseBoundaries => &mut self.coarse_boundaries,
            Layer::Clustering => &mut self.clustering,
        }
    }
}

/// Caller-supplied initial filters, merged over [`FilterState::default`].
///
/// Every field is optional; unset fields keep the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOverrides {
    /// Initially selected categories.
    pub categories: Option<Vec<String>>,
    /// Initially selected statuses.
    pub statuses: Option<Vec<String>>,
    /// Lower severity bound.
    pub severity_min: Option<i64>,
    /// Upper severity bound.
    pub severity_max: Option<i64>,
    /// First submission day.
    pub date_from: Option<NaiveDate>,
    /// Last submission day.
    pub date_to: Option<NaiveDate>,
    /// Selected fine region id.
    pub region_fine: Option<String>,
    /// Selected coarse region name.
    pub region_coarse: Option<String>,
    /// Free-text search.
    pub search: Option<String>,
}

impl FilterOverrides {
    /// Applies the overrides to the built-in defaults through the regular
    /// transitions, so the usual invariants hold. When both regions are
    /// given the coarse one wins, as it is applied last.
    #[must_use]
    pub fn into_state(self) -> FilterState {
        let mut state = FilterState::default();
        for category in self.categories.unwrap_or_default() {
            if !state.categories.contains(&category) {
                state = state.toggle_category(category);
            }
        }
        for status in self.statuses.unwrap_or_default() {
            let present = ComplaintStatus::from_raw(&status)
                .is_some_and(|known| state.statuses.contains(known.as_ref()));
            if !present {
                state = state.toggle_status(status);
            }
        }
        if self.severity_min.is_some() || self.severity_max.is_some() {
            let defaults = SeverityRange::default();
            state = state.set_severity_range(
                self.severity_min.unwrap_or_else(|| i64::from(defaults.min)),
                self.severity_max.unwrap_or_else(|| i64::from(defaults.max)),
            );
        }
        state = state.set_date_range(self.date_from, self.date_to);
        if let Some(id) = self.region_fine {
            state = state.set_region_fine(id);
        }
        if let Some(name) = self.region_coarse {
            state = state.set_region_coarse(name);
        }
        if let Some(search) = self.search {
            state = state.set_search_query(search);
        }
        state
    }
}
