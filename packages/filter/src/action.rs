//! State transitions over [`FilterState`].
//!
//! Each transition consumes the current state and returns the next one.
//! [`FilterAction`] names the same transitions as data so callers can
//! queue or log them and feed them through [`FilterState::apply`].

use chrono::NaiveDate;
use civic_map_complaint_models::ComplaintStatus;
use civic_map_territory_models::RegionSelection;

use crate::state::{DateRange, FilterState, SeverityRange};

/// A single filter transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    /// Add the category if absent, remove it if present.
    ToggleCategory(String),
    /// Add the status if absent, remove it if present.
    ToggleStatus(String),
    /// Replace the severity bounds, each clamped to `1..=10`.
    SetSeverityRange {
        /// Raw lower bound.
        min: i64,
        /// Raw upper bound.
        max: i64,
    },
    /// Replace the date bounds.
    SetDateRange {
        /// First day included.
        from: Option<NaiveDate>,
        /// Last day included.
        to: Option<NaiveDate>,
    },
    /// Replace the free-text search.
    SetSearchQuery(String),
    /// Select a fine region, clearing any coarse selection.
    SetRegionFine(String),
    /// Select a coarse region, clearing any fine selection.
    SetRegionCoarse(String),
    /// Clear the region selection.
    ClearRegion,
    /// Restore the built-in defaults.
    Reset,
}

impl FilterState {
    /// Applies one transition.
    #[must_use]
    pub fn apply(self, action: FilterAction) -> Self {
        log::trace!("apply: {action:?}");
        match action {
            FilterAction::ToggleCategory(category) => self.toggle_category(category),
            FilterAction::ToggleStatus(status) => self.toggle_status(status),
            FilterAction::SetSeverityRange { min, max } => self.set_severity_range(min, max),
            FilterAction::SetDateRange { from, to } => self.set_date_range(from, to),
            FilterAction::SetSearchQuery(query) => self.set_search_query(query),
            FilterAction::SetRegionFine(id) => self.set_region_fine(id),
            FilterAction::SetRegionCoarse(name) => self.set_region_coarse(name),
            FilterAction::ClearRegion => self.clear_region(),
            FilterAction::Reset => Self::reset_filters(),
        }
    }

    /// Adds `category` if absent, removes it if present.
    #[must_use]
    pub fn toggle_category(mut self, category: impl Into<String>) -> Self {
        toggle(&mut self.categories, category.into());
        self
    }

    /// Adds `status` if absent, removes it if present.
    ///
    /// The status is stored under its canonical name (`"In Progress"`
    /// becomes `in_progress`). Unknown statuses leave the state unchanged.
    #[must_use]
    pub fn toggle_status(mut self, status: impl AsRef<str>) -> Self {
        let raw = status.as_ref();
        match ComplaintStatus::from_raw(raw) {
            Some(status) => toggle(&mut self.statuses, status.as_ref().to_string()),
            None => log::debug!("Ignoring unknown status filter {raw:?}"),
        }
        self
    }

    /// Replaces the severity bounds, clamping each to `1..=10`.
    ///
    /// `min > max` is stored as given.
    #[must_use]
    pub fn set_severity_range(mut self, min: i64, max: i64) -> Self {
        self.severity = SeverityRange::clamped(min, max);
        self
    }

    /// Replaces the date bounds.
    #[must_use]
    pub const fn set_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_range = DateRange { from, to };
        self
    }

    /// Replaces the free-text search.
    #[must_use]
    pub fn set_search_query(mut self, query: impl Into<String>) -> Self {
        self.search_query = query.into();
        self
    }

    /// Selects a fine region. Any coarse selection is dropped.
    #[must_use]
    pub fn set_region_fine(mut self, id: impl Into<String>) -> Self {
        self.region = RegionSelection::Fine(id.into());
        self
    }

    /// Selects a coarse region. Any fine selection is dropped.
    #[must_use]
    pub fn set_region_coarse(mut self, name: impl Into<String>) -> Self {
        self.region = RegionSelection::Coarse(name.into());
        self
    }

    /// Clears the region selection.
    #[must_use]
    pub fn clear_region(mut self) -> Self {
        self.region = RegionSelection::None;
        self
    }

    /// Returns the built-in defaults.
    #[must_use]
    pub fn reset_filters() -> Self {
        Self::default()
    }
}

fn toggle(set: &mut std::collections::BTreeSet<String>, value: String) {
    if !set.remove(&value) {
        set.insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_twice_restores_the_set() {
        let start = FilterState::default().toggle_category("Roads");
        for category in ["Water", "Roads", "Garbage"] {
            let twice = start
                .clone()
                .toggle_category(category)
                .toggle_category(category);
            assert_eq!(twice.categories, start.categories, "category {category}");
        }

        let twice = start.clone().toggle_status("pending").toggle_status("pending");
        assert_eq!(twice.statuses, start.statuses);
    }

    #[test]
    fn region_selection_is_exclusive() {
        let priors = [
            FilterState::default(),
            FilterState::default().set_region_fine("UC1"),
            FilterState::default().set_region_coarse("North"),
        ];
        for prior in priors {
            let fine = prior.clone().set_region_fine("UC12");
            assert_eq!(fine.region.coarse_name(), None);
            assert_eq!(fine.region.fine_id(), Some("UC12"));

            let coarse = prior.set_region_coarse("Central");
            assert_eq!(coarse.region.fine_id(), None);
            assert_eq!(coarse.region.coarse_name(), Some("Central"));
        }
    }

    #[test]
    fn fine_then_coarse_keeps_only_coarse() {
        let state = FilterState::default()
            .set_region_fine("UC12")
            .set_region_coarse("Central");
        assert_eq!(state.region, RegionSelection::Coarse("Central".to_string()));
        assert_eq!(state.region.fine_id(), None);
    }

    #[test]
    fn severity_clamps_without_reordering() {
        let state = FilterState::default().set_severity_range(-4, 99);
        assert_eq!(state.severity, SeverityRange { min: 1, max: 10 });

        let crossed = FilterState::default().set_severity_range(8, 3);
        assert_eq!(crossed.severity, SeverityRange { min: 8, max: 3 });

        for (min, max) in [(0, 0), (11, 11), (5, 200), (-1, 7)] {
            let s = FilterState::default().set_severity_range(min, max).severity;
            assert!((1..=10).contains(&s.min), "{min} -> {}", s.min);
            assert!((1..=10).contains(&s.max), "{max} -> {}", s.max);
        }
    }

    #[test]
    fn reset_restores_defaults() {
        let state = FilterState::default()
            .toggle_category("Water")
            .set_search_query("leak")
            .set_region_coarse("Central")
            .apply(FilterAction::Reset);
        assert_eq!(state, FilterState::default());
    }

    #[test]
    fn actions_match_direct_transitions() {
        let via_actions = [
            FilterAction::ToggleCategory("Water".to_string()),
            FilterAction::SetSeverityRange { min: 2, max: 9 },
            FilterAction::SetRegionFine("UC7".to_string()),
            FilterAction::SetSearchQuery("drain".to_string()),
        ]
        .into_iter()
        .fold(FilterState::default(), FilterState::apply);

        let direct = FilterState::default()
            .toggle_category("Water")
            .set_severity_range(2, 9)
            .set_region_fine("UC7")
            .set_search_query("drain");

        assert_eq!(via_actions, direct);
        assert_eq!(
            via_actions.apply(FilterAction::ClearRegion).region,
            RegionSelection::None
        );
    }
}
