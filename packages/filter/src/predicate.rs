//! The effective predicate shared by server queries and client refinement.
//!
//! The backend already filters by the query parameters, but responses may
//! be stale or only partially filtered, so the map re-checks every record
//! locally. Both directions are produced here from one [`FilterState`].

use std::collections::BTreeSet;

use civic_map_complaint_models::{Complaint, ComplaintStatus};
use civic_map_territory_models::RegionSelection;

use crate::params::{self, ApiParams};
use crate::state::FilterState;

/// A compiled view of a [`FilterState`].
#[derive(Debug, Clone)]
pub struct EffectivePredicate<'a> {
    filters: &'a FilterState,
    needle: Option<String>,
    statuses: BTreeSet<ComplaintStatus>,
}

impl<'a> EffectivePredicate<'a> {
    /// Compiles `filters`.
    #[must_use]
    pub fn new(filters: &'a FilterState) -> Self {
        let needle = Some(filters.search_query.trim().to_lowercase()).filter(|s| !s.is_empty());
        let statuses = filters
            .statuses
            .iter()
            .filter_map(|s| ComplaintStatus::from_raw(s))
            .collect();
        Self {
            filters,
            needle,
            statuses,
        }
    }

    /// Case-insensitive substring match on description and address.
    /// Always true for an empty search.
    #[must_use]
    pub fn matches_search(&self, complaint: &Complaint) -> bool {
        let Some(needle) = &self.needle else {
            return true;
        };
        [&complaint.description, &complaint.address]
            .into_iter()
            .flatten()
            .any(|text| text.to_lowercase().contains(needle.as_str()))
    }

    /// Category membership; true when no category is selected.
    #[must_use]
    pub fn matches_category(&self, complaint: &Complaint) -> bool {
        self.filters.categories.is_empty()
            || self.filters.categories.contains(complaint.category_label())
    }

    /// Status membership; true when no status is selected. Records whose
    /// status the backend spelled in an unknown way never match a status
    /// filter.
    #[must_use]
    pub fn matches_status(&self, complaint: &Complaint) -> bool {
        if self.statuses.is_empty() {
            return true;
        }
        complaint.unrecognized_status.is_none()
            && self.statuses.contains(&complaint.status_or_default())
    }

    /// Severity bounds, using the default severity for records without one.
    #[must_use]
    pub fn matches_severity(&self, complaint: &Complaint) -> bool {
        self.filters
            .severity
            .contains(complaint.effective_severity())
    }

    /// All client-side checks, in order: search, category, status,
    /// severity.
    #[must_use]
    pub fn matches(&self, complaint: &Complaint) -> bool {
        self.matches_search(complaint)
            && self.matches_category(complaint)
            && self.matches_status(complaint)
            && self.matches_severity(complaint)
    }

    /// Keeps the complaints that pass [`Self::matches`], preserving order.
    #[must_use]
    pub fn refine<'c>(&self, complaints: &'c [Complaint]) -> Vec<&'c Complaint> {
        complaints.iter().filter(|c| self.matches(c)).collect()
    }

    /// Backend query parameters for the same filter.
    ///
    /// A group with one value uses the singular key (`category=X`), more
    /// than one the plural key with comma-joined values
    /// (`categories=X,Y`). Severity bounds are only sent when the range
    /// is narrowed. Search is refined client-side only.
    #[must_use]
    pub fn to_api_params(&self) -> ApiParams {
        let mut out = ApiParams::new();

        push_group(
            &mut out,
            params::CATEGORY,
            params::CATEGORIES,
            self.filters.categories.iter().map(String::as_str),
        );
        push_group(
            &mut out,
            params::STATUS,
            params::STATUSES,
            self.statuses.iter().map(<ComplaintStatus as AsRef<str>>::as_ref),
        );

        let severity = self.filters.severity;
        if severity.is_narrowed() {
            out.insert(params::SEVERITY_MIN, severity.min.to_string());
            out.insert(params::SEVERITY_MAX, severity.max.to_string());
        }

        let dates = self.filters.date_range;
        if let Some(from) = dates.from {
            out.insert(params::DATE_FROM, from.format("%Y-%m-%d").to_string());
        }
        if let Some(to) = dates.to {
            out.insert(params::DATE_TO, to.format("%Y-%m-%d").to_string());
        }

        match &self.filters.region {
            RegionSelection::Fine(id) => out.insert(params::FINE_REGION, id.clone()),
            RegionSelection::Coarse(name) => out.insert(params::COARSE_REGION, name.clone()),
            RegionSelection::None => {}
        }

        out
    }
}

impl FilterState {
    /// Backend query parameters for this filter.
    #[must_use]
    pub fn to_api_params(&self) -> ApiParams {
        EffectivePredicate::new(self).to_api_params()
    }

    /// Compiles this filter for client-side checks.
    #[must_use]
    pub fn predicate(&self) -> EffectivePredicate<'_> {
        EffectivePredicate::new(self)
    }
}

fn push_group<'v>(
    out: &mut ApiParams,
    singular: &str,
    plural: &str,
    values: impl Iterator<Item = &'v str>,
) {
    let values: Vec<&str> = values.collect();
    match values.as_slice() {
        [] => {}
        [value] => out.insert(singular, (*value).to_string()),
        _ => out.insert(plural, values.join(",")),
    }
}
