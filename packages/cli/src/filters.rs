//! Filter flags shared by the subcommands.

use chrono::NaiveDate;
use civic_map_complaint_models::BoundingBox;
use civic_map_filter::FilterOverrides;

/// Complaint filter flags. Any flag given replaces the matching
/// `[initial_filters]` entry from the config file.
#[derive(clap::Args, Debug, Default)]
pub struct FilterArgs {
    /// Category to include (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,
    /// Status to include (repeatable), e.g. `pending` or `in_progress`
    #[arg(long = "status")]
    pub statuses: Vec<String>,
    /// Lowest severity (1-10)
    #[arg(long)]
    pub severity_min: Option<i64>,
    /// Highest severity (1-10)
    #[arg(long)]
    pub severity_max: Option<i64>,
    /// First submission day (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last submission day (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Fine region (union council) id
    #[arg(long, conflicts_with = "town")]
    pub uc: Option<String>,
    /// Coarse region (town) name
    #[arg(long)]
    pub town: Option<String>,
    /// Free-text search over description and address
    #[arg(long)]
    pub search: Option<String>,
}

impl FilterArgs {
    /// Lays the flags over `base`.
    #[must_use]
    pub fn merge_into(self, mut base: FilterOverrides) -> FilterOverrides {
        if !self.categories.is_empty() {
            base.categories = Some(self.categories);
        }
        if !self.statuses.is_empty() {
            base.statuses = Some(self.statuses);
        }
        base.severity_min = self.severity_min.or(base.severity_min);
        base.severity_max = self.severity_max.or(base.severity_max);
        base.date_from = self.from.or(base.date_from);
        base.date_to = self.to.or(base.date_to);
        if self.uc.is_some() || self.town.is_some() {
            base.region_fine = self.uc;
            base.region_coarse = self.town;
        }
        base.search = self.search.or(base.search);
        base
    }
}

/// Parses `west,south,east,north`.
///
/// # Errors
///
/// Returns a message if the value does not hold four numbers.
pub fn parse_bbox(value: &str) -> Result<BoundingBox, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid bbox {value:?}: {e}"))?;
    match parts.as_slice() {
        [west, south, east, north] => Ok(BoundingBox::new(*west, *south, *east, *north)),
        _ => Err(format!("bbox needs 4 values (west,south,east,north), got {}", parts.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_map_territory_models::RegionSelection;

    #[test]
    fn flags_override_config() {
        let base = FilterOverrides {
            categories: Some(vec!["Water".to_string()]),
            severity_min: Some(3),
            region_fine: Some("UC1".to_string()),
            ..FilterOverrides::default()
        };
        let args = FilterArgs {
            town: Some("Central".to_string()),
            severity_max: Some(8),
            ..FilterArgs::default()
        };
        let state = args.merge_into(base).into_state();
        assert!(state.categories.contains("Water"));
        assert_eq!(state.severity.min, 3);
        assert_eq!(state.severity.max, 8);
        assert_eq!(state.region, RegionSelection::Coarse("Central".to_string()));
    }

    #[test]
    fn bbox_parsing() {
        let bbox = parse_bbox("66.9, 24.7, 67.3, 25.1").unwrap();
        assert!((bbox.east - 67.3).abs() < f64::EPSILON);
        assert!(parse_bbox("1,2,3").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
    }
}
