//! Backend query parameters.

use std::collections::BTreeMap;

use serde::Serialize;

/// Singular category key, used when exactly one category is selected.
pub const CATEGORY: &str = "category";
/// Plural category key, comma-joined.
pub const CATEGORIES: &str = "categories";
/// Singular status key.
pub const STATUS: &str = "status";
/// Plural status key, comma-joined.
pub const STATUSES: &str = "statuses";
/// Lower severity bound.
pub const SEVERITY_MIN: &str = "severity_min";
/// Upper severity bound.
pub const SEVERITY_MAX: &str = "severity_max";
/// First submission day (`YYYY-MM-DD`).
pub const DATE_FROM: &str = "date_from";
/// Last submission day (`YYYY-MM-DD`).
pub const DATE_TO: &str = "date_to";
/// Selected fine region id.
pub const FINE_REGION: &str = "uc_id";
/// Selected coarse region name.
pub const COARSE_REGION: &str = "town";

/// Query string parameters for the complaint endpoints.
///
/// Serializes as a flat map, so it can be handed straight to
/// `reqwest::RequestBuilder::query`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApiParams(BTreeMap<String, String>);

impl ApiParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no parameter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for ApiParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
