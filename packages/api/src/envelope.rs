//! Response envelope unwrapping.
//!
//! The backend has grown several response shapes for the same list
//! endpoints. Each helper here accepts all of them and always yields a
//! flat list; anything unrecognized yields an empty list rather than an
//! error.

use serde_json::Value;

const COMPLAINT_KEYS: &[&str] = &["complaints"];
const TERRITORY_KEYS: &[&str] = &["territories", "features"];
const HEATMAP_KEYS: &[&str] = &["points", "heatmap"];

/// Unwraps a complaint list response.
///
/// Accepts a bare array, `{complaints: [..]}`, `{data: [..]}` and
/// `{data: {complaints: [..]}}`.
#[must_use]
pub fn complaint_records(body: Value) -> Vec<Value> {
    unwrap_list(body, COMPLAINT_KEYS)
}

/// Unwraps a territory list response.
///
/// Accepts the same shapes as [`complaint_records`] with `territories`
/// or `features` (a `GeoJSON` `FeatureCollection`) as the list key.
#[must_use]
pub fn territory_records(body: Value) -> Vec<Value> {
    unwrap_list(body, TERRITORY_KEYS)
}

/// Unwraps a heatmap response (`[[lat, lng, intensity], ..]`, optionally
/// under `points`, `heatmap` or `data`).
#[must_use]
pub fn heatmap_records(body: Value) -> Vec<Value> {
    unwrap_list(body, HEATMAP_KEYS)
}

fn unwrap_list(body: Value, keys: &[&str]) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            for key in keys {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return items;
                }
            }
            match map.remove("data") {
                Some(Value::Array(items)) => items,
                Some(Value::Object(mut inner)) => keys
                    .iter()
                    .find_map(|key| match inner.remove(*key) {
                        Some(Value::Array(items)) => Some(items),
                        _ => None,
                    })
                    .unwrap_or_default(),
                _ => {
                    log::debug!("Unrecognized response envelope, treating as empty");
                    Vec::new()
                }
            }
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_all_complaint_shapes() {
        let record = json!({ "_id": "a" });
        let shapes = [
            json!([record.clone()]),
            json!({ "complaints": [record.clone()] }),
            json!({ "data": [record.clone()] }),
            json!({ "data": { "complaints": [record.clone()] } }),
        ];
        for shape in shapes {
            let records = complaint_records(shape.clone());
            assert_eq!(records, vec![record.clone()], "shape {shape}");
        }
    }

    #[test]
    fn unknown_shapes_are_empty() {
        for shape in [
            json!(null),
            json!("oops"),
            json!(42),
            json!({}),
            json!({ "complaints": "nope" }),
            json!({ "data": { "items": [1, 2] } }),
            json!({ "data": null }),
        ] {
            assert!(complaint_records(shape.clone()).is_empty(), "shape {shape}");
        }
    }

    #[test]
    fn territories_accept_feature_collections() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [{ "type": "Feature" }, { "type": "Feature" }],
        });
        assert_eq!(territory_records(body).len(), 2);

        let nested = json!({ "data": { "territories": [{ "id": 1 }] } });
        assert_eq!(territory_records(nested).len(), 1);
    }

    #[test]
    fn heatmap_accepts_bare_and_wrapped() {
        assert_eq!(heatmap_records(json!([[24.9, 67.0, 0.4]])).len(), 1);
        assert_eq!(
            heatmap_records(json!({ "data": [[24.9, 67.0, 0.4], [25.0, 67.1, 1.0]] })).len(),
            2
        );
        assert_eq!(heatmap_records(json!({ "points": [] })).len(), 0);
    }
}
