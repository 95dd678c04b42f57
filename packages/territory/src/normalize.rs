//! Normalizes raw territory records into [`Territory`] values.
//!
//! Records arrive either as `GeoJSON` features (`{properties, geometry}`)
//! or as flat backend documents with the geometry under `boundary` or
//! `geometry`. Geometry may be `GeoJSON` or Esri JSON (`{rings: [..]}`).
//! Records with no usable name or no polygon geometry are skipped.

use civic_map_territory_models::{Territory, TerritoryLevel};
use geo::MultiPolygon;
use geojson::GeoJson;
use serde_json::{Map, Value};

/// Keys consumed by normalization and not passed through as properties.
const GEOMETRY_KEYS: &[&str] = &["boundary", "geometry"];

/// Normalizes a list of raw records, tagging each with `level`.
#[must_use]
pub fn normalize_territories(records: &[Value], level: TerritoryLevel) -> Vec<Territory> {
    let territories: Vec<Territory> = records
        .iter()
        .filter_map(|record| normalize_territory(record, level))
        .collect();
    if territories.len() < records.len() {
        log::debug!(
            "Skipped {} of {} {level} territory records without a name or polygon",
            records.len() - territories.len(),
            records.len()
        );
    }
    territories
}

/// Normalizes a single record.
#[must_use]
pub fn normalize_territory(record: &Value, level: TerritoryLevel) -> Option<Territory> {
    let obj = record.as_object()?;

    // GeoJSON features carry their attributes under `properties`.
    let attributes = match obj.get("properties") {
        Some(Value::Object(props)) => props,
        _ => obj,
    };

    let id = text(obj, &["_id", "id"]).or_else(|| text(attributes, &["_id", "id", "ucId", "uc_id"]));
    let name = text(attributes, &["name", "ucName", "uc_name", "townName", "town_name"]);
    let (id, name) = match (id, name) {
        (Some(id), Some(name)) => (id, name),
        (Some(id), None) => (id.clone(), id),
        (None, Some(name)) => (name.clone(), name),
        (None, None) => return None,
    };

    let geometry = GEOMETRY_KEYS.iter().find_map(|key| obj.get(*key))?;
    let boundary = parse_boundary(geometry)?;

    let parent_name = match level {
        TerritoryLevel::Fine => text(attributes, &["parentName", "parent_name", "town", "townName"]),
        TerritoryLevel::Coarse => None,
    };

    let properties = attributes
        .iter()
        .filter(|(key, _)| !GEOMETRY_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Some(Territory {
        id,
        name,
        level,
        parent_name,
        boundary,
        properties,
    })
}

/// Parses a `GeoJSON` or Esri geometry into a [`MultiPolygon`].
///
/// Returns `None` for non-polygon geometry and for empty polygons.
#[must_use]
pub fn parse_boundary(geometry: &Value) -> Option<MultiPolygon<f64>> {
    if geometry.is_null() {
        return None;
    }
    let geometry = if geometry.get("rings").is_some() {
        esri_to_geojson(geometry)?
    } else {
        geometry.clone()
    };

    let geojson: GeoJson = geometry.to_string().parse().ok()?;
    let geometry = match geojson {
        GeoJson::Geometry(geometry) => geometry,
        GeoJson::Feature(feature) => feature.geometry?,
        GeoJson::FeatureCollection(_) => return None,
    };
    let multi = match geo::Geometry::<f64>::try_from(geometry).ok()? {
        geo::Geometry::MultiPolygon(mp) => mp,
        geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
        _ => return None,
    };
    if multi.0.iter().all(|p| p.exterior().0.is_empty()) {
        return None;
    }
    Some(multi)
}

/// Converts Esri JSON geometry (`{rings: [..]}`) to a `GeoJSON` polygon.
///
/// Each ring becomes its own single-ring polygon; holes are not detected.
fn esri_to_geojson(esri: &Value) -> Option<Value> {
    let rings = esri.get("rings")?.as_array()?;
    match rings.as_slice() {
        [] => None,
        [_] => Some(serde_json::json!({
            "type": "Polygon",
            "coordinates": rings,
        })),
        _ => {
            let polygons: Vec<Value> = rings.iter().map(|ring| serde_json::json!([ring])).collect();
            Some(serde_json::json!({
                "type": "MultiPolygon",
                "coordinates": polygons,
            }))
        }
    }
}

fn text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
