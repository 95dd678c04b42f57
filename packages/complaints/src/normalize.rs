//! Normalizes raw complaint records into [`Complaint`] values.
//!
//! Backend records differ in how they spell ids, positions, categories
//! and severities. Records without an id are skipped; every other
//! missing or unparseable field is left unset and resolved to its default
//! downstream.

use chrono::{DateTime, Utc};
use civic_map_complaint_models::{Complaint, ComplaintStatus, Coordinates, clamp_severity};
use serde_json::Value;

/// Normalizes a list of raw records, skipping the ones without an id.
#[must_use]
pub fn normalize_records(records: Vec<Value>) -> Vec<Complaint> {
    let total = records.len();
    let complaints: Vec<Complaint> = records.iter().filter_map(normalize_record).collect();
    if complaints.len() < total {
        log::debug!(
            "Skipped {} of {total} complaint records without an id",
            total - complaints.len()
        );
    }
    complaints
}

/// Normalizes a single raw record.
#[must_use]
pub fn normalize_record(record: &Value) -> Option<Complaint> {
    let obj = record.as_object()?;
    let id = ["_id", "id"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(as_text))?;

    let mut complaint = Complaint::new(id);
    complaint.coordinates = coordinates(record);
    complaint.category = category(record);
    if let Some(raw) = text_field(record, &["status"]) {
        complaint.status = ComplaintStatus::from_raw(&raw);
        if complaint.status.is_none() {
            log::debug!("Complaint {} has unknown status {raw:?}", complaint.id);
            complaint.unrecognized_status = Some(raw);
        }
    }
    complaint.severity = record.get("severity").and_then(as_number).map(|v| {
        #[allow(clippy::cast_possible_truncation)]
        clamp_severity(v.round() as i64)
    });
    complaint.description = text_field(record, &["description", "title"]);
    complaint.address = text_field(record, &["address"])
        .or_else(|| record.get("location").and_then(|l| text_field(l, &["address"])));
    complaint.created_at = text_field(record, &["createdAt", "created_at"])
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    complaint.region_id = text_field(record, &["ucId", "uc_id", "regionId"]);
    complaint.region_name = text_field(record, &["ucName", "uc_name", "regionName"]);
    complaint.town = text_field(record, &["town", "townName", "town_name"]);
    Some(complaint)
}

/// Extracts a position from any of the supported layouts:
///
/// * `location.coordinates: [lng, lat]` (`GeoJSON` point)
/// * `location: {lat, lng}` / `location: {latitude, longitude}`
/// * top-level `latitude`/`longitude` or `lat`/`lng`
fn coordinates(record: &Value) -> Option<Coordinates> {
    if let Some(location) = record.get("location") {
        if let Some(pair) = location.get("coordinates").and_then(Value::as_array) {
            if let [lng, lat, ..] = pair.as_slice() {
                return Some(Coordinates::new(as_number(lat)?, as_number(lng)?));
            }
        }
        if let Some(coords) = lat_lng(location) {
            return Some(coords);
        }
    }
    lat_lng(record)
}

fn lat_lng(value: &Value) -> Option<Coordinates> {
    let lat = ["lat", "latitude"]
        .iter()
        .find_map(|key| value.get(*key).and_then(as_number))?;
    let lng = ["lng", "lon", "longitude"]
        .iter()
        .find_map(|key| value.get(*key).and_then(as_number))?;
    Some(Coordinates::new(lat, lng))
}

/// Primary category label: `category` as text or `{name}`, else the first
/// entry of `categories`.
fn category(record: &Value) -> Option<String> {
    record
        .get("category")
        .and_then(label)
        .or_else(|| {
            record
                .get("categories")
                .and_then(Value::as_array)
                .and_then(|items| items.iter().find_map(label))
        })
}

fn label(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.get("name").and_then(as_text),
        other => as_text(other),
    }
}

fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| value.get(*key).and_then(as_text))
}

/// Non-empty trimmed text from a string or number.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finite number from a JSON number or numeric string.
fn as_number(value: &Value) -> Option<f64> {
    let number: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}
