//! Screen-space point clustering.
//!
//! Points are projected to Web Mercator pixel coordinates at the current
//! zoom and grouped greedily: the first unassigned point seeds a cluster
//! that absorbs every unassigned point within `radius_px` of it. A grid
//! of `radius_px` cells limits each seed to its 3x3 neighbourhood.

use std::collections::HashMap;
use std::f64::consts::PI;

use civic_map_complaint_models::{BoundingBox, Coordinates};
use serde::{Deserialize, Serialize};

/// Edge length of one Web Mercator tile in pixels.
const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the Web Mercator projection.
const MAX_LATITUDE: f64 = 85.051_128_78;

/// Clustering constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Maximum pixel distance between a cluster's seed and its members.
    pub radius_px: f64,
    /// Clustering only applies to more than this many points.
    pub min_points: usize,
    /// At this zoom level and above every point is drawn individually.
    pub disable_at_zoom: u8,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            radius_px: 60.0,
            min_points: 10,
            disable_at_zoom: 16,
        }
    }
}

impl ClusterConfig {
    /// Whether `point_count` points at `zoom` should be clustered.
    #[must_use]
    pub fn is_active(&self, point_count: usize, zoom: f64, enabled: bool) -> bool {
        enabled && point_count > self.min_points && zoom < f64::from(self.disable_at_zoom)
    }
}

/// A group of nearby points.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Mean position of the members.
    pub center: Coordinates,
    /// Indices into the clustered slice, in input order.
    pub members: Vec<usize>,
    /// Box around every member; clicking a cluster zooms here.
    pub bounds: BoundingBox,
}

impl Cluster {
    /// Number of points in the cluster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Projects a position to Web Mercator world pixels at `zoom`.
#[must_use]
pub fn project(point: &Coordinates, zoom: f64) -> (f64, f64) {
    let scale = TILE_SIZE * zoom.exp2();
    let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (point.lng + 180.0) / 360.0 * scale;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * scale;
    (x, y)
}

/// Groups `points` at `zoom`. Every point ends up in exactly one cluster;
/// isolated points form single-member clusters.
#[must_use]
pub fn cluster(points: &[Coordinates], zoom: f64, radius_px: f64) -> Vec<Cluster> {
    let radius = radius_px.max(f64::MIN_POSITIVE);
    let projected: Vec<(f64, f64)> = points.iter().map(|p| project(p, zoom)).collect();

    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (index, &(x, y)) in projected.iter().enumerate() {
        grid.entry(cell(x, y, radius)).or_default().push(index);
    }

    let mut assigned = vec![false; points.len()];
    let mut clusters = Vec::new();

    for seed in 0..points.len() {
        if assigned[seed] {
            continue;
        }
        let (sx, sy) = projected[seed];
        let (cx, cy) = cell(sx, sy, radius);

        let mut members = Vec::new();
        for gx in cx - 1..=cx + 1 {
            for gy in cy - 1..=cy + 1 {
                let Some(bucket) = grid.get(&(gx, gy)) else {
                    continue;
                };
                for &candidate in bucket {
                    let (x, y) = projected[candidate];
                    if !assigned[candidate] && (x - sx).hypot(y - sy) <= radius {
                        members.push(candidate);
                    }
                }
            }
        }
        members.sort_unstable();
        for &member in &members {
            assigned[member] = true;
        }
        clusters.push(summarize(points, members));
    }

    log::trace!(
        "Clustered {} points into {} groups at zoom {zoom}",
        points.len(),
        clusters.len()
    );
    clusters
}

#[allow(clippy::cast_possible_truncation)]
fn cell(x: f64, y: f64, size: f64) -> (i64, i64) {
    ((x / size).floor() as i64, (y / size).floor() as i64)
}

#[allow(clippy::cast_precision_loss)]
fn summarize(points: &[Coordinates], members: Vec<usize>) -> Cluster {
    let first = points[members[0]];
    let mut bounds = BoundingBox::new(first.lng, first.lat, first.lng, first.lat);
    let (mut lat_sum, mut lng_sum) = (0.0, 0.0);
    for &member in &members {
        let p = points[member];
        lat_sum += p.lat;
        lng_sum += p.lng;
        bounds.west = bounds.west.min(p.lng);
        bounds.east = bounds.east.max(p.lng);
        bounds.south = bounds.south.min(p.lat);
        bounds.north = bounds.north.max(p.lat);
    }
    let count = members.len() as f64;
    Cluster {
        center: Coordinates::new(lat_sum / count, lng_sum / count),
        members,
        bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_origin_and_scale() {
        let (x, y) = project(&Coordinates::new(0.0, 0.0), 0.0);
        assert!((x - 128.0).abs() < 1e-9);
        assert!((y - 128.0).abs() < 1e-9);

        let (x1, _) = project(&Coordinates::new(0.0, 10.0), 1.0);
        let (x2, _) = project(&Coordinates::new(0.0, 10.0), 2.0);
        assert!((x2 - 2.0 * x1).abs() < 1e-9);
    }

    #[test]
    fn activation_threshold() {
        let config = ClusterConfig::default();
        assert!(!config.is_active(10, 12.0, true));
        assert!(config.is_active(11, 12.0, true));
        assert!(!config.is_active(11, 12.0, false));
        assert!(!config.is_active(500, 16.0, true));
        assert!(config.is_active(500, 15.5, true));
    }

    #[test]
    fn nearby_points_merge_and_distant_ones_stay_apart() {
        let mut points: Vec<Coordinates> = (0_u8..5)
            .map(|i| Coordinates::new(24.9, f64::from(i).mul_add(0.0001, 67.0)))
            .collect();
        points.push(Coordinates::new(31.5, 74.3));

        let clusters = cluster(&points, 10.0, 60.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![0, 1, 2, 3, 4]);
        assert_eq!(clusters[1].members, vec![5]);
        assert!((clusters[0].center.lat - 24.9).abs() < 1e-9);
    }

    #[test]
    fn every_point_assigned_once() {
        let points: Vec<Coordinates> = (0_u8..40)
            .map(|i| Coordinates::new(f64::from(i % 7).mul_add(0.01, 24.8), f64::from(i / 7).mul_add(0.01, 67.0)))
            .collect();
        for zoom in [8.0, 12.0, 15.0] {
            let clusters = cluster(&points, zoom, 60.0);
            let mut seen: Vec<usize> = clusters.iter().flat_map(|c| c.members.clone()).collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..40).collect::<Vec<_>>());
        }
    }

    #[test]
    fn zooming_in_splits_clusters() {
        let points = vec![Coordinates::new(24.9, 67.0), Coordinates::new(24.9, 67.01)];
        assert_eq!(cluster(&points, 8.0, 60.0).len(), 1);
        assert_eq!(cluster(&points, 16.0, 60.0).len(), 2);
    }

    #[test]
    fn empty_input() {
        assert!(cluster(&[], 10.0, 60.0).is_empty());
    }
}
