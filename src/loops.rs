//! U-turn / loop detection and collapse.
//!
//! A matched path that doubles back over itself (e.g. a method routing into a
//! side street and straight back out) revisits an earlier position within a
//! short index window. Detection is a near-coincidence test: an R-tree over
//! the path's coordinates proposes candidates in degree space, and haversine
//! distance confirms them against the agreement tolerance.
//!
//! Collapsing removes the detour between the two visits, leaving the path's
//! net effect for comparison against other methods.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::geo_utils::{meters_to_degrees, points_agree};
use crate::Coordinate;

/// A coordinate with its index in the path, stored as `[lng, lat]`.
#[derive(Debug, Clone, Copy)]
struct IndexedCoordinate {
    idx: usize,
    lng: f64,
    lat: f64,
}

impl RTreeObject for IndexedCoordinate {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

impl PointDistance for IndexedCoordinate {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlng = self.lng - point[0];
        let dlat = self.lat - point[1];
        dlng * dlng + dlat * dlat
    }
}

fn build_rtree(points: &[Coordinate]) -> RTree<IndexedCoordinate> {
    let indexed: Vec<IndexedCoordinate> = points
        .iter()
        .enumerate()
        .map(|(idx, p)| IndexedCoordinate {
            idx,
            lng: p.longitude,
            lat: p.latitude,
        })
        .collect();
    RTree::bulk_load(indexed)
}

/// Find the earliest revisit in `points`.
///
/// Returns `(i, j)` with `2 <= j - i <= window` and `points[i]` agreeing with
/// `points[j]`. Among revisits of the smallest `i`, the farthest `j` is
/// returned so one collapse removes the whole detour. Consecutive duplicates
/// (`j == i + 1`) are stationary points, not loops.
pub fn find_circle(points: &[Coordinate], tolerance: f64, window: usize) -> Option<(usize, usize)> {
    if points.len() < 3 || window < 2 {
        return None;
    }

    let tree = build_rtree(points);

    for (i, p) in points.iter().enumerate() {
        let radius = meters_to_degrees(tolerance, p.latitude);
        let last = i.saturating_add(window).min(points.len() - 1);

        let farthest = tree
            .locate_within_distance([p.longitude, p.latitude], radius * radius)
            .map(|candidate| candidate.idx)
            .filter(|&j| j >= i + 2 && j <= last)
            .filter(|&j| points_agree(p, &points[j], tolerance))
            .max();

        if let Some(j) = farthest {
            return Some((i, j));
        }
    }

    None
}

/// Whether the path contains a loop within the search window.
pub fn detect_circle(points: &[Coordinate], tolerance: f64, window: usize) -> bool {
    find_circle(points, tolerance, window).is_some()
}

/// Remove every detected loop, keeping the first visit of each revisited position.
///
/// Each pass removes at least one point, so this terminates after at most
/// `points.len()` passes.
pub fn collapse_circles(points: &[Coordinate], tolerance: f64, window: usize) -> Vec<Coordinate> {
    let mut collapsed = points.to_vec();

    while let Some((i, j)) = find_circle(&collapsed, tolerance, window) {
        collapsed.drain(i + 1..=j);
    }

    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::DISTANCE_EPSILON_METERS;

    fn path(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points
            .iter()
            .map(|&(lng, lat)| Coordinate::new(lng, lat))
            .collect()
    }

    #[test]
    fn test_straight_path_has_no_circle() {
        let straight = path(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        assert!(!detect_circle(&straight, DISTANCE_EPSILON_METERS, 64));
        assert_eq!(collapse_circles(&straight, DISTANCE_EPSILON_METERS, 64), straight);
    }

    #[test]
    fn test_u_turn_detected_and_collapsed() {
        let u_turn = path(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (1.0, 0.0), (2.0, 0.0)]);
        assert_eq!(find_circle(&u_turn, DISTANCE_EPSILON_METERS, 64), Some((1, 3)));
        assert_eq!(
            collapse_circles(&u_turn, DISTANCE_EPSILON_METERS, 64),
            path(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])
        );
    }

    #[test]
    fn test_consecutive_duplicate_is_not_a_circle() {
        let stationary = path(&[(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        assert!(!detect_circle(&stationary, DISTANCE_EPSILON_METERS, 64));
    }

    #[test]
    fn test_window_bounds_detection() {
        // Revisit of the start after five steps
        let long_loop = path(&[
            (0.0, 0.0),
            (0.0, 1.0),
            (1.0, 1.0),
            (2.0, 1.0),
            (2.0, 0.0),
            (0.0, 0.0),
            (-1.0, 0.0),
        ]);
        assert!(!detect_circle(&long_loop, DISTANCE_EPSILON_METERS, 4));
        assert_eq!(find_circle(&long_loop, DISTANCE_EPSILON_METERS, 5), Some((0, 5)));
    }

    #[test]
    fn test_unbounded_window_covers_whole_path() {
        let u_turn = path(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (1.0, 0.0), (2.0, 0.0)]);
        assert_eq!(find_circle(&u_turn, DISTANCE_EPSILON_METERS, usize::MAX), Some((1, 3)));
        assert_eq!(
            collapse_circles(&u_turn, DISTANCE_EPSILON_METERS, usize::MAX),
            path(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])
        );
    }

    #[test]
    fn test_farthest_revisit_is_removed_in_one_pass() {
        // Two back-and-forth trips from A before continuing
        let double = path(&[(0.0, 0.0), (0.0, 1.0), (0.0, 0.0), (0.0, 1.0), (0.0, 0.0), (1.0, 0.0)]);
        assert_eq!(find_circle(&double, DISTANCE_EPSILON_METERS, 64), Some((0, 4)));
        assert_eq!(
            collapse_circles(&double, DISTANCE_EPSILON_METERS, 64),
            path(&[(0.0, 0.0), (1.0, 0.0)])
        );
    }

    #[test]
    fn test_near_coincidence_uses_tolerance() {
        // Return leg lands ~0.1 m east of the first visit
        let near = path(&[(116.0, 39.0), (116.0, 39.001), (116.000001, 39.0), (116.0, 38.999)]);
        assert!(!detect_circle(&near, DISTANCE_EPSILON_METERS, 64));
        assert!(detect_circle(&near, 0.5, 64));
    }
}
