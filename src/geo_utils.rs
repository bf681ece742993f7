//! Geographic utilities: distances, agreement tests and degree conversions.
//!
//! All agreement decisions in the engine go through [`points_agree`] so the
//! tolerance semantics live in one place. The comparison is inclusive: a pair
//! exactly at the tolerance agrees.

use geo::{Distance, Haversine, Point};

use crate::{Bounds, Coordinate};

/// Smallest agreement tolerance in meters.
///
/// A configured threshold of zero still treats bit-identical coordinates as
/// agreeing. Region boundaries depend on this value; keep it stable.
pub const DISTANCE_EPSILON_METERS: f64 = 1e-6;

/// Conservative meters per degree used for spatial prefilters.
///
/// Slightly below the true equatorial value so converted radii never undershoot.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Haversine distance between two coordinates in meters.
pub fn haversine_distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Whether two coordinates agree within `tolerance` meters (inclusive).
#[inline]
pub fn points_agree(p1: &Coordinate, p2: &Coordinate, tolerance: f64) -> bool {
    haversine_distance(p1, p2) <= tolerance
}

/// Whether two paths agree pointwise over their whole length.
///
/// Paths of different lengths never agree.
pub fn paths_agree(a: &[Coordinate], b: &[Coordinate], tolerance: f64) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b.iter())
            .all(|(p1, p2)| points_agree(p1, p2, tolerance))
}

/// Convert meters to a degree radius valid in both axes at `latitude`.
///
/// Uses the longitude scale, which is the larger of the two away from the
/// equator, so the radius covers at least `meters` in every direction.
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let cos_lat = latitude.to_radians().cos().abs().max(0.01);
    meters / (METERS_PER_DEGREE * cos_lat)
}

/// Bounding box of several paths, `None` when all are empty.
pub fn compute_bounds<'a, I>(paths: I) -> Option<Bounds>
where
    I: IntoIterator<Item = &'a [Coordinate]>,
{
    paths
        .into_iter()
        .filter_map(Bounds::from_points)
        .reduce(|acc, b| acc.union(&b))
}
