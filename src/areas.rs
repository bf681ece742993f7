//! Output data model of the engine.
//!
//! Everything here is created fresh per call and handed to the caller by
//! value. Annotator decisions are tracked outside these structures, keyed by
//! area id (see [`crate::annotation`]).

use serde::{Deserialize, Serialize};

use crate::geo_utils::compute_bounds;
use crate::loops::detect_circle;
use crate::{AnnotateError, Bounds, Coordinate, MatchingMethod, Result};

/// Back-reference to the slice of one method's trajectory that a region uses.
///
/// `start_index` and `end_index` are local indices into the owner's own
/// trajectory, first and last coordinate inclusive. The region owns the
/// half-open range `[start_index, end_index)`: its last coordinate is shared
/// with the next region, so `end_index - start_index` counts the points
/// attributed to the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTrajOwner {
    pub owner_type: MatchingMethod,
    /// The contribution only agreed with its group after loop collapse
    pub has_error: bool,
    pub start_index: u32,
    pub end_index: u32,
}

impl SubTrajOwner {
    pub fn new(owner_type: MatchingMethod, start_index: u32, end_index: u32) -> Self {
        Self {
            owner_type,
            has_error: false,
            start_index,
            end_index,
        }
    }

    /// Number of points attributed to this owner.
    ///
    /// Fails when `end_index` precedes `start_index`, which only a
    /// hand-edited or foreign area payload can contain.
    pub fn point_count(&self) -> Result<u32> {
        self.end_index
            .checked_sub(self.start_index)
            .ok_or_else(|| AnnotateError::InvalidOwner {
                method: self.owner_type.to_string(),
                start_index: self.start_index,
                end_index: self.end_index,
            })
    }
}

/// A single method's candidate sub-path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTrajArray {
    pub traj: Vec<Coordinate>,
    pub owner: SubTrajOwner,
    /// A loop was detected and can be collapsed
    pub has_circle: bool,
}

impl SubTrajArray {
    /// Create a candidate, running loop detection over `traj`.
    pub fn new(owner: SubTrajOwner, traj: Vec<Coordinate>, tolerance: f64, window: usize) -> Self {
        let has_circle = detect_circle(&traj, tolerance, window);
        Self {
            traj,
            owner,
            has_circle,
        }
    }
}

/// One or more method contributions represented by a single geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedSubTrajArray {
    pub traj: Vec<Coordinate>,
    pub owners: Vec<SubTrajOwner>,
    /// Method whose path was chosen as the representative geometry
    pub base_owner_type: MatchingMethod,
}

impl MergedSubTrajArray {
    /// Whether the given method contributed to this candidate.
    pub fn has_owner(&self, method: &MatchingMethod) -> bool {
        self.owners.iter().any(|o| &o.owner_type == method)
    }
}

/// Region where all methods agree pointwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedArea {
    pub id: u32,
    pub sub_traj: SubTrajArray,
}

/// Region where all methods agree after loop collapse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreMatchedArea {
    pub id: u32,
    pub sub_traj: MergedSubTrajArray,
}

/// Region with at least two candidate geometries, awaiting a human decision.
///
/// Candidates are ordered most-agreed first; the UI numbers them from 1 in
/// this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchedArea {
    pub id: u32,
    pub sub_trajs: Vec<MergedSubTrajArray>,
}

impl MismatchedArea {
    /// Bounding box over all candidates, used to frame the area on the map.
    pub fn bounds(&self) -> Option<Bounds> {
        compute_bounds(self.sub_trajs.iter().map(|s| s.traj.as_slice()))
    }
}

/// Top-level engine result.
///
/// Each list is in scan order along the trajectory. Ids are strictly
/// increasing across the three lists, so sorting all areas by id restores the
/// full scan order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessAreas {
    pub matched_areas: Vec<MatchedArea>,
    pub prematched_areas: Vec<PreMatchedArea>,
    pub mismatched_areas: Vec<MismatchedArea>,
}

impl PreprocessAreas {
    /// Total number of areas of all kinds.
    pub fn area_count(&self) -> usize {
        self.matched_areas.len() + self.prematched_areas.len() + self.mismatched_areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.area_count() == 0
    }

    /// Look up a mismatched area by id.
    pub fn mismatched_area(&self, id: u32) -> Option<&MismatchedArea> {
        self.mismatched_areas.iter().find(|area| area.id == id)
    }

    /// All area ids in scan order.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .matched_areas
            .iter()
            .map(|a| a.id)
            .chain(self.prematched_areas.iter().map(|a| a.id))
            .chain(self.mismatched_areas.iter().map(|a| a.id))
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::DISTANCE_EPSILON_METERS;

    #[test]
    fn test_owner_point_count() {
        let owner = SubTrajOwner::new(MatchingMethod::StMatching, 4, 9);
        assert_eq!(owner.point_count(), Ok(5));
        assert!(!owner.has_error);
    }

    #[test]
    fn test_reversed_owner_range_is_rejected() {
        let owner = SubTrajOwner::new(MatchingMethod::SimpleMapMatching, 5, 2);
        assert_eq!(
            owner.point_count(),
            Err(AnnotateError::InvalidOwner {
                method: "SimpleMapMatching".to_string(),
                start_index: 5,
                end_index: 2,
            })
        );
    }

    #[test]
    fn test_sub_traj_detects_circle() {
        let traj = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 1.0),
            Coordinate::new(0.0, 0.0),
        ];
        let owner = SubTrajOwner::new(MatchingMethod::GhMapMatching, 0, 2);
        let sub = SubTrajArray::new(owner, traj, DISTANCE_EPSILON_METERS, 64);
        assert!(sub.has_circle);
    }

    #[test]
    fn test_mismatched_area_bounds() {
        let candidate = |method: MatchingMethod, traj: Vec<Coordinate>| MergedSubTrajArray {
            traj,
            owners: vec![SubTrajOwner::new(method.clone(), 0, 1)],
            base_owner_type: method,
        };
        let area = MismatchedArea {
            id: 3,
            sub_trajs: vec![
                candidate(
                    MatchingMethod::GhMapMatching,
                    vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)],
                ),
                candidate(
                    MatchingMethod::StMatching,
                    vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 5.0)],
                ),
            ],
        };
        let bounds = area.bounds().unwrap();
        assert_eq!(bounds.max_lat, 5.0);
        assert!(area.sub_trajs[1].has_owner(&MatchingMethod::StMatching));
        assert!(!area.sub_trajs[1].has_owner(&MatchingMethod::GhMapMatching));
    }

    #[test]
    fn test_areas_json_shape() {
        let areas = PreprocessAreas::default();
        let json = serde_json::to_value(&areas).unwrap();
        assert!(json["matched_areas"].is_array());
        assert!(json["prematched_areas"].is_array());
        assert!(json["mismatched_areas"].is_array());
        assert!(areas.is_empty());
    }
}
