//! Owner track normalization.
//!
//! Makes N independently matched trajectories comparable point-for-point:
//!
//! 1. Drop disabled methods and trajectories too short to form a region
//! 2. Validate coordinates and reject duplicate methods
//! 3. Order tracks by method priority; the first becomes the baseline
//! 4. Align every track to the baseline with a tolerance-aware LCS
//! 5. Keep the baseline indices every track aligned to (the common index space)
//!
//! Each resulting track carries one local anchor per common index, so the
//! classifier can walk all tracks in lockstep.

use log::{debug, warn};

use crate::lcs::AlignmentTable;
use crate::{AnnotateError, Coordinate, MatchingMethod, MethodResult, PreAnnotationConfig, Result};

/// Minimum trajectory length that can form a region.
pub const MIN_TRACK_POINTS: usize = 2;

/// One method's trajectory aligned onto the common index space.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTrack {
    pub method: MatchingMethod,
    pub trajectory: Vec<Coordinate>,
    /// Local index for each common index, same length as `common_indices`
    pub anchors: Vec<usize>,
}

impl NormalizedTrack {
    /// Local index of the last coordinate.
    pub fn last_index(&self) -> usize {
        self.trajectory.len() - 1
    }
}

/// All active tracks, baseline first, plus the shared common index space.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTracks {
    /// Tracks in method priority order; `tracks[0]` is the baseline
    pub tracks: Vec<NormalizedTrack>,
    /// Ascending baseline indices every track aligned to
    pub common_indices: Vec<usize>,
}

impl NormalizedTracks {
    /// The track that defines the common index space.
    pub fn baseline(&self) -> &NormalizedTrack {
        &self.tracks[0]
    }

    /// Number of positions in the common index space.
    pub fn common_len(&self) -> usize {
        self.common_indices.len()
    }
}

fn validate_trajectory(result: &MethodResult) -> Result<()> {
    if result.trajectory.len() > u32::MAX as usize {
        return Err(AnnotateError::Internal {
            message: format!(
                "{} has {} points, more than the u32 index range",
                result.method_name,
                result.trajectory.len()
            ),
        });
    }
    for (index, point) in result.trajectory.iter().enumerate() {
        if !point.is_valid() {
            return Err(AnnotateError::InvalidCoordinates {
                method: result.method_name.clone(),
                index,
                message: format!(
                    "({}, {}) is not a finite WGS84 coordinate",
                    point.longitude, point.latitude
                ),
            });
        }
    }
    Ok(())
}

/// Select, validate and order the methods that take part in this run.
fn active_methods<'a>(
    methods: &'a [MethodResult],
    config: &PreAnnotationConfig,
) -> Result<Vec<(MatchingMethod, &'a MethodResult)>> {
    let mut active: Vec<(MatchingMethod, &MethodResult)> = Vec::with_capacity(methods.len());

    for result in methods {
        let method = result.method();
        if config.is_disabled(&method) {
            debug!("[PreAnnotation] Skipping disabled method {}", method);
            continue;
        }
        validate_trajectory(result)?;
        if result.trajectory.len() < MIN_TRACK_POINTS {
            warn!(
                "[PreAnnotation] Dropping {}: {} points, minimum {} required",
                method,
                result.trajectory.len(),
                MIN_TRACK_POINTS
            );
            continue;
        }
        if active.iter().any(|(m, _)| m == &method) {
            return Err(AnnotateError::DuplicateMethod {
                method: method.to_string(),
            });
        }
        active.push((method, result));
    }

    active.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(active)
}

/// Normalize method results onto a common index space.
///
/// Returns `Ok(None)` when no method has enough points to form a region.
pub fn normalize_tracks(
    methods: &[MethodResult],
    config: &PreAnnotationConfig,
) -> Result<Option<NormalizedTracks>> {
    let active = active_methods(methods, config)?;
    let Some(((baseline_method, baseline), others)) = active.split_first() else {
        debug!("[PreAnnotation] No usable method results");
        return Ok(None);
    };

    let tolerance = config.tolerance();
    let baseline_traj = baseline.trajectory.as_slice();

    // Per other track: baseline index -> local index
    let index_maps: Vec<Vec<Option<usize>>> = others
        .iter()
        .map(|(_, result)| {
            AlignmentTable::new(baseline_traj, &result.trajectory, tolerance).index_map()
        })
        .collect();

    let common_indices: Vec<usize> = (0..baseline_traj.len())
        .filter(|&i| index_maps.iter().all(|map| map[i].is_some()))
        .collect();

    let mut tracks = Vec::with_capacity(active.len());
    tracks.push(NormalizedTrack {
        method: baseline_method.clone(),
        trajectory: baseline.trajectory.clone(),
        anchors: common_indices.clone(),
    });
    for ((method, result), map) in others.iter().zip(index_maps.iter()) {
        let anchors = common_indices
            .iter()
            .filter_map(|&i| map[i])
            .collect();
        tracks.push(NormalizedTrack {
            method: method.clone(),
            trajectory: result.trajectory.clone(),
            anchors,
        });
    }

    debug!(
        "[PreAnnotation] Normalized {} tracks against {} ({} points), {} common indices",
        tracks.len(),
        baseline_method,
        baseline_traj.len(),
        common_indices.len()
    );

    Ok(Some(NormalizedTracks {
        tracks,
        common_indices,
    }))
}
