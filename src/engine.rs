//! # Pre-Annotation Engine
//!
//! Entry points that run the full pipeline:
//!
//! ```text
//! MethodResult[] -> normalize_tracks -> classify_runs -> build_areas -> PreprocessAreas
//! ```
//!
//! The engine is stateless. Every call validates its configuration, builds a
//! fresh result and hands it to the caller; nothing is cached between calls.
//! The JSON variants are the boundary used by the WASM exports and by the
//! backend when it re-runs pre-annotation over stored datasets.

use log::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::annotation::{analyze_methods, merge_annotated_trajectory, Resolutions};
use crate::builder::build_areas;
use crate::classify::classify_runs;
use crate::normalize::normalize_tracks;
use crate::{MethodResult, PreAnnotationConfig, PreprocessAreas, Result};

/// Partition method results into matched, pre-matched and mismatched areas.
///
/// Absent or degenerate input narrows the output instead of failing: with no
/// usable method the result is empty. Errors are reserved for contract
/// violations (invalid configuration, invalid coordinates, duplicate methods).
pub fn pre_annotate(
    methods: &[MethodResult],
    config: &PreAnnotationConfig,
) -> Result<PreprocessAreas> {
    config.validate()?;

    let Some(tracks) = normalize_tracks(methods, config)? else {
        return Ok(PreprocessAreas::default());
    };

    let runs = classify_runs(&tracks, config)?;
    let areas = build_areas(runs)?;

    debug!(
        "[PreAnnotation] {} methods -> {} matched, {} pre-matched, {} mismatched",
        tracks.tracks.len(),
        areas.matched_areas.len(),
        areas.prematched_areas.len(),
        areas.mismatched_areas.len()
    );

    Ok(areas)
}

/// Parse an optional JSON config; an empty string means the defaults.
fn parse_config(config_json: &str) -> Result<PreAnnotationConfig> {
    if config_json.trim().is_empty() {
        return Ok(PreAnnotationConfig::default());
    }
    Ok(serde_json::from_str(config_json)?)
}

/// JSON boundary for [`pre_annotate`].
///
/// `methods_json` is an array of `{method_name, trajectory}` records;
/// `config_json` may be empty or a partial config object.
pub fn pre_annotate_json(methods_json: &str, config_json: &str) -> Result<String> {
    let methods: Vec<MethodResult> = serde_json::from_str(methods_json)?;
    let config = parse_config(config_json)?;

    info!(
        "[PreAnnotation] Pre-annotating {} method results (auto_merge_circle={})",
        methods.len(),
        config.auto_merge_circle
    );

    let areas = pre_annotate(&methods, &config)?;
    Ok(serde_json::to_string(&areas)?)
}

/// JSON boundary for [`merge_annotated_trajectory`].
pub fn merge_annotation_json(areas_json: &str, resolutions_json: &str) -> Result<String> {
    let areas: PreprocessAreas = serde_json::from_str(areas_json)?;
    let resolutions: Resolutions = serde_json::from_str(resolutions_json)?;

    info!(
        "[PreAnnotation] Merging {} areas with {} resolutions",
        areas.area_count(),
        resolutions.len()
    );

    let trajectory = merge_annotated_trajectory(&areas, &resolutions)?;
    Ok(serde_json::to_string(&trajectory)?)
}

/// JSON boundary for [`analyze_methods`].
pub fn analyze_annotation_json(
    methods_json: &str,
    areas_json: &str,
    resolutions_json: &str,
) -> Result<String> {
    let methods: Vec<MethodResult> = serde_json::from_str(methods_json)?;
    let areas: PreprocessAreas = serde_json::from_str(areas_json)?;
    let resolutions: Resolutions = serde_json::from_str(resolutions_json)?;

    info!(
        "[PreAnnotation] Analyzing {} methods over {} mismatched areas",
        methods.len(),
        areas.mismatched_areas.len()
    );

    let analysis = analyze_methods(&methods, &areas, &resolutions)?;
    Ok(serde_json::to_string(&analysis)?)
}

/// Pre-annotate many independent trajectories.
///
/// Each file is a separate engine call; one failure does not affect the
/// others. Results are returned in input order.
#[cfg(feature = "parallel")]
pub fn pre_annotate_batch(
    files: &[Vec<MethodResult>],
    config: &PreAnnotationConfig,
) -> Vec<Result<PreprocessAreas>> {
    info!("[PreAnnotation] Batch of {} files (parallel)", files.len());
    files
        .par_iter()
        .map(|methods| pre_annotate(methods, config))
        .collect()
}

/// Pre-annotate many independent trajectories.
///
/// Each file is a separate engine call; one failure does not affect the
/// others. Results are returned in input order.
#[cfg(not(feature = "parallel"))]
pub fn pre_annotate_batch(
    files: &[Vec<MethodResult>],
    config: &PreAnnotationConfig,
) -> Vec<Result<PreprocessAreas>> {
    info!("[PreAnnotation] Batch of {} files", files.len());
    files
        .iter()
        .map(|methods| pre_annotate(methods, config))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
