//! # Pre-Annotation
//!
//! Reconciliation engine for map-matching annotation datasets.
//!
//! Several map-matching methods (GHMapMatching, SimpleMapMatching,
//! STMatching, ...) match the same raw GPS trajectory against a road network.
//! This library partitions their outputs into regions that a human annotator
//! can work through:
//! - **matched** areas, where every method agrees pointwise
//! - **pre-matched** areas, where methods agree once U-turn loops are collapsed
//! - **mismatched** areas, where the annotator must pick a candidate
//!
//! The engine is pure and synchronous. It runs in the browser as a WASM module
//! on every data load, so identical input always yields identical output.
//!
//! ## Features
//!
//! - **`parallel`** - Batch pre-annotation with rayon
//! - **`wasm`** - wasm-bindgen exports for the annotation frontend
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use pre_annotation::{pre_annotate, Coordinate, MethodResult, PreAnnotationConfig};
//!
//! let straight = vec![
//!     Coordinate::new(116.300, 39.900),
//!     Coordinate::new(116.301, 39.901),
//!     Coordinate::new(116.302, 39.902),
//! ];
//! let methods = vec![
//!     MethodResult::new("GHMapMatching", straight.clone()),
//!     MethodResult::new("STMatching", straight),
//! ];
//!
//! let areas = pre_annotate(&methods, &PreAnnotationConfig::default()).unwrap();
//! assert_eq!(areas.matched_areas.len(), 1);
//! assert!(areas.mismatched_areas.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// Unified error handling
pub mod error;
pub use error::{AnnotateError, OptionExt, Result};

// Union-Find data structure for merging equivalent candidates
pub mod union_find;
pub use union_find::UnionFind;

// Geographic utilities (distance, agreement tests, bounds)
pub mod geo_utils;

// Tolerance-aware longest-common-subsequence alignment
pub mod lcs;
pub use lcs::AlignmentTable;

// U-turn / loop detection and collapse
pub mod loops;
pub use loops::{collapse_circles, detect_circle, find_circle};

// Owner track normalization onto the common index space
pub mod normalize;
pub use normalize::{normalize_tracks, NormalizedTrack, NormalizedTracks};

// Output data model
pub mod areas;
pub use areas::{
    MatchedArea, MergedSubTrajArray, MismatchedArea, PreMatchedArea, PreprocessAreas,
    SubTrajArray, SubTrajOwner,
};

// Alignment & region classification
pub mod classify;
pub use classify::{classify_runs, ClassifiedRun};

// Region building and id assignment
pub mod builder;
pub use builder::{build_areas, IdAllocator};

// Engine entry points (native, JSON and batch)
pub mod engine;
pub use engine::{
    analyze_annotation_json, merge_annotation_json, pre_annotate, pre_annotate_batch,
    pre_annotate_json,
};

// Annotator resolutions, merged trajectory and per-method analysis
pub mod annotation;
pub use annotation::{
    analyze_methods, merge_annotated_trajectory, submit_annotation, AnnotationSubmission,
    MethodAnalysis, Resolution, Resolutions,
};

// Algorithm toolbox - standalone access to the individual stages
pub mod algorithms;

// WASM bindings for the annotation frontend
#[cfg(feature = "wasm")]
pub mod wasm;

/// Route panics to the browser console. Safe to call more than once.
#[cfg(feature = "wasm")]
pub(crate) fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate as produced by the map-matching methods.
///
/// Raw trajectories additionally carry a timestamp; matched outputs do not.
///
/// # Example
/// ```
/// use pre_annotation::Coordinate;
/// let point = Coordinate::new(116.3975, 39.9087); // Beijing
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
    /// Unix timestamp in seconds, only present on raw trajectories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Coordinate {
    /// Create a new coordinate without timestamp.
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            timestamp: None,
        }
    }

    /// Check if the coordinate is finite and within WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a set of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from coordinates.
    pub fn from_points(points: &[Coordinate]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Grow the bounds to include another box.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lng: self.min_lng.min(other.min_lng),
            max_lng: self.max_lng.max(other.max_lng),
        }
    }
}

/// South-west and north-east corners as `[[lng, lat], [lng, lat]]`.
pub type LngLatBounds = [[f64; 2]; 2];

/// A map-matching method that produced one of the compared trajectories.
///
/// The known methods are closed variants so the classifier's comparison logic
/// is checked exhaustively. Any other name (e.g. a human annotator's own
/// trajectory) is carried by [`MatchingMethod::Annotator`].
///
/// Variant order is the fixed method priority used for every tie-break:
/// baseline selection, owner order and candidate numbering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchingMethod {
    GhMapMatching,
    SimpleMapMatching,
    StMatching,
    /// Not a map-matching method; ordered after the known methods by name
    Annotator(String),
}

impl MatchingMethod {
    /// The method name as it appears in upstream data.
    pub fn name(&self) -> &str {
        match self {
            MatchingMethod::GhMapMatching => "GHMapMatching",
            MatchingMethod::SimpleMapMatching => "SimpleMapMatching",
            MatchingMethod::StMatching => "STMatching",
            MatchingMethod::Annotator(name) => name,
        }
    }
}

impl From<&str> for MatchingMethod {
    fn from(name: &str) -> Self {
        match name {
            "GHMapMatching" => MatchingMethod::GhMapMatching,
            "SimpleMapMatching" => MatchingMethod::SimpleMapMatching,
            "STMatching" => MatchingMethod::StMatching,
            other => MatchingMethod::Annotator(other.to_string()),
        }
    }
}

impl From<String> for MatchingMethod {
    fn from(name: String) -> Self {
        MatchingMethod::from(name.as_str())
    }
}

impl From<MatchingMethod> for String {
    fn from(method: MatchingMethod) -> Self {
        method.name().to_string()
    }
}

impl fmt::Display for MatchingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One matching method's output for the raw trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    pub method_name: String,
    pub trajectory: Vec<Coordinate>,
}

impl MethodResult {
    /// Create a method result.
    pub fn new(method_name: &str, trajectory: Vec<Coordinate>) -> Self {
        Self {
            method_name: method_name.to_string(),
            trajectory,
        }
    }

    /// The typed method this result belongs to.
    pub fn method(&self) -> MatchingMethod {
        MatchingMethod::from(self.method_name.as_str())
    }
}

/// Detail record served by the backend for one (dataset group, file) pair.
///
/// Only `matching_result` feeds the engine; the raw trajectory and bounds are
/// carried through for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingResultDetail {
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub traj_name: String,
    pub bounds: LngLatBounds,
    pub raw_traj: Vec<Coordinate>,
    pub matching_result: Vec<MethodResult>,
}

impl MatchingResultDetail {
    /// Run the engine over this record's matching results.
    pub fn pre_annotate(&self, config: &PreAnnotationConfig) -> Result<PreprocessAreas> {
        engine::pre_annotate(&self.matching_result, config)
    }
}

/// Configuration for the pre-annotation engine.
///
/// Passed explicitly on every call; the engine holds no state between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreAnnotationConfig {
    /// Collapse detected U-turn loops before comparing candidates.
    /// Agreement reached this way yields pre-matched areas.
    /// Default: true
    pub auto_merge_circle: bool,

    /// Agreement tolerance in meters. Two coordinates agree when their
    /// haversine distance is at most this value (inclusive).
    /// Floored at [`geo_utils::DISTANCE_EPSILON_METERS`].
    /// Default: 0.5
    pub simplify_threshold: f64,

    /// Methods excluded from the run, treated as if their results were absent.
    /// Default: empty
    pub disabled_annotators: Vec<MatchingMethod>,

    /// Maximum index distance between the two visits of a loop.
    /// Default: 64
    pub loop_search_window: usize,
}

impl Default for PreAnnotationConfig {
    fn default() -> Self {
        Self {
            auto_merge_circle: true,
            simplify_threshold: 0.5,
            disabled_annotators: Vec::new(),
            loop_search_window: 64,
        }
    }
}

impl PreAnnotationConfig {
    /// Reject configurations that would make region boundaries meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.simplify_threshold.is_finite() || self.simplify_threshold < 0.0 {
            return Err(AnnotateError::ConfigError {
                message: format!(
                    "simplify_threshold must be a finite, non-negative distance, got {}",
                    self.simplify_threshold
                ),
            });
        }
        if self.loop_search_window < 2 {
            return Err(AnnotateError::ConfigError {
                message: format!(
                    "loop_search_window must be at least 2, got {}",
                    self.loop_search_window
                ),
            });
        }
        Ok(())
    }

    /// The effective agreement tolerance in meters.
    pub fn tolerance(&self) -> f64 {
        self.simplify_threshold
            .max(geo_utils::DISTANCE_EPSILON_METERS)
    }

    /// Whether the given method is excluded from this run.
    pub fn is_disabled(&self, method: &MatchingMethod) -> bool {
        self.disabled_annotators.contains(method)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(116.3975, 39.9087).is_valid());
        assert!(!Coordinate::new(0.0, 91.0).is_valid());
        assert!(!Coordinate::new(181.0, 0.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_coordinate_json_skips_missing_timestamp() {
        let json = serde_json::to_string(&Coordinate::new(1.0, 2.0)).unwrap();
        assert_eq!(json, r#"{"longitude":1.0,"latitude":2.0}"#);

        let raw: Coordinate =
            serde_json::from_str(r#"{"longitude":1.0,"latitude":2.0,"timestamp":17}"#).unwrap();
        assert_eq!(raw.timestamp, Some(17));
    }

    #[test]
    fn test_method_priority_order() {
        let names = ["zeta", "STMatching", "alpha", "GHMapMatching", "SimpleMapMatching"];
        let mut methods: Vec<MatchingMethod> = names
            .into_iter()
            .map(MatchingMethod::from)
            .collect();
        methods.sort();
        let names: Vec<&str> = methods.iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec!["GHMapMatching", "SimpleMapMatching", "STMatching", "alpha", "zeta"]
        );
    }

    #[test]
    fn test_method_serializes_as_name() {
        let json = serde_json::to_string(&MatchingMethod::GhMapMatching).unwrap();
        assert_eq!(json, r#""GHMapMatching""#);

        let parsed: MatchingMethod = serde_json::from_str(r#""my-annotator""#).unwrap();
        assert_eq!(parsed, MatchingMethod::Annotator("my-annotator".to_string()));
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config: PreAnnotationConfig =
            serde_json::from_str(r#"{"auto_merge_circle": false}"#).unwrap();
        assert!(!config.auto_merge_circle);
        assert_eq!(config.simplify_threshold, 0.5);
        assert_eq!(config.loop_search_window, 64);
        assert!(config.disabled_annotators.is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert!(PreAnnotationConfig::default().validate().is_ok());

        let negative = PreAnnotationConfig {
            simplify_threshold: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(AnnotateError::ConfigError { .. })
        ));

        let tiny_window = PreAnnotationConfig {
            loop_search_window: 1,
            ..Default::default()
        };
        assert!(tiny_window.validate().is_err());
    }

    #[test]
    fn test_zero_threshold_keeps_epsilon() {
        let config = PreAnnotationConfig {
            simplify_threshold: 0.0,
            ..Default::default()
        };
        assert_eq!(config.tolerance(), geo_utils::DISTANCE_EPSILON_METERS);
    }

    #[test]
    #[cfg(feature = "wasm")]
    fn test_panic_hook_installs_once() {
        set_panic_hook();
        set_panic_hook();
        let result = std::panic::catch_unwind(|| panic!("hooked"));
        assert!(result.is_err());
    }

    #[test]
    fn test_bounds() {
        let points = vec![Coordinate::new(1.0, 2.0), Coordinate::new(3.0, -1.0)];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!((bounds.min_lng, bounds.min_lat), (1.0, -1.0));
        assert_eq!((bounds.max_lng, bounds.max_lat), (3.0, 2.0));
        assert!(Bounds::from_points(&[]).is_none());
    }
}
