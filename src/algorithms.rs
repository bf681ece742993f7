//! # Algorithm Toolbox
//!
//! Direct access to the individual pipeline stages, for callers that want to
//! inspect or reuse one stage without running the full engine.
//!
//! ## Stages
//!
//! - **Alignment**: tolerance-aware LCS between two trajectories
//! - **Loop handling**: U-turn detection and collapse
//! - **Normalization**: common index space across methods
//! - **Classification**: matched / pre-matched / mismatched runs
//! - **Building**: id assignment and output assembly
//!
//! # Example
//!
//! ```rust
//! use pre_annotation::algorithms::{collapse_circles, detect_circle, Coordinate};
//!
//! let u_turn = vec![
//!     Coordinate::new(0.0, 0.0),
//!     Coordinate::new(1.0, 0.0),
//!     Coordinate::new(1.0, 1.0),
//!     Coordinate::new(1.0, 0.0),
//!     Coordinate::new(2.0, 0.0),
//! ];
//! assert!(detect_circle(&u_turn, 0.5, 64));
//! assert_eq!(collapse_circles(&u_turn, 0.5, 64).len(), 3);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{Bounds, Coordinate, MatchingMethod, MethodResult, PreAnnotationConfig};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{
    compute_bounds, haversine_distance, meters_to_degrees, paths_agree, points_agree,
    DISTANCE_EPSILON_METERS,
};

// =============================================================================
// Alignment
// =============================================================================

/// LCS table over agreeing coordinates.
///
/// Backtracking prefers late matches in the second trajectory, so a U-turn
/// is left in front of its anchor where loop collapse can remove it.
pub use crate::lcs::AlignmentTable;

// =============================================================================
// Loop Handling
// =============================================================================

/// Earliest revisit within the search window, found via an R-tree prefilter.
pub use crate::loops::find_circle;
pub use crate::loops::{collapse_circles, detect_circle};

// =============================================================================
// Pipeline Stages
// =============================================================================

/// Order, validate and align method results onto the common index space.
pub use crate::normalize::{normalize_tracks, NormalizedTrack, NormalizedTracks};

/// Cut the common index space into classified runs.
pub use crate::classify::{classify_runs, ClassifiedRun};

/// Assign ids and assemble the output collections.
pub use crate::builder::{build_areas, IdAllocator};

/// Union-Find used to group equivalent candidates.
pub use crate::union_find::UnionFind;
