//! Region building and id assignment.
//!
//! Turns classified runs into the three output collections. A region's id is
//! the baseline index at which it ends. Two regions end at the same index
//! whenever a divergent region closes on a common index that is also a
//! one-point matched region, and when a ragged trailing region follows the
//! last common index at the end of the baseline. Ids therefore go through
//! [`IdAllocator`], which keeps them strictly increasing in scan order. A
//! bumped id is not a baseline index and can exceed the last one.

use log::{debug, warn};

use crate::areas::{MatchedArea, MismatchedArea, PreMatchedArea, PreprocessAreas};
use crate::classify::ClassifiedRun;
use crate::{AnnotateError, Result};

/// Issues strictly increasing region ids from their ending common index.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last: Option<u32>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for a region ending at `candidate`, or one past the last id when
    /// `candidate` would not increase.
    pub fn next(&mut self, candidate: u32) -> u32 {
        let id = match self.last {
            Some(prev) if candidate <= prev => prev.saturating_add(1),
            _ => candidate,
        };
        self.last = Some(id);
        id
    }

    /// The most recently issued id.
    pub fn last(&self) -> Option<u32> {
        self.last
    }
}

/// Assemble classified runs, in scan order, into [`PreprocessAreas`].
pub fn build_areas(runs: Vec<ClassifiedRun>) -> Result<PreprocessAreas> {
    let mut areas = PreprocessAreas::default();
    let mut ids = IdAllocator::new();

    for run in runs {
        if run.owner_count() == 0 {
            warn!(
                "[PreAnnotation] Skipping region ending at {} with no contributing method",
                run.end()
            );
            continue;
        }

        let candidate = u32::try_from(run.end()).map_err(|_| AnnotateError::Internal {
            message: format!("region end {} exceeds the u32 id range", run.end()),
        })?;
        let id = ids.next(candidate);

        match run {
            ClassifiedRun::Matched { sub_traj, .. } => {
                areas.matched_areas.push(MatchedArea { id, sub_traj });
            }
            ClassifiedRun::PreMatched { sub_traj, .. } => {
                areas.prematched_areas.push(PreMatchedArea { id, sub_traj });
            }
            ClassifiedRun::Mismatched { sub_trajs, .. } => {
                areas.mismatched_areas.push(MismatchedArea { id, sub_trajs });
            }
        }
    }

    debug!(
        "[PreAnnotation] Built {} areas, last id {:?}",
        areas.area_count(),
        ids.last()
    );

    Ok(areas)
}
