//! Alignment and region classification.
//!
//! Walks the common index space of the normalized tracks in lockstep and cuts
//! it into runs:
//!
//! - **Matched runs**: maximal chains of common positions where every track
//!   advances by exactly one point per step. A position with no agreed step on
//!   either side forms a single-point matched run, which pins the shared
//!   boundary between two divergent runs.
//! - **Divergent runs**: the stretch between two consecutive common positions
//!   when the step is not agreed, plus the ragged stretches before the first
//!   and after the last common position. Each method contributes its own
//!   slice. Candidates that agree pairwise are grouped with union-find, and
//!   the number of groups decides between matched, pre-matched and
//!   mismatched.

use log::debug;

use crate::areas::{MergedSubTrajArray, SubTrajArray, SubTrajOwner};
use crate::geo_utils::paths_agree;
use crate::loops::{collapse_circles, detect_circle};
use crate::normalize::{NormalizedTrack, NormalizedTracks};
use crate::{AnnotateError, Coordinate, OptionExt, PreAnnotationConfig, Result, UnionFind};

/// A classified run, tagged with the baseline index at which it ends.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedRun {
    Matched {
        end: usize,
        sub_traj: SubTrajArray,
    },
    PreMatched {
        end: usize,
        sub_traj: MergedSubTrajArray,
    },
    Mismatched {
        end: usize,
        sub_trajs: Vec<MergedSubTrajArray>,
    },
}

impl ClassifiedRun {
    /// Baseline index at which the run ends, the id candidate of its region.
    pub fn end(&self) -> usize {
        match self {
            ClassifiedRun::Matched { end, .. }
            | ClassifiedRun::PreMatched { end, .. }
            | ClassifiedRun::Mismatched { end, .. } => *end,
        }
    }

    /// Number of method contributions recorded for the run.
    pub fn owner_count(&self) -> usize {
        match self {
            ClassifiedRun::Matched { .. } => 1,
            ClassifiedRun::PreMatched { sub_traj, .. } => sub_traj.owners.len(),
            ClassifiedRun::Mismatched { sub_trajs, .. } => {
                sub_trajs.iter().map(|s| s.owners.len()).sum()
            }
        }
    }
}

fn local_index(index: usize) -> Result<u32> {
    u32::try_from(index).map_err(|_| AnnotateError::Internal {
        message: format!("local index {} exceeds the u32 range", index),
    })
}

/// One method's slice of a divergent run.
struct Candidate<'a> {
    track: &'a NormalizedTrack,
    start: usize,
    end: usize,
    has_circle: bool,
    /// Loop-free path used for comparison, only when a loop was collapsed
    collapsed: Option<Vec<Coordinate>>,
}

impl<'a> Candidate<'a> {
    fn raw(&self) -> &'a [Coordinate] {
        &self.track.trajectory[self.start..=self.end]
    }

    fn net(&self) -> &[Coordinate] {
        self.collapsed.as_deref().unwrap_or_else(|| self.raw())
    }

    fn is_single_point(&self) -> bool {
        self.start == self.end
    }

    fn owner(&self) -> Result<SubTrajOwner> {
        Ok(SubTrajOwner::new(
            self.track.method.clone(),
            local_index(self.start)?,
            local_index(self.end)?,
        ))
    }
}

/// Region classifier over one set of normalized tracks.
struct Classifier<'a> {
    tracks: &'a NormalizedTracks,
    tolerance: f64,
    window: usize,
    auto_merge: bool,
}

impl<'a> Classifier<'a> {
    fn new(tracks: &'a NormalizedTracks, config: &PreAnnotationConfig) -> Self {
        Self {
            tracks,
            tolerance: config.tolerance(),
            window: config.loop_search_window,
            auto_merge: config.auto_merge_circle,
        }
    }

    /// Every track advances by exactly one point between positions `k - 1` and `k`.
    fn is_agreed_step(&self, k: usize) -> bool {
        self.tracks
            .tracks
            .iter()
            .all(|t| t.anchors[k] == t.anchors[k - 1] + 1)
    }

    /// Matched run over common positions `first..=last`, with the baseline as geometry.
    fn matched_run(&self, first: usize, last: usize) -> Result<ClassifiedRun> {
        let baseline = self.tracks.baseline();
        let (start, end) = (baseline.anchors[first], baseline.anchors[last]);
        let owner = SubTrajOwner::new(
            baseline.method.clone(),
            local_index(start)?,
            local_index(end)?,
        );
        let traj = baseline.trajectory[start..=end].to_vec();

        Ok(ClassifiedRun::Matched {
            end: self.tracks.common_indices[last],
            sub_traj: SubTrajArray::new(owner, traj, self.tolerance, self.window),
        })
    }

    /// Divergent run over per-track local ranges, `None` when no method moves.
    fn divergent_run(
        &self,
        ranges: impl Iterator<Item = (usize, usize)>,
        end: usize,
    ) -> Result<Option<ClassifiedRun>> {
        let candidates: Vec<Candidate> = self
            .tracks
            .tracks
            .iter()
            .zip(ranges)
            .map(|(track, (start, stop))| {
                let slice = &track.trajectory[start..=stop];
                let has_circle = detect_circle(slice, self.tolerance, self.window);
                let collapsed = (self.auto_merge && has_circle)
                    .then(|| collapse_circles(slice, self.tolerance, self.window));
                Candidate {
                    track,
                    start,
                    end: stop,
                    has_circle,
                    collapsed,
                }
            })
            .collect();

        if candidates.iter().all(Candidate::is_single_point) {
            return Ok(None);
        }

        self.group_candidates(&candidates, end).map(Some)
    }

    /// Whether two candidates agree as they are, or after loop collapse.
    fn candidates_agree(&self, a: &Candidate, b: &Candidate) -> bool {
        paths_agree(a.raw(), b.raw(), self.tolerance)
            || (self.auto_merge
                && (a.has_circle || b.has_circle)
                && paths_agree(a.net(), b.net(), self.tolerance))
    }

    /// Group candidates so every pair inside a group agrees.
    ///
    /// Pairs are visited in priority order. Two sets merge only when all of
    /// their members agree with each other, so agreement never chains through
    /// an intermediate candidate.
    fn group_indices(&self, candidates: &[Candidate]) -> Vec<Vec<usize>> {
        let n = candidates.len();
        let mut uf = UnionFind::from_items(0..n);

        for i in 0..n {
            for j in (i + 1)..n {
                if uf.connected(&i, &j) || !self.candidates_agree(&candidates[i], &candidates[j]) {
                    continue;
                }
                let mut left = Vec::new();
                let mut right = Vec::new();
                for k in 0..n {
                    if uf.connected(&k, &i) {
                        left.push(k);
                    } else if uf.connected(&k, &j) {
                        right.push(k);
                    }
                }
                let complete = left.iter().all(|&a| {
                    right
                        .iter()
                        .all(|&b| self.candidates_agree(&candidates[a], &candidates[b]))
                });
                if complete {
                    uf.union(&i, &j);
                }
            }
        }

        uf.groups()
    }

    fn group_candidates(&self, candidates: &[Candidate], end: usize) -> Result<ClassifiedRun> {
        let groups = self.group_indices(candidates);
        let mut merged = Vec::with_capacity(groups.len());
        let mut any_error = false;

        for members in &groups {
            let (base, traj) = self.representative(candidates, members)?;
            let mut owners = Vec::with_capacity(members.len());
            for &m in members {
                let candidate = &candidates[m];
                let mut owner = candidate.owner()?;
                owner.has_error = self.auto_merge
                    && candidate.has_circle
                    && !paths_agree(candidate.raw(), &traj, self.tolerance);
                any_error |= owner.has_error;
                owners.push(owner);
            }
            merged.push((
                base,
                MergedSubTrajArray {
                    traj,
                    owners,
                    base_owner_type: candidates[base].track.method.clone(),
                },
            ));
        }

        if merged.len() == 1 {
            let (base, sub_traj) = merged.remove(0);
            if any_error {
                return Ok(ClassifiedRun::PreMatched { end, sub_traj });
            }
            let candidate = &candidates[base];
            return Ok(ClassifiedRun::Matched {
                end,
                sub_traj: SubTrajArray::new(
                    candidate.owner()?,
                    candidate.raw().to_vec(),
                    self.tolerance,
                    self.window,
                ),
            });
        }

        let mut sub_trajs: Vec<MergedSubTrajArray> = merged.into_iter().map(|(_, s)| s).collect();
        sub_trajs.sort_by(|a, b| {
            b.owners
                .len()
                .cmp(&a.owners.len())
                .then_with(|| a.base_owner_type.cmp(&b.base_owner_type))
        });
        Ok(ClassifiedRun::Mismatched { end, sub_trajs })
    }

    /// Pick the geometry that represents a group.
    ///
    /// Members are in priority order. The first loop-free member wins with its
    /// raw path. When every member has a loop, the first member's raw path is
    /// kept if all members agree with it as-is, otherwise its collapsed path.
    fn representative(
        &self,
        candidates: &[Candidate],
        members: &[usize],
    ) -> Result<(usize, Vec<Coordinate>)> {
        if let Some(&m) = members.iter().find(|&&m| !candidates[m].has_circle) {
            return Ok((m, candidates[m].raw().to_vec()));
        }

        let first = *members.first().ok_or_internal("empty candidate group")?;
        let raw = candidates[first].raw();
        let all_raw_agree = members
            .iter()
            .all(|&m| paths_agree(candidates[m].raw(), raw, self.tolerance));

        let traj = if all_raw_agree {
            raw.to_vec()
        } else {
            candidates[first].net().to_vec()
        };
        Ok((first, traj))
    }

    fn classify(&self) -> Result<Vec<ClassifiedRun>> {
        let tracks = &self.tracks.tracks;
        let baseline_last = self.tracks.baseline().last_index();
        let n = self.tracks.common_len();
        let mut runs = Vec::new();

        if n == 0 {
            let whole = tracks.iter().map(|t| (0, t.last_index()));
            runs.extend(self.divergent_run(whole, baseline_last)?);
            return Ok(runs);
        }

        let leading = tracks.iter().map(|t| (0, t.anchors[0]));
        runs.extend(self.divergent_run(leading, self.tracks.common_indices[0])?);

        let mut chain_start = 0;
        for k in 1..n {
            if self.is_agreed_step(k) {
                continue;
            }
            runs.push(self.matched_run(chain_start, k - 1)?);
            let between = tracks.iter().map(|t| (t.anchors[k - 1], t.anchors[k]));
            runs.extend(self.divergent_run(between, self.tracks.common_indices[k])?);
            chain_start = k;
        }
        runs.push(self.matched_run(chain_start, n - 1)?);

        let trailing = tracks.iter().map(|t| (t.anchors[n - 1], t.last_index()));
        runs.extend(self.divergent_run(trailing, baseline_last)?);

        Ok(runs)
    }
}

/// Classify the normalized tracks into runs, in scan order.
pub fn classify_runs(
    tracks: &NormalizedTracks,
    config: &PreAnnotationConfig,
) -> Result<Vec<ClassifiedRun>> {
    let runs = Classifier::new(tracks, config).classify()?;

    debug!(
        "[PreAnnotation] Classified {} runs: {} matched, {} pre-matched, {} mismatched",
        runs.len(),
        runs.iter().filter(|r| matches!(r, ClassifiedRun::Matched { .. })).count(),
        runs.iter().filter(|r| matches!(r, ClassifiedRun::PreMatched { .. })).count(),
        runs.iter().filter(|r| matches!(r, ClassifiedRun::Mismatched { .. })).count(),
    );

    Ok(runs)
}
