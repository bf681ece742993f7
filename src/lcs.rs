//! Longest-common-subsequence alignment between two trajectories.
//!
//! Map-matched outputs of the same raw trajectory visit mostly the same road
//! geometry, but each method may insert or omit points. The LCS over
//! "agreeing" coordinates recovers which points correspond. Agreement uses the
//! engine tolerance instead of exact equality, so the table is built with
//! [`points_agree`] as its match predicate.
//!
//! The table is stored flat (`(a.len() + 1) * (b.len() + 1)` cells) and the
//! backtrack is iterative, so long trajectories cannot overflow the stack.

use crate::geo_utils::points_agree;
use crate::Coordinate;

/// LCS length table for aligning trajectory `a` against trajectory `b`.
#[derive(Debug)]
pub struct AlignmentTable<'a> {
    lengths: Vec<u32>,
    width: usize,
    a: &'a [Coordinate],
    b: &'a [Coordinate],
    tolerance: f64,
}

impl<'a> AlignmentTable<'a> {
    /// Build the table for `a` and `b` with the given agreement tolerance in meters.
    pub fn new(a: &'a [Coordinate], b: &'a [Coordinate], tolerance: f64) -> Self {
        let width = b.len() + 1;
        let mut lengths = vec![0u32; (a.len() + 1) * width];

        for i in 0..a.len() {
            for j in 0..b.len() {
                let cell = (i + 1) * width + (j + 1);
                lengths[cell] = if points_agree(&a[i], &b[j], tolerance) {
                    lengths[i * width + j] + 1
                } else {
                    lengths[i * width + (j + 1)].max(lengths[(i + 1) * width + j])
                };
            }
        }

        Self {
            lengths,
            width,
            a,
            b,
            tolerance,
        }
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> u32 {
        self.lengths[i * self.width + j]
    }

    /// Length of the longest common subsequence.
    pub fn len(&self) -> usize {
        self.at(self.a.len(), self.b.len()) as usize
    }

    /// Whether the two trajectories share no agreeing point.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index pairs `(index_in_a, index_in_b)` of the longest common subsequence,
    /// ascending in both components.
    ///
    /// Ties prefer skipping points of `a` first, which matches points of `b`
    /// as late as possible. For a U-turn in `b` this anchors on the second
    /// visit, leaving the loop in front of the anchor.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::with_capacity(self.len());
        let (mut i, mut j) = (self.a.len(), self.b.len());

        while i > 0 && j > 0 {
            if points_agree(&self.a[i - 1], &self.b[j - 1], self.tolerance) {
                pairs.push((i - 1, j - 1));
                i -= 1;
                j -= 1;
            } else if self.at(i, j - 1) > self.at(i - 1, j) {
                j -= 1;
            } else {
                i -= 1;
            }
        }

        pairs.reverse();
        pairs
    }

    /// Map from each index of `a` to its aligned index in `b`, if any.
    pub fn index_map(&self) -> Vec<Option<usize>> {
        let mut map = vec![None; self.a.len()];
        for (i, j) in self.pairs() {
            map[i] = Some(j);
        }
        map
    }
}
