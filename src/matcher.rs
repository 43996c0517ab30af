//! Scoring of a pattern against registered gesture patterns.
//!
//! Every score follows "lower is more similar"; `0` is a perfect match and
//! `f64::INFINITY` means the pair cannot be compared (an empty pattern).
use strum::{Display, EnumString, IntoStaticStr};

use crate::vector::{Vector, direction_difference};

/// How a live pattern is compared with the registered ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum MatchingAlgorithm {
    /// Direction sequence weighted by relative segment length.
    #[strum(to_string = "strict")]
    Strict,
    /// Direction sequence only, aligned with dynamic time warping.
    #[strum(to_string = "shape_independent", serialize = "shapeindependent")]
    ShapeIndependent,
    /// DTW as a filter, then DTW + strict as the ranking.
    #[default]
    #[strum(to_string = "combined")]
    Combined,
}

/// The winning candidate and its score.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<I> {
    pub id: I,
    pub score: f64,
}

/// Matcher bound to a tolerance and algorithm, refreshed via `apply_config`.
#[derive(Debug, Clone, Copy)]
pub struct GestureMatcher {
    deviation_tolerance: f64,
    algorithm: MatchingAlgorithm,
}

impl GestureMatcher {
    pub fn new(deviation_tolerance: f64, algorithm: MatchingAlgorithm) -> Self {
        Self {
            deviation_tolerance,
            algorithm,
        }
    }

    pub fn apply_config(&mut self, deviation_tolerance: f64, algorithm: MatchingAlgorithm) {
        self.deviation_tolerance = deviation_tolerance;
        self.algorithm = algorithm;
    }

    pub fn algorithm(&self) -> MatchingAlgorithm {
        self.algorithm
    }

    pub fn deviation_tolerance(&self) -> f64 {
        self.deviation_tolerance
    }

    /// Best candidate for `query` under the configured algorithm.
    pub fn best_match<'a, I>(
        &self,
        query: &[Vector],
        candidates: impl IntoIterator<Item = (&'a [Vector], I)>,
    ) -> Option<MatchResult<I>> {
        match_pattern(query, candidates, self.algorithm, self.deviation_tolerance)
    }
}

/// Pick the lowest-scoring candidate for `query`, or `None` when nothing
/// scores strictly below `tolerance`.
///
/// Under [`MatchingAlgorithm::Combined`] the tolerance only gates the DTW
/// stage; survivors are ranked by the sum of both scores. On equal scores
/// the earliest candidate wins.
pub fn match_pattern<'a, I>(
    query: &[Vector],
    candidates: impl IntoIterator<Item = (&'a [Vector], I)>,
    algorithm: MatchingAlgorithm,
    tolerance: f64,
) -> Option<MatchResult<I>> {
    let mut best: Option<MatchResult<I>> = None;

    for (pattern, id) in candidates {
        let Some(score) = candidate_score(query, pattern, algorithm, tolerance) else {
            continue;
        };
        if best.as_ref().is_none_or(|b| score < b.score) {
            best = Some(MatchResult { id, score });
        }
    }

    best
}

/// Score of a single candidate, `None` when it is not eligible at all.
fn candidate_score(
    query: &[Vector],
    pattern: &[Vector],
    algorithm: MatchingAlgorithm,
    tolerance: f64,
) -> Option<f64> {
    match algorithm {
        MatchingAlgorithm::Strict => {
            Some(similarity_by_proportion(query, pattern)).filter(|s| *s < tolerance)
        }
        MatchingAlgorithm::ShapeIndependent => {
            Some(similarity_by_dtw(query, pattern)).filter(|s| *s < tolerance)
        }
        MatchingAlgorithm::Combined => {
            let dtw = similarity_by_dtw(query, pattern);
            if dtw >= tolerance {
                return None;
            }
            Some(dtw + similarity_by_proportion(query, pattern))
        }
    }
}

/// Proportional-magnitude comparison.
///
/// Both patterns are laid out on a `0..1` axis by cumulative length, and the
/// direction difference of each overlapping pair of segments is weighted by
/// the width of their overlap.
pub fn similarity_by_proportion(a: &[Vector], b: &[Vector]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }

    let total_a = normalizer(a);
    let total_b = normalizer(b);

    let (mut i, mut j) = (0, 0);
    let (mut start_a, mut start_b) = (0.0, 0.0);
    let mut total_difference = 0.0;

    while i < a.len() && j < b.len() {
        let (va, vb) = (a[i], b[j]);
        let end_a = start_a + va.magnitude() / total_a;
        let end_b = start_b + vb.magnitude() / total_b;

        let overlap = overlap_proportion(start_a, end_a, start_b, end_b);

        if end_a > end_b {
            j += 1;
            start_b = end_b;
        } else if end_a < end_b {
            i += 1;
            start_a = end_a;
        } else {
            i += 1;
            j += 1;
            start_a = end_a;
            start_b = end_b;
        }

        total_difference += direction_difference(va, vb).abs() * overlap;
    }

    total_difference
}

/// Dynamic-time-warping comparison of the direction sequences, normalized
/// by the longer pattern's length.
pub fn similarity_by_dtw(a: &[Vector], b: &[Vector]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }

    let (rows, cols) = (a.len(), b.len());
    let mut dtw = vec![f64::INFINITY; rows * cols];
    let at = |i: usize, j: usize| i * cols + j;

    for i in 0..rows {
        for j in 0..cols {
            let cost = direction_difference(a[i], b[j]).abs();
            let accumulated = match (i, j) {
                (0, 0) => cost,
                (_, 0) => cost + dtw[at(i - 1, 0)],
                (0, _) => cost + dtw[at(0, j - 1)],
                _ => {
                    cost + dtw[at(i - 1, j)]
                        .min(dtw[at(i, j - 1)])
                        .min(dtw[at(i - 1, j - 1)])
                }
            };
            dtw[at(i, j)] = accumulated;
        }
    }

    dtw[at(rows - 1, cols - 1)] / rows.max(cols) as f64
}

/// Sum of vector magnitudes.
pub fn pattern_magnitude(pattern: &[Vector]) -> f64 {
    pattern.iter().map(Vector::magnitude).sum()
}

/// Total length used to turn segment lengths into proportions; a pattern
/// made only of zero vectors counts as length 1.
fn normalizer(pattern: &[Vector]) -> f64 {
    let total = pattern_magnitude(pattern);
    if total > 0.0 { total } else { 1.0 }
}

fn overlap_proportion(min_a: f64, max_a: f64, min_b: f64, max_b: f64) -> f64 {
    (max_a.min(max_b) - min_a.max(min_b)).max(0.0)
}
