//! Error aggregation and partition selection.
//!
//! For each candidate partition we:
//! - fit every segment independently
//! - compute per-segment MSE and R² (relative to the segment's own mean)
//! - score the candidate by the sum of segment MSEs
//!
//! Selection rules:
//! 1. Exclude candidates with a degenerate or unsolvable segment
//! 2. Keep the strictly lowest total score
//! 3. On exact ties, keep the candidate generated first by the enumerator
//!
//! Candidates are independent, so scoring runs on the rayon pool. The reduction
//! compares `(score, generation index)`, which makes the parallel and sequential
//! paths return the same winner.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{BestFit, FitParams, FitResult, ObservationSeries, Partition, SegmentFit};
use crate::error::FitError;
use crate::fit::partition::{Partitions, count_partitions};
use crate::fit::segment::fit_segment;

/// A scored candidate, as listed by [`score_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPartition {
    pub partition: Partition,
    pub total_mse: f64,
}

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    partition: Partition,
    fit: FitResult,
}

/// Running state of the search: best candidate so far plus rejection count.
#[derive(Debug, Clone, Default)]
struct Tally {
    best: Option<Candidate>,
    rejected: usize,
}

impl Tally {
    fn merge(self, other: Tally) -> Tally {
        let best = match (self.best, other.best) {
            (Some(a), Some(b)) => Some(if prefers(&b, &a) { b } else { a }),
            (a, b) => a.or(b),
        };
        Tally {
            best,
            rejected: self.rejected + other.rejected,
        }
    }

    /// The winning candidate, or [`FitError::NoFeasibleFit`] when every
    /// enumerated candidate was rejected.
    fn into_best_fit(self, candidates: usize) -> Result<BestFit, FitError> {
        let Some(best) = self.best else {
            return Err(FitError::NoFeasibleFit { candidates });
        };
        Ok(BestFit {
            partition: best.partition,
            fit: best.fit,
            candidates,
            rejected: self.rejected,
        })
    }
}

/// `true` when `challenger` should replace `incumbent`.
fn prefers(challenger: &Candidate, incumbent: &Candidate) -> bool {
    let (c, i) = (challenger.fit.total_mse, incumbent.fit.total_mse);
    c < i || (c == i && challenger.idx < incumbent.idx)
}

/// Check parameters against the series length.
///
/// Returns the minimum segment size to enumerate with.
pub fn validate_params(n: usize, params: &FitParams) -> Result<usize, FitError> {
    if params.degree < 1 {
        return Err(FitError::invalid("degree must be >= 1"));
    }
    if params.num_segments < 1 {
        return Err(FitError::invalid("num_segments must be >= 1"));
    }

    let Some(points_per_fit) = params.degree.checked_add(1) else {
        return Err(FitError::invalid(format!(
            "degree ({}) is too large",
            params.degree
        )));
    };

    // Checked against max(m, degree + 1) before the min-size check below.
    let required = params.min_segment_size.max(points_per_fit);
    if params
        .num_segments
        .checked_mul(required)
        .is_none_or(|total| total > n)
    {
        return Err(FitError::InfeasiblePartition {
            n,
            num_segments: params.num_segments,
            min_segment_size: required,
        });
    }

    if params.min_segment_size < points_per_fit {
        return Err(FitError::invalid(format!(
            "min_segment_size ({}) must be >= degree + 1 ({})",
            params.min_segment_size, points_per_fit
        )));
    }

    Ok(params.min_segment_size)
}

/// Mean of squared residuals.
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let sse: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(y, p)| (y - p) * (y - p))
        .sum();
    sse / actual.len() as f64
}

/// Coefficient of determination relative to the mean of `actual`.
///
/// A constant segment has no variance to explain: R² is `1.0` when the fit
/// reproduces it and `0.0` otherwise.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 1.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean) * (y - mean)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(y, p)| (y - p) * (y - p))
        .sum();

    if ss_tot == 0.0 {
        let scale: f64 = actual.iter().map(|y| y * y).sum::<f64>().max(1.0);
        return if ss_res <= 1e-12 * scale { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Fit every segment of `partition` and aggregate the errors.
pub fn score_partition(
    series: &ObservationSeries,
    partition: &Partition,
    degree: usize,
) -> Result<FitResult, FitError> {
    let mut segments = Vec::with_capacity(partition.num_segments());
    let mut total_mse = 0.0;

    for segment in partition.segments(series.len()) {
        let fitted = fit_segment(series, segment, degree)?;
        let ys = series.ys(segment.range());
        let mse = mean_squared_error(&ys, &fitted.predictions);
        let r2 = r_squared(&ys, &fitted.predictions);
        total_mse += mse;
        segments.push(SegmentFit {
            segment,
            poly: fitted.poly,
            predictions: fitted.predictions,
            mse,
            r2,
        });
    }

    Ok(FitResult {
        segments,
        total_mse,
    })
}

fn evaluate(series: &ObservationSeries, degree: usize, idx: usize, partition: Partition) -> Tally {
    match score_partition(series, &partition, degree) {
        Ok(fit) if fit.total_mse.is_finite() => Tally {
            best: Some(Candidate {
                idx,
                partition,
                fit,
            }),
            rejected: 0,
        },
        Ok(_) => {
            debug!(splits = ?partition.splits, "rejecting candidate with non-finite score");
            Tally {
                best: None,
                rejected: 1,
            }
        }
        Err(err) => {
            debug!(splits = ?partition.splits, %err, "rejecting candidate");
            Tally {
                best: None,
                rejected: 1,
            }
        }
    }
}

fn check_ceiling(candidates: u128, params: &FitParams) -> Result<(), FitError> {
    match params.max_partitions {
        Some(ceiling) if candidates > u128::from(ceiling) => {
            Err(FitError::SearchTooLarge { candidates, ceiling })
        }
        Some(_) => Ok(()),
        None => {
            warn!(candidates = %candidates, "partition ceiling disabled; search size is unbounded");
            Ok(())
        }
    }
}

/// Search every partition and return the one with the lowest total MSE.
pub fn search(series: &ObservationSeries, params: &FitParams) -> Result<BestFit, FitError> {
    let n = series.len();
    let m = validate_params(n, params)?;
    let k = params.num_segments;

    let total = count_partitions(n, k, m);
    check_ceiling(total, params)?;
    info!(
        n,
        degree = params.degree,
        segments = k,
        min_segment_size = m,
        candidates = %total,
        parallel = params.parallel,
        "scoring candidate partitions"
    );

    let degree = params.degree;
    let candidates = Partitions::new(n, k, m).enumerate();
    let tally = if params.parallel {
        candidates
            .par_bridge()
            .map(|(idx, p)| evaluate(series, degree, idx, p))
            .reduce(Tally::default, Tally::merge)
    } else {
        candidates
            .map(|(idx, p)| evaluate(series, degree, idx, p))
            .fold(Tally::default(), Tally::merge)
    };

    let best = tally.into_best_fit(usize::try_from(total).unwrap_or(usize::MAX))?;
    info!(
        splits = ?best.partition.splits,
        total_mse = best.fit.total_mse,
        rejected = best.rejected,
        "selected partition"
    );
    Ok(best)
}

/// Score every candidate in generation order (rejected ones are left out).
///
/// Used by the debug bundle to show how close the runners-up were.
pub fn score_all(
    series: &ObservationSeries,
    params: &FitParams,
) -> Result<Vec<ScoredPartition>, FitError> {
    let n = series.len();
    let m = validate_params(n, params)?;
    check_ceiling(count_partitions(n, params.num_segments, m), params)?;

    Ok(Partitions::new(n, params.num_segments, m)
        .filter_map(|partition| {
            let fit = score_partition(series, &partition, params.degree).ok()?;
            fit.total_mse.is_finite().then_some(ScoredPartition {
                partition,
                total_mse: fit.total_mse,
            })
        })
        .collect())
}
