//! Segmented curve fitting.
//!
//! Responsibilities:
//!
//! - enumerate candidate partitions (`partition`)
//! - fit one segment by least squares (`segment`)
//! - score candidates and keep the best (`selection`)
//!
//! [`fit`] is the one-call entry point: validate, search, report.

pub mod partition;
pub mod segment;
pub mod selection;

pub use partition::*;
pub use segment::*;
pub use selection::*;

use crate::domain::{FitParams, FitReport, ObservationSeries, ReportOptions};
use crate::error::FitError;

/// Fit `values` against `levels` with `num_segments` polynomial pieces.
///
/// Returns the chosen split levels and per-segment diagnostics, or a typed
/// failure: [`FitError::InvalidInput`] for malformed input and
/// [`FitError::InfeasiblePartition`] when the series is too short to split.
pub fn fit(
    levels: &[i64],
    values: &[i64],
    degree: usize,
    num_segments: usize,
    min_segment_size: usize,
) -> Result<FitReport, FitError> {
    let params = FitParams::new(degree, num_segments, min_segment_size);
    fit_with(levels, values, &params, &ReportOptions::default())
}

/// [`fit`] with explicit search parameters and report options.
pub fn fit_with(
    levels: &[i64],
    values: &[i64],
    params: &FitParams,
    options: &ReportOptions,
) -> Result<FitReport, FitError> {
    let series = ObservationSeries::new(levels, values)?;
    let best = search(&series, params)?;
    crate::report::build_report(&series, &best, options)
}
