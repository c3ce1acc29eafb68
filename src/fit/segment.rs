//! Least-squares fit of a single segment.
//!
//! Given the observations in one segment and a fixed degree `D`, solve for the
//! degree-`D` polynomial in `level` that minimizes the squared residuals.
//! The fitted values come back with the coefficients so the aggregator can
//! score the segment without re-evaluating the polynomial.

use crate::domain::{ObservationSeries, Polynomial, Segment};
use crate::error::FitError;
use crate::math::polyfit;

/// Coefficients and in-sample predictions for one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPoly {
    pub poly: Polynomial,
    pub predictions: Vec<f64>,
}

/// Fit `segment` of `series` with a degree-`degree` polynomial.
///
/// Errors with [`FitError::DegenerateSegment`] when the segment has fewer than
/// `degree + 1` points or the least-squares solve fails.
pub fn fit_segment(
    series: &ObservationSeries,
    segment: Segment,
    degree: usize,
) -> Result<SegmentPoly, FitError> {
    let degenerate = || FitError::DegenerateSegment {
        start: segment.start,
        end: segment.end,
        degree,
    };

    let too_short = degree.checked_add(1).is_none_or(|p| segment.len() < p);
    if segment.end > series.len() || too_short {
        return Err(degenerate());
    }

    let xs = series.xs(segment.range());
    let ys = series.ys(segment.range());
    let out = polyfit(&xs, &ys, degree).ok_or_else(degenerate)?;

    Ok(SegmentPoly {
        poly: Polynomial {
            coefficients: out.coefficients,
        },
        predictions: out.predictions,
    })
}
