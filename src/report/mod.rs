//! Report building: per-segment diagnostics for the winning partition.
//!
//! Everything here is derived from the search output; nothing is refit.
//! Formatting for the terminal lives in [`format`].

pub mod format;

pub use format::*;

use crate::domain::{
    BestFit, FitReport, LevelSample, ObservationSeries, PointDivergence, ReportOptions, SegmentFit,
    SegmentReport,
};
use crate::error::FitError;

/// Most stride samples a single segment may produce.
pub const MAX_STRIDE_SAMPLES: u64 = 100_000;

/// Build the full report for a search result.
///
/// Fails with [`FitError::InvalidInput`] when the stride is not positive or
/// the stride grid (including extrapolation) exceeds [`MAX_STRIDE_SAMPLES`].
pub fn build_report(
    series: &ObservationSeries,
    best: &BestFit,
    options: &ReportOptions,
) -> Result<FitReport, FitError> {
    let split_levels: Vec<i64> = best
        .partition
        .splits
        .iter()
        .map(|&idx| series.level(idx))
        .collect();

    let n_segments = best.fit.segments.len();
    let segments: Vec<SegmentReport> = best
        .fit
        .segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            // Stride samples run up to the level before the next segment starts.
            let sample_end = match best.fit.segments.get(i + 1) {
                Some(next) => series.level(next.segment.start) - 1,
                None => {
                    let last = series.level(seg.segment.end - 1);
                    options.extrapolate_to.map_or(last, |to| to.max(last))
                }
            };
            segment_report(series, seg, options.stride, sample_end)
        })
        .collect::<Result<_, _>>()?;

    let outliers = (n_segments == 1).then(|| {
        segments
            .iter()
            .flat_map(|s| s.points.iter())
            .filter(|p| {
                p.divergence_pct
                    .is_some_and(|pct| pct.abs() > options.outlier_threshold_pct)
            })
            .cloned()
            .collect()
    });

    Ok(FitReport {
        degree: best
            .fit
            .segments
            .first()
            .map_or(0, |s| s.poly.degree()),
        split_levels,
        segments,
        total_mse: best.fit.total_mse,
        outlier_threshold_pct: options.outlier_threshold_pct,
        outliers,
    })
}

fn segment_report(
    series: &ObservationSeries,
    seg: &SegmentFit,
    stride: Option<i64>,
    sample_end: i64,
) -> Result<SegmentReport, FitError> {
    let observed = &series.points()[seg.segment.range()];
    let points: Vec<PointDivergence> = observed
        .iter()
        .zip(seg.predictions.iter())
        .map(|(obs, &predicted)| divergence(obs.level, obs.value, predicted))
        .collect();

    // First point wins on equal magnitude.
    let worst = points.iter().fold(None::<&PointDivergence>, |acc, p| match acc {
        Some(w) if w.divergence.abs() >= p.divergence.abs() => Some(w),
        _ => Some(p),
    });

    let first_level = observed.first().map_or(0, |o| o.level);
    let last_level = observed.last().map_or(first_level, |o| o.level);

    let samples = match stride {
        Some(step) => stride_levels(first_level, sample_end, step)?
            .into_iter()
            .map(|level| LevelSample {
                level,
                predicted: seg.poly.evaluate(level as f64),
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(SegmentReport {
        level_range: [first_level, last_level],
        coefficients: seg.poly.coefficients.clone(),
        mse: seg.mse,
        r2: seg.r2,
        max_divergence: worst.map_or(0.0, |w| w.divergence.abs()),
        max_divergence_pct: worst.and_then(|w| w.divergence_pct.map(f64::abs)),
        points,
        samples,
    })
}

fn divergence(level: i64, actual: i64, predicted: f64) -> PointDivergence {
    let diff = predicted - actual as f64;
    PointDivergence {
        level,
        actual,
        predicted,
        divergence: diff,
        divergence_pct: (actual != 0).then(|| diff / actual as f64 * 100.0),
    }
}

/// `start`, then every multiple of `step` in `(start, end]`.
fn stride_levels(start: i64, end: i64, step: i64) -> Result<Vec<i64>, FitError> {
    if step < 1 {
        return Err(FitError::invalid(format!("stride must be >= 1 (got {step})")));
    }
    if end < start {
        return Ok(Vec::new());
    }

    // i128 keeps `level + step` from overflowing near i64::MAX.
    let (end, step) = (i128::from(end), i128::from(step));
    let first = (i128::from(start).div_euclid(step) + 1) * step;
    let count = 1 + if first <= end { (end - first) / step + 1 } else { 0 };
    if count > i128::from(MAX_STRIDE_SAMPLES) {
        return Err(FitError::invalid(format!(
            "stride {step} up to level {end} gives {count} samples per segment (limit {MAX_STRIDE_SAMPLES}); raise --stride or lower --extrapolate-to"
        )));
    }

    let mut out = Vec::with_capacity(usize::try_from(count).unwrap_or_default());
    out.push(start);
    let mut level = first;
    while level <= end {
        out.extend(i64::try_from(level).ok());
        level += step;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitParams, ObservationSeries, Partition};
    use crate::fit::selection::{score_partition, search};

    fn best_for(series: &ObservationSeries, partition: Partition, degree: usize) -> BestFit {
        let fit = score_partition(series, &partition, degree).unwrap();
        BestFit {
            partition,
            fit,
            candidates: 1,
            rejected: 0,
        }
    }

    #[test]
    fn divergence_is_predicted_minus_actual() {
        let d = divergence(5, 200, 210.0);
        assert_eq!(d.divergence, 10.0);
        assert_eq!(d.divergence_pct, Some(5.0));

        let zero = divergence(1, 0, 3.0);
        assert_eq!(zero.divergence_pct, None);
    }

    #[test]
    fn stride_levels_snap_to_multiples() {
        assert_eq!(stride_levels(11, 31, 5).unwrap(), vec![11, 15, 20, 25, 30]);
        assert_eq!(stride_levels(10, 20, 5).unwrap(), vec![10, 15, 20]);
        assert_eq!(stride_levels(-3, 6, 5).unwrap(), vec![-3, 0, 5]);
        assert!(stride_levels(10, 9, 5).unwrap().is_empty());
    }

    #[test]
    fn stride_levels_stop_at_i64_max() {
        let step = i64::MAX / 2;
        assert_eq!(
            stride_levels(1, i64::MAX, step).unwrap(),
            vec![1, step, 2 * step]
        );
    }

    #[test]
    fn stride_levels_reject_runaway_grids() {
        assert!(matches!(
            stride_levels(1, i64::MAX, 1),
            Err(FitError::InvalidInput(_))
        ));
        assert!(matches!(stride_levels(1, 10, 0), Err(FitError::InvalidInput(_))));
        let at_limit = MAX_STRIDE_SAMPLES as i64 - 1;
        assert_eq!(
            stride_levels(1, at_limit, 1).unwrap().len() as u64,
            MAX_STRIDE_SAMPLES - 1
        );
    }

    #[test]
    fn huge_extrapolation_is_rejected() {
        let levels: Vec<i64> = (1..=10).collect();
        let values: Vec<i64> = levels.iter().map(|x| 10 * x).collect();
        let s = ObservationSeries::new(&levels, &values).unwrap();
        let best = best_for(&s, Partition::whole(), 1);
        let options = ReportOptions {
            stride: Some(1),
            extrapolate_to: Some(9_000_000_000_000_000_000),
            ..ReportOptions::default()
        };
        assert!(matches!(
            build_report(&s, &best, &options),
            Err(FitError::InvalidInput(_))
        ));
    }

    #[test]
    fn single_segment_flags_outliers() {
        // A straight line with levels 5 and 6 lifted to 700.
        let levels: Vec<i64> = (1..=10).collect();
        let mut values: Vec<i64> = levels.iter().map(|x| 100 * x).collect();
        values[4] = 700;
        values[5] = 700;
        let s = ObservationSeries::new(&levels, &values).unwrap();
        let best = best_for(&s, Partition::whole(), 1);

        let report = build_report(&s, &best, &ReportOptions::default()).unwrap();
        let outliers = report.outliers.expect("single segment reports outliers");
        assert!(outliers.iter().any(|p| p.level == 5));
        for p in &outliers {
            assert!(p.divergence_pct.unwrap().abs() > 5.0);
        }
    }

    #[test]
    fn multi_segment_skips_outlier_flags() {
        let levels: Vec<i64> = (1..=12).collect();
        let values: Vec<i64> = levels.iter().map(|x| x * x).collect();
        let s = ObservationSeries::new(&levels, &values).unwrap();
        let best = search(&s, &FitParams::new(1, 2, 3)).unwrap();
        let report = build_report(&s, &best, &ReportOptions::default()).unwrap();
        assert!(report.outliers.is_none());
        assert_eq!(report.split_levels.len(), 1);
        assert_eq!(report.segments.len(), 2);
        assert_eq!(report.segments[1].level_range[0], report.split_levels[0]);
    }

    #[test]
    fn max_divergence_tracks_worst_point() {
        let s = ObservationSeries::new(&[1, 2, 3, 4], &[10, 20, 30, 60]).unwrap();
        let best = best_for(&s, Partition::whole(), 1);
        let report = build_report(&s, &best, &ReportOptions::default()).unwrap();
        let seg = &report.segments[0];
        let worst = seg
            .points
            .iter()
            .map(|p| p.divergence.abs())
            .fold(0.0, f64::max);
        assert_eq!(seg.max_divergence, worst);
        assert!(seg.max_divergence_pct.is_some());
    }

    #[test]
    fn samples_stop_before_next_segment_and_extrapolate_last() {
        let levels: Vec<i64> = (1..=20).collect();
        let values: Vec<i64> = levels
            .iter()
            .map(|&x| if x < 11 { 10 * x } else { 300 + 50 * (x - 11) })
            .collect();
        let s = ObservationSeries::new(&levels, &values).unwrap();
        let best = best_for(&s, Partition { splits: vec![10] }, 1);
        let options = ReportOptions {
            stride: Some(5),
            extrapolate_to: Some(30),
            ..ReportOptions::default()
        };

        let report = build_report(&s, &best, &options).unwrap();
        let first: Vec<i64> = report.segments[0].samples.iter().map(|x| x.level).collect();
        let last: Vec<i64> = report.segments[1].samples.iter().map(|x| x.level).collect();
        assert_eq!(first, vec![1, 5, 10]);
        assert_eq!(last, vec![11, 15, 20, 25, 30]);

        // Extrapolation stays on the segment's own line.
        let at_30 = report.segments[1].samples.last().unwrap().predicted;
        assert!((at_30 - 1250.0).abs() < 1e-6);
    }
}
