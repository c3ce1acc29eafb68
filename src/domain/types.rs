//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during the partition search
//! - exported to JSON/CSV
//! - reloaded later for evaluation (`xpc eval`)

use std::ops::Range;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::math::horner;

/// Default ceiling on the number of enumerated partitions.
pub const DEFAULT_MAX_PARTITIONS: u64 = 2_000_000;

/// Default relative divergence (percent) above which a point is an outlier.
pub const DEFAULT_OUTLIER_THRESHOLD_PCT: f64 = 5.0;

/// Built-in XP curves used for evaluation presets and synthetic tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceCurve {
    Character,
    Specialization,
}

impl ReferenceCurve {
    pub fn display_name(self) -> &'static str {
        match self {
            ReferenceCurve::Character => "Character",
            ReferenceCurve::Specialization => "Specialization",
        }
    }
}

/// One `(level, cumulative value)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub level: i64,
    pub value: i64,
}

/// A validated observation series.
///
/// Invariants (checked on construction):
/// - at least one point
/// - levels strictly ascending
/// - values non-decreasing
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSeries {
    points: Vec<Observation>,
}

impl ObservationSeries {
    /// Build a series from two aligned columns.
    pub fn new(levels: &[i64], values: &[i64]) -> Result<Self, FitError> {
        if levels.len() != values.len() {
            return Err(FitError::invalid(format!(
                "series length mismatch: {} levels vs {} values",
                levels.len(),
                values.len()
            )));
        }
        let points = levels
            .iter()
            .zip(values.iter())
            .map(|(&level, &value)| Observation { level, value })
            .collect();
        Self::from_observations(points)
    }

    /// Build a series from already-paired observations.
    pub fn from_observations(points: Vec<Observation>) -> Result<Self, FitError> {
        if points.is_empty() {
            return Err(FitError::invalid("series must contain at least one observation"));
        }
        for w in points.windows(2) {
            if w[1].level <= w[0].level {
                return Err(FitError::invalid(format!(
                    "levels must be strictly ascending (level {} follows {})",
                    w[1].level, w[0].level
                )));
            }
            if w[1].value < w[0].value {
                return Err(FitError::invalid(format!(
                    "values must be non-decreasing (level {} has {} after {})",
                    w[1].level, w[1].value, w[0].value
                )));
            }
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn level(&self, idx: usize) -> i64 {
        self.points[idx].level
    }

    /// Levels of a sub-range as `f64` (the regression's independent variable).
    pub fn xs(&self, range: Range<usize>) -> Vec<f64> {
        self.points[range].iter().map(|p| p.level as f64).collect()
    }

    /// Values of a sub-range as `f64`.
    pub fn ys(&self, range: Range<usize>) -> Vec<f64> {
        self.points[range].iter().map(|p| p.value as f64).collect()
    }
}

/// A contiguous half-open index range `[start, end)` over a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// `K - 1` strictly increasing split indices in `(0, n)`, defining `K` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    pub splits: Vec<usize>,
}

impl Partition {
    /// The single-segment partition.
    pub fn whole() -> Self {
        Self { splits: Vec::new() }
    }

    pub fn num_segments(&self) -> usize {
        self.splits.len() + 1
    }

    /// Expand into contiguous segments covering `[0, n)`.
    pub fn segments(&self, n: usize) -> Vec<Segment> {
        let mut out = Vec::with_capacity(self.num_segments());
        let mut start = 0;
        for &split in &self.splits {
            out.push(Segment { start, end: split });
            start = split;
        }
        out.push(Segment { start, end: n });
        out
    }
}

/// Polynomial coefficients, highest degree first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    pub coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        horner(&self.coefficients, x)
    }

    /// Human-readable formula, e.g. `XP = 1.000000 * level^3 + ... + 0.000000`.
    pub fn formula(&self, lhs: &str, var: &str) -> String {
        let degree = self.degree();
        let terms: Vec<String> = self
            .coefficients
            .iter()
            .enumerate()
            .map(|(i, c)| match degree - i {
                0 => format!("{c:.6}"),
                1 => format!("{c:.6} * {var}"),
                p => format!("{c:.6} * {var}^{p}"),
            })
            .collect();
        format!("{lhs} = {}", terms.join(" + "))
    }
}

/// Parameters of one fitting run.
#[derive(Debug, Clone, PartialEq)]
pub struct FitParams {
    pub degree: usize,
    pub num_segments: usize,
    pub min_segment_size: usize,
    /// Reject searches with more candidates than this. `None` disables the ceiling.
    pub max_partitions: Option<u64>,
    /// Score candidates on the rayon pool.
    pub parallel: bool,
}

impl FitParams {
    pub fn new(degree: usize, num_segments: usize, min_segment_size: usize) -> Self {
        Self {
            degree,
            num_segments,
            min_segment_size,
            max_partitions: Some(DEFAULT_MAX_PARTITIONS),
            parallel: true,
        }
    }
}

/// Least-squares fit of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentFit {
    pub segment: Segment,
    pub poly: Polynomial,
    /// Fitted values at the segment's levels.
    pub predictions: Vec<f64>,
    pub mse: f64,
    pub r2: f64,
}

/// All segment fits of one candidate partition.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub segments: Vec<SegmentFit>,
    /// Sum of the per-segment MSE values.
    pub total_mse: f64,
}

/// The winning candidate of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct BestFit {
    pub partition: Partition,
    pub fit: FitResult,
    /// Candidates enumerated.
    pub candidates: usize,
    /// Candidates excluded (degenerate or numerically unsolvable segments).
    pub rejected: usize,
}

/// Report Builder options.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub outlier_threshold_pct: f64,
    /// Emit predictions every `stride` levels across each segment.
    pub stride: Option<i64>,
    /// Extend the last segment's predictions up to this level.
    pub extrapolate_to: Option<i64>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            outlier_threshold_pct: DEFAULT_OUTLIER_THRESHOLD_PCT,
            stride: None,
            extrapolate_to: None,
        }
    }
}

/// Predicted vs actual at one observed level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDivergence {
    pub level: i64,
    pub actual: i64,
    pub predicted: f64,
    /// `predicted - actual`.
    pub divergence: f64,
    /// `divergence / actual * 100`; `None` when `actual == 0`.
    pub divergence_pct: Option<f64>,
}

/// A predicted value on the stride grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSample {
    pub level: i64,
    pub predicted: f64,
}

/// Diagnostics for one segment of the winning partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub level_range: [i64; 2],
    pub coefficients: Vec<f64>,
    pub mse: f64,
    pub r2: f64,
    /// Largest absolute divergence over the segment's points.
    pub max_divergence: f64,
    /// Relative divergence of that same point; `None` when its actual value is 0.
    pub max_divergence_pct: Option<f64>,
    pub points: Vec<PointDivergence>,
    pub samples: Vec<LevelSample>,
}

/// Output of [`crate::fit::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub degree: usize,
    /// Level at which each segment after the first begins.
    pub split_levels: Vec<i64>,
    pub segments: Vec<SegmentReport>,
    pub total_mse: f64,
    pub outlier_threshold_pct: f64,
    /// Points above the outlier threshold. Only computed for single-segment fits.
    pub outliers: Option<Vec<PointDivergence>>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    pub label: String,
    pub value_column: String,
    /// Drop rows with `level <= skip_levels`.
    pub skip_levels: i64,

    pub degree: usize,
    pub num_segments: usize,
    /// Defaults to `degree + 1` when unset.
    pub min_segment_size: Option<usize>,
    pub max_partitions: Option<u64>,
    pub parallel: bool,

    pub outlier_threshold_pct: f64,
    pub stride: Option<i64>,
    pub extrapolate_to: Option<i64>,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_curve: Option<PathBuf>,
    pub debug_bundle: bool,
    pub debug_top: usize,
}

impl FitConfig {
    pub fn fit_params(&self) -> FitParams {
        FitParams {
            degree: self.degree,
            num_segments: self.num_segments,
            min_segment_size: self
                .min_segment_size
                .unwrap_or(self.degree.saturating_add(1)),
            max_partitions: self.max_partitions,
            parallel: self.parallel,
        }
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            outlier_threshold_pct: self.outlier_threshold_pct,
            stride: self.stride,
            extrapolate_to: self.extrapolate_to,
        }
    }
}

/// A saved curve file (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub label: String,
    pub degree: usize,
    pub split_levels: Vec<i64>,
    pub total_mse: f64,
    pub segments: Vec<CurveSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSegment {
    pub level_range: [i64; 2],
    pub coefficients: Vec<f64>,
    pub mse: f64,
    pub r2: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_rejects_unsorted_levels() {
        let err = ObservationSeries::new(&[1, 3, 2], &[0, 1, 2]).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
    }

    #[test]
    fn series_rejects_duplicate_levels() {
        let err = ObservationSeries::new(&[1, 1], &[0, 1]).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
    }

    #[test]
    fn series_rejects_decreasing_values() {
        let err = ObservationSeries::new(&[1, 2, 3], &[10, 9, 12]).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
    }

    #[test]
    fn series_rejects_mismatch_and_empty() {
        assert!(matches!(
            ObservationSeries::new(&[1, 2], &[1]),
            Err(FitError::InvalidInput(_))
        ));
        assert!(matches!(
            ObservationSeries::new(&[], &[]),
            Err(FitError::InvalidInput(_))
        ));
    }

    #[test]
    fn series_accepts_flat_values() {
        let s = ObservationSeries::new(&[1, 2, 3], &[5, 5, 5]).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.xs(1..3), vec![2.0, 3.0]);
    }

    #[test]
    fn partition_expands_to_contiguous_segments() {
        let p = Partition { splits: vec![3, 7] };
        let segs = p.segments(10);
        assert_eq!(
            segs,
            vec![
                Segment { start: 0, end: 3 },
                Segment { start: 3, end: 7 },
                Segment { start: 7, end: 10 },
            ]
        );
        assert_eq!(Partition::whole().segments(4), vec![Segment { start: 0, end: 4 }]);
    }

    #[test]
    fn polynomial_formula_lists_powers() {
        let p = Polynomial {
            coefficients: vec![1.0, 0.0, -2.0, 3.5],
        };
        assert_eq!(
            p.formula("XP", "level"),
            "XP = 1.000000 * level^3 + 0.000000 * level^2 + -2.000000 * level + 3.500000"
        );
        assert!((p.evaluate(2.0) - 7.5).abs() < 1e-12);
    }

    #[test]
    fn fit_config_defaults_min_segment_size_to_degree_plus_one() {
        let config = FitConfig {
            csv_path: PathBuf::from("xp.csv"),
            label: "Character".to_string(),
            value_column: "points_total".to_string(),
            skip_levels: 0,
            degree: 3,
            num_segments: 2,
            min_segment_size: None,
            max_partitions: Some(10),
            parallel: false,
            outlier_threshold_pct: 5.0,
            stride: None,
            extrapolate_to: None,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export_results: None,
            export_curve: None,
            debug_bundle: false,
            debug_top: 10,
        };
        let params = config.fit_params();
        assert_eq!(params.min_segment_size, 4);
        assert_eq!(params.max_partitions, Some(10));
        assert!(!params.parallel);
    }
}
