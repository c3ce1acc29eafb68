//! Synthetic level-table generation from the reference XP curves.
//!
//! Each level's increment over the previous level is taken from the reference
//! curve and perturbed by multiplicative log-normal noise, with an occasional
//! jump to plant outliers. Increments are floored at zero so cumulative totals
//! stay non-decreasing even where the reference curve dips at a segment seam.

use std::io::Write;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::Serialize;

use crate::domain::{Observation, ObservationSeries, ReferenceCurve};
use crate::error::AppError;
use crate::models::reference_curve;

/// Highest level `generate_table` will produce.
pub const MAX_SAMPLE_LEVEL: i64 = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub curve: ReferenceCurve,
    pub max_level: i64,
    /// Log-scale standard deviation of the per-level noise, in percent.
    pub noise_pct: f64,
    /// Probability that a level's increment is scaled by `jump_pct`.
    pub jump_prob: f64,
    pub jump_pct: f64,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            curve: ReferenceCurve::Specialization,
            max_level: 300,
            noise_pct: 1.0,
            jump_prob: 0.0,
            jump_pct: 25.0,
            seed: 42,
        }
    }
}

/// One row of a generated table, in ingest column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleRow {
    pub level: i64,
    pub points_net: i64,
    pub points_total: i64,
}

#[derive(Debug, Clone)]
pub struct SampleTable {
    pub rows: Vec<SampleRow>,
}

impl SampleTable {
    /// The table as a fit-ready series (`points_total` against `level`).
    pub fn to_series(&self) -> Result<ObservationSeries, AppError> {
        let points = self
            .rows
            .iter()
            .map(|r| Observation {
                level: r.level,
                value: r.points_total,
            })
            .collect();
        Ok(ObservationSeries::from_observations(points)?)
    }
}

pub fn generate_table(config: &SampleConfig) -> Result<SampleTable, AppError> {
    if !(2..=MAX_SAMPLE_LEVEL).contains(&config.max_level) {
        return Err(AppError::new(
            2,
            format!("Sample max level must be between 2 and {MAX_SAMPLE_LEVEL}."),
        ));
    }
    if !(config.noise_pct.is_finite() && config.noise_pct >= 0.0) {
        return Err(AppError::new(2, "Sample noise must be a finite, non-negative percent."));
    }
    if !(0.0..1.0).contains(&config.jump_prob) || !config.jump_pct.is_finite() {
        return Err(AppError::new(2, "Invalid jump settings."));
    }

    let curve = reference_curve(config.curve);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let sigma = config.noise_pct / 100.0;
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut rows = Vec::with_capacity(usize::try_from(config.max_level).unwrap_or_default());
    let mut total = curve.value_at(1).max(0);
    rows.push(SampleRow {
        level: 1,
        points_net: 0,
        points_total: total,
    });

    for level in 2..=config.max_level {
        let base = (curve.value_at(level) - curve.value_at(level - 1)).max(0) as f64;

        // Mean-corrected so E[noise] == 1.
        let z: f64 = normal.sample(&mut rng);
        let mut factor = (sigma * z - 0.5 * sigma * sigma).exp();
        if rng.r#gen::<f64>() < config.jump_prob {
            factor *= 1.0 + config.jump_pct / 100.0;
        }

        let net = (base * factor).round().max(0.0) as i64;
        total = total.checked_add(net).ok_or_else(|| {
            AppError::new(4, format!("Sample total overflowed at level {level}."))
        })?;
        rows.push(SampleRow {
            level,
            points_net: net,
            points_total: total,
        });
    }

    Ok(SampleTable { rows })
}

/// Write the table as `level,points_net,points_total` CSV.
pub fn write_table_csv<W: Write>(out: W, table: &SampleTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    for row in &table.rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(4, format!("Failed to write sample row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush sample CSV: {e}")))
}
