//! Debug bundle writer for inspecting a partition search.
//!
//! The bundle is a markdown file with the input table, the best-scoring
//! candidate partitions, and the chosen per-segment polynomials.

use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::Local;

use crate::domain::{FitConfig, FitReport, ObservationSeries, Polynomial};
use crate::error::AppError;
use crate::fit::selection::{ScoredPartition, score_all};

pub fn write_debug_bundle(
    series: &ObservationSeries,
    report: &FitReport,
    config: &FitConfig,
) -> Result<PathBuf, AppError> {
    let dir = PathBuf::from("debug");
    create_dir_all(&dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("xpc_debug_{ts}.md"));

    let file = File::create(&path)
        .map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;
    let mut out = BufWriter::new(file);
    write_bundle(&mut out, series, report, config)?;
    out.flush().map_err(write_err)?;

    Ok(path)
}

/// Write the bundle body to any writer.
pub fn write_bundle<W: Write>(
    out: &mut W,
    series: &ObservationSeries,
    report: &FitReport,
    config: &FitConfig,
) -> Result<(), AppError> {
    let params = config.fit_params();

    writeln!(out, "# xpc debug bundle").map_err(write_err)?;
    writeln!(out, "- generated: {}", Local::now().to_rfc3339()).map_err(write_err)?;
    writeln!(out, "- input: {}", config.csv_path.display()).map_err(write_err)?;
    writeln!(out, "- label: {}", config.label).map_err(write_err)?;
    writeln!(out, "- value_column: {}", config.value_column).map_err(write_err)?;
    writeln!(out, "- skip_levels: {}", config.skip_levels).map_err(write_err)?;
    writeln!(
        out,
        "- degree={}, segments={}, min_segment_size={}, parallel={}",
        params.degree, params.num_segments, params.min_segment_size, params.parallel
    )
    .map_err(write_err)?;

    writeln!(out, "\n## Observations (n={})", series.len()).map_err(write_err)?;
    writeln!(out, "| level | value |").map_err(write_err)?;
    writeln!(out, "| - | - |").map_err(write_err)?;
    for p in series.points() {
        writeln!(out, "| {} | {} |", p.level, p.value).map_err(write_err)?;
    }

    let top = top_candidates(series, config)?;
    writeln!(out, "\n## Top candidates").map_err(write_err)?;
    writeln!(out, "| rank | split_levels | total_mse | vs_best |").map_err(write_err)?;
    writeln!(out, "| - | - | - | - |").map_err(write_err)?;
    let best_mse = top.first().map_or(0.0, |c| c.total_mse);
    for (rank, c) in top.iter().enumerate() {
        let splits: Vec<String> = c
            .partition
            .splits
            .iter()
            .map(|&i| series.level(i).to_string())
            .collect();
        writeln!(
            out,
            "| {} | [{}] | {:.6} | +{:.6} |",
            rank + 1,
            splits.join(", "),
            c.total_mse,
            c.total_mse - best_mse
        )
        .map_err(write_err)?;
    }

    writeln!(out, "\n## Chosen fit").map_err(write_err)?;
    writeln!(out, "- split_levels: {:?}", report.split_levels).map_err(write_err)?;
    writeln!(out, "- total_mse: {:.6}", report.total_mse).map_err(write_err)?;
    for seg in &report.segments {
        let poly = Polynomial {
            coefficients: seg.coefficients.clone(),
        };
        writeln!(
            out,
            "- levels {}..={}: `{}` (mse={:.6}, r2={:.6})",
            seg.level_range[0],
            seg.level_range[1],
            poly.formula("XP", "level"),
            seg.mse,
            seg.r2
        )
        .map_err(write_err)?;
    }

    Ok(())
}

/// The `config.debug_top` lowest-MSE candidates; ties keep generation order.
fn top_candidates(series: &ObservationSeries, config: &FitConfig) -> Result<Vec<ScoredPartition>, AppError> {
    let mut all = score_all(series, &config.fit_params())?;
    all.sort_by(|a, b| a.total_mse.total_cmp(&b.total_mse));
    all.truncate(config.debug_top.max(1));
    Ok(all)
}

fn write_err(e: std::io::Error) -> AppError {
    AppError::new(4, format!("Failed to write debug bundle: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fit;

    fn config() -> FitConfig {
        FitConfig {
            csv_path: PathBuf::from("xp_specialization.csv"),
            label: "Specialization".to_string(),
            value_column: "points_total".to_string(),
            skip_levels: 0,
            degree: 1,
            num_segments: 2,
            min_segment_size: Some(2),
            max_partitions: Some(1000),
            parallel: false,
            outlier_threshold_pct: 5.0,
            stride: None,
            extrapolate_to: None,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export_results: None,
            export_curve: None,
            debug_bundle: true,
            debug_top: 3,
        }
    }

    #[test]
    fn bundle_lists_top_candidates_best_first() {
        let levels: Vec<i64> = (1..=8).collect();
        let values: Vec<i64> = levels
            .iter()
            .map(|&x| if x <= 4 { 10 * x } else { 100 * x })
            .collect();
        let series = ObservationSeries::new(&levels, &values).unwrap();
        let report = fit(&levels, &values, 1, 2, 2).unwrap();

        let mut buf = Vec::new();
        write_bundle(&mut buf, &series, &report, &config()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("# xpc debug bundle\n"));
        assert!(text.contains("## Observations (n=8)"));
        assert!(text.contains("| 1 | [5] | 0.000000 | +0.000000 |"));
        let rank_rows = text.lines().filter(|l| l.starts_with("| 2 | [") || l.starts_with("| 3 | [")).count();
        assert_eq!(rank_rows, 2);
        assert!(!text.contains("| 4 | ["));
        assert!(text.contains("- split_levels: [5]"));
    }
}
