//! The fit pipeline: ingest -> search -> report.
//!
//! Presentation (printing, plotting, exports) stays in `app`; this returns
//! everything a front-end needs.

use tracing::{info, warn};

use crate::domain::{BestFit, FitConfig, FitReport};
use crate::error::AppError;
use crate::fit::selection::search;
use crate::io::ingest::{IngestedData, load_level_table};
use crate::report::build_report;

/// All computed outputs of a single `xpc fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub best: BestFit,
    pub report: FitReport,
}

/// Execute the full fitting pipeline.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let ingest = load_level_table(config)?;
    info!(
        path = %config.csv_path.display(),
        rows = ingest.rows_used,
        skipped = ingest.row_errors.len(),
        "loaded level table"
    );
    run_fit_with_data(config, ingest)
}

/// Run the search and report on already-ingested data.
pub fn run_fit_with_data(config: &FitConfig, ingest: IngestedData) -> Result<RunOutput, AppError> {
    let best = search(&ingest.series, &config.fit_params())?;
    let report = build_report(&ingest.series, &best, &config.report_options())?;

    if let Some(outliers) = &report.outliers {
        if !outliers.is_empty() {
            warn!(
                count = outliers.len(),
                threshold_pct = report.outlier_threshold_pct,
                "points above the outlier threshold"
            );
        }
    }

    Ok(RunOutput { ingest, best, report })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::data::sample::{SampleConfig, generate_table, write_table_csv};
    use crate::io::ingest::read_level_table;

    fn config(num_segments: usize) -> FitConfig {
        FitConfig {
            csv_path: PathBuf::from("memory.csv"),
            label: "Specialization".to_string(),
            value_column: "points_total".to_string(),
            skip_levels: 10,
            degree: 3,
            num_segments,
            min_segment_size: Some(8),
            max_partitions: Some(100_000),
            parallel: true,
            outlier_threshold_pct: 5.0,
            stride: Some(50),
            extrapolate_to: None,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export_results: None,
            export_curve: None,
            debug_bundle: false,
            debug_top: 5,
        }
    }

    fn sample_ingest(config: &FitConfig) -> IngestedData {
        let table = generate_table(&SampleConfig {
            max_level: 120,
            noise_pct: 0.5,
            ..SampleConfig::default()
        })
        .unwrap();
        let mut buf = Vec::new();
        write_table_csv(&mut buf, &table).unwrap();
        read_level_table(buf.as_slice(), &config.value_column, config.skip_levels).unwrap()
    }

    #[test]
    fn pipeline_fits_synthetic_table() {
        let config = config(2);
        let ingest = sample_ingest(&config);
        assert_eq!(ingest.rows_trimmed, 10);

        let run = run_fit_with_data(&config, ingest).unwrap();
        assert_eq!(run.report.segments.len(), 2);
        assert_eq!(run.report.split_levels.len(), 1);
        assert!(run.report.outliers.is_none());
        assert_eq!(run.report.segments[0].level_range[0], 11);
        assert!(run.best.candidates > 0);
    }

    #[test]
    fn outliers_single_segment_only_and_fits_are_tight() {
        let one = config(1);
        let two = config(2);
        let r1 = run_fit_with_data(&one, sample_ingest(&one)).unwrap();
        let r2 = run_fit_with_data(&two, sample_ingest(&two)).unwrap();
        assert!(r1.report.outliers.is_some());
        assert!(r2.report.segments.iter().all(|s| s.r2 > 0.99));
    }

    #[test]
    fn missing_file_is_exit_code_2() {
        let mut config = config(1);
        config.csv_path = PathBuf::from("/nonexistent/xp.csv");
        assert_eq!(run_fit(&config).unwrap_err().exit_code(), 2);
    }
}
