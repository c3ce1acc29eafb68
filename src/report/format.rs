//! Formatted terminal output.
//!
//! Kept apart from report building so the numbers stay testable and
//! output changes stay local.

use crate::domain::{BestFit, FitConfig, FitReport, PointDivergence, Polynomial, SegmentReport};
use crate::io::ingest::IngestedData;

/// Format the run summary (dataset stats + search stats + chosen segments).
pub fn format_run_summary(
    ingest: &IngestedData,
    best: &BestFit,
    report: &FitReport,
    config: &FitConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== xpc - Segmented XP Curve Fit ===\n");
    out.push_str(&format!("Curve: {}\n", config.label));
    out.push_str(&format!(
        "Input: {} (column `{}`)\n",
        config.csv_path.display(),
        ingest.value_column
    ));
    out.push_str(&format!(
        "Rows: read={} used={} trimmed={} skipped={}\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.rows_trimmed,
        ingest.row_errors.len()
    ));
    out.push_str(&format!(
        "Points: n={} | level=[{}, {}] | value=[{}, {}]\n",
        ingest.stats.n_points,
        ingest.stats.level_min,
        ingest.stats.level_max,
        ingest.stats.value_min,
        ingest.stats.value_max
    ));

    let params = config.fit_params();
    out.push_str(&format!(
        "Search: degree={} segments={} min_size={} | candidates={} rejected={}\n",
        params.degree, params.num_segments, params.min_segment_size, best.candidates, best.rejected
    ));
    out.push_str(&format!("Split levels: {}\n", fmt_levels(&report.split_levels)));
    out.push_str(&format!("Total MSE: {:.6}\n", report.total_mse));

    out.push_str("\nSegments:\n");
    for (i, seg) in report.segments.iter().enumerate() {
        out.push_str(&format_segment(i + 1, seg));
    }

    out
}

fn format_segment(index: usize, seg: &SegmentReport) -> String {
    let poly = Polynomial {
        coefficients: seg.coefficients.clone(),
    };
    let mut out = format!(
        "[{index}] levels {}-{}: MSE={:.6} R2={:.6} max|div|={:.2}{}\n",
        seg.level_range[0],
        seg.level_range[1],
        seg.mse,
        seg.r2,
        seg.max_divergence,
        seg.max_divergence_pct
            .map(|p| format!(" ({p:.3}%)"))
            .unwrap_or_default()
    );
    out.push_str(&format!("    {}\n", poly.formula("XP", "level")));
    out
}

/// Signed per-level divergence, one table per segment.
pub fn format_divergence_table(report: &FitReport) -> String {
    let mut out = String::new();
    for (i, seg) in report.segments.iter().enumerate() {
        out.push_str(&format!(
            "Divergence, segment {} (levels {}-{}):\n",
            i + 1,
            seg.level_range[0],
            seg.level_range[1]
        ));
        out.push_str(&format_points(&seg.points));
        out.push('\n');
    }
    out
}

/// Points above the outlier threshold (single-segment fits only).
pub fn format_outliers(report: &FitReport) -> Option<String> {
    let outliers = report.outliers.as_ref()?;
    let mut out = format!(
        "Outliers (|divergence| > {:.2}%): {}\n",
        report.outlier_threshold_pct,
        outliers.len()
    );
    if !outliers.is_empty() {
        out.push_str(&format_points(outliers));
    }
    Some(out)
}

/// Predicted values on the stride grid.
pub fn format_samples(report: &FitReport) -> Option<String> {
    if report.segments.iter().all(|s| s.samples.is_empty()) {
        return None;
    }
    let mut out = String::from("Predicted values:\n");
    out.push_str(&format!("{:>8} {:>7} {:>16}\n", "level", "segment", "predicted"));
    out.push_str(&format!("{:-<8} {:-<7} {:-<16}\n", "", "", ""));
    for (i, seg) in report.segments.iter().enumerate() {
        for s in &seg.samples {
            out.push_str(&format!("{:>8} {:>7} {:>16.0}\n", s.level, i + 1, s.predicted));
        }
    }
    Some(out)
}

fn format_points(rows: &[PointDivergence]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>8} {:>14} {:>16} {:>14} {:>9}\n",
        "level", "actual", "predicted", "divergence", "pct"
    ));
    out.push_str(&format!(
        "{:-<8} {:-<14} {:-<16} {:-<14} {:-<9}\n",
        "", "", "", "", ""
    ));
    for p in rows {
        out.push_str(
            format!(
                "{:>8} {:>14} {:>16.2} {:>+14.2} {:>9}\n",
                p.level,
                p.actual,
                p.predicted,
                p.divergence,
                p.divergence_pct
                    .map(|v| format!("{v:+.3}%"))
                    .unwrap_or_else(|| "-".to_string())
            )
            .as_str(),
        );
    }
    out
}

fn fmt_levels(levels: &[i64]) -> String {
    if levels.is_empty() {
        return "none".to_string();
    }
    let parts: Vec<String> = levels.iter().map(i64::to_string).collect();
    parts.join(", ")
}
