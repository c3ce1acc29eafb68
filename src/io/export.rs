//! Export per-level results to CSV.
//!
//! One row per observed level, tagged with the segment that fitted it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::FitReport;
use crate::error::AppError;

/// Write per-level results to a CSV file.
pub fn write_results_csv(path: &Path, report: &FitReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_results(&mut out, report)?;
    out.flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))
}

/// Write the results table to any writer.
pub fn write_results<W: Write>(out: &mut W, report: &FitReport) -> Result<(), AppError> {
    let row_err = |e: std::io::Error| AppError::new(4, format!("Failed to write export CSV row: {e}"));

    writeln!(out, "level,segment,actual,predicted,divergence,divergence_pct")
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV header: {e}")))?;

    for (seg_idx, seg) in report.segments.iter().enumerate() {
        for p in &seg.points {
            writeln!(
                out,
                "{},{},{},{:.4},{:.4},{}",
                p.level,
                seg_idx + 1,
                p.actual,
                p.predicted,
                p.divergence,
                p.divergence_pct.map(|v| format!("{v:.4}")).unwrap_or_default(),
            )
            .map_err(row_err)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fit;

    #[test]
    fn one_row_per_level_with_segment_index() {
        let levels: Vec<i64> = (1..=8).collect();
        let values: Vec<i64> = levels
            .iter()
            .map(|&x| if x <= 4 { 10 * x } else { 100 * x })
            .collect();
        let report = fit(&levels, &values, 1, 2, 2).unwrap();

        let mut buf = Vec::new();
        write_results(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "level,segment,actual,predicted,divergence,divergence_pct");
        assert_eq!(lines.len(), 9);
        assert!(lines[1].starts_with("1,1,10,"));
        assert!(lines[8].starts_with("8,2,800,"));
    }

    #[test]
    fn zero_actual_leaves_pct_blank() {
        let report = fit(&[1, 2, 3], &[0, 10, 20], 1, 1, 2).unwrap();
        let mut buf = Vec::new();
        write_results(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let first = text.lines().nth(1).unwrap();
        assert!(first.ends_with(','), "row: {first}");
    }
}
