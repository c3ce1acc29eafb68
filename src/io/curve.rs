//! Read/write curve JSON files.
//!
//! A curve file is the portable form of a fitted segmented curve: the
//! per-segment coefficients and level ranges plus run metadata. `xpc eval`
//! reads it back into a [`crate::models::SegmentedCurve`].
//!
//! The schema is defined by `domain::CurveFile`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveFile, CurveSegment, FitReport};
use crate::error::AppError;

pub const TOOL_NAME: &str = "xpc";

/// Build the curve file for a report, stamped with the current UTC time.
pub fn curve_file_from_report(report: &FitReport, label: &str) -> CurveFile {
    CurveFile {
        tool: TOOL_NAME.to_string(),
        generated_at: Utc::now(),
        label: label.to_string(),
        degree: report.degree,
        split_levels: report.split_levels.clone(),
        total_mse: report.total_mse,
        segments: report
            .segments
            .iter()
            .map(|s| CurveSegment {
                level_range: s.level_range,
                coefficients: s.coefficients.clone(),
                mse: s.mse,
                r2: s.r2,
            })
            .collect(),
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, report: &FitReport, label: &str) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create curve JSON '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, &curve_file_from_report(report, label))
        .map_err(|e| AppError::new(4, format!("Failed to write curve JSON: {e}")))?;
    out.flush()
        .map_err(|e| AppError::new(4, format!("Failed to write curve JSON: {e}")))
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    let curve: CurveFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid curve JSON: {e}")))?;
    if curve.segments.is_empty() {
        return Err(AppError::new(2, "Invalid curve JSON: no segments."));
    }
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fit;

    #[test]
    fn curve_file_carries_segments_and_splits() {
        let levels: Vec<i64> = (1..=12).collect();
        let values: Vec<i64> = levels
            .iter()
            .map(|&x| if x <= 6 { 10 * x } else { 100 * x })
            .collect();
        let report = fit(&levels, &values, 1, 2, 3).unwrap();
        let curve = curve_file_from_report(&report, "Character");

        assert_eq!(curve.tool, "xpc");
        assert_eq!(curve.label, "Character");
        assert_eq!(curve.split_levels, vec![7]);
        assert_eq!(curve.segments.len(), 2);
        assert_eq!(curve.segments[1].level_range, [7, 12]);

        let json = serde_json::to_string(&curve).unwrap();
        let back: CurveFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.generated_at, curve.generated_at);
        assert_eq!(back.split_levels, curve.split_levels);
        assert_eq!(back.segments[0].level_range, [1, 6]);
    }

    #[test]
    fn missing_file_is_exit_code_2() {
        let err = read_curve_json(Path::new("/nonexistent/xpc-curve.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
