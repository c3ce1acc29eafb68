//! CSV ingest of level tables.
//!
//! Turns a `level,points_net,points_total` style export into a validated
//! [`ObservationSeries`]. Rows with missing or unparseable fields are skipped
//! and reported; schema problems (missing columns) fail the whole load.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{FitConfig, Observation, ObservationSeries};
use crate::error::AppError;

/// Column holding the level number.
pub const LEVEL_COLUMN: &str = "level";
/// Optional per-level increment column; rows missing it are dropped when present.
pub const NET_COLUMN: &str = "points_net";
/// Default cumulative value column.
pub const DEFAULT_VALUE_COLUMN: &str = "points_total";

/// Summary stats about the points actually used for fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_points: usize,
    pub level_min: i64,
    pub level_max: i64,
    pub value_min: i64,
    pub value_max: i64,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: validated series + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub series: ObservationSeries,
    pub value_column: String,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Rows dropped by `--skip-levels`.
    pub rows_trimmed: usize,
    pub rows_used: usize,
}

/// Load the level table named by `config`.
pub fn load_level_table(config: &FitConfig) -> Result<IngestedData, AppError> {
    load_level_table_from_path(&config.csv_path, &config.value_column, config.skip_levels)
}

pub fn load_level_table_from_path(
    path: &Path,
    value_column: &str,
    skip_levels: i64,
) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_level_table(file, value_column, skip_levels)
}

/// Parse a level table from any reader.
///
/// Rows are sorted by level before validation, so an unsorted export is fine;
/// duplicate levels or decreasing values are still rejected.
pub fn read_level_table<R: Read>(
    input: R,
    value_column: &str,
    skip_levels: i64,
) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let value_key = normalize_header_name(value_column);
    for required in [LEVEL_COLUMN, value_key.as_str()] {
        if !header_map.contains_key(required) {
            return Err(AppError::new(2, format!("Missing required column: `{required}`")));
        }
    }
    let has_net = header_map.contains_key(NET_COLUMN);

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_trimmed = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map, &value_key, has_net) {
            Ok(obs) if obs.level <= skip_levels => rows_trimmed += 1,
            Ok(obs) => points.push(obs),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for e in &row_errors {
        warn!(line = e.line, "skipping row: {}", e.message);
    }
    if rows_trimmed > 0 {
        debug!(rows_trimmed, skip_levels, "dropped leading levels");
    }

    if points.is_empty() {
        return Err(AppError::new(3, "No valid rows remain after filtering."));
    }

    points.sort_by_key(|p| p.level);
    let stats = compute_stats(&points);
    let rows_used = points.len();
    let series = ObservationSeries::from_observations(points)?;

    Ok(IngestedData {
        series,
        value_column: value_key,
        stats,
        row_errors,
        rows_read,
        rows_trimmed,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    value_key: &str,
    has_net: bool,
) -> Result<Observation, String> {
    let level = parse_int(get_required(record, header_map, LEVEL_COLUMN)?, LEVEL_COLUMN)?;
    if has_net {
        parse_int(get_required(record, header_map, NET_COLUMN)?, NET_COLUMN)?;
    }
    let value = parse_int(get_required(record, header_map, value_key)?, value_key)?;
    Ok(Observation { level, value })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

/// Integers, or floats with no fractional part (`1143.0` from pandas exports).
fn parse_int(s: &str, name: &str) -> Result<i64, String> {
    if let Ok(v) = s.parse::<i64>() {
        return Ok(v);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 => Ok(v as i64),
        _ => Err(format!("Invalid integer for `{name}`: '{s}'")),
    }
}

fn compute_stats(points: &[Observation]) -> DatasetStats {
    let level_min = points.iter().map(|p| p.level).min().unwrap_or(0);
    let level_max = points.iter().map(|p| p.level).max().unwrap_or(0);
    let value_min = points.iter().map(|p| p.value).min().unwrap_or(0);
    let value_max = points.iter().map(|p| p.value).max().unwrap_or(0);
    DatasetStats {
        n_points: points.len(),
        level_min,
        level_max,
        value_min,
        value_max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(csv: &str, skip: i64) -> Result<IngestedData, AppError> {
        read_level_table(csv.as_bytes(), DEFAULT_VALUE_COLUMN, skip)
    }

    #[test]
    fn reads_basic_table() {
        let csv = "level,points_net,points_total\n1,0,0\n2,857,857\n3,883,1740\n";
        let data = read(csv, 0).unwrap();
        assert_eq!(data.rows_read, 3);
        assert_eq!(data.rows_used, 3);
        assert!(data.row_errors.is_empty());
        assert_eq!(data.series.points()[2], Observation { level: 3, value: 1740 });
        assert_eq!(data.stats.level_max, 3);
        assert_eq!(data.stats.value_max, 1740);
    }

    #[test]
    fn drops_rows_with_missing_values() {
        let csv = "level,points_net,points_total\n1,0,0\n2,,857\n3,883,1740\n4,1609,\n";
        let data = read(csv, 0).unwrap();
        assert_eq!(data.rows_used, 2);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 5]);
    }

    #[test]
    fn net_column_is_optional() {
        let csv = "level,points_total\n1,0\n2,857\n";
        assert_eq!(read(csv, 0).unwrap().rows_used, 2);
    }

    #[test]
    fn skip_levels_trims_leading_rows() {
        let csv = "level,points_total\n1,0\n2,857\n3,1740\n4,3349\n";
        let data = read(csv, 2).unwrap();
        assert_eq!(data.rows_trimmed, 2);
        assert_eq!(data.series.level(0), 3);
    }

    #[test]
    fn strips_bom_and_accepts_float_integers() {
        let csv = "\u{feff}Level,Points_Total\n2,857.0\n1,0\n";
        let data = read(csv, 0).unwrap();
        // Sorted by level.
        assert_eq!(data.series.level(0), 1);
        assert_eq!(data.series.points()[1].value, 857);
    }

    #[test]
    fn custom_value_column() {
        let csv = "level,points_net,spec_total\n1,0,0\n2,1143,1143\n";
        let data = read_level_table(csv.as_bytes(), "spec_total", 0).unwrap();
        assert_eq!(data.series.points()[1].value, 1143);
    }

    #[test]
    fn missing_value_column_is_a_schema_error() {
        let err = read("level,points_net\n1,0\n", 0).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("points_total"));
    }

    #[test]
    fn empty_after_filtering_is_exit_code_3() {
        let err = read("level,points_total\n1,0\n", 5).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn duplicate_levels_are_rejected() {
        let err = read("level,points_total\n1,0\n1,5\n", 0).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn fractional_values_are_row_errors() {
        let data = read("level,points_total\n1,0\n2,1.5\n3,9\n", 0).unwrap();
        assert_eq!(data.rows_used, 2);
        assert_eq!(data.row_errors.len(), 1);
    }
}
