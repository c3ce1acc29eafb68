//! Command-line parsing for the segmented XP curve fitter.
//!
//! Argument parsing and command dispatch stay separate from the fitting code;
//! `app` turns these structs into plain config before anything runs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_MAX_PARTITIONS, DEFAULT_OUTLIER_THRESHOLD_PCT, ReferenceCurve};
use crate::io::ingest::DEFAULT_VALUE_COLUMN;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "xpc", version, about = "Segmented polynomial fitting for XP / level tables")]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a level table, print the chosen segments, and optionally plot/export.
    Fit(FitArgs),
    /// Evaluate a saved curve (or a built-in reference curve) at given levels.
    Eval(EvalArgs),
    /// Write a synthetic level table generated from a reference curve.
    Sample(SampleArgs),
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Level table CSV (`level,points_net,points_total`).
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Name printed in the report and stored in the curve file.
    #[arg(long, default_value = "XP")]
    pub label: String,

    /// Column holding cumulative values.
    #[arg(long, default_value = DEFAULT_VALUE_COLUMN)]
    pub value_column: String,

    /// Drop every row with `level <= N` before fitting.
    #[arg(long, default_value_t = 0)]
    pub skip_levels: i64,

    /// Polynomial degree of each segment.
    #[arg(short, long, env = "XPC_DEGREE", default_value_t = 3)]
    pub degree: usize,

    /// Number of contiguous segments.
    #[arg(short = 'k', long, env = "XPC_SEGMENTS", default_value_t = 1)]
    pub segments: usize,

    /// Minimum points per segment (defaults to degree + 1).
    #[arg(short, long)]
    pub min_size: Option<usize>,

    /// Refuse searches with more candidate partitions than this.
    #[arg(long, env = "XPC_MAX_PARTITIONS", default_value_t = DEFAULT_MAX_PARTITIONS)]
    pub max_partitions: u64,

    /// Remove the candidate ceiling entirely.
    #[arg(long, conflicts_with = "max_partitions")]
    pub no_limit: bool,

    /// Score candidates on a single thread.
    #[arg(long)]
    pub sequential: bool,

    /// Relative divergence (percent) above which a point is flagged.
    #[arg(long, default_value_t = DEFAULT_OUTLIER_THRESHOLD_PCT)]
    pub outlier_threshold: f64,

    /// Print predicted values every N levels.
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
    pub stride: Option<i64>,

    /// Extend the last segment's predictions up to this level.
    #[arg(long)]
    pub extrapolate_to: Option<i64>,

    /// Print the per-level divergence table.
    #[arg(long)]
    pub table: bool,

    /// Render an ASCII plot in the terminal.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export per-level results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the fitted segments to JSON.
    #[arg(long = "export-curve")]
    pub export_curve: Option<PathBuf>,

    /// Write a markdown debug bundle under `debug/`.
    #[arg(long)]
    pub debug_bundle: bool,

    /// Candidates listed in the debug bundle.
    #[arg(long, default_value_t = 10)]
    pub debug_top: usize,
}

#[derive(Debug, Args, Clone)]
pub struct EvalArgs {
    /// Curve JSON produced by `xpc fit --export-curve`.
    #[arg(long, value_name = "JSON", required_unless_present = "reference")]
    pub curve: Option<PathBuf>,

    /// Use a built-in reference curve instead of a file.
    #[arg(long, value_enum, conflicts_with = "curve")]
    pub reference: Option<ReferenceCurve>,

    /// Levels to evaluate.
    #[arg(short, long = "level", required = true, num_args = 1..)]
    pub levels: Vec<i64>,

    /// Safety margin in percent: one value for all segments, or one per segment.
    #[arg(long = "margin", num_args = 1..)]
    pub margins: Vec<f64>,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Reference curve to sample from.
    #[arg(long, value_enum, default_value_t = ReferenceCurve::Specialization)]
    pub curve: ReferenceCurve,

    /// Highest level in the table.
    #[arg(long, default_value_t = 300)]
    pub max_level: i64,

    /// Per-level noise (log-scale std dev, percent).
    #[arg(long, default_value_t = 1.0)]
    pub noise: f64,

    /// Probability of an outlier jump per level.
    #[arg(long, default_value_t = 0.0)]
    pub jump_prob: f64,

    /// Size of an outlier jump, in percent of the level's increment.
    #[arg(long, default_value_t = 25.0)]
    pub jump_pct: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV (stdout when omitted).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fit_defaults() {
        let cli = Cli::try_parse_from(["xpc", "fit", "xp.csv"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.value_column, "points_total");
        assert_eq!(args.min_size, None);
        assert!(!args.sequential);
        assert!(!args.no_limit);
    }

    #[test]
    fn eval_requires_a_curve_source() {
        assert!(Cli::try_parse_from(["xpc", "eval", "--level", "5"]).is_err());
        let cli = Cli::try_parse_from([
            "xpc", "eval", "--reference", "specialization", "--level", "10", "11",
        ])
        .unwrap();
        let Command::Eval(args) = cli.command else {
            panic!("expected eval");
        };
        assert_eq!(args.levels, vec![10, 11]);
        assert_eq!(args.reference, Some(ReferenceCurve::Specialization));
    }

    #[test]
    fn stride_must_be_positive() {
        assert!(Cli::try_parse_from(["xpc", "fit", "xp.csv", "--stride", "0"]).is_err());
    }
}
