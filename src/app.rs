//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main:
//! - loads `.env` and parses CLI arguments
//! - installs the tracing subscriber
//! - runs the fit pipeline and prints reports/plots
//! - writes optional exports

use std::fs::File;
use std::io::{self, BufWriter};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, EvalArgs, FitArgs, SampleArgs};
use crate::data::sample::{SampleConfig, generate_table, write_table_csv};
use crate::domain::FitConfig;
use crate::error::AppError;
use crate::models::{SegmentedCurve, reference_curve};

pub mod pipeline;

/// Entry point for the `xpc` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` only supplies defaults for flags with env fallbacks.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Eval(args) => handle_eval(&args),
        Command::Sample(args) => handle_sample(&args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest, &run.best, &run.report, &config)
    );
    if let Some(outliers) = crate::report::format_outliers(&run.report) {
        println!("{outliers}");
    }
    if args.table {
        println!("{}", crate::report::format_divergence_table(&run.report));
    }
    if let Some(samples) = crate::report::format_samples(&run.report) {
        println!("{samples}");
    }

    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &run.ingest.series,
            &run.report,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &run.report)?;
        info!(path = %path.display(), "wrote per-level results");
    }
    if let Some(path) = &config.export_curve {
        crate::io::curve::write_curve_json(path, &run.report, &config.label)?;
        info!(path = %path.display(), "wrote curve file");
    }
    if config.debug_bundle {
        let path = crate::debug::write_debug_bundle(&run.ingest.series, &run.report, &config)?;
        info!(path = %path.display(), "wrote debug bundle");
    }

    Ok(())
}

fn handle_eval(args: &EvalArgs) -> Result<(), AppError> {
    let curve = match (&args.curve, args.reference) {
        (Some(path), _) => {
            let file = crate::io::curve::read_curve_json(path)?;
            SegmentedCurve::from_curve_file(&file)?
        }
        (None, Some(kind)) => reference_curve(kind),
        (None, None) => return Err(AppError::new(2, "Either --curve or --reference is required.")),
    };
    let curve = if args.margins.is_empty() {
        curve
    } else {
        curve.with_margins(&args.margins)?
    };

    println!("{}", format_eval(&curve, &args.levels));
    Ok(())
}

fn format_eval(curve: &SegmentedCurve, levels: &[i64]) -> String {
    let mut out = format!("{:>8} {:>7} {:>16}\n", "level", "segment", "value");
    for &level in levels {
        out.push_str(&format!(
            "{:>8} {:>7} {:>16}\n",
            level,
            curve.piece_index(level) + 1,
            curve.value_at(level)
        ));
    }
    out
}

fn handle_sample(args: &SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        curve: args.curve,
        max_level: args.max_level,
        noise_pct: args.noise,
        jump_prob: args.jump_prob,
        jump_pct: args.jump_pct,
        seed: args.seed,
    };
    let table = generate_table(&config)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                AppError::new(4, format!("Failed to create sample CSV '{}': {e}", path.display()))
            })?;
            write_table_csv(BufWriter::new(file), &table)?;
            info!(
                path = %path.display(),
                curve = args.curve.display_name(),
                rows = table.rows.len(),
                "wrote sample table"
            );
        }
        None => write_table_csv(io::stdout().lock(), &table)?,
    }
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        csv_path: args.csv.clone(),
        label: args.label.clone(),
        value_column: args.value_column.clone(),
        skip_levels: args.skip_levels,
        degree: args.degree,
        num_segments: args.segments,
        min_segment_size: args.min_size,
        max_partitions: (!args.no_limit).then_some(args.max_partitions),
        parallel: !args.sequential,
        outlier_threshold_pct: args.outlier_threshold,
        stride: args.stride,
        extrapolate_to: args.extrapolate_to,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
        export_results: args.export.clone(),
        export_curve: args.export_curve.clone(),
        debug_bundle: args.debug_bundle,
        debug_top: args.debug_top,
    }
}
