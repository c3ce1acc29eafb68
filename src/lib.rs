//! `xp-curves` library crate.
//!
//! Fits cumulative XP / level tables with contiguous polynomial segments,
//! choosing the split points that minimize the summed per-segment MSE.
//!
//! The binary (`xpc`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting core (`fit`, `report`) can be used without the CLI

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;

pub use error::{AppError, FitError};
pub use fit::{fit, fit_with};
