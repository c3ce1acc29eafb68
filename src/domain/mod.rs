//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the validated observation series (`ObservationSeries`)
//! - search types (`Segment`, `Partition`, `FitParams`, `BestFit`)
//! - report and export types (`FitReport`, `CurveFile`)

pub mod types;

pub use types::*;
