//! Synthetic data for demos, tests and benches.

pub mod sample;

pub use sample::*;
