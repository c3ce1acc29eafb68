//! Fitted-curve evaluation.
//!
//! A fit produces per-segment polynomials; the evaluator turns them back into a
//! level -> value lookup with optional safety margins and exact overrides.

pub mod curve;

pub use curve::*;
