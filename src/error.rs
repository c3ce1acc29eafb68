//! Error types.
//!
//! Two layers:
//!
//! - [`FitError`]: typed failures of the fitting core. Callers can tell "the
//!   input is malformed" apart from "this series cannot be split that way".
//! - [`AppError`]: what the binary reports, carrying a process exit code.

/// Failures of the segmented fitting core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// Malformed series or parameters. The message names the constraint.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No composition of the series into the requested segments exists.
    #[error(
        "Infeasible partition: {n} points cannot form {num_segments} segments of at least {min_segment_size} points"
    )]
    InfeasiblePartition {
        /// Series length
        n: usize,
        /// Requested segment count
        num_segments: usize,
        /// Effective minimum segment size
        min_segment_size: usize,
    },

    /// A segment has fewer points than `degree + 1`.
    ///
    /// Candidates hitting this are excluded from scoring rather than surfaced.
    #[error("Degenerate segment [{start}, {end}) for a degree-{degree} fit")]
    DegenerateSegment {
        /// First index (inclusive)
        start: usize,
        /// Last index (exclusive)
        end: usize,
        /// Polynomial degree
        degree: usize,
    },

    /// The enumerated partition count is above the configured ceiling.
    #[error(
        "Search too large: {candidates} candidate partitions exceed the ceiling of {ceiling}; raise --max-partitions or --min-size"
    )]
    SearchTooLarge {
        /// Number of partitions the enumerator would produce
        candidates: u128,
        /// Configured ceiling
        ceiling: u64,
    },

    /// Every enumerated candidate was excluded.
    #[error("No feasible fit: all {candidates} candidate partitions were rejected")]
    NoFeasibleFit {
        /// Number of candidates tried
        candidates: usize,
    },
}

impl FitError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err {
            FitError::InvalidInput(_) | FitError::SearchTooLarge { .. } => 2,
            FitError::InfeasiblePartition { .. } => 3,
            FitError::DegenerateSegment { .. } | FitError::NoFeasibleFit { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}
