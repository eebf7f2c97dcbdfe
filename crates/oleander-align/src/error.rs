//! Error types for series validation and alignment.

/// Errors from time series validation and DTW alignment.
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// Returned when an empty slice is provided as a time series.
    #[error("time series must be non-empty")]
    EmptySeries,

    /// Returned when a time series contains NaN, infinity, or negative infinity.
    #[error("time series contains non-finite value at index {index}")]
    NonFiniteValue {
        /// Position of the first non-finite value found.
        index: usize,
    },

    /// Returned when a timestamp array is not strictly increasing.
    #[error("timestamps must be strictly increasing: t[{index}] = {value} does not follow {previous}")]
    NonMonotonicTimestamps {
        /// Position of the offending timestamp.
        index: usize,
        /// The offending timestamp.
        value: f64,
        /// The timestamp immediately before it.
        previous: f64,
    },

    /// Returned when a timestamp array length does not match the value array length.
    #[error("timestamp array has {timestamps} entries but value array has {values}")]
    TimestampLengthMismatch {
        /// Number of timestamps provided.
        timestamps: usize,
        /// Number of values provided.
        values: usize,
    },

    /// Returned when a banded cost matrix leaves the terminal cell unreachable.
    ///
    /// Happens when the window is too narrow relative to the length difference
    /// of the two series: every path from (0,0) to (n-1,m-1) must leave the band.
    #[error("window {window} too narrow to align series of lengths {len_reference} and {len_target}")]
    UnreachablePath {
        /// The Sakoe-Chiba window that was requested.
        window: usize,
        /// Length of the reference series.
        len_reference: usize,
        /// Length of the target series.
        len_target: usize,
    },

    /// Returned when a cooperative cancellation check requested a stop.
    #[error("alignment cancelled by caller")]
    Cancelled,

    /// Returned when a noise-robust configuration parameter is out of range.
    #[error("invalid robust aligner parameter {parameter}: {reason}")]
    InvalidRobustParameter {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}
