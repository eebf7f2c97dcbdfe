//! I/O error types for oleander-io.

use std::path::PathBuf;

/// Errors from file I/O, CSV parsing, and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} (sensor {sensor_id}) has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Sensor ID of the offending row.
        sensor_id: String,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a cell value is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Zero-based column index (excluding the id column).
        col_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a concentration or duration cell is negative.
    #[error("negative {field} in {path}: row {row_index}, value {value}")]
    NegativeValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Which field was negative.
        field: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Returned when the same sensor ID appears more than once.
    #[error("duplicate sensor ID \"{sensor_id}\" in {path}: first at row {first_row}, again at row {second_row}")]
    DuplicateSensorId {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated sensor ID.
        sensor_id: String,
        /// Zero-based row index of the first occurrence.
        first_row: usize,
        /// Zero-based row index of the second occurrence.
        second_row: usize,
    },

    /// Returned when exposure rows for one substance run backwards in time.
    #[error("out-of-order exposure in {path}: row {row_index} for substance \"{substance_id}\" has timestamp {timestamp}, previous was {previous}")]
    TimestampOrder {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header) of the offending row.
        row_index: usize,
        /// The substance whose rows are out of order.
        substance_id: String,
        /// The offending timestamp.
        timestamp: f64,
        /// The previous timestamp for the same substance.
        previous: f64,
    },

    /// Returned when a substance or experiment name contains characters
    /// outside `[a-zA-Z0-9_-]`.
    #[error("invalid {kind} \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidName {
        /// Which identifier was rejected ("substance id" or "experiment name").
        kind: &'static str,
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
