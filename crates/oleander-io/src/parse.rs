//! CSV helpers shared by the series and exposure readers.

use std::fs::File;
use std::path::Path;

use crate::IoError;

/// Open a CSV file with a header row and flexible record widths, so the
/// readers' own shape checks fire instead of a low-level parse error.
pub(crate) fn open_csv(path: &Path) -> Result<csv::Reader<File>, IoError> {
    let file = File::open(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file))
}

/// Convert a csv-level failure into [`IoError::CsvParse`].
pub(crate) fn csv_error(path: &Path, e: csv::Error) -> IoError {
    IoError::CsvParse {
        path: path.to_path_buf(),
        offset: e.position().map_or(0, |p| p.byte()),
        source: e,
    }
}

/// Unwrap one record from the reader's record iterator.
pub(crate) fn checked_record(
    path: &Path,
    result: csv::Result<csv::StringRecord>,
) -> Result<csv::StringRecord, IoError> {
    result.map_err(|e| csv_error(path, e))
}

/// Parse one cell as a finite f64.
///
/// `col_index` is the record column; the error reports it zero-based relative
/// to the first data column.
pub(crate) fn finite_cell(
    path: &Path,
    record: &csv::StringRecord,
    row_index: usize,
    col_index: usize,
) -> Result<f64, IoError> {
    let raw = record.get(col_index).unwrap_or("");
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| IoError::NonFiniteValue {
            path: path.to_path_buf(),
            row_index,
            col_index: col_index - 1,
            raw: raw.to_string(),
        })
}
