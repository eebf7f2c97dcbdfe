//! CSV exposure log reader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::domain::{ExposureRecord, SubstanceId};
use crate::parse;
use crate::IoError;

/// Reads an exposure log from a CSV file.
///
/// Expected CSV format:
/// - Header row required
/// - `substance_id,timestamp,concentration,duration`
/// - Rows for the same substance must be non-decreasing in timestamp, since
///   the engine rejects out-of-order exposures anyway; catching it at read
///   time points at the offending file row instead.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row does not have exactly 4 columns |
/// | [`IoError::NonFiniteValue`] | Numeric cell is NaN, Inf, or unparseable |
/// | [`IoError::NegativeValue`] | Concentration or duration is negative |
/// | [`IoError::InvalidName`] | Substance id fails `[a-zA-Z0-9_-]+` |
/// | [`IoError::TimestampOrder`] | Substance rows run backwards in time |
pub struct ExposureReader {
    path: PathBuf,
}

impl ExposureReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the exposure log, returning rows in file order.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<ExposureRecord>, IoError> {
        let mut rdr = parse::open_csv(&self.path)?;
        debug!("reading exposure log");

        let mut records = Vec::new();
        let mut last_seen: HashMap<SubstanceId, f64> = HashMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = parse::checked_record(&self.path, result)?;

            if record.len() != 4 {
                let substance_id = record.get(0).unwrap_or("").to_string();
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    sensor_id: substance_id,
                    expected: 4,
                    got: record.len(),
                });
            }

            let substance_id =
                SubstanceId::new(record.get(0).unwrap_or("").to_string())?;
            let timestamp = parse::finite_cell(&self.path, &record, row_index, 1)?;
            let concentration = parse::finite_cell(&self.path, &record, row_index, 2)?;
            let duration = parse::finite_cell(&self.path, &record, row_index, 3)?;

            if concentration < 0.0 {
                return Err(IoError::NegativeValue {
                    path: self.path.clone(),
                    row_index,
                    field: "concentration",
                    value: concentration,
                });
            }
            if duration < 0.0 {
                return Err(IoError::NegativeValue {
                    path: self.path.clone(),
                    row_index,
                    field: "duration",
                    value: duration,
                });
            }

            if let Some(&previous) = last_seen.get(&substance_id)
                && timestamp < previous
            {
                return Err(IoError::TimestampOrder {
                    path: self.path.clone(),
                    row_index,
                    substance_id: substance_id.as_str().to_string(),
                    timestamp,
                    previous,
                });
            }
            last_seen.insert(substance_id.clone(), timestamp);

            records.push(ExposureRecord {
                substance_id,
                timestamp,
                concentration,
                duration,
            });
        }

        if records.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(n_exposures = records.len(), "exposure log loaded");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    const HEADER: &str = "substance_id,timestamp,concentration,duration\n";

    #[test]
    fn read_valid_log() {
        let csv = format!("{HEADER}toluene,0.0,3.5,1.0\ntoluene,4.0,2.0,0.5\nlead,1.0,0.2,8.0\n");
        let f = write_csv(&csv);
        let records = ExposureReader::new(f.path()).read().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].substance_id.as_str(), "toluene");
        assert_eq!(records[2].substance_id.as_str(), "lead");
        assert_eq!(records[1].timestamp, 4.0);
        assert_eq!(records[1].concentration, 2.0);
        assert_eq!(records[1].duration, 0.5);
    }

    #[test]
    fn interleaved_substances_keep_file_order() {
        let csv = format!("{HEADER}a,0.0,1.0,1.0\nb,0.5,1.0,1.0\na,1.0,1.0,1.0\n");
        let f = write_csv(&csv);
        let records = ExposureReader::new(f.path()).read().unwrap();
        assert_eq!(records[1].substance_id.as_str(), "b");
    }

    #[test]
    fn equal_timestamps_for_one_substance_allowed() {
        let csv = format!("{HEADER}a,1.0,1.0,1.0\na,1.0,2.0,1.0\n");
        let f = write_csv(&csv);
        assert_eq!(ExposureReader::new(f.path()).read().unwrap().len(), 2);
    }

    #[test]
    fn error_backwards_timestamps_per_substance() {
        let csv = format!("{HEADER}a,2.0,1.0,1.0\nb,0.0,1.0,1.0\na,1.0,1.0,1.0\n");
        let f = write_csv(&csv);
        let result = ExposureReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::TimestampOrder { row_index: 2, .. })
        ));
    }

    #[test]
    fn error_negative_concentration() {
        let csv = format!("{HEADER}a,0.0,-1.0,1.0\n");
        let f = write_csv(&csv);
        let result = ExposureReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::NegativeValue { field: "concentration", .. })
        ));
    }

    #[test]
    fn error_missing_column() {
        let csv = format!("{HEADER}a,0.0,1.0\n");
        let f = write_csv(&csv);
        let result = ExposureReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::InconsistentRowLength { expected: 4, got: 3, .. })
        ));
    }

    #[test]
    fn error_invalid_substance_id() {
        let csv = format!("{HEADER}bad id!,0.0,1.0,1.0\n");
        let f = write_csv(&csv);
        let result = ExposureReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::InvalidName { .. })));
    }

    #[test]
    fn error_empty_log() {
        let f = write_csv(HEADER);
        let result = ExposureReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_unparseable_timestamp() {
        let csv = format!("{HEADER}a,noon,1.0,1.0\n");
        let f = write_csv(&csv);
        let result = ExposureReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::NonFiniteValue { .. })));
    }
}
