//! CSV sensor series reader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use oleander_align::TimeSeries;
use tracing::{debug, info, instrument};

use crate::domain::{SensorId, SeriesDataset};
use crate::parse;
use crate::IoError;

/// Reads sensor time series from a CSV file shaped `sensor_id,t0,t1,...,tn`.
///
/// The header fixes the column count; every data row must match it, carry a
/// unique sensor id in its first column, and parse as finite floats in the
/// rest.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
/// | [`IoError::DuplicateSensorId`] | Same sensor_id appears twice |
pub struct SeriesReader {
    path: PathBuf,
}

impl SeriesReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`SeriesDataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<SeriesDataset, IoError> {
        let mut rdr = parse::open_csv(&self.path)?;
        let expected_cols = rdr
            .headers()
            .map_err(|e| parse::csv_error(&self.path, e))?
            .len();
        debug!(expected_cols, "read CSV header");

        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut dataset = SeriesDataset {
            sensor_ids: Vec::new(),
            series: Vec::new(),
        };

        for (row_index, result) in rdr.records().enumerate() {
            let record = parse::checked_record(&self.path, result)?;
            let (sensor_id, values) = self.parse_row(row_index, &record, expected_cols)?;

            if let Some(first_row) = seen.insert(sensor_id.as_str().to_string(), row_index) {
                return Err(IoError::DuplicateSensorId {
                    path: self.path.clone(),
                    sensor_id: sensor_id.as_str().to_string(),
                    first_row,
                    second_row: row_index,
                });
            }

            // Empty values can only mean a header with no time-step columns.
            let series = TimeSeries::new(values).map_err(|_| IoError::EmptyDataset {
                path: self.path.clone(),
            })?;
            dataset.sensor_ids.push(sensor_id);
            dataset.series.push(series);
        }

        if dataset.sensor_ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_sensors = dataset.sensor_ids.len(),
            n_timesteps = dataset.series.first().map_or(0, |s| s.len()),
            "series dataset loaded"
        );
        Ok(dataset)
    }

    fn parse_row(
        &self,
        row_index: usize,
        record: &csv::StringRecord,
        expected_cols: usize,
    ) -> Result<(SensorId, Vec<f64>), IoError> {
        if record.len() != expected_cols {
            return Err(IoError::InconsistentRowLength {
                path: self.path.clone(),
                row_index,
                sensor_id: record.get(0).unwrap_or("").to_string(),
                expected: expected_cols,
                got: record.len(),
            });
        }
        let values = (1..record.len())
            .map(|col| parse::finite_cell(&self.path, record, row_index, col))
            .collect::<Result<Vec<f64>, IoError>>()?;
        Ok((SensorId::new(record.get(0).unwrap_or("").to_string()), values))
    }
}
