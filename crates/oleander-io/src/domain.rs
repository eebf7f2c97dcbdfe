//! Domain types for oleander-io.

use oleander_align::TimeSeries;

use crate::IoError;

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A sensor identifier from the first column of a series CSV.
///
/// Wraps a non-empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SensorId(String);

impl SensorId {
    /// Create a new sensor ID from a non-empty string.
    pub(crate) fn new(id: String) -> Self {
        debug_assert!(!id.is_empty(), "sensor ID must not be empty");
        Self(id)
    }

    /// Return the sensor ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated substance identifier.
///
/// Must match `[a-zA-Z0-9_-]+`, so it is safe to embed in file names and
/// log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubstanceId(String);

impl SubstanceId {
    /// Parse and validate a substance ID.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidName`] if the ID is empty or contains
    /// characters outside `[a-zA-Z0-9_-]`.
    pub fn new(id: String) -> Result<Self, IoError> {
        if !is_valid_name(&id) {
            return Err(IoError::InvalidName { kind: "substance id", name: id });
        }
        Ok(Self(id))
    }

    /// Return the substance ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidName`] if the name is empty or contains
    /// characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if !is_valid_name(&name) {
            return Err(IoError::InvalidName { kind: "experiment name", name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dataset of time series with associated sensor identifiers.
///
/// Produced by [`SeriesReader`](crate::SeriesReader). Sensor IDs and series
/// are stored in parallel vectors — `sensor_ids[i]` corresponds to
/// `series[i]`.
#[derive(Debug)]
pub struct SeriesDataset {
    /// Sensor identifiers in insertion order (matching the CSV row order).
    pub sensor_ids: Vec<SensorId>,
    /// Validated time series in the same order as `sensor_ids`.
    pub series: Vec<TimeSeries>,
}

impl SeriesDataset {
    /// Look up a series by sensor ID.
    #[must_use]
    pub fn find(&self, sensor_id: &str) -> Option<&TimeSeries> {
        self.sensor_ids
            .iter()
            .position(|id| id.as_str() == sensor_id)
            .map(|i| &self.series[i])
    }
}

/// One validated row of an exposure CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureRecord {
    /// The exposed substance.
    pub substance_id: SubstanceId,
    /// When the exposure occurred.
    pub timestamp: f64,
    /// Measured concentration, non-negative.
    pub concentration: f64,
    /// Exposure duration in time units, non-negative.
    pub duration: f64,
}
