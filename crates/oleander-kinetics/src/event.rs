//! Exposure event records.

use std::collections::BTreeMap;

use serde::Serialize;

/// Monotonic identifier for a recorded exposure, unique within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ExposureId(pub(crate) u64);

impl ExposureId {
    /// Return the raw id value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ExposureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exposure-{}", self.0)
    }
}

/// A recorded exposure. Write-once: appended to a substance's history at
/// recording time and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExposureEvent {
    /// Engine-assigned identifier.
    pub id: ExposureId,
    /// The exposed substance.
    pub substance_id: String,
    /// Measured concentration.
    pub concentration: f64,
    /// Exposure duration in time units.
    pub duration: f64,
    /// When the exposure occurred.
    pub timestamp: f64,
    /// Opaque caller-supplied annotations (source sensor, location, ...).
    pub metadata: BTreeMap<String, String>,
}

/// A hypothetical future exposure used by the forward-prediction operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlannedExposure {
    /// When the exposure is expected.
    pub timestamp: f64,
    /// Expected concentration.
    pub concentration: f64,
    /// Expected duration in time units.
    pub duration: f64,
}
