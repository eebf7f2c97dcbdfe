//! File I/O, validation, and serialization for the oleander pipeline.

mod domain;
mod error;
mod exposure;
mod parse;
mod reader;
mod writer;

pub use domain::{ExperimentName, ExposureRecord, SensorId, SeriesDataset, SubstanceId};
pub use error::IoError;
pub use exposure::ExposureReader;
pub use reader::SeriesReader;
pub use writer::{CrossingSummary, ResultWriter, SimulatedSubstance};
