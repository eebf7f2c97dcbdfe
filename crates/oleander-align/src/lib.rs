//! Temporal alignment for exposure time series.
//!
//! Pure math library — zero I/O. Provides dynamic time warping alignment with
//! an optional Sakoe-Chiba window, deterministic warping-path reconstruction,
//! pairwise distance matrices, and a noise-robust aligner that suppresses
//! outliers, smooths, and aligns in feature space before projecting the path
//! back onto the raw samples.

mod aligner;
mod constraint;
mod error;
mod matrix;
mod metric;
mod path;
mod report;
mod robust;
mod series;

pub use aligner::{Alignment, CancelCheck, SeriesAligner};
pub use constraint::BandConstraint;
pub use error::AlignError;
pub use matrix::DistanceMatrix;
pub use metric::DistanceMetric;
pub use path::{WarpingPath, WarpingStep};
pub use report::AlignmentReport;
pub use robust::{NoiseRobustAligner, RobustAlignment, RobustConfig};
pub use series::{SampledSeries, TimeSeries, TimeSeriesView};
