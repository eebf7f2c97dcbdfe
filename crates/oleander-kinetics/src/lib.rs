//! Cumulative exposure kinetics: accumulation, clearance, and threshold
//! crossing detection for monitored substances.
//!
//! Pure in-memory library — zero I/O, no global state. A
//! [`CumulativeEffectEngine`] owns every registry; callers construct and tear
//! it down explicitly. All operations are synchronous functions of their
//! inputs and the engine's owned state; independent substances can be driven
//! by parallel workers as long as each substance has a single writer.

mod engine;
mod error;
mod event;
mod profile;
mod state;
mod threshold;

pub use engine::CumulativeEffectEngine;
pub use error::KineticsError;
pub use event::{ExposureEvent, ExposureId, PlannedExposure};
pub use profile::{AccumulationProfile, ModelKind, MultiCompartmentBuilder, Transfer};
pub use state::SubstanceState;
pub use threshold::{
    CrossingEvent, CrossingKind, CrossingPrediction, Severity, ThresholdDefinition, ThresholdMonitor,
    ThresholdSpec,
};
