//! Error types for kinetic profiles, thresholds, and the effect engine.

/// Errors from profile construction, threshold evaluation, and engine operations.
#[derive(Debug, thiserror::Error)]
pub enum KineticsError {
    /// Returned when a profile half-life is zero, negative, or non-finite.
    #[error("half-life must be positive and finite, got {half_life}")]
    NonPositiveHalfLife {
        /// The invalid half-life value provided.
        half_life: f64,
    },

    /// Returned when an accumulation rate is negative or non-finite.
    #[error("accumulation rate must be non-negative and finite, got {rate}")]
    InvalidAccumulationRate {
        /// The invalid accumulation rate provided.
        rate: f64,
    },

    /// Returned when a saturation level is zero, negative, or non-finite.
    #[error("saturation level must be positive and finite, got {level}")]
    InvalidSaturationLevel {
        /// The invalid saturation level provided.
        level: f64,
    },

    /// Returned when multi-compartment fractions do not sum to 1 within tolerance.
    #[error("compartment fractions must sum to 1.0 within 1e-6, got {sum}")]
    InvalidCompartmentFractions {
        /// The actual sum of the configured fractions.
        sum: f64,
    },

    /// Returned when a multi-compartment profile is built without compartments.
    #[error("multi-compartment profile requires at least one compartment")]
    NoCompartments,

    /// Returned when a transfer rate or level query names an unknown compartment.
    #[error("unknown compartment \"{name}\"")]
    UnknownCompartment {
        /// The compartment name that was not configured.
        name: String,
    },

    /// Returned when an inter-compartment transfer rate is negative or non-finite.
    ///
    /// The endpoint fields avoid the name `source`, which thiserror reserves
    /// for an underlying error cause.
    #[error("transfer rate from \"{from}\" to \"{to}\" must be non-negative and finite, got {rate}")]
    InvalidTransferRate {
        /// Source compartment of the offending transfer.
        from: String,
        /// Target compartment of the offending transfer.
        to: String,
        /// The invalid rate provided.
        rate: f64,
    },

    /// Returned when an operation names a substance that was never registered.
    ///
    /// Queries fail fast instead of defaulting to a zero level, so a caller
    /// bug (typo'd id, missed registration) surfaces immediately.
    #[error("unknown substance \"{substance_id}\"")]
    UnknownSubstance {
        /// The substance id that was not registered.
        substance_id: String,
    },

    /// Returned when a substance id is registered twice.
    #[error("substance \"{substance_id}\" is already registered")]
    DuplicateSubstance {
        /// The substance id that was registered before.
        substance_id: String,
    },

    /// Returned when an exposure timestamp precedes the substance's last update.
    #[error("exposure at {timestamp} precedes last update {last_update} for substance \"{substance_id}\"")]
    TimestampRegression {
        /// The substance whose history would run backwards.
        substance_id: String,
        /// The offending exposure timestamp.
        timestamp: f64,
        /// The substance's current last-update timestamp.
        last_update: f64,
    },

    /// Returned when a concentration, duration, timestamp, or threshold input
    /// is NaN or infinite, or a concentration/duration is negative.
    #[error("invalid {what}: {value}")]
    InvalidInput {
        /// Which input was rejected.
        what: &'static str,
        /// The rejected value.
        value: f64,
    },
}
