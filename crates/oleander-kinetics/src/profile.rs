//! Kinetic accumulation profiles: validated, immutable value objects.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::KineticsError;

/// Damping applied to the fractional clearance of the saturable model.
///
/// A fixed empirical stand-in for concentration-dependent Michaelis-Menten
/// saturation; kept as a documented literal rather than a fitted curve.
const SATURABLE_CLEARANCE_DAMPING: f64 = 0.8;

/// Tolerance for the compartment-fractions-sum-to-one check.
const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

/// Which kinetic model governs a substance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelKind {
    /// Single pool, exponential clearance.
    FirstOrder,
    /// Exponential clearance damped near saturation; intake divided by
    /// `1 + level / saturation_level` when a saturation level is set.
    Saturable,
    /// Named compartments with per-pair transfer rates.
    MultiCompartment,
}

/// A directed inter-compartment transfer with a rate per unit time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    /// Compartment mass is drawn from.
    pub source: String,
    /// Compartment mass is added to.
    pub target: String,
    /// Fraction of the source level transferred per unit time.
    pub rate: f64,
}

/// Immutable kinetic parameters for one substance.
///
/// Constructed once at registration through the checked constructors (or
/// [`MultiCompartmentBuilder`] for compartmental models) and never mutated
/// afterwards; changing parameters means building a new profile, so the
/// fractions-sum-to-one invariant cannot be violated after the fact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccumulationProfile {
    half_life: f64,
    accumulation_rate: f64,
    saturation_level: Option<f64>,
    model_kind: ModelKind,
    compartments: BTreeMap<String, f64>,
    transfers: Vec<Transfer>,
}

impl AccumulationProfile {
    /// Create a first-order (single pool, exponential clearance) profile.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KineticsError::NonPositiveHalfLife`] | `half_life <= 0` or non-finite |
    /// | [`KineticsError::InvalidAccumulationRate`] | `accumulation_rate < 0` or non-finite |
    pub fn first_order(half_life: f64, accumulation_rate: f64) -> Result<Self, KineticsError> {
        validate_rates(half_life, accumulation_rate)?;
        Ok(Self {
            half_life,
            accumulation_rate,
            saturation_level: None,
            model_kind: ModelKind::FirstOrder,
            compartments: BTreeMap::new(),
            transfers: Vec::new(),
        })
    }

    /// Create a saturable profile.
    ///
    /// `saturation_level` of `None` keeps the damped clearance but applies no
    /// intake division.
    ///
    /// # Errors
    ///
    /// As [`first_order`](Self::first_order), plus
    /// [`KineticsError::InvalidSaturationLevel`] when the level is not
    /// positive and finite.
    pub fn saturable(
        half_life: f64,
        accumulation_rate: f64,
        saturation_level: Option<f64>,
    ) -> Result<Self, KineticsError> {
        validate_rates(half_life, accumulation_rate)?;
        if let Some(level) = saturation_level
            && !(level > 0.0 && level.is_finite())
        {
            return Err(KineticsError::InvalidSaturationLevel { level });
        }
        Ok(Self {
            half_life,
            accumulation_rate,
            saturation_level,
            model_kind: ModelKind::Saturable,
            compartments: BTreeMap::new(),
            transfers: Vec::new(),
        })
    }

    /// Start building a multi-compartment profile.
    #[must_use]
    pub fn multi_compartment(half_life: f64, accumulation_rate: f64) -> MultiCompartmentBuilder {
        MultiCompartmentBuilder {
            half_life,
            accumulation_rate,
            compartments: BTreeMap::new(),
            transfers: Vec::new(),
        }
    }

    /// Return the half-life.
    #[must_use]
    pub fn half_life(&self) -> f64 {
        self.half_life
    }

    /// Return the accumulation rate.
    #[must_use]
    pub fn accumulation_rate(&self) -> f64 {
        self.accumulation_rate
    }

    /// Return the saturation level, if configured.
    #[must_use]
    pub fn saturation_level(&self) -> Option<f64> {
        self.saturation_level
    }

    /// Return the kinetic model kind.
    #[must_use]
    pub fn model_kind(&self) -> ModelKind {
        self.model_kind
    }

    /// Return the compartment fractions (empty for non-compartmental models).
    #[must_use]
    pub fn compartments(&self) -> &BTreeMap<String, f64> {
        &self.compartments
    }

    /// Return the configured inter-compartment transfers.
    #[must_use]
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// Return the first-order elimination rate constant `ln(2) / half_life`.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        std::f64::consts::LN_2 / self.half_life
    }

    /// Return the fraction of the current level cleared after `elapsed` time
    /// units, in `[0, 1)`.
    ///
    /// First-order and multi-compartment models use `1 - exp(-k * elapsed)`;
    /// the saturable model damps that fraction by a fixed factor of 0.8.
    /// Non-positive elapsed time clears nothing.
    #[must_use]
    pub fn clearance_fraction(&self, elapsed: f64) -> f64 {
        if elapsed <= 0.0 {
            return 0.0;
        }
        // exp underflows to 0 for large elapsed; keep the fraction strictly below 1.
        let base = (1.0 - (-self.elimination_rate() * elapsed).exp()).min(1.0 - f64::EPSILON);
        match self.model_kind {
            ModelKind::FirstOrder | ModelKind::MultiCompartment => base,
            ModelKind::Saturable => base * SATURABLE_CLEARANCE_DAMPING,
        }
    }

    /// Return the level added by an exposure of `concentration` over
    /// `duration`, given the current total level.
    ///
    /// The saturable model divides the contribution by
    /// `1 + current_level / saturation_level` when a saturation level is set.
    #[must_use]
    pub fn intake(&self, concentration: f64, duration: f64, current_level: f64) -> f64 {
        let raw = concentration * duration * self.accumulation_rate;
        match (self.model_kind, self.saturation_level) {
            (ModelKind::Saturable, Some(saturation)) => raw / (1.0 + current_level / saturation),
            _ => raw,
        }
    }
}

fn validate_rates(half_life: f64, accumulation_rate: f64) -> Result<(), KineticsError> {
    if !(half_life > 0.0 && half_life.is_finite()) {
        return Err(KineticsError::NonPositiveHalfLife { half_life });
    }
    if !(accumulation_rate >= 0.0 && accumulation_rate.is_finite()) {
        return Err(KineticsError::InvalidAccumulationRate { rate: accumulation_rate });
    }
    Ok(())
}

/// Builder for multi-compartment profiles.
///
/// Chain [`with_compartment`](Self::with_compartment) and
/// [`with_transfer`](Self::with_transfer), then call [`build`](Self::build);
/// all invariants are checked at build time.
#[derive(Debug, Clone)]
pub struct MultiCompartmentBuilder {
    half_life: f64,
    accumulation_rate: f64,
    compartments: BTreeMap<String, f64>,
    transfers: Vec<Transfer>,
}

impl MultiCompartmentBuilder {
    /// Add a named compartment receiving `fraction` of every intake.
    #[must_use]
    pub fn with_compartment(mut self, name: &str, fraction: f64) -> Self {
        self.compartments.insert(name.to_string(), fraction);
        self
    }

    /// Add a directed transfer between two compartments.
    #[must_use]
    pub fn with_transfer(mut self, source: &str, target: &str, rate: f64) -> Self {
        self.transfers.push(Transfer {
            source: source.to_string(),
            target: target.to_string(),
            rate,
        });
        self
    }

    /// Validate and build the profile.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KineticsError::NonPositiveHalfLife`] | `half_life <= 0` or non-finite |
    /// | [`KineticsError::InvalidAccumulationRate`] | `accumulation_rate < 0` or non-finite |
    /// | [`KineticsError::NoCompartments`] | No compartments were added |
    /// | [`KineticsError::InvalidCompartmentFractions`] | Fractions do not sum to 1 within 1e-6, or any is negative/non-finite |
    /// | [`KineticsError::UnknownCompartment`] | A transfer endpoint names no configured compartment |
    /// | [`KineticsError::InvalidTransferRate`] | A transfer rate is negative or non-finite |
    pub fn build(self) -> Result<AccumulationProfile, KineticsError> {
        validate_rates(self.half_life, self.accumulation_rate)?;
        if self.compartments.is_empty() {
            return Err(KineticsError::NoCompartments);
        }
        let sum: f64 = self.compartments.values().sum();
        if !sum.is_finite()
            || self.compartments.values().any(|&f| !(f >= 0.0) || !f.is_finite())
            || (sum - 1.0).abs() > FRACTION_SUM_TOLERANCE
        {
            return Err(KineticsError::InvalidCompartmentFractions { sum });
        }
        for transfer in &self.transfers {
            for endpoint in [&transfer.source, &transfer.target] {
                if !self.compartments.contains_key(endpoint) {
                    return Err(KineticsError::UnknownCompartment { name: endpoint.clone() });
                }
            }
            if !(transfer.rate >= 0.0 && transfer.rate.is_finite()) {
                return Err(KineticsError::InvalidTransferRate {
                    from: transfer.source.clone(),
                    to: transfer.target.clone(),
                    rate: transfer.rate,
                });
            }
        }
        Ok(AccumulationProfile {
            half_life: self.half_life,
            accumulation_rate: self.accumulation_rate,
            saturation_level: None,
            model_kind: ModelKind::MultiCompartment,
            compartments: self.compartments,
            transfers: self.transfers,
        })
    }
}
