//! Per-substance kinetic state and its pure transition functions.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::profile::{AccumulationProfile, ModelKind};

/// Current level of a substance, either a single pool or a set of named
/// compartments. Every component is non-negative at all times.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SubstanceState {
    /// Single-pool level for first-order and saturable models.
    Scalar {
        /// Current level.
        level: f64,
    },
    /// Per-compartment levels for multi-compartment models.
    Compartmental {
        /// Current level per compartment name.
        levels: BTreeMap<String, f64>,
    },
}

impl SubstanceState {
    /// Create the zero state matching the profile's model kind.
    #[must_use]
    pub fn initial(profile: &AccumulationProfile) -> Self {
        match profile.model_kind() {
            ModelKind::FirstOrder | ModelKind::Saturable => Self::Scalar { level: 0.0 },
            ModelKind::MultiCompartment => Self::Compartmental {
                levels: profile.compartments().keys().map(|k| (k.clone(), 0.0)).collect(),
            },
        }
    }

    /// Return the total level summed over all compartments.
    #[must_use]
    pub fn total_level(&self) -> f64 {
        match self {
            Self::Scalar { level } => *level,
            Self::Compartmental { levels } => levels.values().sum(),
        }
    }

    /// Return the level of a single compartment, if it exists.
    #[must_use]
    pub fn compartment_level(&self, name: &str) -> Option<f64> {
        match self {
            Self::Scalar { .. } => None,
            Self::Compartmental { levels } => levels.get(name).copied(),
        }
    }

    /// Return the state after `elapsed` time units of clearance with no new
    /// exposure.
    ///
    /// Single-pool models decay the level by the profile's clearance
    /// fraction. Compartmental models decay every compartment, then apply the
    /// configured transfers in order; each transfer moves
    /// `source_level * rate * elapsed`, clipped to the mass actually present,
    /// so transfers redistribute but never create mass. The total level is
    /// therefore non-increasing.
    #[must_use]
    pub fn after_clearance(&self, profile: &AccumulationProfile, elapsed: f64) -> Self {
        if elapsed <= 0.0 {
            return self.clone();
        }
        let retained = 1.0 - profile.clearance_fraction(elapsed);
        match self {
            Self::Scalar { level } => Self::Scalar { level: level * retained },
            Self::Compartmental { levels } => {
                let mut next: BTreeMap<String, f64> =
                    levels.iter().map(|(k, v)| (k.clone(), v * retained)).collect();
                for transfer in profile.transfers() {
                    let available = next.get(&transfer.source).copied().unwrap_or(0.0);
                    let amount = (available * transfer.rate * elapsed).min(available);
                    if amount <= 0.0 {
                        continue;
                    }
                    if let Some(source) = next.get_mut(&transfer.source) {
                        *source -= amount;
                    }
                    if let Some(target) = next.get_mut(&transfer.target) {
                        *target += amount;
                    }
                }
                Self::Compartmental { levels: next }
            }
        }
    }

    /// Return the state after adding an exposure's contribution.
    ///
    /// The contribution is `concentration * duration * accumulation_rate`
    /// (damped near saturation for the saturable model) and, for
    /// compartmental models, distributed across compartments in proportion
    /// to their configured fractions.
    #[must_use]
    pub fn with_intake(
        &self,
        profile: &AccumulationProfile,
        concentration: f64,
        duration: f64,
    ) -> Self {
        let contribution = profile.intake(concentration, duration, self.total_level());
        match self {
            Self::Scalar { level } => Self::Scalar { level: level + contribution },
            Self::Compartmental { levels } => {
                let mut next = levels.clone();
                for (name, fraction) in profile.compartments() {
                    if let Some(level) = next.get_mut(name) {
                        *level += contribution * fraction;
                    }
                }
                Self::Compartmental { levels: next }
            }
        }
    }
}
