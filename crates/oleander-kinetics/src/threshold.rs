//! Threshold hysteresis and analytic crossing prediction.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::error::KineticsError;

/// How serious an exceedance of this threshold is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Advisory only.
    Low,
    /// Warrants attention.
    Moderate,
    /// Action required.
    High,
    /// Immediate action required.
    Critical,
}

/// Which direction a threshold was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrossingKind {
    /// Level rose to or above the threshold.
    Exceedance,
    /// Level fell back below the threshold.
    Recovery,
}

/// A detected threshold crossing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossingEvent {
    /// The substance whose level crossed.
    pub substance_id: String,
    /// The configured threshold value.
    pub threshold_value: f64,
    /// The level that triggered the crossing.
    pub level: f64,
    /// When the crossing was observed.
    pub timestamp: f64,
    /// Exceedance or recovery.
    pub kind: CrossingKind,
    /// For exceedances, when effects are expected to set in
    /// (`timestamp + onset_delay`).
    pub expected_onset: Option<f64>,
    /// True when the level sits within `threshold * uncertainty_fraction` of
    /// the boundary, meaning the crossing could be measurement noise.
    pub in_uncertainty_zone: bool,
    /// Severity configured for this threshold.
    pub severity: Severity,
}

/// A predicted future crossing from the closed-form model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossingPrediction {
    /// Time units from now until the predicted crossing (0 when already exceeded).
    pub prediction_time: f64,
    /// Confidence in `[0.5, 1.0]`, decreasing with prediction distance.
    pub confidence: f64,
    /// True when the current level already meets the threshold.
    pub is_already_exceeded: bool,
}

/// Registration parameters for one threshold.
///
/// Construct via [`ThresholdSpec::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter              | Default    |
/// |------------------------|------------|
/// | `description`          | empty      |
/// | `onset_delay`          | 0.0        |
/// | `severity`             | `Moderate` |
/// | `uncertainty_fraction` | 0.1        |
/// | `reversible`           | true       |
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSpec {
    pub(crate) threshold_value: f64,
    pub(crate) description: String,
    pub(crate) onset_delay: f64,
    pub(crate) severity: Severity,
    pub(crate) uncertainty_fraction: f64,
    pub(crate) reversible: bool,
}

impl ThresholdSpec {
    /// Create a new threshold spec.
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::InvalidInput`] if `threshold_value` is not
    /// positive and finite.
    pub fn new(threshold_value: f64) -> Result<Self, KineticsError> {
        if !(threshold_value > 0.0 && threshold_value.is_finite()) {
            return Err(KineticsError::InvalidInput {
                what: "threshold_value",
                value: threshold_value,
            });
        }
        Ok(Self {
            threshold_value,
            description: String::new(),
            onset_delay: 0.0,
            severity: Severity::Moderate,
            uncertainty_fraction: 0.1,
            reversible: true,
        })
    }

    /// Set the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Set the delay between crossing and expected effect onset.
    #[must_use]
    pub fn with_onset_delay(mut self, onset_delay: f64) -> Self {
        self.onset_delay = onset_delay;
        self
    }

    /// Set the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the uncertainty fraction (width of the noise band around the
    /// boundary, as a fraction of the threshold value).
    #[must_use]
    pub fn with_uncertainty_fraction(mut self, uncertainty_fraction: f64) -> Self {
        self.uncertainty_fraction = uncertainty_fraction;
        self
    }

    /// Set whether effects recede when the level falls back below the threshold.
    #[must_use]
    pub fn with_reversible(mut self, reversible: bool) -> Self {
        self.reversible = reversible;
        self
    }
}

/// A registered threshold together with its hysteresis state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdDefinition {
    /// The monitored substance.
    pub substance_id: String,
    /// Level at or above which the threshold is exceeded.
    pub threshold_value: f64,
    /// Human-readable description.
    pub description: String,
    /// Delay between crossing and expected effect onset.
    pub onset_delay: f64,
    /// Configured severity.
    pub severity: Severity,
    /// Width of the noise band around the boundary, as a fraction of
    /// `threshold_value`.
    pub uncertainty_fraction: f64,
    /// Whether effects recede on recovery.
    pub reversible: bool,
    /// Hysteresis state: true while the level stays at or above the threshold.
    pub is_active: bool,
    /// Timestamp of the most recent transition, if any.
    pub last_crossing: Option<f64>,
}

impl ThresholdDefinition {
    fn from_spec(substance_id: &str, spec: ThresholdSpec) -> Self {
        Self {
            substance_id: substance_id.to_string(),
            threshold_value: spec.threshold_value,
            description: spec.description,
            onset_delay: spec.onset_delay,
            severity: spec.severity,
            uncertainty_fraction: spec.uncertainty_fraction,
            reversible: spec.reversible,
            is_active: false,
            last_crossing: None,
        }
    }

    /// Evaluate one level observation against the hysteresis state machine.
    ///
    /// INACTIVE -> ACTIVE when `level >= threshold_value` (exceedance);
    /// ACTIVE -> INACTIVE when `level < threshold_value` (recovery); no
    /// transition otherwise. Repeating the same observation never produces a
    /// second event.
    pub(crate) fn evaluate(&mut self, level: f64, timestamp: f64) -> Option<CrossingEvent> {
        let exceeding = level >= self.threshold_value;
        let kind = match (self.is_active, exceeding) {
            (false, true) => CrossingKind::Exceedance,
            (true, false) => CrossingKind::Recovery,
            _ => return None,
        };
        self.is_active = exceeding;
        self.last_crossing = Some(timestamp);
        let expected_onset = match kind {
            CrossingKind::Exceedance => Some(timestamp + self.onset_delay),
            CrossingKind::Recovery => None,
        };
        Some(CrossingEvent {
            substance_id: self.substance_id.clone(),
            threshold_value: self.threshold_value,
            level,
            timestamp,
            kind,
            expected_onset,
            in_uncertainty_zone: (level - self.threshold_value).abs()
                <= self.threshold_value * self.uncertainty_fraction,
            severity: self.severity,
        })
    }
}

/// Per-substance hysteresis monitor with analytic crossing prediction.
#[derive(Debug, Clone, Default)]
pub struct ThresholdMonitor {
    thresholds: BTreeMap<String, ThresholdDefinition>,
}

impl ThresholdMonitor {
    /// Create an empty monitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a threshold for a substance.
    ///
    /// Re-registering a substance overwrites the previous definition
    /// (including its hysteresis state) and logs a warning; this is not an
    /// error.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KineticsError::InvalidInput`] | `onset_delay < 0`, `uncertainty_fraction` outside `[0, 1]`, or either non-finite |
    pub fn register(&mut self, substance_id: &str, spec: ThresholdSpec) -> Result<(), KineticsError> {
        if !(spec.onset_delay >= 0.0 && spec.onset_delay.is_finite()) {
            return Err(KineticsError::InvalidInput {
                what: "onset_delay",
                value: spec.onset_delay,
            });
        }
        if !(spec.uncertainty_fraction >= 0.0
            && spec.uncertainty_fraction <= 1.0
            && spec.uncertainty_fraction.is_finite())
        {
            return Err(KineticsError::InvalidInput {
                what: "uncertainty_fraction",
                value: spec.uncertainty_fraction,
            });
        }
        let definition = ThresholdDefinition::from_spec(substance_id, spec);
        if self.thresholds.insert(substance_id.to_string(), definition).is_some() {
            warn!(substance_id, "threshold re-registered, previous definition overwritten");
        }
        Ok(())
    }

    /// Return true if a threshold is registered for the substance.
    #[must_use]
    pub fn is_registered(&self, substance_id: &str) -> bool {
        self.thresholds.contains_key(substance_id)
    }

    /// Return the definition registered for a substance, if any.
    #[must_use]
    pub fn get(&self, substance_id: &str) -> Option<&ThresholdDefinition> {
        self.thresholds.get(substance_id)
    }

    /// Iterate over the currently active (exceeded) thresholds.
    pub fn active(&self) -> impl Iterator<Item = &ThresholdDefinition> {
        self.thresholds.values().filter(|d| d.is_active)
    }

    /// Evaluate a level observation, transitioning the hysteresis state and
    /// returning a crossing event when a transition happened.
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::UnknownSubstance`] when no threshold is
    /// registered for `substance_id`.
    pub fn check_crossing(
        &mut self,
        substance_id: &str,
        level: f64,
        timestamp: f64,
    ) -> Result<Option<CrossingEvent>, KineticsError> {
        let definition = self.thresholds.get_mut(substance_id).ok_or_else(|| {
            KineticsError::UnknownSubstance { substance_id: substance_id.to_string() }
        })?;
        Ok(definition.evaluate(level, timestamp))
    }

    /// Predict when the level will first reach the threshold under constant
    /// accumulation and clearance rates.
    ///
    /// Returns `None` when the equilibrium level `accumulation_rate /
    /// clearance_rate` never reaches the threshold, or when the solved
    /// crossing time falls outside `horizon`. A level already at or above the
    /// threshold predicts an immediate crossing with confidence 1.0.
    /// Confidence otherwise decreases linearly with `t / horizon` scaled by
    /// the configured uncertainty fraction, floored at 0.5.
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::UnknownSubstance`] when no threshold is
    /// registered for `substance_id`.
    pub fn predict_crossing(
        &self,
        substance_id: &str,
        current_level: f64,
        accumulation_rate: f64,
        clearance_rate: f64,
        horizon: f64,
    ) -> Result<Option<CrossingPrediction>, KineticsError> {
        let definition = self.thresholds.get(substance_id).ok_or_else(|| {
            KineticsError::UnknownSubstance { substance_id: substance_id.to_string() }
        })?;
        let threshold = definition.threshold_value;

        if current_level >= threshold {
            return Ok(Some(CrossingPrediction {
                prediction_time: 0.0,
                confidence: 1.0,
                is_already_exceeded: true,
            }));
        }

        // Without clearance there is no equilibrium; the level ramps linearly.
        let t = if clearance_rate <= 0.0 {
            if accumulation_rate <= 0.0 {
                return Ok(None);
            }
            (threshold - current_level) / accumulation_rate
        } else {
            let equilibrium = accumulation_rate / clearance_rate;
            if equilibrium <= threshold {
                return Ok(None);
            }
            let denominator = current_level - equilibrium;
            if denominator.abs() < 1e-10 {
                // Level is pinned at equilibrium; fall back to linear extrapolation.
                (threshold - current_level) / accumulation_rate
            } else {
                let ratio = (threshold - equilibrium) / denominator;
                if ratio <= 0.0 {
                    return Ok(None);
                }
                -ratio.ln() / clearance_rate
            }
        };

        if !(t >= 0.0) || t > horizon {
            return Ok(None);
        }

        let confidence = (1.0 - (t / horizon) * definition.uncertainty_fraction).max(0.5);
        Ok(Some(CrossingPrediction {
            prediction_time: t,
            confidence,
            is_already_exceeded: false,
        }))
    }

    /// Clone the definition for a substance, for side-effect-free simulation.
    pub(crate) fn clone_definition(&self, substance_id: &str) -> Option<ThresholdDefinition> {
        self.thresholds.get(substance_id).cloned()
    }
}
