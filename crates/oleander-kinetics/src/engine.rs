//! The cumulative effect engine: owns every per-substance registry and the
//! threshold monitor, so callers hold one context object instead of shared
//! mutable state.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::error::KineticsError;
use crate::event::{ExposureEvent, ExposureId, PlannedExposure};
use crate::profile::AccumulationProfile;
use crate::state::SubstanceState;
use crate::threshold::{CrossingEvent, CrossingPrediction, ThresholdDefinition, ThresholdMonitor, ThresholdSpec};

#[derive(Debug, Clone)]
struct SubstanceEntry {
    profile: AccumulationProfile,
    state: SubstanceState,
    last_update: Option<f64>,
    history: Vec<ExposureEvent>,
}

/// Tracks cumulative substance levels over time.
///
/// Each registered substance carries its kinetic profile, its current state,
/// and its exposure history; one [`ThresholdMonitor`] watches levels across
/// all substances. All state lives in this object; dropping the engine drops
/// everything.
#[derive(Debug, Clone, Default)]
pub struct CumulativeEffectEngine {
    substances: BTreeMap<String, SubstanceEntry>,
    monitor: ThresholdMonitor,
    next_exposure_id: u64,
}

fn ensure_finite(what: &'static str, value: f64) -> Result<(), KineticsError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(KineticsError::InvalidInput { what, value })
    }
}

fn ensure_non_negative(what: &'static str, value: f64) -> Result<(), KineticsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(KineticsError::InvalidInput { what, value })
    }
}

impl CumulativeEffectEngine {
    /// Create an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, substance_id: &str) -> Result<&SubstanceEntry, KineticsError> {
        self.substances.get(substance_id).ok_or_else(|| KineticsError::UnknownSubstance {
            substance_id: substance_id.to_string(),
        })
    }

    /// Register a substance with its kinetic profile and an optional
    /// threshold. The state starts at level zero with no history.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KineticsError::DuplicateSubstance`] | `substance_id` is already registered |
    /// | [`KineticsError::InvalidInput`] | the threshold spec carries invalid parameters |
    pub fn register_substance(
        &mut self,
        substance_id: &str,
        profile: AccumulationProfile,
        threshold: Option<ThresholdSpec>,
    ) -> Result<(), KineticsError> {
        if self.substances.contains_key(substance_id) {
            return Err(KineticsError::DuplicateSubstance {
                substance_id: substance_id.to_string(),
            });
        }
        if let Some(spec) = threshold {
            self.monitor.register(substance_id, spec)?;
        }
        let state = SubstanceState::initial(&profile);
        self.substances.insert(
            substance_id.to_string(),
            SubstanceEntry { profile, state, last_update: None, history: Vec::new() },
        );
        debug!(substance_id, "substance registered");
        Ok(())
    }

    /// Register or replace the threshold for an already-registered substance.
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::UnknownSubstance`] if the substance is not
    /// registered, or [`KineticsError::InvalidInput`] for an invalid spec.
    pub fn register_threshold(
        &mut self,
        substance_id: &str,
        spec: ThresholdSpec,
    ) -> Result<(), KineticsError> {
        self.entry(substance_id)?;
        self.monitor.register(substance_id, spec)
    }

    /// Record an exposure: apply clearance for the time elapsed since the
    /// substance's last update, add the intake, append to the history, and
    /// evaluate the substance's threshold if one is registered.
    ///
    /// Returns the assigned exposure id and any crossing event the new level
    /// triggered.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KineticsError::UnknownSubstance`] | substance not registered |
    /// | [`KineticsError::TimestampRegression`] | `timestamp` precedes the substance's last update |
    /// | [`KineticsError::InvalidInput`] | non-finite timestamp, or negative or non-finite concentration/duration |
    #[instrument(skip(self, metadata), fields(substance_id))]
    pub fn record_exposure(
        &mut self,
        substance_id: &str,
        concentration: f64,
        duration: f64,
        timestamp: f64,
        metadata: BTreeMap<String, String>,
    ) -> Result<(ExposureId, Option<CrossingEvent>), KineticsError> {
        ensure_non_negative("concentration", concentration)?;
        ensure_non_negative("duration", duration)?;
        ensure_finite("timestamp", timestamp)?;

        let entry = self.substances.get_mut(substance_id).ok_or_else(|| {
            KineticsError::UnknownSubstance { substance_id: substance_id.to_string() }
        })?;
        if let Some(last) = entry.last_update
            && timestamp < last
        {
            return Err(KineticsError::TimestampRegression {
                substance_id: substance_id.to_string(),
                timestamp,
                last_update: last,
            });
        }

        let elapsed = entry.last_update.map_or(0.0, |last| timestamp - last);
        entry.state = entry
            .state
            .after_clearance(&entry.profile, elapsed)
            .with_intake(&entry.profile, concentration, duration);
        entry.last_update = Some(timestamp);

        let id = ExposureId(self.next_exposure_id);
        self.next_exposure_id += 1;
        entry.history.push(ExposureEvent {
            id,
            substance_id: substance_id.to_string(),
            concentration,
            duration,
            timestamp,
            metadata,
        });

        let level = entry.state.total_level();
        debug!(substance_id, %id, level, "exposure recorded");

        let crossing = if self.monitor.is_registered(substance_id) {
            self.monitor.check_crossing(substance_id, level, timestamp)?
        } else {
            None
        };
        Ok((id, crossing))
    }

    /// Apply a clearance-only update to every substance whose last update
    /// precedes `timestamp`, returning any crossing events (typically
    /// recoveries) the decayed levels triggered.
    ///
    /// Substances that have never seen an exposure are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::TimestampRegression`] if `timestamp` precedes
    /// any substance's last update (no substance is modified in that case),
    /// or [`KineticsError::InvalidInput`] for a non-finite timestamp.
    pub fn advance_to(&mut self, timestamp: f64) -> Result<Vec<CrossingEvent>, KineticsError> {
        ensure_finite("timestamp", timestamp)?;
        for (id, entry) in &self.substances {
            if let Some(last) = entry.last_update
                && timestamp < last
            {
                return Err(KineticsError::TimestampRegression {
                    substance_id: id.clone(),
                    timestamp,
                    last_update: last,
                });
            }
        }

        let mut events = Vec::new();
        for (id, entry) in &mut self.substances {
            let Some(last) = entry.last_update else { continue };
            if timestamp <= last {
                continue;
            }
            entry.state = entry.state.after_clearance(&entry.profile, timestamp - last);
            entry.last_update = Some(timestamp);
            if self.monitor.is_registered(id)
                && let Some(event) =
                    self.monitor.check_crossing(id, entry.state.total_level(), timestamp)?
            {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Return the current total level of a substance.
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::UnknownSubstance`] if the substance is not
    /// registered.
    pub fn get_level(&self, substance_id: &str) -> Result<f64, KineticsError> {
        Ok(self.entry(substance_id)?.state.total_level())
    }

    /// Return the level of one compartment of a multi-compartment substance.
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::UnknownSubstance`] for an unregistered
    /// substance and [`KineticsError::UnknownCompartment`] when the substance
    /// has no compartment with that name (including single-pool substances).
    pub fn get_compartment_level(
        &self,
        substance_id: &str,
        compartment: &str,
    ) -> Result<f64, KineticsError> {
        self.entry(substance_id)?
            .state
            .compartment_level(compartment)
            .ok_or_else(|| KineticsError::UnknownCompartment { name: compartment.to_string() })
    }

    /// Advance every substance to `now`, then return the thresholds that are
    /// currently active (exceeded).
    ///
    /// # Errors
    ///
    /// Same as [`CumulativeEffectEngine::advance_to`].
    pub fn get_active_thresholds(
        &mut self,
        now: f64,
    ) -> Result<Vec<ThresholdDefinition>, KineticsError> {
        self.advance_to(now)?;
        Ok(self.monitor.active().cloned().collect())
    }

    /// Return the recorded exposure history of a substance, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::UnknownSubstance`] if the substance is not
    /// registered.
    pub fn exposure_history(&self, substance_id: &str) -> Result<&[ExposureEvent], KineticsError> {
        Ok(&self.entry(substance_id)?.history)
    }

    /// Predict the substance's level at each query time, optionally folding
    /// in planned future exposures. Pure: engine state is not modified.
    ///
    /// Query times are evaluated in ascending order regardless of input
    /// order. Each planned exposure is applied at its own timestamp, so its
    /// contribution decays for exactly the time between that timestamp and
    /// each later query point. Planned exposures dated before the current
    /// state are applied immediately without back-dating clearance.
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::UnknownSubstance`] for an unregistered
    /// substance and [`KineticsError::InvalidInput`] for non-finite query
    /// times or invalid planned exposures.
    pub fn predict_future_levels(
        &self,
        substance_id: &str,
        time_points: &[f64],
        future_exposures: &[PlannedExposure],
    ) -> Result<Vec<(f64, f64)>, KineticsError> {
        let entry = self.entry(substance_id)?;
        for &t in time_points {
            ensure_finite("time_point", t)?;
        }
        for exposure in future_exposures {
            ensure_finite("future exposure timestamp", exposure.timestamp)?;
            ensure_non_negative("future exposure concentration", exposure.concentration)?;
            ensure_non_negative("future exposure duration", exposure.duration)?;
        }

        let mut points = time_points.to_vec();
        points.sort_by(f64::total_cmp);
        let mut exposures = future_exposures.to_vec();
        exposures.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let mut state = entry.state.clone();
        let mut clock = entry.last_update.unwrap_or_else(|| {
            points.first().copied().unwrap_or(0.0).min(
                exposures.first().map_or(f64::INFINITY, |e| e.timestamp),
            )
        });
        let mut next = 0;
        let mut levels = Vec::with_capacity(points.len());
        for &t in &points {
            while next < exposures.len() && exposures[next].timestamp <= t {
                let exposure = exposures[next];
                state = state
                    .after_clearance(&entry.profile, exposure.timestamp - clock)
                    .with_intake(&entry.profile, exposure.concentration, exposure.duration);
                clock = clock.max(exposure.timestamp);
                next += 1;
            }
            state = state.after_clearance(&entry.profile, t - clock);
            clock = clock.max(t);
            levels.push((t, state.total_level()));
        }
        Ok(levels)
    }

    /// Predict the substance's crossing against its registered threshold
    /// over the closed-form model, without simulating exposures.
    ///
    /// Delegates to [`ThresholdMonitor::predict_crossing`] with the profile's
    /// accumulation and elimination rates.
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::UnknownSubstance`] when the substance or its
    /// threshold is not registered.
    pub fn predict_crossing(
        &self,
        substance_id: &str,
        horizon: f64,
    ) -> Result<Option<CrossingPrediction>, KineticsError> {
        ensure_non_negative("horizon", horizon)?;
        let entry = self.entry(substance_id)?;
        self.monitor.predict_crossing(
            substance_id,
            entry.state.total_level(),
            entry.profile.accumulation_rate(),
            entry.profile.elimination_rate(),
            horizon,
        )
    }

    /// Predict threshold crossings within `horizon` time units from the
    /// substance's last update.
    ///
    /// With planned exposures, the level trajectory is simulated on a fixed
    /// time grid (`step`, default `horizon / 100`) and fed through a cloned
    /// hysteresis state, so the engine's own threshold state is untouched.
    /// Without exposures, the closed-form prediction is converted to at most
    /// one exceedance event at the solved crossing time.
    ///
    /// Returns an empty list when no threshold is registered for the
    /// substance.
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::UnknownSubstance`] for an unregistered
    /// substance and [`KineticsError::InvalidInput`] for a non-positive
    /// horizon or step.
    pub fn predict_threshold_crossings(
        &self,
        substance_id: &str,
        horizon: f64,
        future_exposures: &[PlannedExposure],
        step: Option<f64>,
    ) -> Result<Vec<CrossingEvent>, KineticsError> {
        if !(horizon > 0.0 && horizon.is_finite()) {
            return Err(KineticsError::InvalidInput { what: "horizon", value: horizon });
        }
        let entry = self.entry(substance_id)?;
        let Some(mut definition) = self.monitor.clone_definition(substance_id) else {
            return Ok(Vec::new());
        };
        let now = entry.last_update.unwrap_or(0.0);

        if future_exposures.is_empty() {
            let prediction = self.monitor.predict_crossing(
                substance_id,
                entry.state.total_level(),
                entry.profile.accumulation_rate(),
                entry.profile.elimination_rate(),
                horizon,
            )?;
            let Some(prediction) = prediction else { return Ok(Vec::new()) };
            let timestamp = now + prediction.prediction_time;
            let level = if prediction.is_already_exceeded {
                entry.state.total_level()
            } else {
                definition.threshold_value
            };
            return Ok(definition.evaluate(level, timestamp).into_iter().collect());
        }

        let step = step.unwrap_or(horizon / 100.0);
        if !(step > 0.0 && step.is_finite()) {
            return Err(KineticsError::InvalidInput { what: "step", value: step });
        }
        let count = (horizon / step).ceil() as usize;
        let times: Vec<f64> = (1..=count).map(|i| now + (i as f64 * step).min(horizon)).collect();
        let trajectory = self.predict_future_levels(substance_id, &times, future_exposures)?;

        let mut events = Vec::new();
        for (t, level) in trajectory {
            if let Some(event) = definition.evaluate(level, t) {
                events.push(event);
            }
        }
        Ok(events)
    }
}
