//! The beam tracker: per-receiver table, orchestration, and eviction.
//!
//! One entry per `receiver_id` owns both the track state and the kinematic
//! filter (arena-with-lookup). Entries are created on first measurement and
//! evicted after a configurable idle window. All mutation of one receiver
//! is serialized by its entry mutex (single-writer discipline); different
//! receivers process fully independently and concurrently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};
use uav_beam_core::{BeamAction, BeamDecision, BeamGridConfig, BeamMeasurement, ReceiverId};
use uav_beam_doa::{AngleEstimator, DoaError};

use crate::grid::{direction_to, BeamGrid};
use crate::kinematics::{KinematicFilter, PredictorConfig};
use crate::policy::{self, PolicyConfig, RecoveryPhase, ReceiverTrackState, TransitionContext};
use crate::{Result, TrackError};

/// Track state and kinematic filter of one receiver, mutated under the
/// entry mutex only.
struct ReceiverEntry {
    track: ReceiverTrackState,
    filter: KinematicFilter,
}

impl ReceiverEntry {
    fn new(measurement: &BeamMeasurement, predictor: &PredictorConfig) -> Self {
        Self {
            track: ReceiverTrackState::new(measurement),
            filter: KinematicFilter::new(predictor.clone()),
        }
    }
}

/// Atomic counters over the tracker's lifetime.
#[derive(Debug, Default)]
pub struct TrackerStats {
    measurements: AtomicU64,
    switches: AtomicU64,
    recoveries: AtomicU64,
    escalations: AtomicU64,
    rejected: AtomicU64,
    evicted: AtomicU64,
}

/// Point-in-time view of [`TrackerStats`], for the statistics surface.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Measurements processed successfully.
    pub measurements_processed: u64,
    /// Proactive and refined switch decisions issued.
    pub beam_switches: u64,
    /// Recovery decisions issued.
    pub recoveries: u64,
    /// Recovery decisions that escalated past the retry bound.
    pub escalations: u64,
    /// Reports rejected as malformed.
    pub rejected_reports: u64,
    /// Receivers evicted for inactivity.
    pub evicted_receivers: u64,
    /// Receivers currently tracked.
    pub active_receivers: usize,
}

/// The stateful beam-tracking decision engine.
///
/// Exposes exactly two operations to collaborators:
/// [`process_measurement`](Self::process_measurement) and
/// [`predict_ahead`](Self::predict_ahead). Eviction of idle receivers is a
/// third, explicitly auditable mutation.
pub struct BeamTracker {
    grid: BeamGrid,
    policy: PolicyConfig,
    predictor: PredictorConfig,
    estimator: Option<AngleEstimator>,
    receivers: RwLock<HashMap<ReceiverId, Arc<Mutex<ReceiverEntry>>>>,
    stats: TrackerStats,
}

impl BeamTracker {
    /// Creates a tracker over the given grid with the given tunables.
    #[must_use]
    pub fn new(grid: BeamGridConfig, policy: PolicyConfig, predictor: PredictorConfig) -> Self {
        Self {
            grid: BeamGrid::new(grid),
            policy,
            predictor,
            estimator: None,
            receivers: RwLock::new(HashMap::new()),
            stats: TrackerStats::default(),
        }
    }

    /// Attaches an angle estimator for recovery refinement. Without one,
    /// refinement always falls back to the coarse target.
    #[must_use]
    pub fn with_estimator(mut self, estimator: AngleEstimator) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// The beam grid this tracker selects over.
    #[must_use]
    pub fn grid(&self) -> &BeamGrid {
        &self.grid
    }

    /// Processes one measurement report and returns the beam decision.
    ///
    /// Reports for one receiver must arrive in order; the per-receiver
    /// entry mutex serializes their processing. Reports for different
    /// receivers are processed concurrently and independently.
    ///
    /// # Errors
    ///
    /// [`TrackError::MalformedMeasurement`] if mandatory fields are
    /// missing or non-finite; no state is mutated in that case.
    pub fn process_measurement(&self, measurement: &BeamMeasurement) -> Result<BeamDecision> {
        if let Err(err) = validate(measurement) {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(receiver = %measurement.receiver_id, %err, "rejected measurement");
            return Err(err);
        }

        let entry = self.entry_for(measurement);
        let mut guard = entry.lock();

        if let Some(obs) = measurement.kinematic_observation() {
            guard.filter.update(&obs);
        }

        let predicted_direction = if guard.filter.is_initialized() {
            let horizon = self.grid.config().prediction_horizon_ms;
            Some(direction_to(guard.filter.predict_ahead(horizon)))
        } else {
            None
        };

        let refined_angle = if guard.track.phase == RecoveryPhase::FailureP1 {
            self.refine(measurement)
        } else {
            None
        };

        let ctx = TransitionContext {
            grid: &self.grid,
            config: &self.policy,
            threshold_db: self.grid.config().beam_failure_threshold_db,
            predicted_direction,
            refined_angle,
        };
        let (next, decision) = policy::step(&guard.track, measurement, &ctx);
        guard.track = next;
        drop(guard);

        self.stats.measurements.fetch_add(1, Ordering::Relaxed);
        match decision.action {
            BeamAction::Switch => {
                self.stats.switches.fetch_add(1, Ordering::Relaxed);
            }
            BeamAction::Recover => {
                self.stats.recoveries.fetch_add(1, Ordering::Relaxed);
                if decision.reason == "escalate" {
                    self.stats.escalations.fetch_add(1, Ordering::Relaxed);
                }
            }
            BeamAction::Maintain => {}
        }

        info!(
            receiver = %decision.receiver_id,
            action = %decision.action,
            current = %decision.current_beam_id,
            target = %decision.target_beam_id,
            gain_db = decision.expected_gain_db,
            reason = decision.reason,
            "beam decision"
        );
        Ok(decision)
    }

    /// Read-only trajectory query: position `horizon_ms` ahead of the
    /// receiver's current filtered state. Does not mutate anything.
    ///
    /// # Errors
    ///
    /// [`TrackError::UnknownReceiver`] for an evicted or never-seen
    /// receiver; [`TrackError::NoKinematicState`] when the receiver has
    /// not reported a position yet.
    pub fn predict_ahead(&self, id: &ReceiverId, horizon_ms: f64) -> Result<[f64; 3]> {
        let entry = self
            .receivers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| TrackError::UnknownReceiver { id: id.clone() })?;

        let guard = entry.lock();
        if !guard.filter.is_initialized() {
            return Err(TrackError::NoKinematicState { id: id.clone() });
        }
        Ok(guard.filter.predict_ahead(horizon_ms))
    }

    /// A copy of one receiver's track state, for persistence and
    /// inspection.
    #[must_use]
    pub fn receiver_state(&self, id: &ReceiverId) -> Option<ReceiverTrackState> {
        let entry = self.receivers.read().get(id).cloned()?;
        let guard = entry.lock();
        Some(guard.track.clone())
    }

    /// Evicts every receiver whose last report is older than the idle
    /// window. Returns the evicted ids.
    ///
    /// Eviction is a mutation and obeys the same per-receiver
    /// serialization: each entry mutex is taken before removal, so an
    /// in-flight `process_measurement` finishes first.
    pub fn evict_idle(&self, now_ms: u64) -> Vec<ReceiverId> {
        let mut evicted = Vec::new();
        let mut map = self.receivers.write();
        map.retain(|id, entry| {
            let guard = entry.lock();
            let idle_ms = now_ms.saturating_sub(guard.track.last_report_ms);
            if idle_ms >= self.policy.idle_eviction_ms {
                evicted.push(id.clone());
                false
            } else {
                true
            }
        });
        drop(map);

        if !evicted.is_empty() {
            self.stats
                .evicted
                .fetch_add(evicted.len() as u64, Ordering::Relaxed);
            info!(count = evicted.len(), "evicted idle receivers");
        }
        evicted
    }

    /// Number of receivers currently tracked.
    #[must_use]
    pub fn active_receivers(&self) -> usize {
        self.receivers.read().len()
    }

    /// Point-in-time statistics.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            measurements_processed: self.stats.measurements.load(Ordering::Relaxed),
            beam_switches: self.stats.switches.load(Ordering::Relaxed),
            recoveries: self.stats.recoveries.load(Ordering::Relaxed),
            escalations: self.stats.escalations.load(Ordering::Relaxed),
            rejected_reports: self.stats.rejected.load(Ordering::Relaxed),
            evicted_receivers: self.stats.evicted.load(Ordering::Relaxed),
            active_receivers: self.active_receivers(),
        }
    }

    /// Fetches or creates the entry for a measurement's receiver. The map
    /// lock is dropped before the entry mutex is taken.
    fn entry_for(&self, measurement: &BeamMeasurement) -> Arc<Mutex<ReceiverEntry>> {
        if let Some(entry) = self.receivers.read().get(&measurement.receiver_id) {
            return Arc::clone(entry);
        }

        let mut map = self.receivers.write();
        let entry = map
            .entry(measurement.receiver_id.clone())
            .or_insert_with(|| {
                debug!(receiver = %measurement.receiver_id, "tracking new receiver");
                Arc::new(Mutex::new(ReceiverEntry::new(measurement, &self.predictor)))
            });
        Arc::clone(entry)
    }

    /// Runs angular refinement on a report's array data, degrading to
    /// `None` on insufficient data so recovery falls back to the coarse
    /// target.
    fn refine(&self, measurement: &BeamMeasurement) -> Option<uav_beam_core::AngleEstimate> {
        let snapshot = measurement.snapshot.as_ref()?;
        let estimator = self.estimator.as_ref()?;
        match estimator.estimate_snapshot(snapshot, self.policy.refinement_num_sources) {
            Ok(estimate) => Some(estimate),
            Err(DoaError::InsufficientData { message }) => {
                debug!(
                    receiver = %measurement.receiver_id,
                    message,
                    "refinement fell back to coarse target"
                );
                None
            }
            Err(err) => {
                warn!(receiver = %measurement.receiver_id, %err, "angle refinement failed");
                None
            }
        }
    }
}

/// Rejects reports with missing or non-finite mandatory fields before any
/// state is touched.
fn validate(measurement: &BeamMeasurement) -> Result<()> {
    if measurement.receiver_id.as_str().is_empty() {
        return Err(TrackError::MalformedMeasurement {
            message: "empty receiver_id".into(),
        });
    }
    if !measurement.serving_rsrp_dbm.is_finite() {
        return Err(TrackError::MalformedMeasurement {
            message: format!(
                "serving_rsrp_dbm is not finite: {}",
                measurement.serving_rsrp_dbm
            ),
        });
    }
    if let Some((beam, rsrp)) = measurement
        .neighbor_beams
        .iter()
        .find(|(_, r)| !r.is_finite())
    {
        return Err(TrackError::MalformedMeasurement {
            message: format!("neighbor beam {beam} has non-finite RSRP: {rsrp}"),
        });
    }
    if let Some(position) = measurement.position {
        if position.iter().any(|c| !c.is_finite()) {
            return Err(TrackError::MalformedMeasurement {
                message: "position contains non-finite components".into(),
            });
        }
    }
    Ok(())
}
