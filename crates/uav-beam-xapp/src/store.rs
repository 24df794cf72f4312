//! Best-effort receiver-state persistence.
//!
//! Mirrors the SDL (Shared Data Layer) usage of the original xApp: one
//! JSON value per receiver under `uav-beam:ue:<id>`, written after each
//! decision, outside the per-receiver critical section. Store availability
//! is never required for the decision loop — failures are logged and
//! dropped.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uav_beam_core::{BeamAction, BeamDecision, StateStore, StorageError};
use uav_beam_tracker::{ReceiverTrackState, RecoveryPhase};

/// In-memory [`StateStore`]; production deployments substitute the shared
/// data layer behind the same trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl StateStore for MemoryStore {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.map.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.map.read().get(key).cloned())
    }
}

/// Store key for one receiver's state.
#[must_use]
pub fn receiver_state_key(ue_id: &str) -> String {
    format!("uav-beam:ue:{ue_id}")
}

/// The persisted per-receiver snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReceiverState {
    /// Receiver the snapshot belongs to.
    pub ue_id: String,
    /// Serving beam at the last decision.
    pub current_beam: u32,
    /// Target beam of the last decision.
    pub target_beam: u32,
    /// Last directed action.
    pub action: BeamAction,
    /// Last decision confidence.
    pub confidence: f64,
    /// Recovery phase at the last decision.
    pub phase: RecoveryPhase,
    /// Last decision timestamp, milliseconds.
    pub timestamp_ms: u64,
}

/// Persists the outcome of one decision. Best-effort: a store failure is
/// logged, never propagated.
pub fn persist_decision(
    store: &dyn StateStore,
    decision: &BeamDecision,
    track: &ReceiverTrackState,
) {
    let snapshot = StoredReceiverState {
        ue_id: decision.receiver_id.to_string(),
        current_beam: decision.current_beam_id.index(),
        target_beam: decision.target_beam_id.index(),
        action: decision.action,
        confidence: decision.confidence.value(),
        phase: track.phase,
        timestamp_ms: decision.timestamp_ms,
    };

    let key = receiver_state_key(decision.receiver_id.as_str());
    match serde_json::to_vec(&snapshot) {
        Ok(bytes) => {
            if let Err(err) = store.set(&key, &bytes) {
                warn!(%key, %err, "failed to persist receiver state");
            }
        }
        Err(err) => warn!(%key, %err, "failed to serialize receiver state"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uav_beam_core::{BeamId, BeamMeasurement, Confidence, ReceiverId};

    fn decision() -> BeamDecision {
        BeamDecision {
            receiver_id: ReceiverId::new("UAV-001"),
            action: BeamAction::Switch,
            current_beam_id: BeamId::new(1),
            target_beam_id: BeamId::new(2),
            confidence: Confidence::clamped(0.8),
            expected_gain_db: 5.0,
            reason: "stronger-neighbor",
            timestamp_ms: 1234,
        }
    }

    fn track() -> ReceiverTrackState {
        ReceiverTrackState::new(&BeamMeasurement {
            timestamp_ms: 1234,
            receiver_id: ReceiverId::new("UAV-001"),
            serving_beam_id: BeamId::new(1),
            serving_rsrp_dbm: -70.0,
            neighbor_beams: Default::default(),
            position: None,
            velocity: None,
            snapshot: None,
        })
    }

    #[test]
    fn test_set_get_round_trip() {
        let store = MemoryStore::new();
        store.set("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_persist_decision_round_trip() {
        let store = MemoryStore::new();
        persist_decision(&store, &decision(), &track());

        let bytes = store
            .get(&receiver_state_key("UAV-001"))
            .unwrap()
            .expect("snapshot stored");
        let snapshot: StoredReceiverState = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(snapshot.ue_id, "UAV-001");
        assert_eq!(snapshot.target_beam, 2);
        assert_eq!(snapshot.action, BeamAction::Switch);
        assert_eq!(snapshot.phase, RecoveryPhase::Normal);
    }
}
