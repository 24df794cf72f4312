//! E2 wire codec: RIC indication decoding and control encoding.
//!
//! Message type numbers follow the O-RAN WG3 E2AP conventions used by the
//! RIC message router. Payloads are JSON; the indication DTO keeps every
//! field optional so that missing mandatory fields are reported as
//! [`TrackError::MalformedMeasurement`] instead of a decode panic, and no
//! tracker state is touched for a rejected report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uav_beam_core::{BeamAction, BeamDecision, BeamId, BeamMeasurement, ReceiverId};
use uav_beam_tracker::TrackError;

/// RMR message types handled by the xApp.
pub mod msg_type {
    /// E2AP indication (E2 node to xApp).
    pub const RIC_INDICATION: u32 = 12050;
    /// E2AP control request (xApp to E2 node).
    pub const RIC_CONTROL_REQ: u32 = 12040;
    /// E2AP control acknowledgement.
    pub const RIC_CONTROL_ACK: u32 = 12041;
    /// E2AP control failure.
    pub const RIC_CONTROL_FAILURE: u32 = 12042;
    /// Subscription request.
    pub const RIC_SUB_REQ: u32 = 12010;
    /// Subscription response.
    pub const RIC_SUB_RESP: u32 = 12011;
    /// Subscription failure.
    pub const RIC_SUB_FAILURE: u32 = 12012;
    /// Subscription delete request.
    pub const RIC_SUB_DEL_REQ: u32 = 12020;
    /// Subscription delete response.
    pub const RIC_SUB_DEL_RESP: u32 = 12021;
    /// Health check request.
    pub const RIC_HEALTH_CHECK_REQ: u32 = 100;
    /// Health check response.
    pub const RIC_HEALTH_CHECK_RESP: u32 = 101;
}

/// Wire shape of a RIC indication payload.
///
/// Every field is optional at the wire level; mandatory-field enforcement
/// happens in [`E2Indication::into_measurement`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct E2Indication {
    /// Report timestamp, milliseconds.
    pub timestamp_ms: Option<u64>,
    /// Reporting UE.
    pub ue_id: Option<String>,
    /// Serving beam index.
    pub serving_beam_id: Option<u32>,
    /// Serving beam RSRP, dBm.
    pub rsrp_dbm: Option<f64>,
    /// Neighbor beam RSRP map; JSON object keys are beam indices.
    pub neighbor_beams: Option<BTreeMap<String, f64>>,
    /// Reported position [x, y, z], metres.
    pub position: Option<[f64; 3]>,
    /// Reported velocity [vx, vy, vz], m/s.
    pub velocity: Option<[f64; 3]>,
}

impl E2Indication {
    /// Validates mandatory fields and produces the domain measurement.
    ///
    /// # Errors
    ///
    /// [`TrackError::MalformedMeasurement`] naming the first missing or
    /// unparsable field.
    pub fn into_measurement(self) -> Result<BeamMeasurement, TrackError> {
        let ue_id = self
            .ue_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| malformed("missing ue_id"))?;
        let serving_rsrp_dbm = self.rsrp_dbm.ok_or_else(|| malformed("missing rsrp_dbm"))?;
        let serving_beam_id = self
            .serving_beam_id
            .ok_or_else(|| malformed("missing serving_beam_id"))?;
        let timestamp_ms = self
            .timestamp_ms
            .ok_or_else(|| malformed("missing timestamp_ms"))?;

        let mut neighbor_beams = BTreeMap::new();
        for (key, rsrp) in self.neighbor_beams.unwrap_or_default() {
            let beam: u32 = key
                .parse()
                .map_err(|_| malformed(format!("neighbor beam key '{key}' is not a beam index")))?;
            neighbor_beams.insert(BeamId::new(beam), rsrp);
        }

        Ok(BeamMeasurement {
            timestamp_ms,
            receiver_id: ReceiverId::new(ue_id),
            serving_beam_id: BeamId::new(serving_beam_id),
            serving_rsrp_dbm,
            neighbor_beams,
            position: self.position,
            velocity: self.velocity,
            snapshot: None,
        })
    }
}

fn malformed(message: impl Into<String>) -> TrackError {
    TrackError::MalformedMeasurement {
        message: message.into(),
    }
}

/// Wire shape of an outbound RIC control request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RicControlRequest {
    /// Target UE.
    pub ue_id: String,
    /// Beam the node should switch to.
    pub target_beam_id: u32,
    /// Directed action (`switch` or `recover`).
    pub action: BeamAction,
    /// Decision confidence.
    pub confidence: f64,
    /// Decision reason tag.
    pub reason: String,
}

impl RicControlRequest {
    /// Builds the control message for a decision, or `None` when the
    /// decision does not warrant an outbound message (`maintain`).
    #[must_use]
    pub fn for_decision(decision: &BeamDecision) -> Option<Self> {
        match decision.action {
            BeamAction::Maintain => None,
            BeamAction::Switch | BeamAction::Recover => Some(Self {
                ue_id: decision.receiver_id.to_string(),
                target_beam_id: decision.target_beam_id.index(),
                action: decision.action,
                confidence: decision.confidence.value(),
                reason: decision.reason.to_string(),
            }),
        }
    }
}
