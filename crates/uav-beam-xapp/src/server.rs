//! HTTP surface and request handling.
//!
//! Endpoints mirror the original xApp's REST mode:
//!
//! - `GET  /health` — liveness plus runtime statistics
//! - `GET  /stats` — tracker counters
//! - `POST /e2/indication` — one measurement report in, one decision out
//! - `GET  /receivers/{id}/predict` — trajectory query
//!
//! Decisions that warrant an outbound control message (`switch`,
//! `recover`) are also encoded and handed to the message transport, and
//! the receiver's state snapshot is persisted best-effort — both outside
//! the per-receiver critical section.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;
use uav_beam_core::{BeamDecision, MessageTransport, ReceiverId, StateStore};
use uav_beam_doa::AngleEstimator;
use uav_beam_tracker::{BeamTracker, StatsSnapshot, TrackError};

use crate::config::XappConfig;
use crate::e2::{msg_type, E2Indication, RicControlRequest};
use crate::store::{persist_decision, MemoryStore};
use crate::transport::{ChannelTransport, OutboundMessage};
use crate::XappError;

/// Shared application state, cloned per request handler.
#[derive(Clone)]
pub struct AppState {
    tracker: Arc<BeamTracker>,
    transport: Arc<dyn MessageTransport>,
    store: Arc<dyn StateStore>,
    config: Arc<XappConfig>,
    started_at: DateTime<Utc>,
}

impl AppState {
    /// Builds the application state and returns the receiving end of the
    /// outbound control channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the estimator configuration is unusable.
    pub fn new(config: XappConfig) -> Result<(Self, UnboundedReceiver<OutboundMessage>), XappError> {
        let estimator = AngleEstimator::new(config.estimator.clone())?;
        let tracker = BeamTracker::new(
            config.beam.clone(),
            config.policy.clone(),
            config.predictor.clone(),
        )
        .with_estimator(estimator);

        let (transport, outbound_rx) = ChannelTransport::new();

        let state = Self {
            tracker: Arc::new(tracker),
            transport: Arc::new(transport),
            store: Arc::new(MemoryStore::new()),
            config: Arc::new(config),
            started_at: Utc::now(),
        };
        Ok((state, outbound_rx))
    }

    /// The tracker, for the eviction task.
    #[must_use]
    pub fn tracker(&self) -> Arc<BeamTracker> {
        Arc::clone(&self.tracker)
    }

    /// The configuration the xApp was started with.
    #[must_use]
    pub fn config(&self) -> &XappConfig {
        &self.config
    }

    /// Processes one decoded indication: tracker decision, outbound
    /// control when warranted, best-effort persistence.
    ///
    /// # Errors
    ///
    /// Propagates a rejected (malformed) measurement.
    pub fn handle_indication(&self, indication: E2Indication) -> Result<BeamDecision, XappError> {
        let measurement = indication.into_measurement()?;
        let decision = self.tracker.process_measurement(&measurement)?;

        if let Some(control) = RicControlRequest::for_decision(&decision) {
            match serde_json::to_vec(&control) {
                Ok(payload) => {
                    if let Err(err) = self.transport.send(msg_type::RIC_CONTROL_REQ, &payload) {
                        warn!(receiver = %decision.receiver_id, %err, "control send failed");
                    }
                }
                Err(err) => warn!(%err, "control serialization failed"),
            }
        }

        if let Some(track) = self.tracker.receiver_state(&decision.receiver_id) {
            persist_decision(self.store.as_ref(), &decision, &track);
        }

        Ok(decision)
    }
}

/// Builds the HTTP router over the application state.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/e2/indication", post(indication))
        .route("/receivers/{id}/predict", get(predict))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    xapp: &'static str,
    version: &'static str,
    uptime_secs: i64,
    stats: StatsSnapshot,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        xapp: "uav-beam",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        stats: state.tracker.stats(),
    })
}

async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.tracker.stats())
}

async fn indication(
    State(state): State<AppState>,
    Json(payload): Json<E2Indication>,
) -> Result<Json<BeamDecision>, ApiError> {
    let decision = state.handle_indication(payload)?;
    Ok(Json(decision))
}

#[derive(Debug, Deserialize)]
struct PredictQuery {
    horizon_ms: Option<f64>,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    receiver_id: String,
    horizon_ms: f64,
    position: [f64; 3],
}

async fn predict(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PredictQuery>,
) -> Result<Json<PredictResponse>, ApiError> {
    let horizon_ms = query
        .horizon_ms
        .unwrap_or(state.config.beam.prediction_horizon_ms);
    let receiver_id = ReceiverId::new(id);
    let position = state
        .tracker
        .predict_ahead(&receiver_id, horizon_ms)
        .map_err(XappError::from)?;

    Ok(Json(PredictResponse {
        receiver_id: receiver_id.to_string(),
        horizon_ms,
        position,
    }))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// HTTP-facing error wrapper.
#[derive(Debug)]
pub struct ApiError(XappError);

impl From<XappError> for ApiError {
    fn from(err: XappError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            XappError::Track(TrackError::MalformedMeasurement { .. }) => StatusCode::BAD_REQUEST,
            XappError::Track(
                TrackError::UnknownReceiver { .. } | TrackError::NoKinematicState { .. },
            ) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}
