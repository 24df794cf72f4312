//! Integration tests for the xApp HTTP surface.
//!
//! These drive the axum router end-to-end with in-process requests,
//! exercising the full path: JSON decode, tracker decision, outbound
//! control emission, and persistence.
//!
//! Test matrix:
//! - /health reports healthy with version and stats
//! - Three degraded reports produce a recover decision targeting the best
//!   neighbor with ~12 dB expected gain, and a control message is emitted
//! - A strong stable report produces maintain and no control message
//! - Reports missing mandatory fields are rejected with 400
//! - /stats reflects processed and rejected counts
//! - /receivers/{id}/predict returns 404 for unknown receivers and a
//!   deterministic position for tracked ones

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use uav_beam_core::BeamGridConfig;
use uav_beam_xapp::config::XappConfig;
use uav_beam_xapp::server::{create_router, AppState};
use uav_beam_xapp::transport::OutboundMessage;

fn test_state(threshold_db: f64) -> (AppState, tokio::sync::mpsc::UnboundedReceiver<OutboundMessage>) {
    let config = XappConfig {
        beam: BeamGridConfig {
            beam_failure_threshold_db: threshold_db,
            ..BeamGridConfig::default()
        },
        ..XappConfig::default()
    };
    AppState::new(config).expect("state builds from default config")
}

fn indication_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/e2/indication")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (state, _rx) = test_state(-10.0);
    let router = create_router(state);

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["xapp"], "uav-beam");
    assert!(body["stats"]["measurements_processed"].is_u64());
}

#[tokio::test]
async fn test_recovery_scenario_end_to_end() {
    let (state, mut outbound) = test_state(-10.0);
    let router = create_router(state);

    let report = |t: u64| {
        serde_json::json!({
            "ue_id": "UAV-001",
            "serving_beam_id": 1,
            "rsrp_dbm": -20.0,
            "timestamp_ms": t,
            "neighbor_beams": {"2": -8.0, "3": -15.0}
        })
    };

    for t in [0u64, 100] {
        let response = router
            .clone()
            .oneshot(indication_request(report(t)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["action"], "maintain");
    }

    let response = router
        .clone()
        .oneshot(indication_request(report(200)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["action"], "recover");
    assert_eq!(body["target_beam_id"], 2);
    let gain = body["expected_gain_db"].as_f64().unwrap();
    assert!((gain - 12.0).abs() < 1e-9, "expected gain {gain} != 12");

    // The recover decision produced exactly one outbound control message.
    let msg = outbound.try_recv().expect("control message emitted");
    assert_eq!(msg.msg_type, 12040);
    let control: serde_json::Value = serde_json::from_slice(&msg.payload).unwrap();
    assert_eq!(control["ue_id"], "UAV-001");
    assert_eq!(control["target_beam_id"], 2);
    assert_eq!(control["action"], "recover");
    assert!(outbound.try_recv().is_err(), "maintain produced no control");
}

#[tokio::test]
async fn test_strong_stable_maintains() {
    let (state, mut outbound) = test_state(-100.0);
    let router = create_router(state);

    let response = router
        .oneshot(indication_request(serde_json::json!({
            "ue_id": "UAV-002",
            "serving_beam_id": 4,
            "rsrp_dbm": -70.0,
            "timestamp_ms": 0,
            "neighbor_beams": {"5": -71.0}
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["action"], "maintain");
    assert_eq!(body["target_beam_id"], body["current_beam_id"]);
    assert!(outbound.try_recv().is_err());
}

#[tokio::test]
async fn test_malformed_report_rejected() {
    let (state, _rx) = test_state(-10.0);
    let router = create_router(state);

    // Missing rsrp_dbm.
    let response = router
        .clone()
        .oneshot(indication_request(serde_json::json!({
            "ue_id": "UAV-001",
            "serving_beam_id": 1,
            "timestamp_ms": 0
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing ue_id.
    let response = router
        .clone()
        .oneshot(indication_request(serde_json::json!({
            "serving_beam_id": 1,
            "rsrp_dbm": -20.0,
            "timestamp_ms": 0
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Rejected reports never create tracker state.
    let response = router
        .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["active_receivers"], 0);
    assert_eq!(body["rejected_reports"], 2);
}

#[tokio::test]
async fn test_predict_unknown_receiver() {
    let (state, _rx) = test_state(-10.0);
    let router = create_router(state);

    let response = router
        .oneshot(
            Request::get("/receivers/ghost/predict")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_predict_tracked_receiver() {
    let (state, _rx) = test_state(-100.0);
    let router = create_router(state);

    let response = router
        .clone()
        .oneshot(indication_request(serde_json::json!({
            "ue_id": "UAV-003",
            "serving_beam_id": 1,
            "rsrp_dbm": -70.0,
            "timestamp_ms": 0,
            "position": [100.0, 50.0, 30.0]
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut positions = Vec::new();
    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(
                Request::get("/receivers/UAV-003/predict?horizon_ms=500")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        positions.push(json_body(response).await);
    }

    // The query is read-only: two consecutive calls agree.
    assert_eq!(positions[0]["position"], positions[1]["position"]);
    assert_eq!(positions[0]["receiver_id"], "UAV-003");
}
