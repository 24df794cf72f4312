//! Per-receiver beam-selection policy.
//!
//! The policy is a pure transition function over an explicit state enum:
//! `step(state, measurement, context) -> (state', decision)`. All I/O —
//! the trajectory predictor, the angle estimator, persistence — happens
//! outside, in the tracker, which passes its results in through
//! [`TransitionContext`]. This keeps every transition testable in
//! isolation.
//!
//! Recovery follows the staged P1/P2/P3 procedure: coarse sweep, angular
//! refinement, confirmation. P2 is transient — refinement happens inside
//! the same report that confirms the coarse sweep, so a stored state is
//! never observed in P2 between reports.

use serde::{Deserialize, Serialize};
use uav_beam_core::{
    AngleEstimate, BeamAction, BeamDecision, BeamId, BeamMeasurement, Confidence,
};

use crate::grid::BeamGrid;

/// Recovery phase of one receiver. Initial: `Normal`. No terminal state —
/// a receiver cycles among these until evicted for inactivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryPhase {
    /// Healthy signal; proactive switching only.
    Normal,
    /// Trend under the degradation margin; failure trigger armed.
    Degrading,
    /// Beam failure declared; coarse sweep target issued.
    FailureP1,
    /// Coarse target confirmed; angular refinement in progress.
    FailureP2,
    /// Refined beam commanded; awaiting confirmation.
    FailureP3,
}

/// Tunable policy parameters.
///
/// The exact counts and margins are deployment choices, not fixed by the
/// recovery procedure itself, so all of them are configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Margin above the failure threshold at which a receiver is already
    /// considered degrading, dB.
    pub degrading_margin_db: f64,
    /// Consecutive below-threshold reports that declare beam failure.
    pub consecutive_degraded_limit: u32,
    /// One-step RSRP drop that declares beam failure immediately, dB.
    pub precipitous_drop_db: f64,
    /// Margin a neighbor must clear over the serving beam before a
    /// proactive switch is issued (ping-pong guard), dB.
    pub hysteresis_margin_db: f64,
    /// How far below the best neighbor the trajectory-aligned beam may be
    /// and still be preferred as the coarse recovery target, dB.
    pub trajectory_preference_db: f64,
    /// Recovery attempts before the decision escalates to the operator.
    pub max_recovery_retries: u32,
    /// EMA weight of the newest RSRP sample in the trend.
    pub ema_alpha: f64,
    /// Signal-subspace dimension used for angular refinement.
    pub refinement_num_sources: usize,
    /// Receivers idle longer than this are evicted, milliseconds.
    pub idle_eviction_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            degrading_margin_db: 3.0,
            consecutive_degraded_limit: 3,
            precipitous_drop_db: 15.0,
            hysteresis_margin_db: 3.0,
            trajectory_preference_db: 2.0,
            max_recovery_retries: 3,
            ema_alpha: 0.7,
            refinement_num_sources: 1,
            idle_eviction_ms: 10_000,
        }
    }
}

/// Per-receiver tracking state. Exactly one live instance per active
/// receiver; all mutation serialized by the owning tracker entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverTrackState {
    /// Beam currently believed to serve the receiver.
    pub current_beam_id: BeamId,
    /// Exponentially smoothed serving RSRP, dBm.
    pub rsrp_trend: f64,
    /// Smoothed |RSRP - trend|; feeds the trend-stability factor.
    pub trend_deviation: f64,
    /// Raw serving RSRP of the previous report, dBm.
    pub last_rsrp_dbm: f64,
    /// Consecutive reports with the trend below the failure threshold.
    pub consecutive_degraded: u32,
    /// Current recovery phase.
    pub phase: RecoveryPhase,
    /// Target beam of an in-flight recovery.
    pub recovery_target: Option<BeamId>,
    /// Best neighbor cached when degradation was first observed.
    pub cached_candidate: Option<(BeamId, f64)>,
    /// Recovery attempts since failure was declared.
    pub recovery_retries: u32,
    /// Timestamp of the last emitted decision, milliseconds.
    pub last_decision_ms: u64,
    /// Timestamp of the last processed report, milliseconds.
    pub last_report_ms: u64,
}

impl ReceiverTrackState {
    /// State for a receiver seen for the first time: trend seeded from the
    /// report, phase `Normal`.
    #[must_use]
    pub fn new(measurement: &BeamMeasurement) -> Self {
        Self {
            current_beam_id: measurement.serving_beam_id,
            rsrp_trend: measurement.serving_rsrp_dbm,
            trend_deviation: 0.0,
            last_rsrp_dbm: measurement.serving_rsrp_dbm,
            consecutive_degraded: 0,
            phase: RecoveryPhase::Normal,
            recovery_target: None,
            cached_candidate: None,
            recovery_retries: 0,
            last_decision_ms: 0,
            last_report_ms: measurement.timestamp_ms,
        }
    }
}

/// Inputs the tracker computed for this report before consulting the policy.
#[derive(Debug)]
pub struct TransitionContext<'a> {
    /// The beam grid geometry.
    pub grid: &'a BeamGrid,
    /// Policy tunables.
    pub config: &'a PolicyConfig,
    /// RSRP trend below this declares beam failure, dBm.
    pub threshold_db: f64,
    /// Direction of the trajectory-predicted position, if the predictor
    /// holds kinematic state for this receiver.
    pub predicted_direction: Option<(f64, f64)>,
    /// Refined angle estimate for this report, if the report carried array
    /// data and the estimator produced a stable estimate.
    pub refined_angle: Option<AngleEstimate>,
}

/// Applies one measurement to the state machine.
///
/// Pure: no I/O, no clock reads; everything observable is in the inputs.
#[must_use]
pub fn step(
    state: &ReceiverTrackState,
    measurement: &BeamMeasurement,
    ctx: &TransitionContext<'_>,
) -> (ReceiverTrackState, BeamDecision) {
    let cfg = ctx.config;
    let thr = ctx.threshold_db;
    let rsrp = measurement.serving_rsrp_dbm;

    let mut next = state.clone();
    next.rsrp_trend = cfg.ema_alpha * rsrp + (1.0 - cfg.ema_alpha) * state.rsrp_trend;
    next.trend_deviation = cfg.ema_alpha * (rsrp - state.rsrp_trend).abs()
        + (1.0 - cfg.ema_alpha) * state.trend_deviation;
    next.last_rsrp_dbm = rsrp;
    next.last_report_ms = measurement.timestamp_ms;

    let stability = trend_stability(next.trend_deviation);

    let decision = match state.phase {
        RecoveryPhase::Normal => {
            // While healthy the node's reported serving beam is authoritative.
            next.current_beam_id = measurement.serving_beam_id;

            if next.rsrp_trend < thr + cfg.degrading_margin_db {
                next.phase = RecoveryPhase::Degrading;
                next.cached_candidate = measurement.best_neighbor();
                next.consecutive_degraded = u32::from(next.rsrp_trend < thr);
                decide(
                    measurement,
                    &next,
                    BeamAction::Maintain,
                    next.current_beam_id,
                    stability,
                    0.0,
                    "degrading",
                )
            } else if let Some((beam, neighbor_rsrp)) = measurement
                .best_neighbor()
                .filter(|&(_, r)| r > rsrp + cfg.hysteresis_margin_db)
            {
                // Opportunity switch: a clear-margin stronger neighbor with
                // a healthy serving signal. Gain is positive by the
                // hysteresis filter, so the action never degrades here.
                // The decision reports the beam being switched away from.
                let decision = decide(
                    measurement,
                    &next,
                    BeamAction::Switch,
                    beam,
                    stability,
                    neighbor_rsrp - rsrp,
                    "stronger-neighbor",
                );
                next.current_beam_id = beam;
                decision
            } else {
                decide(
                    measurement,
                    &next,
                    BeamAction::Maintain,
                    next.current_beam_id,
                    stability,
                    0.0,
                    "stable",
                )
            }
        }

        RecoveryPhase::Degrading => {
            if next.rsrp_trend >= thr + cfg.degrading_margin_db {
                next.phase = RecoveryPhase::Normal;
                next.consecutive_degraded = 0;
                next.cached_candidate = None;
                decide(
                    measurement,
                    &next,
                    BeamAction::Maintain,
                    next.current_beam_id,
                    stability,
                    0.0,
                    "stabilized",
                )
            } else {
                if next.rsrp_trend < thr {
                    next.consecutive_degraded += 1;
                } else {
                    next.consecutive_degraded = 0;
                }
                let precipitous = rsrp <= state.last_rsrp_dbm - cfg.precipitous_drop_db;

                if next.consecutive_degraded >= cfg.consecutive_degraded_limit || precipitous {
                    let (target, estimated_rsrp) = coarse_target(measurement, &next, ctx);
                    next.phase = RecoveryPhase::FailureP1;
                    next.recovery_target = Some(target);
                    next.recovery_retries = 0;
                    let reason = if precipitous
                        && next.consecutive_degraded < cfg.consecutive_degraded_limit
                    {
                        "precipitous-drop"
                    } else {
                        "beam-failure"
                    };
                    decide(
                        measurement,
                        &next,
                        BeamAction::Recover,
                        target,
                        stability,
                        estimated_rsrp - rsrp,
                        reason,
                    )
                } else {
                    next.cached_candidate =
                        measurement.best_neighbor().or(state.cached_candidate);
                    decide(
                        measurement,
                        &next,
                        BeamAction::Maintain,
                        next.current_beam_id,
                        stability,
                        0.0,
                        "degrading",
                    )
                }
            }
        }

        RecoveryPhase::FailureP1 => {
            if rsrp > state.last_rsrp_dbm {
                // Coarse target confirmed: refine within the same report
                // (P2), then arm confirmation (P3).
                next.phase = RecoveryPhase::FailureP2;
                let coarse = state.recovery_target.unwrap_or(measurement.serving_beam_id);

                let (target, confidence, reason) = match ctx.refined_angle {
                    Some(est) => (
                        ctx.grid.beam_toward(est.azimuth_deg, est.elevation_deg),
                        est.confidence.product(stability),
                        "refined",
                    ),
                    // InsufficientData or no array data: fall back to the
                    // coarse target and await confirmation anyway.
                    None => (coarse, stability, "refine-fallback"),
                };

                next.phase = RecoveryPhase::FailureP3;
                next.recovery_target = Some(target);

                let gain = measurement
                    .neighbor_beams
                    .get(&target)
                    .map(|r| (r - rsrp).max(0.0))
                    .unwrap_or(0.0);
                decide(measurement, &next, BeamAction::Switch, target, confidence, gain, reason)
            } else {
                retry_recovery(&mut next, measurement, ctx, stability)
            }
        }

        RecoveryPhase::FailureP2 | RecoveryPhase::FailureP3 => {
            if next.rsrp_trend > thr {
                // Confirmed on the new beam: recovery succeeded.
                next.current_beam_id =
                    state.recovery_target.unwrap_or(measurement.serving_beam_id);
                next.phase = RecoveryPhase::Normal;
                next.consecutive_degraded = 0;
                next.recovery_retries = 0;
                next.recovery_target = None;
                next.cached_candidate = None;
                decide(
                    measurement,
                    &next,
                    BeamAction::Maintain,
                    next.current_beam_id,
                    stability,
                    0.0,
                    "recovered",
                )
            } else {
                retry_recovery(&mut next, measurement, ctx, stability)
            }
        }
    };

    next.last_decision_ms = measurement.timestamp_ms;
    (next, decision)
}

/// Re-enters the coarse sweep after a failed attempt; beyond the retry
/// bound the decision escalates instead of retrying silently.
fn retry_recovery(
    next: &mut ReceiverTrackState,
    measurement: &BeamMeasurement,
    ctx: &TransitionContext<'_>,
    stability: Confidence,
) -> BeamDecision {
    next.recovery_retries += 1;
    next.phase = RecoveryPhase::FailureP1;

    if next.recovery_retries > ctx.config.max_recovery_retries {
        let target = next
            .recovery_target
            .unwrap_or(measurement.serving_beam_id);
        return decide(
            measurement,
            next,
            BeamAction::Recover,
            target,
            stability,
            0.0,
            "escalate",
        );
    }

    let (target, estimated_rsrp) = coarse_target(measurement, next, ctx);
    next.recovery_target = Some(target);
    decide(
        measurement,
        next,
        BeamAction::Recover,
        target,
        stability,
        estimated_rsrp - measurement.serving_rsrp_dbm,
        "retry",
    )
}

/// Coarse sweep: the best measured neighbor, unless the beam nearest the
/// predicted trajectory direction is measured within
/// `trajectory_preference_db` of it. Falls back to the cached candidate,
/// the trajectory beam alone, and finally the serving beam.
fn coarse_target(
    measurement: &BeamMeasurement,
    state: &ReceiverTrackState,
    ctx: &TransitionContext<'_>,
) -> (BeamId, f64) {
    let neighbor = measurement.best_neighbor().or(state.cached_candidate);
    let trajectory_beam = ctx
        .predicted_direction
        .map(|(az, el)| ctx.grid.beam_toward(az, el));

    match (neighbor, trajectory_beam) {
        (Some((nb, nr)), Some(tb)) if tb != nb => {
            match measurement.neighbor_beams.get(&tb) {
                Some(&tr) if tr >= nr - ctx.config.trajectory_preference_db => (tb, tr),
                _ => (nb, nr),
            }
        }
        (Some((nb, nr)), _) => (nb, nr),
        (None, Some(tb)) => (tb, measurement.serving_rsrp_dbm),
        (None, None) => (measurement.serving_beam_id, measurement.serving_rsrp_dbm),
    }
}

/// Trend-stability factor: 1 for a flat trend, decaying as the smoothed
/// deviation grows.
fn trend_stability(deviation_db: f64) -> Confidence {
    Confidence::clamped(1.0 / (1.0 + deviation_db / 10.0))
}

fn decide(
    measurement: &BeamMeasurement,
    state: &ReceiverTrackState,
    action: BeamAction,
    target: BeamId,
    confidence: Confidence,
    expected_gain_db: f64,
    reason: &'static str,
) -> BeamDecision {
    BeamDecision {
        receiver_id: measurement.receiver_id.clone(),
        action,
        current_beam_id: state.current_beam_id,
        target_beam_id: target,
        confidence,
        expected_gain_db,
        reason,
        timestamp_ms: measurement.timestamp_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use uav_beam_core::{BeamGridConfig, ReceiverId};

    fn grid() -> BeamGrid {
        BeamGrid::new(BeamGridConfig::default())
    }

    fn ctx<'a>(grid: &'a BeamGrid, config: &'a PolicyConfig, threshold_db: f64) -> TransitionContext<'a> {
        TransitionContext {
            grid,
            config,
            threshold_db,
            predicted_direction: None,
            refined_angle: None,
        }
    }

    fn report(t_ms: u64, rsrp: f64, neighbors: &[(u32, f64)]) -> BeamMeasurement {
        let mut neighbor_beams = BTreeMap::new();
        for &(id, r) in neighbors {
            neighbor_beams.insert(BeamId::new(id), r);
        }
        BeamMeasurement {
            timestamp_ms: t_ms,
            receiver_id: ReceiverId::new("UAV-001"),
            serving_beam_id: BeamId::new(1),
            serving_rsrp_dbm: rsrp,
            neighbor_beams,
            position: None,
            velocity: None,
            snapshot: None,
        }
    }

    /// Drives a sequence of reports through the policy and returns the
    /// final state plus every decision.
    fn run(
        threshold_db: f64,
        config: &PolicyConfig,
        reports: &[BeamMeasurement],
    ) -> (ReceiverTrackState, Vec<BeamDecision>) {
        let grid = grid();
        let mut state = ReceiverTrackState::new(&reports[0]);
        let mut decisions = Vec::new();
        for m in reports {
            let c = ctx(&grid, config, threshold_db);
            let (next, decision) = step(&state, m, &c);
            state = next;
            decisions.push(decision);
        }
        (state, decisions)
    }

    /// RSRP continuously above threshold: never leaves NORMAL, regardless
    /// of neighbor fluctuations within the hysteresis margin.
    #[test]
    fn test_healthy_receiver_stays_normal() {
        let config = PolicyConfig::default();
        let reports: Vec<_> = (0..10)
            .map(|i| report(i * 100, -70.0, &[(2, -71.0 + (i % 3) as f64)]))
            .collect();

        let (state, decisions) = run(-100.0, &config, &reports);
        assert_eq!(state.phase, RecoveryPhase::Normal);
        for d in &decisions {
            assert_eq!(d.action, BeamAction::Maintain);
            assert_eq!(d.target_beam_id, BeamId::new(1));
        }
    }

    /// The concrete recovery scenario: threshold -10 dBm, three reports at
    /// -20 dBm with neighbors {2: -8, 3: -15} produce a recover decision
    /// targeting beam 2 with ~12 dB expected gain on the third report.
    #[test]
    fn test_three_report_failure_scenario() {
        let config = PolicyConfig::default();
        let reports = vec![
            report(0, -20.0, &[(2, -8.0), (3, -15.0)]),
            report(100, -20.0, &[(2, -8.0), (3, -15.0)]),
            report(200, -20.0, &[(2, -8.0), (3, -15.0)]),
        ];

        let (state, decisions) = run(-10.0, &config, &reports);

        assert_eq!(decisions[0].action, BeamAction::Maintain);
        assert_eq!(decisions[0].reason, "degrading");
        assert_eq!(decisions[1].action, BeamAction::Maintain);

        let d = &decisions[2];
        assert_eq!(d.action, BeamAction::Recover);
        assert_eq!(d.target_beam_id, BeamId::new(2));
        assert!(
            (d.expected_gain_db - 12.0).abs() < 1e-9,
            "expected gain {} != 12",
            d.expected_gain_db
        );
        assert_eq!(state.phase, RecoveryPhase::FailureP1);
    }

    /// Strong, stable signal with no neighbor over the hysteresis margin:
    /// maintain on the current beam.
    #[test]
    fn test_strong_stable_maintains() {
        let config = PolicyConfig::default();
        let reports = vec![report(0, -70.0, &[(2, -69.0)])];

        let (_, decisions) = run(-100.0, &config, &reports);
        let d = &decisions[0];
        assert_eq!(d.action, BeamAction::Maintain);
        assert_eq!(d.target_beam_id, d.current_beam_id);
    }

    /// A neighbor clearing the hysteresis margin triggers a proactive
    /// switch with positive expected gain.
    #[test]
    fn test_proactive_switch() {
        let config = PolicyConfig::default();
        let reports = vec![report(0, -70.0, &[(5, -60.0)])];

        let (state, decisions) = run(-100.0, &config, &reports);
        let d = &decisions[0];
        assert_eq!(d.action, BeamAction::Switch);
        assert_eq!(d.target_beam_id, BeamId::new(5));
        assert_eq!(d.reason, "stronger-neighbor");
        assert!((d.expected_gain_db - 10.0).abs() < 1e-9);
        assert_eq!(state.current_beam_id, BeamId::new(5));
        assert_eq!(state.phase, RecoveryPhase::Normal);
    }

    /// A recovering trend pulls a degrading receiver back to NORMAL
    /// without entering failure.
    #[test]
    fn test_degrading_stabilizes() {
        let config = PolicyConfig::default();
        let reports = vec![
            report(0, -12.0, &[]),
            report(100, -2.0, &[]),
            report(200, -1.0, &[]),
        ];

        let (state, decisions) = run(-10.0, &config, &reports);
        assert_eq!(decisions[0].reason, "degrading");
        assert_eq!(state.phase, RecoveryPhase::Normal);
        assert!(decisions.iter().all(|d| d.action == BeamAction::Maintain));
    }

    /// A precipitous one-step drop declares failure before the consecutive
    /// count is reached.
    #[test]
    fn test_precipitous_drop() {
        let config = PolicyConfig::default();
        let reports = vec![
            report(0, -12.0, &[(2, -9.0)]),
            report(100, -40.0, &[(2, -9.0)]),
        ];

        let (state, decisions) = run(-10.0, &config, &reports);
        let d = &decisions[1];
        assert_eq!(d.action, BeamAction::Recover);
        assert_eq!(d.reason, "precipitous-drop");
        assert_eq!(state.phase, RecoveryPhase::FailureP1);
    }

    /// Full recovery cycle: failure, coarse confirmation with refinement
    /// fallback, then confirmation on the new beam resets to NORMAL and
    /// adopts the target beam.
    #[test]
    fn test_full_recovery_cycle() {
        let config = PolicyConfig::default();
        let reports = vec![
            report(0, -20.0, &[(2, -8.0)]),
            report(100, -20.0, &[(2, -8.0)]),
            report(200, -20.0, &[(2, -8.0)]),
            // Improved after the coarse sweep: switch with the coarse target.
            report(300, -9.0, &[(2, -8.0)]),
            // Confirmed above threshold on the new beam.
            report(400, -5.0, &[]),
        ];

        let (state, decisions) = run(-10.0, &config, &reports);

        assert_eq!(decisions[2].action, BeamAction::Recover);
        let switch = &decisions[3];
        assert_eq!(switch.action, BeamAction::Switch);
        assert_eq!(switch.target_beam_id, BeamId::new(2));
        assert_eq!(switch.reason, "refine-fallback");
        assert!(switch.expected_gain_db >= 0.0);

        let done = &decisions[4];
        assert_eq!(done.action, BeamAction::Maintain);
        assert_eq!(done.reason, "recovered");
        assert_eq!(state.phase, RecoveryPhase::Normal);
        assert_eq!(state.current_beam_id, BeamId::new(2));
        assert_eq!(state.recovery_retries, 0);
    }

    /// A refined angle estimate selects the grid beam nearest the estimate
    /// and multiplies its confidence into the decision.
    #[test]
    fn test_refined_switch_uses_angle_estimate() {
        let grid = grid();
        let config = PolicyConfig::default();

        let mut state = ReceiverTrackState::new(&report(0, -20.0, &[(2, -8.0)]));
        state.phase = RecoveryPhase::FailureP1;
        state.recovery_target = Some(BeamId::new(2));
        state.last_rsrp_dbm = -20.0;

        let refined = AngleEstimate {
            azimuth_deg: 10.0,
            elevation_deg: 5.0,
            confidence: Confidence::clamped(0.9),
        };
        let c = TransitionContext {
            grid: &grid,
            config: &config,
            threshold_db: -10.0,
            predicted_direction: None,
            refined_angle: Some(refined),
        };

        let improved = report(100, -12.0, &[(2, -8.0)]);
        let (next, decision) = step(&state, &improved, &c);

        assert_eq!(decision.action, BeamAction::Switch);
        assert_eq!(decision.reason, "refined");
        assert_eq!(
            decision.target_beam_id,
            grid.beam_toward(10.0, 5.0),
            "target should be the beam nearest the refined estimate"
        );
        assert_eq!(next.phase, RecoveryPhase::FailureP3);
        assert!(decision.confidence.value() <= 0.9);
    }

    /// Recovery retries are bounded; beyond the bound the decision reports
    /// escalation instead of retrying silently.
    #[test]
    fn test_retry_then_escalate() {
        let config = PolicyConfig {
            max_recovery_retries: 2,
            ..PolicyConfig::default()
        };
        let reports = vec![
            report(0, -20.0, &[(2, -8.0)]),
            report(100, -20.0, &[(2, -8.0)]),
            report(200, -20.0, &[(2, -8.0)]),
            // Each subsequent report is worse: no confirmation, only retries.
            report(300, -21.0, &[(2, -8.0)]),
            report(400, -22.0, &[(2, -8.0)]),
            report(500, -23.0, &[(2, -8.0)]),
        ];

        let (state, decisions) = run(-10.0, &config, &reports);

        assert_eq!(decisions[3].reason, "retry");
        assert_eq!(decisions[4].reason, "retry");
        assert_eq!(decisions[5].reason, "escalate");
        assert_eq!(decisions[5].action, BeamAction::Recover);
        assert_eq!(state.phase, RecoveryPhase::FailureP1);
    }

    /// The trajectory-aligned beam is preferred as the coarse target when
    /// its measured RSRP is within the preference margin of the best
    /// neighbor.
    #[test]
    fn test_trajectory_preferred_coarse_target() {
        let grid = grid();
        let config = PolicyConfig::default();

        let mut state = ReceiverTrackState::new(&report(0, -20.0, &[]));
        state.phase = RecoveryPhase::Degrading;
        state.consecutive_degraded = config.consecutive_degraded_limit - 1;

        // The predicted direction points at a beam that is measured 1 dB
        // below the best neighbor — inside the 2 dB preference margin.
        let toward = grid.beam_toward(20.0, 5.0);
        let best = if toward.index() == 7 { 9 } else { 7 };
        let m = report(
            100,
            -20.0,
            &[(best, -8.0), (toward.index(), -9.0)],
        );

        let c = TransitionContext {
            grid: &grid,
            config: &config,
            threshold_db: -10.0,
            predicted_direction: Some((20.0, 5.0)),
            refined_angle: None,
        };
        let (_, decision) = step(&state, &m, &c);

        assert_eq!(decision.action, BeamAction::Recover);
        assert_eq!(decision.target_beam_id, toward);
    }

    /// Reports without position, velocity, or array data still drive the
    /// policy from RSRP alone (graceful degradation).
    #[test]
    fn test_rsrp_only_reports_suffice() {
        let config = PolicyConfig::default();
        let reports = vec![
            report(0, -20.0, &[]),
            report(100, -20.0, &[]),
            report(200, -20.0, &[]),
        ];

        let (state, decisions) = run(-10.0, &config, &reports);
        assert_eq!(decisions[2].action, BeamAction::Recover);
        // No neighbor and no prediction: recovery targets the serving beam.
        assert_eq!(decisions[2].target_beam_id, BeamId::new(1));
        assert_eq!(state.phase, RecoveryPhase::FailureP1);
    }
}
