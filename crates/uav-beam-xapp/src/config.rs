//! xApp configuration.
//!
//! One JSON document with a section per component, mirroring the
//! `config-file.json` layout the RIC hands to an xApp. Files that wrap the
//! sections under a `controls` key (the xApp descriptor convention) are
//! accepted too.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uav_beam_core::BeamGridConfig;
use uav_beam_doa::EstimatorConfig;
use uav_beam_tracker::{PolicyConfig, PredictorConfig};

use crate::XappError;

/// HTTP surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address.
    pub bind: String,
    /// Listen port.
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

/// Full xApp configuration, immutable after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XappConfig {
    /// Beam grid geometry and thresholds.
    pub beam: BeamGridConfig,
    /// State machine tunables.
    pub policy: PolicyConfig,
    /// Trajectory predictor parameters.
    pub predictor: PredictorConfig,
    /// Angle estimator parameters.
    pub estimator: EstimatorConfig,
    /// HTTP surface.
    pub http: HttpConfig,
    /// How often idle receivers are swept, milliseconds.
    pub eviction_interval_ms: u64,
}

impl Default for XappConfig {
    fn default() -> Self {
        Self {
            beam: BeamGridConfig::default(),
            policy: PolicyConfig::default(),
            predictor: PredictorConfig::default(),
            estimator: EstimatorConfig::default(),
            http: HttpConfig::default(),
            eviction_interval_ms: 1000,
        }
    }
}

impl XappConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, XappError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses configuration from a JSON string, unwrapping a `controls`
    /// envelope if present.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON.
    pub fn from_json(text: &str) -> Result<Self, XappError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let section = value.get("controls").cloned().unwrap_or(value);
        let mut config: Self = serde_json::from_value(section)?;
        if config.eviction_interval_ms == 0 {
            config.eviction_interval_ms = 1000;
        }
        Ok(config)
    }
}
