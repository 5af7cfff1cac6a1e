// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Neural Traffic Simulation Suite - Engine Configuration

//! Engine configuration and setup-time validation.
//!
//! Every tunable of the engine lives here with a working default. A
//! simulation can only be built from a config that passed [`EngineConfig::validate`],
//! so the tick paths never have to re-check ranges.

use serde::{Deserialize, Serialize};

use crate::types::Layer;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} tick period must be greater than zero")]
    ZeroTickPeriod(&'static str),

    #[error("{name} range is empty: min {min} > max {max}")]
    InvalidRange { name: &'static str, min: f64, max: f64 },

    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("{name} strengths must lie in (0, 1], got [{min}, {max}]")]
    InvalidStrength { name: &'static str, min: f64, max: f64 },

    #[error("staleness window ({staleness_ms} ms) must exceed recency window ({recency_ms} ms)")]
    StalenessNotAfterRecency { recency_ms: u64, staleness_ms: u64 },

    #[error("per-tick signal cap must be greater than zero")]
    ZeroSignalCap,

    #[error("{name} must be finite and {bound}, got {value}")]
    OutOfBounds {
        name: &'static str,
        value: f64,
        bound: &'static str,
    },
}

// ---------------------------------------------------------------------------
// PopulationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PopulationConfig {
    pub input: u32,
    pub hidden: u32,
    pub output: u32,
    /// Layout canvas used to place neurons for signal coordinates.
    pub width: f64,
    pub height: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            input: 6,
            hidden: 8,
            output: 4,
            width: 600.0,
            height: 400.0,
        }
    }
}

impl PopulationConfig {
    pub fn count(&self, layer: Layer) -> u32 {
        match layer {
            Layer::Input => self.input,
            Layer::Hidden => self.hidden,
            Layer::Output => self.output,
        }
    }

    pub fn total(&self) -> u32 {
        self.input + self.hidden + self.output
    }
}

// ---------------------------------------------------------------------------
// ConnectivityConfig
// ---------------------------------------------------------------------------

/// Edge probability and strength sub-range for one adjacent layer pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LayerPairConfig {
    pub probability: f64,
    pub min_strength: f64,
    pub max_strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub input_hidden: LayerPairConfig,
    pub hidden_output: LayerPairConfig,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            input_hidden: LayerPairConfig {
                probability: 0.6,
                min_strength: 0.3,
                max_strength: 0.7,
            },
            hidden_output: LayerPairConfig {
                probability: 0.8,
                min_strength: 0.5,
                max_strength: 0.9,
            },
        }
    }
}

impl ConnectivityConfig {
    /// Parameters for edges leaving `source`; `None` for the output layer.
    pub fn for_source(&self, source: Layer) -> Option<&LayerPairConfig> {
        match source {
            Layer::Input => Some(&self.input_hidden),
            Layer::Hidden => Some(&self.hidden_output),
            Layer::Output => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_ms: u64,
    /// Spontaneous input firing probability at anomaly score 0.
    pub base_fire_rate: f64,
    /// Added firing probability per unit of anomaly score.
    pub anomaly_fire_scale: f64,
    /// Firing multipliers indexed by the neuron's traffic state
    /// (normal, suspicious, anomaly) as of the last snapshot.
    pub state_fire_multipliers: [f64; 3],
    pub suspicious_threshold: f64,
    pub suspicious_gain: f64,
    pub anomaly_threshold: f64,
    pub anomaly_gain: f64,
    /// Hidden-layer firing threshold, re-rolled uniformly every tick.
    pub hidden_threshold_min: f64,
    pub hidden_threshold_max: f64,
    /// Secondary anomaly draw for hidden→output signals, gated by `anomaly_threshold`.
    pub hidden_anomaly_gain: f64,
    pub recency_window_ms: u64,
    pub staleness_window_ms: u64,
    pub base_speed: f64,
    pub speed_jitter: f64,
    pub anomaly_speed_multiplier: f64,
    /// Maximum newly created signals admitted per tick.
    pub max_new_signals: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            base_fire_rate: 0.05,
            anomaly_fire_scale: 0.25,
            state_fire_multipliers: [1.0, 1.25, 1.5],
            suspicious_threshold: 0.3,
            suspicious_gain: 0.6,
            anomaly_threshold: 0.7,
            anomaly_gain: 0.5,
            hidden_threshold_min: 0.3,
            hidden_threshold_max: 0.8,
            hidden_anomaly_gain: 0.3,
            recency_window_ms: 1000,
            staleness_window_ms: 1500,
            base_speed: 0.02,
            speed_jitter: 0.02,
            anomaly_speed_multiplier: 1.5,
            max_new_signals: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// TrafficConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrafficConfig {
    pub tick_ms: u64,
    /// Anomaly probability is `anomaly_gain * score^2 * layer weight`.
    pub anomaly_gain: f64,
    /// Suspicious probability is `suspicious_gain * score * layer weight`.
    pub suspicious_gain: f64,
    /// Sensitivity per layer (input, hidden, output).
    pub layer_weights: [f64; 3],
    pub intensity_base: f64,
    pub intensity_gain: f64,
    pub intensity_jitter: f64,
    /// Intensity bonus per resulting state (normal, suspicious, anomaly).
    pub state_intensity_bonus: [f64; 3],
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            tick_ms: 2000,
            anomaly_gain: 0.6,
            suspicious_gain: 0.3,
            layer_weights: [1.0, 0.9, 1.1],
            intensity_base: 0.1,
            intensity_gain: 0.5,
            intensity_jitter: 0.2,
            state_intensity_bonus: [0.0, 0.1, 0.2],
        }
    }
}

impl TrafficConfig {
    pub fn layer_weight(&self, layer: Layer) -> f64 {
        self.layer_weights[layer.ordinal()]
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub population: PopulationConfig,
    pub connectivity: ConnectivityConfig,
    pub scheduler: SchedulerConfig,
    pub traffic: TrafficConfig,
}

impl EngineConfig {
    /// Reject configurations the tick paths cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if s.tick_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod("signal"));
        }
        if self.traffic.tick_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod("traffic"));
        }

        validate_pair("input→hidden", &self.connectivity.input_hidden)?;
        validate_pair("hidden→output", &self.connectivity.hidden_output)?;

        for (name, value) in [
            ("base_fire_rate", s.base_fire_rate),
            ("suspicious_threshold", s.suspicious_threshold),
            ("anomaly_threshold", s.anomaly_threshold),
        ] {
            validate_probability(name, value)?;
        }
        validate_range("hidden_threshold", s.hidden_threshold_min, s.hidden_threshold_max)?;

        if s.staleness_window_ms <= s.recency_window_ms {
            return Err(ConfigError::StalenessNotAfterRecency {
                recency_ms: s.recency_window_ms,
                staleness_ms: s.staleness_window_ms,
            });
        }
        if s.max_new_signals == 0 {
            return Err(ConfigError::ZeroSignalCap);
        }

        // Signals must always move forward and eventually arrive.
        validate_positive("base_speed", s.base_speed)?;
        validate_non_negative("speed_jitter", s.speed_jitter)?;
        validate_at_least("anomaly_speed_multiplier", s.anomaly_speed_multiplier, 1.0, ">= 1")?;
        validate_non_negative("anomaly_fire_scale", s.anomaly_fire_scale)?;
        for m in s.state_fire_multipliers {
            validate_positive("state_fire_multipliers", m)?;
        }
        for (name, value) in [
            ("scheduler.anomaly_gain", s.anomaly_gain),
            ("scheduler.suspicious_gain", s.suspicious_gain),
            ("hidden_anomaly_gain", s.hidden_anomaly_gain),
        ] {
            validate_positive(name, value)?;
        }

        // State probabilities must rise with the score in every layer.
        let t = &self.traffic;
        validate_positive("traffic.anomaly_gain", t.anomaly_gain)?;
        validate_positive("traffic.suspicious_gain", t.suspicious_gain)?;
        for w in t.layer_weights {
            validate_positive("layer_weights", w)?;
        }
        validate_positive("intensity_gain", t.intensity_gain)?;
        validate_non_negative("intensity_base", t.intensity_base)?;
        validate_non_negative("intensity_jitter", t.intensity_jitter)?;
        for b in t.state_intensity_bonus {
            validate_non_negative("state_intensity_bonus", b)?;
        }
        Ok(())
    }
}

fn validate_pair(name: &'static str, pair: &LayerPairConfig) -> Result<(), ConfigError> {
    validate_probability(name, pair.probability)?;
    validate_range(name, pair.min_strength, pair.max_strength)?;
    if pair.min_strength <= 0.0 || pair.max_strength > 1.0 {
        return Err(ConfigError::InvalidStrength {
            name,
            min: pair.min_strength,
            max: pair.max_strength,
        });
    }
    Ok(())
}

fn validate_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidProbability { name, value });
    }
    Ok(())
}

fn validate_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::OutOfBounds { name, value, bound: "> 0" });
    }
    Ok(())
}

fn validate_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    validate_at_least(name, value, 0.0, ">= 0")
}

fn validate_at_least(
    name: &'static str,
    value: f64,
    min: f64,
    bound: &'static str,
) -> Result<(), ConfigError> {
    if !(value.is_finite() && value >= min) {
        return Err(ConfigError::OutOfBounds { name, value, bound });
    }
    Ok(())
}

fn validate_range(name: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    // NaN bounds fail here too.
    if !(min <= max) {
        return Err(ConfigError::InvalidRange { name, min, max });
    }
    Ok(())
}
