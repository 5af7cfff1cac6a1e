// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Neural Traffic Simulation Suite - Traffic State Updater

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::TrafficConfig;
use crate::population::Population;
use crate::types::{Layer, TrafficState};

// ---------------------------------------------------------------------------
// TrafficSnapshot - per-neuron state copy read by the signal tick
// ---------------------------------------------------------------------------

/// Per-neuron (state, intensity) copy published after each traffic update.
///
/// The signal tick reads this copy instead of the live population, so a tick
/// sees one consistent view even if traffic updates run elsewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrafficSnapshot {
    entries: Vec<(TrafficState, f64)>,
}

impl TrafficSnapshot {
    pub fn capture(population: &Population) -> Self {
        Self {
            entries: population.snapshot(),
        }
    }

    pub fn uniform(len: usize, state: TrafficState) -> Self {
        Self {
            entries: vec![(state, 0.0); len],
        }
    }

    /// Missing neurons read as normal.
    pub fn state_of(&self, id: u32) -> TrafficState {
        self.entries
            .get(id as usize)
            .map_or(TrafficState::Normal, |&(s, _)| s)
    }

    pub fn intensity_of(&self, id: u32) -> f64 {
        self.entries.get(id as usize).map_or(0.0, |&(_, i)| i)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TrafficStateUpdater
// ---------------------------------------------------------------------------

/// Slow-tick reclassification of every neuron's traffic state and intensity.
#[derive(Debug, Clone)]
pub struct TrafficStateUpdater {
    config: TrafficConfig,
}

impl TrafficStateUpdater {
    pub fn new(config: TrafficConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    /// Probability of drawing `anomaly` for a neuron in `layer`.
    ///
    /// Strictly increasing in `score` for any positive layer weight; zero at
    /// score 0 so quiet traffic classifies as normal.
    pub fn anomaly_probability(&self, score: f64, layer: Layer) -> f64 {
        (self.config.anomaly_gain * score * score * self.config.layer_weight(layer)).clamp(0.0, 1.0)
    }

    pub fn suspicious_probability(&self, score: f64, layer: Layer) -> f64 {
        (self.config.suspicious_gain * score * self.config.layer_weight(layer)).clamp(0.0, 1.0)
    }

    /// Recompute state and intensity of every neuron in place.
    ///
    /// Returns false (and writes nothing) while inactive.
    pub fn update<R: Rng>(
        &self,
        population: &mut Population,
        anomaly_score: f64,
        active: bool,
        rng: &mut R,
    ) -> bool {
        if !active {
            return false;
        }
        for neuron in population.neurons_mut() {
            let p_anomaly = self.anomaly_probability(anomaly_score, neuron.layer);
            let p_suspicious = self.suspicious_probability(anomaly_score, neuron.layer);
            let draw = rng.gen::<f64>();
            let state = if draw < p_anomaly {
                TrafficState::Anomaly
            } else if draw < p_anomaly + p_suspicious {
                TrafficState::Suspicious
            } else {
                TrafficState::Normal
            };

            neuron.traffic_state = state;
            // Not clamped: jitter may push a hot neuron slightly past 1.
            neuron.intensity = self.config.intensity_base
                + anomaly_score * self.config.intensity_gain
                + rng.gen::<f64>() * self.config.intensity_jitter
                + self.config.state_intensity_bonus[state.index()];
        }
        true
    }
}
