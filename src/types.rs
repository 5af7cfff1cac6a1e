// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Neural Traffic Simulation Suite - Type Definitions

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Layer ───────────────────────────────────────────────────────────────────

/// Neuron layer. Declaration order is topology order: input < hidden < output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Input = 0,
    Hidden = 1,
    Output = 2,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Input, Layer::Hidden, Layer::Output];

    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    /// The layer a connection from `self` may target, if any.
    pub fn next(&self) -> Option<Layer> {
        match self {
            Self::Input => Some(Self::Hidden),
            Self::Hidden => Some(Self::Output),
            Self::Output => None,
        }
    }
}

// ─── Traffic State ───────────────────────────────────────────────────────────

/// Behavioral classification shared by neurons and in-flight signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrafficState {
    #[default]
    Normal = 0,
    Suspicious = 1,
    Anomaly = 2,
}

impl TrafficState {
    pub fn index(&self) -> usize {
        *self as usize
    }
}

// ─── Neuron ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neuron {
    pub id: u32,
    pub layer: Layer,
    /// Position within its layer, used to derive render coordinates.
    pub index: u32,
    pub traffic_state: TrafficState,
    pub intensity: f64,
    pub spike_count: u64,
    pub last_fired: Option<u64>,
    pub connections: Vec<ConnectionId>,
}

impl Neuron {
    pub fn new(id: u32, layer: Layer, index: u32) -> Self {
        Self {
            id,
            layer,
            index,
            traffic_state: TrafficState::Normal,
            intensity: 0.0,
            spike_count: 0,
            last_fired: None,
            connections: Vec::new(),
        }
    }

    pub(crate) fn record_spike(&mut self, now_ms: u64) {
        self.spike_count += 1;
        self.last_fired = Some(now_ms);
    }
}

// ─── Connection ──────────────────────────────────────────────────────────────

/// Connection identity, derived from the ordered (source, target) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId {
    pub source: u32,
    pub target: u32,
}

impl ConnectionId {
    pub fn new(source: u32, target: u32) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source_layer: Layer,
    pub target_layer: Layer,
    /// In (0, 1], fixed at creation.
    pub strength: f64,
    pub active: bool,
    pub last_signal: Option<u64>,
    /// Classification of the most recent signal carried, if any.
    #[serde(default)]
    pub last_classification: Option<TrafficState>,
}

impl Connection {
    pub fn new(id: ConnectionId, source_layer: Layer, target_layer: Layer, strength: f64) -> Self {
        Self {
            id,
            source_layer,
            target_layer,
            strength,
            active: false,
            last_signal: None,
            last_classification: None,
        }
    }

    pub(crate) fn carry(&mut self, now_ms: u64, classification: TrafficState) {
        self.active = true;
        self.last_signal = Some(now_ms);
        self.last_classification = Some(classification);
    }

    /// Milliseconds since the last carried signal, `None` if it never carried one.
    pub fn elapsed_since_signal(&self, now_ms: u64) -> Option<u64> {
        self.last_signal.map(|t| now_ms.saturating_sub(t))
    }
}

// ─── In-flight Signal ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: u64,
    pub connection: ConnectionId,
    pub from: Point,
    pub to: Point,
    /// 0 = departed, 1 = arrived.
    pub progress: f64,
    pub speed: f64,
    pub intensity: f64,
    pub classification: TrafficState,
}

impl Signal {
    /// Interpolated position along the straight path at the current progress.
    pub fn position(&self) -> Point {
        let t = self.progress.clamp(0.0, 1.0);
        Point {
            x: self.from.x + (self.to.x - self.from.x) * t,
            y: self.from.y + (self.to.y - self.from.y) * t,
        }
    }

    pub fn has_arrived(&self) -> bool {
        self.progress >= 1.0
    }
}

// ─── TickResult ──────────────────────────────────────────────────────────────

/// Per-tick summary of what the Signal Scheduler did.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TickResult {
    pub now_ms: u64,
    pub input_fired: u32,
    pub hidden_fired: u32,
    /// New signals per classification, after the cap was applied.
    pub emitted: [u32; 3],
    pub dropped: u32,
    pub arrived: u32,
    pub deactivated_connections: u32,
    pub in_flight: u32,
}

impl TickResult {
    pub fn emitted_total(&self) -> u32 {
        self.emitted.iter().sum()
    }
}

// ─── SimStats ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SimStats {
    pub signal_ticks: u64,
    pub traffic_updates: u64,
    pub signals_emitted: [u64; 3],
    pub signals_dropped: u64,
    pub signals_arrived: u64,
    pub total_spikes: u64,
    pub in_flight: u32,
    pub active_connections: u32,
    /// Current neuron counts per traffic state.
    pub neuron_states: [u32; 3],
}

impl SimStats {
    pub fn record_tick(&mut self, result: &TickResult) {
        self.signal_ticks += 1;
        for (total, emitted) in self.signals_emitted.iter_mut().zip(result.emitted) {
            *total += emitted as u64;
        }
        self.signals_dropped += result.dropped as u64;
        self.signals_arrived += result.arrived as u64;
        self.total_spikes += (result.input_fired + result.hidden_fired) as u64;
        self.in_flight = result.in_flight;
    }

    /// Share of emitted signals carrying `class`; 0 when nothing was emitted.
    pub fn proportion(&self, class: TrafficState) -> f64 {
        let total: u64 = self.signals_emitted.iter().sum();
        if total == 0 {
            return 0.0;
        }
        self.signals_emitted[class.index()] as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_order() {
        assert!(Layer::Input < Layer::Hidden);
        assert!(Layer::Hidden < Layer::Output);
        assert_eq!(Layer::Input.next(), Some(Layer::Hidden));
        assert_eq!(Layer::Hidden.next(), Some(Layer::Output));
        assert_eq!(Layer::Output.next(), None);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(3, 11).to_string(), "3->11");
    }

    #[test]
    fn test_signal_position_interpolates() {
        let s = Signal {
            id: 0,
            connection: ConnectionId::new(0, 1),
            from: Point { x: 0.0, y: 0.0 },
            to: Point { x: 100.0, y: 50.0 },
            progress: 0.5,
            speed: 0.1,
            intensity: 0.5,
            classification: TrafficState::Normal,
        };
        assert_eq!(s.position(), Point { x: 50.0, y: 25.0 });
        assert!(!s.has_arrived());
    }

    #[test]
    fn test_stats_proportion() {
        let mut stats = SimStats::default();
        assert_eq!(stats.proportion(TrafficState::Anomaly), 0.0);
        stats.record_tick(&TickResult {
            emitted: [6, 2, 2],
            ..Default::default()
        });
        assert!((stats.proportion(TrafficState::Anomaly) - 0.2).abs() < 1e-12);
        assert_eq!(stats.signal_ticks, 1);
    }

    #[test]
    fn test_traffic_state_serializes_lowercase() {
        let json = serde_json::to_string(&TrafficState::Suspicious).unwrap();
        assert_eq!(json, "\"suspicious\"");
        let layer: Layer = serde_json::from_str("\"hidden\"").unwrap();
        assert_eq!(layer, Layer::Hidden);
    }
}
