// Per-Tick JSONL Time Series Recorder
// Outputs one JSON line per signal tick for independent analysis

use neural_traffic_engine::{SimStats, TickResult};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
pub struct TickSnapshot {
    pub now_ms: u64,
    pub anomaly_score: f64,
    pub input_fired: u32,
    pub hidden_fired: u32,
    pub emitted: [u32; 3],
    pub dropped: u32,
    pub arrived: u32,
    pub in_flight: u32,
    pub active_connections: u32,
    pub neuron_states: [u32; 3],
}

impl TickSnapshot {
    pub fn from_tick(result: &TickResult, stats: &SimStats, anomaly_score: f64) -> Self {
        Self {
            now_ms: result.now_ms,
            anomaly_score,
            input_fired: result.input_fired,
            hidden_fired: result.hidden_fired,
            emitted: result.emitted,
            dropped: result.dropped,
            arrived: result.arrived,
            in_flight: result.in_flight,
            active_connections: stats.active_connections,
            neuron_states: stats.neuron_states,
        }
    }
}

/// Time series recorder that accumulates snapshots and writes JSONL
pub struct TimeSeriesRecorder {
    snapshots: Vec<TickSnapshot>,
}

impl TimeSeriesRecorder {
    pub fn new() -> Self {
        Self { snapshots: Vec::new() }
    }

    pub fn record(&mut self, snapshot: TickSnapshot) {
        self.snapshots.push(snapshot);
    }

    /// Write all snapshots to a JSONL file
    pub fn write_jsonl(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        for snapshot in &self.snapshots {
            let line = serde_json::to_string(snapshot)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}
