// Calibration Report Types
// Structured output for tuning the anomaly-score response curve

use serde::Serialize;

// ─── Statistics (per-metric Monte Carlo aggregation) ────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self { mean: 0.0, std_dev: 0.0, ci_lower: 0.0, ci_upper: 0.0, min: 0.0, max: 0.0, n: 0 };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let stderr = std_dev / (n as f64).sqrt();
        let z = 1.96; // 95% CI
        Self {
            mean,
            std_dev,
            ci_lower: mean - z * stderr,
            ci_upper: mean + z * stderr,
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        }
    }

    pub fn half_width(&self) -> f64 {
        (self.ci_upper - self.ci_lower) / 2.0
    }
}

// ─── Single-Run Result ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub anomaly_score: f64,
    pub seed: u64,
    pub ticks: u64,
    pub emitted: [u64; 3],
    pub dropped: u64,
    pub anomaly_share: f64,
    pub suspicious_share: f64,
    pub mean_in_flight: f64,
    pub peak_in_flight: u32,
    pub final_anomalous_neurons: u32,
    pub elapsed_ms: u128,
}

// ─── Per-Score Aggregation ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub anomaly_score: f64,
    pub n_runs: usize,
    pub anomaly_share: Stats,
    pub suspicious_share: Stats,
    pub mean_in_flight: Stats,
    pub dropped: Stats,
    pub individual_runs: Vec<RunResult>,
}

// ─── Top-Level Report ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CalibrationReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub n_runs_per_score: usize,
    pub ticks_per_run: u64,
    /// True when the mean anomaly share never decreases as the score rises.
    pub monotonic: bool,
    pub scores: Vec<ScoreReport>,
}
