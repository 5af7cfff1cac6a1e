// Monte Carlo Infrastructure: N seeded runs per anomaly score
// Each score runs N times with seeds base..base+N, computing mean ± 95% CI

use neural_traffic_engine::{EngineConfig, SimulationContext, TrafficState};
use tracing::{info, warn};

use crate::report::*;
use crate::time_series::{TickSnapshot, TimeSeriesRecorder};

use std::path::Path;
use std::time::Instant;

/// Run one seeded simulation at a fixed anomaly score.
pub fn run_single(
    config: &EngineConfig,
    anomaly_score: f64,
    ticks: u64,
    seed: u64,
    time_series_dir: Option<&Path>,
) -> Result<RunResult, neural_traffic_engine::EngineError> {
    let start = Instant::now();
    let mut sim = SimulationContext::with_seed(config.clone(), seed)?;
    sim.set_anomaly_score(anomaly_score);
    sim.set_active(true, 0);

    let mut time_series = time_series_dir.map(|_| TimeSeriesRecorder::new());
    let mut in_flight_total = 0u64;
    let mut peak_in_flight = 0u32;

    for k in 1..=ticks {
        for result in sim.advance(k * config.scheduler.tick_ms) {
            in_flight_total += result.in_flight as u64;
            peak_in_flight = peak_in_flight.max(result.in_flight);
            if let Some(ts) = time_series.as_mut() {
                ts.record(TickSnapshot::from_tick(&result, &sim.stats(), anomaly_score));
            }
        }
    }

    if let (Some(ts), Some(dir)) = (&time_series, time_series_dir) {
        let path = dir.join(format!("score-{:.2}-seed-{}.jsonl", anomaly_score, seed));
        if let Err(e) = ts.write_jsonl(&path) {
            warn!(path = %path.display(), error = %e, "failed to write time series");
        }
    }

    let stats = sim.stats();
    Ok(RunResult {
        anomaly_score,
        seed,
        ticks,
        emitted: stats.signals_emitted,
        dropped: stats.signals_dropped,
        anomaly_share: stats.proportion(TrafficState::Anomaly),
        suspicious_share: stats.proportion(TrafficState::Suspicious),
        mean_in_flight: in_flight_total as f64 / ticks.max(1) as f64,
        peak_in_flight,
        final_anomalous_neurons: stats.neuron_states[TrafficState::Anomaly.index()],
        elapsed_ms: start.elapsed().as_millis(),
    })
}

/// Run Monte Carlo: N runs at one score, aggregate stats.
pub fn run_monte_carlo(
    config: &EngineConfig,
    anomaly_score: f64,
    ticks: u64,
    n_runs: usize,
    base_seed: u64,
    time_series_dir: Option<&Path>,
) -> Result<ScoreReport, neural_traffic_engine::EngineError> {
    let mut results = Vec::with_capacity(n_runs);
    for i in 0..n_runs {
        results.push(run_single(config, anomaly_score, ticks, base_seed + i as u64, time_series_dir)?);
    }
    let report = aggregate(anomaly_score, results);
    info!(
        anomaly_score,
        anomaly_share = report.anomaly_share.mean,
        suspicious_share = report.suspicious_share.mean,
        "score calibrated"
    );
    Ok(report)
}

fn aggregate(anomaly_score: f64, results: Vec<RunResult>) -> ScoreReport {
    let collect = |f: fn(&RunResult) -> f64| -> Stats {
        Stats::from_samples(&results.iter().map(f).collect::<Vec<_>>())
    };
    ScoreReport {
        anomaly_score,
        n_runs: results.len(),
        anomaly_share: collect(|r| r.anomaly_share),
        suspicious_share: collect(|r| r.suspicious_share),
        mean_in_flight: collect(|r| r.mean_in_flight),
        dropped: collect(|r| r.dropped as f64),
        individual_runs: results,
    }
}

/// Mean anomaly share must not drop as the score rises.
pub fn is_monotonic(reports: &[ScoreReport]) -> bool {
    reports
        .windows(2)
        .all(|w| w[1].anomaly_share.mean >= w[0].anomaly_share.mean)
}
