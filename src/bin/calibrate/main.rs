// Signal Calibration Runner: anomaly-score response sweep
// Monte Carlo per score, seedable PRNG, optional per-tick JSONL trail
//
// Usage:
//   cargo run --release --bin calibrate                       # Default sweep (20 runs per score)
//   cargo run --release --bin calibrate -- --runs 5           # Quick mode
//   cargo run --release --bin calibrate -- --ticks 500        # Longer runs
//   cargo run --release --bin calibrate -- --config cfg.json  # Engine config overrides
//   cargo run --release --bin calibrate -- --time-series      # Enable JSONL output
//   cargo run --release --bin calibrate -- 0.2 0.8            # Explicit scores

mod monte_carlo;
mod report;
mod time_series;

use neural_traffic_engine::EngineConfig;
use report::*;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SCORES: [f64; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    runs: usize,
    ticks: u64,
    seed: u64,
    time_series: bool,
    config: Option<PathBuf>,
    scores: Vec<f64>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        runs: 20,
        ticks: 200,
        seed: 0,
        time_series: false,
        config: None,
        scores: Vec::new(),
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" => {
                i += 1;
                if i < args.len() {
                    cli.runs = args[i].parse().unwrap_or(20);
                }
            }
            "--ticks" => {
                i += 1;
                if i < args.len() {
                    cli.ticks = args[i].parse().unwrap_or(200);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            "--config" => {
                i += 1;
                if i < args.len() {
                    cli.config = Some(PathBuf::from(&args[i]));
                }
            }
            "--time-series" => {
                cli.time_series = true;
            }
            arg if !arg.starts_with('-') => match arg.parse::<f64>() {
                Ok(score) => cli.scores.push(score.clamp(0.0, 1.0)),
                Err(_) => eprintln!("Ignoring non-numeric score: {}", arg),
            },
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    if cli.scores.is_empty() {
        cli.scores = DEFAULT_SCORES.to_vec();
    }
    cli.scores.sort_by(|a, b| a.total_cmp(b));
    cli
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn Error>> {
    let config = match path {
        Some(p) => serde_json::from_str(&std::fs::read_to_string(p)?)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = parse_args();
    let config = load_config(cli.config.as_deref())?;
    let ts_dir = cli
        .time_series
        .then(|| PathBuf::from("calibration-results/time-series"));

    println!("\n  Signal Calibration Runner v0.1.0");
    println!("  PRNG: ChaCha8Rng | Runs/score: {} | Ticks/run: {} | Base seed: {}",
        cli.runs, cli.ticks, cli.seed);
    println!("  {:>6} {:>16} {:>16} {:>12} {:>8}",
        "Score", "Anomaly%", "Suspicious%", "InFlight", "Dropped");
    println!("  {}", "-".repeat(62));

    let suite_start = Instant::now();
    let mut reports = Vec::with_capacity(cli.scores.len());
    for &score in &cli.scores {
        let report = monte_carlo::run_monte_carlo(
            &config,
            score,
            cli.ticks,
            cli.runs,
            cli.seed,
            ts_dir.as_deref(),
        )?;
        println!("  {:>6.2} {:>9.2}±{:<6.2} {:>9.2}±{:<6.2} {:>12.1} {:>8.1}",
            score,
            report.anomaly_share.mean * 100.0, report.anomaly_share.half_width() * 100.0,
            report.suspicious_share.mean * 100.0, report.suspicious_share.half_width() * 100.0,
            report.mean_in_flight.mean,
            report.dropped.mean,
        );
        reports.push(report);
    }

    let monotonic = monte_carlo::is_monotonic(&reports);
    println!("  {}", "-".repeat(62));
    println!("  Monotonic anomaly response: {}  Suite time: {:.1}s\n",
        if monotonic { "YES" } else { "NO" },
        suite_start.elapsed().as_secs_f64());

    // ─── Write JSON Report ──────────────────────────────────────────────

    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis().to_string();
    let report = CalibrationReport {
        timestamp: timestamp.clone(),
        version: "0.1.0",
        prng: "ChaCha8Rng",
        n_runs_per_score: cli.runs,
        ticks_per_run: cli.ticks,
        monotonic,
        scores: reports,
    };

    let dir = Path::new("calibration-results");
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("calibration-{}.json", timestamp));
    std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
    info!(path = %path.display(), "calibration report written");
    println!("  Results saved to: {}\n", path.display());

    if !monotonic {
        std::process::exit(1);
    }
    Ok(())
}
