// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Neural Traffic Simulation Suite - Simulation Context

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::{ConfigError, EngineConfig, PopulationConfig};
use crate::connectivity::{build_connections, link_neurons, ConnectionSet};
use crate::population::Population;
use crate::scheduler::{SignalScheduler, TickInput};
use crate::traffic::{TrafficSnapshot, TrafficStateUpdater};
use crate::types::*;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("unknown neuron {0}")]
    UnknownNeuron(u32),
}

// ---------------------------------------------------------------------------
// PeriodicTimer
// ---------------------------------------------------------------------------

/// Repeating timer on the host's millisecond clock.
///
/// Missed firings coalesce: however long the host clock stalls, one call to
/// [`take_due`](Self::take_due) yields at most one firing.
#[derive(Debug, Clone)]
pub struct PeriodicTimer {
    period_ms: u64,
    next_due: Option<u64>,
}

impl PeriodicTimer {
    /// A zero period is rejected here as well as by [`EngineConfig::validate`],
    /// since the timer can be built on its own.
    pub fn new(period_ms: u64) -> Result<Self, ConfigError> {
        if period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod("timer"));
        }
        Ok(Self {
            period_ms,
            next_due: None,
        })
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// First firing one period after `now_ms`. A clock too close to
    /// `u64::MAX` for another period leaves the timer unarmed.
    pub fn arm(&mut self, now_ms: u64) {
        self.next_due = now_ms.checked_add(self.period_ms);
    }

    pub fn suspend(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.next_due
    }

    /// Consume the firing due at or before `now_ms`, returning its timestamp.
    ///
    /// When more than one period was missed, only the latest missed boundary
    /// fires and the timer re-aligns to the next boundary after `now_ms`.
    pub fn take_due(&mut self, now_ms: u64) -> Option<u64> {
        let due = self.next_due.filter(|&t| t <= now_ms)?;
        let missed = (now_ms - due) / self.period_ms;
        let fired = due.saturating_add(missed.saturating_mul(self.period_ms));
        self.next_due = fired.checked_add(self.period_ms);
        Some(fired)
    }
}

// ---------------------------------------------------------------------------
// SimulationContext
// ---------------------------------------------------------------------------

/// Owns everything one running simulation needs. Both periodic processes
/// receive it explicitly; there is no shared global state.
pub struct SimulationContext {
    pub(crate) config: EngineConfig,
    pub(crate) population: Population,
    pub(crate) connections: ConnectionSet,
    pub(crate) signals: Vec<Signal>,
    pub(crate) snapshot: TrafficSnapshot,
    pub(crate) scheduler: SignalScheduler,
    pub(crate) traffic: TrafficStateUpdater,
    pub(crate) signal_timer: PeriodicTimer,
    pub(crate) traffic_timer: PeriodicTimer,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) anomaly_score: f64,
    pub(crate) active: bool,
    pub(crate) stats: SimStats,
}

impl SimulationContext {
    /// Entropy-seeded simulation.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }

    /// Reproducible simulation for tests and calibration runs.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self, EngineError> {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn with_rng(config: EngineConfig, mut rng: ChaCha8Rng) -> Result<Self, EngineError> {
        config.validate()?;
        let signal_timer = PeriodicTimer::new(config.scheduler.tick_ms)?;
        let traffic_timer = PeriodicTimer::new(config.traffic.tick_ms)?;

        let mut population = Population::new(&config.population);
        let connections = build_connections(population.neurons(), &config.connectivity, &mut rng);
        link_neurons(population.neurons_mut(), &connections);
        let snapshot = TrafficSnapshot::capture(&population);

        Ok(Self {
            scheduler: SignalScheduler::new(config.scheduler.clone()),
            traffic: TrafficStateUpdater::new(config.traffic.clone()),
            config,
            population,
            connections,
            signals: Vec::new(),
            snapshot,
            signal_timer,
            traffic_timer,
            rng,
            anomaly_score: 0.0,
            active: false,
            stats: SimStats::default(),
        })
    }

    // ── Host inputs ────────────────────────────────────────────────────────

    /// Range is the caller's responsibility.
    pub fn set_anomaly_score(&mut self, score: f64) {
        self.anomaly_score = score;
    }

    /// Start or stop both periodic processes.
    ///
    /// Stopping drops every in-flight signal immediately; neuron and
    /// connection state is kept so a restart resumes where it left off.
    pub fn set_active(&mut self, active: bool, now_ms: u64) {
        if active == self.active {
            return;
        }
        self.active = active;
        if active {
            self.signal_timer.arm(now_ms);
            self.traffic_timer.arm(now_ms);
            debug!(now_ms, "simulation started");
        } else {
            let discarded = self.signals.len();
            self.signals.clear();
            self.stats.in_flight = 0;
            self.signal_timer.suspend();
            self.traffic_timer.suspend();
            debug!(now_ms, discarded, "simulation stopped");
        }
    }

    // ── Periodic processes ─────────────────────────────────────────────────

    /// One Signal Scheduler tick at `now_ms`.
    pub fn tick_signals(&mut self, now_ms: u64) -> TickResult {
        let input = TickInput {
            now_ms,
            anomaly_score: self.anomaly_score,
            active: self.active,
        };
        if !self.active {
            return TickResult {
                now_ms,
                ..Default::default()
            };
        }
        let signals = std::mem::take(&mut self.signals);
        let (next, result) = self.scheduler.tick(
            input,
            &mut self.population,
            &mut self.connections,
            signals,
            &self.snapshot,
            &mut self.rng,
        );
        self.signals = next;
        self.stats.record_tick(&result);
        result
    }

    /// One Traffic State Updater tick; publishes a fresh snapshot.
    pub fn update_traffic_states(&mut self) -> bool {
        let updated =
            self.traffic
                .update(&mut self.population, self.anomaly_score, self.active, &mut self.rng);
        if updated {
            self.snapshot = TrafficSnapshot::capture(&self.population);
            self.stats.traffic_updates += 1;
        }
        updated
    }

    /// Cooperative event loop: run the timer firings due up to `now_ms`, in
    /// timestamp order, each to completion. On a tie the signal tick runs first.
    ///
    /// A clock gap of many periods runs each process once, not once per
    /// missed period.
    pub fn advance(&mut self, now_ms: u64) -> Vec<TickResult> {
        let mut results = Vec::new();
        while self.active {
            let signal_due = self.signal_timer.next_due().filter(|&t| t <= now_ms);
            let traffic_due = self.traffic_timer.next_due().filter(|&t| t <= now_ms);
            match (signal_due, traffic_due) {
                (Some(s), Some(t)) if t < s => {
                    self.traffic_timer.take_due(now_ms);
                    self.update_traffic_states();
                }
                (Some(_), _) => {
                    if let Some(at) = self.signal_timer.take_due(now_ms) {
                        results.push(self.tick_signals(at));
                    }
                }
                (None, Some(_)) => {
                    self.traffic_timer.take_due(now_ms);
                    self.update_traffic_states();
                }
                (None, None) => break,
            }
        }
        results
    }

    /// Step the clock one signal period at a time for `ticks` periods after
    /// `from_ms`, advancing at each boundary. Returns the clock reached.
    pub fn run_ticks(&mut self, from_ms: u64, ticks: u64) -> u64 {
        let period = self.config.scheduler.tick_ms;
        let mut now = from_ms;
        for k in 1..=ticks {
            now = from_ms.saturating_add(k.saturating_mul(period));
            self.advance(now);
        }
        now
    }

    // ── Topology ───────────────────────────────────────────────────────────

    /// Replace the connection set wholesale.
    pub fn rebuild_connections(&mut self) {
        self.connections =
            build_connections(self.population.neurons(), &self.config.connectivity, &mut self.rng);
        link_neurons(self.population.neurons_mut(), &self.connections);
    }

    /// Replace the population and everything derived from it.
    pub fn regenerate_population(&mut self, config: PopulationConfig) -> Result<(), EngineError> {
        let mut next = self.config.clone();
        next.population = config;
        next.validate()?;
        self.config = next;
        self.population = Population::new(&self.config.population);
        self.signals.clear();
        self.snapshot = TrafficSnapshot::capture(&self.population);
        self.rebuild_connections();
        Ok(())
    }

    /// Fresh population and connectivity under the same config; stats zeroed.
    /// The active flag and anomaly score are kept.
    pub fn reset(&mut self) {
        self.population = Population::new(&self.config.population);
        self.signals.clear();
        self.snapshot = TrafficSnapshot::capture(&self.population);
        self.scheduler = SignalScheduler::new(self.config.scheduler.clone());
        self.stats = SimStats::default();
        self.rebuild_connections();
    }

    // ── Read accessors ─────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn neurons(&self) -> &[Neuron] {
        self.population.neurons()
    }

    pub fn neuron(&self, id: u32) -> Result<&Neuron, EngineError> {
        self.population.get(id).ok_or(EngineError::UnknownNeuron(id))
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn connections(&self) -> &[Connection] {
        self.connections.as_slice()
    }

    pub fn connection_set(&self) -> &ConnectionSet {
        &self.connections
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn snapshot(&self) -> &TrafficSnapshot {
        &self.snapshot
    }

    pub fn anomaly_score(&self) -> f64 {
        self.anomaly_score
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stats(&self) -> SimStats {
        let mut stats = self.stats.clone();
        stats.in_flight = self.signals.len() as u32;
        stats.active_connections = self.connections.active_count() as u32;
        stats.neuron_states = self.population.state_counts();
        stats
    }
}
