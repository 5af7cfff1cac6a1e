// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Neural Traffic Simulation Suite - Signal Scheduler

//! Per-tick signal propagation.
//!
//! One tick runs four steps in fixed order:
//!
//! 1. spontaneous input firing along outgoing connections,
//! 2. hidden-layer integrate-and-fire over recently active inputs,
//! 3. aging of in-flight signals plus admission of new ones under the cap,
//! 4. decay of stale connections.
//!
//! Step 2 reads connection state written by step 1 in the same tick, so the
//! order must not change.

use rand::Rng;
use tracing::trace;

use crate::config::SchedulerConfig;
use crate::connectivity::ConnectionSet;
use crate::population::Population;
use crate::traffic::TrafficSnapshot;
use crate::types::{ConnectionId, Layer, Point, Signal, TickResult, TrafficState};

/// Host inputs for one signal tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    pub now_ms: u64,
    pub anomaly_score: f64,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct SignalScheduler {
    config: SchedulerConfig,
    next_signal_id: u64,
}

impl SignalScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            next_signal_id: 0,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run one tick and return the next in-flight signal set.
    ///
    /// While inactive nothing fires or ages and the in-flight set is dropped.
    pub fn tick<R: Rng>(
        &mut self,
        input: TickInput,
        population: &mut Population,
        connections: &mut ConnectionSet,
        signals: Vec<Signal>,
        snapshot: &TrafficSnapshot,
        rng: &mut R,
    ) -> (Vec<Signal>, TickResult) {
        let mut result = TickResult {
            now_ms: input.now_ms,
            ..Default::default()
        };
        if !input.active {
            return (Vec::new(), result);
        }

        let mut fresh = Vec::new();
        result.input_fired = self.fire_inputs(input, population, connections, snapshot, &mut fresh, rng);
        result.hidden_fired = self.integrate_hidden(input, population, connections, &mut fresh, rng);

        let survivors = self.age_signals(signals, fresh, &mut result);
        result.in_flight = survivors.len() as u32;
        result.deactivated_connections = self.decay_connections(input.now_ms, connections);

        (survivors, result)
    }

    // -----------------------------------------------------------------------
    // Step 1: spontaneous input firing
    // -----------------------------------------------------------------------

    fn fire_inputs<R: Rng>(
        &mut self,
        input: TickInput,
        population: &mut Population,
        connections: &mut ConnectionSet,
        snapshot: &TrafficSnapshot,
        fresh: &mut Vec<Signal>,
        rng: &mut R,
    ) -> u32 {
        let base = self.config.base_fire_rate + input.anomaly_score * self.config.anomaly_fire_scale;
        let inputs: Vec<u32> = population.layer(Layer::Input).map(|n| n.id).collect();
        let mut fired = 0;

        for id in inputs {
            let multiplier = self.config.state_fire_multipliers[snapshot.state_of(id).index()];
            if rng.gen::<f64>() >= base * multiplier {
                continue;
            }
            fired += 1;
            population.neurons_mut()[id as usize].record_spike(input.now_ms);

            for slot in connections.outgoing(id).to_vec() {
                if rng.gen::<f64>() >= connections.at(slot).strength {
                    continue;
                }
                let class = self.classify_input(input.anomaly_score, rng);
                let conn = connections.at_mut(slot);
                conn.carry(input.now_ms, class);
                let (cid, strength) = (conn.id, conn.strength);
                fresh.push(self.spawn(population, cid, strength, class, rng));
            }
        }
        fired
    }

    /// Anomaly only above the high threshold, then suspicious above the low one.
    fn classify_input<R: Rng>(&self, score: f64, rng: &mut R) -> TrafficState {
        let c = &self.config;
        if score > c.anomaly_threshold && rng.gen::<f64>() < score * c.anomaly_gain {
            TrafficState::Anomaly
        } else if score > c.suspicious_threshold && rng.gen::<f64>() < score * c.suspicious_gain {
            TrafficState::Suspicious
        } else {
            TrafficState::Normal
        }
    }

    // -----------------------------------------------------------------------
    // Step 2: hidden-layer integrate-and-fire
    // -----------------------------------------------------------------------

    fn integrate_hidden<R: Rng>(
        &mut self,
        input: TickInput,
        population: &mut Population,
        connections: &mut ConnectionSet,
        fresh: &mut Vec<Signal>,
        rng: &mut R,
    ) -> u32 {
        let hidden: Vec<u32> = population.layer(Layer::Hidden).map(|n| n.id).collect();
        let mut fired = 0;

        for id in hidden {
            let mut sum = 0.0;
            let mut anomalous_input = false;
            for &slot in connections.incoming(id) {
                let c = connections.at(slot);
                let recent = c
                    .elapsed_since_signal(input.now_ms)
                    .is_some_and(|dt| dt <= self.config.recency_window_ms);
                if c.active && recent {
                    sum += c.strength;
                    anomalous_input |= c.last_classification == Some(TrafficState::Anomaly);
                }
            }

            // Drawn fresh every tick.
            let threshold = if self.config.hidden_threshold_max > self.config.hidden_threshold_min {
                rng.gen_range(self.config.hidden_threshold_min..=self.config.hidden_threshold_max)
            } else {
                self.config.hidden_threshold_min
            };
            if sum <= threshold {
                continue;
            }
            fired += 1;
            population.neurons_mut()[id as usize].record_spike(input.now_ms);

            for slot in connections.outgoing(id).to_vec() {
                if rng.gen::<f64>() >= connections.at(slot).strength {
                    continue;
                }
                let class = if anomalous_input || self.secondary_anomaly(input.anomaly_score, rng) {
                    TrafficState::Anomaly
                } else {
                    TrafficState::Normal
                };
                let conn = connections.at_mut(slot);
                conn.carry(input.now_ms, class);
                let (cid, strength) = (conn.id, conn.strength);
                fresh.push(self.spawn(population, cid, strength, class, rng));
            }
        }
        fired
    }

    fn secondary_anomaly<R: Rng>(&self, score: f64, rng: &mut R) -> bool {
        score > self.config.anomaly_threshold
            && rng.gen::<f64>() < score * self.config.hidden_anomaly_gain
    }

    // -----------------------------------------------------------------------
    // Step 3: aging and admission
    // -----------------------------------------------------------------------

    fn age_signals(
        &self,
        signals: Vec<Signal>,
        mut fresh: Vec<Signal>,
        result: &mut TickResult,
    ) -> Vec<Signal> {
        let before = signals.len();
        let mut survivors: Vec<Signal> = signals
            .into_iter()
            .filter_map(|mut s| {
                s.progress += s.speed;
                (!s.has_arrived()).then_some(s)
            })
            .collect();
        result.arrived = (before - survivors.len()) as u32;

        let cap = self.config.max_new_signals;
        if fresh.len() > cap {
            result.dropped = (fresh.len() - cap) as u32;
            trace!(dropped = result.dropped, cap, "new signals over per-tick cap");
            fresh.truncate(cap);
        }
        for s in &fresh {
            result.emitted[s.classification.index()] += 1;
        }
        survivors.extend(fresh);
        survivors
    }

    // -----------------------------------------------------------------------
    // Step 4: connection decay
    // -----------------------------------------------------------------------

    fn decay_connections(&self, now_ms: u64, connections: &mut ConnectionSet) -> u32 {
        let mut cleared = 0;
        for c in connections.iter_mut() {
            if c.active && is_stale(c.elapsed_since_signal(now_ms), self.config.staleness_window_ms) {
                c.active = false;
                cleared += 1;
            }
        }
        cleared
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn spawn<R: Rng>(
        &mut self,
        population: &Population,
        connection: ConnectionId,
        strength: f64,
        class: TrafficState,
        rng: &mut R,
    ) -> Signal {
        let id = self.next_signal_id;
        self.next_signal_id += 1;

        let mut speed = self.config.base_speed + rng.gen::<f64>() * self.config.speed_jitter;
        if class == TrafficState::Anomaly {
            speed *= self.config.anomaly_speed_multiplier;
        }
        let origin = population.position(connection.source).unwrap_or(ORIGIN);
        let destination = population.position(connection.target).unwrap_or(ORIGIN);

        Signal {
            id,
            connection,
            from: origin,
            to: destination,
            progress: 0.0,
            speed,
            intensity: strength,
            classification: class,
        }
    }
}

const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

/// A connection is stale once strictly more than `window_ms` has passed
/// since its last signal. Never-used connections are stale.
pub fn is_stale(elapsed_ms: Option<u64>, window_ms: u64) -> bool {
    elapsed_ms.map_or(true, |dt| dt > window_ms)
}
