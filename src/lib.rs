// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Neural Traffic Simulation Suite - Signal Propagation Engine

pub mod types;
pub mod config;
pub mod population;
pub mod connectivity;
pub mod scheduler;
pub mod traffic;
pub mod simulation;

pub use types::*;
pub use config::{ConfigError, EngineConfig};
pub use simulation::{EngineError, SimulationContext};

use wasm_bindgen::prelude::*;

use crate::config::PopulationConfig;

// ─── WASM Interface ──────────────────────────────────────────────────────────

/// Browser handle over one [`SimulationContext`].
///
/// Times are host milliseconds (`performance.now()` or `Date.now()`).
#[wasm_bindgen]
pub struct SignalSimulation {
    ctx: SimulationContext,
}

#[wasm_bindgen]
impl SignalSimulation {
    #[wasm_bindgen(constructor)]
    pub fn new(input: u32, hidden: u32, output: u32) -> Result<SignalSimulation, JsError> {
        let mut config = EngineConfig::default();
        config.population = PopulationConfig {
            input,
            hidden,
            output,
            ..config.population
        };
        Self::build(config)
    }

    /// Construct from a (partial) `EngineConfig` object; missing fields take defaults.
    pub fn from_config(config: JsValue) -> Result<SignalSimulation, JsError> {
        let config: EngineConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Self::build(config)
    }

    pub fn set_anomaly_score(&mut self, score: f64) {
        self.ctx.set_anomaly_score(score);
    }

    pub fn set_active(&mut self, active: bool, now_ms: f64) {
        self.ctx.set_active(active, ms(now_ms));
    }

    pub fn is_active(&self) -> bool {
        self.ctx.is_active()
    }

    /// Run one signal tick immediately, outside the timers.
    pub fn tick(&mut self, now_ms: f64) -> JsValue {
        let result = self.ctx.tick_signals(ms(now_ms));
        serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
    }

    /// Run the timer firings due by `now_ms`; returns the signal tick results.
    /// Missed firings after a stalled clock coalesce into one.
    pub fn advance(&mut self, now_ms: f64) -> JsValue {
        let results = self.ctx.advance(ms(now_ms));
        serde_wasm_bindgen::to_value(&results).unwrap_or(JsValue::NULL)
    }

    pub fn update_traffic(&mut self) -> bool {
        self.ctx.update_traffic_states()
    }

    pub fn get_neurons(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self.ctx.neurons()).unwrap_or(JsValue::NULL)
    }

    pub fn get_connections(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self.ctx.connections()).unwrap_or(JsValue::NULL)
    }

    pub fn get_signals(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self.ctx.signals()).unwrap_or(JsValue::NULL)
    }

    pub fn get_stats(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.ctx.stats()).unwrap_or(JsValue::NULL)
    }

    pub fn get_config(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self.ctx.config()).unwrap_or(JsValue::NULL)
    }

    pub fn get_neuron(&self, id: u32) -> Result<JsValue, JsError> {
        let neuron = self.ctx.neuron(id).map_err(|e| JsError::new(&e.to_string()))?;
        Ok(serde_wasm_bindgen::to_value(neuron).unwrap_or(JsValue::NULL))
    }

    pub fn rebuild_connections(&mut self) {
        self.ctx.rebuild_connections();
    }

    /// Run `ticks` signal periods from `now_ms` without returning results
    /// (fast batch mode). Returns the clock value reached.
    pub fn run_batch(&mut self, ticks: u32, now_ms: f64) -> f64 {
        self.run_batch_core(ticks, ms(now_ms)) as f64
    }

    /// Reset simulation to a fresh population under the same config
    pub fn reset(&mut self) {
        self.ctx.reset();
    }
}

// ─── Internal Logic (Testable, pure Rust) ────────────────────────────────────

impl SignalSimulation {
    fn build(config: EngineConfig) -> Result<SignalSimulation, JsError> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let ctx = SimulationContext::new(config).map_err(|e| JsError::new(&e.to_string()))?;
        Ok(Self { ctx })
    }

    pub fn from_context(ctx: SimulationContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SimulationContext {
        &mut self.ctx
    }

    pub fn run_batch_core(&mut self, ticks: u32, now_ms: u64) -> u64 {
        self.ctx.run_ticks(now_ms, ticks as u64)
    }
}

/// Host clock values arrive as JS numbers.
fn ms(now_ms: f64) -> u64 {
    if now_ms.is_finite() && now_ms > 0.0 {
        now_ms as u64
    } else {
        0
    }
}
