// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Neural Traffic Simulation Suite - Neuron Population

use crate::config::PopulationConfig;
use crate::types::{Layer, Neuron, Point, TrafficState};

/// Fixed-size neuron population partitioned into ordered layers.
///
/// Neuron ids are dense and assigned layer by layer, so `neurons[id]` is the
/// neuron with that id.
#[derive(Debug, Clone)]
pub struct Population {
    neurons: Vec<Neuron>,
    layout: PopulationConfig,
}

impl Population {
    pub fn new(config: &PopulationConfig) -> Self {
        let mut neurons = Vec::with_capacity(config.total() as usize);
        for layer in Layer::ALL {
            for index in 0..config.count(layer) {
                let id = neurons.len() as u32;
                neurons.push(Neuron::new(id, layer, index));
            }
        }
        Self {
            neurons,
            layout: config.clone(),
        }
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neurons_mut(&mut self) -> &mut [Neuron] {
        &mut self.neurons
    }

    pub fn get(&self, id: u32) -> Option<&Neuron> {
        self.neurons.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &Neuron> {
        self.neurons.iter().filter(move |n| n.layer == layer)
    }

    pub fn layout(&self) -> &PopulationConfig {
        &self.layout
    }

    /// Render position of a neuron: layers are evenly spaced columns, neurons
    /// evenly spaced within their column.
    pub fn position_of(&self, neuron: &Neuron) -> Point {
        layout_position(&self.layout, neuron.layer, neuron.index)
    }

    pub fn position(&self, id: u32) -> Option<Point> {
        self.get(id).map(|n| self.position_of(n))
    }

    /// Per-neuron (state, intensity) copy taken at the start of a signal tick.
    pub fn snapshot(&self) -> Vec<(TrafficState, f64)> {
        self.neurons
            .iter()
            .map(|n| (n.traffic_state, n.intensity))
            .collect()
    }

    /// Neuron counts per traffic state (normal, suspicious, anomaly).
    pub fn state_counts(&self) -> [u32; 3] {
        let mut counts = [0u32; 3];
        for n in &self.neurons {
            counts[n.traffic_state.index()] += 1;
        }
        counts
    }
}

pub fn layout_position(layout: &PopulationConfig, layer: Layer, index: u32) -> Point {
    let columns = Layer::ALL.len() as f64 + 1.0;
    let rows = layout.count(layer) as f64 + 1.0;
    Point {
        x: layout.width * (layer.ordinal() as f64 + 1.0) / columns,
        y: layout.height * (index as f64 + 1.0) / rows,
    }
}
