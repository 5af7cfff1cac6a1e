// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Neural Traffic Simulation Suite - Connectivity Builder

use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

use crate::config::ConnectivityConfig;
use crate::types::{Connection, ConnectionId, Neuron};

/// Directed bipartite edge set between adjacent layers, indexed both ways.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSet {
    connections: Vec<Connection>,
    outgoing: HashMap<u32, Vec<usize>>,
    incoming: HashMap<u32, Vec<usize>>,
    by_id: HashMap<ConnectionId, usize>,
}

impl ConnectionSet {
    pub fn from_connections(connections: Vec<Connection>) -> Self {
        let mut set = Self {
            connections,
            ..Default::default()
        };
        for (idx, c) in set.connections.iter().enumerate() {
            set.outgoing.entry(c.id.source).or_default().push(idx);
            set.incoming.entry(c.id.target).or_default().push(idx);
            set.by_id.insert(c.id, idx);
        }
        set
    }

    pub fn as_slice(&self) -> &[Connection] {
        &self.connections
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.by_id.get(&id).map(|&i| &self.connections[i])
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.by_id.get(&id).map(|&i| &mut self.connections[i])
    }

    /// Slot indices of connections leaving `neuron`.
    pub fn outgoing(&self, neuron: u32) -> &[usize] {
        self.outgoing.get(&neuron).map_or(&[], Vec::as_slice)
    }

    /// Slot indices of connections entering `neuron`.
    pub fn incoming(&self, neuron: u32) -> &[usize] {
        self.incoming.get(&neuron).map_or(&[], Vec::as_slice)
    }

    pub fn at(&self, slot: usize) -> &Connection {
        &self.connections[slot]
    }

    pub fn at_mut(&mut self, slot: usize) -> &mut Connection {
        &mut self.connections[slot]
    }

    pub fn active_count(&self) -> usize {
        self.connections.iter().filter(|c| c.active).count()
    }
}

/// Build the full synaptic edge set for `neurons`.
///
/// Every ordered (source, target) pair across an adjacent layer pair gets an
/// edge with the pair's probability; strengths are uniform over the pair's
/// sub-range. Edges start inactive. The result replaces any previous set.
pub fn build_connections<R: Rng>(
    neurons: &[Neuron],
    config: &ConnectivityConfig,
    rng: &mut R,
) -> ConnectionSet {
    let mut connections = Vec::new();
    let mut per_pair = [0usize; 2];

    for source in neurons {
        let (target_layer, pair) = match (source.layer.next(), config.for_source(source.layer)) {
            (Some(t), Some(p)) => (t, p),
            _ => continue,
        };
        for target in neurons.iter().filter(|n| n.layer == target_layer) {
            if rng.gen::<f64>() >= pair.probability {
                continue;
            }
            let strength = if pair.max_strength > pair.min_strength {
                rng.gen_range(pair.min_strength..=pair.max_strength)
            } else {
                pair.max_strength
            };
            connections.push(Connection::new(
                ConnectionId::new(source.id, target.id),
                source.layer,
                target_layer,
                strength,
            ));
            per_pair[source.layer.ordinal()] += 1;
        }
    }

    debug!(
        input_hidden = per_pair[0],
        hidden_output = per_pair[1],
        "built connectivity"
    );
    ConnectionSet::from_connections(connections)
}

/// Rewrite each neuron's connection-id list from `set`.
pub fn link_neurons(neurons: &mut [Neuron], set: &ConnectionSet) {
    for n in neurons.iter_mut() {
        n.connections.clear();
    }
    for c in set.as_slice() {
        for id in [c.id.source, c.id.target] {
            if let Some(n) = neurons.get_mut(id as usize) {
                n.connections.push(c.id);
            }
        }
    }
}

/// True when `connection` only joins adjacent layers in topology order.
pub fn is_forward_adjacent(connection: &Connection) -> bool {
    connection.source_layer.next() == Some(connection.target_layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayerPairConfig, PopulationConfig};
    use crate::population::Population;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn population() -> Population {
        Population::new(&PopulationConfig::default())
    }

    #[test]
    fn test_edges_only_between_adjacent_layers() {
        let pop = population();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let set = build_connections(pop.neurons(), &ConnectivityConfig::default(), &mut rng);
        assert!(!set.is_empty());
        for c in set.as_slice() {
            let src = pop.get(c.id.source).unwrap();
            let tgt = pop.get(c.id.target).unwrap();
            assert_eq!(src.layer, c.source_layer);
            assert_eq!(tgt.layer, c.target_layer);
            assert!(src.layer < tgt.layer);
            assert!(is_forward_adjacent(c));
        }
    }

    #[test]
    fn test_ids_unique_and_edges_start_inactive() {
        let pop = population();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let set = build_connections(pop.neurons(), &ConnectivityConfig::default(), &mut rng);
        let ids: HashSet<_> = set.as_slice().iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), set.len());
        assert!(set.as_slice().iter().all(|c| !c.active && c.last_signal.is_none()));
    }

    #[test]
    fn test_strength_within_pair_range() {
        let pop = population();
        let cfg = ConnectivityConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let set = build_connections(pop.neurons(), &cfg, &mut rng);
        for c in set.as_slice() {
            let pair = cfg.for_source(c.source_layer).unwrap();
            assert!(c.strength >= pair.min_strength && c.strength <= pair.max_strength);
            assert!(c.strength > 0.0 && c.strength <= 1.0);
        }
    }

    #[test]
    fn test_full_probability_yields_complete_bipartite_graph() {
        let pop = population();
        let full = LayerPairConfig {
            probability: 1.0,
            min_strength: 0.5,
            max_strength: 0.5,
        };
        let cfg = ConnectivityConfig {
            input_hidden: full,
            hidden_output: full,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let set = build_connections(pop.neurons(), &cfg, &mut rng);
        assert_eq!(set.len(), 6 * 8 + 8 * 4);
        assert_eq!(set.outgoing(0).len(), 8);
        assert_eq!(set.incoming(14).len(), 8);
        assert!(set.outgoing(14).is_empty());
    }

    #[test]
    fn test_rebuild_differs_but_stays_similar() {
        let pop = population();
        let cfg = ConnectivityConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let a = build_connections(pop.neurons(), &cfg, &mut rng);
        let b = build_connections(pop.neurons(), &cfg, &mut rng);
        let ids_a: HashSet<_> = a.as_slice().iter().map(|c| c.id).collect();
        let ids_b: HashSet<_> = b.as_slice().iter().map(|c| c.id).collect();
        assert_ne!(ids_a, ids_b);
        // 48 * 0.6 + 32 * 0.8 = 54.4 expected edges
        assert!((35..=75).contains(&a.len()));
        assert!((35..=75).contains(&b.len()));
    }

    #[test]
    fn test_link_neurons_records_both_endpoints() {
        let mut pop = population();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let set = build_connections(pop.neurons(), &ConnectivityConfig::default(), &mut rng);
        link_neurons(pop.neurons_mut(), &set);
        let listed: usize = pop.neurons().iter().map(|n| n.connections.len()).sum();
        assert_eq!(listed, set.len() * 2);
        let first = set.at(0).id;
        assert!(pop.get(first.source).unwrap().connections.contains(&first));
        assert!(pop.get(first.target).unwrap().connections.contains(&first));
    }

    #[test]
    fn test_empty_population_has_no_edges() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let set = build_connections(&[], &ConnectivityConfig::default(), &mut rng);
        assert!(set.is_empty());
        assert!(set.outgoing(0).is_empty());
    }
}
