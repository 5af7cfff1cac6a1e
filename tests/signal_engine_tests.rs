#[cfg(test)]
mod tests {
    use neural_traffic_engine::config::{ConnectivityConfig, PopulationConfig, SchedulerConfig};
    use neural_traffic_engine::connectivity::{build_connections, ConnectionSet};
    use neural_traffic_engine::population::Population;
    use neural_traffic_engine::scheduler::{SignalScheduler, TickInput};
    use neural_traffic_engine::traffic::TrafficSnapshot;
    use neural_traffic_engine::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    fn sim(seed: u64) -> SimulationContext {
        SimulationContext::with_seed(EngineConfig::default(), seed).unwrap()
    }

    /// Drive `ticks` signal ticks and traffic updates on the default periods.
    fn run(sim: &mut SimulationContext, ticks: u64) {
        sim.set_active(true, 0);
        sim.run_ticks(0, ticks);
    }

    // ========== Connectivity ==========

    #[test]
    fn test_connections_always_point_forward() {
        for seed in 0..25 {
            let s = sim(seed);
            for c in s.connections() {
                let src = s.neuron(c.id.source).unwrap();
                let tgt = s.neuron(c.id.target).unwrap();
                assert!(src.layer < tgt.layer, "{} goes backwards", c.id);
                assert_ne!(src.layer, tgt.layer);
                assert_eq!(src.layer.next(), Some(tgt.layer), "{} skips a layer", c.id);
            }
        }
    }

    #[test]
    fn test_rebuild_replaces_connection_set() {
        let mut s = sim(1);
        s.set_active(true, 0);
        s.set_anomaly_score(1.0);
        s.run_ticks(0, 5);
        s.rebuild_connections();
        assert!(s.connections().iter().all(|c| !c.active && c.last_signal.is_none()));
        // Every listed id on a neuron exists in the new set
        for n in s.neurons() {
            for id in &n.connections {
                assert!(s.connection_set().get(*id).is_some());
            }
        }
    }

    // ========== Inactive Idempotence ==========

    #[test]
    fn test_inactive_ticks_change_nothing() {
        let mut s = sim(2);
        s.set_anomaly_score(0.7);
        run(&mut s, 50);
        s.set_active(false, 5000);

        let neurons_before: Vec<_> = s
            .neurons()
            .iter()
            .map(|n| (n.traffic_state, n.intensity, n.spike_count))
            .collect();
        let signals_before = s.signals().len();

        for t in 0..20 {
            s.tick_signals(5000 + t * 100);
            assert!(!s.update_traffic_states());
        }
        let neurons_after: Vec<_> = s
            .neurons()
            .iter()
            .map(|n| (n.traffic_state, n.intensity, n.spike_count))
            .collect();
        assert_eq!(neurons_before, neurons_after);
        assert_eq!(signals_before, 0);
        assert!(s.signals().is_empty());
    }

    // ========== Bounded Buffering ==========

    #[test]
    fn test_in_flight_growth_bounded_by_cap() {
        let mut s = sim(3);
        s.set_anomaly_score(1.0);
        s.set_active(true, 0);
        let cap = s.config().scheduler.max_new_signals;
        for k in 1..=300u64 {
            let before = s.signals().len();
            let result = s.tick_signals(k * 100);
            assert!(s.signals().len() <= before + cap);
            assert!(result.emitted_total() as usize <= cap);
        }
    }

    #[test]
    fn test_progress_is_monotonic_until_removal() {
        let mut s = sim(4);
        s.set_anomaly_score(0.6);
        s.set_active(true, 0);
        let mut last: HashMap<u64, f64> = HashMap::new();
        for k in 1..=200u64 {
            s.tick_signals(k * 100);
            let mut seen = HashMap::new();
            for sig in s.signals() {
                assert!(sig.progress < 1.0);
                if let Some(prev) = last.get(&sig.id) {
                    assert!(sig.progress >= *prev);
                }
                seen.insert(sig.id, sig.progress);
            }
            last = seen;
        }
    }

    // ========== Classification Scenarios ==========

    #[test]
    fn test_zero_score_produces_no_anomalies() {
        let config = EngineConfig {
            population: PopulationConfig {
                input: 6,
                hidden: 8,
                output: 4,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut s = SimulationContext::with_seed(config, 42).unwrap();
        s.set_anomaly_score(0.0);
        run(&mut s, 100);
        let stats = s.stats();
        assert_eq!(stats.signal_ticks, 100);
        assert_eq!(stats.signals_emitted[TrafficState::Anomaly.index()], 0);
        assert!(s
            .signals()
            .iter()
            .all(|sig| sig.classification != TrafficState::Anomaly));
    }

    #[test]
    fn test_anomaly_share_rises_with_score() {
        let mut low_total = [0u64; 3];
        let mut high_total = [0u64; 3];
        for seed in 0..5 {
            let mut low = sim(seed);
            low.set_anomaly_score(0.1);
            run(&mut low, 200);
            let mut high = sim(seed);
            high.set_anomaly_score(0.9);
            run(&mut high, 200);
            for i in 0..3 {
                low_total[i] += low.stats().signals_emitted[i];
                high_total[i] += high.stats().signals_emitted[i];
            }
        }
        let share = |t: [u64; 3]| t[2] as f64 / t.iter().sum::<u64>().max(1) as f64;
        assert!(high_total.iter().sum::<u64>() > 0);
        assert!(
            share(high_total) > share(low_total) + 0.05,
            "high {:.3} vs low {:.3}",
            share(high_total),
            share(low_total)
        );
    }

    // ========== Connection Decay ==========

    #[test]
    fn test_connection_inactive_after_staleness_window() {
        let cfg = SchedulerConfig {
            base_fire_rate: 0.0,
            anomaly_fire_scale: 0.0,
            ..Default::default()
        };
        let window = cfg.staleness_window_ms;
        let mut pop = Population::new(&PopulationConfig {
            input: 1,
            hidden: 1,
            output: 1,
            ..Default::default()
        });
        let mut set = ConnectionSet::from_connections(vec![Connection::new(
            ConnectionId::new(0, 1),
            Layer::Input,
            Layer::Hidden,
            0.9,
        )]);
        let t = 50_000;
        if let Some(c) = set.get_mut(ConnectionId::new(0, 1)) {
            c.active = true;
            c.last_signal = Some(t);
        }
        let mut sched = SignalScheduler::new(cfg);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let snap = TrafficSnapshot::default();
        let at = |now_ms| TickInput {
            now_ms,
            anomaly_score: 0.0,
            active: true,
        };

        sched.tick(at(t + window - 1), &mut pop, &mut set, Vec::new(), &snap, &mut rng);
        assert!(set.get(ConnectionId::new(0, 1)).unwrap().active);
        sched.tick(at(t + window + 1), &mut pop, &mut set, Vec::new(), &snap, &mut rng);
        assert!(!set.get(ConnectionId::new(0, 1)).unwrap().active);
    }

    // ========== Cancellation ==========

    #[test]
    fn test_deactivate_mid_run_clears_signals() {
        let mut s = sim(5);
        s.set_anomaly_score(0.8);
        run(&mut s, 40);
        assert!(!s.signals().is_empty(), "expected signals in flight");
        s.set_active(false, 4000);
        assert!(s.signals().is_empty());
        assert_eq!(s.stats().in_flight, 0);

        // Restart resumes without resetting neurons or connectivity
        let edges = s.connections().len();
        s.set_active(true, 4000);
        s.run_ticks(4000, 20);
        assert_eq!(s.connections().len(), edges);
        assert_eq!(s.stats().signal_ticks, 60);
    }

    // ========== Host Clock ==========

    #[test]
    fn test_clock_gap_does_not_replay_missed_ticks() {
        let mut s = sim(6);
        s.set_anomaly_score(0.9);
        run(&mut s, 10);
        let in_flight = s.signals().len();

        // An hour with the host clock stalled, e.g. a background tab
        let results = s.advance(1000 + 3_600_000);
        assert_eq!(results.len(), 1);
        assert_eq!(s.stats().signal_ticks, 11);
        assert_eq!(s.stats().traffic_updates, 1);
        assert!(s.signals().len() <= in_flight + s.config().scheduler.max_new_signals);
    }

    #[test]
    fn test_backwards_speed_config_never_builds() {
        let mut config = EngineConfig::default();
        config.scheduler.base_speed = -0.02;
        config.scheduler.speed_jitter = 0.0;
        config.traffic.layer_weights = [-1.0, -1.0, -1.0];
        assert!(matches!(
            SimulationContext::with_seed(config, 0),
            Err(EngineError::Config(ConfigError::OutOfBounds { name: "base_speed", .. }))
        ));
    }

    // ========== Degenerate Inputs ==========

    #[test]
    fn test_empty_population_ticks_are_noops() {
        let config = EngineConfig {
            population: PopulationConfig {
                input: 0,
                hidden: 0,
                output: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut s = SimulationContext::with_seed(config, 0).unwrap();
        s.set_anomaly_score(1.0);
        run(&mut s, 50);
        assert!(s.connections().is_empty());
        assert!(s.signals().is_empty());
        assert_eq!(s.stats().signals_emitted, [0, 0, 0]);
    }

    #[test]
    fn test_functional_build_then_tick() {
        let mut pop = Population::new(&PopulationConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(77);
        let mut set = build_connections(pop.neurons(), &ConnectivityConfig::default(), &mut rng);
        let mut sched = SignalScheduler::new(SchedulerConfig::default());
        let snap = TrafficSnapshot::capture(&pop);
        let mut signals = Vec::new();
        for k in 0..50u64 {
            let (next, _) = sched.tick(
                TickInput {
                    now_ms: k * 100,
                    anomaly_score: 0.5,
                    active: true,
                },
                &mut pop,
                &mut set,
                signals,
                &snap,
                &mut rng,
            );
            signals = next;
        }
        for sig in &signals {
            assert!(set.get(sig.connection).is_some());
            assert!((sig.intensity - set.get(sig.connection).unwrap().strength).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = EngineConfig::default();
        config.traffic.tick_ms = 0;
        assert!(matches!(
            SimulationContext::new(config),
            Err(EngineError::Config(ConfigError::ZeroTickPeriod("traffic")))
        ));
    }
}
