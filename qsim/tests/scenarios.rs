use float_cmp::approx_eq;
use quickcheck_macros::quickcheck;
use rstest::{fixture, rstest};

use qsim::{
    ConfigError, CustomerStatus, DiscreteSampler, RunStatistics, Simulation, SimulationConfig,
    Tick,
};

fn config(servers: usize, horizon: Tick, seed: u64) -> SimulationConfig {
    SimulationConfig {
        servers,
        horizon,
        seed,
        tick_log: true,
    }
}

fn constant_run(servers: usize, horizon: Tick, gap: i64, service: i64) -> Simulation {
    let mut simulation = Simulation::new(
        config(servers, horizon, 0),
        DiscreteSampler::constant(gap),
        DiscreteSampler::constant(service),
    )
    .unwrap();
    simulation.run();
    simulation
}

fn inter_arrival_table() -> DiscreteSampler {
    DiscreteSampler::new(vec![(1, 0.3), (2, 0.4), (4, 0.3)]).unwrap()
}

fn service_table() -> DiscreteSampler {
    DiscreteSampler::new(vec![(1, 0.2), (3, 0.5), (6, 0.3)]).unwrap()
}

#[fixture]
fn inter_arrival() -> DiscreteSampler {
    inter_arrival_table()
}

#[fixture]
fn service() -> DiscreteSampler {
    service_table()
}

/// Checks everything that must hold for any run that has drained.
fn assert_drained(simulation: &Simulation) {
    let stats = simulation.statistics().expect("simulation has not run");
    assert_eq!(simulation.pending_events(), 0);
    assert_eq!(simulation.queue_len(), 0);
    assert_eq!(stats.arrived, stats.completed);
    assert_eq!(stats.arrived, simulation.customers().len());

    for customer in simulation.customers() {
        assert_eq!(customer.status(), CustomerStatus::Departed);
        let start = customer.start().unwrap();
        let service = customer.service().unwrap();
        let departure = customer.departure().unwrap();
        assert!(start >= customer.arrival());
        assert!(customer.arrival() <= simulation.config().horizon);
        assert_eq!(departure, start + service);
        assert!(customer.server().is_some());
    }

    assert!((0.0..=1.0).contains(&stats.avg_utilization));
    assert!((0.0..=1.0).contains(&stats.p_wait));
    assert!(stats.avg_queue >= 0.0);

    assert_eq!(stats.queue_length_sum, stats.total_wait);
    assert_eq!(stats.busy_server_sum, stats.total_service);
    assert_eq!(stats.total_system, stats.total_wait + stats.total_service);

    let log = simulation.tick_log();
    assert_eq!(log.len() as u64, stats.ticks);
    assert!(log.iter().all(|r| r.queue_length <= stats.max_queue));
    assert_eq!(log.iter().map(|r| r.arrivals).sum::<usize>(), stats.arrived);
    assert_eq!(log.iter().map(|r| r.starts).sum::<usize>(), stats.arrived);
    assert_eq!(log.iter().map(|r| r.departures).sum::<usize>(), stats.completed);
    assert_eq!(
        log.iter().map(|r| r.queue_length as u64).sum::<u64>(),
        stats.queue_length_sum
    );

    let servers = simulation.servers();
    assert_eq!(servers.len(), stats.servers);
    assert!(servers.iter().all(|s| !s.is_busy()));
    assert_eq!(
        servers.iter().map(|s| s.served()).sum::<usize>(),
        stats.completed
    );
    assert_eq!(
        servers.iter().map(|s| s.busy_ticks()).sum::<u64>(),
        stats.total_service
    );
}

#[test]
fn test_single_server_saturation() {
    let simulation = constant_run(1, 20, 1, 5);
    assert_drained(&simulation);
    let stats = simulation.statistics().unwrap();
    assert_eq!(stats.arrived, 20);
    assert_eq!(stats.waited, 19);
    assert_eq!(stats.ticks, 102);
    assert_eq!(stats.max_queue, 16);
    assert_eq!(stats.total_wait, 760);
    assert_eq!(stats.busy_server_sum, 100);
    assert!(approx_eq!(f64, stats.avg_wait, 38.0, ulps = 2));
    assert!(approx_eq!(f64, stats.avg_service, 5.0, ulps = 2));
    assert!(approx_eq!(f64, stats.avg_system, 43.0, ulps = 2));
    assert!(approx_eq!(f64, stats.p_wait, 0.95, ulps = 2));
    assert!(approx_eq!(f64, stats.avg_queue, 760.0 / 102.0, ulps = 2));
    assert!(approx_eq!(f64, stats.avg_utilization, 100.0 / 102.0, ulps = 2));
    assert!(stats.avg_utilization > 0.95);

    // Customer `k` arrives at `1 + k` and waits for `4k` ticks.
    let waits: Vec<_> = simulation
        .customers()
        .iter()
        .map(|c| c.wait().unwrap())
        .collect();
    assert_eq!(waits, (0..20).map(|k| 4 * k).collect::<Vec<Tick>>());
    assert_eq!(simulation.customers()[19].departure(), Some(101));
}

#[test]
fn test_idle_system() {
    let simulation = constant_run(1, 10, 100, 1);
    assert_drained(&simulation);
    let stats = simulation.statistics().unwrap();
    assert!(stats.arrived <= 1);
    assert_eq!(stats.ticks, 11);
    assert_eq!(stats.total_wait, 0);
    assert_eq!(stats.max_queue, 0);
    assert_eq!(stats.avg_wait, 0.0);
    assert_eq!(stats.avg_queue, 0.0);
    assert_eq!(stats.avg_utilization, 0.0);
    assert_eq!(stats.p_wait, 0.0);
}

#[rstest(
    servers,
    horizon,
    expected,
    case(1, 0, ConfigError::ZeroHorizon),
    case(0, 10, ConfigError::NoServers),
    case(0, 0, ConfigError::NoServers)
)]
fn test_invalid_configuration(servers: usize, horizon: Tick, expected: ConfigError) {
    let result = Simulation::new(
        config(servers, horizon, 0),
        DiscreteSampler::constant(1),
        DiscreteSampler::constant(1),
    );
    assert_eq!(result.err(), Some(expected));
}

#[test]
fn test_multi_server_fairness_constant() {
    let simulation = constant_run(3, 100, 10, 3);
    assert_drained(&simulation);
    let stats = simulation.statistics().unwrap();
    assert_eq!(stats.arrived, 10);
    assert_eq!(stats.waited, 0);
    assert_eq!(stats.p_wait, 0.0);
    assert_eq!(stats.max_queue, 0);
    // Every customer finds the first server free again.
    assert_eq!(simulation.servers()[0].served(), 10);
}

#[rstest(seed, case(0), case(1), case(12345), case(u64::max_value()))]
fn test_multi_server_fairness_sparse(seed: u64) {
    let mut simulation = Simulation::new(
        config(3, 200, seed),
        DiscreteSampler::new(vec![(5, 0.5), (6, 0.5)]).unwrap(),
        DiscreteSampler::new(vec![(1, 0.5), (4, 0.5)]).unwrap(),
    )
    .unwrap();
    let stats = simulation.run().clone();
    assert_drained(&simulation);
    assert!(stats.arrived > 0);
    assert_eq!(stats.p_wait, 0.0);
    assert_eq!(stats.total_wait, 0);
}

#[rstest]
fn test_determinism(inter_arrival: DiscreteSampler, service: DiscreteSampler) {
    let run = || {
        let mut simulation = Simulation::new(
            config(2, 480, 12345),
            inter_arrival.clone(),
            service.clone(),
        )
        .unwrap();
        simulation.run();
        simulation
    };
    let first = run();
    let second = run();
    assert_eq!(first.statistics(), second.statistics());
    assert_eq!(first.customers(), second.customers());
    assert_eq!(first.tick_log(), second.tick_log());
}

#[rstest]
fn test_different_seeds_differ(inter_arrival: DiscreteSampler, service: DiscreteSampler) {
    let customers = |seed| {
        let mut simulation =
            Simulation::new(config(2, 480, seed), inter_arrival.clone(), service.clone()).unwrap();
        simulation.run();
        simulation.customers().to_vec()
    };
    assert_ne!(customers(1), customers(2));
}

#[rstest]
fn test_default_configuration(inter_arrival: DiscreteSampler, service: DiscreteSampler) {
    let mut simulation =
        Simulation::new(SimulationConfig::default(), inter_arrival, service).unwrap();
    assert_eq!(simulation.config().servers, 2);
    let stats: RunStatistics = simulation.run().clone();
    assert!(stats.arrived > 0);
    assert!(stats.ticks > 480);
    assert!(simulation.tick_log().is_empty());
    assert_eq!(simulation.statistics(), Some(&stats));
}

#[quickcheck]
fn prop_drained_run_is_consistent(seed: u64, servers: u8, horizon: u8) -> bool {
    let servers = 1 + usize::from(servers % 4);
    let horizon = 1 + Tick::from(horizon % 60);
    let mut simulation = Simulation::new(
        config(servers, horizon, seed),
        inter_arrival_table(),
        service_table(),
    )
    .unwrap();
    simulation.run();
    assert_drained(&simulation);
    true
}
