use std::collections::VecDeque;
use std::convert::TryFrom;

use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, Customer, CustomerId, DiscreteSampler, Event, EventKind, EventLedger,
    RunStatistics, SamplerRole, Server, ServerId, ServerPool, StatsAggregator, Tick,
};

/// Immutable parameters of a single simulation run.
///
/// Missing fields take the default values when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of servers.
    pub servers: usize,
    /// Last tick at which a new customer may arrive. Customers in the system at the horizon are
    /// still served.
    pub horizon: Tick,
    /// Seed of the random number generator.
    pub seed: u64,
    /// Whether to record a [`TickRecord`] for each simulated tick.
    pub tick_log: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            servers: 2,
            horizon: 480,
            seed: 12345,
            tick_log: false,
        }
    }
}

impl SimulationConfig {
    /// Checks that the configuration describes a runnable simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoServers`] or [`ConfigError::ZeroHorizon`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers == 0 {
            Err(ConfigError::NoServers)
        } else if self.horizon == 0 {
            Err(ConfigError::ZeroHorizon)
        } else {
            Ok(())
        }
    }
}

/// A step of processing a single tick.
#[derive(Debug, PartialEq, Eq, Clone, Copy, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Finish services ending at the current tick and free their servers.
    Departures,
    /// Move waiting customers onto idle servers, head of the queue first.
    QueueDrain,
    /// Admit customers arriving at the current tick and schedule the next arrival.
    Arrivals,
    /// Sample queue length and busy servers, and advance the tick counter.
    Accounting,
}

/// The order in which every tick is processed.
///
/// Departures go first, so that a server vacated at tick `T` can take a customer at `T`.
/// The queue is drained before arrivals are admitted, so that nobody arriving at `T` gets ahead
/// of a customer that has been waiting.
pub const TICK_PHASES: [Phase; 4] = [
    Phase::Departures,
    Phase::QueueDrain,
    Phase::Arrivals,
    Phase::Accounting,
];

/// What happened during a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRecord {
    /// The tick.
    pub time: Tick,
    /// Customers that arrived.
    pub arrivals: usize,
    /// Customers that started service.
    pub starts: usize,
    /// Customers that departed.
    pub departures: usize,
    /// Queue length at the end of the tick.
    pub queue_length: usize,
    /// Busy servers at the end of the tick.
    pub busy_servers: usize,
}

impl TickRecord {
    fn new(time: Tick) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }
}

/// Discrete-event simulation of a multi-server queue advancing one tick at a time.
///
/// Customers arrive with gaps drawn from the inter-arrival sampler until the horizon, wait in a
/// single FIFO queue, and are served by the lowest-numbered idle server for a duration drawn from
/// the service sampler. The simulation runs until the horizon has passed and every customer left.
///
/// A run is fully determined by its configuration and samplers.
pub struct Simulation {
    config: SimulationConfig,
    inter_arrival: DiscreteSampler,
    service: DiscreteSampler,
    rng: ChaChaRng,
    phases: [Phase; 4],
    ledger: EventLedger,
    servers: ServerPool,
    queue: VecDeque<CustomerId>,
    customers: Vec<Customer>,
    stats: StatsAggregator,
    ticks: u64,
    current: TickRecord,
    tick_log: Vec<TickRecord>,
    result: Option<RunStatistics>,
}

impl Simulation {
    /// Constructs a simulation and schedules the first arrival.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid (see [`SimulationConfig::validate`]), or
    /// if any of the samplers can produce a duration shorter than one tick.
    pub fn new(
        config: SimulationConfig,
        inter_arrival: DiscreteSampler,
        service: DiscreteSampler,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        for &(role, sampler) in &[
            (SamplerRole::InterArrival, &inter_arrival),
            (SamplerRole::Service, &service),
        ] {
            let value = sampler.min_value();
            if value < 1 {
                return Err(ConfigError::NonPositiveDuration { role, value });
            }
        }
        let mut simulation = Self {
            rng: ChaChaRng::seed_from_u64(config.seed),
            servers: ServerPool::new(config.servers)?,
            config,
            inter_arrival,
            service,
            phases: TICK_PHASES,
            ledger: EventLedger::default(),
            queue: VecDeque::new(),
            customers: Vec::new(),
            stats: StatsAggregator::default(),
            ticks: 0,
            current: TickRecord::default(),
            tick_log: Vec::new(),
            result: None,
        };
        simulation.schedule_next_arrival(0);
        Ok(simulation)
    }

    /// Replaces the order of tick phases. Only meant to demonstrate that the order matters.
    #[cfg(test)]
    fn with_phases(mut self, phases: [Phase; 4]) -> Self {
        self.phases = phases;
        self
    }

    /// Runs the simulation until all customers arrived and left, and returns the statistics.
    ///
    /// Calling it again does not simulate anything and returns the same statistics.
    pub fn run(&mut self) -> &RunStatistics {
        if self.result.is_none() {
            let statistics = self.run_to_drain();
            self.result = Some(statistics);
        } else {
            log::debug!("Simulation already finished; returning previous statistics");
        }
        self.result
            .as_ref()
            .expect("statistics are stored after running")
    }

    fn run_to_drain(&mut self) -> RunStatistics {
        log::debug!(
            "Starting simulation: {} servers, horizon {}, seed {}",
            self.config.servers,
            self.config.horizon,
            self.config.seed
        );
        log::debug!("Inter-arrival times: {}", self.inter_arrival);
        log::debug!("Service times: {}", self.service);
        let mut time: Tick = 0;
        loop {
            self.step(time);
            if time >= self.config.horizon && self.ledger.is_empty() && self.queue.is_empty() {
                break;
            }
            time += 1;
        }
        let statistics = self.stats.finalize(self.ticks, self.servers.capacity());
        log::debug!(
            "Simulation finished at tick {}: {} arrived, {} completed",
            time,
            statistics.arrived,
            statistics.completed
        );
        statistics
    }

    fn step(&mut self, time: Tick) {
        self.current = TickRecord::new(time);
        let phases = self.phases;
        for &phase in &phases {
            match phase {
                Phase::Departures => self.process_departures(time),
                Phase::QueueDrain => self.drain_queue(time),
                Phase::Arrivals => self.process_arrivals(time),
                Phase::Accounting => self.account(),
            }
        }
    }

    fn process_departures(&mut self, time: Tick) {
        for event in self.ledger.take_at(time, Event::is_departure) {
            if let EventKind::Departure { customer, server } = event.kind {
                let released = self.servers.release(server);
                assert_eq!(
                    released, customer,
                    "server {} was serving another customer",
                    server
                );
                let (wait, service, system) = self.customers[usize::from(customer)].depart(time);
                self.stats.record_completion(wait, service, system);
                self.current.departures += 1;
                log::trace!(
                    "[{}] Customer {} left server {} after waiting {} and service {}",
                    time,
                    customer,
                    server,
                    wait,
                    service
                );
            }
        }
    }

    fn drain_queue(&mut self, time: Tick) {
        while !self.queue.is_empty() {
            let server = match self.servers.find_idle() {
                Some(server) => server,
                None => break,
            };
            let customer = self
                .queue
                .pop_front()
                .expect("queue checked to be non-empty");
            self.start_service(customer, server, time);
        }
    }

    fn process_arrivals(&mut self, time: Tick) {
        for _ in self.ledger.take_at(time, Event::is_arrival) {
            let customer = CustomerId(self.customers.len());
            self.customers.push(Customer::new(customer, time));
            self.stats.record_arrival();
            self.current.arrivals += 1;
            match self.servers.find_idle() {
                Some(server) if self.queue.is_empty() => {
                    self.start_service(customer, server, time);
                }
                _ => {
                    self.queue.push_back(customer);
                    self.stats.record_waited_customer(self.queue.len());
                    log::trace!(
                        "[{}] Customer {} joined the queue at position {}",
                        time,
                        customer,
                        self.queue.len()
                    );
                }
            }
            self.schedule_next_arrival(time);
        }
    }

    fn account(&mut self) {
        let queue_length = self.queue.len();
        let busy_servers = self.servers.busy_count();
        self.stats.record_queue_sample(queue_length);
        self.stats.record_busy_sample(busy_servers);
        self.servers.record_busy_tick();
        self.ticks += 1;
        self.current.queue_length = queue_length;
        self.current.busy_servers = busy_servers;
        if self.config.tick_log {
            self.tick_log.push(self.current);
        }
    }

    fn start_service(&mut self, customer: CustomerId, server: ServerId, time: Tick) {
        let service = draw(&self.service, &mut self.rng);
        let departure =
            self.customers[usize::from(customer)].start_service(server, time, service);
        self.servers.assign(server, customer, departure);
        self.ledger.schedule(
            departure,
            EventKind::Departure { customer, server },
        );
        self.current.starts += 1;
        log::trace!(
            "[{}] Customer {} started service at server {} until {}",
            time,
            customer,
            server,
            departure
        );
    }

    fn schedule_next_arrival(&mut self, now: Tick) {
        let time = now + draw(&self.inter_arrival, &mut self.rng);
        if time <= self.config.horizon {
            self.ledger.schedule(time, EventKind::Arrival);
        } else {
            log::trace!("[{}] No more arrivals: next one would be at {}", now, time);
        }
    }

    /// The configuration of this simulation.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Statistics of the finished run, or `None` if [`Simulation::run`] has not been called.
    #[must_use]
    pub fn statistics(&self) -> Option<&RunStatistics> {
        self.result.as_ref()
    }

    /// Records of all customers that arrived so far, ordered by ID.
    #[must_use]
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// All servers, ordered by ID.
    #[must_use]
    pub fn servers(&self) -> &[Server] {
        self.servers.servers()
    }

    /// Per-tick records. Empty unless enabled in the configuration.
    #[must_use]
    pub fn tick_log(&self) -> &[TickRecord] {
        &self.tick_log
    }

    /// Number of events waiting to be processed.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.ledger.len()
    }

    /// Number of customers in the queue.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

fn draw(sampler: &DiscreteSampler, rng: &mut ChaChaRng) -> Tick {
    Tick::try_from(sampler.sample(rng)).expect("durations are validated to be positive")
}
