//! Tick-synchronous simulation of a multi-server queue.

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

mod error;
pub use error::ConfigError;

mod sampler;
pub use sampler::{DiscreteSampler, SamplerRole, TableEntry};

mod ledger;
pub use ledger::{Event, EventKind, EventLedger};

mod servers;
pub use servers::{Server, ServerPool};

mod stats;
pub use stats::{RunStatistics, StatsAggregator};

mod simulation;
pub use simulation::{Phase, Simulation, SimulationConfig, TickRecord, TICK_PHASES};

mod table;
pub use table::{load_table, read_table};

mod report;
pub use report::{append_summary, write_summary, write_tick_log, SummaryRow};

/// Simulation time, counted in whole ticks from zero.
pub type Tick = u64;

/// Customer ID, assigned in the order of arrival.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct CustomerId(usize);

/// Server ID, an index into the server pool.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct ServerId(usize);

/// Where a customer is in its lifecycle.
#[derive(
    Debug, PartialEq, Eq, Clone, Copy, strum::Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    /// In the queue, no server assigned yet.
    Waiting,
    /// Assigned to a server.
    InService,
    /// Finished service and left the system.
    Departed,
}

/// Record of a single customer, retained for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    arrival: Tick,
    start: Option<Tick>,
    service: Option<Tick>,
    departure: Option<Tick>,
    server: Option<ServerId>,
    status: CustomerStatus,
}

impl Customer {
    fn new(id: CustomerId, arrival: Tick) -> Self {
        Self {
            id,
            arrival,
            start: None,
            service: None,
            departure: None,
            server: None,
            status: CustomerStatus::Waiting,
        }
    }

    /// Assigns the customer to `server` at `time` for `service` ticks and returns the departure
    /// time.
    ///
    /// # Panics
    ///
    /// Panics if the customer is not waiting.
    fn start_service(&mut self, server: ServerId, time: Tick, service: Tick) -> Tick {
        assert_eq!(
            self.status,
            CustomerStatus::Waiting,
            "customer {} started service twice",
            self.id
        );
        debug_assert!(time >= self.arrival);
        let departure = time + service;
        self.start = Some(time);
        self.service = Some(service);
        self.departure = Some(departure);
        self.server = Some(server);
        self.status = CustomerStatus::InService;
        departure
    }

    /// Marks the customer as departed at `time`, and returns its wait, service, and system times.
    ///
    /// # Panics
    ///
    /// Panics if the customer is not in service or `time` is not its scheduled departure.
    fn depart(&mut self, time: Tick) -> (Tick, Tick, Tick) {
        assert_eq!(
            self.status,
            CustomerStatus::InService,
            "customer {} departed while {}",
            self.id,
            self.status
        );
        assert_eq!(
            self.departure,
            Some(time),
            "customer {} departed off schedule",
            self.id
        );
        self.status = CustomerStatus::Departed;
        let start = self.start.expect("customers in service have a start time");
        let service = self.service.expect("customers in service have a service time");
        (start - self.arrival, service, time - self.arrival)
    }

    /// The ID of the customer.
    #[must_use]
    pub fn id(&self) -> CustomerId {
        self.id
    }

    /// The tick of arrival.
    #[must_use]
    pub fn arrival(&self) -> Tick {
        self.arrival
    }

    /// The tick service started, if it did.
    #[must_use]
    pub fn start(&self) -> Option<Tick> {
        self.start
    }

    /// Sampled service duration, known once service starts.
    #[must_use]
    pub fn service(&self) -> Option<Tick> {
        self.service
    }

    /// The departure tick, known once service starts.
    #[must_use]
    pub fn departure(&self) -> Option<Tick> {
        self.departure
    }

    /// The server assigned to this customer.
    #[must_use]
    pub fn server(&self) -> Option<ServerId> {
        self.server
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    /// Ticks spent in the queue, known once service starts.
    #[must_use]
    pub fn wait(&self) -> Option<Tick> {
        self.start.map(|start| start - self.arrival)
    }

    /// Ticks spent in the system, known once service starts.
    #[must_use]
    pub fn system_time(&self) -> Option<Tick> {
        self.departure.map(|departure| departure - self.arrival)
    }
}
