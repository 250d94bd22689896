use serde::{Deserialize, Serialize};

use crate::{ConfigError, CustomerId, ServerId, Tick};

/// A single service channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    id: ServerId,
    current: Option<CustomerId>,
    busy_until: Tick,
    served: usize,
    busy_ticks: u64,
}

impl Server {
    fn new(id: ServerId) -> Self {
        Self {
            id,
            current: None,
            busy_until: 0,
            served: 0,
            busy_ticks: 0,
        }
    }

    /// The ID of this server.
    #[must_use]
    pub fn id(&self) -> ServerId {
        self.id
    }

    /// Whether a customer is being served.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    /// The customer being served, if any.
    #[must_use]
    pub fn current_customer(&self) -> Option<CustomerId> {
        self.current
    }

    /// The tick at which the current service ends. Only meaningful while busy.
    #[must_use]
    pub fn busy_until(&self) -> Tick {
        self.busy_until
    }

    /// Number of customers assigned to this server so far.
    #[must_use]
    pub fn served(&self) -> usize {
        self.served
    }

    /// Number of ticks this server was busy at the end of a tick.
    #[must_use]
    pub fn busy_ticks(&self) -> u64 {
        self.busy_ticks
    }

    /// Fraction of `ticks` this server spent busy.
    #[must_use]
    pub fn utilization(&self, ticks: u64) -> f64 {
        if ticks == 0 {
            0.0
        } else {
            self.busy_ticks as f64 / ticks as f64
        }
    }
}

/// A fixed-size pool of identical servers.
///
/// Assigning a busy server or releasing an idle one means that the simulation state is broken,
/// and therefore such calls panic.
#[derive(Debug, Clone)]
pub struct ServerPool {
    servers: Vec<Server>,
    busy: usize,
}

impl ServerPool {
    /// Creates `capacity` idle servers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoServers`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::NoServers);
        }
        Ok(Self {
            servers: (0..capacity).map(|id| Server::new(ServerId(id))).collect(),
            busy: 0,
        })
    }

    /// Total number of servers.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.servers.len()
    }

    /// Returns the idle server with the lowest ID.
    #[must_use]
    pub fn find_idle(&self) -> Option<ServerId> {
        self.servers
            .iter()
            .find(|server| !server.is_busy())
            .map(Server::id)
    }

    /// Starts serving `customer` at `server` until `end`.
    ///
    /// # Panics
    ///
    /// Panics if the server is busy.
    pub fn assign(&mut self, server: ServerId, customer: CustomerId, end: Tick) {
        let slot = &mut self.servers[usize::from(server)];
        assert!(
            !slot.is_busy(),
            "server {} is already serving customer {:?}",
            server,
            slot.current
        );
        slot.current = Some(customer);
        slot.busy_until = end;
        slot.served += 1;
        self.busy += 1;
    }

    /// Frees `server` and returns the customer it was serving.
    ///
    /// # Panics
    ///
    /// Panics if the server is idle.
    pub fn release(&mut self, server: ServerId) -> CustomerId {
        let customer = self.servers[usize::from(server)]
            .current
            .take()
            .unwrap_or_else(|| panic!("server {} released while idle", server));
        self.busy -= 1;
        customer
    }

    /// Number of busy servers.
    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.busy
    }

    /// Adds one busy tick to every busy server.
    pub fn record_busy_tick(&mut self) {
        for server in self.servers.iter_mut().filter(|s| s.is_busy()) {
            server.busy_ticks += 1;
        }
    }

    /// All servers, ordered by ID.
    #[must_use]
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }
}
