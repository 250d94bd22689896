use serde::{Deserialize, Serialize};

use crate::Tick;

/// Accumulates measurements while a simulation is running.
///
/// All operations are plain counter updates. Derived ratios are only computed by
/// [`StatsAggregator::finalize`].
#[derive(Debug, Default, Clone)]
pub struct StatsAggregator {
    arrived: usize,
    completed: usize,
    waited: usize,
    total_wait: u64,
    total_service: u64,
    total_system: u64,
    max_queue: usize,
    queue_length_sum: u64,
    busy_server_sum: u64,
}

impl StatsAggregator {
    /// Counts a new customer.
    pub fn record_arrival(&mut self) {
        self.arrived += 1;
    }

    /// Counts a customer that finished service and adds up its times.
    pub fn record_completion(&mut self, wait: Tick, service: Tick, system: Tick) {
        self.completed += 1;
        self.total_wait += wait;
        self.total_service += service;
        self.total_system += system;
    }

    /// Counts a customer that had to join the queue, which is `queue_len` long after joining.
    pub fn record_waited_customer(&mut self, queue_len: usize) {
        self.waited += 1;
        self.max_queue = self.max_queue.max(queue_len);
    }

    /// Adds the queue length observed at the end of a tick.
    pub fn record_queue_sample(&mut self, len: usize) {
        self.queue_length_sum += len as u64;
        self.max_queue = self.max_queue.max(len);
    }

    /// Adds the number of busy servers observed at the end of a tick.
    pub fn record_busy_sample(&mut self, count: usize) {
        self.busy_server_sum += count as u64;
    }

    /// Computes the final statistics of a run that lasted `ticks` ticks on `servers` servers.
    #[must_use]
    pub fn finalize(&self, ticks: u64, servers: usize) -> RunStatistics {
        let per_completed = |total: u64| ratio(total as f64, self.completed as f64);
        RunStatistics {
            arrived: self.arrived,
            completed: self.completed,
            waited: self.waited,
            total_wait: self.total_wait,
            total_service: self.total_service,
            total_system: self.total_system,
            max_queue: self.max_queue,
            queue_length_sum: self.queue_length_sum,
            busy_server_sum: self.busy_server_sum,
            ticks,
            servers,
            avg_wait: per_completed(self.total_wait),
            avg_service: per_completed(self.total_service),
            avg_system: per_completed(self.total_system),
            avg_queue: ratio(self.queue_length_sum as f64, ticks as f64),
            avg_utilization: ratio(
                self.busy_server_sum as f64,
                servers as f64 * ticks as f64,
            ),
            p_wait: ratio(self.waited as f64, self.completed as f64),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Final statistics of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Customers that entered the system.
    pub arrived: usize,
    /// Customers that finished service.
    pub completed: usize,
    /// Customers that spent at least one tick in the queue.
    pub waited: usize,
    /// Sum of queueing times of completed customers.
    pub total_wait: u64,
    /// Sum of service times of completed customers.
    pub total_service: u64,
    /// Sum of times in the system of completed customers.
    pub total_system: u64,
    /// Longest observed queue.
    pub max_queue: usize,
    /// Sum of queue lengths sampled at the end of every tick.
    pub queue_length_sum: u64,
    /// Sum of busy server counts sampled at the end of every tick.
    pub busy_server_sum: u64,
    /// Number of simulated ticks, including the ones needed to drain the system.
    pub ticks: u64,
    /// Number of servers.
    pub servers: usize,
    /// Average time in queue.
    pub avg_wait: f64,
    /// Average service time.
    pub avg_service: f64,
    /// Average time in the system.
    pub avg_system: f64,
    /// Time-averaged queue length.
    pub avg_queue: f64,
    /// Time-averaged fraction of busy servers.
    pub avg_utilization: f64,
    /// Fraction of completed customers that had to wait.
    pub p_wait: f64,
}

impl RunStatistics {
    /// Completed customers per tick.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        ratio(self.completed as f64, self.ticks as f64)
    }
}
