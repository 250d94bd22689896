//! Result files and the console summary.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use eyre::WrapErr;
use serde::{Deserialize, Serialize};

use crate::{RunStatistics, TickRecord};

const TICK_LOG_HEADER: [&str; 6] = [
    "time",
    "arrivals",
    "starts",
    "departures",
    "queue_length",
    "busy_servers",
];

/// Writes per-tick records in CSV format, preceded by a header.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_tick_log<W: Write>(writer: W, records: &[TickRecord]) -> eyre::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(&TICK_LOG_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// A single row of the summary file, one per simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Customers that entered the system.
    pub arrived: usize,
    /// Customers that finished service.
    pub completed: usize,
    /// Average time in queue.
    pub avg_wait: f64,
    /// Average service time.
    pub avg_service: f64,
    /// Average time in the system.
    pub avg_system: f64,
    /// Longest observed queue.
    pub max_queue: usize,
    /// Time-averaged queue length.
    pub avg_queue: f64,
    /// Time-averaged fraction of busy servers.
    pub avg_utilization: f64,
    /// Fraction of completed customers that had to wait.
    pub p_wait: f64,
}

impl From<&RunStatistics> for SummaryRow {
    fn from(stats: &RunStatistics) -> Self {
        Self {
            arrived: stats.arrived,
            completed: stats.completed,
            avg_wait: stats.avg_wait,
            avg_service: stats.avg_service,
            avg_system: stats.avg_system,
            max_queue: stats.max_queue,
            avg_queue: stats.avg_queue,
            avg_utilization: stats.avg_utilization,
            p_wait: stats.p_wait,
        }
    }
}

/// Writes a summary row in CSV format, preceded by a header if `header` is set.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_summary<W: Write>(writer: W, row: &SummaryRow, header: bool) -> eyre::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(header)
        .from_writer(writer);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}

/// Appends a summary row to the file at `path`.
///
/// The header is written only if the file does not exist yet or is empty.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or written to.
pub fn append_summary<P: AsRef<Path>>(path: P, row: &SummaryRow) -> eyre::Result<()> {
    let path = path.as_ref();
    let header = fs::metadata(path).map_or(true, |meta| meta.len() == 0);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .wrap_err_with(|| format!("unable to open summary file: {}", path.display()))?;
    write_summary(file, row, header)
        .wrap_err_with(|| format!("unable to write summary file: {}", path.display()))
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Arrived   : {}", self.arrived)?;
        writeln!(f, "Completed : {}", self.completed)?;
        if self.completed > 0 {
            writeln!(f, "Avg Wait  : {:.2}", self.avg_wait)?;
            writeln!(f, "Avg Svc   : {:.2}", self.avg_service)?;
            writeln!(f, "Avg System: {:.2}", self.avg_system)?;
        }
        writeln!(f, "MaxQ      : {}", self.max_queue)?;
        writeln!(f, "AvgQ      : {:.4}", self.avg_queue)?;
        write!(f, "UtilAvg   : {:.2}%", self.avg_utilization * 100.0)
    }
}
