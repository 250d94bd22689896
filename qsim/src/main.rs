//! Multi-server queue simulation application.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::WrapErr;
use indicatif::{ProgressBar, ProgressStyle};

use qsim::{
    append_summary, load_table, write_tick_log, DiscreteSampler, RunStatistics, Simulation,
    SimulationConfig, SummaryRow, Tick,
};

/// Runs a tick-by-tick simulation of customers served by a pool of identical servers.
#[derive(Parser)]
#[clap(version, author)]
struct Opt {
    /// Path to a `value,probability` table of times between arrivals.
    #[clap(long, default_value = "config/arrivals.csv")]
    arrivals: PathBuf,

    /// Path to a `value,probability` table of service times.
    #[clap(long, default_value = "config/services.csv")]
    services: PathBuf,

    /// Path to a JSON file with the base simulation configuration.
    /// Any missing field takes its default value. Its `tick_log` flag is ignored: ticks are
    /// recorded if and only if `--tick-log` is given.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Number of servers. Overrides the configuration file.
    #[clap(long)]
    servers: Option<usize>,

    /// Last tick at which customers may arrive. Overrides the configuration file.
    #[clap(long)]
    horizon: Option<Tick>,

    /// Random seed. Overrides the configuration file.
    #[clap(long)]
    seed: Option<u64>,

    /// Number of independent runs. Run `i` uses the seed incremented by `i`.
    #[clap(long, default_value = "1")]
    replications: u64,

    /// Write the per-tick log to this file. With more than one replication, the replication
    /// number is appended to the file stem.
    #[clap(long)]
    tick_log: Option<PathBuf>,

    /// Append a summary row of each run to this file.
    #[clap(long)]
    summary: Option<PathBuf>,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences))]
    verbose: u64,

    /// Store the logs in this file.
    #[clap(long)]
    log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[clap(long)]
    no_stderr: bool,
}

impl Opt {
    /// Reads the base configuration, if any, and applies the command line overrides.
    fn simulation_config(&self) -> eyre::Result<SimulationConfig> {
        let mut config = if let Some(path) = &self.config {
            let file = File::open(path)
                .wrap_err_with(|| format!("unable to open config file: {}", path.display()))?;
            serde_json::from_reader(file)
                .wrap_err_with(|| format!("unable to parse config file: {}", path.display()))?
        } else {
            SimulationConfig::default()
        };
        if let Some(servers) = self.servers {
            config.servers = servers;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.tick_log = self.tick_log.is_some();
        config.validate()?;
        Ok(config)
    }
}

/// Path of the tick log of the given replication.
fn tick_log_path(path: &Path, replication: u64, replications: u64) -> PathBuf {
    if replications <= 1 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    let file_name = match path.extension() {
        Some(ext) => format!("{}.{}.{}", stem, replication, ext.to_string_lossy()),
        None => format!("{}.{}", stem, replication),
    };
    path.with_file_name(file_name)
}

/// Runs a single replication and writes its result files.
fn run_replication(
    opt: &Opt,
    config: SimulationConfig,
    replication: u64,
    inter_arrival: &DiscreteSampler,
    service: &DiscreteSampler,
) -> eyre::Result<RunStatistics> {
    log::info!("Replication {} with seed {}", replication, config.seed);
    let mut simulation = Simulation::new(config, inter_arrival.clone(), service.clone())?;
    let stats = simulation.run().clone();
    if let Some(path) = &opt.tick_log {
        let path = tick_log_path(path, replication, opt.replications);
        let file = File::create(&path)
            .wrap_err_with(|| format!("unable to create tick log: {}", path.display()))?;
        write_tick_log(BufWriter::new(file), simulation.tick_log())
            .wrap_err_with(|| format!("unable to write tick log: {}", path.display()))?;
    }
    if let Some(path) = &opt.summary {
        append_summary(path, &SummaryRow::from(&stats))?;
    }
    Ok(stats)
}

/// Set up a logger based on the given user options.
fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let log_level = match opt.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(log_level);
    let dispatch = if let Some(path) = &opt.log_output {
        dispatch.chain(
            std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
        )
    } else {
        dispatch
    };
    let dispatch = if opt.no_stderr {
        dispatch
    } else {
        dispatch.chain(std::io::stderr())
    };
    dispatch.apply()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;
    let config = opt.simulation_config()?;
    let inter_arrival = load_table(&opt.arrivals)?;
    let service = load_table(&opt.services)?;

    let pb = if opt.replications > 1 {
        ProgressBar::new(opt.replications)
            .with_style(ProgressStyle::default_bar().template("{msg} {wide_bar} {pos}/{len}"))
    } else {
        ProgressBar::hidden()
    };
    let mut results = Vec::new();
    for replication in 0..opt.replications {
        pb.set_message(&format!("[seed={}]", config.seed.wrapping_add(replication)));
        let config = SimulationConfig {
            seed: config.seed.wrapping_add(replication),
            ..config.clone()
        };
        results.push(run_replication(
            &opt,
            config,
            replication,
            &inter_arrival,
            &service,
        )?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    for (replication, stats) in results.iter().enumerate() {
        if results.len() > 1 {
            println!("Replication {}", replication);
        }
        println!("{}", stats);
    }
    if let Some(path) = &opt.tick_log {
        println!("Tick log  : {}", path.display());
    }
    if let Some(path) = &opt.summary {
        println!("Summary   : {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tick_log_path() {
        let path = Path::new("out/tick_log.csv");
        assert_eq!(tick_log_path(path, 0, 1), PathBuf::from("out/tick_log.csv"));
        assert_eq!(tick_log_path(path, 3, 5), PathBuf::from("out/tick_log.3.csv"));
        assert_eq!(
            tick_log_path(Path::new("ticks"), 1, 2),
            PathBuf::from("ticks.1")
        );
    }

    #[test]
    fn test_overrides() {
        let opt = Opt::parse_from(vec![
            "sim",
            "--servers",
            "3",
            "--seed",
            "7",
            "--tick-log",
            "t.csv",
        ]);
        let config = opt.simulation_config().unwrap();
        assert_eq!(
            config,
            SimulationConfig {
                servers: 3,
                horizon: 480,
                seed: 7,
                tick_log: true,
            }
        );
        assert_eq!(opt.replications, 1);
        assert_eq!(opt.arrivals, PathBuf::from("config/arrivals.csv"));
    }

    #[test]
    fn test_config_file_tick_log_follows_cli() {
        let path = std::env::temp_dir().join(format!("qsim-{}-config.json", std::process::id()));
        std::fs::write(&path, r#"{"horizon": 50, "tick_log": true}"#).unwrap();
        let config_arg = path.to_string_lossy().into_owned();

        let opt = Opt::parse_from(vec!["sim", "--config", config_arg.as_str()]);
        let config = opt.simulation_config().unwrap();
        assert_eq!(config.horizon, 50);
        assert!(!config.tick_log);

        let opt = Opt::parse_from(vec![
            "sim",
            "--config",
            config_arg.as_str(),
            "--tick-log",
            "t.csv",
        ]);
        assert!(opt.simulation_config().unwrap().tick_log);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_override() {
        let opt = Opt::parse_from(vec!["sim", "--horizon", "0"]);
        assert!(opt.simulation_config().is_err());
    }
}
