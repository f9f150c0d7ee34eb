//! syncprobe CLI entry point

use anyhow::{Context, Result};
use std::io;
use std::process::ExitCode;
use syncprobe::config::cli::Cli;
use syncprobe::config::cli_convert::dial_address;
use syncprobe::config::toml::load_config;
use syncprobe::config::Config;
use syncprobe::distributed::{connect, Driver, DriverSettings, Observer, ObserverReport};
use syncprobe::output::{write_report, SessionInfo};
use syncprobe::stats::StatsAggregator;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();
    setup_logging(cli.verbose);

    let config = load_config(&cli)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    if cli.server {
        runtime.block_on(run_driver(config))
    } else {
        runtime.block_on(run_observer(config))
    }
}

async fn run_driver(config: Config) -> Result<()> {
    let driver = Driver::new(DriverSettings::from_config(&config));

    tokio::select! {
        result = driver.run(&config.address) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("interrupted, shutting down");
            Ok(())
        }
    }
}

async fn run_observer(config: Config) -> Result<()> {
    let address = dial_address(&config.address);
    let stream = connect(&address).await?;
    info!("connected to {}, watching {}", address, config.target_dir.display());

    let observer = Observer::new(&config.target_dir, config.detection);
    let mut report = ObserverReport::default();
    let result = observer.run_session(stream, &mut report).await;

    if report.timeouts > 0 {
        warn!("{} detection(s) timed out", report.timeouts);
    }

    match result {
        Ok(()) => print_report(&config, &report),
        Err(e) => {
            if !report.created.is_empty() {
                warn!("session incomplete, reporting {} partial records", report.created.len());
                if let Err(report_err) = print_report(&config, &report) {
                    error!("failed to print partial report: {:#}", report_err);
                }
            }
            Err(e).context("Observer session failed")
        }
    }
}

fn print_report(config: &Config, report: &ObserverReport) -> Result<()> {
    let aggregator = StatsAggregator::new();
    let stats = if config.output.include_deletes {
        aggregator.aggregate_with_deletions(&report.created, &report.deleted)
    } else {
        aggregator.aggregate(&report.created)
    };

    let stats = match stats {
        Ok(stats) => stats,
        Err(e) => {
            warn!("nothing to report: {}", e);
            return Ok(());
        }
    };

    let session = SessionInfo {
        timeouts: report.timeouts,
        skewed: report.skewed,
        completed: report.completed,
    };
    write_report(&mut io::stdout().lock(), config.output.format, &stats, &session)
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("syncprobe=debug,warn")
        } else {
            EnvFilter::new("syncprobe=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
