mod config;

use clap::{Parser, Subcommand};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use configsets::config::ValidationError;
use configsets::{ConfigSetsError, metrics_defs::ALL_METRICS};
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};
use shared::metrics_defs::describe_metrics;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "configsetd", about = "Configset administration service")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the configsets API
    Run {
        #[arg(long)]
        config_file: PathBuf,
    },
    /// Check a config file and exit
    Validate {
        #[arg(long)]
        config_file: PathBuf,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] StatsdError),
    #[error("could not install metrics recorder")]
    MetricsRecorder,
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Service(#[from] ConfigSetsError),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Run { config_file } => run(load_config(&config_file)?)?,
        CliCommand::Validate { config_file } => {
            load_config(&config_file)?;
            println!("{} is valid", config_file.display());
        }
    }

    Ok(())
}

fn load_config(path: &std::path::Path) -> Result<Config, CliError> {
    let config = Config::from_file(path)?;
    config.configsets.validate()?;
    Ok(config)
}

fn run(config: Config) -> Result<(), CliError> {
    // Held for the lifetime of the process so buffered events are flushed on exit
    let _sentry = init_logging(&config.common.logging);

    if let Some(metrics) = &config.common.metrics {
        init_metrics(metrics)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    tracing::info!("Starting configsetd");
    runtime.block_on(configsets::run(config.configsets))?;
    Ok(())
}

fn init_logging(config: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port).build(None)?;
    metrics::set_global_recorder(recorder).map_err(|_| CliError::MetricsRecorder)?;
    describe_metrics(ALL_METRICS);
    Ok(())
}
