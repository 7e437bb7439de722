//! Reload harness.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌───────────────────────── reload-harness ─────────────────────────┐
//!   │                                                                  │
//!   │  ┌────────────┐  start   ┌──────────────┐   GET /health          │
//!   │  │ supervisor │ ───────▶ │ http server  │ ◀──────────┐           │
//!   │  │ (lifecycle)│          │ (net + axum) │            │           │
//!   │  └─────┬──────┘          └──────▲───────┘     ┌──────┴──────┐    │
//!   │        │ probe                  │ drain       │  readiness  │    │
//!   │        └────────────────────────┼──────────── │    probe    │    │
//!   │                                 │             └─────────────┘    │
//!   │  ┌──────────┐  SIGINT/SIGTERM  ┌┴────────────┐                   │
//!   │  │ signals  │ ───────────────▶ │  shutdown   │                   │
//!   │  └──────────┘                  │ coordinator │                   │
//!   │                                └─────────────┘                   │
//!   │  status board ──▶ /status, /health       metrics ──▶ Prometheus  │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exit codes: 0 clean drain, 1 startup failure, 2 bind failure,
//! 3 forced drain.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use reload_harness::config::loader::{apply_env_overrides, load_config};
use reload_harness::config::validation::validate_config;
use reload_harness::config::{ConfigError, HarnessConfig};
use reload_harness::error::HarnessError;
use reload_harness::health::HttpHealthCheck;
use reload_harness::http::{HttpServer, ServerHandle};
use reload_harness::lifecycle::{OsSignals, ProcessSupervisor, SupervisorSettings};
use reload_harness::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "reload-harness")]
#[command(about = "HTTP process that measures its own readiness and drains on shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "reload-harness failed");
            eprintln!("reload-harness: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<u8, HarnessError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HarnessConfig::default(),
    };
    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "reload-harness starting");

    apply_env_overrides(&mut config);
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    tracing::info!(
        bind_address = %config.listener.bind_address,
        startup_delay_ms = config.startup.delay_ms,
        readiness_attempts = config.readiness.max_attempts,
        readiness_interval_ms = config.readiness.interval_ms,
        shutdown_deadline_ms = config.shutdown.deadline_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::warn!(
                address = %config.observability.metrics_address,
                error = %e,
                "Invalid metrics address, metrics disabled"
            ),
        }
    }

    let settings = SupervisorSettings::from_config(&config)?;
    let signals = OsSignals::install().map_err(HarnessError::Signals)?;
    let supervisor = ProcessSupervisor::new(settings, signals);

    let server = HttpServer::new(&config, supervisor.status());
    let readiness = config.readiness.clone();

    let outcome = supervisor
        .run(
            || server.start(),
            move |handle: &ServerHandle| {
                let check = HttpHealthCheck::new(
                    handle.local_addr(),
                    &readiness.path,
                    readiness.request_timeout(),
                )
                .map_err(|e| tracing::error!(error = %e, "Invalid health check URI, every attempt will fail"))
                .ok();
                if let Some(check) = &check {
                    tracing::info!(uri = %check.uri(), "Probing readiness");
                }
                move || {
                    let check = check.clone();
                    async move {
                        match check {
                            Some(check) => check.check().await,
                            None => false,
                        }
                    }
                }
            },
        )
        .await?;

    tracing::info!(outcome = %outcome, exit_code = outcome.exit_code(), "Shutdown complete");
    Ok(outcome.exit_code())
}
