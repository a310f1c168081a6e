//! `wpys-cli` — process and run a `wpys-worker` engine from a config file.

mod builtins;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wpys_broker::Broker;
use wpys_shared::config::WpysConfig;
use wpys_shared::errors::{WpysError, WpysResult};
use wpys_shared::registry::ProcessRegistry;
use wpys_shared::result_backend::{InMemoryResultBackend, ResultBackend};
use wpys_worker::{ProcessBodyRegistry, WorkerEngine};

#[derive(Parser)]
#[command(name = "wpys", about = "Runs a wpys worker engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the worker loop until Ctrl-C.
    Worker {
        /// Overrides the WPYS_CONFIG_FILE environment variable.
        #[arg(long, env = "WPYS_CONFIG_FILE")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Command::Worker { config } = cli.command;

    match run_worker(&config).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "wpys worker exited with an error");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run_worker(config_path: &str) -> WpysResult<()> {
    let config = WpysConfig::load_from_path(config_path)?;

    let broker = build_broker(&config)?;
    let result_backend = build_result_backend(&config)?;

    let mut registry = ProcessRegistry::new();
    let mut bodies = ProcessBodyRegistry::new();
    builtins::register_all(&mut registry, &mut bodies, &config.process_config.locations)?;

    let engine = WorkerEngine::new(Arc::new(registry), Arc::new(bodies), broker, result_backend);

    tracing::info!("wpys worker starting");
    tokio::select! {
        result = engine.run_forever() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
            Ok(())
        }
    }
}

fn build_broker(config: &WpysConfig) -> WpysResult<Broker> {
    match config.broker.backend_type.as_str() {
        "memory" => {
            let ttl = config.expiration_time.map(Duration::from_secs);
            Ok(Broker::new_in_memory(ttl).with_circuit_breaker(config.circuit_breaker.to_resilience_config()))
        }
        other => Err(WpysError::config_error(format!("unsupported broker type: {other}"))),
    }
}

fn build_result_backend(config: &WpysConfig) -> WpysResult<Arc<dyn ResultBackend>> {
    match config.result_backend.backend_type.as_str() {
        "memory" => Ok(Arc::new(InMemoryResultBackend::new())),
        other => Err(WpysError::config_error(format!("unsupported result backend type: {other}"))),
    }
}
