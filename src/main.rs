//! Mount server (standalone)
//!
//! Runs the lifecycle controller without a host shell: listeners from the
//! config file, an optional JSON store file, and log-only host callbacks.
//!
//! ```text
//!   HTTP  :5244 ─┐
//!   HTTPS :5245 ─┼─▶ idle reset ─▶ routing tree ─▶ store
//!   unix socket ─┘        │
//!                         └─▶ idle timer ─▶ shutdown
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use mount_server::bridge::TracingEvents;
use mount_server::config::{load_config, ServerConfig};
use mount_server::lifecycle::signals::shutdown_signal;
use mount_server::lifecycle::ShutdownError;
use mount_server::observability::{logging, metrics};
use mount_server::store::MemoryStore;
use mount_server::ServerRuntime;

#[derive(Parser)]
#[command(name = "mount-server")]
#[command(about = "Multi-listener mount server", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON store file loaded at start and saved on exit.
    #[arg(short, long)]
    store: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    logging::init(&config.observability.log_level);

    tracing::info!(
        http_port = config.scheme.http_port,
        https_port = config.scheme.https_port,
        unix_file = %config.scheme.unix_file,
        auto_stop_hours = config.lifecycle.auto_stop_hours,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let store = Arc::new(match &cli.store {
        Some(path) => MemoryStore::open(path)?,
        None => MemoryStore::new(),
    });
    let timeout = Duration::from_millis(config.lifecycle.shutdown_timeout_ms);
    let runtime = ServerRuntime::builder(config).store(store.clone()).build();

    runtime.start(Arc::new(TracingEvents)).await?;

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let signal = shutdown_signal();
    tokio::pin!(signal);
    loop {
        tokio::select! {
            _ = &mut signal => break,
            _ = ticker.tick() => {
                if !runtime.is_running_any() {
                    tracing::info!("No listener running");
                    break;
                }
            }
        }
    }

    let shutdown = runtime.shutdown(timeout).await;
    finish(shutdown, &store)
}

/// Persist the store whatever the drain outcome, then surface the drain error.
fn finish(shutdown: Result<(), ShutdownError>, store: &MemoryStore) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(error) = &shutdown {
        tracing::error!(error = %error, "Shutdown incomplete, saving store anyway");
    }
    store.save()?;
    shutdown?;
    tracing::info!("Shutdown complete");
    Ok(())
}
