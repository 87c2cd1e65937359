//! drydock-daemon - Checking service daemon
//!
//! Accepts submissions over a Unix socket, stages each into an isolated run
//! workspace, and schedules containerized checker runs through a
//! concurrency-bounded FIFO queue.

use anyhow::Result;
use clap::Parser;
use drydock_core::{CheckRunner, NamespaceAllocator};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing_subscriber::EnvFilter;

mod config;
mod queue;
mod request;
mod server;

use config::DaemonConfig;
use queue::JobQueueRunner;
use server::ServerState;

#[derive(Parser)]
#[command(name = "drydock-daemon")]
#[command(author, version, about = "Sandboxed checking service daemon")]
struct Args {
    /// Socket path (defaults to DRYDOCK_SOCKET env var or /run/drydock/drydock.sock)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Root directory for run workspaces and retained traces
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Maximum number of concurrent checker runs
    #[arg(short, long)]
    max_checks: Option<usize>,

    /// Checker container image
    #[arg(short, long)]
    image: Option<String>,
}

impl Args {
    fn into_config(self) -> DaemonConfig {
        let mut config = DaemonConfig::default();
        if let Some(socket) = self.socket {
            config.socket_path = socket;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(max_checks) = self.max_checks {
            config.max_concurrent_checks = max_checks;
        }
        if let Some(image) = self.image {
            config.sandbox.image = image;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("drydock=info".parse()?))
        .init();

    tracing::info!("drydock-daemon starting");

    let config = Args::parse().into_config();
    tracing::info!(
        max_checks = config.max_concurrent_checks,
        socket = ?config.socket_path,
        data_dir = ?config.data_dir,
        image = %config.sandbox.image,
        "configuration loaded"
    );

    // Workspaces accumulate only through crashes; traces are always
    // transient, so that directory is recreated empty on every boot.
    std::fs::create_dir_all(config.uploads_dir())?;
    let traces_dir = config.traces_dir();
    let _ = std::fs::remove_dir_all(&traces_dir);
    std::fs::create_dir_all(&traces_dir)?;

    // Create socket directory if needed
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Remove existing socket
    let _ = std::fs::remove_file(&config.socket_path);

    // Bind socket
    let listener = UnixListener::bind(&config.socket_path)?;
    tracing::info!(socket = ?config.socket_path, "listening");

    let state = Arc::new(ServerState {
        queue: JobQueueRunner::new(config.max_concurrent_checks),
        runner: Arc::new(CheckRunner::new(config.sandbox.clone())),
        allocator: NamespaceAllocator::new(config.uploads_dir(), config.traces_dir()),
    });

    // Run server
    server::run(listener, state)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
