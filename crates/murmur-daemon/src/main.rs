//! murmur-daemon: the Murmur relay.
//!
//! Single OS process running a Tokio async runtime. Clients submit signals
//! and follow the acceptance feed over JSON-RPC on a Unix socket.

mod commands;
mod config;
mod rpc;
mod setup;

use std::sync::Arc;

use murmur_ledger::Ledger;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    pub config: DaemonConfig,
    pub ledger: Arc<Ledger>,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

fn init_tracing(config: &DaemonConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(format!("murmur={}", config.advanced.log_level)),
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.advanced.log_file.is_empty() {
        builder.init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.advanced.log_file)?;
        builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;
    init_tracing(&config)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Murmur daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db = setup::open_database(&config)?;

    // 3. Load circuit keys (setup can take a while at full depth)
    let verifier = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || setup::load_verifier(&config)).await??
    };

    // 4. Rebuild the ledger
    let ledger = Arc::new(setup::build_ledger(&config, db, verifier)?);

    // 5. Create shutdown channel
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    let socket_path = config.socket_path();
    let state = Arc::new(DaemonState {
        config,
        ledger,
        shutdown_tx: shutdown_tx.clone(),
    });

    // 6. Start IPC server
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    // 7. Run until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "RPC server error");
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!(
        data_dir = %state.config.data_dir().display(),
        "Daemon stopped"
    );
    Ok(())
}
