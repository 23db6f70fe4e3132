//! relaycopy-relay: the rendezvous relay server.

#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use relaycopy_relay::{server, RelayConfig};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "relaycopy-relay")]
#[command(about = "Rendezvous relay for relaycopy: pairs a sender and a receiver sharing a code fingerprint", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server.
    Serve {
        /// Address to bind the WebSocket listener to.
        #[arg(long, default_value = "0.0.0.0:4455")]
        addr: SocketAddr,

        /// Evict a waiting peer after this many idle seconds (0 disables).
        #[arg(long, default_value = "120")]
        pairing_timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            addr,
            pairing_timeout_secs,
        } => {
            let config = RelayConfig {
                bind_addr: addr,
                pairing_timeout_secs,
            };
            serve(config).await
        }
    }
}

/// How often the stale-pairing reaper sweeps the table; independent of
/// the per-waiter pairing timeout, which each connection also enforces
/// itself.
const REAP_INTERVAL: Duration = Duration::from_secs(30);

async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr;
    let pairing_timeout = config.pairing_timeout();
    tracing::info!(%addr, pairing_timeout = ?pairing_timeout, "starting relaycopy-relay");

    let state = server::RelayState::new(config);
    spawn_reaper(state.clone(), pairing_timeout);
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically drop waiters that have outlived the pairing timeout,
/// as a backstop alongside each connection's own timeout handling.
fn spawn_reaper(state: std::sync::Arc<server::RelayState>, pairing_timeout: Option<Duration>) {
    let Some(max_age) = pairing_timeout else {
        return;
    };
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REAP_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = state.table.cleanup_stale(max_age);
            if removed > 0 {
                tracing::info!(removed, "reaped stale waiters");
            }
        }
    });
}
