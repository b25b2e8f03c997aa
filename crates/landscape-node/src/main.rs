//! # Landscape Node
//!
//! Runs a landscape and follows its event feed.
//!
//! ## Startup Sequence
//!
//! 1. Install the log subscriber (`RUST_LOG`, default `info`)
//! 2. Load configuration: first CLI argument, else `LANDSCAPE_CONFIG`, else
//!    the built-in development membership
//! 3. Build and start the landscape; log bootstrap peers and assignments
//! 4. Follow every landscape event until Ctrl-C, then stop

use std::path::PathBuf;

use anyhow::{Context, Result};
use landscape::{Landscape, LandscapeConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const CONFIG_ENV: &str = "LANDSCAPE_CONFIG";

/// Where the configuration comes from. `None` means the built-in preset.
/// Blank values count as unset.
fn config_path(arg: Option<String>, env: Option<String>) -> Option<PathBuf> {
    let given = |value: &String| !value.trim().is_empty();
    arg.filter(given).or_else(|| env.filter(given)).map(PathBuf::from)
}

fn load_config() -> Result<LandscapeConfig> {
    match config_path(std::env::args().nth(1), std::env::var(CONFIG_ENV).ok()) {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            LandscapeConfig::load(&path)
                .with_context(|| format!("invalid configuration in {}", path.display()))
        }
        None => {
            warn!("No configuration given; using the cut-corners development membership");
            Ok(LandscapeConfig::cut_corners())
        }
    }
}

fn log_topology(landscape: &Landscape) {
    for info in landscape.bootstrap_peers() {
        for addr in info.p2p_addrs() {
            info!(peer = %info.peer_id.short(), %addr, "Bootstrap peer");
        }
    }
    for identity in landscape.registry().iter() {
        match landscape.partitions_for(&identity.peer_id()) {
            Ok(boards) => {
                let boards: Vec<&str> = boards.iter().map(|board| board.as_str()).collect();
                info!(peer = %identity.peer_id().short(), ?boards, "Assignments");
            }
            Err(e) => warn!(peer = %identity.peer_id().short(), error = %e, "No assignments"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config()?;
    let landscape = Landscape::new(config).context("failed to build landscape")?;
    landscape.start();
    log_topology(&landscape);

    let shutdown = CancellationToken::new();
    let mut events = landscape.subscribe(&shutdown, []);

    info!("Following landscape events (Ctrl-C to stop)");
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("Shutdown requested");
                break;
            }
            event = events.recv() => match event {
                Some(event) => info!(
                    kind = event.kind(),
                    board = %event.board_id(),
                    peer = %event.peer_id().short(),
                    "Landscape event"
                ),
                None => {
                    warn!("Event feed ended");
                    break;
                }
            },
        }
    }

    shutdown.cancel();
    landscape.stop();
    info!("Shutdown complete");
    Ok(())
}
