//! # switchyard
//!
//! Server binary: loads settings, seeds the session store, registers the
//! built-in actions, and serves `/ws` until Ctrl-C.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use switchyard_auth::{InMemoryPresence, InMemorySessionStore};
use switchyard_router::Router;
use switchyard_server::actions::register_builtin;
use switchyard_server::{Hub, ServerConfig, SwitchyardServer};
use switchyard_settings::{LoggingSettings, SwitchyardSettings};
use tracing_subscriber::EnvFilter;

/// WebSocket action router with session-token handshake.
#[derive(Parser, Debug)]
#[command(name = "switchyard", version, about)]
struct Cli {
    /// Settings file (defaults to `~/.switchyard/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter directive, e.g. `debug` or `switchyard_router=trace`.
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply(&self, settings: &mut SwitchyardSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.json = true;
        }
    }
}

fn init_tracing(logging: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .config
        .clone()
        .unwrap_or_else(switchyard_settings::settings_path);
    let mut settings = switchyard_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);
    settings
        .validate()
        .context("Invalid settings after command-line overrides")?;

    init_tracing(&settings.logging);
    tracing::info!(path = %settings_path.display(), "settings loaded");

    let sessions = Arc::new(InMemorySessionStore::new());
    if let Some(seed) = &settings.sessions.seed_file {
        let count = sessions
            .load_seed_file(Path::new(seed))
            .with_context(|| format!("Failed to load sessions from {seed}"))?;
        tracing::info!(count, path = %seed, "sessions loaded");
    }
    let presence = Arc::new(InMemoryPresence::new());

    let hub = Arc::new(Hub::new());
    let mut router = Router::new(sessions, presence);
    register_builtin(&mut router, Arc::clone(&hub));
    let action_count = router.actions().len();

    let metrics_handle = switchyard_server::metrics::install_recorder()?;
    let server = SwitchyardServer::new(ServerConfig::from(&settings.server), router, hub)
        .with_metrics(metrics_handle);

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("switchyard listening on ws://{addr}/ws ({action_count} actions registered)");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    server.shutdown().graceful_shutdown(vec![handle], None).await;
    Ok(())
}
