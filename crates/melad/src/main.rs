//! melad: the mela daemon.
//!
//! Single binary that assembles the mela subsystems:
//! - Document store (redb)
//! - Live zone board and its re-randomizer
//! - REST API
//!
//! # Usage
//!
//! ```text
//! melad serve --config /etc/mela/mela.toml --port 5000
//! melad seed --data-dir /var/lib/mela
//! ```

mod seed;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use clap::{Parser, Subcommand};
use tokio::signal::ctrl_c;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mela_api::{ApiState, build_router};
use mela_core::{MelaConfig, epoch_secs};
use mela_sim::ZoneBoard;
use mela_state::StateStore;

#[derive(Parser)]
#[command(name = "melad", about = "Mela crowd management daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the API and run the zone simulator.
    Serve {
        /// Path to mela.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides the config file).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for persistent state (overrides the config file).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Load the sample locations, routes and crowd readings.
    Seed {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,melad=debug,mela=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            port,
            data_dir,
        } => {
            let mut config = MelaConfig::load(config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(dir) = data_dir {
                config.storage.data_dir = dir;
            }
            run_server(config).await
        }
        Command::Seed { config, data_dir } => {
            let mut config = MelaConfig::load(config.as_deref())?;
            if let Some(dir) = data_dir {
                config.storage.data_dir = dir;
            }
            let store = open_store(&config)?;
            let report = seed::seed(&store, epoch_secs())?;
            info!(?report, "seeding complete");
            Ok(())
        }
    }
}

fn open_store(config: &MelaConfig) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(&config.storage.data_dir)?;
    let db_path = config.db_path();
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");
    Ok(store)
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true))
}

async fn run_server(config: MelaConfig) -> anyhow::Result<()> {
    info!("mela daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    let store = open_store(&config)?;

    let interval = Duration::from_secs(config.simulation.interval_secs.max(1));
    let zones = ZoneBoard::with_demo_zones(interval);
    info!(interval_secs = interval.as_secs(), "zone board initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let simulator = config.simulation.enabled.then(|| {
        let board = zones.clone();
        tokio::spawn(async move {
            board.run(shutdown_rx).await;
        })
    });
    if simulator.is_none() {
        info!("zone simulator disabled");
    }

    // ── Start API server ───────────────────────────────────────

    let state = ApiState::new(
        store,
        zones,
        config.timing.overstay_minutes,
        config.events.clone(),
    );
    let router = build_router(state)
        .layer(cors_layer(&config.server.cors_origin)?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    info!(%addr, cors_origin = %config.server.cors_origin, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(handle) = simulator {
        let _ = handle.await;
    }

    info!("mela daemon stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve_overrides() {
        let cli = Cli::parse_from(["melad", "serve", "--port", "8080", "--data-dir", "/tmp/mela"]);
        match cli.command {
            Command::Serve { config, port, data_dir } => {
                assert!(config.is_none());
                assert_eq!(port, Some(8080));
                assert_eq!(data_dir, Some(PathBuf::from("/tmp/mela")));
            }
            Command::Seed { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn cors_rejects_invalid_origin() {
        assert!(cors_layer("http://localhost:3000").is_ok());
        assert!(cors_layer("bad\norigin").is_err());
    }

    #[test]
    fn open_store_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MelaConfig::default();
        config.storage.data_dir = dir.path().join("nested");
        open_store(&config).unwrap();
        assert!(config.db_path().exists());
    }
}
