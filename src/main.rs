//! cpumon: samples host CPU usage once a minute and serves its history.
//!
//! Run with:  `RUST_LOG=info cpumon`

use anyhow::{Context, Result};
use clap::Parser;
use cpumon_core::{Clock, LocalClock, MemoryStore, SampleStore, UsageService};
use cpumon_http::AppState;
use cpumon_store::SqliteStore;
use cpumon_system::{Sampler, SysinfoSource};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "CPU usage sampler with minute / hour / day history")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/cpumon/cpumon.toml).
    #[arg(short, long, env = "CPUMON_CONFIG")]
    config: Option<PathBuf>,

    /// Override `storage.path`.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Override `server.listen`, e.g. `0.0.0.0:8080`.
    #[arg(long)]
    listen: Option<String>,

    /// Keep samples in memory only; nothing survives a restart.
    #[arg(long, conflicts_with = "database")]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("cpumon v{} starting", env!("CARGO_PKG_VERSION"));

    // ── Config ───────────────────────────────────────────────────────────────
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(cpumon_config::default_path);
    let mut config = cpumon_config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(path) = cli.database {
        config.storage.path = path;
    }
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    config.validate().context("invalid configuration")?;

    // ── Storage ──────────────────────────────────────────────────────────────
    let store: Arc<dyn SampleStore> = if cli.in_memory {
        warn!("Using the in-memory store; samples are lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            SqliteStore::open(&config.storage.path)
                .await
                .context("opening sample store")?,
        )
    };
    let clock: Arc<dyn Clock> = Arc::new(LocalClock);

    // ── Sampler ──────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sampler = Sampler::new(SysinfoSource::new(), Arc::clone(&store), Arc::clone(&clock))
        .with_interval(config.sampler.interval(), config.sampler.tick_timeout())
        .spawn(shutdown_rx);

    // ── HTTP ─────────────────────────────────────────────────────────────────
    let usage = UsageService::new(store, config.retention.policy(), clock);
    let app = cpumon_http::router(AppState { usage, sampler: Some(sampler.status()) });

    let addr = config.server.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    cpumon_http::serve(listener, app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    })
    .await?;

    // ── Shutdown ─────────────────────────────────────────────────────────────
    let _ = shutdown_tx.send(true);
    sampler.join().await;
    info!("cpumon stopped");
    Ok(())
}
