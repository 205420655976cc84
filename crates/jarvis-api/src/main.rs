//! `jarvis-server`: the JARVIS insight engine over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use jarvis_api::runtime::{self, RuntimeOptions};
use jarvis_api::{http, DetectionScheduler, InsightService};
use jarvis_core::config::CONFIG_ENV;
use jarvis_core::logging::init_tracing;
use tokio::sync::broadcast;

#[derive(Debug, Parser)]
#[command(name = "jarvis-server", version, about = "JARVIS insight engine API server")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides `storage.db_path`).
    #[arg(long)]
    db: Option<PathBuf>,

    /// Listen address (overrides `server.addr`).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Default log filter when `JARVIS_LOG` is unset.
    #[arg(long, default_value = "info")]
    log: String,

    /// Run one detection sweep over every user, then exit.
    #[arg(long)]
    sweep_once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("jarvis-server stopped: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let rt = runtime::initialize(RuntimeOptions {
        config_path: cli.config,
        db_path: cli.db,
        ..RuntimeOptions::default()
    })
    .context("failed to initialize runtime")?;
    let service = InsightService::new(rt.clone());
    let scheduler = DetectionScheduler::new(service.clone());

    if cli.sweep_once {
        let report = tokio::task::spawn_blocking(move || scheduler.sweep(chrono::Utc::now())).await??;
        tracing::info!(?report, "sweep complete");
        rt.shutdown()?;
        return Ok(());
    }

    let addr = match cli.addr {
        Some(addr) => addr,
        None => rt
            .config
            .server
            .addr
            .parse()
            .with_context(|| format!("invalid server.addr '{}'", rt.config.server.addr))?,
    };

    let (shutdown_tx, _) = broadcast::channel(1);
    let sweeper = scheduler.spawn_periodic(shutdown_tx.subscribe());

    let signal_tx = shutdown_tx.clone();
    http::serve(service, addr, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutdown requested");
        let _ = signal_tx.send(());
    })
    .await
    .context("HTTP server failed")?;

    let _ = shutdown_tx.send(());
    let _ = sweeper.await;
    rt.shutdown()?;
    Ok(())
}
