//! `serve` command implementation.

use anyhow::{Context, Result};
use contracts::SplayConfig;
use splay_cli::server;
use splay_cli::{CliError, Services};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::commands::shutdown_signal;

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    apply_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config)
        .map_err(CliError::from)
        .context("Invalid configuration after CLI overrides")?;

    if let Some(port) = config.observability.metrics_port {
        observability::init_metrics_only(port).context("Failed to start metrics exporter")?;
        info!(port, "Prometheus exporter listening");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let services = Services::build(config)?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| CliError::bind(&addr, e))?;
    info!(
        addr = %listener.local_addr()?,
        buckets = services.config.buckets.len(),
        auth = services.config.server.ingest_token.is_some(),
        "splay listening"
    );

    let cancel = CancellationToken::new();
    let broadcast = services.broadcast_loop().spawn(cancel.clone());
    let mut server_task = tokio::spawn(server::serve(listener, services.router(), cancel.clone()));

    let exited_early = tokio::select! {
        result = &mut server_task => Some(result),
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, draining...");
            None
        }
    };
    cancel.cancel();

    let served = match exited_early {
        Some(result) => result,
        None => server_task.await,
    }
    .context("HTTP server task failed")?;

    let broadcast_stats = broadcast.await.context("Broadcast loop task failed")?;
    if let Err(e) = services.drain().await {
        warn!(error = %e, "Forward dispatches abandoned");
    }

    info!(
        ingestion = ?services.handler.snapshot(),
        forwards = %services.dispatcher.snapshot(),
        broadcast = ?broadcast_stats,
        "splay stopped"
    );

    served.context("HTTP server failed")?;
    Ok(())
}

/// Command-line values win over the file
fn apply_overrides(config: &mut SplayConfig, args: &ServeArgs) {
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding listen host from CLI");
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port, "Overriding listen port from CLI");
        config.server.port = port;
    }
    if let Some(port) = args.metrics_port {
        config.observability.metrics_port = Some(port);
    }
    if let Some(ref token) = args.ingest_token {
        config.server.ingest_token = Some(token.clone());
    }
}
