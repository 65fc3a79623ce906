//! `recv` command implementation.

use anyhow::{Context, Result};
use splay_cli::server;
use splay_cli::CliError;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::RecvArgs;
use crate::commands::shutdown_signal;

/// Execute the `recv` command
pub async fn run_recv(args: &RecvArgs) -> Result<()> {
    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| CliError::bind(&addr, e))?;
    info!(addr = %listener.local_addr()?, "Development receiver listening");

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        stop.cancel();
    });

    server::serve(listener, server::recv_router(), cancel)
        .await
        .context("Receiver failed")?;
    info!("Development receiver stopped");
    Ok(())
}
