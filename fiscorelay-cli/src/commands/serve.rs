//! Serve command - HTTP API for the web frontend.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::context::{load_config, AppContext};
use crate::server::{self, AppState};
use crate::Cli;

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Listen address, overriding the configuration and BACKEND_PORT.
    #[arg(long)]
    pub bind: Option<String>,
}

/// Runs the HTTP server until interrupted.
pub async fn run(args: &ServeArgs, cli: &Cli) -> Result<()> {
    let mut config = load_config(cli).await?;
    if let Some(bind) = &args.bind {
        config.server.bind.clone_from(bind);
    }
    let addr = config.bind_addr()?;
    let allowed_origins = config.server.allowed_origins.clone();

    let ctx = AppContext::from_config(config)?;
    let app = server::router(AppState::new(ctx.workflow, ctx.log), &allowed_origins);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Fiscorelay backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
