//! Login command - check credentials against the provider.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{emit, CredentialArgs};
use crate::context::AppContext;
use crate::Cli;

/// Arguments for the login command.
#[derive(Args)]
pub struct LoginArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Runs the login command.
pub async fn run(args: &LoginArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli).await?;
    let outcome = ctx.login(&args.credentials).await?;
    info!(method = outcome.method.as_str(), "Login verified");

    let output = serde_json::json!({
        "success": true,
        "token": outcome.token,
        "method": outcome.method,
        "expiresAt": outcome.expires_at,
    });
    emit(cli, &output, |f| f.format_login(&outcome))
}
