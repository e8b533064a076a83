//! Search command - look up provider customers by name.

use anyhow::Result;
use clap::Args;

use super::{emit, CredentialArgs};
use crate::context::AppContext;
use crate::Cli;

/// Arguments for the search command.
#[derive(Args)]
pub struct SearchArgs {
    /// Company name to search for.
    pub company_name: String,

    /// VAT number, recorded with the search.
    #[arg(long = "vat")]
    pub partita_iva: Option<String>,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Runs the search command.
pub async fn run(args: &SearchArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli).await?;
    ctx.login(&args.credentials).await?;

    let results = ctx
        .workflow
        .search(&args.company_name, args.partita_iva.as_deref())
        .await?;

    let output = serde_json::json!({ "success": true, "results": results });
    emit(cli, &output, |f| {
        f.format_search_results(&args.company_name, &results)
    })
}
