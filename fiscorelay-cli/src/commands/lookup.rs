//! Lookup command - VAT number and postal code checks.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::emit;
use crate::context::AppContext;
use crate::Cli;

/// Arguments for the lookup command.
#[derive(Args)]
pub struct LookupArgs {
    #[command(subcommand)]
    pub action: LookupAction,
}

/// Lookup subcommands.
#[derive(Subcommand)]
pub enum LookupAction {
    /// Check an Italian VAT number against VIES.
    Vat {
        /// VAT number, with or without the IT prefix.
        partita_iva: String,
    },

    /// Resolve an Italian postal code to municipality and province.
    Cap {
        /// Five-digit postal code.
        cap: String,
    },
}

/// Runs the lookup command. No provider login is needed.
pub async fn run(args: &LookupArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli).await?;

    match &args.action {
        LookupAction::Vat { partita_iva } => {
            let validation = ctx.workflow.validate_vat(partita_iva).await?;
            emit(cli, &validation, |f| f.format_vat(partita_iva, &validation))
        }
        LookupAction::Cap { cap } => {
            let location = ctx.workflow.lookup_location(cap).await?;
            emit(cli, &location, |f| f.format_location(cap, &location))
        }
    }
}
