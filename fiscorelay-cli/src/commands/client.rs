//! Client command - create a provider customer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use fiscorelay_core::ClientRecord;
use serde_json::json;
use tracing::info;

use super::{emit, CredentialArgs};
use crate::context::AppContext;
use crate::output::ResolutionOutput;
use crate::Cli;

/// Arguments for the client command.
#[derive(Args)]
pub struct ClientArgs {
    /// Company legal name (ragione sociale).
    #[arg(long, required_unless_present = "file")]
    pub name: Option<String>,

    /// VAT number or fiscal code.
    #[arg(long)]
    pub vat: Option<String>,

    /// Street address.
    #[arg(long)]
    pub address: Option<String>,

    /// Postal code.
    #[arg(long)]
    pub cap: Option<String>,

    /// Municipality.
    #[arg(long)]
    pub comune: Option<String>,

    /// Province code.
    #[arg(long)]
    pub provincia: Option<String>,

    /// SDI recipient code.
    #[arg(long)]
    pub sdi: Option<String>,

    /// Certified e-mail (PEC).
    #[arg(long)]
    pub pec: Option<String>,

    /// Contact e-mail.
    #[arg(long = "client-email")]
    pub client_email: Option<String>,

    /// Phone number.
    #[arg(long)]
    pub phone: Option<String>,

    /// Read the client record from a JSON file instead.
    #[arg(long, conflicts_with = "name")]
    pub file: Option<PathBuf>,

    /// Search first and reuse an existing customer when one matches.
    #[arg(long)]
    pub resolve: bool,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

impl ClientArgs {
    /// Builds the client record from the flags or the JSON file.
    pub async fn record(&self) -> Result<ClientRecord> {
        if let Some(path) = &self.file {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return serde_json::from_str(&raw)
                .with_context(|| format!("Invalid client record in {}", path.display()));
        }

        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        Ok(ClientRecord {
            legal_name: field(&self.name),
            tax_id: field(&self.vat),
            address: field(&self.address),
            postal_code: field(&self.cap),
            municipality: field(&self.comune),
            province: field(&self.provincia),
            recipient_code: field(&self.sdi),
            certified_email: field(&self.pec),
            email: field(&self.client_email),
            phone: field(&self.phone),
            ..ClientRecord::default()
        })
    }
}

/// Runs the client command.
pub async fn run(args: &ClientArgs, cli: &Cli) -> Result<()> {
    let record = args.record().await?;
    let ctx = AppContext::load(cli).await?;
    ctx.login(&args.credentials).await?;

    if args.resolve {
        let resolution = ctx.workflow.resolve_client(record).await?;
        info!(customer_id = %resolution.customer_id(), source = resolution.source.as_str(), "Client resolved");
        return emit(cli, &ResolutionOutput::from(&resolution), |f| {
            f.format_resolution(&resolution)
        });
    }

    let id = ctx.workflow.create_client(&record).await?;
    let output = json!({ "success": true, "id": id });
    emit(cli, &output, |_| {
        format!("Client created: {} (id {id})", record.legal_name)
    })
}
