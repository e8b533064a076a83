//! Process command - turn a payment notification into an invoice.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use fiscorelay_core::{ClientRecord, ResolutionSource};
use fiscorelay_providers::fiscozen::RegexExtractor;
use fiscorelay_store::SessionRecord;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use super::{emit, CredentialArgs};
use crate::context::AppContext;
use crate::Cli;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// File with the notification text; `-` reads stdin.
    #[arg(required_unless_present = "text")]
    pub input: Option<PathBuf>,

    /// Notification text given inline.
    #[arg(long, conflicts_with = "input")]
    pub text: Option<String>,

    /// Invoice this client instead of the extracted counterparty.
    #[arg(long)]
    pub client: Option<String>,

    /// Provider customer id of --client.
    #[arg(long, requires = "client")]
    pub client_id: Option<String>,

    /// Only show what would be extracted.
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

impl ProcessArgs {
    async fn read_text(&self) -> Result<String> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        match self.input.as_deref() {
            Some(path) if path.as_os_str() == "-" => {
                let mut text = String::new();
                tokio::io::stdin().read_to_string(&mut text).await?;
                Ok(text)
            }
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display())),
            None => Ok(String::new()),
        }
    }

    fn client_override(&self) -> Option<ClientRecord> {
        let mut client = ClientRecord::named(self.client.clone()?);
        if let Some(id) = &self.client_id {
            client = client.with_provider_id(id);
        }
        Some(client)
    }
}

/// Runs the process command.
pub async fn run(args: &ProcessArgs, cli: &Cli) -> Result<()> {
    let text = args.read_text().await?;
    let extractor = RegexExtractor::new();

    if args.dry_run {
        let mut extraction = extractor.extract_text(&text)?;
        if let Some(client) = args.client_override() {
            extraction.client = client;
        }
        return emit(cli, &extraction, |f| f.format_extraction(&extraction));
    }

    let ctx = AppContext::load(cli).await?;
    ctx.login(&args.credentials).await?;

    let outcome = ctx
        .workflow
        .process(&extractor, &text, args.client_override())
        .await?;
    info!(invoice_id = %outcome.receipt.id, resolution = outcome.resolution.as_str(), "Notification processed");

    let mut record = SessionRecord::new(json!(outcome.client), json!([]), "invoiced");
    if outcome.resolution == ResolutionSource::Created {
        if let Some(id) = &outcome.client.provider_customer_id {
            record = record.with_created_client_id(id);
        }
    }
    if let Err(e) = ctx.log.save_session(&record) {
        warn!(error = %e, "Failed to save session");
    }

    emit(cli, &outcome, |f| f.format_process(&outcome))
}
