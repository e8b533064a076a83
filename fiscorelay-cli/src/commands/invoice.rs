//! Invoice command - submit an invoice for a client.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use fiscorelay_core::{ClientRecord, InvoiceDraft, LineItem};
use rust_decimal::Decimal;
use tracing::info;

use super::{emit, CredentialArgs};
use crate::context::AppContext;
use crate::output::ReceiptOutput;
use crate::Cli;

/// Arguments for the invoice command.
#[derive(Args)]
pub struct InvoiceArgs {
    /// Client legal name; looked up on the provider unless --client-id is given.
    #[arg(long, required_unless_present = "file")]
    pub client: Option<String>,

    /// Provider customer id.
    #[arg(long)]
    pub client_id: Option<String>,

    /// Line item as DESCRIPTION=AMOUNT; repeat for more rows.
    #[arg(long = "item", value_parser = parse_item, required_unless_present = "file")]
    pub items: Vec<LineItem>,

    /// Issue date (YYYY-MM-DD); today when omitted.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Payment due date (YYYY-MM-DD); the issue date when omitted.
    #[arg(long)]
    pub due_date: Option<NaiveDate>,

    /// Notes printed on the invoice.
    #[arg(long)]
    pub notes: Option<String>,

    /// Read the whole draft from a JSON file instead.
    #[arg(long, conflicts_with_all = ["client", "items"])]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Parses `DESCRIPTION=AMOUNT`.
fn parse_item(raw: &str) -> Result<LineItem, String> {
    let (description, amount) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected DESCRIPTION=AMOUNT, got '{raw}'"))?;
    let description = description.trim();
    if description.is_empty() {
        return Err("line item description is empty".to_string());
    }
    let amount = Decimal::from_str(&amount.trim().replace(',', "."))
        .map_err(|_| format!("invalid amount '{amount}'"))?;
    Ok(LineItem::new(description, amount))
}

impl InvoiceArgs {
    /// Builds the draft from the flags or the JSON file.
    pub async fn draft(&self) -> Result<InvoiceDraft> {
        if let Some(path) = &self.file {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return serde_json::from_str(&raw)
                .with_context(|| format!("Invalid invoice draft in {}", path.display()));
        }

        let mut client = ClientRecord::named(self.client.clone().unwrap_or_default());
        if let Some(id) = &self.client_id {
            client = client.with_provider_id(id);
        }

        let mut draft = InvoiceDraft::new(client, self.items.clone());
        if let Some(date) = self.date {
            draft = draft.with_issue_date(date);
        }
        draft.due_date = self.due_date;
        if let Some(notes) = &self.notes {
            draft = draft.with_notes(notes);
        }
        Ok(draft)
    }
}

/// Runs the invoice command.
pub async fn run(args: &InvoiceArgs, cli: &Cli) -> Result<()> {
    let draft = args.draft().await?;
    // Local validation first so a bad draft never costs a login.
    draft.validate()?;

    let ctx = AppContext::load(cli).await?;
    ctx.login(&args.credentials).await?;

    let total = draft.total()?;
    let receipt = ctx.workflow.create_invoice(draft).await?;
    info!(invoice_id = %receipt.id, total = %total, "Invoice submitted");

    emit(cli, &ReceiptOutput::from(&receipt), |f| f.format_receipt(&receipt))
}
