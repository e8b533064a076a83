//! Extraction output types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::client::ClientRecord;
use super::invoice::{InvoiceDraft, LineItem};

/// Structured payment data pulled from a free-text notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    /// Total amount paid.
    pub amount: Decimal,
    /// ISO currency code of `amount`.
    pub currency: String,
    /// Billable services found in the text.
    #[serde(default)]
    pub services: Vec<LineItem>,
    /// Payment date, when the text carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Short description of the payment.
    #[serde(default)]
    pub description: String,
    /// The text the data was extracted from.
    #[serde(default)]
    pub original_text: String,
}

/// A transaction together with its counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    /// Payment data.
    pub transaction: TransactionData,
    /// Counterparty to invoice.
    pub client: ClientRecord,
}

impl Extraction {
    /// Turns the extraction into an invoice draft.
    ///
    /// When the extractor found no service rows, a single row carrying the
    /// full amount and the transaction description is used.
    pub fn into_draft(self) -> InvoiceDraft {
        let Extraction { transaction, client } = self;

        let line_items = if transaction.services.is_empty() {
            vec![LineItem::new(
                transaction.description.clone(),
                transaction.amount,
            )]
        } else {
            transaction.services
        };

        let mut draft = InvoiceDraft::new(client, line_items);
        if let Some(date) = transaction.date {
            draft.issue_date = date;
        }
        draft.currency = transaction.currency;
        draft
    }
}
