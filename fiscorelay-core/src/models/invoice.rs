//! Invoice-related types.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::client::ClientRecord;
use crate::error::CoreError;

/// Default invoice currency.
pub const DEFAULT_CURRENCY: &str = "EUR";

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ============================================================================
// Line Item
// ============================================================================

/// One billable row of an invoice draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Row description.
    pub description: String,
    /// Quantity, if the row is not a lump sum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    /// Unit amount, before tax.
    #[serde(alias = "unitPrice")]
    pub unit_amount: Decimal,
    /// VAT code requested by the caller, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_code: Option<String>,
}

impl LineItem {
    /// Creates a lump-sum line item.
    pub fn new(description: impl Into<String>, unit_amount: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity: None,
            unit_amount,
            vat_code: None,
        }
    }

    /// Sets the quantity.
    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Returns the row total (`unit_amount * quantity`, or `unit_amount`
    /// for lump sums).
    pub fn total(&self) -> Result<Decimal, CoreError> {
        match self.quantity {
            Some(quantity) => self
                .unit_amount
                .checked_mul(quantity)
                .ok_or(CoreError::AmountOverflow),
            None => Ok(self.unit_amount),
        }
    }
}

// ============================================================================
// Invoice Draft
// ============================================================================

/// A generic line-item invoice awaiting submission to the provider.
///
/// Invariant: at least one line item, and the client must be resolved to a
/// provider customer id before submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    /// Invoiced client.
    pub client: ClientRecord,
    /// Issue date.
    #[serde(rename = "date", alias = "issueDate", default = "today")]
    pub issue_date: NaiveDate,
    /// Payment due date; falls back to the issue date.
    #[serde(default, alias = "paymentDate", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Billable rows.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Free-text notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// ISO currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl InvoiceDraft {
    /// Creates a draft for a client, issued today, in the default currency.
    pub fn new(client: ClientRecord, line_items: Vec<LineItem>) -> Self {
        Self {
            client,
            issue_date: today(),
            due_date: None,
            line_items,
            notes: None,
            currency: default_currency(),
        }
    }

    /// Sets the issue date.
    pub fn with_issue_date(mut self, date: NaiveDate) -> Self {
        self.issue_date = date;
        self
    }

    /// Sets the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns the payment due date (issue date when unset).
    pub fn effective_due_date(&self) -> NaiveDate {
        self.due_date.unwrap_or(self.issue_date)
    }

    /// Returns the sum of all row totals.
    pub fn total(&self) -> Result<Decimal, CoreError> {
        self.line_items.iter().try_fold(Decimal::ZERO, |sum, item| {
            sum.checked_add(item.total()?).ok_or(CoreError::AmountOverflow)
        })
    }

    /// Checks the structural invariants that need no network access.
    ///
    /// Line items are checked first, then the client legal name, then
    /// that the totals are representable.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.line_items.is_empty() {
            return Err(CoreError::MissingLineItems);
        }
        if !self.client.has_legal_name() {
            return Err(CoreError::MissingClient);
        }
        self.total()?;
        Ok(())
    }
}

// ============================================================================
// Invoice Receipt
// ============================================================================

/// What the provider returned for a created invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceReceipt {
    /// Provider invoice id.
    pub id: String,
    /// Human-facing invoice number, when the provider returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
