//! JSON output formatting.

use anyhow::Result;
use fiscorelay_core::{ClientRecord, InvoiceReceipt, ResolutionSource};
use fiscorelay_providers::fiscozen::Resolution;
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// A resolved or created customer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionOutput {
    pub success: bool,
    pub id: String,
    pub source: ResolutionSource,
    pub client: ClientRecord,
}

impl From<&Resolution> for ResolutionOutput {
    fn from(resolution: &Resolution) -> Self {
        Self {
            success: true,
            id: resolution.customer_id().to_string(),
            source: resolution.source,
            client: resolution.client.clone(),
        }
    }
}

/// A created invoice, in the shape the web frontend expects.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptOutput {
    pub success: bool,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
}

impl From<&InvoiceReceipt> for ReceiptOutput {
    fn from(receipt: &InvoiceReceipt) -> Self {
        Self {
            success: true,
            id: receipt.id.clone(),
            invoice_number: receipt.invoice_number.clone(),
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}
