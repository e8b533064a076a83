//! Invoice composition and submission.
//!
//! Maps a generic [`InvoiceDraft`] onto the provider's nested invoice schema.
//! Every row carries the same VAT exemption object: the account runs under
//! the flat-rate (forfettario) regime, where services fall outside the scope
//! of Italian VAT under articles 7 to 7-septies of DPR 633/1972.

use chrono::NaiveDate;
use fiscorelay_core::{InvoiceDraft, InvoiceReceipt, LineItem, WorkflowEvent};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::client::AuthenticatedClient;
use super::error::FiscozenError;
use super::parser::parse_invoice_receipt;
use super::settings::{CUSTOMERS_ENDPOINT, INVOICES_ENDPOINT, NEW_INVOICE_PAGE};

/// Fiscal regime of the account.
const FISCAL_REGIME: &str = "Forfettario";

// ============================================================================
// Exemption Profile
// ============================================================================

/// The VAT code object attached to each invoice row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExemptionProfile {
    /// Provider id of the VAT code.
    pub id: u32,
    /// Law citation.
    pub law: &'static str,
    /// Provider code.
    pub code: &'static str,
    /// Electronic-invoice nature code.
    pub kind: &'static str,
    /// VAT rate.
    pub value: &'static str,
    /// Note printed on the invoice.
    pub invoice_note: &'static str,
    /// Rate as shown in the provider UI.
    pub readable_value: &'static str,
}

impl ExemptionProfile {
    /// Services outside the scope of VAT (articles 7 to 7-septies).
    pub const NS7: Self = Self {
        id: 24,
        law: "OPERAZIONI NON SOGGETTE A IVA AI SENSI DEGLI ARTICOLI DA 7 A 7-SEPTIES DEL DPR 633/1972",
        code: "NS7",
        kind: "N2.2",
        value: "0.00",
        invoice_note: "Operazioni non soggette a Iva ai sensi degli articoli da 7 a 7-septies del Dpr 633/1972",
        readable_value: "–",
    };
}

impl Default for ExemptionProfile {
    fn default() -> Self {
        Self::NS7
    }
}

// ============================================================================
// Invoice Payload
// ============================================================================

/// One invoice row in provider format.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRow {
    /// Row key (`row1`, `row2`, ...).
    pub key: String,
    /// Row description.
    pub description: String,
    /// Quantity; the provider accepts `null` for a single unit.
    pub quantity: Option<String>,
    /// Unit amount, two decimals.
    pub amount: String,
    /// Row total, two decimals.
    pub total: String,
    /// VAT code object.
    pub invoice_vat: ExemptionProfile,
    /// Welfare contribution flag.
    pub welfare_applied: bool,
    /// ENASARCO contribution flag.
    pub enasarco_applied: bool,
    /// Ex-ENPALS contribution flag.
    pub ex_enpals_applied: bool,
}

/// Invoice in provider format.
#[derive(Debug, Clone, Serialize)]
pub struct InvoicePayload {
    /// Provider customer id.
    pub customer: String,
    /// Issue date.
    pub invoice_date: NaiveDate,
    /// Payment due date.
    pub payment_due_date: NaiveDate,
    /// Self-billing flag.
    pub self_invoice: bool,
    /// Rows.
    pub rows: Vec<InvoiceRow>,
    /// Free notes.
    pub notes: Vec<String>,
    /// ISO currency code.
    pub currency_code: String,
    /// Fiscal regime.
    pub fiscal_regime: &'static str,
    /// Payment method id.
    pub payment_method: Option<String>,
    /// Service kind.
    pub service_kind: &'static str,
    /// ENASARCO rate.
    pub enasarco_rate: u32,
    /// Welfare percentage.
    pub welfare_perc: &'static str,
    /// Add a welfare row.
    pub add_welfare_row: bool,
    /// Add a tax stamp row.
    pub add_tax_stamp_row: bool,
    /// Ex-ENPALS contribution flag.
    pub ex_enpals_applied: bool,
    /// Welfare applicability.
    pub welfare_applicable: bool,
    /// Tax stamp applicability.
    pub tax_stamp_applicable: bool,
    /// Withholding tax applicability.
    pub withholding_tax_applicable: bool,
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn row(index: usize, item: &LineItem, profile: ExemptionProfile) -> Result<InvoiceRow, FiscozenError> {
    Ok(InvoiceRow {
        key: format!("row{}", index + 1),
        description: item.description.clone(),
        quantity: item.quantity.map(|q| q.normalize().to_string()),
        amount: money(item.unit_amount),
        total: money(item.total()?),
        invoice_vat: profile,
        welfare_applied: false,
        enasarco_applied: false,
        ex_enpals_applied: false,
    })
}

#[derive(Serialize)]
struct DetailQuery {
    invoice_date: NaiveDate,
}

// ============================================================================
// Invoice Composer
// ============================================================================

/// Builds and submits provider invoices.
#[derive(Debug, Clone, Copy)]
pub struct InvoiceComposer<'a> {
    client: &'a AuthenticatedClient,
    profile: ExemptionProfile,
}

impl<'a> InvoiceComposer<'a> {
    /// Creates a composer over an authenticated client.
    pub fn new(client: &'a AuthenticatedClient) -> Self {
        Self {
            client,
            profile: ExemptionProfile::NS7,
        }
    }

    /// Builds the provider payload. Makes no network call.
    pub fn compose(&self, draft: &InvoiceDraft) -> Result<InvoicePayload, FiscozenError> {
        draft.validate()?;
        let customer = draft
            .client
            .provider_customer_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FiscozenError::CustomerNotResolved(draft.client.legal_name.clone()))?;

        let rows = draft
            .line_items
            .iter()
            .enumerate()
            .map(|(i, item)| row(i, item, self.profile))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InvoicePayload {
            customer,
            invoice_date: draft.issue_date,
            payment_due_date: draft.effective_due_date(),
            self_invoice: false,
            rows,
            notes: draft
                .notes
                .iter()
                .filter(|n| !n.trim().is_empty())
                .cloned()
                .collect(),
            currency_code: draft.currency.clone(),
            fiscal_regime: FISCAL_REGIME,
            payment_method: None,
            service_kind: "",
            enasarco_rate: 0,
            welfare_perc: "0%",
            add_welfare_row: false,
            add_tax_stamp_row: false,
            ex_enpals_applied: false,
            welfare_applicable: false,
            tax_stamp_applicable: false,
            withholding_tax_applicable: false,
        })
    }

    /// Validates, pre-fetches the customer detail and submits the invoice.
    #[instrument(skip(self, draft), fields(client = %draft.client.legal_name, rows = draft.line_items.len()))]
    pub async fn submit(&self, draft: &InvoiceDraft) -> Result<InvoiceReceipt, FiscozenError> {
        let payload = self.compose(draft)?;
        let total = draft.total()?;

        self.prefetch_customer(&payload.customer, draft.issue_date)
            .await?;

        let client_name = draft.client.legal_name.clone();
        let response = match self
            .client
            .post(INVOICES_ENDPOINT, &payload, Some(NEW_INVOICE_PAGE))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.client.sink().observe(&WorkflowEvent::InvoiceRejected {
                    client_name,
                    status: None,
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        if !response.is_success() {
            warn!(status = response.status, body = %response.body, "Invoice rejected");
            self.client.sink().observe(&WorkflowEvent::InvoiceRejected {
                client_name,
                status: Some(response.status),
                error: response.message(),
            });
            return Err(FiscozenError::InvoiceRejected {
                status: response.status,
                body: response.body,
            });
        }

        let receipt = parse_invoice_receipt(&response.body)?;
        info!(
            invoice_id = %receipt.id,
            invoice_number = ?receipt.invoice_number,
            total = %total,
            "Invoice created"
        );
        self.client.sink().observe(&WorkflowEvent::InvoiceSubmitted {
            invoice_id: receipt.id.clone(),
            invoice_number: receipt.invoice_number.clone(),
            client_name,
            line_items: payload.rows.len(),
        });
        Ok(receipt)
    }

    /// Fetches the customer detail for the invoice date.
    ///
    /// Only a 401 is fatal; anything else is reported and ignored.
    async fn prefetch_customer(
        &self,
        customer_id: &str,
        invoice_date: NaiveDate,
    ) -> Result<(), FiscozenError> {
        let path = format!("{CUSTOMERS_ENDPOINT}{customer_id}/");
        let reason = match self
            .client
            .get(&path, &DetailQuery { invoice_date }, None)
            .await
        {
            Ok(response) if response.is_success() => {
                debug!(customer_id = %customer_id, "Customer detail retrieved");
                return Ok(());
            }
            Ok(response) => format!("HTTP {}: {}", response.status, response.message()),
            Err(e) if e.is_auth_failure() => return Err(e),
            Err(e) => e.to_string(),
        };

        warn!(customer_id = %customer_id, reason = %reason, "Customer detail unavailable");
        self.client.sink().observe(&WorkflowEvent::CustomerDetailUnavailable {
            customer_id: customer_id.to_string(),
            reason,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiscozen::settings::FiscozenSettings;
    use fiscorelay_core::{ClientRecord, NullSink};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[test]
    fn test_row_formatting() {
        let item = LineItem::new("Consulting", dec!(500)).with_quantity(dec!(2));
        let row = row(0, &item, ExemptionProfile::NS7).unwrap();
        assert_eq!(row.key, "row1");
        assert_eq!(row.amount, "500.00");
        assert_eq!(row.total, "1000.00");
        assert_eq!(row.quantity.as_deref(), Some("2"));
    }

    #[test]
    fn test_money_rounds_to_cents() {
        assert_eq!(money(dec!(10.005)), "10.00");
        assert_eq!(money(dec!(99.999)), "100.00");
        assert_eq!(money(dec!(0)), "0.00");
    }

    #[test]
    fn test_exemption_profile_wire_shape() {
        let value = serde_json::to_value(ExemptionProfile::NS7).unwrap();
        assert_eq!(value["id"], 24);
        assert_eq!(value["code"], "NS7");
        assert_eq!(value["kind"], "N2.2");
        assert_eq!(value["value"], "0.00");
        assert_eq!(value["readable_value"], "–");
    }

    #[test]
    fn test_payload_defaults() {
        let draft = InvoiceDraft::new(
            ClientRecord::named("Acme Srl").with_provider_id("cust-77"),
            vec![LineItem::new("Consulting", dec!(500))],
        )
        .with_issue_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        let payload = serde_json::to_value(payload_for(&draft)).unwrap();
        assert_eq!(payload["customer"], "cust-77");
        assert_eq!(payload["invoice_date"], "2025-03-01");
        assert_eq!(payload["payment_due_date"], "2025-03-01");
        assert_eq!(payload["self_invoice"], false);
        assert_eq!(payload["notes"], serde_json::json!([]));
        assert_eq!(payload["currency_code"], "EUR");
        assert_eq!(payload["fiscal_regime"], "Forfettario");
        assert!(payload["payment_method"].is_null());
        assert!(payload["rows"][0]["quantity"].is_null());
        assert_eq!(payload["rows"][0]["invoice_vat"]["code"], "NS7");
    }

    fn offline_client() -> AuthenticatedClient {
        let settings = Arc::new(FiscozenSettings::default());
        AuthenticatedClient::new(
            settings.http_client().unwrap(),
            settings,
            Arc::default(),
            Arc::new(NullSink),
        )
    }

    fn payload_for(draft: &InvoiceDraft) -> InvoicePayload {
        InvoiceComposer::new(&offline_client()).compose(draft).unwrap()
    }

    #[test]
    fn test_unresolved_client_is_rejected() {
        let draft = InvoiceDraft::new(
            ClientRecord::named("Acme Srl"),
            vec![LineItem::new("Consulting", dec!(500))],
        );
        let client = offline_client();
        assert!(matches!(
            InvoiceComposer::new(&client).compose(&draft),
            Err(FiscozenError::CustomerNotResolved(_))
        ));
    }

    #[test]
    fn test_overflowing_amount_is_rejected() {
        let draft = InvoiceDraft::new(
            ClientRecord::named("Acme Srl").with_provider_id("7"),
            vec![LineItem::new("Consulting", Decimal::MAX).with_quantity(dec!(3))],
        );
        let client = offline_client();
        assert!(matches!(
            InvoiceComposer::new(&client).compose(&draft),
            Err(FiscozenError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rows_follow_line_items() {
        let draft = InvoiceDraft::new(
            ClientRecord::named("Acme Srl").with_provider_id("7"),
            vec![
                LineItem::new("Design", dec!(300)),
                LineItem::new("Hosting", dec!(12.5)).with_quantity(dec!(12)),
            ],
        )
        .with_notes("Bonifico a 30 giorni");

        let payload = payload_for(&draft);
        assert_eq!(payload.rows.len(), 2);
        assert_eq!(payload.rows[1].key, "row2");
        assert_eq!(payload.rows[1].total, "150.00");
        assert_eq!(payload.notes, vec!["Bonifico a 30 giorni".to_string()]);
    }
}
