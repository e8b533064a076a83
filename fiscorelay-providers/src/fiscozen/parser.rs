//! Fiscozen response parsing.
//!
//! The provider answers the same endpoint with different envelopes and key
//! spellings. Each endpoint gets a small parser that tries the known shapes
//! in a fixed order and fails with
//! [`FiscozenError::UnrecognizedResponseShape`] instead of defaulting to an
//! empty value.

use fiscorelay_core::{InvoiceReceipt, SearchResult};
use serde::Deserialize;
use serde_json::Value;

use super::error::FiscozenError;

// ============================================================================
// Search Envelope
// ============================================================================

/// The envelopes observed on the customer search endpoint, in priority order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchEnvelope {
    /// Paginated `{ "results": [...] }`.
    Results { results: Vec<RawCustomer> },
    /// `{ "data": [...] }`.
    Data { data: Vec<RawCustomer> },
    /// Bare array.
    Bare(Vec<RawCustomer>),
}

impl SearchEnvelope {
    fn into_customers(self) -> Vec<RawCustomer> {
        match self {
            Self::Results { results } => results,
            Self::Data { data } => data,
            Self::Bare(customers) => customers,
        }
    }
}

/// A customer as the provider returns it.
///
/// Scalars are kept as raw JSON so one odd value (a numeric phone, a null
/// VAT number) never fails the whole envelope.
#[derive(Debug, Default, Deserialize)]
struct RawCustomer {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    company_name: Option<Value>,
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    vat_number: Option<Value>,
    #[serde(default)]
    fiscal_code: Option<Value>,
    #[serde(default)]
    municipality: Option<Value>,
    #[serde(default)]
    province: Option<Value>,
    #[serde(default)]
    address: Option<Value>,
    #[serde(default)]
    email: Option<Value>,
    #[serde(default)]
    phone: Option<Value>,
}

impl RawCustomer {
    fn into_search_result(self) -> SearchResult {
        SearchResult {
            provider_customer_id: text(self.id.as_ref()),
            legal_name: first_non_empty(self.company_name.as_ref(), self.name.as_ref()),
            tax_id: first_non_empty(self.vat_number.as_ref(), self.fiscal_code.as_ref()),
            municipality: text(self.municipality.as_ref()),
            province: text(self.province.as_ref()),
            address: text(self.address.as_ref()),
            email: text(self.email.as_ref()),
            phone: text(self.phone.as_ref()),
        }
    }
}

fn text(value: Option<&Value>) -> String {
    value.and_then(id_string).unwrap_or_default()
}

fn first_non_empty(primary: Option<&Value>, fallback: Option<&Value>) -> String {
    primary
        .and_then(id_string)
        .or_else(|| fallback.and_then(id_string))
        .unwrap_or_default()
}

/// Renders a scalar that may arrive as a number or a string.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns the first present id among `keys`.
fn first_id(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| body.get(key).and_then(id_string))
}

fn shape_error(what: &str, body: &str) -> FiscozenError {
    let preview: String = body.chars().take(200).collect();
    FiscozenError::UnrecognizedResponseShape(format!("{what}: {preview}"))
}

// ============================================================================
// Public Parsers
// ============================================================================

/// Parses a customer search response into search results.
pub fn parse_search_response(body: &str) -> Result<Vec<SearchResult>, FiscozenError> {
    let envelope: SearchEnvelope =
        serde_json::from_str(body).map_err(|_| shape_error("customer search", body))?;

    Ok(envelope
        .into_customers()
        .into_iter()
        .map(RawCustomer::into_search_result)
        .collect())
}

/// Parses the id out of a create-customer response (`id` or `clientId`).
pub fn parse_created_customer(body: &str) -> Result<String, FiscozenError> {
    let value: Value =
        serde_json::from_str(body).map_err(|_| shape_error("customer create", body))?;

    first_id(&value, &["id", "clientId"]).ok_or_else(|| shape_error("customer create", body))
}

/// Parses an invoice-create response.
///
/// The id may be `id` or `invoiceId`; the number `invoiceNumber` or
/// `invoice_number`. Only the id is required.
pub fn parse_invoice_receipt(body: &str) -> Result<InvoiceReceipt, FiscozenError> {
    let value: Value =
        serde_json::from_str(body).map_err(|_| shape_error("invoice create", body))?;

    let id = first_id(&value, &["id", "invoiceId"])
        .ok_or_else(|| shape_error("invoice create", body))?;
    let invoice_number = first_id(&value, &["invoiceNumber", "invoice_number"]);

    Ok(InvoiceReceipt { id, invoice_number })
}

/// Extracts a human-readable message from a provider error body.
///
/// Looks at `message`, `detail` and `error`, in that order, or takes the
/// body itself when it is a JSON string.
pub fn provider_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Object(map) => ["message", "detail", "error"].iter().find_map(|key| {
            map.get(*key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
        }),
        _ => None,
    }
}

/// Returns the `token` field of a direct-login response.
pub fn parse_login_token(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("token")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOMER: &str = r#"{
        "id": 77,
        "company_name": "Acme Srl",
        "vat_number": "12345678901",
        "municipality": "Milano",
        "province": "MI",
        "address": "Via Roma 1",
        "email": "info@acme.it",
        "phone": "02123456"
    }"#;

    #[test]
    fn test_envelopes_normalize_identically() {
        let results = parse_search_response(&format!(r#"{{"count":1,"results":[{CUSTOMER}]}}"#)).unwrap();
        let data = parse_search_response(&format!(r#"{{"data":[{CUSTOMER}]}}"#)).unwrap();
        let bare = parse_search_response(&format!("[{CUSTOMER}]")).unwrap();

        assert_eq!(results, data);
        assert_eq!(data, bare);
        assert_eq!(results[0].provider_customer_id, "77");
        assert_eq!(results[0].legal_name, "Acme Srl");
    }

    #[test]
    fn test_empty_results_are_valid() {
        assert!(parse_search_response(r#"{"results":[]}"#).unwrap().is_empty());
        assert!(parse_search_response("[]").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_envelope_fails() {
        let err = parse_search_response(r#"{"detail":"Not found."}"#).unwrap_err();
        assert!(matches!(err, FiscozenError::UnrecognizedResponseShape(_)));
    }

    #[test]
    fn test_receipt_key_spellings() {
        let receipt = parse_invoice_receipt(r#"{"id":"inv-9","invoiceNumber":"FAT-2025-0001"}"#).unwrap();
        assert_eq!(receipt.id, "inv-9");
        assert_eq!(receipt.invoice_number.as_deref(), Some("FAT-2025-0001"));

        let receipt = parse_invoice_receipt(r#"{"invoiceId":12,"invoice_number":"3/2025"}"#).unwrap();
        assert_eq!(receipt.id, "12");
        assert_eq!(receipt.invoice_number.as_deref(), Some("3/2025"));
    }

    #[test]
    fn test_provider_message() {
        assert_eq!(provider_message(r#"{"message":"Bad"}"#).as_deref(), Some("Bad"));
        assert_eq!(provider_message(r#"{"detail":"Nope"}"#).as_deref(), Some("Nope"));
        assert_eq!(provider_message(r#""plain""#).as_deref(), Some("plain"));
        assert_eq!(provider_message("<html></html>"), None);
    }
}
