//! Serde tests for the wire shapes of core types.
//!
//! The presentation layer speaks Italian field names; these tests pin the
//! accepted spellings on input and the emitted spellings on output.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::json;

use crate::{ClientRecord, InvoiceDraft, InvoiceReceipt, LineItem, SearchResult};

// ============================================================================
// ClientRecord Serde Tests
// ============================================================================

#[test]
fn test_client_record_from_italian_fields() {
    let value = json!({
        "ragioneSociale": "Acme Srl",
        "partitaIVA": "01234567890",
        "indirizzo": "Via Roma 1",
        "cap": "20121",
        "comune": "Milano",
        "provincia": "MI",
        "codiceDestinatario": "ABC1234",
        "pec": "acme@pec.it",
        "email": "info@acme.it",
        "telefono": "+39 02 1234567",
        "referente": "Mario Rossi"
    });

    let client: ClientRecord = serde_json::from_value(value).unwrap();
    assert_eq!(client.legal_name, "Acme Srl");
    assert_eq!(client.tax_id, "01234567890");
    assert_eq!(client.postal_code, "20121");
    assert_eq!(client.recipient_code, "ABC1234");
    assert_eq!(client.certified_email, "acme@pec.it");
    assert_eq!(client.contact_person, "Mario Rossi");
    assert!(client.provider_customer_id.is_none());
}

#[test]
fn test_client_record_from_english_aliases() {
    let value = json!({
        "legalName": "Acme Srl",
        "taxId": "01234567890",
        "providerCustomerId": "cust-77"
    });

    let client: ClientRecord = serde_json::from_value(value).unwrap();
    assert_eq!(client.legal_name, "Acme Srl");
    assert_eq!(client.provider_customer_id.as_deref(), Some("cust-77"));
}

#[test]
fn test_client_record_missing_fields_default() {
    let client: ClientRecord = serde_json::from_value(json!({})).unwrap();
    assert_eq!(client, ClientRecord::default());
}

#[test]
fn test_client_record_skips_unresolved_id() {
    let json = serde_json::to_value(ClientRecord::named("Acme Srl")).unwrap();
    assert!(json.get("id").is_none());
    assert_eq!(json["ragioneSociale"], "Acme Srl");
}

// ============================================================================
// SearchResult Serde Tests
// ============================================================================

#[test]
fn test_search_result_wire_names() {
    let result = SearchResult {
        provider_customer_id: "42".to_string(),
        legal_name: "Acme Srl".to_string(),
        tax_id: "01234567890".to_string(),
        municipality: "Milano".to_string(),
        ..SearchResult::default()
    };

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["id"], "42");
    assert_eq!(json["ragioneSociale"], "Acme Srl");
    assert_eq!(json["partitaIVA"], "01234567890");
    assert_eq!(json["comune"], "Milano");
    assert_eq!(json["telefono"], "");
}

// ============================================================================
// InvoiceDraft Serde Tests
// ============================================================================

#[test]
fn test_invoice_draft_from_presentation_payload() {
    let value = json!({
        "client": { "ragioneSociale": "Acme Srl", "id": "cust-77" },
        "date": "2025-01-15",
        "paymentDate": "2025-02-15",
        "lineItems": [
            { "id": "1", "description": "Consulting", "quantity": 1, "unitPrice": 500, "vatRate": 0, "total": 500 }
        ],
        "notes": "Grazie",
        "total": 500
    });

    let draft: InvoiceDraft = serde_json::from_value(value).unwrap();
    assert_eq!(draft.issue_date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2025, 2, 15));
    assert_eq!(draft.line_items.len(), 1);
    assert_eq!(draft.line_items[0].unit_amount, dec!(500));
    assert_eq!(draft.line_items[0].quantity, Some(dec!(1)));
    assert_eq!(draft.currency, "EUR");
    assert_eq!(draft.client.provider_customer_id.as_deref(), Some("cust-77"));
}

#[test]
fn test_invoice_draft_without_line_items_deserializes() {
    let value = json!({
        "client": { "ragioneSociale": "Acme Srl" },
        "date": "2025-01-15"
    });

    let draft: InvoiceDraft = serde_json::from_value(value).unwrap();
    assert!(draft.line_items.is_empty());
    assert!(draft.validate().is_err());
}

#[test]
fn test_line_item_unit_amount_alias() {
    let item: LineItem =
        serde_json::from_value(json!({ "description": "Consulting", "unitAmount": "500.00" }))
            .unwrap();
    assert_eq!(item.unit_amount, dec!(500.00));
    assert!(item.quantity.is_none());
}

// ============================================================================
// InvoiceReceipt Serde Tests
// ============================================================================

#[test]
fn test_invoice_receipt_serialization() {
    let receipt = InvoiceReceipt {
        id: "inv-9".to_string(),
        invoice_number: Some("FAT-2025-0001".to_string()),
    };
    let json = serde_json::to_value(&receipt).unwrap();
    assert_eq!(json, json!({ "id": "inv-9", "invoiceNumber": "FAT-2025-0001" }));
}
