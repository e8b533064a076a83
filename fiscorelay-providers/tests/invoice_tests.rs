//! Invoice submission against a mock provider.

mod common;

use chrono::NaiveDate;
use fiscorelay_core::{ClientRecord, InvoiceDraft, LineItem, WorkflowEvent};
use fiscorelay_providers::fiscozen::{FiscozenError, INVOICES_ENDPOINT};
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

fn draft(customer_id: &str) -> InvoiceDraft {
    InvoiceDraft::new(
        ClientRecord::named("Acme Srl").with_provider_id(customer_id),
        vec![LineItem::new("Consulting", dec!(500))],
    )
    .with_issue_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
}

async fn mount_detail(server: &MockServer, customer_id: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/customers/{customer_id}/")))
        .and(query_param("invoice_date", "2025-03-01"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "id": customer_id })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn invalid_drafts_make_no_network_call() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;
    let before = request_count(&server).await;

    let empty_rows = InvoiceDraft::new(ClientRecord::named("Acme Srl").with_provider_id("7"), vec![]);
    assert!(matches!(
        workflow.create_invoice(empty_rows).await,
        Err(FiscozenError::MissingLineItems)
    ));

    let nameless = InvoiceDraft::new(
        ClientRecord::default().with_provider_id("7"),
        vec![LineItem::new("Consulting", dec!(500))],
    );
    assert!(matches!(
        workflow.create_invoice(nameless).await,
        Err(FiscozenError::MissingClient)
    ));

    assert_eq!(request_count(&server).await, before);
}

#[tokio::test]
async fn invoice_payload_follows_provider_schema() {
    let server = MockServer::start().await;
    let (workflow, sink) = logged_in(&server).await;
    let referer = format!("{}/app/fatture/nuova", server.uri());
    mount_detail(&server, "cust-77", 200).await;

    Mock::given(method("POST"))
        .and(path(INVOICES_ENDPOINT))
        .and(header("x-csrftoken", "ABC123"))
        .and(header("referer", referer.as_str()))
        .and(body_partial_json(json!({
            "customer": "cust-77",
            "invoice_date": "2025-03-01",
            "payment_due_date": "2025-03-01",
            "self_invoice": false,
            "currency_code": "EUR",
            "fiscal_regime": "Forfettario",
            "rows": [{
                "key": "row1",
                "description": "Consulting",
                "quantity": null,
                "amount": "500.00",
                "total": "500.00",
                "invoice_vat": { "id": 24, "code": "NS7", "kind": "N2.2", "value": "0.00" }
            }]
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "invoiceId": "inv-1", "invoice_number": "1/2025" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let receipt = workflow.create_invoice(draft("cust-77")).await.unwrap();
    assert_eq!(receipt.id, "inv-1");
    assert_eq!(receipt.invoice_number.as_deref(), Some("1/2025"));
    assert!(sink.events().iter().any(|e| matches!(
        e,
        WorkflowEvent::InvoiceSubmitted { invoice_id, line_items: 1, .. } if invoice_id == "inv-1"
    )));
}

#[tokio::test]
async fn detail_failure_is_not_fatal() {
    let server = MockServer::start().await;
    let (workflow, sink) = logged_in(&server).await;
    mount_detail(&server, "cust-77", 404).await;

    Mock::given(method("POST"))
        .and(path(INVOICES_ENDPOINT))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "inv-2" })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = workflow.create_invoice(draft("cust-77")).await.unwrap();
    assert_eq!(receipt.id, "inv-2");
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, WorkflowEvent::CustomerDetailUnavailable { .. })));
}

#[tokio::test]
async fn detail_unauthorized_is_session_expired() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;
    mount_detail(&server, "cust-77", 401).await;

    Mock::given(method("POST"))
        .and(path(INVOICES_ENDPOINT))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = workflow.create_invoice(draft("cust-77")).await.unwrap_err();
    assert!(matches!(err, FiscozenError::SessionExpired));
    assert!(!workflow.is_authenticated());
}

#[tokio::test]
async fn rejection_carries_body_verbatim() {
    let server = MockServer::start().await;
    let (workflow, sink) = logged_in(&server).await;
    mount_detail(&server, "cust-77", 200).await;

    let body = r#"{"rows":[{"invoice_vat":["Codice IVA non valido"]}]}"#;
    Mock::given(method("POST"))
        .and(path(INVOICES_ENDPOINT))
        .respond_with(ResponseTemplate::new(400).set_body_string(body))
        .mount(&server)
        .await;

    let err = workflow.create_invoice(draft("cust-77")).await.unwrap_err();
    assert_eq!(err.provider_body(), Some(body));
    assert_eq!(err.provider_status(), Some(400));
    assert!(workflow.is_authenticated());
    assert!(matches!(
        sink.events().last(),
        Some(WorkflowEvent::InvoiceRejected { status: Some(400), .. })
    ));
}

#[tokio::test]
async fn invoice_unauthorized_is_session_expired() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;
    mount_detail(&server, "cust-77", 200).await;

    Mock::given(method("POST"))
        .and(path(INVOICES_ENDPOINT))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = workflow.create_invoice(draft("cust-77")).await.unwrap_err();
    assert!(matches!(err, FiscozenError::SessionExpired));
    assert!(!workflow.is_authenticated());
}
