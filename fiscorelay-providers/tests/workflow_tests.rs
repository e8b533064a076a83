//! End-to-end workflow scenarios.

mod common;

use std::sync::Arc;
use std::time::Duration;

use fiscorelay_core::{ClientRecord, InvoiceDraft, LineItem, ResolutionSource};
use fiscorelay_providers::fiscozen::{
    FiscozenError, RegexExtractor, RecordingSink, Workflow, CUSTOMERS_ENDPOINT, INVOICES_ENDPOINT,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

#[tokio::test]
async fn login_resolve_and_invoice() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;

    let session = workflow.sessions().store(workflow.caller()).current().unwrap();
    assert_eq!(session.csrf_token, "ABC123");

    Mock::given(method("GET"))
        .and(path(CUSTOMERS_ENDPOINT))
        .and(query_param("search", "Acme Srl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CUSTOMERS_ENDPOINT))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "cust-77" })))
        .expect(1)
        .mount(&server)
        .await;

    let before = request_count(&server).await;
    let resolution = workflow
        .resolve_client(ClientRecord::named("Acme Srl"))
        .await
        .unwrap();
    assert_eq!(resolution.customer_id(), "cust-77");
    assert_eq!(request_count(&server).await - before, 2);

    Mock::given(method("GET"))
        .and(path("/api/v1/customers/cust-77/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cust-77" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(INVOICES_ENDPOINT))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "id": "inv-9", "invoiceNumber": "FAT-2025-0001" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let draft = InvoiceDraft::new(resolution.client, vec![LineItem::new("Consulting", dec!(500))]);
    let receipt = workflow.create_invoice(draft).await.unwrap();

    assert_eq!(receipt.id, "inv-9");
    assert_eq!(receipt.invoice_number.as_deref(), Some("FAT-2025-0001"));
}

#[tokio::test]
async fn invoice_for_unknown_client_needs_creation() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path(CUSTOMERS_ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let draft = InvoiceDraft::new(
        ClientRecord::named("Nuovo Cliente Srl"),
        vec![LineItem::new("Consulting", dec!(500))],
    );
    let err = workflow.create_invoice(draft).await.unwrap_err();

    assert!(matches!(err, FiscozenError::CustomerNotResolved(name) if name == "Nuovo Cliente Srl"));
}

#[tokio::test]
async fn invoice_for_unresolved_client_uses_first_match() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path(CUSTOMERS_ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "results": [{ "id": 5 }, { "id": 6 }] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/customers/5/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(INVOICES_ENDPOINT))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 300 })))
        .mount(&server)
        .await;

    let draft = InvoiceDraft::new(
        ClientRecord::named("Acme Srl"),
        vec![LineItem::new("Consulting", dec!(500))],
    );
    let receipt = workflow.create_invoice(draft).await.unwrap();
    assert_eq!(receipt.id, "300");
}

#[tokio::test]
async fn overflowing_invoice_total_never_reaches_the_provider() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;
    let before = request_count(&server).await;

    let draft = InvoiceDraft::new(
        ClientRecord::named("Acme Srl").with_provider_id("7"),
        vec![LineItem::new("Consulting", Decimal::MAX).with_quantity(dec!(2))],
    );
    let err = workflow.create_invoice(draft).await.unwrap_err();
    assert!(matches!(err, FiscozenError::InvalidInput(_)));
    assert_eq!(request_count(&server).await, before);
}

#[tokio::test]
async fn process_runs_the_whole_pipeline() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path(CUSTOMERS_ENDPOINT))
        .and(query_param("search", "Stripe"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": 12, "company_name": "Stripe Payments Europe" }])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v1/customers/12/$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(INVOICES_ENDPOINT))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": "inv-3", "invoiceNumber": "3" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome = workflow
        .process(&RegexExtractor::new(), "Stripe payout received: €250,00", None)
        .await
        .unwrap();

    assert_eq!(outcome.resolution, ResolutionSource::Search);
    assert_eq!(outcome.client.provider_customer_id.as_deref(), Some("12"));
    assert_eq!(outcome.receipt.id, "inv-3");
    assert_eq!(outcome.extraction.transaction.amount, dec!(250.00));
}

#[tokio::test]
async fn process_refuses_an_unidentified_client() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;
    let before = request_count(&server).await;

    let err = workflow
        .process(&RegexExtractor::new(), "Bonifico ricevuto 500 EUR", None)
        .await
        .unwrap_err();
    assert!(matches!(err, FiscozenError::InvalidInput(_)));
    assert_eq!(request_count(&server).await, before);
}

#[tokio::test]
async fn process_accepts_a_named_client_for_anonymous_text() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;

    Mock::given(method("POST"))
        .and(path(INVOICES_ENDPOINT))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "inv-4" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v1/customers/41/$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = ClientRecord::named("Rossi Srl").with_provider_id("41");
    let outcome = workflow
        .process(&RegexExtractor::new(), "Bonifico ricevuto 500 EUR", Some(client))
        .await
        .unwrap();
    assert_eq!(outcome.resolution, ResolutionSource::Existing);
    assert_eq!(outcome.receipt.id, "inv-4");
}

#[tokio::test]
async fn process_requires_a_session() {
    let server = MockServer::start().await;
    let (workflow, _) = workflow_for(&server);

    let err = workflow
        .process(&RegexExtractor::new(), "Stripe €10", None)
        .await
        .unwrap_err();
    assert!(matches!(err, FiscozenError::NotAuthenticated));
}

#[tokio::test]
async fn slow_steps_time_out() {
    let server = MockServer::start().await;
    mount_landing(&server).await;
    mount_login_ok(&server).await;

    let mut settings = settings_for(&server);
    settings.step_timeout = Duration::from_millis(200);
    let workflow = Workflow::builder(settings)
        .with_sink(Arc::new(RecordingSink::new()))
        .build()
        .unwrap();
    workflow.login(credentials()).await.unwrap();

    Mock::given(method("GET"))
        .and(path(CUSTOMERS_ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "results": [] }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = workflow.search("Acme", None).await.unwrap_err();
    assert!(matches!(err, FiscozenError::Timeout(_)));
}

#[tokio::test]
async fn vat_and_location_lookups() {
    let server = MockServer::start().await;
    let (workflow, _) = workflow_for(&server);

    Mock::given(method("GET"))
        .and(path("/vies/check"))
        .and(query_param("countryCode", "IT"))
        .and(query_param("vatNumber", "12345678901"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "valid": true, "name": "ACME SRL" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zip/IT/20121"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "places": [{ "place name": "Milano", "state": "Lombardia" }]
        })))
        .mount(&server)
        .await;

    let vat = workflow.validate_vat("IT12345678901").await.unwrap();
    assert!(vat.valid);
    assert_eq!(vat.details.unwrap()["name"], "ACME SRL");

    let malformed = workflow.validate_vat("123").await.unwrap();
    assert!(!malformed.valid);
    assert_eq!(malformed.error.as_deref(), Some("Invalid VAT format"));

    let location = workflow.lookup_location("20121").await.unwrap();
    assert_eq!(location.comune, "Milano");
    assert_eq!(location.provincia, "Lombardia");

    assert!(matches!(
        workflow.lookup_location("2012").await,
        Err(FiscozenError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn lookup_service_failures_are_soft() {
    let server = MockServer::start().await;
    let (workflow, _) = workflow_for(&server);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let vat = workflow.validate_vat("12345678901").await.unwrap();
    assert!(!vat.valid);
    assert_eq!(vat.error.as_deref(), Some("Validation service unavailable"));

    let location = workflow.lookup_location("00100").await.unwrap();
    assert_eq!(location.comune, "");
    assert_eq!(location.error.as_deref(), Some("Location service unavailable"));
}
