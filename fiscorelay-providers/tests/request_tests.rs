//! Authenticated request wrapper behavior.

mod common;

use std::time::Duration;

use fiscorelay_core::{ProviderSession, WorkflowEvent};
use fiscorelay_providers::fiscozen::{FiscozenError, CUSTOMERS_ENDPOINT};
use serde_json::json;
use wiremock::matchers::{any, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

#[tokio::test]
async fn unauthenticated_calls_never_reach_the_network() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (workflow, _) = workflow_for(&server);
    let err = workflow.search("Acme Srl", None).await.unwrap_err();

    assert!(matches!(err, FiscozenError::NotAuthenticated));
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn session_headers_are_attached() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;
    let origin = server.uri();

    Mock::given(method("GET"))
        .and(path(CUSTOMERS_ENDPOINT))
        .and(query_param("search", "Acme Srl"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "25"))
        .and(header("cookie", "csrftoken=ABC123; sessionid=S3SS10N"))
        .and(header("x-csrftoken", "ABC123"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(header("origin", origin.as_str()))
        .and(header("referer", format!("{origin}/").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let results = workflow.search("Acme Srl", None).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn unauthorized_response_clears_the_session() {
    let server = MockServer::start().await;
    let (workflow, sink) = logged_in(&server).await;
    assert!(workflow.is_authenticated());

    Mock::given(method("GET"))
        .and(path(CUSTOMERS_ENDPOINT))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "expired" })))
        .mount(&server)
        .await;

    let err = workflow.search("Acme Srl", None).await.unwrap_err();
    assert!(matches!(err, FiscozenError::SessionExpired));
    assert!(!workflow.is_authenticated());
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, WorkflowEvent::SessionCleared { .. })));

    // The next call fails locally until the caller logs in again.
    let before = request_count(&server).await;
    let err = workflow.search("Acme Srl", None).await.unwrap_err();
    assert!(matches!(err, FiscozenError::NotAuthenticated));
    assert_eq!(request_count(&server).await, before);
}

#[tokio::test]
async fn late_unauthorized_keeps_a_newer_session() {
    let server = MockServer::start().await;
    let (workflow, sink) = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path(CUSTOMERS_ENDPOINT))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "expired" }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let relogin = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        workflow.sessions().store(workflow.caller()).set(ProviderSession::new(
            "csrftoken=NEW; sessionid=S2",
            "NEW",
            "session-newer",
            chrono::Duration::hours(24),
        ));
    };
    let (result, ()) = tokio::join!(workflow.search("Acme Srl", None), relogin);

    assert!(matches!(result, Err(FiscozenError::SessionExpired)));
    assert!(workflow.is_authenticated());
    let session = workflow.sessions().store(workflow.caller()).current().unwrap();
    assert_eq!(session.marker, "session-newer");
    assert!(!sink
        .events()
        .iter()
        .any(|e| matches!(e, WorkflowEvent::SessionCleared { .. })));
}

#[tokio::test]
async fn other_errors_keep_the_session() {
    let server = MockServer::start().await;
    let (workflow, _) = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path(CUSTOMERS_ENDPOINT))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = workflow.search("Acme Srl", None).await.unwrap_err();
    match err {
        FiscozenError::ApiError { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(workflow.is_authenticated());
}
