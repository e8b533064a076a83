//! Shared fixtures for provider integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use fiscorelay_providers::fiscozen::{
    Credentials, FiscozenSettings, RecordingSink, Workflow, LOGIN_ENDPOINT,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Settings pointing every endpoint at the mock server.
pub fn settings_for(server: &MockServer) -> FiscozenSettings {
    let mut settings = FiscozenSettings::new(server.uri());
    settings.timeout = Duration::from_secs(5);
    settings.step_timeout = Duration::from_secs(10);
    settings.vies_url = format!("{}/vies/check", server.uri());
    settings.location_url = format!("{}/zip/IT", server.uri());
    settings
}

/// Workflow over the mock server, with a recording sink.
pub fn workflow_for(server: &MockServer) -> (Workflow, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let workflow = Workflow::builder(settings_for(server))
        .with_sink(sink.clone())
        .build()
        .unwrap();
    (workflow, sink)
}

/// Test credentials.
pub fn credentials() -> Credentials {
    Credentials::new("a@b.com", "x")
}

/// Landing page that issues `csrftoken=ABC123`.
pub async fn mount_landing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "csrftoken=ABC123; Path=/")
                .set_body_string("<html></html>"),
        )
        .mount(server)
        .await;
}

/// Login endpoint that accepts anything and sets a session cookie.
pub async fn mount_login_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN_ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "sessionid=S3SS10N; HttpOnly; Path=/")
                .set_body_json(json!({ "detail": "ok" })),
        )
        .mount(server)
        .await;
}

/// Logged-in workflow over the mock server.
pub async fn logged_in(server: &MockServer) -> (Workflow, Arc<RecordingSink>) {
    mount_landing(server).await;
    mount_login_ok(server).await;
    let (workflow, sink) = workflow_for(server);
    workflow.login(credentials()).await.unwrap();
    (workflow, sink)
}

/// Requests received so far.
pub async fn requests(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap_or_default()
}

/// Number of requests received so far.
pub async fn request_count(server: &MockServer) -> usize {
    requests(server).await.len()
}
