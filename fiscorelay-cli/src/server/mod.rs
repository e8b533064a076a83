//! HTTP surface for the web frontend.
//!
//! Routes mirror what the frontend already calls:
//!
//! - `GET /health`
//! - `/api/fiscozen/*` for login, search, lookups, invoices and clients
//! - `/api/data/*` for saved sessions and exports
//!
//! Provider sessions are scoped by the optional `X-Fiscorelay-Caller`
//! header; requests without it share the default caller.

mod data;
mod error;
mod fiscozen;


use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use fiscorelay_providers::fiscozen::Workflow;
use fiscorelay_store::SessionLog;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use error::ApiError;

/// Header naming the logical caller whose provider session is used.
pub const CALLER_HEADER: &str = "x-fiscorelay-caller";

// ============================================================================
// State
// ============================================================================

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    workflow: Workflow,
    log: Arc<SessionLog>,
}

impl AppState {
    /// Creates the state.
    pub fn new(workflow: Workflow, log: Arc<SessionLog>) -> Self {
        Self { workflow, log }
    }

    /// Returns the workflow for the caller named in `headers`.
    pub fn workflow_for(&self, headers: &HeaderMap) -> Workflow {
        match headers
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            Some(caller) => self.workflow.for_caller(caller),
            None => self.workflow.clone(),
        }
    }

    /// Returns the session log.
    pub fn log(&self) -> &SessionLog {
        &self.log
    }
}

// ============================================================================
// Router
// ============================================================================

/// Builds the router with CORS for `allowed_origins` (any origin when
/// empty) and request tracing.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let fiscozen = Router::new()
        .route("/login", post(fiscozen::login))
        .route("/search", get(fiscozen::search))
        .route("/validate-vat", post(fiscozen::validate_vat))
        .route("/location/:cap", get(fiscozen::location))
        .route("/invoices", post(fiscozen::create_invoice))
        .route("/clients", post(fiscozen::create_client));

    let data = Router::new()
        .route("/sessions", get(data::list_sessions).post(data::save_session))
        .route("/sessions/:id", get(data::get_session))
        .route("/export/csv", get(data::export_csv))
        .route("/export/json", get(data::export_json));

    Router::new()
        .route("/health", get(health))
        .nest("/api/fiscozen", fiscozen)
        .nest("/api/data", data)
        .fallback(not_found)
        .with_state(state)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(CALLER_HEADER),
        ]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    service: &'static str,
    version: &'static str,
}

async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            service: "fiscorelay",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Endpoint not found".to_string())
}
