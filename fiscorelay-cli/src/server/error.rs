//! Mapping of workflow and store failures onto HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fiscorelay_providers::fiscozen::FiscozenError;
use fiscorelay_store::StoreError;
use serde_json::{json, Map, Value};
use tracing::error;

/// A failed request, rendered as `{success: false, error}`.
#[derive(Debug)]
pub enum ApiError {
    /// A workflow step failed.
    Provider(FiscozenError),
    /// The request itself is unusable.
    BadRequest(String),
    /// Nothing at this path or id.
    NotFound(String),
    /// Local storage failed.
    Store(StoreError),
}

impl From<FiscozenError> for ApiError {
    fn from(e: FiscozenError) -> Self {
        Self::Provider(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn provider_status(e: &FiscozenError) -> StatusCode {
    if e.is_auth_failure() {
        return StatusCode::UNAUTHORIZED;
    }
    if e.is_validation() {
        return StatusCode::BAD_REQUEST;
    }
    e.provider_status()
        .and_then(|status| StatusCode::from_u16(status).ok())
        .filter(|status| status.is_client_error() || status.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn provider_body(e: &FiscozenError) -> Map<String, Value> {
    let message = match e {
        FiscozenError::InvalidInput(message) => message.clone(),
        other => other.user_message(),
    };

    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(false));
    body.insert("error".into(), Value::String(message));

    if matches!(e, FiscozenError::CustomerNotResolved(_)) {
        body.insert("needsClientCreation".into(), Value::Bool(true));
    }
    if let Some(raw) = e.provider_body() {
        let details =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        body.insert("details".into(), details);
    }
    body
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Provider(e) => (provider_status(e), Value::Object(provider_body(e))),
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": message }),
            ),
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "error": message }),
            ),
            Self::Store(e) => {
                error!(error = %e, "Session log failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": e.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: FiscozenError) -> StatusCode {
        ApiError::from(e).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(FiscozenError::NotAuthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(FiscozenError::SessionExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(FiscozenError::MissingLineItems), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(FiscozenError::CustomerNotResolved("Acme".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(FiscozenError::InvoiceRejected {
                status: 422,
                body: "{}".into()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(FiscozenError::HttpError("reset".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_provider_body_forwarded() {
        let body = provider_body(&FiscozenError::InvoiceRejected {
            status: 400,
            body: r#"{"message":"Data non valida"}"#.into(),
        });
        assert_eq!(body["error"], "Data non valida");
        assert_eq!(body["details"]["message"], "Data non valida");
    }

    #[test]
    fn test_needs_client_creation_flag() {
        let body = provider_body(&FiscozenError::CustomerNotResolved("Acme".into()));
        assert_eq!(body["needsClientCreation"], true);
        assert_eq!(body["error"], "Client not found: Acme. Please create client first.");
    }

    #[test]
    fn test_invalid_input_message_is_bare() {
        let body = provider_body(&FiscozenError::InvalidInput("Valid CAP required".into()));
        assert_eq!(body["error"], "Valid CAP required");
    }
}
