//! `/api/fiscozen` handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::HeaderMap,
    Json,
};
use fiscorelay_core::{ClientRecord, InvoiceDraft};
use fiscorelay_providers::fiscozen::{Credentials, FiscozenError, Location, VatValidation};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{ApiError, AppState};

type ApiResult<T = Json<Value>> = Result<T, ApiError>;

const INVALID_INVOICE: &str = "Client data and line items required";

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub(super) struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchQuery {
    company_name: Option<String>,
    #[serde(rename = "partitaIVA")]
    partita_iva: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct VatRequest {
    #[serde(rename = "partitaIVA", default)]
    partita_iva: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Handlers
// ============================================================================

pub(super) async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let outcome = state
        .workflow_for(&headers)
        .login(Credentials::new(request.email, request.password))
        .await?;

    Ok(Json(json!({
        "success": true,
        "token": outcome.token,
        "method": outcome.method,
        "expiresAt": outcome.expires_at,
    })))
}

pub(super) async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> ApiResult {
    let workflow = state.workflow_for(&headers);
    if !workflow.is_authenticated() {
        return Err(FiscozenError::NotAuthenticated.into());
    }
    let company_name = non_empty(query.company_name.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Company name required".to_string()))?;

    let results = workflow
        .search(company_name, non_empty(query.partita_iva.as_deref()))
        .await?;
    Ok(Json(json!({ "success": true, "results": results })))
}

pub(super) async fn validate_vat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<VatRequest>, JsonRejection>,
) -> ApiResult<Json<VatValidation>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let vat = non_empty(request.partita_iva.as_deref())
        .ok_or_else(|| ApiError::BadRequest("VAT number required".to_string()))?;

    Ok(Json(state.workflow_for(&headers).validate_vat(vat).await?))
}

pub(super) async fn location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(cap): Path<String>,
) -> ApiResult<Json<Location>> {
    Ok(Json(state.workflow_for(&headers).lookup_location(&cap).await?))
}

pub(super) async fn create_invoice(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<InvoiceDraft>, JsonRejection>,
) -> ApiResult {
    let workflow = state.workflow_for(&headers);
    if !workflow.is_authenticated() {
        return Err(FiscozenError::NotAuthenticated.into());
    }
    let Json(draft) = body.map_err(|_| ApiError::BadRequest(INVALID_INVOICE.to_string()))?;
    if !draft.client.has_legal_name() || draft.line_items.is_empty() {
        return Err(ApiError::BadRequest(INVALID_INVOICE.to_string()));
    }

    let receipt = workflow.create_invoice(draft).await?;
    info!(invoice_id = %receipt.id, "Invoice created through API");
    Ok(Json(json!({
        "success": true,
        "id": receipt.id,
        "invoiceNumber": receipt.invoice_number,
        "message": "Invoice created on Fiscozen",
    })))
}

pub(super) async fn create_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ClientRecord>, JsonRejection>,
) -> ApiResult {
    let workflow = state.workflow_for(&headers);
    if !workflow.is_authenticated() {
        return Err(FiscozenError::NotAuthenticated.into());
    }
    let Json(record) = body?;
    if !record.has_legal_name() {
        return Err(ApiError::BadRequest("Company name required".to_string()));
    }

    let id = workflow.create_client(&record).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}
