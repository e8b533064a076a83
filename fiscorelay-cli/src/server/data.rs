//! `/api/data` handlers: saved sessions and exports.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use fiscorelay_store::SessionRecord;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiError, AppState};

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub(super) struct ListQuery {
    limit: Option<usize>,
}

/// Body of `POST /sessions`; the id is always assigned here.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NewSession {
    #[serde(default)]
    client_data: Value,
    #[serde(default)]
    search_results: Value,
    #[serde(default)]
    status: String,
    #[serde(default)]
    created_client_id: Option<String>,
}

pub(super) async fn save_session(
    State(state): State<AppState>,
    body: Result<Json<NewSession>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(session) = body?;
    let mut record = SessionRecord::new(session.client_data, session.search_results, session.status);
    if let Some(id) = session.created_client_id.filter(|id| !id.is_empty()) {
        record = record.with_created_client_id(id);
    }

    state.log().save_session(&record)?;
    Ok(Json(json!({ "success": true, "sessionId": record.id })))
}

pub(super) async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .log()
        .get_session(&id)?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    Ok(Json(json!({ "success": true, "session": session })))
}

pub(super) async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.filter(|n| *n > 0).unwrap_or(DEFAULT_LIMIT);
    let sessions = state.log().recent_sessions(limit)?;
    Ok(Json(json!({ "success": true, "sessions": sessions })))
}

pub(super) async fn export_csv(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let csv = state.log().export_csv()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"fiscozen-sessions.csv\"",
            ),
        ],
        csv,
    ))
}

pub(super) async fn export_json(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let export = state.log().export_json()?;
    Ok((
        [(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"fiscozen-sessions.json\"",
        )],
        Json(export),
    ))
}
