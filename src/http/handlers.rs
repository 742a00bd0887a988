use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use crate::{
    error::WheelError,
    history::{clear_all, query_recent},
    metrics::MetricsSnapshot,
    models::SpinRecord,
    recorder::RecordSpinRequest,
};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClearSummary {
    pub message: String,
    pub deleted: usize,
}

pub(crate) async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn record_spin(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SpinRecord>, WheelError> {
    let request: RecordSpinRequest = serde_json::from_slice(&body)
        .map_err(|err| WheelError::MalformedBody(err.to_string()))?;
    let record = request.into_record(Utc::now())?;

    state
        .history
        .append(&record)
        .await
        .map_err(WheelError::Store)?;

    info!(
        "Recorded spin {} for {} (session {})",
        record.id, record.entry_name, record.session_id
    );
    Ok(Json(record))
}

pub(crate) async fn list_spins(
    State(state): State<AppState>,
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Vec<SpinRecord>>, WheelError> {
    // Unreadable query strings are served with the defaults.
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            warn!("ignoring unreadable /spins query: {rejection}");
            HashMap::new()
        }
    };

    let limit = state.limits.resolve(params.get("limit").map(String::as_str));
    let entry_type = params
        .get("type")
        .map(|t| t.trim())
        .filter(|t| !t.is_empty());

    let records = query_recent(state.history.as_ref(), limit, entry_type).await?;
    Ok(Json(records))
}

pub(crate) async fn metrics(
    State(state): State<AppState>,
) -> Result<Json<MetricsSnapshot>, WheelError> {
    Ok(Json(state.metrics.snapshot().await?))
}

pub(crate) async fn clear_spins(
    State(state): State<AppState>,
) -> Result<Json<ClearSummary>, WheelError> {
    let deleted = clear_all(state.history.as_ref()).await?;
    Ok(Json(ClearSummary {
        message: format!("Deleted {deleted} spins"),
        deleted,
    }))
}

pub(crate) async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
