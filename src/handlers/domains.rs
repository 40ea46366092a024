use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde_json::Value;
use std::sync::Arc;
use crate::error::{ApiError, ValidationError};
use crate::ingest::{IngestBatch, ingest};
use crate::models::IngestResponse;
use crate::state::AppState;

// POST /domains with a flat {"timestamp": .., "<domain>": <count>, ..} body
pub async fn post_domains_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(payload) =
        payload.map_err(|rejection| ValidationError::Malformed(rejection.body_text()))?;
    let batch = IngestBatch::from_value(payload)?;

    let report = ingest(state.store.as_ref(), &batch);
    if report.failed > 0 {
        tracing::warn!(
            timestamp = batch.timestamp,
            accepted = report.accepted,
            failed = report.failed,
            "batch partially applied"
        );
    }

    Ok(Json(IngestResponse {
        success: "true".to_string(),
        accepted: report.accepted,
        failed: report.failed,
    }))
}
