use axum::{Json, extract::State};
use chrono::Utc;
use std::sync::Arc;
use crate::error::ApiError;
use crate::metrics::{STATISTICS_LATENCY, STATISTICS_REQUESTS};
use crate::models::StatisticsResponse;
use crate::state::AppState;
use crate::window::WindowKind;

// GET /domains/statistics/last-minute
pub async fn last_minute_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    statistics(&state, WindowKind::LastMinute)
}

// GET /domains/statistics/last-hour
pub async fn last_hour_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    statistics(&state, WindowKind::LastHour)
}

fn statistics(state: &AppState, kind: WindowKind) -> Result<Json<StatisticsResponse>, ApiError> {
    STATISTICS_REQUESTS.with_label_values(&[kind.label()]).inc();
    let timer = STATISTICS_LATENCY.start_timer();

    // a store failure aborts the whole query
    let domains = state.aggregator.top_domains(kind, Utc::now())?;
    timer.observe_duration();

    Ok(Json(StatisticsResponse {
        success: "true".to_string(),
        domains,
    }))
}
