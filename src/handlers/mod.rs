mod domains;
mod health;
mod metrics;
mod statistics;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use crate::state::AppState;

pub use domains::post_domains_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use statistics::{last_hour_handler, last_minute_handler};

// All routes of the service
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/domains", post(post_domains_handler))
        .route("/domains/statistics/last-minute", get(last_minute_handler))
        .route("/domains/statistics/last-hour", get(last_hour_handler))
        .with_state(state)
}
