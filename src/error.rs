use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

// Failures coming out of the counter store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

// A batch that was rejected before touching the store
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("payload must be a JSON object")]
    NotAnObject,
    #[error("missing timestamp")]
    MissingTimestamp,
    #[error("timestamp must be an integer")]
    InvalidTimestamp,
    #[error("request count for {name} must be a non-negative integer")]
    InvalidCount { name: String },
    #[error("domain name must not be empty")]
    EmptyDomain,
    #[error("malformed payload: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Every error response carries `success: "false"` and the message
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (
            status,
            Json(serde_json::json!({
                "success": "false",
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}
