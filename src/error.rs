use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("No recommendations generated")]
    EmptyResult,

    #[error("Failed to {stage}: {detail}")]
    Stage {
        stage: &'static str,
        detail: String,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a retry of the failed operation could plausibly succeed.
    ///
    /// Connection and timeout failures are transient; so is an empty LLM
    /// result, which is retried under the same policy but surfaced with its
    /// own message. Input and internal errors are not retried.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::HttpClient(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            AppError::Timeout(_) | AppError::ExternalApi(_) | AppError::EmptyResult => true,
            AppError::Cache(e) => e.is_timeout() || e.is_connection_refusal(),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Cache(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::HttpClient(_) | AppError::Timeout(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::EmptyResult | AppError::Stage { .. } => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
