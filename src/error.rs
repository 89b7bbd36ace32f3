use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::db::StoreError;
use crate::dto::ErrorResponse;
use crate::llm::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Language model error: {0}")]
    UpstreamModel(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::RateLimited => "rate_limited",
            AppError::UpstreamModel(_) => "upstream_model_error",
            AppError::Persistence(_) => "persistence_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::UpstreamModel(_) | AppError::Persistence(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ModelError> for AppError {
    fn from(e: ModelError) -> Self {
        AppError::UpstreamModel(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, details) = match &self {
            AppError::InvalidInput(msg) | AppError::NotFound(msg) => (msg.clone(), None),
            AppError::Unauthorized | AppError::Forbidden | AppError::RateLimited => {
                (self.to_string(), None)
            }
            AppError::UpstreamModel(detail) => {
                tracing::error!(error = %detail, "Language model call failed");
                (
                    "The assistant is unavailable right now, please retry".to_string(),
                    Some(detail.clone()),
                )
            }
            AppError::Persistence(e) => {
                tracing::error!(error = %e, "Store write failed");
                ("Could not save your log, please retry".to_string(), None)
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                ("Internal server error".to_string(), None)
            }
        };

        let body = ErrorResponse {
            error: message,
            code: self.code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
