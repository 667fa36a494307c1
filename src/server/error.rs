use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::chat::{ErrorCategory, GenerationFailure};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Generation(#[from] GenerationFailure),
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::InvalidRequest | ErrorCategory::Blocked => StatusCode::BAD_REQUEST,
        ErrorCategory::MissingCredential | ErrorCategory::InvalidCredential => {
            StatusCode::UNAUTHORIZED
        }
        ErrorCategory::BillingIssue => StatusCode::PAYMENT_REQUIRED,
        ErrorCategory::PendingActivation | ErrorCategory::UnsupportedRegion => {
            StatusCode::FORBIDDEN
        }
        ErrorCategory::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorCategory::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCategory::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Generation(GenerationFailure { category, message }) => (
                status_for(category),
                json!({ "error": message, "category": category }),
            ),
            ApiError::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("Session {id} not found.") }),
            ),
            ApiError::Internal(why) => {
                log::error!("internal error while handling request: {why:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error." }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
