use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::questionnaire::flow::FlowError;
use crate::questionnaire::onboarding::CompletionError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or expired session. `redirect` is the login path carrying the
    /// page the caller should return to.
    #[error("Unauthorized")]
    Unauthorized { redirect: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Onboarding step incomplete: {0}")]
    Flow(#[from] FlowError),

    #[error("Onboarding completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Builds an `Unauthorized` error whose redirect returns the user to `return_path`.
    pub fn login_required(return_path: &str) -> Self {
        AppError::Unauthorized {
            redirect: login_redirect(return_path),
        }
    }

    /// Status code and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Store(StoreError::Conflict(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Store(StoreError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
            }
            AppError::Store(StoreError::InvalidReference(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_REFERENCE")
            }
            AppError::Store(StoreError::Unavailable(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR")
            }
            AppError::Flow(_) => (StatusCode::BAD_REQUEST, "ONBOARDING_INCOMPLETE"),
            AppError::Completion(CompletionError::ResponsesNotSaved(
                StoreError::InvalidReference(_),
            )) => (StatusCode::BAD_REQUEST, "INVALID_REFERENCE"),
            AppError::Completion(CompletionError::ResponsesNotSaved(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "RESPONSES_NOT_SAVED")
            }
            AppError::Completion(CompletionError::FlagNotSet(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ONBOARDING_FLAG_NOT_SET")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

/// `/login?redirect=<return_path>`
pub fn login_redirect(return_path: &str) -> String {
    format!("/login?redirect={return_path}")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::NotFound(msg) | AppError::Validation(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::Unauthorized { .. } => "Authentication required".to_string(),
            AppError::Store(StoreError::InvalidCredentials) => {
                "Invalid email or password".to_string()
            }
            AppError::Store(StoreError::NotFound(msg))
            | AppError::Store(StoreError::Conflict(msg))
            | AppError::Store(StoreError::InvalidReference(msg)) => msg.clone(),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                "A data store error occurred".to_string()
            }
            AppError::Flow(e) => e.to_string(),
            AppError::Completion(CompletionError::ResponsesNotSaved(
                StoreError::InvalidReference(msg),
            )) => msg.clone(),
            AppError::Completion(CompletionError::ResponsesNotSaved(_)) => {
                "Failed to save your responses. Please try again.".to_string()
            }
            AppError::Completion(CompletionError::FlagNotSet(_)) => {
                "Your responses were saved but onboarding could not be marked complete. Please try again."
                    .to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        };

        let body = match &self {
            AppError::Unauthorized { redirect } => json!({
                "error": {
                    "code": code,
                    "message": message,
                    "redirect": redirect
                }
            }),
            _ => json!({
                "error": {
                    "code": code,
                    "message": message
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}
