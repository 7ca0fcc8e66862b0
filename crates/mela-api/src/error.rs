//! API error type and its JSON rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use mela_state::{StateResult, ValidationError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 with one message per offending field.
    #[error("Validation error")]
    Validation(Vec<String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// 500. `message` is the endpoint's generic text, `error` the raw cause.
    #[error("{message}")]
    Internal { message: &'static str, error: String },
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.errors)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let (error, errors) = match self {
            Self::Validation(errors) => (None, Some(errors)),
            Self::Internal { error, .. } => (Some(error), None),
            _ => (None, None),
        };
        let body = ErrorBody {
            success: false,
            message,
            error,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

/// Attach an endpoint's generic failure message to a store error.
pub trait Context<T> {
    fn context(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> Context<T> for StateResult<T> {
    fn context(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| {
            error!(error = %e, "{message}");
            ApiError::Internal {
                message,
                error: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mela_state::StateError;

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::Validation(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn context_wraps_store_errors() {
        let failed: StateResult<()> = Err(StateError::Read("disk gone".into()));
        let err = failed.context("Error fetching alerts").unwrap_err();
        assert_eq!(err.to_string(), "Error fetching alerts");
        match err {
            ApiError::Internal { error, .. } => assert_eq!(error, "read error: disk gone"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
