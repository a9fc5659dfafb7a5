//! HTTP handlers for the gym API.
//!
//! Domain failures are mapped onto status codes here so every handler can
//! return `gym::Error` directly.

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod exercises;
pub mod health;
pub mod principal;
pub mod root;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::gym::Error;

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

/// Plain acknowledgement: `{"message": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[must_use]
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Conflict | Error::AlreadyCompleted => StatusCode::CONFLICT,
        Error::NotFound => StatusCode::NOT_FOUND,
        Error::InvalidCredential | Error::Unauthorized => StatusCode::UNAUTHORIZED,
        Error::NotApproved | Error::Forbidden => StatusCode::FORBIDDEN,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let detail = match &self {
            Error::Store(err) => {
                error!("request failed: {err:#}");
                "internal server error".to_string()
            }
            Error::NotApproved => "Account not approved yet. Please wait for admin approval.".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}
