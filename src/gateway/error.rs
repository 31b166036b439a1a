use axum::http::StatusCode;
use axum::http::header::WWW_AUTHENTICATE;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use super::auth::AuthorizationError;
use crate::provisioning::ProvisionError;

/// Failure of a gateway request. Responses never carry the underlying error: provisioning failures
/// answer with a reference id that is logged next to the full error.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("unauthorized: `{0}`")]
    Unauthorized(#[from] AuthorizationError),
    #[error("{operation} failed: `{source}`")]
    Provisioning {
        operation: &'static str,
        source: ProvisionError,
    },
}

impl ApiError {
    /// `operation` completes the sentence "An error occurred while ...".
    pub fn provisioning(operation: &'static str, source: ProvisionError) -> Self {
        Self::Provisioning { operation, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, "Bearer")],
                "Unauthorized",
            )
                .into_response(),
            ApiError::Provisioning { operation, source } => {
                let reference = Uuid::now_v7();
                error!(%reference, operation, "request failed: {source}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("An error occurred while {operation}. Reference: {reference}"),
                )
                    .into_response()
            }
        }
    }
}
