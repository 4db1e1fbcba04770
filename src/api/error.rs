//! API error handling.
//!
//! Maps [`ScormError`] onto HTTP status codes and the JSON error body
//! `{ error, kind, details?, stdout?, stderr? }`.

use crate::error::{FailureKind, ScormError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// A conversion route was called with something other than POST.
    MethodNotAllowed,
    /// Anything the conversion pipeline reported.
    Conversion(ScormError),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl ApiError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        ApiError::Conversion(ScormError::InvalidRequest {
            reason: reason.into(),
        })
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::MethodNotAllowed => FailureKind::MethodNotAllowed,
            ApiError::Conversion(e) => e.kind(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            FailureKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            FailureKind::ValidationError => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the response body without consuming the error.
    pub fn body(&self) -> ErrorBody {
        let kind = self.kind();
        match self {
            ApiError::MethodNotAllowed => ErrorBody {
                error: "Method Not Allowed".to_string(),
                kind,
                details: None,
                stdout: None,
                stderr: None,
            },
            ApiError::Conversion(e) if e.is_client_error() => ErrorBody {
                error: e.to_string(),
                kind,
                details: None,
                stdout: None,
                stderr: None,
            },
            ApiError::Conversion(e) => {
                let captured = e.captured_output();
                ErrorBody {
                    error: headline(kind).to_string(),
                    kind,
                    details: Some(e.to_string()),
                    stdout: captured.map(|c| c.stdout.clone()),
                    stderr: captured.map(|c| c.stderr.clone()),
                }
            }
        }
    }
}

/// Short summary placed in `error` for server-side failures.
fn headline(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::LaunchError | FailureKind::ConverterError | FailureKind::TimeoutError => {
            "Execution error"
        }
        FailureKind::MissingArtifact => "Output file not created",
        FailureKind::ResourceError => "Workspace error",
        FailureKind::PackagingError => "Packaging error",
        FailureKind::ValidationError => "Invalid request",
        FailureKind::MethodNotAllowed => "Method Not Allowed",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::MethodNotAllowed => tracing::debug!("Rejected non-POST request"),
            ApiError::Conversion(e) if e.is_client_error() => {
                tracing::warn!("Bad request: {}", e)
            }
            ApiError::Conversion(e) => tracing::error!("Conversion failed ({}): {}", e.kind(), e),
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<ScormError> for ApiError {
    fn from(err: ScormError) -> Self {
        ApiError::Conversion(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
