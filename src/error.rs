use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::jsonapi::schema::ValidationReport;

pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred";

/// A terminal HTTP error. Handlers return it and the response hook turns it
/// into a JSON:API error document.
#[derive(Debug, Clone, Error)]
#[error("{status}: {message}")]
pub struct Fault {
    pub status: StatusCode,
    pub message: String,
}

impl Fault {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Fault {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Fault::new(StatusCode::NOT_FOUND, "Not Found")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Fault::new(StatusCode::BAD_REQUEST, message)
    }

    /// The cause is logged, clients only see the generic message.
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        let err: anyhow::Error = err.into();
        tracing::error!(error = %crate::unpack_error(&*err), "request failed");
        Fault::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }
}

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.message.clone()).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

// Rejections keep their own status: 415 for a missing JSON content type,
// 413 for an oversized body, 400 or 422 for bodies that do not parse.
impl From<JsonRejection> for Fault {
    fn from(rejection: JsonRejection) -> Self {
        Fault::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for Fault {
    fn from(rejection: PathRejection) -> Self {
        Fault::new(rejection.status(), rejection.body_text())
    }
}

impl From<JsonApiError> for Fault {
    fn from(error: JsonApiError) -> Self {
        Fault::internal(error)
    }
}

#[derive(Debug, Error)]
pub enum JsonApiError {
    #[error("failed to encode records: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("response document failed validation: {0}")]
    Invalid(ValidationReport),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_response_carries_fault() {
        let response = Fault::not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let fault = response.extensions().get::<Fault>().unwrap();
        assert_eq!(fault.message, "Not Found");
    }

    #[test]
    fn test_internal_fault_hides_cause() {
        let fault = Fault::internal(anyhow::anyhow!("connection refused"));
        assert_eq!(fault.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fault.message, INTERNAL_ERROR_MESSAGE);
    }
}
