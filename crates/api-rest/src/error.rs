//! HTTP error envelope.
//!
//! Every failure leaves the API as `{"error": {"code": ..., "message": ...}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gpupdate_core::{ComposeError, ErrorKind};
use serde::Serialize;
use utoipa::ToSchema;

pub const CODE_VALIDATION: &str = "VALIDATION_ERROR";
pub const CODE_FHIR_VALIDATION: &str = "FHIR_VALIDATION_FAILED";
pub const CODE_IDEMPOTENCY_CONFLICT: &str = "IDEMPOTENCY_CONFLICT";
pub const CODE_INTERNAL: &str = "INTERNAL_ERROR";

const INTERNAL_MESSAGE: &str = "internal error";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("{0}")]
    FhirValidation(String),

    #[error("idempotency key '{key}' {reason}")]
    IdempotencyConflict { key: String, reason: &'static str },

    /// The detail is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::FhirValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::IdempotencyConflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) | ApiError::PayloadTooLarge { .. } => CODE_VALIDATION,
            ApiError::FhirValidation(_) => CODE_FHIR_VALIDATION,
            ApiError::IdempotencyConflict { .. } => CODE_IDEMPOTENCY_CONFLICT,
            ApiError::Internal(_) => CODE_INTERNAL,
        }
    }
}

impl From<ComposeError> for ApiError {
    fn from(err: ComposeError) -> Self {
        match err.kind() {
            ErrorKind::Validation => ApiError::Validation(err.to_string()),
            ErrorKind::Construction => ApiError::FhirValidation(err.to_string()),
            ErrorKind::Internal => ApiError::Internal(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "request failed");
                INTERNAL_MESSAGE.to_owned()
            }
            other => {
                tracing::warn!(code = other.code(), error = %other, "request rejected");
                other.to_string()
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_owned(),
                message,
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_errors_map_by_kind() {
        let cases = [
            (
                ComposeError::Validation("patient.surname is required".into()),
                StatusCode::BAD_REQUEST,
                CODE_VALIDATION,
            ),
            (
                ComposeError::Construction("medication.system and medication.code are required".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                CODE_FHIR_VALIDATION,
            ),
            (
                ComposeError::DanglingReferences(vec!["urn:uuid:x".into()]),
                StatusCode::INTERNAL_SERVER_ERROR,
                CODE_INTERNAL,
            ),
        ];

        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn oversize_body_is_a_validation_error() {
        let err = ApiError::PayloadTooLarge { limit: 10 };
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.code(), CODE_VALIDATION);
    }
}
