//! HTTP error mapping.
//!
//! Every handler returns `Result<_, ApiError>`; the body is always
//! `{error, code}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nbk_intake::IntakeError;
use nbk_schemas::SchemaError;
use nbk_settlement::SettlementError;
use tracing::warn;

use crate::api_types::ErrorResponse;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, error: impl Into<String>) -> Self {
        Self {
            status,
            code,
            error: error.into(),
        }
    }

    pub fn not_found(code: &'static str, error: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, error)
    }

    pub fn unprocessable(code: &'static str, error: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, code, error)
    }

    /// Store read/write failed.
    pub fn store(err: anyhow::Error) -> Self {
        warn!(error = %format!("{err:#}"), "store failure");
        Self::new(StatusCode::BAD_GATEWAY, "STORE_UNAVAILABLE", format!("{err:#}"))
    }

    /// Extraction collaborator failed or is not configured.
    pub fn extractor(err: anyhow::Error) -> Self {
        warn!(error = %format!("{err:#}"), "extractor failure");
        Self::new(StatusCode::BAD_GATEWAY, "EXTRACTOR_FAILED", format!("{err:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.error,
                code: self.code.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<IntakeError> for ApiError {
    fn from(e: IntakeError) -> Self {
        let status = match e {
            IntakeError::BalanceExceeded { .. } => StatusCode::CONFLICT,
            IntakeError::Persistence { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, e.code(), e.to_string())
    }
}

impl From<SettlementError> for ApiError {
    fn from(e: SettlementError) -> Self {
        let status = match e {
            SettlementError::UnknownClient(_) => StatusCode::NOT_FOUND,
            SettlementError::InvalidRange { .. } | SettlementError::InvalidMonth { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SettlementError::Overflow => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.code(), e.to_string())
    }
}

impl From<SchemaError> for ApiError {
    fn from(e: SchemaError) -> Self {
        Self::unprocessable("SCHEMA_INVALID", e.to_string())
    }
}
