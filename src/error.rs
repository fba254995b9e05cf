use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

use crate::model::ValidationError;
use crate::optimizer::PackError;

/// Errors returned to HTTP clients.
///
/// Every variant describes a request the caller must correct; the planner has
/// no transient failure modes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidJson(String),

    #[error(transparent)]
    InvalidContainer(ValidationError),

    #[error(transparent)]
    InvalidItems(#[from] PackError),

    #[error("At least one item must be specified")]
    NoItems,

    #[error("Request contains {count} items, the limit is {limit}")]
    TooManyItems { count: usize, limit: usize },
}

impl ApiError {
    fn title(&self) -> &'static str {
        match self {
            ApiError::InvalidJson(_) => "Invalid JSON data",
            ApiError::InvalidContainer(_) => "Invalid container configuration",
            ApiError::InvalidItems(_) | ApiError::NoItems | ApiError::TooManyItems { .. } => {
                "Invalid input data"
            }
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.title().to_string(),
            details: self.to_string(),
        };
        warn!(error = %body.error, details = %body.details, "rejected pack request");
        (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_error_converts_into_invalid_items() {
        let err: ApiError = PackError::DuplicateItemId(4).into();
        assert_eq!(err.title(), "Invalid input data");
        assert_eq!(err.to_string(), "Item id 4 occurs more than once");
    }

    #[test]
    fn every_variant_is_unprocessable() {
        let errors = [
            ApiError::InvalidJson("bad".into()),
            ApiError::InvalidContainer(ValidationError::InvalidWeight("x".into())),
            ApiError::NoItems,
            ApiError::TooManyItems { count: 3, limit: 2 },
        ];
        for err in errors {
            assert_eq!(
                err.into_response().status(),
                StatusCode::UNPROCESSABLE_ENTITY
            );
        }
    }

    #[test]
    fn container_error_keeps_validation_message() {
        let err = ApiError::InvalidContainer(ValidationError::InvalidDimension(
            "Container height must be positive, got: 0".into(),
        ));
        assert_eq!(err.title(), "Invalid container configuration");
        assert_eq!(
            err.to_string(),
            "Invalid dimension: Container height must be positive, got: 0"
        );
    }
}
