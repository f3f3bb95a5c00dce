//! API error types with HTTP response mapping.

use std::error::Error as _;

use analytics::AnalyticsError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::ErrorKind;
use serde::Serialize;
use stock::StockError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// Malformed request data caught at the HTTP layer.
    #[error("Invalid input: {0}")]
    BadRequest(String),

    /// An unknown route parameter, such as a report type.
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Stock(err) => err.kind(),
            ApiError::Analytics(err) => err.kind(),
            ApiError::BadRequest(_) => ErrorKind::InvalidInput,
            ApiError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// HTTP status for each failure category.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidOperation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: ErrorKind,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);

        if kind == ErrorKind::StorageFailure {
            // The message is generic; the cause only goes to the log.
            let cause = self.source().map(|s| s.to_string()).unwrap_or_default();
            tracing::error!(error = %self, %cause, "storage failure");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                kind,
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ledger_store::StoreError;

    use super::*;

    #[test]
    fn test_kind_to_status() {
        assert_eq!(status_for(ErrorKind::InvalidInput), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorKind::InvalidOperation),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::StorageFailure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_storage_failure_response_hides_cause() {
        let err = ApiError::from(StockError::from(StoreError::Unavailable(
            "connection refused".to_string(),
        )));
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert_eq!(err.to_string(), "storage operation failed");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_timeout_maps_to_gateway_timeout() {
        let err = ApiError::from(AnalyticsError::Timeout {
            report_type: "stock_movement",
            budget: Duration::from_secs(30),
        });
        assert_eq!(err.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
