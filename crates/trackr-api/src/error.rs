//! ApiError - ServiceError などを HTTP レスポンスに写す
//!
//! エラーは `{"success": false, "error": {"message": ..., "statusCode": ...}}` で返す。

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;

use trackr_core::ServiceError;

/// 503 のときに返す Retry-After（秒）
pub const RETRY_AFTER_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Route {0} not found")]
    RouteNotFound(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    message: String,
    status_code: u16,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(e) => match e {
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::QueueUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// クライアントに見せるメッセージ（内部エラーの詳細は出さない）
    fn public_message(&self) -> String {
        match self {
            ApiError::Service(ServiceError::Store(_)) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                message: self.public_message(),
                status_code: status.as_u16(),
            },
        };
        let mut response = (status, Json(body)).into_response();
        if matches!(self, ApiError::Service(ServiceError::QueueUnavailable(_))) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}
