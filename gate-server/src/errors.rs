use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde_json::json;

/// Error answered by the gateway itself, outside of authentication
#[derive(Debug, Clone)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
}

impl ApiError {
    /// Create a new ApiError with a message and status code
    pub fn new<S: ToString>(message: S, status_code: StatusCode) -> Self {
        Self {
            message: message.to_string(),
            status_code,
        }
    }

    /// Create new Not Found (404) with a message
    pub fn not_found<S: ToString>(message: S) -> Self {
        Self::new(message, StatusCode::NOT_FOUND)
    }

    /// Create new Payload Too Large (413) with a message
    pub fn payload_too_large<S: ToString>(message: S) -> Self {
        Self::new(message, StatusCode::PAYLOAD_TOO_LARGE)
    }

    /// Create new Bad Gateway (502) with a message
    pub fn bad_gateway<S: ToString>(message: S) -> Self {
        Self::new(message, StatusCode::BAD_GATEWAY)
    }

    /// Create new Gateway Timeout (504) with a message
    pub fn gateway_timeout<S: ToString>(message: S) -> Self {
        Self::new(message, StatusCode::GATEWAY_TIMEOUT)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code;
        let body = json!({
            "message": self.message,
        });
        (status_code, Json(body)).into_response()
    }
}

/// Fallback for routes the gateway does not serve
pub(crate) async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}
