use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use service::errors::ServiceError;

/// Client-facing error carrying a status code and a JSON body of the shape
/// `{"message": ..., "detail": ...?}`.
#[derive(Debug)]
pub struct JsonApiError {
    status: StatusCode,
    message: &'static str,
    detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, message: &'static str, detail: Option<String>) -> Self {
        Self { status, message, detail }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "item not found", None)
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(_) => Self::not_found(),
            ServiceError::Corrupt(msg) => {
                error!(error = %msg, "corrupt store state");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "store corrupted", Some(msg))
            }
            ServiceError::Io(msg) => {
                error!(error = %msg, "snapshot write failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage failure", Some(msg))
            }
        }
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = match self.detail {
            Some(detail) => serde_json::json!({"message": self.message, "detail": detail}),
            None => serde_json::json!({"message": self.message}),
        };
        (self.status, Json(body)).into_response()
    }
}
