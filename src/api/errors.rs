use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use crate::errors::GuardianError;
use tracing::error;

impl IntoResponse for GuardianError {
    fn into_response(self) -> axum::response::Response {
        let classification = self.classify();
        let body = match &self {
            GuardianError::Validation { field, message } => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({
                        "error": self.to_string(),
                        "error_type": classification.error_type,
                        "field": field,
                        "message": message,
                    })),
                ).into_response();
            }
            _ => json!({
                "error": self.to_string(),
                "error_type": classification.error_type,
                "retryable": classification.retryable,
            }),
        };

        let status = match &self {
            GuardianError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
        }

        (status, Json(body)).into_response()
    }
}
