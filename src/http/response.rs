use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};
use serde_json::json;

use crate::error::WheelError;

impl WheelError {
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for WheelError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("request failed: {self}");
        } else {
            warn!("rejected request: {self}");
        }

        let message = self.to_string();
        let body = match &self {
            WheelError::PartialBatchFailure { deleted, .. } => {
                json!({ "error": message, "deleted": deleted })
            }
            _ => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}
