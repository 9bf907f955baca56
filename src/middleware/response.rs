use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;
use crate::services::ExportPayload;

/// `{"success": true, "data": ..}` envelope for JSON endpoints
#[derive(Debug)]
pub struct ApiResponse<T: Serialize>(pub T);

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self(data)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.0) {
            Ok(data) => (StatusCode::OK, Json(json!({ "success": true, "data": data }))).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                ApiError::internal_server_error("Failed to serialize response data", Some(e.to_string()))
                    .into_response()
            }
        }
    }
}

/// Rendered exports go out as attachments
impl IntoResponse for ExportPayload {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.file_name);
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
