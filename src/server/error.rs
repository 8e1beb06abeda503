use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;

use crate::error::IngestError;

/// API错误类型
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn new(status: StatusCode, error: impl Into<anyhow::Error>) -> Self {
        Self { status, error: error.into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{:#}", self.error);
        }
        (self.status, Json(json!({ "error": self.error.to_string() }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let error = err.into();
        let status = error.downcast_ref::<IngestError>().map_or(StatusCode::INTERNAL_SERVER_ERROR, status_of);
        Self { status, error }
    }
}

/// 区分重复图片、客户端错误和系统故障
fn status_of(err: &IngestError) -> StatusCode {
    match err {
        IngestError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
        IngestError::TooSimilar { .. } => StatusCode::CONFLICT,
        IngestError::Embedding { .. } | IngestError::Download(_) => StatusCode::BAD_GATEWAY,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
