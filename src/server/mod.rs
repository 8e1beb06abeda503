mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::list_handler,
        api::get_handler,
        api::get_by_name_handler,
        api::upload_handler,
        api::upload_csv_handler,
        api::delete_handler,
    ),
    components(schemas(
        types::UploadForm,
        types::UploadCsvForm,
        types::UploadResponse,
        types::UploadCsvResponse,
        types::MessageResponse,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::list_handler))
        .route("/images/{id}", get(api::get_handler))
        .route("/images/name/{name}", get(api::get_by_name_handler))
        .route("/upload", post(api::upload_handler))
        .route("/upload_csv", post(api::upload_csv_handler))
        .route("/delete/{id}", delete(api::delete_handler))
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        // 上传限制：10M
        .layer(RequestBodyLimitLayer::new(1024 * 1024 * 10))
        .with_state(state)
}
