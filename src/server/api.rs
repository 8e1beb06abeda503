use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum_typed_multipart::TypedMultipart;
use log::info;
use tokio::sync::watch;
use tokio::task::block_in_place;

use super::error::{AppError, Result};
use super::state::AppState;
use super::types::*;
use crate::batch::{BatchPipeline, parse_manifest};
use crate::db::ImageRecord;
use crate::metrics;

/// 分页列出图片
#[utoipa::path(
    get,
    path = "/",
    params(ListQuery),
    responses(
        (status = 200, body = Vec<ImageRecord>),
    )
)]
pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ImageRecord>>> {
    let records = state.ingestor.list(query.page.unwrap_or(1), query.limit.unwrap_or(10)).await?;
    Ok(Json(records.into_iter().map(without_embedding).collect()))
}

/// 按 ID 查看图片
#[utoipa::path(
    get,
    path = "/images/{id}",
    params(("id" = i64, Path, description = "图片 ID")),
    responses(
        (status = 200, body = ImageRecord),
        (status = 404),
    )
)]
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ImageRecord>> {
    Ok(Json(without_embedding(state.ingestor.get_by_id(id).await?)))
}

/// 按名称查看图片
#[utoipa::path(
    get,
    path = "/images/name/{name}",
    params(("name" = String, Path, description = "图片名称")),
    responses(
        (status = 200, body = ImageRecord),
        (status = 404),
    )
)]
pub async fn get_by_name_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ImageRecord>> {
    Ok(Json(without_embedding(state.ingestor.get_by_name(&name).await?)))
}

/// 上传一张图片，相似度达到阈值时返回 409
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, body = UploadResponse),
        (status = 400, description = "不支持的图片格式"),
        (status = 409, description = "与已有图片过于相似"),
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    data: TypedMultipart<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let file_name = match &data.files.metadata.file_name {
        Some(file_name) => file_name.clone(),
        None => {
            return Err(AppError::new(StatusCode::BAD_REQUEST, anyhow::anyhow!("文件名不能为空")));
        }
    };

    info!("正在添加上传图片: {}", file_name);
    let record = state.ingestor.ingest(&file_name, &data.files.contents).await?;

    Ok((StatusCode::CREATED, Json(UploadResponse { data: without_embedding(record) })))
}

/// 上传 CSV 清单批量添加图片，并生成相似度报告
#[utoipa::path(
    post,
    path = "/upload_csv",
    request_body(content = UploadCsvForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, body = UploadCsvResponse),
        (status = 400, description = "无法解析清单"),
    )
)]
pub async fn upload_csv_handler(
    State(state): State<Arc<AppState>>,
    data: TypedMultipart<UploadCsvRequest>,
) -> Result<(StatusCode, Json<UploadCsvResponse>)> {
    let jobs = parse_manifest(&data.file.contents[..])
        .map_err(|e| AppError::new(StatusCode::BAD_REQUEST, e))?;

    let pipeline = BatchPipeline::new(state.ingestor.clone(), state.fetcher.clone(), state.batch);
    let (_cancel, cancel_rx) = watch::channel(false);
    let report = pipeline.run(jobs, cancel_rx).await;
    block_in_place(|| report.save(&state.report))?;

    Ok((
        StatusCode::CREATED,
        Json(UploadCsvResponse {
            inserted: report.admitted,
            rows: report.rows.len(),
            failed: report.failed,
            report: state.report.display().to_string(),
        }),
    ))
}

/// 删除图片及其文件
#[utoipa::path(
    delete,
    path = "/delete/{id}",
    params(("id" = i64, Path, description = "图片 ID")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404),
    )
)]
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    state.ingestor.delete(id).await?;
    Ok(Json(MessageResponse { message: format!("Deleted image {id}") }))
}

/// prometheus 指标
pub async fn metrics_handler() -> Result<String> {
    Ok(metrics::gather_text()?)
}

fn without_embedding(record: ImageRecord) -> ImageRecord {
    ImageRecord { embedding: vec![], ..record }
}
