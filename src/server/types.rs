use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::ImageRecord;

/// 分页参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 页码，从 1 开始
    pub page: Option<i64>,
    /// 每页数量，最大 100
    pub limit: Option<i64>,
}

/// 上传图片请求
#[derive(TryFromMultipart)]
pub struct UploadRequest {
    pub files: FieldData<Bytes>,
}

/// 上传表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct UploadForm {
    /// 图片文件，只支持 jpg、jpeg、png
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub files: String,
}

/// 上传 CSV 清单请求
#[derive(TryFromMultipart)]
pub struct UploadCsvRequest {
    pub file: FieldData<Bytes>,
}

/// CSV 上传表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct UploadCsvForm {
    /// CSV 清单，第一行为表头，之后每行为 `图片名,图片地址`
    #[schema(format = Binary, content_media_type = "text/csv")]
    pub file: String,
}

/// 上传成功的响应
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub data: ImageRecord,
}

/// 批量上传的响应
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadCsvResponse {
    /// 成功入库的数量
    pub inserted: usize,
    /// 报告行数
    pub rows: usize,
    /// 失败的任务数量
    pub failed: usize,
    /// 报告保存路径
    pub report: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
