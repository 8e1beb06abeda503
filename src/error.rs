use thiserror::Error;

use crate::db::ImageRecord;

/// 向量存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("image {0} not found")]
    NotFound(String),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// 调用 embedding 服务失败
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("embedding service returned {0}")]
    Status(reqwest::StatusCode),
    #[error("embedding service returned an empty vector")]
    Empty,
    #[error("{0}")]
    Other(String),
}

/// 下载图片失败
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("download {url} failed with status {status}")]
    Status { url: String, status: reqwest::StatusCode },
    #[error("read {path} failed: {source}")]
    Io { path: String, source: std::io::Error },
}

/// 图片入库流程中的错误
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("only .jpg, .jpeg, .png are allowed: {0}")]
    InvalidFormat(String),
    #[error("embedding error ({name}): {source}")]
    Embedding { name: String, source: EmbeddingError },
    #[error("image too similar {similarity:.2}% (id={} name={})", .matched.id, .matched.name)]
    TooSimilar { matched: ImageRecord, similarity: f64 },
    #[error("persist {name} failed: {source}")]
    Persist { name: String, source: PersistError },
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 持久化阶段的失败原因：写文件或写数据库
#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    File(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    /// 是否为相似度拒绝，这是正常的业务结果而不是系统故障
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::TooSimilar { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}
