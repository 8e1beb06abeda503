use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// 图片记录
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ImageRecord {
    /// 图片 ID，由数据库分配
    pub id: i64,
    /// 图片名称，不保证唯一
    pub name: String,
    /// 图片存储路径
    pub path: String,
    /// 归一化后的特征向量
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

/// 尚未写入数据库的图片
#[derive(Debug, Clone)]
pub struct NewImage {
    pub name: String,
    pub path: String,
    pub embedding: Vec<f32>,
}

/// 最近邻查询的结果，不持久化
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborResult {
    pub record: ImageRecord,
    /// 余弦距离，单位向量下范围为 [0, 2]
    pub cosine_distance: f32,
    /// `(1 - cosine_distance) * 100`，保留两位小数
    pub similarity_percent: f64,
}

/// `image` 表中的一行
#[derive(FromRow)]
pub(super) struct ImageRow {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub embedding: Vec<u8>,
}

impl From<ImageRow> for ImageRecord {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            path: row.path,
            embedding: bytes_to_embedding(&row.embedding),
        }
    }
}

pub(super) fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    // 数据库中统一使用小端序
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub(super) fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    if cfg!(target_endian = "little") {
        bytemuck::pod_collect_to_vec(bytes)
    } else {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}
