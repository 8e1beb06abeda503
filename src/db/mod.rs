use std::future::Future;
use std::path::Path;

use log::info;
use sqlx::{SqlitePool, sqlite::*};

mod crud;
mod model;

pub use model::*;

use crate::error::StoreError;
use crate::vector::{cosine_distance, similarity_percent};

pub type Database = SqlitePool;

pub async fn init_db(filename: impl AsRef<Path>) -> Result<Database, StoreError> {
    let filename = filename.as_ref();
    info!("初始化数据库连接: {}", filename.display());

    if let Some(parent) = filename.parent() {
        std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
    }

    let options = SqliteConnectOptions::new()
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .filename(filename)
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;

    info!("检查数据库迁移");
    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}

/// 向量存储，保存图片记录并回答最近邻查询
///
/// 实现需要能够被多个任务并发调用。
/// 注意：查询和插入之间没有事务隔离，两个并发的入库流程可能同时判定无相似图片
pub trait VectorStore: Send + Sync {
    /// 插入记录，返回带有 ID 的完整记录
    fn insert(&self, image: NewImage) -> impl Future<Output = Result<ImageRecord, StoreError>> + Send;

    /// 删除记录，不存在时返回 [`StoreError::NotFound`]
    fn delete(&self, id: i64) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_by_id(&self, id: i64) -> impl Future<Output = Result<ImageRecord, StoreError>> + Send;

    fn get_by_name(&self, name: &str)
    -> impl Future<Output = Result<ImageRecord, StoreError>> + Send;

    /// 除 `id` 以外是否还有记录引用 `path`
    fn path_shared(
        &self,
        path: &str,
        id: i64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// 按 ID 升序分页
    fn list_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> impl Future<Output = Result<Vec<ImageRecord>, StoreError>> + Send;

    /// 查询与 `query` 余弦距离最小的 `k` 条记录，按距离升序
    ///
    /// 距离相同时的顺序由存储决定，调用方不应依赖
    fn nearest_neighbors(
        &self,
        query: &[f32],
        k: usize,
    ) -> impl Future<Output = Result<Vec<NeighborResult>, StoreError>> + Send;
}

/// 基于 sqlite 的向量存储
///
/// 最近邻查询为全表扫描
#[derive(Clone)]
pub struct ImageDB {
    pool: Database,
}

impl ImageDB {
    /// 打开数据库，不存在时创建
    pub async fn open(filename: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self { pool: init_db(filename).await? })
    }

    pub fn pool(&self) -> &Database {
        &self.pool
    }

    /// 图片总数
    pub async fn count(&self) -> Result<i64, StoreError> {
        Ok(crud::get_count(&self.pool).await?)
    }

    async fn check_dimension(&self, len: usize) -> Result<(), StoreError> {
        if let Some(bytes) = crud::get_embedding_len(&self.pool).await? {
            let expected = bytes as usize / size_of::<f32>();
            if expected != len {
                return Err(StoreError::Dimension { expected, actual: len });
            }
        }
        Ok(())
    }
}

impl VectorStore for ImageDB {
    async fn insert(&self, image: NewImage) -> Result<ImageRecord, StoreError> {
        self.check_dimension(image.embedding.len()).await?;
        let id = crud::add_image(&self.pool, &image.name, &image.path, &image.embedding).await?;
        Ok(ImageRecord { id, name: image.name, path: image.path, embedding: image.embedding })
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        match crud::delete_image(&self.pool, id).await? {
            0 => Err(StoreError::NotFound(id.to_string())),
            _ => Ok(()),
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<ImageRecord, StoreError> {
        crud::get_image(&self.pool, id)
            .await?
            .map(ImageRecord::from)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn get_by_name(&self, name: &str) -> Result<ImageRecord, StoreError> {
        crud::get_image_by_name(&self.pool, name)
            .await?
            .map(ImageRecord::from)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn path_shared(&self, path: &str, id: i64) -> Result<bool, StoreError> {
        Ok(crud::count_other_by_path(&self.pool, path, id).await? > 0)
    }

    async fn list_page(&self, limit: usize, offset: usize) -> Result<Vec<ImageRecord>, StoreError> {
        let rows = crud::get_images(&self.pool, limit, offset).await?;
        Ok(rows.into_iter().map(ImageRecord::from).collect())
    }

    async fn nearest_neighbors(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<NeighborResult>, StoreError> {
        if k == 0 {
            return Ok(vec![]);
        }
        self.check_dimension(query.len()).await?;

        let rows = crud::get_all_images(&self.pool).await?;
        let mut results = rows
            .into_iter()
            .map(|row| {
                let record = ImageRecord::from(row);
                let cosine_distance = cosine_distance(query, &record.embedding);
                NeighborResult {
                    record,
                    cosine_distance,
                    similarity_percent: similarity_percent(cosine_distance),
                }
            })
            .collect::<Vec<_>>();
        // 稳定排序，距离相同时保持 ID 升序
        results.sort_by(|a, b| a.cosine_distance.total_cmp(&b.cosine_distance));
        results.truncate(k);

        Ok(results)
    }
}
