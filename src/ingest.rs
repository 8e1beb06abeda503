use std::path::Path;

use log::{debug, info, warn};

use crate::db::{ImageRecord, NeighborResult, NewImage, VectorStore};
use crate::decision::{Decision, decide};
use crate::embedding::Embedder;
use crate::error::{IngestError, PersistError};
use crate::metrics::{self, Outcome, Source};
use crate::storage::FileStorage;
use crate::vector;

/// 允许入库的图片后缀
const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// 分页时的默认与最大条数
const DEFAULT_PAGE_LIMIT: i64 = 10;
const MAX_PAGE_LIMIT: i64 = 100;

/// 相似度检查结果
#[derive(Debug, Clone)]
pub struct Check {
    /// 归一化后的特征向量
    pub embedding: Vec<f32>,
    /// 最相似的已有图片
    pub neighbor: Option<NeighborResult>,
    pub decision: Decision,
}

/// 单张图片的入库流程
///
/// 校验格式 -> 计算特征 -> 归一化 -> 查询最近邻 -> 判定 -> 保存文件和记录
pub struct Ingestor<E, S> {
    embedder: E,
    store: S,
    storage: FileStorage,
    threshold: f64,
}

impl<E: Embedder, S: VectorStore> Ingestor<E, S> {
    pub fn new(embedder: E, store: S, storage: FileStorage, threshold: f64) -> Self {
        Self { embedder, store, storage, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// 添加一张图片，成功时返回新记录
    ///
    /// 相似度过高时返回 [`IngestError::TooSimilar`]，此时不会写入任何数据
    pub async fn ingest(&self, name: &str, data: &[u8]) -> Result<ImageRecord, IngestError> {
        let result = self.ingest_inner(name, data).await;
        let outcome = match &result {
            Ok(_) => Outcome::Admitted,
            Err(e) if e.is_rejection() => Outcome::Rejected,
            Err(_) => Outcome::Failed,
        };
        metrics::inc_ingest(Source::Single, outcome);
        result
    }

    async fn ingest_inner(&self, name: &str, data: &[u8]) -> Result<ImageRecord, IngestError> {
        if !is_allowed(name) {
            return Err(IngestError::InvalidFormat(name.to_string()));
        }

        let check = self.check(name, data).await?;
        match check.decision {
            Decision::Reject { record, similarity } => {
                Err(IngestError::TooSimilar { matched: record, similarity })
            }
            Decision::Admit => self.admit(name, data, check.embedding).await,
        }
    }

    /// 计算特征并与已有图片比较，不做任何写入
    pub async fn check(&self, name: &str, data: &[u8]) -> Result<Check, IngestError> {
        let embedding = self
            .embedder
            .embed(data)
            .await
            .map_err(|source| IngestError::Embedding { name: name.to_string(), source })?;
        let embedding = vector::normalized(embedding);

        let neighbor = self.store.nearest_neighbors(&embedding, 1).await?.into_iter().next();
        if let Some(top) = &neighbor {
            debug!(
                "[CHECK] {} → {:.2}% (id={} name={})",
                name, top.similarity_percent, top.record.id, top.record.name
            );
            metrics::observe_top_similarity(top.similarity_percent);
        }

        let decision = decide(neighbor.as_slice(), self.threshold);
        Ok(Check { embedding, neighbor, decision })
    }

    /// 保存文件并写入数据库
    ///
    /// 数据库写入失败时已保存的文件不会被删除
    pub async fn admit(
        &self,
        name: &str,
        data: &[u8],
        embedding: Vec<f32>,
    ) -> Result<ImageRecord, IngestError> {
        let persist_err =
            |source: PersistError| IngestError::Persist { name: name.to_string(), source };

        let path = self.storage.save(name, data).await.map_err(|e| persist_err(e.into()))?;
        let file_name = path.file_name().map(|s| s.to_string_lossy().to_string());
        let image = NewImage {
            name: file_name.unwrap_or_else(|| name.to_string()),
            path: path.to_string_lossy().to_string(),
            embedding,
        };

        match self.store.insert(image).await {
            Ok(record) => {
                info!("[ADD] {} (id={})", record.name, record.id);
                Ok(record)
            }
            Err(e) => {
                warn!("写入数据库失败，文件已保留: {}", path.display());
                Err(persist_err(e.into()))
            }
        }
    }

    /// 删除图片文件和记录
    ///
    /// 同名图片共用一个文件，仍被其他记录引用的文件不会被删除
    pub async fn delete(&self, id: i64) -> Result<ImageRecord, IngestError> {
        let record = self.store.get_by_id(id).await?;
        if self.store.path_shared(&record.path, id).await? {
            debug!("文件仍被其他记录引用，保留: {}", record.path);
        } else if !record.path.is_empty() {
            self.storage.remove(Path::new(&record.path)).await.map_err(|e| {
                IngestError::Persist { name: record.name.clone(), source: e.into() }
            })?;
        }
        self.store.delete(id).await?;
        info!("[DELETE] {} (id={})", record.name, record.id);
        Ok(record)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<ImageRecord, IngestError> {
        Ok(self.store.get_by_id(id).await?)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<ImageRecord, IngestError> {
        Ok(self.store.get_by_name(name).await?)
    }

    /// 分页列出图片，`page` 从 1 开始
    pub async fn list(&self, page: i64, limit: i64) -> Result<Vec<ImageRecord>, IngestError> {
        let (limit, offset) = page_to_offset(page, limit);
        Ok(self.store.list_page(limit, offset).await?)
    }
}

/// 检查文件后缀，不区分大小写
pub fn is_allowed(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// 将页码转换为 `(limit, offset)`，非法值回退到默认值
pub fn page_to_offset(page: i64, limit: i64) -> (usize, usize) {
    let page = page.max(1);
    let limit = if limit <= 0 || limit > MAX_PAGE_LIMIT { DEFAULT_PAGE_LIMIT } else { limit };
    (limit as usize, (page - 1).saturating_mul(limit) as usize)
}
