use std::path::PathBuf;
use std::sync::Arc;

use crate::batch::BatchOptions;
use crate::cli::DefaultIngestor;
use crate::fetch::SourceFetcher;

/// 应用状态
pub struct AppState {
    /// 入库流程
    pub ingestor: Arc<DefaultIngestor>,
    /// 批量任务的图片下载器
    pub fetcher: SourceFetcher,
    /// 批量任务配置
    pub batch: BatchOptions,
    /// 批量报告保存路径
    pub report: PathBuf,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(
        ingestor: DefaultIngestor,
        fetcher: SourceFetcher,
        batch: BatchOptions,
        report: PathBuf,
    ) -> Arc<Self> {
        Arc::new(AppState { ingestor: Arc::new(ingestor), fetcher, batch, report })
    }
}
