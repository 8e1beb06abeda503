//! 批量入库
//!
//! 清单中的任务通过有界队列分发给固定数量的 worker，
//! 每个 worker 的结果通过通道发送给唯一的汇总任务，报告和计数只由汇总任务持有。

mod manifest;
mod report;

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio::sync::{Mutex, watch};

pub use self::manifest::*;
pub use self::report::*;
use crate::db::VectorStore;
use crate::decision::Decision;
use crate::embedding::Embedder;
use crate::error::IngestError;
use crate::fetch::SourceFetcher;
use crate::ingest::Ingestor;
use crate::metrics::{self, Outcome, Source};

/// 默认 worker 数量
pub const DEFAULT_WORKERS: usize = 5;
/// 默认任务队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// 并发处理的 worker 数量
    pub workers: usize,
    /// 任务队列容量，队列满时分发会等待
    pub queue_capacity: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { workers: DEFAULT_WORKERS, queue_capacity: DEFAULT_QUEUE_CAPACITY }
    }
}

/// 批量入库流水线
///
/// 是否入库使用与单张图片相同的阈值判定
pub struct BatchPipeline<E, S> {
    ingestor: Arc<Ingestor<E, S>>,
    fetcher: SourceFetcher,
    options: BatchOptions,
    pb: ProgressBar,
}

impl<E, S> BatchPipeline<E, S>
where
    E: Embedder + 'static,
    S: VectorStore + 'static,
{
    pub fn new(ingestor: Arc<Ingestor<E, S>>, fetcher: SourceFetcher, options: BatchOptions) -> Self {
        Self { ingestor, fetcher, options, pb: ProgressBar::hidden() }
    }

    /// 使用进度条显示处理进度
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    /// 处理所有任务，单个任务失败不会中断整体
    ///
    /// `cancel` 变为 `true` 后不再分发新任务，正在处理的任务在下一个等待点结束
    pub async fn run(&self, jobs: Vec<IngestionJob>, mut cancel: watch::Receiver<bool>) -> BatchReport {
        let workers = self.options.workers.max(1);
        let capacity = self.options.queue_capacity.max(1);
        info!("开始批量处理 {} 个任务，worker 数量: {}", jobs.len(), workers);

        self.pb.set_length(jobs.len() as u64);

        let (job_tx, job_rx) = channel(capacity);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (out_tx, out_rx) = channel(capacity);

        let handles = (0..workers)
            .map(|id| {
                tokio::spawn(worker(
                    id,
                    self.ingestor.clone(),
                    self.fetcher.clone(),
                    job_rx.clone(),
                    out_tx.clone(),
                    cancel.clone(),
                ))
            })
            .collect::<Vec<_>>();
        // 所有 worker 退出后汇总任务才会结束
        drop(out_tx);

        let dispatch = async move {
            for job in jobs {
                tokio::select! {
                    _ = cancelled(&mut cancel) => {
                        warn!("批量任务已取消，停止分发");
                        break;
                    }
                    r = job_tx.send(job) => if r.is_err() { break },
                }
            }
            drop(job_tx);
            for r in join_all(handles).await {
                if let Err(e) = r {
                    error!("worker 异常退出: {e}");
                }
            }
        };

        let (report, _) = tokio::join!(aggregate(out_rx, self.pb.clone()), dispatch);
        info!(
            "批量处理完成：{} 行报告，入库 {}，失败 {}，取消 {}",
            report.rows.len(),
            report.admitted,
            report.failed,
            report.cancelled
        );
        report
    }
}

async fn worker<E: Embedder, S: VectorStore>(
    id: usize,
    ingestor: Arc<Ingestor<E, S>>,
    fetcher: SourceFetcher,
    jobs: Arc<Mutex<Receiver<IngestionJob>>>,
    out: Sender<JobOutcome>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        let job = {
            let mut jobs = jobs.lock().await;
            until_cancelled(&mut cancel, jobs.recv()).await.ok().flatten()
        };
        let Some(job) = job else {
            break;
        };

        let index = job.index;
        let outcome = until_cancelled(&mut cancel, process(&ingestor, &fetcher, job))
            .await
            .unwrap_or(JobOutcome::Cancelled { index });
        if out.send(outcome).await.is_err() {
            break;
        }
    }
    debug!("worker {id} 退出");
}

/// 处理一个任务：下载 -> 检查 -> 记录报告行 -> 入库或跳过
async fn process<E: Embedder, S: VectorStore>(
    ingestor: &Ingestor<E, S>,
    fetcher: &SourceFetcher,
    job: IngestionJob,
) -> JobOutcome {
    let IngestionJob { index, name, location } = job;
    let failed = |error: IngestError| {
        warn!("处理失败 {name}: {error}");
        metrics::inc_ingest(Source::Batch, Outcome::Failed);
        JobOutcome::Failed { index, name: name.clone(), error: error.to_string() }
    };

    let data = match fetcher.fetch(&location).await {
        Ok(data) => data,
        Err(e) => return failed(e.into()),
    };
    let check = match ingestor.check(&name, &data).await {
        Ok(check) => check,
        Err(e) => return failed(e),
    };

    let row = ReportRow {
        input_name: name.clone(),
        matched_name: check.neighbor.as_ref().map(|n| n.record.name.clone()).unwrap_or_default(),
        similarity: check.neighbor.as_ref().map(|n| n.similarity_percent).unwrap_or_default(),
    };

    let admitted = match check.decision {
        Decision::Admit => match ingestor.admit(&name, &data, check.embedding).await {
            Ok(_) => {
                metrics::inc_ingest(Source::Batch, Outcome::Admitted);
                true
            }
            Err(e) => {
                warn!("入库失败 {name}: {e}");
                metrics::inc_ingest(Source::Batch, Outcome::Failed);
                false
            }
        },
        Decision::Reject { .. } => {
            info!("skip similar: {name} ({:.2}%)", row.similarity);
            metrics::inc_ingest(Source::Batch, Outcome::Rejected);
            false
        }
    };

    JobOutcome::Processed { index, row, admitted }
}

/// 等待取消信号，发送端关闭后永远不会返回
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|&c| c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// 等待 `fut` 完成，取消时返回 `Err(())`
async fn until_cancelled<F: Future>(
    cancel: &mut watch::Receiver<bool>,
    fut: F,
) -> Result<F::Output, ()> {
    tokio::select! {
        biased;
        _ = cancelled(cancel) => Err(()),
        r = fut => Ok(r),
    }
}
