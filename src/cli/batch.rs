use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use log::{info, warn};
use tokio::sync::watch;
use tokio::task::block_in_place;

use crate::batch::{BatchPipeline, parse_manifest};
use crate::cli::{SubCommandExtend, open_ingestor};
use crate::config::{DedupOptions, Opts, WorkerOptions};
use crate::fetch::SourceFetcher;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct BatchCommand {
    #[command(flatten)]
    pub dedup: DedupOptions,
    #[command(flatten)]
    pub worker: WorkerOptions,
    /// CSV 清单，第一行为表头，之后每行为 `图片名,图片地址`
    pub manifest: PathBuf,
    /// 相似度报告输出路径，默认保存在数据目录下
    #[arg(short, long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

impl SubCommandExtend for BatchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let file = File::open(&self.manifest)
            .with_context(|| format!("无法打开清单: {}", self.manifest.display()))?;
        let jobs = block_in_place(|| parse_manifest(file))?;
        info!("读取清单完成，共 {} 行", jobs.len());

        let ingestor = Arc::new(open_ingestor(&opts.conf_dir, &self.dedup).await?);
        let fetcher = SourceFetcher::new(self.dedup.timeout())?;
        let pb = ProgressBar::no_length().with_style(pb_style());
        pb.enable_steady_tick(Duration::from_millis(200));
        let pipeline =
            BatchPipeline::new(ingestor, fetcher, (&self.worker).into()).with_progress(pb.clone());

        let (cancel_tx, cancel_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("收到中断信号，正在停止");
                cancel_tx.send_replace(true);
            }
        });

        let report = pipeline.run(jobs, cancel_rx).await;
        pb.finish_with_message("批量处理完成");

        let report_path = self.report.clone().unwrap_or_else(|| opts.conf_dir.report());
        block_in_place(|| report.save(&report_path))?;
        info!("报告已保存: {}", report_path.display());

        println!("inserted: {}", report.admitted);
        println!("rows: {}", report.rows.len());
        println!("failed: {}", report.failed);
        println!("report: {}", report_path.display());
        Ok(())
    }
}
