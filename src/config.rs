use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use clap::builder::TypedValueParser;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::batch::{BatchOptions, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
use crate::cli::*;
use crate::decision::DEFAULT_THRESHOLD;
use crate::embedding::DEFAULT_EMBED_URL;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "easyread", "imdedup").expect("failed to get project dir");
    ConfDir { path: proj_dirs.data_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

#[derive(Parser, Debug, Clone)]
pub struct DedupOptions {
    /// 入库阈值，与已有图片的相似度百分比达到该值时视为重复
    #[arg(short, long, value_name = "PERCENT", default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
    pub threshold: f64,
    /// CLIP embedding 服务地址
    #[arg(long, value_name = "URL", default_value = DEFAULT_EMBED_URL)]
    pub embed_url: String,
    /// 请求 embedding 服务和下载图片的超时时间，单位为秒
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub embed_timeout: u64,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self { threshold: DEFAULT_THRESHOLD, embed_url: DEFAULT_EMBED_URL.to_string(), embed_timeout: 30 }
    }
}

impl DedupOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout)
    }
}

#[derive(Parser, Debug, Clone)]
pub struct WorkerOptions {
    /// 批量处理时的并发数量
    #[arg(short, long, value_name = "N", default_value_t = DEFAULT_WORKERS, value_parser = clap::value_parser!(u16).range(1..).map(|n| n as usize))]
    pub workers: usize,
    /// 批量处理时的任务队列容量
    #[arg(long, value_name = "N", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue: usize,
}

impl From<&WorkerOptions> for BatchOptions {
    fn from(opts: &WorkerOptions) -> Self {
        BatchOptions { workers: opts.workers, queue_capacity: opts.queue }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imdedup", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// imdedup 数据目录，包含数据库和图片
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 添加图片，相似图片会被拒绝
    Add(AddCommand),
    /// 根据 CSV 清单批量添加图片并生成相似度报告
    Batch(BatchCommand),
    /// 启动 HTTP 服务
    Server(ServerCommand),
    /// 分页列出已添加的图片
    List(ListCommand),
    /// 查看单张图片记录
    Show(ShowCommand),
    /// 删除图片
    Delete(DeleteCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("imdedup.db")
    }

    /// 返回图片存储目录
    pub fn images(&self) -> PathBuf {
        self.path.join("images")
    }

    /// 返回默认的批量报告路径
    pub fn report(&self) -> PathBuf {
        self.path.join("report_similarity.csv")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

fn parse_threshold(s: &str) -> anyhow::Result<f64> {
    let v: f64 = s.parse()?;
    if !v.is_finite() {
        return Err(anyhow::anyhow!("无效的阈值: {}", s));
    }
    Ok(v)
}
