mod add;
mod batch;
mod delete;
mod list;
pub mod server;
mod show;

pub use add::*;
pub use batch::*;
pub use delete::*;
pub use list::*;
pub use server::*;
pub use show::*;

use crate::config::{ConfDir, DedupOptions, Opts};
use crate::db::ImageDB;
use crate::embedding::ClipClient;
use crate::ingest::Ingestor;
use crate::storage::FileStorage;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 使用 HTTP embedding 服务和 sqlite 数据库的入库流程
pub type DefaultIngestor = Ingestor<ClipClient, ImageDB>;

/// 打开数据库并创建入库流程
pub async fn open_ingestor(
    conf_dir: &ConfDir,
    dedup: &DedupOptions,
) -> anyhow::Result<DefaultIngestor> {
    let db = ImageDB::open(conf_dir.database()).await?;
    let embedder = ClipClient::new(&dedup.embed_url, dedup.timeout())?;
    let storage = FileStorage::new(conf_dir.images());
    Ok(Ingestor::new(embedder, db, storage, dedup.threshold))
}
