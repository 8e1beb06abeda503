use anyhow::Result;
use clap::Parser;

use crate::cli::{SubCommandExtend, open_ingestor};
use crate::config::{DedupOptions, Opts};

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// 图片 ID
    pub id: i64,
}

impl SubCommandExtend for DeleteCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        // 删除不需要请求 embedding 服务
        let ingestor = open_ingestor(&opts.conf_dir, &DedupOptions::default()).await?;
        let record = ingestor.delete(self.id).await?;
        println!("Deleted image {} ({})", record.id, record.name);
        Ok(())
    }
}
