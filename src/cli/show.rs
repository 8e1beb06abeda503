use anyhow::{Result, anyhow};
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::cli::list::{OutputFormat, print_records};
use crate::config::Opts;
use crate::db::{ImageDB, VectorStore};

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// 图片 ID
    #[arg(required_unless_present = "name", conflicts_with = "name")]
    pub id: Option<i64>,
    /// 按名称查找
    #[arg(short, long)]
    pub name: Option<String>,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for ShowCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = ImageDB::open(opts.conf_dir.database()).await?;
        let record = match (&self.id, &self.name) {
            (Some(id), _) => db.get_by_id(*id).await?,
            (None, Some(name)) => db.get_by_name(name).await?,
            (None, None) => return Err(anyhow!("需要指定图片 ID 或名称")),
        };
        print_records(&[record], &self.output_format)
    }
}
