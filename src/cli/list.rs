use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::db::{ImageDB, ImageRecord, VectorStore};
use crate::ingest::page_to_offset;

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// 页码，从 1 开始
    #[arg(short, long, default_value_t = 1)]
    pub page: i64,
    /// 每页数量，最大 100
    #[arg(short, long, default_value_t = 10)]
    pub limit: i64,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for ListCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = ImageDB::open(opts.conf_dir.database()).await?;
        let (limit, offset) = page_to_offset(self.page, self.limit);
        let records = db.list_page(limit, offset).await?;
        print_records(&records, &self.output_format)
    }
}

/// 输出图片记录，不包含特征向量
pub fn print_records(records: &[ImageRecord], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let records = records
                .iter()
                .map(|r| ImageRecord { embedding: vec![], ..r.clone() })
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&records)?)
        }
        OutputFormat::Table => {
            for r in records {
                println!("{}\t{}\t{}", r.id, r.name, r.path);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone)]
pub enum OutputFormat {
    Json,
    Table,
}
