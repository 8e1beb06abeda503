use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressIterator};
use log::info;
use walkdir::WalkDir;

use crate::cli::{SubCommandExtend, open_ingestor};
use crate::config::{DedupOptions, Opts};
use crate::ingest::is_allowed;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    #[command(flatten)]
    pub dedup: DedupOptions,
    /// 图片路径，可以是单个文件或目录
    pub path: PathBuf,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let ingestor = open_ingestor(&opts.conf_dir, &self.dedup).await?;

        let entries = scan(&self.path);
        info!("共 {} 张图片", entries.len());

        let mut admitted = 0;
        let pb = ProgressBar::new(entries.len() as u64).with_style(pb_style());
        for entry in entries.iter().progress_with(pb.clone()) {
            let name = entry.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
            let data = tokio::fs::read(entry).await?;
            match ingestor.ingest(&name, &data).await {
                Ok(record) => {
                    pb.suspend(|| println!("[OK] {} (id={})", entry.display(), record.id));
                    admitted += 1;
                }
                Err(e) if e.is_rejection() => {
                    pb.suspend(|| println!("[SKIP] {}: {}", entry.display(), e))
                }
                Err(e) => pb.suspend(|| eprintln!("[ERR] {}: {}", entry.display(), e)),
            }
        }
        pb.finish_with_message("图片添加完成");

        println!("inserted: {admitted}");
        Ok(())
    }
}

/// 单个文件原样返回，目录则递归扫描允许的图片
fn scan(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut entries = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_allowed(&path.to_string_lossy()))
        .collect::<Vec<_>>();
    entries.sort();
    entries
}
