use std::io::{self, Write};
use std::path::Path;

use indicatif::ProgressBar;
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::sync::mpsc::Receiver;

/// 报告中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// 输入图片名称
    pub input_name: String,
    /// 最相似的已有图片名称，数据库为空时为空字符串
    pub matched_name: String,
    /// 相似度百分比
    #[serde(serialize_with = "two_decimals")]
    pub similarity: f64,
}

fn two_decimals<S: serde::Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{v:.2}"))
}

/// 单个任务的处理结果，由 worker 发送给汇总任务
#[derive(Debug)]
pub enum JobOutcome {
    /// 完成相似度检查，`admitted` 表示是否成功入库
    Processed { index: usize, row: ReportRow, admitted: bool },
    /// 下载、计算特征或查询失败，不产生报告行
    Failed { index: usize, name: String, error: String },
    /// 任务被取消
    Cancelled { index: usize },
}

/// 批量入库的最终结果
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchReport {
    /// 按清单顺序排列的报告行
    pub rows: Vec<ReportRow>,
    /// 成功入库的数量
    pub admitted: usize,
    /// 失败的任务数量
    pub failed: usize,
    /// 被取消的任务数量
    pub cancelled: usize,
}

impl BatchReport {
    /// 输出 CSV 格式的报告
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        if self.rows.is_empty() {
            writer.write_record(["input_name", "matched_name", "similarity"])?;
        }
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// 保存报告到文件
    ///
    /// 先写入同目录下的临时文件再重命名，多个任务同时保存时文件内容不会交错
    pub fn save(&self, path: impl AsRef<Path>) -> csv::Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut file = NamedTempFile::new_in(dir)?;
        self.write_csv(&mut file)?;
        file.persist(path).map_err(io::Error::from)?;
        Ok(())
    }
}

/// 汇总所有任务结果，报告行和计数只在这里修改
#[derive(Debug, Default)]
pub struct Aggregator {
    rows: Vec<(usize, ReportRow)>,
    admitted: usize,
    failed: usize,
    cancelled: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Processed { index, row, admitted } => {
                self.rows.push((index, row));
                if admitted {
                    self.admitted += 1;
                }
            }
            JobOutcome::Failed { .. } => self.failed += 1,
            JobOutcome::Cancelled { .. } => self.cancelled += 1,
        }
    }

    /// 按清单顺序重新排列报告行
    pub fn finish(mut self) -> BatchReport {
        self.rows.sort_by_key(|(index, _)| *index);
        BatchReport {
            rows: self.rows.into_iter().map(|(_, row)| row).collect(),
            admitted: self.admitted,
            failed: self.failed,
            cancelled: self.cancelled,
        }
    }
}

/// 从通道接收结果直到所有 worker 退出
pub async fn aggregate(mut rx: Receiver<JobOutcome>, pb: ProgressBar) -> BatchReport {
    let mut aggregator = Aggregator::new();
    while let Some(outcome) = rx.recv().await {
        match &outcome {
            JobOutcome::Processed { row, admitted, .. } => pb.set_message(format!(
                "{} → {:.2}% {}",
                row.input_name,
                row.similarity,
                if *admitted { "添加" } else { "跳过" }
            )),
            JobOutcome::Failed { name, error, .. } => pb.println(format!("失败 {name}: {error}")),
            JobOutcome::Cancelled { .. } => {}
        }
        aggregator.push(outcome);
        pb.inc(1);
    }
    aggregator.finish()
}
