use std::io::Read;

use csv::{ReaderBuilder, Trim};
use log::warn;

/// 批量任务中的一张图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionJob {
    /// 在清单中的序号，用于报告排序
    pub index: usize,
    /// 图片名称
    pub name: String,
    /// 图片来源，URL 或本地路径
    pub location: String,
}

/// 解析 CSV 清单，第一行为表头
///
/// 格式不正确的行会被跳过，只有底层读取失败才会返回错误
pub fn parse_manifest<R: Read>(reader: R) -> Result<Vec<IngestionJob>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut jobs = vec![];
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                warn!("跳过无法解析的行 {}: {}", line + 2, e);
                continue;
            }
        };
        match (record.get(0), record.get(1)) {
            (Some(name), Some(location)) if !name.is_empty() && !location.is_empty() => {
                jobs.push(IngestionJob {
                    index: jobs.len(),
                    name: name.to_string(),
                    location: location.to_string(),
                });
            }
            _ => warn!("跳过格式错误的行 {}: {:?}", line + 2, record),
        }
    }

    Ok(jobs)
}
