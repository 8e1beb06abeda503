use std::sync::LazyLock;

use prometheus::*;

static METRIC_INGEST_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "imdedup_ingest_total",
        "count of the ingested images by outcome",
        &["source", "outcome"]
    )
    .unwrap()
});

static METRIC_TOP_SIMILARITY: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "imdedup_top_similarity",
        "similarity percent of the nearest stored image",
        (5..=100).step_by(5).map(|x| x as f64).collect()
    )
    .unwrap()
});

/// 入库请求来源
#[derive(Debug, Clone, Copy)]
pub enum Source {
    Single,
    Batch,
}

/// 入库结果
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Admitted,
    Rejected,
    Failed,
}

impl Source {
    fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Batch => "batch",
        }
    }
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// 增加入库结果计数
pub fn inc_ingest(source: Source, outcome: Outcome) {
    METRIC_INGEST_COUNT.with_label_values(&[source.as_str(), outcome.as_str()]).inc();
}

/// 记录最近邻的相似度
pub fn observe_top_similarity(similarity: f64) {
    METRIC_TOP_SIMILARITY.observe(similarity);
}

/// 以文本格式导出所有指标
pub fn gather_text() -> Result<String> {
    let encoder = TextEncoder::new();
    encoder.encode_to_string(&prometheus::gather())
}
