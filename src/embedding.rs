use std::future::Future;
use std::time::Duration;

use log::debug;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::EmbeddingError;

/// 默认的 CLIP 服务地址
pub const DEFAULT_EMBED_URL: &str = "http://clip_server:8001/clip/encode";

/// 图片特征向量生成服务
///
/// 返回的向量不保证已归一化
pub trait Embedder: Send + Sync {
    fn embed(&self, image: &[u8]) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;
}

#[derive(Deserialize)]
struct ClipResponse {
    vector: Vec<f32>,
}

/// 通过 HTTP 调用 CLIP 服务
///
/// 请求为 multipart 表单，图片放在 `file` 字段，响应为 `{"vector": [...]}`
#[derive(Clone)]
pub struct ClipClient {
    client: Client,
    url: String,
}

impl ClipClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Embedder for ClipClient {
    async fn embed(&self, image: &[u8]) -> Result<Vec<f32>, EmbeddingError> {
        debug!("请求 embedding: {} ({} bytes)", self.url, image.len());
        let part = Part::bytes(image.to_vec()).file_name("image.jpg").mime_str("image/jpeg")?;
        let form = Form::new().part("file", part);

        let resp = self.client.post(&self.url).multipart(form).send().await?;
        if !resp.status().is_success() {
            return Err(EmbeddingError::Status(resp.status()));
        }

        let resp = resp.json::<ClipResponse>().await?;
        if resp.vector.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        Ok(resp.vector)
    }
}
