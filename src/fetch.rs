use std::time::Duration;

use reqwest::Client;

use crate::error::DownloadError;

/// 下载批量任务中的图片，支持 http(s) 地址和本地路径
#[derive(Clone)]
pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self { client: Client::builder().timeout(timeout).build()? })
    }

    pub async fn fetch(&self, location: &str) -> Result<Vec<u8>, DownloadError> {
        if is_remote(location) {
            self.fetch_http(location).await
        } else {
            tokio::fs::read(location)
                .await
                .map_err(|source| DownloadError::Io { path: location.to_string(), source })
        }
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let http_err = |source| DownloadError::Http { url: url.to_string(), source };

        let resp = self.client.get(url).send().await.map_err(http_err)?;
        if !resp.status().is_success() {
            return Err(DownloadError::Status { url: url.to_string(), status: resp.status() });
        }
        let bytes = resp.bytes().await.map_err(http_err)?;
        Ok(bytes.to_vec())
    }
}

fn is_remote(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
