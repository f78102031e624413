//! Streaming HTTP downloads into the staging area

use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::HttpConfig;
use crate::error::Result;

/// HTTP client shared by every provider in a run
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }

    /// Stream `url` into `dest`, returning the number of bytes written
    ///
    /// Non-2xx responses are errors; nothing is retried.
    pub async fn download_file(&self, url: &str, dest: &Path) -> Result<u64> {
        debug!(url, dest = %dest.display(), "Starting download");

        let response = self.client.get(url).send().await?.error_for_status()?;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut body = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(
            url,
            bytes = written,
            "Downloaded {} ({} KB)",
            dest.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            written / 1024
        );

        Ok(written)
    }
}

/// Last path segment of a URL, used to name the staged copy
///
/// Falls back to `default` when the URL has no usable file name
/// (for example a query-string download endpoint).
pub fn file_name_from_url(url: &str, default: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty() && name.contains('.'))
        .unwrap_or_else(|| default.to_string())
}
