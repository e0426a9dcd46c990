use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use super::Fetch;
use crate::error::RepackError;
use anyhow::Result;

/// HTTP fetcher that downloads whole bodies into memory
///
/// Failures are not retried: a broken download aborts the run.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new fetcher with a bounded request timeout
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(RepackError::Http {
                url: url.to_string(),
                status: resp.status().as_u16(),
            }
            .into());
        }

        let bytes = resp.bytes().await?;
        debug!("received {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}
