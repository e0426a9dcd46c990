mod http;
mod memory;

pub use http::HttpFetcher;
pub use memory::MemoryReader;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}

/// Trait for fetching a whole remote resource into memory
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Download the body behind `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetch `url` and decode its body as JSON
pub async fn fetch_json<T, F>(fetcher: &F, url: &str) -> Result<T>
where
    T: DeserializeOwned,
    F: Fetch + ?Sized,
{
    let body = fetcher.fetch(url).await?;
    Ok(serde_json::from_slice(&body)?)
}
