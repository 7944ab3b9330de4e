//! Fetch boundary: page retrieval over HTTP

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Async boundary over page retrieval.
///
/// Implementations return the full response body and carry no caching
/// responsibility.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the content at `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP fetcher backed by a pooled [`reqwest::Client`]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(fetch_error)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                status: Some(status.as_u16()),
                message: format!("unexpected status {}", status),
            });
        }

        let body = response.bytes().await.map_err(fetch_error)?;
        Ok(body.to_vec())
    }
}

fn fetch_error(err: reqwest::Error) -> Error {
    Error::Fetch {
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}
