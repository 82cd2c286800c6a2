use super::AssetFetcher;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Url;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Fetches shell assets from the origin the client is served from.
pub struct HttpAssetFetcher {
    client: reqwest::Client,
    origin: Url,
}

impl HttpAssetFetcher {
    pub fn new(origin: &str) -> Result<Self, String> {
        let origin = Url::parse(origin).map_err(|e| format!("Invalid origin {}: {}", origin, e))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client, origin })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, String> {
        let url = self
            .origin
            .join(path)
            .map_err(|e| format!("Invalid asset path {}: {}", path, e))?;

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!("Asset request {} failed: {}", url, e);
            if e.is_timeout() {
                "Request timeout".to_string()
            } else {
                format!("Request failed: {}", e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Asset {} returned {}", url, status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read {}: {}", url, e))?;
        debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }
}
