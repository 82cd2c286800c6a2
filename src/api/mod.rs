pub mod client;
pub mod image;

use crate::recognition::Recognition;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

pub use client::HttpFoodApi;
pub use image::ImageBlob;

/// Backend origin used when the client is served from a local development host.
pub const LOCAL_DEV_ORIGIN: &str = "http://127.0.0.1:5000";

pub const PREDICT_PATH: &str = "/predict";
pub const CHAT_PATH: &str = "/chat";
pub const ASK_AI_PATH: &str = "/ask_ai";

/// Failures that never reach the backend's JSON contract: transport errors,
/// timeouts, unusable endpoints, and bodies that are not JSON at all.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response body: {0}")]
    InvalidBody(String),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AskReply {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[async_trait]
pub trait FoodApi: Send + Sync {
    /// `POST /predict` with the image as multipart field `image`.
    async fn predict(&self, image: &ImageBlob) -> Result<Recognition, ApiError>;

    /// `POST /chat` with `{"message": ...}`.
    async fn chat(&self, message: &str) -> Result<ChatReply, ApiError>;

    /// `POST /ask_ai` with `{"prompt": ...}`.
    async fn ask_ai(&self, prompt: &str) -> Result<AskReply, ApiError>;
}

fn is_local_host(page_url: &str) -> bool {
    match Url::parse(page_url) {
        Ok(url) => matches!(url.host_str(), Some("localhost") | Some("127.0.0.1")),
        Err(_) => false,
    }
}

/// Picks the backend origin. An explicit override wins, a local page host talks
/// to the development server, anything else uses same-origin requests (an
/// empty base).
pub fn resolve_api_base(override_base: Option<&str>, page_url: &str) -> String {
    if let Some(base) = override_base {
        return base.to_string();
    }
    if is_local_host(page_url) {
        return LOCAL_DEV_ORIGIN.to_string();
    }
    String::new()
}

/// Builds the absolute URL for `path`. An empty base means the request is
/// relative to the page origin.
pub fn endpoint_url(api_base: &str, page_url: &str, path: &str) -> Result<Url, ApiError> {
    if api_base.is_empty() {
        let origin = Url::parse(page_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        return origin
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()));
    }

    let raw = format!("{}{}", api_base.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))
}
