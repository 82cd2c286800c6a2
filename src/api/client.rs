use super::{
    endpoint_url, resolve_api_base, ApiError, AskReply, ChatReply, FoodApi, ImageBlob,
    ASK_AI_PATH, CHAT_PATH, PREDICT_PATH,
};
use crate::recognition::Recognition;
use crate::settings::AppSettings;
use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::multipart::Form;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    prompt: &'a str,
}

/// [`FoodApi`] over HTTP.
///
/// Response bodies are read whatever the status code: the backend reports its
/// failures as JSON objects carrying an `error` field alongside 4xx/5xx codes.
pub struct HttpFoodApi {
    client: reqwest::Client,
    api_base: String,
    page_url: String,
}

impl HttpFoodApi {
    pub fn new(api_base: String, page_url: String, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        info!(
            "FoodNinja API base = {}",
            if api_base.is_empty() {
                "(relative / same-origin)"
            } else {
                api_base.as_str()
            }
        );

        Ok(Self {
            client,
            api_base,
            page_url,
        })
    }

    pub fn from_settings(settings: &AppSettings) -> Result<Self, String> {
        let api_base = resolve_api_base(settings.api_base.as_deref(), &settings.page_url);
        Self::new(
            api_base,
            settings.page_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        endpoint_url(&self.api_base, &self.page_url, path)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        debug!("API response status: {}", status);

        serde_json::from_str::<Value>(&body).map_err(|e| {
            error!("API returned non-JSON body: status={}, error={}", status, e);
            ApiError::InvalidBody(e.to_string())
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.url(path)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("API request to {} failed: {}", path, e);
                map_transport_error(e)
            })?;

        let value = Self::read_json(response).await?;
        serde_json::from_value::<R>(value).map_err(|e| ApiError::InvalidBody(e.to_string()))
    }
}

fn map_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(e.to_string())
    }
}

#[async_trait]
impl FoodApi for HttpFoodApi {
    async fn predict(&self, image: &ImageBlob) -> Result<Recognition, ApiError> {
        info!(
            "Predict: file={}, bytes={}, mime={}",
            image.file_name(),
            image.len(),
            image.mime_type()
        );

        let url = self.url(PREDICT_PATH)?;
        let part = image.to_part().map_err(ApiError::Network)?;
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Predict request failed: {}", e);
                map_transport_error(e)
            })?;

        let value = Self::read_json(response).await?;
        Ok(Recognition::from_value(value))
    }

    async fn chat(&self, message: &str) -> Result<ChatReply, ApiError> {
        debug!("Chat request: {} chars", message.len());
        self.post_json(CHAT_PATH, &ChatRequest { message }).await
    }

    async fn ask_ai(&self, prompt: &str) -> Result<AskReply, ApiError> {
        debug!("Ask AI request: {} chars", prompt.len());
        self.post_json(ASK_AI_PATH, &AskRequest { prompt }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves exactly one HTTP response and hands back the raw request text.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn api(base: String) -> HttpFoodApi {
        HttpFoodApi::new(base, "http://localhost".into(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn predict_posts_multipart_image() {
        let (base, server) =
            serve_once("200 OK", r#"{"food_name":"Phở","probability":0.92}"#).await;

        let recognition = api(base)
            .predict(&ImageBlob::from_capture(b"jpegdata".to_vec()))
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /predict "));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains(r#"name="image""#));
        assert!(request.contains("jpegdata"));

        match recognition {
            Recognition::Parsed(response) => {
                assert_eq!(response.food_name.as_deref(), Some("Phở"));
                assert_eq!(response.probability(), 0.92);
            }
            Recognition::Malformed(reason) => panic!("unexpected malformed: {}", reason),
        }
    }

    #[tokio::test]
    async fn error_status_bodies_are_still_parsed() {
        let (base, server) =
            serve_once("500 Internal Server Error", r#"{"error":"Missing CLARIFAI_PAT"}"#).await;

        let recognition = api(base)
            .predict(&ImageBlob::from_capture(vec![1]))
            .await
            .unwrap();
        server.await.unwrap();

        match recognition {
            Recognition::Parsed(response) => {
                assert_eq!(response.error.as_deref(), Some("Missing CLARIFAI_PAT"))
            }
            Recognition::Malformed(reason) => panic!("unexpected malformed: {}", reason),
        }
    }

    #[tokio::test]
    async fn chat_sends_message_json() {
        let (base, server) = serve_once("200 OK", r#"{"response":"Xin chào!"}"#).await;

        let reply = api(base).chat("chào").await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /chat "));
        assert!(request.contains(r#"{"message":"chào"}"#));
        assert_eq!(reply.response.as_deref(), Some("Xin chào!"));
        assert_eq!(reply.error, None);
    }

    #[tokio::test]
    async fn ask_ai_sends_prompt_json() {
        let (base, server) = serve_once("400 Bad Request", r#"{"error":"No prompt provided"}"#).await;

        let reply = api(base).ask_ai("hỏi").await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /ask_ai "));
        assert!(request.contains(r#"{"prompt":"hỏi"}"#));
        assert_eq!(reply.error.as_deref(), Some("No prompt provided"));
    }

    #[tokio::test]
    async fn non_json_body_is_invalid() {
        let (base, server) = serve_once("502 Bad Gateway", "<html>bad gateway</html>").await;

        let result = api(base).chat("hi").await;
        server.await.unwrap();
        assert!(matches!(result, Err(ApiError::InvalidBody(_))));
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let result = api(base).ask_ai("x").await;
        assert!(matches!(result, Err(ApiError::Network(_))));
    }
}
