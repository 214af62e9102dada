//! Client for the OpenAI-compatible chat completions API used for both the
//! image description call and the streamed code call.

pub mod types;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use tracing::{debug, warn};

use crate::{config::ModelProviderConfig, error::GenerationError};

pub use types::{ChatMessage, ChatRequest, ChatResponse, ContentPart, MessageContent, Role};

pub const DEFAULT_TEMPERATURE: f32 = 0.2;

const PROXY_AUTH_HEADER: &str = "helicone-auth";

#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    proxy_auth: Option<String>,
}

impl ChatClient {
    pub fn new(client: reqwest::Client, config: &ModelProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            proxy_auth: config.proxy_auth.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("model provider API key is not a valid header value"),
        }
        if let Some(proxy) = &self.proxy_auth {
            match HeaderValue::from_str(proxy) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(PROXY_AUTH_HEADER), value);
                }
                Err(_) => warn!("proxy auth is not a valid header value"),
            }
        }
        headers
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, GenerationError> {
        debug!(
            model = request.model.as_str(),
            stream = request.stream,
            messages = request.messages.len(),
            "chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .headers(self.headers())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream { status, body });
        }

        Ok(response)
    }

    /// Non-streaming completion; returns the parsed envelope.
    pub async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, GenerationError> {
        let request = ChatRequest {
            stream: false,
            ..request
        };
        let response = self.send(&request).await?;
        Ok(response.json().await?)
    }

    /// Streaming completion; the caller owns the live response body.
    pub async fn stream(&self, request: ChatRequest) -> Result<reqwest::Response, GenerationError> {
        self.send(&request.streaming()).await
    }
}
