use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{config::CaptureConfig, error::ScreenshotError};

const UNKNOWN_ERROR: &str = "Unknown error";

/// Outcome of one capture attempt that reached the capture service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotResult {
    pub success: bool,
    pub screenshot_url: Option<String>,
    pub error: Option<String>,
}

impl ScreenshotResult {
    pub fn captured(url: String) -> Self {
        Self {
            success: true,
            screenshot_url: Some(url),
            error: None,
        }
    }

    pub fn failed(detail: Option<String>) -> Self {
        Self {
            success: false,
            screenshot_url: None,
            error: Some(detail.unwrap_or_else(|| UNKNOWN_ERROR.to_string())),
        }
    }
}

/// Scrape response. The screenshot may sit at the top level or under `data`
/// depending on the API version.
#[derive(Debug, Deserialize)]
struct ScrapeEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    screenshot: Option<String>,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    screenshot: Option<String>,
}

impl ScrapeEnvelope {
    fn into_result(self) -> ScreenshotResult {
        if !self.success {
            return ScreenshotResult::failed(self.error);
        }
        let screenshot = self
            .screenshot
            .or_else(|| self.data.and_then(|d| d.screenshot))
            .filter(|url| !url.trim().is_empty());
        match screenshot {
            Some(url) => ScreenshotResult::captured(url),
            None => ScreenshotResult::failed(self.error),
        }
    }
}

#[derive(Clone)]
pub struct ScreenshotFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ScreenshotFetcher {
    pub fn new(client: reqwest::Client, config: &CaptureConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Captures `url` once. A capture the service could not produce comes
    /// back as a failed `ScreenshotResult`; only transport problems are errors.
    pub async fn fetch(&self, url: &str) -> Result<ScreenshotResult, ScreenshotError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ScreenshotError::MissingUrl);
        }

        let response = self
            .client
            .post(format!("{}/v1/scrape", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "url": url,
                "formats": ["rawHtml", "screenshot"],
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let envelope: ScrapeEnvelope =
            serde_json::from_slice(&body).map_err(|err| ScreenshotError::InvalidResponse {
                status: status.as_u16(),
                detail: err.to_string(),
            })?;

        let result = envelope.into_result();
        match &result.screenshot_url {
            Some(shot) => info!(target_url = url, screenshot = shot.as_str(), "screenshot captured"),
            None => error!(
                target_url = url,
                status = status.as_u16(),
                detail = result.error.as_deref().unwrap_or(UNKNOWN_ERROR),
                "failed to get screenshot"
            ),
        }
        Ok(result)
    }
}
