use serde::{Deserialize, Serialize};

use crate::generation::VisionModel;

#[derive(Debug, Deserialize)]
pub struct ScreenshotRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotResponse {
    pub screenshot_url: String,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub default: &'static str,
    pub models: &'static [VisionModel],
}
