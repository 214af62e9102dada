use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info};

use crate::{
    api::{
        types::{MessageResponse, ModelsResponse, ScreenshotRequest, ScreenshotResponse},
        AppState,
    },
    error::ScreenshotError,
    generation::{GenerationRequest, DEFAULT_VISION_MODEL, VISION_MODELS},
};

const NO_URL: &str = "No URL provided";
const CAPTURE_FAILED: &str = "Failed to get screenshot";
const CAPTURE_ERROR: &str = "Error getting screenshot";
const GENERATION_ERROR: &str = "Error generating code";

type JsonError = (StatusCode, Json<MessageResponse>);

fn json_error(status: StatusCode, message: &'static str) -> JsonError {
    (status, Json(MessageResponse { message }))
}

pub async fn screenshot(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ScreenshotResponse>, JsonError> {
    let url = serde_json::from_slice::<ScreenshotRequest>(&body)
        .ok()
        .and_then(|request| request.url)
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, NO_URL))?;

    match state.screenshots.fetch(&url).await {
        Ok(result) => match result.screenshot_url {
            Some(screenshot_url) => Ok(Json(ScreenshotResponse { screenshot_url })),
            None => Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, CAPTURE_FAILED)),
        },
        Err(ScreenshotError::MissingUrl) => Err(json_error(StatusCode::BAD_REQUEST, NO_URL)),
        Err(err) => {
            error!(target_url = url.as_str(), error = %err, "screenshot request failed");
            Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, CAPTURE_ERROR))
        }
    }
}

pub async fn generate_code(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, (StatusCode, String)> {
    let request = GenerationRequest::from_slice(&body).map_err(|e| {
        info!(issues = e.issues.len(), "rejected generation request");
        (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    })?;

    let stream = state.generator.generate(&request).await.map_err(|e| {
        error!(model = request.model.as_str(), error = %e, "code generation failed");
        (StatusCode::INTERNAL_SERVER_ERROR, GENERATION_ERROR.to_string())
    })?;

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

pub async fn models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        default: DEFAULT_VISION_MODEL,
        models: VISION_MODELS,
    })
}
