use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    config::AppConfig, generation::Generator, llm::ChatClient, screenshot::ScreenshotFetcher,
};

pub mod handlers;
pub mod types;


#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<Generator>,
    pub screenshots: Arc<ScreenshotFetcher>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = config.http_client()?;
        let chat = ChatClient::new(client.clone(), &config.model);
        Ok(Self {
            generator: Arc::new(Generator::new(
                chat,
                config.model.coding_model.clone(),
                config.pipeline,
            )),
            screenshots: Arc::new(ScreenshotFetcher::new(client, &config.capture)),
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/screenshot", post(handlers::screenshot))
        .route("/generate-code", post(handlers::generate_code))
        .route("/models", get(handlers::models))
        // Paths the Next.js frontend calls
        .route("/api/firecrawl", post(handlers::screenshot))
        .route("/api/generateCode", post(handlers::generate_code))
}

/// Full application: routes, CORS for the browser frontend, shared state.
pub fn app(state: AppState) -> Router {
    router()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}
