use napkins::{
    api::{self, AppState},
    config::AppConfig,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // -----------------------------
    // Logging
    // -----------------------------
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // -----------------------------
    // Config / shared state
    // -----------------------------
    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config)?;

    info!(
        model_base_url = config.model.base_url.as_str(),
        capture_base_url = config.capture.base_url.as_str(),
        coding_model = config.model.coding_model.as_str(),
        pipeline = ?config.pipeline,
        proxied = config.model.proxy_auth.is_some(),
        "configuration loaded"
    );

    let app = api::app(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(addr = config.bind_addr.as_str(), "HTTP listening");
    info!("POST /generate-code streams code, POST /screenshot captures a page");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
