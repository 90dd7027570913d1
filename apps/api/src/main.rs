mod analysis;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod render;
mod routes;
mod state;
mod storage;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::analysis::LlmResumeAnalyzer;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::render::{load_font, SkillCloudRenderer, CLOUD_HEIGHT, CLOUD_WIDTH};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={level},tower_http={level}",
                env!("CARGO_CRATE_NAME"),
                level = &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Résumé Advisor v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::from_config(&config).context("Failed to build LLM client")?;
    info!(
        "LLM client initialized (model: {}, timeout: {:?})",
        llm.model(),
        config.llm_timeout
    );

    // Skill-cloud font is loaded once and shared by every request
    let font = load_font(config.wordcloud_font.as_deref());
    let cloud = SkillCloudRenderer::new(CLOUD_WIDTH, CLOUD_HEIGHT, font);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    // Build app state
    let state = AppState::new(config, Arc::new(LlmResumeAnalyzer(llm)), cloud);
    state.store.ensure_dirs().with_context(|| {
        format!(
            "Failed to create {} / {}",
            state.store.upload_dir().display(),
            state.store.static_dir().display()
        )
    })?;

    // Build router
    let app = build_router(state).layer(TraceLayer::new_for_http());

    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
