pub mod download;
pub mod health;
pub mod resume;
pub mod views;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::services::ServeDir;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let static_dir = state.store.static_dir().to_path_buf();
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(resume::handle_form).post(resume::handle_submit))
        .route("/download/:filename", get(download::handle_download))
        .route("/health", get(health::health_handler))
        .nest_service("/static/resumes", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
