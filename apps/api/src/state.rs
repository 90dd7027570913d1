use std::sync::Arc;

use crate::analysis::ResumeAnalyzer;
use crate::config::Config;
use crate::render::SkillCloudRenderer;
use crate::storage::ArtifactStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything in here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Pluggable analysis backend. Default: LlmResumeAnalyzer.
    pub analyzer: Arc<dyn ResumeAnalyzer>,
    pub store: ArtifactStore,
    /// Skill-cloud renderer with its font loaded once at startup.
    pub cloud: SkillCloudRenderer,
}

impl AppState {
    pub fn new(
        config: Config,
        analyzer: Arc<dyn ResumeAnalyzer>,
        cloud: SkillCloudRenderer,
    ) -> Self {
        let store = ArtifactStore::new(config.upload_dir.clone(), config.static_dir.clone());
        Self {
            config: Arc::new(config),
            analyzer,
            store,
            cloud,
        }
    }
}
