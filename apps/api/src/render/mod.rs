// Output artifacts generated from the extracted résumé text.
// Both writers are CPU-bound; callers run them inside tokio::task::spawn_blocking.

use thiserror::Error;

pub mod font_metrics;
pub mod pdf;
pub mod skill_cloud;
pub mod word_freq;

pub use pdf::generate_pdf;
pub use skill_cloud::{load_font, SkillCloudRenderer, CLOUD_HEIGHT, CLOUD_WIDTH};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("PDF writer error: {0}")]
    Pdf(String),

    #[error("image encoder error: {0}")]
    Image(String),

    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("generation task aborted: {0}")]
    Aborted(String),
}
