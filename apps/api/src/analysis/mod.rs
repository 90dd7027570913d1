//! Résumé analysis. Asks the completion API for a structured six-part review.
//!
//! All calls go through `llm_client`; this module owns the prompt and the
//! shape of the result.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::llm_client::{LlmClient, LlmError};

pub mod models;
pub mod prompts;

pub use models::{JobContext, ResumeAnalysis, SectionOrderCheck};

use prompts::{analysis_system, build_analysis_prompt};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Llm(LlmError),

    #[error("analysis response malformed: {0}")]
    Malformed(String),
}

impl From<LlmError> for AnalysisError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Parse(e) => AnalysisError::Malformed(format!("expected analysis JSON: {e}")),
            LlmError::EmptyContent => AnalysisError::Malformed("empty response".to_string()),
            other => AnalysisError::Llm(other),
        }
    }
}

/// The analysis backend. Carried in `AppState` as `Arc<dyn ResumeAnalyzer>`
/// so handlers don't depend on which service produces the review.
#[async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        resume_text: &str,
        job: &JobContext,
    ) -> Result<ResumeAnalysis, AnalysisError>;
}

/// Analyzer backed by the completion API.
pub struct LlmResumeAnalyzer(pub LlmClient);

#[async_trait]
impl ResumeAnalyzer for LlmResumeAnalyzer {
    async fn analyze(
        &self,
        resume_text: &str,
        job: &JobContext,
    ) -> Result<ResumeAnalysis, AnalysisError> {
        analyze_resume(&self.0, resume_text, job).await
    }
}

/// Builds the analysis prompt, makes one (retried-once) completion call and
/// parses the reply into a `ResumeAnalysis`.
pub async fn analyze_resume(
    llm: &LlmClient,
    resume_text: &str,
    job: &JobContext,
) -> Result<ResumeAnalysis, AnalysisError> {
    let prompt = build_analysis_prompt(resume_text, &job.title, &job.description);
    let analysis: ResumeAnalysis = llm.call_json(&prompt, &analysis_system()).await?;
    let analysis = analysis.normalized().map_err(AnalysisError::Malformed)?;

    info!(
        "Analysis complete: model={} ats_score={} issues={} suggestions={}",
        llm.model(),
        analysis.ats_score,
        analysis.issues.len(),
        analysis.suggestions.len()
    );

    Ok(analysis)
}
