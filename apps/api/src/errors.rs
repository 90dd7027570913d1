use askama::Template;
use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::extraction::{DocumentFormat, ExtractionError};
use crate::llm_client::LlmError;
use crate::render::GenerationError;
use crate::routes::views::ErrorPage;

/// Body returned for every missing download target.
pub const NOT_FOUND_BODY: &str = "File not found!";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Analysis service returned {status}: {message}")]
    AnalysisUpstream { status: u16, message: String },

    #[error("Analysis response malformed: {0}")]
    AnalysisMalformed(String),

    #[error("Analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Template error: {0}")]
    Render(#[from] askama::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Llm(LlmError::Api { status, message }) => {
                AppError::AnalysisUpstream { status, message }
            }
            AnalysisError::Llm(e @ (LlmError::Unavailable { .. } | LlmError::Client(_))) => {
                AppError::AnalysisUnavailable(e.to_string())
            }
            AnalysisError::Llm(e) => AppError::AnalysisMalformed(e.to_string()),
            AnalysisError::Malformed(msg) => AppError::AnalysisMalformed(msg),
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnsupportedFormat(msg) => {
                tracing::info!("Rejected upload: {msg}");
                (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "UNSUPPORTED_FORMAT",
                    format!("{msg}. Accepted formats: .{}", DocumentFormat::ACCEPTED.join(", .")),
                )
            }
            AppError::Extraction(e) => {
                tracing::warn!("Extraction error: {e}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "EXTRACTION_FAILED",
                    "Could not read text from the uploaded file".to_string(),
                )
            }
            AppError::AnalysisUpstream { status, message } => {
                tracing::error!("Analysis upstream error {status}: {message}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ANALYSIS_UPSTREAM_ERROR",
                    format!("The analysis service rejected the request ({status}): {message}"),
                )
            }
            AppError::AnalysisMalformed(msg) => {
                tracing::error!("Analysis malformed: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ANALYSIS_MALFORMED",
                    "The analysis service returned an unexpected response".to_string(),
                )
            }
            AppError::AnalysisUnavailable(msg) => {
                tracing::error!("Analysis unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "ANALYSIS_UNAVAILABLE",
                    "Analysis is unavailable right now, try again later".to_string(),
                )
            }
            AppError::Generation(e) => {
                tracing::error!("Generation error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "GENERATION_FAILED",
                    "Could not generate the output files".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Render(e) => {
                tracing::error!("Template error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::NotFound(target) = &self {
            tracing::debug!("Download target not found: {target}");
            return (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                NOT_FOUND_BODY,
            )
                .into_response();
        }

        let (status, code, message) = self.parts();
        let page = ErrorPage {
            status: status.as_u16(),
            code,
            message: &message,
        };

        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {e}");
                (status, format!("{code}: {message}")).into_response()
            }
        }
    }
}
