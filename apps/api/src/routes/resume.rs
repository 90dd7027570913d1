use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use axum::{
    extract::{Multipart, State},
    response::{Html, IntoResponse, Response},
};
use bytes::Bytes;
use tracing::{info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::analysis::JobContext;
use crate::errors::AppError;
use crate::extraction::{extract_text, DocumentFormat};
use crate::render::{generate_pdf, GenerationError};
use crate::routes::views::{IndexPage, ResultPage};
use crate::state::AppState;
use crate::storage::ArtifactNames;

/// The three fields of the upload form.
struct Submission {
    filename: String,
    bytes: Bytes,
    job: JobContext,
}

/// GET /
pub async fn handle_form(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let page = IndexPage {
        max_upload: display_size(state.config.max_upload_bytes),
    };
    Ok(Html(page.render()?))
}

/// Upload limit for the form hint, rounded up to whole MB (or KB below 1 MB).
fn display_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;
    if bytes >= MB {
        format!("{} MB", bytes.div_ceil(MB))
    } else {
        format!("{} KB", bytes.div_ceil(KB))
    }
}

/// POST /
/// Save upload → extract → analyse → PDF + skill cloud → result page.
pub async fn handle_submit(State(state): State<AppState>, multipart: Multipart) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("analyze", %request_id);
    // Errors become responses inside the span so their log lines keep the request id.
    async move { submit(state, multipart, request_id).await.into_response() }
        .instrument(span)
        .await
}

async fn submit(
    state: AppState,
    multipart: Multipart,
    request_id: Uuid,
) -> Result<Html<String>, AppError> {
    let submission = read_submission(multipart).await?;

    // Reject before anything touches disk.
    let format = DocumentFormat::from_filename(&submission.filename).ok_or_else(|| {
        AppError::UnsupportedFormat(format!(
            "'{}' is not a supported résumé file",
            submission.filename
        ))
    })?;

    info!(
        "Received {} ({} bytes) for job '{}'",
        submission.filename,
        submission.bytes.len(),
        submission.job.title
    );

    let upload_path = state
        .store
        .save_upload(request_id, format, &submission.bytes)
        .await
        .context("Failed to save upload")?;

    let text = extract_text(&upload_path).await?;
    let text_was_empty = text.trim().is_empty();
    if text_was_empty {
        warn!("No text extracted from {}", upload_path.display());
    }

    let analysis = state.analyzer.analyze(&text, &submission.job).await?;

    let names = ArtifactNames::for_request(request_id);
    let text: Arc<str> = Arc::from(text);

    let pdf_job = {
        let text = Arc::clone(&text);
        let dir = state.store.upload_dir().to_path_buf();
        let name = names.pdf.clone();
        move || generate_pdf(&text, &dir, &name)
    };
    let cloud_job = {
        let text = Arc::clone(&text);
        let dir = state.store.static_dir().to_path_buf();
        let name = names.cloud.clone();
        let cloud = state.cloud.clone();
        move || cloud.generate(&text, &dir, &name)
    };
    let (pdf_path, cloud_path) = tokio::try_join!(run_blocking(pdf_job), run_blocking(cloud_job))?;
    info!(
        "Generated {} and {}",
        pdf_path.display(),
        cloud_path.display()
    );

    let page = ResultPage {
        original_filename: &submission.filename,
        job_title: &submission.job.title,
        analysis: &analysis,
        pdf_url: format!("/download/{}", names.pdf),
        cloud_url: format!("/static/resumes/{}", names.cloud),
        request_id: request_id.to_string(),
        generated_at: chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        text_was_empty,
    };
    Ok(Html(page.render()?))
}

async fn run_blocking<T, F>(job: F) -> Result<T, GenerationError>
where
    F: FnOnce() -> Result<T, GenerationError> + Send + 'static,
    T: Send + 'static,
{
    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(job))
        .await
        .map_err(|e| GenerationError::Aborted(e.to_string()))?
}

/// Reads `resume`, `job_title` and `job_desc` in whatever order they arrive.
/// Unknown fields are skipped.
async fn read_submission(mut multipart: Multipart) -> Result<Submission, AppError> {
    let mut resume: Option<(String, Bytes)> = None;
    let mut job_title: Option<String> = None;
    let mut job_desc: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read 'resume': {e}")))?;
                resume = Some((filename, data));
            }
            "job_title" | "job_desc" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read '{name}': {e}")))?;
                if name == "job_title" {
                    job_title = Some(value);
                } else {
                    job_desc = Some(value);
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) = match resume {
        Some((filename, bytes)) if !filename.trim().is_empty() => (filename, bytes),
        _ => return Err(AppError::Validation("No résumé file was uploaded ('resume')".into())),
    };

    Ok(Submission {
        filename,
        bytes,
        job: JobContext {
            title: required_text("job_title", job_title)?,
            description: required_text("job_desc", job_desc)?,
        },
    })
}

fn required_text(field: &str, value: Option<String>) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AppError::Validation(format!("Missing form field '{field}'"))),
    }
}
