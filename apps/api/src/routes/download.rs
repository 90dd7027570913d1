use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::errors::AppError;
use crate::extraction::DocumentFormat;
use crate::state::AppState;

/// GET /download/:filename
/// Serves a file from the upload directory as an attachment.
pub async fn handle_download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let path = state
        .store
        .resolve_download(&filename)
        .await
        .ok_or_else(|| AppError::NotFound(filename.clone()))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(filename));
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to read download").into()),
    };
    info!("Serving {} ({} bytes)", filename, bytes.len());

    let headers = [
        (header::CONTENT_TYPE, content_type_for(&filename).to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

fn content_type_for(filename: &str) -> &'static str {
    if let Some(format) = DocumentFormat::from_filename(filename) {
        return format.content_type();
    }
    match filename.rsplit_once('.') {
        Some((_, ext)) if ext.eq_ignore_ascii_case("png") => "image/png",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_follows_extension() {
        assert_eq!(content_type_for("improved_resume-1.pdf"), "application/pdf");
        assert_eq!(content_type_for("cloud.PNG"), "image/png");
        assert!(content_type_for("cv.docx").contains("wordprocessingml"));
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }
}
