//! Askama page templates. Files live in `templates/` next to Cargo.toml.

use askama::Template;

use crate::analysis::ResumeAnalysis;

/// GET /: the upload form.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    /// Human-readable upload limit, e.g. "10 MB".
    pub max_upload: String,
}

/// POST /: analysis plus links to the generated artifacts.
#[derive(Template)]
#[template(path = "result.html")]
pub struct ResultPage<'a> {
    pub original_filename: &'a str,
    pub job_title: &'a str,
    pub analysis: &'a ResumeAnalysis,
    pub pdf_url: String,
    pub cloud_url: String,
    pub request_id: String,
    pub generated_at: String,
    pub text_was_empty: bool,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage<'a> {
    pub status: u16,
    pub code: &'a str,
    pub message: &'a str,
}
