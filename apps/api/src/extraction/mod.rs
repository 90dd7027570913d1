//! Text extraction from uploaded résumés.
//!
//! Dispatches on the file extension. PDF and DOCX parsing is CPU-bound and runs
//! on the blocking pool via `spawn_blocking` so it doesn't stall the runtime.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

pub mod format;

pub use format::DocumentFormat;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to extract PDF text: {0}")]
    Pdf(String),

    #[error("failed to read DOCX: {0}")]
    Docx(String),

    #[error("extraction task aborted: {0}")]
    Aborted(String),
}

/// Extracts plain text from the file at `path`.
///
/// PDF pages and DOCX paragraphs are joined with `\n`. Files whose extension is
/// not a supported format yield an empty string.
pub async fn extract_text(path: &Path) -> Result<String, ExtractionError> {
    let Some(format) = DocumentFormat::from_path(path) else {
        debug!("extract_text: unsupported extension for {}", path.display());
        return Ok(String::new());
    };

    let owned = path.to_path_buf();
    let span = tracing::Span::current();
    let handle =
        tokio::task::spawn_blocking(move || span.in_scope(|| extract_text_sync(&owned, format)));

    // pdf-extract panics on some malformed files; a panicking task surfaces as a JoinError.
    let text = handle
        .await
        .map_err(|e| ExtractionError::Aborted(e.to_string()))??;

    info!(
        "extract_text: {} ({:?}) -> {} chars",
        path.display(),
        format,
        text.len()
    );
    Ok(text)
}

/// Synchronous extraction for a known format.
pub fn extract_text_sync(path: &Path, format: DocumentFormat) -> Result<String, ExtractionError> {
    let bytes = std::fs::read(path)?;
    match format {
        DocumentFormat::Pdf => extract_pdf(&bytes),
        DocumentFormat::Docx => extract_docx(&bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    // A page with no extractable text contributes an empty line rather than failing.
    let text = pages
        .iter()
        .map(|page| page.trim_matches(|c| c == '\n' || c == '\r'))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(text)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let mut lines = Vec::new();
    for child in doc.document.children.iter() {
        collect_docx_lines(child, &mut lines);
    }
    Ok(lines.join("\n"))
}

fn collect_docx_lines(child: &docx_rs::DocumentChild, lines: &mut Vec<String>) {
    match child {
        docx_rs::DocumentChild::Paragraph(p) => lines.push(paragraph_text(p)),
        docx_rs::DocumentChild::Table(table) => {
            for row in &table.rows {
                let docx_rs::TableChild::TableRow(tr) = row;
                for cell in &tr.cells {
                    let docx_rs::TableRowChild::TableCell(tc) = cell;
                    for tc_child in &tc.children {
                        if let docx_rs::TableCellContent::Paragraph(p) = tc_child {
                            lines.push(paragraph_text(p));
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

fn paragraph_text(p: &docx_rs::Paragraph) -> String {
    let mut out = String::new();
    push_paragraph_children(&p.children, &mut out);
    out
}

/// Runs may sit directly in the paragraph, inside hyperlinks, or inside tracked insertions.
fn push_paragraph_children(children: &[docx_rs::ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run_text(run, out),
            docx_rs::ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, out),
            docx_rs::ParagraphChild::Insert(insert) => {
                for ic in &insert.children {
                    if let docx_rs::InsertChild::Run(run) = ic {
                        push_run_text(run, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run_text(run: &docx_rs::Run, out: &mut String) {
    for rc in &run.children {
        match rc {
            docx_rs::RunChild::Text(t) => out.push_str(&t.text),
            docx_rs::RunChild::Tab(_) => out.push('\t'),
            _ => {}
        }
    }
}
