//! Plain-text PDF writer for the regenerated résumé.
//!
//! Classic multi-cell layout: A4, Helvetica 12pt, one 10 mm cell per printed
//! line, automatic page breaks. No styling or structure is carried over from
//! the uploaded document.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, Mm, PdfDocument};
use tracing::info;

use crate::render::font_metrics::{HELVETICA, MM_PER_PT};
use crate::render::GenerationError;
use crate::storage::write_atomic;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
/// Distance from the bottom edge that triggers a new page.
const BREAK_MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 10.0;
/// Horizontal padding inside each cell.
const CELL_PADDING_MM: f32 = 1.0;
const FONT_SIZE_PT: f32 = 12.0;

/// One printed line with its page index and baseline (mm from the bottom edge).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub page: usize,
    pub baseline_mm: f32,
    pub text: String,
}

/// Wraps and paginates `text`. Each input line becomes one or more cells;
/// blank input lines keep their vertical space.
pub fn layout_lines(text: &str) -> Vec<PlacedLine> {
    let usable_width = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - 2.0 * CELL_PADDING_MM;
    // Text sits vertically centred in its cell.
    let baseline_offset = LINE_HEIGHT_MM / 2.0 + 0.3 * FONT_SIZE_PT * MM_PER_PT;

    let mut placed = Vec::new();
    let mut page = 0;
    let mut cursor_top = MARGIN_MM;

    for source_line in text.lines() {
        let safe = to_pdf_safe(source_line);
        for printed in HELVETICA.wrap(&safe, FONT_SIZE_PT, usable_width) {
            if cursor_top + LINE_HEIGHT_MM > PAGE_HEIGHT_MM - BREAK_MARGIN_MM {
                page += 1;
                cursor_top = MARGIN_MM;
            }
            placed.push(PlacedLine {
                page,
                baseline_mm: PAGE_HEIGHT_MM - (cursor_top + baseline_offset),
                text: printed,
            });
            cursor_top += LINE_HEIGHT_MM;
        }
    }
    placed
}

/// Renders `text` to PDF bytes.
pub fn write_pdf(text: &str) -> Result<Vec<u8>, GenerationError> {
    let placed = layout_lines(text);

    let (doc, first_page, first_layer) = PdfDocument::new(
        "Improved Resume",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| GenerationError::Pdf(format!("{e:?}")))?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut current_page = 0;

    for line in &placed {
        while current_page < line.page {
            current_page += 1;
            let (page, page_layer) = doc.add_page(
                Mm(PAGE_WIDTH_MM),
                Mm(PAGE_HEIGHT_MM),
                format!("Page {}", current_page + 1),
            );
            layer = doc.get_page(page).get_layer(page_layer);
        }
        if line.text.is_empty() {
            continue;
        }
        layer.use_text(
            line.text.as_str(),
            FONT_SIZE_PT,
            Mm(MARGIN_MM + CELL_PADDING_MM),
            Mm(line.baseline_mm),
            &font,
        );
    }

    let mut buf: Vec<u8> = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buf);
        doc.save(&mut writer)
            .map_err(|e| GenerationError::Pdf(format!("{e:?}")))?;
        writer.flush()?;
    }
    Ok(buf)
}

/// Writes `text` as a PDF named `filename` inside `dir` and returns its path.
pub fn generate_pdf(text: &str, dir: &Path, filename: &str) -> Result<PathBuf, GenerationError> {
    let bytes = write_pdf(text)?;
    let path = write_atomic(dir, filename, &bytes)?;
    info!("generate_pdf: wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Maps text onto what the built-in (non-Unicode) font can show: printable
/// ASCII, with common typographic characters folded to look-alikes.
fn to_pdf_safe(line: &str) -> String {
    line.chars()
        .filter_map(|c| match c {
            ' '..='~' => Some(c),
            '\t' | '\u{a0}' | '\u{2002}'..='\u{200a}' => Some(' '),
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{2032}' => Some('\''),
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{2033}' => Some('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => Some('-'),
            '\u{2022}' | '\u{25cf}' | '\u{25aa}' | '\u{2023}' | '\u{00b7}' => Some('-'),
            '\u{2026}' => Some('.'),
            '\r' | '\u{200b}' | '\u{feff}' => None,
            c if c.is_control() => None,
            _ => Some('?'),
        })
        .collect()
}
