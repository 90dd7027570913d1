//! Word-cloud ("skill cloud") image generator.
//!
//! Word size follows frequency in the résumé text. Placement is greedy: the
//! most frequent words go first, each at the free spot closest to the canvas
//! centre, found with a summed-area table over a coarse occupancy grid.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use rusttype::{point, Font, Scale};
use tracing::{info, warn};

use crate::render::word_freq::{word_frequencies, WordCount};
use crate::render::GenerationError;
use crate::storage::write_atomic;

pub const CLOUD_WIDTH: u32 = 800;
pub const CLOUD_HEIGHT: u32 = 400;

/// Occupancy grid resolution in pixels.
const CELL_PX: u32 = 4;
/// Gap kept around each word, in pixels.
const WORD_MARGIN_PX: f32 = 2.0;
const MIN_FONT_PX: f32 = 4.0;
/// Largest font as a fraction of canvas height.
const MAX_FONT_FRACTION: f32 = 0.4;
/// How strongly relative frequency drives font size (0 = rank only, 1 = linear).
const RELATIVE_SCALING: f32 = 0.5;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Dark end of the viridis ramp; the pale yellows are unreadable on white.
const PALETTE: [Rgb<u8>; 8] = [
    Rgb([68, 1, 84]),
    Rgb([72, 40, 120]),
    Rgb([62, 74, 137]),
    Rgb([49, 104, 142]),
    Rgb([38, 130, 142]),
    Rgb([31, 158, 137]),
    Rgb([53, 183, 121]),
    Rgb([94, 201, 98]),
];

const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads the configured font, or the first readable system font.
pub fn load_font(preferred: Option<&Path>) -> Option<Font<'static>> {
    let candidates = preferred
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONT_PATHS.iter().map(PathBuf::from));

    for path in candidates {
        if let Ok(data) = std::fs::read(&path) {
            if let Some(font) = Font::try_from_vec(data) {
                info!("Skill cloud font: {}", path.display());
                return Some(font);
            }
            warn!("Not a usable TrueType font: {}", path.display());
        }
    }

    warn!("No TrueType font found; skill clouds will use placeholder boxes");
    None
}

/// A word drawn on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub word: String,
    pub font_px: f32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Renders skill clouds at a fixed size. Cheap to clone; the font is shared.
#[derive(Clone)]
pub struct SkillCloudRenderer {
    width: u32,
    height: u32,
    font: Option<Arc<Font<'static>>>,
}

impl SkillCloudRenderer {
    pub fn new(width: u32, height: u32, font: Option<Font<'static>>) -> Self {
        Self {
            width,
            height,
            font: font.map(Arc::new),
        }
    }

    /// Pixel extent (width, height) of `word` at `font_px`.
    fn measure(&self, word: &str, font_px: f32) -> (f32, f32) {
        match &self.font {
            Some(font) => {
                let scale = Scale::uniform(font_px);
                let v = font.v_metrics(scale);
                let width = font
                    .layout(word, scale, point(0.0, 0.0))
                    .last()
                    .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
                    .unwrap_or(0.0);
                (width, v.ascent - v.descent)
            }
            None => (0.6 * font_px * word.chars().count() as f32, font_px),
        }
    }

    /// Chooses font sizes and positions for the most frequent words.
    pub fn layout(&self, words: &[WordCount]) -> Vec<PlacedWord> {
        let Some(max_count) = words.first().map(|w| w.count as f32) else {
            return Vec::new();
        };

        let mut grid = OccupancyGrid::new(self.width, self.height);
        let mut placed = Vec::new();
        let mut font_px = self.height as f32 * MAX_FONT_FRACTION;
        let mut last_freq = 1.0_f32;

        for (i, wc) in words.iter().enumerate() {
            let freq = wc.count as f32 / max_count;
            if i > 0 {
                font_px *= RELATIVE_SCALING * (freq / last_freq) + (1.0 - RELATIVE_SCALING);
            }

            let mut size = font_px;
            let spot = loop {
                if size < MIN_FONT_PX {
                    break None;
                }
                let (w, h) = self.measure(&wc.word, size);
                let box_w = (w + 2.0 * WORD_MARGIN_PX).ceil() as u32;
                let box_h = (h + 2.0 * WORD_MARGIN_PX).ceil() as u32;
                if let Some((x, y)) = grid.find_free(box_w, box_h) {
                    grid.occupy(x, y, box_w, box_h);
                    break Some((x, y, w, h));
                }
                size -= (size * 0.1).max(1.0);
            };

            // The canvas is full once a word no longer fits even at the minimum size.
            let Some((x, y, w, h)) = spot else {
                break;
            };

            font_px = size;
            last_freq = freq;
            placed.push(PlacedWord {
                word: wc.word.clone(),
                font_px: size,
                x: x + WORD_MARGIN_PX as u32,
                y: y + WORD_MARGIN_PX as u32,
                width: w.ceil() as u32,
                height: h.ceil() as u32,
            });
        }
        placed
    }

    /// Draws the cloud for `text` onto a white canvas.
    pub fn render(&self, text: &str) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, BACKGROUND);

        let words = word_frequencies(text);
        if words.is_empty() {
            warn!("Skill cloud: no countable words, writing blank canvas");
            return img;
        }

        let placed = self.layout(&words);
        for word in &placed {
            let color = color_for(&word.word);
            match &self.font {
                Some(font) => draw_glyphs(&mut img, font, word, color),
                None => draw_placeholder(&mut img, word, color),
            }
        }

        info!(
            "Skill cloud: {} distinct words, {} drawn",
            words.len(),
            placed.len()
        );
        img
    }

    /// Renders the cloud for `text` as a PNG named `filename` in `dir`.
    pub fn generate(&self, text: &str, dir: &Path, filename: &str) -> Result<PathBuf, GenerationError> {
        let img = self.render(text);

        let mut bytes: Vec<u8> = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| GenerationError::Image(e.to_string()))?;

        let path = write_atomic(dir, filename, &bytes)?;
        info!("generate_skill_cloud: wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

fn color_for(word: &str) -> Rgb<u8> {
    let hash = word
        .to_lowercase()
        .bytes()
        .fold(2166136261_u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
    PALETTE[hash as usize % PALETTE.len()]
}

fn draw_glyphs(img: &mut RgbImage, font: &Font<'static>, word: &PlacedWord, color: Rgb<u8>) {
    let scale = Scale::uniform(word.font_px);
    let v = font.v_metrics(scale);
    let origin = point(word.x as f32, word.y as f32 + v.ascent);
    let (width, height) = img.dimensions();

    for glyph in font.layout(&word.word, scale, origin) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = bb.min.x + gx as i32;
            let py = bb.min.y + gy as i32;
            if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                return;
            }
            let pixel = img.get_pixel_mut(px as u32, py as u32);
            *pixel = blend(*pixel, color, coverage);
        });
    }
}

fn draw_placeholder(img: &mut RgbImage, word: &PlacedWord, color: Rgb<u8>) {
    let (width, height) = img.dimensions();
    let inset = word.height / 6;
    let x_end = (word.x + word.width).min(width);
    let y_end = (word.y + word.height.saturating_sub(inset)).min(height);
    for y in (word.y + inset)..y_end {
        for x in word.x..x_end {
            img.put_pixel(x, y, color);
        }
    }
}

fn blend(under: Rgb<u8>, over: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let a = alpha.clamp(0.0, 1.0);
    let mix = |u: u8, o: u8| (u as f32 * (1.0 - a) + o as f32 * a).round() as u8;
    Rgb([
        mix(under[0], over[0]),
        mix(under[1], over[1]),
        mix(under[2], over[2]),
    ])
}

/// Coarse free/used map of the canvas. Cells are `CELL_PX` square.
struct OccupancyGrid {
    cols: usize,
    rows: usize,
    used: Vec<bool>,
}

impl OccupancyGrid {
    fn new(width: u32, height: u32) -> Self {
        let cols = (width / CELL_PX) as usize;
        let rows = (height / CELL_PX) as usize;
        Self {
            cols,
            rows,
            used: vec![false; cols * rows],
        }
    }

    fn cells(px: u32) -> usize {
        px.div_ceil(CELL_PX) as usize
    }

    /// Top-left pixel of the free `w`×`h` box nearest the centre, if any.
    fn find_free(&self, w: u32, h: u32) -> Option<(u32, u32)> {
        let (cw, ch) = (Self::cells(w), Self::cells(h));
        if cw == 0 || ch == 0 || cw > self.cols || ch > self.rows {
            return None;
        }

        // Summed-area table with a zero row/column in front.
        let stride = self.cols + 1;
        let mut sat = vec![0_u32; stride * (self.rows + 1)];
        for r in 0..self.rows {
            let mut row_sum = 0_u32;
            for c in 0..self.cols {
                row_sum += self.used[r * self.cols + c] as u32;
                sat[(r + 1) * stride + c + 1] = sat[r * stride + c + 1] + row_sum;
            }
        }

        let center = (self.cols as f32 / 2.0, self.rows as f32 / 2.0);
        let mut best: Option<(f32, usize, usize)> = None;
        for r in 0..=(self.rows - ch) {
            for c in 0..=(self.cols - cw) {
                let filled = sat[(r + ch) * stride + c + cw] + sat[r * stride + c]
                    - sat[r * stride + c + cw]
                    - sat[(r + ch) * stride + c];
                if filled != 0 {
                    continue;
                }
                let dx = c as f32 + cw as f32 / 2.0 - center.0;
                let dy = (r as f32 + ch as f32 / 2.0 - center.1) * 2.0;
                let dist = dx * dx + dy * dy;
                if best.map_or(true, |(d, _, _)| dist < d) {
                    best = Some((dist, r, c));
                }
            }
        }

        best.map(|(_, r, c)| (c as u32 * CELL_PX, r as u32 * CELL_PX))
    }

    fn occupy(&mut self, x: u32, y: u32, w: u32, h: u32) {
        let (c0, r0) = ((x / CELL_PX) as usize, (y / CELL_PX) as usize);
        let c1 = (c0 + Self::cells(w)).min(self.cols);
        let r1 = (r0 + Self::cells(h)).min(self.rows);
        for r in r0..r1 {
            for c in c0..c1 {
                self.used[r * self.cols + c] = true;
            }
        }
    }
}
