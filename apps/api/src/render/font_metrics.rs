//! Static font-metric table for the PDF base-14 Helvetica face.
//!
//! Character widths are in em units (relative to font size), taken from the
//! Adobe core-font AFM. They drive the greedy line wrapping in `render::pdf`.
//! The table covers ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

/// Millimetres per PostScript point.
pub const MM_PER_PT: f32 = 25.4 / 72.0;

/// Static character-width table for a font.
///
/// `widths[i]` = width of ASCII character `(i + 32)` at 1em, covering 0x20 (space) through 0x7E (~).
pub struct FontMetricTable {
    widths: [f32; 95],
    /// Fallback width for characters outside the table.
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Measures the rendered width of a string in em units.
    ///
    /// Non-ASCII characters fall back to `average_char_width`.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum()
    }

    /// Width of `s` in millimetres at `font_size_pt`.
    pub fn measure_mm(&self, s: &str, font_size_pt: f32) -> f32 {
        self.measure_str(s) * font_size_pt * MM_PER_PT
    }

    /// Greedy word-wrap of one logical line into printed lines no wider than `max_width_mm`.
    ///
    /// Runs of whitespace collapse to single spaces. A word wider than the line is
    /// split between characters. An empty or blank input yields one empty line so
    /// the caller still advances the cursor.
    pub fn wrap(&self, line: &str, font_size_pt: f32, max_width_mm: f32) -> Vec<String> {
        let max_em = max_width_mm / (font_size_pt * MM_PER_PT);
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut current_width = 0.0_f32;

        for word in line.split_whitespace() {
            let word_w = self.measure_str(word);
            let space_w = if current.is_empty() { 0.0 } else { self.space_width };

            if current_width + space_w + word_w <= max_em {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_width += space_w + word_w;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }

            if word_w <= max_em {
                current.push_str(word);
                current_width = word_w;
            } else {
                for c in word.chars() {
                    let char_w = self.measure_str(c.encode_utf8(&mut [0; 4]));
                    if !current.is_empty() && current_width + char_w > max_em {
                        lines.push(std::mem::take(&mut current));
                        current_width = 0.0;
                    }
                    current.push(c);
                    current_width += char_w;
                }
            }
        }

        if !current.is_empty() || lines.is_empty() {
            lines.push(current);
        }
        lines
    }
}

/// Helvetica, the built-in sans-serif used for generated PDFs.
pub static HELVETICA: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp     !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.191, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.278, 0.278, 0.278, 0.469, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
        // {      |      }      ~
        0.334, 0.260, 0.334, 0.584,
    ],
    average_char_width: 0.556,
    space_width: 0.278,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_str_empty_returns_zero() {
        assert_eq!(HELVETICA.measure_str(""), 0.0);
    }

    #[test]
    fn test_measure_str_ascii_characters() {
        // "Rust" = R(0.722) + u(0.556) + s(0.500) + t(0.278) = 2.056
        let width = HELVETICA.measure_str("Rust");
        assert!((width - 2.056).abs() < 1e-3, "Rust width should be ~2.056, got {width}");
    }

    #[test]
    fn test_measure_str_non_ascii_falls_back() {
        let width = HELVETICA.measure_str("é");
        assert!((width - HELVETICA.average_char_width).abs() < 1e-4);
    }

    #[test]
    fn test_measure_mm_scales_with_font_size() {
        let small = HELVETICA.measure_mm("Engineer", 10.0);
        let large = HELVETICA.measure_mm("Engineer", 20.0);
        assert!((large - 2.0 * small).abs() < 1e-3);
    }

    #[test]
    fn test_wrap_short_line_is_single_line() {
        let lines = HELVETICA.wrap("Backend Engineer", 12.0, 188.0);
        assert_eq!(lines, vec!["Backend Engineer"]);
    }

    #[test]
    fn test_wrap_blank_line_yields_one_empty_line() {
        assert_eq!(HELVETICA.wrap("", 12.0, 188.0), vec![String::new()]);
        assert_eq!(HELVETICA.wrap("   \t", 12.0, 188.0), vec![String::new()]);
    }

    #[test]
    fn test_wrap_long_line_respects_width() {
        let text = "Architected a distributed caching layer using Redis and consistent hashing, \
                    reducing p99 latency by 40% under 50k RPS peak load across three regions";
        let lines = HELVETICA.wrap(text, 12.0, 100.0);
        assert!(lines.len() >= 2, "expected wrapping, got {lines:?}");
        for line in &lines {
            assert!(HELVETICA.measure_mm(line, 12.0) <= 100.0 + 1e-3, "{line:?} too wide");
        }
        assert_eq!(lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_wrap_splits_overlong_word() {
        let word = "x".repeat(120);
        let lines = HELVETICA.wrap(&word, 12.0, 50.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
        for line in &lines {
            assert!(HELVETICA.measure_mm(line, 12.0) <= 50.0 + 1e-3);
        }
    }
}
