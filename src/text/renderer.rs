//! Font stack, glyph resolution, layout, and blit-with-pre-clipping text
//! rendering over a `PixelBuffer`.

use std::path::Path;

use crate::buffer::PixelBuffer;
use crate::color::Color;
use crate::error::{EpdError, Result};

use super::bf2::Bf2Font;
use super::cache::{GlyphCache, GlyphCacheEntry};

/// Horizontal text alignment relative to the `(x, y)` draw origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Owns a stack of open fonts (first match wins) and one shared glyph
/// cache; delegates raster output to `PixelBuffer`.
pub struct TextRenderer {
    fonts: Vec<Bf2Font>,
    cache: GlyphCache,
}

impl TextRenderer {
    /// Build a renderer with an empty font stack and a cache sized to
    /// `cache_cap_bytes`.
    pub fn new(cache_cap_bytes: usize) -> Self {
        Self { fonts: Vec::new(), cache: GlyphCache::new(cache_cap_bytes) }
    }

    /// Replace the font stack with a single font.
    pub fn load_font(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let font = Bf2Font::open(path)?;
        self.fonts = vec![font];
        Ok(())
    }

    /// Append a font to the stack. If `optional`, a missing file is
    /// swallowed and `Ok(false)` is returned instead of propagating; a
    /// file that exists but fails to parse (bad magic, truncated index,
    /// ...) always propagates, `optional` or not, since that's font
    /// corruption rather than an absent optional asset.
    pub fn add_font(&mut self, path: impl AsRef<Path>, optional: bool) -> Result<bool> {
        match Bf2Font::open(path) {
            Ok(font) => {
                self.fonts.push(font);
                Ok(true)
            }
            Err(EpdError::Io(e)) if optional && e.kind() == std::io::ErrorKind::NotFound => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn font_index_for(&self, codepoint: u32) -> Option<usize> {
        self.fonts.iter().position(|f| f.contains(codepoint))
    }

    fn load_glyph(&mut self, font_idx: usize, codepoint: u32) -> Result<GlyphCacheEntry> {
        if let Some(entry) = self.cache.get(codepoint) {
            return Ok(entry.clone());
        }
        let font = &mut self.fonts[font_idx];
        let bitmap = font.read_glyph_bitmap(codepoint)?;
        let entry = GlyphCacheEntry {
            bitmap,
            advance_width: font.advance_width(codepoint).unwrap_or(font.default_width()),
            height: font.height(),
            bytes_per_row: font.bytes_per_row(),
        };
        self.cache.insert(codepoint, entry.clone());
        Ok(entry)
    }

    /// Sum of `(advance+1)*scale` per glyph, minus one trailing `scale` of
    /// spacing; glyphs missing from every font fall back to the primary
    /// font's `default_width`.
    pub fn measure_width(&self, text: &str, scale: u32) -> u32 {
        let Some(primary) = self.fonts.first() else { return 0 };
        let mut total = 0u32;
        for ch in text.chars() {
            let cp = ch as u32;
            let advance = self
                .font_index_for(cp)
                .and_then(|idx| self.fonts[idx].advance_width(cp))
                .unwrap_or(primary.default_width());
            total += (advance as u32 + 1) * scale;
        }
        total.saturating_sub(scale)
    }

    /// Primary font's `height * scale`.
    pub fn measure_height(&self, scale: u32) -> u32 {
        self.fonts.first().map_or(0, |f| f.height() as u32 * scale)
    }

    /// Force the cache to hold bitmaps for every codepoint in `chars`.
    pub fn preload_glyphs(&mut self, chars: &str) -> Result<()> {
        for ch in chars.chars() {
            let cp = ch as u32;
            if let Some(idx) = self.font_index_for(cp) {
                self.load_glyph(idx, cp)?;
            }
        }
        Ok(())
    }

    /// Render `text` at `(x, y)`, offsetting by alignment, one glyph at a
    /// time, pre-clipped against the buffer's logical bounds so the inner
    /// blit loop skips only at scaled edges.
    pub fn draw(
        &mut self,
        buf: &mut PixelBuffer,
        text: &str,
        x: i64,
        y: i64,
        color: Color,
        scale: u32,
        align: Align,
    ) -> Result<()> {
        if self.fonts.is_empty() {
            return Err(EpdError::BadFont {
                reason: "no font loaded".to_string(),
            });
        }
        let scale = scale.max(1);
        let total_w = self.measure_width(text, scale) as i64;
        let origin_x = match align {
            Align::Left => x,
            Align::Center => x - total_w / 2,
            Align::Right => x - total_w,
        };

        let mut cursor = origin_x;
        for ch in text.chars() {
            let cp = ch as u32;
            let Some(font_idx) = self.font_index_for(cp) else {
                cursor += (self.fonts[0].default_width() as i64 + 1) * scale as i64;
                continue;
            };
            let glyph = self.load_glyph(font_idx, cp)?;
            blit_glyph(buf, &glyph, cursor, y, scale, color);
            cursor += (glyph.advance_width as i64 + 1) * scale as i64;
        }
        Ok(())
    }
}

fn blit_glyph(buf: &mut PixelBuffer, glyph: &GlyphCacheEntry, x: i64, y: i64, scale: u32, color: Color) {
    let logical_w = buf.logical_w() as i64;
    let logical_h = buf.logical_h() as i64;
    let glyph_w = glyph.bytes_per_row as i64 * 8;
    let glyph_h = glyph.height as i64;
    let scale = scale as i64;

    let col_start = (-x).div_euclid(scale).clamp(0, glyph_w);
    let col_end = ((logical_w - x).div_euclid(scale) + 1).clamp(0, glyph_w);
    let row_start = (-y).div_euclid(scale).clamp(0, glyph_h);
    let row_end = ((logical_h - y).div_euclid(scale) + 1).clamp(0, glyph_h);
    if col_start >= col_end || row_start >= row_end {
        return;
    }

    let mut ctx = buf.get_blit_context(color);
    for row in row_start..row_end {
        let src_row = &glyph.bitmap[(row as usize) * glyph.bytes_per_row as usize..];
        for col in col_start..col_end {
            let byte = src_row[(col / 8) as usize];
            if byte & (0x80 >> (col % 8)) == 0 {
                continue;
            }
            for sy in 0..scale {
                for sx in 0..scale {
                    ctx.set(x + col * scale + sx, y + row * scale + sy);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::rotation::Rotation;
    use std::fs::File;
    use std::io::Write;

    fn write_test_font(path: &Path) {
        let mut f = File::create(path).unwrap();
        let header = [b'B', b'2', 1, 0, 8, 8, 1, 1, 8, 0, 0, 0];
        f.write_all(&header).unwrap();
        f.write_all(&[0x41, 0x00, 8, 0, 0, 0]).unwrap();
        f.write_all(&[0xFFu8; 8]).unwrap();
    }

    #[test]
    fn measure_width_sums_advances_minus_trailing_spacing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bf2");
        write_test_font(&path);
        let mut r = TextRenderer::new(4096);
        r.load_font(&path).unwrap();
        assert_eq!(r.measure_width("AA", 1), (8 + 1) * 2 - 1);
    }

    #[test]
    fn draw_writes_pixels_for_a_fully_set_glyph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bf2");
        write_test_font(&path);
        let mut r = TextRenderer::new(4096);
        r.load_font(&path).unwrap();
        let mut buf = PixelBuffer::new(32, 32, 1, Rotation::Rotate0).unwrap();
        r.draw(&mut buf, "A", 0, 0, Color::Black, 1, Align::Left).unwrap();
        assert_eq!(buf.get_pixel(0, 0), Some(Color::Black));
    }

    #[test]
    fn add_font_optional_swallows_missing_file() {
        let mut r = TextRenderer::new(4096);
        let ok = r.add_font("/nonexistent/path.bf2", true).unwrap();
        assert!(!ok);
    }

    #[test]
    fn add_font_non_optional_propagates_error() {
        let mut r = TextRenderer::new(4096);
        assert!(r.add_font("/nonexistent/path.bf2", false).is_err());
    }

    #[test]
    fn add_font_optional_still_propagates_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bf2");
        std::fs::write(&path, b"NOTAFONT1234").unwrap();
        let mut r = TextRenderer::new(4096);
        let err = r.add_font(&path, true).unwrap_err();
        assert!(matches!(err, EpdError::BadFont { .. }));
    }
}
