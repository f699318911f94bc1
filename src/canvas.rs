//! `Canvas`: the façade composing the panel driver, pixel buffer, shape
//! layer, and text renderer into the single API most callers use.

use std::path::Path;

use crate::buffer::rotation::Rotation;
use crate::buffer::PixelBuffer;
use crate::color::Color;
use crate::driver::{
    constants::{Voltages, FRAME_BYTES_1BIT, LUT_LEN},
    DisplayDriver,
};
use crate::error::{EpdError, Result};
use crate::shapes::ShapeLayer;
use crate::text::{Align, TextRenderer};

const DEFAULT_GLYPH_CACHE_BYTES: usize = 4096;
const DEFAULT_ROTATION: Rotation = Rotation::Rotate90;
const DEFAULT_DEPTH: u8 = 1;

/// Composes a `DisplayDriver`, `PixelBuffer`, and `TextRenderer` behind one
/// drawing/refresh API. Default construction mirrors the panel's natural
/// landscape orientation (rotation 90°), 1-bit depth, and a 4 KiB glyph
/// cache.
pub struct Canvas<D> {
    driver: D,
    buffer: PixelBuffer,
    text: TextRenderer,
}

impl<D: DisplayDriver> Canvas<D> {
    /// Build a canvas over an already-constructed driver, at the default
    /// orientation/depth/cache size.
    pub fn new(driver: D) -> Result<Self> {
        Self::with_options(driver, DEFAULT_ROTATION, DEFAULT_DEPTH, DEFAULT_GLYPH_CACHE_BYTES)
    }

    /// Build a canvas with explicit rotation, depth, and glyph cache
    /// capacity.
    pub fn with_options(driver: D, rotation: Rotation, depth: u8, glyph_cache_bytes: usize) -> Result<Self> {
        let buffer = PixelBuffer::new(128, 296, depth, rotation)?;
        Ok(Self {
            driver,
            buffer,
            text: TextRenderer::new(glyph_cache_bytes),
        })
    }

    pub fn width(&self) -> usize {
        self.buffer.logical_w()
    }
    pub fn height(&self) -> usize {
        self.buffer.logical_h()
    }
    pub fn depth(&self) -> u8 {
        self.buffer.depth()
    }
    pub fn rotation(&self) -> Rotation {
        self.buffer.rotation()
    }
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.buffer.set_rotation(rotation);
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }
    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }
    pub fn driver(&self) -> &D {
        &self.driver
    }
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    // -- drawing delegates --------------------------------------------

    pub fn clear(&mut self, color: Color) {
        self.buffer.clear(color);
    }

    pub fn invert(&mut self) {
        self.buffer.invert();
    }

    pub fn pixel(&mut self, x: i64, y: i64, color: Color) {
        self.buffer.pixel(x, y, color);
    }

    pub fn line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
        self.buffer.line(x0, y0, x1, y1, color);
    }

    pub fn hline(&mut self, x: i64, y: i64, len: i64, color: Color) {
        self.buffer.hline(x, y, len, color);
    }

    pub fn vline(&mut self, x: i64, y: i64, len: i64, color: Color) {
        self.buffer.vline(x, y, len, color);
    }

    pub fn rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Color) {
        self.buffer.rect(x, y, w, h, color);
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Color) {
        self.buffer.fill_rect(x, y, w, h, color);
    }

    pub fn rounded_rect(&mut self, x: i64, y: i64, w: i64, h: i64, radius: i64, color: Color) {
        self.buffer.rounded_rect(x, y, w, h, radius, color);
    }

    pub fn circle(&mut self, cx: i64, cy: i64, r: i64, color: Color) {
        self.buffer.circle(cx, cy, r, color);
    }

    pub fn fill_circle(&mut self, cx: i64, cy: i64, r: i64, color: Color) {
        self.buffer.fill_circle(cx, cy, r, color);
    }

    pub fn triangle(&mut self, p0: (i64, i64), p1: (i64, i64), p2: (i64, i64), color: Color) {
        self.buffer.triangle(p0, p1, p2, color);
    }

    pub fn fill_triangle(&mut self, p0: (i64, i64), p1: (i64, i64), p2: (i64, i64), color: Color) {
        self.buffer.fill_triangle(p0, p1, p2, color);
    }

    pub fn blit(&mut self, bitmap: &[u8], x: i64, y: i64, w: usize, h: usize, color: Color) {
        self.buffer.blit(bitmap, x, y, w, h, color);
    }

    // -- text -----------------------------------------------------------

    pub fn load_font(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.text.load_font(path)
    }

    pub fn add_font(&mut self, path: impl AsRef<Path>, optional: bool) -> Result<bool> {
        self.text.add_font(path, optional)
    }

    pub fn text(&mut self, text: &str, x: i64, y: i64, color: Color, scale: u32, align: Align) -> Result<()> {
        self.text.draw(&mut self.buffer, text, x, y, color, scale, align)
    }

    pub fn measure_text(&self, text: &str, scale: u32) -> (u32, u32) {
        (self.text.measure_width(text, scale), self.text.measure_height(scale))
    }

    // -- display updates --------------------------------------------------

    /// Full refresh: 2-bit buffers go through `to_planes`/`display_gray`;
    /// 1-bit buffers go through `to_mono`/`display(full=true)`.
    pub fn full_refresh(&mut self) -> Result<f64> {
        if self.buffer.depth() == 2 {
            let (bw, red) = self.buffer.to_planes()?;
            self.driver.display_gray(&bw, &red)
        } else {
            let mono = self.buffer.to_mono();
            self.driver.display(&mono, true, false, false)
        }
    }

    /// Partial refresh, staying awake afterward (the common interactive
    /// path); identical depth dispatch to `full_refresh`.
    pub fn partial_refresh(&mut self) -> Result<f64> {
        if self.buffer.depth() == 2 {
            let (bw, red) = self.buffer.to_planes()?;
            self.driver.display_gray(&bw, &red)
        } else {
            let mono = self.buffer.to_mono();
            self.driver.display(&mono, false, false, true)
        }
    }

    /// Like `partial_refresh` but lets the caller force escalation to a
    /// full refresh; grayscale buffers have no separate force-full path.
    pub fn refresh(&mut self, force_full: bool) -> Result<f64> {
        if self.buffer.depth() == 2 {
            let (bw, red) = self.buffer.to_planes()?;
            self.driver.display_gray(&bw, &red)
        } else {
            let mono = self.buffer.to_mono();
            self.driver.display(&mono, false, force_full, true)
        }
    }

    /// Custom-waveform refresh via the driver's `display_lut`.
    pub fn custom_refresh(&mut self, lut: &[u8; LUT_LEN]) -> Result<f64> {
        let voltages = Voltages::default();
        if self.buffer.depth() == 2 {
            let (bw, red) = self.buffer.to_planes()?;
            self.driver.display_lut(lut, &bw, Some(&red), voltages)
        } else {
            let mono = self.buffer.to_mono();
            self.driver.display_lut(lut, &mono, None, voltages)
        }
    }

    /// Update a single logical rectangle. 1-bit only (Open Question 3).
    pub fn update_region(&mut self, x: usize, y: usize, w: usize, h: usize) -> Result<f64> {
        if self.buffer.depth() != 1 {
            return Err(EpdError::InvalidArgument {
                what: "update_region requires a 1-bit buffer",
            });
        }
        let (px, py, pw, ph) = self.buffer.transform_region(x, y, w, h);
        let bytes = self.buffer.get_region(px, py, pw, ph, true)?;
        self.driver.display_region(&bytes, px, py, pw, ph)
    }

    /// Batched `update_region`, one activation for all regions.
    pub fn update_regions(&mut self, regions: &[(usize, usize, usize, usize)]) -> Result<f64> {
        if self.buffer.depth() != 1 {
            return Err(EpdError::InvalidArgument {
                what: "update_regions requires a 1-bit buffer",
            });
        }
        let mut physical = Vec::with_capacity(regions.len());
        for &(x, y, w, h) in regions {
            let (px, py, pw, ph) = self.buffer.transform_region(x, y, w, h);
            let bytes = self.buffer.get_region(px, py, pw, ph, true)?;
            physical.push((bytes, px, py, pw, ph));
        }
        let updates: Vec<_> = physical
            .iter()
            .map(|(bytes, px, py, pw, ph)| crate::driver::RegionUpdate {
                data: bytes,
                x: *px,
                y: *py,
                w: *pw,
                h: *ph,
            })
            .collect();
        self.driver.display_regions(&updates)
    }

    /// Hardware-accelerated solid clear, followed by clearing the
    /// in-memory buffer to the same color so subsequent logical reads
    /// stay consistent with panel state.
    pub fn fast_clear(&mut self, color: Color) -> Result<()> {
        let byte = self.buffer.effective_color(color).byte_value(1);
        self.driver.fast_clear(byte)?;
        self.buffer.clear(color);
        Ok(())
    }

    pub fn sleep(&mut self) -> Result<()> {
        self.driver.sleep(true)
    }

    pub fn invert_display(&mut self, invert: bool) -> Result<()> {
        self.driver.set_invert(invert, invert)
    }

    pub fn read_temperature(&mut self) -> Result<f32> {
        self.driver.read_temperature()
    }

    pub fn check_temperature(&mut self) -> Result<(f32, bool)> {
        self.driver.check_temperature()
    }

    pub fn partial_count(&self) -> u32 {
        self.driver.partial_count()
    }

    pub fn set_partial_count(&mut self, value: u32) {
        self.driver.set_partial_count(value);
    }

    pub fn partial_threshold(&self) -> u32 {
        self.driver.partial_threshold()
    }

    pub fn set_partial_threshold(&mut self, value: u32) {
        self.driver.set_partial_threshold(value);
    }
}

const _: () = assert!(FRAME_BYTES_1BIT == 4736);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::driver::Ssd1680;

    fn canvas() -> Canvas<Ssd1680<MockTransport>> {
        let driver = Ssd1680::new(MockTransport::new(), true);
        Canvas::new(driver).unwrap()
    }

    #[test]
    fn default_orientation_is_landscape_90() {
        let c = canvas();
        assert_eq!(c.rotation(), Rotation::Rotate90);
        assert_eq!(c.depth(), 1);
    }

    #[test]
    fn full_refresh_then_no_full_refresh_needed() {
        let mut c = canvas();
        c.full_refresh().unwrap();
        assert!(!c.driver().state().needs_full_refresh());
        assert_eq!(c.partial_count(), 0);
    }

    #[test]
    fn update_region_on_2bit_buffer_is_rejected() {
        let driver = Ssd1680::new(MockTransport::new(), true);
        let mut c = Canvas::with_options(driver, Rotation::Rotate0, 2, 4096).unwrap();
        let err = c.update_region(0, 0, 32, 32).expect_err("2-bit buffers reject region updates");
        assert!(matches!(err, EpdError::InvalidArgument { .. }));
    }

    #[test]
    fn multi_region_update_emits_single_activation() {
        let mut c = Canvas::with_options(
            Ssd1680::new(MockTransport::new(), true),
            Rotation::Rotate0,
            1,
            4096,
        )
        .unwrap();
        c.full_refresh().unwrap();
        c.fill_rect(0, 0, 32, 32, Color::Black);
        c.fill_rect(48, 0, 32, 32, Color::Black);
        c.fill_rect(96, 0, 32, 32, Color::Black);
        c.update_regions(&[(0, 0, 32, 32), (48, 0, 32, 32), (96, 0, 32, 32)])
            .unwrap();
    }

    #[test]
    fn fast_clear_keeps_buffer_consistent_with_panel() {
        let mut c = canvas();
        c.fast_clear(Color::Black).unwrap();
        assert_eq!(c.buffer().get_pixel(0, 0), Some(Color::Black));
    }
}
