//! The in-memory pixel buffer: depth (1 or 2 bit), rotation, and the
//! bit-plane conversions the driver needs.

pub mod lut;
pub mod rotation;

use rotation::{Rotation, RotationProps};

use crate::color::Color;
use crate::error::{EpdError, Result};

#[cfg(feature = "graphics")]
use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Size},
    Pixel,
};

/// A rectangular pixel grid of 1 or 2 bits per pixel, stored physical
/// (un-rotated), row-major, MSB-first within a byte.
pub struct PixelBuffer {
    data: Vec<u8>,
    phys_w: usize,
    phys_h: usize,
    depth: u8,
    rotation: Rotation,
    rotation_props: RotationProps,
    inverted: bool,
}

impl PixelBuffer {
    /// Build a buffer of `phys_w x phys_h` physical pixels at `depth` bits
    /// per pixel (1 or 2) and the given starting rotation.
    pub fn new(phys_w: usize, phys_h: usize, depth: u8, rotation: Rotation) -> Result<Self> {
        if depth != 1 && depth != 2 {
            return Err(EpdError::InvalidArgument {
                what: "buffer depth must be 1 or 2",
            });
        }
        let stride = Self::stride_for(phys_w, depth);
        let data = vec![Color::White.byte_value(depth); stride * phys_h];
        Ok(Self {
            data,
            phys_w,
            phys_h,
            depth,
            rotation,
            rotation_props: rotation.props(),
            inverted: false,
        })
    }

    fn stride_for(phys_w: usize, depth: u8) -> usize {
        (phys_w * depth as usize).div_ceil(8)
    }

    /// Bytes per physical row.
    pub fn stride(&self) -> usize {
        Self::stride_for(self.phys_w, self.depth)
    }

    pub fn phys_w(&self) -> usize {
        self.phys_w
    }
    pub fn phys_h(&self) -> usize {
        self.phys_h
    }
    pub fn depth(&self) -> u8 {
        self.depth
    }
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Width as seen by logical (rotation-adjusted) callers.
    pub fn logical_w(&self) -> usize {
        self.rotation.logical_w(self.phys_w, self.phys_h)
    }

    /// Height as seen by logical (rotation-adjusted) callers.
    pub fn logical_h(&self) -> usize {
        self.rotation.logical_h(self.phys_w, self.phys_h)
    }

    /// Change rotation; this is the only place `rotation_props` is
    /// recomputed.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        self.rotation_props = rotation.props();
    }

    /// The color `color` resolves to once the buffer's inversion flag is
    /// taken into account.
    pub fn effective_color(&self, color: Color) -> Color {
        if self.inverted {
            color.complement(self.depth)
        } else {
            color
        }
    }

    /// Fill the whole buffer with `color` (honouring inversion).
    pub fn clear(&mut self, color: Color) {
        let byte = self.effective_color(color).byte_value(self.depth);
        self.data.fill(byte);
    }

    /// XOR every byte and toggle the inversion flag.
    pub fn invert(&mut self) {
        for b in &mut self.data {
            *b = !*b;
        }
        self.inverted = !self.inverted;
    }

    fn in_logical_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.logical_w() && (y as usize) < self.logical_h()
    }

    fn to_physical(&self, x: usize, y: usize) -> (usize, usize) {
        self.rotation_props.transform_point(x, y, self.phys_w, self.phys_h)
    }

    fn set_physical(&mut self, px: usize, py: usize, color: Color) {
        set_pixel_physical(&mut self.data, self.stride(), self.depth, px, py, color);
    }

    fn get_physical(&self, px: usize, py: usize) -> Color {
        get_pixel_physical(&self.data, self.stride(), self.depth, px, py)
    }

    /// Write one logical pixel; a no-op if out of bounds.
    pub fn pixel(&mut self, x: i64, y: i64, color: Color) {
        if !self.in_logical_bounds(x, y) {
            return;
        }
        let color = self.effective_color(color);
        let (px, py) = self.to_physical(x as usize, y as usize);
        self.set_physical(px, py, color);
    }

    /// Write one logical pixel without bounds checking. Caller must
    /// guarantee `(x, y)` is within logical bounds.
    pub fn pixel_unchecked(&mut self, x: usize, y: usize, color: Color) {
        let color = self.effective_color(color);
        let (px, py) = self.to_physical(x, y);
        self.set_physical(px, py, color);
    }

    /// Read one logical pixel, or `None` if out of bounds.
    pub fn get_pixel(&self, x: i64, y: i64) -> Option<Color> {
        if !self.in_logical_bounds(x, y) {
            return None;
        }
        let (px, py) = self.to_physical(x as usize, y as usize);
        Some(self.get_physical(px, py))
    }

    /// Draw a logical horizontal run of `len` pixels starting at `(x, y)`.
    /// Clips against logical bounds; if rotation leaves the run physically
    /// vertical, delegates there instead.
    pub fn hline(&mut self, x: i64, y: i64, len: i64, color: Color) {
        if len <= 0 || y < 0 || (y as usize) >= self.logical_h() {
            return;
        }
        let (x0, run) = clip_run(x, len, self.logical_w() as i64);
        if run <= 0 {
            return;
        }
        let color = self.effective_color(color);
        if self.rotation_props.swap_xy {
            // A logical hline becomes a physical vline.
            let (px, py) = self.to_physical(x0 as usize, y as usize);
            let dir_down = !self.rotation_props.flip_y;
            draw_physical_vline(
                &mut self.data,
                self.stride(),
                self.depth,
                px,
                py,
                run as usize,
                dir_down,
                color,
            );
        } else {
            let (px0, py) = self.to_physical(x0 as usize, y as usize);
            let px_start = if self.rotation_props.flip_x {
                px0 - (run as usize - 1)
            } else {
                px0
            };
            draw_physical_hline(
                &mut self.data,
                self.stride(),
                self.depth,
                px_start,
                py,
                run as usize,
                color,
            );
        }
    }

    /// Draw a logical vertical run of `len` pixels starting at `(x, y)`.
    pub fn vline(&mut self, x: i64, y: i64, len: i64, color: Color) {
        if len <= 0 || x < 0 || (x as usize) >= self.logical_w() {
            return;
        }
        let (y0, run) = clip_run(y, len, self.logical_h() as i64);
        if run <= 0 {
            return;
        }
        let color = self.effective_color(color);
        if self.rotation_props.swap_xy {
            let (px0, py) = self.to_physical(x as usize, y0 as usize);
            let px_start = if self.rotation_props.flip_x {
                px0 - (run as usize - 1)
            } else {
                px0
            };
            draw_physical_hline(
                &mut self.data,
                self.stride(),
                self.depth,
                px_start,
                py,
                run as usize,
                color,
            );
        } else {
            let (px, py) = self.to_physical(x as usize, y0 as usize);
            let dir_down = !self.rotation_props.flip_y;
            draw_physical_vline(
                &mut self.data,
                self.stride(),
                self.depth,
                px,
                py,
                run as usize,
                dir_down,
                color,
            );
        }
    }

    /// Map a logical rectangle to the physical rectangle the driver's
    /// region operations expect.
    pub fn transform_region(&self, x: usize, y: usize, w: usize, h: usize) -> (usize, usize, usize, usize) {
        self.rotation_props.transform_rect(x, y, w, h, self.phys_w, self.phys_h)
    }

    /// Extract a packed sub-rectangle. `physical` selects whether
    /// `(x, y, w, h)` are already physical coordinates or need the
    /// rotation transform applied first. 1-bit regions require `x` and
    /// `w` to be multiples of 8.
    pub fn get_region(&self, x: usize, y: usize, w: usize, h: usize, physical: bool) -> Result<Vec<u8>> {
        let (px, py, pw, ph) = if physical {
            (x, y, w, h)
        } else {
            self.transform_region(x, y, w, h)
        };
        if px + pw > self.phys_w || py + ph > self.phys_h {
            return Err(EpdError::InvalidArgument {
                what: "region exceeds physical buffer bounds",
            });
        }
        if self.depth == 1 {
            if px % 8 != 0 || pw % 8 != 0 {
                return Err(EpdError::InvalidArgument {
                    what: "1-bit region x and w must be multiples of 8",
                });
            }
            let row_bytes = pw / 8;
            let stride = self.stride();
            let mut out = Vec::with_capacity(row_bytes * ph);
            for row in 0..ph {
                let off = (py + row) * stride + px / 8;
                out.extend_from_slice(&self.data[off..off + row_bytes]);
            }
            Ok(out)
        } else {
            let row_bytes = pw.div_ceil(4);
            let mut out = vec![0u8; row_bytes * ph];
            for row in 0..ph {
                for col in 0..pw {
                    let color = self.get_physical(px + col, py + row);
                    set_pixel_physical(&mut out, row_bytes, 2, col, row, color);
                }
            }
            Ok(out)
        }
    }

    /// Convert to a packed 1-bit representation. Returns a copy of the raw
    /// bytes for a 1-bit buffer; for a 2-bit buffer, downconverts via
    /// `lut::lut_mono` with the `>= 2` threshold.
    pub fn to_mono(&self) -> Vec<u8> {
        if self.depth == 1 {
            return self.data.clone();
        }
        mono_from_2bit(&self.data)
    }

    /// Split a 2-bit buffer into BW-plane and RED-plane bytes via
    /// `lut::lut_black`/`lut::lut_red`.
    pub fn to_planes(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        if self.depth != 2 {
            return Err(EpdError::Unsupported {
                feature: "to_planes requires a 2-bit buffer",
            });
        }
        let mut bw = Vec::with_capacity(self.data.len() / 2);
        let mut red = Vec::with_capacity(self.data.len() / 2);
        for pair in self.data.chunks(2) {
            let hi = pair[0];
            let lo = if pair.len() > 1 { pair[1] } else { 0xFF };
            bw.push((lut::lut_black(hi) << 4) | lut::lut_black(lo));
            red.push((lut::lut_red(hi) << 4) | lut::lut_red(lo));
        }
        Ok((bw, red))
    }

    /// Acquire a handle bundling buffer geometry/rotation/color for a hot
    /// drawing loop, avoiding repeated method dispatch per pixel.
    pub fn get_blit_context(&mut self, color: Color) -> BlitContext<'_> {
        let color = self.effective_color(color);
        let stride = self.stride();
        BlitContext {
            data: &mut self.data,
            phys_w: self.phys_w,
            phys_h: self.phys_h,
            stride,
            depth: self.depth,
            rotation_props: self.rotation_props,
            logical_w: self.logical_w(),
            logical_h: self.logical_h(),
            color,
        }
    }
}

fn mono_from_2bit(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len().div_ceil(2));
    let mut chunks = data.chunks(2);
    while let Some(pair) = chunks.next() {
        let hi = pair[0];
        let lo = if pair.len() > 1 { pair[1] } else { 0xFF };
        out.push((lut::lut_mono(hi) << 4) | lut::lut_mono(lo));
    }
    out
}

fn clip_run(start: i64, len: i64, bound: i64) -> (i64, i64) {
    let end = start + len;
    let clipped_start = start.max(0);
    let clipped_end = end.min(bound);
    (clipped_start, clipped_end - clipped_start)
}

fn set_pixel_physical(data: &mut [u8], stride: usize, depth: u8, px: usize, py: usize, color: Color) {
    match depth {
        1 => {
            let idx = py * stride + px / 8;
            let mask = 0x80u8 >> (px % 8);
            if color.bit_value(1) == 1 {
                data[idx] |= mask;
            } else {
                data[idx] &= !mask;
            }
        }
        _ => {
            let idx = py * stride + px / 4;
            let shift = 6 - 2 * (px % 4);
            let mask = 0b11u8 << shift;
            data[idx] = (data[idx] & !mask) | (color.level() << shift);
        }
    }
}

fn get_pixel_physical(data: &[u8], stride: usize, depth: u8, px: usize, py: usize) -> Color {
    match depth {
        1 => {
            let idx = py * stride + px / 8;
            let mask = 0x80u8 >> (px % 8);
            Color::from(if data[idx] & mask != 0 { 1 } else { 0 })
        }
        _ => {
            let idx = py * stride + px / 4;
            let shift = 6 - 2 * (px % 4);
            Color::from((data[idx] >> shift) & 0b11)
        }
    }
}

/// Byte-optimised physical horizontal line for 1-bit buffers; pixel loop
/// for 2-bit (not the interesting case per spec's own scoping).
fn draw_physical_hline(data: &mut [u8], stride: usize, depth: u8, px: usize, py: usize, len: usize, color: Color) {
    if depth != 1 {
        for i in 0..len {
            set_pixel_physical(data, stride, depth, px + i, py, color);
        }
        return;
    }
    let set = color.bit_value(1) == 1;
    let row = &mut data[py * stride..py * stride + stride];
    let b0 = px / 8;
    let bit0 = px % 8;
    let last = px + len - 1;
    let b1 = last / 8;
    let bit1 = last % 8;

    if b0 == b1 {
        let mask = (0xFFu8 >> bit0) & (0xFFu8 << (7 - bit1));
        apply_mask(&mut row[b0], mask, set);
        return;
    }
    let first_mask = 0xFFu8 >> bit0;
    apply_mask(&mut row[b0], first_mask, set);
    let fill = if set { 0xFFu8 } else { 0x00u8 };
    row[b0 + 1..b1].fill(fill);
    let last_mask = 0xFFu8 << (7 - bit1);
    apply_mask(&mut row[b1], last_mask, set);
}

fn apply_mask(byte: &mut u8, mask: u8, set: bool) {
    if set {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

/// Physical vertical line, iterating rows with a single precomputed bit
/// mask for the 1-bit case.
fn draw_physical_vline(
    data: &mut [u8],
    stride: usize,
    depth: u8,
    px: usize,
    py: usize,
    len: usize,
    dir_down: bool,
    color: Color,
) {
    if depth != 1 {
        for i in 0..len {
            let row = if dir_down { py + i } else { py - i };
            set_pixel_physical(data, stride, depth, px, row, color);
        }
        return;
    }
    let set = color.bit_value(1) == 1;
    let byte_col = px / 8;
    let mask = 0x80u8 >> (px % 8);
    for i in 0..len {
        let row = if dir_down { py + i } else { py - i };
        apply_mask(&mut data[row * stride + byte_col], mask, set);
    }
}

/// Bundled geometry/rotation/color for hot-loop consumers (the shape and
/// text blitters), read directly instead of re-dispatching per pixel.
pub struct BlitContext<'a> {
    data: &'a mut [u8],
    phys_w: usize,
    phys_h: usize,
    stride: usize,
    depth: u8,
    rotation_props: RotationProps,
    logical_w: usize,
    logical_h: usize,
    color: Color,
}

impl<'a> BlitContext<'a> {
    pub fn logical_w(&self) -> usize {
        self.logical_w
    }
    pub fn logical_h(&self) -> usize {
        self.logical_h
    }

    /// Set one logical pixel, with bounds checking.
    pub fn set(&mut self, x: i64, y: i64) {
        if x < 0 || y < 0 || (x as usize) >= self.logical_w || (y as usize) >= self.logical_h {
            return;
        }
        let (px, py) = self
            .rotation_props
            .transform_point(x as usize, y as usize, self.phys_w, self.phys_h);
        set_pixel_physical(self.data, self.stride, self.depth, px, py, self.color);
    }

    /// Set one logical pixel without bounds checking.
    pub fn set_unchecked(&mut self, x: usize, y: usize) {
        let (px, py) = self.rotation_props.transform_point(x, y, self.phys_w, self.phys_h);
        set_pixel_physical(self.data, self.stride, self.depth, px, py, self.color);
    }
}

#[cfg(feature = "graphics")]
impl OriginDimensions for PixelBuffer {
    fn size(&self) -> Size {
        Size::new(self.logical_w() as u32, self.logical_h() as u32)
    }
}

#[cfg(feature = "graphics")]
impl DrawTarget for PixelBuffer {
    type Color = Color;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.pixel(point.x as i64, point.y as i64, color);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_sets_every_pixel_to_effective_color() {
        let mut buf = PixelBuffer::new(16, 8, 1, Rotation::Rotate0).unwrap();
        buf.clear(Color::Black);
        for y in 0..8i64 {
            for x in 0..16i64 {
                assert_eq!(buf.get_pixel(x, y), Some(Color::Black));
            }
        }
    }

    #[test]
    fn invert_twice_is_identity() {
        let mut buf = PixelBuffer::new(16, 8, 1, Rotation::Rotate0).unwrap();
        buf.clear(Color::Black);
        let before = buf.data.clone();
        buf.invert();
        buf.invert();
        assert_eq!(buf.data, before);
        assert!(!buf.is_inverted());
    }

    #[test]
    fn invert_complements_pixel_reads() {
        let mut buf = PixelBuffer::new(16, 8, 1, Rotation::Rotate0).unwrap();
        buf.clear(Color::Black);
        buf.invert();
        assert_eq!(buf.get_pixel(0, 0), Some(Color::White));
    }

    #[test]
    fn to_mono_on_1bit_buffer_is_raw_bytes() {
        let mut buf = PixelBuffer::new(16, 8, 1, Rotation::Rotate0).unwrap();
        buf.pixel(3, 2, Color::Black);
        assert_eq!(buf.to_mono(), buf.data);
    }

    #[test]
    fn to_mono_on_2bit_buffer_thresholds_at_light_gray() {
        let mut buf = PixelBuffer::new(8, 1, 2, Rotation::Rotate0).unwrap();
        buf.clear(Color::Black);
        buf.pixel_unchecked(0, 0, Color::LightGray);
        buf.pixel_unchecked(1, 0, Color::DarkGray);
        let mono = buf.to_mono();
        assert_eq!(mono[0] & 0x80, 0x80);
        assert_eq!(mono[0] & 0x40, 0x00);
    }

    #[test]
    fn to_planes_splits_high_and_low_bits() {
        let mut buf = PixelBuffer::new(8, 1, 2, Rotation::Rotate0).unwrap();
        buf.clear(Color::Black);
        buf.pixel_unchecked(0, 0, Color::DarkGray);
        buf.pixel_unchecked(1, 0, Color::LightGray);
        let (bw, red) = buf.to_planes().unwrap();
        assert_eq!(bw[0] & 0xC0, 0x40);
        assert_eq!(red[0] & 0xC0, 0x80);
    }

    #[test]
    fn hline_out_of_bounds_y_is_noop() {
        let mut buf = PixelBuffer::new(16, 8, 1, Rotation::Rotate0).unwrap();
        let before = buf.data.clone();
        buf.hline(0, -1, 8, Color::Black);
        buf.hline(0, 100, 8, Color::Black);
        assert_eq!(buf.data, before);
    }

    #[test]
    fn hline_spans_byte_boundary_correctly() {
        let mut buf = PixelBuffer::new(16, 1, 1, Rotation::Rotate0).unwrap();
        buf.hline(4, 0, 8, Color::Black);
        for x in 0..16i64 {
            let expect = if (4..12).contains(&x) { Color::Black } else { Color::White };
            assert_eq!(buf.get_pixel(x, 0), Some(expect));
        }
    }

    #[test]
    fn rotation_90_round_trips_blit_context_writes() {
        let mut buf = PixelBuffer::new(128, 296, 1, Rotation::Rotate90).unwrap();
        let mut ctx = buf.get_blit_context(Color::Black);
        ctx.set(0, 0);
        drop(ctx);
        assert_eq!(buf.get_pixel(0, 0), Some(Color::Black));
    }

    #[test]
    fn transform_region_keeps_byte_alignment_after_rotation() {
        let buf = PixelBuffer::new(128, 296, 1, Rotation::Rotate90).unwrap();
        let (px, py, pw, ph) = buf.transform_region(0, 0, 32, 32);
        assert_eq!(px % 8, 0);
        assert_eq!(pw % 8, 0);
        let _ = py;
        let _ = ph;
    }
}
