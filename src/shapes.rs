//! Clipping-aware drawing primitives over a `PixelBuffer`.

use crate::buffer::PixelBuffer;
use crate::color::Color;

const INSIDE: u8 = 0;
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const BOTTOM: u8 = 4;
const TOP: u8 = 8;

fn out_code(x: i64, y: i64, w: i64, h: i64) -> u8 {
    let mut code = INSIDE;
    if x < 0 {
        code |= LEFT;
    } else if x > w - 1 {
        code |= RIGHT;
    }
    if y < 0 {
        code |= TOP;
    } else if y > h - 1 {
        code |= BOTTOM;
    }
    code
}

/// Cohen-Sutherland clip of `(x0,y0)-(x1,y1)` against `[0,w-1] x [0,h-1]`.
/// Returns `None` if the segment lies entirely outside.
fn clip_line(mut x0: i64, mut y0: i64, mut x1: i64, mut y1: i64, w: i64, h: i64) -> Option<(i64, i64, i64, i64)> {
    let mut code0 = out_code(x0, y0, w, h);
    let mut code1 = out_code(x1, y1, w, h);
    loop {
        if code0 == INSIDE && code1 == INSIDE {
            return Some((x0, y0, x1, y1));
        }
        if code0 & code1 != 0 {
            return None;
        }
        let out = if code0 != INSIDE { code0 } else { code1 };
        let (x, y);
        if out & TOP != 0 {
            x = x0 + (x1 - x0) * (0 - y0) / (y1 - y0);
            y = 0;
        } else if out & BOTTOM != 0 {
            x = x0 + (x1 - x0) * (h - 1 - y0) / (y1 - y0);
            y = h - 1;
        } else if out & RIGHT != 0 {
            y = y0 + (y1 - y0) * (w - 1 - x0) / (x1 - x0);
            x = w - 1;
        } else {
            y = y0 + (y1 - y0) * (0 - x0) / (x1 - x0);
            x = 0;
        }
        if out == code0 {
            x0 = x;
            y0 = y;
            code0 = out_code(x0, y0, w, h);
        } else {
            x1 = x;
            y1 = y;
            code1 = out_code(x1, y1, w, h);
        }
    }
}

/// Drawing primitives layered over a `PixelBuffer`.
pub trait ShapeLayer {
    fn line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Color);
    fn rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Color);
    fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Color);
    fn circle(&mut self, cx: i64, cy: i64, r: i64, color: Color);
    fn fill_circle(&mut self, cx: i64, cy: i64, r: i64, color: Color);
    fn triangle(&mut self, p0: (i64, i64), p1: (i64, i64), p2: (i64, i64), color: Color);
    fn fill_triangle(&mut self, p0: (i64, i64), p1: (i64, i64), p2: (i64, i64), color: Color);
    fn rounded_rect(&mut self, x: i64, y: i64, w: i64, h: i64, radius: i64, color: Color);
    fn blit(&mut self, bitmap: &[u8], x: i64, y: i64, w: usize, h: usize, color: Color);
}

impl ShapeLayer for PixelBuffer {
    fn line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
        if x0 == x1 {
            let (y_start, len) = if y1 >= y0 { (y0, y1 - y0 + 1) } else { (y1, y0 - y1 + 1) };
            self.vline(x0, y_start, len, color);
            return;
        }
        if y0 == y1 {
            let (x_start, len) = if x1 >= x0 { (x0, x1 - x0 + 1) } else { (x1, x0 - x1 + 1) };
            self.hline(x_start, y0, len, color);
            return;
        }
        let w = self.logical_w() as i64;
        let h = self.logical_h() as i64;
        let Some((mut x0, mut y0, x1, y1)) = clip_line(x0, y0, x1, y1, w, h) else {
            return;
        };

        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut ctx = self.get_blit_context(color);
        loop {
            ctx.set(x0, y0);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Color) {
        if w <= 0 || h <= 0 {
            return;
        }
        self.hline(x, y, w, color);
        self.hline(x, y + h - 1, w, color);
        self.vline(x, y, h, color);
        self.vline(x + w - 1, y, h, color);
    }

    fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Color) {
        if w <= 0 || h <= 0 {
            return;
        }
        for row in 0..h {
            self.hline(x, y + row, w, color);
        }
    }

    fn circle(&mut self, cx: i64, cy: i64, r: i64, color: Color) {
        if r < 0 {
            return;
        }
        let mut x = r;
        let mut y = 0i64;
        let mut err = 1 - r;
        let mut ctx = self.get_blit_context(color);
        while x >= y {
            for &(dx, dy) in &[
                (x, y), (y, x), (-y, x), (-x, y),
                (-x, -y), (-y, -x), (y, -x), (x, -y),
            ] {
                ctx.set(cx + dx, cy + dy);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    fn fill_circle(&mut self, cx: i64, cy: i64, r: i64, color: Color) {
        if r < 0 {
            return;
        }
        let mut x = r;
        let mut y = 0i64;
        let mut err = 1 - r;
        while x >= y {
            self.hline(cx - x, cy + y, 2 * x + 1, color);
            self.hline(cx - x, cy - y, 2 * x + 1, color);
            self.hline(cx - y, cy + x, 2 * y + 1, color);
            self.hline(cx - y, cy - x, 2 * y + 1, color);
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    fn triangle(&mut self, p0: (i64, i64), p1: (i64, i64), p2: (i64, i64), color: Color) {
        self.line(p0.0, p0.1, p1.0, p1.1, color);
        self.line(p1.0, p1.1, p2.0, p2.1, color);
        self.line(p2.0, p2.1, p0.0, p0.1, color);
    }

    fn fill_triangle(&mut self, p0: (i64, i64), p1: (i64, i64), p2: (i64, i64), color: Color) {
        let mut pts = [p0, p1, p2];
        pts.sort_by_key(|p| p.1);
        let [(x0, y0), (x1, y1), (x2, y2)] = pts;

        let interp = |ya: i64, yb: i64, xa: i64, xb: i64, y: i64| -> i64 {
            if ya == yb {
                xa
            } else {
                xa + (xb - xa) * (y - ya) / (yb - ya)
            }
        };

        for y in y0..=y1.max(y0) {
            if y1 != y0 {
                let xa = interp(y0, y2, x0, x2, y);
                let xb = interp(y0, y1, x0, x1, y);
                draw_span(self, xa, xb, y, color);
            }
        }
        for y in y1..=y2.max(y1) {
            if y2 != y1 {
                let xa = interp(y0, y2, x0, x2, y);
                let xb = interp(y1, y2, x1, x2, y);
                draw_span(self, xa, xb, y, color);
            }
        }
        if y0 == y1 && y1 == y2 {
            let (lo, hi) = (x0.min(x1).min(x2), x0.max(x1).max(x2));
            draw_span(self, lo, hi, y0, color);
        }
    }

    fn rounded_rect(&mut self, x: i64, y: i64, w: i64, h: i64, radius: i64, color: Color) {
        if w <= 0 || h <= 0 {
            return;
        }
        let r = radius.clamp(0, w.min(h) / 2);
        self.hline(x + r, y, w - 2 * r, color);
        self.hline(x + r, y + h - 1, w - 2 * r, color);
        self.vline(x, y + r, h - 2 * r, color);
        self.vline(x + w - 1, y + r, h - 2 * r, color);

        let corners = [
            (x + r, y + r, -1, -1),
            (x + w - 1 - r, y + r, 1, -1),
            (x + r, y + h - 1 - r, -1, 1),
            (x + w - 1 - r, y + h - 1 - r, 1, 1),
        ];
        for &(ccx, ccy, qx, qy) in &corners {
            quarter_arc(self, ccx, ccy, r, qx, qy, color);
        }
    }

    fn blit(&mut self, bitmap: &[u8], x: i64, y: i64, w: usize, h: usize, color: Color) {
        let stride = w.div_ceil(8);
        let mut ctx = self.get_blit_context(color);
        for row in 0..h {
            for col in 0..w {
                let byte = bitmap[row * stride + col / 8];
                let bit = byte & (0x80 >> (col % 8));
                if bit != 0 {
                    ctx.set(x + col as i64, y + row as i64);
                }
            }
        }
    }
}

fn draw_span(buf: &mut PixelBuffer, xa: i64, xb: i64, y: i64, color: Color) {
    let (lo, hi) = if xa <= xb { (xa, xb) } else { (xb, xa) };
    buf.hline(lo, y, hi - lo + 1, color);
}

/// Bresenham quarter-circle arc emitted only into the quadrant selected by
/// `(qx, qy)` (each -1 or 1), for `rounded_rect`'s four corners.
fn quarter_arc(buf: &mut PixelBuffer, ccx: i64, ccy: i64, r: i64, qx: i64, qy: i64, color: Color) {
    if r == 0 {
        return;
    }
    let mut x = r;
    let mut y = 0i64;
    let mut err = 1 - r;
    let mut ctx = buf.get_blit_context(color);
    while x >= y {
        ctx.set(ccx + qx * x, ccy + qy * y);
        ctx.set(ccx + qx * y, ccy + qy * x);
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::rotation::Rotation;

    fn buf() -> PixelBuffer {
        PixelBuffer::new(32, 32, 1, Rotation::Rotate0).unwrap()
    }

    #[test]
    fn line_offscreen_segment_writes_nothing() {
        let mut b = buf();
        let before = b.to_mono();
        b.line(-100, -100, -50, -50, Color::Black);
        assert_eq!(b.to_mono(), before);
    }

    #[test]
    fn fill_rect_clips_negative_origin_to_viewport() {
        let mut b = buf();
        b.fill_rect(-5, -5, 10, 10, Color::Black);
        assert_eq!(b.get_pixel(0, 0), Some(Color::Black));
        assert_eq!(b.get_pixel(4, 4), Some(Color::Black));
        assert_eq!(b.get_pixel(5, 5), Some(Color::White));
    }

    #[test]
    fn rect_draws_four_edges() {
        let mut b = buf();
        b.rect(2, 2, 10, 6, Color::Black);
        assert_eq!(b.get_pixel(2, 2), Some(Color::Black));
        assert_eq!(b.get_pixel(11, 7), Some(Color::Black));
        assert_eq!(b.get_pixel(6, 4), Some(Color::White));
    }

    #[test]
    fn blit_clips_partially_offscreen_bitmap() {
        let mut b = buf();
        let bitmap = [0xFFu8; 4];
        b.blit(&bitmap, 28, 28, 8, 4, Color::Black);
        assert_eq!(b.get_pixel(31, 28), Some(Color::Black));
    }

    #[test]
    fn fill_triangle_covers_centroid() {
        let mut b = buf();
        b.fill_triangle((2, 2), (20, 2), (10, 20), Color::Black);
        assert_eq!(b.get_pixel(10, 6), Some(Color::Black));
    }
}
