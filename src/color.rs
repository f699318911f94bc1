//! Pixel color levels and depth-aware packing.
//!
//! Four named levels cover both supported buffer depths: a 1-bit buffer
//! only ever resolves to the two extremes, a 2-bit buffer keeps all four.

#[cfg(feature = "graphics")]
use embedded_graphics_core::prelude::PixelColor;

/// A logical pixel color, independent of buffer depth.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    Black,
    DarkGray,
    LightGray,
    White,
}

impl Color {
    /// The raw 0..=3 level, highest bit representing the BW plane and the
    /// low bit the RED plane in `to_planes`.
    pub const fn level(self) -> u8 {
        match self {
            Color::Black => 0,
            Color::DarkGray => 1,
            Color::LightGray => 2,
            Color::White => 3,
        }
    }

    fn from_level(level: u8) -> Self {
        match level & 0b11 {
            0 => Color::Black,
            1 => Color::DarkGray,
            2 => Color::LightGray,
            _ => Color::White,
        }
    }

    /// The single bit this color packs to at `depth` bits per pixel.
    /// At depth 1, `LightGray`/`White` both resolve to the "white" bit (1),
    /// `Black`/`DarkGray` to the "black" bit (0) -- the same `>= 2`
    /// threshold `PixelBuffer::to_mono` applies when downconverting a
    /// 2-bit buffer.
    pub const fn bit_value(self, depth: u8) -> u8 {
        match depth {
            1 => {
                if self.level() >= 2 {
                    1
                } else {
                    0
                }
            }
            _ => self.level(),
        }
    }

    /// A full byte of this color at `depth` bits per pixel (8/depth
    /// repetitions of `bit_value`).
    pub const fn byte_value(self, depth: u8) -> u8 {
        match depth {
            1 => {
                if self.bit_value(1) == 1 {
                    0xFF
                } else {
                    0x00
                }
            }
            _ => {
                let v = self.level();
                v | (v << 2) | (v << 4) | (v << 6)
            }
        }
    }

    /// The color that results from inverting this one at `depth` bits per
    /// pixel: a 0/1 swap at depth 1, a bitwise complement modulo 4 at
    /// depth 2.
    pub const fn complement(self, depth: u8) -> Self {
        match depth {
            1 => {
                if self.bit_value(1) == 1 {
                    Color::Black
                } else {
                    Color::White
                }
            }
            _ => Color::from_level(3 - self.level()),
        }
    }
}

#[cfg(feature = "graphics")]
impl PixelColor for Color {}

impl From<u8> for Color {
    fn from(value: u8) -> Self {
        Color::from_level(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth1_bit_values() {
        assert_eq!(Color::Black.bit_value(1), 0);
        assert_eq!(Color::DarkGray.bit_value(1), 0);
        assert_eq!(Color::LightGray.bit_value(1), 1);
        assert_eq!(Color::White.bit_value(1), 1);
    }

    #[test]
    fn depth1_byte_values() {
        assert_eq!(Color::White.byte_value(1), 0xFF);
        assert_eq!(Color::Black.byte_value(1), 0x00);
    }

    #[test]
    fn depth2_levels_round_trip() {
        for level in 0u8..4 {
            let c = Color::from(level);
            assert_eq!(c.level(), level);
        }
    }

    #[test]
    fn depth1_complement_swaps_black_white() {
        assert_eq!(Color::Black.complement(1), Color::White);
        assert_eq!(Color::White.complement(1), Color::Black);
    }

    #[test]
    fn depth2_complement_is_bitwise_modulo_four() {
        assert_eq!(Color::Black.complement(2), Color::White);
        assert_eq!(Color::DarkGray.complement(2), Color::LightGray);
    }
}
