//! A driver and graphics stack for SSD1680-based 296x128 e-paper panels
//! (Adafruit MagTag class displays), built on [`embedded-hal`] 1.0.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal/1.0
//!
//! # Requirements
//!
//! ### SPI
//!
//! - MISO is typically not connected (see `Transport::read_data`'s
//!   documented `Unsupported` behavior for boards wired this way)
//! - SPI_MODE_0 is used (CPHA = 0, CPOL = 0)
//! - 8 bits per word, MSB first
//!
//! ### Buffers
//!
//! Wherever a 1-bit buffer is used it must be `width / 8 * height` bytes,
//! where width/height are either the full panel geometry or a partial
//! update window.
//!
//! # Layout
//!
//! - [`transport`]: the byte-level SPI/GPIO capability set
//! - [`driver`]: the SSD1680 refresh state machine and wire protocol
//! - [`buffer`]: the in-memory pixel buffer, rotation, and color planes
//! - [`shapes`]: line/rect/circle/triangle drawing over a pixel buffer
//! - [`text`]: the BF2 bitmap font format, glyph cache, and text layout
//! - [`canvas`]: the façade composing all of the above
//!
//! # Examples
//!
//! ```ignore
//! use magtag_epd::prelude::*;
//!
//! let transport = SpiTransport::new(spi, cs, dc, rst, busy, false);
//! let mut canvas = Canvas::new(transport)?;
//! canvas.clear();
//! canvas.text("hello", 4, 4)?;
//! canvas.full_refresh()?;
//! ```

pub mod buffer;
pub mod canvas;
pub mod color;
pub mod driver;
pub mod error;
pub mod shapes;
pub mod text;
pub mod transport;

#[cfg(test)]
pub mod testing;

pub mod prelude {
    pub use crate::buffer::rotation::Rotation;
    pub use crate::buffer::PixelBuffer;
    pub use crate::canvas::Canvas;
    pub use crate::color::Color;
    pub use crate::driver::{DisplayDriver, Ssd1680};
    pub use crate::error::{EpdError, Result};
    pub use crate::shapes::ShapeLayer;
    pub use crate::text::{Align, TextRenderer};
    pub use crate::transport::{SpiTransport, Transport};
}
