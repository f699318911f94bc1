//! BF2 bitmap fonts, glyph caching, and text layout/rendering.

pub mod bf2;
pub mod cache;
pub mod renderer;

pub use bf2::Bf2Font;
pub use cache::{GlyphCache, GlyphCacheEntry};
pub use renderer::{Align, TextRenderer};
