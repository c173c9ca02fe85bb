//! Styling, layout and rasterization of parsed documents.
//!
//! - [`StyleResolver`] answers "what applies at this character" in one pass
//! - [`LayoutEngine`] places lines, glyphs, checkboxes, images and link rectangles
//! - [`ImageStore`] holds decoded pictures for image annotations
//! - [`paint`] draws a layout into a caller-owned [`Canvas`]

mod canvas;
mod font;
mod glyph;
mod gradient;
mod images;
mod layout;
mod paint;
mod style;

pub use canvas::{Canvas, CanvasError, HIT_ALPHA};
pub use font::{FontError, FontGlyphs, FontOptions};
pub use glyph::{
    Face, FaceKey, GlyphBitmap, GlyphMetrics, GlyphRef, GlyphSource, LineMetrics, MonoGlyphs,
    Synthesis,
};
pub use gradient::color_at;
pub use images::{ImageStore, display_size};
pub use layout::{
    CheckboxBox, Decoration, DecorationKind, Extent, Fill, ImageBox, Layout, LayoutEngine,
    LayoutOptions, LineBox, LineKind, PlacedGlyph,
};
pub use paint::{fill_color, paint};
pub use style::{ActiveStyle, HEADING_SCALES, Paint, StyleResolver, Theme, heading_scale};
