//! Glyph metrics and coverage bitmaps.
//!
//! Layout and painting never rasterize text themselves; they go through a
//! [`GlyphSource`]. [`MonoGlyphs`] is a fixed-pitch source with box glyphs
//! for tests and headless sizing; [`FontGlyphs`](super::font::FontGlyphs)
//! reads real font files.

use serde::Serialize;

use crate::document::Document;

/// Face slot chosen for a character, independent of any document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceKey {
    #[default]
    Default,
    Monospace,
    /// Font tag with this index
    Tag(usize),
}

impl FaceKey {
    /// Resolve the key against the document that produced it.
    pub fn face<'d>(self, doc: &'d Document) -> Face<'d> {
        match self {
            Self::Default => Face::Default,
            Self::Monospace => Face::Monospace,
            Self::Tag(index) => doc
                .font_tags()
                .get(index)
                .map_or(Face::Default, |tag| Face::Named(&tag.name)),
        }
    }
}

/// Face request passed to a glyph source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face<'a> {
    Default,
    Monospace,
    Named(&'a str),
}

/// Vertical metrics in pixels. `descent` is positive below the baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
}

impl LineMetrics {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent + self.line_gap
    }
}

/// Which glyph a source picked, including whether it came from the fallback face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlyphRef {
    pub glyph: u16,
    pub fallback: bool,
}

/// Horizontal metrics in pixels for one character.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlyphMetrics {
    pub advance: f32,
    /// Kerning against the following character
    pub kern: f32,
    pub glyph: GlyphRef,
}

/// Styles the source should fake when the face lacks them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Synthesis {
    pub bold: bool,
    pub italic: bool,
}

/// 8-bit coverage for one glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    /// Offset of the first column from the pen position
    pub left: i32,
    /// Offset of the first row from the baseline (negative is above)
    pub top: i32,
    pub coverage: Vec<u8>,
}

impl GlyphBitmap {
    /// Fake bold: smear coverage one pixel to the right.
    #[must_use]
    pub fn emboldened(&self) -> Self {
        let width = self.width + 1;
        let mut coverage = vec![0; (width * self.height) as usize];
        for y in 0..self.height {
            for x in 0..width {
                let here = self.coverage_at(x, y);
                let left = x.checked_sub(1).map_or(0, |lx| self.coverage_at(lx, y));
                coverage[(y * width + x) as usize] = here.max(left);
            }
        }
        Self {
            width,
            coverage,
            ..*self
        }
    }

    pub fn coverage_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.coverage[(y * self.width + x) as usize]
    }
}

/// Provider of glyph metrics and bitmaps.
pub trait GlyphSource {
    fn line_metrics(&self, face: Face<'_>, px: f32) -> LineMetrics;

    fn glyph_metrics(&self, face: Face<'_>, ch: char, next: Option<char>, px: f32)
    -> GlyphMetrics;

    /// `None` for glyphs with no ink (spaces).
    fn glyph_bitmap(
        &self,
        face: Face<'_>,
        glyph: GlyphRef,
        px: f32,
        synthesis: Synthesis,
    ) -> Option<GlyphBitmap>;
}

/// Fixed-pitch glyph source drawing every visible character as a box.
///
/// Advance is `0.6 * px` rounded, ascent `0.8 * px`, descent `0.2 * px`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonoGlyphs;

impl GlyphSource for MonoGlyphs {
    fn line_metrics(&self, _face: Face<'_>, px: f32) -> LineMetrics {
        LineMetrics {
            ascent: (px * 0.8).round(),
            descent: (px * 0.2).round(),
            line_gap: 0.0,
        }
    }

    fn glyph_metrics(
        &self,
        _face: Face<'_>,
        ch: char,
        _next: Option<char>,
        px: f32,
    ) -> GlyphMetrics {
        GlyphMetrics {
            advance: (px * 0.6).round(),
            kern: 0.0,
            glyph: GlyphRef {
                glyph: u16::from(!ch.is_whitespace()),
                fallback: false,
            },
        }
    }

    fn glyph_bitmap(
        &self,
        _face: Face<'_>,
        glyph: GlyphRef,
        px: f32,
        synthesis: Synthesis,
    ) -> Option<GlyphBitmap> {
        if glyph.glyph == 0 {
            return None;
        }
        let advance = (px * 0.6).round() as u32;
        let width = advance.saturating_sub(2).max(1);
        let height = ((px * 0.7).round() as u32).max(1);
        let mut coverage = vec![255; (width * height) as usize];
        if synthesis.italic {
            // lighter left column in the top half
            for row in 0..height / 2 {
                coverage[(row * width) as usize] = 128;
            }
        }
        let bitmap = GlyphBitmap {
            width,
            height,
            left: 1,
            top: -(height as i32),
            coverage,
        };
        Some(if synthesis.bold {
            bitmap.emboldened()
        } else {
            bitmap
        })
    }
}
