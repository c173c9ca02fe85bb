//! Glyph source backed by installed fonts or a font file.
//!
//! Faces are located with `fontdb`, measured with `ttf-parser` and
//! rasterized through `tiny-skia`. Font-tag faces are looked up the first
//! time a tag names them and cached for the life of the source.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use fontdb::{Database, Family, Query};
use resvg::tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};
use thiserror::Error;
use ttf_parser::{GlyphId, OutlineBuilder};

use super::glyph::{
    Face, GlyphBitmap, GlyphMetrics, GlyphRef, GlyphSource, LineMetrics, Synthesis,
};

/// Horizontal shear applied for synthetic italics.
const ITALIC_SHEAR: f32 = 0.2;

/// Families tried, in order, for characters the primary face lacks.
const FALLBACK_FAMILIES: &[&str] = &[
    "Noto Sans",
    "DejaVu Sans",
    "Segoe UI Symbol",
    "Arial Unicode MS",
    "Apple Symbols",
];

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("font data in {0} could not be parsed")]
    Parse(String),
    #[error("no usable font found (wanted `{0}`)")]
    NotFound(String),
}

/// Which fonts to load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontOptions {
    /// Installed family name for body text
    pub family: Option<String>,
    /// Font file for body text; wins over `family`
    pub file: Option<PathBuf>,
}

struct LoadedFace {
    label: String,
    data: Vec<u8>,
    index: u32,
}

impl LoadedFace {
    fn with<R>(&self, f: impl FnOnce(&ttf_parser::Face<'_>) -> R) -> Option<R> {
        ttf_parser::Face::parse(&self.data, self.index)
            .ok()
            .map(|face| f(&face))
    }

    fn has_glyph(&self, ch: char) -> Option<GlyphId> {
        self.with(|face| face.glyph_index(ch)).flatten()
    }
}

/// Glyph source reading real fonts.
pub struct FontGlyphs {
    db: Database,
    primary: Rc<LoadedFace>,
    monospace: Rc<LoadedFace>,
    fallback: Option<Rc<LoadedFace>>,
    named: RefCell<HashMap<String, Rc<LoadedFace>>>,
}

impl std::fmt::Debug for FontGlyphs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontGlyphs")
            .field("primary", &self.primary.label)
            .field("monospace", &self.monospace.label)
            .field("fallback", &self.fallback.as_ref().map(|face| &face.label))
            .field("faces", &self.db.len())
            .finish_non_exhaustive()
    }
}

fn query(db: &Database, families: &[Family<'_>], label: &str) -> Option<LoadedFace> {
    let id = db.query(&Query {
        families,
        ..Query::default()
    })?;
    db.with_face_data(id, |data, index| LoadedFace {
        label: label.to_string(),
        data: data.to_vec(),
        index,
    })
}

impl FontGlyphs {
    /// Load system fonts plus the requested body face.
    pub fn load(options: &FontOptions) -> Result<Self, FontError> {
        let mut db = Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "system fonts loaded");

        let primary = if let Some(path) = &options.file {
            let data = std::fs::read(path).map_err(|source| FontError::Io {
                path: path.clone(),
                source,
            })?;
            let label = path.display().to_string();
            if ttf_parser::Face::parse(&data, 0).is_err() {
                return Err(FontError::Parse(label));
            }
            db.load_font_data(data.clone());
            LoadedFace {
                label,
                data,
                index: 0,
            }
        } else {
            let wanted = options.family.as_deref();
            wanted
                .and_then(|name| query(&db, &[Family::Name(name)], name))
                .or_else(|| {
                    if let Some(name) = wanted {
                        tracing::warn!(family = name, "font not installed, using sans-serif");
                    }
                    query(&db, &[Family::SansSerif], "sans-serif")
                })
                .or_else(|| {
                    let first = db.faces().next()?.id;
                    db.with_face_data(first, |data, index| LoadedFace {
                        label: "first installed face".to_string(),
                        data: data.to_vec(),
                        index,
                    })
                })
                .ok_or_else(|| FontError::NotFound(wanted.unwrap_or("sans-serif").to_string()))?
        };
        let primary = Rc::new(primary);

        let monospace = query(&db, &[Family::Monospace], "monospace")
            .map_or_else(|| Rc::clone(&primary), Rc::new);
        let fallback = FALLBACK_FAMILIES
            .iter()
            .filter(|name| **name != primary.label)
            .find_map(|name| query(&db, &[Family::Name(name)], name))
            .map(Rc::new);

        tracing::debug!(
            primary = %primary.label,
            monospace = %monospace.label,
            fallback = ?fallback.as_ref().map(|face| face.label.as_str()),
            "fonts resolved"
        );

        Ok(Self {
            db,
            primary,
            monospace,
            fallback,
            named: RefCell::new(HashMap::new()),
        })
    }

    fn resolve(&self, face: Face<'_>) -> Rc<LoadedFace> {
        match face {
            Face::Default => Rc::clone(&self.primary),
            Face::Monospace => Rc::clone(&self.monospace),
            Face::Named(name) => {
                if let Some(found) = self.named.borrow().get(name) {
                    return Rc::clone(found);
                }
                let loaded = query(&self.db, &[Family::Name(name)], name).map_or_else(
                    || {
                        tracing::debug!(font = name, "font tag names an unknown font");
                        Rc::clone(&self.primary)
                    },
                    Rc::new,
                );
                self.named
                    .borrow_mut()
                    .insert(name.to_string(), Rc::clone(&loaded));
                loaded
            }
        }
    }
}

// Pixels per font unit, sizing ascender-to-descender to `px`.
fn scale_for(face: &ttf_parser::Face<'_>, px: f32) -> f32 {
    let height = f32::from(face.ascender()) - f32::from(face.descender());
    if height > 0.0 {
        px / height
    } else {
        px / f32::from(face.units_per_em().max(1))
    }
}

fn kerning(face: &ttf_parser::Face<'_>, left: GlyphId, right: GlyphId) -> i16 {
    face.tables().kern.map_or(0, |kern| {
        kern.subtables
            .into_iter()
            .filter(|table| table.horizontal && !table.variable)
            .find_map(|table| table.glyphs_kerning(left, right))
            .unwrap_or(0)
    })
}

struct PathSink(PathBuilder);

impl OutlineBuilder for PathSink {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.0.close();
    }
}

fn rasterize(
    face: &ttf_parser::Face<'_>,
    glyph: GlyphId,
    px: f32,
    italic: bool,
) -> Option<GlyphBitmap> {
    let mut sink = PathSink(PathBuilder::new());
    let bbox = face.outline_glyph(glyph, &mut sink)?;
    let path = sink.0.finish()?;

    let s = scale_for(face, px);
    let shear = if italic { ITALIC_SHEAR } else { 0.0 };
    let x0 = (s * (f32::from(bbox.x_min) + shear * f32::from(bbox.y_min))).floor();
    let x1 = (s * (f32::from(bbox.x_max) + shear * f32::from(bbox.y_max))).ceil();
    let y0 = (-s * f32::from(bbox.y_max)).floor();
    let y1 = (-s * f32::from(bbox.y_min)).ceil();
    let width = (x1 - x0).max(1.0) as u32;
    let height = (y1 - y0).max(1.0) as u32;

    let mut pixmap = Pixmap::new(width, height)?;
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;
    // font units are y-up; flip, shear for italics, then move the box to the origin
    let transform = Transform::from_row(s, 0.0, s * shear, -s, -x0, -y0);
    pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);

    Some(GlyphBitmap {
        width,
        height,
        left: x0 as i32,
        top: y0 as i32,
        coverage: pixmap.data().chunks_exact(4).map(|px| px[3]).collect(),
    })
}

impl GlyphSource for FontGlyphs {
    fn line_metrics(&self, face: Face<'_>, px: f32) -> LineMetrics {
        self.resolve(face)
            .with(|face| {
                let s = scale_for(face, px);
                LineMetrics {
                    ascent: f32::from(face.ascender()) * s,
                    descent: -f32::from(face.descender()) * s,
                    line_gap: f32::from(face.line_gap()) * s,
                }
            })
            .unwrap_or(LineMetrics {
                ascent: px * 0.8,
                descent: px * 0.2,
                line_gap: 0.0,
            })
    }

    fn glyph_metrics(
        &self,
        face: Face<'_>,
        ch: char,
        next: Option<char>,
        px: f32,
    ) -> GlyphMetrics {
        let face = self.resolve(face);
        let (source, glyph, fallback) = match face.has_glyph(ch) {
            Some(glyph) => (face, glyph, false),
            None => match self
                .fallback
                .as_ref()
                .and_then(|fb| fb.has_glyph(ch).map(|glyph| (Rc::clone(fb), glyph)))
            {
                Some((fb, glyph)) => (fb, glyph, true),
                None => (face, GlyphId(0), false),
            },
        };
        source
            .with(|face| {
                let s = scale_for(face, px);
                let advance = face.glyph_hor_advance(glyph).map_or(0.0, f32::from) * s;
                let kern = next
                    .and_then(|next| face.glyph_index(next))
                    .map_or(0.0, |right| f32::from(kerning(face, glyph, right)) * s);
                GlyphMetrics {
                    advance,
                    kern,
                    glyph: GlyphRef {
                        glyph: glyph.0,
                        fallback,
                    },
                }
            })
            .unwrap_or_default()
    }

    fn glyph_bitmap(
        &self,
        face: Face<'_>,
        glyph: GlyphRef,
        px: f32,
        synthesis: Synthesis,
    ) -> Option<GlyphBitmap> {
        let source = match (&self.fallback, glyph.fallback) {
            (Some(fb), true) => Rc::clone(fb),
            _ => self.resolve(face),
        };
        let bitmap = source
            .with(|face| rasterize(face, GlyphId(glyph.glyph), px, synthesis.italic))
            .flatten()?;
        Some(if synthesis.bold {
            bitmap.emboldened()
        } else {
            bitmap
        })
    }
}
