//! Rasterizes a [`Layout`] into a [`Canvas`].

use image::imageops::{self, FilterType};

use crate::document::{Document, Rgb};
use crate::perf;

use super::canvas::Canvas;
use super::gradient;
use super::layout::{
    Decoration, DecorationKind, Fill, ImageBox, Layout, LayoutEngine, PlacedGlyph,
};

/// Draw `layout` (produced from `doc` by `engine`) into `canvas`.
///
/// `anim` is the gradient animation offset; `None` draws static gradients.
pub fn paint(
    layout: &Layout,
    doc: &Document,
    engine: &LayoutEngine<'_>,
    canvas: &mut Canvas<'_>,
    anim: Option<f32>,
) {
    let _scope = perf::scope("render.paint");
    let theme = engine.theme();
    canvas.clear(theme.background);

    // Bars and rules sit under the text; strikethrough goes over it.
    for decoration in layout
        .decorations
        .iter()
        .filter(|d| d.kind != DecorationKind::Strikethrough)
    {
        fill_decoration(canvas, doc, decoration, anim);
    }

    for checkbox in &layout.checkboxes {
        if checkbox.checked {
            canvas.fill_rect(checkbox.rect, checkbox.color);
        } else {
            let stroke = (checkbox.rect.width() / 8).max(1);
            canvas.stroke_rect(checkbox.rect, stroke, checkbox.color);
        }
    }

    for image in &layout.images {
        draw_image(canvas, doc, engine, image);
    }

    let mut missing = 0usize;
    for glyph in &layout.glyphs {
        if !draw_glyph(canvas, doc, engine, glyph, anim) {
            missing += 1;
        }
    }

    for decoration in layout
        .decorations
        .iter()
        .filter(|d| d.kind == DecorationKind::Strikethrough)
    {
        fill_decoration(canvas, doc, decoration, anim);
    }

    tracing::debug!(
        glyphs = layout.glyphs.len(),
        without_ink = missing,
        decorations = layout.decorations.len(),
        "paint complete"
    );
    perf::log_event(
        "render.paint",
        format!(
            "canvas={}x{} glyphs={} images={} anim={anim:?}",
            canvas.width(),
            canvas.height(),
            layout.glyphs.len(),
            layout.images.len()
        ),
    );
}

/// Color of `fill` at pixel column `x`.
pub fn fill_color(doc: &Document, fill: Fill, x: i32, anim: Option<f32>) -> Rgb {
    match fill {
        Fill::Solid(color) => color,
        Fill::Gradient { tag, left, width } => {
            doc.color_tags().get(tag).map_or_else(Rgb::default, |tag| {
                let t = ((x - left) as f32 + 0.5) / width.max(1) as f32;
                gradient::color_at(tag, t, anim)
            })
        }
    }
}

fn fill_decoration(
    canvas: &mut Canvas<'_>,
    doc: &Document,
    decoration: &Decoration,
    anim: Option<f32>,
) {
    let rect = decoration.rect;
    if let Fill::Solid(color) = decoration.fill {
        canvas.fill_rect(rect, color);
        return;
    }
    for x in rect.left..rect.right {
        let color = fill_color(doc, decoration.fill, x, anim);
        for y in rect.top..rect.bottom {
            canvas.blend(x, y, color, 255);
        }
    }
}

// Scaled picture from the engine's store, or an outline when it was not loaded
fn draw_image(
    canvas: &mut Canvas<'_>,
    doc: &Document,
    engine: &LayoutEngine<'_>,
    image: &ImageBox,
) {
    let rect = image.rect;
    let picture = doc
        .images()
        .get(image.index)
        .and_then(|annotation| engine.images()?.get(&annotation.src));
    let Some(picture) = picture else {
        canvas.stroke_rect(rect, 1, engine.theme().rule);
        return;
    };
    let scaled = imageops::resize(
        picture,
        rect.width() as u32,
        rect.height() as u32,
        FilterType::Triangle,
    );
    for (x, y, pixel) in scaled.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        canvas.blend(rect.left + x as i32, rect.top + y as i32, Rgb::new(r, g, b), a);
    }
}

fn draw_glyph(
    canvas: &mut Canvas<'_>,
    doc: &Document,
    engine: &LayoutEngine<'_>,
    glyph: &PlacedGlyph,
    anim: Option<f32>,
) -> bool {
    let Some(bitmap) = engine.glyphs().glyph_bitmap(
        glyph.face.face(doc),
        glyph.glyph,
        glyph.px,
        glyph.synthesis,
    ) else {
        return false;
    };
    let x0 = glyph.x + bitmap.left;
    let y0 = glyph.baseline + bitmap.top;
    for col in 0..bitmap.width {
        let x = x0 + col as i32;
        let color = fill_color(doc, glyph.fill, x, anim);
        for row in 0..bitmap.height {
            canvas.blend(x, y0 + row as i32, color, bitmap.coverage_at(col, row));
        }
    }
    true
}
