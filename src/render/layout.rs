//! Line layout.
//!
//! Lines break only at `\n`. Layout runs two passes over the document: a
//! measuring pass for every line's width, height and ascent, then a placing
//! pass that centers the block in the panel and emits glyphs, decorations,
//! checkbox boxes, image boxes and link rectangles. Both passes size
//! characters through [`LayoutEngine::size_char`] so they cannot drift apart.
//!
//! An alert's first line is prefixed with its label (`Warning: `). The label
//! is drawn but is not part of the display text.

use serde::Serialize;

use crate::document::{Document, Point, Rect, Rgb};
use crate::interaction::InteractionIndex;
use crate::perf;

use super::glyph::{Face, FaceKey, GlyphMetrics, GlyphRef, GlyphSource, LineMetrics, Synthesis};
use super::images::{self, ImageStore};
use super::style::{ActiveStyle, Paint, StyleResolver, Theme};

/// Pixel sizes used by layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// Base font size; headings scale from it
    pub font_px: f32,
    /// Indent per list nesting level
    pub indent_px: i32,
    /// Extra indent for blockquote text
    pub quote_indent_px: i32,
    /// Width of the bar beside blockquotes
    pub quote_bar_px: i32,
    /// Horizontal slack around checkbox hit regions
    pub checkbox_padding_px: i32,
    /// Margin added around the block when sizing a panel to fit
    pub padding_px: i32,
    /// Largest width or height an image is drawn at
    pub max_image_px: i32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            font_px: 24.0,
            indent_px: 20,
            quote_indent_px: 20,
            quote_bar_px: 4,
            checkbox_padding_px: 4,
            padding_px: 16,
            max_image_px: 480,
        }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Extent {
    pub width: i32,
    pub height: i32,
}

impl Extent {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Text,
    /// Horizontal rule; counts toward height only
    Rule,
}

/// One laid out display line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineBox {
    /// Character offsets of the line in the display text
    pub start: usize,
    pub end: usize,
    pub kind: LineKind,
    pub top: i32,
    pub height: i32,
    pub baseline: i32,
    /// X of the first character (block left plus indents)
    pub left: i32,
    pub width: i32,
}

/// How a glyph or decoration is colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    Solid(Rgb),
    /// Gradient of color tag `tag`, spread over `left..left + width` on this line
    Gradient { tag: usize, left: i32, width: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedGlyph {
    pub ch: char,
    /// Character offset in the display text
    pub offset: usize,
    /// Pen position
    pub x: i32,
    pub baseline: i32,
    pub px: f32,
    pub face: FaceKey,
    #[serde(skip)]
    pub glyph: GlyphRef,
    #[serde(skip)]
    pub synthesis: Synthesis,
    pub fill: Fill,
    /// Part of an alert label; `offset` is then the title line's start
    pub label: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecorationKind {
    QuoteBar,
    Rule,
    Strikethrough,
}

/// A filled rectangle drawn under or over the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoration {
    pub kind: DecorationKind,
    pub rect: Rect,
    pub fill: Fill,
}

/// A drawn task checkbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckboxBox {
    /// Ordinal among the document's task items
    pub index: usize,
    pub checked: bool,
    pub rect: Rect,
    /// Clickable area (`rect` padded horizontally)
    pub hit: Rect,
    pub color: Rgb,
}

/// Where an image is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageBox {
    /// Index into the document's images
    pub index: usize,
    pub rect: Rect,
}

/// Output of one layout call, in panel coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    /// Size of the text block (widest line, stacked heights)
    pub width: i32,
    pub height: i32,
    /// Top-left of the centered block; negative when the block overflows
    pub origin: Point,
    pub lines: Vec<LineBox>,
    pub glyphs: Vec<PlacedGlyph>,
    pub decorations: Vec<Decoration>,
    pub checkboxes: Vec<CheckboxBox>,
    pub images: Vec<ImageBox>,
}

impl Layout {
    pub const fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }
}

// Horizontal extent of one color tag on one line, relative to the line's text start
#[derive(Debug, Clone, Copy)]
struct TagSpan {
    tag: usize,
    left: f32,
    right: f32,
}

#[derive(Debug)]
struct MeasuredLine {
    start: usize,
    end: usize,
    kind: LineKind,
    indent: i32,
    width: f32,
    height: i32,
    ascent: i32,
    tags: Vec<TagSpan>,
}

#[derive(Debug, Clone, Copy)]
struct CharSize {
    px: f32,
    face: FaceKey,
    line: LineMetrics,
    metrics: GlyphMetrics,
    advance: f32,
    /// Side of the checkbox drawn in place of this character
    checkbox: Option<i32>,
    /// Image drawn in place of this character; a zero extent draws nothing
    image: Option<(usize, Extent)>,
}

/// Lays documents out against a glyph source.
pub struct LayoutEngine<'g> {
    glyphs: &'g dyn GlyphSource,
    images: Option<&'g ImageStore>,
    theme: Theme,
    options: LayoutOptions,
}

impl<'g> LayoutEngine<'g> {
    pub fn new(glyphs: &'g dyn GlyphSource, theme: Theme, options: LayoutOptions) -> Self {
        Self {
            glyphs,
            images: None,
            theme,
            options,
        }
    }

    /// Size and draw images from `store`. Without one, only images with an
    /// explicit `WxH` get a (placeholder) box.
    #[must_use]
    pub const fn with_images(mut self, store: &'g ImageStore) -> Self {
        self.images = Some(store);
        self
    }

    pub const fn theme(&self) -> &Theme {
        &self.theme
    }

    pub const fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn glyphs(&self) -> &'g dyn GlyphSource {
        self.glyphs
    }

    pub const fn images(&self) -> Option<&'g ImageStore> {
        self.images
    }

    /// Size of the text block without placing anything.
    pub fn measure(&self, doc: &Document) -> Extent {
        block_extent(&self.measure_lines(doc))
    }

    /// Block size plus padding on every side.
    pub fn fit_panel(&self, doc: &Document) -> Extent {
        let block = self.measure(doc);
        let pad = self.options.padding_px * 2;
        Extent::new(block.width + pad, block.height + pad)
    }

    /// Lay `doc` out centered in `panel`.
    ///
    /// Fills every link's `rect` and rebuilds `index` from scratch.
    pub fn layout(
        &self,
        doc: &mut Document,
        panel: Extent,
        index: &mut InteractionIndex,
    ) -> Layout {
        let _scope = perf::scope("render.layout");
        index.clear();
        doc.annotations_mut().reset_link_rects();

        let (layout, link_rects) = self.place(doc, panel);

        let links = &mut doc.annotations_mut().links;
        for (link, rect) in links.iter_mut().zip(link_rects) {
            link.rect = rect;
        }
        for (i, link) in doc.links().iter().enumerate() {
            index.push_link(i, &link.url, link.rect);
        }
        for checkbox in &layout.checkboxes {
            index.push_checkbox(checkbox.index, checkbox.checked, checkbox.hit);
        }

        tracing::debug!(
            lines = layout.lines.len(),
            glyphs = layout.glyphs.len(),
            width = layout.width,
            height = layout.height,
            regions = index.regions().len(),
            "layout complete"
        );
        perf::log_event(
            "render.layout",
            format!(
                "panel={}x{} block={}x{} origin={},{} lines={} images={}",
                panel.width,
                panel.height,
                layout.width,
                layout.height,
                layout.origin.x,
                layout.origin.y,
                layout.lines.len(),
                layout.images.len()
            ),
        );
        layout
    }

    fn size_char(
        &self,
        doc: &Document,
        style: &ActiveStyle<'_>,
        pos: usize,
        ch: char,
        next: Option<char>,
    ) -> CharSize {
        let px = self.options.font_px * style.scale();
        let face = style.face();
        let line = self.glyphs.line_metrics(face.face(doc), px);
        let metrics = self.glyphs.glyph_metrics(face.face(doc), ch, next, px);
        let mut advance = metrics.advance + metrics.kern;
        let checkbox = style
            .list_item
            .filter(|item| item.is_checkbox() && item.start == pos)
            .map(|_| checkbox_side(&line));
        if let Some(side) = checkbox {
            advance = advance.max(side as f32 + 2.0);
        }
        let image = style
            .image
            .filter(|(_, image)| image.start == pos)
            .map(|(index, image)| {
                let natural = self.images.and_then(|store| store.natural_size(&image.src));
                let size = images::display_size(image, natural, self.options.max_image_px);
                (index, size.unwrap_or_default())
            });
        if let Some((_, size)) = image {
            advance = size.width as f32;
        }
        CharSize {
            px,
            face,
            line,
            metrics,
            advance,
            checkbox,
            image,
        }
    }

    fn fill(&self, style: &ActiveStyle<'_>, line: &MeasuredLine, text_left: i32) -> Fill {
        match style.paint(&self.theme) {
            Paint::Solid(color) => Fill::Solid(color),
            Paint::Gradient(tag) => gradient_fill(line, tag, text_left),
        }
    }

    fn indent_for(&self, head: &ActiveStyle<'_>) -> i32 {
        let list = head
            .list_item
            .map_or(0, |item| item.indent as i32 * self.options.indent_px);
        let quote = if head.blockquote.is_some() {
            self.options.quote_indent_px
        } else {
            0
        };
        list + quote
    }

    fn measure_lines(&self, doc: &Document) -> Vec<MeasuredLine> {
        let base = self.glyphs.line_metrics(Face::Default, self.options.font_px);
        let mut resolver = StyleResolver::new(doc);
        let mut lines = Vec::new();
        let mut start = 0;

        for text in doc.lines() {
            let end = start + text.chars().count();
            resolver.start_line(start);
            let head = resolver.at(start);
            let kind = if head.rule.is_some() {
                LineKind::Rule
            } else {
                LineKind::Text
            };
            let mut line = MeasuredLine {
                start,
                end,
                kind,
                indent: self.indent_for(&head),
                width: 0.0,
                height: base.height().ceil() as i32,
                ascent: base.ascent.ceil() as i32,
                tags: Vec::new(),
            };

            if kind == LineKind::Text {
                let mut pen = 0.0;
                if let Some((label, style)) = alert_label(&head) {
                    let mut chars = label.chars().peekable();
                    while let Some(ch) = chars.next() {
                        pen += self
                            .size_char(doc, &style, start, ch, chars.peek().copied())
                            .advance;
                    }
                }
                let mut pos = start;
                let mut chars = text.chars().peekable();
                while let Some(ch) = chars.next() {
                    let style = resolver.at(pos);
                    let size = self.size_char(doc, &style, pos, ch, chars.peek().copied());
                    line.height = line.height.max(size.line.height().ceil() as i32);
                    line.ascent = line.ascent.max(size.line.ascent.ceil() as i32);
                    if let Some((_, image)) = size.image {
                        // Images sit on the baseline.
                        let descent = (size.line.height() - size.line.ascent).ceil() as i32;
                        line.ascent = line.ascent.max(image.height);
                        line.height = line.height.max(line.ascent + descent);
                    }
                    if let Some((tag, _)) = style.color_tag {
                        extend_tag(&mut line.tags, tag, pen, pen + size.advance);
                    }
                    pen += size.advance;
                    pos += 1;
                }
                line.width = pen;
            }

            lines.push(line);
            start = end + 1;
        }
        lines
    }

    fn place(&self, doc: &Document, panel: Extent) -> (Layout, Vec<Rect>) {
        let measured = self.measure_lines(doc);
        let block = block_extent(&measured);
        let origin = Point::new(
            (panel.width - block.width) / 2,
            (panel.height - block.height) / 2,
        );
        let mut out = Layout {
            width: block.width,
            height: block.height,
            origin,
            lines: Vec::with_capacity(measured.len()),
            ..Layout::default()
        };
        let mut link_rects = vec![Rect::ZERO; doc.links().len()];
        let mut resolver = StyleResolver::new(doc);
        let mut checkbox_index = 0;
        let mut top = origin.y;

        for (line, text) in measured.iter().zip(doc.lines()) {
            resolver.start_line(line.start);
            let head = resolver.at(line.start);
            let bottom = top + line.height;
            let baseline = top + line.ascent;
            let left = origin.x + line.indent;

            if let Some(quote) = head.blockquote {
                out.decorations.push(Decoration {
                    kind: DecorationKind::QuoteBar,
                    rect: Rect::new(origin.x, top, origin.x + self.options.quote_bar_px, bottom),
                    fill: Fill::Solid(self.theme.alert_color(quote.alert)),
                });
            }

            if line.kind == LineKind::Rule {
                let (x0, x1) = if block.width > 0 {
                    (origin.x, origin.x + block.width)
                } else {
                    (0, panel.width)
                };
                let thickness = (self.options.font_px / 12.0).round().max(1.0) as i32;
                let y = top + (line.height - thickness) / 2;
                out.decorations.push(Decoration {
                    kind: DecorationKind::Rule,
                    rect: Rect::new(x0, y, x1, y + thickness),
                    fill: Fill::Solid(self.theme.rule),
                });
            } else {
                let mut strike: Option<Decoration> = None;
                let mut pen = left as f32;
                if let Some((label, style)) = alert_label(&head) {
                    let fill = self.fill(&style, line, left);
                    let mut chars = label.chars().peekable();
                    while let Some(ch) = chars.next() {
                        let size =
                            self.size_char(doc, &style, line.start, ch, chars.peek().copied());
                        if !ch.is_whitespace() {
                            out.glyphs.push(PlacedGlyph {
                                ch,
                                offset: line.start,
                                x: pen.round() as i32,
                                baseline,
                                px: size.px,
                                face: size.face,
                                glyph: size.metrics.glyph,
                                synthesis: Synthesis {
                                    bold: true,
                                    italic: false,
                                },
                                fill,
                                label: true,
                            });
                        }
                        pen += size.advance;
                    }
                }
                let mut pos = line.start;
                let mut chars = text.chars().peekable();
                while let Some(ch) = chars.next() {
                    let style = resolver.at(pos);
                    let size = self.size_char(doc, &style, pos, ch, chars.peek().copied());
                    let x = pen.round() as i32;
                    let right = (pen + size.advance).round() as i32;
                    let fill = self.fill(&style, line, left);

                    if let Some((index, image)) = size.image {
                        if image.width > 0 && image.height > 0 {
                            out.images.push(ImageBox {
                                index,
                                rect: Rect::new(x, baseline - image.height, right, baseline),
                            });
                        }
                    } else if let Some(side) = size.checkbox {
                        let rect = Rect::new(x, baseline - side, x + side, baseline);
                        out.checkboxes.push(CheckboxBox {
                            index: checkbox_index,
                            checked: style.list_item.is_some_and(|item| item.checked),
                            rect,
                            hit: rect.inflate_x(self.options.checkbox_padding_px),
                            color: self.theme.checkbox,
                        });
                        checkbox_index += 1;
                    } else if !ch.is_whitespace() {
                        out.glyphs.push(PlacedGlyph {
                            ch,
                            offset: pos,
                            x,
                            baseline,
                            px: size.px,
                            face: size.face,
                            glyph: size.metrics.glyph,
                            synthesis: Synthesis {
                                bold: style.is_bold(),
                                italic: style.is_italic(),
                            },
                            fill,
                            label: false,
                        });
                    }

                    if style.is_strikethrough() {
                        let thickness = (size.px / 14.0).round().max(1.0) as i32;
                        let y = baseline - (size.line.ascent * 0.4).round() as i32 - thickness / 2;
                        extend_strike(
                            &mut strike,
                            &mut out.decorations,
                            Rect::new(x, y, right, y + thickness),
                            fill,
                        );
                    } else if let Some(run) = strike.take() {
                        out.decorations.push(run);
                    }

                    if let Some((i, link)) = style.link {
                        let rect = &mut link_rects[i];
                        if pos == link.start {
                            *rect = Rect::new(x, top, right, bottom);
                        } else {
                            rect.right = right;
                        }
                    }

                    pen += size.advance;
                    pos += 1;
                }
                if let Some(run) = strike {
                    out.decorations.push(run);
                }
            }

            out.lines.push(LineBox {
                start: line.start,
                end: line.end,
                kind: line.kind,
                top,
                height: line.height,
                baseline,
                left,
                width: line.width.ceil() as i32,
            });
            top = bottom;
        }
        (out, link_rects)
    }
}

fn checkbox_side(line: &LineMetrics) -> i32 {
    (line.ascent * 0.75).round().max(4.0) as i32
}

// Label text and style drawn ahead of an alert's first line
fn alert_label(head: &ActiveStyle<'_>) -> Option<(String, ActiveStyle<'static>)> {
    let alert = head.alert_title?;
    let style = ActiveStyle {
        alert_title: Some(alert),
        ..ActiveStyle::default()
    };
    Some((format!("{}: ", alert.label()), style))
}

fn block_extent(lines: &[MeasuredLine]) -> Extent {
    let width = lines
        .iter()
        .filter(|line| line.kind == LineKind::Text)
        .map(|line| line.indent + line.width.ceil() as i32)
        .max()
        .unwrap_or(0);
    let height = lines.iter().map(|line| line.height).sum();
    Extent::new(width, height)
}

fn extend_tag(tags: &mut Vec<TagSpan>, tag: usize, left: f32, right: f32) {
    match tags.last_mut() {
        Some(span) if span.tag == tag => span.right = right,
        _ => tags.push(TagSpan { tag, left, right }),
    }
}

fn gradient_fill(line: &MeasuredLine, tag: usize, text_left: i32) -> Fill {
    let span = line.tags.iter().find(|span| span.tag == tag);
    let (left, width) = span.map_or((0.0, 1.0), |span| (span.left, span.right - span.left));
    Fill::Gradient {
        tag,
        left: text_left + left.round() as i32,
        width: (width.round() as i32).max(1),
    }
}

fn extend_strike(
    current: &mut Option<Decoration>,
    done: &mut Vec<Decoration>,
    rect: Rect,
    fill: Fill,
) {
    if let Some(run) = current
        && run.fill == fill
        && run.rect.top == rect.top
        && run.rect.bottom == rect.bottom
        && run.rect.right >= rect.left
    {
        run.rect.right = rect.right;
        return;
    }
    if let Some(run) = current.take() {
        done.push(run);
    }
    *current = Some(Decoration {
        kind: DecorationKind::Strikethrough,
        rect,
        fill,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::glyph::MonoGlyphs;

    #[test]
    fn test_extend_tag_merges_same_tag() {
        let mut tags = Vec::new();
        extend_tag(&mut tags, 0, 0.0, 10.0);
        extend_tag(&mut tags, 0, 10.0, 20.0);
        extend_tag(&mut tags, 1, 30.0, 40.0);
        assert_eq!(tags.len(), 2);
        assert!((tags[0].right - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_strike_runs_merge_when_contiguous() {
        let fill = Fill::Solid(Rgb::new(1, 2, 3));
        let mut current = None;
        let mut done = Vec::new();
        extend_strike(&mut current, &mut done, Rect::new(0, 5, 10, 6), fill);
        extend_strike(&mut current, &mut done, Rect::new(10, 5, 20, 6), fill);
        extend_strike(&mut current, &mut done, Rect::new(30, 5, 40, 6), fill);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].rect, Rect::new(0, 5, 20, 6));
        assert_eq!(current.unwrap().rect, Rect::new(30, 5, 40, 6));
    }

    #[test]
    fn test_alert_label_only_on_title_line() {
        let doc = Document::parse("> [!CAUTION]\n> hot\n> stove").unwrap();
        let mut resolver = StyleResolver::new(&doc);
        resolver.start_line(0);
        let (label, style) = alert_label(&resolver.at(0)).unwrap();
        assert_eq!(label, "Caution: ");
        assert!(style.is_bold());
        resolver.start_line(4);
        assert!(alert_label(&resolver.at(4)).is_none());

        let doc = Document::parse("> plain").unwrap();
        let mut resolver = StyleResolver::new(&doc);
        assert!(alert_label(&resolver.at(0)).is_none());
    }

    #[test]
    fn test_measure_uses_widest_line() {
        let doc = Document::parse("ab\nabcd").unwrap();
        let engine = LayoutEngine::new(&MonoGlyphs, Theme::dark(), LayoutOptions::default());
        // 24px mono: advance 14, line height 24
        assert_eq!(engine.measure(&doc), Extent::new(56, 48));
    }

    #[test]
    fn test_fit_panel_adds_padding() {
        let doc = Document::parse("ab").unwrap();
        let engine = LayoutEngine::new(&MonoGlyphs, Theme::dark(), LayoutOptions::default());
        assert_eq!(engine.fit_panel(&doc), Extent::new(28 + 32, 24 + 32));
    }
}
