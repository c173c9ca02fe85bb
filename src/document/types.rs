//! Core document types.
//!
//! Every position stored in an annotation is a character offset into the
//! display text (markup already stripped), never into the raw source.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Maximum number of stops in a gradient color tag.
pub const MAX_COLOR_STOPS: usize = 8;

/// Maximum accepted length (in characters) of a font tag name.
pub const MAX_FONT_NAME_LEN: usize = 63;

/// Character emitted into the display text for a horizontal rule line.
pub const RULE_SENTINEL: char = '\u{2500}';

/// Character emitted into the display text in place of an image.
pub const IMAGE_SENTINEL: char = '\u{FFFC}';

/// Marker text emitted for unordered and task list items.
pub const BULLET: &str = "• ";

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RRGGBB` color.
    pub fn from_hex(segment: &str) -> Result<Self, ColorTagError> {
        let digits = segment
            .strip_prefix('#')
            .ok_or_else(|| ColorTagError::MissingHash(segment.to_string()))?;
        if digits.len() != 6 {
            return Err(ColorTagError::BadLength(segment.to_string()));
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorTagError::BadHex(segment.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| ColorTagError::BadHex(segment.to_string()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Linear interpolation towards `other`; `t` is clamped to `0..=1`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| {
            let a = f32::from(a);
            let b = f32::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        };
        Self::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Why a `<color:...>` specification was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorTagError {
    #[error("color segment `{0}` does not start with '#'")]
    MissingHash(String),
    #[error("color segment `{0}` is not six hex digits long")]
    BadLength(String),
    #[error("color segment `{0}` contains a non-hex digit")]
    BadHex(String),
    #[error("gradient needs at least 2 stops, got {0}")]
    TooFewStops(usize),
    #[error("gradient allows at most {MAX_COLOR_STOPS} stops, got {0}")]
    TooManyStops(usize),
}

/// Between 2 and [`MAX_COLOR_STOPS`] gradient stops, stored inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorStops {
    colors: [Rgb; MAX_COLOR_STOPS],
    len: u8,
}

impl ColorStops {
    /// Parse an underscore separated list such as `#FF0000_#00FF00`.
    ///
    /// Does not allocate on success, so the annotation counter can use it
    /// to decide exactly which tags the parser will accept.
    pub fn parse(spec: &str) -> Result<Self, ColorTagError> {
        let mut colors = [Rgb::default(); MAX_COLOR_STOPS];
        let mut len = 0usize;
        for segment in spec.split('_') {
            if len == MAX_COLOR_STOPS {
                return Err(ColorTagError::TooManyStops(spec.split('_').count()));
            }
            colors[len] = Rgb::from_hex(segment.trim())?;
            len += 1;
        }
        if len < 2 {
            return Err(ColorTagError::TooFewStops(len));
        }
        Ok(Self {
            colors,
            len: len as u8,
        })
    }

    /// Build stops from a slice; `None` unless it holds 2..=8 colors.
    pub fn from_slice(stops: &[Rgb]) -> Option<Self> {
        if !(2..=MAX_COLOR_STOPS).contains(&stops.len()) {
            return None;
        }
        let mut colors = [Rgb::default(); MAX_COLOR_STOPS];
        colors[..stops.len()].copy_from_slice(stops);
        Some(Self {
            colors,
            len: stops.len() as u8,
        })
    }

    pub fn as_slice(&self) -> &[Rgb] {
        &self.colors[..usize::from(self.len)]
    }

    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false; kept for API symmetry with slices.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Serialize for ColorStops {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.as_slice())
    }
}

/// A point in panel pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pixel rectangle; `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub const fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    pub const fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    /// Grow left and right by `pad` pixels.
    #[must_use]
    pub const fn inflate_x(self, pad: i32) -> Self {
        Self::new(self.left - pad, self.top, self.right + pad, self.bottom)
    }
}

/// Common access to the `[start, end)` span of an annotation.
pub trait Annotated {
    fn start(&self) -> usize;
    fn end(&self) -> usize;

    fn covers(&self, pos: usize) -> bool {
        pos >= self.start() && pos < self.end()
    }
}

macro_rules! annotated {
    ($($ty:ty),* $(,)?) => {
        $(impl Annotated for $ty {
            fn start(&self) -> usize {
                self.start
            }

            fn end(&self) -> usize {
                self.end
            }
        })*
    };
}

/// Heading line segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// Heading level (1-6)
    pub level: u8,
    pub start: usize,
    pub end: usize,
}

/// Kind of an inline style span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleKind {
    Italic,
    Bold,
    BoldItalic,
    Code,
    Strikethrough,
}

impl StyleKind {
    pub const fn is_bold(self) -> bool {
        matches!(self, Self::Bold | Self::BoldItalic)
    }

    pub const fn is_italic(self) -> bool {
        matches!(self, Self::Italic | Self::BoldItalic)
    }

    /// Emphasis kind for a run of `n` asterisks.
    pub const fn from_delimiters(n: usize) -> Option<Self> {
        match n {
            1 => Some(Self::Italic),
            2 => Some(Self::Bold),
            3 => Some(Self::BoldItalic),
            _ => None,
        }
    }
}

/// Inline style span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Style {
    pub kind: StyleKind,
    pub start: usize,
    pub end: usize,
}

/// How a list item was introduced in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMarker {
    /// `-`, `*` or `+`
    Bullet,
    /// `N.`
    Ordered(u32),
    /// `- [ ]` or `- [x]`
    Checkbox,
}

/// List item line. `start` points at the marker text in the display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub start: usize,
    pub end: usize,
    /// Nesting level derived from leading spaces
    pub indent: usize,
    /// Completed todo (`- [x]`)
    pub checked: bool,
    pub marker: ListMarker,
}

impl ListItem {
    /// Number of display characters taken by the marker (`• ` or `N. `).
    pub fn marker_len(&self) -> usize {
        match self.marker {
            ListMarker::Bullet | ListMarker::Checkbox => BULLET.chars().count(),
            ListMarker::Ordered(n) => decimal_digits(n) + 2,
        }
    }

    pub const fn is_checkbox(&self) -> bool {
        matches!(self.marker, ListMarker::Checkbox)
    }
}

const fn decimal_digits(mut n: u32) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// GitHub-style alert kind of a blockquote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    #[default]
    Normal,
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AlertKind {
    const MARKERS: [(&'static str, Self); 5] = [
        ("NOTE", Self::Note),
        ("TIP", Self::Tip),
        ("IMPORTANT", Self::Important),
        ("WARNING", Self::Warning),
        ("CAUTION", Self::Caution),
    ];

    /// Match the name inside `[!NAME]`, ignoring ASCII case.
    pub fn from_marker(name: &str) -> Option<Self> {
        Self::MARKERS
            .iter()
            .find(|(marker, _)| marker.eq_ignore_ascii_case(name))
            .map(|(_, kind)| *kind)
    }

    /// Display label for the alert title.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Note => "Note",
            Self::Tip => "Tip",
            Self::Important => "Important",
            Self::Warning => "Warning",
            Self::Caution => "Caution",
        }
    }

    pub const fn is_alert(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Blockquote span, possibly covering several consecutive `>` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blockquote {
    pub start: usize,
    pub end: usize,
    pub alert: AlertKind,
}

/// Gradient color tag `<color:#c1_#c2[_...]>text</color>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorTag {
    pub start: usize,
    pub end: usize,
    pub stops: ColorStops,
}

impl ColorTag {
    pub const fn color_count(&self) -> usize {
        self.stops.len()
    }
}

/// Font override tag `<font:Name>text</font>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontTag {
    pub start: usize,
    pub end: usize,
    pub name: String,
}

/// Link `[text](url)`. `rect` is filled in during layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub text: String,
    pub url: String,
    pub start: usize,
    pub end: usize,
    pub rect: Rect,
}

/// Horizontal rule line. Covers the single sentinel character it emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub start: usize,
    pub end: usize,
}

/// Image `![alt](src)` or `![WxH](src)`, drawn in place of one
/// [`IMAGE_SENTINEL`] character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub src: String,
    /// Bracket text when it is not a size
    pub alt: String,
    /// Requested size in pixels; a missing side follows the aspect ratio
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub start: usize,
    pub end: usize,
}

impl Image {
    /// True for `http://` and `https://` sources, which are never fetched.
    pub fn is_remote(&self) -> bool {
        let scheme = |prefix: &str| {
            self.src
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        };
        scheme("http://") || scheme("https://")
    }
}

annotated!(Heading, Style, ListItem, Blockquote, ColorTag, FontTag, Link, Rule, Image);

/// Annotation category, used for offset lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Heading,
    Style,
    ListItem,
    Blockquote,
    ColorTag,
    FontTag,
    Link,
    Rule,
    Image,
}

/// Number of annotations of each kind a parse produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub headings: usize,
    pub styles: usize,
    pub list_items: usize,
    pub blockquotes: usize,
    pub color_tags: usize,
    pub font_tags: usize,
    pub links: usize,
    pub rules: usize,
    pub images: usize,
}

impl Counts {
    pub const fn total(&self) -> usize {
        self.headings
            + self.styles
            + self.list_items
            + self.blockquotes
            + self.color_tags
            + self.font_tags
            + self.links
            + self.rules
            + self.images
    }
}

/// All annotation arrays of one parse, each sorted by `start`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotations {
    pub headings: Vec<Heading>,
    pub styles: Vec<Style>,
    pub list_items: Vec<ListItem>,
    pub blockquotes: Vec<Blockquote>,
    pub color_tags: Vec<ColorTag>,
    pub font_tags: Vec<FontTag>,
    pub links: Vec<Link>,
    pub rules: Vec<Rule>,
    pub images: Vec<Image>,
}

impl Annotations {
    pub fn counts(&self) -> Counts {
        Counts {
            headings: self.headings.len(),
            styles: self.styles.len(),
            list_items: self.list_items.len(),
            blockquotes: self.blockquotes.len(),
            color_tags: self.color_tags.len(),
            font_tags: self.font_tags.len(),
            links: self.links.len(),
            rules: self.rules.len(),
            images: self.images.len(),
        }
    }

    /// Index of the annotation of `kind` covering display offset `offset`.
    ///
    /// Linear scan; documents carry few spans.
    pub fn annotation_at(&self, kind: AnnotationKind, offset: usize) -> Option<usize> {
        fn find<T: Annotated>(spans: &[T], offset: usize) -> Option<usize> {
            spans.iter().position(|span| span.covers(offset))
        }
        match kind {
            AnnotationKind::Heading => find(&self.headings, offset),
            AnnotationKind::Style => find(&self.styles, offset),
            AnnotationKind::ListItem => find(&self.list_items, offset),
            AnnotationKind::Blockquote => find(&self.blockquotes, offset),
            AnnotationKind::ColorTag => find(&self.color_tags, offset),
            AnnotationKind::FontTag => find(&self.font_tags, offset),
            AnnotationKind::Link => find(&self.links, offset),
            AnnotationKind::Rule => find(&self.rules, offset),
            AnnotationKind::Image => find(&self.images, offset),
        }
    }

    /// Zero every link rectangle ahead of a new layout.
    pub fn reset_link_rects(&mut self) {
        for link in &mut self.links {
            link.rect = Rect::ZERO;
        }
    }
}

/// A parsed document: display text plus its annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Text with all markup removed
    text: String,
    #[serde(skip)]
    char_len: usize,
    annotations: Annotations,
}

impl Document {
    pub(crate) fn from_parts(text: String, annotations: Annotations) -> Self {
        let char_len = text.chars().count();
        Self {
            text,
            char_len,
            annotations,
        }
    }

    /// Create an empty document.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The display text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the display text in characters.
    pub const fn char_len(&self) -> usize {
        self.char_len
    }

    /// Display lines, split only at `\n`.
    pub fn lines(&self) -> std::str::Split<'_, char> {
        self.text.split('\n')
    }

    pub const fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub(crate) const fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    pub fn headings(&self) -> &[Heading] {
        &self.annotations.headings
    }

    pub fn styles(&self) -> &[Style] {
        &self.annotations.styles
    }

    pub fn list_items(&self) -> &[ListItem] {
        &self.annotations.list_items
    }

    pub fn blockquotes(&self) -> &[Blockquote] {
        &self.annotations.blockquotes
    }

    pub fn color_tags(&self) -> &[ColorTag] {
        &self.annotations.color_tags
    }

    pub fn font_tags(&self) -> &[FontTag] {
        &self.annotations.font_tags
    }

    pub fn links(&self) -> &[Link] {
        &self.annotations.links
    }

    pub fn rules(&self) -> &[Rule] {
        &self.annotations.rules
    }

    pub fn images(&self) -> &[Image] {
        &self.annotations.images
    }

    /// Split into display text and annotations.
    pub fn into_parts(self) -> (String, Annotations) {
        (self.text, self.annotations)
    }
}
