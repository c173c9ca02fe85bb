//! Theme colors and per-character style resolution.
//!
//! [`StyleResolver`] walks the sorted annotation arrays with one forward-only
//! cursor per category, so resolving every character of a document costs
//! O(characters + annotations).

use crate::config::ThemeMode;
use crate::document::{
    AlertKind, Annotated, Blockquote, ColorTag, Document, FontTag, Heading, Image, Link, ListItem,
    Rgb, Rule, Style, StyleKind,
};

use super::glyph::FaceKey;

/// Size multiplier for heading levels 1 through 6.
pub const HEADING_SCALES: [f32; 6] = [1.50, 1.35, 1.20, 1.10, 1.00, 0.90];

/// Scale for a heading level; 1.0 outside 1..=6.
pub fn heading_scale(level: u8) -> f32 {
    HEADING_SCALES
        .get(usize::from(level).wrapping_sub(1))
        .copied()
        .unwrap_or(1.0)
}

/// Colors used when painting a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Default text color
    pub text: Rgb,
    /// Inline and fenced code
    pub code: Rgb,
    /// Link text
    pub link: Rgb,
    /// Bar beside plain blockquotes
    pub quote_bar: Rgb,
    /// Horizontal rules
    pub rule: Rgb,
    /// Checkbox outline and fill
    pub checkbox: Rgb,
    /// Panel fill; `None` leaves the canvas transparent
    pub background: Option<Rgb>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text: Rgb::new(240, 240, 240),
            code: Rgb::new(150, 150, 150),
            link: Rgb::new(88, 166, 255),
            quote_bar: Rgb::new(100, 100, 100),
            rule: Rgb::new(120, 120, 120),
            checkbox: Rgb::new(240, 240, 240),
            background: None,
        }
    }
}

impl Theme {
    /// Theme for dark backdrops (light text).
    pub fn dark() -> Self {
        Self::default()
    }

    /// Theme for light backdrops.
    pub fn light() -> Self {
        Self {
            text: Rgb::new(31, 35, 40),
            code: Rgb::new(100, 100, 100),
            link: Rgb::new(9, 105, 218),
            quote_bar: Rgb::new(100, 100, 100),
            rule: Rgb::new(160, 160, 160),
            checkbox: Rgb::new(31, 35, 40),
            background: Some(Rgb::new(255, 255, 255)),
        }
    }

    /// Resolve a theme mode. `Auto` follows `COLORFGBG` when it names a
    /// light background and falls back to dark.
    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self::light(),
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Auto => {
                if background_is_light(std::env::var("COLORFGBG").ok().as_deref()) {
                    Self::light()
                } else {
                    Self::dark()
                }
            }
        }
    }

    /// Bar and title color of an alert blockquote.
    pub const fn alert_color(&self, alert: AlertKind) -> Rgb {
        match alert {
            AlertKind::Normal => self.quote_bar,
            AlertKind::Note => Rgb::new(31, 111, 235),
            AlertKind::Tip => Rgb::new(26, 127, 55),
            AlertKind::Important => Rgb::new(130, 80, 223),
            AlertKind::Warning => Rgb::new(154, 103, 0),
            AlertKind::Caution => Rgb::new(207, 34, 46),
        }
    }
}

// `COLORFGBG` is "fg;bg" (sometimes "fg;default;bg"); 7 and 15 are white.
fn background_is_light(colorfgbg: Option<&str>) -> bool {
    colorfgbg
        .and_then(|value| value.rsplit(';').next())
        .and_then(|bg| bg.trim().parse::<u8>().ok())
        .is_some_and(|bg| bg == 7 || bg == 15)
}

/// How a glyph is colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    Solid(Rgb),
    /// Gradient of the color tag with this index
    Gradient(usize),
}

/// Everything that applies to one character position.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveStyle<'d> {
    pub heading: Option<&'d Heading>,
    pub style: Option<&'d Style>,
    pub list_item: Option<&'d ListItem>,
    pub blockquote: Option<&'d Blockquote>,
    pub color_tag: Option<(usize, &'d ColorTag)>,
    pub font_tag: Option<(usize, &'d FontTag)>,
    pub link: Option<(usize, &'d Link)>,
    pub rule: Option<&'d Rule>,
    pub image: Option<(usize, &'d Image)>,
    /// Set on the first line of an alert blockquote
    pub alert_title: Option<AlertKind>,
    /// The position sits in a task item's text after its marker, and the task is done
    pub completed_todo: bool,
}

impl ActiveStyle<'_> {
    fn kind(&self) -> Option<StyleKind> {
        self.style.map(|s| s.kind)
    }

    pub fn is_code(&self) -> bool {
        self.kind() == Some(StyleKind::Code)
    }

    pub fn is_bold(&self) -> bool {
        self.heading.is_some()
            || self.alert_title.is_some()
            || self.kind().is_some_and(StyleKind::is_bold)
    }

    pub fn is_italic(&self) -> bool {
        self.kind().is_some_and(StyleKind::is_italic)
    }

    pub fn is_strikethrough(&self) -> bool {
        self.completed_todo || self.kind() == Some(StyleKind::Strikethrough)
    }

    /// Font size multiplier.
    pub fn scale(&self) -> f32 {
        self.heading.map_or(1.0, |h| heading_scale(h.level))
    }

    pub fn face(&self) -> FaceKey {
        if self.is_code() {
            FaceKey::Monospace
        } else if let Some((index, _)) = self.font_tag {
            FaceKey::Tag(index)
        } else {
            FaceKey::Default
        }
    }

    /// Gradient (outside code) beats code gray, then link accent, then the
    /// alert title color, then the theme's text color.
    pub fn paint(&self, theme: &Theme) -> Paint {
        if let Some((index, _)) = self.color_tag
            && !self.is_code()
        {
            return Paint::Gradient(index);
        }
        if self.is_code() {
            Paint::Solid(theme.code)
        } else if self.link.is_some() {
            Paint::Solid(theme.link)
        } else if let Some(alert) = self.alert_title {
            Paint::Solid(theme.alert_color(alert))
        } else {
            Paint::Solid(theme.text)
        }
    }
}

/// Forward-only style lookup over one document.
#[derive(Debug, Clone)]
pub struct StyleResolver<'d> {
    doc: &'d Document,
    pos: usize,
    line_start: usize,
    headings: usize,
    styles: usize,
    list_items: usize,
    blockquotes: usize,
    color_tags: usize,
    font_tags: usize,
    links: usize,
    rules: usize,
    images: usize,
}

// Skip spans that end at or before `pos`; the next one is active if it has begun.
fn advance<T: Annotated>(spans: &[T], cursor: &mut usize, pos: usize) -> Option<usize> {
    while *cursor < spans.len() && spans[*cursor].end() <= pos {
        *cursor += 1;
    }
    spans
        .get(*cursor)
        .filter(|span| span.start() <= pos)
        .map(|_| *cursor)
}

impl<'d> StyleResolver<'d> {
    pub const fn new(doc: &'d Document) -> Self {
        Self {
            doc,
            pos: 0,
            line_start: 0,
            headings: 0,
            styles: 0,
            list_items: 0,
            blockquotes: 0,
            color_tags: 0,
            font_tags: 0,
            links: 0,
            rules: 0,
            images: 0,
        }
    }

    /// Mark the character offset where the current display line begins.
    pub fn start_line(&mut self, line_start: usize) {
        debug_assert!(line_start >= self.line_start, "resolver rewound");
        self.line_start = line_start;
    }

    /// Styles active at `pos`. Positions must never decrease.
    pub fn at(&mut self, pos: usize) -> ActiveStyle<'d> {
        debug_assert!(pos >= self.pos, "resolver rewound from {} to {pos}", self.pos);
        self.pos = pos;
        let a = self.doc.annotations();

        let heading = advance(&a.headings, &mut self.headings, pos).map(|i| &a.headings[i]);
        let style = advance(&a.styles, &mut self.styles, pos).map(|i| &a.styles[i]);
        let list_item =
            advance(&a.list_items, &mut self.list_items, pos).map(|i| &a.list_items[i]);
        let blockquote =
            advance(&a.blockquotes, &mut self.blockquotes, pos).map(|i| &a.blockquotes[i]);
        let color_tag =
            advance(&a.color_tags, &mut self.color_tags, pos).map(|i| (i, &a.color_tags[i]));
        let font_tag =
            advance(&a.font_tags, &mut self.font_tags, pos).map(|i| (i, &a.font_tags[i]));
        let link = advance(&a.links, &mut self.links, pos).map(|i| (i, &a.links[i]));
        let rule = advance(&a.rules, &mut self.rules, pos).map(|i| &a.rules[i]);
        let image = advance(&a.images, &mut self.images, pos).map(|i| (i, &a.images[i]));

        let alert_title = blockquote
            .filter(|q| q.alert.is_alert() && q.start == self.line_start)
            .map(|q| q.alert);
        let completed_todo = list_item
            .is_some_and(|item| item.checked && pos >= item.start + item.marker_len());

        ActiveStyle {
            heading,
            style,
            list_item,
            blockquote,
            color_tag,
            font_tag,
            link,
            rule,
            image,
            alert_title,
            completed_todo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(src: &str) -> Document {
        Document::parse(src).unwrap()
    }

    #[test]
    fn test_heading_scales() {
        assert!((heading_scale(1) - 1.5).abs() < f32::EPSILON);
        assert!((heading_scale(6) - 0.9).abs() < f32::EPSILON);
        assert!((heading_scale(0) - 1.0).abs() < f32::EPSILON);
        assert!((heading_scale(7) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_resolver_walks_styles_forward() {
        let d = doc("a **b** c");
        let mut resolver = StyleResolver::new(&d);
        assert!(!resolver.at(0).is_bold());
        assert!(resolver.at(2).is_bold());
        assert!(!resolver.at(3).is_bold());
    }

    #[test]
    fn test_heading_is_bold_and_scaled() {
        let d = doc("# Big\nsmall");
        let mut resolver = StyleResolver::new(&d);
        let style = resolver.at(1);
        assert!(style.is_bold());
        assert!((style.scale() - 1.5).abs() < f32::EPSILON);
        let style = resolver.at(7);
        assert!(!style.is_bold());
        assert!((style.scale() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_color_precedence() {
        let theme = Theme::light();
        let d = doc("`c` [l](u) <color:#FF0000_#0000FF>g</color> t");
        let mut resolver = StyleResolver::new(&d);
        assert_eq!(resolver.at(0).paint(&theme), Paint::Solid(theme.code));
        assert_eq!(resolver.at(2).paint(&theme), Paint::Solid(theme.link));
        assert_eq!(resolver.at(4).paint(&theme), Paint::Gradient(0));
        assert_eq!(resolver.at(6).paint(&theme), Paint::Solid(theme.text));
    }

    #[test]
    fn test_gradient_over_link() {
        let theme = Theme::dark();
        let d = doc("[<color:#FF0000_#0000FF>x</color>](u)");
        let mut resolver = StyleResolver::new(&d);
        assert_eq!(resolver.at(0).paint(&theme), Paint::Gradient(0));
    }

    #[test]
    fn test_alert_title_line_only() {
        let theme = Theme::dark();
        let d = doc("> [!NOTE]\n> first\n> second");
        let mut resolver = StyleResolver::new(&d);
        resolver.start_line(0);
        let title = resolver.at(0);
        assert_eq!(title.alert_title, Some(AlertKind::Note));
        assert!(title.is_bold());
        assert_eq!(
            title.paint(&theme),
            Paint::Solid(theme.alert_color(AlertKind::Note))
        );
        resolver.start_line(6);
        let body = resolver.at(6);
        assert!(body.blockquote.is_some());
        assert_eq!(body.alert_title, None);
        assert!(!body.is_bold());
    }

    #[test]
    fn test_completed_todo_strikes_text_not_marker() {
        let d = doc("- [x] done");
        let mut resolver = StyleResolver::new(&d);
        assert!(!resolver.at(0).is_strikethrough());
        assert!(!resolver.at(1).is_strikethrough());
        assert!(resolver.at(2).is_strikethrough());
    }

    #[test]
    fn test_rules_and_images_come_from_annotations() {
        let d = doc("---\n\u{2500}\n![i](a.png)");
        let mut resolver = StyleResolver::new(&d);
        assert!(resolver.at(0).rule.is_some());
        assert!(resolver.at(2).rule.is_none());
        let image = resolver.at(4).image.map(|(i, image)| (i, image.src.as_str()));
        assert_eq!(image, Some((0, "a.png")));
    }

    #[test]
    fn test_faces() {
        let d = doc("<font:Serif>a `b`</font> c");
        let mut resolver = StyleResolver::new(&d);
        assert_eq!(resolver.at(0).face(), FaceKey::Tag(0));
        assert_eq!(resolver.at(2).face(), FaceKey::Monospace);
        assert_eq!(resolver.at(4).face(), FaceKey::Default);
    }

    #[test]
    fn test_background_detection() {
        assert!(background_is_light(Some("0;15")));
        assert!(background_is_light(Some("0;default;7")));
        assert!(!background_is_light(Some("15;0")));
        assert!(!background_is_light(None));
    }
}
