//! Markup parsing.
//!
//! Two passes over the source: [`counter`](super::counter) sizes every
//! output buffer, then the walker runs again and fills them. Reservation
//! failure aborts the parse with [`ParseError::Allocation`].

use std::collections::TryReserveError;
use std::fmt::{self, Write as _};

use thiserror::Error;

use super::counter::{self, Tally};
use super::types::{
    AlertKind, Annotations, Blockquote, ColorStops, ColorTag, Counts, Document, FontTag, Heading,
    Image, Link, ListItem, ListMarker, Rect, Rule, Style, StyleKind,
};
use super::walk::{ImageRef, Mark, Sink, walk};

/// Default number of leading spaces per list nesting level.
pub const DEFAULT_INDENT_SPACES: usize = 2;

/// Options affecting how source text is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Leading spaces per list nesting level
    pub indent_spaces: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            indent_spaces: DEFAULT_INDENT_SPACES,
        }
    }
}

/// Hard parse failure. Grammar problems never produce one.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to reserve {requested} entries for {kind}")]
    Allocation {
        kind: &'static str,
        requested: usize,
        #[source]
        source: TryReserveError,
    },
}

impl Document {
    /// Parse markup into display text and annotations.
    ///
    /// # Example
    ///
    /// ```
    /// use markpane::document::Document;
    ///
    /// let doc = Document::parse("# Hello\n**world**").unwrap();
    /// assert_eq!(doc.text(), "Hello\nworld");
    /// assert_eq!(doc.headings().len(), 1);
    /// ```
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        parse(source)
    }

    pub fn parse_with(source: &str, options: &ParseOptions) -> Result<Self, ParseError> {
        parse_with(source, options)
    }
}

/// Parse markup with default options.
pub fn parse(source: &str) -> Result<Document, ParseError> {
    parse_with(source, &ParseOptions::default())
}

/// Parse markup into a [`Document`].
pub fn parse_with(source: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    let tally = counter::tally(source, options);
    tracing::trace!(counts = ?tally.counts, text_bytes = tally.text.bytes, "parse sized");

    let mut sink = EmitSink::with_capacity(&tally)?;
    walk(source, &mut sink, options);
    debug_assert_eq!(sink.annotations.counts(), tally.counts);
    debug_assert_eq!(sink.text.len(), tally.text.bytes);

    Ok(Document::from_parts(sink.text, sink.annotations))
}

fn reserve<T>(kind: &'static str, requested: usize) -> Result<Vec<T>, ParseError> {
    let mut items = Vec::new();
    items
        .try_reserve_exact(requested)
        .map_err(|source| ParseError::Allocation {
            kind,
            requested,
            source,
        })?;
    Ok(items)
}

fn push<T>(items: &mut Vec<T>, expected: usize, item: T) {
    debug_assert!(
        items.len() < expected,
        "annotation count exceeded its pre-counted size of {expected}"
    );
    items.push(item);
}

struct EmitSink {
    text: String,
    chars: usize,
    expected: Counts,
    annotations: Annotations,
}

impl EmitSink {
    fn with_capacity(tally: &Tally) -> Result<Self, ParseError> {
        let counts = tally.counts;
        let mut text = String::new();
        text.try_reserve_exact(tally.text.bytes)
            .map_err(|source| ParseError::Allocation {
                kind: "display text bytes",
                requested: tally.text.bytes,
                source,
            })?;
        Ok(Self {
            text,
            chars: 0,
            expected: counts,
            annotations: Annotations {
                headings: reserve("headings", counts.headings)?,
                styles: reserve("styles", counts.styles)?,
                list_items: reserve("list items", counts.list_items)?,
                blockquotes: reserve("blockquotes", counts.blockquotes)?,
                color_tags: reserve("color tags", counts.color_tags)?,
                font_tags: reserve("font tags", counts.font_tags)?,
                links: reserve("links", counts.links)?,
                rules: reserve("rules", counts.rules)?,
                images: reserve("images", counts.images)?,
            },
        })
    }
}

impl Sink for EmitSink {
    fn mark(&self) -> Mark {
        Mark {
            chars: self.chars,
            bytes: self.text.len(),
        }
    }

    fn push_str(&mut self, text: &str) {
        self.chars += text.chars().count();
        self.text.push_str(text);
    }

    fn push_number(&mut self, n: u32) {
        let before = self.text.len();
        // Writing into a String cannot fail.
        let _ = write!(self.text, "{n}");
        self.chars += self.text.len() - before;
    }

    fn heading(&mut self, level: u8, start: Mark) {
        let heading = Heading {
            level,
            start: start.chars,
            end: self.chars,
        };
        push(&mut self.annotations.headings, self.expected.headings, heading);
    }

    fn style(&mut self, kind: StyleKind, start: Mark) {
        let style = Style {
            kind,
            start: start.chars,
            end: self.chars,
        };
        push(&mut self.annotations.styles, self.expected.styles, style);
    }

    fn list_item(&mut self, indent: usize, marker: ListMarker, checked: bool, start: Mark) {
        let item = ListItem {
            start: start.chars,
            end: self.chars,
            indent,
            checked,
            marker,
        };
        push(&mut self.annotations.list_items, self.expected.list_items, item);
    }

    fn blockquote(&mut self, alert: AlertKind, start: Mark) {
        let quote = Blockquote {
            start: start.chars,
            end: self.chars,
            alert,
        };
        push(&mut self.annotations.blockquotes, self.expected.blockquotes, quote);
    }

    fn color_tag(&mut self, stops: &ColorStops, start: Mark) {
        let tag = ColorTag {
            start: start.chars,
            end: self.chars,
            stops: *stops,
        };
        push(&mut self.annotations.color_tags, self.expected.color_tags, tag);
    }

    fn font_tag(&mut self, name: &str, start: Mark) {
        let tag = FontTag {
            start: start.chars,
            end: self.chars,
            name: name.to_string(),
        };
        push(&mut self.annotations.font_tags, self.expected.font_tags, tag);
    }

    fn link(&mut self, url: &str, start: Mark) {
        let link = Link {
            text: self.text[start.bytes..].to_string(),
            url: url.to_string(),
            start: start.chars,
            end: self.chars,
            rect: Rect::ZERO,
        };
        push(&mut self.annotations.links, self.expected.links, link);
    }

    fn rule(&mut self, start: Mark) {
        let rule = Rule {
            start: start.chars,
            end: self.chars,
        };
        push(&mut self.annotations.rules, self.expected.rules, rule);
    }

    fn image(&mut self, image: &ImageRef<'_>, start: Mark) {
        let image = Image {
            src: image.src.to_string(),
            alt: image.alt.to_string(),
            width: image.width,
            height: image.height,
            start: start.chars,
            end: self.chars,
        };
        push(&mut self.annotations.images, self.expected.images, image);
    }

    fn rejected(&mut self, source: &str, reason: &dyn fmt::Display) {
        tracing::debug!(%reason, source, "tag rejected, keeping it as text");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::types::{AlertKind, IMAGE_SENTINEL, RULE_SENTINEL};

    fn doc(src: &str) -> Document {
        parse(src).expect("parse")
    }

    #[test]
    fn test_parse_plain_text() {
        let d = doc("hello world");
        assert_eq!(d.text(), "hello world");
        assert_eq!(d.annotations().counts().total(), 0);
    }

    #[test]
    fn test_parse_heading() {
        let d = doc("## Sub heading\nbody");
        assert_eq!(d.text(), "Sub heading\nbody");
        assert_eq!(
            d.headings(),
            &[Heading {
                level: 2,
                start: 0,
                end: 11
            }]
        );
    }

    #[test]
    fn test_parse_emphasis_kinds() {
        let d = doc("*a* **b** ***c*** ~~d~~ `e`");
        assert_eq!(d.text(), "a b c d e");
        let kinds: Vec<_> = d.styles().iter().map(|s| (s.kind, s.start, s.end)).collect();
        assert_eq!(
            kinds,
            vec![
                (StyleKind::Italic, 0, 1),
                (StyleKind::Bold, 2, 3),
                (StyleKind::BoldItalic, 4, 5),
                (StyleKind::Strikethrough, 6, 7),
                (StyleKind::Code, 8, 9),
            ]
        );
    }

    #[test]
    fn test_parse_bold_italic_span() {
        let d = doc("***bold italic***");
        assert_eq!(d.text(), "bold italic");
        assert_eq!(
            d.styles(),
            &[Style {
                kind: StyleKind::BoldItalic,
                start: 0,
                end: 11
            }]
        );
    }

    #[test]
    fn test_parse_unterminated_emphasis_is_literal() {
        let d = doc("**open and *also");
        assert_eq!(d.text(), "**open and *also");
        assert!(d.styles().is_empty());
    }

    #[test]
    fn test_parse_code_span_is_verbatim() {
        let d = doc("`**not bold**`");
        assert_eq!(d.text(), "**not bold**");
        assert_eq!(d.styles().len(), 1);
        assert_eq!(d.styles()[0].kind, StyleKind::Code);
    }

    #[test]
    fn test_parse_lists() {
        let d = doc("- a\n  - b\n3. c\n- [x] d\n- [ ] e");
        assert_eq!(d.text(), "• a\n• b\n3. c\n• d\n• e");
        let items = d.list_items();
        assert_eq!(items.len(), 5);
        assert_eq!(items[1].indent, 1);
        assert_eq!(items[2].marker, ListMarker::Ordered(3));
        assert_eq!((items[2].start, items[2].end), (8, 12));
        assert!(items[3].checked);
        assert_eq!(items[3].marker, ListMarker::Checkbox);
        assert!(!items[4].checked);
    }

    #[test]
    fn test_parse_custom_indent_unit() {
        let options = ParseOptions { indent_spaces: 4 };
        let d = parse_with("    - deep", &options).unwrap();
        assert_eq!(d.list_items()[0].indent, 1);
    }

    #[test]
    fn test_parse_alert_block() {
        let d = doc("# Title\n> [!WARNING]\nBe careful\n- [x] done\n- [ ] todo");
        assert_eq!(d.text(), "Title\nBe careful\n• done\n• todo");
        assert_eq!(d.headings().len(), 1);
        assert_eq!(
            d.blockquotes(),
            &[Blockquote {
                start: 6,
                end: 16,
                alert: AlertKind::Warning
            }]
        );
        assert!(d.list_items()[0].checked);
        assert!(!d.list_items()[1].checked);
    }

    #[test]
    fn test_parse_alert_with_inline_title() {
        let d = doc("> [!tip] Use this\n> and that");
        assert_eq!(d.text(), "Use this\nand that");
        assert_eq!(d.blockquotes()[0].alert, AlertKind::Tip);
        assert_eq!((d.blockquotes()[0].start, d.blockquotes()[0].end), (0, 17));
    }

    #[test]
    fn test_parse_plain_blockquote_spans_lines() {
        let d = doc("intro\n> one\n> two\nafter");
        assert_eq!(d.text(), "intro\none\ntwo\nafter");
        let quote = &d.blockquotes()[0];
        assert_eq!(quote.alert, AlertKind::Normal);
        assert_eq!((quote.start, quote.end), (6, 13));
    }

    #[test]
    fn test_parse_link() {
        let d = doc("[Catime](https://example.com)");
        assert_eq!(d.text(), "Catime");
        let link = &d.links()[0];
        assert_eq!(link.text, "Catime");
        assert_eq!(link.url, "https://example.com");
        assert_eq!((link.start, link.end), (0, 6));
        assert_eq!(link.rect, Rect::ZERO);
    }

    #[test]
    fn test_parse_link_text_is_stripped() {
        let d = doc("see [**bold** site](u) now");
        assert_eq!(d.text(), "see bold site now");
        assert_eq!(d.links()[0].text, "bold site");
        assert_eq!(d.styles()[0].start, 4);
    }

    #[test]
    fn test_parse_empty_url_is_plain_text() {
        let d = doc("[label]() tail");
        assert_eq!(d.text(), "label tail");
        assert!(d.links().is_empty());
    }

    #[test]
    fn test_parse_color_tag() {
        let d = doc("<color:#FF0000_#00FF00_#0000FF>Hi</color>");
        assert_eq!(d.text(), "Hi");
        let tag = &d.color_tags()[0];
        assert_eq!(tag.color_count(), 3);
        assert_eq!((tag.start, tag.end), (0, 2));
    }

    #[test]
    fn test_parse_malformed_color_tag_is_literal() {
        let src = "<color:#ZZZZZZ>broken</color>";
        let d = doc(src);
        assert_eq!(d.text(), src);
        assert!(d.color_tags().is_empty());
    }

    #[test]
    fn test_parse_color_tag_suppresses_code() {
        let d = doc("<color:#FF0000_#0000FF>a `b`</color>");
        assert_eq!(d.text(), "a `b`");
        assert!(d.styles().is_empty());
    }

    #[test]
    fn test_parse_font_tag() {
        let d = doc("x <font:Fira Code>mono</font>");
        assert_eq!(d.text(), "x mono");
        assert_eq!(d.font_tags()[0].name, "Fira Code");
        assert_eq!(d.font_tags()[0].start, 2);
    }

    #[test]
    fn test_parse_rule() {
        let d = doc("above\n---\nbelow");
        assert_eq!(d.text(), format!("above\n{RULE_SENTINEL}\nbelow"));
        assert_eq!(d.rules(), &[Rule { start: 6, end: 7 }]);
    }

    #[test]
    fn test_literal_rule_character_is_not_a_rule() {
        let d = doc("a\n# \u{2500}\n\u{2500}\n[\u{2500}](u)");
        assert_eq!(
            d.text(),
            format!("a\n{RULE_SENTINEL}\n{RULE_SENTINEL}\n{RULE_SENTINEL}")
        );
        assert!(d.rules().is_empty());
        assert_eq!(d.headings()[0].start, 2);
        assert_eq!(d.links()[0].text, "\u{2500}");
    }

    #[test]
    fn test_parse_image_with_size() {
        let d = doc("logo ![64x32](img/logo.png) end");
        assert_eq!(d.text(), format!("logo {IMAGE_SENTINEL} end"));
        assert!(d.links().is_empty());
        assert_eq!(
            d.images(),
            &[Image {
                src: "img/logo.png".to_string(),
                alt: String::new(),
                width: Some(64),
                height: Some(32),
                start: 5,
                end: 6,
            }]
        );
    }

    #[test]
    fn test_parse_image_with_alt_text() {
        let d = doc("![company logo](https://x.io/logo.png)");
        let image = &d.images()[0];
        assert_eq!(image.alt, "company logo");
        assert_eq!((image.width, image.height), (None, None));
        assert!(image.is_remote());
    }

    #[test]
    fn test_image_without_source_falls_back_to_text() {
        let d = doc("![alt]() [x](u)");
        assert_eq!(d.text(), "!alt x");
        assert!(d.images().is_empty());
        assert_eq!(d.links().len(), 1);
    }

    #[test]
    fn test_image_inside_link_text_stays_literal() {
        let d = doc("[![a](b.png)](u)");
        assert!(d.images().is_empty());
        assert_eq!(d.links()[0].text, "![a");
    }

    #[test]
    fn test_reserve_failure_is_allocation_error() {
        let err = reserve::<u8>("styles", usize::MAX).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Allocation {
                kind: "styles",
                requested: usize::MAX,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            format!("failed to reserve {} entries for styles", usize::MAX)
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_parse_fenced_code() {
        let d = doc("```rust\nfn x() {}\n\n```\nafter");
        assert_eq!(d.text(), "fn x() {}\n\nafter");
        assert_eq!(d.styles().len(), 1);
        assert_eq!(d.styles()[0].kind, StyleKind::Code);
        assert_eq!((d.styles()[0].start, d.styles()[0].end), (0, 9));
    }

    #[test]
    fn test_parse_crlf_and_trailing_newline() {
        let d = doc("# A\r\nb\r\n");
        assert_eq!(d.text(), "A\nb");
        assert_eq!(d.headings()[0].end, 1);
    }

    #[test]
    fn test_parse_positions_are_chars() {
        let d = doc("héllo **wörld**");
        assert_eq!(d.styles()[0].start, 6);
        assert_eq!(d.styles()[0].end, 11);
        assert_eq!(d.char_len(), 11);
    }

    #[test]
    fn test_inline_never_crosses_lines() {
        let d = doc("**a\nb**");
        assert_eq!(d.text(), "**a\nb**");
        assert!(d.styles().is_empty());
    }

    #[test]
    fn test_parse_matches_count() {
        let src = "# H\n> [!NOTE]\n> *n*\n- [ ] [x](y) ![i](i.png)\n---\n\
                   <font:A><color:#000000_#FFFFFF>c</color></font>";
        assert_eq!(doc(src).annotations().counts(), counter::count(src));
    }
}
