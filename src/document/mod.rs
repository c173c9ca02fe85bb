//! Markup parsing.
//!
//! This module handles:
//! - Counting annotations ahead of a parse (exact, allocation-free)
//! - Stripping markup into display text
//! - Recording annotation spans (headings, styles, lists, quotes, tags, links, rules,
//!   images)

mod counter;
mod parser;
mod syntax;
mod types;
mod walk;

pub use counter::{count, count_with};
pub use parser::{DEFAULT_INDENT_SPACES, ParseError, ParseOptions, parse, parse_with};
pub use types::{
    AlertKind, Annotated, AnnotationKind, Annotations, BULLET, Blockquote, ColorStops,
    ColorTag, ColorTagError, Counts, Document, FontTag, Heading, IMAGE_SENTINEL, Image, Link,
    ListItem, ListMarker, MAX_COLOR_STOPS, MAX_FONT_NAME_LEN, Point, RULE_SENTINEL, Rect, Rgb,
    Rule, Style, StyleKind,
};

pub(crate) use counter::task_offsets;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_roundtrip() {
        let doc = Document::parse("- [ ] *x*").unwrap();
        assert_eq!(count("- [ ] *x*"), doc.annotations().counts());
        let (text, annotations) = doc.into_parts();
        assert_eq!(text, "• x");
        assert_eq!(annotations.styles[0].kind, StyleKind::Italic);
    }
}
