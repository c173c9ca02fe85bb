//! Allocation-free recognizers for the markup grammar.
//!
//! The counter and the parser drive the same walker, which calls into these
//! functions, so every construct is recognized identically in both passes.
//! All delimiters are ASCII, so byte offsets returned here always fall on
//! character boundaries.

use std::ops::Range;

use super::types::{AlertKind, ListMarker, MAX_FONT_NAME_LEN, StyleKind};

pub(crate) const COLOR_OPEN: &str = "<color:";
pub(crate) const COLOR_CLOSE: &str = "</color>";
pub(crate) const FONT_OPEN: &str = "<font:";
pub(crate) const FONT_CLOSE: &str = "</font>";

/// A code fence line (```` ``` ````, optionally indented).
pub(crate) fn is_fence(line: &str) -> bool {
    line.trim_start_matches(' ').starts_with("```")
}

/// A line made only of 3+ identical `-`, `*` or `_`, spaces allowed between.
pub(crate) fn is_rule(line: &str) -> bool {
    let trimmed = line.trim();
    let marker = match trimmed.bytes().next() {
        Some(b @ (b'-' | b'*' | b'_')) => b,
        _ => return false,
    };
    let mut count = 0;
    for b in trimmed.bytes() {
        if b == marker {
            count += 1;
        } else if b != b' ' {
            return false;
        }
    }
    count >= 3
}

/// `#{1,6} ` prefix; returns the level and the heading text.
pub(crate) fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    line[level..]
        .strip_prefix(' ')
        .map(|content| (level as u8, content))
}

/// A recognized list item line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListLine<'a> {
    pub indent: usize,
    pub marker: ListMarker,
    pub checked: bool,
    /// Byte offset of the `[` of a task marker within the line
    pub task_at: Option<usize>,
    pub content: &'a str,
}

pub(crate) fn list_item(line: &str, indent_spaces: usize) -> Option<ListLine<'_>> {
    let spaces = line.bytes().take_while(|&b| b == b' ').count();
    let rest = &line[spaces..];
    let indent = spaces / indent_spaces.max(1);
    match rest.bytes().next()? {
        b'-' | b'*' | b'+' => {
            let content = rest[1..].strip_prefix(' ')?;
            Some(match task_marker(content) {
                Some((checked, content)) => ListLine {
                    indent,
                    marker: ListMarker::Checkbox,
                    checked,
                    task_at: Some(spaces + 2),
                    content,
                },
                None => ListLine {
                    indent,
                    marker: ListMarker::Bullet,
                    checked: false,
                    task_at: None,
                    content,
                },
            })
        }
        b'0'..=b'9' => {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 9 {
                return None;
            }
            let content = rest[digits..].strip_prefix(". ")?;
            let number = rest[..digits].parse().ok()?;
            Some(ListLine {
                indent,
                marker: ListMarker::Ordered(number),
                checked: false,
                task_at: None,
                content,
            })
        }
        _ => None,
    }
}

fn task_marker(content: &str) -> Option<(bool, &str)> {
    let checked = match content.get(..3)? {
        "[ ]" => false,
        "[x]" | "[X]" => true,
        _ => return None,
    };
    let rest = &content[3..];
    if rest.is_empty() {
        return Some((checked, rest));
    }
    rest.strip_prefix(' ').map(|rest| (checked, rest))
}

/// `>` prefix with one optional space; returns the quoted content.
pub(crate) fn blockquote(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// `[!KIND]` at the start of quoted content; returns the kind and what follows.
pub(crate) fn alert_marker(content: &str) -> Option<(AlertKind, &str)> {
    let inner = content.strip_prefix("[!")?;
    let close = inner.find(']')?;
    let kind = AlertKind::from_marker(&inner[..close])?;
    Some((kind, &inner[close + 1..]))
}

/// An inline construct with delimiters on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Delimited {
    pub inner: Range<usize>,
    pub end: usize,
}

pub(crate) fn code_span(line: &str, at: usize) -> Option<Delimited> {
    let open = at + 1;
    let close = open + line[open..].find('`')?;
    (close > open).then_some(Delimited {
        inner: open..close,
        end: close + 1,
    })
}

pub(crate) fn strikethrough(line: &str, at: usize) -> Option<Delimited> {
    if !line[at..].starts_with("~~") {
        return None;
    }
    let open = at + 2;
    let close = open + line[open..].find("~~")?;
    (close > open).then_some(Delimited {
        inner: open..close,
        end: close + 2,
    })
}

/// Length of the run of `*` starting at `at`.
pub(crate) fn star_run(line: &str, at: usize) -> usize {
    line[at..].bytes().take_while(|&b| b == b'*').count()
}

/// `*x*`, `**x**` or `***x***`, longest delimiter first.
pub(crate) fn emphasis(line: &str, at: usize) -> Option<(StyleKind, Delimited)> {
    let run = star_run(line, at);
    if run > 3 {
        return None;
    }
    match line.as_bytes().get(at + run) {
        None | Some(b' ' | b'\t') => return None,
        Some(_) => {}
    }
    (1..=run).rev().find_map(|n| {
        let open = at + n;
        let delimiter = &"***"[..n];
        let from = open + line[open..].chars().next()?.len_utf8();
        let close = from + line[from..].find(delimiter)?;
        // A closing run must hug the text it closes.
        if matches!(line.as_bytes()[close - 1], b' ' | b'\t') {
            return None;
        }
        let kind = StyleKind::from_delimiters(n)?;
        Some((
            kind,
            Delimited {
                inner: open..close,
                end: close + n,
            },
        ))
    })
}

/// Byte ranges of a `[text](url "title")` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkSyntax {
    pub text: Range<usize>,
    pub url: Range<usize>,
    pub end: usize,
}

pub(crate) fn link(line: &str, at: usize) -> Option<LinkSyntax> {
    let text_start = at + 1;
    let text_end = text_start + line[text_start..].find(']')?;
    if text_end == text_start || !line[text_end + 1..].starts_with('(') {
        return None;
    }
    let dest_start = text_end + 2;
    let dest_end = dest_start + closing_paren(&line[dest_start..])?;
    let dest = &line[dest_start..dest_end];
    let url_start = dest_start + (dest.len() - dest.trim_start().len());
    let url_len = line[url_start..dest_end]
        .find(|c: char| c == ' ' || c == '"')
        .unwrap_or(dest_end - url_start);
    Some(LinkSyntax {
        text: text_start..text_end,
        url: url_start..url_start + url_len,
        end: dest_end + 1,
    })
}

/// Byte ranges of an image `![label](src)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageSyntax {
    pub label: Range<usize>,
    pub src: Range<usize>,
    pub end: usize,
}

/// Image at `at`, which must point at the `!`. The label may be empty; the
/// source may not.
pub(crate) fn image(line: &str, at: usize) -> Option<ImageSyntax> {
    if !line[at..].starts_with("![") {
        return None;
    }
    let label_start = at + 2;
    let label_end = label_start + line[label_start..].find(']')?;
    if !line[label_end + 1..].starts_with('(') {
        return None;
    }
    let dest_start = label_end + 2;
    let dest_end = dest_start + line[dest_start..].find(')')?;
    let raw = &line[dest_start..dest_end];
    let src = raw.trim();
    if src.is_empty() {
        return None;
    }
    let src_start = dest_start + (raw.len() - raw.trim_start().len());
    Some(ImageSyntax {
        label: label_start..label_end,
        src: src_start..src_start + src.len(),
        end: dest_end + 1,
    })
}

/// Size written in an image label: `WxH`, `W`, `xH`. `None` when the label is
/// alt text instead. Zero sides count as unset.
pub(crate) fn image_size(label: &str) -> Option<(Option<u32>, Option<u32>)> {
    let side = |digits: &str| -> Option<Option<u32>> {
        if digits.is_empty() {
            return Some(None);
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(digits.parse::<u32>().ok().filter(|&n| n > 0))
    };
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    match label.split_once(['x', 'X']) {
        Some((w, h)) => Some((side(w.trim())?, side(h.trim())?)),
        None => Some((side(label)?, None)),
    }
}

// `)` that is not inside a quoted title
fn closing_paren(dest: &str) -> Option<usize> {
    let mut quoted = false;
    for (i, b) in dest.bytes().enumerate() {
        match b {
            b'"' => quoted = !quoted,
            b')' if !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

/// Byte ranges of a `<name:spec>inner</name>` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagSyntax {
    pub spec: Range<usize>,
    pub inner: Range<usize>,
    pub end: usize,
}

fn tag(line: &str, at: usize, open: &str, close: &str) -> Option<TagSyntax> {
    if !line[at..].starts_with(open) {
        return None;
    }
    let spec_start = at + open.len();
    let spec_end = spec_start + line[spec_start..].find('>')?;
    let inner_start = spec_end + 1;
    let inner_end = inner_start + line[inner_start..].find(close)?;
    (inner_end > inner_start).then_some(TagSyntax {
        spec: spec_start..spec_end,
        inner: inner_start..inner_end,
        end: inner_end + close.len(),
    })
}

pub(crate) fn color_tag(line: &str, at: usize) -> Option<TagSyntax> {
    tag(line, at, COLOR_OPEN, COLOR_CLOSE)
}

pub(crate) fn font_tag(line: &str, at: usize) -> Option<TagSyntax> {
    tag(line, at, FONT_OPEN, FONT_CLOSE)
}

/// Trimmed font name, rejected when empty or longer than the maximum.
pub(crate) fn font_name(spec: &str) -> Option<&str> {
    let name = spec.trim();
    (!name.is_empty() && name.chars().count() <= MAX_FONT_NAME_LEN).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_variants() {
        assert!(is_rule("---"));
        assert!(is_rule("***"));
        assert!(is_rule("___"));
        assert!(is_rule("- - -"));
        assert!(is_rule("  -----  "));
        assert!(!is_rule("--"));
        assert!(!is_rule("-*-"));
        assert!(!is_rule("--- x"));
        assert!(!is_rule(""));
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(heading("# Title"), Some((1, "Title")));
        assert_eq!(heading("###### Six"), Some((6, "Six")));
        assert_eq!(heading("####### Seven"), None);
        assert_eq!(heading("#NoSpace"), None);
    }

    #[test]
    fn test_list_item_bullets() {
        let item = list_item("- one", 2).unwrap();
        assert_eq!(item.marker, ListMarker::Bullet);
        assert_eq!(item.content, "one");
        assert_eq!(item.indent, 0);

        let item = list_item("    + nested", 2).unwrap();
        assert_eq!(item.indent, 2);
        assert_eq!(item.content, "nested");

        assert!(list_item("-no space", 2).is_none());
        assert!(list_item("**bold**", 2).is_none());
    }

    #[test]
    fn test_list_item_tasks() {
        let item = list_item("- [x] done", 2).unwrap();
        assert_eq!(item.marker, ListMarker::Checkbox);
        assert!(item.checked);
        assert_eq!(item.task_at, Some(2));
        assert_eq!(item.content, "done");

        let item = list_item("  * [ ] todo", 2).unwrap();
        assert!(!item.checked);
        assert_eq!(item.task_at, Some(4));

        let item = list_item("- [X]", 2).unwrap();
        assert!(item.checked);
        assert_eq!(item.content, "");
    }

    #[test]
    fn test_list_item_ordered() {
        let item = list_item("12. twelve", 2).unwrap();
        assert_eq!(item.marker, ListMarker::Ordered(12));
        assert_eq!(item.content, "twelve");
        assert!(list_item("12.twelve", 2).is_none());
        assert!(list_item("1234567890. big", 2).is_none());
    }

    #[test]
    fn test_indent_unit_is_configurable() {
        assert_eq!(list_item("    - x", 4).unwrap().indent, 1);
        assert_eq!(list_item("    - x", 0).unwrap().indent, 4);
    }

    #[test]
    fn test_blockquote_and_alert() {
        assert_eq!(blockquote("> text"), Some("text"));
        assert_eq!(blockquote(">text"), Some("text"));
        assert_eq!(blockquote("text"), None);
        assert_eq!(
            alert_marker("[!note] inline"),
            Some((AlertKind::Note, " inline"))
        );
        assert_eq!(alert_marker("[!CAUTION]"), Some((AlertKind::Caution, "")));
        assert_eq!(alert_marker("[!DANGER]"), None);
        assert_eq!(alert_marker("[link](x)"), None);
    }

    #[test]
    fn test_code_span() {
        let span = code_span("a `b` c", 2).unwrap();
        assert_eq!(span.inner, 3..4);
        assert_eq!(span.end, 5);
        assert!(code_span("``", 0).is_none());
        assert!(code_span("`open", 0).is_none());
    }

    #[test]
    fn test_emphasis_longest_first() {
        let (kind, span) = emphasis("***both***", 0).unwrap();
        assert_eq!(kind, StyleKind::BoldItalic);
        assert_eq!(span.inner, 3..7);

        let (kind, span) = emphasis("**bold**", 0).unwrap();
        assert_eq!(kind, StyleKind::Bold);
        assert_eq!(span.end, 8);

        let (kind, _) = emphasis("*it*", 0).unwrap();
        assert_eq!(kind, StyleKind::Italic);
    }

    #[test]
    fn test_emphasis_falls_back_to_shorter_delimiter() {
        let (kind, span) = emphasis("**a*", 0).unwrap();
        assert_eq!(kind, StyleKind::Italic);
        assert_eq!(span.inner, 1..3);
    }

    #[test]
    fn test_emphasis_rejects_unterminated_and_spaced() {
        assert!(emphasis("**open", 0).is_none());
        assert!(emphasis("* not", 0).is_none());
        assert!(emphasis("**", 0).is_none());
        assert!(emphasis("****x****", 0).is_none());
        assert!(emphasis("*a *", 0).is_none());
    }

    #[test]
    fn test_emphasis_multibyte_inner() {
        let (kind, span) = emphasis("*é*", 0).unwrap();
        assert_eq!(kind, StyleKind::Italic);
        assert_eq!(span.inner, 1..3);
    }

    #[test]
    fn test_strikethrough() {
        let span = strikethrough("~~gone~~", 0).unwrap();
        assert_eq!(span.inner, 2..6);
        assert!(strikethrough("~~~~", 0).is_none());
        assert!(strikethrough("~single~", 0).is_none());
    }

    #[test]
    fn test_link_with_title() {
        let line = r#"[site](https://x.io "Title (here)") rest"#;
        let link = link(line, 0).unwrap();
        assert_eq!(&line[link.text], "site");
        assert_eq!(&line[link.url], "https://x.io");
        assert_eq!(&line[link.end..], " rest");
    }

    #[test]
    fn test_link_rejects_malformed() {
        assert!(link("[](url)", 0).is_none());
        assert!(link("[text] (url)", 0).is_none());
        assert!(link("[text](url", 0).is_none());
        let line = "[text]()";
        let empty = link(line, 0).unwrap();
        assert!(empty.url.is_empty());
    }

    #[test]
    fn test_image_syntax() {
        let line = "see ![64x32]( logo.png ) now";
        let found = image(line, 4).unwrap();
        assert_eq!(&line[found.label], "64x32");
        assert_eq!(&line[found.src], "logo.png");
        assert_eq!(&line[found.end..], " now");

        let line = "![](a.png)";
        assert_eq!(&line[image(line, 0).unwrap().label], "");
        assert!(image("![x]()", 0).is_none());
        assert!(image("![x] (a.png)", 0).is_none());
        assert!(image("[x](a.png)", 0).is_none());
        assert!(image("![x](a.png", 0).is_none());
    }

    #[test]
    fn test_image_size_forms() {
        assert_eq!(image_size("64x32"), Some((Some(64), Some(32))));
        assert_eq!(image_size("64X32"), Some((Some(64), Some(32))));
        assert_eq!(image_size("120"), Some((Some(120), None)));
        assert_eq!(image_size("x48"), Some((None, Some(48))));
        assert_eq!(image_size("0x0"), Some((None, None)));
        assert_eq!(image_size("company logo"), None);
        assert_eq!(image_size("box"), None);
        assert_eq!(image_size(""), None);
    }

    #[test]
    fn test_tags() {
        let line = "<color:#FF0000_#00FF00>hi</color>!";
        let tag = color_tag(line, 0).unwrap();
        assert_eq!(&line[tag.spec], "#FF0000_#00FF00");
        assert_eq!(&line[tag.inner], "hi");
        assert_eq!(&line[tag.end..], "!");
        assert!(color_tag("<color:#FF0000_#00FF00></color>", 0).is_none());
        assert!(font_tag("<font:Mono>x", 0).is_none());
    }

    #[test]
    fn test_font_name_limits() {
        assert_eq!(font_name(" Fira Code "), Some("Fira Code"));
        assert_eq!(font_name("   "), None);
        let long = "x".repeat(MAX_FONT_NAME_LEN + 1);
        assert_eq!(font_name(&long), None);
        let max = "x".repeat(MAX_FONT_NAME_LEN);
        assert!(font_name(&max).is_some());
    }
}
