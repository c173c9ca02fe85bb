//! Line-oriented walker shared by the annotation counter and the parser.
//!
//! The walker owns every grammar decision; a [`Sink`] only decides what to
//! do with the output (count it or store it). Keeping one walker is what
//! makes the counter exact.

use std::fmt;

use super::parser::ParseOptions;
use super::syntax;
use super::types::{
    AlertKind, BULLET, ColorStops, IMAGE_SENTINEL, ListMarker, RULE_SENTINEL, StyleKind,
};

/// Output position: characters for annotations, bytes for slicing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Mark {
    pub chars: usize,
    pub bytes: usize,
}

/// Receiver of walker output. Every annotation callback covers
/// `[start, current output position)`.
pub(crate) trait Sink {
    fn mark(&self) -> Mark;
    fn push_str(&mut self, text: &str);
    fn push_number(&mut self, n: u32);
    fn heading(&mut self, level: u8, start: Mark);
    fn style(&mut self, kind: StyleKind, start: Mark);
    fn list_item(&mut self, indent: usize, marker: ListMarker, checked: bool, start: Mark);
    fn blockquote(&mut self, alert: AlertKind, start: Mark);
    fn color_tag(&mut self, stops: &ColorStops, start: Mark);
    fn font_tag(&mut self, name: &str, start: Mark);
    fn link(&mut self, url: &str, start: Mark);
    fn rule(&mut self, start: Mark);
    fn image(&mut self, image: &ImageRef<'_>, start: Mark);

    /// A tag that looked right but failed validation; emitted literally.
    fn rejected(&mut self, _source: &str, _reason: &dyn fmt::Display) {}

    /// Byte offset in the source of a task item's `[`.
    fn task_marker(&mut self, _source_offset: usize) {}
}

/// A recognized image, borrowed from the source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImageRef<'a> {
    pub src: &'a str,
    pub alt: &'a str,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl<'a> ImageRef<'a> {
    fn new(label: &'a str, src: &'a str) -> Self {
        match syntax::image_size(label) {
            Some((width, height)) => Self {
                src,
                alt: "",
                width,
                height,
            },
            None => Self {
                src,
                alt: label.trim(),
                width: None,
                height: None,
            },
        }
    }
}

// Which inline constructs may start at the current nesting level
#[derive(Debug, Clone, Copy)]
struct Inline {
    links: bool,
    colors: bool,
    fonts: bool,
    code: bool,
}

impl Inline {
    const ALL: Self = Self {
        links: true,
        colors: true,
        fonts: true,
        code: true,
    };
}

enum Token<'a> {
    Styled(StyleKind, &'a str),
    Link { text: &'a str, url: &'a str },
    Color(ColorStops, &'a str),
    Font { name: &'a str, inner: &'a str },
    Image(ImageRef<'a>),
}

struct Walker<'w, S> {
    sink: &'w mut S,
    options: &'w ParseOptions,
    first_line: bool,
    /// Source byte offset of the current line
    line_offset: usize,
    in_fence: bool,
    quote: Option<(AlertKind, Mark)>,
    pending_alert: Option<AlertKind>,
}

/// Walk `src` once, left to right, reporting everything to `sink`.
pub(crate) fn walk<S: Sink>(src: &str, sink: &mut S, options: &ParseOptions) {
    let mut walker = Walker {
        sink,
        options,
        first_line: true,
        line_offset: 0,
        in_fence: false,
        quote: None,
        pending_alert: None,
    };
    let body = src.strip_suffix('\n').unwrap_or(src);
    for raw in body.split('\n') {
        walker.line(raw.strip_suffix('\r').unwrap_or(raw));
        walker.line_offset += raw.len() + 1;
    }
    walker.close_quote();
}

impl<S: Sink> Walker<'_, S> {
    fn line(&mut self, line: &str) {
        if let Some(alert) = self.pending_alert.take() {
            // The line after a bare `> [!KIND]` is the alert's first line.
            let content = syntax::blockquote(line).unwrap_or(line);
            self.new_line();
            self.quote = Some((alert, self.sink.mark()));
            self.inline(content, Inline::ALL);
            return;
        }
        if !self.in_fence
            && let Some(content) = syntax::blockquote(line)
        {
            self.quote_line(content);
            return;
        }
        self.close_quote();

        if self.in_fence {
            self.fenced_line(line);
            return;
        }
        if syntax::is_fence(line) {
            self.in_fence = true;
            return;
        }

        self.new_line();
        if syntax::is_rule(line) {
            let start = self.sink.mark();
            let mut buf = [0; 4];
            self.sink.push_str(RULE_SENTINEL.encode_utf8(&mut buf));
            self.sink.rule(start);
        } else if let Some((level, content)) = syntax::heading(line) {
            let start = self.sink.mark();
            self.inline(content, Inline::ALL);
            self.sink.heading(level, start);
        } else if let Some(item) = syntax::list_item(line, self.options.indent_spaces) {
            self.list_item(&item);
        } else {
            self.inline(line, Inline::ALL);
        }
    }

    fn new_line(&mut self) {
        if self.first_line {
            self.first_line = false;
        } else {
            self.sink.push_str("\n");
        }
    }

    fn close_quote(&mut self) {
        if let Some((alert, start)) = self.quote.take() {
            self.sink.blockquote(alert, start);
        }
    }

    fn quote_line(&mut self, content: &str) {
        if self.quote.is_none()
            && let Some((alert, rest)) = syntax::alert_marker(content)
        {
            if rest.trim().is_empty() {
                self.pending_alert = Some(alert);
                return;
            }
            self.new_line();
            self.quote = Some((alert, self.sink.mark()));
            self.inline(rest.trim_start(), Inline::ALL);
            return;
        }
        self.new_line();
        if self.quote.is_none() {
            self.quote = Some((AlertKind::Normal, self.sink.mark()));
        }
        self.inline(content, Inline::ALL);
    }

    fn fenced_line(&mut self, line: &str) {
        if syntax::is_fence(line) {
            self.in_fence = false;
            return;
        }
        self.new_line();
        if !line.is_empty() {
            let start = self.sink.mark();
            self.sink.push_str(line);
            self.sink.style(StyleKind::Code, start);
        }
    }

    fn list_item(&mut self, item: &syntax::ListLine<'_>) {
        if let Some(at) = item.task_at {
            self.sink.task_marker(self.line_offset + at);
        }
        let start = self.sink.mark();
        match item.marker {
            ListMarker::Ordered(n) => {
                self.sink.push_number(n);
                self.sink.push_str(". ");
            }
            ListMarker::Bullet | ListMarker::Checkbox => self.sink.push_str(BULLET),
        }
        self.inline(item.content, Inline::ALL);
        self.sink
            .list_item(item.indent, item.marker, item.checked, start);
    }

    fn inline(&mut self, line: &str, allow: Inline) {
        let bytes = line.as_bytes();
        let mut plain = 0;
        let mut at = 0;
        while at < bytes.len() {
            if let Some((token, end)) = self.token(line, at, allow) {
                self.sink.push_str(&line[plain..at]);
                self.emit(token, allow);
                at = end;
                plain = end;
            } else if bytes[at] == b'*' {
                // An unmatched run stays literal as a whole.
                at += syntax::star_run(line, at);
            } else {
                at += 1;
            }
        }
        self.sink.push_str(&line[plain..]);
    }

    fn token<'a>(
        &mut self,
        line: &'a str,
        at: usize,
        allow: Inline,
    ) -> Option<(Token<'a>, usize)> {
        match line.as_bytes()[at] {
            b'`' if allow.code => syntax::code_span(line, at)
                .map(|span| (Token::Styled(StyleKind::Code, &line[span.inner]), span.end)),
            b'*' => syntax::emphasis(line, at)
                .map(|(kind, span)| (Token::Styled(kind, &line[span.inner]), span.end)),
            b'~' => syntax::strikethrough(line, at).map(|span| {
                (
                    Token::Styled(StyleKind::Strikethrough, &line[span.inner]),
                    span.end,
                )
            }),
            b'!' if allow.links => syntax::image(line, at).map(|image| {
                (
                    Token::Image(ImageRef::new(&line[image.label], &line[image.src])),
                    image.end,
                )
            }),
            b'[' if allow.links => syntax::link(line, at).map(|link| {
                (
                    Token::Link {
                        text: &line[link.text],
                        url: &line[link.url],
                    },
                    link.end,
                )
            }),
            b'<' if allow.colors && line[at..].starts_with(syntax::COLOR_OPEN) => {
                let tag = syntax::color_tag(line, at)?;
                match ColorStops::parse(&line[tag.spec.clone()]) {
                    Ok(stops) => Some((Token::Color(stops, &line[tag.inner]), tag.end)),
                    Err(err) => {
                        self.sink.rejected(&line[at..tag.end], &err);
                        None
                    }
                }
            }
            b'<' if allow.fonts && line[at..].starts_with(syntax::FONT_OPEN) => {
                let tag = syntax::font_tag(line, at)?;
                if let Some(name) = syntax::font_name(&line[tag.spec.clone()]) {
                    Some((
                        Token::Font {
                            name,
                            inner: &line[tag.inner],
                        },
                        tag.end,
                    ))
                } else {
                    self.sink
                        .rejected(&line[at..tag.end], &"font name is empty or too long");
                    None
                }
            }
            _ => None,
        }
    }

    fn emit(&mut self, token: Token<'_>, allow: Inline) {
        let start = self.sink.mark();
        match token {
            Token::Styled(kind, inner) => {
                self.sink.push_str(inner);
                self.sink.style(kind, start);
            }
            Token::Link { text, url } => {
                self.inline(
                    text,
                    Inline {
                        links: false,
                        ..allow
                    },
                );
                // `[text]()` renders as plain text.
                if !url.is_empty() {
                    self.sink.link(url, start);
                }
            }
            Token::Color(stops, inner) => {
                self.inline(
                    inner,
                    Inline {
                        colors: false,
                        code: false,
                        ..allow
                    },
                );
                self.sink.color_tag(&stops, start);
            }
            Token::Font { name, inner } => {
                self.inline(
                    inner,
                    Inline {
                        fonts: false,
                        ..allow
                    },
                );
                self.sink.font_tag(name, start);
            }
            Token::Image(image) => {
                let mut buf = [0; 4];
                self.sink.push_str(IMAGE_SENTINEL.encode_utf8(&mut buf));
                self.sink.image(&image, start);
            }
        }
    }
}
