//! Annotation counting ahead of the real parse.
//!
//! Runs the same walker as the parser with a sink that only counts, so the
//! numbers are exact and no memory is allocated.

use super::parser::ParseOptions;
use super::types::{AlertKind, ColorStops, Counts, ListMarker, StyleKind};
use super::walk::{ImageRef, Mark, Sink, walk};

/// Annotation counts plus the exact size of the display text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    pub counts: Counts,
    pub text: Mark,
}

#[derive(Default)]
struct CountSink {
    tally: Tally,
    /// Collected only when task positions were asked for
    tasks: Option<Vec<usize>>,
}

impl Sink for CountSink {
    fn mark(&self) -> Mark {
        self.tally.text
    }

    fn push_str(&mut self, text: &str) {
        self.tally.text.chars += text.chars().count();
        self.tally.text.bytes += text.len();
    }

    fn push_number(&mut self, n: u32) {
        let digits = n.checked_ilog10().unwrap_or(0) as usize + 1;
        self.tally.text.chars += digits;
        self.tally.text.bytes += digits;
    }

    fn heading(&mut self, _level: u8, _start: Mark) {
        self.tally.counts.headings += 1;
    }

    fn style(&mut self, _kind: StyleKind, _start: Mark) {
        self.tally.counts.styles += 1;
    }

    fn list_item(&mut self, _indent: usize, _marker: ListMarker, _checked: bool, _start: Mark) {
        self.tally.counts.list_items += 1;
    }

    fn blockquote(&mut self, _alert: AlertKind, _start: Mark) {
        self.tally.counts.blockquotes += 1;
    }

    fn color_tag(&mut self, _stops: &ColorStops, _start: Mark) {
        self.tally.counts.color_tags += 1;
    }

    fn font_tag(&mut self, _name: &str, _start: Mark) {
        self.tally.counts.font_tags += 1;
    }

    fn link(&mut self, _url: &str, _start: Mark) {
        self.tally.counts.links += 1;
    }

    fn rule(&mut self, _start: Mark) {
        self.tally.counts.rules += 1;
    }

    fn image(&mut self, _image: &ImageRef<'_>, _start: Mark) {
        self.tally.counts.images += 1;
    }

    fn task_marker(&mut self, source_offset: usize) {
        if let Some(tasks) = self.tasks.as_mut() {
            tasks.push(source_offset);
        }
    }
}

/// Count the annotations `parse(input)` will produce.
pub fn count(input: &str) -> Counts {
    count_with(input, &ParseOptions::default())
}

/// Count with explicit parse options.
pub fn count_with(input: &str, options: &ParseOptions) -> Counts {
    tally(input, options).counts
}

pub(crate) fn tally(input: &str, options: &ParseOptions) -> Tally {
    let mut sink = CountSink::default();
    walk(input, &mut sink, options);
    sink.tally
}

/// Source byte offsets of every task marker's `[`, in display order.
pub(crate) fn task_offsets(input: &str, options: &ParseOptions) -> Vec<usize> {
    let mut sink = CountSink {
        tasks: Some(Vec::new()),
        ..CountSink::default()
    };
    walk(input, &mut sink, options);
    sink.tasks.unwrap_or_default()
}
