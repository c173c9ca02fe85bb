//! Hit-testing and click dispatch.
//!
//! The index holds the clickable rectangles of the most recent layout in
//! panel coordinates. Every layout clears it before refilling, so regions
//! from an older layout can never answer a query.

use serde::Serialize;

use crate::document::{AnnotationKind, Document, ParseOptions, Point, Rect, task_offsets};

/// What a clickable region points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Region {
    Link { link: usize, url: String },
    Checkbox { index: usize, checked: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitRegion {
    pub rect: Rect,
    pub region: Region,
}

/// Result of a confirmed click; the caller performs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClickAction {
    OpenUrl { url: String },
    /// `checked` is the state after the toggle
    ToggleCheckbox { index: usize, checked: bool },
}

#[derive(Debug, Clone, Default)]
pub struct InteractionIndex {
    regions: Vec<HitRegion>,
    /// Screen position of the panel's top-left corner
    origin: Point,
}

impl InteractionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every region. Called at the start of each layout.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Register a link. Links without a url or without ink are not clickable.
    pub fn push_link(&mut self, link: usize, url: &str, rect: Rect) {
        if url.is_empty() || rect.is_empty() {
            return;
        }
        self.regions.push(HitRegion {
            rect,
            region: Region::Link {
                link,
                url: url.to_string(),
            },
        });
    }

    pub fn push_checkbox(&mut self, index: usize, checked: bool, rect: Rect) {
        self.regions.push(HitRegion {
            rect,
            region: Region::Checkbox { index, checked },
        });
    }

    pub fn regions(&self) -> &[HitRegion] {
        &self.regions
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Set the screen position of the panel so screen points can be tested.
    pub const fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
    }

    pub const fn origin(&self) -> Point {
        self.origin
    }

    /// Region under a screen-space point.
    pub fn region_at(&self, point: Point) -> Option<&HitRegion> {
        let local = Point::new(point.x - self.origin.x, point.y - self.origin.y);
        self.regions.iter().find(|hit| hit.rect.contains(local))
    }

    /// Url of the link under `point`.
    pub fn hit_test_link(&self, point: Point) -> Option<&str> {
        match &self.region_at(point)?.region {
            Region::Link { url, .. } => Some(url),
            Region::Checkbox { .. } => None,
        }
    }

    /// Ordinal of the checkbox under `point`.
    pub fn hit_test_checkbox(&self, point: Point) -> Option<usize> {
        match &self.region_at(point)?.region {
            Region::Checkbox { index, .. } => Some(*index),
            Region::Link { .. } => None,
        }
    }

    /// Resolve a click into the action the caller should take.
    pub fn click(&self, point: Point) -> Option<ClickAction> {
        let action = match &self.region_at(point)?.region {
            Region::Link { url, .. } => ClickAction::OpenUrl { url: url.clone() },
            Region::Checkbox { index, checked } => ClickAction::ToggleCheckbox {
                index: *index,
                checked: !checked,
            },
        };
        tracing::debug!(?action, x = point.x, y = point.y, "click resolved");
        Some(action)
    }

    /// Index of the annotation of `kind` covering display offset `offset`.
    pub fn annotation_at(doc: &Document, kind: AnnotationKind, offset: usize) -> Option<usize> {
        doc.annotations().annotation_at(kind, offset)
    }
}

/// Flip the `index`th task marker (`[ ]` / `[x]`) in raw markup.
///
/// Task items are counted in display order, skipping anything inside code
/// fences or blockquotes. Returns `None` when there is no such task.
pub fn toggle_checkbox(source: &str, index: usize) -> Option<String> {
    let offset = *task_offsets(source, &ParseOptions::default()).get(index)?;
    let state = offset + 1;
    let replacement = match source.as_bytes().get(state)? {
        b' ' => "x",
        b'x' | b'X' => " ",
        _ => return None,
    };
    let mut updated = String::with_capacity(source.len());
    updated.push_str(&source[..state]);
    updated.push_str(replacement);
    updated.push_str(&source[state + 1..]);
    Some(updated)
}
