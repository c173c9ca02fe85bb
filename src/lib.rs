// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. config::RenderFlags)
    clippy::module_name_repetitions
)]

//! # Markpane
//!
//! A styled-text panel engine for a small markup language.
//!
//! Markpane turns markup into display text plus annotation spans, then lays
//! that text out in a fixed panel:
//! - Headings, emphasis, code, strikethrough and links
//! - Lists with task checkboxes, blockquotes and alert callouts
//! - Gradient color tags and per-span font tags
//! - Hit-testing for links and checkboxes
//!
//! ## Pipeline
//!
//! - **Count**: exact annotation counts, so parse allocates once
//! - **Parse**: display text and sorted annotation arrays
//! - **Layout**: centered lines, glyph positions, clickable regions
//! - **Paint**: glyph coverage and decorations into a pixel buffer
//!
//! ## Modules
//!
//! - [`document`]: Counting and parsing markup
//! - [`render`]: Styles, gradients, glyph sources, layout and painting
//! - [`interaction`]: Hit-testing and click dispatch
//! - [`config`]: Persisted CLI defaults
//! - [`perf`]: Timing scopes and the render debug log

pub mod config;
pub mod document;
pub mod interaction;
pub mod perf;
pub mod render;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::document::{Document, ParseOptions};
    pub use crate::interaction::{ClickAction, InteractionIndex};
    pub use crate::render::{Canvas, Extent, Layout, LayoutEngine, LayoutOptions, Theme};
}
