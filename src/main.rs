//! Markpane - render styled markup into a fixed panel.
//!
//! # Usage
//!
//! ```bash
//! markpane notes.md --out notes.png
//! markpane notes.md --dump
//! markpane notes.md --width 400 --height 300 --click 120,80
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use markpane::config::{
    RenderFlags, ThemeMode, clear_render_flags, global_config_path, load_render_flags,
    local_override_path, parse_flag_tokens, save_render_flags,
};
use markpane::document::{Document, Point};
use markpane::interaction::{HitRegion, InteractionIndex, toggle_checkbox};
use markpane::perf;
use markpane::render::{
    Canvas, Extent, FontGlyphs, GlyphSource, ImageStore, LayoutEngine, MonoGlyphs, Theme, paint,
};

/// Render styled markup into a fixed-size panel
#[derive(Parser, Debug)]
#[command(name = "markpane", version, about, long_about = None)]
struct Cli {
    /// Markup file to render
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Panel width in pixels (default: fit the text)
    #[arg(long)]
    width: Option<u32>,

    /// Panel height in pixels (default: fit the text)
    #[arg(long)]
    height: Option<u32>,

    /// Installed font family for body text
    #[arg(long)]
    font: Option<String>,

    /// Font file for body text (wins over --font)
    #[arg(long, value_name = "PATH")]
    font_file: Option<PathBuf>,

    /// Base font size in pixels
    #[arg(long, value_name = "PX")]
    font_size: Option<f32>,

    /// Color theme
    #[arg(long, value_enum)]
    theme: Option<ThemeMode>,

    /// Spaces per list nesting level
    #[arg(long, value_name = "N")]
    indent_spaces: Option<usize>,

    /// Write the rendered panel as PNG (default: FILE with .png extension)
    #[arg(long, value_name = "PNG")]
    out: Option<PathBuf>,

    /// Print display text, annotations and hit regions as JSON
    #[arg(long)]
    dump: bool,

    /// Resolve a click at panel coordinates X,Y and print the action
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    click: Option<Point>,

    /// Flip task checkbox N in FILE before rendering
    #[arg(long, value_name = "N")]
    toggle: Option<usize>,

    /// Gradient animation time offset
    #[arg(long, value_name = "T")]
    anim: Option<f32>,

    /// Print timing for parse, layout and paint
    #[arg(long)]
    perf: bool,

    /// Write detailed render debug events to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got `{s}`"))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<i32>()
            .map_err(|err| format!("bad coordinate `{v}`: {err}"))
    };
    Ok(Point::new(coord(x)?, coord(y)?))
}

#[derive(Serialize)]
struct Dump<'a> {
    document: &'a Document,
    panel: Extent,
    block: Extent,
    regions: &'a [HitRegion],
}

fn effective_flags(cli: &Cli, raw_args: &[String]) -> Result<RenderFlags> {
    let global_path = global_config_path();
    let cli_flags = parse_flag_tokens(raw_args);

    if cli.clear {
        clear_render_flags(&global_path)?;
    }
    if cli.save {
        save_render_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        RenderFlags::default()
    } else {
        let global_flags = load_render_flags(&global_path)?;
        let local_flags = load_render_flags(&local_override_path())?;
        global_flags.union(&local_flags)
    };
    Ok(file_flags.union(&cli_flags))
}

fn glyph_source(flags: &RenderFlags) -> Box<dyn GlyphSource> {
    match FontGlyphs::load(&flags.font_options()) {
        Ok(fonts) => Box::new(fonts),
        Err(err) => {
            tracing::warn!(error = %err, "falling back to built-in box glyphs");
            Box::new(MonoGlyphs)
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let effective = effective_flags(&cli, &raw_args)?;

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("MARKPANE_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        eprintln!(
            "[warn] Failed to initialize render debug log {}: {}",
            render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            err
        );
    }

    let mut source = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;

    if let Some(n) = cli.toggle {
        source = toggle_checkbox(&source, n)
            .with_context(|| format!("No task checkbox #{n} in {}", cli.file.display()))?;
        std::fs::write(&cli.file, &source)
            .with_context(|| format!("Failed to write {}", cli.file.display()))?;
    }

    let mut doc = {
        let _scope = perf::scope("parse");
        Document::parse_with(&source, &effective.parse_options())
            .with_context(|| format!("Failed to parse {}", cli.file.display()))?
    };

    let glyphs = glyph_source(&effective);
    let images = {
        let _scope = perf::scope("images");
        ImageStore::load(&doc, cli.file.parent().unwrap_or_else(|| Path::new(".")))
    };
    let engine = LayoutEngine::new(
        glyphs.as_ref(),
        Theme::for_mode(effective.theme_mode()),
        effective.layout_options(),
    )
    .with_images(&images);
    let fit = engine.fit_panel(&doc);
    let panel = Extent::new(
        effective
            .width
            .map_or(Ok(fit.width), i32::try_from)
            .context("Panel width out of range")?,
        effective
            .height
            .map_or(Ok(fit.height), i32::try_from)
            .context("Panel height out of range")?,
    );

    let mut index = InteractionIndex::new();
    let layout = engine.layout(&mut doc, panel, &mut index);

    if cli.dump {
        let dump = Dump {
            document: &doc,
            panel,
            block: layout.extent(),
            regions: index.regions(),
        };
        println!("{}", serde_json::to_string_pretty(&dump)?);
    }

    if let Some(point) = cli.click {
        match index.click(point) {
            Some(action) => println!("{}", serde_json::to_string(&action)?),
            None => println!("null"),
        }
    }

    if cli.out.is_some() || (!cli.dump && cli.click.is_none()) {
        let out = cli
            .out
            .clone()
            .unwrap_or_else(|| cli.file.with_extension("png"));
        let (width, height) = (panel.width.max(1) as u32, panel.height.max(1) as u32);
        let mut pixels = vec![0; width as usize * height as usize];
        let mut canvas = Canvas::new(&mut pixels, width, height)?;
        paint(&layout, &doc, &engine, &mut canvas, cli.anim);
        canvas.mark_hit_regions(&index);
        canvas
            .to_rgba_image()
            .save(&out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        tracing::info!(path = %out.display(), width, height, "panel written");
    }

    Ok(())
}
