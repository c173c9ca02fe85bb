use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::document::{DEFAULT_INDENT_SPACES, ParseOptions};
use crate::render::{FontOptions, LayoutOptions};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// CLI defaults that can be persisted to a config file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderFlags {
    pub font: Option<String>,
    pub font_file: Option<PathBuf>,
    pub font_size: Option<f32>,
    pub theme: Option<ThemeMode>,
    pub indent_spaces: Option<usize>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub perf: bool,
    pub render_debug_log: Option<PathBuf>,
}

impl RenderFlags {
    /// Merge `other` over `self`: options set in `other` win, switches accumulate.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            font: other.font.clone().or_else(|| self.font.clone()),
            font_file: other.font_file.clone().or_else(|| self.font_file.clone()),
            font_size: other.font_size.or(self.font_size),
            theme: other.theme.or(self.theme),
            indent_spaces: other.indent_spaces.or(self.indent_spaces),
            width: other.width.or(self.width),
            height: other.height.or(self.height),
            perf: self.perf || other.perf,
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            indent_spaces: self.indent_spaces.unwrap_or(DEFAULT_INDENT_SPACES),
        }
    }

    pub fn layout_options(&self) -> LayoutOptions {
        let defaults = LayoutOptions::default();
        LayoutOptions {
            font_px: self
                .font_size
                .filter(|px| px.is_finite() && *px > 0.0)
                .unwrap_or(defaults.font_px),
            ..defaults
        }
    }

    pub fn font_options(&self) -> FontOptions {
        FontOptions {
            family: self.font.clone(),
            file: self.font_file.clone(),
        }
    }

    pub fn theme_mode(&self) -> ThemeMode {
        self.theme.unwrap_or(ThemeMode::Auto)
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("markpane").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("markpane")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("markpane").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("markpane")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".markpanerc")
}

pub fn load_render_flags(path: &Path) -> Result<RenderFlags> {
    if !path.exists() {
        return Ok(RenderFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| {
            // `--font=Name With Spaces` keeps the rest of its line
            if line.starts_with("--font=") {
                vec![line.to_owned()]
            } else {
                line.split_whitespace().map(ToOwned::to_owned).collect()
            }
        })
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_render_flags(path: &Path, flags: &RenderFlags) -> Result<()> {
    let mut lines = vec!["# markpane defaults (saved with --save)".to_string()];
    if let Some(font) = &flags.font {
        lines.push(format!("--font={font}"));
    }
    if let Some(file) = &flags.font_file {
        lines.push(format!("--font-file {}", file.display()));
    }
    if let Some(px) = flags.font_size {
        lines.push(format!("--font-size {px}"));
    }
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme.as_str()));
    }
    if let Some(spaces) = flags.indent_spaces {
        lines.push(format!("--indent-spaces {spaces}"));
    }
    if let Some(width) = flags.width {
        lines.push(format!("--width {width}"));
    }
    if let Some(height) = flags.height {
        lines.push(format!("--height {height}"));
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_render_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

// Value of `--name value` or `--name=value` at `tokens[*i]`; advances past a
// separate value token.
fn flag_value<'t>(tokens: &'t [String], i: &mut usize, name: &str) -> Option<&'t str> {
    let token = tokens[*i].as_str();
    if token == name {
        let value = tokens.get(*i + 1)?;
        *i += 1;
        return Some(value);
    }
    token.strip_prefix(name)?.strip_prefix('=')
}

/// Pick the persisted flags out of a token list; unknown tokens are ignored.
pub fn parse_flag_tokens(tokens: &[String]) -> RenderFlags {
    let mut flags = RenderFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] == "--perf" {
            flags.perf = true;
        } else if let Some(value) = flag_value(tokens, &mut i, "--font") {
            flags.font = Some(value.to_string());
        } else if let Some(value) = flag_value(tokens, &mut i, "--font-file") {
            flags.font_file = Some(PathBuf::from(value));
        } else if let Some(value) = flag_value(tokens, &mut i, "--font-size") {
            flags.font_size = value.parse().ok();
        } else if let Some(value) = flag_value(tokens, &mut i, "--theme") {
            flags.theme = parse_theme(value);
        } else if let Some(value) = flag_value(tokens, &mut i, "--indent-spaces") {
            flags.indent_spaces = value.parse().ok().filter(|&n| n > 0);
        } else if let Some(value) = flag_value(tokens, &mut i, "--width") {
            flags.width = value.parse().ok();
        } else if let Some(value) = flag_value(tokens, &mut i, "--height") {
            flags.height = value.parse().ok();
        } else if let Some(value) = flag_value(tokens, &mut i, "--render-debug-log") {
            flags.render_debug_log = Some(PathBuf::from(value));
        }
        i += 1;
    }
    flags
}

fn parse_theme(s: &str) -> Option<ThemeMode> {
    match s {
        "auto" => Some(ThemeMode::Auto),
        "light" => Some(ThemeMode::Light),
        "dark" => Some(ThemeMode::Dark),
        _ => None,
    }
}
