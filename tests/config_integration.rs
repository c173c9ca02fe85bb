use std::path::PathBuf;

use markpane::config::{
    RenderFlags, ThemeMode, clear_render_flags, load_render_flags, parse_flag_tokens,
    save_render_flags,
};

fn args(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(ToString::to_string).collect()
}

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".markpanerc");
    let content = r"
# comment
--perf

--theme light

--font=Noto Sans Mono
--render-debug-log=render.log
";
    std::fs::write(&path, content).unwrap();

    let flags = load_render_flags(&path).unwrap();
    assert!(flags.perf);
    assert_eq!(flags.theme, Some(ThemeMode::Light));
    assert_eq!(flags.font.as_deref(), Some("Noto Sans Mono"));
    assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
}

#[test]
fn test_missing_config_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let flags = load_render_flags(&dir.path().join("absent")).unwrap();
    assert_eq!(flags, RenderFlags::default());
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".markpanerc");
    let content = "--perf\n--theme light\n--font-size 18\n--render-debug-log file.log\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_render_flags(&path).unwrap();
    let cli_flags = parse_flag_tokens(&args(&[
        "markpane",
        "--theme",
        "dark",
        "--width",
        "320",
        "notes.md",
    ]));

    let effective = file_flags.union(&cli_flags);
    assert!(effective.perf, "file flags should remain enabled");
    assert_eq!(effective.width, Some(320), "cli flags should be applied");
    assert_eq!(effective.theme, Some(ThemeMode::Dark), "cli should override theme");
    assert_eq!(effective.font_size, Some(18.0));
    assert_eq!(
        effective.render_debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_local_override_layers_over_global() {
    let dir = tempfile::tempdir().unwrap();
    let global = dir.path().join("config");
    let local = dir.path().join(".markpanerc");
    std::fs::write(&global, "--indent-spaces 4\n--theme dark\n").unwrap();
    std::fs::write(&local, "--theme light\n").unwrap();

    let merged = load_render_flags(&global)
        .unwrap()
        .union(&load_render_flags(&local).unwrap());
    assert_eq!(merged.indent_spaces, Some(4));
    assert_eq!(merged.theme, Some(ThemeMode::Light));
    assert_eq!(merged.parse_options().indent_spaces, 4);
}

#[test]
fn test_save_then_clear_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("markpane").join("config");
    let cli = parse_flag_tokens(&args(&[
        "markpane",
        "--font-file=fonts/Inter.ttf",
        "--height",
        "200",
        "--perf",
    ]));

    save_render_flags(&path, &cli).unwrap();
    let saved = std::fs::read_to_string(&path).unwrap();
    assert!(saved.starts_with("# markpane defaults"));
    assert_eq!(load_render_flags(&path).unwrap(), cli);

    clear_render_flags(&path).unwrap();
    assert!(!path.exists());
    clear_render_flags(&path).unwrap();
}
