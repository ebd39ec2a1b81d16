//! Integration tests for theme loading.

use std::fs;
use std::sync::Arc;
use std::thread;

use feishu2mp::{find_theme_file, Error, Theme, ThemeStore, DEFAULT_THEME_FILE};
use tempfile::TempDir;

fn write_theme(dir: &TempDir, name: &str, json: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_blank_pre_code_keeps_default() {
    let dir = TempDir::new().unwrap();
    let path = write_theme(&dir, "theme.json", r#"{"tags": {"p": "color: red;"}, "pre_code": ""}"#);

    let store = ThemeStore::new();
    store.load_from(&path).unwrap();
    let theme = store.snapshot();

    assert_eq!(theme.tag_style("p"), Some("color: red;"));
    assert_eq!(theme.pre_code(), Theme::builtin().pre_code());
}

#[test]
fn test_null_pre_code_keeps_default() {
    let dir = TempDir::new().unwrap();
    let path = write_theme(&dir, "theme.json", r#"{"tags":{"p":"color: red;"},"pre_code":null}"#);

    let store = ThemeStore::new();
    store.load_from(&path).unwrap();
    let theme = store.snapshot();

    assert_eq!(theme.tag_style("p"), Some("color: red;"));
    assert_eq!(theme.pre_code(), Theme::builtin().pre_code());
}

#[test]
fn test_null_tag_value_is_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write_theme(&dir, "theme.json", r#"{"tags": {"p": "color: red;", "em": null}}"#);

    let publisher = feishu2mp::Publisher::new().with_theme_file(&path).unwrap();
    let html = publisher.render_html("*a*", &feishu2mp::ImageRegistry::new());

    assert_eq!(html, "<p style=\"color: red;\"><em>a</em></p>");
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = TempDir::new().unwrap();
    let store = ThemeStore::new();

    let err = store.load_from(dir.path().join("nope.json")).unwrap_err();

    assert!(matches!(err, Error::ThemeRead { .. }));
    assert!(!err.is_fatal());
    assert_eq!(*store.snapshot(), *Theme::builtin());
}

#[test]
fn test_malformed_file_is_format_error() {
    let dir = TempDir::new().unwrap();
    let store = ThemeStore::new();

    for (name, json) in [
        ("broken.json", "{\"tags\": "),
        ("wrong.json", r#"{"tags": ["p"]}"#),
        ("string.json", "\"not an object\""),
    ] {
        let path = write_theme(&dir, name, json);
        let err = store.load_from(&path).unwrap_err();
        match err {
            Error::ThemeFormat { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error for {}: {}", name, other),
        }
    }
    assert!(!store.load_or_keep(dir.path().join("broken.json")));
    assert_eq!(*store.snapshot(), *Theme::builtin());
}

#[test]
fn test_find_theme_file_checks_parent() {
    let root = TempDir::new().unwrap();
    let child = root.path().join("web");
    fs::create_dir(&child).unwrap();

    assert_eq!(find_theme_file(&child, DEFAULT_THEME_FILE), None);

    let in_parent = write_theme(&root, DEFAULT_THEME_FILE, "{}");
    assert_eq!(find_theme_file(&child, DEFAULT_THEME_FILE), Some(in_parent));

    let in_child = child.join(DEFAULT_THEME_FILE);
    fs::write(&in_child, "{}").unwrap();
    assert_eq!(find_theme_file(&child, DEFAULT_THEME_FILE), Some(in_child));
}

#[test]
fn test_snapshot_survives_reload() {
    let dir = TempDir::new().unwrap();
    let red = write_theme(&dir, "red.json", r#"{"tags": {"p": "color: red;"}}"#);
    let blue = write_theme(&dir, "blue.json", r#"{"tags": {"p": "color: blue;"}}"#);

    let store = Arc::new(ThemeStore::new());
    store.load_from(&red).unwrap();
    let held = store.snapshot();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.load_from(&blue).unwrap())
    };
    writer.join().unwrap();

    assert_eq!(held.tag_style("p"), Some("color: red;"));
    assert_eq!(store.snapshot().tag_style("p"), Some("color: blue;"));
}

#[test]
fn test_to_json_can_be_loaded_back() {
    let dir = TempDir::new().unwrap();
    let custom = Theme::from_json(r#"{"tags": {"h1": "font-size: 30px;"}, "pre_code": "color: #fff;"}"#)
        .unwrap();
    let path = write_theme(&dir, DEFAULT_THEME_FILE, &custom.to_json().unwrap());

    let store = ThemeStore::new();
    store.load_from(&path).unwrap();

    assert_eq!(*store.snapshot(), custom);
}
