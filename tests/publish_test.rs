//! Integration tests for the HTML publishing path.

use std::fs;
use std::sync::Arc;

use feishu2mp::render::restyle::{cleanup_whitespace, inject_tag_style};
use feishu2mp::{
    markdown_to_publish_html, normalize, DirectoryImageSource, ImageRegistry, Publisher,
    RestylePipeline, Theme,
};
use tempfile::TempDir;

fn builtin_style(tag: &str) -> String {
    Theme::builtin().tag_style(tag).unwrap_or_default().to_string()
}

#[test]
fn test_heading_scenario() {
    let html = markdown_to_publish_html("# Title\n\nSome *text*.", &ImageRegistry::new());

    assert!(html.contains("<h1 style=\"font-size: 24px; font-weight: bold;"));
    assert!(html.contains(&format!("<em style=\"{}\">text</em>", builtin_style("em"))));
    assert!(!html.contains("class="));
    assert!(!html.contains("id="));
}

#[test]
fn test_image_token_scenario() {
    let mut images = ImageRegistry::new();
    images.insert_reference("img_abc123", "data:image/png;base64,QUJD");

    let html = markdown_to_publish_html("![](img_abc123)", &images);

    assert!(html.contains("<img src=\"data:image/png;base64,QUJD\""));
    assert!(!html.contains("img_abc123"));
}

#[test]
fn test_forbidden_markup_is_removed() {
    let raw = concat!(
        "<link rel=\"stylesheet\" href=\"a.css\">\n",
        "<STYLE>p { color: red; }</STYLE>\n",
        "<p class=\"lead\" id=\"intro\" data-block-id=\"7\">Hello</p>\n",
        "<script type=\"text/javascript\">alert(1)</script>\n",
        "<img class=\"x\" src=\"http://cdn.example.com/a.png\" />",
    );

    let html = RestylePipeline::default().process(raw, &ImageRegistry::new());

    let lower = html.to_lowercase();
    for needle in ["<style", "<link", "<script", "class=", "id=", "data-"] {
        assert!(!lower.contains(needle), "{} left in {}", needle, html);
    }
    assert!(html.starts_with(&format!("<p style=\"{}\">Hello</p>", builtin_style("p"))));
    assert!(html.contains("src=\"https://cdn.example.com/a.png\""));
}

#[test]
fn test_theme_style_on_every_occurrence() {
    let theme = Arc::new(Theme::from_json(r#"{"tags": {"p": "color: red;"}}"#).unwrap());
    let raw = "<p>a</p><p align=\"center\">b</p><p style=\"margin: 0\">c</p>";

    let html = RestylePipeline::new(theme).process(raw, &ImageRegistry::new());

    assert_eq!(
        html,
        concat!(
            "<p style=\"color: red;\">a</p>",
            "<p align=\"center\" style=\"color: red;\">b</p>",
            "<p style=\"color: red; margin: 0\">c</p>",
        )
    );
}

#[test]
fn test_pre_tag_keeps_tag_level_style() {
    let html = markdown_to_publish_html("```rust\nfn main() {}\n```", &ImageRegistry::new());

    let pre_alone = inject_tag_style("<pre>", "pre", &builtin_style("pre"));
    assert!(html.starts_with(&pre_alone), "{}", html);

    let code_style = htmlescape::encode_minimal(Theme::builtin().pre_code());
    assert!(html.contains(&format!("style=\"{}\">fn main()", code_style)));
}

#[test]
fn test_inline_code_outside_pre_uses_code_style() {
    let html = markdown_to_publish_html("Use `cargo`.", &ImageRegistry::new());
    let code_style = htmlescape::encode_minimal(&builtin_style("code"));
    assert!(html.contains(&format!("<code style=\"{}\">cargo</code>", code_style)));
}

#[test]
fn test_cleanup_is_idempotent() {
    let inputs = [
        "  <p>a</p>\n\n\n\n<p>b</p>  ",
        "<ul>\n  <li>x</li>\n</ul>\n\n\n\ntext\n\n\n",
        "",
        "plain text",
    ];
    for input in inputs {
        let once = cleanup_whitespace(input);
        assert_eq!(cleanup_whitespace(&once), once);
    }
}

#[test]
fn test_normalize_properties() {
    let urls = ["http://a.com/x.png", "http://b.org/p?q=1"];
    for url in urls {
        assert_eq!(normalize(url), url.replacen("http://", "https://", 1));
    }
    assert_eq!(normalize("//host/path"), "https://host/path");
    for unchanged in ["https://a.com/x", "data:image/gif;base64,R0lG", "/rel/x.png", "boxcnA"] {
        assert_eq!(normalize(unchanged), unchanged);
    }
}

#[test]
fn test_publish_from_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("boxcnLogo.jpg"), [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

    let source = DirectoryImageSource::new(dir.path());
    let html = Publisher::new().publish_html("![logo](boxcnLogo) ![gone](boxcnGone)", &source);

    assert!(html.contains("src=\"data:image/jpeg;base64,/9j/4A==\""));
    assert!(html.contains("src=\"boxcnGone\""));
}

#[test]
fn test_theme_reload_between_renders() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("theme.wechat.json");
    fs::write(&path, r#"{"tags": {"p": "color: blue;"}}"#).unwrap();

    let publisher = Publisher::new();
    let before = publisher.render_html("x", &ImageRegistry::new());
    publisher.load_theme(&path).unwrap();
    let after = publisher.render_html("x", &ImageRegistry::new());

    assert_eq!(before, format!("<p style=\"{}\">x</p>", builtin_style("p")));
    assert_eq!(after, "<p style=\"color: blue;\">x</p>");
}

#[test]
fn test_malformed_html_does_not_panic() {
    let raw = "<p class=\"a\"<img src=<pre><code>unterminated <style>p{}";
    let html = RestylePipeline::default().process(raw, &ImageRegistry::new());
    assert!(!html.is_empty());
}
