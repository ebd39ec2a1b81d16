//! Restyling pipeline: raw renderer HTML in, paste-ready HTML out.
//!
//! The target platform drops `<style>`, `<link>` and `<script>` and ignores
//! class-based styling, so every style must live in a `style` attribute.
//! The pipeline works on text, not on a DOM: each stage is a pure
//! `&str -> String` rewrite, and malformed markup simply fails to match.
//!
//! Stage order is fixed:
//!
//! 1. [`substitute_images`]
//! 2. [`strip_tags`]
//! 3. [`strip_attributes`]
//! 4. [`inject_styles`]
//! 5. [`apply_pre_code_style`]
//! 6. [`cleanup_whitespace`]

use crate::image::{normalize, ImageRegistry};
use crate::theme::Theme;
use regex::{Captures, Regex};
use std::sync::{Arc, LazyLock};

static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());
static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<style\b[^>]*>[\s\S]*?</style\s*>").unwrap());
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<script\b[^>]*>[\s\S]*?</script\s*>").unwrap());
// Stray openers/closers left behind by unbalanced input, plus every <link>.
static STRAY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:style|script|link)\b[^>]*>").unwrap());

static OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?>").unwrap());
static STRIPPED_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+(?:class|id|data-[\w.:-]*)\s*=\s*(?:"[^"]*"|'[^']*')"#).unwrap()
});

static STYLE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\sstyle\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static PRE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<pre(?:\s[^>]*)?>").unwrap());
static CODE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<code(?:\s[^>]*)?>").unwrap());
static PRE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</pre\s*>").unwrap());

static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Stage 1: replace `<img src>` values with registered references, or
/// normalize them when the token is unknown.
pub fn substitute_images(html: &str, images: &ImageRegistry) -> String {
    IMG_TAG
        .replace_all(html, |tag: &Captures| {
            SRC_ATTR
                .replacen(&tag[0], 1, |attr: &Captures| {
                    let (quote, value) = match (attr.get(2), attr.get(3)) {
                        (Some(v), _) => ('"', v.as_str()),
                        (None, Some(v)) => ('\'', v.as_str()),
                        (None, None) => return attr[0].to_string(),
                    };
                    let resolved = images.get(value).unwrap_or_else(|| normalize(value));
                    format!("{}{}{}{}", &attr[1], quote, resolved, quote)
                })
                .into_owned()
        })
        .into_owned()
}

/// Stage 2: drop `<style>` and `<script>` elements with their contents,
/// and every `<link>` tag.
pub fn strip_tags(html: &str) -> String {
    let html = STYLE_BLOCK.replace_all(html, "");
    let html = SCRIPT_BLOCK.replace_all(&html, "");
    STRAY_TAG.replace_all(&html, "").into_owned()
}

/// Stage 3: drop `class`, `id` and `data-*` attributes from every tag.
pub fn strip_attributes(html: &str) -> String {
    OPEN_TAG
        .replace_all(html, |tag: &Captures| {
            STRIPPED_ATTR.replace_all(&tag[0], "").into_owned()
        })
        .into_owned()
}

/// Stage 4: add each theme declaration to every opening tag it names.
pub fn inject_styles(html: &str, theme: &Theme) -> String {
    let mut result = html.to_string();
    for (tag, style) in theme.tag_styles() {
        result = inject_tag_style(&result, tag, style);
    }
    result
}

/// Add `style` to every opening `<tag>`.
///
/// An existing `style` attribute keeps its value after the new
/// declaration, which is prepended as is; otherwise a fresh, escaped
/// attribute is added before the tag terminator.
pub fn inject_tag_style(html: &str, tag: &str, style: &str) -> String {
    let pattern = format!(r"(?i)<{}(?:\s[^>]*)?>", regex::escape(tag));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            log::warn!("skipping style for <{}>: {}", tag, e);
            return html.to_string();
        }
    };
    re.replace_all(html, |caps: &Captures| {
        set_style(&caps[0], style, StyleMode::Prepend)
    })
    .into_owned()
}

/// Stage 5: give `<code>` inside `<pre>` the dedicated pre-code style.
///
/// Only the first `<code>` before the matching `</pre>` is touched; the
/// `<pre>` tag itself keeps the style injected by stage 4.
pub fn apply_pre_code_style(html: &str, style: &str) -> String {
    if style.trim().is_empty() {
        return html.to_string();
    }
    let mut result = String::with_capacity(html.len() + style.len());
    let mut last = 0;
    for pre in PRE_OPEN.find_iter(html) {
        if pre.start() < last {
            continue;
        }
        let body = &html[pre.end()..];
        let close = PRE_CLOSE.find(body).map_or(body.len(), |m| m.start());
        if let Some(code) = CODE_OPEN.find(&body[..close]) {
            let start = pre.end() + code.start();
            let end = pre.end() + code.end();
            result.push_str(&html[last..start]);
            result.push_str(&set_style(&html[start..end], style, StyleMode::Replace));
            last = end;
        }
    }
    result.push_str(&html[last..]);
    result
}

/// Stage 6: collapse whitespace between tags and runs of blank lines.
///
/// Idempotent.
pub fn cleanup_whitespace(html: &str) -> String {
    let html = BETWEEN_TAGS.replace_all(html, "><");
    let html = BLANK_LINES.replace_all(&html, "\n\n");
    html.trim().to_string()
}

#[derive(Clone, Copy)]
enum StyleMode {
    Prepend,
    Replace,
}

// Prepended declarations go in raw; any value that stands alone is escaped.
fn set_style(open_tag: &str, style: &str, mode: StyleMode) -> String {
    let escaped = htmlescape::encode_minimal(style);
    if STYLE_ATTR.is_match(open_tag) {
        return STYLE_ATTR
            .replacen(open_tag, 1, |attr: &Captures| {
                let (quote, existing) = match (attr.get(2), attr.get(3)) {
                    (Some(v), _) => ('"', v.as_str()),
                    (_, Some(v)) => ('\'', v.as_str()),
                    (None, None) => ('"', ""),
                };
                let value = match mode {
                    StyleMode::Prepend if !existing.trim().is_empty() => {
                        format!("{} {}", style, existing)
                    }
                    _ => escaped.clone(),
                };
                format!("{}{}{}{}", &attr[1], quote, value, quote)
            })
            .into_owned();
    }

    let trimmed = open_tag.trim_end();
    if let Some(head) = trimmed.strip_suffix("/>") {
        format!("{} style=\"{}\" />", head.trim_end(), escaped)
    } else {
        let head = trimmed.strip_suffix('>').unwrap_or(trimmed);
        format!("{} style=\"{}\">", head.trim_end(), escaped)
    }
}

/// The restyling pipeline bound to one theme snapshot.
#[derive(Debug, Clone)]
pub struct RestylePipeline {
    theme: Arc<Theme>,
}

impl RestylePipeline {
    /// Create a pipeline for a theme snapshot.
    pub fn new(theme: Arc<Theme>) -> Self {
        Self { theme }
    }

    /// Theme this pipeline injects.
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Run every stage over renderer output.
    pub fn process(&self, html: &str, images: &ImageRegistry) -> String {
        let theme = self.theme.as_ref();
        let stages: [(&str, &dyn Fn(&str) -> String); 6] = [
            ("images", &|h: &str| substitute_images(h, images)),
            ("tags", &strip_tags),
            ("attributes", &strip_attributes),
            ("styles", &|h: &str| inject_styles(h, theme)),
            ("pre-code", &|h: &str| apply_pre_code_style(h, theme.pre_code())),
            ("whitespace", &cleanup_whitespace),
        ];

        let mut result = html.to_string();
        for (name, stage) in stages {
            result = stage(&result);
            log::debug!("restyle stage {} -> {} bytes", name, result.len());
        }
        result
    }
}

impl Default for RestylePipeline {
    fn default() -> Self {
        Self::new(Theme::builtin())
    }
}
