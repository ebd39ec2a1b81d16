//! Inline-style themes for the publish HTML pipeline.
//!
//! A [`Theme`] maps HTML tag names to inline CSS declarations, plus one
//! distinguished declaration for `<code>` nested inside `<pre>`. Themes are
//! immutable snapshots; [`ThemeStore`] swaps whole snapshots so concurrent
//! renders never observe a partially loaded theme.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, RwLock};

/// Default theme file name looked up by [`find_theme_file`].
pub const DEFAULT_THEME_FILE: &str = "theme.wechat.json";

/// Theme key that never receives tag-level injection.
pub const PRE_CODE_KEY: &str = "pre_code";

const DEFAULT_TAG_STYLES: &[(&str, &str)] = &[
    ("p", "margin: 12px 0; text-align: justify; word-wrap: break-word; word-break: break-all; line-height: 1.8; font-size: 17px; color: #333333;"),
    ("h1", "font-size: 24px; font-weight: bold; line-height: 1.4; margin: 20px 0 15px; color: #333333;"),
    ("h2", "font-size: 22px; font-weight: bold; line-height: 1.4; margin: 18px 0 12px; color: #333333;"),
    ("h3", "font-size: 20px; font-weight: bold; line-height: 1.4; margin: 16px 0 10px; color: #333333;"),
    ("h4", "font-size: 18px; font-weight: bold; line-height: 1.4; margin: 14px 0 8px; color: #333333;"),
    ("h5", "font-size: 17px; font-weight: bold; line-height: 1.4; margin: 12px 0 6px; color: #333333;"),
    ("h6", "font-size: 16px; font-weight: bold; line-height: 1.4; margin: 10px 0 4px; color: #333333;"),
    ("ul", "margin: 12px 0; padding-left: 30px; list-style-type: disc;"),
    ("ol", "margin: 12px 0; padding-left: 30px;"),
    ("li", "margin: 8px 0; line-height: 1.8; font-size: 17px; color: #333333;"),
    ("blockquote", "margin: 15px 0; padding: 10px 15px; border-left: 4px solid #e6e6e6; background-color: #f9f9f9; color: #666666; font-size: 16px; line-height: 1.8;"),
    ("pre", "background-color: #f5f5f5; padding: 15px; border-radius: 5px; overflow-x: auto; margin: 15px 0; font-size: 14px; line-height: 1.6; color: #333333;"),
    ("code", "background-color: #f5f5f5; padding: 2px 6px; border-radius: 3px; font-family: 'Consolas', 'Monaco', 'Courier New', monospace; font-size: 14px; color: #e83e8c;"),
    ("img", "max-width: 100%; height: auto; display: block; margin: 15px auto; border-radius: 5px;"),
    ("a", "color: #576b95; text-decoration: none; border-bottom: 1px solid #576b95;"),
    ("hr", "border: none; border-top: 1px solid #eaeaea; margin: 20px 0;"),
    ("strong", "font-weight: bold; color: #333333;"),
    ("em", "font-style: italic;"),
    ("u", "text-decoration: underline;"),
    ("span", "font-size: 17px; line-height: 1.8; color: #333333;"),
    ("table", "width: 100%; border-collapse: collapse; margin: 15px 0; font-size: 16px;"),
    ("th", "border: 1px solid #ddd; padding: 10px; text-align: left; background-color: #f5f5f5; font-weight: bold;"),
    ("td", "border: 1px solid #ddd; padding: 10px; text-align: left;"),
    ("figure", "margin: 15px 0;"),
    ("figcaption", "text-align: center; color: #888; font-size: 0.8em; margin-top: 5px;"),
];

const DEFAULT_PRE_CODE_STYLE: &str = "background-color: transparent; padding: 0; font-family: 'Consolas', 'Monaco', 'Courier New', monospace; font-size: 14px; color: #333333;";

static DEFAULT_THEME: LazyLock<Arc<Theme>> = LazyLock::new(|| {
    Arc::new(Theme {
        tags: DEFAULT_TAG_STYLES
            .iter()
            .map(|(tag, style)| (tag.to_string(), style.to_string()))
            .collect(),
        pre_code: DEFAULT_PRE_CODE_STYLE.to_string(),
    })
});

/// Theme file contents as read from disk.
///
/// Only `tags` and `pre_code` are read; any other key is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Tag name to inline CSS declaration; `null` values read as blank
    #[serde(deserialize_with = "null_values_as_blank")]
    pub tags: BTreeMap<String, String>,
    /// Style for `<code>` inside `<pre>`; `null` reads as blank
    #[serde(deserialize_with = "null_as_blank")]
    pub pre_code: String,
}

fn null_as_blank<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_values_as_blank<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = Option::<BTreeMap<String, Option<String>>>::deserialize(deserializer)?;
    Ok(tags
        .unwrap_or_default()
        .into_iter()
        .map(|(tag, style)| (tag, style.unwrap_or_default()))
        .collect())
}

/// An immutable style snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    tags: BTreeMap<String, String>,
    pre_code: String,
}

impl Theme {
    /// The built-in theme shared by every render that has no override.
    pub fn builtin() -> Arc<Theme> {
        Arc::clone(&DEFAULT_THEME)
    }

    /// Build a theme by applying a config on top of `base`.
    ///
    /// A non-empty `tags` map replaces the whole tag mapping; a blank
    /// `pre_code` keeps the base value.
    pub fn with_config(base: &Theme, config: ThemeConfig) -> Theme {
        let tags = if config.tags.is_empty() {
            base.tags.clone()
        } else {
            config.tags
        };
        let pre_code = match config.pre_code.trim() {
            "" => base.pre_code.clone(),
            trimmed => trimmed.to_string(),
        };
        Theme { tags, pre_code }
    }

    /// Load a theme file and layer it over `base`.
    pub fn load(base: &Theme, path: impl AsRef<Path>) -> Result<Theme> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| Error::ThemeRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ThemeConfig =
            serde_json::from_slice(&bytes).map_err(|source| Error::ThemeFormat {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Theme::with_config(base, config))
    }

    /// Parse a theme from JSON text over the built-in defaults.
    pub fn from_json(json: &str) -> std::result::Result<Theme, serde_json::Error> {
        let config: ThemeConfig = serde_json::from_str(json)?;
        Ok(Theme::with_config(&DEFAULT_THEME, config))
    }

    /// Serialize the theme in theme-file format.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_config())
            .map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
    }

    /// Convert back into the on-disk shape.
    pub fn to_config(&self) -> ThemeConfig {
        ThemeConfig {
            tags: self.tags.clone(),
            pre_code: self.pre_code.clone(),
        }
    }

    /// Inline style for a tag, if the theme styles it.
    pub fn tag_style(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    /// Tag styles eligible for injection, in tag-name order.
    ///
    /// Skips the reserved pre-code key and blank declarations.
    pub fn tag_styles(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags
            .iter()
            .filter(|(tag, style)| tag.as_str() != PRE_CODE_KEY && !style.trim().is_empty())
            .map(|(tag, style)| (tag.as_str(), style.as_str()))
    }

    /// Style for `<code>` nested in `<pre>`.
    pub fn pre_code(&self) -> &str {
        &self.pre_code
    }
}

impl Default for Theme {
    fn default() -> Self {
        DEFAULT_THEME.as_ref().clone()
    }
}

/// Shared holder for the current theme snapshot.
#[derive(Debug)]
pub struct ThemeStore {
    current: RwLock<Arc<Theme>>,
}

impl ThemeStore {
    /// Create a store holding the built-in theme.
    pub fn new() -> Self {
        Self::with_theme(Theme::builtin())
    }

    /// Create a store holding `theme`.
    pub fn with_theme(theme: Arc<Theme>) -> Self {
        Self {
            current: RwLock::new(theme),
        }
    }

    /// Load a theme file and swap it in.
    ///
    /// An empty path is a no-op. On failure the current snapshot stays.
    pub fn load_from(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        let theme = Theme::load(&self.snapshot(), path)?;
        log::debug!("loaded theme from {}", path.display());
        self.replace(Arc::new(theme));
        Ok(())
    }

    /// Like [`ThemeStore::load_from`], but logs failures and keeps going.
    pub fn load_or_keep(&self, path: impl AsRef<Path>) -> bool {
        match self.load_from(path) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("{}; keeping current theme", e);
                false
            }
        }
    }

    /// Current snapshot; stays valid even if the store is reloaded.
    pub fn snapshot(&self) -> Arc<Theme> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the current snapshot.
    pub fn replace(&self, theme: Arc<Theme>) {
        match self.current.write() {
            Ok(mut guard) => *guard = theme,
            Err(poisoned) => *poisoned.into_inner() = theme,
        }
    }
}

impl Default for ThemeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Find a theme file named `name` in `dir` or its parent directory.
pub fn find_theme_file(dir: impl AsRef<Path>, name: &str) -> Option<PathBuf> {
    let dir = dir.as_ref();
    let candidates = std::iter::once(dir.join(name)).chain(dir.parent().map(|p| p.join(name)));
    for candidate in candidates {
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_tags() {
        let theme = Theme::builtin();
        for tag in ["p", "h1", "ul", "li", "table", "blockquote", "code", "img", "figcaption"] {
            assert!(theme.tag_style(tag).is_some(), "missing {}", tag);
        }
        assert_eq!(
            theme.tag_style("h1"),
            Some("font-size: 24px; font-weight: bold; line-height: 1.4; margin: 20px 0 15px; color: #333333;")
        );
        assert!(theme.pre_code().starts_with("background-color: transparent;"));
    }

    #[test]
    fn test_config_replaces_tags_wholesale() {
        let config = ThemeConfig {
            tags: BTreeMap::from([("p".to_string(), "color: red;".to_string())]),
            pre_code: String::new(),
        };
        let theme = Theme::with_config(&Theme::default(), config);
        assert_eq!(theme.tag_style("p"), Some("color: red;"));
        assert_eq!(theme.tag_style("h1"), None);
        assert_eq!(theme.pre_code(), DEFAULT_PRE_CODE_STYLE);
    }

    #[test]
    fn test_empty_config_keeps_base() {
        let theme = Theme::with_config(&Theme::default(), ThemeConfig::default());
        assert_eq!(theme, Theme::default());
    }

    #[test]
    fn test_pre_code_trimmed() {
        let theme = Theme::from_json(r#"{"pre_code": "  color: blue;  "}"#).unwrap();
        assert_eq!(theme.pre_code(), "color: blue;");
        assert_eq!(theme.tag_style("p"), Theme::default().tag_style("p"));
    }

    #[test]
    fn test_null_values_read_as_blank() {
        let theme =
            Theme::from_json(r#"{"tags": {"p": "color: red;", "em": null}, "pre_code": null}"#)
                .unwrap();
        assert_eq!(theme.tag_style("p"), Some("color: red;"));
        assert_eq!(theme.pre_code(), DEFAULT_PRE_CODE_STYLE);
        let tags: Vec<_> = theme.tag_styles().map(|(t, _)| t).collect();
        assert_eq!(tags, vec!["p"]);

        let theme = Theme::from_json(r#"{"tags": null}"#).unwrap();
        assert_eq!(theme, Theme::default());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let theme = Theme::from_json(r#"{"callout": {"icon": "x"}, "tags": {"em": "x;"}}"#).unwrap();
        assert_eq!(theme.tag_style("em"), Some("x;"));
    }

    #[test]
    fn test_tag_styles_skip_reserved_and_blank() {
        let theme =
            Theme::from_json(r#"{"tags": {"pre_code": "a;", "p": "b;", "em": "  "}}"#).unwrap();
        let tags: Vec<_> = theme.tag_styles().map(|(t, _)| t).collect();
        assert_eq!(tags, vec!["p"]);
    }

    #[test]
    fn test_store_keeps_snapshot_on_error() {
        let store = ThemeStore::new();
        let before = store.snapshot();
        assert!(store.load_from("/definitely/not/here.json").is_err());
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
        assert!(store.load_from("").is_ok());
    }

    #[test]
    fn test_to_json_roundtrips_shape() {
        let json = Theme::default().to_json().unwrap();
        assert!(json.contains("\"tags\""));
        assert!(json.contains("\"pre_code\""));
        assert_eq!(Theme::from_json(&json).unwrap(), Theme::default());
    }
}
