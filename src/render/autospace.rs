//! Spacing between CJK and Latin runs.

use regex::Regex;
use std::sync::LazyLock;

static CJK_THEN_LATIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\p{Han}\p{Hiragana}\p{Katakana}])([A-Za-z0-9])").unwrap()
});
static LATIN_THEN_CJK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9])([\p{Han}\p{Hiragana}\p{Katakana}])").unwrap()
});

// Spans that must never be touched: inline code, link targets, raw tags.
static PROTECTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]*`|\]\([^)\n]*\)|<[^<>\n]*>").unwrap());

/// Insert a single space wherever a CJK character touches a Latin letter
/// or digit.
///
/// ```
/// use feishu2mp::render::auto_space;
///
/// assert_eq!(auto_space("使用Rust编写"), "使用 Rust 编写");
/// ```
pub fn auto_space(text: &str) -> String {
    let spaced = CJK_THEN_LATIN.replace_all(text, "$1 $2");
    LATIN_THEN_CJK.replace_all(&spaced, "$1 $2").into_owned()
}

/// [`auto_space`] for a line of Markdown source.
///
/// Inline code spans, link destinations and inline HTML keep their bytes.
pub fn auto_space_markdown(line: &str) -> String {
    let mut result = String::with_capacity(line.len() + 8);
    let mut last = 0;
    for m in PROTECTED.find_iter(line) {
        result.push_str(&auto_space(&line[last..m.start()]));
        result.push_str(m.as_str());
        last = m.end();
    }
    result.push_str(&auto_space(&line[last..]));
    result
}
