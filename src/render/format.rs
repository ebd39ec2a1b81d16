//! Markdown normalization applied before a document is bundled.

use super::autospace::auto_space_markdown;
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s{0,3}(`{3,}|~{3,})").unwrap());

/// Options for Markdown formatting.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Normalize Unicode to NFC form
    pub normalize_unicode: bool,

    /// Insert spaces between CJK and Latin runs outside code
    pub auto_space: bool,

    /// Strip trailing whitespace (hard breaks are kept as two spaces)
    pub trim_trailing_whitespace: bool,

    /// Maximum consecutive newlines (0 = unlimited)
    pub max_consecutive_newlines: u8,
}

impl FormatOptions {
    /// Create new format options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only line endings and the trailing newline are touched.
    pub fn minimal() -> Self {
        Self {
            normalize_unicode: false,
            auto_space: false,
            trim_trailing_whitespace: false,
            max_consecutive_newlines: 0,
        }
    }

    /// Enable or disable auto-spacing.
    pub fn with_auto_space(mut self, enabled: bool) -> Self {
        self.auto_space = enabled;
        self
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            auto_space: true,
            trim_trailing_whitespace: true,
            max_consecutive_newlines: 2,
        }
    }
}

/// Line-oriented Markdown formatter.
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormatter {
    options: FormatOptions,
}

impl MarkdownFormatter {
    /// Create a formatter with the given options.
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    /// Format Markdown text.
    pub fn format(&self, markdown: &str) -> String {
        let mut result = markdown.replace("\r\n", "\n").replace('\r', "\n");

        if self.options.normalize_unicode {
            result = result.nfc().collect();
        }

        result = self.format_lines(&result);

        if self.options.max_consecutive_newlines > 0 {
            result = self.limit_newlines(&result);
        }

        let trimmed = result.trim_matches('\n');
        if trimmed.is_empty() {
            return String::new();
        }
        format!("{}\n", trimmed)
    }

    fn format_lines(&self, text: &str) -> String {
        let mut fence: Option<String> = None;
        let mut lines = Vec::new();

        for line in text.split('\n') {
            if let Some(open) = &fence {
                if line.trim_start().starts_with(open.as_str()) {
                    fence = None;
                }
                lines.push(line.to_string());
                continue;
            }
            if let Some(caps) = FENCE.captures(line) {
                fence = Some(caps[1].to_string());
                lines.push(self.trim_line(line));
                continue;
            }

            let mut formatted = self.trim_line(line);
            if self.options.auto_space {
                formatted = auto_space_markdown(&formatted);
            }
            lines.push(formatted);
        }

        lines.join("\n")
    }

    fn trim_line(&self, line: &str) -> String {
        if !self.options.trim_trailing_whitespace {
            return line.to_string();
        }
        let content = line.trim_end();
        if content.is_empty() {
            return String::new();
        }
        if line[content.len()..].starts_with("  ") {
            // Markdown hard line break
            format!("{}  ", content)
        } else {
            content.to_string()
        }
    }

    fn limit_newlines(&self, text: &str) -> String {
        let max = self.options.max_consecutive_newlines as usize;
        let pattern = format!(r"\n{{{},}}", max + 1);
        match Regex::new(&pattern) {
            Ok(re) => {
                let replacement = "\n".repeat(max);
                re.replace_all(text, replacement.as_str()).into_owned()
            }
            Err(e) => {
                log::warn!("newline limit not applied: {}", e);
                text.to_string()
            }
        }
    }
}
