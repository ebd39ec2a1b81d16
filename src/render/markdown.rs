//! Markdown to HTML rendering.

use super::autospace::auto_space;
use super::format::{FormatOptions, MarkdownFormatter};
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream};

/// Options for Markdown rendering.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Insert spaces between CJK and Latin runs in text
    pub auto_space: bool,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable CJK/Latin auto-spacing.
    pub fn with_auto_space(mut self, enabled: bool) -> Self {
        self.auto_space = enabled;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { auto_space: true }
    }
}

/// The Markdown engine used by both publishing paths.
pub trait MarkdownRenderer: Send + Sync {
    /// Render Markdown to an HTML fragment.
    fn render_html(&self, markdown: &str, options: &RenderOptions) -> String;

    /// Normalize Markdown source before it is bundled.
    fn format_markdown(&self, markdown: &str) -> String;
}

/// [`MarkdownRenderer`] backed by pulldown-cmark.
#[derive(Debug, Clone, Default)]
pub struct CmarkRenderer {
    formatter: MarkdownFormatter,
}

impl CmarkRenderer {
    /// Create a renderer with the default formatter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a renderer with custom formatting options.
    pub fn with_format_options(options: FormatOptions) -> Self {
        Self {
            formatter: MarkdownFormatter::new(options),
        }
    }

    fn parser_options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        options
    }
}

impl MarkdownRenderer for CmarkRenderer {
    fn render_html(&self, markdown: &str, options: &RenderOptions) -> String {
        let parser = TextMergeStream::new(Parser::new_ext(markdown, Self::parser_options()));

        let mut in_code_block = false;
        let events = parser.map(|event| match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                Event::Start(Tag::CodeBlock(kind))
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                Event::End(TagEnd::CodeBlock)
            }
            Event::Text(text) if options.auto_space && !in_code_block => {
                Event::Text(CowStr::from(auto_space(&text)))
            }
            other => other,
        });

        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut output, events);
        output
    }

    fn format_markdown(&self, markdown: &str) -> String {
        self.formatter.format(markdown)
    }
}
