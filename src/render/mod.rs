//! Rendering module: Markdown to HTML, the restyling pipeline and exports.

mod autospace;
mod format;
mod json;
mod markdown;
pub mod restyle;

pub use autospace::{auto_space, auto_space_markdown};
pub use format::{FormatOptions, MarkdownFormatter};
pub use json::{to_json, JsonFormat, MarkdownExport};
pub use markdown::{CmarkRenderer, MarkdownRenderer, RenderOptions};
pub use restyle::RestylePipeline;
