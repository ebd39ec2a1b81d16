//! JSON export of a document's Markdown.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Markdown with images inlined, ready to hand to a browser client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownExport {
    /// Formatted Markdown; resolved images are `data:` URIs
    pub markdown: String,

    /// Identifier of the source document
    pub doc_token: String,

    /// Source document type, when known (e.g., "docx")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,

    /// Whether the source referenced any images
    pub has_images: bool,
}

/// Serialize an export to JSON.
pub fn to_json(export: &MarkdownExport, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(export),
        JsonFormat::Compact => serde_json::to_string(export),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}
