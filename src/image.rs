//! Image reference resolution.
//!
//! Every image that ends up in published output is either a `data:` URI or
//! an absolute `https://` URL. This module turns fetched bytes into data URIs,
//! normalizes URL-like references, and keeps the token registry used by the
//! HTML pipeline.

use crate::error::{Error, Result};
use crate::source::ImageSource;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

/// Images at or above this size take the hosting branch.
pub const LARGE_IMAGE_THRESHOLD: usize = 500 * 1024;

const DEFAULT_MIME: &str = "image/png";
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

static MARKDOWN_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"!\[([^\]\n]*)\]\(\s*([^)\s]+)(\s+"[^"\n]*")?\s*\)"#).unwrap());

/// A self-contained `data:<mime>;base64,<payload>` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// MIME type (e.g., "image/jpeg")
    pub mime_type: String,
    /// Base64-encoded payload
    pub payload: String,
}

impl DataUri {
    /// Encode raw bytes.
    pub fn encode(mime_type: impl Into<String>, data: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            payload: STANDARD.encode(data),
        }
    }

    /// Parse an existing `data:<mime>;base64,<payload>` string.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix("data:")?;
        let (mime_type, payload) = rest.split_once(";base64,")?;
        Some(Self {
            mime_type: mime_type.to_string(),
            payload: payload.to_string(),
        })
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.payload)
    }
}

/// Final form of an image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImage {
    /// Inlined payload
    DataUri(DataUri),
    /// Absolute HTTPS URL
    Https(String),
    /// File name inside a download bundle
    LocalFilename(String),
}

impl fmt::Display for ResolvedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedImage::DataUri(uri) => uri.fmt(f),
            ResolvedImage::Https(url) | ResolvedImage::LocalFilename(url) => f.write_str(url),
        }
    }
}

/// An image token together with its resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Opaque identifier as embedded in the Markdown source
    pub token: String,
    /// Final reference
    pub resolved: ResolvedImage,
}

/// Best-effort normalization of an image reference.
///
/// Only scheme fixes are applied; tokens and paths pass through.
pub fn normalize(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("data:") || raw.starts_with("https://") {
        return raw.to_string();
    }
    if let Some(rest) = raw.strip_prefix("http://") {
        return format!("https://{}", rest);
    }
    if raw.starts_with("//") {
        return format!("https:{}", raw);
    }
    raw.to_string()
}

/// Strict variant of [`normalize`] that rejects anything without a host.
pub fn validate_https(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let candidate = normalize(raw);
    let mut parsed = match url::Url::parse(&candidate) {
        Ok(parsed) => parsed,
        // No scheme means nothing a host could hang off.
        Err(url::ParseError::RelativeUrlWithoutBase) | Err(url::ParseError::EmptyHost) => {
            return Err(Error::NoHost(raw.to_string()));
        }
        Err(source) => {
            return Err(Error::InvalidUrl {
                url: raw.to_string(),
                source,
            });
        }
    };
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(Error::NoHost(raw.to_string()));
    }
    if parsed.scheme() == "http" {
        // Only fails for cannot-be-a-base URLs, which have no host.
        let _ = parsed.set_scheme("https");
    }
    Ok(parsed.into())
}

/// Guess a MIME type from a file-name hint, then from magic bytes.
pub fn sniff_mime(hint: &str, data: &[u8]) -> &'static str {
    let ext = Path::new(hint)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => detect_mime_type(data).unwrap_or(DEFAULT_MIME),
    }
}

/// Detect MIME type from data magic bytes.
pub fn detect_mime_type(data: &[u8]) -> Option<&'static str> {
    // JPEG: FF D8
    if data.starts_with(&[0xFF, 0xD8]) {
        return Some("image/jpeg");
    }

    if data.starts_with(PNG_SIGNATURE) {
        return Some("image/png");
    }

    // GIF87a / GIF89a
    if data.starts_with(b"GIF8") {
        return Some("image/gif");
    }

    None
}

/// Inline raw bytes as a data URI; `local_ref` is only a MIME hint.
pub fn resolve_to_inline(local_ref: &str, data: &[u8]) -> DataUri {
    DataUri::encode(sniff_mime(local_ref, data), data)
}

/// Options for image resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Size at which an image would be sent to an image host
    pub large_image_threshold: usize,
}

impl ResolveOptions {
    /// Create new resolve options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the large-image threshold in bytes.
    pub fn with_large_image_threshold(mut self, bytes: usize) -> Self {
        self.large_image_threshold = bytes;
        self
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            large_image_threshold: LARGE_IMAGE_THRESHOLD,
        }
    }
}

/// Turns fetched images into final references.
#[derive(Debug, Clone, Default)]
pub struct ImageResolver {
    options: ResolveOptions,
}

impl ImageResolver {
    /// Create a resolver with the given options.
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    /// Resolve one fetched image. Never fails.
    pub fn resolve(&self, token: &str, local_name: &str, data: &[u8]) -> ResolvedImage {
        let uri = resolve_to_inline(local_name, data);
        if data.len() >= self.options.large_image_threshold {
            // No image host is wired in; large images are inlined as well.
            log::info!(
                "large image ({} bytes) inlined as data URI, token: {}",
                data.len(),
                token
            );
        }
        ResolvedImage::DataUri(uri)
    }

    /// Fetch and resolve every token, skipping the ones that fail.
    ///
    /// Tokens left out of the registry stay as literal tokens in the output.
    pub fn resolve_all<S, I, T>(&self, source: &S, tokens: I) -> ImageRegistry
    where
        S: ImageSource + ?Sized,
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut registry = ImageRegistry::new();
        for token in tokens {
            let token = token.as_ref();
            match source.fetch_image(token) {
                Ok(image) => {
                    let resolved = self.resolve(token, &image.local_name, &image.data);
                    registry.insert(token, resolved);
                }
                Err(e) => log::warn!("skipping image: {}", e),
            }
        }
        registry
    }
}

/// Token to final reference mapping consumed by the HTML pipeline.
#[derive(Debug, Clone, Default)]
pub struct ImageRegistry {
    entries: HashMap<String, ResolvedImage>,
}

impl ImageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolved image for a token.
    pub fn insert(&mut self, token: impl Into<String>, resolved: ResolvedImage) {
        self.entries.insert(token.into(), resolved);
    }

    /// Register an already-final reference string (data URI or URL).
    pub fn insert_reference(&mut self, token: impl Into<String>, reference: &str) {
        let resolved = match DataUri::parse(reference) {
            Some(uri) => ResolvedImage::DataUri(uri),
            None => ResolvedImage::Https(normalize(reference)),
        };
        self.insert(token, resolved);
    }

    /// Final reference string for a token.
    pub fn get(&self, token: &str) -> Option<String> {
        self.entries.get(token).map(ToString::to_string)
    }

    /// Whether the token has been resolved.
    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Image tokens referenced as `![alt](token)` in Markdown, in order of
/// first appearance.
///
/// Targets with a scheme, a path separator or a file extension are links,
/// not tokens.
pub fn collect_image_tokens(markdown: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    MARKDOWN_IMAGE
        .captures_iter(markdown)
        .map(|caps| caps[2].to_string())
        .filter(|target| !target.contains([':', '/', '.', '#', '?']))
        .filter(|target| seen.insert(target.clone()))
        .collect()
}

/// Replace every `![alt](token)` whose token is registered with its final
/// reference. Unknown tokens stay as they are.
pub fn inline_markdown_images(markdown: &str, images: &ImageRegistry) -> String {
    MARKDOWN_IMAGE
        .replace_all(markdown, |caps: &Captures| match images.get(&caps[2]) {
            Some(resolved) => {
                let title = caps.get(3).map_or("", |m| m.as_str());
                format!("![{}]({}{})", &caps[1], resolved, title)
            }
            None => caps[0].to_string(),
        })
        .into_owned()
}
