//! Download bundles: a Markdown file, or a zip of Markdown plus images.

use crate::error::{Error, Result};
use crate::image::{ImageReference, ResolvedImage};
use crate::render::MarkdownRenderer;
use crate::source::{FetchedImage, ImageSource};
use flate2::Compression;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// How image tokens in the Markdown are rewritten to local file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenRewrite {
    /// Only the first occurrence of each token
    #[default]
    FirstOccurrence,
    /// Every occurrence of each token
    AllOccurrences,
}

/// Options for bundle assembly.
#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    /// Token rewriting mode
    pub token_rewrite: TokenRewrite,

    /// Deflate level for archive entries (None = library default)
    pub compression: Option<Compression>,
}

impl BundleOptions {
    /// Create new bundle options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token rewriting mode.
    pub fn with_token_rewrite(mut self, mode: TokenRewrite) -> Self {
        self.token_rewrite = mode;
        self
    }

    /// Set the deflate level.
    pub fn with_compression(mut self, level: Compression) -> Self {
        self.compression = Some(level);
        self
    }
}

/// An image destined for a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleImage {
    /// Token as it appears in the Markdown
    pub token: String,
    /// File name inside the archive
    pub local_name: String,
    /// Raw image bytes
    pub data: Vec<u8>,
}

impl BundleImage {
    /// Create a bundle image.
    pub fn new(token: impl Into<String>, local_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            token: token.into(),
            local_name: local_name.into(),
            data,
        }
    }

    /// Pair a fetched image with its token.
    pub fn from_fetched(token: impl Into<String>, image: FetchedImage) -> Self {
        Self::new(token, image.local_name, image.data)
    }

    /// The token resolved to its file name inside the archive.
    pub fn reference(&self) -> ImageReference {
        ImageReference {
            token: self.token.clone(),
            resolved: ResolvedImage::LocalFilename(self.local_name.clone()),
        }
    }
}

/// One file inside an archive bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Entry path inside the archive
    pub name: String,
    /// Entry contents
    pub data: Vec<u8>,
}

/// Result of bundling a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bundle {
    /// Single Markdown file (document without images)
    Markdown {
        /// `<document id>.md`
        name: String,
        /// Formatted Markdown
        content: String,
    },
    /// Zip archive with the images and the Markdown file
    Archive {
        /// `<document id>.zip`
        name: String,
        /// Entries in write order: images first, Markdown last
        entries: Vec<BundleEntry>,
        /// Encoded zip file
        data: Vec<u8>,
    },
}

impl Bundle {
    /// File name to offer for download.
    pub fn file_name(&self) -> &str {
        match self {
            Bundle::Markdown { name, .. } | Bundle::Archive { name, .. } => name,
        }
    }

    /// Bytes to write or send.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Bundle::Markdown { content, .. } => content.as_bytes(),
            Bundle::Archive { data, .. } => data,
        }
    }

    /// Archive entries; empty for a bare Markdown file.
    pub fn entries(&self) -> &[BundleEntry] {
        match self {
            Bundle::Markdown { .. } => &[],
            Bundle::Archive { entries, .. } => entries,
        }
    }

    /// Whether this bundle is a zip archive.
    pub fn is_archive(&self) -> bool {
        matches!(self, Bundle::Archive { .. })
    }

    /// MIME type of [`Bundle::bytes`].
    pub fn mime_type(&self) -> &'static str {
        match self {
            Bundle::Markdown { .. } => "text/markdown",
            Bundle::Archive { .. } => "application/zip",
        }
    }

    /// Write the bundle into `dir` under its file name.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(self.file_name());
        fs::write(&path, self.bytes())?;
        Ok(path)
    }
}

/// Build a bundle for a document.
///
/// Without images the formatted Markdown is returned as `<id>.md`. With
/// images every token is rewritten to its local name and everything is
/// packed into `<id>.zip`. Any archive error fails the whole call.
pub fn assemble<R>(
    renderer: &R,
    markdown: &str,
    images: &[BundleImage],
    document_id: &str,
    options: &BundleOptions,
) -> Result<Bundle>
where
    R: MarkdownRenderer + ?Sized,
{
    let md_name = format!("{}.md", document_id);
    if images.is_empty() {
        return Ok(Bundle::Markdown {
            name: md_name,
            content: renderer.format_markdown(markdown),
        });
    }

    let mut text = markdown.to_string();
    let mut entries = Vec::with_capacity(images.len() + 1);
    for image in images {
        let reference = image.reference();
        let local = reference.resolved.to_string();
        text = match options.token_rewrite {
            TokenRewrite::FirstOccurrence => text.replacen(&reference.token, &local, 1),
            TokenRewrite::AllOccurrences => text.replace(&reference.token, &local),
        };
        entries.push(BundleEntry {
            name: image.local_name.clone(),
            data: image.data.clone(),
        });
    }
    entries.push(BundleEntry {
        name: md_name,
        data: renderer.format_markdown(&text).into_bytes(),
    });

    let data = write_archive(&entries, options)?;
    Ok(Bundle::Archive {
        name: format!("{}.zip", document_id),
        entries,
        data,
    })
}

/// Fetch every token for bundling, skipping images that fail.
pub fn fetch_bundle_images<S, I, T>(source: &S, tokens: I) -> Vec<BundleImage>
where
    S: ImageSource + ?Sized,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    tokens
        .into_iter()
        .filter_map(|token| {
            let token = token.as_ref();
            match source.fetch_image(token) {
                Ok(image) => Some(BundleImage::from_fetched(token, image)),
                Err(e) => {
                    log::warn!("leaving image token in place: {}", e);
                    None
                }
            }
        })
        .collect()
}

fn write_archive(entries: &[BundleEntry], options: &BundleOptions) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(options.compression.map(|c| i64::from(c.level())));

    for entry in entries {
        zip.start_file(entry.name.as_str(), file_options)
            .map_err(|e| Error::archive(&entry.name, e))?;
        zip.write_all(&entry.data)
            .map_err(|e| Error::archive(&entry.name, e.into()))?;
        log::debug!("archived {} ({} bytes)", entry.name, entry.data.len());
    }

    let cursor = zip
        .finish()
        .map_err(|e| Error::archive("central directory", e))?;
    Ok(cursor.into_inner())
}
