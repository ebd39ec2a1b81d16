//! Image sources.
//!
//! The document API client lives outside this crate; it plugs in by
//! implementing [`ImageSource`]. Two local sources are provided for the CLI
//! and for tests.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Raw bytes of a fetched image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    /// File name to use when the image is written to disk or an archive
    pub local_name: String,
    /// Raw image bytes
    pub data: Vec<u8>,
}

impl FetchedImage {
    /// Create a fetched image.
    pub fn new(local_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            local_name: local_name.into(),
            data,
        }
    }
}

/// Trait for anything that can fetch images by token.
///
/// Errors are reported per token; callers decide whether a failure is fatal.
pub trait ImageSource: Send + Sync {
    /// Fetch the image behind `token`.
    fn fetch_image(&self, token: &str) -> Result<FetchedImage>;
}

impl<F> ImageSource for F
where
    F: Fn(&str) -> Result<FetchedImage> + Send + Sync,
{
    fn fetch_image(&self, token: &str) -> Result<FetchedImage> {
        self(token)
    }
}

/// Serves images from a directory, matching files by stem.
///
/// Token `boxcnAbc` resolves to `boxcnAbc`, or `boxcnAbc.<ext>` if no
/// exact file exists.
#[derive(Debug, Clone)]
pub struct DirectoryImageSource {
    root: PathBuf,
}

impl DirectoryImageSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory images are served from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, token: &str) -> std::io::Result<Option<PathBuf>> {
        let exact = self.root.join(token);
        if exact.is_file() {
            return Ok(Some(exact));
        }
        let mut matches: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.file_stem().and_then(|s| s.to_str()) == Some(token))
            .collect();
        matches.sort();
        Ok(matches.into_iter().next())
    }
}

impl ImageSource for DirectoryImageSource {
    fn fetch_image(&self, token: &str) -> Result<FetchedImage> {
        let fetch_error = |reason: String| Error::ImageFetch {
            token: token.to_string(),
            reason,
        };
        if token.is_empty() || token.contains(['/', '\\']) || token == ".." {
            return Err(fetch_error("not a bare token".to_string()));
        }
        let path = self
            .locate(token)
            .map_err(|e| fetch_error(e.to_string()))?
            .ok_or_else(|| fetch_error(format!("no file in {}", self.root.display())))?;
        let data = fs::read(&path).map_err(|e| fetch_error(e.to_string()))?;
        let local_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| token.to_string());
        Ok(FetchedImage::new(local_name, data))
    }
}

/// In-memory image source.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageSource {
    images: HashMap<String, FetchedImage>,
}

impl MemoryImageSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image for `token`.
    pub fn insert(&mut self, token: impl Into<String>, local_name: impl Into<String>, data: Vec<u8>) {
        self.images
            .insert(token.into(), FetchedImage::new(local_name, data));
    }

    /// Builder-style [`MemoryImageSource::insert`].
    pub fn with_image(
        mut self,
        token: impl Into<String>,
        local_name: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        self.insert(token, local_name, data);
        self
    }
}

impl ImageSource for MemoryImageSource {
    fn fetch_image(&self, token: &str) -> Result<FetchedImage> {
        self.images
            .get(token)
            .cloned()
            .ok_or_else(|| Error::ImageFetch {
                token: token.to_string(),
                reason: "unknown token".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source() {
        let source = MemoryImageSource::new().with_image("a", "a.png", vec![1, 2, 3]);
        assert_eq!(source.fetch_image("a").unwrap().local_name, "a.png");
        assert!(matches!(
            source.fetch_image("b"),
            Err(Error::ImageFetch { ref token, .. }) if token == "b"
        ));
    }

    #[test]
    fn test_closure_source() {
        let source = |token: &str| -> Result<FetchedImage> {
            Ok(FetchedImage::new(format!("{}.gif", token), b"GIF89a".to_vec()))
        };
        let image = source.fetch_image("x").unwrap();
        assert_eq!(image.local_name, "x.gif");
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("boxcnA.jpg"), [0xFF, 0xD8, 0xFF]).unwrap();
        fs::write(dir.path().join("plain"), b"raw").unwrap();

        let source = DirectoryImageSource::new(dir.path());
        let image = source.fetch_image("boxcnA").unwrap();
        assert_eq!(image.local_name, "boxcnA.jpg");
        assert_eq!(image.data, vec![0xFF, 0xD8, 0xFF]);

        assert_eq!(source.fetch_image("plain").unwrap().local_name, "plain");
        assert!(source.fetch_image("missing").is_err());
        assert!(source.fetch_image("../etc").is_err());
    }
}
