//! Error types for feishu2mp library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for feishu2mp operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while publishing a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The theme file could not be read.
    #[error("failed to read theme file {}: {source}", path.display())]
    ThemeRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The theme file is not a JSON object of the expected shape.
    #[error("invalid theme file {}: {source}", path.display())]
    ThemeFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An image could not be fetched from its source.
    #[error("failed to fetch image {token}: {reason}")]
    ImageFetch { token: String, reason: String },

    /// An archive entry could not be created or written.
    #[error("failed to write archive entry {entry}: {source}")]
    ArchiveWrite {
        entry: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// The URL could not be parsed.
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The URL has no host component.
    #[error("URL has no host: {0}")]
    NoHost(String),

    /// Error during rendering (JSON export).
    #[error("Rendering error: {0}")]
    Render(String),
}

impl Error {
    /// Whether this error aborts the whole request.
    ///
    /// Theme and image fetch failures only degrade the output; everything
    /// else is surfaced to the caller.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::ThemeRead { .. } | Error::ThemeFormat { .. } | Error::ImageFetch { .. }
        )
    }

    pub(crate) fn archive(entry: impl Into<String>, source: zip::result::ZipError) -> Self {
        Error::ArchiveWrite {
            entry: entry.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoHost("/only/a/path".to_string());
        assert_eq!(err.to_string(), "URL has no host: /only/a/path");

        let err = Error::ImageFetch {
            token: "boxcnAbc".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "failed to fetch image boxcnAbc: not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_fatality() {
        let fetch = Error::ImageFetch {
            token: "t".to_string(),
            reason: "timeout".to_string(),
        };
        assert!(!fetch.is_fatal());

        let theme = Error::ThemeRead {
            path: PathBuf::from("theme.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(!theme.is_fatal());

        let archive = Error::archive("a.png", zip::result::ZipError::FileNotFound);
        assert!(archive.is_fatal());
        assert!(archive.to_string().contains("a.png"));
    }
}
