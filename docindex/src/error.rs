//! Error types for the `docindex` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while ingesting, indexing or searching documents.
#[derive(Debug, Error)]
pub enum DocIndexError {
    /// A file or path does not exist.
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An argument has the wrong shape, e.g. a directory where a file was expected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// All input reduced to nothing after sanitization.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// No extractor is registered for the file extension.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Reading or writing a file failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A persisted index could not be encoded or decoded.
    #[error("Serialization error at {}: {source}", path.display())]
    Serialization {
        /// The index file involved.
        path: PathBuf,
        /// The underlying JSON failure.
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration, such as `chunk_overlap >= chunk_size`.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The embedding provider failed.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A content extractor could not read the file.
    #[error("Extraction error ({format}): {message}")]
    Extraction {
        /// The file format being extracted.
        format: String,
        /// A description of the failure.
        message: String,
    },
}

impl DocIndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn extraction(format: &str, message: impl std::fmt::Display) -> Self {
        Self::Extraction { format: format.to_string(), message: message.to_string() }
    }
}

/// A convenience result type for docindex operations.
pub type Result<T> = std::result::Result<T, DocIndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_shows_path() {
        let err = DocIndexError::NotFound(PathBuf::from("/tmp/missing.pdf"));
        assert_eq!(err.to_string(), "Path not found: /tmp/missing.pdf");
    }

    #[test]
    fn io_error_keeps_source() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DocIndexError::io("/root/index.json", source);
        assert!(err.to_string().contains("/root/index.json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn extraction_error_names_format() {
        let err = DocIndexError::extraction("docx", "missing word/document.xml");
        assert_eq!(err.to_string(), "Extraction error (docx): missing word/document.xml");
    }
}
