//! Error types for the registry crate.
//!
//! This module defines [`RegistryError`], the error type used throughout
//! the crate, along with helper traits for error context.

use miette::Diagnostic;
use repomd_dl::DownloadError;
use thiserror::Error;

/// Errors that can occur while resolving or decoding repository metadata.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Malformed repository index: {0}")]
    #[diagnostic(
        code(repomd_registry::malformed_index),
        help("The repomd.xml document must be well-formed XML rooted at <repomd>")
    )]
    MalformedIndex(String),

    #[error("Failed to fetch {url}")]
    #[diagnostic(
        code(repomd_registry::fetch),
        help("Verify the mirror URL and repository path are correct and accessible")
    )]
    Fetch {
        url: String,
        #[source]
        source: DownloadError,
    },

    #[error("Failed to decompress catalog: {0}")]
    #[diagnostic(
        code(repomd_registry::decompression),
        help("Only gzip-compressed XML catalogs are supported")
    )]
    Decompression(String),

    #[error("Malformed package catalog: {0}")]
    #[diagnostic(
        code(repomd_registry::malformed_catalog),
        help("The catalog file may be corrupted or truncated")
    )]
    MalformedCatalog(String),

    #[error("Failed to decode package #{index}: {reason}")]
    #[diagnostic(
        code(repomd_registry::fragment_decode),
        help("Use the skip-invalid decode policy to ignore broken package entries")
    )]
    FragmentDecode { index: usize, reason: String },

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(repomd_registry::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("Invalid URL: {0}")]
    #[diagnostic(
        code(repomd_registry::invalid_url),
        help("Ensure the URL is valid and properly formatted")
    )]
    InvalidUrl(String),

    #[error("{0}")]
    #[diagnostic(code(repomd_registry::custom))]
    Custom(String),
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            RegistryError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::MalformedIndex("expected root element `repomd`".to_string());
        assert_eq!(
            err.to_string(),
            "Malformed repository index: expected root element `repomd`"
        );

        let err = RegistryError::FragmentDecode {
            index: 3,
            reason: "duplicate field `name`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to decode package #3: duplicate field `name`"
        );

        let err = RegistryError::InvalidUrl("bad-url".to_string());
        assert_eq!(err.to_string(), "Invalid URL: bad-url");
    }

    #[test]
    fn test_with_context() {
        let result: std::io::Result<()> = Err(std::io::Error::other("boom"));
        let err = result
            .with_context(|| "reading repomd.xml".to_string())
            .unwrap_err();

        match err {
            RegistryError::IoError { action, .. } => assert_eq!(action, "reading repomd.xml"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fetch_error_keeps_source() {
        let err = RegistryError::Fetch {
            url: "https://example.com/repodata/repomd.xml".to_string(),
            source: DownloadError::HttpError {
                status: 404,
                url: "https://example.com/repodata/repomd.xml".to_string(),
            },
        };

        assert!(err.to_string().contains("https://example.com/repodata/repomd.xml"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
