//! Custom error types and result handling for Shiori operations.
//!
//! All operations return a [`Result<T>`] which is a type alias for `std::result::Result<T, Error>`.
//! The variants separate the failure classes a caller may want to react to differently:
//! a page that cannot be filtered ([`Error::Transform`]), a page whose size is unknown
//! ([`Error::MissingPage`]), an empty input ([`Error::NoPages`]) and plain storage errors.
//!
use std::path::PathBuf;

use crate::types::PageKey;

/// Type alias for Results with Shiori errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all Shiori operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O errors from the standard library
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Image decoding/encoding errors outside of a specific page
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// ZIP container errors
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// Async task join errors
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    /// Worker pool could not be created
    #[error(transparent)]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    ShioriBuilder(#[from] crate::shiori::ShioriConfigBuilderError),
    /// A single page could not be decoded or transformed.
    #[error("Failed to process page '{page}': {source}")]
    Transform {
        page: String,
        #[source]
        source: image::ImageError,
    },
    /// The input did not contain a single page.
    #[error("Nothing to convert: no pages were supplied")]
    NoPages,
    /// A page is referenced but its bytes are not in the page store.
    #[error("No stored data for page {0}")]
    MissingPage(PageKey),
    /// Two pages were produced with the same `(id, part)` key.
    #[error("Page {0} was stored twice")]
    DuplicatePage(PageKey),
    /// Error for invalid file or directory paths
    #[error("The given path '{0:?}' is invalid: {1}")]
    InvalidPath(PathBuf, String),
    /// Error for failed asynchronous tasks
    #[error("Asynchronous task failed: {0}")]
    AsyncTaskError(String),
    /// Error for unsupported operations or formats
    #[error("Unsupported: {0}")]
    Unsupported(String),
    /// Error for resources that couldn't be found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Other errors that don't fit into specific categories
    #[error("Other error: {0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Other(error)
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error::Other(error.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(error: tempfile::PersistError) -> Self {
        Error::Io(error.error)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
