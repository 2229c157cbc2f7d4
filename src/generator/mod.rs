//! Generator module provides the container writer interface and the EPUB assembler.
//!
//! The assembler renders every descriptor and page of a volume and hands them, as
//! named byte blobs, to a [`ContainerWriter`]. The writer only knows about entries
//! and their storage mode, never about the e-book format.

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod container;
pub mod epub;
pub mod templates;

pub use container::EpubZip;
pub use epub::{Assembler, SpineItem, VolumeLayout};

/// Sequential writer of one container file.
///
/// Entries appear in the container in the order they were written. The file at
/// the target path only becomes visible once [`close`](ContainerWriter::close)
/// succeeds; a writer dropped before that leaves nothing behind.
#[async_trait]
pub trait ContainerWriter: Send + Sized {
    /// Opens a writer for the container at `path`.
    ///
    /// # Parameters
    /// * `path` - Final location of the container file
    ///
    /// # Returns
    /// * `Result<Self>` - A new writer or an error if the target directory is not writable
    fn create(path: &Path) -> Result<Self>;

    /// Adds a compressed entry.
    async fn write_content(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Adds an entry stored verbatim, without recompression.
    async fn write_raw(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Finalizes the container and moves it to its target path.
    ///
    /// # Returns
    /// * `Result<PathBuf>` - The path of the written file
    async fn close(self) -> Result<PathBuf>;
}
