use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::task::spawn_blocking;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::generator::ContainerWriter;
use crate::path_utils::path_to_string_lossy;

/// A ZIP container writer for EPUB files.
///
/// Entries go to a hidden temporary file next to the target and the finished
/// archive is renamed into place on [`close`](ContainerWriter::close), so an
/// interrupted volume never shows up as a truncated `.epub`.
pub struct EpubZip {
    zip: Option<ZipWriter<NamedTempFile>>,
    path: PathBuf,
    content_options: SimpleFileOptions,
    raw_options: SimpleFileOptions,
    entries: usize,
}

impl EpubZip {
    fn writer(&mut self) -> Result<&mut ZipWriter<NamedTempFile>> {
        self.zip
            .as_mut()
            .ok_or_else(|| Error::Unsupported("Zip writer not available".to_string()))
    }

    fn start(&mut self, name: &str, options: SimpleFileOptions, bytes: &[u8]) -> Result<()> {
        let zip = self.writer()?;
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
        self.entries += 1;
        log::debug!("{}: {} ({} bytes)", path_to_string_lossy(&self.path), name, bytes.len());
        Ok(())
    }

    /// Number of entries written so far.
    pub fn entries(&self) -> usize {
        self.entries
    }
}

impl std::fmt::Debug for EpubZip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpubZip")
            .field("path", &self.path)
            .field("entries", &self.entries)
            .field("open", &self.zip.is_some())
            .finish()
    }
}

#[async_trait]
impl ContainerWriter for EpubZip {
    fn create(path: &Path) -> Result<Self> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if !dir.is_dir() {
            return Err(Error::InvalidPath(
                path.to_path_buf(),
                "Output directory does not exist".to_string(),
            ));
        }

        let file = tempfile::Builder::new()
            .prefix(".shiori-")
            .suffix(".part")
            .tempfile_in(dir)?;

        Ok(EpubZip {
            zip: Some(ZipWriter::new(file)),
            path: path.to_path_buf(),
            content_options: SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated),
            raw_options: SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
            entries: 0,
        })
    }

    async fn write_content(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let options = self.content_options;
        self.start(name, options, bytes)
    }

    async fn write_raw(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let options = self.raw_options;
        self.start(name, options, bytes)
    }

    async fn close(mut self) -> Result<PathBuf> {
        let zip = self
            .zip
            .take()
            .ok_or_else(|| Error::Unsupported("Zip writer not available".to_string()))?;
        let path = self.path.clone();

        // Finish writing the archive and move it into place in a blocking task
        let path = spawn_blocking(move || -> Result<PathBuf> {
            let file = zip.finish()?;
            file.persist(&path)?;
            Ok(path)
        })
        .await
        .map_err(|e| Error::AsyncTaskError(e.to_string()))??;

        log::info!(
            "wrote {} ({} entries)",
            path_to_string_lossy(&path),
            self.entries
        );
        Ok(path)
    }
}
