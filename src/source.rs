//! Source image collection from a directory tree.
//!
//! [`DirectorySource`] walks a folder depth-first and yields every image as a
//! [`SourceImage`] with its directory relative to the root. Entries of each
//! directory are visited in natural numeric order, so `page2` comes before
//! `page10` and `Chapter 9/` before `Chapter 10/`.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tokio::fs::read_dir;

use crate::error::{Error, Result};
use crate::path_utils::{
    compare_paths_natural, get_file_name_lossy, is_hidden_file, is_image_file,
};
use crate::types::SourceImage;

lazy_static! {
    /// Matches "001", "1", "1.5" etc.
    pub static ref DEFAULT_NUMBER_REGEX: Regex = Regex::new(r"\d+\.?\d*").unwrap();
}

/// Ordered image files below a root directory, read lazily one at a time.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
}

impl DirectorySource {
    /// Collects the image files below `root`.
    ///
    /// Hidden entries are skipped silently, other non-image files with a warning.
    pub async fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            return Err(Error::NotFound(format!(
                "Source path does not exist: {:?}",
                root
            )));
        }
        if !root.is_dir() {
            return Err(Error::InvalidPath(
                root,
                "Source path is not a directory.".to_string(),
            ));
        }

        let mut files = Vec::new();
        // each level is stored reversed so that `pop` yields the next entry
        let mut stack = vec![Self::read_sorted(&root).await?];
        while let Some(level) = stack.last_mut() {
            let Some(path) = level.pop() else {
                stack.pop();
                continue;
            };
            if path.is_dir() {
                stack.push(Self::read_sorted(&path).await?);
            } else if is_image_file(&path) {
                files.push(path);
            } else {
                log::warn!("Skipping non-image file {:?}", path);
            }
        }

        log::info!("found {} images below {:?}", files.len(), root);
        Ok(Self {
            root,
            files,
            position: 0,
        })
    }

    async fn read_sorted(directory: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut paths = read_dir(directory).await?;
        while let Some(entry) = paths.next_entry().await? {
            let path = entry.path();
            if !is_hidden_file(&path) {
                entries.push(path);
            }
        }
        entries.sort_by(|a, b| compare_paths_natural(b, a, &DEFAULT_NUMBER_REGEX));
        Ok(entries)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The collected files without their image data, for listings.
    pub fn listing(&self) -> impl Iterator<Item = Result<SourceImage>> + '_ {
        self.files.iter().map(|path| {
            Ok(SourceImage::new(
                self.relative_dir(path),
                get_file_name_lossy(path),
                Vec::new(),
            ))
        })
    }

    /// Directory of `path` relative to the root, `/`-separated.
    fn relative_dir(&self, path: &Path) -> String {
        path.parent()
            .and_then(|parent| parent.strip_prefix(&self.root).ok())
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }
}

impl Iterator for DirectorySource {
    type Item = Result<SourceImage>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files.get(self.position)?.clone();
        self.position += 1;
        let image = std::fs::read(&path).map_err(Error::from).map(|data| {
            SourceImage::new(self.relative_dir(&path), get_file_name_lossy(&path), data)
        });
        Some(image)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.files.len() - self.position;
        (remaining, Some(remaining))
    }
}
