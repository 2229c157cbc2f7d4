//! Core data types, enums, and reports for the Shiori conversion library.
//!
//! This module defines the fundamental data structures used throughout Shiori:
//! - Page records and their ordering key (`Page`, `PageKey`)
//! - Source input (`SourceImage`)
//! - Image option values handed to the filter stage (`ImageOptions`, `ViewPort`, `CropRatios`)
//! - Enumerations for various settings (`Direction`, `ColorMode`, `ResizeMode`, `TitlePage`)
//! - Ebook metadata (`EbookMetadata`) and the dry-run report (`DryRunReport`)

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Defines the reading direction of the generated book.
///
/// `Rtl` is manga mode: the right half of a spread is read first and the
/// spine progresses right to left.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ltr => f.write_str("ltr"),
            Direction::Rtl => f.write_str("rtl"),
        }
    }
}

/// Output tone of every processed page.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColorMode {
    /// Keep the source colors.
    Color,
    /// Plain average of the red, green and blue channels.
    Average,
    /// Luminance-weighted grayscale.
    #[default]
    Luminance,
}

/// How pages are scaled to the viewport.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResizeMode {
    /// Largest size fitting inside the viewport, aspect ratio preserved.
    #[default]
    Fit,
    /// Stretch to exactly the viewport dimensions.
    Exact,
    /// Keep the processed dimensions.
    Off,
}

/// When a volume gets a generated title page in front of its content.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TitlePage {
    Never,
    #[default]
    Always,
    /// Only when the book is split into more than one volume.
    WhenSplit,
}

/// Target reading surface in device pixels.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ViewPort {
    pub width: u32,
    pub height: u32,
}

impl ViewPort {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for ViewPort {
    fn default() -> Self {
        Self::new(1072, 1448)
    }
}

impl fmt::Display for ViewPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "width={},height={}", self.width, self.height)
    }
}

/// Per-edge tolerance for auto-crop, in percent of a scan line.
///
/// A line still counts as margin while at most this share of its pixels
/// differs from the margin color.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CropRatios {
    pub left: u8,
    pub up: u8,
    pub right: u8,
    pub bottom: u8,
}

impl Default for CropRatios {
    fn default() -> Self {
        Self {
            left: 1,
            up: 1,
            right: 1,
            bottom: 3,
        }
    }
}

/// Metadata embedded into every generated volume.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EbookMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub language: String, // e.g., "en", "ja"
    pub identifier: Option<String>,
}

impl EbookMetadata {
    /// Creates a default `EbookMetadata` instance with a specified title and default language "en".
    pub fn default_with_title(title: String) -> Self {
        Self {
            title,
            language: "en".to_string(),
            ..Default::default()
        }
    }
}

/// The image-related part of the configuration, as seen by the filter stage.
///
/// Derived once per run from [`ShioriConfig`](crate::ShioriConfig) and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImageOptions {
    pub view: ViewPort,
    pub crop: bool,
    pub crop_ratios: CropRatios,
    /// Maximum share (percent) of each dimension auto-crop may remove; 0 means no limit.
    pub crop_limit: u8,
    pub contrast: i32,
    pub brightness: i32,
    pub auto_rotate: bool,
    pub auto_split: bool,
    pub keep_double_page: bool,
    pub reading_direction: Direction,
    pub color_mode: ColorMode,
    pub resize_mode: ResizeMode,
    pub quality: u8,
}

/// Canonical ordering key of a page: source sequence number, then part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageKey {
    pub id: usize,
    pub part: u8,
}

impl PageKey {
    pub fn new(id: usize, part: u8) -> Self {
        Self { id, part }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id, self.part)
    }
}

/// One processed unit of reading content: a full source image or one half of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: usize,
    /// 0 for an unsplit image, 1/2 for the first/second half in reading order.
    pub part: u8,
    /// Relative directory of the source image, `/`-separated.
    pub path: String,
    pub name: String,
    /// Stored byte size of the processed image.
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub double_page: bool,
    /// Set only on the page picked as the volumes' cover.
    pub is_cover: bool,
}

impl Page {
    pub fn key(&self) -> PageKey {
        PageKey::new(self.id, self.part)
    }

    /// Relative source path including the file name.
    pub fn source_path(&self) -> String {
        if self.path.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.path, self.name)
        }
    }

    /// Image resource location, relative to the package directory.
    pub fn image_href(&self) -> String {
        format!("Images/{:04}_p{}.jpg", self.id, self.part)
    }

    /// Page markup location, relative to the package directory.
    pub fn page_href(&self) -> String {
        format!("Text/{:04}_p{}.xhtml", self.id, self.part)
    }

    /// Blank spacer markup location following this page.
    pub fn spacer_href(&self) -> String {
        format!("Text/{:04}_p{}_sp.xhtml", self.id, self.part)
    }

    /// CSS placing the image centered on the viewport, optionally pinned to one side.
    pub fn img_style(&self, view: ViewPort, align: Option<&str>) -> String {
        let top = view.height.saturating_sub(self.height) / 2;
        let left = view.width.saturating_sub(self.width) / 2;
        let horizontal = align
            .map(str::to_string)
            .unwrap_or_else(|| format!("left:{}px", left));
        format!(
            "width:{}px; height:{}px; top:{}px; {};",
            self.width, self.height, top, horizontal
        )
    }
}

/// One raw source image as supplied by the input collaborator.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Relative directory, `/`-separated, empty for the source root.
    pub path: String,
    pub name: String,
    pub data: Vec<u8>,
}

impl SourceImage {
    pub fn new(path: impl Into<String>, name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            data,
        }
    }
}

/// Outcome of a dry run: what would be written, without writing anything.
#[derive(Debug, Clone, Default)]
pub struct DryRunReport {
    pub title: String,
    pub page_count: usize,
    /// Directory-level table of contents.
    pub toc: String,
    /// Cover listing, only in verbose mode with a cover.
    pub cover: Option<String>,
    /// Full file listing, only in verbose mode.
    pub files: Option<String>,
}

impl fmt::Display for DryRunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TOC:\n  - {}\n{}", self.title, self.toc)?;
        if let Some(cover) = &self.cover {
            writeln!(f, "Cover:\n{}", cover)?;
        }
        if let Some(files) = &self.files {
            writeln!(f, "Files:\n{}", files)?;
        }
        Ok(())
    }
}
