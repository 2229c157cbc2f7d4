//! Shiori - Comic Pages to Fixed-Layout EPUB
//!
//! This crate turns an ordered sequence of comic or manga page images into one or
//! more fixed-layout EPUB files sized for e-ink readers. Every page is filtered in
//! parallel (auto-crop, spread splitting, tone and size adjustment), then the
//! pages are grouped into volumes below a byte ceiling and written volume by volume.
//!
//! # Getting Started
//!
//! Configure a conversion with the `ShioriConfig` builder, then run it over a
//! directory or over any iterator of [`SourceImage`] values.
//!
//! ```rust,no_run
//! use shiori::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> shiori::error::Result<()> {
//!     let metadata = EbookMetadata {
//!         title: "My Awesome Series".to_string(),
//!         authors: vec!["Jane Doe".to_string()],
//!         language: "ja".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let config = ShioriConfig::builder()
//!         .metadata(metadata)
//!         .output_path(PathBuf::from("./converted/My Awesome Series.epub"))
//!         .reading_direction(Direction::Rtl)
//!         .auto_split(true)
//!         .limit_mb(200u32)
//!         .title_page(TitlePage::WhenSplit)
//!         .build()?;
//!
//!     // Optional: check the output location before doing any work
//!     config.preflight_check()?;
//!
//!     println!("{}", config.dry_run_directory("./my_manga/series_a").await?);
//!
//!     let written = config.convert_directory("./my_manga/series_a").await?;
//!     println!("Wrote {} file(s)", written.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod filter;
pub mod generator;
pub mod partition;
pub mod path_utils;
pub mod progress;
pub mod shiori;
pub mod source;
pub mod splitter;
pub mod store;
pub mod toc;
pub mod types;

// Publicly expose the main `ShioriConfig` struct and its builder
pub use shiori::ShioriConfig;
pub use shiori::ShioriConfigBuilder;

pub use types::{
    ColorMode, CropRatios, Direction, DryRunReport, EbookMetadata, ImageOptions, Page, PageKey,
    ResizeMode, SourceImage, TitlePage, ViewPort,
};

/// Prelude module for convenient imports.
///
/// Re-exports the most commonly used types and traits, so a single
/// `use shiori::prelude::*;` is enough for a typical conversion.
pub mod prelude {
    pub use super::{
        ColorMode, CropRatios, Direction, DryRunReport, EbookMetadata, ResizeMode, ShioriConfig,
        ShioriConfigBuilder, SourceImage, TitlePage, ViewPort, error, types,
    };
    pub use crate::progress::{LogProgress, NoProgress, Progress};
    pub use crate::source::DirectorySource;
    pub use std::path::{Path, PathBuf};
    pub use std::sync::Arc;
}
