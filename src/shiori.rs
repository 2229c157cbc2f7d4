use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::spawn_blocking;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::generator::Assembler;
use crate::partition::{Partitioner, Volume};
use crate::path_utils::validate_path;
use crate::progress::{LogProgress, Progress};
use crate::source::DirectorySource;
use crate::store::{PageStore, SealedPageStore, process_sources};
use crate::toc::TocTree;
use crate::types::{
    ColorMode, CropRatios, Direction, DryRunReport, EbookMetadata, ImageOptions, Page, ResizeMode,
    SourceImage, TitlePage, ViewPort,
};

/// The main Shiori conversion configuration, built declaratively using the builder pattern.
///
/// A configuration is immutable once built. It describes how every page is filtered,
/// how the pages are grouped into size-bounded volumes and how the volumes are
/// written. Entry points:
///
/// - [`convert`](ShioriConfig::convert): Converts an ordered sequence of source images
/// - [`convert_directory`](ShioriConfig::convert_directory): Collects the images below a folder first
/// - [`dry_run`](ShioriConfig::dry_run): Lists what would be written, without writing
///
/// ## Builder Pattern
///
/// ```rust,no_run
/// # use shiori::prelude::*;
/// # use std::path::PathBuf;
/// let config = ShioriConfig::builder()
///     .metadata(EbookMetadata::default_with_title("My Book".to_string()))
///     .output_path(PathBuf::from("./output/My Book.epub"))
///     .limit_mb(200u32)
///     .build()
///     .expect("Invalid configuration");
/// ```
#[derive(Clone, Debug, derive_builder::Builder)]
#[builder(setter(into, strip_option), build_fn(validate = "Self::validate"))]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ShioriConfig {
    // --- Book ---
    /// Ebook metadata embedded in every volume.
    #[builder(default = "EbookMetadata::default_with_title(\"Untitled Conversion\".to_string())")]
    pub metadata: EbookMetadata,

    /// Output file, ending in `.epub`. Split books add ` Part X of N` to the file stem.
    #[builder(default)]
    pub output_path: PathBuf,

    /// Reading direction; [`Direction::Rtl`] is manga mode.
    #[builder(default = "Direction::Ltr")]
    pub reading_direction: Direction,

    /// Whether the first image is a cover shown in front of every volume.
    #[builder(default = "true")]
    pub has_cover: bool,

    /// Title page policy.
    #[builder(default = "TitlePage::Always")]
    pub title_page: TitlePage,

    /// Byte ceiling per volume in MiB; 0 means a single volume.
    #[builder(default = "0")]
    pub limit_mb: u32,

    /// Drops the single top-level directory from the table of contents.
    #[builder(default = "false")]
    pub strip_first_directory_from_toc: bool,

    // --- Image ---
    /// Target reading surface.
    #[builder(default)]
    pub view: ViewPort,

    #[builder(default = "85")]
    pub quality: u8,

    #[builder(default = "ColorMode::Luminance")]
    pub color_mode: ColorMode,

    #[builder(default = "ResizeMode::Fit")]
    pub resize_mode: ResizeMode,

    /// Trims uniform margins.
    #[builder(default = "true")]
    pub crop: bool,

    #[builder(default)]
    pub crop_ratios: CropRatios,

    /// Maximum share of each dimension auto-crop may remove, in percent; 0 means no limit.
    #[builder(default = "0")]
    pub crop_limit: u8,

    /// Contrast delta in -100..=100.
    #[builder(default = "0")]
    pub contrast: i32,

    /// Brightness delta in -100..=100.
    #[builder(default = "0")]
    pub brightness: i32,

    /// Rotates landscape pages that are not split.
    #[builder(default = "false")]
    pub auto_rotate: bool,

    /// Splits landscape pages into two halves.
    #[builder(default = "false")]
    pub auto_split: bool,

    /// Keeps the full spread in front of its halves.
    #[builder(default = "true")]
    pub keep_double_page: bool,

    // --- Run ---
    /// Number of worker threads for the filter stage.
    #[builder(default = "num_cpus::get()")]
    pub workers: usize,

    /// Dry runs also list the cover and every file.
    #[builder(default = "false")]
    pub dry_verbose: bool,
}

impl ShioriConfig {
    /// Creates a new builder for configuring `ShioriConfig`.
    pub fn builder() -> ShioriConfigBuilder {
        ShioriConfigBuilder::default()
    }

    /// Performs validation checks that depend on the file system.
    ///
    /// Value ranges are already enforced by the builder; this checks the title and
    /// that the output file can be created. [`convert`](ShioriConfig::convert) calls
    /// it automatically.
    ///
    /// # Returns
    ///
    /// * `Ok(&self)` - Configuration is ready to run
    /// * `Err(Error)` - Configuration has validation errors
    pub fn preflight_check(&self) -> Result<&Self> {
        if self.metadata.title.trim().is_empty() {
            return Err(Error::Other("Ebook title is required".to_string()));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(Error::Other("Output path is required".to_string()));
        }
        validate_path(&self.output_path)?;

        let is_epub = self
            .output_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("epub"));
        if !is_epub {
            return Err(Error::InvalidPath(
                self.output_path.clone(),
                "Output file must have the .epub extension".to_string(),
            ));
        }

        match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                Err(Error::NotFound(format!(
                    "Output directory does not exist: {:?}",
                    parent
                )))
            }
            _ => Ok(self),
        }
    }

    /// The image-related options handed to the filter stage.
    pub fn image_options(&self) -> ImageOptions {
        ImageOptions {
            view: self.view,
            crop: self.crop,
            crop_ratios: self.crop_ratios,
            crop_limit: self.crop_limit,
            contrast: self.contrast,
            brightness: self.brightness,
            auto_rotate: self.auto_rotate,
            auto_split: self.auto_split,
            keep_double_page: self.keep_double_page,
            reading_direction: self.reading_direction,
            color_mode: self.color_mode,
            resize_mode: self.resize_mode,
            quality: self.quality,
        }
    }

    /// Human-readable listing of the effective options.
    pub fn summary(&self) -> String {
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        let limit = match self.limit_mb {
            0 => "nolimit".to_string(),
            mb => format!("{} MiB", mb),
        };
        let lines = [
            ("Title", self.metadata.title.clone()),
            ("Author", self.metadata.authors.join(", ")),
            ("Output", self.output_path.display().to_string()),
            (
                "Reading direction",
                match self.reading_direction {
                    Direction::Ltr => "left to right".to_string(),
                    Direction::Rtl => "right to left (manga)".to_string(),
                },
            ),
            (
                "ViewPort",
                format!("{}x{}", self.view.width, self.view.height),
            ),
            ("Quality", self.quality.to_string()),
            ("Color mode", format!("{:?}", self.color_mode)),
            ("Resize", format!("{:?}", self.resize_mode)),
            (
                "Crop",
                if self.crop {
                    let r = self.crop_ratios;
                    format!(
                        "ratio {}/{}/{}/{}, limit {}%",
                        r.left, r.up, r.right, r.bottom, self.crop_limit
                    )
                } else {
                    "no".to_string()
                },
            ),
            ("Brightness", self.brightness.to_string()),
            ("Contrast", self.contrast.to_string()),
            ("Auto rotate", yes_no(self.auto_rotate).to_string()),
            ("Auto split", yes_no(self.auto_split).to_string()),
            ("Keep double page", yes_no(self.keep_double_page).to_string()),
            ("Has cover", yes_no(self.has_cover).to_string()),
            ("Title page", format!("{:?}", self.title_page)),
            ("Limit", limit),
            (
                "Strip first directory",
                yes_no(self.strip_first_directory_from_toc).to_string(),
            ),
            ("Workers", self.workers.to_string()),
        ];
        let width = lines.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let mut out = String::from("Options:\n");
        for (key, value) in lines {
            out.push_str(&format!("    {:<width$} : {}\n", key, value, width = width));
        }
        out
    }

    // --- Core conversion entry points ---

    /// Converts an ordered sequence of source images into one or more EPUB files.
    ///
    /// Images are filtered in parallel on `workers` threads, grouped into volumes
    /// below the byte ceiling and written one volume after the other. Temporary
    /// page storage is removed whether the run succeeds or fails.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<PathBuf>)` - The written files, in volume order
    /// * `Err(Error)` - The first failure; volumes written before it stay on disk
    pub async fn convert<I>(&self, source: I) -> Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = Result<SourceImage>> + Send + 'static,
        I::IntoIter: Send,
    {
        self.convert_with_progress(source, Arc::new(LogProgress))
            .await
    }

    /// [`convert`](ShioriConfig::convert) reporting to a custom progress sink.
    pub async fn convert_with_progress<I>(
        &self,
        source: I,
        progress: Arc<dyn Progress>,
    ) -> Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = Result<SourceImage>> + Send + 'static,
        I::IntoIter: Send,
    {
        self.preflight_check()?;
        log::info!("converting '{}'", self.metadata.title);
        log::debug!("{}", self.summary());

        let store = self.process(source, Arc::clone(&progress)).await?;
        let (cover, pages) = split_cover(&store.catalogue(), self.has_cover)?;
        let volumes = self.plan(&cover, &pages, |page: &Page| store.size(page.key()))?;

        let uid = format!("urn:uuid:{}", Uuid::new_v4());
        let assembler = Assembler::new(self, uid);
        let written = assembler
            .write_all(&store, &volumes, progress.as_ref())
            .await?;

        store.close()?;
        log::info!(
            "'{}' written as {} file(s)",
            self.metadata.title,
            written.len()
        );
        Ok(written)
    }

    /// Converts every image below `directory`, in natural order.
    pub async fn convert_directory(&self, directory: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        // fail on the output path before scanning; `convert` checks again
        self.preflight_check()?;
        let source = DirectorySource::scan(directory).await?;
        self.convert(source).await
    }

    /// Lists the table of contents a conversion would produce, without decoding or
    /// writing anything.
    ///
    /// Every source image counts as one page of size zero, so the result is a
    /// single synthetic volume.
    pub async fn dry_run<I>(&self, source: I) -> Result<DryRunReport>
    where
        I: IntoIterator<Item = Result<SourceImage>>,
    {
        if self.metadata.title.trim().is_empty() {
            return Err(Error::Other("Ebook title is required".to_string()));
        }

        let catalogue = source
            .into_iter()
            .enumerate()
            .map(|(id, image)| {
                let image = image?;
                Ok(Page {
                    id,
                    part: 0,
                    path: image.path,
                    name: image.name,
                    size: 0,
                    width: 0,
                    height: 0,
                    double_page: false,
                    is_cover: false,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let (cover, pages) = split_cover(&catalogue, self.has_cover)?;
        let volumes = Partitioner::new(0)
            .has_cover(self.has_cover)
            .partition(&cover, &pages, |_| Ok(0))?;
        let volume = volumes.into_iter().next().ok_or(Error::NoPages)?;

        let strip = self.strip_first_directory_from_toc;
        let toc = TocTree::from_pages(&volume.pages).render(true, strip);
        let (cover_listing, files) = if self.dry_verbose {
            let mut files = TocTree::new();
            for page in &volume.pages {
                files.add_page_file(page);
            }
            let cover_listing = self.has_cover.then(|| {
                let mut tree = TocTree::new();
                tree.add_page_file(&volume.cover);
                tree.render(false, false)
            });
            (cover_listing, Some(files.render(false, false)))
        } else {
            (None, None)
        };

        Ok(DryRunReport {
            title: self.metadata.title.clone(),
            page_count: volume.len(),
            toc,
            cover: cover_listing,
            files,
        })
    }

    /// [`dry_run`](ShioriConfig::dry_run) over the images below `directory`.
    pub async fn dry_run_directory(&self, directory: impl AsRef<Path>) -> Result<DryRunReport> {
        let source = DirectorySource::scan(directory).await?;
        self.dry_run(source.listing()).await
    }

    // --- Private helper methods for pipeline steps ---

    /// Filters every source image into a sealed page store on the worker pool.
    async fn process<I>(&self, source: I, progress: Arc<dyn Progress>) -> Result<SealedPageStore>
    where
        I: IntoIterator<Item = Result<SourceImage>> + Send + 'static,
        I::IntoIter: Send,
    {
        let options = self.image_options();
        let workers = self.workers;
        spawn_blocking(move || {
            let store = PageStore::new()?;
            process_sources(&store, source, &options, workers, progress.as_ref())?;
            store.seal()
        })
        .await
        .map_err(|e| Error::AsyncTaskError(e.to_string()))?
    }

    /// Groups pages into volumes according to the size ceiling and title page policy.
    fn plan<F>(&self, cover: &Page, pages: &[Page], size_of: F) -> Result<Vec<Volume>>
    where
        F: Fn(&Page) -> Result<u64>,
    {
        let partitioner = Partitioner::from_limit_mb(self.limit_mb).has_cover(self.has_cover);
        match self.title_page {
            TitlePage::Never => partitioner
                .title_page(false)
                .partition(cover, pages, &size_of),
            TitlePage::Always => partitioner
                .title_page(true)
                .partition(cover, pages, &size_of),
            TitlePage::WhenSplit => {
                let volumes = partitioner
                    .title_page(false)
                    .partition(cover, pages, &size_of)?;
                if volumes.len() > 1 {
                    // the title pages now count against every volume
                    partitioner
                        .title_page(true)
                        .partition(cover, pages, &size_of)
                } else {
                    Ok(volumes)
                }
            }
        }
    }
}

/// Separates the cover from the reading pages. With `has_cover` the first page
/// is front matter only; otherwise it stays the first reading page.
fn split_cover(catalogue: &[Page], has_cover: bool) -> Result<(Page, Vec<Page>)> {
    let mut cover = catalogue.first().cloned().ok_or(Error::NoPages)?;
    cover.is_cover = true;
    let pages = if has_cover {
        catalogue[1..].to_vec()
    } else {
        catalogue.to_vec()
    };
    Ok((cover, pages))
}

impl ShioriConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(limit) = self.limit_mb {
            if limit != 0 && limit < 20 {
                return Err(format!(
                    "Volume size limit must be 0 (no limit) or at least 20 MiB, got {}",
                    limit
                ));
            }
        }
        for (name, value) in [("Contrast", self.contrast), ("Brightness", self.brightness)] {
            if let Some(value) = value {
                if !(-100..=100).contains(&value) {
                    return Err(format!("{} must be between -100 and 100.", name));
                }
            }
        }
        if let Some(quality) = self.quality {
            if !(1..=100).contains(&quality) {
                return Err("JPEG quality must be between 1 and 100.".to_string());
            }
        }
        if let Some(ratios) = &self.crop_ratios {
            if [ratios.left, ratios.up, ratios.right, ratios.bottom]
                .iter()
                .any(|&r| r > 100)
            {
                return Err("Crop ratios must be between 0 and 100.".to_string());
            }
        }
        if let Some(limit) = self.crop_limit {
            if limit > 100 {
                return Err("Crop limit must be between 0 and 100.".to_string());
            }
        }
        if let Some(view) = &self.view {
            if view.width == 0 || view.height == 0 {
                return Err("ViewPort dimensions must be greater than zero.".to_string());
            }
        }
        if self.workers == Some(0) {
            return Err("At least one worker is required.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ShioriConfigBuilder {
        let mut builder = ShioriConfig::builder();
        builder
            .metadata(EbookMetadata::default_with_title("Test".to_string()))
            .output_path(PathBuf::from("Test.epub"));
        builder
    }

    fn listing(entries: &[(&str, &str)]) -> Vec<Result<SourceImage>> {
        entries
            .iter()
            .map(|(path, name)| Ok(SourceImage::new(*path, *name, Vec::new())))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = base().build().unwrap();
        assert_eq!(config.quality, 85);
        assert_eq!(config.limit_mb, 0);
        assert!(config.has_cover);
        assert!(config.keep_double_page);
        assert!(config.crop);
        assert_eq!(config.crop_ratios, CropRatios::default());
        assert_eq!(config.color_mode, ColorMode::Luminance);
        assert_eq!(config.title_page, TitlePage::Always);
        assert!(config.workers >= 1);
    }

    #[test]
    fn test_builder_rejects_out_of_range_values() {
        assert!(base().limit_mb(10u32).build().is_err());
        assert!(base().limit_mb(20u32).build().is_ok());
        assert!(base().contrast(101).build().is_err());
        assert!(base().brightness(-101).build().is_err());
        assert!(base().quality(0u8).build().is_err());
        assert!(base().crop_limit(101u8).build().is_err());
        assert!(base().view(ViewPort::new(0, 100)).build().is_err());
        assert!(base().workers(0usize).build().is_err());
    }

    #[test]
    fn test_preflight_check() {
        assert!(base().build().unwrap().preflight_check().is_ok());

        let wrong_ext = base().output_path(PathBuf::from("Test.zip")).build().unwrap();
        assert!(matches!(
            wrong_ext.preflight_check(),
            Err(Error::InvalidPath(_, _))
        ));

        let missing_dir = base()
            .output_path(PathBuf::from("/definitely/not/here/Test.epub"))
            .build()
            .unwrap();
        assert!(matches!(missing_dir.preflight_check(), Err(Error::NotFound(_))));

        let untitled = base()
            .metadata(EbookMetadata::default_with_title(" ".to_string()))
            .build()
            .unwrap();
        assert!(untitled.preflight_check().is_err());
    }

    #[test]
    fn test_image_options_follow_config() {
        let config = base()
            .reading_direction(Direction::Rtl)
            .auto_split(true)
            .contrast(20)
            .build()
            .unwrap();
        let options = config.image_options();
        assert_eq!(options.reading_direction, Direction::Rtl);
        assert!(options.auto_split);
        assert_eq!(options.contrast, 20);
        assert_eq!(options.quality, 85);
        assert_eq!(options.view, ViewPort::default());
    }

    #[test]
    fn test_summary_lists_options() {
        let summary = base().limit_mb(200u32).build().unwrap().summary();
        assert!(summary.starts_with("Options:\n"));
        assert!(summary.contains("Title"));
        assert!(summary.contains("200 MiB"));
    }

    #[test]
    fn test_split_cover() {
        let catalogue: Vec<Page> = (0..3)
            .map(|id| Page {
                id,
                part: 0,
                path: String::new(),
                name: format!("{}.jpg", id),
                size: 1,
                width: 1,
                height: 1,
                double_page: false,
                is_cover: false,
            })
            .collect();
        let (cover, pages) = split_cover(&catalogue, true).unwrap();
        assert_eq!(cover.id, 0);
        assert!(cover.is_cover);
        assert_eq!(pages.len(), 2);
        let (_, pages) = split_cover(&catalogue, false).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| !p.is_cover));
        assert!(matches!(split_cover(&[], true), Err(Error::NoPages)));
    }

    #[test]
    fn test_split_cover_flags_only_the_cover() {
        // a kept spread and its halves all come from source 0
        let catalogue: Vec<Page> = [(0, 0), (0, 1), (0, 2), (1, 0)]
            .iter()
            .map(|&(id, part)| Page {
                part,
                double_page: id == 0,
                ..sized(id, 1)
            })
            .collect();
        let (cover, pages) = split_cover(&catalogue, true).unwrap();
        assert_eq!((cover.id, cover.part, cover.is_cover), (0, 0, true));
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| !p.is_cover));
    }

    const MIB: u64 = 1024 * 1024;

    fn sized(id: usize, size: u64) -> Page {
        Page {
            id,
            part: 0,
            path: String::new(),
            name: format!("{}.jpg", id),
            size,
            width: 1,
            height: 1,
            double_page: false,
            is_cover: false,
        }
    }

    fn planned(policy: TitlePage, sizes: &[u64]) -> Vec<usize> {
        let config = base().limit_mb(20u32).title_page(policy).build().unwrap();
        let pages: Vec<Page> = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| sized(i + 1, size * MIB))
            .collect();
        config
            .plan(&sized(0, 2 * MIB), &pages, |p: &Page| Ok(p.size))
            .unwrap()
            .iter()
            .map(Volume::len)
            .collect()
    }

    #[test]
    fn test_plan_title_page_fits_only_without_title() {
        // fits one volume on its own, the title image pushes it over
        assert_eq!(planned(TitlePage::Never, &[8, 9]), vec![2]);
        assert_eq!(planned(TitlePage::Always, &[8, 9]), vec![1, 1]);
        assert_eq!(planned(TitlePage::WhenSplit, &[8, 9]), vec![2]);
    }

    #[test]
    fn test_plan_when_split_counts_title_pages() {
        assert_eq!(planned(TitlePage::Never, &[8, 8, 8]), vec![2, 1]);
        assert_eq!(planned(TitlePage::Always, &[8, 8, 8]), vec![1, 1, 1]);
        assert_eq!(planned(TitlePage::WhenSplit, &[8, 8, 8]), vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn test_dry_run_lists_toc() {
        let config = base()
            .strip_first_directory_from_toc(true)
            .dry_verbose(true)
            .build()
            .unwrap();
        let report = config
            .dry_run(listing(&[
                ("Book", "cover.jpg"),
                ("Book/Chapter 1", "001.jpg"),
                ("Book/Chapter 1", "002.jpg"),
                ("Book/Chapter 2", "001.jpg"),
            ]))
            .await
            .unwrap();

        assert_eq!(report.page_count, 3);
        assert_eq!(report.toc, "  - Chapter 1\n  - Chapter 2\n");
        assert_eq!(report.cover.as_deref(), Some("  - Book\n    - cover.jpg\n"));
        let files = report.files.clone().unwrap();
        assert!(files.contains("    - Chapter 1\n      - 001.jpg\n      - 002.jpg\n"));
        assert!(report.to_string().starts_with("TOC:\n  - Test\n  - Chapter 1\n"));
    }

    #[tokio::test]
    async fn test_dry_run_without_pages() {
        let config = base().build().unwrap();
        let result = config.dry_run(listing(&[("", "cover.jpg")])).await;
        assert!(matches!(result, Err(Error::NoPages)));
    }
}
