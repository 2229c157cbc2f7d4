//! Per-page image filter chains.
//!
//! A [`FilterPipeline`] is an ordered list of [`ImageFilter`] operations built once
//! from the run's [`ImageOptions`] and applied to every page. Filters decide per image
//! whether they have anything to do (auto-rotate only turns landscape images, resize
//! leaves images already at the target size untouched), so a single pipeline can be
//! shared by all workers.

use image::DynamicImage;

use crate::error::Result;
use crate::types::{ImageOptions, ResizeMode};

pub mod adjust;
pub mod crop;

pub use adjust::{Brightness, Contrast, Resize, Rotate, Tone};
pub use crop::{AutoCrop, CropHalf};

/// A single image transformation step.
pub trait ImageFilter: Send + Sync {
    /// Short identifier, used in logs and tests.
    fn name(&self) -> &'static str;

    /// Transforms the image. Consumes the input so unchanged images can be passed through.
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage>;
}

/// Ordered chain of filters.
#[derive(Default)]
pub struct FilterPipeline {
    filters: Vec<Box<dyn ImageFilter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter at the end of the chain.
    pub fn with<F: ImageFilter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// The standard page chain: auto-crop, auto-rotate, contrast, brightness, resize, tone.
    pub fn full(options: &ImageOptions) -> Self {
        let mut pipeline = Self::new();
        if options.crop {
            pipeline = pipeline.with(AutoCrop::new(options.crop_ratios, options.crop_limit));
        }
        if options.auto_rotate {
            pipeline = pipeline.with(Rotate);
        }
        pipeline.with_adjustments(options)
    }

    /// Chain for an unsplit spread kept next to its halves: like [`full`](Self::full)
    /// but never rotated.
    pub fn spread(options: &ImageOptions) -> Self {
        let mut pipeline = Self::new();
        if options.crop {
            pipeline = pipeline.with(AutoCrop::new(options.crop_ratios, options.crop_limit));
        }
        pipeline.with_adjustments(options)
    }

    /// Chain isolating one half of a spread. No auto-crop or auto-rotate.
    pub fn half(options: &ImageOptions, right: bool) -> Self {
        Self::new().with(CropHalf::new(right)).with_adjustments(options)
    }

    fn with_adjustments(mut self, options: &ImageOptions) -> Self {
        if options.contrast != 0 {
            self = self.with(Contrast::new(options.contrast));
        }
        if options.brightness != 0 {
            self = self.with(Brightness::new(options.brightness));
        }
        if options.resize_mode != ResizeMode::Off {
            self = self.with(Resize::new(options.view, options.resize_mode));
        }
        self.with(Tone::new(options.color_mode))
    }

    /// Runs every filter in order.
    pub fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        self.filters
            .iter()
            .try_fold(img, |current, filter| filter.apply(current))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
