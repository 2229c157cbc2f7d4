//! Double-page detection and splitting.
//!
//! A source wider than tall is a spread. With auto-split enabled it becomes two
//! halves (`part` 1 and 2, in reading order) instead of being rotated; with
//! keep-double-page the untouched spread is also kept as `part` 0 so downstream
//! pagination matches print.

use image::DynamicImage;

use crate::error::Result;
use crate::filter::FilterPipeline;
use crate::types::{Direction, ImageOptions};

/// One output image of the filter stage, before encoding.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub part: u8,
    pub double_page: bool,
    pub image: DynamicImage,
}

/// Whether an image of this geometry is a double-page spread.
pub fn is_spread(width: u32, height: u32) -> bool {
    width > height
}

/// Routes every source image through the right pipeline(s).
///
/// All pipelines are built once here and shared by every page of the run.
#[derive(Debug)]
pub struct DoublePageSplitter {
    auto_split: bool,
    keep_double_page: bool,
    full: FilterPipeline,
    spread: FilterPipeline,
    first_half: FilterPipeline,
    second_half: FilterPipeline,
}

impl DoublePageSplitter {
    pub fn new(options: &ImageOptions) -> Self {
        // Right-to-left reading starts on the right half.
        let right_first = options.reading_direction == Direction::Rtl;
        Self {
            auto_split: options.auto_split,
            keep_double_page: options.keep_double_page,
            full: FilterPipeline::full(options),
            spread: FilterPipeline::spread(options),
            first_half: FilterPipeline::half(options, right_first),
            second_half: FilterPipeline::half(options, !right_first),
        }
    }

    pub fn should_split(&self, width: u32, height: u32) -> bool {
        self.auto_split && is_spread(width, height)
    }

    /// Produces the page images for one source image, ordered by part.
    pub fn process(&self, source: DynamicImage) -> Result<Vec<ProcessedImage>> {
        if !self.should_split(source.width(), source.height()) {
            let image = self.full.apply(source)?;
            return Ok(vec![ProcessedImage {
                part: 0,
                double_page: is_spread(image.width(), image.height()),
                image,
            }]);
        }

        let mut parts = Vec::with_capacity(3);
        if self.keep_double_page {
            parts.push(ProcessedImage {
                part: 0,
                double_page: true,
                image: self.spread.apply(source.clone())?,
            });
        }
        parts.push(ProcessedImage {
            part: 1,
            double_page: true,
            image: self.first_half.apply(source.clone())?,
        });
        parts.push(ProcessedImage {
            part: 2,
            double_page: true,
            image: self.second_half.apply(source)?,
        });
        Ok(parts)
    }
}
