//! Cropping filters: margin detection and spread halving.

use image::{DynamicImage, GrayImage};

use super::ImageFilter;
use crate::error::Result;
use crate::types::CropRatios;

/// Luma distance from the margin color beyond which a pixel counts as content.
const PIXEL_TOLERANCE: u8 = 24;

/// Trims near-uniform borders.
///
/// Each edge is scanned line by line from the outside in. The outermost line sets
/// the margin color (its median luma); a line stays margin while the share of pixels
/// deviating from that color is within the edge's ratio. At least one line of
/// content always survives, and a fully uniform image is left as is.
#[derive(Debug, Clone, Copy)]
pub struct AutoCrop {
    ratios: CropRatios,
    limit: u8,
}

impl AutoCrop {
    pub fn new(ratios: CropRatios, limit: u8) -> Self {
        Self { ratios, limit }
    }

    /// Computes the content rectangle as `(x, y, width, height)`.
    pub fn bounds(&self, img: &DynamicImage) -> (u32, u32, u32, u32) {
        let luma = img.to_luma8();
        let (w, h) = luma.dimensions();
        if w < 2 || h < 2 {
            return (0, 0, w, h);
        }

        let row = |y: u32, x0: u32, x1: u32| -> Vec<u8> { line(&luma, x0..x1, |x| (x, y)) };
        let col = |x: u32, y0: u32, y1: u32| -> Vec<u8> { line(&luma, y0..y1, |y| (x, y)) };

        let top = margin_width(0..h - 1, self.ratios.up, self.max_cut(h), |y| {
            row(y, 0, w)
        });
        if top == h - 1 {
            // uniform page, nothing to anchor a crop on
            return (0, 0, w, h);
        }
        let bottom = margin_width(
            (top + 1..h).rev(),
            self.ratios.bottom,
            self.max_cut(h),
            |y| row(y, 0, w),
        );
        let y1 = h - bottom;

        let left = margin_width(0..w - 1, self.ratios.left, self.max_cut(w), |x| {
            col(x, top, y1)
        });
        let right = margin_width(
            (left + 1..w).rev(),
            self.ratios.right,
            self.max_cut(w),
            |x| col(x, top, y1),
        );

        (left, top, w - left - right, y1 - top)
    }

    fn max_cut(&self, dimension: u32) -> u32 {
        if self.limit == 0 {
            dimension
        } else {
            dimension * u32::from(self.limit.min(100)) / 100
        }
    }
}

impl ImageFilter for AutoCrop {
    fn name(&self) -> &'static str {
        "auto-crop"
    }

    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (x, y, w, h) = self.bounds(&img);
        if (x, y, w, h) == (0, 0, img.width(), img.height()) {
            return Ok(img);
        }
        log::debug!(
            "auto-crop {}x{} -> {}x{} at ({}, {})",
            img.width(),
            img.height(),
            w,
            h,
            x,
            y
        );
        Ok(img.crop_imm(x, y, w, h))
    }
}

fn line<I, F>(luma: &GrayImage, range: I, coords: F) -> Vec<u8>
where
    I: Iterator<Item = u32>,
    F: Fn(u32) -> (u32, u32),
{
    range
        .map(|i| {
            let (x, y) = coords(i);
            luma.get_pixel(x, y).0[0]
        })
        .collect()
}

/// Counts consecutive margin lines from the start of `lines`, at most `max_cut`.
fn margin_width<I, F>(lines: I, ratio: u8, max_cut: u32, read: F) -> u32
where
    I: Iterator<Item = u32>,
    F: Fn(u32) -> Vec<u8>,
{
    let mut lines = lines.peekable();
    let Some(&first) = lines.peek() else {
        return 0;
    };
    let reference = median(read(first));

    let mut cut = 0;
    for i in lines {
        if cut >= max_cut || !is_margin(&read(i), reference, ratio) {
            break;
        }
        cut += 1;
    }
    cut
}

fn median(mut values: Vec<u8>) -> u8 {
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();
    values[values.len() / 2]
}

fn is_margin(pixels: &[u8], reference: u8, ratio: u8) -> bool {
    let off = pixels
        .iter()
        .filter(|p| p.abs_diff(reference) > PIXEL_TOLERANCE)
        .count();
    off * 100 <= usize::from(ratio) * pixels.len()
}

/// Keeps one half of a spread: the right half when `right` is set, the left otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CropHalf {
    right: bool,
}

impl CropHalf {
    pub fn new(right: bool) -> Self {
        Self { right }
    }
}

impl ImageFilter for CropHalf {
    fn name(&self) -> &'static str {
        "crop-half"
    }

    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (w, h) = (img.width(), img.height());
        let half = w / 2;
        Ok(if self.right {
            img.crop_imm(half, 0, w - half, h)
        } else {
            img.crop_imm(0, 0, half, h)
        })
    }
}
