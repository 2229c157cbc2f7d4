//! Geometric and tonal adjustments: rotation, contrast, brightness, resize, tone.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};

use super::ImageFilter;
use crate::error::Result;
use crate::types::{ColorMode, ResizeMode, ViewPort};

/// Turns landscape images a quarter counter-clockwise. Portrait images pass through.
#[derive(Debug, Clone, Copy)]
pub struct Rotate;

impl ImageFilter for Rotate {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        if img.width() > img.height() {
            Ok(img.rotate270())
        } else {
            Ok(img)
        }
    }
}

/// Contrast change in percent, -100..=100.
#[derive(Debug, Clone, Copy)]
pub struct Contrast(f32);

impl Contrast {
    pub fn new(delta: i32) -> Self {
        Self(delta.clamp(-100, 100) as f32)
    }
}

impl ImageFilter for Contrast {
    fn name(&self) -> &'static str {
        "contrast"
    }

    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(img.adjust_contrast(self.0))
    }
}

/// Brightness shift in percent of the full channel range, -100..=100.
#[derive(Debug, Clone, Copy)]
pub struct Brightness(i32);

impl Brightness {
    pub fn new(delta: i32) -> Self {
        Self(delta.clamp(-100, 100) * 255 / 100)
    }
}

impl ImageFilter for Brightness {
    fn name(&self) -> &'static str {
        "brightness"
    }

    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(img.brighten(self.0))
    }
}

/// Scales to the viewport with Lanczos3 resampling.
#[derive(Debug, Clone, Copy)]
pub struct Resize {
    view: ViewPort,
    mode: ResizeMode,
}

impl Resize {
    pub fn new(view: ViewPort, mode: ResizeMode) -> Self {
        Self { view, mode }
    }

    /// Output dimensions for an image of `width` x `height`.
    pub fn target(&self, width: u32, height: u32) -> (u32, u32) {
        match self.mode {
            ResizeMode::Off => (width, height),
            ResizeMode::Exact => (self.view.width, self.view.height),
            ResizeMode::Fit => {
                if width == 0 || height == 0 {
                    return (width, height);
                }
                let ratio = f64::min(
                    f64::from(self.view.width) / f64::from(width),
                    f64::from(self.view.height) / f64::from(height),
                );
                let w = (f64::from(width) * ratio).round().max(1.0) as u32;
                let h = (f64::from(height) * ratio).round().max(1.0) as u32;
                (w.min(self.view.width), h.min(self.view.height))
            }
        }
    }
}

impl ImageFilter for Resize {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (w, h) = self.target(img.width(), img.height());
        if (w, h) == (img.width(), img.height()) {
            return Ok(img);
        }
        Ok(img.resize_exact(w, h, FilterType::Lanczos3))
    }
}

/// Converts to the configured output tone.
#[derive(Debug, Clone, Copy)]
pub struct Tone(ColorMode);

impl Tone {
    pub fn new(mode: ColorMode) -> Self {
        Self(mode)
    }
}

impl ImageFilter for Tone {
    fn name(&self) -> &'static str {
        "tone"
    }

    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        if matches!(img, DynamicImage::ImageLuma8(_)) {
            return Ok(img);
        }
        Ok(match self.0 {
            ColorMode::Color => img,
            ColorMode::Luminance => DynamicImage::ImageLuma8(img.to_luma8()),
            ColorMode::Average => {
                let rgb = img.to_rgb8();
                let gray = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                    let [r, g, b] = rgb.get_pixel(x, y).0;
                    Luma([((u16::from(r) + u16::from(g) + u16::from(b)) / 3) as u8])
                });
                DynamicImage::ImageLuma8(gray)
            }
        })
    }
}
