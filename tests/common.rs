//! Common test utilities and constants for the Shiori crate.
//!
//! Provides functions for setting up test directories, creating dummy page
//! images, and reading back the written EPUB containers.

use image::{Rgb, RgbImage};
use rand::{Rng, distributions::Alphanumeric};
use shiori::error::{Error, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

#[allow(dead_code)]
pub const TEST_TMP_DIR: &str = "tests/tmp";
#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);
#[allow(dead_code)]
pub const LONG_TEST_TIMEOUT: Duration = Duration::from_secs(120); // For full conversions if they are slow

/// A unique test directory with `source` and `target` subdirectories.
#[allow(dead_code)]
pub struct TestDirs {
    pub base: PathBuf,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
}

/// Creates a clean, uniquely named test directory below [`TEST_TMP_DIR`].
#[allow(dead_code)]
pub async fn setup_test_dirs(sub_path: &str) -> TestDirs {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let base = PathBuf::from(TEST_TMP_DIR).join(format!("{}-{}", sub_path, rand_string));
    if base.exists() {
        fs::remove_dir_all(&base).await.unwrap();
    }
    let source_dir = base.join("source");
    let target_dir = base.join("target");

    fs::create_dir_all(&source_dir).await.unwrap();
    fs::create_dir_all(&target_dir).await.unwrap();

    TestDirs {
        base,
        source_dir,
        target_dir,
    }
}

/// Encodes a solid-color JPEG of the given size in memory.
#[allow(dead_code)]
pub fn dummy_jpeg(width: u32, height: u32, color: Rgb<u8>) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, color);
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

/// Writes a solid-color JPEG page at the given path.
#[allow(dead_code)]
pub async fn create_dummy_image(path: &Path, width: u32, height: u32, color: Rgb<u8>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let path_clone = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        RgbImage::from_pixel(width, height, color)
            .save_with_format(path_clone, image::ImageFormat::Jpeg)
    })
    .await
    .map_err(|e| Error::AsyncTaskError(e.to_string()))?
    .map_err(Error::Image)?;
    Ok(())
}

/// Writes a portrait page.
#[allow(dead_code)]
pub async fn create_page(path: &Path) -> Result<()> {
    create_dummy_image(path, 60, 90, Rgb([128, 128, 128])).await
}

/// Writes a landscape page, detected as a double-page spread.
#[allow(dead_code)]
pub async fn create_spread(path: &Path) -> Result<()> {
    create_dummy_image(path, 180, 90, Rgb([200, 40, 40])).await
}

/// Checks that a ZIP file exists and contains at least one entry.
#[allow(dead_code)]
pub async fn assert_valid_zip_file(path: &Path) {
    assert!(path.exists(), "Output ZIP file does not exist: {:?}", path);
    assert!(path.is_file(), "Output ZIP path is not a file: {:?}", path);

    let file = fs::File::open(path).await.unwrap();
    let file_std = file.into_std().await;
    let zip = zip::ZipArchive::new(file_std).unwrap();
    assert!(zip.len() > 0, "Output ZIP file is empty: {:?}", path);
}

/// Lists the entry names of a ZIP file in stored order.
#[allow(dead_code)]
pub fn zip_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Reads one text entry of a ZIP file.
#[allow(dead_code)]
pub fn read_zip_text(path: &Path, name: &str) -> String {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}
