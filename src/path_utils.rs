//! Path utilities for safe and robust file path handling.
//!
//! Helpers for lossy display of paths, output path validation, hidden and image
//! file detection, and the natural numeric ordering used when walking source
//! directories.

use crate::error::{Error, Result};

use std::cmp::Ordering;
use std::path::Path;

/// Maximum path length for Windows without long path support
const WINDOWS_MAX_PATH: usize = 260;

/// Windows long path prefix
const WINDOWS_LONG_PATH_PREFIX: &str = r"\\?\";

/// File extensions accepted as source pages, lowercase.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

/// Gets the file name from a path with fallback to lossy conversion.
pub fn get_file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Converts a path to a string with fallback to lossy conversion.
pub fn path_to_string_lossy(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Checks if a path is potentially problematic due to length or special characters.
///
/// # Arguments
///
/// * `path` - The path to validate
///
/// # Returns
///
/// * `Result<()>` - Ok if the path is valid, or an error describing the issue
pub fn validate_path(path: &Path) -> Result<()> {
    let path_str = path_to_string_lossy(path);

    if cfg!(windows)
        && path_str.len() > WINDOWS_MAX_PATH
        && !path_str.starts_with(WINDOWS_LONG_PATH_PREFIX)
    {
        return Err(Error::InvalidPath(
            path.to_path_buf(),
            format!("Path is longer than {} characters", WINDOWS_MAX_PATH),
        ));
    }

    // Skip validation for Windows long path prefix (\\?\) which contains valid question marks
    let path_to_check = path_str
        .strip_prefix(WINDOWS_LONG_PATH_PREFIX)
        .unwrap_or(&path_str);

    if path_to_check
        .chars()
        .any(|c| matches!(c, '<' | '>' | '"' | '|' | '?' | '*'))
    {
        return Err(Error::InvalidPath(
            path.to_path_buf(),
            "Path contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

/// Extracts the last number of a file name.
///
/// # Arguments
///
/// * `path` - The path to extract numbers from
/// * `regex` - The regex pattern to use for extraction
///
/// # Returns
///
/// * `Option<f64>` - The extracted number, or None if not found or conversion failed
pub fn extract_number_from_filename_safe(path: &Path, regex: &regex::Regex) -> Option<f64> {
    let file_name = get_file_name_lossy(path);

    regex
        .captures_iter(&file_name)
        .last() // Take the last match, often more specific for versions/numbers
        .and_then(|cap| {
            let capture = cap.get(1).or_else(|| cap.get(0))?.as_str();
            if capture.contains('.') {
                capture.trim_end_matches('.').parse::<f64>().ok()
            } else {
                // "000" trims to nothing and still means zero
                match capture.trim_start_matches('0') {
                    "" => Some(0.0),
                    digits => digits.parse::<f64>().ok(),
                }
            }
        })
}

/// Orders two paths by the number in their file names, then by name.
///
/// Names without a number sort after numbered ones.
pub fn compare_paths_natural(a: &Path, b: &Path, regex: &regex::Regex) -> Ordering {
    let a_num = extract_number_from_filename_safe(a, regex);
    let b_num = extract_number_from_filename_safe(b, regex);

    let by_number = match (a_num, b_num) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_number.then_with(|| get_file_name_lossy(a).cmp(&get_file_name_lossy(b)))
}

/// Checks if a filename starts with a dot (hidden file) using safe conversion.
pub fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Checks whether the extension of `path` is a known image type.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
