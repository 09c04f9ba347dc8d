/*
 * This module provides small helpers for presenting paths and sizes to the user.
 * Paths are shown relative to the project root when they live under it, which
 * keeps export headers and previews readable.
 */
use std::path::Path;

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/*
 * Returns `path` relative to `root` when it is located under `root`, otherwise
 * the path unchanged. Separators are normalised to `/` so exports look the same
 * on every platform.
 */
pub fn display_path(path: &Path, root: Option<&Path>) -> String {
    let shown = root
        .and_then(|r| path.strip_prefix(r).ok())
        .filter(|relative| !relative.as_os_str().is_empty())
        .unwrap_or(path);
    let text = shown.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

// Human readable size with one decimal, 1024-based: "512.0 B", "1.5 KB".
pub fn format_size(size_in_bytes: u64) -> String {
    let mut size = size_in_bytes as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }
    format!("{size:.1} {}", SIZE_UNITS[unit_index])
}
