/*
 * Decides whether a file is eligible for inclusion in an export.
 * A file is rejected up front when its extension is a known binary format or
 * when it is one of the version-control internal files; otherwise the first
 * kilobyte is probed and must decode as UTF-8. Read failures other than a
 * decode failure are returned as errors so callers can skip the path with a
 * warning instead of silently treating it as non-text.
 */
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub const PROBE_SIZE_BYTES: usize = 1024;

pub const BINARY_EXTENSIONS: &[&str] = &[
    "gif", "jpg", "jpeg", "png", "ico", "pdf", "pyc", "exe", "dll", "so", "dylib", "zip", "tar",
    "gz", "rar", "7z", "db", "sqlite", "bin", "dat",
];

// Matched against the last two path components, i.e. `.git/<name>`.
const VCS_DIR_NAME: &str = ".git";
const VCS_INTERNAL_FILES: &[&str] = &["index", "HEAD", "COMMIT_EDITMSG"];

pub trait TextClassifierOperations: Send + Sync {
    /*
     * Returns `Ok(true)` for text files, `Ok(false)` for files that are binary by
     * extension, name or content, and `Err` when the file could not be read.
     */
    fn is_text_file(&self, path: &Path) -> io::Result<bool>;
}

pub struct CoreTextClassifier {}

impl CoreTextClassifier {
    pub fn new() -> Self {
        CoreTextClassifier {}
    }
}

impl Default for CoreTextClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TextClassifierOperations for CoreTextClassifier {
    fn is_text_file(&self, path: &Path) -> io::Result<bool> {
        is_text_file(path)
    }
}

pub fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            BINARY_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

pub fn is_vcs_internal_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(OsStr::to_str) else {
        return false;
    };
    let parent_is_vcs_dir = path
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|parent| parent == VCS_DIR_NAME);
    parent_is_vcs_dir && VCS_INTERNAL_FILES.contains(&name)
}

/*
 * Classifies `path` as text or non-text.
 * The extension and VCS checks short-circuit before any I/O. The content probe
 * reads at most `PROBE_SIZE_BYTES`; a multi-byte sequence cut off by the probe
 * boundary is not treated as a decode failure.
 */
pub fn is_text_file(path: &Path) -> io::Result<bool> {
    if has_binary_extension(path) {
        log::trace!("TextClassifier: {path:?} rejected by extension.");
        return Ok(false);
    }
    if is_vcs_internal_file(path) {
        log::trace!("TextClassifier: {path:?} is a version-control internal file.");
        return Ok(false);
    }

    let file = File::open(path)?;
    let mut probe = Vec::with_capacity(PROBE_SIZE_BYTES);
    file.take(PROBE_SIZE_BYTES as u64).read_to_end(&mut probe)?;

    match std::str::from_utf8(&probe) {
        Ok(_) => Ok(true),
        // `error_len() == None` means the input ended mid-sequence.
        Err(e) if e.error_len().is_none() && probe.len() == PROBE_SIZE_BYTES => Ok(true),
        Err(e) => {
            log::trace!("TextClassifier: {path:?} failed UTF-8 probe: {e}");
            Ok(false)
        }
    }
}
