/*
 * Per-file and aggregate statistics over an arbitrary set of files.
 * `characters` and `lines` describe the decoded text; `size_bytes` is the length
 * of the file on disk. Under multi-byte encodings the two differ and are kept
 * separate on purpose. Statistics are never cached: every call re-reads the files.
 */
use super::selection::lexicographic_order;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
    pub characters: u64,
    pub lines: u64,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    pub files: u64,
    pub characters: u64,
    pub lines: u64,
    pub size_bytes: u64,
}

impl AggregateStats {
    pub fn add(&mut self, stats: &FileStats) {
        self.files += 1;
        self.characters += stats.characters;
        self.lines += stats.lines;
        self.size_bytes += stats.size_bytes;
    }
}

// Why a file could not contribute its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UnreadableReason {
    Missing,
    NotAFile,
    NotText,
    Io(String),
}

impl std::fmt::Display for UnreadableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnreadableReason::Missing => write!(f, "file does not exist"),
            UnreadableReason::NotAFile => write!(f, "not a regular file"),
            UnreadableReason::NotText => write!(f, "content is not valid UTF-8 text"),
            UnreadableReason::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl From<io::Error> for UnreadableReason {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => UnreadableReason::Missing,
            _ => UnreadableReason::Io(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: UnreadableReason,
}

// A file read once, with statistics derived from exactly that read.
#[derive(Debug, Clone)]
pub struct MeasuredFile {
    pub stats: FileStats,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsReport {
    pub per_file: BTreeMap<PathBuf, FileStats>,
    pub unreadable: Vec<SkippedFile>,
}

impl StatsReport {
    fn is_unreadable(&self, path: &Path) -> bool {
        self.unreadable.iter().any(|s| s.path == path)
    }

    // Files that were read successfully, in lexicographic path order.
    pub fn readable_entries(&self) -> Vec<(&PathBuf, &FileStats)> {
        let mut entries: Vec<(&PathBuf, &FileStats)> = self
            .per_file
            .iter()
            .filter(|(path, _)| !self.is_unreadable(path))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.as_os_str().cmp(b.as_os_str()));
        entries
    }

    // Unreadable files carry all-zero statistics and are not counted.
    pub fn totals(&self) -> AggregateStats {
        let mut totals = AggregateStats::default();
        for (_, stats) in self.readable_entries() {
            totals.add(stats);
        }
        totals
    }
}

/*
 * Number of lines under universal-newline rules: `\n`, `\r\n` and a lone `\r`
 * each terminate a line, and a trailing segment without terminator still counts.
 */
pub fn count_lines(content: &str) -> u64 {
    let bytes = content.as_bytes();
    let mut lines = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => lines += 1,
            b'\r' => {
                lines += 1;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    if !content.is_empty() && !content.ends_with(['\n', '\r']) {
        lines += 1;
    }
    lines
}

pub fn stats_for_content(content: &str, size_bytes: u64) -> FileStats {
    FileStats {
        characters: content.chars().count() as u64,
        lines: count_lines(content),
        size_bytes,
    }
}

/*
 * Reads `path` once and returns its decoded content together with its
 * statistics. Fails with the reason the file cannot be used.
 */
pub fn measure_file(path: &Path) -> Result<MeasuredFile, UnreadableReason> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(UnreadableReason::NotAFile);
    }
    let bytes = fs::read(path)?;
    let content = String::from_utf8(bytes).map_err(|_| UnreadableReason::NotText)?;
    let stats = stats_for_content(&content, metadata.len());
    Ok(MeasuredFile { stats, content })
}

/*
 * Computes statistics for every path in `files`. The report always holds one
 * entry per requested path; files that cannot be read contribute all-zero
 * statistics and are additionally listed in `unreadable`.
 */
pub fn compute_stats(files: &BTreeSet<PathBuf>) -> StatsReport {
    let mut report = StatsReport::default();
    for path in lexicographic_order(files) {
        let stats = match measure_file(path) {
            Ok(measured) => measured.stats,
            Err(reason) => {
                log::error!("StatsCalculator: Error reading file {path:?}: {reason}");
                report.unreadable.push(SkippedFile {
                    path: path.clone(),
                    reason,
                });
                FileStats::default()
            }
        };
        report.per_file.insert(path.clone(), stats);
    }
    log::debug!(
        "StatsCalculator: Computed stats for {} files ({} unreadable).",
        report.per_file.len(),
        report.unreadable.len()
    );
    report
}
