/*
 * Live preview of the current selection: per-file statistics with paths shown
 * relative to the project root, totals over the readable files, and the files
 * that could not be read. Built from a `StatsReport` every time it is requested.
 */
use crate::core::path_utils::display_path;
use crate::core::{AggregateStats, FileStats, StatsReport};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewEntry {
    pub display_path: String,
    pub stats: FileStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPreview {
    pub entries: Vec<PreviewEntry>,
    pub totals: AggregateStats,
    pub unreadable: Vec<String>,
}

impl SelectionPreview {
    // Unreadable files are listed separately and do not count towards `totals`.
    pub fn from_report(report: &StatsReport, root: &Path) -> Self {
        SelectionPreview {
            entries: report
                .readable_entries()
                .into_iter()
                .map(|(path, stats)| PreviewEntry {
                    display_path: display_path(path, Some(root)),
                    stats: *stats,
                })
                .collect(),
            totals: report.totals(),
            unreadable: report
                .unreadable
                .iter()
                .map(|s| format!("{} ({})", display_path(&s.path, Some(root)), s.reason))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.unreadable.is_empty()
    }
}
