use super::config::SessionConfig;
use super::file_node::FileNode;
use ignore::{DirEntry, Walk, WalkBuilder};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/*
 * This module walks a project directory. It provides two views of the same walk:
 * `enumerate`, a lazy sequence of candidate files, and `scan_directory`, a sorted
 * tree of `FileNode`s for interactive selection. Both prune the configured
 * directory names (`.env`, `.venv` by default) with everything beneath them, omit
 * files whose base name is in the exclusion set, and never abort on an unreadable
 * subdirectory: such directories are recorded as skipped and the walk goes on.
 */

#[derive(Debug)]
pub enum FileSystemError {
    Io(io::Error),
    InvalidPath(PathBuf),
}

impl From<io::Error> for FileSystemError {
    fn from(err: io::Error) -> Self {
        FileSystemError::Io(err)
    }
}

impl std::fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileSystemError::Io(e) => write!(f, "I/O error: {e}"),
            FileSystemError::InvalidPath(p) => write!(f, "Invalid path: {p:?}"),
        }
    }
}

impl std::error::Error for FileSystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileSystemError::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FileSystemError>;

// A directory (or entry) that could not be read during traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDirectory {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub nodes: Vec<FileNode>,
    pub skipped_directories: Vec<SkippedDirectory>,
}

pub trait FileSystemScannerOperations: Send + Sync {
    /*
     * Walks `config.root_path` and builds the selection tree: directories first,
     * then files, alphabetically at each level.
     */
    fn scan_directory(&self, config: &SessionConfig) -> Result<ScanOutcome>;
}

pub struct CoreFileSystemScanner {}

impl CoreFileSystemScanner {
    pub fn new() -> Self {
        CoreFileSystemScanner {}
    }
}

impl Default for CoreFileSystemScanner {
    fn default() -> Self {
        Self::new()
    }
}

/*
 * Lazy sequence of candidate files produced by `enumerate`.
 * Unreadable directories encountered while iterating are collected and can be
 * inspected through `skipped_directories` once iteration has finished.
 */
pub struct CandidateFiles {
    walk: Walk,
    config: SessionConfig,
    skipped_directories: Vec<SkippedDirectory>,
}

impl CandidateFiles {
    pub fn skipped_directories(&self) -> &[SkippedDirectory] {
        &self.skipped_directories
    }
}

impl Iterator for CandidateFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.walk.next()? {
                Ok(entry) => {
                    if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                        continue;
                    }
                    if self.config.exclusions.matches_name(entry.file_name()) {
                        log::trace!("FileSystemScanner: Excluding {:?}", entry.path());
                        continue;
                    }
                    return Some(entry.into_path());
                }
                Err(err) => {
                    let skipped = skipped_from_error(&err, &self.config.root_path);
                    log::warn!(
                        "FileSystemScanner: Skipping unreadable entry {:?}: {}",
                        skipped.path,
                        skipped.reason
                    );
                    self.skipped_directories.push(skipped);
                }
            }
        }
    }
}

/*
 * Starts a fresh walk of `config.root_path` and returns the candidate files as a
 * lazy iterator. Nothing is cached between calls; siblings are visited in
 * alphabetical order so repeated walks yield the same sequence.
 */
pub fn enumerate(config: &SessionConfig) -> Result<CandidateFiles> {
    if !config.root_path.is_dir() {
        return Err(FileSystemError::InvalidPath(config.root_path.clone()));
    }
    log::debug!("FileSystemScanner: Enumerating candidates under {:?}", config.root_path);
    Ok(CandidateFiles {
        walk: build_walker(config),
        config: config.clone(),
        skipped_directories: Vec::new(),
    })
}

impl FileSystemScannerOperations for CoreFileSystemScanner {
    fn scan_directory(&self, config: &SessionConfig) -> Result<ScanOutcome> {
        let root_path = config.root_path.as_path();
        if !root_path.is_dir() {
            return Err(FileSystemError::InvalidPath(root_path.to_path_buf()));
        }
        log::debug!("FileSystemScanner: Scanning directory {root_path:?}");

        let mut nodes_map: HashMap<PathBuf, FileNode> = HashMap::new();
        let mut entry_paths_in_discovery_order: Vec<PathBuf> = Vec::new();
        let mut skipped_directories = Vec::new();

        for entry_result in build_walker(config) {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    let skipped = skipped_from_error(&err, root_path);
                    log::warn!(
                        "FileSystemScanner: Skipping unreadable entry {:?}: {}",
                        skipped.path,
                        skipped.reason
                    );
                    skipped_directories.push(skipped);
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let Some(file_type) = entry.file_type() else {
                continue;
            };
            let is_dir = file_type.is_dir();
            if !is_dir && !file_type.is_file() {
                continue;
            }
            if !is_dir && config.exclusions.matches_name(entry.file_name()) {
                log::trace!("FileSystemScanner: Excluding {:?}", entry.path());
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.into_path();
            nodes_map.insert(path.clone(), FileNode::new(path.clone(), name, is_dir));
            entry_paths_in_discovery_order.push(path);
        }

        // Attach leaves to their parents, deepest first.
        for child_path in entry_paths_in_discovery_order.iter().rev() {
            let Some(parent_path) = child_path.parent() else {
                continue;
            };
            if parent_path == root_path {
                continue;
            }
            if let Some(child_node) = nodes_map.remove(child_path) {
                if let Some(parent_node) = nodes_map.get_mut(parent_path) {
                    parent_node.children.push(child_node);
                } else {
                    log::error!(
                        "FileSystemScanner: Parent {parent_path:?} not found for {child_path:?}. Keeping it top-level."
                    );
                    nodes_map.insert(child_path.clone(), child_node);
                }
            }
        }

        let mut top_level_nodes: Vec<FileNode> = nodes_map.into_values().collect();
        sort_file_nodes_recursively(&mut top_level_nodes);
        log::debug!(
            "FileSystemScanner: Scan complete. {} top-level entries, {} skipped directories.",
            top_level_nodes.len(),
            skipped_directories.len()
        );
        Ok(ScanOutcome {
            nodes: top_level_nodes,
            skipped_directories,
        })
    }
}

fn build_walker(config: &SessionConfig) -> Walk {
    let prune_config = config.clone();
    let respect = config.respect_ignore_files;

    let mut builder = WalkBuilder::new(&config.root_path);
    builder
        .standard_filters(false) // Plain walk: hidden files included, no ignore files.
        .follow_links(false)
        .git_ignore(respect)
        .git_exclude(respect)
        .ignore(respect)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| !is_pruned_dir(entry, &prune_config));
    builder.build()
}

fn is_pruned_dir(entry: &DirEntry, config: &SessionConfig) -> bool {
    entry.depth() > 0
        && entry.file_type().is_some_and(|ft| ft.is_dir())
        && config.is_pruned_dir_name(entry.file_name())
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child),
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        _ => None,
    }
}

fn skipped_from_error(err: &ignore::Error, root_path: &Path) -> SkippedDirectory {
    SkippedDirectory {
        path: error_path(err).unwrap_or(root_path).to_path_buf(),
        reason: err.to_string(),
    }
}

fn sort_file_nodes_recursively(nodes: &mut [FileNode]) {
    nodes.sort_by(|a, b| {
        if a.is_dir() && !b.is_dir() {
            std::cmp::Ordering::Less
        } else if !a.is_dir() && b.is_dir() {
            std::cmp::Ordering::Greater
        } else {
            a.name().cmp(b.name())
        }
    });

    for node in nodes.iter_mut() {
        if node.is_dir() && !node.children.is_empty() {
            sort_file_nodes_recursively(&mut node.children);
        }
    }
}
