/*
 * Non-interactive candidate gathering. Instead of per-file toggles, the files
 * are picked by extension (or all text files are taken) and fed into the same
 * `SelectionSet` the interactive session uses, so the export path is identical.
 * Also lists the extensions present in a tree, grouped by language category.
 */
use crate::core::file_system::{self, FileSystemError};
use crate::core::{
    ExportResult, SelectionSet, SessionConfig, SkippedDirectory, TextClassifierOperations,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

const UNCATEGORIZED: &str = "Uncategorized";

// Known extensions by category, in display order.
const EXTENSION_CATEGORIES: &[(&str, &[&str])] = &[
    ("Data", &[".jl", ".json", ".r", ".sql", ".xml", ".yaml"]),
    ("Documentation", &[".md"]),
    (
        "Functional",
        &[".clj", ".erl", ".ex", ".fs", ".hs", ".lisp", ".rkt", ".scala", ".scm"],
    ),
    (
        "General Purpose",
        &[".c", ".cpp", ".cs", ".go", ".java", ".py", ".rb", ".sh", ".swift", ".ts"],
    ),
    ("Mobile", &[".dart", ".kt"]),
    (
        "Other",
        &[".groovy", ".lean", ".ml", ".nim", ".pro", ".v", ".vb", ".vhdl"],
    ),
    ("Scientific", &[".f", ".m"]),
    ("Scripting", &[".lua", ".pl", ".tcl"]),
    ("System Programming", &[".asm", ".rs"]),
    (
        "Web Development",
        &[".css", ".html", ".js", ".jsx", ".php", ".tsx", ".vue"],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionFilter {
    AllText,
    // Lower-case extensions including the leading dot.
    Only(BTreeSet<String>),
}

impl ExtensionFilter {
    /*
     * Parses a comma separated list such as `rs,toml` or `.py, .MD`.
     * Returns `None` if the list contains no extension at all.
     */
    pub fn parse(list: &str) -> Option<Self> {
        let extensions: BTreeSet<String> = list
            .split(',')
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{e}"))
            .collect();
        if extensions.is_empty() {
            None
        } else {
            Some(ExtensionFilter::Only(extensions))
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            ExtensionFilter::AllText => true,
            ExtensionFilter::Only(extensions) => {
                extension_of(path).is_some_and(|ext| extensions.contains(&ext))
            }
        }
    }
}

// Lower-case extension with its leading dot, e.g. `.rs`.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

#[derive(Debug, Default)]
pub struct BatchSelection {
    pub selection: SelectionSet,
    pub skipped_directories: Vec<SkippedDirectory>,
    pub rejected_non_text: usize,
}

// Machine-readable result of a batch export, printed with `--json`.
#[derive(Debug, Serialize)]
pub struct BatchReport<'a> {
    pub export: &'a ExportResult,
    pub skipped_directories: &'a [SkippedDirectory],
    pub rejected_non_text: usize,
}

impl<'a> BatchReport<'a> {
    pub fn new(export: &'a ExportResult, batch: &'a BatchSelection) -> Self {
        BatchReport {
            export,
            skipped_directories: &batch.skipped_directories,
            rejected_non_text: batch.rejected_non_text,
        }
    }
}

/*
 * Walks the tree and selects every candidate that passes `filter` and is
 * classified as text. Files whose classification fails are skipped with a
 * warning, like unreadable files anywhere else.
 */
pub fn collect_selection(
    config: &SessionConfig,
    classifier: &dyn TextClassifierOperations,
    filter: &ExtensionFilter,
) -> Result<BatchSelection, FileSystemError> {
    let mut result = BatchSelection::default();
    let mut candidates = file_system::enumerate(config)?;
    for path in candidates.by_ref() {
        if !filter.accepts(&path) {
            continue;
        }
        match classifier.is_text_file(&path) {
            Ok(true) => {
                result.selection.add(&path);
            }
            Ok(false) => {
                log::debug!("Batch: Skipping non-text file {path:?}");
                result.rejected_non_text += 1;
            }
            Err(e) => log::warn!("Batch: Skipping {path:?}, could not classify: {e}"),
        }
    }
    result.skipped_directories = candidates.skipped_directories().to_vec();
    log::info!(
        "Batch: Selected {} files ({} non-text rejected, {} directories skipped).",
        result.selection.len(),
        result.rejected_non_text,
        result.skipped_directories.len()
    );
    Ok(result)
}

// Sorted set of extensions present among the candidate files.
pub fn collect_extensions(config: &SessionConfig) -> Result<BTreeSet<String>, FileSystemError> {
    Ok(file_system::enumerate(config)?
        .filter_map(|path| extension_of(&path))
        .collect())
}

/*
 * Groups `extensions` by known category. Categories keep their display order
 * and only appear when non-empty; unknown extensions are collected last.
 */
pub fn group_by_category(extensions: &BTreeSet<String>) -> Vec<(&'static str, Vec<String>)> {
    let mut remaining = extensions.clone();
    let mut groups = Vec::new();
    for (category, known) in EXTENSION_CATEGORIES {
        let present: Vec<String> = known
            .iter()
            .filter(|ext| remaining.remove(**ext))
            .map(|ext| ext.to_string())
            .collect();
        if !present.is_empty() {
            groups.push((*category, present));
        }
    }
    if !remaining.is_empty() {
        groups.push((UNCATEGORIZED, remaining.into_iter().collect()));
    }
    groups
}

// `{"Category": [".ext", ...], ...}`, keyed by category name.
pub fn type_listing_json(groups: &[(&str, Vec<String>)]) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    for (category, extensions) in groups {
        object.insert(category.to_string(), serde_json::json!(extensions));
    }
    serde_json::Value::Object(object)
}

pub fn render_type_listing(groups: &[(&str, Vec<String>)]) -> String {
    if groups.is_empty() {
        return "No file types found.\n".to_string();
    }
    let mut listing = String::new();
    for (category, extensions) in groups {
        listing.push_str(&format!("{category}:\n  {}\n", extensions.join(" ")));
    }
    listing
}
