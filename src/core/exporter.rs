/*
 * Serialises a set of files into one plain-text export: a header with aggregate
 * statistics, one record per file in lexicographic path order, and a trailing
 * summary block. Every file is read exactly once and the statistics printed in
 * its record, in the header and in the summary all derive from that one read, so
 * the views cannot disagree. Files that are missing or unreadable at export time
 * are left out of the body and listed in the summary instead.
 *
 * The output is first written to a `.partial` sibling and renamed into place
 * only after a successful flush; a failed write removes the partial file.
 */
use super::config::SessionConfig;
use super::path_utils::display_path;
use super::selection::lexicographic_order;
use super::stats::{AggregateStats, FileStats, SkippedFile, measure_file};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;

pub const SEPARATOR_WIDTH: usize = 80;
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug)]
pub enum ExportError {
    NoFilesSelected,
    WriteFailure { path: PathBuf, source: io::Error },
    Timestamp(time::error::Format),
}

impl From<time::error::Format> for ExportError {
    fn from(err: time::error::Format) -> Self {
        ExportError::Timestamp(err)
    }
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::NoFilesSelected => write!(f, "No files selected for export"),
            ExportError::WriteFailure { path, source } => {
                write!(f, "Export failed writing {path:?}: {source}")
            }
            ExportError::Timestamp(e) => write!(f, "Could not format export timestamp: {e}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::WriteFailure { source, .. } => Some(source),
            ExportError::Timestamp(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    pub project_name: String,
    /* Paths under this root are printed relative to it. */
    pub display_root: Option<PathBuf>,
}

impl ExportOptions {
    pub fn from_config(config: &SessionConfig) -> Self {
        ExportOptions {
            output_dir: config.output_dir.clone(),
            project_name: config.project_name.clone(),
            display_root: Some(config.root_path.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub output_path: PathBuf,
    pub summary_text: String,
    pub totals: AggregateStats,
    pub skipped: Vec<SkippedFile>,
}

pub trait ExporterOperations: Send + Sync {
    fn export(&self, files: &BTreeSet<PathBuf>) -> Result<ExportResult, ExportError>;
}

pub struct CoreExporter {
    options: ExportOptions,
}

impl CoreExporter {
    pub fn new(options: ExportOptions) -> Self {
        CoreExporter { options }
    }
}

impl ExporterOperations for CoreExporter {
    fn export(&self, files: &BTreeSet<PathBuf>) -> Result<ExportResult, ExportError> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        export_files(files, &self.options, now)
    }
}

struct ManifestEntry {
    display_path: String,
    stats: FileStats,
    content: String,
}

// Lives only for the duration of one export call.
struct ExportManifest {
    generated_at: String,
    entries: Vec<ManifestEntry>,
    skipped: Vec<SkippedFile>,
    totals: AggregateStats,
}

impl ExportManifest {
    fn build(files: &BTreeSet<PathBuf>, display_root: Option<&Path>, generated_at: String) -> Self {
        let mut manifest = ExportManifest {
            generated_at,
            entries: Vec::new(),
            skipped: Vec::new(),
            totals: AggregateStats::default(),
        };
        for path in lexicographic_order(files) {
            match measure_file(path) {
                Ok(measured) => {
                    manifest.totals.add(&measured.stats);
                    manifest.entries.push(ManifestEntry {
                        display_path: display_path(path, display_root),
                        stats: measured.stats,
                        content: measured.content,
                    });
                }
                Err(reason) => {
                    log::warn!("Exporter: Skipping {path:?}: {reason}");
                    manifest.skipped.push(SkippedFile {
                        path: path.clone(),
                        reason,
                    });
                }
            }
        }
        manifest
    }
}

pub fn separator() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

/*
 * `<project>_context_<YYYYMMDD_HHMMSS>.txt`. Two exports of the same project in
 * the same second get the same name; the later one replaces the earlier.
 */
pub fn output_file_name(project_name: &str, at: OffsetDateTime) -> Result<String, ExportError> {
    let stamp = at.format(format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))?;
    Ok(format!("{project_name}_context_{stamp}.txt"))
}

fn format_generated_at(at: OffsetDateTime) -> Result<String, ExportError> {
    Ok(at.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
    ))?)
}

fn render_header(manifest: &ExportManifest) -> String {
    format!(
        "# Codebase Export\n\
         # Generated: {}\n\
         # Files: {}\n\
         # Total Lines: {}\n\
         # Total Characters: {}\n\
         # Total Size: {} bytes\n\n",
        manifest.generated_at,
        manifest.totals.files,
        manifest.totals.lines,
        manifest.totals.characters,
        manifest.totals.size_bytes
    )
}

fn render_record_header(entry: &ManifestEntry) -> String {
    let sep = separator();
    format!(
        "{sep}\n\
         # File: {}\n\
         # Lines: {}\n\
         # Characters: {}\n\
         # Size: {} bytes\n\
         {sep}\n\n",
        entry.display_path, entry.stats.lines, entry.stats.characters, entry.stats.size_bytes
    )
}

/*
 * The trailing summary block. The same text is written at the end of the export
 * file and returned to the caller for display.
 */
pub fn render_summary(
    totals: &AggregateStats,
    output_file_name: &str,
    skipped: &[SkippedFile],
    display_root: Option<&Path>,
) -> String {
    let sep = separator();
    let mut summary = format!(
        "{sep}\n\
         Export Summary\n\
         {sep}\n\
         Statistics:\n\
         - Files processed: {}\n\
         - Total lines: {}\n\
         - Total characters: {}\n\
         - Total size: {} bytes\n\
         - Output file: {output_file_name}\n",
        totals.files, totals.lines, totals.characters, totals.size_bytes
    );
    if !skipped.is_empty() {
        summary.push_str("\nSkipped files:\n");
        for file in skipped {
            summary.push_str(&format!("- {}\n", display_path(&file.path, display_root)));
        }
    }
    summary
}

fn write_manifest<W: Write>(
    writer: &mut W,
    manifest: &ExportManifest,
    summary: &str,
) -> io::Result<()> {
    writer.write_all(render_header(manifest).as_bytes())?;
    for entry in &manifest.entries {
        writer.write_all(render_record_header(entry).as_bytes())?;
        writer.write_all(entry.content.as_bytes())?;
        writer.write_all(b"\n\n")?;
    }
    writer.write_all(b"\n")?;
    writer.write_all(summary.as_bytes())?;
    writer.flush()
}

fn write_atomically(
    output_path: &Path,
    manifest: &ExportManifest,
    summary: &str,
) -> io::Result<()> {
    let mut partial_name = output_path.as_os_str().to_owned();
    partial_name.push(PARTIAL_SUFFIX);
    let partial_path = PathBuf::from(partial_name);

    let result = File::create(&partial_path).and_then(|file| {
        let mut writer = BufWriter::new(file);
        write_manifest(&mut writer, manifest, summary)?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        fs::rename(&partial_path, output_path)
    });

    if result.is_err() && partial_path.exists() {
        if let Err(e) = fs::remove_file(&partial_path) {
            log::error!("Exporter: Could not remove partial output {partial_path:?}: {e}");
        }
    }
    result
}

/*
 * Exports `files` into `options.output_dir`, stamping the output with
 * `generated_at`. Returns `NoFilesSelected` without touching the filesystem when
 * `files` is empty, and `WriteFailure` when the output cannot be written.
 */
pub fn export_files(
    files: &BTreeSet<PathBuf>,
    options: &ExportOptions,
    generated_at: OffsetDateTime,
) -> Result<ExportResult, ExportError> {
    if files.is_empty() {
        log::info!("Exporter: Export requested with no files selected.");
        return Err(ExportError::NoFilesSelected);
    }

    let file_name = output_file_name(&options.project_name, generated_at)?;
    let output_path = options.output_dir.join(&file_name);
    let display_root = options.display_root.as_deref();

    let manifest = ExportManifest::build(files, display_root, format_generated_at(generated_at)?);
    let summary = render_summary(&manifest.totals, &file_name, &manifest.skipped, display_root);

    log::debug!(
        "Exporter: Writing {} files ({} skipped) to {output_path:?}",
        manifest.entries.len(),
        manifest.skipped.len()
    );
    if let Err(source) = write_atomically(&output_path, &manifest, &summary) {
        log::error!("Exporter: Export failed for {output_path:?}: {source}");
        return Err(ExportError::WriteFailure {
            path: output_path,
            source,
        });
    }
    log::info!("Export completed: {output_path:?}");

    Ok(ExportResult {
        output_path,
        summary_text: summary,
        totals: manifest.totals,
        skipped: manifest.skipped,
    })
}
