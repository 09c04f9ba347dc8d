/*
 * This module consolidates the core, platform-agnostic logic of the application:
 * text classification, directory walking, the selection set, statistics and the
 * export serializer. The services the application logic depends on are exposed
 * through `...Operations` traits so they can be replaced by mocks in tests.
 */
pub mod config;
pub mod exporter;
pub mod file_classifier;
pub mod file_node;
pub mod file_system;
pub mod path_utils;
pub mod selection;
pub mod stats;

pub use config::{ConfigError, SessionConfig};

pub use exporter::{CoreExporter, ExportError, ExportOptions, ExportResult, ExporterOperations};

pub use file_classifier::{CoreTextClassifier, TextClassifierOperations};

pub use file_node::FileNode;

pub use file_system::{
    CoreFileSystemScanner, FileSystemError, FileSystemScannerOperations, ScanOutcome,
    SkippedDirectory,
};

pub use selection::SelectionSet;

pub use stats::{
    AggregateStats, FileStats, SkippedFile, StatsReport, UnreadableReason, compute_stats,
};
