use super::handler::*;
use crate::console_layer::{
    AppEvent, CheckState, MessageSeverity, TreeItemDescriptor, TreeItemId, UiCommand,
    UiEventHandler,
};
use crate::core::{
    AggregateStats, ExportError, ExportResult, ExporterOperations, FileNode, FileSystemError,
    FileSystemScannerOperations, ScanOutcome, SessionConfig, SkippedDirectory,
    TextClassifierOperations,
};

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{TempDir, tempdir};

/*
 * Unit tests for `SessionHandler`. The core services are replaced by mocks so
 * the tests exercise event handling, selection bookkeeping, command generation
 * and the background export without touching a real directory tree (except
 * where file statistics are read for the preview).
 */

const WAIT: Duration = Duration::from_secs(5);

// --- Mock Structures (FileSystemScanner, TextClassifier, Exporter) ---
struct MockFileSystemScanner {
    scan_result: Mutex<Option<Result<ScanOutcome, FileSystemError>>>,
    scan_calls: Mutex<usize>,
}

impl MockFileSystemScanner {
    fn new(outcome: ScanOutcome) -> Self {
        MockFileSystemScanner {
            scan_result: Mutex::new(Some(Ok(outcome))),
            scan_calls: Mutex::new(0),
        }
    }
    fn set_scan_result(&self, result: Result<ScanOutcome, FileSystemError>) {
        *self.scan_result.lock().unwrap() = Some(result);
    }
}

impl FileSystemScannerOperations for MockFileSystemScanner {
    fn scan_directory(&self, _config: &SessionConfig) -> Result<ScanOutcome, FileSystemError> {
        *self.scan_calls.lock().unwrap() += 1;
        match self.scan_result.lock().unwrap().as_ref() {
            Some(Ok(outcome)) => Ok(outcome.clone()),
            Some(Err(FileSystemError::InvalidPath(p))) => Err(FileSystemError::InvalidPath(p.clone())),
            Some(Err(FileSystemError::Io(e))) => {
                Err(FileSystemError::Io(io::Error::new(e.kind(), "mocked io error")))
            }
            None => Ok(ScanOutcome::default()),
        }
    }
}

struct MockTextClassifier {
    binary_paths: HashSet<PathBuf>,
    unreadable_paths: HashSet<PathBuf>,
}

impl TextClassifierOperations for MockTextClassifier {
    fn is_text_file(&self, path: &Path) -> io::Result<bool> {
        if self.unreadable_paths.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        Ok(!self.binary_paths.contains(path))
    }
}

struct MockExporter {
    export_calls: Mutex<Vec<BTreeSet<PathBuf>>>,
    // When set, each export blocks until a value is sent on the paired sender.
    gate: Mutex<Option<Receiver<()>>>,
    fail_with_write_error: bool,
}

impl MockExporter {
    fn new() -> Self {
        MockExporter {
            export_calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            fail_with_write_error: false,
        }
    }
    fn gated() -> (Self, Sender<()>) {
        let (sender, receiver) = mpsc::channel();
        let exporter = MockExporter::new();
        *exporter.gate.lock().unwrap() = Some(receiver);
        (exporter, sender)
    }
    fn calls(&self) -> Vec<BTreeSet<PathBuf>> {
        self.export_calls.lock().unwrap().clone()
    }
}

impl ExporterOperations for MockExporter {
    fn export(&self, files: &BTreeSet<PathBuf>) -> Result<ExportResult, ExportError> {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            let _ = gate.recv_timeout(WAIT);
        }
        self.export_calls.lock().unwrap().push(files.clone());
        if self.fail_with_write_error {
            return Err(ExportError::WriteFailure {
                path: PathBuf::from("/out/proj_context_20240101_000000.txt"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        Ok(ExportResult {
            output_path: PathBuf::from("/out/proj_context_20240101_000000.txt"),
            summary_text: format!("- Files processed: {}\n", files.len()),
            totals: AggregateStats::default(),
            skipped: Vec::new(),
        })
    }
}
// --- End Mock Structures ---

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    scanner: Arc<MockFileSystemScanner>,
    exporter: Arc<MockExporter>,
    handler: SessionHandler,
}

fn file_node(path: PathBuf) -> FileNode {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    FileNode::new(path, name, false)
}

/*
 * root/
 *   assets/logo.png   (binary)
 *   assets/notes.md
 *   src/lib.rs
 *   src/main.rs
 *   locked.txt        (classification fails)
 *   README.md
 */
fn sample_outcome(root: &Path) -> ScanOutcome {
    ScanOutcome {
        nodes: vec![
            FileNode::new_dir(
                root.join("assets"),
                "assets",
                vec![
                    file_node(root.join("assets/logo.png")),
                    file_node(root.join("assets/notes.md")),
                ],
            ),
            FileNode::new_dir(
                root.join("src"),
                "src",
                vec![file_node(root.join("src/lib.rs")), file_node(root.join("src/main.rs"))],
            ),
            file_node(root.join("README.md")),
            file_node(root.join("locked.txt")),
        ],
        skipped_directories: Vec::new(),
    }
}

fn setup_with_exporter(exporter: MockExporter) -> Fixture {
    crate::initialize_logging();
    let dir = tempdir().expect("create temp dir");
    let config = SessionConfig::new(dir.path()).expect("valid root");
    let root = config.root_path.clone();
    let scanner = Arc::new(MockFileSystemScanner::new(sample_outcome(&root)));
    let classifier = Arc::new(MockTextClassifier {
        binary_paths: [root.join("assets/logo.png")].into_iter().collect(),
        unreadable_paths: [root.join("locked.txt")].into_iter().collect(),
    });
    let exporter = Arc::new(exporter);
    let handler = SessionHandler::new(
        config,
        scanner.clone(),
        classifier,
        exporter.clone(),
    );
    Fixture {
        _dir: dir,
        root,
        scanner,
        exporter,
        handler,
    }
}

fn setup() -> Fixture {
    let mut fixture = setup_with_exporter(MockExporter::new());
    fixture.handler.handle_event(AppEvent::Rescan);
    fixture
}

fn find_tree(commands: &[UiCommand]) -> Option<&Vec<TreeItemDescriptor>> {
    commands.iter().find_map(|c| match c {
        UiCommand::ShowTree { items, .. } => Some(items),
        _ => None,
    })
}

fn selection_count(commands: &[UiCommand]) -> Option<usize> {
    commands.iter().find_map(|c| match c {
        UiCommand::UpdateSelectionCount { selected } => Some(*selected),
        _ => None,
    })
}

fn messages(commands: &[UiCommand], wanted: MessageSeverity) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            UiCommand::ShowMessage { severity, text } if *severity == wanted => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn id_of(fixture: &Fixture, relative: &str) -> TreeItemId {
    fixture
        .handler
        .tree_view
        .id_for_path(&fixture.root.join(relative))
        .expect("path is rendered")
}

#[test]
fn test_rescan_shows_tree_and_classifies_files() {
    // Arrange
    let mut fixture = setup_with_exporter(MockExporter::new());

    // Act
    let commands = fixture.handler.handle_event(AppEvent::Rescan);

    // Assert
    let tree = find_tree(&commands).expect("tree is shown");
    assert_eq!(tree.len(), 4);
    assert_eq!(tree[0].text, "assets");
    assert!(!tree[0].children[0].is_text);
    assert!(tree[0].children[1].is_text);
    assert!(!tree[3].is_text, "unclassifiable file is not selectable");
    assert_eq!(selection_count(&commands), Some(0));
    assert_eq!(*fixture.scanner.scan_calls.lock().unwrap(), 1);
}

#[test]
fn test_toggle_file_selects_and_deselects() {
    let mut fixture = setup();
    let id = id_of(&fixture, "src/main.rs");

    let commands = fixture.handler.handle_event(AppEvent::Toggle(id));
    assert_eq!(selection_count(&commands), Some(1));
    assert!(fixture.handler.selection().contains(&fixture.root.join("src/main.rs")));

    let commands = fixture.handler.handle_event(AppEvent::Toggle(id));
    assert_eq!(selection_count(&commands), Some(0));
    assert!(fixture.handler.selection().is_empty());
}

#[test]
fn test_toggle_binary_file_is_refused() {
    let mut fixture = setup();
    let id = id_of(&fixture, "assets/logo.png");

    let commands = fixture.handler.handle_event(AppEvent::Toggle(id));

    assert_eq!(messages(&commands, MessageSeverity::Warning).len(), 1);
    assert!(fixture.handler.selection().is_empty());
    assert!(find_tree(&commands).is_none());
}

#[test]
fn test_toggle_unknown_item_reports_warning() {
    let mut fixture = setup();

    let commands = fixture.handler.handle_event(AppEvent::Toggle(TreeItemId(999)));

    let warnings = messages(&commands, MessageSeverity::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("999"));
}

#[test]
fn test_toggle_directory_selects_all_then_deselects_all() {
    // Arrange
    let mut fixture = setup();
    let assets = id_of(&fixture, "assets");

    // Act
    let first = fixture.handler.handle_event(AppEvent::Toggle(assets));

    // Assert
    assert_eq!(selection_count(&first), Some(1));
    assert!(fixture.handler.selection().contains(&fixture.root.join("assets/notes.md")));
    let tree = find_tree(&first).expect("tree is refreshed");
    assert_eq!(tree[0].state, CheckState::Checked);

    let second = fixture.handler.handle_event(AppEvent::Toggle(assets));
    assert_eq!(selection_count(&second), Some(0));
}

#[test]
fn test_partial_directory_state_after_single_toggle() {
    let mut fixture = setup();
    let main_rs = id_of(&fixture, "src/main.rs");

    let commands = fixture.handler.handle_event(AppEvent::Toggle(main_rs));

    let tree = find_tree(&commands).expect("tree is refreshed");
    assert_eq!(tree[1].text, "src");
    assert_eq!(tree[1].state, CheckState::Partial);
}

#[test]
fn test_select_and_deselect_all_under_report_counts() {
    let mut fixture = setup();
    let src = id_of(&fixture, "src");

    let commands = fixture.handler.handle_event(AppEvent::SelectAllUnder(src));
    assert_eq!(selection_count(&commands), Some(2));
    assert_eq!(
        messages(&commands, MessageSeverity::Information),
        vec!["Selected 2 files under src.".to_string()]
    );

    let commands = fixture.handler.handle_event(AppEvent::DeselectAllUnder(src));
    assert_eq!(selection_count(&commands), Some(0));
}

#[test]
fn test_clear_selection_empties_set() {
    let mut fixture = setup();
    let src = id_of(&fixture, "src");
    fixture.handler.handle_event(AppEvent::SelectAllUnder(src));

    let commands = fixture.handler.handle_event(AppEvent::ClearSelection);

    assert_eq!(selection_count(&commands), Some(0));
    assert!(fixture.handler.selection().is_empty());
}

#[test]
fn test_filter_restricts_tree_and_reports_no_match() {
    let mut fixture = setup();

    let commands = fixture
        .handler
        .handle_event(AppEvent::Filter(Some("main".to_string())));
    match &commands[0] {
        UiCommand::ShowTree {
            items,
            filter_text,
            filter_no_match,
        } => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].children[0].text, "main.rs");
            assert_eq!(filter_text.as_deref(), Some("main"));
            assert!(!filter_no_match);
        }
        other => panic!("Expected ShowTree, got {other:?}"),
    }

    let commands = fixture
        .handler
        .handle_event(AppEvent::Filter(Some("zzz".to_string())));
    assert!(matches!(
        commands[0],
        UiCommand::ShowTree {
            filter_no_match: true,
            ..
        }
    ));

    let commands = fixture.handler.handle_event(AppEvent::Filter(None));
    assert_eq!(find_tree(&commands).map(Vec::len), Some(4));
}

#[test]
fn test_toggle_show_files_hides_files() {
    let mut fixture = setup();

    let commands = fixture.handler.handle_event(AppEvent::ToggleShowFiles);

    let tree = find_tree(&commands).expect("tree is shown");
    assert_eq!(tree.len(), 2);
    assert!(tree.iter().all(|d| d.is_folder && d.children.is_empty()));
}

#[test]
fn test_rescan_drops_selections_that_disappeared() {
    // Arrange
    let mut fixture = setup();
    let src = id_of(&fixture, "src");
    fixture.handler.handle_event(AppEvent::SelectAllUnder(src));
    let mut outcome = sample_outcome(&fixture.root);
    outcome.nodes[1].children.truncate(1); // src/main.rs is gone
    outcome.skipped_directories.push(SkippedDirectory {
        path: fixture.root.join("private"),
        reason: "permission denied".to_string(),
    });
    fixture.scanner.set_scan_result(Ok(outcome));

    // Act
    let commands = fixture.handler.handle_event(AppEvent::Rescan);

    // Assert
    assert_eq!(selection_count(&commands), Some(1));
    assert!(fixture.handler.selection().contains(&fixture.root.join("src/lib.rs")));
    let warnings = messages(&commands, MessageSeverity::Warning);
    assert_eq!(warnings.len(), 2);
    assert!(warnings[1].contains("private (permission denied)"));
}

#[test]
fn test_rescan_failure_reports_error_and_empties_tree() {
    let mut fixture = setup();
    fixture
        .scanner
        .set_scan_result(Err(FileSystemError::InvalidPath(PathBuf::from("/gone"))));

    let commands = fixture.handler.handle_event(AppEvent::Rescan);

    assert_eq!(find_tree(&commands).map(Vec::len), Some(0));
    assert_eq!(messages(&commands, MessageSeverity::Error).len(), 1);
}

#[test]
fn test_preview_reports_stats_for_real_files() -> io::Result<()> {
    // Arrange
    let mut fixture = setup();
    fs::create_dir_all(fixture.root.join("src"))?;
    fs::write(fixture.root.join("src/lib.rs"), "pub fn a() {}\npub fn b() {}\n")?;
    let lib = id_of(&fixture, "src/lib.rs");
    let main_rs = id_of(&fixture, "src/main.rs"); // not on disk
    fixture.handler.handle_event(AppEvent::Toggle(lib));
    fixture.handler.handle_event(AppEvent::Toggle(main_rs));

    // Act
    let commands = fixture.handler.handle_event(AppEvent::Preview);

    // Assert
    match &commands[..] {
        [UiCommand::ShowPreview(preview)] => {
            assert_eq!(preview.totals.files, 1);
            assert_eq!(preview.totals.lines, 2);
            assert_eq!(preview.entries[0].display_path, "src/lib.rs");
            assert_eq!(preview.unreadable.len(), 1);
            assert!(preview.unreadable[0].starts_with("src/main.rs"));
        }
        other => panic!("Expected a single ShowPreview, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_preview_with_empty_selection_is_informational() {
    let mut fixture = setup();

    let commands = fixture.handler.handle_event(AppEvent::Preview);

    assert_eq!(
        messages(&commands, MessageSeverity::Information),
        vec!["No files selected.".to_string()]
    );
}

#[test]
fn test_export_with_empty_selection_is_rejected_without_worker() {
    let mut fixture = setup();

    let commands = fixture.handler.handle_event(AppEvent::Export);

    assert_eq!(messages(&commands, MessageSeverity::Warning).len(), 1);
    assert!(!fixture.handler.is_busy());
    assert!(fixture.exporter.calls().is_empty());
}

#[test]
fn test_export_runs_in_background_and_reports_summary() {
    // Arrange
    let mut fixture = setup();
    let src = id_of(&fixture, "src");
    fixture.handler.handle_event(AppEvent::SelectAllUnder(src));

    // Act
    let started = fixture.handler.handle_event(AppEvent::Export);
    let finished = fixture.handler.wait_for_export(WAIT);

    // Assert
    assert_eq!(started, vec![UiCommand::ShowExportStarted { file_count: 2 }]);
    match &finished[..] {
        [UiCommand::ShowExportSummary(summary)] => {
            assert_eq!(summary.output_file, "proj_context_20240101_000000.txt");
            assert_eq!(summary.summary_text, "- Files processed: 2\n");
        }
        other => panic!("Expected ShowExportSummary, got {other:?}"),
    }
    assert!(!fixture.handler.is_busy());
    assert!(fixture.handler.poll_background_work().is_empty());
}

#[test]
fn test_second_export_is_rejected_and_snapshot_is_isolated() {
    // Arrange
    let (exporter, release) = MockExporter::gated();
    let mut fixture = setup_with_exporter(exporter);
    fixture.handler.handle_event(AppEvent::Rescan);
    let main_rs = id_of(&fixture, "src/main.rs");
    let lib_rs = id_of(&fixture, "src/lib.rs");
    fixture.handler.handle_event(AppEvent::Toggle(main_rs));

    // Act
    fixture.handler.handle_event(AppEvent::Export);
    let second = fixture.handler.handle_event(AppEvent::Export);
    fixture.handler.handle_event(AppEvent::Toggle(lib_rs));
    assert!(fixture.handler.is_busy());
    release.send(()).expect("worker is waiting");
    let finished = fixture.handler.wait_for_export(WAIT);

    // Assert
    assert_eq!(messages(&second, MessageSeverity::Warning).len(), 1);
    assert!(matches!(finished[..], [UiCommand::ShowExportSummary(_)]));
    let calls = fixture.exporter.calls();
    assert_eq!(calls.len(), 1);
    let expected: BTreeSet<PathBuf> = [fixture.root.join("src/main.rs")].into_iter().collect();
    assert_eq!(calls[0], expected);
    assert_eq!(fixture.handler.selection().len(), 2);
}

#[test]
fn test_export_write_failure_is_reported_as_error() {
    let mut exporter = MockExporter::new();
    exporter.fail_with_write_error = true;
    let mut fixture = setup_with_exporter(exporter);
    fixture.handler.handle_event(AppEvent::Rescan);
    let readme = id_of(&fixture, "README.md");
    fixture.handler.handle_event(AppEvent::Toggle(readme));

    fixture.handler.handle_event(AppEvent::Export);
    let finished = fixture.handler.wait_for_export(WAIT);

    let errors = messages(&finished, MessageSeverity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("read-only"));
}

#[test]
fn test_quit_waits_for_running_export() {
    let mut fixture = setup();
    let readme = id_of(&fixture, "README.md");
    fixture.handler.handle_event(AppEvent::Toggle(readme));
    fixture.handler.handle_event(AppEvent::Export);

    let commands = fixture.handler.handle_event(AppEvent::Quit);

    assert!(matches!(
        commands[..],
        [UiCommand::ShowExportSummary(_), UiCommand::Quit]
    ));
    assert!(!fixture.handler.is_busy());
}

#[test]
fn test_help_event_returns_show_help() {
    let mut fixture = setup();
    assert_eq!(
        fixture.handler.handle_event(AppEvent::Help),
        vec![UiCommand::ShowHelp]
    );
}
