use super::preview::SelectionPreview;
use super::tree_view_state::{TextStatusMap, TreeViewState, is_eligible};
use crate::console_layer::{
    AppEvent, ExportSummary, MessageSeverity, TreeItemId, UiCommand, UiEventHandler,
};
use crate::core::path_utils::display_path;
use crate::core::{
    ExportError, ExportResult, ExporterOperations, FileNode, FileSystemScannerOperations,
    SelectionSet, SessionConfig, SkippedDirectory, TextClassifierOperations, compute_stats,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
#[cfg(test)]
use std::sync::mpsc::RecvTimeoutError;
#[cfg(test)]
use std::time::Duration;

type ExportOutcome = Result<ExportResult, ExportError>;

// Classifier answering from the results recorded at scan time.
struct ScannedTextStatus<'a> {
    text_status: &'a TextStatusMap,
}

impl TextClassifierOperations for ScannedTextStatus<'_> {
    fn is_text_file(&self, path: &Path) -> io::Result<bool> {
        Ok(is_eligible(self.text_status, path))
    }
}

/*
 * Owns the interactive session: the scanned tree, the classification of every
 * scanned file, the selection, and the rendered-tree state. It processes
 * `AppEvent`s from the console and answers with `UiCommand`s. Every event that
 * changes the selection answers with a refreshed tree and an
 * `UpdateSelectionCount`, which is how dependent views stay in sync.
 *
 * Exports run on a worker thread over a snapshot of the selection; only one
 * export can be in flight, and its result is collected by
 * `poll_background_work`.
 */
pub struct SessionHandler {
    pub(crate) config: SessionConfig,
    pub(crate) selection: SelectionSet,
    pub(crate) file_nodes_cache: Vec<FileNode>,
    pub(crate) skipped_directories: Vec<SkippedDirectory>,
    pub(crate) text_status: TextStatusMap,
    pub(crate) tree_view: TreeViewState,
    file_system_scanner: Arc<dyn FileSystemScannerOperations>,
    text_classifier: Arc<dyn TextClassifierOperations>,
    exporter: Arc<dyn ExporterOperations>,
    export_results: Option<Receiver<ExportOutcome>>,
}

impl SessionHandler {
    pub fn new(
        config: SessionConfig,
        file_system_scanner: Arc<dyn FileSystemScannerOperations>,
        text_classifier: Arc<dyn TextClassifierOperations>,
        exporter: Arc<dyn ExporterOperations>,
    ) -> Self {
        SessionHandler {
            config,
            selection: SelectionSet::new(),
            file_nodes_cache: Vec::new(),
            skipped_directories: Vec::new(),
            text_status: TextStatusMap::new(),
            tree_view: TreeViewState::new(),
            file_system_scanner,
            text_classifier,
            exporter,
            export_results: None,
        }
    }

    #[cfg(test)]
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /*
     * Blocks until the running export (if any) finishes or `timeout` elapses,
     * and returns the commands reporting its outcome.
     */
    #[cfg(test)]
    pub fn wait_for_export(&mut self, timeout: Duration) -> Vec<UiCommand> {
        let Some(receiver) = self.export_results.as_ref() else {
            return Vec::new();
        };
        match receiver.recv_timeout(timeout) {
            Ok(outcome) => {
                self.export_results = None;
                self.export_outcome_commands(outcome)
            }
            Err(RecvTimeoutError::Timeout) => Vec::new(),
            Err(RecvTimeoutError::Disconnected) => {
                self.export_results = None;
                vec![Self::worker_lost_message()]
            }
        }
    }

    fn message(severity: MessageSeverity, text: impl Into<String>) -> UiCommand {
        UiCommand::ShowMessage {
            severity,
            text: text.into(),
        }
    }

    fn worker_lost_message() -> UiCommand {
        log::error!("SessionHandler: Export worker ended without reporting a result.");
        Self::message(
            MessageSeverity::Error,
            "The export stopped unexpectedly without reporting a result.",
        )
    }

    fn display(&self, path: &Path) -> String {
        display_path(path, Some(&self.config.root_path))
    }

    fn tree_commands(&mut self) -> Vec<UiCommand> {
        let items = self.tree_view.build_descriptors(
            &self.file_nodes_cache,
            &self.selection,
            &self.text_status,
        );
        vec![
            UiCommand::ShowTree {
                items,
                filter_text: self.tree_view.filter_text.clone(),
                filter_no_match: self.tree_view.filter_no_match,
            },
            UiCommand::UpdateSelectionCount {
                selected: self.selection.len(),
            },
        ]
    }

    fn classify_scanned_files(&mut self) {
        self.text_status.clear();
        let classifier = Arc::clone(&self.text_classifier);
        for node in &self.file_nodes_cache {
            node.for_each_file(&mut |file| {
                let is_text = match classifier.is_text_file(&file.path) {
                    Ok(is_text) => is_text,
                    Err(e) => {
                        log::warn!(
                            "SessionHandler: Could not classify {:?}, it will not be selectable: {e}",
                            file.path
                        );
                        false
                    }
                };
                self.text_status.insert(file.path.clone(), is_text);
            });
        }
    }

    fn rescan(&mut self) -> Vec<UiCommand> {
        log::debug!("SessionHandler: Scanning {:?}", self.config.root_path);
        let mut commands = Vec::new();
        match self.file_system_scanner.scan_directory(&self.config) {
            Ok(outcome) => {
                self.file_nodes_cache = outcome.nodes;
                self.skipped_directories = outcome.skipped_directories;
                self.classify_scanned_files();

                // Files that disappeared or stopped being text are dropped from the selection.
                let stale: Vec<PathBuf> = self
                    .selection
                    .all()
                    .into_iter()
                    .filter(|p| !is_eligible(&self.text_status, p))
                    .cloned()
                    .collect();
                for path in &stale {
                    self.selection.remove(path);
                }
                log::info!(
                    "SessionHandler: Scanned {} files, {} stale selections dropped.",
                    self.text_status.len(),
                    stale.len()
                );

                commands.extend(self.tree_commands());
                if !stale.is_empty() {
                    commands.push(Self::message(
                        MessageSeverity::Warning,
                        format!(
                            "{} selected files are no longer available and were deselected.",
                            stale.len()
                        ),
                    ));
                }
                if !self.skipped_directories.is_empty() {
                    let listed: Vec<String> = self
                        .skipped_directories
                        .iter()
                        .map(|s| format!("- {} ({})", self.display(&s.path), s.reason))
                        .collect();
                    commands.push(Self::message(
                        MessageSeverity::Warning,
                        format!(
                            "Skipped {} unreadable directories:\n{}",
                            self.skipped_directories.len(),
                            listed.join("\n")
                        ),
                    ));
                }
            }
            Err(e) => {
                log::error!(
                    "SessionHandler: Failed to scan directory {:?}: {e}",
                    self.config.root_path
                );
                self.file_nodes_cache.clear();
                self.skipped_directories.clear();
                self.text_status.clear();
                commands.extend(self.tree_commands());
                commands.push(Self::message(
                    MessageSeverity::Error,
                    format!("Could not scan {}: {e}", self.config.root_path.display()),
                ));
            }
        }
        commands
    }

    /*
     * Resolves a tree item number from the last rendering to its node. On
     * failure the returned command explains why to the user.
     */
    fn resolve_item(&self, item_id: TreeItemId) -> Result<&FileNode, UiCommand> {
        let Some(path) = self.tree_view.path_for_id(item_id) else {
            log::debug!("SessionHandler: Unknown tree item {item_id:?}");
            return Err(Self::message(
                MessageSeverity::Warning,
                format!("There is no item number {item_id} in the current tree."),
            ));
        };
        FileNode::find(&self.file_nodes_cache, path).ok_or_else(|| {
            log::error!("SessionHandler: Tree item {item_id:?} maps to unknown path {path:?}");
            Self::message(
                MessageSeverity::Error,
                format!("Item {item_id} is no longer part of the scanned tree."),
            )
        })
    }

    fn select_all_under(&mut self, item_id: TreeItemId) -> Vec<UiCommand> {
        let node = match self.resolve_item(item_id) {
            Ok(node) => node.clone(),
            Err(cmd) => return vec![cmd],
        };
        let classifier = ScannedTextStatus {
            text_status: &self.text_status,
        };
        let added = self.selection.select_all_under(&node, &classifier);
        let mut commands = self.tree_commands();
        commands.push(Self::message(
            MessageSeverity::Information,
            format!("Selected {added} files under {}.", self.display(&node.path)),
        ));
        commands
    }

    fn deselect_all_under(&mut self, item_id: TreeItemId) -> Vec<UiCommand> {
        let node = match self.resolve_item(item_id) {
            Ok(node) => node.clone(),
            Err(cmd) => return vec![cmd],
        };
        let removed = self.selection.deselect_all_under(&node);
        let mut commands = self.tree_commands();
        commands.push(Self::message(
            MessageSeverity::Information,
            format!("Deselected {removed} files under {}.", self.display(&node.path)),
        ));
        commands
    }

    /*
     * Files flip their membership. Directories select every eligible file below
     * them, or deselect them all if all are already selected.
     */
    fn toggle(&mut self, item_id: TreeItemId) -> Vec<UiCommand> {
        let node = match self.resolve_item(item_id) {
            Ok(node) => node.clone(),
            Err(cmd) => return vec![cmd],
        };
        if node.is_dir {
            let mut all_selected = true;
            node.for_each_file(&mut |file| {
                if is_eligible(&self.text_status, &file.path) && !self.selection.contains(&file.path) {
                    all_selected = false;
                }
            });
            return if all_selected {
                self.deselect_all_under(item_id)
            } else {
                self.select_all_under(item_id)
            };
        }
        if !is_eligible(&self.text_status, &node.path) {
            return vec![Self::message(
                MessageSeverity::Warning,
                format!(
                    "{} is not a text file and cannot be selected.",
                    self.display(&node.path)
                ),
            )];
        }
        let now_selected = self.selection.toggle(&node.path);
        log::debug!(
            "SessionHandler: {:?} is now {}",
            node.path,
            if now_selected { "selected" } else { "deselected" }
        );
        self.tree_commands()
    }

    fn preview(&self) -> Vec<UiCommand> {
        if self.selection.is_empty() {
            return vec![Self::message(
                MessageSeverity::Information,
                "No files selected.",
            )];
        }
        let report = compute_stats(&self.selection.snapshot());
        vec![UiCommand::ShowPreview(SelectionPreview::from_report(
            &report,
            &self.config.root_path,
        ))]
    }

    fn start_export(&mut self) -> Vec<UiCommand> {
        if self.export_results.is_some() {
            log::warn!("SessionHandler: Export requested while another export is running.");
            return vec![Self::message(
                MessageSeverity::Warning,
                "An export is already running. Wait for it to finish.",
            )];
        }
        if self.selection.is_empty() {
            log::info!("SessionHandler: Export requested with an empty selection.");
            return vec![Self::message(
                MessageSeverity::Warning,
                ExportError::NoFilesSelected.to_string(),
            )];
        }

        let snapshot = self.selection.snapshot();
        let file_count = snapshot.len();
        let exporter = Arc::clone(&self.exporter);
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let outcome = exporter.export(&snapshot);
            if sender.send(outcome).is_err() {
                log::warn!("SessionHandler: Export finished after the session ended.");
            }
        });
        self.export_results = Some(receiver);
        log::info!("SessionHandler: Export of {file_count} files started.");
        vec![UiCommand::ShowExportStarted { file_count }]
    }

    fn export_outcome_commands(&self, outcome: ExportOutcome) -> Vec<UiCommand> {
        match outcome {
            Ok(result) => {
                let output_file = result
                    .output_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| result.output_path.display().to_string());
                vec![UiCommand::ShowExportSummary(ExportSummary {
                    output_file,
                    summary_text: result.summary_text,
                })]
            }
            Err(ExportError::NoFilesSelected) => vec![Self::message(
                MessageSeverity::Warning,
                ExportError::NoFilesSelected.to_string(),
            )],
            Err(e) => {
                log::error!("SessionHandler: Export failed: {e}");
                vec![Self::message(MessageSeverity::Error, e.to_string())]
            }
        }
    }
}

impl UiEventHandler for SessionHandler {
    fn handle_event(&mut self, event: AppEvent) -> Vec<UiCommand> {
        log::trace!("SessionHandler: Handling {event:?}");
        match event {
            AppEvent::Rescan => self.rescan(),
            AppEvent::ShowTree => self.tree_commands(),
            AppEvent::Toggle(item_id) => self.toggle(item_id),
            AppEvent::SelectAllUnder(item_id) => self.select_all_under(item_id),
            AppEvent::DeselectAllUnder(item_id) => self.deselect_all_under(item_id),
            AppEvent::ClearSelection => {
                self.selection.clear();
                self.tree_commands()
            }
            AppEvent::Preview => self.preview(),
            AppEvent::Export => self.start_export(),
            AppEvent::Filter(filter) => {
                if !self.tree_view.set_filter(filter) {
                    log::debug!("SessionHandler: Filter unchanged.");
                }
                self.tree_commands()
            }
            AppEvent::ToggleShowFiles => {
                self.tree_view.show_files = !self.tree_view.show_files;
                self.tree_commands()
            }
            AppEvent::Help => vec![UiCommand::ShowHelp],
            AppEvent::Quit => {
                let mut commands = Vec::new();
                // A running export is allowed to finish before quitting.
                if let Some(receiver) = self.export_results.take() {
                    log::info!("SessionHandler: Waiting for the running export before quitting.");
                    match receiver.recv() {
                        Ok(outcome) => commands.extend(self.export_outcome_commands(outcome)),
                        Err(_) => commands.push(Self::worker_lost_message()),
                    }
                }
                commands.push(UiCommand::Quit);
                commands
            }
        }
    }

    fn poll_background_work(&mut self) -> Vec<UiCommand> {
        let Some(receiver) = self.export_results.as_ref() else {
            return Vec::new();
        };
        match receiver.try_recv() {
            Ok(outcome) => {
                self.export_results = None;
                self.export_outcome_commands(outcome)
            }
            Err(TryRecvError::Empty) => Vec::new(),
            Err(TryRecvError::Disconnected) => {
                self.export_results = None;
                vec![Self::worker_lost_message()]
            }
        }
    }

    fn is_busy(&self) -> bool {
        self.export_results.is_some()
    }

    fn on_quit(&mut self) {
        log::debug!(
            "SessionHandler: Session ending with {} files selected.",
            self.selection.len()
        );
    }
}
