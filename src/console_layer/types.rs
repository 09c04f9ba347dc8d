/*
 * This module defines the data types exchanged between the application logic and
 * the console layer: identifiers for tree items, descriptors of the rendered
 * tree, platform-agnostic events (`AppEvent`) produced from user input, and the
 * commands (`UiCommand`) the logic sends back for rendering. It also defines the
 * `UiEventHandler` trait that the application logic implements.
 */
use crate::app_logic::preview::SelectionPreview;
use std::fmt;

// An identifier for an item in the rendered tree. Assigned by the application
// logic each time the tree is rendered; the user refers to items by this number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeItemId(pub u64);

impl fmt::Display for TreeItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Visual check state of a tree item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Checked,
    Unchecked,
    // Directory with some, but not all, of its eligible files selected.
    Partial,
}

/*
 * Describes a single item in the rendered tree. `is_text` is false for files the
 * classifier rejected (or could not read); those are shown but not selectable.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct TreeItemDescriptor {
    pub id: TreeItemId,
    pub text: String,
    pub is_folder: bool,
    pub is_text: bool,
    pub state: CheckState,
    pub children: Vec<TreeItemDescriptor>,
}

// Severity of a message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Information,
    Warning,
    Error,
}

/*
 * Events from the console to the application logic, one per user command.
 * Events that refer to tree items use the ids from the most recent `ShowTree`.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Rescan,
    ShowTree,
    Toggle(TreeItemId),
    SelectAllUnder(TreeItemId),
    DeselectAllUnder(TreeItemId),
    ClearSelection,
    Preview,
    Export,
    // `None` removes the filter.
    Filter(Option<String>),
    ToggleShowFiles,
    Help,
    Quit,
}

// Summary of a finished export, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub output_file: String,
    pub summary_text: String,
}

// Commands from the application logic to the console layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    ShowTree {
        items: Vec<TreeItemDescriptor>,
        filter_text: Option<String>,
        filter_no_match: bool,
    },
    // Sent whenever the selection changes so the prompt can show the current count.
    UpdateSelectionCount {
        selected: usize,
    },
    ShowPreview(SelectionPreview),
    ShowExportStarted {
        file_count: usize,
    },
    ShowExportSummary(ExportSummary),
    ShowHelp,
    ShowMessage {
        severity: MessageSeverity,
        text: String,
    },
    Quit,
}

/*
 * Implemented by the application logic. The console layer forwards every
 * parsed `AppEvent` and executes the returned commands in order. Work finished
 * in the background is collected through `poll_background_work`.
 */
pub trait UiEventHandler {
    fn handle_event(&mut self, event: AppEvent) -> Vec<UiCommand>;

    fn poll_background_work(&mut self) -> Vec<UiCommand>;

    fn is_busy(&self) -> bool;

    fn on_quit(&mut self) {}
}
