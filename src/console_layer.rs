/*
 * The console layer: a line-oriented terminal front end. It turns typed
 * commands into `AppEvent`s, hands them to the application logic and renders
 * the `UiCommand`s it gets back. It holds no session state of its own beyond
 * what is needed for rendering (the last known selection count).
 */
pub mod app;
pub mod command_executor;
pub mod error;
pub mod input;
pub mod types;

pub use app::run_console;
pub use types::{
    AppEvent, CheckState, ExportSummary, MessageSeverity, TreeItemDescriptor, TreeItemId,
    UiCommand, UiEventHandler,
};
