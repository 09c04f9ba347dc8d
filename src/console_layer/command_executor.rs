/*
 * This module executes `UiCommand`s by rendering them as text onto any
 * `io::Write`. `ConsoleView` keeps the small amount of presentation state the
 * console needs between commands, which is the last reported selection count
 * shown in the prompt.
 */
use super::input::HELP_TEXT;
use super::types::{CheckState, MessageSeverity, TreeItemDescriptor, UiCommand};
use crate::app_logic::preview::SelectionPreview;
use crate::core::path_utils::format_size;
use std::io::{self, Write};

const INDENT: &str = "  ";

#[derive(Debug, Default)]
pub struct ConsoleView {
    selected: usize,
}

impl ConsoleView {
    pub fn new() -> Self {
        ConsoleView::default()
    }

    pub fn prompt(&self) -> String {
        format!("[{} selected]> ", self.selected)
    }

    pub fn execute_command<W: Write>(&mut self, out: &mut W, command: &UiCommand) -> io::Result<()> {
        match command {
            UiCommand::ShowTree {
                items,
                filter_text,
                filter_no_match,
            } => render_tree(out, items, filter_text.as_deref(), *filter_no_match),
            UiCommand::UpdateSelectionCount { selected } => {
                self.selected = *selected;
                Ok(())
            }
            UiCommand::ShowPreview(preview) => render_preview(out, preview),
            UiCommand::ShowExportStarted { file_count } => {
                writeln!(out, "Exporting {file_count} files in the background...")
            }
            UiCommand::ShowExportSummary(summary) => {
                writeln!(out, "\nExport finished: {}", summary.output_file)?;
                write!(out, "{}", summary.summary_text)
            }
            UiCommand::ShowHelp => write!(out, "{HELP_TEXT}"),
            UiCommand::ShowMessage { severity, text } => match severity {
                MessageSeverity::Information => writeln!(out, "{text}"),
                MessageSeverity::Warning => writeln!(out, "Warning: {text}"),
                MessageSeverity::Error => writeln!(out, "Error: {text}"),
            },
            UiCommand::Quit => Ok(()),
        }
    }
}

fn marker(item: &TreeItemDescriptor) -> &'static str {
    if !item.is_text {
        return "[-]";
    }
    match item.state {
        CheckState::Checked => "[x]",
        CheckState::Unchecked => "[ ]",
        CheckState::Partial => "[~]",
    }
}

fn render_items<W: Write>(out: &mut W, items: &[TreeItemDescriptor], depth: usize) -> io::Result<()> {
    for item in items {
        let suffix = if item.is_folder { "/" } else { "" };
        writeln!(
            out,
            "{:>5} {} {}{}{}",
            item.id.0,
            marker(item),
            INDENT.repeat(depth),
            item.text,
            suffix
        )?;
        render_items(out, &item.children, depth + 1)?;
    }
    Ok(())
}

pub fn render_tree<W: Write>(
    out: &mut W,
    items: &[TreeItemDescriptor],
    filter_text: Option<&str>,
    filter_no_match: bool,
) -> io::Result<()> {
    if let Some(filter) = filter_text {
        if filter_no_match {
            return writeln!(out, "No entries match '{filter}'.");
        }
        writeln!(out, "Filter: '{filter}'")?;
    }
    if items.is_empty() {
        return writeln!(out, "(nothing to show)");
    }
    render_items(out, items, 0)
}

pub fn render_preview<W: Write>(out: &mut W, preview: &SelectionPreview) -> io::Result<()> {
    for entry in &preview.entries {
        writeln!(
            out,
            "{}: {} lines, {} characters, {}",
            entry.display_path,
            entry.stats.lines,
            entry.stats.characters,
            format_size(entry.stats.size_bytes)
        )?;
    }
    writeln!(
        out,
        "Total: {} files, {} lines, {} characters, {}",
        preview.totals.files,
        preview.totals.lines,
        preview.totals.characters,
        format_size(preview.totals.size_bytes)
    )?;
    if !preview.unreadable.is_empty() {
        writeln!(out, "Unreadable:")?;
        for entry in &preview.unreadable {
            writeln!(out, "- {entry}")?;
        }
    }
    Ok(())
}
