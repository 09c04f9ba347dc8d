/*
 * Holds the state of the rendered selection tree: the mapping between the
 * numbers shown to the user and the paths they stand for, the active search
 * filter, and whether files or only directories are rendered.
 *
 * Ids are handed out in pre-order starting at 1 and are reassigned on every
 * render, so they are only meaningful relative to the most recent `ShowTree`.
 */
use crate::console_layer::{CheckState, TreeItemDescriptor, TreeItemId};
use crate::core::{FileNode, SelectionSet};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// Eligibility of each scanned file for selection, as decided by the classifier.
pub type TextStatusMap = HashMap<PathBuf, bool>;

#[derive(Debug)]
pub struct TreeViewState {
    tree_item_id_to_path: HashMap<TreeItemId, PathBuf>,
    next_tree_item_id_counter: u64,
    pub filter_text: Option<String>,
    pub show_files: bool,
    pub filter_no_match: bool,
}

// A node that survived filtering, with its surviving children.
struct VisibleNode<'a> {
    node: &'a FileNode,
    children: Vec<VisibleNode<'a>>,
}

impl Default for TreeViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeViewState {
    pub fn new() -> Self {
        TreeViewState {
            tree_item_id_to_path: HashMap::new(),
            next_tree_item_id_counter: 1,
            filter_text: None,
            show_files: true,
            filter_no_match: false,
        }
    }

    pub fn path_for_id(&self, id: TreeItemId) -> Option<&Path> {
        self.tree_item_id_to_path.get(&id).map(PathBuf::as_path)
    }

    #[cfg(test)]
    pub fn id_for_path(&self, path: &Path) -> Option<TreeItemId> {
        self.tree_item_id_to_path
            .iter()
            .find(|(_, p)| p.as_path() == path)
            .map(|(id, _)| *id)
    }

    /*
     * Sets the filter. Blank text is treated as no filter. Returns true if the
     * filter changed.
     */
    pub fn set_filter(&mut self, filter: Option<String>) -> bool {
        let normalized = filter
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        if normalized == self.filter_text {
            return false;
        }
        self.filter_text = normalized;
        true
    }

    /*
     * Renders `nodes` into descriptors, reassigning all ids. When a filter is
     * set, only nodes whose name contains the filter text (case-insensitive) are
     * kept, together with their ancestor directories.
     */
    pub fn build_descriptors(
        &mut self,
        nodes: &[FileNode],
        selection: &SelectionSet,
        text_status: &TextStatusMap,
    ) -> Vec<TreeItemDescriptor> {
        self.tree_item_id_to_path.clear();
        self.next_tree_item_id_counter = 1;

        let filter_lower = self.filter_text.as_ref().map(|f| f.to_lowercase());
        let visible = Self::collect_visible(nodes, filter_lower.as_deref(), self.show_files);
        self.filter_no_match = filter_lower.is_some() && visible.is_empty();
        log::debug!(
            "TreeViewState: Rendering {} top-level nodes (filter: {:?}, show_files: {}).",
            visible.len(),
            self.filter_text,
            self.show_files
        );
        self.number_visible(&visible, selection, text_status)
    }

    fn collect_visible<'a>(
        nodes: &'a [FileNode],
        filter_lower: Option<&str>,
        show_files: bool,
    ) -> Vec<VisibleNode<'a>> {
        let mut visible = Vec::new();
        for node in nodes {
            if !node.is_dir && !show_files {
                continue;
            }
            let children = Self::collect_visible(&node.children, filter_lower, show_files);
            let name_matches =
                filter_lower.is_none_or(|f| node.name.to_lowercase().contains(f));
            // Without a filter, every directory is shown even if empty.
            if name_matches || !children.is_empty() {
                visible.push(VisibleNode { node, children });
            }
        }
        visible
    }

    fn number_visible(
        &mut self,
        visible: &[VisibleNode<'_>],
        selection: &SelectionSet,
        text_status: &TextStatusMap,
    ) -> Vec<TreeItemDescriptor> {
        let mut descriptors = Vec::new();
        for entry in visible {
            let item_id = TreeItemId(self.next_tree_item_id_counter);
            self.next_tree_item_id_counter += 1;
            self.tree_item_id_to_path
                .insert(item_id, entry.node.path.clone());

            let children = self.number_visible(&entry.children, selection, text_status);
            descriptors.push(TreeItemDescriptor {
                id: item_id,
                text: entry.node.name.clone(),
                is_folder: entry.node.is_dir,
                is_text: entry.node.is_dir || is_eligible(text_status, &entry.node.path),
                state: check_state(entry.node, selection, text_status),
                children,
            });
        }
        descriptors
    }
}

pub fn is_eligible(text_status: &TextStatusMap, path: &Path) -> bool {
    text_status.get(path).copied().unwrap_or(false)
}

/*
 * Files are checked when selected. Directories are checked when every eligible
 * file below them is selected, partial when only some are.
 */
pub fn check_state(node: &FileNode, selection: &SelectionSet, text_status: &TextStatusMap) -> CheckState {
    if !node.is_dir {
        return if selection.contains(&node.path) {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        };
    }
    let mut eligible = 0;
    let mut selected = 0;
    node.for_each_file(&mut |file| {
        if is_eligible(text_status, &file.path) {
            eligible += 1;
            if selection.contains(&file.path) {
                selected += 1;
            }
        }
    });
    match selected {
        0 => CheckState::Unchecked,
        n if n == eligible => CheckState::Checked,
        _ => CheckState::Partial,
    }
}
