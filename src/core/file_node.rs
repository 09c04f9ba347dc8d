use std::path::{Path, PathBuf};

/*
 * A node of the scanned project tree shown to the user for selection.
 * Selection state lives in `SelectionSet`, keyed by path, not in the tree.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct FileNode {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    pub children: Vec<FileNode>, // Only populated if is_dir is true
}

impl FileNode {
    pub fn new(path: PathBuf, name: String, is_dir: bool) -> Self {
        FileNode {
            path,
            name,
            is_dir,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    #[cfg(test)]
    pub fn new_dir(path: PathBuf, name: &str, children: Vec<FileNode>) -> Self {
        FileNode {
            path,
            name: name.to_string(),
            is_dir: true,
            children,
        }
    }

    /*
     * Calls `visit` for every file (not directory) at or below this node, in
     * tree order.
     */
    pub fn for_each_file<F: FnMut(&FileNode)>(&self, visit: &mut F) {
        if self.is_dir {
            for child in &self.children {
                child.for_each_file(visit);
            }
        } else {
            visit(self);
        }
    }

    pub fn find<'a>(nodes: &'a [FileNode], path_to_find: &Path) -> Option<&'a FileNode> {
        for node in nodes {
            if node.path == path_to_find {
                return Some(node);
            }
            if node.is_dir && path_to_find.starts_with(&node.path) {
                if let Some(found) = Self::find(&node.children, path_to_find) {
                    return Some(found);
                }
            }
        }
        None
    }

    #[cfg(test)]
    pub fn count_files(nodes: &[FileNode]) -> usize {
        let mut count = 0;
        for node in nodes {
            node.for_each_file(&mut |_| count += 1);
        }
        count
    }
}
