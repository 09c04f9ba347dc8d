/*
 * The set of files currently chosen for export.
 * Membership is by path and iteration is always in lexicographic order, which is
 * also the order exports process files in. All operations are idempotent and
 * report whether they changed the set so the caller can decide whether dependent
 * views need a refresh.
 */
use super::file_classifier::TextClassifierOperations;
use super::file_node::FileNode;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/*
 * Orders `files` by the full path string. `PathBuf`'s own ordering compares
 * component by component, which would put `foo/bar.py` before `foo.py`.
 */
pub fn lexicographic_order(files: &BTreeSet<PathBuf>) -> Vec<&PathBuf> {
    let mut ordered: Vec<&PathBuf> = files.iter().collect();
    ordered.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    ordered
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    paths: BTreeSet<PathBuf>,
}

impl SelectionSet {
    pub fn new() -> Self {
        SelectionSet::default()
    }

    pub fn add(&mut self, path: &Path) -> bool {
        self.paths.insert(path.to_path_buf())
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.paths.remove(path)
    }

    // Returns true if `path` is selected after the call.
    pub fn toggle(&mut self, path: &Path) -> bool {
        if self.paths.remove(path) {
            false
        } else {
            self.paths.insert(path.to_path_buf());
            true
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    // Members in lexicographic order of their full path string.
    pub fn all(&self) -> Vec<&PathBuf> {
        lexicographic_order(&self.paths)
    }

    /*
     * Immutable copy handed to statistics and export so that later toggles
     * cannot affect an operation already in flight.
     */
    pub fn snapshot(&self) -> BTreeSet<PathBuf> {
        self.paths.clone()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    /*
     * Adds every text file at or below `node`. Directories and non-text files are
     * skipped silently; files whose classification fails are skipped with a
     * warning. Returns the number of paths newly added.
     */
    pub fn select_all_under(
        &mut self,
        node: &FileNode,
        classifier: &dyn TextClassifierOperations,
    ) -> usize {
        let mut added = 0;
        node.for_each_file(&mut |file| match classifier.is_text_file(&file.path) {
            Ok(true) => {
                if self.paths.insert(file.path.clone()) {
                    added += 1;
                }
            }
            Ok(false) => {}
            Err(e) => {
                log::warn!("SelectionSet: Skipping {:?}, could not classify: {e}", file.path);
            }
        });
        log::debug!("SelectionSet: Added {added} files under {:?}", node.path);
        added
    }

    // Returns the number of paths removed.
    pub fn deselect_all_under(&mut self, node: &FileNode) -> usize {
        let before = self.paths.len();
        if node.is_dir {
            self.paths.retain(|p| !p.starts_with(&node.path));
        } else {
            self.paths.remove(&node.path);
        }
        before - self.paths.len()
    }
}
