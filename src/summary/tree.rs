use crate::domain::change::FileChange;
use crate::domain::diff::{DiffNode, FileDiff};

/// Groups a flat change list into a directory tree of diff placeholders.
///
/// Files keep their input order within a directory. Duplicate paths are not
/// rejected; each occurrence becomes its own entry.
pub fn build_tree(changes: &[FileChange]) -> DiffNode {
    let mut root = DiffNode::root();
    for change in changes {
        let segments = change.directory_segments();
        root.descend_or_create(&segments)
            .diffs
            .push(FileDiff::placeholder(change.clone()));
    }
    root
}
