use std::collections::BTreeMap;

use crate::domain::diff::{DiffNode, DirectoryDiff};

/// Flattens the tree into one group per directory that directly holds files.
///
/// The groups come back ordered by path; callers that care about order sort them.
pub fn group_by_directory(root: DiffNode) -> Vec<DirectoryDiff> {
    let mut groups: BTreeMap<String, DirectoryDiff> = BTreeMap::new();
    for file in root.into_files() {
        let directory = file.directory();
        groups
            .entry(directory.clone())
            .or_insert_with(|| DirectoryDiff::new(directory))
            .push(file);
    }
    groups.into_values().collect()
}
