use git2::{Repository, Status, StatusOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Snapshot of a working copy, paths relative to the repository root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingTreeState {
    pub branch: Option<String>,
    /// Tracked files with staged or unstaged changes
    pub changed: Vec<String>,
    pub untracked: Vec<String>,
}

impl WorkingTreeState {
    pub fn is_clean(&self) -> bool {
        self.changed.is_empty() && self.untracked.is_empty()
    }

    /// Every path that differs from HEAD
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.changed
            .iter()
            .chain(self.untracked.iter())
            .map(String::as_str)
    }
}

/// Read branch and file status of the repository at `path`.
///
/// Untracked directories are expanded to individual files so callers can
/// compare the result against an exact changeset.
pub fn read_working_tree(path: &Path) -> Result<WorkingTreeState, git2::Error> {
    let repo = Repository::open(path)?;

    let branch = match repo.head() {
        Ok(head) if head.is_branch() => head.shorthand().map(str::to_string),
        _ => None,
    };

    let mut options = StatusOptions::new();
    options
        .include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);

    let mut state = WorkingTreeState {
        branch,
        ..Default::default()
    };

    for entry in repo.statuses(Some(&mut options))?.iter() {
        let Some(file) = entry.path() else {
            continue;
        };
        let status = entry.status();

        if status.contains(Status::WT_NEW) && !status.intersects(Status::INDEX_NEW) {
            state.untracked.push(file.to_string());
        } else if status.intersects(
            Status::INDEX_NEW
                | Status::INDEX_MODIFIED
                | Status::INDEX_DELETED
                | Status::INDEX_RENAMED
                | Status::INDEX_TYPECHANGE
                | Status::WT_MODIFIED
                | Status::WT_DELETED
                | Status::WT_RENAMED
                | Status::WT_TYPECHANGE,
        ) {
            state.changed.push(file.to_string());
        }
    }

    state.changed.sort();
    state.untracked.sort();
    Ok(state)
}
