//! Git working tree inspection
//!
//! Reads repository state through libgit2 bindings instead of parsing
//! `git status` output. Network operations (clone, push) stay on the git
//! binary in `crate::external::git` so the user's credential helpers apply.

pub mod working_tree;

pub use working_tree::{read_working_tree, WorkingTreeState};
