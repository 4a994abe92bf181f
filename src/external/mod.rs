//! External tool abstractions
//!
//! Trait-based wrappers around the `git` binary and process execution,
//! enabling testable workflows through dependency injection and mock
//! implementations.

pub mod command;
pub mod git;

pub use command::{CommandError, CommandExecutor, CommandOptions, CommandOutput, ProcessCommandExecutor};
pub use git::{CommitRequest, GitCli, GitError, GitOperations};
