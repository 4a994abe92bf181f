use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use super::error::MigrationError;
use crate::analysis::AnalysisFindings;

/// Position of a run in the migration sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Pending,
    Validated,
    Cloning,
    Analyzing,
    Updating,
    AwaitingApproval,
    Validating,
    Pushing,
    Success,
    Error,
}

impl MigrationStatus {
    /// Forward order of the non-error states
    pub const SEQUENCE: [MigrationStatus; 9] = [
        MigrationStatus::Pending,
        MigrationStatus::Validated,
        MigrationStatus::Cloning,
        MigrationStatus::Analyzing,
        MigrationStatus::Updating,
        MigrationStatus::AwaitingApproval,
        MigrationStatus::Validating,
        MigrationStatus::Pushing,
        MigrationStatus::Success,
    ];

    fn ordinal(self) -> Option<usize> {
        Self::SEQUENCE.iter().position(|s| *s == self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, MigrationStatus::Success | MigrationStatus::Error)
    }

    /// Only the immediate successor in [`SEQUENCE`](Self::SEQUENCE), or `error`
    pub fn can_advance_to(self, next: MigrationStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.ordinal(), next.ordinal()) {
            (_, None) => true,
            (Some(current), Some(next)) => next == current + 1,
            (None, Some(_)) => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MigrationStatus::Pending => "pending",
            MigrationStatus::Validated => "validated",
            MigrationStatus::Cloning => "cloning",
            MigrationStatus::Analyzing => "analyzing",
            MigrationStatus::Updating => "updating",
            MigrationStatus::AwaitingApproval => "awaiting_approval",
            MigrationStatus::Validating => "validating",
            MigrationStatus::Pushing => "pushing",
            MigrationStatus::Success => "success",
            MigrationStatus::Error => "error",
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationMessage {
    pub timestamp: DateTime<Utc>,
    pub level: MessageLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransitionRecord {
    pub from: MigrationStatus,
    pub to: MigrationStatus,
    pub timestamp: DateTime<Utc>,
}

/// The single record threaded through every step of a migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationState {
    pub run_id: String,
    pub repository_url: String,
    pub repo_path: Option<PathBuf>,
    pub status: MigrationStatus,
    /// First failure; never cleared once set
    pub error: Option<String>,
    pub messages: Vec<MigrationMessage>,
    #[serde(default)]
    pub findings: AnalysisFindings,
    /// Repository-relative paths written by the update step
    #[serde(default)]
    pub workflow_changes: Vec<String>,
    pub branch_name: Option<String>,
    #[serde(default)]
    pub transitions: Vec<StateTransitionRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MigrationState {
    pub fn new(repository_url: impl Into<String>) -> Self {
        Self::with_run_id(Uuid::new_v4().to_string(), repository_url)
    }

    pub fn with_run_id(run_id: impl Into<String>, repository_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            repository_url: repository_url.into(),
            repo_path: None,
            status: MigrationStatus::Pending,
            error: None,
            messages: Vec::new(),
            findings: AnalysisFindings::default(),
            workflow_changes: Vec::new(),
            branch_name: None,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push_message(&mut self, level: MessageLevel, text: impl Into<String>) {
        let now = Utc::now();
        self.messages.push(MigrationMessage {
            timestamp: now,
            level,
            text: text.into(),
        });
        self.updated_at = now;
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push_message(MessageLevel::Info, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.push_message(MessageLevel::Warning, text);
    }

    /// Move to `next`, refusing regressions and moves out of a terminal status
    pub fn advance(&mut self, next: MigrationStatus) -> Result<(), MigrationError> {
        if !self.status.can_advance_to(next) {
            return Err(MigrationError::UnexpectedError(format!(
                "illegal status transition {} -> {}",
                self.status, next
            )));
        }

        let record = StateTransitionRecord {
            from: self.status,
            to: next,
            timestamp: Utc::now(),
        };
        info!(
            run_id = %self.run_id,
            from_state = %record.from,
            to_state = %record.to,
            "Migration state transition"
        );
        self.updated_at = record.timestamp;
        self.transitions.push(record);
        self.status = next;
        Ok(())
    }

    /// Record `err` and move to `error`. The first recorded error wins.
    pub fn fail(&mut self, err: &MigrationError) {
        let text = err.to_string();
        self.push_message(MessageLevel::Error, text.clone());
        if self.error.is_none() {
            self.error = Some(text);
        }
        if self.status != MigrationStatus::Error {
            let record = StateTransitionRecord {
                from: self.status,
                to: MigrationStatus::Error,
                timestamp: Utc::now(),
            };
            self.transitions.push(record);
            self.status = MigrationStatus::Error;
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Terminal summary handed back to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResult {
    pub status: MigrationStatus,
    pub clone_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl From<&MigrationState> for MigrationResult {
    fn from(state: &MigrationState) -> Self {
        Self {
            status: state.status,
            clone_path: state.repo_path.clone(),
            error: state.error.clone(),
        }
    }
}
