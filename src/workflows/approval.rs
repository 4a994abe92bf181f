use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis::AnalysisFindings;
use crate::git::WorkingTreeState;

/// Outcome of the human review at the suspension point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject { reason: String },
}

/// What a reviewer sees before deciding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub run_id: String,
    pub repository_url: String,
    pub clone_path: Option<PathBuf>,
    pub findings: AnalysisFindings,
    pub expected_changes: Vec<String>,
    /// `None` when the working tree could not be read
    pub working_tree: Option<WorkingTreeState>,
}

/// Source of approval decisions for in-process runs
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn decide(&self, request: &ApprovalRequest) -> ApprovalDecision;
}

/// Approves every request without asking
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalGate for AutoApprove {
    async fn decide(&self, _request: &ApprovalRequest) -> ApprovalDecision {
        ApprovalDecision::Approve
    }
}
