//! Migration workflow orchestration
//!
//! A run moves strictly forward through
//! `pending -> validated -> cloning -> analyzing -> updating ->
//! awaiting_approval -> validating -> pushing -> success`, or jumps to
//! `error`. The only suspension point is `awaiting_approval`.

pub mod approval;
pub mod error;
pub mod migration;
pub mod state;

pub use approval::{ApprovalDecision, ApprovalGate, ApprovalRequest, AutoApprove};
pub use error::MigrationError;
pub use migration::{MigrationWorkflow, WorkflowSettings};
pub use state::{
    MessageLevel, MigrationMessage, MigrationResult, MigrationState, MigrationStatus,
    StateTransitionRecord,
};
