// ci-migrator library - CI migration agent
// This exposes the core components for testing and integration

pub mod analysis;
pub mod cli;
pub mod config;
pub mod external;
pub mod git;
pub mod repository;
pub mod store;
pub mod telemetry;
pub mod templates;
pub mod workflows;

// Re-export key types for easy access
pub use analysis::{AnalysisFindings, RepositoryAnalyzer, ViaCbsAnalyzer};
pub use config::{config, init_config, MigratorConfig};
pub use external::{CommandExecutor, GitCli, GitError, GitOperations, ProcessCommandExecutor};
pub use git::WorkingTreeState;
pub use repository::{RepositoryUrl, UrlError};
pub use store::{RunStore, StoreError};
pub use telemetry::{create_migration_span, init_telemetry};
pub use templates::{TemplateRenderer, TemplateSet};
pub use workflows::{
    ApprovalDecision, ApprovalGate, ApprovalRequest, AutoApprove, MigrationError,
    MigrationResult, MigrationState, MigrationStatus, MigrationWorkflow, WorkflowSettings,
};
