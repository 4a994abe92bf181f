use anyhow::Result;
use async_trait::async_trait;
use std::io::{BufRead, Write};

use super::{build_workflow, ensure_not_failed, print_messages, print_result, run_store};
use crate::config::MigratorConfig;
use crate::store::RunStore;
use crate::workflows::{
    ApprovalDecision, ApprovalGate, ApprovalRequest, AutoApprove, MigrationState,
    MigrationStatus, MigrationWorkflow,
};

pub struct RunCommand {
    pub url: String,
    pub yes: bool,
    pub detach: bool,
    pub json: bool,
}

impl RunCommand {
    pub fn new(url: String) -> Self {
        Self {
            url,
            yes: false,
            detach: false,
            json: false,
        }
    }

    pub fn with_yes(mut self, yes: bool) -> Self {
        self.yes = yes;
        self
    }

    pub fn with_detach(mut self, detach: bool) -> Self {
        self.detach = detach;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub async fn execute(&self, config: &MigratorConfig) -> Result<()> {
        let workflow = build_workflow(config)?;
        let store = run_store(config);

        let mut state = workflow.start(&self.url).await;
        if state.status != MigrationStatus::AwaitingApproval {
            store.save(&state).await?;
        } else if self.detach {
            store.save(&state).await?;
            if self.json {
                print_result(&state, true)?;
            } else {
                println!("⏸️  Run {} is awaiting approval", state.run_id);
                print_messages(&state);
                println!();
                println!("   Approve: ci-migrator resume {} --approve", state.run_id);
                println!("   Reject:  ci-migrator resume {} --reject <reason>", state.run_id);
            }
            return Ok(());
        } else {
            let gate: Box<dyn ApprovalGate> = if self.yes {
                Box::new(AutoApprove)
            } else {
                Box::new(TerminalApproval)
            };
            state = finish_under_lock(&workflow, &store, state, gate.as_ref()).await?;
        }

        if !self.json {
            print_messages(&state);
        }
        print_result(&state, self.json)?;
        ensure_not_failed(&state)
    }
}

/// Persist a suspended run, decide and finish it while holding its lock.
///
/// The run file is first written under the lock so a concurrent `resume`
/// cannot pick it up before this process is done with it.
async fn finish_under_lock(
    workflow: &MigrationWorkflow,
    store: &RunStore,
    state: MigrationState,
    gate: &dyn ApprovalGate,
) -> Result<MigrationState> {
    let state = {
        let mut lock = store.lock(&state.run_id)?;
        let _guard = lock.try_acquire()?;
        store.save(&state).await?;

        let request = workflow.approval_request(&state).await;
        let decision = gate.decide(&request).await;
        let state = workflow.resume(state, decision).await;
        store.save(&state).await?;
        state
    };
    if state.is_terminal() {
        store.remove_lock(&state.run_id).await?;
    }
    Ok(state)
}

/// Prompts on the controlling terminal
pub struct TerminalApproval;

impl TerminalApproval {
    fn prompt(request: &ApprovalRequest) -> std::io::Result<ApprovalDecision> {
        let mut out = std::io::stderr();
        writeln!(out)?;
        writeln!(out, "📋 Review migration run {}", request.run_id)?;
        if let Some(path) = &request.clone_path {
            writeln!(out, "   Clone: {}", path.display())?;
        }
        if let Some(dockerfile) = &request.findings.dockerfile_path {
            writeln!(out, "   Dockerfile: {dockerfile}")?;
        }
        if let Some(platform) = &request.findings.build_platform {
            writeln!(out, "   Build platform: {platform}")?;
        }
        writeln!(out, "   Changes:")?;
        for path in &request.expected_changes {
            writeln!(out, "     + {path}")?;
        }
        if let Some(tree) = &request.working_tree {
            let unexpected: Vec<&str> = tree
                .paths()
                .filter(|p| !request.expected_changes.iter().any(|c| c.as_str() == *p))
                .collect();
            if !unexpected.is_empty() {
                writeln!(out, "   ⚠️  Other changes in the tree: {}", unexpected.join(", "))?;
            }
        }
        write!(out, "Approve and push these changes? [y/N] ")?;
        out.flush()?;

        let stdin = std::io::stdin();
        let mut answer = String::new();
        stdin.lock().read_line(&mut answer)?;
        if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            return Ok(ApprovalDecision::Approve);
        }

        write!(out, "Reason for rejection: ")?;
        out.flush()?;
        let mut reason = String::new();
        stdin.lock().read_line(&mut reason)?;
        let reason = match reason.trim() {
            "" => "rejected by reviewer".to_string(),
            text => text.to_string(),
        };
        Ok(ApprovalDecision::Reject { reason })
    }
}

#[async_trait]
impl ApprovalGate for TerminalApproval {
    async fn decide(&self, request: &ApprovalRequest) -> ApprovalDecision {
        let request = request.clone();
        let outcome = tokio::task::spawn_blocking(move || Self::prompt(&request)).await;
        match outcome {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => ApprovalDecision::Reject {
                reason: format!("approval prompt failed: {e}"),
            },
            Err(e) => ApprovalDecision::Reject {
                reason: format!("approval prompt failed: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::MockRepositoryAnalyzer;
    use crate::external::git::MockGitOperations;
    use crate::store::StoreError;
    use crate::templates::TemplateSet;
    use crate::workflows::WorkflowSettings;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Tries to take over the run the way a concurrent `resume` would
    struct CompetingResume {
        store: RunStore,
        seen: Mutex<Option<(bool, MigrationStatus)>>,
    }

    #[async_trait]
    impl ApprovalGate for CompetingResume {
        async fn decide(&self, request: &ApprovalRequest) -> ApprovalDecision {
            let mut lock = self.store.lock(&request.run_id).unwrap();
            let locked_out = matches!(lock.try_acquire(), Err(StoreError::Locked { .. }));
            let saved = self.store.load(&request.run_id).await.unwrap();
            *self.seen.lock().unwrap() = Some((locked_out, saved.status));
            ApprovalDecision::Reject {
                reason: "not today".to_string(),
            }
        }
    }

    fn suspended_run() -> MigrationState {
        let mut state = MigrationState::new("https://github.com/example/repo.git");
        for next in &MigrationStatus::SEQUENCE[1..=5] {
            state.advance(*next).unwrap();
        }
        assert_eq!(state.status, MigrationStatus::AwaitingApproval);
        state
    }

    #[tokio::test]
    async fn test_run_is_saved_and_decided_under_its_lock() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());
        let workflow = MigrationWorkflow::new(
            Arc::new(MockGitOperations::new()),
            Arc::new(MockRepositoryAnalyzer::new()),
            TemplateSet::builtin(),
            WorkflowSettings::default(),
        );
        let gate = CompetingResume {
            store: store.clone(),
            seen: Mutex::new(None),
        };
        let state = suspended_run();
        let run_id = state.run_id.clone();

        let finished = finish_under_lock(&workflow, &store, state, &gate)
            .await
            .unwrap();

        let (locked_out, saved_status) = gate.seen.lock().unwrap().take().unwrap();
        assert!(locked_out);
        assert_eq!(saved_status, MigrationStatus::AwaitingApproval);
        assert_eq!(finished.error.as_deref(), Some("Rejected: not today"));
        assert_eq!(store.load(&run_id).await.unwrap().status, MigrationStatus::Error);
        assert!(!dir.path().join(format!("{run_id}.lock")).exists());
    }
}
