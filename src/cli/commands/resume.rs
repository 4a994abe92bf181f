use anyhow::{bail, Result};
use tracing::info;

use super::{build_workflow, ensure_not_failed, print_messages, print_result, run_store};
use crate::config::MigratorConfig;
use crate::store::{RunStore, StoreError};
use crate::workflows::{ApprovalDecision, MigrationState, MigrationStatus};

pub struct ResumeCommand {
    pub run_id: String,
    pub decision: ApprovalDecision,
    pub json: bool,
}

impl ResumeCommand {
    pub fn new(run_id: String, decision: ApprovalDecision) -> Self {
        Self {
            run_id,
            decision,
            json: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub async fn execute(&self, config: &MigratorConfig) -> Result<()> {
        let store = run_store(config);
        let outcome = self.resume_locked(&store, config).await;

        // Another process holds the run; its lock file is not ours to remove.
        if let Err(e) = &outcome {
            if matches!(e.downcast_ref::<StoreError>(), Some(StoreError::Locked { .. })) {
                return outcome.map(|_| ());
            }
        }
        store.remove_lock(&self.run_id).await?;
        let state = outcome?;

        if !self.json {
            print_messages(&state);
        }
        print_result(&state, self.json)?;
        ensure_not_failed(&state)
    }

    async fn resume_locked(
        &self,
        store: &RunStore,
        config: &MigratorConfig,
    ) -> Result<MigrationState> {
        let mut lock = store.lock(&self.run_id)?;
        let _guard = lock.try_acquire()?;

        let state = store.load(&self.run_id).await?;
        if state.status != MigrationStatus::AwaitingApproval {
            bail!(
                "Run {} is {}, only runs awaiting approval can be resumed",
                state.run_id,
                state.status
            );
        }

        info!(run_id = %state.run_id, decision = ?self.decision, "Resuming migration run");
        let workflow = build_workflow(config)?;
        let state = workflow.resume(state, self.decision.clone()).await;
        store.save(&state).await?;
        Ok(state)
    }
}
