use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Instrument};

use super::approval::{ApprovalDecision, ApprovalGate, ApprovalRequest};
use super::error::MigrationError;
use super::state::{MigrationState, MigrationStatus};
use crate::analysis::{dockerfile, AnalysisFindings, RepositoryAnalyzer};
use crate::external::{CommitRequest, GitError, GitOperations};
use crate::repository::RepositoryUrl;
use crate::telemetry::create_migration_span;
use crate::templates::{Bindings, TemplateRenderer, TemplateSet};

/// Dockerfile name bound when analysis found none
const DEFAULT_ARGO_DOCKERFILE: &str = "Dockerfile-argo";

/// Runtime knobs for a migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub workspace_root: PathBuf,
    pub clone_timeout: Duration,
    pub branch_name: String,
    pub commit_message: String,
    pub remote: String,
    /// `(name, email)` for the migration commit
    pub author: Option<(String, String)>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("ci-migrator"),
            clone_timeout: Duration::from_secs(300),
            branch_name: "ci-migration/argo".to_string(),
            commit_message: "Migrate CI to GitHub Actions and docker bake".to_string(),
            remote: "origin".to_string(),
            author: None,
        }
    }
}

/// Drives a repository through clone, analysis, templating, review and push
pub struct MigrationWorkflow {
    git: Arc<dyn GitOperations>,
    analyzer: Arc<dyn RepositoryAnalyzer>,
    renderer: TemplateRenderer,
    templates: TemplateSet,
    settings: WorkflowSettings,
}

impl MigrationWorkflow {
    pub fn new(
        git: Arc<dyn GitOperations>,
        analyzer: Arc<dyn RepositoryAnalyzer>,
        templates: TemplateSet,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            git,
            analyzer,
            renderer: TemplateRenderer::new(),
            templates,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Run a fresh migration up to the approval checkpoint (or to `error`)
    pub async fn start(&self, repository_url: &str) -> MigrationState {
        let mut state = MigrationState::new(repository_url);
        self.start_with_state(&mut state).await;
        state
    }

    /// Like [`start`](Self::start) for a caller-constructed pending state
    pub async fn start_with_state(&self, state: &mut MigrationState) {
        let span = create_migration_span(&state.run_id, &state.repository_url);
        let outcome = self.prepare(state).instrument(span.clone()).await;
        if let Err(err) = outcome {
            span.in_scope(|| record_failure(state, &err));
        }
    }

    /// Apply a decision to a suspended run and finish it
    pub async fn resume(
        &self,
        mut state: MigrationState,
        decision: ApprovalDecision,
    ) -> MigrationState {
        if state.is_terminal() {
            return state;
        }

        let span = create_migration_span(&state.run_id, &state.repository_url);
        let outcome = self
            .finish(&mut state, decision)
            .instrument(span.clone())
            .await;
        if let Err(err) = outcome {
            span.in_scope(|| record_failure(&mut state, &err));
        }
        state
    }

    /// Full run with an in-process approval gate
    pub async fn run(&self, repository_url: &str, gate: &dyn ApprovalGate) -> MigrationState {
        let state = self.start(repository_url).await;
        if state.status != MigrationStatus::AwaitingApproval {
            return state;
        }

        let request = self.approval_request(&state).await;
        let decision = gate.decide(&request).await;
        self.resume(state, decision).await
    }

    async fn prepare(&self, state: &mut MigrationState) -> Result<(), MigrationError> {
        self.validate_url(state)?;
        self.clone_repository(state).await?;
        self.analyze(state).await?;
        self.update(state).await?;
        self.await_approval(state)
    }

    async fn finish(
        &self,
        state: &mut MigrationState,
        decision: ApprovalDecision,
    ) -> Result<(), MigrationError> {
        if state.status != MigrationStatus::AwaitingApproval {
            return Err(MigrationError::UnexpectedError(format!(
                "run {} is {}, not awaiting approval",
                state.run_id, state.status
            )));
        }

        match decision {
            ApprovalDecision::Approve => {
                info!(run_id = %state.run_id, "Changes approved");
                state.info("Changes approved by reviewer");
            }
            ApprovalDecision::Reject { reason } => {
                warn!(run_id = %state.run_id, reason = %reason, "Changes rejected");
                return Err(MigrationError::Rejected(reason));
            }
        }

        self.validate(state).await?;
        self.push(state).await
    }

    pub fn validate_url(&self, state: &mut MigrationState) -> Result<(), MigrationError> {
        info!(run_id = %state.run_id, step = "validate_url", url = %state.repository_url, "Validating repository URL");
        state.info(format!("Validating repository URL {}", state.repository_url));
        let url = parse_url(state)?;

        state.info(format!("Validated repository URL: {}", url.raw));
        state.advance(MigrationStatus::Validated)
    }

    pub async fn clone_repository(&self, state: &mut MigrationState) -> Result<(), MigrationError> {
        state.advance(MigrationStatus::Cloning)?;
        let url = parse_url(state)?;
        let target = self
            .settings
            .workspace_root
            .join(&state.run_id)
            .join(&url.name);

        info!(run_id = %state.run_id, step = "clone", target = %target.display(), "Cloning repository");
        state.info(format!("Cloning {} into {}", url.raw, target.display()));

        if target.exists() {
            return Err(MigrationError::CloneConflict(format!(
                "target path already exists: {}",
                target.display()
            )));
        }

        let path = self
            .git
            .clone_repository(&url.raw, &target, self.settings.clone_timeout)
            .await
            .map_err(|e| match e {
                GitError::DestinationExists { path } => MigrationError::CloneConflict(format!(
                    "target path already exists: {}",
                    path.display()
                )),
                GitError::Timeout { timeout_secs, .. } => MigrationError::CloneTimeout(format!(
                    "git clone of {} exceeded {}s",
                    url.raw, timeout_secs
                )),
                other => MigrationError::CloneFailure(other.to_string()),
            })?;

        state.info(format!("Repository cloned to {}", path.display()));
        state.repo_path = Some(path);
        Ok(())
    }

    /// Never fails on analyzer errors; they become warnings with empty findings.
    pub async fn analyze(&self, state: &mut MigrationState) -> Result<(), MigrationError> {
        state.advance(MigrationStatus::Analyzing)?;
        let repo_path = repo_path(state)?;
        info!(run_id = %state.run_id, step = "analyze", "Analyzing repository");
        state.info(format!("Analyzing repository at {}", repo_path.display()));

        let analyzer = Arc::clone(&self.analyzer);
        let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&repo_path))
            .await
            .map_err(|e| e.to_string())
            .and_then(|result| result.map_err(|e| e.to_string()));

        match outcome {
            Ok(report) => {
                for note in report.notes {
                    state.info(note);
                }
                state.findings = report.findings;
            }
            Err(message) => {
                warn!(run_id = %state.run_id, error = %message, "Repository analysis failed, continuing");
                state.warn(format!(
                    "Repository analysis failed: {message}; continuing without findings"
                ));
                state.findings = AnalysisFindings::default();
            }
        }
        Ok(())
    }

    pub async fn update(&self, state: &mut MigrationState) -> Result<(), MigrationError> {
        state.advance(MigrationStatus::Updating)?;
        let repo_path = repo_path(state)?;
        let url = parse_url(state)?;
        info!(run_id = %state.run_id, step = "update", templates = self.templates.len(), "Rendering CI templates");
        state.info(format!("Rendering {} CI templates", self.templates.len()));
        if self.templates.is_empty() {
            return Err(MigrationError::TemplateError(
                "no CI templates to render".to_string(),
            ));
        }

        let organization = url.organization.clone().ok_or_else(|| {
            MigrationError::TemplateError(format!(
                "no organization in repository URL {} for binding 'github_org'",
                url.raw
            ))
        })?;

        let mut changes = Vec::new();
        let argo_dockerfile = match state.findings.dockerfile_path.clone() {
            Some(found) => {
                let argo = dockerfile::argo_path(&found);
                copy_file(&repo_path.join(&found), &repo_path.join(&argo)).await?;
                state.info(format!("Copied {found} to {argo}"));
                changes.push(argo.clone());
                argo
            }
            None => {
                state.warn(format!(
                    "No Dockerfile found; templates reference {DEFAULT_ARGO_DOCKERFILE}"
                ));
                DEFAULT_ARGO_DOCKERFILE.to_string()
            }
        };

        let bindings = Bindings::from([
            ("github_org".to_string(), organization),
            ("repo_name".to_string(), url.name.clone()),
            ("dockerfile_path".to_string(), argo_dockerfile),
        ]);

        for template in self.templates.iter() {
            let rendered = self
                .renderer
                .render(template, &bindings)
                .map_err(|e| MigrationError::TemplateError(e.to_string()))?;
            let output = template.output_path();
            write_file(&repo_path.join(&output), &rendered).await?;
            state.info(format!("Wrote {output}"));
            changes.push(output);
        }

        changes.sort();
        changes.dedup();
        state.workflow_changes = changes;
        Ok(())
    }

    /// Enter the suspension point
    pub fn await_approval(&self, state: &mut MigrationState) -> Result<(), MigrationError> {
        state.advance(MigrationStatus::AwaitingApproval)?;
        info!(
            run_id = %state.run_id,
            step = "await_approval",
            changes = state.workflow_changes.len(),
            "Awaiting human approval"
        );
        state.info(format!(
            "Awaiting approval of {} changed files",
            state.workflow_changes.len()
        ));
        Ok(())
    }

    /// What a reviewer needs to decide on a suspended run
    pub async fn approval_request(&self, state: &MigrationState) -> ApprovalRequest {
        let working_tree = match &state.repo_path {
            Some(path) => self.git.status(path).await.ok(),
            None => None,
        };
        ApprovalRequest {
            run_id: state.run_id.clone(),
            repository_url: state.repository_url.clone(),
            clone_path: state.repo_path.clone(),
            findings: state.findings.clone(),
            expected_changes: state.workflow_changes.clone(),
            working_tree,
        }
    }

    pub async fn validate(&self, state: &mut MigrationState) -> Result<(), MigrationError> {
        state.advance(MigrationStatus::Validating)?;
        let repo_path = repo_path(state)?;
        info!(run_id = %state.run_id, step = "validate", "Validating working tree");
        state.info("Validating working tree against the migration changeset");

        if state.workflow_changes.is_empty() {
            return Err(MigrationError::ValidationFailure(
                "no migration changes to validate".to_string(),
            ));
        }

        let tree = self
            .git
            .status(&repo_path)
            .await
            .map_err(|e| MigrationError::ValidationFailure(e.to_string()))?;

        let unexpected: Vec<&str> = tree
            .paths()
            .filter(|path| !state.workflow_changes.iter().any(|c| c.as_str() == *path))
            .collect();
        if !unexpected.is_empty() {
            return Err(MigrationError::DirtyTree(format!(
                "unexpected changes outside the migration changeset: {}",
                unexpected.join(", ")
            )));
        }

        if tree.is_clean() {
            return Err(MigrationError::ValidationFailure(
                "migration changeset has no pending changes".to_string(),
            ));
        }
        let pending = tree.paths().count();

        state.info(format!("Working tree validated: {pending} pending changes"));
        Ok(())
    }

    /// Publish the changeset. Failures are terminal and never retried.
    pub async fn push(&self, state: &mut MigrationState) -> Result<(), MigrationError> {
        state.advance(MigrationStatus::Pushing)?;
        let repo_path = repo_path(state)?;
        let request = CommitRequest {
            branch: self.settings.branch_name.clone(),
            message: self.settings.commit_message.clone(),
            paths: state.workflow_changes.clone(),
            remote: self.settings.remote.clone(),
            author: self.settings.author.clone(),
        };
        info!(
            run_id = %state.run_id,
            step = "push",
            branch = %request.branch,
            remote = %request.remote,
            "Pushing migration branch"
        );
        state.info(format!(
            "Pushing branch {} to {}",
            request.branch, request.remote
        ));

        self.git
            .commit_and_push(&repo_path, &request)
            .await
            .map_err(|e| MigrationError::PushFailure(e.to_string()))?;

        state.info(format!(
            "Pushed branch {} to {}",
            request.branch, request.remote
        ));
        state.branch_name = Some(request.branch);
        state.advance(MigrationStatus::Success)?;
        info!(run_id = %state.run_id, "Migration completed");
        Ok(())
    }
}

fn record_failure(state: &mut MigrationState, err: &MigrationError) {
    error!(
        run_id = %state.run_id,
        status = %state.status,
        kind = err.kind(),
        error = %err,
        "Migration run failed"
    );
    if !state.is_terminal() {
        state.fail(err);
    }
}

fn parse_url(state: &MigrationState) -> Result<RepositoryUrl, MigrationError> {
    RepositoryUrl::parse(&state.repository_url)
        .map_err(|e| MigrationError::InvalidUrl(format!("{}: {e}", state.repository_url)))
}

fn repo_path(state: &MigrationState) -> Result<PathBuf, MigrationError> {
    state
        .repo_path
        .clone()
        .ok_or_else(|| MigrationError::UnexpectedError("repository has not been cloned".to_string()))
}

async fn write_file(path: &Path, content: &str) -> Result<(), MigrationError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| write_error(parent, e))?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| write_error(path, e))
}

async fn copy_file(from: &Path, to: &Path) -> Result<(), MigrationError> {
    tokio::fs::copy(from, to)
        .await
        .map(|_| ())
        .map_err(|e| write_error(to, e))
}

fn write_error(path: &Path, err: std::io::Error) -> MigrationError {
    MigrationError::TemplateError(format!("cannot write {}: {err}", path.display()))
}
