use anyhow::{anyhow, Context, Result};
use std::sync::Arc;

use crate::analysis::ViaCbsAnalyzer;
use crate::config::MigratorConfig;
use crate::external::{GitCli, ProcessCommandExecutor};
use crate::store::RunStore;
use crate::templates::TemplateSet;
use crate::workflows::{MessageLevel, MigrationResult, MigrationState, MigrationStatus, MigrationWorkflow};

pub mod list;
pub mod resume;
pub mod run;
pub mod show;

/// Workflow wired to the real git binary and the ViaCBS analyzer
pub fn build_workflow(config: &MigratorConfig) -> Result<MigrationWorkflow> {
    let templates = match &config.templates.directory {
        Some(dir) => TemplateSet::from_dir(dir)
            .with_context(|| format!("Failed to load templates from {}", dir.display()))?,
        None => TemplateSet::builtin(),
    };

    Ok(MigrationWorkflow::new(
        Arc::new(GitCli::new(Arc::new(ProcessCommandExecutor))),
        Arc::new(ViaCbsAnalyzer::new()),
        templates,
        config.workflow_settings(),
    ))
}

pub fn run_store(config: &MigratorConfig) -> RunStore {
    RunStore::new(config.persistence.state_dir.clone())
}

/// Print the terminal summary of a run
pub fn print_result(state: &MigrationState, json: bool) -> Result<()> {
    if json {
        let result = MigrationResult::from(state);
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let icon = match state.status {
        MigrationStatus::Success => "✅",
        MigrationStatus::Error => "❌",
        _ => "⏸️ ",
    };
    println!("{icon} Run {}: {}", state.run_id, state.status);
    if let Some(path) = &state.repo_path {
        println!("   📁 Clone: {}", path.display());
    }
    if let Some(branch) = &state.branch_name {
        println!("   🌿 Branch: {branch}");
    }
    if let Some(error) = &state.error {
        println!("   {error}");
    }
    Ok(())
}

pub fn print_messages(state: &MigrationState) {
    for message in &state.messages {
        let marker = match message.level {
            MessageLevel::Info => " ",
            MessageLevel::Warning => "!",
            MessageLevel::Error => "x",
        };
        println!(
            "   [{marker}] {} {}",
            message.timestamp.format("%H:%M:%S"),
            message.text
        );
    }
}

/// Turn a failed run into a non-zero exit
pub fn ensure_not_failed(state: &MigrationState) -> Result<()> {
    if state.status == MigrationStatus::Error {
        return Err(anyhow!(
            "Migration run {} failed: {}",
            state.run_id,
            state.error.as_deref().unwrap_or("unknown error")
        ));
    }
    Ok(())
}
