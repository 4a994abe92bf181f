use anyhow::Result;

use super::{print_messages, print_result, run_store};
use crate::config::MigratorConfig;

pub struct ShowCommand {
    pub run_id: String,
    pub json: bool,
}

impl ShowCommand {
    pub fn new(run_id: String) -> Self {
        Self { run_id, json: false }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub async fn execute(&self, config: &MigratorConfig) -> Result<()> {
        let state = run_store(config).load(&self.run_id).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&state)?);
            return Ok(());
        }

        print_result(&state, false)?;
        println!("   🔗 Repository: {}", state.repository_url);
        println!("   🕐 Created: {}", state.created_at.to_rfc3339());
        if !state.workflow_changes.is_empty() {
            println!("   Changes:");
            for path in &state.workflow_changes {
                println!("     + {path}");
            }
        }
        println!("   Messages:");
        print_messages(&state);
        Ok(())
    }
}
