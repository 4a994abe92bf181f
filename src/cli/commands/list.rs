use anyhow::Result;

use super::run_store;
use crate::config::MigratorConfig;
use crate::workflows::MigrationResult;

pub struct ListCommand {
    pub json: bool,
}

impl ListCommand {
    pub fn new() -> Self {
        Self { json: false }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub async fn execute(&self, config: &MigratorConfig) -> Result<()> {
        let runs = run_store(config).list().await?;

        if self.json {
            let results: Vec<serde_json::Value> = runs
                .iter()
                .map(|run| {
                    serde_json::json!({
                        "run_id": run.run_id,
                        "repository_url": run.repository_url,
                        "result": MigrationResult::from(run),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&results)?);
            return Ok(());
        }

        if runs.is_empty() {
            println!("📋 No migration runs found");
            return Ok(());
        }
        for run in &runs {
            println!(
                "{}  {:<17}  {}",
                run.run_id,
                run.status.as_str(),
                run.repository_url
            );
        }
        Ok(())
    }
}

impl Default for ListCommand {
    fn default() -> Self {
        Self::new()
    }
}
