use anyhow::Result;
use clap::Parser;

use ci_migrator::cli::commands::{
    list::ListCommand, resume::ResumeCommand, run::RunCommand, show::ShowCommand,
};
use ci_migrator::cli::{Cli, Commands};
use ci_migrator::config::{config, init_config};
use ci_migrator::telemetry::init_telemetry;
use ci_migrator::workflows::ApprovalDecision;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config()?;
    init_telemetry(
        &config.observability.log_level,
        config.observability.json_logs,
    )?;
    init_config()?;

    match cli.command {
        Commands::Run {
            url,
            yes,
            detach,
            json,
        } => {
            RunCommand::new(url)
                .with_yes(yes)
                .with_detach(detach)
                .with_json(json)
                .execute(config)
                .await
        }
        Commands::Resume {
            run_id,
            approve: _,
            reject,
            json,
        } => {
            let decision = match reject {
                Some(reason) => ApprovalDecision::Reject { reason },
                None => ApprovalDecision::Approve,
            };
            ResumeCommand::new(run_id, decision)
                .with_json(json)
                .execute(config)
                .await
        }
        Commands::Show { run_id, json } => {
            ShowCommand::new(run_id).with_json(json).execute(config).await
        }
        Commands::List { json } => ListCommand::new().with_json(json).execute(config).await,
    }
}
