use clap::{ArgGroup, Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "ci-migrator")]
#[command(version)]
#[command(about = "Migrate a repository's CI to GitHub Actions and docker bake")]
#[command(long_about = "ci-migrator clones a repository, inspects its ViaCBSfile, docker-bake file \
                       and Dockerfile, renders GitHub Actions workflows and a bake file into the clone, \
                       and pushes the result on a feature branch once a human approves the changes.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a migration run for a repository URL
    Run {
        /// Repository to migrate (https://, ssh://, git:// or git@host:org/repo)
        url: String,
        /// Approve the changes without prompting
        #[arg(short = 'y', long, help = "Skip the approval prompt and approve the changes")]
        yes: bool,
        /// Stop at the approval checkpoint and persist the run
        #[arg(long, conflicts_with = "yes", help = "Persist the run at the approval checkpoint and exit")]
        detach: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Approve or reject a detached run and finish it
    #[command(group(ArgGroup::new("decision").required(true).args(["approve", "reject"])))]
    Resume {
        /// Run id printed by `run --detach`
        run_id: String,
        /// Approve the pending changes
        #[arg(long)]
        approve: bool,
        /// Reject the pending changes with a reason
        #[arg(long, value_name = "REASON")]
        reject: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a persisted run
    Show {
        run_id: String,
        /// Print the full run record as JSON
        #[arg(long)]
        json: bool,
    },
    /// List persisted runs
    List {
        /// Print the runs as JSON
        #[arg(long)]
        json: bool,
    },
}
