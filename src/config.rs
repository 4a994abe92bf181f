use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::workflows::WorkflowSettings;

pub const CONFIG_FILE_NAME: &str = "ci-migrator.toml";
pub const RC_FILE_NAME: &str = ".ci-migrator-rc";
pub const ENV_PREFIX: &str = "CI_MIGRATOR";

/// Main configuration structure for ci-migrator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MigratorConfig {
    pub workflow: WorkflowConfig,
    pub templates: TemplatesConfig,
    pub persistence: PersistenceConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Clones land in `<workspace_root>/<run_id>/<repo_name>`
    pub workspace_root: PathBuf,
    pub clone_timeout_seconds: u64,
    pub branch_name: String,
    pub commit_message: String,
    pub remote: String,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplatesConfig {
    /// Directory holding `gha/*.tpl` and `docker/*.tpl`; built-ins when unset
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PersistenceConfig {
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        let workflow = WorkflowSettings::default();
        Self {
            workflow: WorkflowConfig {
                workspace_root: workflow.workspace_root,
                clone_timeout_seconds: workflow.clone_timeout.as_secs(),
                branch_name: workflow.branch_name,
                commit_message: workflow.commit_message,
                remote: workflow.remote,
                author_name: None,
                author_email: None,
            },
            templates: TemplatesConfig::default(),
            persistence: PersistenceConfig {
                state_dir: PathBuf::from(".ci-migrator/runs"),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
            },
        }
    }
}

impl MigratorConfig {
    /// Load from the current directory and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Layer defaults, `ci-migrator.toml`, `.ci-migrator-rc` found in `dir`,
    /// then `CI_MIGRATOR__SECTION__KEY` environment variables.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&Self::default()).context("Failed to build default configuration")?,
        );

        let config_file = dir.join(CONFIG_FILE_NAME);
        if config_file.exists() {
            builder = builder.add_source(File::from(config_file));
        }

        let rc_file = dir.join(RC_FILE_NAME);
        if rc_file.exists() {
            builder = builder.add_source(File::from(rc_file).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to read configuration")?;
        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        let author = match (&self.workflow.author_name, &self.workflow.author_email) {
            (Some(name), Some(email)) => Some((name.clone(), email.clone())),
            _ => None,
        };
        WorkflowSettings {
            workspace_root: self.workflow.workspace_root.clone(),
            clone_timeout: Duration::from_secs(self.workflow.clone_timeout_seconds),
            branch_name: self.workflow.branch_name.clone(),
            commit_message: self.workflow.commit_message.clone(),
            remote: self.workflow.remote.clone(),
            author,
        }
    }
}

static CONFIG: std::sync::LazyLock<Result<MigratorConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = MigratorConfig::load_env_file();
        MigratorConfig::load()
    });

pub fn config() -> Result<&'static MigratorConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {:#}", e))
}

pub fn init_config() -> Result<()> {
    let config = config()?;
    tracing::debug!(
        workspace_root = %config.workflow.workspace_root.display(),
        state_dir = %config.persistence.state_dir.display(),
        "Configuration loaded successfully"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = MigratorConfig::default();

        assert_eq!(config.workflow.clone_timeout_seconds, 300);
        assert_eq!(config.workflow.branch_name, "ci-migration/argo");
        assert_eq!(config.workflow.remote, "origin");
        assert_eq!(config.persistence.state_dir, PathBuf::from(".ci-migrator/runs"));
        assert_eq!(config.observability.log_level, "info");
        assert!(config.observability.json_logs);
        assert!(config.templates.directory.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[workflow]\nclone_timeout_seconds = 60\nremote = \"upstream\"\n\n[observability]\njson_logs = false\n",
        )
        .unwrap();

        let config = MigratorConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.workflow.clone_timeout_seconds, 60);
        assert_eq!(config.workflow.remote, "upstream");
        assert_eq!(config.workflow.branch_name, "ci-migration/argo");
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn test_rc_file_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[workflow]\nbranch_name = \"from-toml\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(RC_FILE_NAME),
            "[workflow]\nbranch_name = \"from-rc\"\n",
        )
        .unwrap();

        let config = MigratorConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.workflow.branch_name, "from-rc");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut config = MigratorConfig::default();
        config.workflow.author_name = Some("Migration Bot".to_string());
        config.workflow.author_email = Some("bot@example.com".to_string());
        config.save_to_file(dir.path().join(CONFIG_FILE_NAME)).unwrap();

        let reloaded = MigratorConfig::load_from(dir.path()).unwrap();

        assert_eq!(reloaded.workflow.author_name, config.workflow.author_name);
        assert_eq!(
            reloaded.workflow_settings().author,
            Some(("Migration Bot".to_string(), "bot@example.com".to_string()))
        );
    }

    #[test]
    fn test_workflow_settings() {
        let settings = MigratorConfig::default().workflow_settings();

        assert_eq!(settings.clone_timeout, Duration::from_secs(300));
        assert_eq!(settings.author, None);
    }
}
