//! Git command abstractions
//!
//! Provides the trait the migration workflow uses for every git interaction,
//! enabling testable workflows through dependency injection.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::command::{CommandError, CommandExecutor, CommandOptions};
use crate::git::{read_working_tree, WorkingTreeState};

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Destination already exists: {}", path.display())]
    DestinationExists { path: PathBuf },
    #[error("git {command} timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("Command execution error: {source}")]
    Command {
        #[from]
        source: CommandError,
    },
    #[error("Repository error: {0}")]
    Repository(#[from] git2::Error),
}

/// Everything needed to publish the migration changeset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub branch: String,
    pub message: String,
    /// Repository-relative paths to stage
    pub paths: Vec<String>,
    pub remote: String,
    /// `(name, email)` used instead of the repository's configured identity
    pub author: Option<(String, String)>,
}

/// Git operations consumed by the migration workflow
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait GitOperations: Send + Sync {
    /// Clone `url` into `dest`, which must not exist yet
    async fn clone_repository(
        &self,
        url: &str,
        dest: &Path,
        timeout: Duration,
    ) -> Result<PathBuf, GitError>;

    /// Read the working tree state of the clone at `path`
    async fn status(&self, path: &Path) -> Result<WorkingTreeState, GitError>;

    /// Create the feature branch, commit the changeset and push it
    async fn commit_and_push(&self, path: &Path, request: &CommitRequest) -> Result<(), GitError>;
}

/// Git implementation backed by the `git` binary
pub struct GitCli {
    executor: Arc<dyn CommandExecutor>,
}

impl GitCli {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    async fn run_git(&self, args: &[&str], options: &CommandOptions) -> Result<String, GitError> {
        let command = subcommand(args);
        let output = match self.executor.execute("git", args, options).await {
            Ok(output) => output,
            Err(CommandError::Timeout { timeout_ms }) => {
                return Err(GitError::Timeout {
                    command,
                    timeout_secs: timeout_ms.div_ceil(1000),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if !output.success() {
            let stderr = if output.stderr.trim().is_empty() {
                output.stdout.trim().to_string()
            } else {
                output.stderr.trim().to_string()
            };
            return Err(GitError::CommandFailed { command, stderr });
        }

        Ok(output.stdout.trim().to_string())
    }
}

/// First argument that is not a `-c key=value` override
fn subcommand(args: &[&str]) -> String {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "-c" {
            iter.next();
            continue;
        }
        return arg.to_string();
    }
    String::new()
}

#[async_trait]
impl GitOperations for GitCli {
    async fn clone_repository(
        &self,
        url: &str,
        dest: &Path,
        timeout: Duration,
    ) -> Result<PathBuf, GitError> {
        if dest.exists() {
            return Err(GitError::DestinationExists {
                path: dest.to_path_buf(),
            });
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CommandError::Io { message: e.to_string() })?;
        }

        let dest_arg = dest.to_string_lossy();
        let options = CommandOptions::default().with_timeout(timeout);
        self.run_git(&["clone", "--", url, dest_arg.as_ref()], &options)
            .await?;

        Ok(dest.to_path_buf())
    }

    async fn status(&self, path: &Path) -> Result<WorkingTreeState, GitError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_working_tree(&path))
            .await
            .map_err(|e| CommandError::Io { message: e.to_string() })?
            .map_err(GitError::from)
    }

    async fn commit_and_push(&self, path: &Path, request: &CommitRequest) -> Result<(), GitError> {
        let options = CommandOptions::in_dir(path);

        self.run_git(&["checkout", "-b", &request.branch], &options)
            .await?;

        let mut add_args = vec!["add", "--"];
        add_args.extend(request.paths.iter().map(String::as_str));
        self.run_git(&add_args, &options).await?;

        let identity = request
            .author
            .as_ref()
            .map(|(name, email)| (format!("user.name={name}"), format!("user.email={email}")));
        let mut commit_args: Vec<&str> = Vec::new();
        if let Some((name, email)) = &identity {
            commit_args.extend(["-c", name.as_str(), "-c", email.as_str()]);
        }
        commit_args.extend(["commit", "-m", &request.message]);
        self.run_git(&commit_args, &options).await?;

        self.run_git(&["push", "-u", &request.remote, &request.branch], &options)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::command::CommandOutput;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Simple mock for testing
    struct MockCommandExecutor {
        responses: HashMap<String, Result<CommandOutput, CommandError>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockCommandExecutor {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn expect_command(
            mut self,
            program: &str,
            args: &[&str],
            response: Result<CommandOutput, CommandError>,
        ) -> Self {
            let key = format!("{} {}", program, args.join(" "));
            self.responses.insert(key, response);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandExecutor for MockCommandExecutor {
        async fn execute(
            &self,
            program: &str,
            args: &[&str],
            _options: &CommandOptions,
        ) -> Result<CommandOutput, CommandError> {
            let key = format!("{} {}", program, args.join(" "));
            self.calls.lock().unwrap().push(key.clone());
            self.responses.get(&key).cloned().unwrap_or(Err(CommandError::CommandNotFound {
                command: program.to_string(),
            }))
        }
    }

    fn ok_output() -> Result<CommandOutput, CommandError> {
        Ok(CommandOutput {
            status_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn commit_request() -> CommitRequest {
        CommitRequest {
            branch: "ci-migration/argo".to_string(),
            message: "Add CI".to_string(),
            paths: vec![".github/workflows/build.yml".to_string()],
            remote: "origin".to_string(),
            author: None,
        }
    }

    #[tokio::test]
    async fn test_clone_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitCli::new(Arc::new(MockCommandExecutor::new()));

        let result = client
            .clone_repository("https://github.com/example/repo.git", dir.path(), Duration::from_secs(1))
            .await;

        assert!(matches!(result, Err(GitError::DestinationExists { .. })));
    }

    #[tokio::test]
    async fn test_clone_maps_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("repo");
        let dest_arg = dest.to_string_lossy().to_string();
        let executor = MockCommandExecutor::new().expect_command(
            "git",
            &["clone", "--", "https://github.com/example/repo.git", &dest_arg],
            Err(CommandError::Timeout { timeout_ms: 300_000 }),
        );
        let client = GitCli::new(Arc::new(executor));

        let result = client
            .clone_repository("https://github.com/example/repo.git", &dest, Duration::from_secs(300))
            .await;

        match result {
            Err(GitError::Timeout { command, timeout_secs }) => {
                assert_eq!(command, "clone");
                assert_eq!(timeout_secs, 300);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sub_second_timeout_rounds_up() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("repo");
        let dest_arg = dest.to_string_lossy().to_string();
        let executor = MockCommandExecutor::new().expect_command(
            "git",
            &["clone", "--", "https://github.com/example/repo.git", &dest_arg],
            Err(CommandError::Timeout { timeout_ms: 250 }),
        );
        let client = GitCli::new(Arc::new(executor));

        let err = client
            .clone_repository("https://github.com/example/repo.git", &dest, Duration::from_millis(250))
            .await
            .unwrap_err();

        assert!(matches!(err, GitError::Timeout { timeout_secs: 1, .. }));
    }

    #[tokio::test]
    async fn test_clone_reports_stderr_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("repo");
        let dest_arg = dest.to_string_lossy().to_string();
        let executor = MockCommandExecutor::new().expect_command(
            "git",
            &["clone", "--", "https://github.com/example/missing.git", &dest_arg],
            Ok(CommandOutput {
                status_code: 128,
                stdout: String::new(),
                stderr: "fatal: repository not found\n".to_string(),
            }),
        );
        let client = GitCli::new(Arc::new(executor));

        let err = client
            .clone_repository("https://github.com/example/missing.git", &dest, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "git clone failed: fatal: repository not found");
    }

    #[tokio::test]
    async fn test_commit_and_push_runs_commands_in_order() {
        let executor = Arc::new(
            MockCommandExecutor::new()
                .expect_command("git", &["checkout", "-b", "ci-migration/argo"], ok_output())
                .expect_command("git", &["add", "--", ".github/workflows/build.yml"], ok_output())
                .expect_command("git", &["commit", "-m", "Add CI"], ok_output())
                .expect_command("git", &["push", "-u", "origin", "ci-migration/argo"], ok_output()),
        );
        let client = GitCli::new(executor.clone());

        client
            .commit_and_push(Path::new("/tmp/repo"), &commit_request())
            .await
            .unwrap();

        assert_eq!(
            executor.calls(),
            vec![
                "git checkout -b ci-migration/argo",
                "git add -- .github/workflows/build.yml",
                "git commit -m Add CI",
                "git push -u origin ci-migration/argo",
            ]
        );
    }

    #[tokio::test]
    async fn test_commit_uses_configured_identity() {
        let executor = Arc::new(
            MockCommandExecutor::new()
                .expect_command("git", &["checkout", "-b", "ci-migration/argo"], ok_output())
                .expect_command("git", &["add", "--", ".github/workflows/build.yml"], ok_output())
                .expect_command(
                    "git",
                    &[
                        "-c",
                        "user.name=Migration Bot",
                        "-c",
                        "user.email=bot@example.com",
                        "commit",
                        "-m",
                        "Add CI",
                    ],
                    ok_output(),
                )
                .expect_command("git", &["push", "-u", "origin", "ci-migration/argo"], ok_output()),
        );
        let client = GitCli::new(executor);
        let mut request = commit_request();
        request.author = Some(("Migration Bot".to_string(), "bot@example.com".to_string()));

        assert!(client
            .commit_and_push(Path::new("/tmp/repo"), &request)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_push_rejection_stops_the_sequence() {
        let executor = Arc::new(
            MockCommandExecutor::new()
                .expect_command("git", &["checkout", "-b", "ci-migration/argo"], ok_output())
                .expect_command("git", &["add", "--", ".github/workflows/build.yml"], ok_output())
                .expect_command("git", &["commit", "-m", "Add CI"], ok_output())
                .expect_command(
                    "git",
                    &["push", "-u", "origin", "ci-migration/argo"],
                    Ok(CommandOutput {
                        status_code: 1,
                        stdout: String::new(),
                        stderr: "! [rejected] (non-fast-forward)".to_string(),
                    }),
                ),
        );
        let client = GitCli::new(executor);

        let err = client
            .commit_and_push(Path::new("/tmp/repo"), &commit_request())
            .await
            .unwrap_err();

        assert!(matches!(err, GitError::CommandFailed { ref command, .. } if command == "push"));
    }
}
