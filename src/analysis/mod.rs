//! Repository analysis
//!
//! Inspects a cloned tree for its build description: the `ViaCBSfile`, the
//! docker-bake file it references and the Dockerfile that bake file (or the
//! repository root) provides. Analysis is best-effort; the workflow downgrades
//! any `AnalysisError` to a warning.

pub mod dockerfile;
pub mod via_cbs;

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const VIA_CBS_FILE_NAME: &str = "ViaCBSfile";
pub const ROOT_DOCKERFILE_NAME: &str = "Dockerfile";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{VIA_CBS_FILE_NAME} not found in repository")]
    ViaCbsFileMissing,
    #[error("Failed to read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

/// Facts about the repository consumed by the update step.
/// Paths are relative to the repository root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFindings {
    pub via_cbs_file_path: Option<String>,
    pub docker_bake_file_path: Option<String>,
    pub dockerfile_path: Option<String>,
    pub build_platform: Option<String>,
    pub build_as_config: Option<String>,
    pub dockerfile_is_multi_stage: Option<bool>,
}

/// Findings plus human-readable notes gathered along the way
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    pub findings: AnalysisFindings,
    pub notes: Vec<String>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait RepositoryAnalyzer: Send + Sync {
    fn analyze(&self, repo_path: &Path) -> Result<AnalysisReport, AnalysisError>;
}

/// Analyzer for repositories described by a `ViaCBSfile`
#[derive(Debug, Clone, Default)]
pub struct ViaCbsAnalyzer;

impl ViaCbsAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Dockerfile named by the bake file, if it exists inside the repository
    fn dockerfile_from_bake(
        &self,
        repo_path: &Path,
        bake_relative: &str,
        report: &mut AnalysisReport,
    ) -> Result<Option<String>, AnalysisError> {
        let bake_path = repo_path.join(bake_relative);
        let content = read(&bake_path)?;
        let Some(declared) = via_cbs::parse_bake_dockerfile(&content) else {
            report
                .notes
                .push(format!("No dockerfile entry in {bake_relative}"));
            return Ok(None);
        };

        let bake_dir = Path::new(bake_relative)
            .parent()
            .unwrap_or_else(|| Path::new(""));
        let Some(resolved) = normalize(&bake_dir.join(&declared)) else {
            report.notes.push(format!(
                "Dockerfile path from bake file is outside repository: {declared}"
            ));
            return Ok(None);
        };

        if !repo_path.join(&resolved).is_file() {
            report.notes.push(format!(
                "Dockerfile from bake file does not exist: {resolved}"
            ));
            return Ok(None);
        }

        report
            .notes
            .push(format!("Found Dockerfile path from bake file: {resolved}"));
        Ok(Some(resolved))
    }
}

impl RepositoryAnalyzer for ViaCbsAnalyzer {
    fn analyze(&self, repo_path: &Path) -> Result<AnalysisReport, AnalysisError> {
        let mut report = AnalysisReport::default();

        let via_cbs_path = repo_path.join(VIA_CBS_FILE_NAME);
        if !via_cbs_path.is_file() {
            return Err(AnalysisError::ViaCbsFileMissing);
        }
        let via_cbs = via_cbs::parse_via_cbs(&read(&via_cbs_path)?);
        report.findings.via_cbs_file_path = Some(VIA_CBS_FILE_NAME.to_string());
        report
            .notes
            .push(format!("Found {VIA_CBS_FILE_NAME} at {VIA_CBS_FILE_NAME}"));

        let mut dockerfile = None;
        if let Some(bake) = &via_cbs.docker_bake_file {
            if repo_path.join(bake).is_file() {
                report.findings.docker_bake_file_path = Some(bake.clone());
                report.notes.push(format!("Found docker-bake file at {bake}"));
                dockerfile = self.dockerfile_from_bake(repo_path, bake, &mut report)?;
            } else {
                report
                    .notes
                    .push(format!("docker-bake file specified but not found: {bake}"));
            }
        }

        if dockerfile.is_none() {
            if repo_path.join(ROOT_DOCKERFILE_NAME).is_file() {
                report.notes.push(format!(
                    "Found Dockerfile in repository root: {ROOT_DOCKERFILE_NAME}"
                ));
                dockerfile = Some(ROOT_DOCKERFILE_NAME.to_string());
            } else {
                report
                    .notes
                    .push("No Dockerfile found in repository root".to_string());
            }
        }

        if let Some(path) = &dockerfile {
            let content = read(&repo_path.join(path))?;
            report.findings.dockerfile_is_multi_stage = Some(dockerfile::is_multi_stage(&content));
        }
        report.findings.dockerfile_path = dockerfile;

        match &via_cbs.build_platform {
            Some(platform) => report
                .notes
                .push(format!("Identified build platform: {platform}")),
            None => report
                .notes
                .push(format!("No buildAs argument found in {VIA_CBS_FILE_NAME}")),
        }
        report.findings.build_platform = via_cbs.build_platform;
        report.findings.build_as_config = via_cbs.build_as_config;

        Ok(report)
    }
}

fn read(path: &Path) -> Result<String, AnalysisError> {
    std::fs::read_to_string(path).map_err(|e| AnalysisError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Lexically resolve `.` and `..`; `None` when the path escapes its root
fn normalize(path: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}
