//! CI template rendering
//!
//! Templates use Jinja2 semantics with bracket delimiters so GitHub Actions
//! expressions like `${{ github.ref }}` pass through untouched:
//!
//! - Variables: `[[ repo_name ]]`
//! - Blocks: `[% if github_org %]...[% endif %]`
//! - Comments: `[# ... #]`

pub mod renderer;

pub use renderer::{Bindings, TemplateError, TemplateRenderer};

use std::path::{Path, PathBuf};

pub const TEMPLATE_SUFFIX: &str = ".tpl";

/// Where a rendered template lands inside the target repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// `.github/workflows/<name>`
    GithubWorkflow,
    /// Repository root
    Docker,
}

impl TemplateKind {
    fn output_dir(self) -> &'static str {
        match self {
            TemplateKind::GithubWorkflow => ".github/workflows",
            TemplateKind::Docker => "",
        }
    }

    fn source_dir(self) -> &'static str {
        match self {
            TemplateKind::GithubWorkflow => "gha",
            TemplateKind::Docker => "docker",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiTemplate {
    /// File name including the `.tpl` suffix
    pub name: String,
    pub kind: TemplateKind,
    pub source: String,
}

impl CiTemplate {
    pub fn new(name: impl Into<String>, kind: TemplateKind, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            source: source.into(),
        }
    }

    /// Repository-relative output path, e.g. `.github/workflows/build.yml`
    pub fn output_path(&self) -> String {
        let file = self.name.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(&self.name);
        match self.kind.output_dir() {
            "" => file.to_string(),
            dir => format!("{dir}/{file}"),
        }
    }
}

/// The templates materialized into every migrated repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    templates: Vec<CiTemplate>,
}

impl TemplateSet {
    pub fn new(templates: Vec<CiTemplate>) -> Self {
        Self { templates }
    }

    /// Templates compiled into the binary
    pub fn builtin() -> Self {
        Self::new(vec![
            CiTemplate::new(
                "build.yml.tpl",
                TemplateKind::GithubWorkflow,
                include_str!("../../templates/gha/build.yml.tpl"),
            ),
            CiTemplate::new(
                "release.yml.tpl",
                TemplateKind::GithubWorkflow,
                include_str!("../../templates/gha/release.yml.tpl"),
            ),
            CiTemplate::new(
                "docker-argo-bake.hcl.tpl",
                TemplateKind::Docker,
                include_str!("../../templates/docker/docker-argo-bake.hcl.tpl"),
            ),
        ])
    }

    /// Load `gha/*.tpl` and `docker/*.tpl` from a directory on disk.
    ///
    /// A missing subdirectory contributes no templates.
    pub fn from_dir(root: &Path) -> Result<Self, TemplateError> {
        let mut templates = Vec::new();
        for kind in [TemplateKind::GithubWorkflow, TemplateKind::Docker] {
            let dir = root.join(kind.source_dir());
            if !dir.is_dir() {
                continue;
            }
            for path in template_files(&dir)? {
                let source = std::fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                templates.push(CiTemplate::new(name, kind, source));
            }
        }

        if templates.is_empty() {
            return Err(TemplateError::Io {
                path: root.to_path_buf(),
                message: "no templates found".to_string(),
            });
        }
        Ok(Self::new(templates))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CiTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn template_files(dir: &Path) -> Result<Vec<PathBuf>, TemplateError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| io_error(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with(TEMPLATE_SUFFIX))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn io_error(path: &Path, err: std::io::Error) -> TemplateError {
    TemplateError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
