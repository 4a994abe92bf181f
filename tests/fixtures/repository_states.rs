/// Repository fixtures used by the migration integration tests
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Files making up the tree of a repository to migrate
#[derive(Debug, Clone)]
pub struct RepositoryStateFixture {
    pub name: String,
    pub files: BTreeMap<String, String>,
}

impl RepositoryStateFixture {
    /// ViaCBSfile pointing at a bake file in `ci/` whose Dockerfile lives in `docker/`
    pub fn via_cbs_with_bake_file() -> Self {
        Self {
            name: "service".to_string(),
            files: BTreeMap::from([
                (
                    "ViaCBSfile".to_string(),
                    "pipeline {\n    docker {\n        dockerBakeFile './ci/docker-bake.hcl'\n    }\n    buildAs('python-pypi') {\n        pythonVersion '3.11'\n    }\n}\n"
                        .to_string(),
                ),
                (
                    "ci/docker-bake.hcl".to_string(),
                    "target \"app\" {\n  context = \"..\"\n  dockerfile = \"../docker/Dockerfile\"\n}\n"
                        .to_string(),
                ),
                (
                    "docker/Dockerfile".to_string(),
                    "FROM python:3.11 AS build\nRUN pip wheel .\nFROM python:3.11-slim\n".to_string(),
                ),
                ("README.md".to_string(), "# service\n".to_string()),
            ]),
        }
    }

    /// ViaCBSfile without a bake file and a single-stage root Dockerfile
    pub fn via_cbs_with_root_dockerfile() -> Self {
        Self {
            name: "webapp".to_string(),
            files: BTreeMap::from([
                (
                    "ViaCBSfile".to_string(),
                    "buildAs('node-npm') { nodeVersion '20' }\n".to_string(),
                ),
                ("Dockerfile".to_string(), "FROM node:20\nCOPY . .\n".to_string()),
            ]),
        }
    }

    /// No build description at all
    pub fn without_build_description() -> Self {
        Self {
            name: "plain".to_string(),
            files: BTreeMap::from([("README.md".to_string(), "# plain\n".to_string())]),
        }
    }

    /// Write the fixture files below `root`
    pub fn write_to(&self, root: &Path) -> std::io::Result<()> {
        for (relative, content) in &self.files {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    /// Create a bare repository `<root>/<org>/<name>.git` holding the fixture on `main`
    pub fn create_remote(&self, root: &Path, org: &str) -> PathBuf {
        let seed = root.join("seed").join(&self.name);
        std::fs::create_dir_all(&seed).unwrap();
        self.write_to(&seed).unwrap();

        git(&seed, &["init", "--quiet"]);
        git(&seed, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&seed, &["add", "--all"]);
        git(
            &seed,
            &[
                "-c",
                "user.name=Fixture",
                "-c",
                "user.email=fixture@example.com",
                "commit",
                "--quiet",
                "-m",
                "Initial commit",
            ],
        );

        let remote = root.join(org).join(format!("{}.git", self.name));
        std::fs::create_dir_all(&remote).unwrap();
        git(&remote, &["init", "--quiet", "--bare"]);
        git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let remote_arg = remote.to_string_lossy().to_string();
        git(&seed, &["push", "--quiet", &remote_arg, "main:main"]);
        remote
    }
}

/// Whether a usable `git` binary is on PATH
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Run git in `dir`, panicking with its stderr on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Repository-relative paths of every file below `root`, skipping `.git`
pub fn list_files(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, files: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.file_name().is_some_and(|name| name == ".git") {
                continue;
            }
            if path.is_dir() {
                walk(root, &path, files);
            } else {
                let relative = path.strip_prefix(root).unwrap();
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut files = Vec::new();
    walk(root, root, &mut files);
    files.sort();
    files
}
