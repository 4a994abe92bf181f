//! Parsers for `ViaCBSfile` and `docker-bake.hcl` declarations

use regex::Regex;
use std::sync::LazyLock;

static DOCKER_BAKE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)dockerBakeFile\s+["']([^"']+)["']"#)
        .unwrap_or_else(|e| panic!("invalid dockerBakeFile pattern: {e}"))
});

static BUILD_AS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)buildAs\s*\(\s*["']([^"']+)["']\s*\)\s*\{"#)
        .unwrap_or_else(|e| panic!("invalid buildAs pattern: {e}"))
});

static BAKE_DOCKERFILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)dockerfile\s*=\s*["']([^"']+)["']"#)
        .unwrap_or_else(|e| panic!("invalid dockerfile pattern: {e}"))
});

/// Declarations extracted from a ViaCBSfile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViaCbsFile {
    /// `dockerBakeFile` value with any leading `./` removed
    pub docker_bake_file: Option<String>,
    /// Argument of `buildAs('...')`
    pub build_platform: Option<String>,
    /// Trimmed body of the `buildAs` block
    pub build_as_config: Option<String>,
}

pub fn parse_via_cbs(content: &str) -> ViaCbsFile {
    let mut file = ViaCbsFile::default();

    if let Some(caps) = DOCKER_BAKE_FILE.captures(content) {
        let path = &caps[1];
        file.docker_bake_file = Some(path.strip_prefix("./").unwrap_or(path).to_string());
    }

    if let Some(caps) = BUILD_AS.captures(content) {
        file.build_platform = Some(caps[1].to_string());
        let body_start = caps.get(0).map(|m| m.end()).unwrap_or(content.len());
        file.build_as_config = block_body(content, body_start)
            .map(str::trim)
            .filter(|body| !body.is_empty())
            .map(str::to_string);
    }

    file
}

/// Text between `start` (just after an opening brace) and its matching `}`
fn block_body(content: &str, start: usize) -> Option<&str> {
    let mut depth = 1usize;
    for (offset, ch) in content[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// The `dockerfile = "..."` entry of a bake file, if any
pub fn parse_bake_dockerfile(content: &str) -> Option<String> {
    BAKE_DOCKERFILE
        .captures(content)
        .map(|caps| caps[1].to_string())
}
