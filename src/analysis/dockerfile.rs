//! Dockerfile helpers

use std::path::Path;

/// More than one `FROM` instruction, ignoring comments
pub fn is_multi_stage(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            line.get(..4)
                .is_some_and(|word| word.eq_ignore_ascii_case("FROM"))
        })
        .count()
        > 1
}

/// Path of the `-argo` variant of a repository-relative Dockerfile path.
///
/// `Dockerfile` becomes `Dockerfile-argo`, `build/app.Dockerfile` becomes
/// `build/app-argo.Dockerfile`.
pub fn argo_path(dockerfile_path: &str) -> String {
    let path = Path::new(dockerfile_path);
    let file_name = match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!("{}-argo.{}", stem.to_string_lossy(), ext.to_string_lossy()),
        _ => format!(
            "{}-argo",
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| dockerfile_path.to_string())
        ),
    };

    match path.parent().map(|p| p.to_string_lossy().to_string()) {
        Some(parent) if !parent.is_empty() && parent != "." => format!("{parent}/{file_name}"),
        _ => file_name,
    }
}
