use thiserror::Error;

/// Terminal failure of a migration run.
///
/// The rendered message always starts with the category name so the
/// persisted `error` field can be matched on by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    #[error("InvalidURL: {0}")]
    InvalidUrl(String),
    #[error("CloneConflict: {0}")]
    CloneConflict(String),
    #[error("CloneTimeout: {0}")]
    CloneTimeout(String),
    #[error("CloneFailure: {0}")]
    CloneFailure(String),
    #[error("TemplateError: {0}")]
    TemplateError(String),
    #[error("DirtyTree: {0}")]
    DirtyTree(String),
    #[error("ValidationFailure: {0}")]
    ValidationFailure(String),
    #[error("PushFailure: {0}")]
    PushFailure(String),
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error("UnexpectedError: {0}")]
    UnexpectedError(String),
}

impl MigrationError {
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationError::InvalidUrl(_) => "InvalidURL",
            MigrationError::CloneConflict(_) => "CloneConflict",
            MigrationError::CloneTimeout(_) => "CloneTimeout",
            MigrationError::CloneFailure(_) => "CloneFailure",
            MigrationError::TemplateError(_) => "TemplateError",
            MigrationError::DirtyTree(_) => "DirtyTree",
            MigrationError::ValidationFailure(_) => "ValidationFailure",
            MigrationError::PushFailure(_) => "PushFailure",
            MigrationError::Rejected(_) => "Rejected",
            MigrationError::UnexpectedError(_) => "UnexpectedError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_starts_with_kind() {
        let errors = [
            MigrationError::InvalidUrl("x".into()),
            MigrationError::CloneTimeout("x".into()),
            MigrationError::DirtyTree("x".into()),
            MigrationError::Rejected("x".into()),
        ];
        for err in errors {
            assert!(err.to_string().starts_with(&format!("{}: ", err.kind())));
        }
    }
}
