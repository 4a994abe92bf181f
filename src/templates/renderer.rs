use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use super::CiTemplate;

/// Placeholder name to value
pub type Bindings = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template syntax error in {template}: {message}")]
    Syntax { template: String, message: String },

    #[error("Template {template} requires a value for '{name}'")]
    MissingBinding { template: String, name: String },

    #[error("Failed to render {template}: {message}")]
    Render { template: String, message: String },

    #[error("Template I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

/// Pure renderer over template text and bindings
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    fn create_env<'source>(&self, template: &str) -> Result<Environment<'source>, TemplateError> {
        let syntax = SyntaxConfig::builder()
            .block_delimiters("[%", "%]")
            .variable_delimiters("[[", "]]")
            .comment_delimiters("[#", "#]")
            .build()
            .map_err(|e| TemplateError::Syntax {
                template: template.to_string(),
                message: e.to_string(),
            })?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        Ok(env)
    }

    pub fn render(&self, template: &CiTemplate, bindings: &Bindings) -> Result<String, TemplateError> {
        self.render_str(&template.name, &template.source, bindings)
    }

    /// Render `source`, failing if any referenced placeholder has no binding.
    pub fn render_str(
        &self,
        name: &str,
        source: &str,
        bindings: &Bindings,
    ) -> Result<String, TemplateError> {
        let env = self.create_env(name)?;
        let tmpl = env
            .template_from_named_str(name, source)
            .map_err(|e| TemplateError::Syntax {
                template: name.to_string(),
                message: e.to_string(),
            })?;

        let mut required: Vec<String> = tmpl.undeclared_variables(false).into_iter().collect();
        required.sort();
        if let Some(missing) = required.into_iter().find(|var| !bindings.contains_key(var)) {
            return Err(TemplateError::MissingBinding {
                template: name.to_string(),
                name: missing,
            });
        }

        tmpl.render(bindings).map_err(|e| match e.kind() {
            ErrorKind::UndefinedError => TemplateError::MissingBinding {
                template: name.to_string(),
                name: e.detail().unwrap_or("unknown").to_string(),
            },
            _ => TemplateError::Render {
                template: name.to_string(),
                message: e.to_string(),
            },
        })
    }
}
