//! Template rendering.

use std::path::Path;

use minijinja::Environment;

use crate::render::{RenderContext, RenderError};

const TEMPLATE_NAME: &str = "api_backends";

/// Pure function from context to document text.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, context: &RenderContext) -> Result<String, RenderError>;
}

/// Jinja-syntax template renderer.
///
/// The source is compiled once on construction so a broken template fails at
/// startup rather than on the first pass.
pub struct JinjaRenderer {
    env: Environment<'static>,
}

impl JinjaRenderer {
    pub fn from_source(source: impl Into<String>) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.add_template_owned(TEMPLATE_NAME, source.into())?;
        Ok(Self { env })
    }

    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let source = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Template loaded");
        Self::from_source(source)
    }
}

impl TemplateRenderer for JinjaRenderer {
    fn render(&self, context: &RenderContext) -> Result<String, RenderError> {
        let template = self.env.get_template(TEMPLATE_NAME)?;
        Ok(template.render(context)?)
    }
}
