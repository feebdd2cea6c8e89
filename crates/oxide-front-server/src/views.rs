//! Template views rendered with minijinja.

use std::fs;
use std::path::PathBuf;

use minijinja::Environment;
use oxide_front::{CollaboratorError, Request, Response, ViewRenderer};
use tracing::debug;

use crate::static_files::{content_type, map_path};

/// Renders `<views_dir>/<view>` with the request attributes as context.
#[derive(Debug, Clone)]
pub struct TemplateViews {
    views_dir: PathBuf,
}

impl TemplateViews {
    /// Creates a renderer over a template directory.
    pub fn new(views_dir: impl Into<PathBuf>) -> Self {
        Self {
            views_dir: views_dir.into(),
        }
    }
}

impl ViewRenderer for TemplateViews {
    fn forward(
        &self,
        view: &str,
        request: &Request,
        response: &mut Response,
    ) -> Result<(), CollaboratorError> {
        let file = map_path(&self.views_dir, view)
            .ok_or_else(|| CollaboratorError::new(format!("invalid view name {view}")))?;
        let source = fs::read_to_string(&file).map_err(|e| {
            CollaboratorError::with_source(format!("cannot read view {}", file.display()), e)
        })?;

        let mut env = Environment::new();
        env.add_template(view, &source)
            .map_err(|e| CollaboratorError::with_source(format!("cannot compile view {view}"), e))?;
        let rendered = env
            .get_template(view)
            .and_then(|template| template.render(request.attributes()))
            .map_err(|e| CollaboratorError::with_source(format!("cannot render view {view}"), e))?;

        debug!(view, bytes = rendered.len(), "rendered view");
        response.set_content_type(content_type(&file));
        response.write(&rendered);
        Ok(())
    }
}
