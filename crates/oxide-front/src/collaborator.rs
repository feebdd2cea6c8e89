//! Hooks into the hosting layer: static files and view rendering.

use crate::error::CollaboratorError;
use crate::request::Request;
use crate::response::Response;

/// Serves files that no route claimed.
pub trait StaticResources: Send + Sync {
    /// Returns `true` when a resource exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Writes the resource at `path` into the response.
    fn serve(&self, path: &str, request: &Request, response: &mut Response)
        -> Result<(), CollaboratorError>;
}

/// Renders a view with the request attributes as its data.
pub trait ViewRenderer: Send + Sync {
    /// Renders `view` into the response.
    fn forward(&self, view: &str, request: &Request, response: &mut Response)
        -> Result<(), CollaboratorError>;
}

/// A collaborator with nothing to serve and no views.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCollaborator;

impl StaticResources for NoCollaborator {
    fn exists(&self, _path: &str) -> bool {
        false
    }

    fn serve(
        &self,
        path: &str,
        _request: &Request,
        _response: &mut Response,
    ) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::new(format!("no static resources configured for {path}")))
    }
}

impl ViewRenderer for NoCollaborator {
    fn forward(
        &self,
        view: &str,
        _request: &Request,
        _response: &mut Response,
    ) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::new(format!("no view renderer configured for {view}")))
    }
}
