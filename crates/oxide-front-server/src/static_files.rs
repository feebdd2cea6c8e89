//! Static files served from a directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use oxide_front::{CollaboratorError, Request, Response, StaticResources};
use tracing::debug;

/// Joins a URL path onto `base`, refusing anything that climbs out of it.
pub fn map_path(base: &Path, url_path: &str) -> Option<PathBuf> {
    let mut path = base.to_path_buf();
    for component in Path::new(url_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(segment) => path.push(segment),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(path)
}

/// Returns the content type for a file extension.
pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase();
    match extension.as_str() {
        "html" | "htm" => "text/html;charset=UTF-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain;charset=UTF-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Serves files below a base directory.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    base_dir: PathBuf,
}

impl DirectoryResources {
    /// Creates a collaborator rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl StaticResources for DirectoryResources {
    fn exists(&self, path: &str) -> bool {
        map_path(&self.base_dir, path).is_some_and(|file| file.is_file())
    }

    fn serve(
        &self,
        path: &str,
        _request: &Request,
        response: &mut Response,
    ) -> Result<(), CollaboratorError> {
        let file = map_path(&self.base_dir, path)
            .ok_or_else(|| CollaboratorError::new(format!("invalid resource path {path}")))?;
        let bytes = fs::read(&file).map_err(|e| {
            CollaboratorError::with_source(format!("cannot read {}", file.display()), e)
        })?;

        debug!(file = %file.display(), bytes = bytes.len(), "serving file");
        response.set_content_type(content_type(&file));
        response.write_bytes(&bytes);
        Ok(())
    }
}
