//! Controller discovery by package scope.
//!
//! Controllers register themselves in a link-time catalog; discovery filters
//! that catalog by module path. A package is written either with `::` or `.`
//! separators (`app::web` and `app.web` are the same scope).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::controller::ControllerRegistration;
use crate::error::{BuildError, Result};

/// Canonicalizes a package scope to `::` form.
///
/// Returns `Ok(None)` for a blank scope.
pub fn normalize_package(package: &str) -> Result<Option<String>> {
    let trimmed = package.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let canonical = trimmed.replace('.', "::");
    let valid = canonical.split("::").all(|segment| {
        let mut chars = segment.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    });
    if !valid {
        return Err(BuildError::UnscannablePackage(trimmed.to_string()));
    }
    Ok(Some(canonical))
}

/// Finds controllers within package scopes.
///
/// Results are memoized per package; concurrent calls for the same package
/// walk the catalog once.
#[derive(Debug)]
pub struct Discoverer {
    catalog: Vec<ControllerRegistration>,
    cache: Mutex<HashMap<String, Arc<[ControllerRegistration]>>>,
    walks: AtomicUsize,
}

impl Discoverer {
    /// Creates a discoverer over every controller linked into the binary.
    pub fn global() -> Self {
        Self::from_registrations(inventory::iter::<ControllerRegistration>().copied())
    }

    /// Creates a discoverer over an explicit catalog.
    pub fn from_registrations(registrations: impl IntoIterator<Item = ControllerRegistration>) -> Self {
        Self {
            catalog: registrations.into_iter().collect(),
            cache: Mutex::new(HashMap::new()),
            walks: AtomicUsize::new(0),
        }
    }

    /// Returns the controllers in `package` and its sub-modules.
    ///
    /// Each controller appears once. An empty result is not an error.
    pub fn discover(&self, package: &str) -> Result<Arc<[ControllerRegistration]>> {
        let Some(package) = normalize_package(package)? else {
            return Ok(Arc::from(Vec::new()));
        };

        let mut cache = self.cache.lock();
        if let Some(found) = cache.get(&package) {
            debug!(package = %package, "package already scanned");
            return Ok(Arc::clone(found));
        }

        self.walks.fetch_add(1, Ordering::Relaxed);
        let mut seen = HashSet::new();
        let found: Arc<[ControllerRegistration]> = self
            .catalog
            .iter()
            .filter(|reg| reg.is_within(&package))
            .filter(|reg| seen.insert(reg.qualified_name()))
            .copied()
            .collect();

        if found.is_empty() {
            warn!(package = %package, "no controllers found in package");
        } else {
            debug!(package = %package, count = found.len(), "discovered controllers");
        }

        cache.insert(package, Arc::clone(&found));
        Ok(found)
    }

    /// Returns how many times the catalog has been walked.
    pub fn catalog_walks(&self) -> usize {
        self.walks.load(Ordering::Relaxed)
    }
}

impl Default for Discoverer {
    fn default() -> Self {
        Self::global()
    }
}
