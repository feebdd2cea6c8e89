//! The sealed route table.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::config::FrontConfig;
use crate::controller::{Controller, ControllerDescriptor};
use crate::discover::{normalize_package, Discoverer};
use crate::error::Result;
use crate::extract::extract_routes;
use crate::route::RouteDescriptor;

/// Accumulates controllers and merges their routes.
///
/// # Example
///
/// ```
/// use oxide_front::{ControllerDescriptor, HandlerDescriptor, RegistryBuilder};
///
/// let home = ControllerDescriptor::new("Home")
///     .handler(HandlerDescriptor::new("Home", "index").get("/"));
/// let registry = RegistryBuilder::new()
///     .register_descriptor(home)
///     .unwrap()
///     .build();
/// assert!(registry.lookup("/").is_some());
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    routes: Vec<RouteDescriptor>,
    index: HashMap<String, usize>,
    controllers: HashSet<String>,
    packages: HashSet<String>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every controller found under `package`.
    ///
    /// Scanning a package twice is a no-op.
    pub fn scan(mut self, discoverer: &Discoverer, package: &str) -> Result<Self> {
        let Some(canonical) = normalize_package(package)? else {
            return Ok(self);
        };
        if !self.packages.insert(canonical.clone()) {
            debug!(package = %canonical, "package already registered");
            return Ok(self);
        }

        for registration in discoverer.discover(&canonical)?.iter() {
            self = self.register_descriptor((registration.describe)())?;
        }
        Ok(self)
    }

    /// Registers a controller type.
    pub fn register<C: Controller>(self) -> Result<Self> {
        self.register_descriptor(C::describe())
    }

    /// Registers a controller from its descriptor.
    ///
    /// A controller already registered is skipped.
    pub fn register_descriptor(mut self, controller: ControllerDescriptor) -> Result<Self> {
        if !self.controllers.insert(controller.name().to_string()) {
            debug!(controller = controller.name(), "controller already registered");
            return Ok(self);
        }

        for route in extract_routes(&controller)? {
            self.merge(route)?;
        }
        Ok(self)
    }

    fn merge(&mut self, route: RouteDescriptor) -> Result<()> {
        match self.index.get(route.path()) {
            Some(slot) => self.routes[*slot].merge(route),
            None => {
                self.index.insert(route.path().to_string(), self.routes.len());
                self.routes.push(route);
                Ok(())
            }
        }
    }

    /// Seals the route table.
    pub fn build(self) -> Registry {
        let mut static_routes = HashMap::new();
        let mut dynamic_routes = Vec::new();

        for route in self.routes {
            info!(
                path = route.path(),
                controller = route.controller(),
                handlers = route.handlers().len(),
                "registered route"
            );
            if route.is_dynamic() {
                dynamic_routes.push(route);
            } else {
                static_routes.insert(route.path().to_string(), route);
            }
        }

        Registry {
            static_routes,
            dynamic_routes,
        }
    }
}

/// An immutable route table.
///
/// Static paths are looked up directly; dynamic paths are tried in
/// registration order.
#[derive(Debug, Default)]
pub struct Registry {
    static_routes: HashMap<String, RouteDescriptor>,
    dynamic_routes: Vec<RouteDescriptor>,
}

impl Registry {
    /// Builds a registry from every controller under the given packages.
    pub fn scan_packages<I, S>(discoverer: &Discoverer, packages: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = RegistryBuilder::new();
        for package in packages {
            builder = builder.scan(discoverer, package.as_ref())?;
        }
        Ok(builder.build())
    }

    /// Builds a registry from the configured packages.
    pub fn from_config(config: &FrontConfig, discoverer: &Discoverer) -> Result<Self> {
        Self::scan_packages(discoverer, &config.packages)
    }

    /// Returns the route registered for an exact static path.
    pub fn lookup(&self, path: &str) -> Option<&RouteDescriptor> {
        self.static_routes.get(path)
    }

    /// Returns the dynamic routes in the order they are tried.
    pub fn dynamic_routes(&self) -> &[RouteDescriptor] {
        &self.dynamic_routes
    }

    /// Iterates over every route, static ones first.
    pub fn routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.static_routes.values().chain(self.dynamic_routes.iter())
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.static_routes.len() + self.dynamic_routes.len()
    }

    /// Returns `true` when no route is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerRegistration;
    use crate::error::BuildError;
    use crate::handler::HandlerDescriptor;

    fn users() -> ControllerDescriptor {
        ControllerDescriptor::new("app::Users")
            .handler(HandlerDescriptor::new("app::Users", "list").get("/users"))
            .handler(HandlerDescriptor::new("app::Users", "show").get("/users/{id}"))
    }

    fn posts() -> ControllerDescriptor {
        ControllerDescriptor::new("app::Posts")
            .handler(HandlerDescriptor::new("app::Posts", "show").get("/posts/{id}"))
            .handler(HandlerDescriptor::new("app::Posts", "latest").get("/posts/latest"))
    }

    #[test]
    fn test_static_and_dynamic_split() {
        let registry = RegistryBuilder::new()
            .register_descriptor(users())
            .unwrap()
            .register_descriptor(posts())
            .unwrap()
            .build();

        assert_eq!(registry.len(), 4);
        assert!(registry.lookup("/users").is_some());
        assert!(registry.lookup("/users/{id}").is_none());
        let dynamic: Vec<&str> = registry
            .dynamic_routes()
            .iter()
            .map(RouteDescriptor::path)
            .collect();
        assert_eq!(dynamic, vec!["/users/{id}", "/posts/{id}"]);
    }

    #[test]
    fn test_conflicting_controllers() {
        let other = ControllerDescriptor::new("app::Admin")
            .handler(HandlerDescriptor::new("app::Admin", "list").post("/users"));
        let err = RegistryBuilder::new()
            .register_descriptor(users())
            .unwrap()
            .register_descriptor(other)
            .unwrap_err();
        assert!(matches!(err, BuildError::ConflictingRoute { .. }));
    }

    #[test]
    fn test_same_controller_overloads_merge() {
        let controller = ControllerDescriptor::new("app::Items")
            .handler(HandlerDescriptor::new("app::Items", "by_id").get("/items/{id}"))
            .handler(HandlerDescriptor::new("app::Items", "by_slug").get("/items/{slug}"))
            .handler(HandlerDescriptor::new("app::Items", "update").post("/items/{id}"));
        let registry = RegistryBuilder::new()
            .register_descriptor(controller)
            .unwrap()
            .build();

        assert_eq!(registry.dynamic_routes().len(), 2);
        assert_eq!(registry.dynamic_routes()[0].handlers().len(), 2);
    }

    #[test]
    fn test_register_twice_is_noop() {
        let registry = RegistryBuilder::new()
            .register_descriptor(users())
            .unwrap()
            .register_descriptor(users())
            .unwrap()
            .build();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("/users").unwrap().handlers().len(), 1);
    }

    #[test]
    fn test_scan_packages_once() {
        let discoverer = Discoverer::from_registrations([
            ControllerRegistration::new("app", "Users", users),
            ControllerRegistration::new("app", "Posts", posts),
        ]);
        let registry = Registry::scan_packages(&discoverer, ["app", "app", "app::nothing"]).unwrap();

        assert_eq!(registry.len(), 4);
        assert_eq!(discoverer.catalog_walks(), 2);
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
