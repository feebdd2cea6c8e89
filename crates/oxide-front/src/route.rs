//! Route descriptors: one canonical path and the handlers attached to it.

use std::sync::Arc;

use crate::error::{BuildError, Result};
use crate::handler::{HandlerDescriptor, MethodSet};
use crate::path::PathPattern;

/// A handler attached to a route with its effective verbs.
#[derive(Debug, Clone)]
pub struct RouteHandler {
    /// The handler declaration.
    pub handler: Arc<HandlerDescriptor>,
    /// Verbs accepted by this handler on the route.
    pub methods: MethodSet,
}

/// One canonical path owned by a single controller.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    controller: String,
    pattern: PathPattern,
    handlers: Vec<RouteHandler>,
}

impl RouteDescriptor {
    /// Creates an empty route for `controller` at `path`.
    pub fn new(controller: impl Into<String>, path: &str) -> Result<Self> {
        Ok(Self {
            controller: controller.into(),
            pattern: PathPattern::new(path)?,
            handlers: Vec::new(),
        })
    }

    /// Attaches a handler.
    ///
    /// A handler already present has its verbs folded together instead of
    /// being added twice. Handlers of another controller are rejected.
    pub fn add_handler(&mut self, handler: Arc<HandlerDescriptor>, methods: MethodSet) -> Result<()> {
        if handler.controller() != self.controller {
            return Err(BuildError::ConflictingRoute {
                path: self.path().to_string(),
                existing: self.controller.clone(),
                incoming: handler.controller().to_string(),
            });
        }

        if let Some(existing) = self
            .handlers
            .iter_mut()
            .find(|h| h.handler.name() == handler.name())
        {
            existing.methods = existing.methods.merge(methods);
        } else {
            self.handlers.push(RouteHandler { handler, methods });
        }
        Ok(())
    }

    /// Folds another route for the same path into this one.
    pub fn merge(&mut self, other: Self) -> Result<()> {
        if other.controller != self.controller {
            return Err(BuildError::ConflictingRoute {
                path: self.path().to_string(),
                existing: self.controller.clone(),
                incoming: other.controller,
            });
        }
        for RouteHandler { handler, methods } in other.handlers {
            self.add_handler(handler, methods)?;
        }
        Ok(())
    }

    /// Matches a request path, returning placeholder values in order.
    pub fn match_path(&self, path: &str) -> Option<Vec<String>> {
        self.pattern.match_path(path)
    }

    /// Returns the owning controller's identity.
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Returns the canonical path.
    pub fn path(&self) -> &str {
        self.pattern.template()
    }

    /// Returns `true` when the path has placeholders.
    pub fn is_dynamic(&self) -> bool {
        self.pattern.is_dynamic()
    }

    /// Returns the placeholder names in order.
    pub fn param_names(&self) -> &[String] {
        self.pattern.param_names()
    }

    /// Returns the attached handlers in attachment order.
    pub fn handlers(&self) -> &[RouteHandler] {
        &self.handlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;

    fn handler(controller: &str, name: &str) -> Arc<HandlerDescriptor> {
        Arc::new(HandlerDescriptor::new(controller, name))
    }

    #[test]
    fn test_add_handler_merges_verbs() {
        let mut route = RouteDescriptor::new("Users", "/users").unwrap();
        route
            .add_handler(handler("Users", "list"), MethodSet::of(&[Method::Get]))
            .unwrap();
        route
            .add_handler(handler("Users", "list"), MethodSet::of(&[Method::Post]))
            .unwrap();
        route
            .add_handler(handler("Users", "create"), MethodSet::of(&[Method::Post]))
            .unwrap();

        assert_eq!(route.handlers().len(), 2);
        assert_eq!(
            route.handlers()[0].methods,
            MethodSet::of(&[Method::Get, Method::Post])
        );
    }

    #[test]
    fn test_add_handler_from_other_controller_fails() {
        let mut route = RouteDescriptor::new("Users", "/users").unwrap();
        let err = route
            .add_handler(handler("Posts", "list"), MethodSet::ANY)
            .unwrap_err();
        assert!(matches!(err, BuildError::ConflictingRoute { .. }));
    }

    #[test]
    fn test_merge_routes() {
        let mut first = RouteDescriptor::new("Users", "/users/{id}").unwrap();
        first
            .add_handler(handler("Users", "show"), MethodSet::of(&[Method::Get]))
            .unwrap();
        let mut second = RouteDescriptor::new("Users", "/users/{id}").unwrap();
        second
            .add_handler(handler("Users", "show"), MethodSet::ANY)
            .unwrap();

        first.merge(second).unwrap();
        assert_eq!(first.handlers().len(), 1);
        assert!(first.handlers()[0].methods.is_any());
        assert!(first.is_dynamic());
        assert_eq!(first.param_names(), ["id"]);
    }
}
