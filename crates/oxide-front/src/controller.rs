//! Controllers and their link-time catalog.

use crate::handler::HandlerDescriptor;

/// A type whose annotated methods handle requests.
///
/// Implemented by `#[controller]`. A fresh instance is created through
/// [`Default`] for every invocation.
pub trait Controller: Default + 'static {
    /// Returns the controller's identity and handler declarations.
    fn describe() -> ControllerDescriptor;
}

/// A controller's identity and the handlers it declares.
#[derive(Debug, Clone)]
pub struct ControllerDescriptor {
    name: String,
    handlers: Vec<HandlerDescriptor>,
}

impl ControllerDescriptor {
    /// Creates an empty descriptor with the given identity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
        }
    }

    /// Creates an empty descriptor named after `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    /// Adds a handler.
    #[must_use]
    pub fn handler(mut self, handler: HandlerDescriptor) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Returns the controller identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared handlers in declaration order.
    pub fn handlers(&self) -> &[HandlerDescriptor] {
        &self.handlers
    }
}

/// A catalog entry submitted by `#[controller]`.
#[derive(Debug, Clone, Copy)]
pub struct ControllerRegistration {
    /// `module_path!()` of the controller's defining module.
    pub module_path: &'static str,
    /// The controller type name as written.
    pub type_name: &'static str,
    /// Builds the controller's descriptor.
    pub describe: fn() -> ControllerDescriptor,
}

impl ControllerRegistration {
    /// Creates a catalog entry.
    pub const fn new(
        module_path: &'static str,
        type_name: &'static str,
        describe: fn() -> ControllerDescriptor,
    ) -> Self {
        Self {
            module_path,
            type_name,
            describe,
        }
    }

    /// Returns `module_path::TypeName`.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module_path, self.type_name)
    }

    /// Returns `true` when the controller lives in `package` or below it.
    ///
    /// `package` must already be in `::` form.
    pub fn is_within(&self, package: &str) -> bool {
        self.module_path
            .strip_prefix(package)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    }
}

inventory::collect!(ControllerRegistration);

#[cfg(test)]
mod tests {
    use super::*;

    fn describe() -> ControllerDescriptor {
        ControllerDescriptor::new("app::web::Home")
    }

    #[test]
    fn test_is_within_respects_segments() {
        let reg = ControllerRegistration::new("app::web", "Home", describe);
        assert!(reg.is_within("app"));
        assert!(reg.is_within("app::web"));
        assert!(!reg.is_within("app::we"));
        assert!(!reg.is_within("app::web::admin"));
        assert_eq!(reg.qualified_name(), "app::web::Home");
    }

    #[test]
    fn test_descriptor_of_type() {
        struct Probe;
        let descriptor = ControllerDescriptor::of::<Probe>();
        assert!(descriptor.name().ends_with("Probe"));
        assert!(descriptor.handlers().is_empty());
    }
}
