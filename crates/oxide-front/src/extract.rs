//! Route extraction from controller declarations.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::controller::ControllerDescriptor;
use crate::error::{BuildError, Result};
use crate::handler::{HandlerDescriptor, MethodSet, ParamKind};
use crate::path::normalize_path;
use crate::route::RouteDescriptor;

/// Resolves the single canonical path of a handler.
///
/// Blank annotations are ignored; if every annotation is blank the path is
/// `/`. Non-blank annotations must agree after normalization.
pub fn resolve_path(handler: &HandlerDescriptor) -> Result<String> {
    let mut resolved: Option<String> = None;
    for mapping in handler.mappings() {
        if mapping.path().trim().is_empty() {
            continue;
        }
        let path = normalize_path(mapping.path());
        match &resolved {
            None => resolved = Some(path),
            Some(first) if *first == path => {}
            Some(first) => {
                return Err(BuildError::ConflictingPathDeclaration {
                    handler: handler.qualified_name(),
                    first: first.clone(),
                    second: path,
                });
            }
        }
    }
    Ok(resolved.unwrap_or_else(|| "/".to_string()))
}

/// Resolves the verbs a handler accepts.
///
/// The union of every annotation's verbs. Annotations without verbs add
/// nothing; only an empty union accepts any verb.
pub fn resolve_methods(handler: &HandlerDescriptor) -> MethodSet {
    handler
        .mappings()
        .iter()
        .fold(MethodSet::ANY, |acc, m| acc.union(m.methods()))
}

/// Rejects parameters the binder can never produce.
pub fn check_params(handler: &HandlerDescriptor) -> Result<()> {
    for (index, param) in handler.params().iter().enumerate() {
        if let ParamKind::Unsupported(type_name) = &param.kind {
            return Err(BuildError::UnsupportedParameterType {
                handler: handler.qualified_name(),
                param: param.name.clone().unwrap_or_else(|| format!("#{index}")),
                type_name: type_name.clone(),
            });
        }
    }
    Ok(())
}

/// Groups a controller's handlers into one route per distinct path.
///
/// Methods without handler annotations are skipped. Routes come out in
/// first-declaration order.
pub fn extract_routes(controller: &ControllerDescriptor) -> Result<Vec<RouteDescriptor>> {
    let mut routes: Vec<RouteDescriptor> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for handler in controller.handlers() {
        if handler.mappings().is_empty() {
            continue;
        }
        check_params(handler)?;

        let path = resolve_path(handler)?;
        let methods = resolve_methods(handler);
        trace!(
            controller = controller.name(),
            handler = handler.name(),
            path = %path,
            methods = ?methods,
            "extracted handler"
        );

        let slot = match index.get(&path) {
            Some(slot) => *slot,
            None => {
                routes.push(RouteDescriptor::new(controller.name(), &path)?);
                index.insert(path, routes.len() - 1);
                routes.len() - 1
            }
        };
        routes[slot].add_handler(Arc::new(handler.clone()), methods)?;
    }

    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ParamSpec;
    use crate::request::Method;

    #[test]
    fn test_resolve_path_ignores_blank_annotations() {
        let handler = HandlerDescriptor::new("Home", "index")
            .handle_path("")
            .get("/home");
        assert_eq!(resolve_path(&handler).unwrap(), "/home");

        let all_blank = HandlerDescriptor::new("Home", "root").get("  ");
        assert_eq!(resolve_path(&all_blank).unwrap(), "/");
    }

    #[test]
    fn test_resolve_path_normalizes_before_comparing() {
        let handler = HandlerDescriptor::new("Home", "index")
            .handle_path("home")
            .get(" /home ");
        assert_eq!(resolve_path(&handler).unwrap(), "/home");
    }

    #[test]
    fn test_resolve_path_conflict() {
        let handler = HandlerDescriptor::new("Home", "index")
            .get("/a")
            .post("/b");
        let err = resolve_path(&handler).unwrap_err();
        assert!(matches!(err, BuildError::ConflictingPathDeclaration { .. }));
        assert!(err.to_string().contains("Home::index"));
    }

    #[test]
    fn test_resolve_methods() {
        let get_post = HandlerDescriptor::new("C", "m").get("/x").post("/x");
        assert_eq!(
            resolve_methods(&get_post),
            MethodSet::of(&[Method::Get, Method::Post])
        );

        let empty_verbs = HandlerDescriptor::new("C", "m").request_mapping("/x", &[]);
        assert!(resolve_methods(&empty_verbs).is_any());

        let bare = HandlerDescriptor::new("C", "m").handle_path("/x");
        assert!(resolve_methods(&bare).is_any());
    }

    #[test]
    fn test_resolve_methods_ignores_verbless_annotations() {
        let with_handle_path = HandlerDescriptor::new("C", "m").get("/x").handle_path("/x");
        assert_eq!(resolve_methods(&with_handle_path), MethodSet::of(&[Method::Get]));

        let with_empty_mapping = HandlerDescriptor::new("C", "m")
            .request_mapping("/x", &[])
            .post("/x");
        assert_eq!(resolve_methods(&with_empty_mapping), MethodSet::of(&[Method::Post]));
    }

    #[test]
    fn test_extract_groups_by_path() {
        let controller = ControllerDescriptor::new("Users")
            .handler(HandlerDescriptor::new("Users", "list").get("/users"))
            .handler(HandlerDescriptor::new("Users", "create").post("users"))
            .handler(HandlerDescriptor::new("Users", "show").get("/users/{id}"))
            .handler(HandlerDescriptor::new("Users", "helper"));

        let routes = extract_routes(&controller).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].path(), "/users");
        assert_eq!(routes[0].handlers().len(), 2);
        assert_eq!(routes[1].path(), "/users/{id}");
        assert!(routes[1].is_dynamic());
    }

    #[test]
    fn test_extract_rejects_unsupported_params() {
        let controller = ControllerDescriptor::new("Files").handler(
            HandlerDescriptor::new("Files", "upload")
                .post("/upload")
                .param(ParamSpec::unsupported("file", "Vec<u8>")),
        );
        assert!(matches!(
            extract_routes(&controller),
            Err(BuildError::UnsupportedParameterType { .. })
        ));
    }

    #[test]
    fn test_extract_rejects_empty_placeholder() {
        let controller = ControllerDescriptor::new("Users")
            .handler(HandlerDescriptor::new("Users", "show").get("/users/{}"));
        assert!(matches!(
            extract_routes(&controller),
            Err(BuildError::EmptyPlaceholderName(_))
        ));
    }
}
