//! Request resolution and result interpretation.
//!
//! Resolution order: exact static path, then dynamic routes in registration
//! order, then the static resource collaborator, then 404. On each matched
//! route the handlers are tried in declaration order and the first one whose
//! arguments bind is invoked.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::bind::{bind, Binding, PathVariable};
use crate::collaborator::{NoCollaborator, StaticResources, ViewRenderer};
use crate::error::{DispatchError, HandlerError};
use crate::handler::{HandlerDescriptor, HandlerResult};
use crate::model_view::{ModelView, REDIRECT_PREFIX};
use crate::registry::Registry;
use crate::request::Request;
use crate::response::{Response, TEXT_PLAIN_UTF8};
use crate::route::RouteDescriptor;

/// Routes requests through a sealed [`Registry`].
///
/// Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    resources: Arc<dyn StaticResources>,
    views: Arc<dyn ViewRenderer>,
}

struct Invoked {
    handler: Arc<HandlerDescriptor>,
    result: HandlerResult,
}

impl Dispatcher {
    /// Creates a dispatcher without static resources or views.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            resources: Arc::new(NoCollaborator),
            views: Arc::new(NoCollaborator),
        }
    }

    /// Sets the static resource collaborator.
    #[must_use]
    pub fn with_resources(mut self, resources: impl StaticResources + 'static) -> Self {
        self.resources = Arc::new(resources);
        self
    }

    /// Sets the view collaborator.
    #[must_use]
    pub fn with_views(mut self, views: impl ViewRenderer + 'static) -> Self {
        self.views = Arc::new(views);
        self
    }

    /// Returns the route table.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handles a request, mapping every failure to an error response.
    pub fn handle(&self, request: &mut Request) -> Response {
        let mut response = Response::ok();
        if let Err(err) = self.dispatch(request, &mut response) {
            let status = err.status_code();
            if status >= 500 {
                error!(method = %request.method, path = %request.path, error = %err, "request failed");
            } else {
                warn!(method = %request.method, path = %request.path, status, error = %err, "request rejected");
            }

            if response.is_committed() {
                debug!("response already committed, error not sent");
            } else {
                let message = match &err {
                    DispatchError::Status { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                response.send_error(status, message);
            }
        }
        response
    }

    /// Resolves the request, invokes the handler, and interprets its result.
    pub fn dispatch(&self, request: &mut Request, response: &mut Response) -> Result<(), DispatchError> {
        let path = request.route_path();
        debug!(method = %request.method, path = %path, "dispatching request");

        if let Some(route) = self.registry.lookup(&path) {
            if let Some(invoked) = self.try_handlers(route, &[], request, response)? {
                return self.interpret(invoked, request, response);
            }
            debug!(path = %path, "no handler on exact route accepted request");
        }

        for route in self.registry.dynamic_routes() {
            let Some(values) = route.match_path(&path) else {
                continue;
            };
            if let Some(invoked) = self.try_handlers(route, &values, request, response)? {
                return self.interpret(invoked, request, response);
            }
            debug!(route = route.path(), "no handler accepted request, trying next route");
        }

        if self.resources.exists(&path) {
            debug!(path = %path, "serving static resource");
            return self
                .resources
                .serve(&path, request, response)
                .map_err(|source| DispatchError::Resource { path, source });
        }

        Err(DispatchError::NotFound { path })
    }

    fn try_handlers(
        &self,
        route: &RouteDescriptor,
        values: &[String],
        request: &Request,
        response: &mut Response,
    ) -> Result<Option<Invoked>, DispatchError> {
        for candidate in route.handlers() {
            let handler = &candidate.handler;
            if !candidate.methods.allows(request.method) {
                debug!(handler = %handler.qualified_name(), method = %request.method, "verb not accepted");
                continue;
            }

            let variables = PathVariable::zip(route.param_names(), values);
            let args = match bind(handler, request, variables)? {
                Binding::Bound(args) => args,
                Binding::Rejected(reason) => {
                    debug!(handler = %handler.qualified_name(), reason = %reason, "binding rejected");
                    continue;
                }
            };

            debug!(handler = %handler.qualified_name(), "invoking handler");
            let outcome = catch_unwind(AssertUnwindSafe(|| handler.call(request, response, args)))
                .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))));

            return match outcome {
                Ok(result) => Ok(Some(Invoked {
                    handler: Arc::clone(handler),
                    result,
                })),
                Err(HandlerError::Status { status, message }) => {
                    Err(DispatchError::Status { status, message })
                }
                Err(cause) => Err(DispatchError::Handler {
                    handler: handler.qualified_name(),
                    cause,
                }),
            };
        }
        Ok(None)
    }

    fn interpret(
        &self,
        invoked: Invoked,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<(), DispatchError> {
        if response.is_committed() {
            debug!(handler = %invoked.handler.qualified_name(), "response committed by handler");
            return Ok(());
        }

        match invoked.result {
            HandlerResult::Text(text) => {
                response.set_content_type(TEXT_PLAIN_UTF8);
                response.write(&text);
                Ok(())
            }
            HandlerResult::View(model_view) => {
                self.render(&invoked.handler, model_view, request, response)
            }
            HandlerResult::Empty => Ok(()),
        }
    }

    fn render(
        &self,
        handler: &HandlerDescriptor,
        model_view: ModelView,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<(), DispatchError> {
        let (view, model) = model_view.into_parts();
        let Some(view) = view.filter(|v| !v.trim().is_empty()) else {
            return Err(DispatchError::MissingView {
                handler: handler.qualified_name(),
            });
        };

        if let Some(target) = view.strip_prefix(REDIRECT_PREFIX) {
            let target = target.trim();
            let location = if target.starts_with('/') {
                format!("{}{target}", request.context_path)
            } else {
                format!("{}/{target}", request.context_path)
            };
            debug!(location = %location, "redirecting");
            response.send_redirect(location);
            return Ok(());
        }

        for (key, value) in model {
            request.set_attribute(key, value);
        }
        debug!(view = %view, "forwarding to view");
        self.views
            .forward(&view, request, response)
            .map_err(|source| DispatchError::View { view, source })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerDescriptor;
    use crate::error::CollaboratorError;
    use crate::handler::ParamSpec;
    use crate::registry::RegistryBuilder;
    use crate::request::Method;

    fn dispatcher(controller: ControllerDescriptor) -> Dispatcher {
        let registry = RegistryBuilder::new()
            .register_descriptor(controller)
            .unwrap()
            .build();
        Dispatcher::new(Arc::new(registry))
    }

    fn items() -> ControllerDescriptor {
        ControllerDescriptor::new("Items")
            .handler(
                HandlerDescriptor::new("Items", "show")
                    .get("/items/{id}")
                    .param(ParamSpec::value::<i32>("id"))
                    .invoke(|_, _, mut args| {
                        let id: i32 = args.take()?;
                        Ok(HandlerResult::Text(format!("item {id}")))
                    }),
            )
            .handler(
                HandlerDescriptor::new("Items", "by_slug")
                    .get("/items/{slug}/view")
                    .param(ParamSpec::value::<String>("slug"))
                    .invoke(|_, _, mut args| {
                        let slug: String = args.take()?;
                        Ok(HandlerResult::Text(format!("slug {slug}")))
                    }),
            )
    }

    #[test]
    fn test_dynamic_route_binds() {
        let dispatcher = dispatcher(items());
        let response = dispatcher.handle(&mut Request::get("/items/7"));
        assert_eq!(response.status, 200);
        assert_eq!(response.body_string().unwrap(), "item 7");
        assert_eq!(response.get_header("Content-Type"), Some(TEXT_PLAIN_UTF8));
    }

    #[test]
    fn test_binding_failure_falls_through_to_404() {
        let dispatcher = dispatcher(items());
        let response = dispatcher.handle(&mut Request::get("/items/abc"));
        assert_eq!(response.status, 404);
        assert!(response.body_string().unwrap().contains("/items/abc"));
    }

    #[test]
    fn test_verb_filter() {
        let dispatcher = dispatcher(items());
        let response = dispatcher.handle(&mut Request::post("/items/7"));
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_handle_path_does_not_widen_verbs() {
        let controller = ControllerDescriptor::new("Pages").handler(
            HandlerDescriptor::new("Pages", "about")
                .get("/about")
                .handle_path("/about")
                .invoke(|_, _, _| Ok(HandlerResult::Text("about".to_string()))),
        );
        let dispatcher = dispatcher(controller);
        assert_eq!(dispatcher.handle(&mut Request::get("/about")).status, 200);
        assert_eq!(dispatcher.handle(&mut Request::post("/about")).status, 404);
    }

    #[test]
    fn test_next_handler_on_same_route_binds() {
        let controller = ControllerDescriptor::new("Lookup")
            .handler(
                HandlerDescriptor::new("Lookup", "by_id")
                    .get("/i/{id}")
                    .param(ParamSpec::value::<i32>("id"))
                    .invoke(|_, _, mut args| {
                        let id: i32 = args.take()?;
                        Ok(HandlerResult::Text(format!("id {id}")))
                    }),
            )
            .handler(
                HandlerDescriptor::new("Lookup", "by_slug")
                    .get("/i/{id}")
                    .param(ParamSpec::value::<String>("slug"))
                    .invoke(|_, _, mut args| {
                        let slug: String = args.take()?;
                        Ok(HandlerResult::Text(format!("slug {slug}")))
                    }),
            );
        let dispatcher = dispatcher(controller);
        assert_eq!(dispatcher.registry().len(), 1);

        let response = dispatcher.handle(&mut Request::get("/i/5"));
        assert_eq!(response.body_string().unwrap(), "id 5");

        let response = dispatcher.handle(&mut Request::get("/i/ab"));
        assert_eq!(response.body_string().unwrap(), "slug ab");
    }

    #[test]
    fn test_redirect_prefixes_context_path() {
        let controller = ControllerDescriptor::new("Auth").handler(
            HandlerDescriptor::new("Auth", "logout")
                .handle_path("/logout")
                .invoke(|_, _, _| Ok(HandlerResult::View(ModelView::redirect("/home")))),
        );
        let dispatcher = dispatcher(controller);
        let mut request = Request::get("/app/logout").context_path("/app");
        let response = dispatcher.handle(&mut request);
        assert_eq!(response.status, 302);
        assert_eq!(response.get_header("Location"), Some("/app/home"));
    }

    #[test]
    fn test_missing_view_is_500() {
        let controller = ControllerDescriptor::new("Home").handler(
            HandlerDescriptor::new("Home", "index")
                .get("/")
                .invoke(|_, _, _| Ok(HandlerResult::View(ModelView::new("  ")))),
        );
        let response = dispatcher(controller).handle(&mut Request::get("/"));
        assert_eq!(response.status, 500);
    }

    #[test]
    fn test_panicking_handler_is_500() {
        let controller = ControllerDescriptor::new("Boom").handler(
            HandlerDescriptor::new("Boom", "explode")
                .get("/boom")
                .invoke(|_, _, _| panic!("kaboom")),
        );
        let dispatcher = dispatcher(controller);
        let err = dispatcher
            .dispatch(&mut Request::get("/boom"), &mut Response::ok())
            .unwrap_err();
        match err {
            DispatchError::Handler { cause: HandlerError::Panicked(message), .. } => {
                assert_eq!(message, "kaboom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_status_error_passes_through() {
        let controller = ControllerDescriptor::new("Admin").handler(
            HandlerDescriptor::new("Admin", "index")
                .request_mapping("/admin", &[Method::Get])
                .invoke(|_, _, _| Err(HandlerError::status(403, "forbidden"))),
        );
        let response = dispatcher(controller).handle(&mut Request::get("/admin"));
        assert_eq!(response.status, 403);
        assert_eq!(response.body_string().unwrap(), "forbidden");
    }

    #[test]
    fn test_committed_response_is_left_alone() {
        let controller = ControllerDescriptor::new("Raw").handler(
            HandlerDescriptor::new("Raw", "write")
                .get("/raw")
                .param(ParamSpec::response("response"))
                .invoke(|_, response, _| {
                    response.write("direct");
                    response.commit();
                    Ok(HandlerResult::Text("ignored".to_string()))
                }),
        );
        let response = dispatcher(controller).handle(&mut Request::get("/raw"));
        assert_eq!(response.body_string().unwrap(), "direct");
    }

    struct OneFile;

    impl StaticResources for OneFile {
        fn exists(&self, path: &str) -> bool {
            path == "/style.css"
        }

        fn serve(
            &self,
            _path: &str,
            _request: &Request,
            response: &mut Response,
        ) -> Result<(), CollaboratorError> {
            response.set_content_type("text/css");
            response.write("body {}");
            Ok(())
        }
    }

    #[test]
    fn test_static_resource_fallback() {
        let dispatcher = dispatcher(items()).with_resources(OneFile);
        let response = dispatcher.handle(&mut Request::get("/style.css"));
        assert_eq!(response.status, 200);
        assert_eq!(response.body_string().unwrap(), "body {}");

        let response = dispatcher.handle(&mut Request::get("/missing.css"));
        assert_eq!(response.status, 404);
    }
}
