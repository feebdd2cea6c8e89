//! # oxide-front
//!
//! A front controller: one entry point that routes every request to an
//! annotated controller method.
//!
//! This crate provides:
//! - Controller discovery by module path
//! - Path templates with `{name}` placeholders
//! - A route table built once and shared across threads
//! - Argument binding from path variables, query strings, and form fields
//! - Interpretation of text and view + model results
//!
//! ## Quick Start
//!
//! ```ignore
//! use oxide_front::{controller, Discoverer, Dispatcher, ModelView, Registry, Request};
//!
//! #[derive(Default)]
//! pub struct Users;
//!
//! #[controller]
//! impl Users {
//!     #[get_mapping("/users/{id}")]
//!     fn show(&self, id: i64) -> String {
//!         format!("user {id}")
//!     }
//!
//!     #[get_mapping("/users")]
//!     fn list(&self, #[request_param("q")] query: Option<String>) -> ModelView {
//!         ModelView::new("users/list.html").with("query", query)
//!     }
//! }
//!
//! let registry = Registry::scan_packages(&Discoverer::global(), ["my_app::web"])?;
//! let dispatcher = Dispatcher::new(std::sync::Arc::new(registry));
//! let response = dispatcher.handle(&mut Request::get("/users/42"));
//! assert_eq!(response.body_string().unwrap(), "user 42");
//! ```
//!
//! ## Resolution Order
//!
//! 1. The exact path is looked up among static routes.
//! 2. Dynamic routes are tried in registration order.
//! 3. Within a route, handlers are tried in declaration order; the first
//!    whose arguments bind is invoked.
//! 4. Unclaimed paths go to the static resource collaborator.
//! 5. Anything left is a 404.
//!
//! ## Parameters
//!
//! Handler parameters are `&Request`, `&mut Response`, or any [`FromParam`]
//! type. Each value parameter is resolved from a path variable with the same
//! name, then a query or form field, then the next unused path variable.
//! `#[request_param("name")]` binds by an explicit name and disables the
//! positional fallback.
//!
//! ```ignore
//! #[derive(ParamEnum)]
//! enum Sort {
//!     Newest,
//!     Oldest,
//! }
//!
//! #[controller]
//! impl Posts {
//!     #[request_mapping(path = "/posts/{post_id}/comments", method = [GET])]
//!     fn comments(&self, post_id: u64, sort: Sort, page: Option<u32>) -> String {
//!         todo!()
//!     }
//! }
//! ```

mod bind;
mod collaborator;
mod config;
mod controller;
mod discover;
mod dispatcher;
mod error;
mod extract;
mod handler;
mod model_view;
mod path;
mod registry;
mod request;
mod response;
mod route;
mod value;

pub use bind::{bind, Binding, PathVariable, Rejection};
pub use collaborator::{NoCollaborator, StaticResources, ViewRenderer};
pub use config::{FrontConfig, PACKAGES_PARAM};
pub use controller::{Controller, ControllerDescriptor, ControllerRegistration};
pub use discover::{normalize_package, Discoverer};
pub use dispatcher::Dispatcher;
pub use error::{BuildError, CollaboratorError, DispatchError, HandlerError, Result};
pub use extract::{extract_routes, resolve_methods, resolve_path};
pub use handler::{
    BoundArgs, HandlerDescriptor, HandlerFn, HandlerResult, IntoHandlerResult, Mapping, MethodSet,
    ParamKind, ParamSpec,
};
pub use model_view::{ModelView, REDIRECT_PREFIX};
pub use oxide_front_macros::{controller, ParamEnum};
pub use path::{normalize_path, PathPattern, PathSegment};
pub use registry::{Registry, RegistryBuilder};
pub use request::{Method, ParamMap, Request};
pub use response::{Response, TEXT_PLAIN_UTF8};
pub use route::{RouteDescriptor, RouteHandler};
pub use value::{enum_from_value, ConversionError, FromParam, ParamEnum, Value, ValueType};

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}
