//! # oxide-front-server
//!
//! Hosts an oxide-front [`Dispatcher`](oxide_front::Dispatcher) over HTTP/1.1
//! with hyper, serving unclaimed paths from a static directory and rendering
//! views with minijinja templates.

pub mod host;
pub mod static_files;
pub mod views;

pub use host::{convert_request, handle_request, into_hyper, read_body, serve, MAX_BODY_BYTES};
pub use static_files::DirectoryResources;
pub use views::TemplateViews;
