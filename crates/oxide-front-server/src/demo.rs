//! Controllers served when no package is configured.

use oxide_front::{controller, HandlerError, ModelView, ParamEnum, Request};

/// Package scanned by default.
pub const PACKAGE: &str = module_path!();

#[derive(Default)]
pub struct Home;

#[controller]
impl Home {
    #[get_mapping("/")]
    fn index(&self, request: &Request) -> ModelView {
        ModelView::new("index.html")
            .with("title", "oxide-front")
            .with("path", request.path.clone())
    }

    #[get_mapping("/home")]
    fn home(&self) -> ModelView {
        ModelView::redirect("/")
    }

    #[get_mapping("/hello/{name}")]
    fn hello(&self, name: String) -> String {
        format!("Hello, {name}!")
    }

    #[request_mapping(path = "/echo", method = [GET, POST])]
    fn echo(&self, #[request_param("msg")] message: Option<String>) -> Result<String, HandlerError> {
        message.ok_or_else(|| HandlerError::status(400, "missing msg parameter"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ParamEnum)]
pub enum Unit {
    Celsius,
    Fahrenheit,
}

#[derive(Default)]
pub struct Temperatures;

#[controller]
impl Temperatures {
    #[get_mapping("/convert/{value}")]
    fn convert(&self, value: f64, to: Unit) -> String {
        match to {
            Unit::Celsius => format!("{:.1} C", (value - 32.0) * 5.0 / 9.0),
            Unit::Fahrenheit => format!("{:.1} F", value * 9.0 / 5.0 + 32.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use oxide_front::{Discoverer, Dispatcher, Registry, Request};

    use super::*;

    fn dispatcher() -> Dispatcher {
        let registry = Registry::scan_packages(&Discoverer::global(), [PACKAGE]).unwrap();
        Dispatcher::new(Arc::new(registry))
    }

    #[test]
    fn test_demo_routes() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.registry().len(), 5);

        let response = dispatcher.handle(&mut Request::get("/hello/Ada"));
        assert_eq!(response.body_string().unwrap(), "Hello, Ada!");

        let response = dispatcher.handle(&mut Request::get("/home"));
        assert_eq!(response.status, 302);
        assert_eq!(response.get_header("Location"), Some("/"));
    }

    #[test]
    fn test_echo_requires_message() {
        let dispatcher = dispatcher();
        let mut request = Request::post("/echo").form_param("msg", "hi");
        assert_eq!(dispatcher.handle(&mut request).body_string().unwrap(), "hi");

        let response = dispatcher.handle(&mut Request::get("/echo"));
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_convert_binds_enum_from_query() {
        let dispatcher = dispatcher();
        let mut request = Request::get("/convert/100").query_string("to=celsius");
        assert_eq!(dispatcher.handle(&mut request).body_string().unwrap(), "37.8 C");

        let mut request = Request::get("/convert/100").query_string("to=kelvin");
        assert_eq!(dispatcher.handle(&mut request).status, 404);
    }
}
