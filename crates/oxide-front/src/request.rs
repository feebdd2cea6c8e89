//! Inbound request abstraction.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value as JsonValue;

/// HTTP verbs handled by the front controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    Post,
}

impl Method {
    /// Parses a verb from a string, case-insensitively.
    ///
    /// Returns `None` for verbs the framework does not route.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            _ => None,
        }
    }

    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name to values mapping for query string and form fields.
pub type ParamMap = HashMap<String, Vec<String>>;

/// An inbound HTTP request as delivered by the hosting layer.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Request path, including the application root.
    pub path: String,
    /// Application root the front controller is mounted under (`""` for `/`).
    pub context_path: String,
    /// Query string parameters.
    pub query: ParamMap,
    /// Form fields from a url-encoded body.
    pub form: ParamMap,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Vec<u8>,
    attributes: BTreeMap<String, JsonValue>,
}

impl Request {
    /// Creates a new request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            context_path: String::new(),
            query: HashMap::new(),
            form: HashMap::new(),
            headers: HashMap::new(),
            body: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Sets the application root.
    #[must_use]
    pub fn context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Appends a query parameter value.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Appends a form field value.
    #[must_use]
    pub fn form_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Replaces the query parameters with those parsed from a raw query string.
    #[must_use]
    pub fn query_string(mut self, query: &str) -> Self {
        self.query = Self::parse_query_string(query);
        self
    }

    /// Gets a header value.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        // Case-insensitive header lookup
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Gets the first value of a query parameter.
    pub fn get_query(&self, key: &str) -> Option<&str> {
        first(&self.query, key)
    }

    /// Gets the first value of a form field.
    pub fn get_form(&self, key: &str) -> Option<&str> {
        first(&self.form, key)
    }

    /// Gets the first value of a request parameter, query string before form.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.get_query(key).or_else(|| self.get_form(key))
    }

    /// Gets every value of a request parameter, query string values first.
    pub fn param_values(&self, key: &str) -> Vec<&str> {
        self.query
            .get(key)
            .into_iter()
            .chain(self.form.get(key))
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// Returns the path relative to the application root, always with a
    /// leading `/`.
    pub fn route_path(&self) -> String {
        let relative = match self.path.strip_prefix(self.context_path.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => self.path.as_str(),
        };

        if relative.is_empty() {
            "/".to_string()
        } else if relative.starts_with('/') {
            relative.to_string()
        } else {
            format!("/{relative}")
        }
    }

    /// Sets a per-request attribute visible to the view renderer.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: JsonValue) {
        self.attributes.insert(key.into(), value);
    }

    /// Gets a per-request attribute.
    pub fn attribute(&self, key: &str) -> Option<&JsonValue> {
        self.attributes.get(key)
    }

    /// Returns all per-request attributes.
    pub fn attributes(&self) -> &BTreeMap<String, JsonValue> {
        &self.attributes
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Parses the body as url-encoded form fields when the content type says so.
    pub fn parse_form_body(&mut self) {
        let is_form = self
            .get_header("Content-Type")
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            self.form = collect_pairs(url::form_urlencoded::parse(&self.body));
        }
    }

    /// Parses query parameters from a query string.
    pub fn parse_query_string(query: &str) -> ParamMap {
        collect_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }
}

fn first<'a>(map: &'a ParamMap, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(|values| values.first())
        .map(String::as_str)
}

fn collect_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> ParamMap {
    let mut map = ParamMap::new();
    for (key, value) in pairs {
        map.entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    map
}
