//! Handler declarations: mappings, parameter plans, and invocation.

use std::fmt;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::model_view::ModelView;
use crate::request::{Method, Request};
use crate::response::Response;
use crate::value::{FromParam, Value, ValueType};

/// One handler annotation on a controller method.
///
/// The four forms are compatible with each other; a method may carry several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapping {
    /// Generic path declaration, any verb.
    HandlePath(String),
    /// Path plus an explicit verb set.
    Request {
        /// Declared path.
        path: String,
        /// Declared verbs; empty means any.
        methods: Vec<Method>,
    },
    /// GET shorthand.
    Get(String),
    /// POST shorthand.
    Post(String),
}

impl Mapping {
    /// Returns the declared path value, possibly blank.
    pub fn path(&self) -> &str {
        match self {
            Self::HandlePath(path) | Self::Get(path) | Self::Post(path) => path,
            Self::Request { path, .. } => path,
        }
    }

    /// Returns the verbs this annotation declares.
    pub fn methods(&self) -> MethodSet {
        match self {
            Self::HandlePath(_) => MethodSet::ANY,
            Self::Request { methods, .. } => MethodSet::of(methods),
            Self::Get(_) => MethodSet::of(&[Method::Get]),
            Self::Post(_) => MethodSet::of(&[Method::Post]),
        }
    }
}

/// A set of HTTP verbs. The empty set accepts any verb.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MethodSet(u8);

impl MethodSet {
    /// The unconditional set.
    pub const ANY: Self = Self(0);

    const fn bit(method: Method) -> u8 {
        match method {
            Method::Get => 0b01,
            Method::Post => 0b10,
        }
    }

    /// Builds a set from a list of verbs.
    pub fn of(methods: &[Method]) -> Self {
        Self(methods.iter().fold(0, |acc, m| acc | Self::bit(*m)))
    }

    /// Returns the union of both sets.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Folds another declaration of the same handler into this one.
    ///
    /// Unconditional on either side stays unconditional.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        if self.is_any() || other.is_any() {
            Self::ANY
        } else {
            self.union(other)
        }
    }

    /// Returns `true` when the set accepts any verb.
    pub fn is_any(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` when a request with `method` may reach the handler.
    pub fn allows(self, method: Method) -> bool {
        self.is_any() || self.0 & Self::bit(method) != 0
    }

    /// Returns the verbs explicitly in the set.
    pub fn methods(self) -> Vec<Method> {
        [Method::Get, Method::Post]
            .into_iter()
            .filter(|m| self.0 & Self::bit(*m) != 0)
            .collect()
    }
}

impl fmt::Debug for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            f.write_str("ANY")
        } else {
            f.debug_set().entries(self.methods()).finish()
        }
    }
}

/// Where a handler parameter gets its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// The inbound request.
    Request,
    /// The outbound response.
    Response,
    /// A path variable, query parameter, or form field converted to a type.
    Value(ValueType),
    /// A type the binder cannot produce.
    Unsupported(String),
}

/// One declared parameter of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// The parameter's own declared name.
    pub name: Option<String>,
    /// Explicit binding name from `#[request_param("..")]`.
    pub explicit: Option<String>,
    /// Binding source.
    pub kind: ParamKind,
}

impl ParamSpec {
    fn with_kind(name: &str, kind: ParamKind) -> Self {
        Self {
            name: (!name.is_empty()).then(|| name.to_string()),
            explicit: None,
            kind,
        }
    }

    /// A parameter receiving the inbound request.
    pub fn request(name: &str) -> Self {
        Self::with_kind(name, ParamKind::Request)
    }

    /// A parameter receiving the outbound response.
    pub fn response(name: &str) -> Self {
        Self::with_kind(name, ParamKind::Response)
    }

    /// A parameter bound from request text as `T`.
    pub fn value<T: FromParam>(name: &str) -> Self {
        Self::with_kind(name, ParamKind::Value(T::TYPE))
    }

    /// A parameter bound from request text with an explicit conversion.
    pub fn typed(name: &str, ty: ValueType) -> Self {
        Self::with_kind(name, ParamKind::Value(ty))
    }

    /// A parameter whose declared type cannot be bound.
    pub fn unsupported(name: &str, type_name: &str) -> Self {
        Self::with_kind(name, ParamKind::Unsupported(type_name.to_string()))
    }

    /// Sets the explicit binding name.
    #[must_use]
    pub fn named(mut self, explicit: &str) -> Self {
        self.explicit = Some(explicit.to_string());
        self
    }

    /// Returns the names to look the parameter up by, explicit name first.
    pub fn candidate_names(&self) -> Vec<&str> {
        let explicit = self
            .explicit
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let mut names: Vec<&str> = explicit.into_iter().collect();
        if let Some(name) = self.name.as_deref() {
            if explicit != Some(name) {
                names.push(name);
            }
        }
        names
    }

    /// Returns `true` when the parameter carries an explicit binding name.
    pub fn has_explicit_name(&self) -> bool {
        self.explicit.is_some()
    }
}

/// Arguments produced by a successful binding, one per value parameter in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: Vec<Option<Value>>,
    cursor: usize,
}

impl BoundArgs {
    /// Wraps converted values.
    pub fn new(values: Vec<Option<Value>>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Takes the next value and converts it into the parameter type.
    pub fn take<T: FromParam>(&mut self) -> Result<T, HandlerError> {
        let value = self.values.get_mut(self.cursor).and_then(Option::take);
        self.cursor += 1;
        T::from_value(value)
    }

    /// Returns the converted values.
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    /// Plain text written verbatim as the body.
    Text(String),
    /// A view + model forward or redirect.
    View(ModelView),
    /// Nothing to write.
    Empty,
}

/// Conversion of handler return values into a [`HandlerResult`].
pub trait IntoHandlerResult {
    /// Performs the conversion.
    fn into_handler_result(self) -> Result<HandlerResult, HandlerError>;
}

impl IntoHandlerResult for HandlerResult {
    fn into_handler_result(self) -> Result<HandlerResult, HandlerError> {
        Ok(self)
    }
}

impl IntoHandlerResult for String {
    fn into_handler_result(self) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::Text(self))
    }
}

impl IntoHandlerResult for &str {
    fn into_handler_result(self) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::Text(self.to_string()))
    }
}

impl IntoHandlerResult for ModelView {
    fn into_handler_result(self) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::View(self))
    }
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::Empty)
    }
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: IntoHandlerResult,
    E: Into<HandlerError>,
{
    fn into_handler_result(self) -> Result<HandlerResult, HandlerError> {
        self.map_err(Into::into)?.into_handler_result()
    }
}

/// A type-erased handler invocation.
///
/// Receives the live request and response plus the bound arguments, creates
/// a fresh controller, and calls the method.
pub type HandlerFn =
    Arc<dyn Fn(&Request, &mut Response, BoundArgs) -> Result<HandlerResult, HandlerError> + Send + Sync>;

/// One invocable method on a controller.
#[derive(Clone)]
pub struct HandlerDescriptor {
    controller: String,
    name: String,
    mappings: Vec<Mapping>,
    params: Vec<ParamSpec>,
    invoke: HandlerFn,
}

impl HandlerDescriptor {
    /// Creates a handler with no mappings, no parameters, and an empty result.
    pub fn new(controller: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            name: name.into(),
            mappings: Vec::new(),
            params: Vec::new(),
            invoke: Arc::new(no_op),
        }
    }

    /// Adds a generic path annotation.
    #[must_use]
    pub fn handle_path(self, path: &str) -> Self {
        self.mapping(Mapping::HandlePath(path.to_string()))
    }

    /// Adds a path + verbs annotation.
    #[must_use]
    pub fn request_mapping(self, path: &str, methods: &[Method]) -> Self {
        self.mapping(Mapping::Request {
            path: path.to_string(),
            methods: methods.to_vec(),
        })
    }

    /// Adds a GET annotation.
    #[must_use]
    pub fn get(self, path: &str) -> Self {
        self.mapping(Mapping::Get(path.to_string()))
    }

    /// Adds a POST annotation.
    #[must_use]
    pub fn post(self, path: &str) -> Self {
        self.mapping(Mapping::Post(path.to_string()))
    }

    /// Adds an annotation.
    #[must_use]
    pub fn mapping(mut self, mapping: Mapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Appends a declared parameter.
    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Sets the invocation.
    #[must_use]
    pub fn invoke<F>(mut self, invoke: F) -> Self
    where
        F: Fn(&Request, &mut Response, BoundArgs) -> Result<HandlerResult, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.invoke = Arc::new(invoke);
        self
    }

    /// Returns the owning controller's identity.
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Returns the method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `controller::name`.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.controller, self.name)
    }

    /// Returns the handler annotations.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Returns the declared parameters.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Calls the handler.
    pub fn call(
        &self,
        request: &Request,
        response: &mut Response,
        args: BoundArgs,
    ) -> Result<HandlerResult, HandlerError> {
        (self.invoke)(request, response, args)
    }
}

fn no_op(_: &Request, _: &mut Response, _: BoundArgs) -> Result<HandlerResult, HandlerError> {
    Ok(HandlerResult::Empty)
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("controller", &self.controller)
            .field("name", &self.name)
            .field("mappings", &self.mappings)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_set_allows() {
        let any = MethodSet::ANY;
        assert!(any.allows(Method::Get));
        assert!(any.allows(Method::Post));

        let get = MethodSet::of(&[Method::Get]);
        assert!(get.allows(Method::Get));
        assert!(!get.allows(Method::Post));
        assert_eq!(get.methods(), vec![Method::Get]);
    }

    #[test]
    fn test_method_set_merge() {
        let get = MethodSet::of(&[Method::Get]);
        let post = MethodSet::of(&[Method::Post]);

        assert_eq!(get.merge(post), MethodSet::of(&[Method::Get, Method::Post]));
        assert!(MethodSet::ANY.merge(post).is_any());
        assert!(get.merge(MethodSet::ANY).is_any());
    }

    #[test]
    fn test_mapping_methods() {
        assert!(Mapping::HandlePath("/a".to_string()).methods().is_any());
        assert_eq!(
            Mapping::Get(String::new()).methods(),
            MethodSet::of(&[Method::Get])
        );
        let both = Mapping::Request {
            path: "/a".to_string(),
            methods: vec![Method::Get, Method::Post],
        };
        assert_eq!(both.path(), "/a");
        assert!(both.methods().allows(Method::Post));
    }

    #[test]
    fn test_candidate_names() {
        let plain = ParamSpec::value::<i64>("id");
        assert_eq!(plain.candidate_names(), vec!["id"]);

        let renamed = ParamSpec::value::<i64>("id").named("user_id");
        assert_eq!(renamed.candidate_names(), vec!["user_id", "id"]);

        let same = ParamSpec::value::<i64>("id").named("id");
        assert_eq!(same.candidate_names(), vec!["id"]);
        assert!(same.has_explicit_name());
    }

    #[test]
    fn test_bound_args_take_in_order() {
        let mut args = BoundArgs::new(vec![Some(Value::Int(7)), None]);
        assert_eq!(args.take::<i32>().unwrap(), 7);
        assert_eq!(args.take::<String>().unwrap(), "");
        assert_eq!(args.take::<Option<i32>>().unwrap(), None);
    }

    #[test]
    fn test_into_handler_result() {
        assert_eq!(
            "hi".into_handler_result().unwrap(),
            HandlerResult::Text("hi".to_string())
        );
        assert_eq!(().into_handler_result().unwrap(), HandlerResult::Empty);

        let failed: Result<String, std::fmt::Error> = Err(std::fmt::Error);
        assert!(matches!(
            failed.into_handler_result(),
            Err(HandlerError::Failed(_))
        ));
    }
}
