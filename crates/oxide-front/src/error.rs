//! Error types for route table construction and request dispatch.

use std::fmt;

use thiserror::Error;

/// Configuration errors detected while building the route table.
///
/// All of these are fatal: a registry that fails to build cannot be
/// corrected per-request.
#[derive(Debug, Error)]
pub enum BuildError {
    /// One handler carries path annotations that disagree.
    #[error("conflicting path declarations on handler {handler}: {first} vs {second}")]
    ConflictingPathDeclaration {
        /// Fully qualified handler name.
        handler: String,
        /// The first resolved path.
        first: String,
        /// The disagreeing path.
        second: String,
    },

    /// Two different controllers claim the same path.
    #[error("conflicting controllers for path {path}: {existing} vs {incoming}")]
    ConflictingRoute {
        /// The canonical path.
        path: String,
        /// Controller already owning the path.
        existing: String,
        /// Controller trying to claim it.
        incoming: String,
    },

    /// A `{}` placeholder without a name.
    #[error("dynamic segment name cannot be empty in path: {0}")]
    EmptyPlaceholderName(String),

    /// The compiled matcher for a template was rejected.
    #[error("invalid path pattern {template}: {reason}")]
    InvalidPattern {
        /// The template being compiled.
        template: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configured package scope is not a valid module path.
    #[error("cannot scan controller package '{0}'")]
    UnscannablePackage(String),

    /// A handler declares a parameter the binder can never produce.
    #[error("unsupported parameter type {type_name} for parameter '{param}' of {handler}")]
    UnsupportedParameterType {
        /// Fully qualified handler name.
        handler: String,
        /// Declared parameter name.
        param: String,
        /// The declared type as written.
        type_name: String,
    },
}

/// Result type alias for route table construction.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Failure reported by an external collaborator (static files, views).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CollaboratorError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CollaboratorError {
    /// Creates an error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Errors a handler can return.
///
/// Does not implement [`std::error::Error`]; any error type converts into it
/// with `?`.
pub enum HandlerError {
    /// An error already shaped for the client; passed through unchanged.
    Status {
        /// HTTP status code to send.
        status: u16,
        /// Message to send.
        message: String,
    },
    /// Any other failure; surfaced as a 500.
    Failed(Box<dyn std::error::Error + Send + Sync>),
    /// The handler panicked.
    Panicked(String),
}

impl HandlerError {
    /// Creates a client-shaped error with the given status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Creates a generic failure from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Failed(message.into())
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::Failed(Box::new(error))
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, message } => f
                .debug_struct("Status")
                .field("status", status)
                .field("message", message)
                .finish(),
            Self::Failed(source) => f.debug_tuple("Failed").field(source).finish(),
            Self::Panicked(message) => f.debug_tuple("Panicked").field(message).finish(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, message } => write!(f, "{status}: {message}"),
            Self::Failed(source) => write!(f, "{source}"),
            Self::Panicked(message) => write!(f, "handler panicked: {message}"),
        }
    }
}

/// Per-request failures that end the request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Nothing matched: no route, no binding handler, no static resource.
    #[error("no handler or resource found for {path}")]
    NotFound {
        /// The unmatched request path.
        path: String,
    },

    /// The invoked handler failed.
    #[error("error while executing handler {handler}: {cause}")]
    Handler {
        /// Fully qualified handler name.
        handler: String,
        /// What the handler returned.
        cause: HandlerError,
    },

    /// A client-shaped error raised by a handler.
    #[error("{status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message for the client.
        message: String,
    },

    /// A view + model result without a view identifier.
    #[error("handler {handler} returned a view result without a view")]
    MissingView {
        /// Fully qualified handler name.
        handler: String,
    },

    /// A handler declares a parameter the binder cannot produce.
    #[error("unsupported parameter type {type_name} for parameter '{param}' of {handler}")]
    UnsupportedParameter {
        /// Fully qualified handler name.
        handler: String,
        /// Declared parameter name.
        param: String,
        /// The declared type as written.
        type_name: String,
    },

    /// The view collaborator failed.
    #[error("view {view} could not be rendered: {source}")]
    View {
        /// The view identifier.
        view: String,
        /// Collaborator failure.
        source: CollaboratorError,
    },

    /// The static resource collaborator failed.
    #[error("resource {path} could not be served: {source}")]
    Resource {
        /// The resource path.
        path: String,
        /// Collaborator failure.
        source: CollaboratorError,
    },
}

impl DispatchError {
    /// Returns the HTTP status code this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Status { status, .. } => *status,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let not_found = DispatchError::NotFound {
            path: "/missing".to_string(),
        };
        assert_eq!(not_found.status_code(), 404);
        assert!(not_found.to_string().contains("/missing"));

        let shaped = DispatchError::Status {
            status: 403,
            message: "nope".to_string(),
        };
        assert_eq!(shaped.status_code(), 403);

        let missing = DispatchError::MissingView {
            handler: "Home::index".to_string(),
        };
        assert_eq!(missing.status_code(), 500);
    }

    #[test]
    fn test_handler_error_from_std_error() {
        fn parse(input: &str) -> std::result::Result<i32, HandlerError> {
            Ok(input.parse::<i32>()?)
        }

        assert!(parse("12").is_ok());
        let err = parse("x").unwrap_err();
        assert!(matches!(err, HandlerError::Failed(_)));
    }
}
