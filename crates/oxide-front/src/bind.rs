//! Per-request argument binding.
//!
//! Binding walks a handler's precomputed parameter plan. For each value
//! parameter the sources are, first success wins:
//!
//! 1. an unconsumed path variable whose name matches a candidate name,
//! 2. a query or form field with a matching name,
//! 3. the next unconsumed path variable by position, unless the parameter
//!    carries an explicit binding name.
//!
//! Named claims are made for all parameters before any positional ones.
//! Every path variable must end up consumed or the handler is rejected.

use std::fmt;

use crate::error::DispatchError;
use crate::handler::{BoundArgs, HandlerDescriptor, ParamKind, ParamSpec};
use crate::request::Request;
use crate::value::{ConversionError, Value};

/// A value extracted from a placeholder segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathVariable {
    /// Placeholder name, if the template named it.
    pub name: Option<String>,
    /// Extracted text.
    pub value: String,
    /// Whether a parameter has claimed it.
    pub consumed: bool,
}

impl PathVariable {
    /// Pairs placeholder names with extracted values.
    pub fn zip(names: &[String], values: &[String]) -> Vec<Self> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| Self {
                name: names.get(i).cloned(),
                value: value.clone(),
                consumed: false,
            })
            .collect()
    }

    fn answers_to(&self, candidate: &str) -> bool {
        !self.consumed
            && self
                .name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(candidate))
    }
}

/// Why a handler could not take the request.
#[derive(Debug, Clone)]
pub enum Rejection {
    /// A found value did not convert to the declared type.
    Conversion {
        /// Parameter name.
        param: String,
        /// Conversion failure.
        error: ConversionError,
    },
    /// A path variable no parameter accounted for.
    UnconsumedPathVariable {
        /// Placeholder name.
        name: Option<String>,
        /// Extracted text.
        value: String,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conversion { param, error } => write!(f, "parameter '{param}': {error}"),
            Self::UnconsumedPathVariable { name, value } => write!(
                f,
                "path variable {} = '{value}' is not bound by any parameter",
                name.as_deref().unwrap_or("<unnamed>")
            ),
        }
    }
}

/// Outcome of binding one candidate handler.
#[derive(Debug, Clone)]
pub enum Binding {
    /// The handler can be invoked with these arguments.
    Bound(BoundArgs),
    /// The handler cannot take this request; try the next candidate.
    Rejected(Rejection),
}

/// Binds request data to a handler's parameters.
///
/// Returns an error only for parameter kinds the binder can never produce.
pub fn bind(
    handler: &HandlerDescriptor,
    request: &Request,
    mut variables: Vec<PathVariable>,
) -> Result<Binding, DispatchError> {
    let params = handler.params();
    for (index, param) in params.iter().enumerate() {
        if let ParamKind::Unsupported(type_name) = &param.kind {
            return Err(DispatchError::UnsupportedParameter {
                handler: handler.qualified_name(),
                param: display_name(param, index),
                type_name: type_name.clone(),
            });
        }
    }

    let mut found: Vec<Option<String>> = vec![None; params.len()];

    for (slot, param) in found.iter_mut().zip(params) {
        if !matches!(param.kind, ParamKind::Value(_)) {
            continue;
        }
        for candidate in param.candidate_names() {
            if let Some(var) = variables.iter_mut().find(|v| v.answers_to(candidate)) {
                var.consumed = true;
                *slot = Some(var.value.clone());
                break;
            }
        }
    }

    for (slot, param) in found.iter_mut().zip(params) {
        if slot.is_some() || !matches!(param.kind, ParamKind::Value(_)) {
            continue;
        }
        *slot = param
            .candidate_names()
            .into_iter()
            .find_map(|candidate| request.param(candidate))
            .map(str::to_string);

        if slot.is_none() && !param.has_explicit_name() {
            if let Some(var) = variables.iter_mut().find(|v| !v.consumed) {
                var.consumed = true;
                *slot = Some(var.value.clone());
            }
        }
    }

    let mut values = Vec::new();
    for (index, (raw, param)) in found.into_iter().zip(params).enumerate() {
        let ParamKind::Value(ty) = param.kind else {
            continue;
        };
        let value = match raw {
            None => None,
            Some(raw) if raw.is_empty() => ty.is_textual().then(|| Value::Text(raw)),
            Some(raw) => match ty.parse(&raw) {
                Ok(value) => Some(value),
                Err(error) => {
                    return Ok(Binding::Rejected(Rejection::Conversion {
                        param: display_name(param, index),
                        error,
                    }));
                }
            },
        };
        values.push(value);
    }

    if let Some(var) = variables.into_iter().find(|v| !v.consumed) {
        return Ok(Binding::Rejected(Rejection::UnconsumedPathVariable {
            name: var.name,
            value: var.value,
        }));
    }

    Ok(Binding::Bound(BoundArgs::new(values)))
}

fn display_name(param: &ParamSpec, index: usize) -> String {
    param
        .explicit
        .clone()
        .or_else(|| param.name.clone())
        .unwrap_or_else(|| format!("#{index}"))
}
