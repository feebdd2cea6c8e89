//! Path template compilation and matching.

use regex::Regex;

use crate::error::{BuildError, Result};

/// Canonicalizes a declared path: trims it, maps blank to `/`, and ensures a
/// leading `/`.
pub fn normalize_path(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// A segment in a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A literal string segment, matched case-sensitively.
    Literal(String),
    /// A capturing placeholder segment (e.g., `{id}`).
    Param(String),
}

/// A compiled path template.
///
/// Templates without placeholders are static and match by string equality.
/// Templates with at least one `{name}` segment are dynamic and compile to an
/// anchored regex requiring the same segment count.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The normalized template string.
    template: String,
    /// Parsed segments.
    segments: Vec<PathSegment>,
    /// Parameter names in order of appearance.
    param_names: Vec<String>,
    /// Compiled matcher, `None` for static templates.
    regex: Option<Regex>,
}

impl PathPattern {
    /// Compiles a path template.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_front::PathPattern;
    ///
    /// let pattern = PathPattern::new("/posts/{id}/comments/{comment_id}").unwrap();
    /// let values = pattern.match_path("/posts/123/comments/456").unwrap();
    /// assert_eq!(values, vec!["123", "456"]);
    /// assert_eq!(pattern.param_names(), ["id", "comment_id"]);
    /// ```
    pub fn new(template: &str) -> Result<Self> {
        let template = normalize_path(template);
        let mut segments = Vec::new();
        let mut param_names = Vec::new();
        let mut regex_str = String::from("^");

        let rest = &template[1..];
        if !rest.is_empty() {
            for part in rest.split('/') {
                regex_str.push('/');

                if let Some(inner) = placeholder(part) {
                    let name = inner.trim();
                    if name.is_empty() {
                        return Err(BuildError::EmptyPlaceholderName(template));
                    }
                    segments.push(PathSegment::Param(name.to_string()));
                    param_names.push(name.to_string());
                    regex_str.push_str("([^/]+)");
                } else {
                    segments.push(PathSegment::Literal(part.to_string()));
                    regex_str.push_str(&regex::escape(part));
                }
            }
        }
        regex_str.push('$');

        let regex = if param_names.is_empty() {
            None
        } else {
            let compiled = Regex::new(&regex_str).map_err(|e| BuildError::InvalidPattern {
                template: template.clone(),
                reason: e.to_string(),
            })?;
            Some(compiled)
        };

        Ok(Self {
            template,
            segments,
            param_names,
            regex,
        })
    }

    /// Attempts to match a request path against this template.
    ///
    /// Returns the extracted values in left-to-right order; empty for a
    /// static template that matched.
    pub fn match_path(&self, path: &str) -> Option<Vec<String>> {
        let Some(regex) = &self.regex else {
            return (self.template == path).then(Vec::new);
        };

        let caps = regex.captures(path)?;
        caps.iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()))
            .collect()
    }

    /// Returns the normalized template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the placeholder names in order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Returns `true` when the template has at least one placeholder.
    pub fn is_dynamic(&self) -> bool {
        self.regex.is_some()
    }
}

fn placeholder(segment: &str) -> Option<&str> {
    segment.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
}
