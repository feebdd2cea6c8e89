//! View + model handler results.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

/// View identifiers with this prefix redirect instead of forwarding.
pub const REDIRECT_PREFIX: &str = "redirect:";

/// A handler result naming a view and the data it renders.
///
/// Every model entry is exposed to the view renderer as a request attribute
/// under its key.
///
/// # Example
///
/// ```
/// use oxide_front::ModelView;
///
/// let mv = ModelView::new("users/show.html")
///     .with("name", "Ada")
///     .with("age", 36);
/// assert_eq!(mv.view(), Some("users/show.html"));
/// assert_eq!(mv.model().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelView {
    view: Option<String>,
    model: BTreeMap<String, JsonValue>,
}

impl ModelView {
    /// Creates a result for the given view.
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            view: Some(view.into()),
            model: BTreeMap::new(),
        }
    }

    /// Creates a result redirecting to `target`, relative to the application root.
    pub fn redirect(target: &str) -> Self {
        Self::new(format!("{REDIRECT_PREFIX}{target}"))
    }

    /// Adds a model entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.model.insert(key.into(), value.into());
        self
    }

    /// Adds any serializable value as a model entry.
    pub fn add_object<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        self.model.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Sets the view identifier.
    pub fn set_view(&mut self, view: impl Into<String>) {
        self.view = Some(view.into());
    }

    /// Returns the view identifier.
    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    /// Returns the model entries.
    pub fn model(&self) -> &BTreeMap<String, JsonValue> {
        &self.model
    }

    /// Splits the result into its view and model.
    pub fn into_parts(self) -> (Option<String>, BTreeMap<String, JsonValue>) {
        (self.view, self.model)
    }
}
