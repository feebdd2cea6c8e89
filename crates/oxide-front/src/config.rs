//! Front controller configuration.

use serde::Deserialize;
use tracing::warn;

/// Name of the init parameter listing controller packages.
pub const PACKAGES_PARAM: &str = "controllers-packages";

/// Startup configuration for a front controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FrontConfig {
    /// Package scopes to scan for controllers.
    pub packages: Vec<String>,
    /// Application root the front controller is mounted under.
    pub context_path: String,
}

impl FrontConfig {
    /// Builds a configuration from a comma-separated package declaration.
    ///
    /// Entries are trimmed and blanks dropped. When nothing usable is
    /// declared, `default_package` is scanned instead.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_front::FrontConfig;
    ///
    /// let config = FrontConfig::from_declaration(Some("app.web, app.api,"), "app");
    /// assert_eq!(config.packages, vec!["app.web", "app.api"]);
    ///
    /// let fallback = FrontConfig::from_declaration(None, "app");
    /// assert_eq!(fallback.packages, vec!["app"]);
    /// ```
    pub fn from_declaration(declaration: Option<&str>, default_package: &str) -> Self {
        let packages: Vec<String> = declaration
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        if packages.is_empty() {
            warn!(
                param = PACKAGES_PARAM,
                default = default_package,
                "no controller packages configured, using default"
            );
            return Self {
                packages: vec![default_package.to_string()],
                context_path: String::new(),
            };
        }

        Self {
            packages,
            context_path: String::new(),
        }
    }

    /// Sets the application root. `/` and blank mean mounted at the root.
    #[must_use]
    pub fn context_path(mut self, context_path: &str) -> Self {
        let trimmed = context_path.trim().trim_end_matches('/');
        self.context_path = if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_declaration_blank_falls_back() {
        let config = FrontConfig::from_declaration(Some(" , "), "demo");
        assert_eq!(config.packages, vec!["demo"]);
    }

    #[test]
    fn test_context_path() {
        let config = FrontConfig::default().context_path("app/");
        assert_eq!(config.context_path, "/app");
        let root = FrontConfig::default().context_path("/");
        assert_eq!(root.context_path, "");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: FrontConfig = serde_json::from_str(r#"{"packages": ["app"]}"#).unwrap();
        assert_eq!(config.packages, vec!["app"]);
        assert_eq!(config.context_path, "");
    }
}
