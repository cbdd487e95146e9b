//! Custom theme descriptor and its application-bootstrap hook.
//!
//! A theme directory contains a `theme.toml` naming the theme, the base theme
//! it extends in the host framework, where its component definitions live and
//! which options it accepts. [`Theme::enhance_app`] is the enhancement hook:
//! it discovers the theme's components and registers them into the
//! application's component registry.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::components::{
    discover_components, ComponentAutoRegistrar, LoadFailurePolicy, RegistrationOrder,
    RegistrationReport, DEFAULT_COMPONENT_PATTERN,
};
use crate::config::reserved_option_conflicts;
use crate::error::{Result, SiteError};
use crate::registry::ComponentHost;

/// Theme option type for validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeOptionType {
    Bool,
    String,
    Integer,
    Float,
}

/// Declared option in `theme.toml`: its type, default and, for strings,
/// the allowed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeOptionSpec {
    #[serde(rename = "type")]
    pub option_type: ThemeOptionType,
    pub default: Value,
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

impl ThemeOptionSpec {
    /// Why `value` does not fit this spec, if it doesn't.
    fn check(&self, value: &Value) -> Option<String> {
        let type_ok = match self.option_type {
            ThemeOptionType::Bool => value.is_boolean(),
            ThemeOptionType::String => value.is_string(),
            ThemeOptionType::Integer => value.is_i64(),
            ThemeOptionType::Float => value.is_f64() || value.is_i64(),
        };
        if !type_ok {
            return Some(format!("expected {:?}, got {}", self.option_type, value));
        }

        match (&self.values, value.as_str()) {
            (Some(allowed), Some(s)) if !allowed.iter().any(|a| a == s) => {
                Some(format!("'{}' is not one of {:?}", s, allowed))
            }
            _ => None,
        }
    }
}

/// Raw theme.toml structure for deserialization
#[derive(Debug, Clone, Deserialize)]
struct ThemeToml {
    theme: ThemeTomlMeta,
}

#[derive(Debug, Clone, Deserialize)]
struct ThemeTomlMeta {
    name: String,
    #[serde(default)]
    extends: Option<String>,
    #[serde(default)]
    layout: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    components: Option<ThemeTomlComponents>,
    #[serde(default)]
    options: Option<HashMap<String, ThemeOptionSpec>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ThemeTomlComponents {
    #[serde(default = "default_component_pattern")]
    pattern: String,
    #[serde(default)]
    order: RegistrationOrder,
    #[serde(default)]
    on_failure: LoadFailurePolicy,
}

fn default_component_pattern() -> String {
    DEFAULT_COMPONENT_PATTERN.to_string()
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    /// Base theme in the host framework this theme builds on
    pub extends: Option<String>,
    /// Layout component replacing the base theme's, passed through to the host
    pub layout: Option<String>,
    pub version: String,
    /// Path to theme directory
    pub path: PathBuf,
    /// Glob, relative to `path`, locating component definitions
    pub component_pattern: String,
    pub registration_order: RegistrationOrder,
    pub load_failure_policy: LoadFailurePolicy,
    /// Theme options schema
    pub options_schema: HashMap<String, ThemeOptionSpec>,
}

impl Theme {
    /// Load a theme from a directory containing theme.toml
    pub fn from_path(path: &Path) -> Result<Self> {
        let theme_toml_path = path.join("theme.toml");
        if !theme_toml_path.exists() {
            return Err(SiteError::Theme(format!(
                "Theme directory {} does not contain theme.toml",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(&theme_toml_path)?;
        let toml: ThemeToml = toml::from_str(&content).map_err(|e| {
            SiteError::Theme(format!("Failed to parse {}: {}", theme_toml_path.display(), e))
        })?;

        let meta = toml.theme;
        let components = meta.components.unwrap_or(ThemeTomlComponents {
            pattern: default_component_pattern(),
            order: RegistrationOrder::default(),
            on_failure: LoadFailurePolicy::default(),
        });

        debug!("Loaded theme {} from {}", meta.name, path.display());

        Ok(Theme {
            name: meta.name,
            extends: meta.extends,
            layout: meta.layout,
            version: meta.version.unwrap_or_else(|| "0.0.0".to_string()),
            path: path.to_path_buf(),
            component_pattern: components.pattern,
            registration_order: components.order,
            load_failure_policy: components.on_failure,
            options_schema: meta.options.unwrap_or_default(),
        })
    }

    /// Option defaults from the schema, overlaid with the site's `theme_options`.
    ///
    /// Keys the schema does not declare are kept and passed through to the host.
    pub fn resolve_options(&self, site_options: &Map<String, Value>) -> Map<String, Value> {
        let mut resolved: Map<String, Value> = self
            .options_schema
            .iter()
            .map(|(key, spec)| (key.clone(), spec.default.clone()))
            .collect();
        for (key, value) in site_options {
            resolved.insert(key.clone(), value.clone());
        }
        resolved
    }

    /// Check the site's `theme_options` against the schema and against the
    /// `themeConfig` keys the site configuration already fills in.
    ///
    /// Every problem is reported in one error, sorted by option key.
    pub fn check_options(&self, site_options: &Map<String, Value>) -> Result<()> {
        let mut problems = reserved_option_conflicts(site_options);

        for (key, value) in site_options {
            let Some(spec) = self.options_schema.get(key) else {
                continue;
            };
            if let Some(problem) = spec.check(value) {
                problems.push(format!("'{}': {}", key, problem));
            }
        }

        if problems.is_empty() {
            return Ok(());
        }
        problems.sort();
        Err(SiteError::ThemeOptions { problems })
    }

    pub fn registrar(&self) -> ComponentAutoRegistrar {
        ComponentAutoRegistrar::new(self.registration_order, self.load_failure_policy)
    }

    /// Application enhancement hook: register every discovered component into `host`.
    pub async fn enhance_app(&self, host: &dyn ComponentHost) -> Result<RegistrationReport> {
        let modules = discover_components(&self.path, &self.component_pattern)?;
        info!(
            "Theme '{}' discovered {} component module(s)",
            self.name,
            modules.len()
        );
        self.registrar().register_all(modules, host).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ComponentRegistry;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_theme(dir: &Path, name: &str, extra: &str) -> PathBuf {
        let theme_dir = dir.join(name);
        std::fs::create_dir_all(theme_dir.join("components")).unwrap();

        let theme_toml = format!(
            r#"
[theme]
name = "{}"
extends = "default"
version = "1.0.0"
{}

[theme.options]
show_last_updated = {{ type = "bool", default = false }}
aside = {{ type = "string", default = "right", values = ["left", "right"] }}
"#,
            name, extra
        );

        let mut file = std::fs::File::create(theme_dir.join("theme.toml")).unwrap();
        file.write_all(theme_toml.as_bytes()).unwrap();
        theme_dir
    }

    #[test]
    fn test_theme_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let theme_dir = create_test_theme(temp_dir.path(), "custom", "");

        let theme = Theme::from_path(&theme_dir).unwrap();
        assert_eq!(theme.name, "custom");
        assert_eq!(theme.extends.as_deref(), Some("default"));
        assert_eq!(theme.component_pattern, DEFAULT_COMPONENT_PATTERN);
        assert_eq!(theme.registration_order, RegistrationOrder::Completion);
        assert_eq!(theme.load_failure_policy, LoadFailurePolicy::Skip);
    }

    #[test]
    fn test_component_settings_are_read() {
        let temp_dir = TempDir::new().unwrap();
        let theme_dir = create_test_theme(
            temp_dir.path(),
            "strict",
            r#"
[theme.components]
pattern = "widgets/*.json"
order = "discovery"
on_failure = "abort"
"#,
        );

        let theme = Theme::from_path(&theme_dir).unwrap();
        assert_eq!(theme.component_pattern, "widgets/*.json");
        assert_eq!(theme.registrar().order(), RegistrationOrder::Discovery);
        assert_eq!(theme.registrar().on_failure(), LoadFailurePolicy::Abort);
    }

    #[test]
    fn test_missing_theme_toml() {
        let temp_dir = TempDir::new().unwrap();
        let err = Theme::from_path(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("theme.toml"));
    }

    #[test]
    fn test_theme_options() {
        let temp_dir = TempDir::new().unwrap();
        let theme = Theme::from_path(&create_test_theme(temp_dir.path(), "custom", "")).unwrap();

        let defaults = theme.resolve_options(&Map::new());
        assert_eq!(defaults["show_last_updated"], false);
        assert_eq!(defaults["aside"], "right");

        let site_options = serde_json::json!({ "show_last_updated": true, "carbon_ads": "abc" });
        let resolved = theme.resolve_options(site_options.as_object().unwrap());
        assert_eq!(resolved["show_last_updated"], true);
        assert_eq!(resolved["carbon_ads"], "abc");
    }

    #[test]
    fn test_theme_option_validation() {
        let temp_dir = TempDir::new().unwrap();
        let theme = Theme::from_path(&create_test_theme(temp_dir.path(), "custom", "")).unwrap();
        let check = |options: Value| theme.check_options(options.as_object().unwrap());

        assert!(check(serde_json::json!({"show_last_updated": true, "extra": 1})).is_ok());
        assert!(check(serde_json::json!({"show_last_updated": "yes"})).is_err());
        assert!(check(serde_json::json!({"aside": "top"})).is_err());
    }

    #[test]
    fn test_all_option_problems_are_reported() {
        let temp_dir = TempDir::new().unwrap();
        let theme = Theme::from_path(&create_test_theme(temp_dir.path(), "custom", "")).unwrap();

        let options = serde_json::json!({
            "show_last_updated": "yes",
            "aside": "top",
            "sidebar": { "/": [] }
        });
        let err = theme.check_options(options.as_object().unwrap()).unwrap_err();

        let problems = match err {
            SiteError::ThemeOptions { problems } => problems,
            other => panic!("expected ThemeOptions, got {:?}", other),
        };
        assert_eq!(problems.len(), 3);
        assert!(problems[0].starts_with("'aside'"));
        assert!(problems[1].starts_with("'show_last_updated'"));
        assert!(problems[2].contains("sidebar"));
    }

    #[test]
    fn test_layout_override_is_read() {
        let temp_dir = TempDir::new().unwrap();
        let plain = Theme::from_path(&create_test_theme(temp_dir.path(), "plain", "")).unwrap();
        assert!(plain.layout.is_none());

        let custom = Theme::from_path(&create_test_theme(
            temp_dir.path(),
            "custom",
            "layout = \"components/Layout.toml\"",
        ))
        .unwrap();
        assert_eq!(custom.layout.as_deref(), Some("components/Layout.toml"));
    }

    #[tokio::test]
    async fn test_enhance_app_registers_components() {
        let temp_dir = TempDir::new().unwrap();
        let theme_dir = create_test_theme(temp_dir.path(), "custom", "");
        std::fs::write(
            theme_dir.join("components/Card.toml"),
            "name = \"Card\"\nprops = [\"title\"]\n",
        )
        .unwrap();
        std::fs::write(
            theme_dir.join("components/Badge.toml"),
            "name = \"Badge\"\n",
        )
        .unwrap();

        let theme = Theme::from_path(&theme_dir).unwrap();
        let registry = ComponentRegistry::new();
        let report = theme.enhance_app(&registry).await.unwrap();

        assert_eq!(report.registered.len(), 2);
        assert_eq!(registry.names(), vec!["Badge", "Card"]);
        assert_eq!(
            registry.get("Card").unwrap().source.as_deref(),
            Some("components/Card.toml")
        );
    }
}
