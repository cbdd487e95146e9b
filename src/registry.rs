//! Component registry consulted by the rendering layer.
//!
//! The registry is an explicit object built once at bootstrap and shared by
//! handle. Registration is append-only: nothing is ever removed, and
//! registering an existing name replaces its definition (last write wins).

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A renderable component as declared by its definition module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    /// Name the component is registered under.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<String>,
    /// Module path the definition was loaded from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Keys the registry does not interpret, kept for the renderer.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ComponentDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: None,
            props: Vec::new(),
            source: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Application handle the theme enhancement hook registers components into.
pub trait ComponentHost: Send + Sync {
    /// Register `definition` under `name`, returning the definition it replaced.
    fn register_component(
        &self,
        name: &str,
        definition: ComponentDefinition,
    ) -> Option<Arc<ComponentDefinition>>;
}

#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: DashMap<String, Arc<ComponentDefinition>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.components.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.components.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl ComponentHost for ComponentRegistry {
    fn register_component(
        &self,
        name: &str,
        definition: ComponentDefinition,
    ) -> Option<Arc<ComponentDefinition>> {
        self.components.insert(name.to_string(), Arc::new(definition))
    }
}
