//! Component discovery and automatic registration at application bootstrap.
//!
//! Discovery turns a directory convention (a glob under the theme directory)
//! into a list of [`DiscoveredModule`]s, each carrying a deferred
//! [`ComponentLoader`]. [`ComponentAutoRegistrar::register_all`] then starts
//! every load at once and registers each definition under its declared name.
//!
//! # Ordering hazard
//!
//! With [`RegistrationOrder::Completion`] (the default) each definition is
//! registered as soon as its own load finishes. Two modules declaring the same
//! name therefore resolve by whichever load completes last, which depends on
//! load latency and not on discovery order. The collision is logged and
//! reported but not prevented. [`RegistrationOrder::Discovery`] waits for every
//! load and registers in lexical module-path order instead, which makes the
//! outcome deterministic (the last path wins) at the cost of changing which
//! definition survives a collision.

use async_trait::async_trait;
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, SiteError};
use crate::registry::{ComponentDefinition, ComponentHost};

/// Default discovery convention, relative to the theme directory.
pub const DEFAULT_COMPONENT_PATTERN: &str = "components/**/*.toml";

/// Deferred factory producing a component definition.
#[async_trait]
pub trait ComponentLoader: Send + Sync {
    async fn load(&self) -> Result<ComponentDefinition>;
}

/// Loads a definition file (TOML, YAML or JSON by extension).
#[derive(Debug, Clone)]
pub struct FileComponentLoader {
    path: PathBuf,
}

impl FileComponentLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ComponentLoader for FileComponentLoader {
    async fn load(&self) -> Result<ComponentDefinition> {
        let module = self.path.display().to_string();
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SiteError::ComponentLoad {
                module: module.clone(),
                message: e.to_string(),
            })?;

        let parsed: std::result::Result<ComponentDefinition, String> =
            match self.path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => toml::from_str(&content).map_err(|e| e.to_string()),
                Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
                Some("yaml") | Some("yml") => {
                    serde_yaml::from_str(&content).map_err(|e| e.to_string())
                }
                other => Err(format!(
                    "unsupported definition format {:?}",
                    other.unwrap_or("")
                )),
            };

        let definition = parsed.map_err(|message| SiteError::ComponentLoad {
            module: module.clone(),
            message,
        })?;

        if definition.name.trim().is_empty() {
            return Err(SiteError::ComponentLoad {
                module,
                message: "definition declares an empty name".to_string(),
            });
        }
        Ok(definition)
    }
}

/// A component module found by discovery.
pub struct DiscoveredModule {
    pub module_path: String,
    pub loader: Box<dyn ComponentLoader>,
}

impl DiscoveredModule {
    pub fn new(module_path: impl Into<String>, loader: Box<dyn ComponentLoader>) -> Self {
        Self {
            module_path: module_path.into(),
            loader,
        }
    }
}

impl std::fmt::Debug for DiscoveredModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveredModule")
            .field("module_path", &self.module_path)
            .finish_non_exhaustive()
    }
}

/// Find component definition files matching `pattern` under `base_dir`.
///
/// Module paths are reported relative to `base_dir` with `/` separators, in
/// lexical order.
pub fn discover_components(base_dir: &Path, pattern: &str) -> Result<Vec<DiscoveredModule>> {
    let full_pattern = base_dir.join(pattern);
    let full_pattern = full_pattern.to_string_lossy();

    let paths = glob::glob(&full_pattern).map_err(|e| SiteError::Discovery {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut modules = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable component path: {}", e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }

        let module_path = path
            .strip_prefix(base_dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        debug!("Discovered component module {}", module_path);
        modules.push(DiscoveredModule::new(
            module_path,
            Box::new(FileComponentLoader::new(path)),
        ));
    }

    modules.sort_by(|a, b| a.module_path.cmp(&b.module_path));
    Ok(modules)
}

/// When each loaded definition is written into the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationOrder {
    /// Register as each load completes; collisions resolve by completion order.
    #[default]
    Completion,
    /// Await every load, then register in lexical module-path order.
    ///
    /// Nothing is registered until every load has resolved, so one load that
    /// never resolves blocks all registrations.
    Discovery,
}

/// What a failed module load does to bootstrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadFailurePolicy {
    /// Log the failure, record it in the report, keep registering the rest.
    #[default]
    Skip,
    /// Propagate the first failure and stop bootstrap.
    Abort,
}

/// Name collision observed during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    pub name: String,
    /// Module whose definition was replaced, when known.
    pub replaced: Option<String>,
    /// Module whose definition is now registered.
    pub winner: String,
}

/// Outcome of one [`ComponentAutoRegistrar::register_all`] run.
#[derive(Debug, Clone, Default)]
pub struct RegistrationReport {
    /// `(module path, name)` in the order registrations happened.
    pub registered: Vec<(String, String)>,
    /// `(module path, error message)` for loads skipped under [`LoadFailurePolicy::Skip`].
    pub failed: Vec<(String, String)>,
    pub collisions: Vec<NameCollision>,
}

impl RegistrationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.collisions.is_empty()
    }
}

/// Loads discovered component modules and registers each definition into a
/// [`ComponentHost`] under its declared name.
///
/// The registrar holds no state between runs; ordering and failure handling
/// are fixed at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentAutoRegistrar {
    order: RegistrationOrder,
    on_failure: LoadFailurePolicy,
}

impl ComponentAutoRegistrar {
    pub fn new(order: RegistrationOrder, on_failure: LoadFailurePolicy) -> Self {
        Self { order, on_failure }
    }

    pub fn order(&self) -> RegistrationOrder {
        self.order
    }

    pub fn on_failure(&self) -> LoadFailurePolicy {
        self.on_failure
    }

    /// Load every module and register its definition into `host`.
    ///
    /// There is no timeout: a load that never resolves keeps this future
    /// pending, though every other module is still registered as it completes.
    pub async fn register_all(
        &self,
        modules: Vec<DiscoveredModule>,
        host: &dyn ComponentHost,
    ) -> Result<RegistrationReport> {
        info!("Registering {} component module(s)", modules.len());
        let mut report = RegistrationReport::default();

        match self.order {
            RegistrationOrder::Completion => {
                let mut pending: FuturesUnordered<_> = modules
                    .iter()
                    .map(|module| async move {
                        (module.module_path.as_str(), module.loader.load().await)
                    })
                    .collect();

                while let Some((module_path, loaded)) = pending.next().await {
                    self.apply(module_path, loaded, host, &mut report)?;
                }
            }
            RegistrationOrder::Discovery => {
                let loads = modules.iter().map(|module| module.loader.load());
                let results = join_all(loads).await;

                let mut loaded: Vec<_> = modules
                    .iter()
                    .map(|module| module.module_path.as_str())
                    .zip(results)
                    .collect();
                loaded.sort_by(|a, b| a.0.cmp(b.0));

                for (module_path, result) in loaded {
                    self.apply(module_path, result, host, &mut report)?;
                }
            }
        }

        info!(
            "Registered {} component(s), {} failed, {} name collision(s)",
            report.registered.len(),
            report.failed.len(),
            report.collisions.len()
        );
        Ok(report)
    }

    fn apply(
        &self,
        module_path: &str,
        loaded: Result<ComponentDefinition>,
        host: &dyn ComponentHost,
        report: &mut RegistrationReport,
    ) -> Result<()> {
        let mut definition = match loaded {
            Ok(definition) => definition,
            Err(e) => match self.on_failure {
                LoadFailurePolicy::Abort => {
                    error!("Component module {} failed to load, aborting bootstrap", module_path);
                    if matches!(e, SiteError::ComponentLoad { .. }) {
                        return Err(e);
                    }
                    return Err(SiteError::ComponentLoad {
                        module: module_path.to_string(),
                        message: e.to_string(),
                    });
                }
                LoadFailurePolicy::Skip => {
                    error!("Skipping component module {}: {}", module_path, e);
                    report.failed.push((module_path.to_string(), e.to_string()));
                    return Ok(());
                }
            },
        };

        // Collisions are attributed by module path, whatever the file declares
        definition.source = Some(module_path.to_string());
        let name = definition.name.clone();
        if let Some(previous) = host.register_component(&name, definition) {
            warn!(
                "Component name '{}' registered more than once; {} replaced {}",
                name,
                module_path,
                previous.source.as_deref().unwrap_or("an earlier definition")
            );
            report.collisions.push(NameCollision {
                name: name.clone(),
                replaced: previous.source.clone(),
                winner: module_path.to_string(),
            });
        }
        debug!("Registered component {} from {}", name, module_path);
        report.registered.push((module_path.to_string(), name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ComponentRegistry;
    use std::time::Duration;
    use tempfile::TempDir;

    struct DelayedLoader {
        definition: ComponentDefinition,
        delay: Duration,
    }

    #[async_trait]
    impl ComponentLoader for DelayedLoader {
        async fn load(&self) -> Result<ComponentDefinition> {
            tokio::time::sleep(self.delay).await;
            Ok(self.definition.clone())
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl ComponentLoader for FailingLoader {
        async fn load(&self) -> Result<ComponentDefinition> {
            Err(SiteError::ComponentLoad {
                module: "broken".to_string(),
                message: "boom".to_string(),
            })
        }
    }

    struct PendingLoader;

    #[async_trait]
    impl ComponentLoader for PendingLoader {
        async fn load(&self) -> Result<ComponentDefinition> {
            futures::future::pending().await
        }
    }

    fn delayed(path: &str, name: &str, millis: u64) -> DiscoveredModule {
        DiscoveredModule::new(
            path,
            Box::new(DelayedLoader {
                definition: ComponentDefinition::new(name).with_source(path),
                delay: Duration::from_millis(millis),
            }),
        )
    }

    #[tokio::test]
    async fn test_duplicate_names_leave_one_definition() {
        let registry = ComponentRegistry::new();
        let modules = vec![
            delayed("components/a/Card.toml", "Card", 5),
            delayed("components/b/Card.toml", "Card", 1),
        ];

        let report = ComponentAutoRegistrar::default()
            .register_all(modules, &registry)
            .await
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("Card"));
        assert_eq!(report.registered.len(), 2);
        assert_eq!(report.collisions.len(), 1);
        assert_eq!(report.collisions[0].name, "Card");
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_order_decides_collision() {
        let registry = ComponentRegistry::new();
        let modules = vec![
            delayed("components/a/Card.toml", "Card", 50),
            delayed("components/b/Card.toml", "Card", 10),
        ];

        ComponentAutoRegistrar::default()
            .register_all(modules, &registry)
            .await
            .unwrap();

        // The slower load finished last and holds the name
        assert_eq!(
            registry.get("Card").unwrap().source.as_deref(),
            Some("components/a/Card.toml")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_order_is_deterministic() {
        let registry = ComponentRegistry::new();
        let modules = vec![
            delayed("components/b/Card.toml", "Card", 10),
            delayed("components/a/Card.toml", "Card", 50),
        ];

        let registrar =
            ComponentAutoRegistrar::new(RegistrationOrder::Discovery, LoadFailurePolicy::Skip);
        let report = registrar.register_all(modules, &registry).await.unwrap();

        assert_eq!(
            registry.get("Card").unwrap().source.as_deref(),
            Some("components/b/Card.toml")
        );
        assert_eq!(report.registered[0].0, "components/a/Card.toml");
    }

    #[tokio::test]
    async fn test_skip_policy_keeps_other_registrations() {
        let registry = ComponentRegistry::new();
        let modules = vec![
            DiscoveredModule::new("components/Broken.toml", Box::new(FailingLoader)),
            delayed("components/Badge.toml", "Badge", 1),
        ];

        let report = ComponentAutoRegistrar::default()
            .register_all(modules, &registry)
            .await
            .unwrap();

        assert!(registry.contains("Badge"));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "components/Broken.toml");
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_abort_policy_propagates_failure() {
        let registry = ComponentRegistry::new();
        let modules = vec![DiscoveredModule::new(
            "components/Broken.toml",
            Box::new(FailingLoader),
        )];

        let registrar =
            ComponentAutoRegistrar::new(RegistrationOrder::Completion, LoadFailurePolicy::Abort);
        let err = registrar.register_all(modules, &registry).await.unwrap_err();

        assert!(matches!(err, SiteError::ComponentLoad { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_abort_registers_nothing() {
        let registry = ComponentRegistry::new();
        let modules = vec![
            delayed("components/Badge.toml", "Badge", 1),
            DiscoveredModule::new("components/Alert.toml", Box::new(FailingLoader)),
        ];

        let registrar =
            ComponentAutoRegistrar::new(RegistrationOrder::Discovery, LoadFailurePolicy::Abort);
        let err = registrar.register_all(modules, &registry).await.unwrap_err();

        // Alert sorts first and fails before Badge is written
        assert!(matches!(err, SiteError::ComponentLoad { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_load_does_not_block_completion_registrations() {
        let registry = ComponentRegistry::new();
        let modules = vec![
            DiscoveredModule::new("components/Stuck.toml", Box::new(PendingLoader)),
            delayed("components/Badge.toml", "Badge", 1),
        ];

        let registrar = ComponentAutoRegistrar::default();
        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            registrar.register_all(modules, &registry),
        )
        .await;

        assert!(outcome.is_err());
        assert!(registry.contains("Badge"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_load_blocks_discovery_registrations() {
        let registry = ComponentRegistry::new();
        let modules = vec![
            DiscoveredModule::new("components/Stuck.toml", Box::new(PendingLoader)),
            delayed("components/Badge.toml", "Badge", 1),
        ];

        let registrar =
            ComponentAutoRegistrar::new(RegistrationOrder::Discovery, LoadFailurePolicy::Skip);
        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            registrar.register_all(modules, &registry),
        )
        .await;

        assert!(outcome.is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_collisions_name_module_paths_not_declared_source() {
        let registry = ComponentRegistry::new();
        let declaring = |path: &str, millis: u64| {
            DiscoveredModule::new(
                path,
                Box::new(DelayedLoader {
                    definition: ComponentDefinition::new("Card").with_source("shared/Card.vue"),
                    delay: Duration::from_millis(millis),
                }),
            )
        };
        let modules = vec![
            declaring("components/a/Card.toml", 1),
            declaring("components/b/Card.toml", 20),
        ];

        let report = ComponentAutoRegistrar::default()
            .register_all(modules, &registry)
            .await
            .unwrap();

        assert_eq!(report.collisions.len(), 1);
        let collision = &report.collisions[0];
        assert_eq!(collision.replaced.as_deref(), Some("components/a/Card.toml"));
        assert_eq!(collision.winner, "components/b/Card.toml");
        assert_eq!(
            registry.get("Card").unwrap().source.as_deref(),
            Some("components/b/Card.toml")
        );
    }

    #[tokio::test]
    async fn test_discover_and_load_files() {
        let temp_dir = TempDir::new().unwrap();
        let components = temp_dir.path().join("components");
        std::fs::create_dir_all(components.join("home")).unwrap();
        std::fs::write(
            components.join("Badge.toml"),
            "name = \"Badge\"\nprops = [\"type\", \"text\"]\n",
        )
        .unwrap();
        std::fs::write(
            components.join("home/Hero.toml"),
            "name = \"Hero\"\ntemplate = \"<section class=\\\"hero\\\"><slot /></section>\"\n",
        )
        .unwrap();
        std::fs::write(components.join("notes.txt"), "not a component").unwrap();

        let modules = discover_components(temp_dir.path(), DEFAULT_COMPONENT_PATTERN).unwrap();
        let paths: Vec<_> = modules.iter().map(|m| m.module_path.as_str()).collect();
        assert_eq!(paths, vec!["components/Badge.toml", "components/home/Hero.toml"]);

        let registry = ComponentRegistry::new();
        let report = ComponentAutoRegistrar::default()
            .register_all(modules, &registry)
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(registry.names(), vec!["Badge", "Hero"]);
        assert_eq!(registry.get("Badge").unwrap().props, vec!["type", "text"]);
    }

    #[tokio::test]
    async fn test_file_without_name_fails_to_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Nameless.toml");
        std::fs::write(&path, "template = \"<div />\"\n").unwrap();

        let err = FileComponentLoader::new(&path).load().await.unwrap_err();
        assert!(matches!(err, SiteError::ComponentLoad { .. }));
    }
}
