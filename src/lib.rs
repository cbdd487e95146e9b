//! Docpress
//!
//! Navigation, sidebar and theme configuration for static documentation sites:
//! composes per-section sidebars and the navigation bar into the configuration
//! object a site generator consumes, rewrites public asset paths in content
//! documents at build time, and registers a theme's components at bootstrap.

pub mod builder;
pub mod components;
pub mod config;
pub mod error;
pub mod links;
pub mod nav;
pub mod registry;
pub mod rewrite;
pub mod sidebar;
pub mod theme;

pub use builder::{BuildStats, ContentStats, SiteBuilder};
pub use components::{
    discover_components, ComponentAutoRegistrar, ComponentLoader, DiscoveredModule,
    FileComponentLoader, LoadFailurePolicy, NameCollision, RegistrationOrder, RegistrationReport,
};
pub use config::{OutlineDepth, SiteConfig, SiteManifest, SocialLink};
pub use error::SiteError;
pub use links::{DanglingLink, LinkProblem, LinkValidator};
pub use nav::{NavEntry, NavModel};
pub use registry::{ComponentDefinition, ComponentHost, ComponentRegistry};
pub use rewrite::{ContentPathRewriter, TransformOutput};
pub use sidebar::{compose, PathKeyedSection, SidebarMap, SidebarNode};
pub use theme::Theme;
