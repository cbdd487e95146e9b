//! Site manifest (input) and the host configuration object (output).
//!
//! The manifest is read through the `config` crate so any file format it
//! recognises works, and every scalar field can be overridden from the
//! environment with the `DOCPRESS_` prefix (e.g. `DOCPRESS_TITLE`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SiteError};
use crate::nav::{NavEntry, NavModel};
use crate::sidebar::{PathKeyedSection, SidebarMap};

/// Social link shown in the navigation bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub icon: String,
    pub link: String,
}

/// Heading levels collected into the page outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutlineDepth {
    Level(u8),
    Range([u8; 2]),
    Named(OutlineKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlineKeyword {
    Deep,
}

impl Default for OutlineDepth {
    fn default() -> Self {
        OutlineDepth::Level(2)
    }
}

/// Everything a site author declares, as read from `site.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteManifest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_true")]
    pub clean_urls: bool,
    #[serde(default = "default_true")]
    pub cache_busting: bool,
    #[serde(default)]
    pub sitemap_hostname: Option<String>,
    #[serde(default)]
    pub outline: OutlineDepth,
    #[serde(default)]
    pub social_links: Vec<SocialLink>,
    #[serde(default)]
    pub nav: Vec<NavEntry>,
    /// Inline sections, composed before `sidebar_files`
    #[serde(default)]
    pub sections: Vec<PathKeyedSection>,
    /// One section per file, relative to the manifest, composed in order
    #[serde(default)]
    pub sidebar_files: Vec<PathBuf>,
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub theme_dir: Option<PathBuf>,
    #[serde(default)]
    pub theme_options: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub validate_links: bool,
    #[serde(default)]
    pub fail_on_dangling_links: bool,
}

fn default_true() -> bool {
    true
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("docs")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl SiteManifest {
    /// Load a manifest file, layering `DOCPRESS_*` environment overrides on top.
    pub fn load(path: &Path) -> Result<Self> {
        let manifest_error = |message: String| SiteError::Manifest {
            path: path.to_path_buf(),
            message,
        };

        if !path.exists() {
            return Err(manifest_error("file does not exist".to_string()));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("DOCPRESS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| manifest_error(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| manifest_error(e.to_string()))
    }

    /// All sections in composition order: inline first, then section files.
    pub fn collect_sections(&self, base_dir: &Path) -> Result<Vec<PathKeyedSection>> {
        let mut sections = self.sections.clone();
        for file in &self.sidebar_files {
            let path = if file.is_absolute() {
                file.clone()
            } else {
                base_dir.join(file)
            };
            sections.push(PathKeyedSection::from_path(&path)?);
        }
        Ok(sections)
    }

    pub fn nav_model(&self) -> NavModel {
        self.nav.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sitemap {
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeConfig {
    pub nav: NavModel,
    pub sidebar: SidebarMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub social_links: Vec<SocialLink>,
    pub outline: OutlineDepth,
    /// Theme options, passed through as-is
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// `themeConfig` keys filled from the site configuration itself.
pub const THEME_CONFIG_KEYS: [&str; 4] = ["nav", "sidebar", "socialLinks", "outline"];

/// One problem per theme option that would shadow a [`THEME_CONFIG_KEYS`] entry.
pub fn reserved_option_conflicts(
    options: &serde_json::Map<String, serde_json::Value>,
) -> Vec<String> {
    THEME_CONFIG_KEYS
        .iter()
        .filter(|key| options.contains_key(**key))
        .map(|key| format!("'{}': reserved for the site configuration", key))
        .collect()
}

/// Configuration object handed to the host site generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub title: String,
    pub description: String,
    /// Head tags as `[tag, attributes]` pairs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub head: Vec<(String, serde_json::Map<String, serde_json::Value>)>,
    pub clean_urls: bool,
    /// Cache-busting flag for emitted chunks
    pub meta_chunk: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemap: Option<Sitemap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Layout component overriding the one from `extends`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    pub theme_config: ThemeConfig,
}

impl SiteConfig {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
