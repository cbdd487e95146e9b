//! Sidebar trees and their composition into a per-section sidebar map.
//!
//! Each documentation area contributes a [`PathKeyedSection`]: a root URL path
//! and the ordered tree shown for pages under it. [`compose`] folds a sequence of
//! sections into one [`SidebarMap`] using plain key-overwrite semantics: a later
//! section with the same root path replaces the earlier tree wholesale. Trees are
//! never merged node by node.

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SiteError};

/// A node in a sidebar tree.
///
/// Without a `link` the node is a grouping header; with no `children` it is a leaf.
/// Input documents use `label`/`children`, the emitted host configuration uses
/// `text`/`items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarNode {
    #[serde(rename(serialize = "text", deserialize = "label"), alias = "text")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
    #[serde(
        default,
        rename(serialize = "items", deserialize = "children"),
        alias = "items",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<SidebarNode>,
}

impl SidebarNode {
    /// A leaf pointing at a page.
    pub fn page(label: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            link: Some(link.into()),
            collapsed: None,
            children: Vec::new(),
        }
    }

    /// A header without a link of its own.
    pub fn group(label: impl Into<String>, children: Vec<SidebarNode>) -> Self {
        Self {
            label: label.into(),
            link: None,
            collapsed: None,
            children,
        }
    }

    /// Make a group clickable by giving it a link of its own.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Render the group folded (`true`) or unfolded (`false`); unset leaves
    /// it non-collapsible.
    pub fn collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = Some(collapsed);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// All `(label, link)` pairs in this subtree, depth-first in render order.
    pub fn flatten(&self) -> Vec<(&str, &str)> {
        let mut result = Vec::new();
        if let Some(link) = &self.link {
            result.push((self.label.as_str(), link.as_str()));
        }
        for child in &self.children {
            result.extend(child.flatten());
        }
        result
    }
}

/// One documentation area: the tree shown for pages under `root_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathKeyedSection {
    pub root_path: String,
    #[serde(default)]
    pub tree: Vec<SidebarNode>,
}

impl PathKeyedSection {
    pub fn new(root_path: impl Into<String>, tree: Vec<SidebarNode>) -> Self {
        Self {
            root_path: root_path.into(),
            tree,
        }
    }

    /// Load a section from a YAML, TOML or JSON file, chosen by extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let parse_error = |message: String| SiteError::SectionFile {
            path: path.to_path_buf(),
            message,
        };

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
            Some("json") => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
            }
            other => Err(parse_error(format!(
                "unsupported section file extension {:?}",
                other.unwrap_or("")
            ))),
        }
    }
}

/// Mapping from root path to sidebar tree, in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SidebarMap(IndexMap<String, Vec<SidebarNode>>);

impl SidebarMap {
    pub fn get(&self, root_path: &str) -> Option<&[SidebarNode]> {
        self.0.get(root_path).map(Vec::as_slice)
    }

    pub fn contains(&self, root_path: &str) -> bool {
        self.0.contains_key(root_path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn root_paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SidebarNode])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// The tree a page at `page_path` would show: the longest root path that
    /// prefixes it.
    pub fn section_for(&self, page_path: &str) -> Option<(&str, &[SidebarNode])> {
        self.iter()
            .filter(|(root, _)| page_path.starts_with(root))
            .max_by_key(|(root, _)| root.len())
    }

    /// Every `(label, link)` pair across all trees, grouped by root path.
    pub fn links(&self) -> Vec<(&str, &str, &str)> {
        let mut links = Vec::new();
        for (root, tree) in self.iter() {
            for node in tree {
                for (label, link) in node.flatten() {
                    links.push((root, label, link));
                }
            }
        }
        links
    }
}

/// Compose sections into one sidebar map.
///
/// Sections are applied in the given order. A section whose root path is
/// already present replaces that tree entirely; the key keeps its original
/// position. Links are not validated here.
pub fn compose<I>(sections: I) -> SidebarMap
where
    I: IntoIterator<Item = PathKeyedSection>,
{
    let mut map = IndexMap::new();

    for section in sections {
        let PathKeyedSection { root_path, tree } = section;
        debug!("Composing sidebar section {} ({} top-level nodes)", root_path, tree.len());
        if map.insert(root_path.clone(), tree).is_some() {
            warn!(
                "Sidebar root path '{}' defined more than once; the later section replaces it",
                root_path
            );
        }
    }

    SidebarMap(map)
}
