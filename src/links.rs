//! Optional dangling-link check for navigation and sidebar links.
//!
//! Composition never validates links. This pass can be run afterwards against
//! the routes a content directory would produce; callers decide whether its
//! findings are warnings or a hard failure.

use log::{debug, warn};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use walkdir::WalkDir;

use crate::nav::NavModel;
use crate::sidebar::SidebarMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkProblem {
    /// No content document produces this route.
    Missing,
    /// The link does not start with `/`.
    NotSiteRelative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingLink {
    /// Where the link was declared, e.g. `nav "Guide"`.
    pub origin: String,
    pub link: String,
    pub problem: LinkProblem,
}

impl fmt::Display for DanglingLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.problem {
            LinkProblem::Missing => write!(f, "{} -> {} (no such page)", self.origin, self.link),
            LinkProblem::NotSiteRelative => {
                write!(f, "{} -> {} (link must start with '/')", self.origin, self.link)
            }
        }
    }
}

/// Known page routes of a site.
#[derive(Debug, Clone, Default)]
pub struct LinkValidator {
    routes: HashSet<String>,
}

impl LinkValidator {
    pub fn new<I, S>(routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            routes: routes.into_iter().map(Into::into).collect(),
        }
    }

    /// Collect routes from every `.md` file under `content_dir`.
    ///
    /// `guide/intro.md` becomes `/guide/intro`, `guide/index.md` becomes `/guide/`.
    pub fn from_content_dir(content_dir: &Path) -> Self {
        let mut routes = HashSet::new();

        for entry in WalkDir::new(content_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            let Ok(relative) = path.strip_prefix(content_dir) else {
                continue;
            };

            let route = relative
                .with_extension("")
                .to_string_lossy()
                .replace('\\', "/");
            let route = match route.strip_suffix("index") {
                Some(dir) if dir.is_empty() || dir.ends_with('/') => format!("/{}", dir),
                _ => format!("/{}", route),
            };
            routes.insert(route);
        }

        debug!("Collected {} routes from {}", routes.len(), content_dir.display());
        Self { routes }
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Whether `link` resolves to a known page, accepting clean-URL and
    /// `.html` forms and ignoring fragments and query strings.
    pub fn resolves(&self, link: &str) -> bool {
        let path = link.split(['#', '?']).next().unwrap_or(link);
        let path = path.strip_suffix(".html").unwrap_or(path);
        let path = path.strip_suffix(".md").unwrap_or(path);
        // `/guide/index` names the same page as `/guide/`
        let path = match path.strip_suffix("index") {
            Some(dir) if dir.ends_with('/') => dir,
            _ => path,
        };

        if self.routes.contains(path) {
            return true;
        }
        if path.ends_with('/') {
            let trimmed = path.trim_end_matches('/');
            return !trimmed.is_empty() && self.routes.contains(trimmed);
        }
        self.routes.contains(&format!("{}/", path))
    }

    fn check_link(&self, origin: String, link: &str, found: &mut Vec<DanglingLink>) {
        if is_external(link) {
            return;
        }
        let problem = if !link.starts_with('/') {
            Some(LinkProblem::NotSiteRelative)
        } else if !self.resolves(link) {
            Some(LinkProblem::Missing)
        } else {
            None
        };

        if let Some(problem) = problem {
            let dangling = DanglingLink {
                origin,
                link: link.to_string(),
                problem,
            };
            warn!("Dangling link: {}", dangling);
            found.push(dangling);
        }
    }

    /// Every nav and sidebar link that does not resolve.
    pub fn check(&self, nav: &NavModel, sidebar: &SidebarMap) -> Vec<DanglingLink> {
        let mut found = Vec::new();

        for entry in nav.entries() {
            self.check_link(format!("nav \"{}\"", entry.text), &entry.link, &mut found);
        }
        for (root, label, link) in sidebar.links() {
            self.check_link(format!("sidebar {} \"{}\"", root, label), link, &mut found);
        }

        found
    }
}

fn is_external(link: &str) -> bool {
    link.starts_with("http://")
        || link.starts_with("https://")
        || link.starts_with("mailto:")
        || link.starts_with("//")
}
