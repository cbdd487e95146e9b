use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use crate::components::RegistrationReport;
use crate::config::{reserved_option_conflicts, SiteConfig, SiteManifest, Sitemap, ThemeConfig};
use crate::error::SiteError;
use crate::links::{DanglingLink, LinkValidator};
use crate::registry::{ComponentHost, ComponentRegistry};
use crate::rewrite::ContentPathRewriter;
use crate::sidebar;
use crate::theme::Theme;

/// File the host configuration is written to inside the output directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone)]
pub struct BuildStats {
    pub documents_rewritten: usize,
    pub files_copied: usize,
    pub build_time: Duration,
    pub sidebar_sections: usize,
    pub nav_entries: usize,
    pub dangling_links: Vec<DanglingLink>,
    pub components_registered: usize,
    pub component_failures: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentStats {
    pub documents_rewritten: usize,
    pub files_copied: usize,
}

enum FileOutcome {
    Rewritten,
    Copied,
}

/// Turns a site manifest into the host configuration and a rewritten copy
/// of the content directory, bootstrapping the theme's components on the way.
pub struct SiteBuilder {
    manifest: SiteManifest,
    base_dir: PathBuf,
    content_dir: PathBuf,
    output_dir: PathBuf,
    rewriter: ContentPathRewriter,
    parallel_jobs: usize,
    theme: Option<Theme>,
}

impl SiteBuilder {
    /// `base_dir` anchors every relative path in the manifest.
    pub fn new(manifest: SiteManifest, base_dir: PathBuf) -> Result<Self> {
        let content_dir = resolve(&base_dir, &manifest.content_dir);
        let output_dir = resolve(&base_dir, &manifest.output_dir);

        let theme = match &manifest.theme_dir {
            Some(dir) => {
                let theme_dir = resolve(&base_dir, dir);
                let theme = Theme::from_path(&theme_dir)
                    .with_context(|| format!("Failed to load theme from {}", theme_dir.display()))?;
                info!("Using theme '{}' from {}", theme.name, theme_dir.display());
                Some(theme)
            }
            None => None,
        };

        let parallel_jobs = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        Ok(Self {
            manifest,
            base_dir,
            content_dir,
            output_dir,
            rewriter: ContentPathRewriter::default(),
            parallel_jobs,
            theme,
        })
    }

    /// Load `path` and anchor relative paths at its directory.
    pub fn from_manifest_path(path: &Path) -> Result<Self> {
        let manifest = SiteManifest::load(path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(manifest, base_dir)
    }

    pub fn set_parallel_jobs(&mut self, jobs: usize) {
        self.parallel_jobs = jobs.max(1);
    }

    pub fn set_output_dir(&mut self, output_dir: PathBuf) {
        self.output_dir = output_dir;
    }

    pub fn manifest(&self) -> &SiteManifest {
        &self.manifest
    }

    pub fn theme(&self) -> Option<&Theme> {
        self.theme.as_ref()
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Compose the sidebar and navigation into the host configuration object.
    pub fn build_config(&self) -> Result<SiteConfig> {
        let sections = self.manifest.collect_sections(&self.base_dir)?;
        debug!("Composing {} sidebar section(s)", sections.len());
        let sidebar = sidebar::compose(sections);
        let nav = self.manifest.nav_model();

        let site_options = &self.manifest.theme_options;
        let options = match &self.theme {
            Some(theme) => {
                theme.check_options(site_options)?;
                theme.resolve_options(site_options)
            }
            None => {
                let problems = reserved_option_conflicts(site_options);
                if !problems.is_empty() {
                    return Err(SiteError::ThemeOptions { problems }.into());
                }
                site_options.clone()
            }
        };

        let head = self
            .manifest
            .icon
            .iter()
            .map(|icon| {
                let mut attrs = serde_json::Map::new();
                attrs.insert("rel".to_string(), "icon".into());
                attrs.insert("href".to_string(), icon.clone().into());
                ("link".to_string(), attrs)
            })
            .collect();

        Ok(SiteConfig {
            title: self.manifest.title.clone(),
            description: self.manifest.description.clone(),
            head,
            clean_urls: self.manifest.clean_urls,
            meta_chunk: self.manifest.cache_busting,
            sitemap: self
                .manifest
                .sitemap_hostname
                .clone()
                .map(|hostname| Sitemap { hostname }),
            extends: self.theme.as_ref().and_then(|t| t.extends.clone()),
            layout: self.theme.as_ref().and_then(|t| t.layout.clone()),
            theme_config: ThemeConfig {
                nav,
                sidebar,
                social_links: self.manifest.social_links.clone(),
                outline: self.manifest.outline,
                options,
            },
        })
    }

    /// Check nav and sidebar links against the content directory.
    pub fn check_links(&self, config: &SiteConfig) -> Vec<DanglingLink> {
        if !self.content_dir.exists() {
            warn!(
                "Content directory {} does not exist; every link will be reported",
                self.content_dir.display()
            );
        }
        let validator = LinkValidator::from_content_dir(&self.content_dir);
        validator.check(&config.theme_config.nav, &config.theme_config.sidebar)
    }

    /// Run the rewriter over every file in the content directory, writing the
    /// results under the output directory. Pass-through files are copied.
    pub fn rewrite_content(&self) -> Result<ContentStats> {
        let files = self.discover_content_files();
        info!(
            "Processing {} content files with {} parallel jobs",
            files.len(),
            self.parallel_jobs
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel_jobs)
            .build()?;

        let outcomes: Result<Vec<FileOutcome>> = pool.install(|| {
            files
                .par_iter()
                .map(|file_path| self.process_single_file(file_path))
                .collect()
        });

        let mut stats = ContentStats::default();
        for outcome in outcomes? {
            match outcome {
                FileOutcome::Rewritten => stats.documents_rewritten += 1,
                FileOutcome::Copied => stats.files_copied += 1,
            }
        }
        Ok(stats)
    }

    fn discover_content_files(&self) -> Vec<PathBuf> {
        let canonical_output = self.output_dir.canonicalize().ok();

        WalkDir::new(&self.content_dir)
            .into_iter()
            .filter_entry(|entry| {
                // Skip the output directory when it lives inside the content directory
                match (&canonical_output, entry.path().canonicalize()) {
                    (Some(output), Ok(path)) => !path.starts_with(output),
                    _ => true,
                }
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable content entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()
    }

    fn process_single_file(&self, file_path: &Path) -> Result<FileOutcome> {
        let relative_path = file_path.strip_prefix(&self.content_dir).map_err(|_| {
            anyhow::anyhow!(
                "Path '{}' is not inside content directory '{}'",
                file_path.display(),
                self.content_dir.display()
            )
        })?;
        let document_id = relative_path.to_string_lossy().replace('\\', "/");
        let output_path = self.output_dir.join(relative_path);

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        if self.rewriter.applies_to(&document_id) {
            let text = std::fs::read_to_string(file_path)
                .with_context(|| format!("Failed to read {}", file_path.display()))?;
            if let Some(output) = self.rewriter.transform(&text, &document_id) {
                std::fs::write(&output_path, output.code)
                    .with_context(|| format!("Failed to write {}", output_path.display()))?;
                return Ok(FileOutcome::Rewritten);
            }
        }

        std::fs::copy(file_path, &output_path).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                file_path.display(),
                output_path.display()
            )
        })?;
        Ok(FileOutcome::Copied)
    }

    /// Run the theme's enhancement hook against `host`, if a theme is configured.
    pub async fn bootstrap_theme(
        &self,
        host: &dyn ComponentHost,
    ) -> Result<Option<RegistrationReport>> {
        match &self.theme {
            Some(theme) => {
                let report = theme
                    .enhance_app(host)
                    .await
                    .with_context(|| format!("Theme '{}' failed to bootstrap", theme.name))?;
                Ok(Some(report))
            }
            None => Ok(None),
        }
    }

    pub async fn clean(&self) -> Result<()> {
        if self.output_dir.exists() {
            tokio::fs::remove_dir_all(&self.output_dir).await?;
        }
        Ok(())
    }

    pub async fn build(&self) -> Result<BuildStats> {
        let start_time = Instant::now();
        info!("Starting build process...");

        let config = self.build_config()?;

        let wants_link_check = self.manifest.validate_links || self.manifest.fail_on_dangling_links;
        let dangling_links = if wants_link_check {
            let found = self.check_links(&config);
            if self.manifest.fail_on_dangling_links {
                if let Some(first) = found.first() {
                    return Err(SiteError::DanglingLinks {
                        count: found.len(),
                        first: first.to_string(),
                    }
                    .into());
                }
            }
            found
        } else {
            Vec::new()
        };

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| {
                format!("Failed to create output directory: {}", self.output_dir.display())
            })?;

        let content = if self.content_dir.exists() {
            self.rewrite_content()?
        } else {
            warn!("Content directory {} does not exist", self.content_dir.display());
            ContentStats::default()
        };

        let config_path = self.output_dir.join(CONFIG_FILE_NAME);
        tokio::fs::write(&config_path, config.to_json_pretty()?)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        let registry = ComponentRegistry::new();
        let report = self.bootstrap_theme(&registry).await?.unwrap_or_default();

        let build_time = start_time.elapsed();
        let stats = BuildStats {
            documents_rewritten: content.documents_rewritten,
            files_copied: content.files_copied,
            build_time,
            sidebar_sections: config.theme_config.sidebar.len(),
            nav_entries: config.theme_config.nav.len(),
            dangling_links,
            components_registered: registry.len(),
            component_failures: report.failed.len(),
        };

        info!("Build completed in {:?}", build_time);
        Ok(stats)
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
