use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while composing a site configuration or bootstrapping a theme.
#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("Failed to parse sidebar section file {path}: {message}")]
    SectionFile { path: PathBuf, message: String },

    #[error("Failed to load component module '{module}': {message}")]
    ComponentLoad { module: String, message: String },

    #[error("Invalid component discovery pattern '{pattern}': {message}")]
    Discovery { pattern: String, message: String },

    #[error("Theme error: {0}")]
    Theme(String),

    #[error("Invalid theme options: {}", problems.join("; "))]
    ThemeOptions { problems: Vec<String> },

    #[error("{count} dangling link(s) found, first: {first}")]
    DanglingLinks { count: usize, first: String },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SiteError>;
