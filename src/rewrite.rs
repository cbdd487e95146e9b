//! Build-time rewrite of public asset references in content documents.
//!
//! Authors reference assets by their location in the source tree
//! (`/public/img.png`), while the generated site serves them from the root
//! (`/img.png`). The rewrite is a blind textual deletion of the marker: it does
//! not parse markup, so the marker is removed inside code blocks and unrelated
//! strings as well. Existing content depends on exactly this behavior.

use log::trace;
use serde::Serialize;

/// Marker removed from content documents.
pub const PUBLIC_ASSETS_MARKER: &str = "/public";

/// Document suffix the rewrite applies to.
pub const CONTENT_EXTENSION: &str = ".md";

/// Replacement payload handed back to the build pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformOutput {
    pub code: String,
    /// Always `None`: the rewrite does not produce a source map.
    pub map: Option<String>,
}

/// Deletes every occurrence of a marker from documents whose id ends with
/// the content extension. Other documents are left to the pipeline untouched.
///
/// The default rewriter removes [`PUBLIC_ASSETS_MARKER`] from `.md` documents.
#[derive(Debug, Clone)]
pub struct ContentPathRewriter {
    marker: String,
    extension: String,
}

impl Default for ContentPathRewriter {
    fn default() -> Self {
        Self::new(PUBLIC_ASSETS_MARKER, CONTENT_EXTENSION)
    }
}

impl ContentPathRewriter {
    pub fn new(marker: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            extension: extension.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Whether `document_id` names a content document.
    pub fn applies_to(&self, document_id: &str) -> bool {
        document_id.ends_with(&self.extension)
    }

    /// Transform hook: `None` means pass-through, anything else replaces the
    /// document text.
    pub fn transform(&self, document_text: &str, document_id: &str) -> Option<TransformOutput> {
        if !self.applies_to(document_id) {
            return None;
        }

        trace!("Rewriting public asset paths in {}", document_id);
        let code = if self.marker.is_empty() {
            document_text.to_string()
        } else {
            document_text.replace(&self.marker, "")
        };

        Some(TransformOutput { code, map: None })
    }
}
