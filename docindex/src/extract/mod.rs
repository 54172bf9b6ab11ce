//! Content extraction: turn a file into ordered text segments with metadata.
//!
//! Each format is handled by a [`ContentExtractor`]; the
//! [`ExtractorRegistry`] picks one by file extension.

mod notebook;
#[cfg(feature = "office")]
mod office;
#[cfg(feature = "pdf")]
mod pdf;
mod tabular;
mod text;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::document::{Metadata, Segment};
use crate::error::{DocIndexError, Result};

pub use notebook::NotebookExtractor;
#[cfg(feature = "office")]
pub use office::{DocxExtractor, PptxExtractor};
#[cfg(feature = "pdf")]
pub use pdf::PdfExtractor;
#[cfg(feature = "office")]
pub use tabular::ExcelExtractor;
pub use tabular::CsvExtractor;
pub use text::TextExtractor;

/// Converts one file into ordered `(text, metadata)` segments.
pub trait ContentExtractor: Send + Sync {
    /// A short name for logs, e.g. `"pdf"`.
    fn name(&self) -> &str;

    /// Lowercase extensions (without the dot) this extractor handles.
    fn extensions(&self) -> &[&str];

    /// Extract the segments of the file at `path`.
    fn extract(&self, path: &Path) -> Result<Vec<Segment>>;
}

/// Registry of content extractors keyed by file extension.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    by_extension: HashMap<String, Arc<dyn ContentExtractor>>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<_> = self.by_extension.keys().collect();
        extensions.sort();
        f.debug_struct("ExtractorRegistry").field("extensions", &extensions).finish()
    }
}

impl ExtractorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in extractor enabled by the
    /// crate's features.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TextExtractor::new());
        registry.register(CsvExtractor::new());
        registry.register(NotebookExtractor::new());
        #[cfg(feature = "pdf")]
        registry.register(PdfExtractor::new());
        #[cfg(feature = "office")]
        {
            registry.register(ExcelExtractor::new());
            registry.register(DocxExtractor::new());
            registry.register(PptxExtractor::new());
        }
        registry
    }

    /// Register an extractor for all of its extensions, replacing any
    /// previous extractor for the same extension.
    pub fn register<E: ContentExtractor + 'static>(&mut self, extractor: E) {
        let extractor: Arc<dyn ContentExtractor> = Arc::new(extractor);
        for ext in extractor.extensions() {
            self.by_extension.insert((*ext).to_string(), Arc::clone(&extractor));
        }
    }

    /// Get the extractor for a file, by its extension.
    pub fn get_for_file(&self, path: &Path) -> Option<Arc<dyn ContentExtractor>> {
        self.by_extension.get(&extension_of(path)).cloned()
    }

    /// Whether some extractor handles this file's extension.
    pub fn supports(&self, path: &Path) -> bool {
        self.by_extension.contains_key(&extension_of(path))
    }

    /// Extract the segments of a file.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::UnsupportedFormat`] if no extractor matches
    /// the extension, or the extractor's own error.
    pub fn extract(&self, path: &Path) -> Result<Vec<Segment>> {
        let extractor = self.get_for_file(path).ok_or_else(|| {
            let ext = extension_of(path);
            DocIndexError::UnsupportedFormat(if ext.is_empty() {
                format!("{} has no file extension", path.display())
            } else {
                format!("unsupported file extension: .{ext}")
            })
        })?;
        extractor.extract(path)
    }
}

/// Lowercase extension of `path` without the dot, or `""`.
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).unwrap_or_default()
}

/// Metadata map seeded with the `source` path.
pub(crate) fn source_metadata(path: &Path) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), Value::String(path.display().to_string()));
    metadata
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| DocIndexError::io(path, e))
}
