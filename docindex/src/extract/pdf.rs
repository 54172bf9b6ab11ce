//! PDF extractor.

use std::path::Path;

use serde_json::Value;

use super::{ContentExtractor, read_file, source_metadata};
use crate::document::Segment;
use crate::error::{DocIndexError, Result};

/// Extractor for `.pdf` files: one segment per page with text.
///
/// Pages are numbered from 1 in the `page` metadata key.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a PDF extractor.
    pub fn new() -> Self {
        Self
    }
}

impl ContentExtractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn extract(&self, path: &Path) -> Result<Vec<Segment>> {
        let bytes = read_file(path)?;
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| DocIndexError::extraction("pdf", e))?;

        Ok(pages(&text)
            .map(|(page, text)| {
                let mut metadata = source_metadata(path);
                metadata.insert("page".to_string(), Value::from(page));
                Segment::new(text, metadata)
            })
            .collect())
    }
}

/// Pages are separated by form feeds in the extracted text. Blank pages are
/// skipped but still counted.
fn pages(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split('\x0C')
        .enumerate()
        .map(|(i, page)| (i + 1, page.trim()))
        .filter(|(_, page)| !page.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_feeds_separate_pages() {
        let found: Vec<_> = pages("Cover\n\x0C\n\x0CBody text\nmore\x0C").collect();
        assert_eq!(found, [(1, "Cover"), (3, "Body text\nmore")]);
    }

    #[test]
    fn invalid_pdf_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();

        let err = PdfExtractor::new().extract(&path).unwrap_err();
        assert!(matches!(err, DocIndexError::Extraction { .. }));
    }
}
