//! Plain text and source code extractor.

use std::path::Path;

use serde_json::Value;

use super::{ContentExtractor, extension_of, read_file, source_metadata};
use crate::document::Segment;
use crate::error::Result;
use crate::splitter::Language;

const PROSE_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "rst", "log"];

/// Extractor for plain text and program source files.
///
/// Prose files yield one segment per blank-line separated paragraph, with a
/// `paragraph` index in the metadata. Source files yield a single segment
/// holding the whole file and its `language`, leaving boundaries to the code
/// splitter.
#[derive(Debug, Clone, Default)]
pub struct TextExtractor {
    extensions: Vec<&'static str>,
}

impl TextExtractor {
    /// Create a text extractor for the built-in prose and code extensions.
    pub fn new() -> Self {
        Self {
            extensions: PROSE_EXTENSIONS
                .iter()
                .copied()
                .chain(Language::source_extensions())
                .collect(),
        }
    }
}

impl ContentExtractor for TextExtractor {
    fn name(&self) -> &str {
        "text"
    }

    fn extensions(&self) -> &[&str] {
        &self.extensions
    }

    fn extract(&self, path: &Path) -> Result<Vec<Segment>> {
        let bytes = read_file(path)?;
        let text = String::from_utf8_lossy(&bytes);

        if let Some(language) = Language::from_extension(&extension_of(path)) {
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            let mut metadata = source_metadata(path);
            metadata.insert("language".to_string(), Value::from(language.name()));
            return Ok(vec![Segment::new(text.into_owned(), metadata)]);
        }

        Ok(paragraphs(&text)
            .enumerate()
            .map(|(i, paragraph)| {
                let mut metadata = source_metadata(path);
                metadata.insert("paragraph".to_string(), Value::from(i));
                Segment::new(paragraph, metadata)
            })
            .collect())
    }
}

/// Blank-line separated paragraphs, trimmed, empty ones skipped.
fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    let separator = if text.contains("\r\n") { "\r\n\r\n" } else { "\n\n" };
    text.split(separator).map(str::trim).filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_is_split_into_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "First paragraph.\n\n\n\nSecond one\nspans lines.\n\n  Third.  \n")
            .unwrap();

        let segments = TextExtractor::new().extract(&path).unwrap();
        let texts: Vec<_> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["First paragraph.", "Second one\nspans lines.", "Third."]);
        assert_eq!(segments[2].metadata["paragraph"], Value::from(2));
        assert_eq!(segments[0].metadata["source"], Value::from(path.display().to_string()));
    }

    #[test]
    fn source_code_is_one_segment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.py");
        let source = "import os\n\n\ndef main():\n    pass\n";
        std::fs::write(&path, source).unwrap();

        let segments = TextExtractor::new().extract(&path).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, source);
        assert_eq!(segments[0].metadata["language"], Value::from("python"));
    }

    #[test]
    fn windows_line_endings_split_paragraphs() {
        let texts: Vec<_> = paragraphs("one\r\ntwo\r\n\r\nthree").collect();
        assert_eq!(texts, ["one\r\ntwo", "three"]);
    }
}
