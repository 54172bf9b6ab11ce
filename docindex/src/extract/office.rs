//! Word and PowerPoint extractors.
//!
//! Both formats are zip archives of XML parts. Visible text lives in `t`
//! elements grouped into `p` paragraphs, in both WordprocessingML and
//! DrawingML, so one reader serves both.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::Value;
use zip::ZipArchive;

use super::{ContentExtractor, source_metadata};
use crate::document::Segment;
use crate::error::{DocIndexError, Result};

const DOCX_BODY: &str = "word/document.xml";
const PPTX_SLIDE_PREFIX: &str = "ppt/slides/slide";

/// Extractor for `.docx` documents: the whole body as one segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

impl DocxExtractor {
    /// Create a Word document extractor.
    pub fn new() -> Self {
        Self
    }
}

impl ContentExtractor for DocxExtractor {
    fn name(&self) -> &str {
        "docx"
    }

    fn extensions(&self) -> &[&str] {
        &["docx"]
    }

    fn extract(&self, path: &Path) -> Result<Vec<Segment>> {
        let mut archive = open_archive(path, "docx")?;
        let xml = read_part(&mut archive, DOCX_BODY, "docx")?;
        let text = xml_paragraphs(&xml, "docx")?.join("\n");
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Segment::new(text, source_metadata(path))])
    }
}

/// Extractor for `.pptx` presentations: one segment per non-empty slide.
///
/// Slides are read in presentation order and numbered from 1 in the
/// `slide` metadata key.
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxExtractor;

impl PptxExtractor {
    /// Create a PowerPoint extractor.
    pub fn new() -> Self {
        Self
    }
}

impl ContentExtractor for PptxExtractor {
    fn name(&self) -> &str {
        "pptx"
    }

    fn extensions(&self) -> &[&str] {
        &["pptx"]
    }

    fn extract(&self, path: &Path) -> Result<Vec<Segment>> {
        let mut archive = open_archive(path, "pptx")?;

        let mut slides: Vec<(usize, String)> = archive
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slides.sort_by_key(|(n, _)| *n);

        let mut segments = Vec::new();
        for (number, part) in slides {
            let xml = read_part(&mut archive, &part, "pptx")?;
            let text = xml_paragraphs(&xml, "pptx")?.join("\n");
            if text.trim().is_empty() {
                continue;
            }
            let mut metadata = source_metadata(path);
            metadata.insert("slide".to_string(), Value::from(number));
            segments.push(Segment::new(text, metadata));
        }
        Ok(segments)
    }
}

/// `ppt/slides/slide12.xml` -> 12. Layouts, masters and rels don't match.
fn slide_number(name: &str) -> Option<usize> {
    name.strip_prefix(PPTX_SLIDE_PREFIX)?.strip_suffix(".xml")?.parse().ok()
}

fn open_archive(path: &Path, format: &str) -> Result<ZipArchive<File>> {
    let file = File::open(path).map_err(|e| DocIndexError::io(path, e))?;
    ZipArchive::new(file).map_err(|e| DocIndexError::extraction(format, e))
}

fn read_part(archive: &mut ZipArchive<File>, name: &str, format: &str) -> Result<String> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| DocIndexError::extraction(format, format!("{name}: {e}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| DocIndexError::extraction(format, format!("{name}: {e}")))?;
    Ok(xml)
}

/// Collect the text of `t` elements, one string per non-empty `p` element.
fn xml_paragraphs(xml: &str, format: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"tab" => current.push('\t'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| DocIndexError::extraction(format, e))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let paragraph = current.trim();
                    if !paragraph.is_empty() {
                        paragraphs.push(paragraph.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DocIndexError::extraction(
                    format,
                    format!("XML error at position {}: {e}", reader.buffer_position()),
                ));
            }
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        paragraphs.push(tail.to_string());
    }
    Ok(paragraphs)
}
