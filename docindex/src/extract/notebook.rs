//! Jupyter notebook extractor.
//!
//! Notebooks are decoded with a typed schema; anything that does not match
//! it is rejected rather than interpreted.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::{ContentExtractor, read_file, source_metadata};
use crate::document::Segment;
use crate::error::{DocIndexError, Result};

#[derive(Debug, Deserialize)]
struct Notebook {
    cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: CellType,
    source: Source,
    #[serde(default)]
    outputs: Vec<Output>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum CellType {
    Code,
    Markdown,
    Raw,
}

impl CellType {
    fn as_str(self) -> &'static str {
        match self {
            CellType::Code => "code",
            CellType::Markdown => "markdown",
            CellType::Raw => "raw",
        }
    }
}

/// Cell sources and stream outputs are either one string or a list of lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Source {
    Text(String),
    Lines(Vec<String>),
}

impl Source {
    fn joined(&self) -> String {
        match self {
            Source::Text(text) => text.clone(),
            Source::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Output {
    output_type: String,
    #[serde(default)]
    text: Option<Source>,
    #[serde(default)]
    data: Option<serde_json::Map<String, Value>>,
}

impl Output {
    fn plain_text(&self) -> Option<String> {
        match self.output_type.as_str() {
            "stream" => self.text.as_ref().map(Source::joined),
            "execute_result" | "display_data" => self
                .data
                .as_ref()
                .and_then(|data| data.get("text/plain"))
                .and_then(|value| serde_json::from_value::<Source>(value.clone()).ok())
                .map(|source| source.joined()),
            _ => None,
        }
    }
}

/// Extractor for `.ipynb` notebooks: one segment per non-empty cell.
///
/// Metadata carries the cell position and `cell_type`. Text outputs of code
/// cells are appended when enabled with [`NotebookExtractor::with_outputs`].
#[derive(Debug, Clone, Default)]
pub struct NotebookExtractor {
    include_outputs: bool,
}

impl NotebookExtractor {
    /// Create a notebook extractor that ignores cell outputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text outputs to code cells.
    pub fn with_outputs(mut self, include_outputs: bool) -> Self {
        self.include_outputs = include_outputs;
        self
    }
}

impl ContentExtractor for NotebookExtractor {
    fn name(&self) -> &str {
        "notebook"
    }

    fn extensions(&self) -> &[&str] {
        &["ipynb"]
    }

    fn extract(&self, path: &Path) -> Result<Vec<Segment>> {
        let bytes = read_file(path)?;
        let notebook: Notebook = serde_json::from_slice(&bytes)
            .map_err(|e| DocIndexError::extraction("ipynb", format!("invalid notebook: {e}")))?;

        let mut segments = Vec::new();
        for (i, cell) in notebook.cells.iter().enumerate() {
            let mut text = cell.source.joined();
            if self.include_outputs && cell.cell_type == CellType::Code {
                for output in cell.outputs.iter().filter_map(Output::plain_text) {
                    text.push_str("\n\n");
                    text.push_str(&output);
                }
            }
            if text.trim().is_empty() {
                continue;
            }

            let mut metadata = source_metadata(path);
            metadata.insert("cell".to_string(), Value::from(i));
            metadata.insert("cell_type".to_string(), Value::from(cell.cell_type.as_str()));
            segments.push(Segment::new(text, metadata));
        }
        Ok(segments)
    }
}
