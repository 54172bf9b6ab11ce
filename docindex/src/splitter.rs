//! Text splitting.
//!
//! [`TextSplitter`] breaks text into chunks of at most `chunk_size` units by
//! trying a hierarchy of separators, largest first:
//!
//! - [`SplitMode::Default`]: paragraphs, lines, words, then characters
//! - [`SplitMode::Code`]: language-aware boundaries (classes, functions)
//!   before the generic separators
//! - [`SplitMode::TokenCount`]: the default hierarchy, measured in model
//!   tokens instead of characters
//!
//! Pieces smaller than `chunk_size` are merged back together greedily, and
//! adjacent chunks share up to `chunk_overlap` units of trailing context.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tiktoken_rs::CoreBPE;
use tracing::warn;

use crate::config::validate_chunking;
use crate::error::{DocIndexError, Result};

/// The tokenizer model used by [`split`] in token-count mode.
pub const DEFAULT_TOKEN_MODEL: &str = "gpt-3.5-turbo";

const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// How chunk boundaries are chosen and chunk size is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitMode {
    /// Paragraph, line, word, character separators; size in characters.
    #[default]
    Default,
    /// Language-aware separators first; size in characters.
    Code,
    /// Default separators; size in model tokens.
    TokenCount,
}

impl SplitMode {
    /// The kebab-case name of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitMode::Default => "default",
            SplitMode::Code => "code",
            SplitMode::TokenCount => "token-count",
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitMode {
    type Err = DocIndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(SplitMode::Default),
            "code" | "python" => Ok(SplitMode::Code),
            "token-count" | "tokens" | "tiktoken" => Ok(SplitMode::TokenCount),
            other => Err(DocIndexError::Config(format!(
                "unknown split mode '{other}', expected one of: default, code, token-count"
            ))),
        }
    }
}

/// Programming languages with dedicated code separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Go,
    Java,
    Cpp,
    Ruby,
}

/// Program-source extensions and their languages. Notebooks are handled
/// separately by [`Language::from_extension`].
const SOURCE_EXTENSIONS: &[(&str, Language)] = &[
    ("py", Language::Python),
    ("pyw", Language::Python),
    ("rs", Language::Rust),
    ("js", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("mjs", Language::JavaScript),
    ("cjs", Language::JavaScript),
    ("ts", Language::TypeScript),
    ("tsx", Language::TypeScript),
    ("go", Language::Go),
    ("java", Language::Java),
    ("kt", Language::Java),
    ("scala", Language::Java),
    ("c", Language::Cpp),
    ("h", Language::Cpp),
    ("cpp", Language::Cpp),
    ("cc", Language::Cpp),
    ("cxx", Language::Cpp),
    ("hpp", Language::Cpp),
    ("hxx", Language::Cpp),
    ("rb", Language::Ruby),
];

impl Language {
    /// Map a file extension (with or without the leading dot, any case) to a
    /// language.
    ///
    /// Notebooks map to Python.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        if ext == "ipynb" {
            return Some(Language::Python);
        }
        SOURCE_EXTENSIONS.iter().find(|(e, _)| *e == ext).map(|(_, language)| *language)
    }

    /// Lowercase program-source extensions, without the dot.
    pub fn source_extensions() -> impl Iterator<Item = &'static str> {
        SOURCE_EXTENSIONS.iter().map(|(ext, _)| *ext)
    }

    /// A lowercase display name.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::Ruby => "ruby",
        }
    }

    /// Separators in priority order, ending with the generic fallbacks.
    pub fn separators(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["\nclass ", "\ndef ", "\n\tdef ", "\n\n", "\n", " ", ""],
            Language::Rust => &[
                "\nfn ", "\nconst ", "\nlet ", "\nif ", "\nwhile ", "\nfor ", "\nloop ",
                "\nmatch ", "\n\n", "\n", " ", "",
            ],
            Language::JavaScript => &[
                "\nfunction ", "\nconst ", "\nlet ", "\nvar ", "\nclass ", "\nif ", "\nfor ",
                "\nwhile ", "\nswitch ", "\ncase ", "\ndefault ", "\n\n", "\n", " ", "",
            ],
            Language::TypeScript => &[
                "\nenum ", "\ninterface ", "\nnamespace ", "\ntype ", "\nclass ", "\nfunction ",
                "\nconst ", "\nlet ", "\nvar ", "\nif ", "\nfor ", "\nwhile ", "\nswitch ",
                "\ncase ", "\ndefault ", "\n\n", "\n", " ", "",
            ],
            Language::Go => &[
                "\nfunc ", "\nvar ", "\nconst ", "\ntype ", "\nif ", "\nfor ", "\nswitch ",
                "\ncase ", "\n\n", "\n", " ", "",
            ],
            Language::Java => &[
                "\nclass ", "\npublic ", "\nprotected ", "\nprivate ", "\nstatic ", "\nif ",
                "\nfor ", "\nwhile ", "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
            ],
            Language::Cpp => &[
                "\nclass ", "\nvoid ", "\nint ", "\nfloat ", "\ndouble ", "\nif ", "\nfor ",
                "\nwhile ", "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
            ],
            Language::Ruby => &[
                "\ndef ", "\nclass ", "\nif ", "\nunless ", "\nwhile ", "\nfor ", "\ndo ",
                "\nbegin ", "\nrescue ", "\n\n", "\n", " ", "",
            ],
        }
    }
}

/// The mode and language used to split a file with extension `ext`.
///
/// Program-source and notebook extensions force [`SplitMode::Code`] with
/// their language; anything else uses `requested`.
pub fn mode_for_extension(ext: &str, requested: SplitMode) -> (SplitMode, Option<Language>) {
    match Language::from_extension(ext) {
        Some(language) => (SplitMode::Code, Some(language)),
        None => (requested, None),
    }
}

enum Measure {
    Chars,
    Tokens(Box<CoreBPE>),
}

impl fmt::Debug for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Chars => f.write_str("Chars"),
            Measure::Tokens(_) => f.write_str("Tokens"),
        }
    }
}

/// A chunk of text tagged with the index of the segment it was cut from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitChunk {
    /// Position of the source segment in the input sequence.
    pub segment: usize,
    /// The chunk text.
    pub text: String,
}

/// Recursive separator-based text splitter.
///
/// # Example
///
/// ```rust,ignore
/// use docindex::TextSplitter;
///
/// let splitter = TextSplitter::new(512, 64)?;
/// let chunks = splitter.split_text(&long_text);
/// ```
#[derive(Debug)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &'static [&'static str],
    measure: Measure,
}

impl TextSplitter {
    /// Create a character-measured splitter with the default separators.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::Config`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap, separators: DEFAULT_SEPARATORS, measure: Measure::Chars })
    }

    /// Create a character-measured splitter using `language`'s separators.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TextSplitter::new`].
    pub fn for_language(language: Language, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let mut splitter = Self::new(chunk_size, chunk_overlap)?;
        splitter.separators = language.separators();
        Ok(splitter)
    }

    /// Create a splitter that measures chunks in `model`'s tokens.
    ///
    /// Unknown models fall back to the `cl100k_base` encoding.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TextSplitter::new`], or [`DocIndexError::Config`]
    /// if no tokenizer can be loaded.
    pub fn token_count(model: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(e) => {
                warn!(model, error = %e, "model not found, using cl100k_base encoding");
                tiktoken_rs::cl100k_base().map_err(|e| {
                    DocIndexError::Config(format!("failed to load cl100k_base encoding: {e}"))
                })?
            }
        };
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS,
            measure: Measure::Tokens(Box::new(bpe)),
        })
    }

    /// Create the splitter for `mode`. Code mode uses `language`'s
    /// separators, defaulting to Python.
    ///
    /// # Errors
    ///
    /// See [`TextSplitter::new`] and [`TextSplitter::token_count`].
    pub fn for_mode(
        mode: SplitMode,
        language: Option<Language>,
        chunk_size: usize,
        chunk_overlap: usize,
        token_model: &str,
    ) -> Result<Self> {
        match mode {
            SplitMode::Default => Self::new(chunk_size, chunk_overlap),
            SplitMode::Code => Self::for_language(
                language.unwrap_or(Language::Python),
                chunk_size,
                chunk_overlap,
            ),
            SplitMode::TokenCount => Self::token_count(token_model, chunk_size, chunk_overlap),
        }
    }

    /// Maximum chunk length.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between adjacent chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Length of `text` in this splitter's unit.
    pub fn length(&self, text: &str) -> usize {
        match &self.measure {
            Measure::Chars => text.chars().count(),
            Measure::Tokens(bpe) => bpe.encode_with_special_tokens(text).len(),
        }
    }

    /// Split one text into chunks.
    ///
    /// Blank input yields no chunks. Input that already fits is returned
    /// unchanged as a single chunk.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if self.length(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        self.split_recursive(text, self.separators)
    }

    /// Split each segment independently, remembering which segment every
    /// chunk came from.
    pub fn split_segments<S: AsRef<str>>(&self, segments: &[S]) -> Vec<SplitChunk> {
        segments
            .iter()
            .enumerate()
            .flat_map(|(segment, text)| {
                self.split_text(text.as_ref())
                    .into_iter()
                    .map(move |text| SplitChunk { segment, text })
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if self.length(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge_pieces(&pending));
                pending.clear();
            }
            if remaining.is_empty() {
                push_trimmed(&mut chunks, piece);
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_pieces(&pending));
        }

        chunks
    }

    /// Greedily join pieces into chunks no longer than `chunk_size`, carrying
    /// up to `chunk_overlap` of trailing pieces into the next chunk.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = self.length(piece);
            if !window.is_empty()
                && self.window_length(&window, total, Some((piece, len))) > self.chunk_size
            {
                self.push_window(&mut chunks, &window);
                while let Some(&(_, front)) = window.front() {
                    if self.window_length(&window, total, None) <= self.chunk_overlap
                        && self.window_length(&window, total, Some((piece, len))) <= self.chunk_size
                    {
                        break;
                    }
                    window.pop_front();
                    total -= front;
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        self.push_window(&mut chunks, &window);
        chunks
    }

    /// Length of the window joined with `next`. Character counts add up;
    /// token counts do not, because BPE merges across piece boundaries.
    fn window_length(
        &self,
        window: &VecDeque<(&str, usize)>,
        total: usize,
        next: Option<(&str, usize)>,
    ) -> usize {
        match &self.measure {
            Measure::Chars => total + next.map_or(0, |(_, len)| len),
            Measure::Tokens(bpe) => {
                let joined: String =
                    window.iter().map(|(piece, _)| *piece).chain(next.map(|(p, _)| p)).collect();
                bpe.encode_with_special_tokens(&joined).len()
            }
        }
    }

    fn push_window(&self, chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
        let joined: String = window.iter().map(|(piece, _)| *piece).collect();
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.length(trimmed) <= self.chunk_size {
            chunks.push(trimmed.to_string());
            return;
        }
        // Trimming can re-tokenize a window past the limit.
        if window.len() > 1 {
            for &entry in window {
                self.push_window(chunks, &VecDeque::from([entry]));
            }
        } else {
            chunks.extend(self.split_recursive(trimmed, &[""]));
        }
    }
}

/// Pick the first separator present in `text`; the empty separator always
/// matches and ends the hierarchy.
fn pick_separator<'s>(
    text: &str,
    separators: &'s [&'static str],
) -> (&'static str, &'s [&'static str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    (separators.last().copied().unwrap_or(""), &[])
}

/// Split at `separator`, attaching each separator to the piece that follows it.
/// The empty separator splits into characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split a sequence of segments into chunks.
///
/// Code mode uses the Python separators; token-count mode measures with the
/// [`DEFAULT_TOKEN_MODEL`] tokenizer.
///
/// # Errors
///
/// Returns [`DocIndexError::Config`] if `chunk_overlap >= chunk_size` or
/// `chunk_size == 0`.
pub fn split<S: AsRef<str>>(
    segments: &[S],
    chunk_size: usize,
    chunk_overlap: usize,
    mode: SplitMode,
) -> Result<Vec<String>> {
    let splitter =
        TextSplitter::for_mode(mode, None, chunk_size, chunk_overlap, DEFAULT_TOKEN_MODEL)?;
    Ok(splitter.split_segments(segments).into_iter().map(|chunk| chunk.text).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_segments_yield_no_chunks() {
        let chunks = split(&["", "   \n\n  "], 100, 0, SplitMode::Default).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn short_segment_is_one_verbatim_chunk() {
        let text = "A short paragraph.\n\nAnd a second one.";
        let chunks = split(&[text], 100, 10, SplitMode::Default).unwrap();
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn overlap_not_smaller_than_size_is_a_config_error() {
        let err = split(&["text"], 10, 10, SplitMode::Default).unwrap_err();
        assert!(matches!(err, DocIndexError::Config(_)));
        assert!(TextSplitter::new(0, 0).is_err());
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let a = "a".repeat(60);
        let b = "b".repeat(60);
        let c = "c".repeat(60);
        let text = format!("{a}\n\n{b}\n\n{c}");

        let chunks = TextSplitter::new(100, 0).unwrap().split_text(&text);
        assert_eq!(chunks, vec![a, b, c]);
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let chunks = TextSplitter::new(10, 0).unwrap().split_text(&"x".repeat(25));
        assert_eq!(chunks, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn adjacent_chunks_share_overlap() {
        let chunks =
            TextSplitter::new(10, 4).unwrap().split_text("one two three four five six");
        assert_eq!(chunks, vec!["one two", "two three", "four five", "six"]);
    }

    #[test]
    fn multibyte_text_is_measured_in_characters() {
        let text = "é".repeat(30);
        let chunks = TextSplitter::new(10, 0).unwrap().split_text(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() == 10));
    }

    #[test]
    fn code_mode_splits_at_function_boundaries() {
        let source = "def alpha():\n    x = 1\n    return x\ndef beta():\n    return 2";

        let code = split(&[source], 50, 0, SplitMode::Code).unwrap();
        assert_eq!(code, vec!["def alpha():\n    x = 1\n    return x", "def beta():\n    return 2"]);

        let prose = split(&[source], 50, 0, SplitMode::Default).unwrap();
        assert!(prose[0].ends_with("def beta():"));
    }

    #[test]
    fn token_mode_measures_tokens_not_characters() {
        let text = "word ".repeat(200);
        let splitter = TextSplitter::token_count(DEFAULT_TOKEN_MODEL, 50, 0).unwrap();
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() >= 4);
        assert!(chunks.iter().all(|c| c.chars().count() > 50));
        assert!(chunks.iter().all(|c| splitter.length(c) <= 50));
    }

    #[test]
    fn token_chunks_are_measured_after_joining() {
        let text = "a bq0a0a0dbjbaq0a0a0a0a0000 0000a0a0a0atb0fag0aadvb0a0a0a0000 ".repeat(6);
        let splitter = TextSplitter::token_count(DEFAULT_TOKEN_MODEL, 46, 20).unwrap();
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(splitter.length(chunk) <= 46, "{chunk:?} has {} tokens", splitter.length(chunk));
        }
    }

    #[test]
    fn unknown_token_model_falls_back_to_cl100k() {
        assert!(TextSplitter::token_count("not-a-real-model", 100, 0).is_ok());
    }

    #[test]
    fn split_segments_records_source_segment() {
        let splitter = TextSplitter::new(5, 0).unwrap();
        let chunks = splitter.split_segments(&["abc", "", "defghij"]);
        let segments: Vec<_> = chunks.iter().map(|c| c.segment).collect();
        assert_eq!(segments, vec![0, 2, 2]);
    }

    #[test]
    fn code_extensions_are_detected() {
        assert_eq!(Language::from_extension(".py"), Some(Language::Python));
        assert_eq!(Language::from_extension("ipynb"), Some(Language::Python));
        assert_eq!(Language::from_extension("RS"), Some(Language::Rust));
        assert_eq!(Language::from_extension(".pdf"), None);
        assert_eq!(Language::from_extension(".tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension(".PY"), Some(Language::Python));
        assert!(Language::source_extensions().all(|ext| Language::from_extension(ext).is_some()));
        assert!(!Language::source_extensions().any(|ext| ext == "ipynb"));
    }

    #[test]
    fn code_extensions_force_code_mode() {
        assert_eq!(
            mode_for_extension(".Rs", SplitMode::TokenCount),
            (SplitMode::Code, Some(Language::Rust))
        );
        assert_eq!(
            mode_for_extension(".ipynb", SplitMode::Default),
            (SplitMode::Code, Some(Language::Python))
        );
        assert_eq!(mode_for_extension(".md", SplitMode::TokenCount), (SplitMode::TokenCount, None));
        assert_eq!(mode_for_extension("", SplitMode::Default), (SplitMode::Default, None));
    }

    #[test]
    fn split_mode_parses_aliases() {
        assert_eq!("token-count".parse::<SplitMode>().unwrap(), SplitMode::TokenCount);
        assert_eq!("tiktoken".parse::<SplitMode>().unwrap(), SplitMode::TokenCount);
        assert_eq!("Code".parse::<SplitMode>().unwrap(), SplitMode::Code);
        assert!("fancy".parse::<SplitMode>().is_err());
    }
}
