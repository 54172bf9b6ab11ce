//! Strict parsing of language-model output used by task planning.
//!
//! Model replies are treated as untrusted data: they are deserialized
//! against a fixed shape and rejected with [`DocIndexError::InvalidInput`]
//! when they do not match.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DocIndexError, Result};

/// One planned step, as produced by the task-generation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Short label for the step.
    pub name: String,
    /// What the step should accomplish, in prose.
    pub instruction: String,
    /// Comma-separated tool names.
    #[serde(default)]
    pub tools_needed: String,
}

impl Task {
    /// The tool names listed in `tools_needed`.
    pub fn tools(&self) -> Vec<&str> {
        self.tools_needed.split(',').map(str::trim).filter(|t| !t.is_empty()).collect()
    }
}

/// A fenced code block found in a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// The language tag after the opening fence, if any.
    pub language: Option<String>,
    /// The block body, trimmed.
    pub code: String,
}

static CODE_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(\w+)?\s(.*?)```").ok());

/// Parse a JSON array of tasks, optionally wrapped in a code fence.
///
/// # Errors
///
/// Returns [`DocIndexError::InvalidInput`] if the reply is not a JSON array
/// of objects with `name` and `instruction` strings.
pub fn parse_task_list(reply: &str) -> Result<Vec<Task>> {
    let body = strip_fence(reply.trim());
    serde_json::from_str(body)
        .map_err(|e| DocIndexError::InvalidInput(format!("malformed task list: {e}")))
}

/// Parse a yes/no evaluation reply: `true` or `false`, any case, optionally
/// quoted or followed by a period.
///
/// # Errors
///
/// Returns [`DocIndexError::InvalidInput`] for anything else.
pub fn parse_verdict(reply: &str) -> Result<bool> {
    let word = reply.trim().trim_end_matches('.').trim_matches(|c| c == '"' || c == '\'');
    if word.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if word.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(DocIndexError::InvalidInput(format!("expected true or false, got {reply:?}")))
    }
}

/// Every fenced code block in `markdown`, in order.
pub fn extract_code_blocks(markdown: &str) -> Vec<CodeBlock> {
    let Some(pattern) = CODE_BLOCK.as_ref() else {
        return Vec::new();
    };
    pattern
        .captures_iter(markdown)
        .map(|caps| CodeBlock {
            language: caps.get(1).map(|m| m.as_str().to_string()),
            code: caps.get(2).map_or("", |m| m.as_str()).trim().to_string(),
        })
        .collect()
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_task_lists() {
        let reply = r#"```json
        [
            {"name": "task1", "instruction": "do this", "tools_needed": "search, code_executor"},
            {"name": "task2", "instruction": "do that"}
        ]
        ```"#;
        let tasks = parse_task_list(reply).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].tools(), ["search", "code_executor"]);
        assert!(tasks[1].tools().is_empty());
    }

    #[test]
    fn rejects_python_literals_and_code() {
        for reply in [
            "[{'name': 'task1', 'instruction': 'x'}]",
            "__import__('os').system('rm -rf /')",
            r#"{"name": "not a list", "instruction": "x"}"#,
            r#"[{"name": "missing instruction"}]"#,
        ] {
            let err = parse_task_list(reply).unwrap_err();
            assert!(matches!(err, DocIndexError::InvalidInput(_)), "{reply}");
        }
    }

    #[test]
    fn verdicts() {
        assert!(parse_verdict("True").unwrap());
        assert!(parse_verdict(" \"true\".\n").unwrap());
        assert!(!parse_verdict("FALSE").unwrap());
        assert!(parse_verdict("maybe").is_err());
        assert!(parse_verdict("True or False").is_err());
    }

    #[test]
    fn code_blocks_keep_language_and_order() {
        let markdown = "Run this:\n```python\nprint(1)\n```\nthen\n```\nls -la\n```";
        let blocks = extract_code_blocks(markdown);
        assert_eq!(
            blocks,
            [
                CodeBlock { language: Some("python".into()), code: "print(1)".into() },
                CodeBlock { language: None, code: "ls -la".into() },
            ]
        );
    }
}
