// src/core/json/extract.rs

//! Helpers for pulling JSON out of text that is not pure JSON: server-sent
//! event framing and objects embedded in free-form (e.g. language-model)
//! output.

use super::JsonDocument;
use crate::core::errors::HttpMuxError;

/// Strips a server-sent-event `data:` prefix from a streamed chunk.
///
/// Only applies when the text starts with `data: {` or `data:{` and, ignoring
/// trailing whitespace, ends with `}`. Everything before the first `{` and the
/// trailing whitespace are removed. Any other input is returned unchanged.
pub fn clean_json_response(text: &str) -> &str {
    if !(text.starts_with("data: {") || text.starts_with("data:{")) {
        return text;
    }
    let trimmed = text.trim_end();
    if !trimmed.ends_with('}') {
        return text;
    }
    match trimmed.find('{') {
        Some(open) => &trimmed[open..],
        None => text,
    }
}

/// A balanced `{...}` block found inside a larger text.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBlock {
    /// Byte offset of the opening brace.
    pub start: usize,
    /// Length in bytes, braces included.
    pub len: usize,
    pub document: JsonDocument,
}

/// Finds the first complete `{...}` block at or after byte offset
/// `search_start` and returns it as a document.
///
/// Brace depth is counted from the first `{`; braces inside JSON string
/// literals of the block are ignored. Fails if no `{` is found, the braces
/// never balance, or the balanced block is not valid JSON.
pub fn extract_balanced_braces(
    text: &str,
    search_start: usize,
) -> Result<JsonBlock, HttpMuxError> {
    let haystack = text.get(search_start..).ok_or_else(|| {
        HttpMuxError::InvalidRequest(format!(
            "search start {search_start} is outside the text or not on a character boundary"
        ))
    })?;
    let open = haystack
        .find('{')
        .ok_or_else(|| HttpMuxError::InvalidJson("no '{' found".to_string()))?;
    let start = search_start + open;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let len = offset + 1;
                    let document = JsonDocument::from_string(&text[start..start + len]);
                    if !document.is_valid() {
                        return Err(HttpMuxError::InvalidJson(format!(
                            "block at {start} is balanced but does not parse"
                        )));
                    }
                    return Ok(JsonBlock {
                        start,
                        len,
                        document,
                    });
                }
            }
            _ => {}
        }
    }
    Err(HttpMuxError::InvalidJson(format!(
        "unbalanced braces starting at {start}"
    )))
}
