//! Response recovery: pull a JSON object out of a noisy model answer.
//!
//! Models wrap the requested JSON in prose ("Sure! Here is the JSON:") or
//! code fences often enough that parsing the raw answer directly fails on a
//! large share of otherwise good responses. Recovery locates a `{…}` span
//! and parses only that.
//!
//! ## Span selection
//!
//! * [`RecoveryStrategy::Greedy`]: first `{` to **last** `}`. Nested
//!   objects are always captured whole, but two separate fragments
//!   (`{"a":1} … {"b":2}`) are swallowed together with the prose between
//!   them and fail to parse.
//! * [`RecoveryStrategy::Balanced`]: first `{` to its matching `}`,
//!   counting depth and skipping braces inside string literals. Takes only
//!   the first fragment when there are several.
//!
//! ## Failure modes
//!
//! | Answer | Error |
//! |---|---|
//! | empty / whitespace | [`FileError::EmptyResponse`] |
//! | no `{…}` span | [`FileError::NoJsonFound`] (raw answer kept for logs) |
//! | span is not JSON | [`FileError::InvalidJson`] (span kept for logs) |

use crate::config::RecoveryStrategy;
use crate::error::FileError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static RE_GREEDY_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Locate the candidate JSON span in `response`.
pub fn locate_json(response: &str, strategy: RecoveryStrategy) -> Option<&str> {
    match strategy {
        RecoveryStrategy::Greedy => greedy_span(response),
        RecoveryStrategy::Balanced => balanced_span(response),
    }
}

fn greedy_span(response: &str) -> Option<&str> {
    RE_GREEDY_OBJECT.find(response).map(|m| m.as_str())
}

fn balanced_span(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in response[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&response[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Recover the JSON object from a model answer.
///
/// Null-valued object members are dropped from the result so absent fields
/// are omitted rather than written as `null`.
pub fn recover_json(response: &str, strategy: RecoveryStrategy) -> Result<Value, FileError> {
    if response.trim().is_empty() {
        return Err(FileError::EmptyResponse);
    }

    let span = locate_json(response, strategy).ok_or_else(|| FileError::NoJsonFound {
        raw: response.to_string(),
    })?;

    let value: Value = serde_json::from_str(span.trim()).map_err(|e| FileError::InvalidJson {
        content: span.to_string(),
        detail: e.to_string(),
    })?;

    Ok(strip_nulls(value))
}

/// Remove `null` members from every object, recursively. Array elements
/// are kept as-is apart from recursing into them.
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}
