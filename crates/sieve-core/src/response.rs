//! Structured response parsing for model output.
//!
//! Model responses are untrusted free text that usually contains JSON.
//! [`parse_structured`] tries, in order:
//!
//! 1. the raw text as JSON
//! 2. the text with leading/trailing markdown fences removed
//! 3. the first balanced `{...}` span in the text
//!
//! and reports which strategy worked. Anything else is a
//! [`ResponseParseError`], never a panic.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Errors from structured response parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResponseParseError {
    #[error("Empty model response")]
    Empty,

    #[error("No JSON object found in model response")]
    NoJson,

    #[error("Response JSON does not match expected shape: {0}")]
    Shape(String),
}

/// Which fallback step produced the JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    Direct,
    FenceStripped,
    BalancedObject,
}

/// A successfully parsed response.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub strategy: ParseStrategy,
}

/// Parse a model response into a JSON value using the fallback chain.
pub fn parse_json_value(raw: &str) -> Result<Parsed<JsonValue>, ResponseParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ResponseParseError::Empty);
    }

    if let Ok(value) = serde_json::from_str::<JsonValue>(trimmed) {
        return Ok(Parsed {
            value,
            strategy: ParseStrategy::Direct,
        });
    }

    let unfenced = strip_code_fences(trimmed);
    if unfenced != trimmed {
        if let Ok(value) = serde_json::from_str::<JsonValue>(unfenced) {
            return Ok(Parsed {
                value,
                strategy: ParseStrategy::FenceStripped,
            });
        }
    }

    if let Some(span) = first_balanced_object(unfenced) {
        if let Ok(value) = serde_json::from_str::<JsonValue>(span) {
            return Ok(Parsed {
                value,
                strategy: ParseStrategy::BalancedObject,
            });
        }
    }

    Err(ResponseParseError::NoJson)
}

/// Parse a model response into `T`.
///
/// The JSON step uses [`parse_json_value`]; a value that parses but does
/// not deserialize into `T` is a [`ResponseParseError::Shape`] error.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<Parsed<T>, ResponseParseError> {
    let parsed = parse_json_value(raw)?;
    let value = serde_json::from_value::<T>(parsed.value)
        .map_err(|e| ResponseParseError::Shape(e.to_string()))?;

    Ok(Parsed {
        value,
        strategy: parsed.strategy,
    })
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` fence and a trailing
/// ```` ``` ```` fence, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let mut out = text.trim();

    if let Some(rest) = out.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) up to the first newline
        out = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }

    if let Some(rest) = out.trim_end().strip_suffix("```") {
        out = rest;
    }

    out.trim()
}

/// Find the first balanced `{...}` span, skipping braces inside strings.
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
