//! Tolerant JSON extraction from model output.
//!
//! Models asked for strict JSON still wrap it in code fences or prose.
//! These helpers strip fences, locate the first top-level JSON object,
//! and hand the slice to serde for the actual schema check.

use serde::de::DeserializeOwned;

/// Strip a surrounding markdown code fence, if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Find the first top-level `{...}` object in the text.
///
/// Balances braces while respecting JSON string literals and escapes,
/// so prose before or after the object is tolerated.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a value of type `T` out of model text.
///
/// Tries the whole (fence-stripped) text first, then the first
/// embedded JSON object. Returns `None` when neither parses.
pub fn parse_json_lenient<T: DeserializeOwned>(text: &str) -> Option<T> {
    let stripped = strip_code_fences(text);
    if stripped.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(stripped) {
        return Some(value);
    }

    let object = extract_json_object(stripped)?;
    serde_json::from_str(object).ok()
}
