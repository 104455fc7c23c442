//! Structured-output extraction
//!
//! Locates the first balanced curly-brace object in free-form model text
//! and parses it into the agent's declared shape. Extraction failure never
//! surfaces as an error: callers substitute their deterministic fallback.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Scan for the first balanced `{...}` substring that parses as a JSON
/// object. Brace tracking is string- and escape-aware, so braces embedded
/// in string values do not unbalance the scan.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(open) = text[search_from..].find('{').map(|i| i + search_from) {
        if let Some(end) = find_balanced_end(bytes, open) {
            if let Ok(value) = serde_json::from_str::<Value>(&text[open..=end]) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
        search_from = open + 1;
    }

    None
}

fn find_balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Deserialize the first embedded object into a typed draft. `None` means
/// the caller should fall back.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Option<T> {
    let value = extract_json_object(text)?;
    serde_json::from_value(value).ok()
}
