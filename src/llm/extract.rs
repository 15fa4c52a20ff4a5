//! JSON extraction utilities for parsing LLM responses.
//!
//! The pre-filter and reviewer stages expect a single JSON object back from
//! the model, but real responses often wrap it in markdown fences or
//! surround it with prose. The extraction tries, in order:
//!
//! 1. JSON in a ```json code block
//! 2. JSON in a generic ``` code block
//! 3. Direct JSON (content starts with '{')
//! 4. First balanced `{...}` anywhere in the content
//!
//! Each candidate is validated with serde_json before being returned.

use regex::Regex;

/// Extracts a JSON object from an LLM response that might be wrapped in
/// markdown or surrounded by explanatory text.
///
/// Returns `None` if no substring parses as a JSON object.
pub fn extract_embedded_object(content: &str) -> Option<String> {
    let trimmed = content.trim();

    if let Some(json) = extract_from_json_code_block(trimmed) {
        if serde_json::from_str::<serde_json::Value>(&json).is_ok() {
            return Some(json);
        }
    }

    if let Some(json) = extract_from_generic_code_block(trimmed) {
        if serde_json::from_str::<serde_json::Value>(&json).is_ok() {
            return Some(json);
        }
    }

    // Direct or embedded object via brace matching
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = find_matching_brace(&trimmed[start..]) {
            let candidate = &trimmed[start..=start + end];
            if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
                return Some(candidate.to_string());
            }
        }
        // First balanced candidate was invalid; fall back to last { .. last }
        let last_start = trimmed.rfind('{')?;
        let last_end = trimmed.rfind('}')?;
        if last_end > last_start {
            let candidate = &trimmed[last_start..=last_end];
            if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
                return Some(candidate.to_string());
            }
        }
    }

    None
}

/// Finds the matching closing brace for a string starting with '{'.
///
/// Handles nested braces, string literals and escape sequences.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                depth += 1;
            }
            '}' if !in_string => {
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

/// Extract JSON from a ```json ... ``` code block.
fn extract_from_json_code_block(content: &str) -> Option<String> {
    let re = Regex::new(r"```json\s*\n?([\s\S]*?)\n?```").ok()?;
    let caps = re.captures(content)?;
    let json_content = caps.get(1)?.as_str().trim();
    if json_content.starts_with('{') {
        if let Some(end) = find_matching_brace(json_content) {
            return Some(json_content[..=end].to_string());
        }
        return Some(json_content.to_string());
    }
    None
}

/// Extract JSON from a generic ``` ... ``` code block.
fn extract_from_generic_code_block(content: &str) -> Option<String> {
    let re = Regex::new(r"```(?:\w+)?\s*\n?([\s\S]*?)\n?```").ok()?;
    let caps = re.captures(content)?;
    let block_content = caps.get(1)?.as_str().trim();
    let start = block_content.find('{')?;
    let end = find_matching_brace(&block_content[start..])?;
    Some(block_content[start..=start + end].to_string())
}
