//! Pure title extraction: given a response body and content-type, produce a
//! short human-readable title. No I/O, no async.

use serde_json::Value;

const JSON_PROBE_KEYS: [&str; 5] = ["title", "name", "login", "message", "description"];

/// Extracts a title from a response body. Never returns an empty string.
pub fn extract_title(body: &str, content_type: &str) -> String {
    let trimmed = body.trim_start();
    let looks_like_json = content_type.to_ascii_lowercase().contains("application/json")
        || trimmed.starts_with('{')
        || trimmed.starts_with('[');

    if looks_like_json {
        extract_json_title(body)
    } else {
        extract_html_title(body)
    }
}

fn extract_json_title(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            for key in JSON_PROBE_KEYS {
                if let Some(Value::String(s)) = map.get(key) {
                    if !s.is_empty() {
                        return s.clone();
                    }
                }
            }

            let mut remaining: Vec<&String> = map
                .keys()
                .filter(|k| !JSON_PROBE_KEYS.contains(&k.as_str()))
                .collect();
            remaining.sort();

            for key in remaining {
                if let Some(Value::String(s)) = map.get(key) {
                    if s.len() < 100 {
                        return format!("{key}: {s}");
                    }
                }
            }

            "JSON response (no title field)".to_string()
        }
        // Array or scalar top-level values are not supported; preserved
        // intentionally rather than treated as a richer extraction target.
        Ok(_) => "Invalid JSON".to_string(),
        Err(_) => "Invalid JSON".to_string(),
    }
}

fn extract_html_title(body: &str) -> String {
    let lower = body.to_ascii_lowercase();

    let Some(open_start) = lower.find("<title") else {
        return "No HTML title found".to_string();
    };

    let Some(open_tag_len) = lower[open_start..].find('>') else {
        return "Malformed HTML title".to_string();
    };

    let content_start = open_start + open_tag_len + 1;

    let Some(close_offset) = lower[content_start..].find("</title") else {
        return "Malformed HTML title".to_string();
    };

    let content_end = content_start + close_offset;
    let inner = body[content_start..content_end].trim();

    if inner.is_empty() {
        "Empty HTML title".to_string()
    } else {
        inner.to_string()
    }
}
