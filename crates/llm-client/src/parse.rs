use serde_json::{Map, Value};

use crate::error::{LlmError, LlmResult};

/// Strip a leading Markdown code fence (optionally tagged `json`).
fn strip_fence(text: &str) -> &str {
    let text = text.trim();
    if !text.starts_with("```") {
        return text;
    }
    let mut parts = text.split("```");
    parts.next();
    match (parts.next(), parts.next()) {
        (Some(body), Some(_)) => {
            let body = body.trim();
            match body.get(..4) {
                Some(tag) if tag.eq_ignore_ascii_case("json") => body[4..].trim(),
                _ => body,
            }
        }
        _ => text,
    }
}

fn as_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Parse a model reply into a JSON object.
///
/// Tolerates a surrounding ```json fence and prose around the outermost
/// `{...}`. Anything else is an invalid response.
pub fn extract_json_object(text: &str) -> LlmResult<Map<String, Value>> {
    let body = strip_fence(text);
    if body.is_empty() {
        return Err(LlmError::InvalidResponse("empty reply".to_string()));
    }

    if let Some(map) = serde_json::from_str::<Value>(body).ok().and_then(as_object) {
        return Ok(map);
    }

    let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
        return Err(LlmError::InvalidResponse("no JSON object in reply".to_string()));
    };
    if end <= start {
        return Err(LlmError::InvalidResponse("no JSON object in reply".to_string()));
    }

    let value: Value = serde_json::from_str(&body[start..=end])?;
    as_object(value).ok_or_else(|| LlmError::InvalidResponse("reply is not a JSON object".to_string()))
}
