use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Result of pulling named fields out of model output.
///
/// `values` always holds the defaults for any field that could not be read,
/// so callers can use it even when `success` is false.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub success: bool,
    pub values: HashMap<String, Value>,
}

impl Extraction {
    /// String view of a field. Non-string JSON values are rendered compactly.
    pub fn get_str(&self, field: &str) -> Option<String> {
        self.values.get(field).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

fn flat_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // First brace-delimited object without nesting
    RE.get_or_init(|| Regex::new(r"\{[^{}]*\}").expect("static regex"))
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// The object to read fields from. Valid JSON that is not an object yields an
/// empty map so the defaults stand; only non-JSON text falls back to the regex.
fn locate_object(content: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => Some(Map::new()),
        Err(_) => flat_object()
            .find(content)
            .and_then(|m| parse_object(m.as_str())),
    }
}

/// Extract `fields` from `text`, which should contain a JSON object.
///
/// The whole text is tried first, then the first flat `{...}` inside it
/// (covers code fences and chatter around the object). Success requires every
/// field present, from the object or the defaults, and no string field blank.
/// Non-string values such as `null` are kept as-is for the caller to judge.
pub fn extract_fields(
    text: &str,
    fields: &[&str],
    defaults: &HashMap<String, Value>,
) -> Extraction {
    let mut values = defaults.clone();
    let content = text.trim();

    let Some(object) = locate_object(content) else {
        return Extraction {
            success: false,
            values,
        };
    };

    for field in fields {
        if let Some(v) = object.get(*field) {
            values.insert((*field).to_string(), v.clone());
        }
    }

    let success = fields.iter().all(|field| match values.get(*field) {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
        None => false,
    });

    Extraction { success, values }
}
