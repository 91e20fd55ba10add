use serde_json::{Value, json};

/// Pulls the ordered text strings out of a document's JSON export: every
/// element of the top-level `texts` array that carries a string `text`
/// field, in original order. Elements without one are dropped silently; a
/// missing or non-array `texts` key yields an empty list.
pub fn texts_only(export: &Value) -> Vec<String> {
    let Some(items) = export.get("texts").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| item.get("text"))
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect()
}

/// The derived extract as persisted: `{"texts": [...]}`.
pub fn texts_only_document(export: &Value) -> Value {
    json!({ "texts": texts_only(export) })
}
