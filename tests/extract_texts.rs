use docbatch::extract::{texts_only, texts_only_document};
use serde_json::json;

#[test]
fn keeps_order_and_drops_entries_without_text() {
    let export = json!({
        "schema_name": "DoclingDocument",
        "texts": [
            {"text": "Invoice 42", "label": "section_header"},
            {"label": "picture"},
            {"text": "Total: 19,99 €", "label": "text"},
            {"caption": "not a text field"},
            {"text": "Zahlungsziel 30 Tage"},
        ],
        "tables": [{"rows": 3}],
    });

    let texts = texts_only(&export);
    assert_eq!(
        texts,
        vec!["Invoice 42", "Total: 19,99 €", "Zahlungsziel 30 Tage"]
    );
}

#[test]
fn missing_texts_key_yields_empty() {
    assert!(texts_only(&json!({"tables": []})).is_empty());
    assert!(texts_only(&json!({})).is_empty());
}

#[test]
fn non_array_texts_yields_empty() {
    assert!(texts_only(&json!({"texts": "not an array"})).is_empty());
    assert!(texts_only(&json!({"texts": {"text": "nested"}})).is_empty());
}

#[test]
fn derivation_is_idempotent() {
    let export = json!({
        "texts": [{"text": "a"}, {"text": "b"}, {"other": true}],
    });
    assert_eq!(texts_only(&export), texts_only(&export));
    assert_eq!(texts_only_document(&export), texts_only_document(&export));
}

#[test]
fn document_wrapper_shape() {
    let export = json!({"texts": [{"text": "only"}]});
    let doc = texts_only_document(&export);
    assert_eq!(doc, json!({"texts": ["only"]}));
}
