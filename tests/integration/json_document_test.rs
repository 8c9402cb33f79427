// tests/integration/json_document_test.rs

//! Integration tests for JSON documents
//! Tests: path get/set, predicate and index selection, array append,
//! file loading, response cleaning and block extraction

use httpmux::core::errors::HttpMuxError;
use httpmux::core::json::{JsonDocument, JsonKind, clean_json_response, extract_balanced_braces};
use serde_json::json;
use std::io::Write;

const ITEMS: &str = r#"{"items":[{"id":1,"name":"a"},{"id":2,"name":"b"}]}"#;

// ===== Get/Set Tests =====

#[tokio::test]
async fn test_set_then_get_on_empty_document() {
    let mut doc = JsonDocument::from_string("{}");
    doc.set_string("a.b", "x").unwrap();
    assert_eq!(doc.get_string("a.b").unwrap(), "x");
}

#[tokio::test]
async fn test_predicate_selection() {
    let mut doc = JsonDocument::from_string(ITEMS);
    assert_eq!(doc.get_string("items[id=2].name").unwrap(), "b");

    doc.set_string("items[id=2].name", "z").unwrap();
    assert_eq!(doc.get_string("items[id=2].name").unwrap(), "z");
    assert_eq!(doc.get_value("items[id=1]").unwrap(), json!({"id":1,"name":"a"}));
}

#[tokio::test]
async fn test_index_selection() {
    let doc = JsonDocument::from_string(ITEMS);
    assert_eq!(doc.get_string("items[0].name").unwrap(), "a");
    assert!(matches!(
        doc.get_string("items[2].name"),
        Err(HttpMuxError::PathNotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_set_leaves_text_byte_identical() {
    let mut doc = JsonDocument::from_string(ITEMS);
    let before = doc.to_string();
    for path in ["", "items[id=3].name", "items[0", "items[1].name.x"] {
        assert!(doc.set_string(path, "z").is_err(), "set at '{path}' should fail");
        assert_eq!(doc.to_string(), before);
    }
    assert_eq!(doc.get_string("items[id=2].name").unwrap(), "b");
}

#[tokio::test]
async fn test_typed_values() {
    let mut doc = JsonDocument::new();
    doc.set_number("temperature", 0.7).unwrap();
    doc.set_number("max_tokens", 256.0).unwrap();
    doc.set_bool("stream", true).unwrap();
    assert_eq!(doc.as_str(), r#"{"temperature":0.7,"max_tokens":256,"stream":true}"#);

    assert_eq!(doc.get_number("max_tokens").unwrap(), 256.0);
    assert!(doc.get_bool("stream").unwrap());
    assert_eq!(
        doc.get("stream", JsonKind::String).unwrap_err(),
        HttpMuxError::WrongKind {
            expected: "string",
            found: "boolean"
        }
    );
}

#[tokio::test]
async fn test_boolean_and_numeric_predicates() {
    let doc = JsonDocument::from_string(
        r#"{"voices":[{"id":"v1","default":false,"rate":1.25},{"id":"v2","default":true,"rate":1.5}]}"#,
    );
    assert_eq!(doc.get_string("voices[default=TRUE].id").unwrap(), "v2");
    assert_eq!(doc.get_string("voices[rate=1.25].id").unwrap(), "v1");
    assert_eq!(doc.get_string("voices[id=\"v2\"].id").unwrap(), "v2");
}

// ===== Array Tests =====

#[tokio::test]
async fn test_build_chat_request() {
    let mut body = JsonDocument::new();
    body.set_string("model", "gpt").unwrap();
    for (role, content) in [("system", "be brief"), ("user", "hi")] {
        let mut message = JsonDocument::new();
        message.set_string("role", role).unwrap();
        message.set_string("content", content).unwrap();
        body.add_array_document("messages", &message).unwrap();
    }
    body.add_array_item("stop", "END").unwrap();
    body.add_array_item("stop", 3.0).unwrap();

    assert_eq!(body.get_string("messages[role=user].content").unwrap(), "hi");
    assert_eq!(body.get_string("messages[0].role").unwrap(), "system");
    assert_eq!(body.get_value("stop").unwrap(), json!(["END", 3]));
}

#[tokio::test]
async fn test_append_to_non_array_fails() {
    let mut doc = JsonDocument::from_string(r#"{"stop":"x"}"#);
    assert!(matches!(
        doc.add_array_item("stop", true),
        Err(HttpMuxError::WrongKind { .. })
    ));
    assert_eq!(doc.as_str(), r#"{"stop":"x"}"#);
}

// ===== Loading and extraction Tests =====

#[tokio::test]
async fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(ITEMS.as_bytes()).unwrap();

    let doc = JsonDocument::from_file(file.path()).unwrap();
    assert!(doc.is_valid());
    assert_eq!(doc.get_string("items[1].name").unwrap(), "b");

    let missing = JsonDocument::from_file("/definitely/not/here.json");
    assert!(matches!(missing, Err(HttpMuxError::Io(_))));
}

#[tokio::test]
async fn test_clean_streamed_chunk_then_parse() {
    let chunk = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n";
    let doc = JsonDocument::from_string(clean_json_response(chunk));
    assert_eq!(doc.get_string("choices[0].delta.content").unwrap(), "Hi");
}

#[tokio::test]
async fn test_extract_embedded_object() {
    let text = "noise {\"a\":{\"b\":1}} trailing";
    let block = extract_balanced_braces(text, 0).unwrap();
    assert_eq!(&text[block.start..block.start + block.len], r#"{"a":{"b":1}}"#);
    assert_eq!(block.document.get_number("a.b").unwrap(), 1.0);

    let reply = "Sure! Here you go:\n```json\n{\"action\":\"wave\",\"note\":\"}\"}\n```";
    let block = extract_balanced_braces(reply, 0).unwrap();
    assert_eq!(block.document.get_string("action").unwrap(), "wave");
    assert_eq!(block.document.get_string("note").unwrap(), "}");
}
