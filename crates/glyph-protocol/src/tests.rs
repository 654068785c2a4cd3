//! Tests for the protocol types and codec.

use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;

// ============================================================================
// Request Encoding Tests
// ============================================================================

#[test]
fn test_encode_info_request() {
    let request = InvocationRequest::info("html", vec![]);
    let json: serde_json::Value = serde_json::from_slice(&encode(&request).unwrap()).unwrap();

    assert_eq!(json["type"], "info");
    assert_eq!(json["outputFormat"], "html");
    assert_eq!(json["version"], PROTOCOL_VERSION);
    assert!(json.get("interests").is_none(), "empty interests are omitted");
}

#[test]
fn test_encode_action_request() {
    let mut metadata = BTreeMap::new();
    metadata.insert("author".to_string(), "Ada".to_string());

    let request = InvocationRequest::action(
        "latex",
        true,
        vec![
            ContentNode::text("x^2"),
            ExtensionCall::inline("em").with_argument("y").into(),
        ],
        metadata,
    );
    let json: serde_json::Value = serde_json::from_slice(&encode(&request).unwrap()).unwrap();

    assert_eq!(json["type"], "action");
    assert_eq!(json["outputFormat"], "latex");
    assert_eq!(json["block"], true);
    assert_eq!(json["arguments"][0], "x^2");
    assert_eq!(json["arguments"][1]["name"], "em");
    assert_eq!(json["arguments"][1]["block"], false);
    assert_eq!(json["arguments"][1]["arguments"][0], "y");
    assert_eq!(json["metadata"]["author"], "Ada");
}

#[test]
fn test_encode_is_compact() {
    let bytes = encode(&InvocationRequest::info("html", vec!["title".into()])).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with(r#"{"type":"info""#), "got {}", text);
    assert!(!text.contains('\n'));
}

#[test]
fn test_expected_response_kind() {
    assert_eq!(
        InvocationRequest::info("html", vec![]).expected_response(),
        ResponseKind::Info
    );
    assert_eq!(
        InvocationRequest::action("html", false, vec![], BTreeMap::new()).expected_response(),
        ResponseKind::Action
    );
}

// ============================================================================
// Action Response Tests
// ============================================================================

#[test]
fn test_decode_action_minimal_uses_defaults() {
    let response = decode_action(br#"{"content": ["hello"]}"#).unwrap();

    assert_eq!(response.content, vec![ContentNode::text("hello")]);
    assert!(response.errors.is_empty());
    assert!(response.warnings.is_empty());
    assert!(response.imports.is_empty());
    assert_eq!(response.top, "");
    assert_eq!(response.bottom, "");
}

#[test]
fn test_decode_action_full() {
    let raw = br#"{
        "errors": ["bad input"],
        "warnings": ["deprecated"],
        "imports": ["amsmath"],
        "top": "<style></style>",
        "bottom": "<script></script>",
        "content": [
            "Strings are raw text. ",
            {"name": "code", "block": true, "arguments": ["{}", "json"]},
            {"name": "id", "block": true, "arguments": ["This is **bold**!"]}
        ]
    }"#;

    let response = decode_action(raw).unwrap();

    assert_eq!(response.errors, vec!["bad input"]);
    assert_eq!(response.warnings, vec!["deprecated"]);
    assert_eq!(response.imports, vec!["amsmath"]);
    assert_eq!(response.top, "<style></style>");
    assert_eq!(response.bottom, "<script></script>");
    assert_eq!(response.content.len(), 3);

    let code = response.content[1].as_call().unwrap();
    assert_eq!(code.name, "code");
    assert!(code.block);
    assert_eq!(code.arguments, vec![ContentNode::text("{}"), ContentNode::text("json")]);
    assert_eq!(
        response.content[2].as_call().unwrap().first_text_argument(),
        Some("This is **bold**!")
    );
}

#[test]
fn test_decode_action_call_defaults() {
    let response = decode_action(br#"{"content": [{"name": "hr"}]}"#).unwrap();
    let call = response.content[0].as_call().unwrap();

    assert_eq!(call, &ExtensionCall::inline("hr"));
}

#[test]
fn test_decode_action_nested_call_arguments() {
    let response = decode_action(
        br#"{"content": [{"name": "a", "arguments": [{"name": "b", "arguments": ["x"]}]}]}"#,
    )
    .unwrap();
    let outer = response.content[0].as_call().unwrap();
    let inner = outer.arguments[0].as_call().unwrap();

    assert_eq!(inner.name, "b");
    assert_eq!(inner.first_text_argument(), Some("x"));
}

#[test]
fn test_decode_action_missing_content() {
    let err = decode_action(br#"{"errors": []}"#).unwrap_err();

    match err {
        ProtocolError::SchemaViolation { kind, message } => {
            assert_eq!(kind, "action");
            assert!(message.contains("content"), "message: {}", message);
        }
        other => panic!("expected schema violation, got {:?}", other),
    }
}

#[test]
fn test_decode_action_content_entry_wrong_type() {
    let err = decode_action(br#"{"content": ["ok", 42]}"#).unwrap_err();

    match err {
        ProtocolError::SchemaViolation { message, .. } => {
            assert!(
                message.contains("a string or an extension call object"),
                "message: {}",
                message
            );
        }
        other => panic!("expected schema violation, got {:?}", other),
    }
}

#[test]
fn test_decode_action_call_without_name() {
    let err = decode_action(br#"{"content": [{"block": true}]}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::SchemaViolation { .. }));
}

#[test]
fn test_decode_action_call_with_blank_name() {
    let err = decode_action(br#"{"content": [{"name": "  "}]}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::SchemaViolation { .. }));
}

#[test]
fn test_decode_action_wrong_field_type() {
    let err = decode_action(br#"{"content": [], "errors": "not a list"}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::SchemaViolation { .. }));
}

#[test]
fn test_decode_action_not_an_object() {
    let err = decode_action(b"[\"text\"]").unwrap_err();

    match err {
        ProtocolError::SchemaViolation { message, .. } => {
            assert!(message.contains("an array"), "message: {}", message)
        }
        other => panic!("expected schema violation, got {:?}", other),
    }
}

// ============================================================================
// Malformed / Empty Output Tests
// ============================================================================

#[test]
fn test_decode_human_readable_output_is_malformed() {
    let err = decode_action(b"Error: unknown request type\n").unwrap_err();

    match err {
        ProtocolError::Malformed(message) => {
            assert!(message.contains("Error: unknown request type"), "message: {}", message)
        }
        other => panic!("expected malformed, got {:?}", other),
    }
}

#[test]
fn test_decode_trailing_garbage_is_malformed() {
    let err = decode_action(br#"{"content": []} extra"#).unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));
}

#[test]
fn test_decode_trailing_newline_is_accepted() {
    assert!(decode_action(b"{\"content\": []}\n").is_ok());
}

#[test]
fn test_decode_empty_output_is_no_response() {
    assert_eq!(decode_action(b"").unwrap_err(), ProtocolError::NoResponse);
    assert_eq!(decode_info(b"  \n\t").unwrap_err(), ProtocolError::NoResponse);
}

#[test]
fn test_malformed_excerpt_is_truncated() {
    let noise = "x".repeat(1000);
    let err = decode_action(noise.as_bytes()).unwrap_err();

    match err {
        ProtocolError::Malformed(message) => assert!(message.len() < 500, "len {}", message.len()),
        other => panic!("expected malformed, got {:?}", other),
    }
}

// ============================================================================
// Info Response Tests
// ============================================================================

#[test]
fn test_decode_info_full() {
    let raw = br#"{
        "name": "upper",
        "version": "0.1",
        "description": "Makes all letters uppercase",
        "supportedFormats": ["html", "latex"],
        "blockSupport": true,
        "inlineSupport": false,
        "errors": [],
        "warnings": ["slow"],
        "interests": ["author"]
    }"#;

    let info = decode_info(raw).unwrap();

    assert_eq!(info.descriptor.name, "upper");
    assert_eq!(info.descriptor.version, "0.1");
    assert_eq!(info.descriptor.description, "Makes all letters uppercase");
    assert!(info.descriptor.supports_format("html"));
    assert!(info.descriptor.supports_format("latex"));
    assert!(!info.descriptor.supports_format("markdown"));
    assert!(info.descriptor.supports_variant(true));
    assert!(!info.descriptor.supports_variant(false));
    assert_eq!(info.descriptor.interests, vec!["author"]);
    assert_eq!(info.warnings, vec!["slow"]);
    assert!(info.errors.is_empty());
}

#[test]
fn test_decode_info_optional_fields_default() {
    let raw = br#"{"name": "upper", "version": "0.1", "supportedFormats": ["html"],
                   "blockSupport": true, "inlineSupport": true}"#;

    let info = decode_info(raw).unwrap();

    assert_eq!(info.descriptor.description, "");
    assert!(info.descriptor.interests.is_empty());
    assert!(info.errors.is_empty());
    assert!(info.warnings.is_empty());
}

#[test]
fn test_decode_info_missing_version() {
    let raw = br#"{"name": "upper", "supportedFormats": ["html"],
                   "blockSupport": true, "inlineSupport": true}"#;

    match decode_info(raw).unwrap_err() {
        ProtocolError::SchemaViolation { kind, message } => {
            assert_eq!(kind, "info");
            assert!(message.contains("version"), "message: {}", message);
        }
        other => panic!("expected schema violation, got {:?}", other),
    }
}

#[test]
fn test_decode_info_missing_name() {
    let raw = br#"{"version": "1", "supportedFormats": [], "blockSupport": true, "inlineSupport": true}"#;
    assert!(matches!(
        decode_info(raw).unwrap_err(),
        ProtocolError::SchemaViolation { .. }
    ));
}

#[test]
fn test_decode_info_blank_name() {
    let raw = br#"{"name": "", "version": "1", "supportedFormats": [], "blockSupport": true, "inlineSupport": true}"#;
    assert!(matches!(
        decode_info(raw).unwrap_err(),
        ProtocolError::SchemaViolation { .. }
    ));
}

#[test]
fn test_decode_dispatches_on_kind() {
    let action = decode(br#"{"content": []}"#, ResponseKind::Action).unwrap();
    assert_eq!(action.kind(), ResponseKind::Action);
    assert!(action.into_action().is_some());

    // An action payload is not a valid info payload.
    assert!(decode(br#"{"content": []}"#, ResponseKind::Info).is_err());
}

#[test]
fn test_info_response_serializes_flat() {
    let info = InfoResponse::new(
        ExtensionDescriptor::new("upper", "1.0")
            .with_format("html")
            .with_description("Uppercase"),
    );
    let json = serde_json::to_value(&info).unwrap();

    assert_eq!(json["name"], "upper");
    assert_eq!(json["supportedFormats"][0], "html");
    assert_eq!(json["blockSupport"], true);
    assert!(json.get("errors").is_none());
}

// ============================================================================
// Request Decoding Tests
// ============================================================================

#[test]
fn test_decode_request_action() {
    let bytes = encode(&InvocationRequest::action(
        "html",
        false,
        vec![ContentNode::text("abc")],
        BTreeMap::new(),
    ))
    .unwrap();

    match decode_request(&bytes).unwrap() {
        InvocationRequest::Action(action) => {
            assert_eq!(action.output_format, "html");
            assert_eq!(action.arguments, vec![ContentNode::text("abc")]);
        }
        other => panic!("expected action, got {:?}", other),
    }
}

#[test]
fn test_decode_request_unknown_type() {
    let err = decode_request(br#"{"type": "hello", "outputFormat": "html"}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::SchemaViolation { .. }));
}

// ============================================================================
// Descriptor Tests
// ============================================================================

#[test]
fn test_descriptor_builder() {
    let descriptor = ExtensionDescriptor::new("calc", "2.1")
        .with_format("html")
        .with_format("latex")
        .with_interest("precision");

    assert_eq!(descriptor.supported_formats.len(), 2);
    assert!(descriptor.supports_variant(true));
    assert!(descriptor.supports_variant(false));
    assert_eq!(descriptor.interests, vec!["precision"]);
}

// ============================================================================
// Robustness Properties
// ============================================================================

proptest! {
    /// Arbitrary bytes never panic the decoder.
    #[test]
    fn decode_never_panics_on_bytes(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode(&bytes, ResponseKind::Action);
        let _ = decode(&bytes, ResponseKind::Info);
        let _ = decode_request(&bytes);
    }

    /// Arbitrary JSON-ish text never panics the decoder and never succeeds
    /// without a `content` key.
    #[test]
    fn decode_without_content_key_never_succeeds(s in "[\\[\\]{}\",:a-z0-9 ]{0,64}") {
        let result = decode_action(s.as_bytes());
        if !s.contains("content") {
            prop_assert!(result.is_err());
        }
    }
}
