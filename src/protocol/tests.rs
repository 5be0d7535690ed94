use super::*;
use serde_json::json;

#[test]
fn request_id_roundtrip_preserves_type() {
    let string_id: RequestId =
        serde_json::from_value(json!("abc")).expect("string id parses");
    assert_eq!(string_id, RequestId::String("abc".to_string()));
    assert_eq!(serde_json::to_value(&string_id).expect("serializes"), json!("abc"));

    let numeric_id: RequestId = serde_json::from_value(json!(42)).expect("numeric id parses");
    assert_eq!(numeric_id, RequestId::Number(42));
    assert_eq!(serde_json::to_value(&numeric_id).expect("serializes"), json!(42));
}

#[test]
fn method_not_found_carries_method_as_data() {
    let error = JsonRpcError::method_not_found("bogus/method");
    assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
    assert_eq!(error.data, Some(json!("bogus/method")));
}

#[test]
fn internal_error_truncates_long_diagnostics() {
    let long_message = "x".repeat(2000);
    let error = JsonRpcError::internal_error(Some(long_message));
    assert_eq!(error.code, error_codes::INTERNAL_ERROR);
    assert!(error.message.chars().count() <= MAX_DIAGNOSTIC_LEN + 3);
    assert!(error.message.ends_with("..."));
}

#[test]
fn internal_error_keeps_short_diagnostics_intact() {
    let error = JsonRpcError::internal_error(Some("boom".to_string()));
    assert_eq!(error.message, "boom");
}

#[test]
fn success_envelope_echoes_id() {
    let envelope = success_envelope(&RequestId::Number(7), json!({"ok": true}));
    assert_eq!(envelope["jsonrpc"], "2.0");
    assert_eq!(envelope["id"], json!(7));
    assert_eq!(envelope["result"]["ok"], json!(true));
}

#[test]
fn error_envelope_with_null_id() {
    let envelope = error_envelope(None, &JsonRpcError::parse_error());
    assert_eq!(envelope["id"], Value::Null);
    assert_eq!(envelope["error"]["code"], json!(-32700));
    assert_eq!(envelope["error"]["message"], "Parse error");
}

#[test]
fn error_data_omitted_when_absent() {
    let envelope = error_envelope(None, &JsonRpcError::invalid_request());
    assert!(envelope["error"].get("data").is_none());
}

#[test]
fn log_level_ordering_matches_severity_list() {
    assert!(LogLevel::Debug < LogLevel::Info);
    assert!(LogLevel::Info < LogLevel::Notice);
    assert!(LogLevel::Notice < LogLevel::Warning);
    assert!(LogLevel::Warning < LogLevel::Error);
    assert!(LogLevel::Error < LogLevel::Critical);
    assert!(LogLevel::Critical < LogLevel::Alert);
    assert!(LogLevel::Alert < LogLevel::Emergency);
}

#[test]
fn log_level_parsing() {
    assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warning));
    assert_eq!("emergency".parse::<LogLevel>(), Ok(LogLevel::Emergency));
    assert!("bogus".parse::<LogLevel>().is_err());
    assert!("WARNING".parse::<LogLevel>().is_err());
}

#[test]
fn tool_descriptor_wire_field_names() {
    let tool = Tool {
        name: "echo".to_string(),
        description: Some("Echo a message".to_string()),
        input_schema: json!({"type": "object"}),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(true),
            idempotent_hint: Some(true),
            open_world_hint: Some(false),
        }),
        ui_resource_uri: Some("ui://echo/panel".to_string()),
    };

    let value = serde_json::to_value(&tool).expect("serializes");
    assert!(value.get("inputSchema").is_some());
    assert!(value.get("uiResourceUri").is_some());
    assert_eq!(value["annotations"]["readOnlyHint"], json!(true));
    assert_eq!(value["annotations"]["idempotentHint"], json!(true));
    assert_eq!(value["annotations"]["openWorldHint"], json!(false));
}

#[test]
fn call_tool_result_wire_shape() {
    let result = CallToolResult {
        content: vec![ToolContent::Text {
            text: "hello".to_string(),
        }],
        is_error: false,
        structured_content: Some(json!({"message": "hello"})),
    };

    let value = serde_json::to_value(&result).expect("serializes");
    assert_eq!(value["content"][0]["type"], "text");
    assert_eq!(value["content"][0]["text"], "hello");
    assert_eq!(value["isError"], json!(false));
    assert_eq!(value["structuredContent"]["message"], "hello");
}

#[test]
fn structured_content_omitted_when_absent() {
    let result = CallToolResult {
        content: vec![],
        is_error: true,
        structured_content: None,
    };

    let value = serde_json::to_value(&result).expect("serializes");
    assert!(value.get("structuredContent").is_none());
}
