use serde_json::Value;
use sqlgate_error::{ErrorCategory, ErrorCode, GateError};

#[test]
fn test_json_serialization() {
    let error = GateError::new(
        ErrorCode::ForbiddenKeyword,
        "Forbidden keyword in statement: DROP",
    )
    .with_hint("Only SELECT and WITH statements are accepted");

    let json = error.to_json();
    let v: Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(v["code"], "SQLGATE-1004");
    assert_eq!(v["message"], "Forbidden keyword in statement: DROP");
    assert_eq!(v["hint"], "Only SELECT and WITH statements are accepted");
}

#[test]
fn test_hint_omitted_when_absent() {
    let error = GateError::new(ErrorCode::EmptyStatement, "Empty SQL");
    let v: Value = serde_json::from_str(&error.to_json()).unwrap();
    assert!(v.get("hint").is_none());
}

#[test]
fn test_error_code_parsing() {
    let code: ErrorCode = "SQLGATE-3003".to_string().try_into().unwrap();
    assert_eq!(code, ErrorCode::StatementTimeout);

    assert!(ErrorCode::try_from("SQLGATE-9999".to_string()).is_err());
    assert!(ErrorCode::try_from("GATE-1001".to_string()).is_err());
}

#[test]
fn test_categories_follow_code_ranges() {
    assert_eq!(
        ErrorCode::MultipleStatements.category(),
        ErrorCategory::Validation
    );
    assert_eq!(
        ErrorCode::TranslationFailed.category(),
        ErrorCategory::Translation
    );
    assert_eq!(
        ErrorCode::StatementTimeout.category(),
        ErrorCategory::Execution
    );
    assert_eq!(ErrorCode::MissingConfig.category(), ErrorCategory::Config);
}

#[test]
fn test_display_includes_code_and_hint() {
    let error = GateError::new(ErrorCode::RestrictedSchema, "pg_catalog is off limits")
        .with_hint("Query application tables instead");
    let rendered = error.to_string();
    assert!(rendered.starts_with("[SQLGATE-1005]"));
    assert!(rendered.contains("Hint:"));
}
