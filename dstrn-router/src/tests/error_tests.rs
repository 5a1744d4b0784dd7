//! Property-based tests for error handling
//!
//! Validates error serialization and error code classification.

use crate::{RouterError, RouterErrorCode};
use proptest::prelude::*;

/// Strategy to generate arbitrary RouterErrorCode values
fn arb_error_code() -> impl Strategy<Value = RouterErrorCode> {
    prop_oneof![
        Just(RouterErrorCode::InvalidPattern),
        Just(RouterErrorCode::InvalidConfig),
        Just(RouterErrorCode::SerializationError),
        Just(RouterErrorCode::Destroyed),
        Just(RouterErrorCode::HistoryError),
        Just(RouterErrorCode::InternalError),
    ]
}

/// Strategy to generate arbitrary RouterError values
fn arb_router_error() -> impl Strategy<Value = RouterError> {
    (
        arb_error_code(),
        ".*",
        proptest::option::of(any::<String>()),
    )
        .prop_map(|(code, message, cause)| {
            let mut error = RouterError::new(code, message);
            if let Some(c) = cause {
                error = error.with_cause(c);
            }
            error
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Serialized errors always carry `code` and `message` and deserialize
    /// back to the same code, message and cause.
    #[test]
    fn prop_error_serialization_preserves_fields(error in arb_router_error()) {
        let json = serde_json::to_value(&error).expect("Failed to serialize error");

        prop_assert!(json.get("code").is_some(), "Serialized error must have 'code' field");
        prop_assert!(json.get("message").is_some(), "Serialized error must have 'message' field");

        let restored: RouterError = serde_json::from_value(json).expect("Failed to deserialize error");
        prop_assert_eq!(error.code, restored.code);
        prop_assert_eq!(error.message, restored.message);
        prop_assert_eq!(error.cause, restored.cause);
    }

    /// The serialized code equals `as_str()`.
    #[test]
    fn prop_error_code_wire_form(code in arb_error_code()) {
        let json = serde_json::to_value(code).expect("Failed to serialize code");
        prop_assert_eq!(json.as_str(), Some(code.as_str()));
    }

    /// No code is both a client error and an internal one.
    #[test]
    fn prop_error_classification_is_exclusive(code in arb_error_code()) {
        prop_assert!(!(code.is_client_error() && code.is_internal()));
    }
}

#[test]
fn test_error_display_includes_code() {
    let error = RouterError::invalid_pattern("users/(");
    assert_eq!(
        error.to_string(),
        "[INVALID_PATTERN] Route pattern 'users/(' could not be compiled"
    );
}

#[test]
fn test_destroyed_is_neither_client_nor_internal() {
    let code = RouterError::destroyed().code;
    assert!(!code.is_client_error());
    assert!(!code.is_internal());
}

#[test]
fn test_regex_error_converts_to_invalid_pattern() {
    let err = regex::Regex::new("(unclosed").unwrap_err();
    let error: RouterError = err.into();
    assert_eq!(error.code, RouterErrorCode::InvalidPattern);
    assert!(error.cause.is_some());
}

#[test]
fn test_details_are_serialized_when_present() {
    let error = RouterError::invalid_config("bad").with_details(serde_json::json!({"field": "root"}));
    let json = serde_json::to_value(&error).unwrap();
    assert_eq!(json["details"]["field"], "root");
    assert!(json.get("cause").is_none());
}
