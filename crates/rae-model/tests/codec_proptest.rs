// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property-based tests: JSON and XML encodings describe the same model.

use proptest::prelude::*;
use rae_model::{ErrorModel, WireFormat};

/// Non-empty text with markup characters, non-ASCII letters, and
/// whitespace (including newlines) at either end.
fn text() -> impl Strategy<Value = String> {
    r"[ \t\r\n]{0,3}[\PC\t\n]{1,40}[ \t\r\n]{0,3}"
}

fn opt_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of(text())
}

fn leaf_model() -> impl Strategy<Value = ErrorModel> {
    (
        opt_text(),
        text(),
        opt_text(),
        any::<bool>(),
        opt_text(),
        opt_text(),
        prop::collection::vec(text(), 0..4),
    )
        .prop_map(
            |(id, message, error_code, inherited, class_name, path, stack_trace)| ErrorModel {
                id,
                message,
                error_code,
                error_code_inherited: inherited,
                class_name,
                path,
                stack_trace,
                ..ErrorModel::default()
            },
        )
}

fn model() -> impl Strategy<Value = ErrorModel> {
    leaf_model().prop_recursive(4, 8, 1, |inner| {
        (leaf_model(), inner).prop_map(|(mut outer, cause)| {
            outer.cause = Some(Box::new(cause));
            outer
        })
    })
}

proptest! {
    #[test]
    fn json_and_xml_decode_to_the_same_model(m in model()) {
        let json = m.encode(WireFormat::Json).unwrap();
        let xml = m.encode(WireFormat::Xml).unwrap();
        let from_json = ErrorModel::decode(WireFormat::Json, json.as_bytes()).unwrap();
        let from_xml = ErrorModel::decode(WireFormat::Xml, xml.as_bytes()).unwrap();
        prop_assert_eq!(&from_json, &m);
        prop_assert_eq!(&from_xml, &m);
    }

    #[test]
    fn json_never_contains_absent_fields(message in text()) {
        let json = ErrorModel::new(message).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        prop_assert_eq!(keys.len(), 2);
        prop_assert!(keys.contains(&"message"));
        prop_assert!(keys.contains(&"errorCodeInherited"));
    }
}
