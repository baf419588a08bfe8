// SPDX-License-Identifier: MIT OR Apache-2.0
//! The [`ErrorModel`] wire type and its header representation.

use crate::{CLASS_HEADER_NAME, CODE_HEADER_NAME, ID_HEADER_NAME, MESSAGE_HEADER_NAME};
use http::{HeaderMap, HeaderName, HeaderValue};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized, serializable representation of a failure.
///
/// Every optional field is omitted from the encoded form when absent, and an
/// empty stack trace is omitted as well. Unknown fields are rejected when
/// decoding, so that a foreign error schema is never mistaken for this one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename = "ErrorModel", rename_all = "camelCase", deny_unknown_fields)]
pub struct ErrorModel {
    /// Incident id, only set for unexpected (server side) failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable message. Never empty after mapping.
    pub message: String,

    /// Application defined error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// `true` when the error code came from a rule for an ancestor kind
    /// rather than the fault's own kind.
    #[serde(default)]
    pub error_code_inherited: bool,

    /// Kind name of the fault.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// Name of the application that produced the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,

    /// Request path that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Identifier of the request handler that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,

    /// Stack frames, innermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack_trace: Vec<String>,

    /// The model of the underlying cause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ErrorModel>>,
}

impl ErrorModel {
    /// Create a model carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Depth of the cause chain (0 when there is no cause).
    pub fn cause_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.cause.as_deref();
        while let Some(c) = current {
            depth += 1;
            current = c.cause.as_deref();
        }
        depth
    }

    /// Render the populated `id`, `message`, `errorCode` and `className`
    /// fields as `X-ERROR-*` response headers.
    ///
    /// Characters that are not allowed in a header value are replaced by `?`.
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let fields = [
            (ID_HEADER_NAME, self.id.as_deref()),
            (MESSAGE_HEADER_NAME, Some(self.message.as_str())),
            (CODE_HEADER_NAME, self.error_code.as_deref()),
            (CLASS_HEADER_NAME, self.class_name.as_deref()),
        ];
        for (name, value) in fields {
            if let Some(value) = value.filter(|v| !v.is_empty())
                && let Ok(value) = HeaderValue::from_str(&sanitize_header_value(value))
            {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
        headers
    }

    /// Rebuild a model from `X-ERROR-*` headers.
    ///
    /// Returns `None` when no message header is present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let message = header_str(headers, MESSAGE_HEADER_NAME)?;
        Some(Self {
            id: header_str(headers, ID_HEADER_NAME),
            message,
            error_code: header_str(headers, CODE_HEADER_NAME),
            class_name: header_str(headers, CLASS_HEADER_NAME),
            ..Self::default()
        })
    }
}

impl fmt::Display for ErrorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.error_code {
            write!(f, "[{code}] ")?;
        }
        f.write_str(&self.message)?;
        if let Some(id) = &self.id {
            write!(f, " (id: {id})")?;
        }
        Ok(())
    }
}

fn sanitize_header_value(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            ' '..='~' | '\t' => c,
            _ => '?',
        })
        .collect()
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ErrorModel {
        ErrorModel {
            id: Some("5d6b0c1e".into()),
            message: "Order 42 is locked.".into(),
            error_code: Some("ORDER_LOCKED".into()),
            class_name: Some("orders::Locked".into()),
            path: Some("/api/orders/42".into()),
            ..ErrorModel::default()
        }
    }

    #[test]
    fn new_sets_only_message() {
        let m = ErrorModel::new("boom");
        assert_eq!(m.message, "boom");
        assert!(m.id.is_none());
        assert!(!m.error_code_inherited);
        assert!(m.stack_trace.is_empty());
    }

    #[test]
    fn display_includes_code_and_id() {
        assert_eq!(
            sample().to_string(),
            "[ORDER_LOCKED] Order 42 is locked. (id: 5d6b0c1e)"
        );
        assert_eq!(ErrorModel::new("plain").to_string(), "plain");
    }

    #[test]
    fn cause_depth_counts_nested_models() {
        let mut m = ErrorModel::new("outer");
        assert_eq!(m.cause_depth(), 0);
        let mut middle = ErrorModel::new("middle");
        middle.cause = Some(Box::new(ErrorModel::new("inner")));
        m.cause = Some(Box::new(middle));
        assert_eq!(m.cause_depth(), 2);
    }

    #[test]
    fn headers_carry_populated_fields() {
        let headers = sample().to_headers();
        assert_eq!(headers.get("X-Error-Id").unwrap(), "5d6b0c1e");
        assert_eq!(headers.get("x-error-message").unwrap(), "Order 42 is locked.");
        assert_eq!(headers.get("X-ERROR-CODE").unwrap(), "ORDER_LOCKED");
        assert_eq!(headers.get(CLASS_HEADER_NAME).unwrap(), "orders::Locked");
    }

    #[test]
    fn headers_skip_absent_fields() {
        let headers = ErrorModel::new("only a message").to_headers();
        assert_eq!(headers.len(), 1);
        assert!(headers.get(ID_HEADER_NAME).is_none());
    }

    #[test]
    fn header_values_are_sanitized() {
        let headers = ErrorModel::new("line one\nzwei Größen").to_headers();
        assert_eq!(
            headers.get(MESSAGE_HEADER_NAME).unwrap(),
            "line one?zwei Gr??en"
        );
    }

    #[test]
    fn headers_round_trip_header_fields() {
        let original = sample();
        let back = ErrorModel::from_headers(&original.to_headers()).unwrap();
        assert_eq!(back.id, original.id);
        assert_eq!(back.message, original.message);
        assert_eq!(back.error_code, original.error_code);
        assert_eq!(back.class_name, original.class_name);
        assert!(back.path.is_none());
    }

    #[test]
    fn from_headers_requires_message() {
        let mut headers = HeaderMap::new();
        headers.insert(ID_HEADER_NAME, HeaderValue::from_static("abc"));
        assert!(ErrorModel::from_headers(&headers).is_none());
    }
}
