// SPDX-License-Identifier: MIT OR Apache-2.0
//! rae-decoder
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Client side counterpart of the mapper: turns a received error response
//! into a [`ClientError`] carrying the status and, when the body allows it,
//! the [`ErrorModel`] the server sent.
//!
//! Decoding never fails. A body in some other schema is wrapped verbatim as
//! the message of a fallback model.

use http::HeaderMap;
use http::header::{CONTENT_TYPE, RETRY_AFTER};
use rae_model::{CODE_HEADER_NAME, ErrorModel, ID_HEADER_NAME, WireFormat};
use std::time::Duration;
use tracing::debug;

/// Error returned to callers of a remote API that answered with an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("status {status} reading {request_label}: {}", .model.as_ref().map_or("<no body>", |m| m.message.as_str()))]
pub struct ClientError {
    status: u16,
    request_label: String,
    model: Option<ErrorModel>,
    retry_after: Option<Duration>,
}

impl ClientError {
    /// Create an error from its parts.
    pub fn new(status: u16, request_label: impl Into<String>, model: Option<ErrorModel>) -> Self {
        Self {
            status,
            request_label: request_label.into(),
            model,
            retry_after: None,
        }
    }

    /// Attach the delay announced by a `Retry-After` header.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// HTTP status of the response, as received.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Error model of the response; `None` for an empty body.
    pub fn error_model(&self) -> Option<&ErrorModel> {
        self.model.as_ref()
    }

    /// Consume the error, returning its model.
    pub fn into_error_model(self) -> Option<ErrorModel> {
        self.model
    }

    /// Label of the request that failed, e.g. the client method name.
    pub fn request_label(&self) -> &str {
        &self.request_label
    }

    /// Delay announced by the server before the request may be retried.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Returns `true` for 5xx statuses.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Decodes error responses into [`ClientError`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseDecoder;

impl ResponseDecoder {
    /// Create a decoder.
    pub const fn new() -> Self {
        Self
    }

    /// Decode an error response.
    ///
    /// The body is decoded according to its `Content-Type` when that is a
    /// JSON or XML media type. Anything else, including bodies in a foreign
    /// error schema, becomes a fallback model whose message is the raw body
    /// text and whose `id` and `errorCode` are taken from the `X-ERROR-*`
    /// headers. An empty body yields no model. The status is preserved as is.
    pub fn decode(
        &self,
        request_label: &str,
        status: u16,
        headers: &HeaderMap,
        body: &[u8],
    ) -> ClientError {
        let model = if body.is_empty() {
            debug!(target: "rae.decoder", request_label, status, "empty error body");
            None
        } else {
            Some(decode_body(request_label, headers, body))
        };
        let err = ClientError::new(status, request_label, model);
        match retry_after(headers) {
            Some(delay) => err.with_retry_after(delay),
            None => err,
        }
    }
}

fn decode_body(request_label: &str, headers: &HeaderMap, body: &[u8]) -> ErrorModel {
    let format = header(headers, CONTENT_TYPE.as_str()).and_then(WireFormat::from_content_type);
    if let Some(format) = format {
        match ErrorModel::decode(format, body) {
            Ok(model) => {
                debug!(target: "rae.decoder", request_label, %format, "decoded error model");
                return model;
            }
            Err(e) => {
                debug!(target: "rae.decoder", request_label, error = %e, "body is not an error model");
            }
        }
    } else {
        debug!(target: "rae.decoder", request_label, "no decodable content type");
    }
    fallback(headers, body)
}

fn fallback(headers: &HeaderMap, body: &[u8]) -> ErrorModel {
    ErrorModel {
        id: header(headers, ID_HEADER_NAME).map(str::to_owned),
        error_code: header(headers, CODE_HEADER_NAME).map(str::to_owned),
        ..ErrorModel::new(String::from_utf8_lossy(body))
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Delta-seconds form of `Retry-After`. HTTP dates are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header(headers, RETRY_AFTER.as_str())?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn sample() -> ErrorModel {
        ErrorModel {
            id: Some("4711".into()),
            message: "Something failed.".into(),
            error_code: Some("TEST:4711".into()),
            class_name: Some("ServiceError".into()),
            path: Some("/api/something".into()),
            ..ErrorModel::default()
        }
    }

    const OTHER_XML: &str = "<OtherResponse><value>Some value</value></OtherResponse>";

    #[test]
    fn empty_body_has_no_model() {
        let err = ResponseDecoder::new().decode(
            "getNothing",
            500,
            &headers(&[("content-type", "application/xml")]),
            b"",
        );
        assert_eq!(err.status(), 500);
        assert!(err.error_model().is_none());
        assert_eq!(err.request_label(), "getNothing");
        assert!(err.is_server_error());
    }

    #[test]
    fn json_body_is_decoded() {
        let body = sample().to_json().unwrap();
        let err = ResponseDecoder::new().decode(
            "getSomething",
            500,
            &headers(&[("content-type", "application/json;charset=UTF-8")]),
            body.as_bytes(),
        );
        assert_eq!(err.status(), 500);
        assert_eq!(err.error_model(), Some(&sample()));
    }

    #[test]
    fn xml_body_is_decoded() {
        let body = sample().to_xml().unwrap();
        let err = ResponseDecoder::new().decode(
            "getSomethingThatNotExists",
            404,
            &headers(&[("content-type", "application/xml")]),
            body.as_bytes(),
        );
        assert_eq!(err.status(), 404);
        assert_eq!(err.into_error_model(), Some(sample()));
    }

    #[test]
    fn foreign_xml_becomes_raw_message() {
        let err = ResponseDecoder::new().decode(
            "getSomething",
            500,
            &headers(&[("content-type", "application/xml")]),
            OTHER_XML.as_bytes(),
        );
        assert_eq!(err.status(), 500);
        let model = err.error_model().unwrap();
        assert_eq!(model.message, OTHER_XML);
        assert!(model.class_name.is_none());
    }

    #[test]
    fn foreign_json_becomes_raw_message() {
        let body = r#"{"error":"invalid_grant","error_description":"expired"}"#;
        let err = ResponseDecoder::new().decode(
            "token",
            400,
            &headers(&[("content-type", "application/json")]),
            body.as_bytes(),
        );
        assert_eq!(err.error_model().unwrap().message, body);
    }

    #[test]
    fn unknown_content_type_uses_fallback_with_headers() {
        let err = ResponseDecoder::new().decode(
            "getSomething",
            502,
            &headers(&[
                ("content-type", "text/html"),
                ("x-error-id", "abc-123"),
                ("x-error-code", "UPSTREAM"),
            ]),
            b"<html>Bad Gateway</html>",
        );
        let model = err.error_model().unwrap();
        assert_eq!(model.message, "<html>Bad Gateway</html>");
        assert_eq!(model.id.as_deref(), Some("abc-123"));
        assert_eq!(model.error_code.as_deref(), Some("UPSTREAM"));
        assert!(model.class_name.is_none());
    }

    #[test]
    fn deeply_nested_xml_falls_back_to_raw_text() {
        let levels = 5000;
        let mut body = String::from("<ErrorModel>");
        for _ in 0..levels {
            body.push_str("<message>m</message><cause>");
        }
        body.push_str("<message>m</message>");
        for _ in 0..levels {
            body.push_str("</cause>");
        }
        body.push_str("</ErrorModel>");

        let err = ResponseDecoder::new().decode(
            "getDeep",
            502,
            &headers(&[("content-type", "application/xml")]),
            body.as_bytes(),
        );
        assert_eq!(err.status(), 502);
        let model = err.error_model().unwrap();
        assert_eq!(model.message, body);
        assert!(model.cause.is_none());
    }

    #[test]
    fn boundary_whitespace_survives_both_formats() {
        let model = ErrorModel {
            message: "  indented message\nsecond line  ".into(),
            stack_trace: vec!["\tat orders::save".into()],
            ..ErrorModel::default()
        };
        for (ct, body) in [
            ("application/json", model.to_json().unwrap()),
            ("application/xml", model.to_xml().unwrap()),
        ] {
            let err = ResponseDecoder::new().decode("x", 500, &headers(&[("content-type", ct)]), body.as_bytes());
            assert_eq!(err.error_model(), Some(&model), "{ct}");
        }
    }

    #[test]
    fn missing_content_type_uses_fallback() {
        let err = ResponseDecoder::new().decode("x", 400, &HeaderMap::new(), b"plain text");
        assert_eq!(err.error_model().unwrap().message, "plain text");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let err = ResponseDecoder::new().decode("x", 400, &HeaderMap::new(), &[0x66, 0xff, 0x6f]);
        assert_eq!(err.error_model().unwrap().message, "f\u{fffd}o");
    }

    #[test]
    fn unusual_status_is_preserved() {
        let err = ResponseDecoder::new().decode("x", 499, &HeaderMap::new(), b"");
        assert_eq!(err.status(), 499);
        assert!(!err.is_server_error());
    }

    #[test]
    fn retry_after_seconds_are_parsed() {
        let err = ResponseDecoder::new().decode(
            "x",
            503,
            &headers(&[("retry-after", "120")]),
            b"",
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn retry_after_date_is_ignored() {
        let err = ResponseDecoder::new().decode(
            "x",
            503,
            &headers(&[("retry-after", "Wed, 21 Oct 2015 07:28:00 GMT")]),
            b"",
        );
        assert!(err.retry_after().is_none());
    }

    #[test]
    fn display_names_status_label_and_message() {
        let err = ClientError::new(404, "getOrder", Some(ErrorModel::new("Not Found")));
        assert_eq!(err.to_string(), "status 404 reading getOrder: Not Found");
        let err = ClientError::new(500, "getOrder", None);
        assert_eq!(err.to_string(), "status 500 reading getOrder: <no body>");
    }
}
