// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON and XML encodings of [`ErrorModel`].

use crate::{ErrorModel, MAX_CAUSE_DEPTH, XML_ROOT_ELEMENT};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::fmt;
use std::io;

/// Element nesting of a model with [`MAX_CAUSE_DEPTH`] causes: the root, one
/// level per cause and the innermost field.
const MAX_XML_DEPTH: usize = MAX_CAUSE_DEPTH + 2;

/// Encoding of an [`ErrorModel`] on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFormat {
    /// `application/json` and `*+json`.
    Json,
    /// `application/xml`, `text/xml` and `*+xml`.
    Xml,
}

impl WireFormat {
    /// Pick the format for a `Content-Type` header value.
    ///
    /// Returns `None` for media types that are neither JSON nor XML.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        if is_json_media_type(content_type) {
            Some(Self::Json)
        } else if is_xml_media_type(content_type) {
            Some(Self::Xml)
        } else {
            None
        }
    }

    /// Canonical media type of this format.
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Xml => "xml",
        })
    }
}

/// Errors produced while encoding or decoding an [`ErrorModel`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The model could not be encoded.
    #[error("failed to encode error model as {format}: {reason}")]
    Encode {
        /// Target format.
        format: WireFormat,
        /// Underlying serializer message.
        reason: String,
    },
    /// The bytes are not an error model in the given format.
    #[error("failed to decode error model from {format}: {reason}")]
    Decode {
        /// Source format.
        format: WireFormat,
        /// Underlying deserializer message.
        reason: String,
    },
}

impl ErrorModel {
    /// Encode as compact JSON.
    pub fn to_json(&self) -> Result<String, CodecError> {
        check_encode_depth(self, WireFormat::Json)?;
        serde_json::to_string(self).map_err(|e| CodecError::Encode {
            format: WireFormat::Json,
            reason: e.to_string(),
        })
    }

    /// Decode from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CodecError> {
        let decode_err = |reason: String| CodecError::Decode {
            format: WireFormat::Json,
            reason,
        };
        let model: Self = serde_json::from_slice(bytes).map_err(|e| decode_err(e.to_string()))?;
        if model.cause_depth() > MAX_CAUSE_DEPTH {
            return Err(decode_err(format!(
                "cause chain deeper than {MAX_CAUSE_DEPTH}"
            )));
        }
        Ok(model)
    }

    /// Encode as an XML document rooted at `<ErrorModel>`.
    ///
    /// Whitespace at either end of a text field, and every carriage return,
    /// is written as a character reference so that it survives decoding.
    pub fn to_xml(&self) -> Result<String, CodecError> {
        check_encode_depth(self, WireFormat::Xml)?;
        let encode_err = |reason: String| CodecError::Encode {
            format: WireFormat::Xml,
            reason,
        };
        let mut writer = Writer::new(Vec::new());
        write_model(&mut writer, XML_ROOT_ELEMENT, self).map_err(|e| encode_err(e.to_string()))?;
        String::from_utf8(writer.into_inner()).map_err(|e| encode_err(e.to_string()))
    }

    /// Decode from XML bytes.
    ///
    /// Documents nested deeper than a model with [`MAX_CAUSE_DEPTH`] causes
    /// are rejected before deserializing.
    pub fn from_xml(bytes: &[u8]) -> Result<Self, CodecError> {
        let decode_err = |reason: String| CodecError::Decode {
            format: WireFormat::Xml,
            reason,
        };
        let text = std::str::from_utf8(bytes).map_err(|e| decode_err(e.to_string()))?;
        check_xml_depth(text).map_err(decode_err)?;
        quick_xml::de::from_str(text).map_err(|e| decode_err(e.to_string()))
    }

    /// Encode in the given format.
    pub fn encode(&self, format: WireFormat) -> Result<String, CodecError> {
        match format {
            WireFormat::Json => self.to_json(),
            WireFormat::Xml => self.to_xml(),
        }
    }

    /// Decode from the given format.
    pub fn decode(format: WireFormat, bytes: &[u8]) -> Result<Self, CodecError> {
        match format {
            WireFormat::Json => Self::from_json(bytes),
            WireFormat::Xml => Self::from_xml(bytes),
        }
    }
}

fn check_encode_depth(model: &ErrorModel, format: WireFormat) -> Result<(), CodecError> {
    if model.cause_depth() > MAX_CAUSE_DEPTH {
        return Err(CodecError::Encode {
            format,
            reason: format!("cause chain deeper than {MAX_CAUSE_DEPTH}"),
        });
    }
    Ok(())
}

fn write_model(w: &mut Writer<Vec<u8>>, name: &str, model: &ErrorModel) -> io::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    write_opt(w, "id", model.id.as_deref())?;
    write_text(w, "message", &model.message)?;
    write_opt(w, "errorCode", model.error_code.as_deref())?;
    write_text(
        w,
        "errorCodeInherited",
        if model.error_code_inherited { "true" } else { "false" },
    )?;
    write_opt(w, "className", model.class_name.as_deref())?;
    write_opt(w, "application", model.application.as_deref())?;
    write_opt(w, "path", model.path.as_deref())?;
    write_opt(w, "handler", model.handler.as_deref())?;
    for frame in &model.stack_trace {
        write_text(w, "stackTrace", frame)?;
    }
    if let Some(cause) = &model.cause {
        write_model(w, "cause", cause)?;
    }
    w.write_event(Event::End(BytesEnd::new(name)))
}

fn write_opt(w: &mut Writer<Vec<u8>>, name: &str, text: Option<&str>) -> io::Result<()> {
    match text {
        Some(text) => write_text(w, name, text),
        None => Ok(()),
    }
}

fn write_text(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> io::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    if !text.is_empty() {
        w.write_event(Event::Text(BytesText::from_escaped(escape_text(text))))?;
    }
    w.write_event(Event::End(BytesEnd::new(name)))
}

fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Escape markup, plus whitespace the reader would trim.
fn escape_text(text: &str) -> String {
    let start = text.len() - text.trim_start_matches(is_xml_whitespace).len();
    let end = text.trim_end_matches(is_xml_whitespace).len();
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            c if is_xml_whitespace(c) && (i < start || i >= end) => {
                out.push_str(&format!("&#{};", u32::from(c)));
            }
            c => out.push(c),
        }
    }
    out
}

fn check_xml_depth(text: &str) -> Result<(), String> {
    let mut reader = Reader::from_str(text);
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(_) => {
                depth += 1;
                if depth > MAX_XML_DEPTH {
                    return Err(format!("elements nested deeper than {MAX_XML_DEPTH}"));
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}

/// `type/subtype` of a `Content-Type` value, lowercased, parameters dropped.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Returns `true` for `application/json` and any `+json` structured suffix.
pub fn is_json_media_type(content_type: &str) -> bool {
    let e = essence(content_type);
    e == "application/json" || (e.contains('/') && e.ends_with("+json"))
}

/// Returns `true` for `application/xml`, `text/xml` and any `+xml` structured suffix.
pub fn is_xml_media_type(content_type: &str) -> bool {
    let e = essence(content_type);
    e == "application/xml" || e == "text/xml" || (e.contains('/') && e.ends_with("+xml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_model() -> ErrorModel {
        ErrorModel {
            id: Some("0f9d1b9e-6a43-4c3b-9b1e-3cfa6b3d2a11".into()),
            message: "Something failed.".into(),
            error_code: Some("TEST:4711".into()),
            error_code_inherited: true,
            class_name: Some("orders::StorageFault".into()),
            application: Some("orders".into()),
            path: Some("/api/orders".into()),
            handler: Some("orders::create".into()),
            stack_trace: vec!["orders::store::save".into(), "orders::create".into()],
            cause: Some(Box::new(ErrorModel {
                message: "connection reset".into(),
                class_name: Some("std::io::Error".into()),
                ..ErrorModel::default()
            })),
        }
    }

    #[test]
    fn json_uses_camel_case_and_omits_absent_fields() {
        let json = ErrorModel::new("boom").to_json().unwrap();
        assert_eq!(json, r#"{"message":"boom","errorCodeInherited":false}"#);

        let json = full_model().to_json().unwrap();
        assert!(json.contains(r#""errorCode":"TEST:4711""#));
        assert!(json.contains(r#""className":"orders::StorageFault""#));
        assert!(json.contains(r#""stackTrace":["orders::store::save","orders::create"]"#));
    }

    #[test]
    fn json_round_trip() {
        let model = full_model();
        let back = ErrorModel::from_json(model.to_json().unwrap().as_bytes()).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn xml_has_expected_shape() {
        let xml = full_model().to_xml().unwrap();
        assert!(xml.starts_with("<ErrorModel>"), "{xml}");
        assert!(xml.contains("<errorCode>TEST:4711</errorCode>"), "{xml}");
        assert!(xml.contains("<stackTrace>orders::create</stackTrace>"), "{xml}");
        assert!(xml.contains("<cause><message>connection reset</message>"), "{xml}");
    }

    #[test]
    fn xml_round_trip() {
        let model = full_model();
        let back = ErrorModel::from_xml(model.to_xml().unwrap().as_bytes()).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn xml_escapes_markup_in_text() {
        let model = ErrorModel::new("a < b & c");
        let xml = model.to_xml().unwrap();
        assert!(xml.contains("a &lt; b &amp; c"), "{xml}");
        assert_eq!(ErrorModel::from_xml(xml.as_bytes()).unwrap(), model);
    }

    #[test]
    fn xml_keeps_boundary_whitespace() {
        let model = ErrorModel {
            message: "  indented message\nsecond line  ".into(),
            error_code: Some("\tCODE\r\n".into()),
            stack_trace: vec!["    at orders::save".into(), " ".into()],
            ..ErrorModel::default()
        };
        let xml = model.to_xml().unwrap();
        assert!(xml.contains("<message>&#32;&#32;indented message\nsecond line&#32;&#32;</message>"), "{xml}");
        assert_eq!(ErrorModel::from_xml(xml.as_bytes()).unwrap(), model);
        assert_eq!(ErrorModel::from_json(model.to_json().unwrap().as_bytes()).unwrap(), model);
    }

    fn nested_xml(levels: usize) -> String {
        let mut xml = String::from("<ErrorModel>");
        for _ in 0..levels {
            xml.push_str("<message>m</message><cause>");
        }
        xml.push_str("<message>m</message>");
        for _ in 0..levels {
            xml.push_str("</cause>");
        }
        xml.push_str("</ErrorModel>");
        xml
    }

    #[test]
    fn deeply_nested_xml_is_rejected() {
        let err = ErrorModel::from_xml(nested_xml(5000).as_bytes()).unwrap_err();
        assert!(err.to_string().contains("nested deeper"), "{err}");
    }

    #[test]
    fn xml_at_the_depth_limit_decodes() {
        let model = ErrorModel::from_xml(nested_xml(MAX_CAUSE_DEPTH).as_bytes()).unwrap();
        assert_eq!(model.cause_depth(), MAX_CAUSE_DEPTH);
        assert!(ErrorModel::from_xml(nested_xml(MAX_CAUSE_DEPTH + 1).as_bytes()).is_err());
    }

    fn chain(depth: usize) -> ErrorModel {
        (0..depth).fold(ErrorModel::new("root"), |cause, _| ErrorModel {
            cause: Some(Box::new(cause)),
            ..ErrorModel::new("wrap")
        })
    }

    #[test]
    fn over_deep_models_are_neither_encoded_nor_decoded() {
        let deep = chain(MAX_CAUSE_DEPTH + 1);
        assert!(matches!(deep.to_json(), Err(CodecError::Encode { .. })));
        assert!(matches!(deep.to_xml(), Err(CodecError::Encode { .. })));

        let json = serde_json::to_string(&deep).unwrap();
        assert!(ErrorModel::from_json(json.as_bytes()).is_err());
        assert!(chain(MAX_CAUSE_DEPTH).to_json().is_ok());
    }

    #[test]
    fn missing_inherited_flag_defaults_to_false() {
        let m = ErrorModel::from_json(br#"{"message":"x"}"#).unwrap();
        assert!(!m.error_code_inherited);
    }

    #[test]
    fn foreign_json_is_rejected() {
        let body = br#"{"timestamp":"2024-01-01T00:00:00Z","status":500,"error":"Internal Server Error","message":"boom","path":"/x"}"#;
        let err = ErrorModel::from_json(body).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Decode {
                format: WireFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn foreign_xml_is_rejected() {
        let body = b"<OtherResponse><name>x</name><value>1</value></OtherResponse>";
        assert!(ErrorModel::from_xml(body).is_err());
    }

    #[test]
    fn invalid_utf8_xml_is_rejected() {
        assert!(ErrorModel::from_xml(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn encode_and_decode_dispatch_on_format() {
        let model = full_model();
        for format in [WireFormat::Json, WireFormat::Xml] {
            let text = model.encode(format).unwrap();
            assert_eq!(ErrorModel::decode(format, text.as_bytes()).unwrap(), model);
        }
    }

    #[test]
    fn media_type_detection() {
        assert!(is_json_media_type("application/json"));
        assert!(is_json_media_type("Application/JSON; charset=UTF-8"));
        assert!(is_json_media_type("application/problem+json"));
        assert!(!is_json_media_type("text/plain"));
        assert!(is_xml_media_type("application/xml"));
        assert!(is_xml_media_type("text/xml;charset=utf-8"));
        assert!(is_xml_media_type("application/atom+xml"));
        assert!(!is_xml_media_type("application/json"));
        assert!(!is_xml_media_type(""));
    }

    #[test]
    fn wire_format_from_content_type() {
        assert_eq!(
            WireFormat::from_content_type("application/json"),
            Some(WireFormat::Json)
        );
        assert_eq!(
            WireFormat::from_content_type("text/xml"),
            Some(WireFormat::Xml)
        );
        assert_eq!(WireFormat::from_content_type("text/html"), None);
        assert_eq!(WireFormat::Json.media_type(), "application/json");
        assert_eq!(WireFormat::Xml.to_string(), "xml");
    }
}
