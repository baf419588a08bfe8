// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz response decoding with arbitrary bodies and content types.
//!
//! Verifies:
//! 1. `decode` never panics.
//! 2. The status is always preserved.
//! 3. A model is present iff the body is non-empty.
//! 4. A body that does not decode is carried verbatim (lossy UTF-8).
//! 5. Nested `<cause>` documents decode only within the depth limit.
#![no_main]
use arbitrary::Arbitrary;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use libfuzzer_sys::fuzz_target;
use rae_decoder::ResponseDecoder;
use rae_model::{ErrorModel, MAX_CAUSE_DEPTH, WireFormat};

#[derive(Debug, Arbitrary)]
struct Input {
    status: u16,
    xml: Option<bool>,
    body: Vec<u8>,
    nesting: Option<u16>,
}

fn nested_causes(levels: usize) -> Vec<u8> {
    let mut xml = String::from("<ErrorModel>");
    for _ in 0..levels {
        xml.push_str("<message>m</message><cause>");
    }
    xml.push_str("<message>m</message>");
    for _ in 0..levels {
        xml.push_str("</cause>");
    }
    xml.push_str("</ErrorModel>");
    xml.into_bytes()
}

fuzz_target!(|input: Input| {
    let mut headers = HeaderMap::new();
    let format = input
        .xml
        .map(|xml| if xml { WireFormat::Xml } else { WireFormat::Json });
    if let Some(format) = format {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(format.media_type()));
    }

    // --- Property 1 ---
    let err = ResponseDecoder::new().decode("fuzz", input.status, &headers, &input.body);

    // --- Property 2 ---
    assert_eq!(err.status(), input.status);

    // --- Property 3 ---
    assert_eq!(err.error_model().is_some(), !input.body.is_empty());

    // --- Property 4 ---
    if let Some(model) = err.error_model() {
        match format.and_then(|f| ErrorModel::decode(f, &input.body).ok()) {
            Some(expected) => assert_eq!(model, &expected),
            None => assert_eq!(model.message, String::from_utf8_lossy(&input.body)),
        }
    }

    // --- Property 5 ---
    if let Some(nesting) = input.nesting {
        let levels = usize::from(nesting % 8192);
        let body = nested_causes(levels);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
        let err = ResponseDecoder::new().decode("fuzz", input.status, &headers, &body);
        let model = err.error_model().expect("non-empty body");
        if levels <= MAX_CAUSE_DEPTH {
            assert_eq!(model.cause_depth(), levels);
        } else {
            assert_eq!(model.message.as_bytes(), body.as_slice());
        }
    }
});
