// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz the mapper with structured faults.
//!
//! Verifies:
//! 1. `build_response` is total and never panics.
//! 2. The message is never empty.
//! 3. An id is present iff the status is a server error.
//! 4. The built model survives JSON encoding.
#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rae_config::MapperProperties;
use rae_mapper::ExceptionMapper;
use rae_model::{ErrorModel, Fault};

const KINDS: &[&str] = &[
    "Runtime",
    "NotFound",
    "InvalidArgument",
    "Conflict",
    "db::Fault",
    "db::Timeout",
];

#[derive(Debug, Arbitrary)]
struct Input {
    chain: Vec<u8>,
    message: Option<String>,
    status: Option<u16>,
    code: Option<String>,
    annotation: Option<(u16, Option<String>)>,
    annotation_first: bool,
}

fuzz_target!(|input: Input| {
    let mut kinds = input.chain.iter().map(|b| KINDS[*b as usize % KINDS.len()]);
    let Some(first) = kinds.next() else {
        return;
    };
    let mut fault = Fault::new(first);
    for k in kinds.take(8) {
        fault = fault.extends(k);
    }
    if let Some(m) = input.message {
        fault = fault.with_message(m);
    }
    if let Some(s) = input.status {
        fault = fault.with_status(s);
    }
    if let Some(c) = input.code {
        fault = fault.with_error_code(c);
    }
    if let Some((s, reason)) = input.annotation {
        fault = fault.with_annotation(s, reason);
    }

    let mut props = MapperProperties {
        api_paths: vec!["/api/**".into()],
        ..MapperProperties::default()
    };
    props.default_options.evaluate_annotation_first = input.annotation_first;
    let Ok(mapper) = ExceptionMapper::new(&props) else {
        return;
    };

    // --- Property 1 ---
    let resp = mapper.build_response(&fault, "/api/fuzz", None);

    // --- Property 2 ---
    assert!(!resp.model.message.is_empty());

    // --- Property 3 ---
    assert_eq!(resp.model.id.is_some(), resp.status.is_server_error());

    // --- Property 4 ---
    let json = resp.model.to_json().expect("json encoding is infallible");
    assert_eq!(ErrorModel::from_json(json.as_bytes()).ok(), Some(resp.model));
});
