// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz API path pattern compilation and matching.
//!
//! Verifies:
//! 1. Compilation never panics, whatever the pattern.
//! 2. Matching never panics, whatever the path.
//! 3. An excluded path is never an API path.
//! 4. Query strings never change the decision.
#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rae_glob::{ApiPathPatterns, PathDecision};

#[derive(Debug, Arbitrary)]
struct Input {
    api: Vec<String>,
    exclude: Vec<String>,
    path: String,
    query: String,
}

fuzz_target!(|input: Input| {
    // --- Property 1 ---
    let Ok(patterns) = ApiPathPatterns::new(&input.api, &input.exclude) else {
        return;
    };

    // --- Property 2 ---
    let decision = patterns.decide(&input.path);

    // --- Property 3 ---
    if decision == PathDecision::Excluded {
        assert!(!patterns.is_match(&input.path));
    }

    // --- Property 4 ---
    if !input.path.contains(['?', '#']) {
        let with_query = format!("{}?{}", input.path, input.query);
        assert_eq!(patterns.decide(&with_query), decision);
    }
});
