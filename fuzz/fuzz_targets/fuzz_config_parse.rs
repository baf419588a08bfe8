// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz MapperProperties TOML parsing and validation.
//!
//! Feeds arbitrary byte strings through `parse_toml` and `validate_config`,
//! verifying:
//! 1. `parse_toml` never panics on arbitrary input.
//! 2. Successfully parsed configs can be validated without panics.
//! 3. A config that validates always compiles into a mapper.
//! 4. Round-trip: serialize back to TOML and re-parse produces the same config.
#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // --- Property 1 ---
    let Ok(config) = rae_config::parse_toml(s) else {
        return;
    };

    // --- Properties 2 and 3 ---
    match rae_config::validate_config(&config) {
        Ok(warnings) => {
            for w in &warnings {
                let _ = format!("{w}");
            }
            assert!(rae_mapper::ExceptionMapper::new(&config).is_ok());
        }
        Err(e) => {
            let _ = format!("{e}");
        }
    }

    // --- Property 4 ---
    if let Ok(toml_str) = toml::to_string(&config)
        && let Ok(rt) = rae_config::parse_toml(&toml_str)
    {
        assert_eq!(config, rt);
    }
});
