// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loading, validating and merging configuration files.

use rae_config::{
    ConfigError, ConfigWarning, MapperProperties, MappingConfig, Match, load_config, merge_configs,
    parse_toml, validate_config,
};
use std::io::Write;

const BASE: &str = r#"
api_paths = ["/api/**"]
application_name = "orders"

[[mappings]]
exception = "db::Fault"
status = 503
code = "DB"

[[options]]
exception = "db::Fault"
include_stack_trace = true
"#;

const OVERLAY: &str = r#"
api_paths = ["/v2/**"]

[default_mapping]
status = 500
code = "UNEXPECTED"

[[mappings]]
exception = "db::Fault"
status = 502
"#;

fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f
}

#[test]
fn file_loads_and_validates_cleanly() {
    let f = write_temp(BASE);
    let props = load_config(Some(f.path())).unwrap();
    assert_eq!(props.mappings.len(), 1, "explicit table replaces built-ins");
    let warnings = validate_config(&props).unwrap();
    assert!(warnings.is_empty(), "{warnings:?}");
}

#[test]
fn wrong_option_type_is_a_parse_error() {
    let err = parse_toml("[default_options]\ninclude_path = \"yes\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }), "{err}");
}

#[test]
fn merged_tables_compile_with_overlay_precedence() {
    let merged = merge_configs(parse_toml(BASE).unwrap(), parse_toml(OVERLAY).unwrap());
    assert_eq!(merged.api_paths, vec!["/v2/**"]);
    assert_eq!(merged.application_name.as_deref(), Some("orders"));

    let cfg = MappingConfig::new(&merged);
    let r = cfg.find_mapping(&["db::Deadlock", "db::Fault"]);
    assert_eq!(r.value.status, Some(502));
    assert_eq!(r.matched, Match::Ancestor { distance: 1 });
    // overlay entry has no code; the default code is used
    let code = cfg.find_error_code(&["db::Fault"]).unwrap();
    assert_eq!(code.value, "UNEXPECTED");
    assert_eq!(code.matched, Match::Default);
    assert!(cfg.find_options(&["db::Fault"]).value.include_stack_trace);
}

#[test]
fn defaults_warn_about_missing_paths_and_name() {
    let warnings = validate_config(&MapperProperties::default()).unwrap();
    assert!(warnings.contains(&ConfigWarning::NoApiPaths));
    assert!(
        warnings
            .iter()
            .any(|w| matches!(w, ConfigWarning::MissingOptionalField { field, .. } if field == "application_name"))
    );
}

#[test]
fn schema_describes_both_tables() {
    let schema = serde_json::to_value(schemars::schema_for!(MapperProperties)).unwrap();
    let props = &schema["properties"];
    assert!(props.get("mappings").is_some());
    assert!(props.get("options").is_some());
    assert!(props.get("default_mapping").is_some());
}
