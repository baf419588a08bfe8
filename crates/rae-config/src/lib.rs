// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mapping rules and visibility options for REST API error mapping.
//!
//! [`MapperProperties`] is the declarative, TOML-loadable rule set. It is
//! validated once at startup ([`validate_config`]) and compiled into an
//! immutable [`MappingConfig`] that answers the per-request lookups.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod table;

pub use table::{Match, MappingConfig, Resolved};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// No API path is configured, so no request is ever mapped.
    NoApiPaths,
    /// The same kind appears more than once in a table; the last entry wins.
    DuplicateKind {
        /// Table name (`mappings` or `options`).
        table: &'static str,
        /// Duplicated kind.
        kind: String,
    },
    /// A mapping that sets neither status, message nor code.
    EmptyMapping {
        /// Kind of the mapping.
        kind: String,
    },
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::NoApiPaths => {
                write!(f, "no api_paths configured; no request will be mapped")
            }
            ConfigWarning::DuplicateKind { table, kind } => {
                write!(f, "kind '{kind}' appears more than once in {table}; last entry wins")
            }
            ConfigWarning::EmptyMapping { kind } => {
                write!(f, "mapping for '{kind}' sets no status, message or code")
            }
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Response metadata a mapping assigns to a fault kind.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct MappingRule {
    /// HTTP status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Message used when the fault carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Application error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl MappingRule {
    /// Returns `true` when the rule sets nothing.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.message.is_none() && self.code.is_none()
    }
}

/// A [`MappingRule`] bound to a fault kind.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ExceptionMapping {
    /// Fault kind the rule applies to (and to every kind extending it).
    pub exception: String,
    /// The rule.
    #[serde(flatten)]
    pub rule: MappingRule,
}

impl ExceptionMapping {
    /// Map `exception` to `status` without message or code.
    pub fn status(exception: impl Into<String>, status: u16) -> Self {
        Self {
            exception: exception.into(),
            rule: MappingRule {
                status: Some(status),
                ..MappingRule::default()
            },
        }
    }
}

/// Which fields of the error model are populated.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct MappingOptions {
    /// Use the fault's own message.
    pub include_message: bool,
    /// Populate `className`.
    pub include_class_name: bool,
    /// Populate `stackTrace`.
    pub include_stack_trace: bool,
    /// Populate `cause`.
    pub include_cause: bool,
    /// Populate `application`.
    pub include_application_name: bool,
    /// Populate `path`.
    pub include_path: bool,
    /// Populate `handler`.
    pub include_handler: bool,
    /// Let a status declared on the kind win over mapping rules.
    pub evaluate_annotation_first: bool,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            include_message: true,
            include_class_name: true,
            include_stack_trace: false,
            include_cause: true,
            include_application_name: true,
            include_path: true,
            include_handler: false,
            evaluate_annotation_first: false,
        }
    }
}

/// [`MappingOptions`] bound to a fault kind.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct KindOptions {
    /// Fault kind the options apply to (and to every kind extending it).
    pub exception: String,
    /// The options; unspecified flags take their default value.
    #[serde(flatten)]
    pub options: MappingOptions,
}

/// Top-level configuration of the error mapper.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct MapperProperties {
    /// Path patterns (`/api/**`) of requests whose errors are mapped.
    #[serde(default)]
    pub api_paths: Vec<String>,

    /// Path patterns excluded even when they match `api_paths`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_paths: Vec<String>,

    /// Name reported in the `application` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,

    /// Rule applied when no kind in the chain has a mapping.
    #[serde(default = "default_mapping")]
    pub default_mapping: MappingRule,

    /// Options applied when no kind in the chain has options.
    #[serde(default)]
    pub default_options: MappingOptions,

    /// Per-kind mapping rules.
    #[serde(default = "builtin_mappings")]
    pub mappings: Vec<ExceptionMapping>,

    /// Per-kind options.
    #[serde(default)]
    pub options: Vec<KindOptions>,
}

impl Default for MapperProperties {
    fn default() -> Self {
        Self {
            api_paths: Vec::new(),
            exclude_paths: Vec::new(),
            application_name: None,
            default_mapping: default_mapping(),
            default_options: MappingOptions::default(),
            mappings: builtin_mappings(),
            options: Vec::new(),
        }
    }
}

fn default_mapping() -> MappingRule {
    MappingRule {
        status: Some(DEFAULT_STATUS),
        ..MappingRule::default()
    }
}

/// Mappings present unless the configuration replaces the table.
pub fn builtin_mappings() -> Vec<ExceptionMapping> {
    vec![
        ExceptionMapping::status("InvalidArgument", 400),
        ExceptionMapping::status("AccessDenied", 403),
        ExceptionMapping::status("NotFound", 404),
        ExceptionMapping::status("MethodNotAllowed", 405),
        ExceptionMapping::status("NotAcceptable", 406),
        ExceptionMapping::status("Conflict", 409),
        ExceptionMapping::status("UnsupportedMediaType", 415),
    ]
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Status of the default mapping.
pub const DEFAULT_STATUS: u16 = 500;

/// Range of acceptable HTTP status codes.
const STATUS_RANGE: std::ops::RangeInclusive<u16> = 100..=599;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load [`MapperProperties`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`MapperProperties::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<MapperProperties, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => MapperProperties::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into [`MapperProperties`].
pub fn parse_toml(content: &str) -> Result<MapperProperties, ConfigError> {
    toml::from_str::<MapperProperties>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `RAE_APPLICATION_NAME`
/// - `RAE_API_PATHS` (comma separated)
pub fn apply_env_overrides(config: &mut MapperProperties) {
    if let Ok(val) = std::env::var("RAE_APPLICATION_NAME") {
        config.application_name = Some(val);
    }
    if let Ok(val) = std::env::var("RAE_API_PATHS") {
        config.api_paths = split_list(&val);
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (status codes out of range, empty kinds, invalid path
/// patterns) are returned as a [`ConfigError::ValidationError`]; soft issues
/// come back as warnings.
pub fn validate_config(config: &MapperProperties) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    for (field, patterns) in [
        ("api_paths", &config.api_paths),
        ("exclude_paths", &config.exclude_paths),
    ] {
        if let Err(e) = rae_glob::build_globset(patterns) {
            errors.push(format!("{field}: {e:#}"));
        }
    }
    if config.api_paths.is_empty() {
        warnings.push(ConfigWarning::NoApiPaths);
    }

    check_status("default_mapping", config.default_mapping.status, &mut errors);

    let mut seen = HashSet::new();
    for mapping in &config.mappings {
        let kind = &mapping.exception;
        if kind.trim().is_empty() {
            errors.push("mappings: exception kind must not be empty".into());
            continue;
        }
        check_status(&format!("mapping '{kind}'"), mapping.rule.status, &mut errors);
        if mapping.rule.is_empty() {
            warnings.push(ConfigWarning::EmptyMapping { kind: kind.clone() });
        }
        if !seen.insert(kind.as_str()) {
            warnings.push(ConfigWarning::DuplicateKind {
                table: "mappings",
                kind: kind.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    for entry in &config.options {
        let kind = &entry.exception;
        if kind.trim().is_empty() {
            errors.push("options: exception kind must not be empty".into());
            continue;
        }
        if !seen.insert(kind.as_str()) {
            warnings.push(ConfigWarning::DuplicateKind {
                table: "options",
                kind: kind.clone(),
            });
        }
    }

    if config.application_name.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "application_name".into(),
            hint: "error models will not name the producing application".into(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

fn check_status(what: &str, status: Option<u16>, errors: &mut Vec<String>) {
    if let Some(s) = status
        && !STATUS_RANGE.contains(&s)
    {
        errors.push(format!(
            "{what}: status {s} out of range ({}..={})",
            STATUS_RANGE.start(),
            STATUS_RANGE.end()
        ));
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations.  Values in `overlay` take precedence over `base`.
///
/// Path lists from the overlay replace the base lists when non-empty. Rule
/// tables are combined; on kind collisions the overlay entry wins. Default
/// entries are taken from the overlay unless it still has the built-in ones.
pub fn merge_configs(base: MapperProperties, overlay: MapperProperties) -> MapperProperties {
    let builtin = MapperProperties::default();

    let mut mappings = base.mappings;
    mappings.retain(|m| !overlay.mappings.iter().any(|o| o.exception == m.exception));
    mappings.extend(overlay.mappings);

    let mut options = base.options;
    options.retain(|m| !overlay.options.iter().any(|o| o.exception == m.exception));
    options.extend(overlay.options);

    MapperProperties {
        api_paths: non_empty_or(overlay.api_paths, base.api_paths),
        exclude_paths: non_empty_or(overlay.exclude_paths, base.exclude_paths),
        application_name: overlay.application_name.or(base.application_name),
        default_mapping: if overlay.default_mapping == builtin.default_mapping {
            base.default_mapping
        } else {
            overlay.default_mapping
        },
        default_options: if overlay.default_options == builtin.default_options {
            base.default_options
        } else {
            overlay.default_options
        },
        mappings,
        options,
    }
}

fn non_empty_or(preferred: Vec<String>, fallback: Vec<String>) -> Vec<String> {
    if preferred.is_empty() {
        fallback
    } else {
        preferred
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
