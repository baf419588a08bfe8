// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared command implementations for the `rae` CLI.
//!
//! These functions are library-level so they can be tested without
//! spawning the binary.

use anyhow::{Context, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use rae_config::{MapperProperties, load_config, validate_config};
use rae_decoder::{ClientError, ResponseDecoder};
use rae_mapper::{ExceptionMapper, MappedError};
use rae_model::{ErrorModel, Fault, WireFormat};
use schemars::schema_for;
use serde_json::json;
use std::path::Path;
use tracing::warn;

/// Schema types that can be printed by the `schema` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// JSON schema for [`MapperProperties`].
    Config,
    /// JSON schema for [`ErrorModel`].
    Model,
}

/// Return the JSON schema string for the given kind.
pub fn schema_json(kind: SchemaKind) -> Result<String> {
    let value = match kind {
        SchemaKind::Config => serde_json::to_value(schema_for!(MapperProperties))?,
        SchemaKind::Model => serde_json::to_value(schema_for!(ErrorModel))?,
    };
    serde_json::to_string_pretty(&value).context("serialize schema")
}

/// Load and validate a configuration file.
///
/// Returns human-readable diagnostics. Lines starting with `error:` mean
/// the configuration is unusable.
pub fn config_check(path: &Path) -> Vec<String> {
    let mut diagnostics = Vec::new();

    let config = match load_config(Some(path)) {
        Ok(c) => c,
        Err(e) => {
            diagnostics.push(format!("error: {e}"));
            return diagnostics;
        }
    };

    match validate_config(&config) {
        Ok(warnings) => {
            diagnostics.extend(warnings.iter().map(|w| format!("warning: {w}")));
            diagnostics.push("config: ok".into());
        }
        Err(rae_config::ConfigError::ValidationError { reasons }) => {
            diagnostics.extend(reasons.iter().map(|r| format!("error: {r}")));
        }
        Err(e) => diagnostics.push(format!("error: {e}")),
    }

    diagnostics
}

/// Load, validate and compile the mapper for `path`, or the built-in rules.
pub fn load_mapper(path: Option<&Path>) -> Result<ExceptionMapper> {
    let props = load_config(path)?;
    for warning in validate_config(&props)? {
        warn!(target: "rae.cli", "{warning}");
    }
    ExceptionMapper::new(&props).context("compile mapper")
}

/// Description of a fault given on the command line.
#[derive(Debug, Clone, Default)]
pub struct FaultSpec {
    /// Kind chain, most specific first. Must not be empty.
    pub kinds: Vec<String>,
    /// Message of the fault.
    pub message: Option<String>,
    /// Status declared by the fault.
    pub status: Option<u16>,
    /// Error code declared by the fault.
    pub code: Option<String>,
    /// Status declared on the fault's kind.
    pub annotation_status: Option<u16>,
    /// Reason accompanying `annotation_status`.
    pub annotation_reason: Option<String>,
    /// Stack frames, innermost first.
    pub frames: Vec<String>,
}

impl FaultSpec {
    /// Build the [`Fault`].
    pub fn to_fault(&self) -> Result<Fault> {
        let (kind, ancestors) = self
            .kinds
            .split_first()
            .context("at least one --kind is required")?;
        let mut fault = Fault::new(kind.clone());
        for ancestor in ancestors {
            fault = fault.extends(ancestor.clone());
        }
        if let Some(message) = &self.message {
            fault = fault.with_message(message.clone());
        }
        if let Some(status) = self.status {
            fault = fault.with_status(status);
        }
        if let Some(code) = &self.code {
            fault = fault.with_error_code(code.clone());
        }
        if let Some(status) = self.annotation_status {
            fault = fault.with_annotation(status, self.annotation_reason.clone());
        }
        Ok(fault.with_stack_trace(self.frames.iter().cloned()))
    }
}

/// Render a mapped error as its response body, optionally preceded by the
/// status line and `X-ERROR-*` headers.
pub fn render_mapped(mapped: &MappedError, format: WireFormat, with_headers: bool) -> Result<String> {
    let body = mapped
        .model
        .encode(format)
        .with_context(|| format!("encode error model as {format}"))?;
    if !with_headers {
        return Ok(body);
    }
    let mut out = format!(
        "HTTP/1.1 {} {}\ncontent-type: {}\n",
        mapped.status.as_u16(),
        mapped.status.canonical_reason().unwrap_or(""),
        format.media_type()
    );
    let mut headers: Vec<_> = mapped.headers.iter().collect();
    headers.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    for (name, value) in headers {
        out.push_str(&format!(
            "{}: {}\n",
            name,
            value.to_str().unwrap_or_default()
        ));
    }
    out.push('\n');
    out.push_str(&body);
    Ok(out)
}

/// Parse `name: value` header arguments.
pub fn parse_headers(raw: &[String]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for entry in raw {
        let (name, value) = entry
            .split_once(':')
            .with_context(|| format!("header '{entry}' is not of the form 'name: value'"))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("invalid header name in '{entry}'"))?;
        let value = HeaderValue::from_str(value.trim())
            .with_context(|| format!("invalid header value in '{entry}'"))?;
        headers.append(name, value);
    }
    Ok(headers)
}

/// Decode a response and render the resulting [`ClientError`] as JSON.
pub fn decode_to_json(label: &str, status: u16, headers: &HeaderMap, body: &[u8]) -> Result<String> {
    let err = ResponseDecoder::new().decode(label, status, headers, body);
    serde_json::to_string_pretty(&client_error_json(&err)?).context("serialize decoded error")
}

fn client_error_json(err: &ClientError) -> Result<serde_json::Value> {
    let model = err
        .error_model()
        .map(serde_json::to_value)
        .transpose()
        .context("serialize error model")?;
    Ok(json!({
        "status": err.status(),
        "requestLabel": err.request_label(),
        "retryAfterSeconds": err.retry_after().map(|d| d.as_secs()),
        "errorModel": model,
    }))
}
