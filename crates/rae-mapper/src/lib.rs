// SPDX-License-Identifier: MIT OR Apache-2.0
//! rae-mapper
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Translates a [`Fault`] raised while serving a request into the
//! [`ErrorModel`] sent back to the client.
//!
//! The mapper is built once from [`MapperProperties`] and is read-only
//! afterwards; share it behind an `Arc` between request handlers.

use http::{HeaderMap, StatusCode};
use rae_config::{MapperProperties, MappingConfig, MappingOptions};
use rae_glob::ApiPathPatterns;
use rae_model::{ErrorModel, Fault, MAX_CAUSE_DEPTH, NO_MESSAGE_VALUE};
use tracing::{debug, error};
use uuid::Uuid;

/// Errors raised while constructing an [`ExceptionMapper`].
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// A path pattern could not be compiled.
    #[error("invalid api path configuration: {reason}")]
    InvalidPathPattern {
        /// Compiler message, including the offending pattern.
        reason: String,
    },
}

/// Status, model and headers for one mapped fault.
#[derive(Debug, Clone)]
pub struct MappedError {
    /// HTTP status of the response.
    pub status: StatusCode,
    /// Response body.
    pub model: ErrorModel,
    /// `X-ERROR-*` headers mirroring the model.
    pub headers: HeaderMap,
}

/// Where the resolved status came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusSource<'a> {
    /// Declared by the fault itself.
    Declared,
    /// Declared on the fault's kind, with an optional reason.
    Annotation(Option<&'a str>),
    /// Nearest mapping rule.
    Mapping,
    /// Default mapping rule.
    Default,
}

/// Rules-based fault to [`ErrorModel`] translator.
#[derive(Debug, Clone)]
pub struct ExceptionMapper {
    paths: ApiPathPatterns,
    config: MappingConfig,
    application_name: Option<String>,
}

impl ExceptionMapper {
    /// Compile the path patterns and rule tables.
    pub fn new(props: &MapperProperties) -> Result<Self, MapperError> {
        let paths = ApiPathPatterns::new(&props.api_paths, &props.exclude_paths).map_err(|e| {
            MapperError::InvalidPathPattern {
                reason: format!("{e:#}"),
            }
        })?;
        Ok(Self {
            paths,
            config: MappingConfig::new(props),
            application_name: props.application_name.clone(),
        })
    }

    /// The configured API path patterns.
    pub fn api_paths(&self) -> &[String] {
        self.paths.patterns()
    }

    /// Whether errors of requests to `path` should be mapped.
    pub fn is_applicable(&self, path: &str) -> bool {
        self.paths.is_match(path)
    }

    /// The compiled rule tables.
    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// HTTP status for `fault`.
    ///
    /// Precedence: status declared by the fault, annotation on its kind when
    /// `evaluate_annotation_first` is set, status of the nearest mapping
    /// entry, annotation, default mapping. A nearest entry without a status
    /// falls through to the annotation; farther entries are not consulted.
    /// Codes that are not valid HTTP statuses become 500.
    pub fn detect_status(&self, fault: &Fault) -> StatusCode {
        let options = self.config.find_options(fault.kinds()).value;
        self.resolve_status(fault, options).0
    }

    /// Build the error model for `fault` raised while serving `path`.
    ///
    /// Never fails: faults without any matching rule get the default
    /// mapping. Server errors (5xx) get a fresh incident id, which is also
    /// logged together with the fault.
    pub fn build(&self, fault: &Fault, path: &str, handler: Option<&str>) -> ErrorModel {
        self.map(fault, path, handler).1
    }

    /// Like [`build`](Self::build), also returning the status and the
    /// `X-ERROR-*` headers of the response.
    pub fn build_response(&self, fault: &Fault, path: &str, handler: Option<&str>) -> MappedError {
        let (status, model) = self.map(fault, path, handler);
        let headers = model.to_headers();
        MappedError {
            status,
            model,
            headers,
        }
    }

    fn map(&self, fault: &Fault, path: &str, handler: Option<&str>) -> (StatusCode, ErrorModel) {
        let options = self.config.find_options(fault.kinds()).value;
        let (status, mut model) = self.model_of(fault, options, 0);

        if options.include_path {
            model.path = Some(path.to_owned());
        }
        if options.include_handler {
            model.handler = handler.map(str::to_owned);
        }
        if options.include_application_name {
            model.application = self.application_name.clone();
        }

        if status.is_server_error() {
            let id = Uuid::new_v4().to_string();
            error!(
                target: "rae.mapper",
                id = %id,
                status = status.as_u16(),
                kind = fault.kind(),
                path,
                "unexpected fault: {fault}"
            );
            model.id = Some(id);
        } else {
            debug!(
                target: "rae.mapper",
                status = status.as_u16(),
                kind = fault.kind(),
                error_code = model.error_code.as_deref(),
                path,
                "mapped fault"
            );
        }
        (status, model)
    }

    /// Status plus the fields that depend only on the fault and its options.
    /// Used for the top level fault and, recursively, for its causes up to
    /// [`MAX_CAUSE_DEPTH`].
    fn model_of(
        &self,
        fault: &Fault,
        options: &MappingOptions,
        depth: usize,
    ) -> (StatusCode, ErrorModel) {
        let kinds = fault.kinds();
        let (status, source) = self.resolve_status(fault, options);

        let mapping = self.config.find_mapping(kinds).value;
        let own_message = fault.message().filter(|_| options.include_message);
        let annotation_reason = match source {
            StatusSource::Annotation(reason) => reason,
            _ => None,
        };
        let message = own_message
            .or(annotation_reason)
            .or(mapping.message.as_deref().filter(|m| !m.is_empty()))
            .or(status.canonical_reason())
            .unwrap_or(NO_MESSAGE_VALUE)
            .to_owned();

        let (error_code, error_code_inherited) = match fault.error_code() {
            Some(code) => (Some(code.to_owned()), false),
            None => match self.config.find_error_code(kinds) {
                Some(found) => (Some(found.value.to_owned()), found.matched.is_inherited()),
                None => (None, false),
            },
        };

        let cause = fault
            .cause()
            .filter(|_| options.include_cause && depth < MAX_CAUSE_DEPTH)
            .map(|cause| {
                let cause_options = self.config.find_options(cause.kinds()).value;
                Box::new(self.model_of(cause, cause_options, depth + 1).1)
            });

        let model = ErrorModel {
            message,
            error_code,
            error_code_inherited,
            class_name: options.include_class_name.then(|| fault.kind().to_owned()),
            stack_trace: if options.include_stack_trace {
                fault.stack_trace().to_vec()
            } else {
                Vec::new()
            },
            cause,
            ..ErrorModel::default()
        };
        (status, model)
    }

    fn resolve_status<'f>(
        &self,
        fault: &'f Fault,
        options: &MappingOptions,
    ) -> (StatusCode, StatusSource<'f>) {
        if let Some(status) = fault.status() {
            return (to_status_code(status), StatusSource::Declared);
        }
        let annotation = fault
            .annotation()
            .map(|a| (a.status, StatusSource::Annotation(a.reason.as_deref())));
        if options.evaluate_annotation_first
            && let Some((status, source)) = annotation
        {
            return (to_status_code(status), source);
        }
        let mapping = self.config.find_mapping(fault.kinds());
        if let Some(status) = mapping.value.status
            && !matches!(mapping.matched, rae_config::Match::Default)
        {
            return (to_status_code(status), StatusSource::Mapping);
        }
        if let Some((status, source)) = annotation {
            return (to_status_code(status), source);
        }
        let status = self.config.default_mapping().status.unwrap_or(500);
        (to_status_code(status), StatusSource::Default)
    }
}

fn to_status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
