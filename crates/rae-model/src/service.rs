// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`ServiceError`]: a fault that carries its own status and error code.

use crate::Fault;

/// Error raised by service code that already knows its HTTP status and,
/// optionally, its application error code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ServiceError {
    /// HTTP status.
    pub status: u16,
    /// Human-readable message; may be empty.
    pub message: String,
    /// Application error code.
    pub error_code: Option<String>,
}

impl ServiceError {
    /// Kind used when converting into a [`Fault`].
    pub const KIND: &'static str = "ServiceError";

    /// Create a new service error.
    pub fn new(status: u16, message: impl Into<String>, error_code: Option<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_code,
        }
    }

    /// 400 without a message.
    pub fn bad_request() -> Self {
        Self::new(400, "", None)
    }

    /// 400 with a reason and an optional error code.
    pub fn bad_request_because(reason: impl Into<String>, error_code: Option<String>) -> Self {
        Self::new(400, reason, error_code)
    }

    /// 403 without a message.
    pub fn forbidden() -> Self {
        Self::new(403, "", None)
    }

    /// 403 naming the protected entity.
    pub fn forbidden_entity(entity: impl std::fmt::Display) -> Self {
        Self::new(403, format!("Access to entity '{entity}' is forbidden."), None)
    }

    /// 404 without a message.
    pub fn not_found() -> Self {
        Self::new(404, "", None)
    }

    /// 404 naming the missing entity.
    pub fn not_found_entity(entity: impl std::fmt::Display, error_code: Option<String>) -> Self {
        Self::new(404, format!("Entity '{entity}' was not found."), error_code)
    }

    /// 409 naming the entity that already exists.
    pub fn already_exists(entity: impl std::fmt::Display, error_code: Option<String>) -> Self {
        Self::new(409, format!("Entity '{entity}' already exists."), error_code)
    }

    /// 500 without a message.
    pub fn internal_server_error() -> Self {
        Self::new(500, "", None)
    }

    /// 500 with a reason and an optional error code.
    pub fn internal_server_error_because(
        reason: impl Into<String>,
        error_code: Option<String>,
    ) -> Self {
        Self::new(500, reason, error_code)
    }
}

impl From<&ServiceError> for Fault {
    fn from(err: &ServiceError) -> Self {
        let mut fault = Fault::new(ServiceError::KIND)
            .extends(crate::ROOT_KIND)
            .with_message(err.message.clone())
            .with_status(err.status);
        if let Some(code) = &err.error_code {
            fault = fault.with_error_code(code.clone());
        }
        fault
    }
}

impl From<ServiceError> for Fault {
    fn from(err: ServiceError) -> Self {
        Fault::from(&err)
    }
}
