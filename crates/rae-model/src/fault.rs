// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`Fault`]: the description of a failure that is handed to the mapper.

use crate::MAX_CAUSE_DEPTH;
use std::error::Error as StdError;
use std::fmt;

/// Kind that terminates the chain of faults lifted from [`std::error::Error`].
pub const ROOT_KIND: &str = "std::error::Error";

/// Status declared on a fault kind, e.g. "every `NotFound` is a 404".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusAnnotation {
    /// Declared HTTP status.
    pub status: u16,
    /// Declared reason, used as message when the fault has none.
    pub reason: Option<String>,
}

/// A failure to be mapped to an [`ErrorModel`](crate::ErrorModel).
///
/// The kind chain is ordered from the most specific kind to the most general
/// one and is never empty. Mapping rules are looked up by walking it.
///
/// ```
/// use rae_model::Fault;
///
/// let fault = Fault::new("orders::Locked")
///     .extends("orders::Conflict")
///     .with_message("order 42 is locked")
///     .with_status(409);
/// assert_eq!(fault.kind(), "orders::Locked");
/// assert_eq!(fault.kinds().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    kinds: Vec<String>,
    message: Option<String>,
    status: Option<u16>,
    error_code: Option<String>,
    annotation: Option<StatusAnnotation>,
    stack_trace: Vec<String>,
    cause: Option<Box<Fault>>,
}

impl Fault {
    /// Create a fault of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kinds: vec![kind.into()],
            message: None,
            status: None,
            error_code: None,
            annotation: None,
            stack_trace: Vec::new(),
            cause: None,
        }
    }

    /// Append a more general kind to the chain. Kinds already in the chain
    /// are ignored.
    pub fn extends(mut self, ancestor: impl Into<String>) -> Self {
        let ancestor = ancestor.into();
        if !self.kinds.contains(&ancestor) {
            self.kinds.push(ancestor);
        }
        self
    }

    /// Set the message. Blank messages are treated as absent.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = (!message.trim().is_empty()).then_some(message);
        self
    }

    /// Declare the HTTP status of this particular fault.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Declare the error code of this particular fault.
    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Attach a status declared on the fault's kind. A blank reason is
    /// treated as absent.
    pub fn with_annotation(mut self, status: u16, reason: Option<String>) -> Self {
        let reason = reason.filter(|r| !r.trim().is_empty());
        self.annotation = Some(StatusAnnotation { status, reason });
        self
    }

    /// Append a stack frame.
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack_trace.push(frame.into());
        self
    }

    /// Replace the stack trace.
    pub fn with_stack_trace<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stack_trace = frames.into_iter().map(Into::into).collect();
        self
    }

    /// Attach the underlying cause.
    pub fn caused_by(mut self, cause: Fault) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Lift a standard error.
    ///
    /// The kind is the error's type name, the chain ends in [`ROOT_KIND`] and
    /// each `source()` becomes a cause of kind [`ROOT_KIND`]. At most
    /// [`MAX_CAUSE_DEPTH`] sources are followed.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: StdError + 'static,
    {
        let mut sources = Vec::new();
        let mut next = err.source();
        while let Some(source) = next.filter(|_| sources.len() < MAX_CAUSE_DEPTH) {
            sources.push(source.to_string());
            next = source.source();
        }
        let cause = sources.into_iter().rev().fold(None, |cause, message| {
            let mut fault = Fault::new(ROOT_KIND).with_message(message);
            fault.cause = cause.map(Box::new);
            Some(fault)
        });

        let mut fault = Fault::new(std::any::type_name::<E>())
            .extends(ROOT_KIND)
            .with_message(err.to_string());
        fault.cause = cause.map(Box::new);
        fault
    }

    /// Most specific kind.
    pub fn kind(&self) -> &str {
        &self.kinds[0]
    }

    /// Full kind chain, most specific first.
    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    /// Message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Self-declared HTTP status, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Self-declared error code, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    /// Status declared on the kind, if any.
    pub fn annotation(&self) -> Option<&StatusAnnotation> {
        self.annotation.as_ref()
    }

    /// Stack frames.
    pub fn stack_trace(&self) -> &[String] {
        &self.stack_trace
    }

    /// Underlying cause.
    pub fn cause(&self) -> Option<&Fault> {
        self.cause.as_deref()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}
