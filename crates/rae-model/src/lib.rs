// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire error model for REST APIs.
//!
//! [`ErrorModel`] is the normalized, transmissible shape of a failure. It is
//! produced on the server side from a [`Fault`] (the description of whatever
//! went wrong) and reconstructed on the client side from a response body.
//! Both JSON and XML encodings are supported and produce structurally
//! equivalent trees.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod fault;
pub mod model;
pub mod service;

pub use codec::{CodecError, WireFormat, is_json_media_type, is_xml_media_type};
pub use fault::{Fault, ROOT_KIND, StatusAnnotation};
pub use model::ErrorModel;
pub use service::ServiceError;

/// Message used when neither the fault, the mapping nor the HTTP status
/// provide one.
pub const NO_MESSAGE_VALUE: &str = "No message present.";

/// Response header carrying [`ErrorModel::id`].
pub const ID_HEADER_NAME: &str = "x-error-id";

/// Response header carrying [`ErrorModel::message`].
pub const MESSAGE_HEADER_NAME: &str = "x-error-message";

/// Response header carrying [`ErrorModel::error_code`].
pub const CODE_HEADER_NAME: &str = "x-error-code";

/// Response header carrying [`ErrorModel::class_name`].
pub const CLASS_HEADER_NAME: &str = "x-error-class-name";

/// Root element name of the XML encoding.
pub const XML_ROOT_ELEMENT: &str = "ErrorModel";

/// Deepest cause chain that is produced by mapping and accepted by the
/// codecs.
pub const MAX_CAUSE_DEPTH: usize = 64;
