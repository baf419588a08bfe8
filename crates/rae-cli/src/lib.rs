// SPDX-License-Identifier: MIT OR Apache-2.0
//! Library side of the `rae` binary.
#![deny(unsafe_code)]

pub mod commands;
