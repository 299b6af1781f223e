// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by every binding surface.
//!
//! Each variant that can be raised while operating on a bound type carries
//! the qualified name of that type, so messages read like
//! `arraybind.scalar.Array3f: input sequence has wrong size (expected 3, got 2)`.

use crate::buffer::Device;
use crate::ops::Op;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by construction, indexed access, conversion and dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    // ========================================================================
    // Construction Errors
    // ========================================================================
    /// Sequence length does not match a fixed extent.
    ShapeMismatch {
        type_name: String,
        expected: usize,
        got: usize,
    },
    /// Broadcasting a value into a zero-sized array.
    EmptyBroadcast { type_name: String },
    /// A host value could not be converted into the target or its element.
    Conversion { type_name: String, source: String },
    /// Conversion kernel rejected the source array.
    Cast { type_name: String, cause: String },
    /// Keyword arguments passed to a positional-only constructor.
    KeywordArguments { type_name: String },
    /// Malformed constructor arguments (tensor shape, duplicate keywords).
    InvalidArgument { type_name: String, message: String },
    /// Nested host sequences without a rectangular shape.
    Ragged { type_name: String },

    // ========================================================================
    // Foreign Buffer Errors
    // ========================================================================
    /// The exported buffer does not match the required configuration.
    BufferMismatch {
        type_name: String,
        source: String,
        pattern: String,
    },
    /// The buffer lives on a device no import path can reach.
    UnsupportedDevice { type_name: String, device: Device },

    // ========================================================================
    // Access / Dispatch Errors
    // ========================================================================
    /// Index outside `[-size, size)`.
    Index {
        type_name: String,
        index: isize,
        size: usize,
    },
    /// The operation table marks the operation unsupported.
    Unsupported { type_name: String, op: Op },
    /// The kernel has no defined result for these operands (integer division by zero).
    Arithmetic { type_name: String, op: Op },
    /// Operand storage does not hold the expected concrete type.
    TypeMismatch { expected: String, got: String },

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// Accelerator backend missing or failing.
    Backend(String),
    /// Lookup of a type that was never bound.
    NotRegistered(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Construction
            Error::ShapeMismatch {
                type_name,
                expected,
                got,
            } => write!(
                f,
                "{}: input sequence has wrong size (expected {}, got {})",
                type_name, expected, got
            ),
            Error::EmptyBroadcast { type_name } => write!(
                f,
                "{}: cannot broadcast a value into an array of size zero",
                type_name
            ),
            Error::Conversion { type_name, source } => write!(
                f,
                "{}: initialization from type '{}' failed",
                type_name, source
            ),
            Error::Cast { type_name, cause } => {
                write!(f, "{}: conversion failed: {}", type_name, cause)
            }
            Error::KeywordArguments { type_name } => write!(
                f,
                "{}: constructor does not take keyword arguments",
                type_name
            ),
            Error::InvalidArgument { type_name, message } => {
                write!(f, "{}: {}", type_name, message)
            }
            Error::Ragged { type_name } => write!(
                f,
                "{}: nested input sequences do not form a rectangular shape",
                type_name
            ),
            // Foreign buffers
            Error::BufferMismatch {
                type_name,
                source,
                pattern,
            } => write!(
                f,
                "{}: unable to initialize from tensor of type '{}'. The input must have \
                 the following configuration for this to succeed: {}",
                type_name, source, pattern
            ),
            Error::UnsupportedDevice { type_name, device } => {
                write!(f, "{}: unsupported source device ({})", type_name, device)
            }
            // Access / dispatch
            Error::Index {
                type_name,
                index,
                size,
            } => write!(
                f,
                "{}: entry {} is out of bounds (the array is of size {})",
                type_name, index, size
            ),
            Error::Unsupported { type_name, op } => {
                write!(f, "{}: operation '{}' is not supported", type_name, op)
            }
            Error::Arithmetic { type_name, op } => write!(
                f,
                "{}: operation '{}' is undefined for the given operands",
                type_name, op
            ),
            Error::TypeMismatch { expected, got } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, got)
            }
            // Runtime
            Error::Backend(msg) => write!(f, "Backend error: {}", msg),
            Error::NotRegistered(name) => write!(f, "Type '{}' is not registered", name),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Qualified name of the type the error concerns, when there is one.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Error::ShapeMismatch { type_name, .. }
            | Error::EmptyBroadcast { type_name }
            | Error::Conversion { type_name, .. }
            | Error::Cast { type_name, .. }
            | Error::KeywordArguments { type_name }
            | Error::InvalidArgument { type_name, .. }
            | Error::Ragged { type_name }
            | Error::BufferMismatch { type_name, .. }
            | Error::UnsupportedDevice { type_name, .. }
            | Error::Index { type_name, .. }
            | Error::Unsupported { type_name, .. }
            | Error::Arithmetic { type_name, .. } => Some(type_name),
            Error::TypeMismatch { .. } | Error::Backend(_) | Error::NotRegistered(_) => None,
        }
    }
}
