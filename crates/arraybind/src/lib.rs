// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # arraybind - array type binding core
//!
//! Binds a family of statically typed numeric arrays (fixed-size vectors,
//! complex numbers, quaternions, matrices, dynamic arrays, accelerator
//! arrays, tensors) to a dynamically typed host runtime. Each type is
//! described once, at registration, by an 8-byte [`TypeDescriptor`] and an
//! operation table; everything afterwards works on erased [`ArrayObject`]s.
//!
//! ## Quick Start
//!
//! ```rust
//! use arraybind::family::{Array3f, Array3i};
//! use arraybind::ops::dispatch;
//! use arraybind::{registry, ArrayObject, HostValue};
//!
//! let a = ArrayObject::of::<Array3f>(&[HostValue::from(vec![1.5, 2.5, 3.5])]).unwrap();
//! let b = dispatch::cast(&a, &registry::bind::<Array3i>()).unwrap();
//! assert_eq!(b.to_string(), "[1, 2, 3]");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |   registration time:  descriptor::encode -> ops::builder -> registry |
//! +---------------------------------------------------------------------+
//! |   instance time:      init (universal / foreign / tensor) -> repr    |
//! |                       ops::dispatch over the published tables        |
//! +---------------------------------------------------------------------+
//! |   seams:              host (HostValue, HostObject), backend,         |
//! |                       ecosystem + buffer (foreign array exchange)    |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TypeDescriptor`] | Packed per-type metadata |
//! | [`Registration`] | Descriptor, operation table and erased lifecycle of one type |
//! | [`TypeRegistry`] | Process-wide table of bound types |
//! | [`ArrayObject`] | An instance of a bound type |
//! | [`HostValue`] | A value of the host runtime |

pub mod backend;
pub mod buffer;
pub mod config;
pub mod descriptor;
pub mod ecosystem;
pub mod error;
pub mod family;
pub mod host;
pub mod init;
pub mod object;
pub mod ops;
pub mod registry;
pub mod repr;
pub mod scalar;

pub use descriptor::TypeDescriptor;
pub use error::{Error, Result};
pub use host::{HostObject, HostValue};
pub use object::ArrayObject;
pub use registry::{bind, Registration, TypeRegistry};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
