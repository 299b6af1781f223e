// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Accelerator backend seam.
//!
//! The crate ships no accelerator. A runtime installs one
//! [`AcceleratorBackend`] per [`BackendKind`]; accelerator-backed arrays hold
//! reference-counted variable indices into it and every kernel becomes a
//! [`launch`](AcceleratorBackend::launch).
//!
//! # Example
//!
//! ```rust,ignore
//! use arraybind::backend::{self, BackendKind};
//!
//! backend::install(Arc::new(MyLlvmBackend::new()));
//! assert!(backend::installed(BackendKind::Llvm).is_some());
//! ```

use crate::buffer::{Device, ForeignMemory};
use crate::error::{Error, Result};
use crate::ops::{Compare, Op};
use crate::scalar::{ElementKind, ScalarValue};
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Accelerator families an array type can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Llvm,
    Cuda,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Llvm, BackendKind::Cuda];

    #[inline]
    const fn slot(self) -> usize {
        match self {
            BackendKind::Llvm => 0,
            BackendKind::Cuda => 1,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Llvm => f.write_str("llvm"),
            BackendKind::Cuda => f.write_str("cuda"),
        }
    }
}

/// Where the source memory of a [`copy`](AcceleratorBackend::copy) lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocType {
    Host,
    Device,
}

/// What a [`launch`](AcceleratorBackend::launch) computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// An element-wise, reduction or paired operation.
    Op(Op),
    Compare(Compare),
    /// Convert the single argument to the launch's element kind.
    Cast,
}

/// Invoked once when the backend frees a mapped variable.
pub type ReleaseCallback = Box<dyn FnOnce() + Send>;

/// An accelerator runtime.
///
/// Variable index `0` is never a live variable. Methods returning an index
/// hand one reference to the caller.
pub trait AcceleratorBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Device the backend computes on.
    fn device(&self) -> Device;

    /// Wrap foreign memory without copying; `0` when mapping is impossible.
    fn map(&self, kind: ElementKind, memory: &dyn ForeignMemory, count: usize) -> u32;

    /// Copy `count` elements from foreign memory into a new variable.
    fn copy(
        &self,
        alloc: AllocType,
        kind: ElementKind,
        memory: &dyn ForeignMemory,
        count: usize,
    ) -> Result<u32>;

    /// Run `callback` when variable `index` is freed.
    fn set_release_callback(&self, index: u32, callback: ReleaseCallback);

    fn inc_ref(&self, index: u32);
    fn dec_ref(&self, index: u32);

    /// Number of elements of variable `index`.
    fn len(&self, index: u32) -> usize;

    fn read(&self, index: u32, offset: usize) -> Result<ScalarValue>;
    fn write(&self, index: u32, offset: usize, value: ScalarValue) -> Result<()>;

    /// New variable of `len` copies of `value`.
    fn full(&self, kind: ElementKind, value: ScalarValue, len: usize) -> Result<u32>;

    /// New variable `0, 1, .., len - 1`.
    fn arange(&self, kind: ElementKind, len: usize) -> Result<u32>;

    /// New variable holding `len` elements of `index` starting at `offset`.
    fn slice(&self, index: u32, offset: usize, len: usize) -> Result<u32>;

    /// Enqueue a computation over `args`; returns the result variables.
    fn launch(&self, what: Launch, kind: ElementKind, args: &[u32]) -> Result<Vec<u32>>;
}

type Slot = ArcSwap<Option<Arc<dyn AcceleratorBackend>>>;

static SLOTS: OnceLock<[Slot; 2]> = OnceLock::new();

fn slots() -> &'static [Slot; 2] {
    SLOTS.get_or_init(|| [ArcSwap::from_pointee(None), ArcSwap::from_pointee(None)])
}

/// Install `backend` for its kind, replacing any previous one.
pub fn install(backend: Arc<dyn AcceleratorBackend>) {
    let kind = backend.kind();
    log::debug!("[backend] installing {} backend on {}", kind, backend.device());
    slots()[kind.slot()].store(Arc::new(Some(backend)));
}

/// Remove the backend of `kind`; arrays still holding its variables leak them.
pub fn uninstall(kind: BackendKind) {
    log::debug!("[backend] uninstalling {} backend", kind);
    slots()[kind.slot()].store(Arc::new(None));
}

/// The backend of `kind`, if installed.
#[must_use]
pub fn installed(kind: BackendKind) -> Option<Arc<dyn AcceleratorBackend>> {
    (**slots()[kind.slot()].load()).clone()
}

/// The backend of `kind`, or [`Error::Backend`] when none is installed.
pub fn get(kind: BackendKind) -> Result<Arc<dyn AcceleratorBackend>> {
    installed(kind).ok_or_else(|| Error::Backend(format!("no {} backend installed", kind)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(BackendKind::Llvm.to_string(), "llvm");
        assert_eq!(BackendKind::Cuda.to_string(), "cuda");
    }

    #[test]
    fn test_missing_backend_is_an_error() {
        // CUDA is never installed by unit tests
        let err = get(BackendKind::Cuda).err().expect("not installed");
        assert_eq!(err, Error::Backend("no cuda backend installed".into()));
    }
}
