// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Foreign multi-dimensional buffers.
//!
//! A [`BufferView`] is what a foreign array object exports when asked with a
//! [`BufferRequest`]: element kind, extents, device placement and a
//! reference-counted handle on the underlying memory.

use crate::config::DYNAMIC;
use crate::descriptor::TypeDescriptor;
use crate::scalar::ElementKind;
use std::fmt;
use std::sync::Arc;

/// Placement of foreign memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Cpu,
    Cuda(i32),
    /// Any other device type, by its raw device-type code.
    Other(i32),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(id) => write!(f, "cuda:{}", id),
            Device::Other(code) => write!(f, "device type {}", code),
        }
    }
}

/// Memory owned by a foreign array. Kept alive as long as any `Arc` to it is.
pub trait ForeignMemory: Send + Sync + fmt::Debug {
    /// Address of the first element.
    fn address(&self) -> usize;

    /// The bytes, when the memory is host-addressable.
    fn host_bytes(&self) -> Option<&[u8]>;
}

impl ForeignMemory for Vec<u8> {
    fn address(&self) -> usize {
        self.as_ptr() as usize
    }

    fn host_bytes(&self) -> Option<&[u8]> {
        Some(self)
    }
}

/// An exported buffer.
#[derive(Debug, Clone)]
pub struct BufferView {
    pub shape: Vec<usize>,
    pub kind: ElementKind,
    pub device: Device,
    /// Row-major with no padding.
    pub c_contiguous: bool,
    pub memory: Arc<dyn ForeignMemory>,
}

impl BufferView {
    /// Contiguous host buffer over `bytes`.
    pub fn host(kind: ElementKind, shape: Vec<usize>, bytes: Vec<u8>) -> Self {
        Self {
            shape,
            kind,
            device: Device::Cpu,
            c_contiguous: true,
            memory: Arc::new(bytes),
        }
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Product of the extents, or `None` if it overflows.
    pub fn count(&self) -> Option<usize> {
        element_count(&self.shape)
    }
}

/// Number of elements in a C-order block with `extents`, or `None` if the
/// product does not fit in `usize`.
pub fn element_count(extents: &[usize]) -> Option<usize> {
    extents.iter().try_fold(1usize, |n, &extent| n.checked_mul(extent))
}

/// Configuration a foreign buffer must satisfy to be imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferRequest {
    pub kind: ElementKind,
    /// Per-axis extents (`None` = any extent); `None` accepts any rank.
    pub axes: Option<Vec<Option<usize>>>,
}

impl BufferRequest {
    /// The request matching an import into a type described by `desc`.
    pub fn for_descriptor(desc: &TypeDescriptor) -> Self {
        let axes = (!desc.is_tensor()).then(|| {
            desc.shape()
                .iter()
                .map(|&extent| (extent != DYNAMIC).then_some(extent as usize))
                .collect()
        });
        Self {
            kind: desc.kind(),
            axes,
        }
    }

    /// Whether `view` has the requested kind, order and shape.
    pub fn accepts(&self, view: &BufferView) -> bool {
        if view.kind != self.kind || !view.c_contiguous {
            return false;
        }
        match &self.axes {
            None => true,
            Some(axes) => {
                axes.len() == view.shape.len()
                    && axes
                        .iter()
                        .zip(&view.shape)
                        .all(|(axis, &extent)| axis.map_or(true, |n| n == extent))
            }
        }
    }

    /// Human-readable form, e.g. `shape=(*, 3), dtype=float32, order='C'`.
    pub fn pattern(&self) -> String {
        let shape = match &self.axes {
            None => "(*, ...)".to_string(),
            Some(axes) => {
                let dims: Vec<String> = axes
                    .iter()
                    .map(|axis| axis.map_or_else(|| "*".to_string(), |n| n.to_string()))
                    .collect();
                if dims.len() == 1 {
                    format!("({},)", dims[0])
                } else {
                    format!("({})", dims.join(", "))
                }
            }
        };
        format!("shape={}, dtype={}, order='C'", shape, self.kind.dtype_name())
    }
}
