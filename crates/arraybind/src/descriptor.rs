// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors.
//!
//! A [`TypeDescriptor`] packs everything the runtime needs to know about a
//! bound type into eight bytes:
//!
//! ```text
//! bits  0..9   flags (vector, complex, quaternion, matrix, tensor, diff,
//!              llvm, cuda, valid)
//! bits  9..13  element kind
//! bits 13..16  nesting depth
//! byte  2      size / align of the native value
//! byte  3      align of the native value
//! bytes 4..8   per-axis extents, 0xFF = dynamic
//! ```

use crate::backend::BackendKind;
use crate::config::{DESCRIPTOR_SIZE, DYNAMIC, MAX_AXES, MAX_DEPTH};
use crate::family::ArrayType;
use crate::scalar::ElementKind;
use std::fmt;
use std::marker::PhantomData;

const IS_VECTOR: u16 = 1 << 0;
const IS_COMPLEX: u16 = 1 << 1;
const IS_QUATERNION: u16 = 1 << 2;
const IS_MATRIX: u16 = 1 << 3;
const IS_TENSOR: u16 = 1 << 4;
const IS_DIFF: u16 = 1 << 5;
const IS_LLVM: u16 = 1 << 6;
const IS_CUDA: u16 = 1 << 7;
const IS_VALID: u16 = 1 << 8;

const KIND_SHIFT: u16 = 9;
const KIND_MASK: u16 = 0xF;
const DEPTH_SHIFT: u16 = 13;
const DEPTH_MASK: u16 = 0x7;

/// Compact, immutable description of a bound array type.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    bits: u16,
    tsize_rel: u8,
    talign: u8,
    shape: [u8; MAX_AXES],
}

const _: () = assert!(std::mem::size_of::<TypeDescriptor>() == DESCRIPTOR_SIZE);

/// Native layout of `T`, rejected at compile time when it does not fit the
/// descriptor's two layout bytes.
struct Layout<T>(PhantomData<T>);

impl<T> Layout<T> {
    const ALIGN: u8 = {
        let align = std::mem::align_of::<T>();
        assert!(align < 256, "alignment does not fit in one byte");
        align as u8
    };

    const SIZE_REL: u8 = {
        let size = std::mem::size_of::<T>();
        let align = std::mem::align_of::<T>();
        assert!(
            size % align == 0 && size / align < 256,
            "size is not a one-byte multiple of the alignment"
        );
        (size / align) as u8
    };
}

/// Encode the descriptor of `T`.
pub const fn encode<T: ArrayType>() -> TypeDescriptor {
    assert!(T::DEPTH <= MAX_DEPTH, "nesting too deep for the descriptor");

    let mut bits = IS_VALID;
    if T::IS_VECTOR {
        bits |= IS_VECTOR;
    }
    if T::IS_COMPLEX {
        bits |= IS_COMPLEX;
    }
    if T::IS_QUATERNION {
        bits |= IS_QUATERNION;
    }
    if T::IS_MATRIX {
        bits |= IS_MATRIX;
    }
    if T::IS_TENSOR {
        bits |= IS_TENSOR;
    }
    if T::IS_DIFF {
        bits |= IS_DIFF;
    }
    match T::BACKEND {
        Some(BackendKind::Llvm) => bits |= IS_LLVM,
        Some(BackendKind::Cuda) => bits |= IS_CUDA,
        None => {}
    }
    bits |= (T::KIND.code() as u16) << KIND_SHIFT;
    bits |= (T::DEPTH as u16) << DEPTH_SHIFT;

    TypeDescriptor {
        bits,
        tsize_rel: Layout::<T>::SIZE_REL,
        talign: Layout::<T>::ALIGN,
        shape: T::SHAPE,
    }
}

impl TypeDescriptor {
    /// Raw little-endian bytes.
    pub const fn to_bytes(self) -> [u8; DESCRIPTOR_SIZE] {
        let bits = self.bits.to_le_bytes();
        [
            bits[0],
            bits[1],
            self.tsize_rel,
            self.talign,
            self.shape[0],
            self.shape[1],
            self.shape[2],
            self.shape[3],
        ]
    }

    /// Parse raw bytes; `None` unless the valid bit and element kind check out.
    pub fn from_bytes(bytes: [u8; DESCRIPTOR_SIZE]) -> Option<Self> {
        let bits = u16::from_le_bytes([bytes[0], bytes[1]]);
        if bits & IS_VALID == 0 {
            return None;
        }
        ElementKind::from_code(((bits >> KIND_SHIFT) & KIND_MASK) as u8)?;
        Some(Self {
            bits,
            tsize_rel: bytes[2],
            talign: bytes[3],
            shape: [bytes[4], bytes[5], bytes[6], bytes[7]],
        })
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        // every constructor checks the code
        ElementKind::from_code(((self.bits >> KIND_SHIFT) & KIND_MASK) as u8)
            .unwrap_or(ElementKind::Bool)
    }

    #[inline]
    pub const fn depth(&self) -> usize {
        ((self.bits >> DEPTH_SHIFT) & DEPTH_MASK) as usize
    }

    /// Extents of the recorded axes, outermost first.
    pub fn shape(&self) -> &[u8] {
        &self.shape[..self.depth().min(MAX_AXES)]
    }

    /// Outermost extent, or `None` when it is dynamic.
    pub fn size(&self) -> Option<usize> {
        match self.shape.first() {
            Some(&extent) if extent != DYNAMIC && !self.is_tensor() => Some(extent as usize),
            _ => None,
        }
    }

    /// Number of bytes of the native value.
    pub const fn native_size(&self) -> usize {
        self.tsize_rel as usize * self.talign as usize
    }

    pub const fn native_align(&self) -> usize {
        self.talign as usize
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.bits & IS_VALID != 0
    }

    #[inline]
    pub const fn is_vector(&self) -> bool {
        self.bits & IS_VECTOR != 0
    }

    #[inline]
    pub const fn is_complex(&self) -> bool {
        self.bits & IS_COMPLEX != 0
    }

    #[inline]
    pub const fn is_quaternion(&self) -> bool {
        self.bits & IS_QUATERNION != 0
    }

    #[inline]
    pub const fn is_matrix(&self) -> bool {
        self.bits & IS_MATRIX != 0
    }

    #[inline]
    pub const fn is_tensor(&self) -> bool {
        self.bits & IS_TENSOR != 0
    }

    #[inline]
    pub const fn is_diff(&self) -> bool {
        self.bits & IS_DIFF != 0
    }

    #[inline]
    pub const fn is_jit(&self) -> bool {
        self.bits & (IS_LLVM | IS_CUDA) != 0
    }

    pub const fn backend(&self) -> Option<BackendKind> {
        if self.bits & IS_LLVM != 0 {
            Some(BackendKind::Llvm)
        } else if self.bits & IS_CUDA != 0 {
            Some(BackendKind::Cuda)
        } else {
            None
        }
    }

    /// Tensor, or any axis sized at run time.
    pub fn is_dynamic(&self) -> bool {
        self.is_tensor() || self.shape().contains(&DYNAMIC)
    }

    #[inline]
    pub const fn is_outer_dynamic(&self) -> bool {
        self.shape[0] == DYNAMIC
    }

    /// The same descriptor with another element kind.
    pub const fn with_kind(self, kind: ElementKind) -> Self {
        Self {
            bits: (self.bits & !(KIND_MASK << KIND_SHIFT)) | ((kind.code() as u16) << KIND_SHIFT),
            ..self
        }
    }

    /// Equal in every field but the element kind, native layout included.
    pub fn cast_compatible(&self, other: &TypeDescriptor) -> bool {
        self.with_kind(other.kind()) == *other
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (IS_VECTOR, "vector"),
            (IS_COMPLEX, "complex"),
            (IS_QUATERNION, "quaternion"),
            (IS_MATRIX, "matrix"),
            (IS_TENSOR, "tensor"),
            (IS_DIFF, "diff"),
            (IS_LLVM, "llvm"),
            (IS_CUDA, "cuda"),
        ];
        let set: Vec<&str> = flags
            .iter()
            .filter(|(bit, _)| self.bits & bit != 0)
            .map(|(_, name)| *name)
            .collect();
        let shape: Vec<String> = self
            .shape()
            .iter()
            .map(|&e| if e == DYNAMIC { "*".to_string() } else { e.to_string() })
            .collect();
        write!(
            f,
            "TypeDescriptor({}, depth={}, shape=[{}], flags=[{}])",
            self.kind(),
            self.depth(),
            shape.join(", "),
            set.join(", ")
        )
    }
}

// =======================================================================
// Names
// =======================================================================

/// Host-visible module and name of a bound type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub module: String,
    pub name: String,
}

impl TypeName {
    /// `module.name`.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// Derive the conventional name of the type described by `desc`.
pub fn array_name(desc: &TypeDescriptor) -> TypeName {
    let mut module = match desc.backend() {
        None => "arraybind.scalar".to_string(),
        Some(kind) => format!("arraybind.{}", kind),
    };
    if desc.is_diff() {
        module.push_str(".ad");
    }

    let kind = desc.kind();
    let name = if desc.is_tensor() {
        format!("TensorX{}", kind.suffix())
    } else if desc.is_jit() && desc.depth() == 1 {
        kind.leaf_name().to_string()
    } else {
        let prefix = if desc.is_matrix() {
            "Matrix"
        } else if desc.is_complex() {
            "Complex"
        } else if desc.is_quaternion() {
            "Quaternion"
        } else {
            "Array"
        };
        let mut axes = desc.shape();
        if desc.is_jit() && !axes.is_empty() {
            // innermost axis is the accelerator array itself
            axes = &axes[..axes.len() - 1];
        }
        if desc.is_matrix() {
            axes = &axes[..axes.len().min(1)];
        }
        let dims: String = axes
            .iter()
            .map(|&e| if e == DYNAMIC { "X".to_string() } else { e.to_string() })
            .collect();
        format!("{}{}{}", prefix, dims, kind.suffix())
    };
    TypeName { module, name }
}
