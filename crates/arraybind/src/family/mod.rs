// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The compile-time array type family.
//!
//! Every bindable type implements [`ArrayType`]; its entries implement
//! [`Element`], which scalars implement as well. Nesting is expressed through
//! the `Value` associated type, so `Matrix<f32, 3>` is an array of
//! `Array<f32, 3>` rows, each an array of `f32`.
//!
//! # Members
//!
//! - [`StaticArray`] with flavors for plain vectors, complex numbers,
//!   quaternions and matrices
//! - [`DynamicArray`], a run-time sized host array
//! - [`JitArray`] and [`DiffArray`], one-dimensional arrays whose storage
//!   lives in an accelerator backend
//! - [`Tensor`], a flat array plus an arbitrary shape
//!
//! # Example
//!
//! ```rust
//! use arraybind::family::{Array, ArrayType, Element, Matrix};
//!
//! assert_eq!(<Array<f32, 3> as Element>::DEPTH, 1);
//! assert_eq!(<Matrix<f32, 3> as Element>::SHAPE, [3, 3, 0, 0]);
//! assert!(<Matrix<f32, 3> as ArrayType>::IS_MATRIX);
//! ```

mod dynamic;
mod fixed;
mod jit;
mod tensor;

pub use dynamic::DynamicArray;
pub use fixed::StaticArray;
pub use jit::{BackendMarker, Cuda, DiffArray, JitArray, Llvm};
pub use tensor::{Tensor, TensorGlue};

use crate::backend::BackendKind;
use crate::config::DYNAMIC;
use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::object::ArrayObject;
use crate::ops::Kernels;
use crate::registry;
use crate::scalar::ElementKind;

/// An entry of an array: a scalar or a nested array.
pub trait Element: Clone + Send + Sync + 'static {
    /// Mask counterpart (`bool` for scalars).
    type MaskElement: Element;
    /// One-dimensional array holding the leaves of this element.
    type Flat: ArrayType;
    /// Number of array levels (0 for scalars).
    const DEPTH: u8;
    /// Extents from the outermost axis inward, zero past `DEPTH`.
    const SHAPE: [u8; 4];
    /// Scalar kind at the bottom of the nesting.
    const KIND: ElementKind;
    const IS_SCALAR: bool = false;
    /// Whether the leaves track derivatives.
    const IS_DIFF: bool = false;
    /// Accelerator holding the leaves, if any.
    const BACKEND: Option<BackendKind> = None;

    fn zeroed() -> Self;

    /// Host-visible form of this entry.
    fn to_host(&self) -> Result<HostValue>;

    /// Implicit conversion used by indexed writes.
    fn from_host(value: &HostValue) -> Option<Self>;

    /// Decode a scalar from native-endian bytes.
    fn from_ne_bytes(_bytes: &[u8]) -> Option<Self> {
        None
    }

    /// Bind this element's own registration, if it is an array.
    fn bind_element() {}

    /// Kernels of a fixed-size host array with this element as its leaf.
    fn static_leaf_kernels<const N: usize, F: Flavor>() -> Option<Kernels> {
        None
    }

    /// Kernels of a dynamic host array with this element as its leaf.
    fn dynamic_leaf_kernels() -> Option<Kernels> {
        None
    }
}

/// Source of a staging array during foreign-buffer import.
#[derive(Debug, Clone, Copy)]
pub enum Staging<'a> {
    /// Host bytes holding `count` native-endian elements.
    Bytes { bytes: &'a [u8], count: usize },
    /// A backend variable (ownership of one reference is transferred).
    Handle(u32),
}

/// A bindable array type.
pub trait ArrayType: Element {
    type Value: Element;
    type Mask: ArrayType;

    /// Outer extent, or [`DYNAMIC`].
    const EXTENT: u8;
    const IS_VECTOR: bool = false;
    const IS_COMPLEX: bool = false;
    const IS_QUATERNION: bool = false;
    const IS_MATRIX: bool = false;
    const IS_TENSOR: bool = false;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry at `index`, which the caller has bounds-checked.
    fn entry(&self, index: usize) -> Result<Self::Value>;

    fn set_entry(&mut self, index: usize, value: Self::Value) -> Result<()>;

    /// Change the outer extent; new entries are zero.
    fn resize(&mut self, len: usize) -> Result<()>;

    fn get_host(&self, index: usize) -> Result<HostValue> {
        self.entry(index)?.to_host()
    }

    /// Returns `Ok(false)` when `value` has no implicit conversion.
    fn set_host(&mut self, index: usize, value: &HostValue) -> Result<bool> {
        match Self::Value::from_host(value) {
            Some(v) => self.set_entry(index, v).map(|()| true),
            None => Ok(false),
        }
    }

    /// Leaf kernels, for types whose entries are scalars.
    fn kernels() -> Option<Kernels>;

    /// Build a flat array from an import staging source.
    fn stage(_source: Staging<'_>) -> Result<Self> {
        Err(Error::InvalidArgument {
            type_name: registry::label::<Self>(),
            message: "not a flat staging type".into(),
        })
    }

    fn tensor_glue() -> Option<TensorGlue> {
        None
    }
}

// =======================================================================
// Flavors
// =======================================================================

/// Marker selecting the structural flags of a [`StaticArray`].
pub trait Flavor: Copy + Default + std::fmt::Debug + Send + Sync + 'static {
    const VECTOR: bool = false;
    const COMPLEX: bool = false;
    const QUATERNION: bool = false;
    const MATRIX: bool = false;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VectorFlavor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComplexFlavor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuaternionFlavor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixFlavor;

impl Flavor for VectorFlavor {
    const VECTOR: bool = true;
}

impl Flavor for ComplexFlavor {
    const COMPLEX: bool = true;
}

impl Flavor for QuaternionFlavor {
    const QUATERNION: bool = true;
}

impl Flavor for MatrixFlavor {
    const MATRIX: bool = true;
}

pub type Array<V, const N: usize> = StaticArray<V, N, VectorFlavor>;
pub type Complex<T> = StaticArray<T, 2, ComplexFlavor>;
pub type Quaternion<T> = StaticArray<T, 4, QuaternionFlavor>;
pub type Matrix<T, const N: usize> = StaticArray<Array<T, N>, N, MatrixFlavor>;

pub type Array2f = Array<f32, 2>;
pub type Array3f = Array<f32, 3>;
pub type Array4f = Array<f32, 4>;
pub type Array3f64 = Array<f64, 3>;
pub type Array3i = Array<i32, 3>;
pub type Array3u = Array<u32, 3>;
pub type Array3b = Array<bool, 3>;
pub type Array33f = Array<Array3f, 3>;
pub type Array33b = Array<Array3b, 3>;
pub type ArrayXf = DynamicArray<f32>;
pub type ArrayXf64 = DynamicArray<f64>;
pub type ArrayXi = DynamicArray<i32>;
pub type ArrayXu = DynamicArray<u32>;
pub type ArrayXb = DynamicArray<bool>;
pub type Matrix3f = Matrix<f32, 3>;
pub type Complex2f = Complex<f32>;
pub type Quaternion4f = Quaternion<f32>;
pub type TensorXf = Tensor<ArrayXf>;
pub type TensorXi = Tensor<ArrayXi>;

// =======================================================================
// Const helpers
// =======================================================================

/// Outer extent of a fixed-size axis; sizes that collide with [`DYNAMIC`] are rejected.
pub(crate) const fn fixed_extent(n: usize) -> u8 {
    assert!(n < DYNAMIC as usize, "array extent does not fit the descriptor");
    n as u8
}

/// Shape of an array whose entries have shape `inner`.
pub(crate) const fn nest(extent: u8, inner: [u8; 4]) -> [u8; 4] {
    [extent, inner[0], inner[1], inner[2]]
}

// =======================================================================
// Shared glue for array elements
// =======================================================================

/// Wrap an array entry for the host.
pub(crate) fn array_to_host<T: ArrayType>(value: &T) -> Result<HostValue> {
    ArrayObject::from_value(value.clone()).map(HostValue::Array)
}

/// Implicit conversion into an array entry: an instance of the entry type,
/// or anything the entry type's universal constructor accepts.
pub(crate) fn array_from_host<T: ArrayType>(value: &HostValue) -> Option<T> {
    if let HostValue::Array(object) = value {
        if let Some(v) = object.downcast_ref::<T>() {
            return Some(v.clone());
        }
    }
    let registration = registry::bind::<T>();
    match ArrayObject::new(&registration, std::slice::from_ref(value)) {
        Ok(object) => object.into_value::<T>().ok(),
        Err(e) => {
            log::trace!("[family] implicit conversion into {} failed: {}", registration.name(), e);
            None
        }
    }
}
