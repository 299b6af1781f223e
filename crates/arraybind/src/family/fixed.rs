// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-size arrays.

use super::{array_from_host, array_to_host, fixed_extent, nest, ArrayType, Element, Flavor, VectorFlavor};
use crate::backend::BackendKind;
use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::object::Erased;
use crate::ops::host::HostLeaf;
use crate::ops::{operand, Kernels, Storage};
use crate::registry;
use crate::scalar::{ElementKind, Scalar};
use std::marker::PhantomData;

/// `N` entries of type `V` stored inline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticArray<V, const N: usize, F = VectorFlavor> {
    entries: [V; N],
    flavor: PhantomData<F>,
}

impl<V, const N: usize, F> StaticArray<V, N, F> {
    pub const fn from_entries(entries: [V; N]) -> Self {
        Self {
            entries,
            flavor: PhantomData,
        }
    }

    pub fn entries(&self) -> &[V; N] {
        &self.entries
    }

    pub fn into_entries(self) -> [V; N] {
        self.entries
    }
}

impl<V, const N: usize, F> From<[V; N]> for StaticArray<V, N, F> {
    fn from(entries: [V; N]) -> Self {
        Self::from_entries(entries)
    }
}

impl<V: Element, const N: usize, F: Flavor> Element for StaticArray<V, N, F> {
    type MaskElement = StaticArray<V::MaskElement, N, VectorFlavor>;
    type Flat = V::Flat;
    const DEPTH: u8 = V::DEPTH + 1;
    const SHAPE: [u8; 4] = nest(fixed_extent(N), V::SHAPE);
    const KIND: ElementKind = V::KIND;
    const IS_DIFF: bool = V::IS_DIFF;
    const BACKEND: Option<BackendKind> = V::BACKEND;

    fn zeroed() -> Self {
        Self::from_entries(std::array::from_fn(|_| V::zeroed()))
    }

    fn to_host(&self) -> Result<HostValue> {
        array_to_host(self)
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        array_from_host(value)
    }

    fn bind_element() {
        registry::bind::<Self>();
    }
}

impl<V: Element, const N: usize, F: Flavor> ArrayType for StaticArray<V, N, F> {
    type Value = V;
    type Mask = StaticArray<V::MaskElement, N, VectorFlavor>;

    const EXTENT: u8 = fixed_extent(N);
    const IS_VECTOR: bool = F::VECTOR;
    const IS_COMPLEX: bool = F::COMPLEX;
    const IS_QUATERNION: bool = F::QUATERNION;
    const IS_MATRIX: bool = F::MATRIX;

    fn len(&self) -> usize {
        N
    }

    fn entry(&self, index: usize) -> Result<V> {
        self.entries.get(index).cloned().ok_or_else(|| Error::Index {
            type_name: registry::label::<Self>(),
            index: index as isize,
            size: N,
        })
    }

    fn set_entry(&mut self, index: usize, value: V) -> Result<()> {
        match self.entries.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::Index {
                type_name: registry::label::<Self>(),
                index: index as isize,
                size: N,
            }),
        }
    }

    fn resize(&mut self, len: usize) -> Result<()> {
        if len == N {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                type_name: registry::label::<Self>(),
                expected: N,
                got: len,
            })
        }
    }

    fn kernels() -> Option<Kernels> {
        V::static_leaf_kernels::<N, F>()
    }
}

impl<T: Scalar, const N: usize, F: Flavor> HostLeaf for StaticArray<T, N, F> {
    type Elem = T;
    const FIXED: Option<usize> = Some(N);

    fn values(&self) -> &[T] {
        &self.entries
    }

    fn from_values(values: Vec<T>) -> Result<Self> {
        let got = values.len();
        <[T; N]>::try_from(values)
            .map(Self::from_entries)
            .map_err(|_| Error::ShapeMismatch {
                type_name: registry::label::<Self>(),
                expected: N,
                got,
            })
    }

    fn mask_values(mask: &Erased) -> Result<Vec<bool>> {
        Ok(operand::<StaticArray<bool, N, VectorFlavor>>(mask)?
            .entries
            .to_vec())
    }

    fn mask_storage(bits: Vec<bool>) -> Result<Storage> {
        let mask = <StaticArray<bool, N, VectorFlavor> as HostLeaf>::from_values(bits)?;
        Ok(Box::new(mask))
    }
}
