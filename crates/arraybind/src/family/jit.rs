// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Accelerator-backed one-dimensional arrays.
//!
//! A [`JitArray`] owns one reference to a backend variable; cloning takes a
//! new reference and dropping releases it. Handle `0` is the empty array.

use super::{array_from_host, array_to_host, ArrayType, Element, Staging};
use crate::backend::{self, BackendKind};
use crate::config::DYNAMIC;
use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::ops::{jit, Kernels};
use crate::registry;
use crate::scalar::{ElementKind, Scalar};
use std::fmt;
use std::marker::PhantomData;

/// Compile-time selection of an accelerator backend.
pub trait BackendMarker: Copy + Default + fmt::Debug + Send + Sync + 'static {
    const KIND: BackendKind;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Llvm;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cuda;

impl BackendMarker for Llvm {
    const KIND: BackendKind = BackendKind::Llvm;
}

impl BackendMarker for Cuda {
    const KIND: BackendKind = BackendKind::Cuda;
}

/// A one-dimensional array living in backend `B`.
pub struct JitArray<T: Scalar, B: BackendMarker> {
    index: u32,
    marker: PhantomData<(T, B)>,
}

impl<T: Scalar, B: BackendMarker> JitArray<T, B> {
    /// Adopt `index`, taking over one reference the caller owns.
    pub fn from_index(index: u32) -> Self {
        Self {
            index,
            marker: PhantomData,
        }
    }

    /// Backend variable index (0 when empty).
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Replace the variable, releasing the previous one.
    fn assign(&mut self, index: u32) {
        let old = std::mem::replace(&mut self.index, index);
        release::<B>(old);
    }
}

fn release<B: BackendMarker>(index: u32) {
    if index == 0 {
        return;
    }
    match backend::installed(B::KIND) {
        Some(backend) => backend.dec_ref(index),
        None => log::warn!(
            "[jit] leaking variable {} of uninstalled {} backend",
            index,
            B::KIND
        ),
    }
}

impl<T: Scalar, B: BackendMarker> Clone for JitArray<T, B> {
    fn clone(&self) -> Self {
        if self.index != 0 {
            if let Some(backend) = backend::installed(B::KIND) {
                backend.inc_ref(self.index);
            }
        }
        Self::from_index(self.index)
    }
}

impl<T: Scalar, B: BackendMarker> Drop for JitArray<T, B> {
    fn drop(&mut self) {
        release::<B>(self.index);
    }
}

impl<T: Scalar, B: BackendMarker> fmt::Debug for JitArray<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JitArray")
            .field("backend", &B::KIND)
            .field("kind", &T::KIND)
            .field("index", &self.index)
            .finish()
    }
}

impl<T: Scalar, B: BackendMarker> Element for JitArray<T, B> {
    type MaskElement = JitArray<bool, B>;
    type Flat = Self;
    const DEPTH: u8 = 1;
    const SHAPE: [u8; 4] = [DYNAMIC, 0, 0, 0];
    const KIND: ElementKind = T::KIND;
    const BACKEND: Option<BackendKind> = Some(B::KIND);

    fn zeroed() -> Self {
        Self::from_index(0)
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

impl<T: Scalar, B: BackendMarker> ArrayType for JitArray<T, B> {
    type Value = T;
    type Mask = JitArray<bool, B>;

    const EXTENT: u8 = DYNAMIC;
    const IS_VECTOR: bool = true;

    fn len(&self) -> usize {
        if self.index == 0 {
            return 0;
        }
        backend::installed(B::KIND).map_or(0, |b| b.len(self.index))
    }

    fn entry(&self, index: usize) -> Result<T> {
        let value = backend::get(B::KIND)?.read(self.index, index)?;
        Ok(T::from_value(value))
    }

    fn set_entry(&mut self, index: usize, value: T) -> Result<()> {
        backend::get(B::KIND)?.write(self.index, index, value.to_value())
    }

    fn resize(&mut self, len: usize) -> Result<()> {
        let index = backend::get(B::KIND)?.full(T::KIND, T::KIND.zero(), len)?;
        self.assign(index);
        Ok(())
    }

    fn kernels() -> Option<Kernels> {
        Some(jit::kernels::<T, B>())
    }

    fn stage(source: Staging<'_>) -> Result<Self> {
        match source {
            Staging::Handle(index) => Ok(Self::from_index(index)),
            Staging::Bytes { bytes, count } => {
                let values = bytes
                    .chunks_exact(T::KIND.bytes())
                    .take(count)
                    .map(|raw| T::KIND.decode(raw))
                    .collect::<Option<Vec<_>>>()
                    .filter(|values| values.len() == count)
                    .ok_or_else(|| Error::ShapeMismatch {
                        type_name: registry::label::<Self>(),
                        expected: count,
                        got: bytes.len() / T::KIND.bytes(),
                    })?;
                let backend = backend::get(B::KIND)?;
                let mut array = Self::zeroed();
                array.resize(count)?;
                for (i, value) in values.into_iter().enumerate() {
                    backend.write(array.index, i, value)?;
                }
                Ok(array)
            }
        }
    }
}

/// A [`JitArray`] that additionally carries an automatic-differentiation
/// variable index.
pub struct DiffArray<T: Scalar, B: BackendMarker> {
    primal: JitArray<T, B>,
    ad_index: u32,
}

impl<T: Scalar, B: BackendMarker> DiffArray<T, B> {
    /// Wrap a detached primal value (no derivative tracking).
    pub fn from_primal(primal: JitArray<T, B>) -> Self {
        Self { primal, ad_index: 0 }
    }

    pub fn with_ad_index(primal: JitArray<T, B>, ad_index: u32) -> Self {
        Self { primal, ad_index }
    }

    pub fn primal(&self) -> &JitArray<T, B> {
        &self.primal
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.primal.index
    }

    #[inline]
    pub fn ad_index(&self) -> u32 {
        self.ad_index
    }
}

impl<T: Scalar, B: BackendMarker> Clone for DiffArray<T, B> {
    fn clone(&self) -> Self {
        Self {
            primal: self.primal.clone(),
            ad_index: self.ad_index,
        }
    }
}

impl<T: Scalar, B: BackendMarker> fmt::Debug for DiffArray<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffArray")
            .field("primal", &self.primal)
            .field("ad_index", &self.ad_index)
            .finish()
    }
}

impl<T: Scalar, B: BackendMarker> Element for DiffArray<T, B> {
    type MaskElement = JitArray<bool, B>;
    type Flat = Self;
    const DEPTH: u8 = 1;
    const SHAPE: [u8; 4] = [DYNAMIC, 0, 0, 0];
    const KIND: ElementKind = T::KIND;
    const IS_DIFF: bool = true;
    const BACKEND: Option<BackendKind> = Some(B::KIND);

    fn zeroed() -> Self {
        Self::from_primal(JitArray::zeroed())
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

impl<T: Scalar, B: BackendMarker> ArrayType for DiffArray<T, B> {
    type Value = T;
    type Mask = JitArray<bool, B>;

    const EXTENT: u8 = DYNAMIC;
    const IS_VECTOR: bool = true;

    fn len(&self) -> usize {
        self.primal.len()
    }

    fn entry(&self, index: usize) -> Result<T> {
        self.primal.entry(index)
    }

    fn set_entry(&mut self, index: usize, value: T) -> Result<()> {
        self.primal.set_entry(index, value)
    }

    fn resize(&mut self, len: usize) -> Result<()> {
        self.ad_index = 0;
        self.primal.resize(len)
    }

    fn kernels() -> Option<Kernels> {
        Some(jit::diff_kernels::<T, B>())
    }

    fn stage(source: Staging<'_>) -> Result<Self> {
        JitArray::<T, B>::stage(source).map(Self::from_primal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Llvm;

    #[test]
    fn test_stage_rejects_short_bytes() {
        let bytes = 1.0f32.to_ne_bytes();
        let err = JitArray::<f32, Llvm>::stage(Staging::Bytes {
            bytes: &bytes,
            count: 2,
        })
        .expect_err("one of two elements");
        assert!(matches!(err, Error::ShapeMismatch { expected: 2, got: 1, .. }));
    }
}
