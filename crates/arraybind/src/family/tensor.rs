// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tensors: a flat array plus a shape of any rank.

use super::{array_from_host, array_to_host, ArrayType, Element};
use crate::buffer::element_count;
use crate::config::DYNAMIC;
use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::object::{ArrayObject, Erased, Storage};
use crate::ops::{operand, take, tensor, Kernels};
use crate::registry;
use crate::scalar::ElementKind;
use std::any::TypeId;
use std::fmt;

/// A tensor stored as the flat array `A` in C order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<A> {
    array: A,
    shape: Vec<usize>,
}

impl<A: ArrayType> Tensor<A> {
    /// Pair `array` with `shape`; the element counts must agree.
    pub fn new(array: A, shape: Vec<usize>) -> Result<Self> {
        let inner = element_count(shape.get(1..).unwrap_or_default());
        let Some(expected) = inner.and_then(|_| element_count(&shape)) else {
            return Err(Error::InvalidArgument {
                type_name: registry::label::<Self>(),
                message: format!("shape {:?} overflows", shape),
            });
        };
        if expected != array.len() {
            return Err(Error::ShapeMismatch {
                type_name: registry::label::<Self>(),
                expected,
                got: array.len(),
            });
        }
        Ok(Self { array, shape })
    }

    pub(crate) fn from_parts(array: A, shape: Vec<usize>) -> Self {
        Self { array, shape }
    }

    pub fn array(&self) -> &A {
        &self.array
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Copy `count` flat entries starting at `offset`.
    fn slice(&self, offset: usize, count: usize) -> Result<A> {
        let mut out = A::zeroed();
        out.resize(count)?;
        for k in 0..count {
            out.set_entry(k, self.array.entry(offset + k)?)?;
        }
        Ok(out)
    }

    /// Entries per step along the outermost axis; `new` checked it fits.
    fn inner_size(&self) -> usize {
        self.shape.iter().skip(1).product()
    }
}

impl<A: ArrayType> Element for Tensor<A> {
    type MaskElement = Tensor<A::Mask>;
    type Flat = A::Flat;
    const DEPTH: u8 = 1;
    const SHAPE: [u8; 4] = [DYNAMIC, 0, 0, 0];
    const KIND: ElementKind = A::KIND;
    const IS_DIFF: bool = A::IS_DIFF;
    const BACKEND: Option<crate::backend::BackendKind> = A::BACKEND;

    fn zeroed() -> Self {
        Self {
            array: A::zeroed(),
            shape: vec![0],
        }
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

impl<A: ArrayType> ArrayType for Tensor<A> {
    type Value = A::Value;
    type Mask = Tensor<A::Mask>;

    const EXTENT: u8 = DYNAMIC;
    const IS_TENSOR: bool = true;

    fn len(&self) -> usize {
        match self.shape.first() {
            Some(extent) => *extent,
            None => self.array.len(),
        }
    }

    fn entry(&self, index: usize) -> Result<A::Value> {
        self.array.entry(index)
    }

    fn set_entry(&mut self, index: usize, value: A::Value) -> Result<()> {
        self.array.set_entry(index, value)
    }

    fn resize(&mut self, len: usize) -> Result<()> {
        self.array.resize(len)?;
        self.shape = vec![len];
        Ok(())
    }

    fn get_host(&self, index: usize) -> Result<HostValue> {
        if self.shape.len() <= 1 {
            return self.array.get_host(index);
        }
        let inner = self.inner_size();
        let sub = Self {
            array: self.slice(index * inner, inner)?,
            shape: self.shape[1..].to_vec(),
        };
        ArrayObject::from_value(sub).map(HostValue::Array)
    }

    fn set_host(&mut self, index: usize, value: &HostValue) -> Result<bool> {
        if self.shape.len() <= 1 {
            return self.array.set_host(index, value);
        }
        let Some(sub) = Self::from_host(value) else {
            return Ok(false);
        };
        if sub.shape[..] != self.shape[1..] {
            return Err(Error::ShapeMismatch {
                type_name: registry::label::<Self>(),
                expected: self.inner_size(),
                got: sub.array.len(),
            });
        }
        let offset = index * self.inner_size();
        for k in 0..sub.array.len() {
            self.array.set_entry(offset + k, sub.array.entry(k)?)?;
        }
        Ok(true)
    }

    fn kernels() -> Option<Kernels> {
        tensor::kernels::<A>()
    }

    fn tensor_glue() -> Option<TensorGlue> {
        Some(TensorGlue {
            array_type: TypeId::of::<A>(),
            assemble: assemble::<A>,
            parts: parts::<A>,
        })
    }
}

/// Type-erased access to a tensor's flat array and shape.
#[derive(Clone, Copy)]
pub struct TensorGlue {
    /// Type of the flat backing array.
    pub array_type: TypeId,
    /// Combine a flat array with a shape.
    pub assemble: fn(Storage, Vec<usize>) -> Result<Storage>,
    /// Copy out the flat array and the shape.
    pub parts: fn(&Erased) -> Result<(Storage, Vec<usize>)>,
}

impl fmt::Debug for TensorGlue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorGlue")
            .field("array_type", &self.array_type)
            .finish_non_exhaustive()
    }
}

fn assemble<A: ArrayType>(flat: Storage, shape: Vec<usize>) -> Result<Storage> {
    let array = take::<A>(flat)?;
    Ok(Box::new(Tensor::new(array, shape)?))
}

fn parts<A: ArrayType>(value: &Erased) -> Result<(Storage, Vec<usize>)> {
    let tensor = operand::<Tensor<A>>(value)?;
    Ok((Box::new(tensor.array.clone()), tensor.shape.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{ArrayXf, TensorXf};

    #[test]
    fn test_new_checks_element_count() {
        let flat = ArrayXf::from(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let t = TensorXf::new(flat.clone(), vec![2, 3]).expect("2x3");
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.len(), 2);
        assert!(TensorXf::new(flat, vec![4, 2]).is_err());
    }

    #[test]
    fn test_new_rejects_overflowing_shapes() {
        let err = TensorXf::new(ArrayXf::zeroed(), vec![1 << 40, 1 << 40]).expect_err("overflow");
        assert!(matches!(err, Error::InvalidArgument { .. }));
        // no elements, but a row stride that does not fit
        let err = TensorXf::new(ArrayXf::zeroed(), vec![0, 1 << 40, 1 << 40]).expect_err("stride");
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_zeroed_is_single_empty_axis() {
        let t = TensorXf::zeroed();
        assert_eq!(t.shape(), &[0]);
        assert!(t.is_empty());
    }

    #[test]
    fn test_resize_flattens() {
        let mut t = TensorXf::new(ArrayXf::from(vec![1.0; 4]), vec![2, 2]).expect("2x2");
        t.resize(3).expect("resize");
        assert_eq!(t.shape(), &[3]);
        assert_eq!(t.array().len(), 3);
    }

    #[test]
    fn test_one_dimensional_get_host_reads_leaf() {
        let t = TensorXf::new(ArrayXf::from(vec![1.5, 2.5]), vec![2]).expect("1-d");
        assert_eq!(t.get_host(1).expect("leaf"), HostValue::Float(2.5));
    }
}
