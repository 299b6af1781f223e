// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Run-time sized host arrays.

use super::{array_from_host, array_to_host, nest, ArrayType, Element, Staging};
use crate::config::DYNAMIC;
use crate::backend::BackendKind;
use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::object::Erased;
use crate::ops::host::HostLeaf;
use crate::ops::{operand, Kernels, Storage};
use crate::registry;
use crate::scalar::{ElementKind, Scalar};

/// A heap-allocated array whose length is chosen at run time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicArray<V> {
    entries: Vec<V>,
}

impl<V> DynamicArray<V> {
    pub fn entries(&self) -> &[V] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<V> {
        self.entries
    }
}

impl<V> From<Vec<V>> for DynamicArray<V> {
    fn from(entries: Vec<V>) -> Self {
        Self { entries }
    }
}

impl<V> FromIterator<V> for DynamicArray<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<V: Element> Element for DynamicArray<V> {
    type MaskElement = DynamicArray<V::MaskElement>;
    type Flat = V::Flat;
    const DEPTH: u8 = V::DEPTH + 1;
    const SHAPE: [u8; 4] = nest(DYNAMIC, V::SHAPE);
    const KIND: ElementKind = V::KIND;
    const IS_DIFF: bool = V::IS_DIFF;
    const BACKEND: Option<BackendKind> = V::BACKEND;

    fn zeroed() -> Self {
        Self {
            entries: Vec::new(),
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

impl<V: Element> ArrayType for DynamicArray<V> {
    type Value = V;
    type Mask = DynamicArray<V::MaskElement>;

    const EXTENT: u8 = DYNAMIC;
    const IS_VECTOR: bool = true;

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entry(&self, index: usize) -> Result<V> {
        self.entries.get(index).cloned().ok_or_else(|| Error::Index {
            type_name: registry::label::<Self>(),
            index: index as isize,
            size: self.entries.len(),
        })
    }

    fn set_entry(&mut self, index: usize, value: V) -> Result<()> {
        let size = self.entries.len();
        match self.entries.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::Index {
                type_name: registry::label::<Self>(),
                index: index as isize,
                size,
            }),
        }
    }

    fn resize(&mut self, len: usize) -> Result<()> {
        self.entries.resize_with(len, V::zeroed);
        Ok(())
    }

    fn kernels() -> Option<Kernels> {
        V::dynamic_leaf_kernels()
    }

    fn stage(source: Staging<'_>) -> Result<Self> {
        let Staging::Bytes { bytes, count } = source else {
            return Err(Error::InvalidArgument {
                type_name: registry::label::<Self>(),
                message: "host arrays cannot adopt backend variables".into(),
            });
        };
        let width = if count == 0 { 0 } else { bytes.len() / count };
        if width == 0 && count > 0 {
            return Err(Error::ShapeMismatch {
                type_name: registry::label::<Self>(),
                expected: count,
                got: bytes.len(),
            });
        }
        let entries = bytes
            .chunks_exact(width.max(1))
            .take(count)
            .map(V::from_ne_bytes)
            .collect::<Option<Vec<V>>>()
            .ok_or_else(|| Error::InvalidArgument {
                type_name: registry::label::<Self>(),
                message: "element width does not match the buffer".into(),
            })?;
        if entries.len() != count {
            return Err(Error::ShapeMismatch {
                type_name: registry::label::<Self>(),
                expected: count,
                got: entries.len(),
            });
        }
        Ok(Self { entries })
    }
}

impl<T: Scalar> HostLeaf for DynamicArray<T> {
    type Elem = T;
    const FIXED: Option<usize> = None;

    fn values(&self) -> &[T] {
        &self.entries
    }

    fn from_values(values: Vec<T>) -> Result<Self> {
        Ok(Self { entries: values })
    }

    fn mask_values(mask: &Erased) -> Result<Vec<bool>> {
        Ok(operand::<DynamicArray<bool>>(mask)?.entries.clone())
    }

    fn mask_storage(bits: Vec<bool>) -> Result<Storage> {
        Ok(Box::new(DynamicArray { entries: bits }))
    }
}
