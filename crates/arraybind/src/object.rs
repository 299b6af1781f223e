// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-erased array instances.
//!
//! An [`ArrayObject`] pairs the storage of one bound type with that type's
//! [`Registration`]. Everything the host runtime does with an array goes
//! through it: construction, indexed access, sizing and printing.

use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::family::ArrayType;
use crate::host::HostValue;
use crate::init;
use crate::ops::{take, Kernel, Op, OpEntry};
use crate::registry::{self, Registration};
use crate::repr;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Erased instance storage.
pub type Erased = dyn std::any::Any + Send + Sync;

/// Owned erased instance storage.
pub type Storage = Box<Erased>;

/// An instance of a bound array type.
pub struct ArrayObject {
    registration: Arc<Registration>,
    data: Storage,
}

impl ArrayObject {
    /// Zero-initialized instance.
    pub fn zeroed(registration: &Arc<Registration>) -> Self {
        Self {
            registration: Arc::clone(registration),
            data: (registration.lifecycle().zero)(),
        }
    }

    /// Construct from positional arguments.
    pub fn new(registration: &Arc<Registration>, args: &[HostValue]) -> Result<Self> {
        Self::with_kwargs(registration, args, &[])
    }

    /// Construct from positional and keyword arguments. Only tensors accept
    /// keywords (`array`, `shape`).
    pub fn with_kwargs(
        registration: &Arc<Registration>,
        args: &[HostValue],
        kwargs: &[(&str, HostValue)],
    ) -> Result<Self> {
        let mut object = Self::zeroed(registration);
        if registration.is_tensor() {
            init::tensor::fill(&mut object, args, kwargs)?;
        } else {
            init::fill(&mut object, args, kwargs)?;
        }
        Ok(object)
    }

    /// Bind `T` and construct an instance of it.
    pub fn of<T: ArrayType>(args: &[HostValue]) -> Result<Self> {
        Self::new(&registry::bind::<T>(), args)
    }

    /// Wrap a native value.
    pub fn from_value<T: ArrayType>(value: T) -> Result<Self> {
        Self::from_storage(&registry::bind::<T>(), Box::new(value))
    }

    pub(crate) fn from_storage(registration: &Arc<Registration>, data: Storage) -> Result<Self> {
        if (*data).type_id() != registration.type_id() {
            return Err(Error::TypeMismatch {
                expected: registration.qualified_name(),
                got: "storage of another type".into(),
            });
        }
        Ok(Self {
            registration: Arc::clone(registration),
            data,
        })
    }

    /// Unwrap into the native value.
    pub fn into_value<T: ArrayType>(self) -> Result<T> {
        take::<T>(self.data)
    }

    #[inline]
    pub fn registration(&self) -> &Arc<Registration> {
        &self.registration
    }

    #[inline]
    pub fn descriptor(&self) -> &TypeDescriptor {
        self.registration.descriptor()
    }

    /// Qualified type name.
    pub fn type_name(&self) -> String {
        self.registration.qualified_name()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    #[inline]
    pub fn data(&self) -> &Erased {
        &*self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut Erased {
        &mut *self.data
    }

    // ===================================================================
    // Sizing and indexed access
    // ===================================================================

    /// Outer extent.
    pub fn len(&self) -> usize {
        match self.registration.ops().get(Op::Len) {
            OpEntry::Direct(Kernel::Len(len)) => len(self.data()),
            _ => self.registration.size().unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read entry `index`; negative indices count from the end and
    /// single-entry arrays broadcast.
    pub fn get_item(&self, index: isize) -> Result<HostValue> {
        (self.registration.access().get)(self.data(), index)
    }

    /// Write entry `index` through the implicit conversion of the entry type.
    pub fn set_item(&mut self, index: isize, value: &HostValue) -> Result<()> {
        let set = self.registration.access().set;
        set(self.data_mut(), index, value)
    }

    /// Change the outer extent. Fixed-size types only accept their own size.
    pub fn resize(&mut self, len: usize) -> Result<()> {
        if let OpEntry::Direct(Kernel::Resize(resize)) = self.registration.ops().get(Op::Resize) {
            return resize(self.data_mut(), len);
        }
        match self.registration.size() {
            Some(size) if size == len => Ok(()),
            Some(size) => Err(Error::ShapeMismatch {
                type_name: self.type_name(),
                expected: size,
                got: len,
            }),
            None => Err(Error::Unsupported {
                type_name: self.type_name(),
                op: Op::Resize,
            }),
        }
    }

    // ===================================================================
    // Storage replacement
    // ===================================================================

    /// Drop the contents and go back to the zero instance.
    pub(crate) fn reset(&mut self) {
        self.data = (self.registration.lifecycle().zero)();
    }

    /// Swap in `data`, which must hold this object's type.
    pub(crate) fn replace(&mut self, data: Storage) -> Result<()> {
        if (*data).type_id() != self.registration.type_id() {
            return Err(Error::TypeMismatch {
                expected: self.type_name(),
                got: "storage of another type".into(),
            });
        }
        self.data = data;
        Ok(())
    }

    /// Deep copy through the registered lifecycle.
    pub fn try_clone(&self) -> Result<Self> {
        let data = (self.registration.lifecycle().copy)(self.data())?;
        Self::from_storage(&self.registration, data)
    }

    pub(crate) fn into_storage(self) -> Storage {
        self.data
    }

    #[inline]
    pub(crate) fn is_type(&self, id: TypeId) -> bool {
        self.registration.type_id() == id
    }
}

impl Clone for ArrayObject {
    /// Storage always holds the registered type (`from_storage` and
    /// `replace` check it, and `data_mut` cannot change it), so the typed
    /// copy behind [`ArrayObject::try_clone`] never fails here.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(copy) => copy,
            Err(e) => unreachable!("copy of {} failed: {}", self.type_name(), e),
        }
    }
}

impl PartialEq for ArrayObject {
    fn eq(&self, other: &Self) -> bool {
        if !self.is_type(other.registration.type_id()) || self.len() != other.len() {
            return false;
        }
        (0..self.len() as isize).all(|i| match (self.get_item(i), other.get_item(i)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        })
    }
}

impl fmt::Debug for ArrayObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayObject")
            .field("type", &self.type_name())
            .field("len", &self.len())
            .finish()
    }
}

impl fmt::Display for ArrayObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&repr::repr(self))
    }
}
