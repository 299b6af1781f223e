// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registration.
//!
//! [`bind`] turns a compile-time [`ArrayType`] into a [`Registration`]: its
//! descriptor, operation table, lifecycle and indexed-access callbacks, and
//! the identities of its element, mask and flat staging types. Registrations
//! are published once into the process-wide [`TypeRegistry`] and never
//! change afterwards.
//!
//! # Example
//!
//! ```rust
//! use arraybind::family::Array3f;
//! use arraybind::registry;
//!
//! let reg = registry::bind::<Array3f>();
//! assert_eq!(reg.qualified_name(), "arraybind.scalar.Array3f");
//! assert!(std::sync::Arc::ptr_eq(&reg, &registry::bind::<Array3f>()));
//! ```

use crate::descriptor::{self, TypeDescriptor, TypeName};
use crate::error::{Error, Result};
use crate::family::{
    Array, ArrayType, BackendMarker, Complex, DiffArray, DynamicArray, Element, JitArray, Matrix,
    Quaternion, Staging, Tensor, TensorGlue,
};
use crate::host::HostValue;
use crate::object::{Erased, Storage};
use crate::ops::{builder, operand, OpTable};
use dashmap::DashMap;
use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, OnceLock};

// =======================================================================
// Callbacks
// =======================================================================

/// Allocation, copy and destruction of instances.
#[derive(Clone, Copy)]
pub struct Lifecycle {
    /// Zero-initialized instance.
    pub zero: fn() -> Storage,
    pub copy: fn(&Erased) -> Result<Storage>,
    /// Copy is a plain byte copy.
    pub trivially_copyable: bool,
    /// Destruction releases nothing.
    pub trivially_destructible: bool,
}

/// Indexed read and write.
#[derive(Clone, Copy)]
pub struct Access {
    pub get: fn(&Erased, isize) -> Result<HostValue>,
    pub set: fn(&mut Erased, isize, &HostValue) -> Result<()>,
}

fn copy_of<T: ArrayType>(value: &Erased) -> Result<Storage> {
    Ok(Box::new(operand::<T>(value)?.clone()))
}

/// Bounds-check `index` against `size`, wrapping negative indices.
fn resolve<T: 'static>(index: isize, size: usize, broadcast: bool) -> Result<usize> {
    if broadcast && size == 1 {
        return Ok(0);
    }
    let wrapped = if index < 0 { index + size as isize } else { index };
    if wrapped < 0 || wrapped as usize >= size {
        return Err(Error::Index {
            type_name: label::<T>(),
            index,
            size,
        });
    }
    Ok(wrapped as usize)
}

fn get_item<T: ArrayType>(value: &Erased, index: isize) -> Result<HostValue> {
    let array = operand::<T>(value)?;
    let i = resolve::<T>(index, array.len(), true)?;
    array.get_host(i)
}

fn set_item<T: ArrayType>(value: &mut Erased, index: isize, item: &HostValue) -> Result<()> {
    let array = value.downcast_mut::<T>().ok_or_else(|| Error::TypeMismatch {
        expected: label::<T>(),
        got: "a different array type".into(),
    })?;
    let i = resolve::<T>(index, array.len(), false)?;
    if array.set_host(i, item)? {
        Ok(())
    } else {
        Err(Error::Conversion {
            type_name: label::<T>(),
            source: item.type_name(),
        })
    }
}

fn stage_of<T: ArrayType>(source: Staging<'_>) -> Result<Storage> {
    Ok(Box::new(T::stage(source)?))
}

// =======================================================================
// Registration
// =======================================================================

/// Everything the runtime knows about one bound type.
pub struct Registration {
    name: TypeName,
    descriptor: TypeDescriptor,
    ops: OpTable,
    lifecycle: Lifecycle,
    access: Access,
    type_id: TypeId,
    value_type: Option<TypeId>,
    mask_type: TypeId,
    flat_type: TypeId,
    stage: fn(Staging<'_>) -> Result<Storage>,
    tensor: Option<TensorGlue>,
}

impl Registration {
    fn new<T: ArrayType>() -> Self {
        let descriptor = descriptor::encode::<T>();
        Self {
            name: descriptor::array_name(&descriptor),
            descriptor,
            ops: builder::build::<T>(),
            lifecycle: Lifecycle {
                zero: builder::zero_of::<T>,
                copy: copy_of::<T>,
                trivially_copyable: !std::mem::needs_drop::<T>(),
                trivially_destructible: !std::mem::needs_drop::<T>(),
            },
            access: Access {
                get: get_item::<T>,
                set: set_item::<T>,
            },
            type_id: TypeId::of::<T>(),
            value_type: (!T::Value::IS_SCALAR).then(TypeId::of::<T::Value>),
            mask_type: TypeId::of::<T::Mask>(),
            flat_type: TypeId::of::<T::Flat>(),
            stage: stage_of::<T::Flat>,
            tensor: T::tensor_glue(),
        }
    }

    /// Short name, e.g. `Array3f`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name.name
    }

    #[inline]
    pub fn module(&self) -> &str {
        &self.name.module
    }

    /// `module.name`, used in every error message.
    pub fn qualified_name(&self) -> String {
        self.name.qualified()
    }

    #[inline]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn ops(&self) -> &OpTable {
        &self.ops
    }

    #[inline]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    #[inline]
    pub fn access(&self) -> &Access {
        &self.access
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Stage the flat one-dimensional array used by foreign imports.
    pub fn stage_flat(&self, source: Staging<'_>) -> Result<Storage> {
        (self.stage)(source)
    }

    #[inline]
    pub fn flat_type_id(&self) -> TypeId {
        self.flat_type
    }

    #[inline]
    pub fn tensor_glue(&self) -> Option<&TensorGlue> {
        self.tensor.as_ref()
    }

    // ===================================================================
    // Related types
    // ===================================================================

    /// Registration of the type comparisons produce.
    pub fn mask_type(&self) -> Result<Arc<Registration>> {
        TypeRegistry::global().require(self.mask_type)
    }

    /// Registration of the element type, when it is an array.
    pub fn value_type(&self) -> Option<Arc<Registration>> {
        self.value_type
            .and_then(|id| TypeRegistry::global().get(id))
    }

    /// Registration of the flat staging array.
    pub fn flat_type(&self) -> Result<Arc<Registration>> {
        TypeRegistry::global().require(self.flat_type)
    }

    // ===================================================================
    // Trait queries
    // ===================================================================

    /// Outer extent, `None` when dynamic.
    #[inline]
    pub fn size(&self) -> Option<usize> {
        self.descriptor.size()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.descriptor.depth()
    }

    #[inline]
    pub fn is_jit(&self) -> bool {
        self.descriptor.is_jit()
    }

    #[inline]
    pub fn is_diff(&self) -> bool {
        self.descriptor.is_diff()
    }

    #[inline]
    pub fn is_mask(&self) -> bool {
        self.descriptor.kind().is_mask()
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        self.descriptor.kind().is_float()
    }

    #[inline]
    pub fn is_integral(&self) -> bool {
        self.descriptor.kind().is_integral()
    }

    #[inline]
    pub fn is_arithmetic(&self) -> bool {
        self.descriptor.kind().is_arithmetic()
    }

    #[inline]
    pub fn is_signed(&self) -> bool {
        self.descriptor.kind().is_signed()
    }

    #[inline]
    pub fn is_unsigned(&self) -> bool {
        self.is_integral() && !self.is_signed()
    }

    #[inline]
    pub fn is_vector(&self) -> bool {
        self.descriptor.is_vector()
    }

    #[inline]
    pub fn is_complex(&self) -> bool {
        self.descriptor.is_complex()
    }

    #[inline]
    pub fn is_quaternion(&self) -> bool {
        self.descriptor.is_quaternion()
    }

    #[inline]
    pub fn is_matrix(&self) -> bool {
        self.descriptor.is_matrix()
    }

    #[inline]
    pub fn is_tensor(&self) -> bool {
        self.descriptor.is_tensor()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.qualified_name())
            .field("descriptor", &self.descriptor)
            .field("ops", &self.ops.supported_count())
            .field("trivially_copyable", &self.lifecycle.trivially_copyable)
            .finish_non_exhaustive()
    }
}

// =======================================================================
// Registry
// =======================================================================

/// Process-wide table of bound types.
#[derive(Default)]
pub struct TypeRegistry {
    by_type: DashMap<TypeId, Arc<Registration>>,
    by_descriptor: DashMap<TypeDescriptor, Arc<Registration>>,
    by_name: DashMap<String, Arc<Registration>>,
}

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

impl TypeRegistry {
    pub fn global() -> &'static TypeRegistry {
        GLOBAL.get_or_init(TypeRegistry::default)
    }

    pub fn get(&self, id: TypeId) -> Option<Arc<Registration>> {
        self.by_type.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// The registration bound for `desc`.
    pub fn lookup(&self, desc: &TypeDescriptor) -> Option<Arc<Registration>> {
        self.by_descriptor.get(desc).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up by qualified name (`arraybind.scalar.Array3f`).
    pub fn by_name(&self, name: &str) -> Option<Arc<Registration>> {
        self.by_name.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn require(&self, id: TypeId) -> Result<Arc<Registration>> {
        self.get(id)
            .ok_or_else(|| Error::NotRegistered(format!("{:?}", id)))
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Insert `registration` unless its type is already bound; returns the
    /// registration that ends up published.
    fn publish(&self, registration: Registration) -> Arc<Registration> {
        let candidate = Arc::new(registration);
        let published = Arc::clone(
            &self
                .by_type
                .entry(candidate.type_id)
                .or_insert_with(|| Arc::clone(&candidate)),
        );
        if !Arc::ptr_eq(&published, &candidate) {
            return published;
        }

        let qualified = published.qualified_name();
        if let Some(existing) = self.lookup(&published.descriptor) {
            log::debug!(
                "[registry] {} shares its descriptor with {}; lookups keep the first",
                qualified,
                existing.qualified_name()
            );
        } else {
            self.by_descriptor
                .entry(published.descriptor)
                .or_insert_with(|| Arc::clone(&published));
        }
        self.by_name
            .entry(qualified.clone())
            .or_insert_with(|| Arc::clone(&published));

        log::debug!(
            "[registry] bound {} {:?} ({} operations)",
            qualified,
            published.descriptor,
            published.ops.supported_count()
        );
        published
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.by_type.len())
            .finish()
    }
}

// =======================================================================
// Binding
// =======================================================================

/// Bind `T`, its element, mask and flat staging types. Idempotent.
pub fn bind<T: ArrayType>() -> Arc<Registration> {
    let registry = TypeRegistry::global();
    let id = TypeId::of::<T>();
    if let Some(existing) = registry.get(id) {
        return existing;
    }

    T::Value::bind_element();
    if TypeId::of::<T::Mask>() != id {
        bind::<T::Mask>();
    }
    if TypeId::of::<T::Flat>() != id {
        bind::<T::Flat>();
    }
    registry.publish(Registration::new::<T>())
}

/// Registered qualified name of `T`, or its Rust type name when unbound.
pub(crate) fn label<T: 'static>() -> String {
    match TypeRegistry::global().get(TypeId::of::<T>()) {
        Some(registration) => registration.qualified_name(),
        None => std::any::type_name::<T>().to_string(),
    }
}

macro_rules! bind_sizes {
    ($($t:ty),*) => {
        $(
            bind::<Array<$t, 0>>();
            bind::<Array<$t, 1>>();
            bind::<Array<$t, 2>>();
            bind::<Array<$t, 3>>();
            bind::<Array<$t, 4>>();
            bind::<DynamicArray<$t>>();
            bind::<Array<Array<$t, 3>, 3>>();
            bind::<Array<Array<$t, 4>, 4>>();
            bind::<Tensor<DynamicArray<$t>>>();
        )*
    };
}

macro_rules! bind_float_shapes {
    ($($t:ty),*) => {
        $(
            bind::<Matrix<$t, 2>>();
            bind::<Matrix<$t, 3>>();
            bind::<Matrix<$t, 4>>();
            bind::<Complex<$t>>();
            bind::<Quaternion<$t>>();
        )*
    };
}

/// Bind the standard host family.
pub fn bind_all() {
    bind_sizes!(bool, f32, f64, u32, i32, u64, i64);
    bind_float_shapes!(f32, f64);
    log::debug!("[registry] host family bound ({} types)", TypeRegistry::global().len());
}

macro_rules! bind_leaves {
    ($b:ty; $($t:ty),*) => {
        $(
            bind::<JitArray<$t, $b>>();
            bind::<Array<JitArray<$t, $b>, 3>>();
            bind::<Tensor<JitArray<$t, $b>>>();
        )*
    };
}

/// Bind the accelerator family of backend `B`.
pub fn bind_backend<B: BackendMarker>() {
    bind_leaves!(B; bool, f32, f64, u32, i32, u64, i64);
    bind::<DiffArray<f32, B>>();
    bind::<DiffArray<f64, B>>();
    bind::<Array<DiffArray<f32, B>, 3>>();
    bind::<Tensor<DiffArray<f32, B>>>();
    log::debug!(
        "[registry] {} family bound ({} types)",
        B::KIND,
        TypeRegistry::global().len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{Array33f, Array3b, Array3f, Array3i, ArrayXf, Matrix3f, TensorXf};

    #[test]
    fn test_bind_is_idempotent() {
        let a = bind::<Array3f>();
        let b = bind::<Array3f>();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "Array3f");
        assert_eq!(a.module(), "arraybind.scalar");
    }

    #[test]
    fn test_related_types_bound_first() {
        let m = bind::<Matrix3f>();
        let mask = m.mask_type().expect("mask bound");
        assert_eq!(mask.name(), "Array33b");
        let row = m.value_type().expect("row bound");
        assert_eq!(row.name(), "Array3f");
        assert!(bind::<Array3f>().value_type().is_none());
        assert_eq!(m.flat_type().expect("flat bound").name(), "ArrayXf");
    }

    #[test]
    fn test_lookups() {
        let reg = bind::<Array3i>();
        let registry = TypeRegistry::global();
        let by_desc = registry.lookup(reg.descriptor()).expect("descriptor");
        assert!(Arc::ptr_eq(&reg, &by_desc));
        let by_name = registry.by_name("arraybind.scalar.Array3i").expect("name");
        assert!(Arc::ptr_eq(&reg, &by_name));
        assert!(registry.by_name("arraybind.scalar.Nope").is_none());
    }

    #[test]
    fn test_trait_queries_and_lifecycle() {
        let reg = bind::<Array3f>();
        assert!(reg.is_float() && reg.is_signed() && !reg.is_unsigned());
        assert!(reg.lifecycle().trivially_copyable);
        assert_eq!(reg.size(), Some(3));

        let x = bind::<ArrayXf>();
        assert!(!x.lifecycle().trivially_destructible);
        assert_eq!(x.size(), None);

        let t = bind::<TensorXf>();
        assert!(t.is_tensor() && t.tensor_glue().is_some());
        assert!(bind::<Array3b>().is_mask());
    }

    #[test]
    fn test_access_callbacks() {
        let reg = bind::<Array3f>();
        let mut value = Array3f::from([1.0, 2.0, 3.0]);
        assert_eq!((reg.access().get)(&value, -1).expect("wrap"), HostValue::Float(3.0));
        let err = (reg.access().get)(&value, 3).expect_err("out of bounds");
        assert!(matches!(err, Error::Index { index: 3, size: 3, .. }));

        (reg.access().set)(&mut value, 0, &HostValue::Int(7)).expect("int into float");
        assert_eq!(value.entries()[0], 7.0);
        let err = (reg.access().set)(&mut value, 0, &HostValue::from("x")).expect_err("str");
        assert!(matches!(err, Error::Conversion { .. }));
    }

    #[test]
    fn test_size_one_read_broadcasts() {
        let reg = bind::<ArrayXf>();
        let mut value = ArrayXf::from(vec![4.0]);
        assert_eq!((reg.access().get)(&value, 5).expect("broadcast"), HostValue::Float(4.0));
        assert!((reg.access().set)(&mut value, 5, &HostValue::Float(1.0)).is_err());
    }

    #[test]
    fn test_bind_all_covers_family() {
        bind_all();
        let registry = TypeRegistry::global();
        for name in [
            "arraybind.scalar.Array0f",
            "arraybind.scalar.Array4u64",
            "arraybind.scalar.ArrayXb",
            "arraybind.scalar.Array44i",
            "arraybind.scalar.Matrix4f64",
            "arraybind.scalar.Complex2f",
            "arraybind.scalar.TensorXi64",
        ] {
            assert!(registry.by_name(name).is_some(), "{} missing", name);
        }
        assert!(bind::<Array33f>().ops().supports(crate::ops::Op::Add));
    }
}
