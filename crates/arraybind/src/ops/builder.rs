// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Operation table construction.
//!
//! Eligibility comes from the descriptor alone. One-dimensional types get
//! their own kernels; deeper types get `Recurse` for everything eligible,
//! except the length queries which always act on the outermost axis.

use super::{Kernel, Kernels, Op, OpEntry, OpTable, Requirement, Storage};
use crate::descriptor::{self, TypeDescriptor};
use crate::error::Result;
use crate::family::ArrayType;
use crate::object::Erased;
use crate::registry;

/// Whether `op` may be bound at all for a type described by `desc`.
pub fn eligible(op: Op, desc: &TypeDescriptor) -> bool {
    let kind = desc.kind();
    let leaf = desc.depth() == 1;
    match op.requirement() {
        Requirement::Arithmetic => kind.is_arithmetic(),
        Requirement::SignedArithmetic => kind.is_arithmetic() && kind.is_signed(),
        Requirement::Integral => kind.is_integral(),
        Requirement::NonIntegralArithmetic => kind.is_arithmetic() && !kind.is_integral(),
        Requirement::IntegralOrMask => kind.is_integral() || kind.is_mask(),
        Requirement::ArithmeticOrMask => kind.is_arithmetic() || kind.is_mask(),
        Requirement::Float => kind.is_float(),
        Requirement::Mask => kind.is_mask(),
        Requirement::DynamicLeaf => leaf && desc.is_outer_dynamic(),
        Requirement::OuterDynamic => desc.is_outer_dynamic(),
        Requirement::JitLeaf => leaf && desc.is_jit(),
        Requirement::DiffFloatLeaf => leaf && desc.is_diff() && kind.is_float(),
        Requirement::NotTensor => !desc.is_tensor(),
    }
}

/// Build the table of `T`.
pub fn build<T: ArrayType>() -> OpTable {
    let desc = descriptor::encode::<T>();
    let kernels = T::kernels();
    let table = OpTable::from_fn(|op| entry::<T>(op, &desc, kernels.as_ref()));
    log::trace!(
        "[ops] {:?}: {} of {} operations bound",
        desc,
        table.supported_count(),
        Op::COUNT
    );
    table
}

fn entry<T: ArrayType>(op: Op, desc: &TypeDescriptor, kernels: Option<&Kernels>) -> OpEntry {
    if !eligible(op, desc) {
        return OpEntry::Unsupported;
    }
    match op {
        Op::Len => return OpEntry::Direct(Kernel::Len(len_of::<T>)),
        Op::Resize => return OpEntry::Direct(Kernel::Resize(resize_of::<T>)),
        _ => {}
    }
    if desc.depth() > 1 {
        return OpEntry::Recurse;
    }
    match kernels.and_then(|k| k.lookup(op)) {
        Some(kernel) => OpEntry::Direct(kernel),
        None => OpEntry::Unsupported,
    }
}

fn len_of<T: ArrayType>(value: &Erased) -> usize {
    value.downcast_ref::<T>().map_or(0, ArrayType::len)
}

fn resize_of<T: ArrayType>(value: &mut Erased, len: usize) -> Result<()> {
    match value.downcast_mut::<T>() {
        Some(array) => array.resize(len),
        None => Err(crate::error::Error::TypeMismatch {
            expected: registry::label::<T>(),
            got: "a different array type".into(),
        }),
    }
}

/// Zero-initialized storage for `T`.
pub(crate) fn zero_of<T: ArrayType>() -> Storage {
    Box::new(T::zeroed())
}
