// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Kernels for accelerator-backed arrays: every operation becomes a backend launch.

use super::{dispatch, operand, take, Compare, Kernels, Op, Storage};
use crate::backend::{self, Launch};
use crate::error::{Error, Result};
use crate::family::{BackendMarker, DiffArray, JitArray};
use crate::host::HostValue;
use crate::object::{ArrayObject, Erased};
use crate::registry;
use crate::scalar::{ElementKind, Scalar};

pub(crate) fn kernels<T: Scalar, B: BackendMarker>() -> Kernels {
    Kernels {
        unary: unary::<T, B>,
        binary: binary::<T, B>,
        ternary: ternary::<T, B>,
        compare: compare::<T, B>,
        pair: pair::<T, B>,
        reduce: reduce::<T, B>,
        cast: Some(cast::<T, B>),
        sized: Some(sized::<T, B>),
        full: Some(full::<T, B>),
        index: Some(index::<T, B>),
        index_ad: None,
    }
}

fn handle<T: Scalar, B: BackendMarker>(value: &Erased) -> Result<u32> {
    Ok(operand::<JitArray<T, B>>(value)?.index())
}

/// Run one launch and adopt its single result.
fn launch<T: Scalar, B: BackendMarker>(
    what: Launch,
    kind: ElementKind,
    args: &[u32],
) -> Result<u32> {
    let results = backend::get(B::KIND)?.launch(what, kind, args)?;
    results.first().copied().ok_or_else(|| {
        Error::Backend(format!("{:?} on {} produced no result", what, B::KIND))
    })
}

fn wrap<T: Scalar, B: BackendMarker>(index: u32) -> Storage {
    Box::new(JitArray::<T, B>::from_index(index))
}

fn unary<T: Scalar, B: BackendMarker>(op: Op, a: &Erased) -> Result<Storage> {
    let a = handle::<T, B>(a)?;
    Ok(wrap::<T, B>(launch::<T, B>(Launch::Op(op), T::KIND, &[a])?))
}

fn binary<T: Scalar, B: BackendMarker>(op: Op, a: &Erased, b: &Erased) -> Result<Storage> {
    let args = [handle::<T, B>(a)?, handle::<T, B>(b)?];
    Ok(wrap::<T, B>(launch::<T, B>(Launch::Op(op), T::KIND, &args)?))
}

fn ternary<T: Scalar, B: BackendMarker>(
    op: Op,
    a: &Erased,
    b: &Erased,
    c: &Erased,
) -> Result<Storage> {
    let first = match op {
        Op::Select => handle::<bool, B>(a)?,
        _ => handle::<T, B>(a)?,
    };
    let args = [first, handle::<T, B>(b)?, handle::<T, B>(c)?];
    Ok(wrap::<T, B>(launch::<T, B>(Launch::Op(op), T::KIND, &args)?))
}

fn compare<T: Scalar, B: BackendMarker>(cmp: Compare, a: &Erased, b: &Erased) -> Result<Storage> {
    let args = [handle::<T, B>(a)?, handle::<T, B>(b)?];
    let index = launch::<T, B>(Launch::Compare(cmp), T::KIND, &args)?;
    Ok(wrap::<bool, B>(index))
}

fn pair<T: Scalar, B: BackendMarker>(op: Op, a: &Erased) -> Result<(Storage, Storage)> {
    let a = handle::<T, B>(a)?;
    let results = backend::get(B::KIND)?.launch(Launch::Op(op), T::KIND, &[a])?;
    match results[..] {
        [first, second] => Ok((wrap::<T, B>(first), wrap::<T, B>(second))),
        _ => Err(Error::Backend(format!(
            "{} on {} produced {} results, expected 2",
            op,
            B::KIND,
            results.len()
        ))),
    }
}

fn reduce<T: Scalar, B: BackendMarker>(op: Op, a: &Erased) -> Result<Storage> {
    let a = handle::<T, B>(a)?;
    Ok(wrap::<T, B>(launch::<T, B>(Launch::Op(op), T::KIND, &[a])?))
}

fn cast<T: Scalar, B: BackendMarker>(source: &ArrayObject) -> Result<Storage> {
    let from = dispatch::index(source)?;
    Ok(wrap::<T, B>(launch::<T, B>(Launch::Cast, T::KIND, &[from])?))
}

fn sized<T: Scalar, B: BackendMarker>(op: Op, len: usize) -> Result<Storage> {
    let backend = backend::get(B::KIND)?;
    let index = match op {
        Op::Arange => backend.arange(T::KIND, len)?,
        Op::Zero | Op::Empty => backend.full(T::KIND, T::KIND.zero(), len)?,
        other => {
            return Err(Error::Unsupported {
                type_name: registry::label::<JitArray<T, B>>(),
                op: other,
            })
        }
    };
    Ok(wrap::<T, B>(index))
}

fn full<T: Scalar, B: BackendMarker>(value: &HostValue, len: usize) -> Result<Storage> {
    let scalar = T::KIND.construct(value).ok_or_else(|| Error::Conversion {
        type_name: registry::label::<JitArray<T, B>>(),
        source: value.type_name(),
    })?;
    let index = backend::get(B::KIND)?.full(T::KIND, scalar, len)?;
    Ok(wrap::<T, B>(index))
}

fn index<T: Scalar, B: BackendMarker>(value: &Erased) -> u32 {
    value
        .downcast_ref::<JitArray<T, B>>()
        .map_or(0, JitArray::index)
}

// =======================================================================
// Differentiable arrays: run the primal kernel, results are detached
// =======================================================================

pub(crate) fn diff_kernels<T: Scalar, B: BackendMarker>() -> Kernels {
    Kernels {
        unary: diff_unary::<T, B>,
        binary: diff_binary::<T, B>,
        ternary: diff_ternary::<T, B>,
        compare: diff_compare::<T, B>,
        pair: diff_pair::<T, B>,
        reduce: diff_unary::<T, B>,
        cast: Some(diff_cast::<T, B>),
        sized: Some(diff_sized::<T, B>),
        full: Some(diff_full::<T, B>),
        index: Some(diff_index::<T, B>),
        index_ad: T::KIND.is_float().then_some(diff_index_ad::<T, B> as super::IndexFn),
    }
}

fn primal<T: Scalar, B: BackendMarker>(value: &Erased) -> Result<&JitArray<T, B>> {
    Ok(operand::<DiffArray<T, B>>(value)?.primal())
}

fn detach<T: Scalar, B: BackendMarker>(storage: Storage) -> Result<Storage> {
    let primal = take::<JitArray<T, B>>(storage)?;
    Ok(Box::new(DiffArray::from_primal(primal)))
}

fn diff_unary<T: Scalar, B: BackendMarker>(op: Op, a: &Erased) -> Result<Storage> {
    let result = if op.signature() == super::Signature::Reduce {
        reduce::<T, B>(op, primal::<T, B>(a)?)?
    } else {
        unary::<T, B>(op, primal::<T, B>(a)?)?
    };
    detach::<T, B>(result)
}

fn diff_binary<T: Scalar, B: BackendMarker>(op: Op, a: &Erased, b: &Erased) -> Result<Storage> {
    detach::<T, B>(binary::<T, B>(op, primal::<T, B>(a)?, primal::<T, B>(b)?)?)
}

fn diff_ternary<T: Scalar, B: BackendMarker>(
    op: Op,
    a: &Erased,
    b: &Erased,
    c: &Erased,
) -> Result<Storage> {
    let (b, c) = (primal::<T, B>(b)?, primal::<T, B>(c)?);
    let result = match op {
        Op::Select => ternary::<T, B>(op, a, b, c)?,
        _ => ternary::<T, B>(op, primal::<T, B>(a)?, b, c)?,
    };
    detach::<T, B>(result)
}

fn diff_compare<T: Scalar, B: BackendMarker>(
    cmp: Compare,
    a: &Erased,
    b: &Erased,
) -> Result<Storage> {
    compare::<T, B>(cmp, primal::<T, B>(a)?, primal::<T, B>(b)?)
}

fn diff_pair<T: Scalar, B: BackendMarker>(op: Op, a: &Erased) -> Result<(Storage, Storage)> {
    let (first, second) = pair::<T, B>(op, primal::<T, B>(a)?)?;
    Ok((detach::<T, B>(first)?, detach::<T, B>(second)?))
}

fn diff_cast<T: Scalar, B: BackendMarker>(source: &ArrayObject) -> Result<Storage> {
    detach::<T, B>(cast::<T, B>(source)?)
}

fn diff_sized<T: Scalar, B: BackendMarker>(op: Op, len: usize) -> Result<Storage> {
    detach::<T, B>(sized::<T, B>(op, len)?)
}

fn diff_full<T: Scalar, B: BackendMarker>(value: &HostValue, len: usize) -> Result<Storage> {
    detach::<T, B>(full::<T, B>(value, len)?)
}

fn diff_index<T: Scalar, B: BackendMarker>(value: &Erased) -> u32 {
    value
        .downcast_ref::<DiffArray<T, B>>()
        .map_or(0, DiffArray::index)
}

fn diff_index_ad<T: Scalar, B: BackendMarker>(value: &Erased) -> u32 {
    value
        .downcast_ref::<DiffArray<T, B>>()
        .map_or(0, DiffArray::ad_index)
}
