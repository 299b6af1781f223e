// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Table-driven operation dispatch.
//!
//! `Direct` entries run their kernel on the erased storage. `Recurse`
//! entries rebuild the result entry by entry from the nested value type,
//! broadcasting operands whose outer extent is one. `Unsupported` entries
//! raise [`Error::Unsupported`] naming the type and the operation.

use super::{Compare, Kernel, Op, OpEntry};
use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::object::ArrayObject;
use crate::registry::Registration;
use std::sync::Arc;

fn entry(registration: &Registration, op: Op) -> Result<OpEntry> {
    match *registration.ops().get(op) {
        OpEntry::Unsupported => Err(unsupported(registration, op)),
        supported => Ok(supported),
    }
}

fn unsupported(registration: &Registration, op: Op) -> Error {
    Error::Unsupported {
        type_name: registration.qualified_name(),
        op,
    }
}

fn same_type(a: &ArrayObject, b: &ArrayObject) -> Result<()> {
    if a.registration().type_id() == b.registration().type_id() {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            expected: a.type_name(),
            got: b.type_name(),
        })
    }
}

/// Entry `index` of a nested array (single-entry arrays broadcast).
fn element(object: &ArrayObject, index: usize) -> Result<ArrayObject> {
    match object.get_item(index as isize)? {
        HostValue::Array(array) => Ok(array),
        other => Err(Error::TypeMismatch {
            expected: format!("array entry of {}", object.type_name()),
            got: other.type_name(),
        }),
    }
}

/// Apply `f` to the entries of `operands` and collect the results into a
/// new instance of `target`.
fn elementwise(
    target: &Arc<Registration>,
    operands: &[&ArrayObject],
    mut f: impl FnMut(&[ArrayObject]) -> Result<ArrayObject>,
) -> Result<ArrayObject> {
    let lens: Vec<usize> = operands.iter().map(|o| o.len()).collect();
    let len = lens.iter().copied().max().unwrap_or(0);
    if let Some(&bad) = lens.iter().find(|&&n| n != len && n != 1) {
        return Err(Error::ShapeMismatch {
            type_name: target.qualified_name(),
            expected: len,
            got: bad,
        });
    }

    let mut out = ArrayObject::zeroed(target);
    out.resize(len)?;
    for i in 0..len {
        let entries = operands
            .iter()
            .map(|o| element(o, i))
            .collect::<Result<Vec<_>>>()?;
        let value = f(&entries)?;
        out.set_item(i as isize, &HostValue::Array(value))?;
    }
    Ok(out)
}

// =======================================================================
// Element-wise operations
// =======================================================================

pub fn unary(op: Op, a: &ArrayObject) -> Result<ArrayObject> {
    let reg = a.registration();
    match entry(reg, op)? {
        OpEntry::Direct(Kernel::Unary(kernel)) => ArrayObject::from_storage(reg, kernel(op, a.data())?),
        OpEntry::Recurse => elementwise(reg, &[a], |e| unary(op, &e[0])),
        _ => Err(unsupported(reg, op)),
    }
}

/// Binary operation on two instances of the same type.
pub fn binary(op: Op, a: &ArrayObject, b: &ArrayObject) -> Result<ArrayObject> {
    same_type(a, b)?;
    let reg = a.registration();
    match entry(reg, op)? {
        OpEntry::Direct(Kernel::Binary(kernel)) => {
            ArrayObject::from_storage(reg, kernel(op, a.data(), b.data())?)
        }
        OpEntry::Recurse => elementwise(reg, &[a, b], |e| binary(op, &e[0], &e[1])),
        _ => Err(unsupported(reg, op)),
    }
}

/// `fma(a, b, c)` or `select(mask, b, c)`; for `Select` the first operand
/// is an instance of the mask type of `b`.
pub fn ternary(op: Op, a: &ArrayObject, b: &ArrayObject, c: &ArrayObject) -> Result<ArrayObject> {
    same_type(b, c)?;
    let reg = b.registration();
    if op == Op::Select {
        let mask = reg.mask_type()?;
        if a.registration().type_id() != mask.type_id() {
            return Err(Error::TypeMismatch {
                expected: mask.qualified_name(),
                got: a.type_name(),
            });
        }
    } else {
        same_type(b, a)?;
    }
    match entry(reg, op)? {
        OpEntry::Direct(Kernel::Ternary(kernel)) => {
            ArrayObject::from_storage(reg, kernel(op, a.data(), b.data(), c.data())?)
        }
        OpEntry::Recurse => elementwise(reg, &[a, b, c], |e| ternary(op, &e[0], &e[1], &e[2])),
        _ => Err(unsupported(reg, op)),
    }
}

/// Rich comparison; the result is an instance of the mask type.
pub fn compare(cmp: Compare, a: &ArrayObject, b: &ArrayObject) -> Result<ArrayObject> {
    same_type(a, b)?;
    let reg = a.registration();
    let mask = reg.mask_type()?;
    match entry(reg, Op::RichCompare)? {
        OpEntry::Direct(Kernel::Compare(kernel)) => {
            ArrayObject::from_storage(&mask, kernel(cmp, a.data(), b.data())?)
        }
        OpEntry::Recurse => elementwise(&mask, &[a, b], |e| compare(cmp, &e[0], &e[1])),
        _ => Err(unsupported(reg, Op::RichCompare)),
    }
}

/// Two-output operations (`sincos`, `sincosh`, `frexp`).
pub fn pair(op: Op, a: &ArrayObject) -> Result<(ArrayObject, ArrayObject)> {
    let reg = a.registration();
    match entry(reg, op)? {
        OpEntry::Direct(Kernel::Pair(kernel)) => {
            let (first, second) = kernel(op, a.data())?;
            Ok((
                ArrayObject::from_storage(reg, first)?,
                ArrayObject::from_storage(reg, second)?,
            ))
        }
        OpEntry::Recurse => {
            let mut seconds = Vec::with_capacity(a.len());
            let first = elementwise(reg, &[a], |e| {
                let (p, q) = pair(op, &e[0])?;
                seconds.push(q);
                Ok(p)
            })?;
            let mut second = ArrayObject::zeroed(reg);
            second.resize(seconds.len())?;
            for (i, q) in seconds.into_iter().enumerate() {
                second.set_item(i as isize, &HostValue::Array(q))?;
            }
            Ok((first, second))
        }
        _ => Err(unsupported(reg, op)),
    }
}

// =======================================================================
// Reductions
// =======================================================================

fn reduce(op: Op, a: &ArrayObject) -> Result<bool> {
    let reg = a.registration();
    match entry(reg, op)? {
        OpEntry::Direct(Kernel::Unary(kernel)) => {
            let reduced = ArrayObject::from_storage(reg, kernel(op, a.data())?)?;
            if reduced.is_empty() {
                return Ok(op == Op::All);
            }
            match reduced.get_item(0)? {
                HostValue::Bool(b) => Ok(b),
                other => other.as_int().map(|i| i != 0).ok_or_else(|| Error::TypeMismatch {
                    expected: "bool".into(),
                    got: other.type_name(),
                }),
            }
        }
        OpEntry::Recurse => {
            for i in 0..a.len() {
                let nested = reduce(op, &element(a, i)?)?;
                match (op, nested) {
                    (Op::All, false) => return Ok(false),
                    (Op::Any, true) => return Ok(true),
                    _ => {}
                }
            }
            Ok(op == Op::All)
        }
        _ => Err(unsupported(reg, op)),
    }
}

/// Whether every entry of a mask is set.
pub fn all(a: &ArrayObject) -> Result<bool> {
    reduce(Op::All, a)
}

/// Whether any entry of a mask is set.
pub fn any(a: &ArrayObject) -> Result<bool> {
    reduce(Op::Any, a)
}

// =======================================================================
// Conversion and handles
// =======================================================================

/// Convert `source` into an instance of `target`, which must share its
/// descriptor in everything but the element kind.
pub fn cast(source: &ArrayObject, target: &Arc<Registration>) -> Result<ArrayObject> {
    if !target.descriptor().cast_compatible(source.descriptor()) {
        return Err(Error::Cast {
            type_name: target.qualified_name(),
            cause: format!("'{}' has an incompatible layout", source.type_name()),
        });
    }
    match entry(target, Op::Cast)? {
        OpEntry::Direct(Kernel::Cast(kernel)) => ArrayObject::from_storage(target, kernel(source)?),
        OpEntry::Recurse => {
            let value = target
                .value_type()
                .ok_or_else(|| Error::NotRegistered(format!("entry type of {}", target.qualified_name())))?;
            elementwise(target, &[source], |e| cast(&e[0], &value))
        }
        _ => Err(unsupported(target, Op::Cast)),
    }
}

fn handle(op: Op, a: &ArrayObject) -> Result<u32> {
    let reg = a.registration();
    match entry(reg, op)? {
        OpEntry::Direct(Kernel::Index(kernel)) => Ok(kernel(a.data())),
        _ => Err(unsupported(reg, op)),
    }
}

/// Backend variable of an accelerator leaf.
pub fn index(a: &ArrayObject) -> Result<u32> {
    handle(Op::Index, a)
}

/// Derivative-tracking variable of a differentiable leaf.
pub fn index_ad(a: &ArrayObject) -> Result<u32> {
    handle(Op::IndexAd, a)
}

// =======================================================================
// Approximate comparison
// =======================================================================

/// Entries of a host-side sequence, or `None` for scalars.
fn entries(value: &HostValue) -> Result<Option<Vec<HostValue>>> {
    match value {
        HostValue::Array(array) => (0..array.len() as isize)
            .map(|i| array.get_item(i))
            .collect::<Result<Vec<_>>>()
            .map(Some),
        HostValue::Tuple(items) | HostValue::List(items) => Ok(Some(items.clone())),
        _ => Ok(None),
    }
}

fn scalar(value: &HostValue) -> Result<f64> {
    value.as_f64().ok_or_else(|| Error::Conversion {
        type_name: "float".into(),
        source: value.type_name(),
    })
}

/// `|a - b| <= atol + rtol * |b|` for every pair of leaves, with scalars and
/// single-entry sequences broadcast.
pub fn allclose(a: &HostValue, b: &HostValue, rtol: f64, atol: f64, equal_nan: bool) -> Result<bool> {
    match (entries(a)?, entries(b)?) {
        (None, None) => {
            let (x, y) = (scalar(a)?, scalar(b)?);
            if x.is_nan() || y.is_nan() {
                return Ok(equal_nan && x.is_nan() && y.is_nan());
            }
            Ok(x == y || (x - y).abs() <= atol + rtol * y.abs())
        }
        (Some(xs), None) => {
            for x in &xs {
                if !allclose(x, b, rtol, atol, equal_nan)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (None, Some(ys)) => {
            for y in &ys {
                if !allclose(a, y, rtol, atol, equal_nan)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Some(xs), Some(ys)) => {
            let len = xs.len().max(ys.len());
            for (n, side) in [(xs.len(), a), (ys.len(), b)] {
                if n != len && n != 1 {
                    return Err(Error::ShapeMismatch {
                        type_name: side.type_name(),
                        expected: len,
                        got: n,
                    });
                }
            }
            for i in 0..len {
                let x = &xs[if xs.len() == 1 { 0 } else { i }];
                let y = &ys[if ys.len() == 1 { 0 } else { i }];
                if !allclose(x, y, rtol, atol, equal_nan)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}
