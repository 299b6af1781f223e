// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Kernels for one-dimensional host arrays.
//!
//! Binary and ternary kernels broadcast operands of length one; any other
//! length disagreement is a shape error.

use super::{operand, Compare, Kernels, Op, Storage};
use crate::error::{Error, Result};
use crate::family::ArrayType;
use crate::host::HostValue;
use crate::object::{ArrayObject, Erased};
use crate::registry;
use crate::scalar::{Scalar, ScalarValue};

/// A host array whose entries are scalars.
pub trait HostLeaf: ArrayType + Sized {
    type Elem: Scalar;
    /// Fixed length, or `None` for run-time sized arrays.
    const FIXED: Option<usize>;

    fn values(&self) -> &[Self::Elem];
    fn from_values(values: Vec<Self::Elem>) -> Result<Self>;
    /// Read the bits of this type's mask.
    fn mask_values(mask: &Erased) -> Result<Vec<bool>>;
    /// Build this type's mask from bits.
    fn mask_storage(bits: Vec<bool>) -> Result<Storage>;
}

pub(crate) fn kernels<A: HostLeaf>() -> Kernels {
    let sized = A::FIXED.is_none();
    Kernels {
        unary: unary::<A>,
        binary: binary::<A>,
        ternary: ternary::<A>,
        compare: compare::<A>,
        pair: pair::<A>,
        reduce: reduce::<A>,
        cast: Some(cast::<A>),
        sized: sized.then_some(sized_kernel::<A> as super::SizedFn),
        full: sized.then_some(full::<A> as super::FullFn),
        index: None,
        index_ad: None,
    }
}

fn undefined<A: 'static>(op: Op) -> Error {
    Error::Arithmetic {
        type_name: registry::label::<A>(),
        op,
    }
}

/// Result length of an element-wise operation over operands of `lens`.
fn broadcast_len<A: 'static>(lens: &[usize]) -> Result<usize> {
    let target = lens.iter().copied().max().unwrap_or(0);
    match lens.iter().find(|&&len| len != target && len != 1) {
        Some(&bad) => Err(Error::ShapeMismatch {
            type_name: registry::label::<A>(),
            expected: target,
            got: bad,
        }),
        None => Ok(target),
    }
}

#[inline]
fn at<T: Copy>(values: &[T], i: usize) -> T {
    if values.len() == 1 {
        values[0]
    } else {
        values[i]
    }
}

fn unary<A: HostLeaf>(op: Op, a: &Erased) -> Result<Storage> {
    let a = operand::<A>(a)?;
    let out = a
        .values()
        .iter()
        .map(|&x| A::Elem::unary(op, x).ok_or_else(|| undefined::<A>(op)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(A::from_values(out)?))
}

fn binary<A: HostLeaf>(op: Op, a: &Erased, b: &Erased) -> Result<Storage> {
    let (xs, ys) = (operand::<A>(a)?.values(), operand::<A>(b)?.values());
    let n = broadcast_len::<A>(&[xs.len(), ys.len()])?;
    let out = (0..n)
        .map(|i| A::Elem::binary(op, at(xs, i), at(ys, i)).ok_or_else(|| undefined::<A>(op)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(A::from_values(out)?))
}

fn ternary<A: HostLeaf>(op: Op, a: &Erased, b: &Erased, c: &Erased) -> Result<Storage> {
    let (ys, zs) = (operand::<A>(b)?.values(), operand::<A>(c)?.values());
    let out = match op {
        Op::Select => {
            let mask = A::mask_values(a)?;
            let n = broadcast_len::<A>(&[mask.len(), ys.len(), zs.len()])?;
            (0..n)
                .map(|i| if at(&mask, i) { at(ys, i) } else { at(zs, i) })
                .collect()
        }
        Op::Fma => {
            let xs = operand::<A>(a)?.values();
            let n = broadcast_len::<A>(&[xs.len(), ys.len(), zs.len()])?;
            (0..n)
                .map(|i| A::Elem::fma(at(xs, i), at(ys, i), at(zs, i)))
                .collect()
        }
        other => return Err(undefined::<A>(other)),
    };
    Ok(Box::new(A::from_values(out)?))
}

fn compare<A: HostLeaf>(cmp: Compare, a: &Erased, b: &Erased) -> Result<Storage> {
    let (xs, ys) = (operand::<A>(a)?.values(), operand::<A>(b)?.values());
    let n = broadcast_len::<A>(&[xs.len(), ys.len()])?;
    let bits = (0..n).map(|i| cmp.eval(&at(xs, i), &at(ys, i))).collect();
    A::mask_storage(bits)
}

fn pair<A: HostLeaf>(op: Op, a: &Erased) -> Result<(Storage, Storage)> {
    let a = operand::<A>(a)?;
    let (mut first, mut second) = (Vec::with_capacity(a.len()), Vec::with_capacity(a.len()));
    for &x in a.values() {
        let (p, q) = A::Elem::pair(op, x).ok_or_else(|| undefined::<A>(op))?;
        first.push(p);
        second.push(q);
    }
    Ok((
        Box::new(A::from_values(first)?),
        Box::new(A::from_values(second)?),
    ))
}

/// Horizontal `all`/`any`, broadcast back into the mask type.
fn reduce<A: HostLeaf>(op: Op, a: &Erased) -> Result<Storage> {
    let values = operand::<A>(a)?.values();
    let result = match op {
        Op::All => values.iter().all(|v| v.is_nonzero()),
        Op::Any => values.iter().any(|v| v.is_nonzero()),
        other => return Err(undefined::<A>(other)),
    };
    let len = A::FIXED.unwrap_or(1);
    let fill = A::Elem::from_value(ScalarValue::Bool(result));
    Ok(Box::new(A::from_values(vec![fill; len])?))
}

/// Convert every leaf of `source` (same shape, other kind) with `as` semantics.
fn cast<A: HostLeaf>(source: &ArrayObject) -> Result<Storage> {
    let kind = source.descriptor().kind();
    let out = (0..source.len())
        .map(|i| {
            let value = source.get_item(i as isize)?;
            kind.construct(&value)
                .map(A::Elem::from_value)
                .ok_or_else(|| Error::Conversion {
                    type_name: registry::label::<A>(),
                    source: value.type_name(),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(A::from_values(out)?))
}

fn sized_kernel<A: HostLeaf>(op: Op, len: usize) -> Result<Storage> {
    let out = match op {
        Op::Zero | Op::Empty => vec![A::Elem::default(); len],
        Op::Arange => (0..len)
            .map(|i| A::Elem::from_value(ScalarValue::U64(i as u64)))
            .collect(),
        other => return Err(undefined::<A>(other)),
    };
    Ok(Box::new(A::from_values(out)?))
}

fn full<A: HostLeaf>(value: &HostValue, len: usize) -> Result<Storage> {
    let kind = <A::Elem as crate::family::Element>::KIND;
    let scalar = kind.construct(value).ok_or_else(|| Error::Conversion {
        type_name: registry::label::<A>(),
        source: value.type_name(),
    })?;
    Ok(Box::new(A::from_values(vec![A::Elem::from_value(scalar); len])?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{Array3b, Array3f, Array3i, ArrayXb, ArrayXf};
    use crate::ops::take;

    fn xf(values: &[f32]) -> ArrayXf {
        ArrayXf::from(values.to_vec())
    }

    #[test]
    fn test_binary_broadcasts_length_one() {
        let out = binary::<ArrayXf>(Op::Add, &xf(&[1.0, 2.0, 3.0]), &xf(&[10.0])).expect("add");
        assert_eq!(take::<ArrayXf>(out).expect("ArrayXf").entries(), &[11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_binary_rejects_mismatched_lengths() {
        let err = binary::<ArrayXf>(Op::Add, &xf(&[1.0, 2.0]), &xf(&[1.0, 2.0, 3.0]))
            .expect_err("2 vs 3");
        assert!(matches!(err, Error::ShapeMismatch { expected: 3, got: 2, .. }));
    }

    #[test]
    fn test_integer_division_by_zero_is_an_error() {
        let a = Array3i::from([1, 2, 3]);
        let b = Array3i::from([1, 0, 1]);
        let err = binary::<Array3i>(Op::FloorDivide, &a, &b).expect_err("div by zero");
        assert!(matches!(err, Error::Arithmetic { op: Op::FloorDivide, .. }));
    }

    #[test]
    fn test_compare_produces_mask() {
        let a = Array3f::from([1.0, 5.0, 3.0]);
        let b = Array3f::from([2.0, 2.0, 3.0]);
        let out = compare::<Array3f>(Compare::Le, &a, &b).expect("compare");
        assert_eq!(take::<Array3b>(out).expect("Array3b").entries(), &[true, false, true]);
    }

    #[test]
    fn test_select_uses_mask() {
        let mask = ArrayXb::from(vec![true, false]);
        let out = ternary::<ArrayXf>(Op::Select, &mask, &xf(&[1.0, 2.0]), &xf(&[9.0]))
            .expect("select");
        assert_eq!(take::<ArrayXf>(out).expect("ArrayXf").entries(), &[1.0, 9.0]);
    }

    #[test]
    fn test_reduce_fills_fixed_mask() {
        let out = reduce::<Array3b>(Op::Any, &Array3b::from([false, true, false])).expect("any");
        assert_eq!(take::<Array3b>(out).expect("Array3b").entries(), &[true; 3]);

        let out = reduce::<ArrayXb>(Op::All, &ArrayXb::from(vec![])).expect("all");
        assert_eq!(take::<ArrayXb>(out).expect("ArrayXb").entries(), &[true]);
    }

    #[test]
    fn test_sized_kernels() {
        let out = sized_kernel::<ArrayXf>(Op::Arange, 3).expect("arange");
        assert_eq!(take::<ArrayXf>(out).expect("ArrayXf").entries(), &[0.0, 1.0, 2.0]);
        let out = full::<ArrayXf>(&HostValue::Int(4), 2).expect("full");
        assert_eq!(take::<ArrayXf>(out).expect("ArrayXf").entries(), &[4.0, 4.0]);
    }

    #[test]
    fn test_pair_splits_outputs() {
        let (s, c) = pair::<ArrayXf>(Op::Sincos, &xf(&[0.0])).expect("sincos");
        assert_eq!(take::<ArrayXf>(s).expect("sin").entries(), &[0.0]);
        assert_eq!(take::<ArrayXf>(c).expect("cos").entries(), &[1.0]);
    }
}
