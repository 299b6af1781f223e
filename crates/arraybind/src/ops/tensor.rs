// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tensor kernels: run the flat array's kernel and carry the shape along.

use super::{operand, take, Compare, FullFn, IndexFn, Kernels, Op, SizedFn, Storage};
use crate::error::{Error, Result};
use crate::family::{ArrayType, Tensor};
use crate::host::HostValue;
use crate::object::Erased;
use crate::registry;

pub(crate) fn kernels<A: ArrayType>() -> Option<Kernels> {
    let inner = A::kernels()?;
    Some(Kernels {
        unary: unary::<A>,
        binary: binary::<A>,
        ternary: ternary::<A>,
        compare: compare::<A>,
        pair: pair::<A>,
        reduce: reduce::<A>,
        cast: None,
        sized: inner.sized.map(|_| sized::<A> as SizedFn),
        full: inner.full.map(|_| full::<A> as FullFn),
        index: inner.index.map(|_| index::<A> as IndexFn),
        index_ad: inner.index_ad.map(|_| index_ad::<A> as IndexFn),
    })
}

fn leaf<A: ArrayType>() -> Result<Kernels> {
    A::kernels().ok_or_else(|| Error::Unsupported {
        type_name: registry::label::<Tensor<A>>(),
        op: Op::Cast,
    })
}

fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Shape of an element-wise result; single-element operands broadcast.
fn result_shape<A: 'static>(shapes: &[&[usize]]) -> Result<Vec<usize>> {
    let widest = shapes
        .iter()
        .copied()
        .max_by_key(|s| numel(s))
        .unwrap_or(&[]);
    for shape in shapes {
        if *shape != widest && numel(shape) != 1 {
            return Err(Error::ShapeMismatch {
                type_name: registry::label::<Tensor<A>>(),
                expected: numel(widest),
                got: numel(shape),
            });
        }
    }
    Ok(widest.to_vec())
}

fn unary<A: ArrayType>(op: Op, a: &Erased) -> Result<Storage> {
    let a = operand::<Tensor<A>>(a)?;
    let out = (leaf::<A>()?.unary)(op, a.array())?;
    Ok(Box::new(Tensor::from_parts(take::<A>(out)?, a.shape().to_vec())))
}

fn binary<A: ArrayType>(op: Op, a: &Erased, b: &Erased) -> Result<Storage> {
    let (a, b) = (operand::<Tensor<A>>(a)?, operand::<Tensor<A>>(b)?);
    let shape = result_shape::<A>(&[a.shape(), b.shape()])?;
    let out = (leaf::<A>()?.binary)(op, a.array(), b.array())?;
    Ok(Box::new(Tensor::from_parts(take::<A>(out)?, shape)))
}

fn ternary<A: ArrayType>(op: Op, a: &Erased, b: &Erased, c: &Erased) -> Result<Storage> {
    let (b, c) = (operand::<Tensor<A>>(b)?, operand::<Tensor<A>>(c)?);
    let kernel = leaf::<A>()?.ternary;
    let (shape, out) = if op == Op::Select {
        let mask = operand::<Tensor<A::Mask>>(a)?;
        let shape = result_shape::<A>(&[mask.shape(), b.shape(), c.shape()])?;
        (shape, kernel(op, mask.array(), b.array(), c.array())?)
    } else {
        let a = operand::<Tensor<A>>(a)?;
        let shape = result_shape::<A>(&[a.shape(), b.shape(), c.shape()])?;
        (shape, kernel(op, a.array(), b.array(), c.array())?)
    };
    Ok(Box::new(Tensor::from_parts(take::<A>(out)?, shape)))
}

fn compare<A: ArrayType>(cmp: Compare, a: &Erased, b: &Erased) -> Result<Storage> {
    let (a, b) = (operand::<Tensor<A>>(a)?, operand::<Tensor<A>>(b)?);
    let shape = result_shape::<A>(&[a.shape(), b.shape()])?;
    let out = (leaf::<A>()?.compare)(cmp, a.array(), b.array())?;
    Ok(Box::new(Tensor::from_parts(take::<A::Mask>(out)?, shape)))
}

fn pair<A: ArrayType>(op: Op, a: &Erased) -> Result<(Storage, Storage)> {
    let a = operand::<Tensor<A>>(a)?;
    let (first, second) = (leaf::<A>()?.pair)(op, a.array())?;
    Ok((
        Box::new(Tensor::from_parts(take::<A>(first)?, a.shape().to_vec())),
        Box::new(Tensor::from_parts(take::<A>(second)?, a.shape().to_vec())),
    ))
}

fn reduce<A: ArrayType>(op: Op, a: &Erased) -> Result<Storage> {
    let a = operand::<Tensor<A>>(a)?;
    let out = take::<A>((leaf::<A>()?.reduce)(op, a.array())?)?;
    let len = out.len();
    Ok(Box::new(Tensor::from_parts(out, vec![len])))
}

fn sized<A: ArrayType>(op: Op, len: usize) -> Result<Storage> {
    let kernel = leaf::<A>()?.sized.ok_or_else(|| Error::Unsupported {
        type_name: registry::label::<Tensor<A>>(),
        op,
    })?;
    Ok(Box::new(Tensor::from_parts(take::<A>(kernel(op, len)?)?, vec![len])))
}

fn full<A: ArrayType>(value: &HostValue, len: usize) -> Result<Storage> {
    let kernel = leaf::<A>()?.full.ok_or_else(|| Error::Unsupported {
        type_name: registry::label::<Tensor<A>>(),
        op: Op::Full,
    })?;
    Ok(Box::new(Tensor::from_parts(take::<A>(kernel(value, len)?)?, vec![len])))
}

fn index<A: ArrayType>(value: &Erased) -> u32 {
    match (value.downcast_ref::<Tensor<A>>(), A::kernels().and_then(|k| k.index)) {
        (Some(tensor), Some(kernel)) => kernel(tensor.array()),
        _ => 0,
    }
}

fn index_ad<A: ArrayType>(value: &Erased) -> u32 {
    match (value.downcast_ref::<Tensor<A>>(), A::kernels().and_then(|k| k.index_ad)) {
        (Some(tensor), Some(kernel)) => kernel(tensor.array()),
        _ => 0,
    }
}
