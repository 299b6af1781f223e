// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tensor construction.
//!
//! Tensors take two optional arguments, positionally or by keyword: `array`
//! (anything the universal constructor accepts for the flat backing array)
//! and `shape` (a tuple of non-negative integers). The shape is inferred
//! from foreign buffers, source tensors and rectangular nested lists; an
//! explicit shape must agree with the number of elements.

use super::foreign;
use crate::buffer::element_count;
use crate::config;
use crate::error::{Error, Result};
use crate::family::TensorGlue;
use crate::host::HostValue;
use crate::object::ArrayObject;
use crate::registry::{Registration, TypeRegistry};
use std::sync::Arc;

/// Fill the tensor `target` from `array` and/or `shape` arguments.
pub fn fill(target: &mut ArrayObject, args: &[HostValue], kwargs: &[(&str, HostValue)]) -> Result<()> {
    let result = parse(target, args, kwargs).and_then(|(array, shape)| build(target, array, shape));
    if result.is_err() {
        target.reset();
    }
    result
}

fn invalid(target: &ArrayObject, message: String) -> Error {
    Error::InvalidArgument {
        type_name: target.type_name(),
        message,
    }
}

type Arguments<'a> = (Option<&'a HostValue>, Option<Vec<usize>>);

fn parse<'a>(
    target: &ArrayObject,
    args: &'a [HostValue],
    kwargs: &'a [(&str, HostValue)],
) -> Result<Arguments<'a>> {
    if args.len() > 2 {
        return Err(invalid(
            target,
            format!("takes at most 2 positional arguments ({} given)", args.len()),
        ));
    }
    let mut array = args.first();
    let mut shape = args.get(1);
    for (name, value) in kwargs {
        let slot = match *name {
            "array" => &mut array,
            "shape" => &mut shape,
            other => return Err(invalid(target, format!("unexpected keyword argument '{}'", other))),
        };
        if slot.is_some() {
            return Err(invalid(target, format!("argument '{}' given twice", name)));
        }
        *slot = Some(value);
    }

    let present = |value: Option<&'a HostValue>| value.filter(|v| !matches!(v, HostValue::None));
    let shape = present(shape).map(|s| parse_shape(target, s)).transpose()?;
    Ok((present(array), shape))
}

fn parse_shape(target: &ArrayObject, value: &HostValue) -> Result<Vec<usize>> {
    let bad = || invalid(target, "shape must be a tuple of non-negative integers".into());
    let HostValue::Tuple(items) = value else {
        return Err(bad());
    };
    items
        .iter()
        .map(|item| match item {
            HostValue::Int(n) => usize::try_from(*n).map_err(|_| bad()),
            _ => Err(bad()),
        })
        .collect()
}

fn numel(target: &ArrayObject, shape: &[usize]) -> Result<usize> {
    element_count(shape).ok_or_else(|| invalid(target, format!("shape {:?} overflows", shape)))
}

/// Extents of a nested tuple/list, or `None` when it is ragged.
fn nested_shape(value: &HostValue) -> Option<Vec<usize>> {
    let Some(items) = value.as_items() else {
        return Some(Vec::new());
    };
    let mut inner: Option<Vec<usize>> = None;
    for item in items {
        let shape = nested_shape(item)?;
        match &inner {
            None => inner = Some(shape),
            Some(previous) if *previous == shape => {}
            Some(_) => return None,
        }
    }
    let mut shape = vec![items.len()];
    shape.extend(inner.unwrap_or_default());
    Some(shape)
}

fn flatten(value: &HostValue, leaves: &mut Vec<HostValue>) {
    match value.as_items() {
        Some(items) => items.iter().for_each(|item| flatten(item, leaves)),
        None => leaves.push(value.clone()),
    }
}

/// Flat array and shape of an existing tensor.
fn split(glue: &TensorGlue, tensor: &ArrayObject) -> Result<(ArrayObject, Vec<usize>)> {
    let registration = TypeRegistry::global()
        .get(glue.array_type)
        .ok_or_else(|| Error::NotRegistered(format!("flat array of {}", tensor.type_name())))?;
    let (storage, shape) = (glue.parts)(tensor.data())?;
    Ok((ArrayObject::from_storage(&registration, storage)?, shape))
}

fn build(target: &mut ArrayObject, array: Option<&HostValue>, shape: Option<Vec<usize>>) -> Result<()> {
    let registration = Arc::clone(target.registration());
    let glue = *registration
        .tensor_glue()
        .ok_or_else(|| invalid(target, "not a tensor type".into()))?;
    let flat_type = TypeRegistry::global()
        .get(glue.array_type)
        .ok_or_else(|| Error::NotRegistered(format!("flat array of {}", registration.qualified_name())))?;
    target.reset();

    let Some(array) = array else {
        let Some(shape) = shape else {
            log::trace!("[tensor] {}: zero", registration.name());
            return Ok(());
        };
        log::trace!("[tensor] {}: zeros of shape {:?}", registration.name(), shape);
        let count = numel(target, &shape)?;
        let mut flat = ArrayObject::zeroed(&flat_type);
        flat.resize(count)?;
        return assemble(target, &glue, flat, shape);
    };

    let (flat, inferred) = flat_and_shape(target, &registration, &glue, &flat_type, array)?;
    let shape = match shape {
        Some(shape) => {
            let expected = numel(target, &shape)?;
            if expected != flat.len() {
                return Err(Error::ShapeMismatch {
                    type_name: registration.qualified_name(),
                    expected,
                    got: flat.len(),
                });
            }
            shape
        }
        None => inferred,
    };
    assemble(target, &glue, flat, shape)
}

fn flat_and_shape(
    target: &mut ArrayObject,
    registration: &Registration,
    glue: &TensorGlue,
    flat_type: &Arc<Registration>,
    array: &HostValue,
) -> Result<(ArrayObject, Vec<usize>)> {
    match array {
        HostValue::Array(source) if source.is_type(registration.type_id()) => {
            log::trace!("[tensor] {}: copy", registration.name());
            split(glue, source)
        }
        HostValue::Array(source) if source.registration().tensor_glue().is_some() => {
            log::trace!("[tensor] {}: from {}", registration.name(), source.type_name());
            let source_glue = *source
                .registration()
                .tensor_glue()
                .ok_or_else(|| invalid(target, "not a tensor type".into()))?;
            let (source_flat, shape) = split(&source_glue, source)?;
            let flat = ArrayObject::new(flat_type, &[HostValue::Array(source_flat)])?;
            Ok((flat, shape))
        }
        HostValue::Object(object) => match config::global().ecosystems().detect(object.as_ref()) {
            Some(ecosystem) => {
                log::trace!("[tensor] {}: foreign buffer via {}", registration.name(), ecosystem.name());
                foreign::import(target, object.as_ref(), &ecosystem)?;
                let imported = split(glue, target)?;
                target.reset();
                Ok(imported)
            }
            None => flat_of(flat_type, array),
        },
        HostValue::Tuple(_) | HostValue::List(_) => {
            let shape = nested_shape(array).ok_or_else(|| Error::Ragged {
                type_name: registration.qualified_name(),
            })?;
            let mut leaves = Vec::with_capacity(numel(target, &shape)?);
            flatten(array, &mut leaves);
            log::trace!("[tensor] {}: nested sequence of shape {:?}", registration.name(), shape);
            let flat = ArrayObject::new(flat_type, &[HostValue::List(leaves)])?;
            Ok((flat, shape))
        }
        _ => flat_of(flat_type, array),
    }
}

fn flat_of(flat_type: &Arc<Registration>, array: &HostValue) -> Result<(ArrayObject, Vec<usize>)> {
    let flat = ArrayObject::new(flat_type, std::slice::from_ref(array))?;
    let len = flat.len();
    Ok((flat, vec![len]))
}

fn assemble(target: &mut ArrayObject, glue: &TensorGlue, flat: ArrayObject, shape: Vec<usize>) -> Result<()> {
    let storage = (glue.assemble)(flat.into_storage(), shape)?;
    target.replace(storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{ArrayXf, TensorXf, TensorXi};
    use crate::registry;

    fn tensor(args: &[HostValue], kwargs: &[(&str, HostValue)]) -> Result<TensorXf> {
        let reg = registry::bind::<TensorXf>();
        ArrayObject::with_kwargs(&reg, args, kwargs)?.into_value::<TensorXf>()
    }

    fn tuple(dims: &[i128]) -> HostValue {
        HostValue::Tuple(dims.iter().map(|&d| HostValue::Int(d)).collect())
    }

    fn rows() -> HostValue {
        HostValue::from(vec![
            HostValue::from(vec![1.0, 2.0, 3.0]),
            HostValue::from(vec![4.0, 5.0, 6.0]),
        ])
    }

    #[test]
    fn test_empty() {
        let t = tensor(&[], &[]).expect("empty");
        assert_eq!(t.shape(), &[0]);
        assert!(t.array().entries().is_empty());
    }

    #[test]
    fn test_nested_list_infers_shape() {
        let t = tensor(&[rows()], &[]).expect("2x3");
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.array().entries(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_ragged_rejected() {
        let ragged = HostValue::from(vec![HostValue::from(vec![1.0, 2.0]), HostValue::from(vec![3.0])]);
        let err = tensor(&[ragged], &[]).expect_err("ragged");
        assert!(matches!(err, Error::Ragged { .. }));
    }

    #[test]
    fn test_reshape_and_validate() {
        let t = tensor(&[rows(), tuple(&[3, 2])], &[]).expect("3x2");
        assert_eq!(t.shape(), &[3, 2]);

        let err = tensor(&[rows()], &[("shape", tuple(&[4]))]).expect_err("4 != 6");
        assert!(matches!(err, Error::ShapeMismatch { expected: 4, got: 6, .. }));
    }

    #[test]
    fn test_shape_only_is_zero_filled() {
        let t = tensor(&[], &[("shape", tuple(&[2, 2]))]).expect("zeros");
        assert_eq!(t.shape(), &[2, 2]);
        assert_eq!(t.array().entries(), &[0.0; 4]);
    }

    #[test]
    fn test_overflowing_shape_is_an_error() {
        let huge = tuple(&[1 << 40, 1 << 40]);
        let err = tensor(&[], &[("shape", huge.clone())]).expect_err("zeros");
        assert!(err.to_string().contains("overflows"));
        let err = tensor(&[rows(), huge], &[]).expect_err("reshape");
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_argument_errors() {
        let err = tensor(&[rows()], &[("array", rows())]).expect_err("twice");
        assert!(err.to_string().contains("given twice"));
        let err = tensor(&[], &[("dtype", HostValue::from("f"))]).expect_err("unknown");
        assert!(matches!(err, Error::InvalidArgument { .. }));
        let err = tensor(&[rows(), tuple(&[-1, 6])], &[]).expect_err("negative");
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_scalar_and_flat_inputs() {
        let t = tensor(&[HostValue::Float(2.0)], &[]).expect("scalar");
        assert_eq!(t.shape(), &[1]);

        let flat = ArrayObject::from_value(ArrayXf::from(vec![1.0, 2.0, 3.0])).expect("flat");
        let t = tensor(&[HostValue::Array(flat)], &[]).expect("flat");
        assert_eq!(t.shape(), &[3]);
    }

    #[test]
    fn test_from_other_tensor_keeps_shape() {
        let reg = registry::bind::<TensorXi>();
        let ints = ArrayObject::with_kwargs(
            &reg,
            &[HostValue::from(vec![vec![1, 2], vec![3, 4]])],
            &[],
        )
        .expect("ints");
        let t = tensor(&[HostValue::Array(ints.clone())], &[]).expect("cast");
        assert_eq!(t.shape(), &[2, 2]);
        assert_eq!(t.array().entries(), &[1.0, 2.0, 3.0, 4.0]);

        let same = tensor(&[HostValue::Array(ArrayObject::from_value(t.clone()).expect("wrap"))], &[])
            .expect("copy");
        assert_eq!(same, t);
    }
}
