// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The universal constructor.
//!
//! [`fill`] populates a target instance from positional arguments, trying in
//! order: zero (no arguments), same-type copy, cast from an array of the
//! same layout, tuple/list import, foreign-buffer import, sequence import,
//! iteration, and finally broadcasting a single value into every entry.
//! Whatever fails, the target is left zeroed.
//!
//! # Example
//!
//! ```rust
//! use arraybind::family::Array3f;
//! use arraybind::{ArrayObject, HostValue};
//!
//! let a = ArrayObject::of::<Array3f>(&[1.into(), 2.into(), 3.into()]).unwrap();
//! assert_eq!(a.get_item(1).unwrap(), HostValue::Float(2.0));
//!
//! let b = ArrayObject::of::<Array3f>(&[HostValue::Float(0.5)]).unwrap();
//! assert_eq!(b.to_string(), "[0.5, 0.5, 0.5]");
//! ```

pub mod foreign;
pub mod tensor;

use crate::config;
use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::object::ArrayObject;
use crate::ops::{dispatch, Kernel, Op, OpEntry};
use crate::registry::Registration;
use std::sync::Arc;

/// Fill `target` from `args`. Keyword arguments are always rejected.
pub fn fill(target: &mut ArrayObject, args: &[HostValue], kwargs: &[(&str, HostValue)]) -> Result<()> {
    if !kwargs.is_empty() {
        target.reset();
        return Err(Error::KeywordArguments {
            type_name: target.type_name(),
        });
    }

    let result = match args {
        [] => {
            target.reset();
            Ok(())
        }
        [arg] => fill_one(target, arg),
        _ => {
            log::trace!("[init] {}: {} positional entries", target.type_name(), args.len());
            fill_items(target, args.len(), |i| Ok(args[i].clone()))
        }
    };
    if result.is_err() {
        target.reset();
    }
    result
}

fn fill_one(target: &mut ArrayObject, arg: &HostValue) -> Result<()> {
    let registration = Arc::clone(target.registration());
    let mut try_sequence = true;

    if let HostValue::Array(source) = arg {
        if source.is_type(registration.type_id()) {
            log::trace!("[init] {}: copy", registration.name());
            return target.replace(source.try_clone()?.into_storage());
        }

        let source_desc = source.descriptor();
        if registration.descriptor().cast_compatible(source_desc)
            && registration.ops().supports(Op::Cast)
        {
            log::trace!("[init] {}: cast from {}", registration.name(), source.type_name());
            let converted = dispatch::cast(source, &registration).map_err(|e| Error::Cast {
                type_name: registration.qualified_name(),
                cause: e.to_string(),
            })?;
            return target.replace(converted.into_storage());
        }

        // element-wise import of large dynamic arrays is opt-in
        if source_desc.depth() == 1
            && source_desc.is_outer_dynamic()
            && !config::global().allow_dynamic_sequence_import()
        {
            try_sequence = false;
        }
        if registration
            .value_type()
            .is_some_and(|value| source.is_type(value.type_id()))
        {
            try_sequence = false;
        }
    }

    target.reset();

    if let Some(items) = arg.as_items() {
        log::trace!("[init] {}: sequence of {}", registration.name(), items.len());
        return fill_items(target, items.len(), |i| Ok(items[i].clone()));
    }

    if let HostValue::Object(object) = arg {
        if registration.descriptor().is_dynamic() {
            if let Some(ecosystem) = config::global().ecosystems().detect(object.as_ref()) {
                log::trace!("[init] {}: foreign buffer via {}", registration.name(), ecosystem.name());
                return foreign::import(target, object.as_ref(), &ecosystem).map(|_| ());
            }
        }
        if try_sequence {
            if let Some(sequence) = object.sequence() {
                log::trace!("[init] {}: sequence protocol", registration.name());
                return fill_items(target, sequence.len(), |i| sequence.item(i));
            }
            if let Some(items) = object.iterate() {
                log::trace!("[init] {}: iteration protocol", registration.name());
                return fill_one(target, &HostValue::List(items?));
            }
        }
    }

    if try_sequence {
        if let HostValue::Array(source) = arg {
            log::trace!("[init] {}: sequence from {}", registration.name(), source.type_name());
            return fill_items(target, source.len(), |i| source.get_item(i as isize));
        }
    }

    broadcast(target, &registration, arg)
}

/// Resize `target` to `len` (or reject the length) and write every entry.
fn fill_items(
    target: &mut ArrayObject,
    len: usize,
    mut item: impl FnMut(usize) -> Result<HostValue>,
) -> Result<()> {
    target.reset();
    target.resize(len)?;
    for i in 0..len {
        let value = item(i)?;
        target.set_item(i as isize, &value)?;
    }
    Ok(())
}

/// Convert `arg` with the entry type's own constructor.
fn convert_entry(registration: &Registration, arg: &HostValue) -> Result<HostValue> {
    let failed = || Error::Conversion {
        type_name: registration.qualified_name(),
        source: arg.type_name(),
    };
    match registration.value_type() {
        Some(value_type) => {
            if let HostValue::Array(array) = arg {
                if array.is_type(value_type.type_id()) {
                    return Ok(arg.clone());
                }
            }
            ArrayObject::new(&value_type, std::slice::from_ref(arg))
                .map(HostValue::Array)
                .map_err(|e| {
                    log::trace!("[init] {}: entry conversion failed: {}", registration.name(), e);
                    failed()
                })
        }
        None => registration
            .descriptor()
            .kind()
            .construct(arg)
            .map(|scalar| scalar.to_host())
            .ok_or_else(failed),
    }
}

fn broadcast(target: &mut ArrayObject, registration: &Registration, arg: &HostValue) -> Result<()> {
    let value = convert_entry(registration, arg)?;
    log::trace!("[init] {}: broadcast {}", registration.name(), value);
    match registration.size() {
        Some(0) => Err(Error::EmptyBroadcast {
            type_name: registration.qualified_name(),
        }),
        Some(len) => {
            for i in 0..len {
                target.set_item(i as isize, &value)?;
            }
            Ok(())
        }
        None => {
            if let OpEntry::Direct(Kernel::Full(full)) = registration.ops().get(Op::Full) {
                return target.replace(full(&value, 1)?);
            }
            target.resize(1)?;
            target.set_item(0, &value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{Array, Array33f, Array3f, Array3f64, Array3i, ArrayXf, Element, Matrix3f};
    use crate::host::{HostObject, SequenceProtocol};
    use crate::registry;

    fn make<T: crate::family::ArrayType>(args: &[HostValue]) -> Result<ArrayObject> {
        ArrayObject::of::<T>(args)
    }

    fn floats(object: &ArrayObject) -> Vec<f64> {
        (0..object.len() as isize)
            .map(|i| object.get_item(i).expect("read").as_f64().expect("number"))
            .collect()
    }

    #[test]
    fn test_zero_arguments() {
        let a = make::<Array3f>(&[]).expect("zero");
        assert_eq!(floats(&a), vec![0.0; 3]);
        assert!(make::<ArrayXf>(&[]).expect("empty").is_empty());
    }

    #[test]
    fn test_keywords_rejected() {
        let reg = registry::bind::<Array3f>();
        let err = ArrayObject::with_kwargs(&reg, &[], &[("x", HostValue::Int(1))])
            .expect_err("keywords");
        assert_eq!(
            err,
            Error::KeywordArguments {
                type_name: "arraybind.scalar.Array3f".into()
            }
        );
    }

    #[test]
    fn test_positional_arguments() {
        let a = make::<Array3f>(&[1.into(), 2.5.into(), true.into()]).expect("three");
        assert_eq!(floats(&a), vec![1.0, 2.5, 1.0]);

        let err = make::<Array3f>(&[1.into(), 2.into()]).expect_err("two");
        assert!(matches!(err, Error::ShapeMismatch { expected: 3, got: 2, .. }));
    }

    #[test]
    fn test_list_into_dynamic() {
        let a = make::<ArrayXf>(&[HostValue::from(vec![1.0, 2.0, 3.0, 4.0, 5.0])]).expect("list");
        assert_eq!(floats(&a), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_broadcast() {
        let a = make::<Array3i>(&[HostValue::Int(7)]).expect("fixed");
        assert_eq!(floats(&a), vec![7.0; 3]);

        let x = make::<ArrayXf>(&[HostValue::Float(2.0)]).expect("dynamic");
        assert_eq!(floats(&x), vec![2.0]);

        let s = make::<Array3f>(&[HostValue::from("1.5")]).expect("numeric string");
        assert_eq!(floats(&s), vec![1.5; 3]);

        let err = make::<Array<f32, 0>>(&[HostValue::Float(1.0)]).expect_err("size zero");
        assert!(matches!(err, Error::EmptyBroadcast { .. }));

        let err = make::<Array3f>(&[HostValue::None]).expect_err("none");
        assert_eq!(
            err,
            Error::Conversion {
                type_name: "arraybind.scalar.Array3f".into(),
                source: "NoneType".into()
            }
        );
    }

    #[test]
    fn test_nested_broadcast_of_row() {
        let row = make::<Array3f>(&[1.into(), 2.into(), 3.into()]).expect("row");
        let m = make::<Matrix3f>(&[HostValue::Array(row.clone())]).expect("matrix");
        for i in 0..3 {
            assert_eq!(m.get_item(i).expect("row"), HostValue::Array(row.clone()));
        }

        let n = make::<Array33f>(&[HostValue::Float(4.0)]).expect("scalar into nested");
        let inner = n.get_item(2).expect("row");
        assert_eq!(floats(inner.as_array().expect("array")), vec![4.0; 3]);
    }

    #[test]
    fn test_copy_and_cast() {
        let a = make::<Array3f>(&[1.9.into(), (-1.9).into(), 0.into()]).expect("source");
        let copy = make::<Array3f>(&[HostValue::Array(a.clone())]).expect("copy");
        assert_eq!(copy, a);

        let cast = make::<Array3i>(&[HostValue::Array(a.clone())]).expect("cast");
        assert_eq!(floats(&cast), vec![1.0, -1.0, 0.0]);
    }

    #[test]
    fn test_incompatible_layout_imports_entries() {
        let a = make::<Array3i>(&[1.into(), 2.into(), 3.into()]).expect("ints");
        let wide = make::<Array3f64>(&[HostValue::Array(a.clone())]).expect("sequence import");
        assert_eq!(floats(&wide), vec![1.0, 2.0, 3.0]);

        let f = make::<Array3f64>(&[0.5.into(), 1.into(), 2.into()]).expect("floats");
        let err = make::<Array3i>(&[HostValue::Array(f)]).expect_err("float into int entry");
        assert!(matches!(err, Error::Conversion { .. }));
    }

    #[test]
    fn test_dynamic_source_does_not_import_entries() {
        let x = make::<ArrayXf>(&[HostValue::from(vec![1.0, 2.0, 3.0])]).expect("dynamic");
        let err = make::<Array3f>(&[HostValue::Array(x)]).expect_err("no sequence import");
        assert!(matches!(err, Error::Conversion { .. }));
    }

    #[derive(Debug)]
    struct Range(usize);

    impl SequenceProtocol for Range {
        fn len(&self) -> usize {
            self.0
        }

        fn item(&self, index: usize) -> Result<HostValue> {
            Ok(HostValue::Int(index as i128))
        }
    }

    impl HostObject for Range {
        fn type_name(&self) -> &str {
            "range"
        }

        fn sequence(&self) -> Option<&dyn SequenceProtocol> {
            Some(self)
        }
    }

    #[derive(Debug)]
    struct Generator(Vec<f64>);

    impl HostObject for Generator {
        fn type_name(&self) -> &str {
            "generator"
        }

        fn iterate(&self) -> Option<Result<Vec<HostValue>>> {
            Some(Ok(self.0.iter().map(|&v| HostValue::Float(v)).collect()))
        }
    }

    #[test]
    fn test_sequence_and_iteration_protocols() {
        let r = make::<ArrayXf>(&[HostValue::Object(Arc::new(Range(4)))]).expect("range");
        assert_eq!(floats(&r), vec![0.0, 1.0, 2.0, 3.0]);

        let g = make::<Array3f>(&[HostValue::Object(Arc::new(Generator(vec![3.0, 2.0, 1.0])))])
            .expect("generator");
        assert_eq!(floats(&g), vec![3.0, 2.0, 1.0]);

        let err = make::<Array3f>(&[HostValue::Object(Arc::new(Range(2)))]).expect_err("short");
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_failure_leaves_target_zeroed() {
        let reg = registry::bind::<ArrayXf>();
        let mut target = ArrayObject::zeroed(&reg);
        let args = [HostValue::from(vec![HostValue::Float(1.0), HostValue::from("x")])];
        assert!(fill(&mut target, &args, &[]).is_err());
        assert!(target.is_empty());
        assert_eq!(target.downcast_ref::<ArrayXf>(), Some(&<ArrayXf as Element>::zeroed()));
    }
}
