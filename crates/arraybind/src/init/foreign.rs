// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Import from foreign array buffers.
//!
//! The target's descriptor determines the [`BufferRequest`]. The exported
//! view is staged into the target's flat one-dimensional type, mapping the
//! foreign memory without a copy when the accelerator sits on the same
//! device, and is then reshaped into the target in C order.

use crate::backend::{self, AllocType};
use crate::buffer::{element_count, BufferRequest, BufferView, Device};
use crate::config::DYNAMIC;
use crate::ecosystem::Ecosystem;
use crate::error::{Error, Result};
use crate::family::Staging;
use crate::host::{HostObject, HostValue};
use crate::object::{ArrayObject, Storage};
use crate::ops::dispatch;
use crate::registry::Registration;
use std::sync::Arc;

/// Replace the contents of `target` with the buffer `object` exports
/// through `ecosystem`. Returns the shape of the imported buffer.
pub fn import(target: &mut ArrayObject, object: &dyn HostObject, ecosystem: &Ecosystem) -> Result<Vec<usize>> {
    let registration = Arc::clone(target.registration());
    let request = BufferRequest::for_descriptor(registration.descriptor());
    let mismatch = || Error::BufferMismatch {
        type_name: registration.qualified_name(),
        source: format!("{}.{}", object.module(), object.type_name()),
        pattern: request.pattern(),
    };
    let view = ecosystem.probe(object, &request).ok_or_else(mismatch)?;
    // extents whose product overflows describe no buffer at all
    let count = view.count().ok_or_else(mismatch)?;
    log::trace!(
        "[foreign] {}: {:?} {} buffer on {}",
        registration.name(),
        view.shape,
        view.kind,
        view.device
    );

    let flat_type = registration.flat_type()?;
    let flat = ArrayObject::from_storage(&flat_type, stage(&registration, &view, count)?)?;
    let storage = match registration.tensor_glue() {
        Some(glue) => (glue.assemble)(flat.into_storage(), view.shape.clone())?,
        None => reshape(flat, &registration, &view.shape)?.into_storage(),
    };
    target.replace(storage)?;
    Ok(view.shape)
}

fn unsupported_device(registration: &Registration, device: Device) -> Error {
    Error::UnsupportedDevice {
        type_name: registration.qualified_name(),
        device,
    }
}

/// Build the flat staging array holding every element of `view`.
fn stage(registration: &Registration, view: &BufferView, count: usize) -> Result<Storage> {
    let kind = registration.descriptor().kind();

    let Some(backend_kind) = registration.descriptor().backend() else {
        if view.device != Device::Cpu {
            return Err(unsupported_device(registration, view.device));
        }
        let bytes = view
            .memory
            .host_bytes()
            .ok_or_else(|| unsupported_device(registration, view.device))?;
        let bytes = count
            .checked_mul(kind.bytes())
            .and_then(|size| bytes.get(..size))
            .ok_or_else(|| Error::ShapeMismatch {
                type_name: registration.qualified_name(),
                expected: count,
                got: bytes.len() / kind.bytes(),
            })?;
        return registration.stage_flat(Staging::Bytes { bytes, count });
    };

    let backend = backend::get(backend_kind)?;
    let mut index = 0;
    if view.device == backend.device() {
        index = backend.map(kind, view.memory.as_ref(), count);
        if index != 0 {
            // the mapped variable keeps the foreign memory alive
            let memory = Arc::clone(&view.memory);
            backend.set_release_callback(index, Box::new(move || drop(memory)));
            log::trace!("[foreign] mapped {} elements as variable {}", count, index);
        }
    }
    if index == 0 {
        let alloc = match view.device {
            Device::Cpu => AllocType::Host,
            Device::Cuda(_) => AllocType::Device,
            other => return Err(unsupported_device(registration, other)),
        };
        index = backend.copy(alloc, kind, view.memory.as_ref(), count)?;
        log::trace!("[foreign] copied {} elements from {}", count, view.device);
    }
    registration.stage_flat(Staging::Handle(index))
}

/// Reshape a flat array into an instance of `target`, inferring the one
/// run-time sized axis (if any) from the element count.
pub fn unravel(flat: ArrayObject, target: &Arc<Registration>) -> Result<ArrayObject> {
    let count = flat.len();
    let axes = target.descriptor().shape();
    let fixed: usize = axes
        .iter()
        .filter(|&&extent| extent != DYNAMIC)
        .map(|&extent| extent as usize)
        .product();
    let dynamic = axes.iter().filter(|&&extent| extent == DYNAMIC).count();

    let inferred = match dynamic {
        0 if fixed == count => None,
        1 if fixed == 0 && count == 0 => Some(0),
        1 if fixed > 0 && count % fixed == 0 => Some(count / fixed),
        0 | 1 => {
            return Err(Error::ShapeMismatch {
                type_name: target.qualified_name(),
                expected: fixed,
                got: count,
            })
        }
        _ => {
            return Err(Error::InvalidArgument {
                type_name: target.qualified_name(),
                message: "cannot infer more than one run-time sized axis".into(),
            })
        }
    };
    let shape: Vec<usize> = axes
        .iter()
        .map(|&extent| {
            if extent == DYNAMIC {
                inferred.unwrap_or(0)
            } else {
                extent as usize
            }
        })
        .collect();
    reshape(flat, target, &shape)
}

/// C-order reshape of `flat` into `target` with extents `shape`.
fn reshape(flat: ArrayObject, target: &Arc<Registration>, shape: &[usize]) -> Result<ArrayObject> {
    if flat.is_type(target.type_id()) {
        return Ok(flat);
    }

    let outer = shape.first().copied().unwrap_or(0);
    let mut out = ArrayObject::zeroed(target);
    out.resize(outer)?;
    match target.value_type() {
        None => {
            for i in 0..outer as isize {
                out.set_item(i, &flat.get_item(i)?)?;
            }
        }
        Some(value_type) => {
            let inner = element_count(&shape[1..]).ok_or_else(|| Error::InvalidArgument {
                type_name: target.qualified_name(),
                message: format!("extents {:?} overflow", shape),
            })?;
            for i in 0..outer {
                let piece = slice(&flat, i * inner, inner)?;
                let entry = reshape(piece, &value_type, &shape[1..])?;
                out.set_item(i as isize, &HostValue::Array(entry))?;
            }
        }
    }
    Ok(out)
}

/// `len` flat entries starting at `offset`.
fn slice(flat: &ArrayObject, offset: usize, len: usize) -> Result<ArrayObject> {
    let registration = flat.registration();
    if let Some(kind) = registration.descriptor().backend() {
        let index = backend::get(kind)?.slice(dispatch::index(flat)?, offset, len)?;
        return ArrayObject::from_storage(registration, registration.stage_flat(Staging::Handle(index))?);
    }
    let mut out = ArrayObject::zeroed(registration);
    out.resize(len)?;
    for k in 0..len {
        out.set_item(k as isize, &flat.get_item((offset + k) as isize)?)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{Array3f, ArrayXf, DynamicArray, TensorXf};
    use crate::registry;
    use crate::scalar::ElementKind;

    #[derive(Debug)]
    struct Exporter(BufferView);

    impl HostObject for Exporter {
        fn type_name(&self) -> &str {
            "ndarray"
        }

        fn module(&self) -> &str {
            "numpy"
        }

        fn export_buffer(&self, _request: &BufferRequest) -> Option<BufferView> {
            Some(self.0.clone())
        }
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    fn numpy() -> Ecosystem {
        Ecosystem::by_module("numpy", "ndarray", "numpy")
    }

    #[test]
    fn test_import_rows() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let exporter = Exporter(BufferView::host(ElementKind::F32, vec![2, 3], f32_bytes(&values)));
        let reg = registry::bind::<DynamicArray<Array3f>>();
        let mut target = ArrayObject::zeroed(&reg);
        let shape = import(&mut target, &exporter, &numpy()).expect("import");
        assert_eq!(shape, vec![2, 3]);
        assert_eq!(target.len(), 2);
        let row = target.get_item(1).expect("row");
        assert_eq!(row.as_array().expect("row").get_item(0).expect("leaf"), HostValue::Float(4.0));
    }

    #[test]
    fn test_mismatch_spells_pattern() {
        let exporter = Exporter(BufferView::host(ElementKind::F32, vec![2, 2], f32_bytes(&[0.0; 4])));
        let reg = registry::bind::<DynamicArray<Array3f>>();
        let mut target = ArrayObject::zeroed(&reg);
        let err = import(&mut target, &exporter, &numpy()).expect_err("2 columns");
        match err {
            Error::BufferMismatch { source, pattern, .. } => {
                assert_eq!(source, "numpy.ndarray");
                assert_eq!(pattern, "shape=(*, 3), dtype=float32, order='C'");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_host_target_needs_cpu_source() {
        let mut view = BufferView::host(ElementKind::F32, vec![1], f32_bytes(&[1.0]));
        view.device = Device::Cuda(0);
        let reg = registry::bind::<ArrayXf>();
        let mut target = ArrayObject::zeroed(&reg);
        let err = import(&mut target, &Exporter(view), &numpy()).expect_err("cuda source");
        assert!(matches!(err, Error::UnsupportedDevice { device: Device::Cuda(0), .. }));
    }

    #[test]
    fn test_short_host_buffer_is_a_shape_error() {
        let exporter = Exporter(BufferView::host(ElementKind::F32, vec![4], f32_bytes(&[1.0, 2.0])));
        let reg = registry::bind::<ArrayXf>();
        let mut target = ArrayObject::zeroed(&reg);
        let err = import(&mut target, &exporter, &numpy()).expect_err("8 of 16 bytes");
        assert!(matches!(err, Error::ShapeMismatch { expected: 4, got: 2, .. }));
    }

    #[test]
    fn test_overflowing_extents_are_rejected() {
        let exporter = Exporter(BufferView::host(ElementKind::F32, vec![1 << 40, 1 << 40], vec![0; 4]));
        let reg = registry::bind::<TensorXf>();
        let mut target = ArrayObject::zeroed(&reg);
        let err = import(&mut target, &exporter, &numpy()).expect_err("extents overflow");
        assert!(matches!(err, Error::BufferMismatch { .. }));
    }

    #[test]
    fn test_tensor_records_full_shape() {
        let exporter = Exporter(BufferView::host(ElementKind::F32, vec![2, 1, 2], f32_bytes(&[1.0, 2.0, 3.0, 4.0])));
        let reg = registry::bind::<TensorXf>();
        let mut target = ArrayObject::zeroed(&reg);
        import(&mut target, &exporter, &numpy()).expect("import");
        let tensor = target.downcast_ref::<TensorXf>().expect("tensor");
        assert_eq!(tensor.shape(), &[2, 1, 2]);
        assert_eq!(tensor.array().entries(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_unravel_infers_dynamic_axis() {
        let flat = ArrayObject::from_value(ArrayXf::from(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).expect("flat");
        let reg = registry::bind::<DynamicArray<Array3f>>();
        let nested = unravel(flat.clone(), &reg).expect("unravel");
        assert_eq!(nested.len(), 2);

        let short = ArrayObject::from_value(ArrayXf::from(vec![1.0, 2.0])).expect("flat");
        assert!(matches!(unravel(short, &reg), Err(Error::ShapeMismatch { .. })));
        assert!(unravel(flat, &registry::bind::<Array3f>()).is_err());
    }
}
