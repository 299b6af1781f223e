// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Foreign buffer import integration tests
//!
//! Host targets copy the exported bytes; accelerator targets map CPU memory
//! in place and keep it alive through the backend's release callback.

mod common;

use arraybind::buffer::Device;
use arraybind::family::{Array, Array3f, ArrayXf, DynamicArray, JitArray, Llvm, TensorXf};
use arraybind::ops::dispatch;
use arraybind::{ArrayObject, Error, HostObject, HostValue};
use common::ForeignArray;
use std::sync::Arc;

fn object(array: &Arc<ForeignArray>) -> HostValue {
    HostValue::Object(Arc::clone(array) as Arc<dyn HostObject>)
}

fn entry(object: &ArrayObject, path: &[isize]) -> f64 {
    let (&last, outer) = path.split_last().expect("non-empty path");
    let mut current = object.clone();
    for &i in outer {
        current = match current.get_item(i).expect("entry") {
            HostValue::Array(inner) => inner,
            other => panic!("expected an array, got {}", other),
        };
    }
    current.get_item(last).expect("leaf").as_f64().expect("numeric")
}

#[test]
fn test_host_import_reproduces_elements() {
    let values: Vec<f32> = (0..12).map(|_| fastrand::f32()).collect();
    let numpy = Arc::new(ForeignArray::numpy_f32(&[12], &values));
    let a = ArrayObject::of::<ArrayXf>(&[object(&numpy)]).expect("import");
    assert_eq!(a.len(), 12);
    for (i, &v) in values.iter().enumerate() {
        assert_eq!(entry(&a, &[i as isize]), f64::from(v));
    }
}

#[test]
fn test_host_import_of_rows() {
    let numpy = Arc::new(ForeignArray::numpy_f32(&[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    let rows = ArrayObject::of::<DynamicArray<Array3f>>(&[object(&numpy)]).expect("import");
    assert_eq!(rows.len(), 2);
    assert_eq!(entry(&rows, &[1, 2]), 6.0);
    assert_eq!(rows.to_string(), "[[1, 2, 3],\n [4, 5, 6]]");
}

#[test]
fn test_tensor_import_keeps_shape() {
    let values: Vec<f32> = (0..24).map(|i| i as f32).collect();
    let torch = Arc::new(ForeignArray::torch_f32(&[2, 3, 4], &values, Device::Cpu));
    let t = ArrayObject::of::<TensorXf>(&[object(&torch)]).expect("import");
    let tensor = t.downcast_ref::<TensorXf>().expect("tensor");
    assert_eq!(tensor.shape(), &[2, 3, 4]);
    assert_eq!(tensor.array().entries().len(), 24);
    assert_eq!(entry(&t, &[1, 2, 3]), 23.0);
}

#[test]
fn test_import_failures() {
    let numpy = Arc::new(ForeignArray::numpy_f32(&[2, 2], &[0.0; 4]));
    let err = ArrayObject::of::<DynamicArray<Array3f>>(&[object(&numpy)]).expect_err("2 columns");
    match err {
        Error::BufferMismatch { source, pattern, .. } => {
            assert_eq!(source, "numpy.ndarray");
            assert_eq!(pattern, "shape=(*, 3), dtype=float32, order='C'");
        }
        other => panic!("unexpected {:?}", other),
    }

    let gpu = Arc::new(ForeignArray::torch_f32(&[2], &[1.0, 2.0], Device::Cuda(0)));
    let err = ArrayObject::of::<ArrayXf>(&[object(&gpu)]).expect_err("device");
    assert!(matches!(err, Error::UnsupportedDevice { device: Device::Cuda(0), .. }));

    // not a recognized ecosystem: nothing to import, nothing to broadcast
    let unknown = Arc::new(ForeignArray::new("mylib", "Buffer", common::f32_view(&[1], &[1.0])));
    let err = ArrayObject::of::<ArrayXf>(&[object(&unknown)]).expect_err("unknown");
    assert!(matches!(err, Error::Conversion { .. }));
}

#[test]
fn test_exported_extents_must_match_the_bytes() {
    // claims four elements, carries two
    let short = Arc::new(ForeignArray::new("numpy", "ndarray", common::f32_view(&[4], &[1.0, 2.0])));
    let err = ArrayObject::of::<ArrayXf>(&[object(&short)]).expect_err("short buffer");
    assert!(matches!(err, Error::ShapeMismatch { expected: 4, got: 2, .. }));

    let huge = Arc::new(ForeignArray::numpy_f32(&[1 << 40, 1 << 40], &[0.0]));
    let err = ArrayObject::of::<TensorXf>(&[object(&huge)]).expect_err("overflowing extents");
    assert!(matches!(err, Error::BufferMismatch { .. }));
}

#[test]
fn test_accelerator_import_maps_memory() {
    let backend = common::llvm();
    let numpy = Arc::new(ForeignArray::numpy_f32(&[4], &[1.0, 2.0, 3.0, 4.0]));
    let memory = Arc::clone(numpy.memory());
    let before = Arc::strong_count(&memory);

    let a = ArrayObject::of::<JitArray<f32, Llvm>>(&[object(&numpy)]).expect("import");
    let index = dispatch::index(&a).expect("index");
    assert!(backend.is_live(index));
    assert_eq!(Arc::strong_count(&memory), before + 1);
    assert_eq!(entry(&a, &[3]), 4.0);

    drop(a);
    assert!(!backend.is_live(index));
    assert_eq!(Arc::strong_count(&memory), before);
}

#[test]
fn test_accelerator_import_copies_other_devices() {
    common::llvm();
    let torch = Arc::new(ForeignArray::torch_f32(&[3], &[5.0, 6.0, 7.0], Device::Cuda(0)));
    let memory = Arc::clone(torch.memory());
    let before = Arc::strong_count(&memory);

    let a = ArrayObject::of::<JitArray<f32, Llvm>>(&[object(&torch)]).expect("import");
    assert_eq!(Arc::strong_count(&memory), before);
    assert_eq!(a.len(), 3);
    assert_eq!(entry(&a, &[0]), 5.0);
}

#[test]
fn test_accelerator_import_of_nested_type() {
    let backend = common::llvm();
    let numpy = Arc::new(ForeignArray::numpy_f32(&[3, 2], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    let memory = Arc::clone(numpy.memory());
    let before = Arc::strong_count(&memory);

    let v = ArrayObject::of::<Array<JitArray<f32, Llvm>, 3>>(&[object(&numpy)]).expect("import");
    assert_eq!(v.len(), 3);
    assert_eq!(entry(&v, &[1, 0]), 3.0);
    assert_eq!(entry(&v, &[2, 1]), 6.0);

    // components are slices; the mapped staging variable is gone
    assert_eq!(Arc::strong_count(&memory), before);
    let component = match v.get_item(0).expect("x") {
        HostValue::Array(x) => x,
        other => panic!("expected an array, got {}", other),
    };
    assert!(backend.is_live(dispatch::index(&component).expect("index")));
}
