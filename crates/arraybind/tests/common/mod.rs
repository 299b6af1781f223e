// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared fixtures: an in-memory accelerator backend and foreign array mocks.

#![allow(dead_code)]

use arraybind::backend::{self, AcceleratorBackend, AllocType, BackendKind, Launch, ReleaseCallback};
use arraybind::buffer::{BufferRequest, BufferView, Device, ForeignMemory};
use arraybind::family::Llvm;
use arraybind::ops::Op;
use arraybind::scalar::{ElementKind, ScalarValue};
use arraybind::{registry, Error, HostObject, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

// ============================================================================
// In-memory backend
// ============================================================================

struct Variable {
    kind: ElementKind,
    values: Vec<ScalarValue>,
    refs: usize,
    release: Option<ReleaseCallback>,
}

#[derive(Default)]
struct State {
    next: u32,
    vars: HashMap<u32, Variable>,
}

/// Accelerator backend evaluating eagerly on the CPU.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    fn create(&self, kind: ElementKind, values: Vec<ScalarValue>) -> u32 {
        let mut state = self.state.lock();
        state.next += 1;
        let index = state.next;
        state.vars.insert(
            index,
            Variable {
                kind,
                values,
                refs: 1,
                release: None,
            },
        );
        index
    }

    fn values(&self, index: u32) -> Result<Vec<ScalarValue>> {
        self.state
            .lock()
            .vars
            .get(&index)
            .map(|var| var.values.clone())
            .ok_or_else(|| Error::Backend(format!("unknown variable {}", index)))
    }

    /// Whether variable `index` is still alive.
    pub fn is_live(&self, index: u32) -> bool {
        self.state.lock().vars.contains_key(&index)
    }

    /// Reference count of variable `index` (0 once freed).
    pub fn refs(&self, index: u32) -> usize {
        self.state.lock().vars.get(&index).map_or(0, |var| var.refs)
    }
}

fn decode(kind: ElementKind, memory: &dyn ForeignMemory, count: usize) -> Option<Vec<ScalarValue>> {
    let bytes = memory.host_bytes()?;
    let values: Vec<ScalarValue> = bytes
        .chunks_exact(kind.bytes())
        .take(count)
        .filter_map(|raw| kind.decode(raw))
        .collect();
    (values.len() == count).then_some(values)
}

fn arithmetic(op: Op, x: &[f64]) -> Option<f64> {
    Some(match (op, x) {
        (Op::Add, [a, b]) => a + b,
        (Op::Subtract, [a, b]) => a - b,
        (Op::Multiply, [a, b]) => a * b,
        (Op::TrueDivide, [a, b]) => a / b,
        (Op::Min, [a, b]) => a.min(*b),
        (Op::Max, [a, b]) => a.max(*b),
        (Op::Fma, [a, b, c]) => a.mul_add(*b, *c),
        (Op::Negative, [a]) => -a,
        (Op::Absolute, [a]) => a.abs(),
        (Op::Sqrt, [a]) => a.sqrt(),
        (Op::Floor, [a]) => a.floor(),
        (Op::Exp, [a]) => a.exp(),
        _ => return None,
    })
}

impl AcceleratorBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Llvm
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn map(&self, kind: ElementKind, memory: &dyn ForeignMemory, count: usize) -> u32 {
        match decode(kind, memory, count) {
            Some(values) => self.create(kind, values),
            None => 0,
        }
    }

    fn copy(&self, _alloc: AllocType, kind: ElementKind, memory: &dyn ForeignMemory, count: usize) -> Result<u32> {
        let values = decode(kind, memory, count)
            .ok_or_else(|| Error::Backend("memory is not host-addressable".into()))?;
        Ok(self.create(kind, values))
    }

    fn set_release_callback(&self, index: u32, callback: ReleaseCallback) {
        if let Some(var) = self.state.lock().vars.get_mut(&index) {
            var.release = Some(callback);
        }
    }

    fn inc_ref(&self, index: u32) {
        if let Some(var) = self.state.lock().vars.get_mut(&index) {
            var.refs += 1;
        }
    }

    fn dec_ref(&self, index: u32) {
        let callback = {
            let mut state = self.state.lock();
            let Some(var) = state.vars.get_mut(&index) else {
                return;
            };
            var.refs -= 1;
            if var.refs > 0 {
                return;
            }
            state.vars.remove(&index).and_then(|var| var.release)
        };
        // outside the lock: the callback may drop arrays of this backend
        if let Some(callback) = callback {
            callback();
        }
    }

    fn len(&self, index: u32) -> usize {
        self.state.lock().vars.get(&index).map_or(0, |var| var.values.len())
    }

    fn read(&self, index: u32, offset: usize) -> Result<ScalarValue> {
        let values = self.values(index)?;
        let at = if values.len() == 1 { 0 } else { offset };
        values
            .get(at)
            .copied()
            .ok_or_else(|| Error::Backend(format!("read {} of variable {} out of range", offset, index)))
    }

    fn write(&self, index: u32, offset: usize, value: ScalarValue) -> Result<()> {
        let mut state = self.state.lock();
        let var = state
            .vars
            .get_mut(&index)
            .ok_or_else(|| Error::Backend(format!("unknown variable {}", index)))?;
        let kind = var.kind;
        let slot = var
            .values
            .get_mut(offset)
            .ok_or_else(|| Error::Backend(format!("write {} of variable {} out of range", offset, index)))?;
        *slot = value.cast(kind);
        Ok(())
    }

    fn full(&self, kind: ElementKind, value: ScalarValue, len: usize) -> Result<u32> {
        Ok(self.create(kind, vec![value.cast(kind); len]))
    }

    fn arange(&self, kind: ElementKind, len: usize) -> Result<u32> {
        let values = (0..len).map(|i| ScalarValue::U64(i as u64).cast(kind)).collect();
        Ok(self.create(kind, values))
    }

    fn slice(&self, index: u32, offset: usize, len: usize) -> Result<u32> {
        let kind = self
            .state
            .lock()
            .vars
            .get(&index)
            .map(|var| var.kind)
            .ok_or_else(|| Error::Backend(format!("unknown variable {}", index)))?;
        let values = self.values(index)?;
        let piece = values
            .get(offset..offset + len)
            .ok_or_else(|| Error::Backend(format!("slice {}..{} out of range", offset, offset + len)))?;
        Ok(self.create(kind, piece.to_vec()))
    }

    fn launch(&self, what: Launch, kind: ElementKind, args: &[u32]) -> Result<Vec<u32>> {
        let inputs = args
            .iter()
            .map(|&index| self.values(index))
            .collect::<Result<Vec<_>>>()?;
        let len = inputs.iter().map(Vec::len).max().unwrap_or(0);
        if inputs.iter().any(|values| values.len() != len && values.len() != 1) {
            return Err(Error::Backend(format!("{:?}: operand sizes differ", what)));
        }
        let at = |k: usize, i: usize| inputs[k][if inputs[k].len() == 1 { 0 } else { i }];
        let truthy = |k: usize, i: usize| at(k, i).to_f64() != 0.0;

        let results: Vec<(ElementKind, Vec<ScalarValue>)> = match what {
            Launch::Cast => vec![(kind, (0..len).map(|i| at(0, i).cast(kind)).collect())],
            Launch::Compare(cmp) => vec![(
                ElementKind::Bool,
                (0..len)
                    .map(|i| ScalarValue::Bool(cmp.eval(&at(0, i).to_f64(), &at(1, i).to_f64())))
                    .collect(),
            )],
            Launch::Op(Op::All) => vec![(kind, vec![ScalarValue::Bool((0..len).all(|i| truthy(0, i)))])],
            Launch::Op(Op::Any) => vec![(kind, vec![ScalarValue::Bool((0..len).any(|i| truthy(0, i)))])],
            Launch::Op(Op::Select) => vec![(
                kind,
                (0..len)
                    .map(|i| if truthy(0, i) { at(1, i) } else { at(2, i) })
                    .collect(),
            )],
            Launch::Op(Op::Sincos) => {
                let x: Vec<f64> = (0..len).map(|i| at(0, i).to_f64()).collect();
                vec![
                    (kind, x.iter().map(|v| ScalarValue::F64(v.sin()).cast(kind)).collect()),
                    (kind, x.iter().map(|v| ScalarValue::F64(v.cos()).cast(kind)).collect()),
                ]
            }
            Launch::Op(op) => {
                let mut values = Vec::with_capacity(len);
                for i in 0..len {
                    let operands: Vec<f64> = (0..inputs.len()).map(|k| at(k, i).to_f64()).collect();
                    let result = arithmetic(op, &operands)
                        .ok_or_else(|| Error::Backend(format!("{} is not implemented", op)))?;
                    values.push(ScalarValue::F64(result).cast(kind));
                }
                vec![(kind, values)]
            }
        };
        Ok(results
            .into_iter()
            .map(|(kind, values)| self.create(kind, values))
            .collect())
    }
}

static LLVM: OnceLock<Arc<MemoryBackend>> = OnceLock::new();

/// Install the in-memory backend as the LLVM backend and bind its family.
pub fn llvm() -> Arc<MemoryBackend> {
    Arc::clone(LLVM.get_or_init(|| {
        let _ = env_logger::builder().is_test(true).try_init();
        let backend = Arc::new(MemoryBackend::default());
        backend::install(Arc::clone(&backend) as Arc<dyn AcceleratorBackend>);
        registry::bind_backend::<Llvm>();
        backend
    }))
}

// ============================================================================
// Foreign arrays
// ============================================================================

/// A foreign array exporting one fixed buffer.
#[derive(Debug)]
pub struct ForeignArray {
    module: String,
    type_name: String,
    view: BufferView,
}

impl ForeignArray {
    pub fn new(module: &str, type_name: &str, view: BufferView) -> Self {
        Self {
            module: module.to_string(),
            type_name: type_name.to_string(),
            view,
        }
    }

    /// `numpy.ndarray` of `float32`.
    pub fn numpy_f32(shape: &[usize], values: &[f32]) -> Self {
        Self::new("numpy", "ndarray", f32_view(shape, values))
    }

    /// `torch.Tensor` of `float32` on `device`.
    pub fn torch_f32(shape: &[usize], values: &[f32], device: Device) -> Self {
        let mut view = f32_view(shape, values);
        view.device = device;
        Self::new("torch", "Tensor", view)
    }

    /// Handle on the exported memory.
    pub fn memory(&self) -> &Arc<dyn ForeignMemory> {
        &self.view.memory
    }
}

impl HostObject for ForeignArray {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn module(&self) -> &str {
        &self.module
    }

    fn export_buffer(&self, _request: &BufferRequest) -> Option<BufferView> {
        Some(self.view.clone())
    }
}

pub fn f32_view(shape: &[usize], values: &[f32]) -> BufferView {
    let bytes = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    BufferView::host(ElementKind::F32, shape.to_vec(), bytes)
}
