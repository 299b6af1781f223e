// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry of foreign array ecosystems.
//!
//! The universal constructor only hands an object to the foreign buffer
//! importer when some registered [`Ecosystem`] recognizes it. Ecosystems are
//! queried in order; the defaults are `numpy`, `torch`, `jax` and
//! `tensorflow`, and more can be added at either end at run time.
//!
//! # Example
//!
//! ```rust
//! use arraybind::ecosystem::{Ecosystem, EcosystemRegistry};
//!
//! let registry = EcosystemRegistry::new();
//! registry.register(Ecosystem::by_module("cupy", "ndarray", "cupy"), false);
//! assert_eq!(registry.names().last().map(String::as_str), Some("cupy"));
//! ```

use crate::buffer::{BufferRequest, BufferView};
use crate::host::HostObject;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;

/// Recognizes objects of one ecosystem and exports their buffers.
pub struct Ecosystem {
    name: String,
    matches: Box<dyn Fn(&dyn HostObject) -> bool + Send + Sync>,
    probe: fn(&dyn HostObject, &BufferRequest) -> Option<BufferView>,
}

impl Ecosystem {
    pub fn new(
        name: impl Into<String>,
        matches: impl Fn(&dyn HostObject) -> bool + Send + Sync + 'static,
        probe: fn(&dyn HostObject, &BufferRequest) -> Option<BufferView>,
    ) -> Self {
        Self {
            name: name.into(),
            matches: Box::new(matches),
            probe,
        }
    }

    /// Objects whose type is exactly `type_name` in exactly `module`.
    pub fn by_module(name: &str, type_name: &str, module: &str) -> Self {
        let (type_name, module) = (type_name.to_string(), module.to_string());
        Self::new(
            name,
            move |object| object.type_name() == type_name && object.module() == module,
            export,
        )
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn matches(&self, object: &dyn HostObject) -> bool {
        (self.matches)(object)
    }

    /// A view of `object` satisfying `request`.
    pub fn probe(&self, object: &dyn HostObject, request: &BufferRequest) -> Option<BufferView> {
        (self.probe)(object, request)
    }
}

impl fmt::Debug for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ecosystem")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Default probe: ask the object to export and keep the view only if it
/// satisfies the request.
pub fn export(object: &dyn HostObject, request: &BufferRequest) -> Option<BufferView> {
    object
        .export_buffer(request)
        .filter(|view| request.accepts(view))
}

fn defaults() -> Vec<Arc<Ecosystem>> {
    vec![
        Arc::new(Ecosystem::by_module("numpy", "ndarray", "numpy")),
        Arc::new(Ecosystem::by_module("torch", "Tensor", "torch")),
        Arc::new(Ecosystem::new(
            "jax",
            |object| {
                object.module().starts_with("jax")
                    && matches!(object.type_name(), "DeviceArray" | "Array" | "ArrayImpl")
            },
            export,
        )),
        Arc::new(Ecosystem::new(
            "tensorflow",
            |object| {
                object.module().starts_with("tensorflow") && object.type_name().contains("Tensor")
            },
            export,
        )),
    ]
}

/// Ordered, lock-free registry of ecosystems.
pub struct EcosystemRegistry {
    entries: ArcSwap<Vec<Arc<Ecosystem>>>,
}

impl EcosystemRegistry {
    /// Registry holding the default ecosystems.
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(defaults()),
        }
    }

    pub fn empty() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// First ecosystem recognizing `object`.
    pub fn detect(&self, object: &dyn HostObject) -> Option<Arc<Ecosystem>> {
        self.entries
            .load()
            .iter()
            .find(|ecosystem| ecosystem.matches(object))
            .cloned()
    }

    /// Add `ecosystem` at the front (`prepend`) or the back of the order.
    /// An ecosystem with the same name is replaced.
    pub fn register(&self, ecosystem: Ecosystem, prepend: bool) {
        let ecosystem = Arc::new(ecosystem);
        self.entries.rcu(|current| {
            let mut next: Vec<Arc<Ecosystem>> = current
                .iter()
                .filter(|e| e.name() != ecosystem.name())
                .cloned()
                .collect();
            if next.len() != current.len() {
                log::warn!("[ecosystem] replacing ecosystem '{}'", ecosystem.name());
            }
            if prepend {
                next.insert(0, Arc::clone(&ecosystem));
            } else {
                next.push(Arc::clone(&ecosystem));
            }
            next
        });
        log::debug!("[ecosystem] registered '{}'", ecosystem.name());
    }

    /// Remove the ecosystem called `name`; returns whether it was present.
    pub fn remove(&self, name: &str) -> bool {
        let previous = self.entries.rcu(|current| {
            current
                .iter()
                .filter(|e| e.name() != name)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|e| e.name() == name)
    }

    /// Names in query order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .load()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }
}

impl Default for EcosystemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EcosystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
