// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global configuration.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time constants (descriptor layout, printer text)
//! - **Level 2 (Dynamic)**: [`RuntimeConfig`] for settings that may change while
//!   the process runs (foreign-array ecosystems, printer precision, import policy)
//!
//! Reads never lock: the ecosystem list sits behind an `ArcSwap`, scalars are atomics.

use crate::ecosystem::EcosystemRegistry;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

// =======================================================================
// Descriptor Layout
// =======================================================================

/// Axis extent marking a run-time sized axis.
pub const DYNAMIC: u8 = 0xFF;

/// Largest nesting depth the descriptor can encode (3-bit field).
pub const MAX_DEPTH: u8 = 7;

/// Number of axis extents stored in a descriptor.
pub const MAX_AXES: usize = 4;

/// Size of an encoded descriptor in bytes.
pub const DESCRIPTOR_SIZE: usize = 8;

// =======================================================================
// Printer
// =======================================================================

/// Text printed for arrays whose nested lengths disagree.
pub const RAGGED_PLACEHOLDER: &str = "[ragged array]";

/// Text printed when reading an entry fails while rendering.
pub const UNREADABLE_PLACEHOLDER: &str = "[unreadable array]";

/// Significant digits used for floating-point leaves.
pub const DEFAULT_FLOAT_DIGITS: usize = 6;

/// Upper bound for [`RuntimeConfig::set_float_digits`] (enough for an exact `f64`).
pub const MAX_FLOAT_DIGITS: usize = 17;

/// Environment variable overriding [`DEFAULT_FLOAT_DIGITS`].
pub const FLOAT_DIGITS_ENV: &str = "ARRAYBIND_FLOAT_DIGITS";

// =======================================================================
// Runtime Configuration
// =======================================================================

/// Process-wide settings, cheap to clone and lock-free to read.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Foreign-array ecosystems recognized by the universal constructor.
    ecosystems: Arc<EcosystemRegistry>,
    /// Significant digits for floating-point leaves in the printer.
    float_digits: Arc<AtomicUsize>,
    /// Whether one-dimensional dynamic arrays may be consumed as sequences.
    dynamic_sequence_import: Arc<AtomicBool>,
}

impl RuntimeConfig {
    /// Create a config with the default ecosystems and printer precision.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            ecosystems: Arc::new(EcosystemRegistry::new()),
            float_digits: Arc::new(AtomicUsize::new(DEFAULT_FLOAT_DIGITS)),
            dynamic_sequence_import: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a config seeded from the process environment.
    ///
    /// Unparsable values of [`FLOAT_DIGITS_ENV`] are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self::new();
        if let Ok(raw) = std::env::var(FLOAT_DIGITS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(digits) => config.set_float_digits(digits),
                Err(_) => log::warn!(
                    "[config] ignoring {}={:?}: not an unsigned integer",
                    FLOAT_DIGITS_ENV,
                    raw
                ),
            }
        }
        config
    }

    // ===================================================================
    // Ecosystems
    // ===================================================================

    /// Registered foreign-array ecosystems.
    #[inline]
    #[must_use]
    pub fn ecosystems(&self) -> &EcosystemRegistry {
        &self.ecosystems
    }

    // ===================================================================
    // Printer
    // ===================================================================

    /// Significant digits used for floating-point leaves.
    #[inline]
    #[must_use]
    pub fn float_digits(&self) -> usize {
        self.float_digits.load(Ordering::Relaxed)
    }

    /// Set the printer precision, clamped to `1..=MAX_FLOAT_DIGITS`.
    #[inline]
    pub fn set_float_digits(&self, digits: usize) {
        self.float_digits
            .store(digits.clamp(1, MAX_FLOAT_DIGITS), Ordering::Relaxed);
    }

    // ===================================================================
    // Import Policy
    // ===================================================================

    /// Whether a one-dimensional dynamic array source may be imported element
    /// by element when no conversion path applies.
    #[inline]
    #[must_use]
    pub fn allow_dynamic_sequence_import(&self) -> bool {
        self.dynamic_sequence_import.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_allow_dynamic_sequence_import(&self, allow: bool) {
        self.dynamic_sequence_import.store(allow, Ordering::Relaxed);
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: OnceLock<RuntimeConfig> = OnceLock::new();

/// The process-wide config, initialized from the environment on first use.
pub fn global() -> &'static RuntimeConfig {
    GLOBAL.get_or_init(RuntimeConfig::from_env)
}
