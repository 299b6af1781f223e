// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Operation tables.
//!
//! Every bound type publishes one [`OpTable`] with an [`OpEntry`] per
//! [`Op`]: `Unsupported`, `Direct` (a type-specific kernel), or `Recurse`
//! (apply element-wise through the nested value type). [`builder`] fills the
//! table from the type's traits, [`dispatch`] consumes it.

pub mod builder;
pub mod dispatch;
pub(crate) mod host;
pub(crate) mod jit;
pub(crate) mod tensor;

pub use crate::object::{Erased, Storage};

use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::object::ArrayObject;
use crate::registry;
use std::fmt;

/// Dispatchable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Op {
    // Arithmetic and bitwise
    Add,
    Subtract,
    Multiply,
    Remainder,
    FloorDivide,
    TrueDivide,
    And,
    Or,
    Xor,
    LShift,
    RShift,
    Negative,
    Invert,
    Absolute,
    // Reductions, comparison, selection
    All,
    Any,
    RichCompare,
    Fma,
    Select,
    // Backend handles
    Index,
    IndexAd,
    // Transcendental
    Sqrt,
    Cbrt,
    Sin,
    Cos,
    Tan,
    Sinh,
    Cosh,
    Tanh,
    Asin,
    Acos,
    Atan,
    Asinh,
    Acosh,
    Atanh,
    Exp,
    Exp2,
    Log,
    Log2,
    Floor,
    Ceil,
    Round,
    Trunc,
    Rcp,
    Rsqrt,
    Min,
    Max,
    Atan2,
    Ldexp,
    Sincos,
    Sincosh,
    Frexp,
    // Construction and sizing
    Zero,
    Empty,
    Arange,
    Full,
    Len,
    Resize,
    Cast,
}

/// Calling convention of an operation's kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Unary,
    Binary,
    Ternary,
    Compare,
    Pair,
    Reduce,
    Index,
    Sized,
    Full,
    Len,
    Resize,
    Cast,
}

/// Trait a type must satisfy for an operation to be bound at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Arithmetic,
    SignedArithmetic,
    Integral,
    NonIntegralArithmetic,
    IntegralOrMask,
    ArithmeticOrMask,
    Float,
    Mask,
    /// One-dimensional array with a run-time sized axis.
    DynamicLeaf,
    /// Outermost axis sized at run time.
    OuterDynamic,
    /// One-dimensional accelerator array.
    JitLeaf,
    /// One-dimensional differentiable floating-point array.
    DiffFloatLeaf,
    /// Anything but a tensor.
    NotTensor,
}

impl Op {
    pub const COUNT: usize = 59;

    pub const ALL: [Op; Op::COUNT] = [
        Op::Add,
        Op::Subtract,
        Op::Multiply,
        Op::Remainder,
        Op::FloorDivide,
        Op::TrueDivide,
        Op::And,
        Op::Or,
        Op::Xor,
        Op::LShift,
        Op::RShift,
        Op::Negative,
        Op::Invert,
        Op::Absolute,
        Op::All,
        Op::Any,
        Op::RichCompare,
        Op::Fma,
        Op::Select,
        Op::Index,
        Op::IndexAd,
        Op::Sqrt,
        Op::Cbrt,
        Op::Sin,
        Op::Cos,
        Op::Tan,
        Op::Sinh,
        Op::Cosh,
        Op::Tanh,
        Op::Asin,
        Op::Acos,
        Op::Atan,
        Op::Asinh,
        Op::Acosh,
        Op::Atanh,
        Op::Exp,
        Op::Exp2,
        Op::Log,
        Op::Log2,
        Op::Floor,
        Op::Ceil,
        Op::Round,
        Op::Trunc,
        Op::Rcp,
        Op::Rsqrt,
        Op::Min,
        Op::Max,
        Op::Atan2,
        Op::Ldexp,
        Op::Sincos,
        Op::Sincosh,
        Op::Frexp,
        Op::Zero,
        Op::Empty,
        Op::Arange,
        Op::Full,
        Op::Len,
        Op::Resize,
        Op::Cast,
    ];

    #[inline]
    pub const fn slot(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Subtract => "subtract",
            Op::Multiply => "multiply",
            Op::Remainder => "remainder",
            Op::FloorDivide => "floor_divide",
            Op::TrueDivide => "true_divide",
            Op::And => "and",
            Op::Or => "or",
            Op::Xor => "xor",
            Op::LShift => "lshift",
            Op::RShift => "rshift",
            Op::Negative => "negative",
            Op::Invert => "invert",
            Op::Absolute => "absolute",
            Op::All => "all",
            Op::Any => "any",
            Op::RichCompare => "richcompare",
            Op::Fma => "fma",
            Op::Select => "select",
            Op::Index => "index",
            Op::IndexAd => "index_ad",
            Op::Sqrt => "sqrt",
            Op::Cbrt => "cbrt",
            Op::Sin => "sin",
            Op::Cos => "cos",
            Op::Tan => "tan",
            Op::Sinh => "sinh",
            Op::Cosh => "cosh",
            Op::Tanh => "tanh",
            Op::Asin => "asin",
            Op::Acos => "acos",
            Op::Atan => "atan",
            Op::Asinh => "asinh",
            Op::Acosh => "acosh",
            Op::Atanh => "atanh",
            Op::Exp => "exp",
            Op::Exp2 => "exp2",
            Op::Log => "log",
            Op::Log2 => "log2",
            Op::Floor => "floor",
            Op::Ceil => "ceil",
            Op::Round => "round",
            Op::Trunc => "trunc",
            Op::Rcp => "rcp",
            Op::Rsqrt => "rsqrt",
            Op::Min => "min",
            Op::Max => "max",
            Op::Atan2 => "atan2",
            Op::Ldexp => "ldexp",
            Op::Sincos => "sincos",
            Op::Sincosh => "sincosh",
            Op::Frexp => "frexp",
            Op::Zero => "zero",
            Op::Empty => "empty",
            Op::Arange => "arange",
            Op::Full => "full",
            Op::Len => "len",
            Op::Resize => "resize",
            Op::Cast => "cast",
        }
    }

    pub const fn signature(self) -> Signature {
        match self {
            Op::Add
            | Op::Subtract
            | Op::Multiply
            | Op::Remainder
            | Op::FloorDivide
            | Op::TrueDivide
            | Op::And
            | Op::Or
            | Op::Xor
            | Op::LShift
            | Op::RShift
            | Op::Min
            | Op::Max
            | Op::Atan2
            | Op::Ldexp => Signature::Binary,
            Op::All | Op::Any => Signature::Reduce,
            Op::RichCompare => Signature::Compare,
            Op::Fma | Op::Select => Signature::Ternary,
            Op::Index | Op::IndexAd => Signature::Index,
            Op::Sincos | Op::Sincosh | Op::Frexp => Signature::Pair,
            Op::Zero | Op::Empty | Op::Arange => Signature::Sized,
            Op::Full => Signature::Full,
            Op::Len => Signature::Len,
            Op::Resize => Signature::Resize,
            Op::Cast => Signature::Cast,
            _ => Signature::Unary,
        }
    }

    pub const fn requirement(self) -> Requirement {
        match self {
            Op::Add | Op::Subtract | Op::Multiply | Op::Min | Op::Max | Op::Fma => {
                Requirement::Arithmetic
            }
            Op::Negative | Op::Absolute => Requirement::SignedArithmetic,
            Op::Remainder | Op::FloorDivide | Op::LShift | Op::RShift => Requirement::Integral,
            Op::TrueDivide => Requirement::NonIntegralArithmetic,
            Op::And | Op::Or | Op::Xor | Op::Invert => Requirement::IntegralOrMask,
            Op::RichCompare | Op::Select => Requirement::ArithmeticOrMask,
            Op::All | Op::Any => Requirement::Mask,
            Op::Index => Requirement::JitLeaf,
            Op::IndexAd => Requirement::DiffFloatLeaf,
            Op::Zero | Op::Empty | Op::Arange | Op::Full => Requirement::DynamicLeaf,
            Op::Len | Op::Resize => Requirement::OuterDynamic,
            Op::Cast => Requirement::NotTensor,
            _ => Requirement::Float,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison selector for [`Op::RichCompare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compare {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Compare {
    /// Evaluate on two ordered scalars.
    #[inline]
    pub fn eval<T: PartialOrd>(self, a: &T, b: &T) -> bool {
        match self {
            Compare::Lt => a < b,
            Compare::Le => a <= b,
            Compare::Gt => a > b,
            Compare::Ge => a >= b,
            Compare::Eq => a == b,
            Compare::Ne => a != b,
        }
    }
}

// =======================================================================
// Kernels
// =======================================================================

pub type UnaryFn = fn(Op, &Erased) -> Result<Storage>;
pub type BinaryFn = fn(Op, &Erased, &Erased) -> Result<Storage>;
pub type TernaryFn = fn(Op, &Erased, &Erased, &Erased) -> Result<Storage>;
pub type CompareFn = fn(Compare, &Erased, &Erased) -> Result<Storage>;
pub type PairFn = fn(Op, &Erased) -> Result<(Storage, Storage)>;
pub type CastFn = fn(&ArrayObject) -> Result<Storage>;
pub type SizedFn = fn(Op, usize) -> Result<Storage>;
pub type FullFn = fn(&HostValue, usize) -> Result<Storage>;
pub type LenFn = fn(&Erased) -> usize;
pub type ResizeFn = fn(&mut Erased, usize) -> Result<()>;
pub type IndexFn = fn(&Erased) -> u32;

/// A type-specific kernel stored in a `Direct` entry.
#[derive(Clone, Copy)]
pub enum Kernel {
    Unary(UnaryFn),
    Binary(BinaryFn),
    Ternary(TernaryFn),
    Compare(CompareFn),
    Pair(PairFn),
    Cast(CastFn),
    Sized(SizedFn),
    Full(FullFn),
    Len(LenFn),
    Resize(ResizeFn),
    Index(IndexFn),
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kernel::Unary(_) => "Unary",
            Kernel::Binary(_) => "Binary",
            Kernel::Ternary(_) => "Ternary",
            Kernel::Compare(_) => "Compare",
            Kernel::Pair(_) => "Pair",
            Kernel::Cast(_) => "Cast",
            Kernel::Sized(_) => "Sized",
            Kernel::Full(_) => "Full",
            Kernel::Len(_) => "Len",
            Kernel::Resize(_) => "Resize",
            Kernel::Index(_) => "Index",
        };
        write!(f, "Kernel::{}", name)
    }
}

/// Leaf kernels a one-dimensional type provides.
#[derive(Clone, Copy)]
pub struct Kernels {
    pub unary: UnaryFn,
    pub binary: BinaryFn,
    pub ternary: TernaryFn,
    pub compare: CompareFn,
    pub pair: PairFn,
    pub reduce: UnaryFn,
    pub cast: Option<CastFn>,
    pub sized: Option<SizedFn>,
    pub full: Option<FullFn>,
    pub index: Option<IndexFn>,
    pub index_ad: Option<IndexFn>,
}

impl Kernels {
    /// The kernel implementing `op`, if this set has one.
    pub fn lookup(&self, op: Op) -> Option<Kernel> {
        match op.signature() {
            Signature::Unary => Some(Kernel::Unary(self.unary)),
            Signature::Reduce => Some(Kernel::Unary(self.reduce)),
            Signature::Binary => Some(Kernel::Binary(self.binary)),
            Signature::Ternary => Some(Kernel::Ternary(self.ternary)),
            Signature::Compare => Some(Kernel::Compare(self.compare)),
            Signature::Pair => Some(Kernel::Pair(self.pair)),
            Signature::Cast => self.cast.map(Kernel::Cast),
            Signature::Sized => self.sized.map(Kernel::Sized),
            Signature::Full => self.full.map(Kernel::Full),
            Signature::Index if op == Op::IndexAd => self.index_ad.map(Kernel::Index),
            Signature::Index => self.index.map(Kernel::Index),
            Signature::Len | Signature::Resize => None,
        }
    }
}

/// How a type implements one operation.
#[derive(Debug, Clone, Copy)]
pub enum OpEntry {
    Unsupported,
    Direct(Kernel),
    Recurse,
}

impl OpEntry {
    #[inline]
    pub fn is_supported(&self) -> bool {
        !matches!(self, OpEntry::Unsupported)
    }

    #[inline]
    pub fn is_direct(&self) -> bool {
        matches!(self, OpEntry::Direct(_))
    }
}

/// One entry per [`Op`], published with each bound type.
#[derive(Clone)]
pub struct OpTable {
    entries: [OpEntry; Op::COUNT],
}

impl OpTable {
    /// Table with every operation unsupported.
    pub fn unsupported() -> Self {
        Self {
            entries: [OpEntry::Unsupported; Op::COUNT],
        }
    }

    pub(crate) fn from_fn(mut f: impl FnMut(Op) -> OpEntry) -> Self {
        Self {
            entries: std::array::from_fn(|slot| f(Op::ALL[slot])),
        }
    }

    #[inline]
    pub fn get(&self, op: Op) -> &OpEntry {
        &self.entries[op.slot()]
    }

    #[inline]
    pub fn supports(&self, op: Op) -> bool {
        self.get(op).is_supported()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Op, &OpEntry)> {
        Op::ALL.iter().copied().zip(self.entries.iter())
    }

    /// Number of operations that are not unsupported.
    pub fn supported_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_supported()).count()
    }
}

impl fmt::Debug for OpTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.iter()
                    .filter(|(_, e)| e.is_supported())
                    .map(|(op, e)| (op.name(), e)),
            )
            .finish()
    }
}

// =======================================================================
// Erased operand helpers
// =======================================================================

/// Borrow an erased operand as `A`.
pub(crate) fn operand<A: 'static>(value: &Erased) -> Result<&A> {
    value.downcast_ref::<A>().ok_or_else(|| Error::TypeMismatch {
        expected: registry::label::<A>(),
        got: "a different array type".into(),
    })
}

/// Unbox a kernel result as `A`.
pub(crate) fn take<A: 'static>(storage: Storage) -> Result<A> {
    storage
        .downcast::<A>()
        .map(|boxed| *boxed)
        .map_err(|_| Error::TypeMismatch {
            expected: registry::label::<A>(),
            got: "a different array type".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_matches_slots() {
        for (slot, op) in Op::ALL.iter().enumerate() {
            assert_eq!(op.slot(), slot, "{} out of order", op);
        }
        assert_eq!(Op::Cast.slot(), Op::COUNT - 1);
    }

    #[test]
    fn test_signatures() {
        assert_eq!(Op::Add.signature(), Signature::Binary);
        assert_eq!(Op::Sqrt.signature(), Signature::Unary);
        assert_eq!(Op::All.signature(), Signature::Reduce);
        assert_eq!(Op::Frexp.signature(), Signature::Pair);
        assert_eq!(Op::Select.signature(), Signature::Ternary);
        assert_eq!(Op::Atan2.requirement(), Requirement::Float);
        assert_eq!(Op::TrueDivide.requirement(), Requirement::NonIntegralArithmetic);
    }

    #[test]
    fn test_compare_eval() {
        assert!(Compare::Lt.eval(&1, &2));
        assert!(!Compare::Ge.eval(&1.0, &2.0));
        assert!(Compare::Ne.eval(&f64::NAN, &f64::NAN));
        assert!(Compare::Eq.eval(&true, &true));
    }

    #[test]
    fn test_unsupported_table() {
        let table = OpTable::unsupported();
        assert_eq!(table.supported_count(), 0);
        assert!(!table.supports(Op::Add));
    }

    #[test]
    fn test_take_rejects_wrong_type() {
        let boxed: Storage = Box::new(1u32);
        assert!(take::<f32>(boxed).is_err());
        let boxed: Storage = Box::new(1u32);
        assert_eq!(take::<u32>(boxed).expect("u32"), 1);
    }
}
