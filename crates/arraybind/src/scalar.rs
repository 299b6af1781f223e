// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scalar element kinds.
//!
//! [`ElementKind`] is the 4-bit type code stored in a descriptor,
//! [`ScalarValue`] a type-erased leaf value, and [`Scalar`] the per-type math
//! the host kernels are generated from.

use crate::error::Result;
use crate::family::{DynamicArray, Element, Flavor, StaticArray};
use crate::host::HostValue;
use crate::ops::{host, Kernels, Op};
use std::fmt;

/// Scalar type code (matches the accelerator's variable type numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ElementKind {
    Bool = 1,
    I8 = 2,
    U8 = 3,
    I16 = 4,
    U16 = 5,
    I32 = 6,
    U32 = 7,
    I64 = 8,
    U64 = 9,
    F32 = 12,
    F64 = 13,
}

impl ElementKind {
    /// All kinds, in code order.
    pub const ALL: [ElementKind; 11] = [
        Self::Bool,
        Self::I8,
        Self::U8,
        Self::I16,
        Self::U16,
        Self::I32,
        Self::U32,
        Self::I64,
        Self::U64,
        Self::F32,
        Self::F64,
    ];

    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Bool),
            2 => Some(Self::I8),
            3 => Some(Self::U8),
            4 => Some(Self::I16),
            5 => Some(Self::U16),
            6 => Some(Self::I32),
            7 => Some(Self::U32),
            8 => Some(Self::I64),
            9 => Some(Self::U64),
            12 => Some(Self::F32),
            13 => Some(Self::F64),
            _ => None,
        }
    }

    /// Size of one element in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    #[inline]
    pub const fn bits(self) -> usize {
        self.bytes() * 8
    }

    #[inline]
    pub const fn is_mask(self) -> bool {
        matches!(self, Self::Bool)
    }

    #[inline]
    pub const fn is_arithmetic(self) -> bool {
        !self.is_mask()
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    #[inline]
    pub const fn is_integral(self) -> bool {
        self.is_arithmetic() && !self.is_float()
    }

    /// Signed integers and floats.
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::F32 | Self::F64
        )
    }

    /// Suffix used in generated array names (`Array3f`, `ArrayXu64`).
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Bool => "b",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i",
            Self::U32 => "u",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f",
            Self::F64 => "f64",
        }
    }

    /// Name of the one-dimensional accelerator array of this kind.
    pub const fn leaf_name(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::I8 => "Int8",
            Self::U8 => "UInt8",
            Self::I16 => "Int16",
            Self::U16 => "UInt16",
            Self::I32 => "Int",
            Self::U32 => "UInt",
            Self::I64 => "Int64",
            Self::U64 => "UInt64",
            Self::F32 => "Float",
            Self::F64 => "Float64",
        }
    }

    /// Buffer-protocol dtype name.
    pub const fn dtype_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "int8",
            Self::U8 => "uint8",
            Self::I16 => "int16",
            Self::U16 => "uint16",
            Self::I32 => "int32",
            Self::U32 => "uint32",
            Self::I64 => "int64",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }

    /// Zero of this kind.
    pub const fn zero(self) -> ScalarValue {
        match self {
            Self::Bool => ScalarValue::Bool(false),
            Self::I8 => ScalarValue::I8(0),
            Self::U8 => ScalarValue::U8(0),
            Self::I16 => ScalarValue::I16(0),
            Self::U16 => ScalarValue::U16(0),
            Self::I32 => ScalarValue::I32(0),
            Self::U32 => ScalarValue::U32(0),
            Self::I64 => ScalarValue::I64(0),
            Self::U64 => ScalarValue::U64(0),
            Self::F32 => ScalarValue::F32(0.0),
            Self::F64 => ScalarValue::F64(0.0),
        }
    }

    /// Decode one native-endian element; `None` if `bytes` is too short.
    pub fn decode(self, bytes: &[u8]) -> Option<ScalarValue> {
        let raw = bytes.get(..self.bytes())?;
        Some(match self {
            Self::Bool => ScalarValue::Bool(<bool as Scalar>::read_ne(raw)),
            Self::I8 => ScalarValue::I8(i8::read_ne(raw)),
            Self::U8 => ScalarValue::U8(u8::read_ne(raw)),
            Self::I16 => ScalarValue::I16(i16::read_ne(raw)),
            Self::U16 => ScalarValue::U16(u16::read_ne(raw)),
            Self::I32 => ScalarValue::I32(i32::read_ne(raw)),
            Self::U32 => ScalarValue::U32(u32::read_ne(raw)),
            Self::I64 => ScalarValue::I64(i64::read_ne(raw)),
            Self::U64 => ScalarValue::U64(u64::read_ne(raw)),
            Self::F32 => ScalarValue::F32(f32::read_ne(raw)),
            Self::F64 => ScalarValue::F64(f64::read_ne(raw)),
        })
    }

    /// Exact integer conversion; `None` when out of range.
    fn from_int(self, value: i128) -> Option<ScalarValue> {
        Some(match self {
            Self::Bool => ScalarValue::Bool(value != 0),
            Self::I8 => ScalarValue::I8(i8::try_from(value).ok()?),
            Self::U8 => ScalarValue::U8(u8::try_from(value).ok()?),
            Self::I16 => ScalarValue::I16(i16::try_from(value).ok()?),
            Self::U16 => ScalarValue::U16(u16::try_from(value).ok()?),
            Self::I32 => ScalarValue::I32(i32::try_from(value).ok()?),
            Self::U32 => ScalarValue::U32(u32::try_from(value).ok()?),
            Self::I64 => ScalarValue::I64(i64::try_from(value).ok()?),
            Self::U64 => ScalarValue::U64(u64::try_from(value).ok()?),
            Self::F32 => ScalarValue::F32(value as f32),
            Self::F64 => ScalarValue::F64(value as f64),
        })
    }

    /// The single-argument constructor of this kind.
    ///
    /// Floats take bools, integers, floats and numeric strings. Integers take
    /// bools, in-range integers, finite floats (truncated) and integer strings.
    /// Bool takes the truthiness of anything but arrays and foreign objects.
    pub fn construct(self, value: &HostValue) -> Option<ScalarValue> {
        match value {
            HostValue::Bool(b) => Some(ScalarValue::Bool(*b).cast(self)),
            HostValue::Int(i) => self.from_int(*i),
            HostValue::Float(f) => {
                if self.is_float() || self.is_mask() {
                    Some(ScalarValue::F64(*f).cast(self))
                } else {
                    let truncated = f.trunc();
                    if !truncated.is_finite() || truncated.abs() >= 1.0e38 {
                        return None;
                    }
                    self.from_int(truncated as i128)
                }
            }
            HostValue::Str(s) => {
                let s = s.trim();
                if self.is_mask() {
                    Some(ScalarValue::Bool(!s.is_empty()))
                } else if self.is_float() {
                    s.parse::<f64>()
                        .ok()
                        .map(|f| ScalarValue::F64(f).cast(self))
                } else {
                    s.parse::<i128>().ok().and_then(|i| self.from_int(i))
                }
            }
            HostValue::None if self.is_mask() => Some(ScalarValue::Bool(false)),
            HostValue::Tuple(items) | HostValue::List(items) if self.is_mask() => {
                Some(ScalarValue::Bool(!items.is_empty()))
            }
            _ => None,
        }
    }

    /// Implicit conversion used by indexed writes.
    ///
    /// Bool accepts only bools; integers accept bools and in-range integers;
    /// floats accept bools, integers and floats.
    pub fn convert_implicit(self, value: &HostValue) -> Option<ScalarValue> {
        match value {
            HostValue::Bool(b) => Some(ScalarValue::Bool(*b).cast(self)),
            HostValue::Int(i) if !self.is_mask() => self.from_int(*i),
            HostValue::Float(f) if self.is_float() => Some(ScalarValue::F64(*f).cast(self)),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dtype_name())
    }
}

/// A type-erased scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl ScalarValue {
    pub fn kind(self) -> ElementKind {
        match self {
            Self::Bool(_) => ElementKind::Bool,
            Self::I8(_) => ElementKind::I8,
            Self::U8(_) => ElementKind::U8,
            Self::I16(_) => ElementKind::I16,
            Self::U16(_) => ElementKind::U16,
            Self::I32(_) => ElementKind::I32,
            Self::U32(_) => ElementKind::U32,
            Self::I64(_) => ElementKind::I64,
            Self::U64(_) => ElementKind::U64,
            Self::F32(_) => ElementKind::F32,
            Self::F64(_) => ElementKind::F64,
        }
    }

    /// Integer view; floats truncate and saturate.
    pub fn to_i128(self) -> i128 {
        match self {
            Self::Bool(v) => i128::from(v),
            Self::I8(v) => i128::from(v),
            Self::U8(v) => i128::from(v),
            Self::I16(v) => i128::from(v),
            Self::U16(v) => i128::from(v),
            Self::I32(v) => i128::from(v),
            Self::U32(v) => i128::from(v),
            Self::I64(v) => i128::from(v),
            Self::U64(v) => i128::from(v),
            Self::F32(v) => v as i128,
            Self::F64(v) => v as i128,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Self::F32(v) => f64::from(v),
            Self::F64(v) => v,
            other => other.to_i128() as f64,
        }
    }

    /// Convert with `as` semantics: integers wrap, floats truncate toward zero
    /// and saturate, anything non-zero becomes `true`.
    pub fn cast(self, kind: ElementKind) -> ScalarValue {
        match kind {
            ElementKind::Bool => Self::Bool(bool::from_value(self)),
            ElementKind::I8 => Self::I8(i8::from_value(self)),
            ElementKind::U8 => Self::U8(u8::from_value(self)),
            ElementKind::I16 => Self::I16(i16::from_value(self)),
            ElementKind::U16 => Self::U16(u16::from_value(self)),
            ElementKind::I32 => Self::I32(i32::from_value(self)),
            ElementKind::U32 => Self::U32(u32::from_value(self)),
            ElementKind::I64 => Self::I64(i64::from_value(self)),
            ElementKind::U64 => Self::U64(u64::from_value(self)),
            ElementKind::F32 => Self::F32(f32::from_value(self)),
            ElementKind::F64 => Self::F64(f64::from_value(self)),
        }
    }

    /// Host-side representation: bool, arbitrary-width integer or float.
    pub fn to_host(self) -> HostValue {
        match self {
            Self::Bool(v) => HostValue::Bool(v),
            Self::F32(v) => HostValue::Float(f64::from(v)),
            Self::F64(v) => HostValue::Float(v),
            other => HostValue::Int(other.to_i128()),
        }
    }
}

/// Per-type scalar math.
///
/// Kernels are generated from these; `None` means the operation has no
/// result for the operands (integer division by zero) or is undefined for
/// the kind. The operation table never binds the latter.
pub trait Scalar: Element + Copy + Default + PartialEq + PartialOrd + fmt::Debug {
    /// Convert from any kind with `as` semantics.
    fn from_value(value: ScalarValue) -> Self;
    fn to_value(self) -> ScalarValue;
    /// Decode from exactly `size_of::<Self>()` native-endian bytes.
    fn read_ne(bytes: &[u8]) -> Self;
    fn is_nonzero(self) -> bool;
    fn unary(op: Op, a: Self) -> Option<Self>;
    fn binary(op: Op, a: Self, b: Self) -> Option<Self>;
    fn fma(a: Self, b: Self, c: Self) -> Self;
    fn pair(op: Op, a: Self) -> Option<(Self, Self)>;
}

/// Split `x` into a mantissa in `[0.5, 1)` and a power of two.
fn frexp(x: f64) -> (f64, f64) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0.0);
    }
    let bits = x.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i64;
    if exponent == 0 {
        // subnormal
        let (mantissa, e) = frexp(x * 2f64.powi(54));
        return (mantissa, e - 54.0);
    }
    let mantissa = f64::from_bits((bits & !(0x7ffu64 << 52)) | (1022u64 << 52));
    (mantissa, (exponent - 1022) as f64)
}

/// `Element` glue shared by every scalar type.
macro_rules! scalar_element {
    ($ty:ty, $kind:ident) => {
        impl Element for $ty {
            type MaskElement = bool;
            type Flat = DynamicArray<$ty>;
            const DEPTH: u8 = 0;
            const SHAPE: [u8; 4] = [0; 4];
            const KIND: ElementKind = ElementKind::$kind;
            const IS_SCALAR: bool = true;

            fn zeroed() -> Self {
                <$ty>::default()
            }

            fn to_host(&self) -> Result<HostValue> {
                Ok(Scalar::to_value(*self).to_host())
            }

            fn from_host(value: &HostValue) -> Option<Self> {
                Self::KIND.convert_implicit(value).map(<$ty as Scalar>::from_value)
            }

            fn from_ne_bytes(bytes: &[u8]) -> Option<Self> {
                (bytes.len() == std::mem::size_of::<$ty>()).then(|| <$ty as Scalar>::read_ne(bytes))
            }

            fn static_leaf_kernels<const N: usize, F: Flavor>() -> Option<Kernels> {
                Some(host::kernels::<StaticArray<$ty, N, F>>())
            }

            fn dynamic_leaf_kernels() -> Option<Kernels> {
                Some(host::kernels::<DynamicArray<$ty>>())
            }
        }
    };
}

macro_rules! int_scalar {
    ($ty:ty, $kind:ident, abs = $abs:expr) => {
        scalar_element!($ty, $kind);

        impl Scalar for $ty {
            fn from_value(value: ScalarValue) -> Self {
                match value {
                    ScalarValue::F32(v) => v as $ty,
                    ScalarValue::F64(v) => v as $ty,
                    other => other.to_i128() as $ty,
                }
            }

            fn to_value(self) -> ScalarValue {
                ScalarValue::$kind(self)
            }

            fn read_ne(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                <$ty>::from_ne_bytes(raw)
            }

            fn is_nonzero(self) -> bool {
                self != 0
            }

            fn unary(op: Op, a: Self) -> Option<Self> {
                let abs: fn($ty) -> $ty = $abs;
                match op {
                    Op::Negative => Some(a.wrapping_neg()),
                    Op::Absolute => Some(abs(a)),
                    Op::Invert => Some(!a),
                    _ => None,
                }
            }

            fn binary(op: Op, a: Self, b: Self) -> Option<Self> {
                match op {
                    Op::Add => Some(a.wrapping_add(b)),
                    Op::Subtract => Some(a.wrapping_sub(b)),
                    Op::Multiply => Some(a.wrapping_mul(b)),
                    Op::Remainder => a.checked_rem(b),
                    Op::FloorDivide => a.checked_div(b),
                    Op::And => Some(a & b),
                    Op::Or => Some(a | b),
                    Op::Xor => Some(a ^ b),
                    Op::LShift => Some(a.wrapping_shl(b as u32)),
                    Op::RShift => Some(a.wrapping_shr(b as u32)),
                    Op::Min => Some(Ord::min(a, b)),
                    Op::Max => Some(Ord::max(a, b)),
                    _ => None,
                }
            }

            fn fma(a: Self, b: Self, c: Self) -> Self {
                a.wrapping_mul(b).wrapping_add(c)
            }

            fn pair(_op: Op, _a: Self) -> Option<(Self, Self)> {
                None
            }
        }
    };
}

macro_rules! float_scalar {
    ($ty:ty, $kind:ident) => {
        scalar_element!($ty, $kind);

        impl Scalar for $ty {
            fn from_value(value: ScalarValue) -> Self {
                match value {
                    ScalarValue::F32(v) => v as $ty,
                    ScalarValue::F64(v) => v as $ty,
                    other => other.to_i128() as $ty,
                }
            }

            fn to_value(self) -> ScalarValue {
                ScalarValue::$kind(self)
            }

            fn read_ne(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                <$ty>::from_ne_bytes(raw)
            }

            fn is_nonzero(self) -> bool {
                self != 0.0
            }

            fn unary(op: Op, a: Self) -> Option<Self> {
                Some(match op {
                    Op::Negative => -a,
                    Op::Absolute => a.abs(),
                    Op::Sqrt => a.sqrt(),
                    Op::Cbrt => a.cbrt(),
                    Op::Sin => a.sin(),
                    Op::Cos => a.cos(),
                    Op::Tan => a.tan(),
                    Op::Sinh => a.sinh(),
                    Op::Cosh => a.cosh(),
                    Op::Tanh => a.tanh(),
                    Op::Asin => a.asin(),
                    Op::Acos => a.acos(),
                    Op::Atan => a.atan(),
                    Op::Asinh => a.asinh(),
                    Op::Acosh => a.acosh(),
                    Op::Atanh => a.atanh(),
                    Op::Exp => a.exp(),
                    Op::Exp2 => a.exp2(),
                    Op::Log => a.ln(),
                    Op::Log2 => a.log2(),
                    Op::Floor => a.floor(),
                    Op::Ceil => a.ceil(),
                    Op::Round => a.round(),
                    Op::Trunc => a.trunc(),
                    Op::Rcp => a.recip(),
                    Op::Rsqrt => a.sqrt().recip(),
                    _ => return None,
                })
            }

            fn binary(op: Op, a: Self, b: Self) -> Option<Self> {
                Some(match op {
                    Op::Add => a + b,
                    Op::Subtract => a - b,
                    Op::Multiply => a * b,
                    Op::TrueDivide => a / b,
                    Op::Min => a.min(b),
                    Op::Max => a.max(b),
                    Op::Atan2 => a.atan2(b),
                    Op::Ldexp => a * b.exp2(),
                    _ => return None,
                })
            }

            fn fma(a: Self, b: Self, c: Self) -> Self {
                a.mul_add(b, c)
            }

            fn pair(op: Op, a: Self) -> Option<(Self, Self)> {
                match op {
                    Op::Sincos => Some(a.sin_cos()),
                    Op::Sincosh => Some((a.sinh(), a.cosh())),
                    Op::Frexp => {
                        let (mantissa, exponent) = frexp(f64::from(a));
                        Some((mantissa as $ty, exponent as $ty))
                    }
                    _ => None,
                }
            }
        }
    };
}

scalar_element!(bool, Bool);

impl Scalar for bool {
    fn from_value(value: ScalarValue) -> Self {
        match value {
            ScalarValue::Bool(v) => v,
            ScalarValue::F32(v) => v != 0.0,
            ScalarValue::F64(v) => v != 0.0,
            other => other.to_i128() != 0,
        }
    }

    fn to_value(self) -> ScalarValue {
        ScalarValue::Bool(self)
    }

    fn read_ne(bytes: &[u8]) -> Self {
        bytes.first().is_some_and(|b| *b != 0)
    }

    fn is_nonzero(self) -> bool {
        self
    }

    fn unary(op: Op, a: Self) -> Option<Self> {
        match op {
            Op::Invert => Some(!a),
            _ => None,
        }
    }

    fn binary(op: Op, a: Self, b: Self) -> Option<Self> {
        match op {
            Op::And => Some(a & b),
            Op::Or => Some(a | b),
            Op::Xor => Some(a ^ b),
            _ => None,
        }
    }

    fn fma(a: Self, b: Self, c: Self) -> Self {
        (a & b) | c
    }

    fn pair(_op: Op, _a: Self) -> Option<(Self, Self)> {
        None
    }
}

int_scalar!(i8, I8, abs = i8::wrapping_abs);
int_scalar!(u8, U8, abs = |a| a);
int_scalar!(i16, I16, abs = i16::wrapping_abs);
int_scalar!(u16, U16, abs = |a| a);
int_scalar!(i32, I32, abs = i32::wrapping_abs);
int_scalar!(u32, U32, abs = |a| a);
int_scalar!(i64, I64, abs = i64::wrapping_abs);
int_scalar!(u64, U64, abs = |a| a);
float_scalar!(f32, F32);
float_scalar!(f64, F64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for kind in ElementKind::ALL {
            assert_eq!(ElementKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ElementKind::from_code(0), None);
        assert_eq!(ElementKind::from_code(10), None);
        assert_eq!(ElementKind::F32.code(), 12);
    }

    #[test]
    fn test_kind_traits() {
        assert!(ElementKind::Bool.is_mask());
        assert!(!ElementKind::Bool.is_arithmetic());
        assert!(ElementKind::U32.is_integral());
        assert!(!ElementKind::U32.is_signed());
        assert!(ElementKind::F64.is_signed());
        assert!(!ElementKind::F64.is_integral());
        assert_eq!(ElementKind::I16.bits(), 16);
    }

    #[test]
    fn test_cast_uses_as_semantics() {
        assert_eq!(ScalarValue::F64(2.7).cast(ElementKind::I32), ScalarValue::I32(2));
        assert_eq!(ScalarValue::F64(-2.7).cast(ElementKind::I32), ScalarValue::I32(-2));
        assert_eq!(ScalarValue::F64(1e20).cast(ElementKind::I32), ScalarValue::I32(i32::MAX));
        assert_eq!(ScalarValue::I32(-1).cast(ElementKind::U8), ScalarValue::U8(255));
        assert_eq!(ScalarValue::I32(3).cast(ElementKind::Bool), ScalarValue::Bool(true));
        assert_eq!(ScalarValue::Bool(true).cast(ElementKind::F32), ScalarValue::F32(1.0));
    }

    #[test]
    fn test_construct_int_from_float_truncates() {
        let v = ElementKind::I32.construct(&HostValue::Float(3.9));
        assert_eq!(v, Some(ScalarValue::I32(3)));
        assert_eq!(ElementKind::I32.construct(&HostValue::Float(f64::NAN)), None);
        assert_eq!(ElementKind::U8.construct(&HostValue::Int(256)), None);
    }

    #[test]
    fn test_construct_from_strings() {
        assert_eq!(
            ElementKind::F32.construct(&HostValue::Str(" 1.5 ".into())),
            Some(ScalarValue::F32(1.5))
        );
        assert_eq!(
            ElementKind::I64.construct(&HostValue::Str("-12".into())),
            Some(ScalarValue::I64(-12))
        );
        assert_eq!(ElementKind::I64.construct(&HostValue::Str("1.5".into())), None);
        assert_eq!(
            ElementKind::Bool.construct(&HostValue::Str(String::new())),
            Some(ScalarValue::Bool(false))
        );
    }

    #[test]
    fn test_implicit_conversion_is_strict() {
        assert_eq!(ElementKind::Bool.convert_implicit(&HostValue::Int(1)), None);
        assert_eq!(ElementKind::I32.convert_implicit(&HostValue::Float(1.0)), None);
        assert_eq!(
            ElementKind::I32.convert_implicit(&HostValue::Bool(true)),
            Some(ScalarValue::I32(1))
        );
        assert_eq!(
            ElementKind::F64.convert_implicit(&HostValue::Int(7)),
            Some(ScalarValue::F64(7.0))
        );
        assert_eq!(ElementKind::U32.convert_implicit(&HostValue::Int(-1)), None);
    }

    #[test]
    fn test_integer_math() {
        assert_eq!(i32::binary(Op::FloorDivide, 7, 2), Some(3));
        assert_eq!(i32::binary(Op::Remainder, 7, 0), None);
        assert_eq!(u8::binary(Op::Add, 250, 10), Some(4));
        assert_eq!(i32::unary(Op::Absolute, -5), Some(5));
        assert_eq!(u32::binary(Op::LShift, 1, 4), Some(16));
        assert_eq!(i32::fma(2, 3, 4), 10);
    }

    #[test]
    fn test_float_math() {
        assert_eq!(f32::binary(Op::TrueDivide, 1.0, 4.0), Some(0.25));
        assert_eq!(f64::binary(Op::Ldexp, 3.0, 2.0), Some(12.0));
        assert_eq!(f64::unary(Op::Rsqrt, 4.0), Some(0.5));
        assert_eq!(f32::unary(Op::Invert, 1.0), None);
        assert_eq!(f64::pair(Op::Frexp, 8.0), Some((0.5, 4.0)));
        assert_eq!(f64::pair(Op::Frexp, -3.0), Some((-0.75, 2.0)));
    }

    #[test]
    fn test_frexp_subnormal() {
        let tiny = f64::from_bits(1);
        let (m, e) = frexp(tiny);
        assert_eq!(m, 0.5);
        assert_eq!(m * 2f64.powf(e), tiny);
    }

    #[test]
    fn test_decode_native_endian() {
        let bytes = 1.5f32.to_ne_bytes();
        assert_eq!(ElementKind::F32.decode(&bytes), Some(ScalarValue::F32(1.5)));
        assert_eq!(ElementKind::F64.decode(&bytes), None);
        assert_eq!(ElementKind::Bool.decode(&[2]), Some(ScalarValue::Bool(true)));
    }

    #[test]
    fn test_to_host() {
        assert_eq!(ScalarValue::U64(u64::MAX).to_host(), HostValue::Int(u64::MAX as i128));
        assert_eq!(ScalarValue::F32(0.5).to_host(), HostValue::Float(0.5));
        assert_eq!(ScalarValue::Bool(true).to_host(), HostValue::Bool(true));
    }
}
