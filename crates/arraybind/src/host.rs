// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Values of the dynamic host runtime.
//!
//! [`HostValue`] covers the builtin scalars and containers plus bound array
//! instances; anything else is an opaque [`HostObject`] that may implement
//! the sequence, iteration or buffer-export protocols.

use crate::buffer::{BufferRequest, BufferView};
use crate::error::Result;
use crate::object::ArrayObject;
use std::fmt;
use std::sync::Arc;

/// Length plus indexed read.
pub trait SequenceProtocol {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn item(&self, index: usize) -> Result<HostValue>;
}

/// A host object that is neither a builtin nor a bound array.
pub trait HostObject: Send + Sync + fmt::Debug {
    /// Declared type name, e.g. `ndarray`.
    fn type_name(&self) -> &str;

    /// Module owning the type, e.g. `numpy`.
    fn module(&self) -> &str {
        "builtins"
    }

    fn sequence(&self) -> Option<&dyn SequenceProtocol> {
        None
    }

    /// Drain the iteration protocol, if the object has one.
    fn iterate(&self) -> Option<Result<Vec<HostValue>>> {
        None
    }

    /// Export a view satisfying `request`, if possible.
    fn export_buffer(&self, _request: &BufferRequest) -> Option<BufferView> {
        None
    }
}

/// A value of the host runtime.
#[derive(Debug, Clone)]
pub enum HostValue {
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    Tuple(Vec<HostValue>),
    List(Vec<HostValue>),
    Array(ArrayObject),
    Object(Arc<dyn HostObject>),
}

impl HostValue {
    /// Type name used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            HostValue::None => "NoneType".into(),
            HostValue::Bool(_) => "bool".into(),
            HostValue::Int(_) => "int".into(),
            HostValue::Float(_) => "float".into(),
            HostValue::Str(_) => "str".into(),
            HostValue::Tuple(_) => "tuple".into(),
            HostValue::List(_) => "list".into(),
            HostValue::Array(array) => array.type_name(),
            HostValue::Object(object) => format!("{}.{}", object.module(), object.type_name()),
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&ArrayObject> {
        match self {
            HostValue::Array(array) => Some(array),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&Arc<dyn HostObject>> {
        match self {
            HostValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Items of a tuple or list.
    #[inline]
    pub fn as_items(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Tuple(items) | HostValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Bool(b) => Some(f64::from(u8::from(*b))),
            HostValue::Int(i) => Some(*i as f64),
            HostValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            HostValue::Bool(b) => Some(i128::from(*b)),
            HostValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::None, HostValue::None) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Int(a), HostValue::Int(b)) => a == b,
            (HostValue::Float(a), HostValue::Float(b)) => a == b,
            (HostValue::Str(a), HostValue::Str(b)) => a == b,
            (HostValue::Tuple(a), HostValue::Tuple(b)) | (HostValue::List(a), HostValue::List(b)) => {
                a == b
            }
            (HostValue::Array(a), HostValue::Array(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[HostValue]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }

        match self {
            HostValue::None => f.write_str("None"),
            HostValue::Bool(true) => f.write_str("True"),
            HostValue::Bool(false) => f.write_str("False"),
            HostValue::Int(i) => write!(f, "{}", i),
            HostValue::Float(v) => write!(f, "{}", v),
            HostValue::Str(s) => f.write_str(s),
            HostValue::Tuple(items) => {
                f.write_str("(")?;
                join(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            HostValue::List(items) => {
                f.write_str("[")?;
                join(f, items)?;
                f.write_str("]")
            }
            HostValue::Array(array) => write!(f, "{}", array),
            HostValue::Object(object) => {
                write!(f, "<{}.{} object>", object.module(), object.type_name())
            }
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for HostValue {
            fn from(value: $ty) -> Self {
                HostValue::Int(i128::from(value))
            }
        })*
    };
}

from_int!(i8, u8, i16, u16, i32, u32, i64, u64);

impl From<f32> for HostValue {
    fn from(value: f32) -> Self {
        HostValue::Float(f64::from(value))
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Float(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Str(value.to_string())
    }
}

impl From<ArrayObject> for HostValue {
    fn from(value: ArrayObject) -> Self {
        HostValue::Array(value)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(values: Vec<T>) -> Self {
        HostValue::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Opaque;

    impl HostObject for Opaque {
        fn type_name(&self) -> &str {
            "ndarray"
        }

        fn module(&self) -> &str {
            "numpy"
        }
    }

    #[test]
    fn test_type_names() {
        assert_eq!(HostValue::from(1.5).type_name(), "float");
        assert_eq!(HostValue::from(vec![1, 2]).type_name(), "list");
        let object = HostValue::Object(Arc::new(Opaque));
        assert_eq!(object.type_name(), "numpy.ndarray");
    }

    #[test]
    fn test_objects_compare_by_identity() {
        let a: Arc<dyn HostObject> = Arc::new(Opaque);
        assert_eq!(HostValue::Object(a.clone()), HostValue::Object(a));
        assert_ne!(
            HostValue::Object(Arc::new(Opaque)),
            HostValue::Object(Arc::new(Opaque))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(HostValue::from(true).to_string(), "True");
        assert_eq!(HostValue::Tuple(vec![1.into()]).to_string(), "(1,)");
        assert_eq!(HostValue::from(vec![1, 2]).to_string(), "[1, 2]");
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(HostValue::Bool(true).as_int(), Some(1));
        assert_eq!(HostValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(HostValue::from("x").as_f64(), None);
    }
}
