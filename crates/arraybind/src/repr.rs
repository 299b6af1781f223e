// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Nested-bracket rendering of array instances.
//!
//! ```text
//! [[1, 2, 3],
//!  [4, 5, 6]]
//! ```
//!
//! Instances without a rectangular shape print as
//! [`RAGGED_PLACEHOLDER`](crate::config::RAGGED_PLACEHOLDER), and ones whose
//! entries cannot be read (a failing backend) as
//! [`UNREADABLE_PLACEHOLDER`](crate::config::UNREADABLE_PLACEHOLDER).

use crate::config::{self, RAGGED_PLACEHOLDER, UNREADABLE_PLACEHOLDER};
use crate::error::Result;
use crate::host::HostValue;
use crate::object::ArrayObject;

/// Render `object`. Never fails; instances that cannot be read print as a
/// placeholder.
pub fn repr(object: &ArrayObject) -> String {
    let Some(shape) = shape(object) else {
        return RAGGED_PLACEHOLDER.to_string();
    };
    let digits = config::global().float_digits();
    let mut out = String::new();
    let rendered = if shape.is_empty() {
        object.get_item(0).map(|leaf| push_leaf(&mut out, &leaf, digits))
    } else {
        render(&mut out, object, &shape, 0, digits)
    };
    match rendered {
        Ok(()) => out,
        Err(e) => {
            log::debug!("[repr] {} unreadable: {}", object.type_name(), e);
            UNREADABLE_PLACEHOLDER.to_string()
        }
    }
}

/// Rectangular extents of `object`, outermost first. `None` when ragged.
///
/// Entries of length one broadcast against longer siblings.
pub fn shape(object: &ArrayObject) -> Option<Vec<usize>> {
    let registration = object.registration();
    if let Some(glue) = registration.tensor_glue() {
        return (glue.parts)(object.data()).ok().map(|(_, shape)| shape);
    }

    let len = object.len();
    let mut shape = vec![len];
    let Some(value_type) = registration.value_type() else {
        return Some(shape);
    };
    if len == 0 {
        shape.extend(self::shape(&ArrayObject::zeroed(&value_type))?);
        return Some(shape);
    }

    let mut inner: Option<Vec<usize>> = None;
    for i in 0..len {
        let item = object.get_item(i as isize).ok()?;
        let sub = self::shape(item.as_array()?)?;
        inner = Some(match inner {
            None => sub,
            Some(previous) => merge(previous, sub)?,
        });
    }
    shape.extend(inner.unwrap_or_default());
    Some(shape)
}

fn merge(a: Vec<usize>, b: Vec<usize>) -> Option<Vec<usize>> {
    if a.len() != b.len() {
        return None;
    }
    a.into_iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            _ if x == y => Some(x),
            (1, n) | (n, 1) => Some(n),
            _ => None,
        })
        .collect()
}

fn render(out: &mut String, object: &ArrayObject, shape: &[usize], axis: usize, digits: usize) -> Result<()> {
    out.push('[');
    let innermost = shape.len() == 1;
    for i in 0..shape[0] {
        if i > 0 {
            if innermost {
                out.push_str(", ");
            } else {
                out.push_str(",\n");
                out.extend(std::iter::repeat(' ').take(axis + 1));
            }
        }
        let item = object.get_item(i as isize)?;
        match (&item, innermost) {
            (HostValue::Array(sub), false) => render(out, sub, &shape[1..], axis + 1, digits)?,
            _ => push_leaf(out, &item, digits),
        }
    }
    out.push(']');
    Ok(())
}

fn push_leaf(out: &mut String, leaf: &HostValue, digits: usize) {
    match leaf {
        HostValue::Float(v) => out.push_str(&format_g(*v, digits)),
        other => out.push_str(&other.to_string()),
    }
}

/// `%g` formatting with `digits` significant digits.
pub fn format_g(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let precision = digits.max(1);
    if value == 0.0 {
        return if value.is_sign_negative() { "-0".into() } else { "0".into() };
    }

    // exponent after rounding to `precision` significant digits
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => (scientific.clone(), 0),
    };

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(&mantissa), sign, exponent.unsigned_abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
