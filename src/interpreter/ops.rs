//! Binary operator semantics over heterogeneous operands.
//!
//! Every function reports type mismatches as a `RuntimeErrorKind`; the
//! executor attaches the source position.

use std::cmp::Ordering;
use std::rc::Rc;

use super::error::RuntimeErrorKind;
use super::value::Value;

pub(super) fn add(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeErrorKind> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => {
            let mut bytes = a.as_ref().clone();
            bytes.extend_from_slice(b);
            Ok(Value::Str(Rc::new(bytes)))
        }
        (Value::List(a), Value::List(b)) => {
            let mut values = a.borrow().clone();
            values.extend(b.borrow().iter().cloned());
            Ok(Value::list(values))
        }
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Float(a + b)),
            _ => Err(unsupported("add", lhs, rhs)),
        },
    }
}

pub(super) fn sub(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeErrorKind> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(*b))),
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Float(a - b)),
            _ => Err(unsupported("subtract", lhs, rhs)),
        },
    }
}

pub(super) fn mul(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeErrorKind> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(*b))),
        (Value::Str(bytes), Value::Int(count)) => {
            let count = (*count).max(0) as usize;
            Ok(Value::string(bytes.repeat(count)))
        }
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Float(a * b)),
            _ => Err(unsupported("multiply", lhs, rhs)),
        },
    }
}

pub(super) fn div(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeErrorKind> {
    let divisor = rhs
        .as_number()
        .ok_or(RuntimeErrorKind::ExpectedNumber {
            type_name: rhs.type_name(),
        })?;
    if divisor == 0.0 {
        return Err(RuntimeErrorKind::DivisionByZero);
    }
    match (lhs, rhs) {
        // Integer division truncates toward zero.
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_div(*b))),
        _ => {
            let dividend = lhs.as_number().ok_or(RuntimeErrorKind::ExpectedNumber {
                type_name: lhs.type_name(),
            })?;
            Ok(Value::Float(dividend / divisor))
        }
    }
}

pub(super) fn rem(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeErrorKind> {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        if *b == 0 {
            return Err(RuntimeErrorKind::ModuloByZero);
        }
        // Truncated modulo: the sign follows the dividend.
        return Ok(Value::Int(a.wrapping_rem(*b)));
    }
    let divisor = rhs.as_number().ok_or(RuntimeErrorKind::ExpectedNumber {
        type_name: rhs.type_name(),
    })?;
    if divisor == 0.0 {
        return Err(RuntimeErrorKind::ModuloByZero);
    }
    let dividend = lhs.as_number().ok_or(RuntimeErrorKind::ExpectedNumber {
        type_name: lhs.type_name(),
    })?;
    Ok(Value::Float(dividend % divisor))
}

pub(super) fn pow(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeErrorKind> {
    match (lhs, rhs) {
        (Value::Int(base), Value::Int(exponent)) if *base >= 0 && *exponent >= 0 => {
            let mut result: i64 = 1;
            let mut base = *base;
            let mut exponent = *exponent;
            while exponent > 0 {
                if exponent % 2 == 1 {
                    result = result.wrapping_mul(base);
                }
                base = base.wrapping_mul(base);
                exponent /= 2;
            }
            Ok(Value::Int(result))
        }
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Float(a.powf(b))),
            _ => Err(unsupported("exponentiate", lhs, rhs)),
        },
    }
}

/// Ordering for `<` `<=` `>` `>=`: numeric pairs widen to float, string
/// pairs compare lexicographically by bytes, all other pairings fail.
pub(super) fn compare(lhs: &Value, rhs: &Value) -> Result<Ordering, RuntimeErrorKind> {
    if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal));
    }
    if let (Value::Str(a), Value::Str(b)) = (lhs, rhs) {
        return Ok(a.as_ref().cmp(b.as_ref()));
    }
    Err(unsupported("compare", lhs, rhs))
}

fn unsupported(op: &'static str, lhs: &Value, rhs: &Value) -> RuntimeErrorKind {
    RuntimeErrorKind::UnsupportedOperands {
        op,
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    }
}
