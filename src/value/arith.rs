//! Binary arithmetic/bitwise/concatenation operators (spec §4.1).
//!
//! Grounded on the teacher's `evaluator/operators.rs` free-function style
//! (`eval_binary_int`/`eval_binary_float`, `Result<_, EvalError>`, wrapping
//! integer arithmetic) generalized to this crate's dynamically-typed
//! `Value` and its PHP-family coercion/promotion rules.

use core::fmt;

use ecow::EcoVec;

use super::{deref, to_float, to_int, to_string_bytes, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithError {
    DivisionByZero,
    /// `+` between an array and a non-array (arrays only union with arrays).
    ArrayUnionTypeMismatch,
}

impl fmt::Display for ArithError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithError::DivisionByZero => "division by zero",
            ArithError::ArrayUnionTypeMismatch => "cannot union an array with a non-array",
        };
        write!(f, "{}", s)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ArithError {}

/// Whether a value is *exactly* an integer after dereferencing — used to
/// decide int-vs-float promotion, not for general truthiness/coercion.
fn is_exact_int(value: &Value) -> Option<i64> {
    match deref(value)? {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(*b as i64),
        Value::Null => Some(0),
        _ => None,
    }
}

pub fn eval(op: ArithOp, lhs: &Value, rhs: &Value) -> Result<Value, ArithError> {
    match op {
        ArithOp::Add => {
            if let (Some(Value::Array(l)), Some(Value::Array(r))) = (deref(lhs), deref(rhs)) {
                return Ok(Value::Array(l.union(r)));
            }
            if matches!(deref(lhs), Some(Value::Array(_))) || matches!(deref(rhs), Some(Value::Array(_))) {
                return Err(ArithError::ArrayUnionTypeMismatch);
            }
            Ok(numeric_op(lhs, rhs, |a, b| a.wrapping_add(b), |a, b| a + b))
        }
        ArithOp::Sub => Ok(numeric_op(lhs, rhs, |a, b| a.wrapping_sub(b), |a, b| a - b)),
        ArithOp::Mul => Ok(numeric_op(lhs, rhs, |a, b| a.wrapping_mul(b), |a, b| a * b)),
        ArithOp::Div => {
            if let (Some(l), Some(r)) = (is_exact_int(lhs), is_exact_int(rhs)) {
                if r == 0 {
                    return Err(ArithError::DivisionByZero);
                }
                if l % r == 0 {
                    return Ok(Value::Int(l.wrapping_div(r)));
                }
                return Ok(Value::Float(l as f64 / r as f64));
            }
            let r = to_float(rhs);
            if r == 0.0 {
                return Err(ArithError::DivisionByZero);
            }
            Ok(Value::Float(to_float(lhs) / r))
        }
        ArithOp::Mod => {
            // spec §4.1: "modulo by zero yields int 0 (fatal left to
            // caller)" — unlike `/`, this is not `DivisionByZero` here.
            let r = to_int(rhs);
            if r == 0 {
                return Ok(Value::Int(0));
            }
            Ok(Value::Int(to_int(lhs).wrapping_rem(r)))
        }
        ArithOp::Pow => {
            if let (Some(l), Some(r)) = (is_exact_int(lhs), is_exact_int(rhs)) {
                if r >= 0 && r <= u32::MAX as i64 {
                    return Ok(Value::Int(l.wrapping_pow(r as u32)));
                }
            }
            Ok(Value::Float(to_float(lhs).powf(to_float(rhs))))
        }
        ArithOp::Concat => {
            let mut bytes = EcoVec::from(to_string_bytes(lhs).as_slice());
            bytes.extend_from_slice(&to_string_bytes(rhs));
            Ok(Value::String(bytes))
        }
        ArithOp::BitAnd => Ok(Value::Int(to_int(lhs) & to_int(rhs))),
        ArithOp::BitOr => Ok(Value::Int(to_int(lhs) | to_int(rhs))),
        ArithOp::BitXor => Ok(Value::Int(to_int(lhs) ^ to_int(rhs))),
        ArithOp::Shl => Ok(Value::Int(to_int(lhs).wrapping_shl(to_int(rhs) as u32))),
        ArithOp::Shr => Ok(Value::Int(to_int(lhs).wrapping_shr(to_int(rhs) as u32))),
    }
}

/// int-op if both operands are exact ints, else promotes both to float
/// (spec §4.1: "float promotion ... unless exact").
fn numeric_op(lhs: &Value, rhs: &Value, int_op: impl Fn(i64, i64) -> i64, float_op: impl Fn(f64, f64) -> f64) -> Value {
    if let (Some(l), Some(r)) = (is_exact_int(lhs), is_exact_int(rhs)) {
        Value::Int(int_op(l, r))
    } else {
        Value::Float(float_op(to_float(lhs), to_float(rhs)))
    }
}
