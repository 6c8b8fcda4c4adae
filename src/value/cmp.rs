//! Loose (`==`), strict (`===`), and three-way (`<=>`) comparison
//! (spec §4.1), following the PHP/Zend-family rules this value model is
//! shaped on.

use core::cmp::Ordering;

use super::{deref, to_float, Value};

/// `===`: same type, same value, no coercion. Arrays are identical when
/// they hold the same keys in the same order with identical values.
/// Objects are identical when they carry the same class and the same
/// property values in the same declared order (this crate has no object
/// heap/identity pointer — see spec §9, "compiler never embeds runtime
/// cycles in constants").
pub fn identical(lhs: &Value, rhs: &Value) -> bool {
    match (deref(lhs), deref(rhs)) {
        (Some(Value::Null), Some(Value::Null)) => true,
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a == b,
        (Some(Value::Int(a)), Some(Value::Int(b))) => a == b,
        (Some(Value::Float(a)), Some(Value::Float(b))) => a == b,
        (Some(Value::String(a)), Some(Value::String(b))) => a == b,
        (Some(Value::Array(a)), Some(Value::Array(b))) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && identical(va, vb))
        }
        (Some(Value::Object(a)), Some(Value::Object(b))) => {
            a.class_name == b.class_name
                && a.properties()
                    .zip(b.properties())
                    .all(|((na, va), (nb, vb))| na == nb && identical(va, vb))
        }
        (Some(Value::Callable(a)), Some(Value::Callable(b))) => a == b,
        _ => false,
    }
}

/// `==`: coercing equality.
pub fn equal(lhs: &Value, rhs: &Value) -> bool {
    match (deref(lhs), deref(rhs)) {
        (Some(Value::Null), Some(Value::Null)) => true,
        (Some(Value::Null), Some(_)) | (Some(_), Some(Value::Null)) => false,
        (Some(Value::Bool(_)), Some(_)) | (Some(_), Some(Value::Bool(_))) => {
            super::to_bool(deref(lhs).unwrap()) == super::to_bool(deref(rhs).unwrap())
        }
        (Some(Value::Array(a)), Some(Value::Array(b))) => a == b,
        (Some(Value::Array(_)), Some(_)) | (Some(_), Some(Value::Array(_))) => false,
        (Some(Value::Object(a)), Some(Value::Object(b))) => {
            a.class_name == b.class_name
                && a.properties().count() == b.properties().count()
                && a.properties()
                    .zip(b.properties())
                    .all(|((na, va), (nb, vb))| na == nb && equal(va, vb))
        }
        (Some(Value::Object(_)), Some(_)) | (Some(_), Some(Value::Object(_))) => false,
        (Some(Value::Int(a)), Some(Value::Int(b))) => a == b,
        (Some(Value::Int(_)), Some(Value::Float(_))) | (Some(Value::Float(_)), Some(Value::Int(_))) | (Some(Value::Float(_)), Some(Value::Float(_))) => {
            to_float(deref(lhs).unwrap()) == to_float(deref(rhs).unwrap())
        }
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (as_numeric(a), as_numeric(b)) {
                (Some(na), Some(nb)) => na == nb,
                _ => a == b,
            }
        }
        (Some(Value::String(s)), Some(num @ (Value::Int(_) | Value::Float(_))))
        | (Some(num @ (Value::Int(_) | Value::Float(_))), Some(Value::String(s))) => match as_numeric(s) {
            Some(n) => n == to_float(num),
            None => false,
        },
        (Some(Value::Callable(a)), Some(Value::Callable(b))) => a == b,
        _ => false,
    }
}

fn as_numeric(bytes: &[u8]) -> Option<f64> {
    core::str::from_utf8(bytes).ok()?.trim().parse::<f64>().ok()
}

/// `<=>`: three-way comparison, `None` when the operands are incomparable
/// (e.g. array vs scalar).
pub fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (deref(lhs), deref(rhs)) {
        (Some(Value::Null), Some(Value::Null)) => Some(Ordering::Equal),
        // "Null is less than anything non-Null" (spec §4.1).
        (Some(Value::Null), Some(_)) => Some(Ordering::Less),
        (Some(_), Some(Value::Null)) => Some(Ordering::Greater),
        (Some(Value::Array(a)), Some(Value::Array(b))) => {
            if a.len() != b.len() {
                return a.len().partial_cmp(&b.len());
            }
            for (key, va) in a.iter() {
                match b.get(key) {
                    Some(vb) => {
                        let ord = compare(va, vb)?;
                        if ord != Ordering::Equal {
                            return Some(ord);
                        }
                    }
                    None => return None,
                }
            }
            Some(Ordering::Equal)
        }
        (Some(Value::Array(_)), Some(_)) | (Some(_), Some(Value::Array(_))) => None,
        (Some(Value::String(a)), Some(Value::String(b))) => match (as_numeric(a), as_numeric(b)) {
            (Some(na), Some(nb)) => na.partial_cmp(&nb),
            _ => Some(a.as_slice().cmp(b.as_slice())),
        },
        _ => {
            let a = to_float(deref(lhs).unwrap());
            let b = to_float(deref(rhs).unwrap());
            a.partial_cmp(&b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::VesperArray;

    #[test]
    fn null_equals_only_null() {
        // spec §4.1: "Null-vs-anything → false unless both Null."
        assert!(equal(&Value::Null, &Value::Null));
        assert!(!equal(&Value::Null, &Value::Bool(false)));
        assert!(!equal(&Value::Null, &Value::Int(0)));
        assert!(!equal(&Value::Null, &Value::Int(1)));
    }

    #[test]
    fn null_is_less_than_anything_non_null() {
        assert_eq!(compare(&Value::Null, &Value::Int(-5)), Some(Ordering::Less));
        assert_eq!(compare(&Value::Null, &Value::string_from_str("abc")), Some(Ordering::Less));
        assert_eq!(compare(&Value::Int(-5), &Value::Null), Some(Ordering::Greater));
        assert_eq!(compare(&Value::Null, &Value::Null), Some(Ordering::Equal));
    }

    #[test]
    fn numeric_string_equals_number() {
        assert!(equal(&Value::string_from_str("42"), &Value::Int(42)));
        assert!(!equal(&Value::string_from_str("abc"), &Value::Int(0)));
    }

    #[test]
    fn identical_requires_same_type() {
        assert!(!identical(&Value::Int(1), &Value::Float(1.0)));
        assert!(identical(&Value::Int(1), &Value::Int(1)));
    }

    #[test]
    fn compare_orders_arrays_by_length_first() {
        let mut a = VesperArray::new();
        a.push(Value::Int(1));
        let mut b = VesperArray::new();
        b.push(Value::Int(1));
        b.push(Value::Int(2));
        assert_eq!(compare(&Value::Array(a), &Value::Array(b)), Some(Ordering::Less));
    }

    #[test]
    fn compare_numeric_strings_numerically() {
        assert_eq!(
            compare(&Value::string_from_str("10"), &Value::string_from_str("9")),
            Some(Ordering::Greater)
        );
    }
}
