//! Scalar coercions (spec §4.1's coercion table).

use ecow::EcoVec;

use super::{deref, Value};

/// Truthiness: `Null`, `false`, `0`, `0.0`, `""`, `"0"`, and the empty array
/// are falsy; everything else (including objects, always) is truthy.
pub fn to_bool(value: &Value) -> bool {
    match deref(value) {
        None => false,
        Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Int(i)) => *i != 0,
        Some(Value::Float(f)) => *f != 0.0,
        Some(Value::String(bytes)) => !(bytes.is_empty() || bytes.as_slice() == b"0"),
        Some(Value::Array(arr)) => !arr.is_empty(),
        Some(Value::Object(_)) | Some(Value::Callable(_)) => true,
        Some(Value::Reference(_)) => unreachable!("deref never returns a Reference"),
    }
}

/// Numeric-string parsing mirrors the PHP-family leading-numeric rule: parse
/// as much of a leading numeric prefix as possible, default to `0` if none.
fn leading_numeric_prefix(bytes: &[u8]) -> &str {
    let s = core::str::from_utf8(bytes).unwrap_or("");
    let trimmed = s.trim_start();
    let mut end = 0;
    let b = trimmed.as_bytes();
    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let mut seen_digit = false;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
        seen_digit = true;
        end = i;
    }
    if i < b.len() && b[i] == b'.' {
        let mut j = i + 1;
        let mut seen_frac_digit = false;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
            seen_frac_digit = true;
        }
        if seen_frac_digit || seen_digit {
            end = j;
        }
    }
    &trimmed[..end]
}

pub fn to_int(value: &Value) -> i64 {
    match deref(value) {
        None => 0,
        Some(Value::Null) => 0,
        Some(Value::Bool(b)) => *b as i64,
        Some(Value::Int(i)) => *i,
        Some(Value::Float(f)) => *f as i64,
        Some(Value::String(bytes)) => {
            let prefix = leading_numeric_prefix(bytes);
            prefix
                .parse::<i64>()
                .or_else(|_| prefix.parse::<f64>().map(|f| f as i64))
                .unwrap_or(0)
        }
        Some(Value::Array(arr)) => {
            if arr.is_empty() {
                0
            } else {
                1
            }
        }
        Some(Value::Object(_)) | Some(Value::Callable(_)) => 1,
        Some(Value::Reference(_)) => unreachable!("deref never returns a Reference"),
    }
}

pub fn to_float(value: &Value) -> f64 {
    match deref(value) {
        None => 0.0,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::Int(i)) => *i as f64,
        Some(Value::Float(f)) => *f,
        Some(Value::String(bytes)) => leading_numeric_prefix(bytes).parse::<f64>().unwrap_or(0.0),
        Some(Value::Array(arr)) => {
            if arr.is_empty() {
                0.0
            } else {
                1.0
            }
        }
        Some(Value::Object(_)) | Some(Value::Callable(_)) => 1.0,
        Some(Value::Reference(_)) => unreachable!("deref never returns a Reference"),
    }
}

fn format_float(f: f64) -> alloc::string::String {
    if f == f.trunc() && f.is_finite() && f.abs() < 1e15 {
        alloc::format!("{}", f as i64)
    } else {
        alloc::format!("{}", f)
    }
}

pub fn to_string_bytes(value: &Value) -> EcoVec<u8> {
    match deref(value) {
        None => EcoVec::new(),
        Some(Value::Null) => EcoVec::new(),
        Some(Value::Bool(b)) => EcoVec::from(if *b { &b"1"[..] } else { &b""[..] }),
        Some(Value::Int(i)) => EcoVec::from(alloc::format!("{}", i).as_bytes()),
        Some(Value::Float(f)) => EcoVec::from(format_float(*f).as_bytes()),
        Some(Value::String(bytes)) => bytes.clone(),
        Some(Value::Array(_)) => EcoVec::from(&b"Array"[..]),
        Some(Value::Object(obj)) => obj.class_name.clone(),
        Some(Value::Callable(_)) => EcoVec::from(&b"Closure"[..]),
        Some(Value::Reference(_)) => unreachable!("deref never returns a Reference"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_strings() {
        assert!(!to_bool(&Value::string_from_str("")));
        assert!(!to_bool(&Value::string_from_str("0")));
        assert!(to_bool(&Value::string_from_str("0.0")));
        assert!(to_bool(&Value::string_from_str("false")));
    }

    #[test]
    fn numeric_string_to_int_takes_leading_prefix() {
        assert_eq!(to_int(&Value::string_from_str("42abc")), 42);
        assert_eq!(to_int(&Value::string_from_str("  -7")), -7);
        assert_eq!(to_int(&Value::string_from_str("abc")), 0);
        assert_eq!(to_int(&Value::string_from_str("3.9")), 3);
    }

    #[test]
    fn float_formats_without_trailing_zero() {
        assert_eq!(to_string_bytes(&Value::Float(3.0)).as_slice(), b"3");
        assert_eq!(to_string_bytes(&Value::Float(3.5)).as_slice(), b"3.5");
    }

    #[test]
    fn bool_to_string() {
        assert_eq!(to_string_bytes(&Value::Bool(true)).as_slice(), b"1");
        assert_eq!(to_string_bytes(&Value::Bool(false)).as_slice(), b"");
    }
}
