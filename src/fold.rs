//! Compile-time constant folding of literals (spec, closing section of §4).
//!
//! Parameter defaults, class constants, enum cases, static properties, and
//! certain array keys must fold `{Null, Bool, Int, Float, String}`
//! literals. Non-foldable parameter defaults fold to `Null` with a
//! non-fatal diagnostic, logged via `tracing::warn!` rather than returned
//! as a `CompileError` (spec: "Non-foldable expressions produce Null with
//! a diagnostic (not fatal) for parameter defaults").

use crate::ast::Expr;
use crate::value::Value;

/// Attempts to fold `expr` into a compile-time `Value`. Only the literal
/// forms spec lists are foldable; anything else returns `None`.
pub fn try_fold(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::NullLiteral { .. } => Some(Value::Null),
        Expr::BoolLiteral { value, .. } => Some(Value::Bool(*value)),
        Expr::IntLiteral { value, .. } => Some(Value::Int(*value)),
        Expr::FloatLiteral { value, .. } => Some(Value::Float(*value)),
        Expr::StringLiteral { value, .. } => Some(Value::string_from_str(value)),
        Expr::UnaryOp { op, operand, .. } => fold_unary(op, operand),
        _ => None,
    }
}

fn fold_unary(op: &crate::ast::UnaryOperator, operand: &Expr) -> Option<Value> {
    use crate::ast::UnaryOperator::*;
    let value = try_fold(operand)?;
    match (op, value) {
        (Minus, Value::Int(i)) => Some(Value::Int(i.wrapping_neg())),
        (Minus, Value::Float(f)) => Some(Value::Float(-f)),
        (Plus, value @ (Value::Int(_) | Value::Float(_))) => Some(value),
        (Not, value) => Some(Value::Bool(!crate::value::to_bool(&value))),
        (BwNot, Value::Int(i)) => Some(Value::Int(!i)),
        _ => None,
    }
}

/// Folds a parameter default, falling back to `Null` with a non-fatal
/// `tracing::warn!` diagnostic when the expression is not a compile-time
/// constant.
pub fn fold_parameter_default(expr: &Expr, parameter_name: &str, line: u32) -> Value {
    match try_fold(expr) {
        Some(value) => value,
        None => {
            tracing::warn!(
                parameter = parameter_name,
                line,
                "parameter default is not a compile-time constant; folding to Null"
            );
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::UnaryOperator;

    #[test]
    fn folds_literals() {
        assert_eq!(try_fold(&Expr::IntLiteral { value: 5, line: 1 }), Some(Value::Int(5)));
        assert_eq!(
            try_fold(&Expr::StringLiteral { value: "hi".into(), line: 1 }),
            Some(Value::string_from_str("hi"))
        );
    }

    #[test]
    fn folds_unary_minus_on_int_literal() {
        let expr = Expr::UnaryOp {
            op: UnaryOperator::Minus,
            operand: alloc::boxed::Box::new(Expr::IntLiteral { value: 5, line: 1 }),
            line: 1,
        };
        assert_eq!(try_fold(&expr), Some(Value::Int(-5)));
    }

    #[test]
    fn non_foldable_parameter_default_becomes_null() {
        let expr = Expr::Variable { name: "x".into(), line: 1 };
        assert_eq!(fold_parameter_default(&expr, "p", 1), Value::Null);
    }

    #[test]
    fn non_literal_expression_does_not_fold() {
        let expr = Expr::Variable { name: "x".into(), line: 1 };
        assert_eq!(try_fold(&expr), None);
    }
}
