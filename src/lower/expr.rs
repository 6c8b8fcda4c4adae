//! Expression lowering (spec §4.5, §4.5.1).
//!
//! Every lowering function returns the [`TempId`] holding its result
//! directly, rather than relying on the spec's optional "most-recent
//! temporary" convention (spec §9: "`emitMove` ... an implementer may drop
//! the no-op and pass temporary indices explicitly"). This is the one
//! point where this crate deliberately departs from a literal reading of
//! §4.5 in favor of ordinary explicit data flow — the same choice the
//! teacher's `TreeTransformer::transform` makes by returning the pushed
//! stack depth instead of consulting implicit state.

use crate::ast::{ArrayItem, BinaryOperator, CastKind, CompoundOperator, Expr, IncDecOperator, IncludeKind, ListElement, ListPattern, MagicConstant, UnaryOperator};
use crate::context::{CompileContext, TempId};
use crate::error::{CompileError, ErrorKind};
use crate::instruction::{Instruction, OperandType};
use crate::opcode::Opcode;
use crate::value::Value;
use crate::{format, Vec};

fn binary_opcode(op: BinaryOperator) -> Opcode {
    use BinaryOperator::*;
    match op {
        Add => Opcode::Add,
        Sub => Opcode::Sub,
        Mul => Opcode::Mul,
        Div => Opcode::Div,
        Mod => Opcode::Mod,
        Pow => Opcode::Pow,
        Concat => Opcode::Concat,
        BwAnd => Opcode::BwAnd,
        BwOr => Opcode::BwOr,
        BwXor => Opcode::BwXor,
        Shl => Opcode::Shl,
        Shr => Opcode::Shr,
        IsEqual => Opcode::IsEqual,
        IsNotEqual => Opcode::IsNotEqual,
        IsIdentical => Opcode::IsIdentical,
        IsNotIdentical => Opcode::IsNotIdentical,
        IsSmaller => Opcode::IsSmaller,
        IsSmallerOrEqual => Opcode::IsSmallerOrEqual,
        IsGreater => Opcode::IsGreater,
        IsGreaterOrEqual => Opcode::IsGreaterOrEqual,
        Spaceship => Opcode::Spaceship,
        BooleanAnd => Opcode::BooleanAnd,
        BooleanOr => Opcode::BooleanOr,
        LogicalAnd => Opcode::LogicalAnd,
        LogicalOr => Opcode::LogicalOr,
        LogicalXor => Opcode::LogicalXor,
    }
}

fn compound_opcode(op: CompoundOperator) -> Opcode {
    use CompoundOperator::*;
    match op {
        Add => Opcode::AssignAdd,
        Sub => Opcode::AssignSub,
        Mul => Opcode::AssignMul,
        Div => Opcode::AssignDiv,
        Mod => Opcode::AssignMod,
        Pow => Opcode::AssignPow,
        BwAnd => Opcode::AssignBwAnd,
        BwOr => Opcode::AssignBwOr,
        BwXor => Opcode::AssignBwXor,
        Shl => Opcode::AssignShl,
        Shr => Opcode::AssignShr,
        Concat => Opcode::AssignConcat,
        Coalesce => Opcode::AssignCoalesce,
    }
}

fn cast_opcode(kind: CastKind) -> Option<Opcode> {
    match kind {
        CastKind::Bool => Some(Opcode::CastBool),
        CastKind::Int => Some(Opcode::CastLong),
        CastKind::Float => Some(Opcode::CastDouble),
        CastKind::String => Some(Opcode::CastString),
        CastKind::Array => Some(Opcode::CastArray),
        CastKind::Object => Some(Opcode::CastObject),
        CastKind::Unset => None,
    }
}

/// An addressable write target: a variable slot, or a write-handle
/// produced by a `FETCH_*_W`/`FETCH_*_RW` opcode (array element, object
/// property, static property).
#[derive(Clone, Copy)]
enum LValue {
    Variable(u32),
    Handle(TempId),
}

impl LValue {
    fn operand(self) -> (OperandType, u32) {
        match self {
            LValue::Variable(slot) => (OperandType::LocalVariable, slot),
            LValue::Handle(temp) => (OperandType::Temporary, temp),
        }
    }
}

/// Lowers an identifier-shaped name (array key, property name) to a
/// constant operand when it is a literal, else to a temporary (teacher's
/// `compiler/bytecode.rs` "Index with constant-index optimization",
/// generalized to property names too).
pub(crate) fn lower_name_operand(ctx: &mut CompileContext, expr: &Expr) -> Result<(OperandType, u32), CompileError> {
    match expr {
        Expr::StringLiteral { value, .. } => {
            let index = ctx.add_constant(Value::string_from_str(value));
            Ok((OperandType::Constant, index))
        }
        Expr::IntLiteral { value, .. } => {
            let index = ctx.add_constant(Value::Int(*value));
            Ok((OperandType::Constant, index))
        }
        _ => {
            let temp = lower_expr(ctx, expr)?;
            Ok((OperandType::Temporary, temp))
        }
    }
}

fn lower_lvalue(ctx: &mut CompileContext, target: &Expr, fetch_array: Opcode, fetch_prop: Opcode, fetch_static: Opcode) -> Result<LValue, CompileError> {
    match target {
        Expr::Variable { name, .. } => Ok(LValue::Variable(ctx.scopes.get_or_create(name))),
        Expr::Index { array, index, line } => {
            let (array_type, array_value) = {
                let t = lower_expr(ctx, array)?;
                (OperandType::Temporary, t)
            };
            let (index_type, index_value) = match index {
                Some(index_expr) => lower_name_operand(ctx, index_expr)?,
                None => (OperandType::Unused, 0),
            };
            let _ = line;
            let handle = ctx.next_temp();
            ctx.emit(Instruction::new(fetch_array, array_type, array_value, index_type, index_value, OperandType::Temporary, handle));
            Ok(LValue::Handle(handle))
        }
        Expr::PropertyAccess { object, property, .. } => {
            let object_temp = lower_expr(ctx, object)?;
            let (prop_type, prop_value) = lower_name_operand(ctx, property)?;
            let handle = ctx.next_temp();
            ctx.emit(Instruction::new(fetch_prop, OperandType::Temporary, object_temp, prop_type, prop_value, OperandType::Temporary, handle));
            Ok(LValue::Handle(handle))
        }
        Expr::StaticPropertyAccess { class_name, property, .. } => {
            let class_const = ctx.add_constant(Value::string_from_str(class_name));
            let prop_const = ctx.add_constant(Value::string_from_str(property));
            let handle = ctx.next_temp();
            ctx.emit(Instruction::new(fetch_static, OperandType::Constant, class_const, OperandType::Constant, prop_const, OperandType::Temporary, handle));
            Ok(LValue::Handle(handle))
        }
        _ => Err(CompileError::new(ErrorKind::InvalidAssignmentTarget, target.line(), "expression is not assignable")),
    }
}

fn lower_write_lvalue(ctx: &mut CompileContext, target: &Expr) -> Result<LValue, CompileError> {
    lower_lvalue(ctx, target, Opcode::FetchDimW, Opcode::FetchObjW, Opcode::FetchStaticPropW)
}

fn lower_readwrite_lvalue(ctx: &mut CompileContext, target: &Expr) -> Result<LValue, CompileError> {
    lower_lvalue(ctx, target, Opcode::FetchDimRw, Opcode::FetchObjRw, Opcode::FetchStaticPropRw)
}

/// Lowers `expr` and returns the temporary holding its value (spec §4.5).
pub fn lower_expr(ctx: &mut CompileContext, expr: &Expr) -> Result<TempId, CompileError> {
    match expr {
        Expr::NullLiteral { .. } => {
            let index = ctx.add_constant(Value::Null);
            let result = ctx.next_temp();
            ctx.emit_qm_assign(OperandType::Constant, index, result);
            Ok(result)
        }
        Expr::BoolLiteral { value, .. } => {
            let index = ctx.add_constant(Value::Bool(*value));
            let result = ctx.next_temp();
            ctx.emit_qm_assign(OperandType::Constant, index, result);
            Ok(result)
        }
        Expr::IntLiteral { value, .. } => {
            let index = ctx.add_constant(Value::Int(*value));
            let result = ctx.next_temp();
            ctx.emit_qm_assign(OperandType::Constant, index, result);
            Ok(result)
        }
        Expr::FloatLiteral { value, .. } => {
            let index = ctx.add_constant(Value::Float(*value));
            let result = ctx.next_temp();
            ctx.emit_qm_assign(OperandType::Constant, index, result);
            Ok(result)
        }
        Expr::StringLiteral { value, .. } => {
            let index = ctx.add_constant(Value::string_from_str(value));
            let result = ctx.next_temp();
            ctx.emit_qm_assign(OperandType::Constant, index, result);
            Ok(result)
        }
        Expr::Variable { name, .. } => {
            let slot = ctx.scopes.get_or_create(name);
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::FetchR, OperandType::LocalVariable, slot, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::BinaryOp { op, left, right, .. } => {
            let left_temp = lower_expr(ctx, left)?;
            let right_temp = lower_expr(ctx, right)?;
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(binary_opcode(*op), OperandType::Temporary, left_temp, OperandType::Temporary, right_temp, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::UnaryOp { op, operand, .. } => {
            let operand_temp = lower_expr(ctx, operand)?;
            let opcode = match op {
                UnaryOperator::Plus => Opcode::Plus,
                UnaryOperator::Minus => Opcode::Minus,
                UnaryOperator::Not => Opcode::Not,
                UnaryOperator::BwNot => Opcode::BwNot,
            };
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(opcode, OperandType::Temporary, operand_temp, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::IncDec { op, target, prefix, line } => {
            let handle = lower_readwrite_lvalue(ctx, target)?;
            let (handle_type, handle_value) = handle.operand();
            let opcode = match (op, prefix) {
                (IncDecOperator::Increment, true) => Opcode::PreInc,
                (IncDecOperator::Decrement, true) => Opcode::PreDec,
                (IncDecOperator::Increment, false) => Opcode::PostInc,
                (IncDecOperator::Decrement, false) => Opcode::PostDec,
            };
            let _ = line;
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(opcode, handle_type, handle_value, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::Assign { target, value, .. } => {
            let value_temp = lower_expr(ctx, value)?;
            let handle = lower_write_lvalue(ctx, target)?;
            let (handle_type, handle_value) = handle.operand();
            ctx.emit(Instruction::new(Opcode::Assign, OperandType::Temporary, value_temp, OperandType::Unused, 0, handle_type, handle_value));
            Ok(value_temp)
        }
        Expr::AssignRef { target, value, .. } => {
            let value_handle = lower_write_lvalue(ctx, value)?;
            let (value_type, value_value) = value_handle.operand();
            let target_handle = lower_write_lvalue(ctx, target)?;
            let (target_type, target_value) = target_handle.operand();
            ctx.emit(Instruction::new(Opcode::AssignRef, value_type, value_value, OperandType::Unused, 0, target_type, target_value));
            let result = ctx.next_temp();
            ctx.emit_qm_assign(value_type, value_value, result);
            Ok(result)
        }
        Expr::CompoundAssign { op, target, value, .. } => {
            let value_temp = lower_expr(ctx, value)?;
            let handle = lower_readwrite_lvalue(ctx, target)?;
            let (handle_type, handle_value) = handle.operand();
            ctx.emit(Instruction::new(compound_opcode(*op), handle_type, handle_value, OperandType::Temporary, value_temp, handle_type, handle_value));
            let result = ctx.next_temp();
            ctx.emit_qm_assign(handle_type, handle_value, result);
            Ok(result)
        }
        Expr::ListAssign { pattern, value, line } => {
            let value_temp = lower_expr(ctx, value)?;
            lower_list_pattern(ctx, pattern, value_temp, *line)?;
            Ok(value_temp)
        }
        Expr::ArrayLiteral { items, .. } => lower_array_literal(ctx, items),
        Expr::Index { array, index, .. } => {
            let array_temp = lower_expr(ctx, array)?;
            let (index_type, index_value) = match index {
                Some(index_expr) => lower_name_operand(ctx, index_expr)?,
                None => (OperandType::Unused, 0),
            };
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::FetchDimR, OperandType::Temporary, array_temp, index_type, index_value, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::PropertyAccess { object, property, .. } => {
            let object_temp = lower_expr(ctx, object)?;
            let (prop_type, prop_value) = lower_name_operand(ctx, property)?;
            let result = ctx.next_temp();
            // Nullsafe (`?->`) lowers to a plain FETCH_OBJ_R in this
            // specification; short-circuit-on-null is the execution
            // engine's responsibility (spec §9).
            ctx.emit(Instruction::new(Opcode::FetchObjR, OperandType::Temporary, object_temp, prop_type, prop_value, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::StaticPropertyAccess { class_name, property, .. } => {
            let class_const = ctx.add_constant(Value::string_from_str(class_name));
            let prop_const = ctx.add_constant(Value::string_from_str(property));
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::FetchStaticPropR, OperandType::Constant, class_const, OperandType::Constant, prop_const, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::ClassConstant { class_name, constant, .. } => {
            let class_const = ctx.add_constant(Value::string_from_str(class_name));
            let name_const = ctx.add_constant(Value::string_from_str(constant));
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::FetchConstant, OperandType::Constant, class_const, OperandType::Constant, name_const, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::Call { callee, arguments, .. } => {
            let callee_temp = lower_expr(ctx, callee)?;
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::InitFcall, OperandType::Temporary, callee_temp, OperandType::Constant, 0, OperandType::Unused, 0));
            lower_call_arguments(ctx, arguments)?;
            ctx.emit(Instruction::new(Opcode::DoFcall, OperandType::Unused, 0, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::MethodCall { object, method, arguments, .. } => {
            let object_temp = lower_expr(ctx, object)?;
            let method_const = ctx.add_constant(Value::string_from_str(method));
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::InitMethodCall, OperandType::Temporary, object_temp, OperandType::Constant, method_const, OperandType::Unused, 0));
            lower_call_arguments(ctx, arguments)?;
            ctx.emit(Instruction::new(Opcode::DoFcall, OperandType::Unused, 0, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::StaticMethodCall { class_name, method, arguments, .. } => {
            let class_const = ctx.add_constant(Value::string_from_str(class_name));
            let method_const = ctx.add_constant(Value::string_from_str(method));
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::InitStaticMethodCall, OperandType::Constant, class_const, OperandType::Constant, method_const, OperandType::Unused, 0));
            lower_call_arguments(ctx, arguments)?;
            ctx.emit(Instruction::new(Opcode::DoFcall, OperandType::Unused, 0, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::New { class_name, arguments, .. } => {
            let class_const = ctx.add_constant(Value::string_from_str(class_name));
            let result = ctx.next_temp();
            lower_call_arguments(ctx, arguments)?;
            ctx.emit(Instruction::new(Opcode::New, OperandType::Constant, class_const, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::Clone { object, .. } => {
            let object_temp = lower_expr(ctx, object)?;
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::Clone, OperandType::Temporary, object_temp, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::Ternary { condition, if_true, if_false, line } => lower_ternary(ctx, condition, if_true.as_deref(), if_false, *line),
        Expr::NullCoalesce { left, right, line } => lower_null_coalesce(ctx, left, right, *line),
        Expr::Match { discriminant, arms, default, line } => lower_match(ctx, discriminant, arms, default.as_deref(), *line),
        Expr::Cast { kind, operand, line } => {
            let operand_temp = lower_expr(ctx, operand)?;
            match cast_opcode(*kind) {
                Some(opcode) => {
                    let result = ctx.next_temp();
                    ctx.emit(Instruction::new(opcode, OperandType::Temporary, operand_temp, OperandType::Unused, 0, OperandType::Temporary, result));
                    Ok(result)
                }
                None => {
                    // `(unset)` cast assigns Null (spec §4.5).
                    let _ = line;
                    let null_const = ctx.add_constant(Value::Null);
                    let result = ctx.next_temp();
                    ctx.emit_qm_assign(OperandType::Constant, null_const, result);
                    Ok(result)
                }
            }
        }
        Expr::Isset { targets, line } => lower_isset(ctx, targets, *line),
        Expr::Empty { target, line } => {
            let inner = lower_isset(ctx, core::slice::from_ref(target.as_ref()), *line)?;
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::Not, OperandType::Temporary, inner, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::ErrorSuppress { expr, .. } => {
            let level_temp = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::BeginSilence, OperandType::Unused, 0, OperandType::Unused, 0, OperandType::Temporary, level_temp));
            let inner = lower_expr(ctx, expr)?;
            ctx.emit(Instruction::new(Opcode::EndSilence, OperandType::Temporary, level_temp, OperandType::Unused, 0, OperandType::Unused, 0));
            Ok(inner)
        }
        Expr::Exit { argument, .. } => {
            let (arg_type, arg_value) = match argument {
                Some(arg) => (OperandType::Temporary, lower_expr(ctx, arg)?),
                None => (OperandType::Unused, 0),
            };
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::Exit, arg_type, arg_value, OperandType::Unused, 0, OperandType::Unused, 0));
            Ok(result)
        }
        Expr::Eval { argument, .. } => {
            let arg_temp = lower_expr(ctx, argument)?;
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::Eval, OperandType::Temporary, arg_temp, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::Include { kind, argument, .. } => {
            let arg_temp = lower_expr(ctx, argument)?;
            let opcode = match kind {
                IncludeKind::Include => Opcode::Include,
                IncludeKind::IncludeOnce => Opcode::IncludeOnce,
                IncludeKind::Require => Opcode::Require,
                IncludeKind::RequireOnce => Opcode::RequireOnce,
            };
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(opcode, OperandType::Temporary, arg_temp, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::Yield { key, value, .. } => {
            let (key_type, key_value) = match key {
                Some(k) => (OperandType::Temporary, lower_expr(ctx, k)?),
                None => (OperandType::Unused, 0),
            };
            let (value_type, value_value) = match value {
                Some(v) => (OperandType::Temporary, lower_expr(ctx, v)?),
                None => (OperandType::Unused, 0),
            };
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::Yield, key_type, key_value, value_type, value_value, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::YieldFrom { argument, .. } => {
            let arg_temp = lower_expr(ctx, argument)?;
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::YieldFrom, OperandType::Temporary, arg_temp, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::ThrowExpr { argument, .. } => {
            let arg_temp = lower_expr(ctx, argument)?;
            ctx.emit(Instruction::new(Opcode::Throw, OperandType::Temporary, arg_temp, OperandType::Unused, 0, OperandType::Unused, 0));
            Ok(arg_temp)
        }
        Expr::Magic { kind, line } => lower_magic(ctx, *kind, *line),
        Expr::Instanceof { left, right, .. } => {
            let left_temp = lower_expr(ctx, left)?;
            let (right_type, right_value) = lower_name_operand(ctx, right)?;
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::Instanceof, OperandType::Temporary, left_temp, right_type, right_value, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::Print { argument, .. } => {
            let arg_temp = lower_expr(ctx, argument)?;
            ctx.emit(Instruction::new(Opcode::Echo, OperandType::Temporary, arg_temp, OperandType::Unused, 0, OperandType::Unused, 0));
            let one_const = ctx.add_constant(Value::Int(1));
            let result = ctx.next_temp();
            ctx.emit_qm_assign(OperandType::Constant, one_const, result);
            Ok(result)
        }
        Expr::Spread { line, .. } => Err(CompileError::new(ErrorKind::UnsupportedConstruct, *line, "spread is only valid inside an array literal or call argument list")),
        Expr::ArrowFunction { line, .. } | Expr::AnonymousFunction { line, .. } => {
            let function_id = crate::lower::decl::lower_closure(ctx, expr)?;
            let const_index = ctx.add_constant(Value::Int(function_id as i64));
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::CreateClosure, OperandType::Constant, const_index, OperandType::Unused, 0, OperandType::Temporary, result));
            let _ = line;
            Ok(result)
        }
        Expr::ShellExec { line } => Err(CompileError::new(ErrorKind::UnsupportedConstruct, *line, "shell-exec is not supported")),
        Expr::FirstClassCallable { line, .. } => Err(CompileError::new(ErrorKind::UnsupportedConstruct, *line, "first-class callable syntax is not supported")),
    }
}

fn lower_array_literal(ctx: &mut CompileContext, items: &[ArrayItem]) -> Result<TempId, CompileError> {
    let result = ctx.next_temp();
    ctx.emit(Instruction::new(Opcode::InitArray, OperandType::Unused, 0, OperandType::Unused, 0, OperandType::Temporary, result));
    for item in items {
        if item.spread {
            let value_temp = lower_expr(ctx, &item.value)?;
            ctx.emit(Instruction::new(Opcode::AddArrayUnpack, OperandType::Temporary, value_temp, OperandType::Unused, 0, OperandType::Temporary, result));
            continue;
        }
        let value_temp = lower_expr(ctx, &item.value)?;
        let (key_type, key_value) = match &item.key {
            Some(key_expr) => lower_name_operand(ctx, key_expr)?,
            None => (OperandType::Unused, 0),
        };
        ctx.emit(Instruction::new(Opcode::AddArrayElement, OperandType::Temporary, value_temp, key_type, key_value, OperandType::Temporary, result));
    }
    Ok(result)
}

fn lower_call_arguments(ctx: &mut CompileContext, arguments: &[ArrayItem]) -> Result<(), CompileError> {
    for argument in arguments {
        let value_temp = lower_expr(ctx, &argument.value)?;
        let opcode = if argument.spread { Opcode::SendUnpack } else if argument.by_reference { Opcode::SendRef } else { Opcode::SendVal };
        ctx.emit(Instruction::new(opcode, OperandType::Temporary, value_temp, OperandType::Unused, 0, OperandType::Unused, 0));
    }
    Ok(())
}

/// `c ? a : b` and its Elvis form `c ?: b` (spec §4.5). Elvis reuses the
/// already-computed condition temporary as `a`, matching PHP's
/// single-evaluation semantics for the shorthand form.
fn lower_ternary(ctx: &mut CompileContext, condition: &Expr, if_true: Option<&Expr>, if_false: &Expr, line: u32) -> Result<TempId, CompileError> {
    let cond_temp = lower_expr(ctx, condition)?;
    let else_label = ctx.labels.next_label();
    let end_label = ctx.labels.next_label();
    let result = ctx.next_temp();

    ctx.emit_jump_to_label(Opcode::Jmpz, Some((OperandType::Temporary, cond_temp)), &else_label);
    match if_true {
        Some(then_expr) => {
            let then_temp = lower_expr(ctx, then_expr)?;
            ctx.emit_qm_assign(OperandType::Temporary, then_temp, result);
        }
        None => ctx.emit_qm_assign(OperandType::Temporary, cond_temp, result),
    }
    ctx.emit_jump_to_label(Opcode::Jmp, None, &end_label);
    ctx.place_label(&else_label, line)?;
    let else_temp = lower_expr(ctx, if_false)?;
    ctx.emit_qm_assign(OperandType::Temporary, else_temp, result);
    ctx.place_label(&end_label, line)?;

    let final_temp = ctx.next_temp();
    ctx.emit_qm_assign(OperandType::Temporary, result, final_temp);
    Ok(final_temp)
}

/// `a ?? b` (spec §4.5): compares `a === null` via `IS_IDENTICAL`.
fn lower_null_coalesce(ctx: &mut CompileContext, left: &Expr, right: &Expr, line: u32) -> Result<TempId, CompileError> {
    let left_temp = lower_expr(ctx, left)?;
    let null_const = ctx.add_constant(Value::Null);
    let null_temp = ctx.next_temp();
    ctx.emit_qm_assign(OperandType::Constant, null_const, null_temp);
    let is_null_temp = ctx.next_temp();
    ctx.emit(Instruction::new(Opcode::IsIdentical, OperandType::Temporary, left_temp, OperandType::Temporary, null_temp, OperandType::Temporary, is_null_temp));

    let right_label = ctx.labels.next_label();
    let end_label = ctx.labels.next_label();
    let result = ctx.next_temp();

    ctx.emit_jump_to_label(Opcode::Jmpnz, Some((OperandType::Temporary, is_null_temp)), &right_label);
    ctx.emit_qm_assign(OperandType::Temporary, left_temp, result);
    ctx.emit_jump_to_label(Opcode::Jmp, None, &end_label);
    ctx.place_label(&right_label, line)?;
    let right_temp = lower_expr(ctx, right)?;
    ctx.emit_qm_assign(OperandType::Temporary, right_temp, result);
    ctx.place_label(&end_label, line)?;

    let final_temp = ctx.next_temp();
    ctx.emit_qm_assign(OperandType::Temporary, result, final_temp);
    Ok(final_temp)
}

fn lower_match(ctx: &mut CompileContext, discriminant: &Expr, arms: &[crate::ast::MatchArm], default: Option<&Expr>, line: u32) -> Result<TempId, CompileError> {
    let discriminant_temp = lower_expr(ctx, discriminant)?;
    let end_label = ctx.labels.next_label();
    let result = ctx.next_temp();

    for (arm_index, arm) in arms.iter().enumerate() {
        let arm_label = ctx.labels.next_label();
        for condition in &arm.conditions {
            let condition_temp = lower_expr(ctx, condition)?;
            let flag_temp = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::IsIdentical, OperandType::Temporary, discriminant_temp, OperandType::Temporary, condition_temp, OperandType::Temporary, flag_temp));
            ctx.emit_jump_to_label(Opcode::Jmpnz, Some((OperandType::Temporary, flag_temp)), &arm_label);
        }
        let next_label = if arm_index + 1 < arms.len() { Some(ctx.labels.next_label()) } else { None };
        if let Some(label) = &next_label {
            ctx.emit_jump_to_label(Opcode::Jmp, None, label);
        } else if default.is_none() {
            let message_const = ctx.add_constant(Value::string_from_str("UnhandledMatch"));
            let message_temp = ctx.next_temp();
            ctx.emit_qm_assign(OperandType::Constant, message_const, message_temp);
            ctx.emit(Instruction::new(Opcode::Throw, OperandType::Temporary, message_temp, OperandType::Unused, 0, OperandType::Unused, 0));
        }
        ctx.place_label(&arm_label, line)?;
        let body_temp = lower_expr(ctx, &arm.body)?;
        ctx.emit_qm_assign(OperandType::Temporary, body_temp, result);
        ctx.emit_jump_to_label(Opcode::Jmp, None, &end_label);
        if let Some(label) = next_label {
            ctx.place_label(&label, line)?;
        }
    }
    if let Some(default_expr) = default {
        let default_temp = lower_expr(ctx, default_expr)?;
        ctx.emit_qm_assign(OperandType::Temporary, default_temp, result);
    }
    ctx.place_label(&end_label, line)?;
    Ok(result)
}

fn lower_isset(ctx: &mut CompileContext, targets: &[Expr], line: u32) -> Result<TempId, CompileError> {
    if targets.is_empty() {
        return Err(CompileError::new(ErrorKind::InvalidIssetTarget, line, "isset requires at least one target"));
    }
    let mut combined: Option<TempId> = None;
    for target in targets {
        let flag_temp = lower_isset_one(ctx, target)?;
        combined = Some(match combined {
            None => flag_temp,
            Some(previous) => {
                let conjoined = ctx.next_temp();
                ctx.emit(Instruction::new(Opcode::BooleanAnd, OperandType::Temporary, previous, OperandType::Temporary, flag_temp, OperandType::Temporary, conjoined));
                conjoined
            }
        });
    }
    // Caller-visible result must be the latest temporary regardless of how
    // many targets were conjoined (spec §4.5).
    let final_temp = ctx.next_temp();
    ctx.emit_qm_assign(OperandType::Temporary, combined.expect("checked non-empty above"), final_temp);
    Ok(final_temp)
}

fn lower_isset_one(ctx: &mut CompileContext, target: &Expr) -> Result<TempId, CompileError> {
    match target {
        Expr::Variable { name, .. } => {
            let slot = ctx.scopes.get_or_create(name);
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::IssetIsemptyVar, OperandType::LocalVariable, slot, OperandType::Unused, 0, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::Index { array, index, .. } => {
            let array_temp = lower_expr(ctx, array)?;
            let (index_type, index_value) = match index {
                Some(index_expr) => lower_name_operand(ctx, index_expr)?,
                None => (OperandType::Unused, 0),
            };
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::FetchDimIs, OperandType::Temporary, array_temp, index_type, index_value, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::PropertyAccess { object, property, .. } => {
            let object_temp = lower_expr(ctx, object)?;
            let (prop_type, prop_value) = lower_name_operand(ctx, property)?;
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::FetchObjIs, OperandType::Temporary, object_temp, prop_type, prop_value, OperandType::Temporary, result));
            Ok(result)
        }
        Expr::StaticPropertyAccess { class_name, property, .. } => {
            let class_const = ctx.add_constant(Value::string_from_str(class_name));
            let prop_const = ctx.add_constant(Value::string_from_str(property));
            let result = ctx.next_temp();
            ctx.emit(Instruction::new(Opcode::FetchStaticPropIs, OperandType::Constant, class_const, OperandType::Constant, prop_const, OperandType::Temporary, result));
            Ok(result)
        }
        _ => Err(CompileError::new(ErrorKind::InvalidIssetTarget, target.line(), "only variables, elements, and properties are valid isset targets")),
    }
}

fn lower_magic(ctx: &mut CompileContext, kind: MagicConstant, line: u32) -> Result<TempId, CompileError> {
    let value = match kind {
        MagicConstant::Line => Value::Int(line as i64),
        MagicConstant::Function => Value::string_from_str(ctx.scopes.current_function().unwrap_or("")),
        MagicConstant::Class | MagicConstant::Method => Value::string_from_str(ctx.scopes.current_class().unwrap_or("")),
        MagicConstant::File | MagicConstant::Dir | MagicConstant::Namespace | MagicConstant::Trait => Value::string_from_str(""),
    };
    let index = ctx.add_constant(value);
    let result = ctx.next_temp();
    ctx.emit_qm_assign(OperandType::Constant, index, result);
    Ok(result)
}

/// `list($a, $b[, ...]) = rhs` (spec §4.5.1). Also used by `foreach`'s key/
/// value binding when the target is itself a destructuring pattern.
pub(crate) fn lower_list_pattern(ctx: &mut CompileContext, pattern: &ListPattern, rhs_temp: TempId, line: u32) -> Result<(), CompileError> {
    let mut next_index: i64 = 0;
    for element in &pattern.elements {
        match element {
            ListElement::Hole => {
                next_index += 1;
            }
            ListElement::Target { key, target } => {
                let (key_type, key_value) = match key {
                    Some(key_expr) => lower_name_operand(ctx, key_expr)?,
                    None => {
                        let index_const = ctx.add_constant(Value::Int(next_index));
                        next_index += 1;
                        (OperandType::Constant, index_const)
                    }
                };
                let element_temp = ctx.next_temp();
                ctx.emit(Instruction::new(Opcode::FetchListR, OperandType::Temporary, rhs_temp, key_type, key_value, OperandType::Temporary, element_temp));
                let handle = lower_write_lvalue(ctx, target)?;
                let (handle_type, handle_value) = handle.operand();
                ctx.emit(Instruction::new(Opcode::Assign, OperandType::Temporary, element_temp, OperandType::Unused, 0, handle_type, handle_value));
            }
            ListElement::Nested { key, pattern: nested } => {
                let (key_type, key_value) = match key {
                    Some(key_expr) => lower_name_operand(ctx, key_expr)?,
                    None => {
                        let index_const = ctx.add_constant(Value::Int(next_index));
                        next_index += 1;
                        (OperandType::Constant, index_const)
                    }
                };
                let element_temp = ctx.next_temp();
                ctx.emit(Instruction::new(Opcode::FetchListR, OperandType::Temporary, rhs_temp, key_type, key_value, OperandType::Temporary, element_temp));
                lower_list_pattern(ctx, nested, element_temp, line)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn int_lit(value: i64) -> Expr {
        Expr::IntLiteral { value, line: 1 }
    }

    #[test]
    fn literal_emits_constant_and_qm_assign() {
        let mut ctx = CompileContext::new();
        let temp = lower_expr(&mut ctx, &int_lit(7)).unwrap();
        assert_eq!(ctx.instructions.last().unwrap().opcode, Opcode::QmAssign);
        assert_eq!(ctx.instructions.last().unwrap().result, temp);
    }

    #[test]
    fn binary_op_lowers_both_sides_then_emits_op() {
        let mut ctx = CompileContext::new();
        let expr = Expr::BinaryOp {
            op: BinaryOperator::Add,
            left: crate::Box::new(int_lit(1)),
            right: crate::Box::new(int_lit(2)),
            line: 1,
        };
        lower_expr(&mut ctx, &expr).unwrap();
        assert_eq!(ctx.instructions.last().unwrap().opcode, Opcode::Add);
    }

    #[test]
    fn assignment_to_variable_emits_assign_into_local_slot() {
        let mut ctx = CompileContext::new();
        let expr = Expr::Assign {
            target: crate::Box::new(Expr::Variable { name: "a".into(), line: 1 }),
            value: crate::Box::new(int_lit(5)),
            line: 1,
        };
        lower_expr(&mut ctx, &expr).unwrap();
        let assign = ctx.instructions.last().unwrap();
        assert_eq!(assign.opcode, Opcode::Assign);
        assert_eq!(assign.result_type(), crate::instruction::OperandType::LocalVariable);
    }

    #[test]
    fn assignment_to_non_lvalue_errors() {
        let mut ctx = CompileContext::new();
        let expr = Expr::Assign {
            target: crate::Box::new(int_lit(1)),
            value: crate::Box::new(int_lit(5)),
            line: 1,
        };
        let err = lower_expr(&mut ctx, &expr).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAssignmentTarget);
    }

    #[test]
    fn isset_conjoins_multiple_targets_with_boolean_and() {
        let mut ctx = CompileContext::new();
        let expr = Expr::Isset {
            targets: alloc::vec![Expr::Variable { name: "a".into(), line: 1 }, Expr::Variable { name: "b".into(), line: 1 }],
            line: 1,
        };
        lower_expr(&mut ctx, &expr).unwrap();
        assert!(ctx.instructions.iter().any(|i| i.opcode == Opcode::BooleanAnd));
    }

    #[test]
    fn shell_exec_is_unsupported() {
        let mut ctx = CompileContext::new();
        let err = lower_expr(&mut ctx, &Expr::ShellExec { line: 3 }).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedConstruct);
    }
}
