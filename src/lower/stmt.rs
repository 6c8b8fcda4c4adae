//! Statement lowering (spec §4.6).
//!
//! Grounded on the teacher's `compiler/bytecode.rs` `TreeTransformer`
//! statement-walking pattern, generalized to this spec's explicit label
//! table instead of the teacher's stack-depth bookkeeping. Loop/switch
//! break/continue targets are carried on [`crate::scope::Scope`]
//! (`break_label`/`continue_label`), pushed as a `Block` scope around each
//! loop/switch body and searched outward by [`ErrorKind::NotInLoop`] on miss.

use crate::ast::{CatchClause, Declare, ForeachTarget, IfBranch, Stmt, SwitchCase};
use crate::context::{CompileContext, TempId};
use crate::error::{CompileError, ErrorKind};
use crate::fold;
use crate::instruction::{Instruction, OperandType};
use crate::lower::expr::{lower_expr, lower_list_pattern, lower_name_operand};
use crate::opcode::Opcode;
use crate::scope::ScopeKind;
use crate::value::Value;
use crate::String;

/// Lowers a statement list in its own block scope (spec §4.6, "Block:
/// introduces a new block scope").
pub fn lower_block(ctx: &mut CompileContext, statements: &[Stmt]) -> Result<(), CompileError> {
    ctx.scopes.push(ScopeKind::Block);
    let result = lower_stmts(ctx, statements);
    ctx.scopes.pop();
    result
}

/// Lowers a statement list in the *current* scope, without pushing a new
/// one (used for loop/function bodies that already pushed their own scope
/// for break/continue or parameter bindings).
pub fn lower_stmts(ctx: &mut CompileContext, statements: &[Stmt]) -> Result<(), CompileError> {
    for statement in statements {
        lower_stmt(ctx, statement)?;
    }
    Ok(())
}

fn push_loop_scope(ctx: &mut CompileContext, break_label: String, continue_label: String) {
    ctx.scopes.push(ScopeKind::Block);
    ctx.scopes.current_mut().break_label = Some(break_label);
    ctx.scopes.current_mut().continue_label = Some(continue_label);
}

pub fn lower_stmt(ctx: &mut CompileContext, stmt: &Stmt) -> Result<(), CompileError> {
    match stmt {
        Stmt::Expression { expr, .. } => {
            lower_expr(ctx, expr)?;
            Ok(())
        }
        Stmt::Echo { arguments, .. } => {
            for argument in arguments {
                let value_temp = lower_expr(ctx, argument)?;
                ctx.emit(Instruction::new(Opcode::Echo, OperandType::Temporary, value_temp, OperandType::Unused, 0, OperandType::Unused, 0));
            }
            Ok(())
        }
        Stmt::Print { argument, .. } => {
            let value_temp = lower_expr(ctx, argument)?;
            ctx.emit(Instruction::new(Opcode::Echo, OperandType::Temporary, value_temp, OperandType::Unused, 0, OperandType::Unused, 0));
            Ok(())
        }
        Stmt::Return { value, line } => {
            let (arg_type, arg_value) = match value {
                Some(expr) => (OperandType::Temporary, lower_expr(ctx, expr)?),
                None => {
                    let null_const = ctx.add_constant(Value::Null);
                    (OperandType::Constant, null_const)
                }
            };
            let _ = line;
            ctx.emit(Instruction::new(Opcode::Return, arg_type, arg_value, OperandType::Unused, 0, OperandType::Unused, 0));
            Ok(())
        }
        Stmt::If { branches, else_body, line } => lower_if(ctx, branches, else_body.as_deref(), *line),
        Stmt::While { condition, body, line } => lower_while(ctx, condition, body, *line),
        Stmt::DoWhile { body, condition, line } => lower_do_while(ctx, body, condition, *line),
        Stmt::For { init, condition, update, body, line } => lower_for(ctx, init, condition, update, body, *line),
        Stmt::Foreach {
            iterable,
            key,
            value,
            by_reference,
            body,
            line,
        } => lower_foreach(ctx, iterable, key.as_ref(), value, *by_reference, body, *line),
        Stmt::Switch { discriminant, cases, line } => lower_switch(ctx, discriminant, cases, *line),
        Stmt::Break { level, line } => {
            let label = ctx
                .scopes
                .break_label_at_level(*level)
                .ok_or_else(|| CompileError::new(ErrorKind::NotInLoop, *line, "break outside a loop or switch"))?
                .clone();
            ctx.emit_jump_to_label(Opcode::Jmp, None, &label);
            Ok(())
        }
        Stmt::Continue { level, line } => {
            let label = ctx
                .scopes
                .continue_label_at_level(*level)
                .ok_or_else(|| CompileError::new(ErrorKind::NotInLoop, *line, "continue outside a loop"))?
                .clone();
            ctx.emit_jump_to_label(Opcode::Jmp, None, &label);
            Ok(())
        }
        Stmt::Try { body, catches, finally, line } => lower_try(ctx, body, catches, finally.as_deref(), *line),
        Stmt::Throw { argument, .. } => {
            let value_temp = lower_expr(ctx, argument)?;
            ctx.emit(Instruction::new(Opcode::Throw, OperandType::Temporary, value_temp, OperandType::Unused, 0, OperandType::Unused, 0));
            Ok(())
        }
        Stmt::Block { statements, .. } => lower_block(ctx, statements),
        Stmt::Global { names, .. } => {
            for name in names {
                let slot = ctx.scopes.get_or_create(name);
                let name_const = ctx.add_constant(Value::string_from_str(name));
                ctx.emit(Instruction::new(Opcode::BindGlobal, OperandType::Constant, name_const, OperandType::Unused, 0, OperandType::LocalVariable, slot));
            }
            Ok(())
        }
        Stmt::StaticVar { line, .. } => Err(CompileError::new(
            ErrorKind::UnsupportedConstruct,
            *line,
            "static local variables are not supported",
        )),
        Stmt::Unset { targets, line } => lower_unset(ctx, targets, *line),
        Stmt::DeclareBlock { directives, body, line } => lower_declare_block(ctx, directives, body, *line),
        Stmt::Label { name, line } => ctx.place_label(name, *line),
        Stmt::Goto { label, .. } => {
            ctx.emit_jump_to_label(Opcode::Jmp, None, label);
            Ok(())
        }
        Stmt::Namespace { body, .. } => lower_stmts(ctx, body),
        Stmt::Use { .. } => Ok(()),
        Stmt::HaltCompiler { .. } => {
            let zero_const = ctx.add_constant(Value::Int(0));
            ctx.emit(Instruction::new(Opcode::Exit, OperandType::Constant, zero_const, OperandType::Unused, 0, OperandType::Unused, 0));
            Ok(())
        }
        Stmt::FunctionDecl(decl) => crate::lower::decl::lower_function_decl(ctx, decl),
        Stmt::ClassDecl(decl) => crate::lower::decl::lower_class_decl(ctx, decl),
        Stmt::InterfaceDecl(decl) => crate::lower::decl::lower_interface_decl(ctx, decl),
        Stmt::TraitDecl(decl) => crate::lower::decl::lower_trait_decl(ctx, decl),
        Stmt::EnumDecl(decl) => crate::lower::decl::lower_enum_decl(ctx, decl),
    }
}

/// `if`/`elseif`/`else` (spec §4.6): each branch falls through to a shared
/// end label; a branch's condition failing jumps to the next branch (or to
/// `else`, or past the whole statement).
fn lower_if(ctx: &mut CompileContext, branches: &[IfBranch], else_body: Option<&[Stmt]>, line: u32) -> Result<(), CompileError> {
    let end_label = ctx.labels.next_label();

    for (index, branch) in branches.iter().enumerate() {
        let condition_temp = lower_expr(ctx, &branch.condition)?;
        let has_more = index + 1 < branches.len() || else_body.is_some();
        let next_label = if has_more { Some(ctx.labels.next_label()) } else { None };
        match &next_label {
            Some(label) => ctx.emit_jump_to_label(Opcode::Jmpz, Some((OperandType::Temporary, condition_temp)), label),
            None => ctx.emit_jump_to_label(Opcode::Jmpz, Some((OperandType::Temporary, condition_temp)), &end_label),
        };
        lower_block(ctx, &branch.body)?;
        ctx.emit_jump_to_label(Opcode::Jmp, None, &end_label);
        if let Some(label) = next_label {
            ctx.place_label(&label, line)?;
        }
    }

    if let Some(statements) = else_body {
        lower_block(ctx, statements)?;
    }

    ctx.place_label(&end_label, line)
}

/// `while` (spec §4.6): condition re-checked at loop head; `continue`
/// targets the head, `break` targets past the loop.
fn lower_while(ctx: &mut CompileContext, condition: &crate::ast::Expr, body: &[Stmt], line: u32) -> Result<(), CompileError> {
    let start_label = ctx.labels.next_label();
    let end_label = ctx.labels.next_label();

    ctx.place_label(&start_label, line)?;
    let condition_temp = lower_expr(ctx, condition)?;
    ctx.emit_jump_to_label(Opcode::Jmpz, Some((OperandType::Temporary, condition_temp)), &end_label);

    push_loop_scope(ctx, end_label.clone(), start_label.clone());
    lower_stmts(ctx, body)?;
    ctx.scopes.pop();

    ctx.emit_jump_to_label(Opcode::Jmp, None, &start_label);
    ctx.place_label(&end_label, line)
}

/// `do { ... } while (...)` (spec §4.6): body runs at least once; `continue`
/// targets the condition re-check, not the top of the body.
fn lower_do_while(ctx: &mut CompileContext, body: &[Stmt], condition: &crate::ast::Expr, line: u32) -> Result<(), CompileError> {
    let start_label = ctx.labels.next_label();
    let continue_label = ctx.labels.next_label();
    let end_label = ctx.labels.next_label();

    ctx.place_label(&start_label, line)?;
    push_loop_scope(ctx, end_label.clone(), continue_label.clone());
    lower_stmts(ctx, body)?;
    ctx.scopes.pop();

    ctx.place_label(&continue_label, line)?;
    let condition_temp = lower_expr(ctx, condition)?;
    ctx.emit_jump_to_label(Opcode::Jmpnz, Some((OperandType::Temporary, condition_temp)), &start_label);
    ctx.place_label(&end_label, line)
}

/// C-style `for` (spec §4.6): initialization runs once; each condition in
/// the list is checked in order and short-circuits the loop on the first
/// falsy one (an empty condition list never exits); `continue` targets the
/// update list.
fn lower_for(
    ctx: &mut CompileContext,
    init: &[crate::ast::Expr],
    condition: &[crate::ast::Expr],
    update: &[crate::ast::Expr],
    body: &[Stmt],
    line: u32,
) -> Result<(), CompileError> {
    for expr in init {
        lower_expr(ctx, expr)?;
    }

    let start_label = ctx.labels.next_label();
    let continue_label = ctx.labels.next_label();
    let end_label = ctx.labels.next_label();

    ctx.place_label(&start_label, line)?;
    for expr in condition {
        let condition_temp = lower_expr(ctx, expr)?;
        ctx.emit_jump_to_label(Opcode::Jmpz, Some((OperandType::Temporary, condition_temp)), &end_label);
    }

    push_loop_scope(ctx, end_label.clone(), continue_label.clone());
    lower_stmts(ctx, body)?;
    ctx.scopes.pop();

    ctx.place_label(&continue_label, line)?;
    for expr in update {
        lower_expr(ctx, expr)?;
    }
    ctx.emit_jump_to_label(Opcode::Jmp, None, &start_label);
    ctx.place_label(&end_label, line)
}

/// Binds one `foreach` key/value slot, handling both plain variables and
/// nested `list(...)` destructuring targets (spec §4.5.1, §4.6).
fn bind_foreach_target(ctx: &mut CompileContext, target: &ForeachTarget, value_temp: TempId, by_reference: bool, line: u32) -> Result<(), CompileError> {
    match target {
        ForeachTarget::Variable(name) => {
            let slot = ctx.scopes.get_or_create(name);
            let opcode = if by_reference { Opcode::AssignRef } else { Opcode::Assign };
            ctx.emit(Instruction::new(opcode, OperandType::Temporary, value_temp, OperandType::Unused, 0, OperandType::LocalVariable, slot));
            Ok(())
        }
        ForeachTarget::ListPattern(pattern) => lower_list_pattern(ctx, pattern, value_temp, line),
    }
}

/// `foreach` (spec §4.6): `FE_RESET` creates an iterator handle; each
/// `FE_FETCH` writes the next value (`Null` on exhaustion, checked via
/// `IS_IDENTICAL`) and, when a key is bound, the next key.
fn lower_foreach(
    ctx: &mut CompileContext,
    iterable: &crate::ast::Expr,
    key: Option<&ForeachTarget>,
    value: &ForeachTarget,
    by_reference: bool,
    body: &[Stmt],
    line: u32,
) -> Result<(), CompileError> {
    let iterable_temp = lower_expr(ctx, iterable)?;
    let iterator_temp = ctx.next_temp();
    ctx.emit(Instruction::new(Opcode::FeReset, OperandType::Temporary, iterable_temp, OperandType::Unused, 0, OperandType::Temporary, iterator_temp));

    let start_label = ctx.labels.next_label();
    let end_label = ctx.labels.next_label();
    ctx.place_label(&start_label, line)?;

    let value_temp = ctx.next_temp();
    let (key_type, key_value) = if key.is_some() { (OperandType::Temporary, ctx.next_temp()) } else { (OperandType::Unused, 0) };
    ctx.emit(Instruction::new(
        Opcode::FeFetch,
        OperandType::Temporary,
        iterator_temp,
        key_type,
        key_value,
        OperandType::Temporary,
        value_temp,
    ));

    let null_const = ctx.add_constant(Value::Null);
    let null_temp = ctx.next_temp();
    ctx.emit_qm_assign(OperandType::Constant, null_const, null_temp);
    let exhausted_temp = ctx.next_temp();
    ctx.emit(Instruction::new(
        Opcode::IsIdentical,
        OperandType::Temporary,
        value_temp,
        OperandType::Temporary,
        null_temp,
        OperandType::Temporary,
        exhausted_temp,
    ));
    ctx.emit_jump_to_label(Opcode::Jmpnz, Some((OperandType::Temporary, exhausted_temp)), &end_label);

    if let Some(key_target) = key {
        bind_foreach_target(ctx, key_target, key_value, false, line)?;
    }
    bind_foreach_target(ctx, value, value_temp, by_reference, line)?;

    push_loop_scope(ctx, end_label.clone(), start_label.clone());
    lower_stmts(ctx, body)?;
    ctx.scopes.pop();

    ctx.emit_jump_to_label(Opcode::Jmp, None, &start_label);
    ctx.place_label(&end_label, line)?;
    ctx.emit(Instruction::new(Opcode::FeFree, OperandType::Temporary, iterator_temp, OperandType::Unused, 0, OperandType::Unused, 0));
    Ok(())
}

/// `switch` (spec §4.6): dispatch is a chain of `IS_EQUAL` + `JMPNZ` checks
/// against the discriminant, falling through to `default` (or past the
/// statement) when none match; bodies are emitted in source order with
/// C-style fall-through between cases (`break` exits via the shared
/// end-label; `continue` inside a `switch` behaves like `break`, matching
/// this spec's treatment of `switch` as a loop level for that purpose).
fn lower_switch(ctx: &mut CompileContext, discriminant: &crate::ast::Expr, cases: &[SwitchCase], line: u32) -> Result<(), CompileError> {
    let discriminant_temp = lower_expr(ctx, discriminant)?;
    let end_label = ctx.labels.next_label();
    let case_labels: alloc::vec::Vec<String> = (0..cases.len()).map(|_| ctx.labels.next_label()).collect();
    let default_index = cases.iter().position(|case| case.test.is_none());

    for (case, label) in cases.iter().zip(case_labels.iter()) {
        if let Some(test) = &case.test {
            let test_temp = lower_expr(ctx, test)?;
            let matches_temp = ctx.next_temp();
            ctx.emit(Instruction::new(
                Opcode::IsEqual,
                OperandType::Temporary,
                discriminant_temp,
                OperandType::Temporary,
                test_temp,
                OperandType::Temporary,
                matches_temp,
            ));
            ctx.emit_jump_to_label(Opcode::Jmpnz, Some((OperandType::Temporary, matches_temp)), label);
        }
    }
    match default_index {
        Some(index) => ctx.emit_jump_to_label(Opcode::Jmp, None, &case_labels[index]),
        None => ctx.emit_jump_to_label(Opcode::Jmp, None, &end_label),
    };

    push_loop_scope(ctx, end_label.clone(), end_label.clone());
    for (case, label) in cases.iter().zip(case_labels.iter()) {
        ctx.place_label(label, line)?;
        lower_stmts(ctx, &case.body)?;
    }
    ctx.scopes.pop();

    ctx.place_label(&end_label, line)
}

/// `try`/`catch`/`finally` (spec §4.6): `CATCH` markers describe the
/// exception-type/binding pairs an engine dispatches into; `FINALLY` marks
/// the start of the always-run epilogue.
fn lower_try(ctx: &mut CompileContext, body: &[Stmt], catches: &[CatchClause], finally: Option<&[Stmt]>, line: u32) -> Result<(), CompileError> {
    lower_block(ctx, body)?;
    let end_label = ctx.labels.next_label();
    ctx.emit_jump_to_label(Opcode::Jmp, None, &end_label);

    for catch in catches {
        for exception_type in &catch.exception_types {
            let type_const = ctx.add_constant(Value::string_from_str(exception_type));
            ctx.scopes.push(ScopeKind::Block);
            let (result_type, result_value) = match &catch.variable {
                Some(name) => (OperandType::LocalVariable, ctx.scopes.get_or_create(name)),
                None => (OperandType::Unused, 0),
            };
            ctx.emit(Instruction::new(Opcode::Catch, OperandType::Constant, type_const, OperandType::Unused, 0, result_type, result_value));
            lower_stmts(ctx, &catch.body)?;
            ctx.scopes.pop();
        }
        ctx.emit_jump_to_label(Opcode::Jmp, None, &end_label);
    }

    ctx.place_label(&end_label, line)?;

    if let Some(statements) = finally {
        ctx.emit(Instruction::new(Opcode::Finally, OperandType::Unused, 0, OperandType::Unused, 0, OperandType::Unused, 0));
        lower_block(ctx, statements)?;
    }
    Ok(())
}

fn lower_unset(ctx: &mut CompileContext, targets: &[crate::ast::Expr], line: u32) -> Result<(), CompileError> {
    use crate::ast::Expr;

    for target in targets {
        match target {
            Expr::Variable { name, .. } => {
                if name == "this" {
                    return Err(CompileError::new(ErrorKind::InvalidUnsetTarget, line, "cannot unset $this"));
                }
                let slot = ctx.scopes.get_or_create(name);
                ctx.emit(Instruction::new(Opcode::UnsetVar, OperandType::LocalVariable, slot, OperandType::Unused, 0, OperandType::Unused, 0));
            }
            Expr::Index { array, index: Some(index), .. } => {
                let array_temp = lower_expr(ctx, array)?;
                let (index_type, index_value) = lower_name_operand(ctx, index)?;
                ctx.emit(Instruction::new(Opcode::FetchDimUnset, OperandType::Temporary, array_temp, index_type, index_value, OperandType::Unused, 0));
            }
            Expr::PropertyAccess { object, property, .. } => {
                let object_temp = lower_expr(ctx, object)?;
                let (prop_type, prop_value) = lower_name_operand(ctx, property)?;
                ctx.emit(Instruction::new(Opcode::FetchObjUnset, OperandType::Temporary, object_temp, prop_type, prop_value, OperandType::Unused, 0));
            }
            Expr::StaticPropertyAccess { class_name, property, .. } => {
                let class_const = ctx.add_constant(Value::string_from_str(class_name));
                let prop_const = ctx.add_constant(Value::string_from_str(property));
                ctx.emit(Instruction::new(Opcode::FetchStaticPropUnset, OperandType::Constant, class_const, OperandType::Constant, prop_const, OperandType::Unused, 0));
            }
            _ => return Err(CompileError::new(ErrorKind::InvalidUnsetTarget, target.line(), "only variables, elements, and properties are valid unset targets")),
        }
    }
    Ok(())
}

fn lower_declare_block(ctx: &mut CompileContext, directives: &[Declare], body: &[Stmt], line: u32) -> Result<(), CompileError> {
    for directive in directives {
        let (name_const, value_const) = match directive {
            Declare::StrictTypes(enabled) => (ctx.add_constant(Value::string_from_str("strict_types")), ctx.add_constant(Value::Bool(*enabled))),
            Declare::Ticks(n) => (ctx.add_constant(Value::string_from_str("ticks")), ctx.add_constant(Value::Int(*n))),
            Declare::Encoding(encoding) => (ctx.add_constant(Value::string_from_str("encoding")), ctx.add_constant(Value::string_from_str(encoding))),
            Declare::Other { name, value } => {
                let folded = fold::try_fold(value).unwrap_or(Value::Null);
                (ctx.add_constant(Value::string_from_str(name)), ctx.add_constant(folded))
            }
        };
        ctx.emit(Instruction::new(Opcode::Declare, OperandType::Constant, name_const, OperandType::Constant, value_const, OperandType::Unused, 0));
    }
    lower_block(ctx, body)?;
    let _ = line;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Expr};
    use crate::context::CompileContext;

    fn var(name: &str) -> Expr {
        Expr::Variable { name: name.into(), line: 1 }
    }

    fn int_lit(value: i64) -> Expr {
        Expr::IntLiteral { value, line: 1 }
    }

    #[test]
    fn break_outside_loop_errors() {
        let mut ctx = CompileContext::new();
        let err = lower_stmt(&mut ctx, &Stmt::Break { level: 1, line: 3 }).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotInLoop);
    }

    #[test]
    fn continue_outside_loop_errors() {
        let mut ctx = CompileContext::new();
        let err = lower_stmt(&mut ctx, &Stmt::Continue { level: 1, line: 3 }).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotInLoop);
    }

    #[test]
    fn while_loop_emits_condition_check_and_backward_jump() {
        let mut ctx = CompileContext::new();
        let stmt = Stmt::While {
            condition: Expr::BinaryOp {
                op: BinaryOperator::IsSmaller,
                left: crate::Box::new(var("i")),
                right: crate::Box::new(int_lit(10)),
                line: 1,
            },
            body: alloc::vec![Stmt::Break { level: 1, line: 2 }],
            line: 1,
        };
        lower_stmt(&mut ctx, &stmt).unwrap();
        assert!(ctx.instructions.iter().any(|i| i.opcode == Opcode::Jmpz));
        assert!(ctx.instructions.iter().filter(|i| i.opcode == Opcode::Jmp).count() >= 2);
    }

    #[test]
    fn if_without_else_jumps_past_body_on_falsy_condition() {
        let mut ctx = CompileContext::new();
        let stmt = Stmt::If {
            branches: alloc::vec![IfBranch {
                condition: int_lit(1),
                body: alloc::vec![Stmt::Expression { expr: int_lit(2), line: 1 }],
            }],
            else_body: None,
            line: 1,
        };
        lower_stmt(&mut ctx, &stmt).unwrap();
        assert!(ctx.instructions.iter().any(|i| i.opcode == Opcode::Jmpz));
    }

    #[test]
    fn switch_dispatches_with_is_equal_and_jmpnz() {
        let mut ctx = CompileContext::new();
        let stmt = Stmt::Switch {
            discriminant: var("x"),
            cases: alloc::vec![
                SwitchCase {
                    test: Some(int_lit(1)),
                    body: alloc::vec![Stmt::Break { level: 1, line: 2 }],
                },
                SwitchCase { test: None, body: alloc::vec![] },
            ],
            line: 1,
        };
        lower_stmt(&mut ctx, &stmt).unwrap();
        assert!(ctx.instructions.iter().any(|i| i.opcode == Opcode::IsEqual));
        assert!(ctx.instructions.iter().any(|i| i.opcode == Opcode::Jmpnz));
    }

    #[test]
    fn unset_this_is_rejected() {
        let mut ctx = CompileContext::new();
        ctx.scopes.push(ScopeKind::Method);
        let err = lower_unset(&mut ctx, &[var("this")], 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidUnsetTarget);
    }

    #[test]
    fn global_binds_local_slot() {
        let mut ctx = CompileContext::new();
        lower_stmt(&mut ctx, &Stmt::Global { names: alloc::vec![String::from("config")], line: 1 }).unwrap();
        assert!(ctx.instructions.iter().any(|i| i.opcode == Opcode::BindGlobal));
    }

    #[test]
    fn static_var_is_unsupported() {
        let mut ctx = CompileContext::new();
        let err = lower_stmt(&mut ctx, &Stmt::StaticVar { name: "n".into(), default: None, line: 1 }).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedConstruct);
    }
}
