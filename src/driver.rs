//! Driver entry points (spec §6: "A single call `compile(ast) →
//! (instructions, constants, registry)` in the global context; a context
//! variant `compile_with(ctx, ast)` exists for embedded compilation").
//!
//! Mirrors the teacher's `BytecodeCompiler::compile` convenience
//! constructor in `compiler/bytecode.rs`: a fresh top-level context is
//! opened, the root is walked statement-by-statement, and `finish` appends
//! the implicit terminal return and resolves labels before the triple is
//! handed back.

use crate::ast::Program;
use crate::context::CompileContext;
use crate::error::CompileError;
use crate::instruction::Instruction;
use crate::lower::stmt::lower_stmts;
use crate::registry::Registry;
use crate::value::Value;
use crate::Vec;

/// The `(instructions, constants, registry)` triple spec §6 calls for,
/// named so callers don't have to destructure a bare tuple.
#[derive(Debug)]
pub struct CompileOutput {
    pub instructions: Vec<Instruction>,
    pub constants: Vec<Value>,
    pub registry: Registry,
}

/// Compiles a full program in a fresh global context (spec §6, "Driver
/// entry point"). Opens a context, dispatches every top-level statement,
/// then closes the unit: implicit terminal return, label resolution, and
/// publishing the registry snapshot.
pub fn compile(ast: &Program) -> Result<CompileOutput, CompileError> {
    let ctx = CompileContext::new();
    compile_with(ctx, ast)
}

/// Compiles a program into a caller-supplied context (spec §6: "a context
/// variant `compile_with(ctx, ast)` exists for embedded compilation, e.g.
/// building trait or method bodies into child contexts"). The caller picks
/// the scope kind `ctx` was opened with; this function only drives the
/// statement walk and the unit-close sequence.
pub fn compile_with(mut ctx: CompileContext, ast: &Program) -> Result<CompileOutput, CompileError> {
    lower_stmts(&mut ctx, &ast.statements)?;
    let line = ast.statements.last().map(|s| s.line()).unwrap_or(0);
    let (instructions, constants, registry) = ctx.finish(line)?;
    Ok(CompileOutput {
        instructions,
        constants,
        registry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Stmt};
    use crate::opcode::Opcode;

    #[test]
    fn compiles_empty_program_to_a_single_return() {
        let program = Program { statements: Vec::new() };
        let output = compile(&program).unwrap();
        assert_eq!(output.instructions.len(), 1);
        assert_eq!(output.instructions[0].opcode, Opcode::Return);
    }

    #[test]
    fn literal_echo_emits_qm_assigns_add_echo_and_return() {
        // echo 1 + 2;
        let program = Program {
            statements: vec![Stmt::Echo {
                arguments: vec![Expr::BinaryOp {
                    op: crate::ast::BinaryOperator::Add,
                    left: alloc::boxed::Box::new(Expr::IntLiteral { value: 1, line: 1 }),
                    right: alloc::boxed::Box::new(Expr::IntLiteral { value: 2, line: 1 }),
                    line: 1,
                }],
                line: 1,
            }],
        };
        let output = compile(&program).unwrap();
        assert_eq!(output.constants.len(), 2);
        let opcodes: Vec<Opcode> = output.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(
            opcodes,
            vec![Opcode::QmAssign, Opcode::QmAssign, Opcode::Add, Opcode::Echo, Opcode::Return]
        );
    }

    #[test]
    fn assignment_then_read_round_trips_through_a_variable_slot() {
        // $a = 5; echo $a;
        let program = Program {
            statements: vec![
                Stmt::Expression {
                    expr: Expr::Assign {
                        target: alloc::boxed::Box::new(Expr::Variable { name: "a".into(), line: 1 }),
                        value: alloc::boxed::Box::new(Expr::IntLiteral { value: 5, line: 1 }),
                        line: 1,
                    },
                    line: 1,
                },
                Stmt::Echo {
                    arguments: vec![Expr::Variable { name: "a".into(), line: 2 }],
                    line: 2,
                },
            ],
        };
        let output = compile(&program).unwrap();
        let opcodes: Vec<Opcode> = output.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(
            opcodes,
            vec![Opcode::QmAssign, Opcode::Assign, Opcode::FetchR, Opcode::Echo, Opcode::Return]
        );
    }

    #[test]
    fn duplicate_function_declaration_fails_with_already_declared() {
        use crate::ast::FunctionDecl;
        let function = |name: &str| {
            Stmt::FunctionDecl(FunctionDecl {
                name: name.into(),
                parameters: Vec::new(),
                body: Vec::new(),
                is_generator: false,
                line: 1,
            })
        };
        let program = Program {
            statements: vec![function("f"), function("f")],
        };
        let err = compile(&program).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::AlreadyDeclared);
    }

    #[test]
    fn while_loop_with_break_compiles_end_to_end() {
        // spec §8 scenario 3: `while ($x) { if ($y) break; }`. The loop's
        // backward `Jmp` to its own start label must resolve at `finish`
        // rather than being reported as an unresolved forward jump.
        let program = Program {
            statements: vec![Stmt::While {
                condition: Expr::Variable { name: "x".into(), line: 1 },
                body: vec![Stmt::If {
                    branches: vec![crate::ast::IfBranch {
                        condition: Expr::Variable { name: "y".into(), line: 1 },
                        body: vec![Stmt::Break { level: 1, line: 1 }],
                    }],
                    else_body: None,
                    line: 1,
                }],
                line: 1,
            }],
        };
        let output = compile(&program).unwrap();
        assert_eq!(output.instructions.last().unwrap().opcode, Opcode::Return);
    }
}
