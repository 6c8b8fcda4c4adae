//! Declaration lowering (spec §4.7): functions, classes, interfaces,
//! traits, enums, and closures.
//!
//! Grounded on the teacher's `compiler/bytecode.rs` function-compilation
//! entry point (a child compiler instance per function body, folded back
//! into the enclosing unit) generalized to this spec's class/trait/
//! interface/enum declaration forms and its fluent [`ClassBuilder`]-shaped
//! [`Registry`] (spec §4.3).

use crate::ast::{ClassConstDecl, ClassDecl, EnumCase, EnumDecl, Expr, FunctionDecl, InterfaceDecl, MethodDecl, Parameter as AstParameter, TraitDecl, Visibility as AstVisibility};
use crate::context::CompileContext;
use crate::error::{CompileError, ErrorKind};
use crate::fold;
use crate::instruction::{Instruction, OperandType};
use crate::lower::stmt::lower_stmts;
use crate::opcode::Opcode;
use crate::registry::{ClassDescriptor, CompiledBody, FunctionDescriptor, InterfaceDescriptor, MethodSignature, Parameter, PropertyDescriptor, TraitDescriptor, Visibility};
use crate::scope::ScopeKind;
use crate::value::Value;
use crate::{format, String, Vec};

fn visibility(v: AstVisibility) -> Visibility {
    match v {
        AstVisibility::Public => Visibility::Public,
        AstVisibility::Protected => Visibility::Protected,
        AstVisibility::Private => Visibility::Private,
    }
}

/// Builds a registry [`Parameter`] list from AST parameters without
/// touching a [`CompileContext`] (used for interface method signatures,
/// which have no body to allocate slots in).
fn describe_parameters(parameters: &[AstParameter]) -> Result<Vec<Parameter>, CompileError> {
    let mut described = Vec::with_capacity(parameters.len());
    for parameter in parameters {
        if parameter.name.is_empty() {
            return Err(CompileError::new(ErrorKind::InvalidParameter, parameter.line, "parameter name must not be empty"));
        }
        let (has_default, default_value) = match &parameter.default {
            Some(default_expr) => (true, fold::fold_parameter_default(default_expr, &parameter.name, parameter.line)),
            None => (false, Value::Null),
        };
        described.push(Parameter {
            name: parameter.name.clone(),
            type_hint: parameter.type_hint.clone(),
            by_reference: parameter.by_reference,
            has_default,
            default_value,
        });
    }
    Ok(described)
}

/// Binds each parameter to a slot in the current (already-pushed) scope,
/// in addition to describing it for the registry (spec §4.4, §4.7).
fn lower_parameters(ctx: &mut CompileContext, parameters: &[AstParameter]) -> Result<Vec<Parameter>, CompileError> {
    for parameter in parameters {
        ctx.scopes.get_or_create(&parameter.name);
    }
    describe_parameters(parameters)
}

/// Compiles a function-shaped body (plain function, closure) in its own
/// child context, folding the child's declarations up into the caller's
/// registry (spec §5: "each function's compiled body is detached ... once
/// compiled; declarations nested within it are folded into the enclosing
/// unit's registry").
fn compile_function_like(ctx: &mut CompileContext, scope_kind: ScopeKind, parameters: &[AstParameter], body: &[crate::ast::Stmt], line: u32) -> Result<(CompiledBody, Vec<Parameter>), CompileError> {
    let mut child = CompileContext::child(scope_kind);
    let described = lower_parameters(&mut child, parameters)?;
    lower_stmts(&mut child, body)?;
    let local_count = child.scopes.variable_count();
    let (instructions, constants, registry) = child.finish(line)?;
    ctx.registry.merge(registry);
    Ok((CompiledBody { instructions, constants, local_count }, described))
}

/// Like [`compile_function_like`] but also records `self::class`/
/// `self::function` context for magic constants (spec §4.5, `__CLASS__`/
/// `__METHOD__`/`__FUNCTION__`).
fn compile_method(ctx: &mut CompileContext, class_name: &str, method: &MethodDecl) -> Result<FunctionDescriptor, CompileError> {
    let mut child = CompileContext::child(ScopeKind::Method);
    child.scopes.current_mut().current_class = Some(String::from(class_name));
    child.scopes.current_mut().current_function = Some(method.name.clone());
    let described = lower_parameters(&mut child, &method.parameters)?;
    lower_stmts(&mut child, &method.body)?;
    let local_count = child.scopes.variable_count();
    let (instructions, constants, registry) = child.finish(method.line)?;
    ctx.registry.merge(registry);
    Ok(FunctionDescriptor {
        name: method.name.clone(),
        parameters: described,
        is_variadic: method.parameters.last().map(|p| p.variadic).unwrap_or(false),
        is_generator: false,
        is_anonymous: false,
        body: CompiledBody { instructions, constants, local_count },
    })
}

fn fold_property_default(default: Option<&Expr>) -> Value {
    match default {
        Some(expr) => fold::try_fold(expr).unwrap_or(Value::Null),
        None => Value::Null,
    }
}

pub fn lower_function_decl(ctx: &mut CompileContext, decl: &FunctionDecl) -> Result<(), CompileError> {
    let is_variadic = decl.parameters.last().map(|p| p.variadic).unwrap_or(false);
    let (body, parameters) = compile_function_like(ctx, ScopeKind::Function, &decl.parameters, &decl.body, decl.line)?;
    let descriptor = FunctionDescriptor {
        name: decl.name.clone(),
        parameters,
        is_variadic,
        is_generator: decl.is_generator,
        is_anonymous: false,
        body,
    };
    ctx.registry.register_function(descriptor, decl.line)?;
    let name_const = ctx.add_constant(Value::string_from_str(&decl.name));
    ctx.emit(Instruction::new(Opcode::DeclareFunction, OperandType::Constant, name_const, OperandType::Unused, 0, OperandType::Unused, 0));
    Ok(())
}

pub fn lower_class_decl(ctx: &mut CompileContext, decl: &ClassDecl) -> Result<(), CompileError> {
    let mut properties: Vec<PropertyDescriptor> = decl
        .properties
        .iter()
        .map(|p| PropertyDescriptor {
            name: p.name.clone(),
            type_hint: p.type_hint.clone(),
            visibility: visibility(p.visibility),
            is_static: p.is_static,
            default_value: fold_property_default(p.default.as_ref()),
        })
        .collect();

    let mut methods = hashbrown::HashMap::new();
    for method in &decl.methods {
        if method.is_abstract {
            continue;
        }
        let descriptor = compile_method(ctx, &decl.name, method)?;
        methods.insert(method.name.clone(), descriptor);
    }

    // Trait composition: copy in properties/methods from each `use`d trait,
    // last-use-wins on name collisions among traits (spec §4.7, Open
    // Question resolved in favor of simple last-wins rather than requiring
    // an explicit conflict-resolution clause).
    for trait_name in &decl.uses_traits {
        let trait_descriptor = ctx
            .registry
            .lookup_trait(trait_name)
            .ok_or_else(|| CompileError::new(ErrorKind::TraitNotFound, decl.line, format!("trait `{}` not found", trait_name)))?
            .clone();
        for property in trait_descriptor.properties {
            if !properties.iter().any(|p| p.name == property.name) {
                properties.push(property);
            }
        }
        for (name, method) in trait_descriptor.methods {
            methods.insert(name, method);
        }
    }

    let constants: hashbrown::HashMap<String, Value> = decl.constants.iter().map(|c| (c.name.clone(), fold::try_fold(&c.value).unwrap_or(Value::Null))).collect();

    let descriptor = ClassDescriptor {
        name: decl.name.clone(),
        parent_name: decl.parent_name.clone(),
        properties,
        methods,
        constants,
        is_abstract: decl.is_abstract,
        is_final: decl.is_final,
        is_builtin: false,
        backing_type: None,
    };
    ctx.registry.register_class(descriptor, decl.line)?;

    let name_const = ctx.add_constant(Value::string_from_str(&decl.name));
    ctx.emit(Instruction::new(Opcode::DeclareClass, OperandType::Constant, name_const, OperandType::Unused, 0, OperandType::Unused, 0));
    for trait_name in &decl.uses_traits {
        let trait_const = ctx.add_constant(Value::string_from_str(trait_name));
        ctx.emit(Instruction::new(Opcode::UseTrait, OperandType::Constant, name_const, OperandType::Constant, trait_const, OperandType::Unused, 0));
    }
    if decl.is_abstract {
        ctx.emit(Instruction::new(Opcode::VerifyAbstractClass, OperandType::Constant, name_const, OperandType::Unused, 0, OperandType::Unused, 0));
    }
    Ok(())
}

pub fn lower_interface_decl(ctx: &mut CompileContext, decl: &InterfaceDecl) -> Result<(), CompileError> {
    let mut methods = Vec::with_capacity(decl.methods.len());
    for method in &decl.methods {
        methods.push(MethodSignature {
            name: method.name.clone(),
            visibility: Visibility::Public,
            parameters: describe_parameters(&method.parameters)?,
        });
    }
    let descriptor = InterfaceDescriptor {
        name: decl.name.clone(),
        methods,
        extends: decl.extends.clone(),
    };
    ctx.registry.register_interface(descriptor, decl.line)?;
    let name_const = ctx.add_constant(Value::string_from_str(&decl.name));
    ctx.emit(Instruction::new(Opcode::DeclareInterface, OperandType::Constant, name_const, OperandType::Unused, 0, OperandType::Unused, 0));
    Ok(())
}

pub fn lower_trait_decl(ctx: &mut CompileContext, decl: &TraitDecl) -> Result<(), CompileError> {
    let properties = decl
        .properties
        .iter()
        .map(|p| PropertyDescriptor {
            name: p.name.clone(),
            type_hint: p.type_hint.clone(),
            visibility: visibility(p.visibility),
            is_static: p.is_static,
            default_value: fold_property_default(p.default.as_ref()),
        })
        .collect();

    let mut methods = hashbrown::HashMap::new();
    for method in &decl.methods {
        let descriptor = compile_method(ctx, &decl.name, method)?;
        methods.insert(method.name.clone(), descriptor);
    }

    let descriptor = TraitDescriptor {
        name: decl.name.clone(),
        properties,
        methods,
    };
    ctx.registry.register_trait(descriptor, decl.line)?;
    let name_const = ctx.add_constant(Value::string_from_str(&decl.name));
    ctx.emit(Instruction::new(Opcode::DeclareTrait, OperandType::Constant, name_const, OperandType::Unused, 0, OperandType::Unused, 0));
    Ok(())
}

/// An enum is represented as a final class whose cases are class constants
/// (spec §4.7): unbacked cases fold to their own name as a string; backed
/// cases fold their declared value.
pub fn lower_enum_decl(ctx: &mut CompileContext, decl: &EnumDecl) -> Result<(), CompileError> {
    let mut constants: hashbrown::HashMap<String, Value> = decl
        .cases
        .iter()
        .map(|case| {
            let value = match &case.value {
                Some(expr) => fold::try_fold(expr).unwrap_or(Value::Null),
                None => Value::string_from_str(&case.name),
            };
            (case.name.clone(), value)
        })
        .collect();
    for constant in &decl.constants {
        constants.insert(constant.name.clone(), fold::try_fold(&constant.value).unwrap_or(Value::Null));
    }

    let mut methods = hashbrown::HashMap::new();
    for method in &decl.methods {
        let descriptor = compile_method(ctx, &decl.name, method)?;
        methods.insert(method.name.clone(), descriptor);
    }

    let descriptor = ClassDescriptor {
        name: decl.name.clone(),
        parent_name: None,
        properties: Vec::new(),
        methods,
        constants,
        is_abstract: false,
        is_final: true,
        is_builtin: false,
        // spec §3/§4.7: "backed enums carry the backing scalar".
        backing_type: decl.backing_type.clone(),
    };
    ctx.registry.register_class(descriptor, decl.line)?;
    let name_const = ctx.add_constant(Value::string_from_str(&decl.name));
    ctx.emit(Instruction::new(Opcode::DeclareClass, OperandType::Constant, name_const, OperandType::Unused, 0, OperandType::Unused, 0));
    Ok(())
}

/// Lowers an `ArrowFunction` or `AnonymousFunction` expression into a
/// registered [`FunctionDescriptor`] and returns its id (spec §4.5,
/// `CreateClosure`'s constant operand). Capture copying at call time is an
/// execution-engine concern, out of scope for this compiler (spec §1); this
/// crate only records the parameter/`use` names a closure needs bound.
pub fn lower_closure(ctx: &mut CompileContext, expr: &Expr) -> Result<u32, CompileError> {
    let closure_id = ctx.next_closure_id();
    let name = format!("{{closure:{}}}", closure_id);

    let mut child = CompileContext::child(ScopeKind::Function);

    let (parameters, line, described) = match expr {
        Expr::ArrowFunction { parameters, body, line } => {
            let described = lower_parameters(&mut child, parameters)?;
            let value_temp = crate::lower::expr::lower_expr(&mut child, body)?;
            child.emit(Instruction::new(Opcode::Return, OperandType::Temporary, value_temp, OperandType::Unused, 0, OperandType::Unused, 0));
            (parameters, *line, described)
        }
        Expr::AnonymousFunction { parameters, uses, body, line } => {
            for (use_name, _) in uses {
                child.scopes.get_or_create(use_name);
            }
            let described = lower_parameters(&mut child, parameters)?;
            lower_stmts(&mut child, body)?;
            (parameters, *line, described)
        }
        _ => unreachable!("lower_closure is only called on ArrowFunction/AnonymousFunction"),
    };
    let is_variadic = parameters.last().map(|p| p.variadic).unwrap_or(false);

    let local_count = child.scopes.variable_count();
    let (instructions, constants, registry) = child.finish(line)?;
    ctx.registry.merge(registry);

    let descriptor = FunctionDescriptor {
        name: name.clone(),
        parameters: described,
        is_variadic,
        is_generator: false,
        is_anonymous: true,
        body: CompiledBody { instructions, constants, local_count },
    };
    ctx.registry.register_function(descriptor, line)?;
    Ok(closure_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Stmt;

    fn param(name: &str) -> AstParameter {
        AstParameter {
            name: name.into(),
            type_hint: None,
            by_reference: false,
            variadic: false,
            default: None,
            line: 1,
        }
    }

    #[test]
    fn function_decl_registers_and_emits_declare() {
        let mut ctx = CompileContext::new();
        let decl = FunctionDecl {
            name: "greet".into(),
            parameters: crate::vec![param("name")],
            body: crate::vec![Stmt::Return { value: None, line: 2 }],
            is_generator: false,
            line: 1,
        };
        lower_function_decl(&mut ctx, &decl).unwrap();
        assert!(ctx.registry.lookup_function("greet").is_some());
        assert!(ctx.instructions.iter().any(|i| i.opcode == Opcode::DeclareFunction));
    }

    #[test]
    fn duplicate_function_declaration_errors() {
        let mut ctx = CompileContext::new();
        let decl = FunctionDecl {
            name: "f".into(),
            parameters: Vec::new(),
            body: Vec::new(),
            is_generator: false,
            line: 1,
        };
        lower_function_decl(&mut ctx, &decl).unwrap();
        let err = lower_function_decl(&mut ctx, &decl).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyDeclared);
    }

    #[test]
    fn class_decl_with_unknown_trait_errors() {
        let mut ctx = CompileContext::new();
        let decl = ClassDecl {
            name: "Widget".into(),
            parent_name: None,
            implements: Vec::new(),
            uses_traits: crate::vec![String::from("Missing")],
            properties: Vec::new(),
            methods: Vec::new(),
            constants: Vec::new(),
            is_abstract: false,
            is_final: false,
            line: 1,
        };
        let err = lower_class_decl(&mut ctx, &decl).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TraitNotFound);
    }

    #[test]
    fn class_decl_folds_constant_and_registers_class() {
        let mut ctx = CompileContext::new();
        let decl = ClassDecl {
            name: "Point".into(),
            parent_name: None,
            implements: Vec::new(),
            uses_traits: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            constants: crate::vec![ClassConstDecl { name: "ORIGIN".into(), value: Expr::IntLiteral { value: 0, line: 1 } }],
            is_abstract: false,
            is_final: false,
            line: 1,
        };
        lower_class_decl(&mut ctx, &decl).unwrap();
        let class = ctx.registry.lookup_class("Point").unwrap();
        assert_eq!(class.constants.get("ORIGIN"), Some(&Value::Int(0)));
    }

    #[test]
    fn trait_use_copies_methods_into_class() {
        let mut ctx = CompileContext::new();
        let trait_decl = TraitDecl {
            name: "Greets".into(),
            properties: Vec::new(),
            methods: crate::vec![MethodDecl {
                name: "hello".into(),
                parameters: Vec::new(),
                body: Vec::new(),
                is_static: false,
                visibility: AstVisibility::Public,
                is_abstract: false,
                line: 1,
            }],
            line: 1,
        };
        lower_trait_decl(&mut ctx, &trait_decl).unwrap();

        let class_decl = ClassDecl {
            name: "Person".into(),
            parent_name: None,
            implements: Vec::new(),
            uses_traits: crate::vec![String::from("Greets")],
            properties: Vec::new(),
            methods: Vec::new(),
            constants: Vec::new(),
            is_abstract: false,
            is_final: false,
            line: 2,
        };
        lower_class_decl(&mut ctx, &class_decl).unwrap();
        let class = ctx.registry.lookup_class("Person").unwrap();
        assert!(class.methods.contains_key("hello"));
    }

    #[test]
    fn backed_enum_carries_its_backing_type_on_the_class_descriptor() {
        let mut ctx = CompileContext::new();
        let decl = EnumDecl {
            name: "Suit".into(),
            backing_type: Some("string".into()),
            implements: Vec::new(),
            cases: crate::vec![EnumCase {
                name: "Hearts".into(),
                value: Some(Expr::StringLiteral { value: "H".into(), line: 1 }),
            }],
            methods: Vec::new(),
            constants: Vec::new(),
            line: 1,
        };
        lower_enum_decl(&mut ctx, &decl).unwrap();
        let class = ctx.registry.lookup_class("Suit").unwrap();
        assert_eq!(class.backing_type.as_deref(), Some("string"));
        assert_eq!(class.constants.get("Hearts"), Some(&Value::string_from_str("H")));
    }

    #[test]
    fn unbacked_enum_has_no_backing_type() {
        let mut ctx = CompileContext::new();
        let decl = EnumDecl {
            name: "Direction".into(),
            backing_type: None,
            implements: Vec::new(),
            cases: crate::vec![EnumCase { name: "North".into(), value: None }],
            methods: Vec::new(),
            constants: Vec::new(),
            line: 1,
        };
        lower_enum_decl(&mut ctx, &decl).unwrap();
        let class = ctx.registry.lookup_class("Direction").unwrap();
        assert_eq!(class.backing_type, None);
    }

    #[test]
    fn arrow_function_lowers_to_registered_anonymous_function() {
        let mut ctx = CompileContext::new();
        let expr = Expr::ArrowFunction {
            parameters: crate::vec![param("x")],
            body: crate::Box::new(Expr::Variable { name: "x".into(), line: 1 }),
            line: 1,
        };
        let id = lower_closure(&mut ctx, &expr).unwrap();
        assert_eq!(id, 0);
        assert_eq!(ctx.registry.functions().count(), 1);
        assert!(ctx.registry.functions().next().unwrap().is_anonymous);
    }

    #[test]
    fn nested_closures_get_distinct_ids() {
        let mut ctx = CompileContext::new();
        let inner = Expr::ArrowFunction {
            parameters: Vec::new(),
            body: crate::Box::new(Expr::IntLiteral { value: 1, line: 1 }),
            line: 1,
        };
        let first = lower_closure(&mut ctx, &inner).unwrap();
        let second = lower_closure(&mut ctx, &inner).unwrap();
        assert_ne!(first, second);
    }
}
