//! Symbol registry: function/class/interface/trait/enum descriptors and
//! their lookup surfaces (spec §4.3).
//!
//! Grounded on the teacher's `scope_stack.rs` "complete, pre-populated,
//! lookup-by-name" shape, generalized from variable bindings to declared
//! symbols; the process-scope/per-unit split and the fluent class builder
//! follow spec §4.3 and §9's "isolate the global registry behind an
//! interface" resolution — `GlobalRegistry` is an explicit, caller-constructed
//! struct, never a bare `static`.

use hashbrown::HashMap;

use crate::error::{CompileError, ErrorKind};
use crate::instruction::Instruction;
use crate::value::Value;
use crate::{String, Vec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub type_hint: Option<String>,
    pub by_reference: bool,
    pub has_default: bool,
    /// Constant-folded default (spec §4, "Compile-time constant folding").
    pub default_value: Value,
}

/// A compiled function or method body: its own instruction/constant
/// streams, detached from the declaring unit's context once compilation of
/// the body completes (spec §5: "each function's compiled body is
/// detached from the unit context").
#[derive(Debug, Clone, Default)]
pub struct CompiledBody {
    pub instructions: Vec<Instruction>,
    pub constants: Vec<Value>,
    pub local_count: u32,
}

#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub is_variadic: bool,
    pub is_generator: bool,
    pub is_anonymous: bool,
    pub body: CompiledBody,
}

#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub type_hint: Option<String>,
    pub visibility: Visibility,
    pub is_static: bool,
    pub default_value: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ClassDescriptor {
    pub name: String,
    pub parent_name: Option<String>,
    pub properties: Vec<PropertyDescriptor>,
    pub methods: HashMap<String, FunctionDescriptor>,
    pub constants: HashMap<String, Value>,
    pub is_abstract: bool,
    pub is_final: bool,
    /// True for registry entries installed programmatically via
    /// [`ClassBuilder`] rather than lowered from a declaration.
    pub is_builtin: bool,
    /// Set when this descriptor represents a *backed* enum (spec §3, §4.7:
    /// "backed enums carry the backing scalar"); `None` for plain classes
    /// and for pure (unbacked) enums. Enums publish as plain
    /// `ClassDescriptor`s (spec §6: "registry snapshot ... (and enums as
    /// classes)"), so the backing type rides along as a field rather than
    /// a separate descriptor type.
    pub backing_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MethodSignature {
    pub name: String,
    pub visibility: Visibility,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Default)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub methods: Vec<MethodSignature>,
    pub extends: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TraitDescriptor {
    pub name: String,
    pub properties: Vec<PropertyDescriptor>,
    pub methods: HashMap<String, FunctionDescriptor>,
}

/// Per-compilation-unit symbol table (spec §4.3, §4.4: "function/class/
/// interface/trait registries for the current unit").
#[derive(Debug, Default)]
pub struct Registry {
    functions: HashMap<String, FunctionDescriptor>,
    classes: HashMap<String, ClassDescriptor>,
    interfaces: HashMap<String, InterfaceDescriptor>,
    traits: HashMap<String, TraitDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_function(&mut self, descriptor: FunctionDescriptor, line: u32) -> Result<(), CompileError> {
        if self.functions.contains_key(&descriptor.name) {
            return Err(CompileError::new(
                ErrorKind::AlreadyDeclared,
                line,
                crate::format!("function `{}` already declared", descriptor.name),
            ));
        }
        self.functions.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn register_class(&mut self, descriptor: ClassDescriptor, line: u32) -> Result<(), CompileError> {
        if self.classes.contains_key(&descriptor.name) {
            return Err(CompileError::new(
                ErrorKind::AlreadyDeclared,
                line,
                crate::format!("class `{}` already declared", descriptor.name),
            ));
        }
        self.classes.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn register_interface(&mut self, descriptor: InterfaceDescriptor, line: u32) -> Result<(), CompileError> {
        if self.interfaces.contains_key(&descriptor.name) {
            return Err(CompileError::new(
                ErrorKind::AlreadyDeclared,
                line,
                crate::format!("interface `{}` already declared", descriptor.name),
            ));
        }
        self.interfaces.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn register_trait(&mut self, descriptor: TraitDescriptor, line: u32) -> Result<(), CompileError> {
        if self.traits.contains_key(&descriptor.name) {
            return Err(CompileError::new(
                ErrorKind::AlreadyDeclared,
                line,
                crate::format!("trait `{}` already declared", descriptor.name),
            ));
        }
        self.traits.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    pub fn lookup_class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name)
    }

    pub fn lookup_class_mut(&mut self, name: &str) -> Option<&mut ClassDescriptor> {
        self.classes.get_mut(name)
    }

    pub fn lookup_interface(&self, name: &str) -> Option<&InterfaceDescriptor> {
        self.interfaces.get(name)
    }

    pub fn lookup_trait(&self, name: &str) -> Option<&TraitDescriptor> {
        self.traits.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values()
    }

    /// Folds `other` into `self`, last-definition-wins on name collisions
    /// (spec §5: "last-definition-wins on name collisions within a merged
    /// global registry unless the caller prevents duplicates").
    pub fn merge(&mut self, other: Registry) {
        self.functions.extend(other.functions);
        self.classes.extend(other.classes);
        self.interfaces.extend(other.interfaces);
        self.traits.extend(other.traits);
    }
}

/// Process-scope registry with init-once, read-mostly semantics (spec §5,
/// §9). An explicit struct rather than a bare `static` so embedders and
/// tests can construct independent instances.
#[derive(Debug, Default)]
pub struct GlobalRegistry {
    inner: Registry,
}

impl GlobalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_builtin_class(&mut self, descriptor: ClassDescriptor) -> Result<(), CompileError> {
        self.inner.register_class(descriptor, 0)
    }

    pub fn lookup_class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.inner.lookup_class(name)
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.inner.lookup_function(name)
    }

    pub fn merge_unit(&mut self, unit: Registry) {
        self.inner.merge(unit);
    }

    pub fn class_builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }
}

/// Fluent builder for programmatically registering a built-in class (spec
/// §4.3: "classes expose a fluent builder for programmatic registration of
/// built-ins").
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    descriptor: ClassDescriptor,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            descriptor: ClassDescriptor {
                name: name.into(),
                is_builtin: true,
                ..ClassDescriptor::default()
            },
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.descriptor.parent_name = Some(parent.into());
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.descriptor.is_abstract = true;
        self
    }

    pub fn final_(mut self) -> Self {
        self.descriptor.is_final = true;
        self
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        is_static: bool,
        default_value: Value,
    ) -> Self {
        self.descriptor.properties.push(PropertyDescriptor {
            name: name.into(),
            type_hint: None,
            visibility,
            is_static,
            default_value,
        });
        self
    }

    pub fn constant(mut self, name: impl Into<String>, value: Value) -> Self {
        self.descriptor.constants.insert(name.into(), value);
        self
    }

    /// Registers a method whose body is supplied pre-compiled — native or
    /// runtime handlers live in the execution engine, out of scope here
    /// (spec §1); this builder only records the method's signature/body
    /// contract so the registry can be queried uniformly.
    pub fn method(mut self, name: impl Into<String>, parameters: Vec<Parameter>, body: CompiledBody) -> Self {
        let name = name.into();
        self.descriptor.methods.insert(
            name.clone(),
            FunctionDescriptor {
                name,
                parameters,
                is_variadic: false,
                is_generator: false,
                is_anonymous: false,
                body,
            },
        );
        self
    }

    pub fn build(self) -> ClassDescriptor {
        self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str) -> FunctionDescriptor {
        FunctionDescriptor {
            name: name.into(),
            parameters: Vec::new(),
            is_variadic: false,
            is_generator: false,
            is_anonymous: false,
            body: CompiledBody::default(),
        }
    }

    #[test]
    fn duplicate_function_name_fails() {
        let mut registry = Registry::new();
        registry.register_function(function("f"), 1).unwrap();
        let err = registry.register_function(function("f"), 2).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyDeclared);
    }

    #[test]
    fn lookup_finds_registered_function() {
        let mut registry = Registry::new();
        registry.register_function(function("f"), 1).unwrap();
        assert!(registry.lookup_function("f").is_some());
        assert!(registry.lookup_function("g").is_none());
    }

    #[test]
    fn merge_is_last_wins() {
        let mut base = Registry::new();
        base.register_function(function("f"), 1).unwrap();

        let mut incoming = Registry::new();
        let mut replacement = function("f");
        replacement.is_variadic = true;
        incoming.register_function(replacement, 1).unwrap();

        base.merge(incoming);
        assert!(base.lookup_function("f").unwrap().is_variadic);
    }

    #[test]
    fn class_builder_produces_descriptor() {
        let descriptor = GlobalRegistry::class_builder("Counter")
            .property("value", Visibility::Private, false, Value::Int(0))
            .constant("MAX", Value::Int(100))
            .build();
        assert_eq!(descriptor.name, "Counter");
        assert_eq!(descriptor.properties.len(), 1);
        assert_eq!(descriptor.constants.get("MAX"), Some(&Value::Int(100)));
        assert!(descriptor.is_builtin);
    }
}
