//! Generic templates, instantiation caching, and inference
//!
//! A `GenericType` wraps a template type containing placeholders bound to
//! named generic variables, each with a constraint set and an optional
//! default. Instantiations (`Generate`s) are memoized by binding tuple:
//! identical tuples always yield the identical cached object, which is what
//! downstream identity-based deduplication relies on.

use crate::error::{SemanticError, SemanticResult};
use crate::interfaces::{InterfaceRegistry, InterfaceType};
use crate::overload::{check_arguments, ArgumentList};
use crate::symbols::Symbol;
use crate::types::{
    DataType, FunctionType, Parameter, StructType, TypeClassType, TypeKind,
};
use gale_syntax::Span;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One named generic variable: constraints it must satisfy plus an optional
/// default binding
#[derive(Debug, Clone)]
pub struct GenericVariable {
    pub name: String,
    pub constraints: Vec<Rc<InterfaceType>>,
    pub default: Option<DataType>,
}

impl GenericVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: Vec::new(),
            default: None,
        }
    }

    pub fn constrained(name: impl Into<String>, constraints: Vec<Rc<InterfaceType>>) -> Self {
        Self {
            name: name.into(),
            constraints,
            default: None,
        }
    }

    /// First constraint `binding` fails to satisfy, if any
    fn failing_constraint(
        &self,
        binding: &DataType,
        registry: &mut InterfaceRegistry,
    ) -> Option<Rc<InterfaceType>> {
        self.constraints
            .iter()
            .find(|constraint| !constraint_satisfied(constraint, binding, registry))
            .cloned()
    }
}

/// A constraint is satisfied by a registered binder of the interface, or
/// structurally: every constraint method must be offered by the binding's
/// implicit interface.
fn constraint_satisfied(
    constraint: &InterfaceType,
    binding: &DataType,
    registry: &mut InterfaceRegistry,
) -> bool {
    if constraint.coerces_from(binding) {
        return true;
    }
    if constraint.method_count() == 0 {
        // an empty constraint can only be satisfied by an explicit bind
        return false;
    }
    let implicit = registry.interface_of(binding);
    constraint.methods().iter().all(|(name, method)| {
        implicit
            .get_method(name)
            .map(|own| method.symbol.data_type.coerce(&own.symbol.data_type))
            .unwrap_or(false)
    })
}

/// One concrete instantiation of a generic: the binding tuple that produced
/// it and the substituted concrete type
#[derive(Debug)]
pub struct Generate {
    pub bindings: Vec<DataType>,
    pub concrete: DataType,
}

/// A placeholder-bearing template of any other type variant
#[derive(Debug)]
pub struct GenericType {
    pub name: String,
    pub variables: Vec<GenericVariable>,
    pub template: DataType,
    generates: RefCell<Vec<Rc<Generate>>>,
}

impl GenericType {
    pub fn new(
        name: impl Into<String>,
        variables: Vec<GenericVariable>,
        template: DataType,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            variables,
            template,
            generates: RefCell::new(Vec::new()),
        })
    }

    pub fn display_name(&self) -> String {
        let vars: Vec<&str> = self.variables.iter().map(|v| v.name.as_str()).collect();
        format!("{}<{}>", self.name, vars.join(", "))
    }

    /// Produced instantiations, in creation order (the monomorphization set)
    pub fn generates(&self) -> Vec<Rc<Generate>> {
        self.generates.borrow().clone()
    }

    /// Explicit instantiation: validate each binding against its variable's
    /// constraints, then return the cached Generate for a structurally-equal
    /// binding tuple or substitute and cache a new one.
    pub fn create_generic(
        &self,
        mut bindings: Vec<DataType>,
        registry: &mut InterfaceRegistry,
        span: Span,
    ) -> SemanticResult<Rc<Generate>> {
        // defaults fill the unbound tail
        if bindings.len() < self.variables.len() {
            for variable in &self.variables[bindings.len()..] {
                match &variable.default {
                    Some(default) => bindings.push(default.clone()),
                    None => break,
                }
            }
        }

        if bindings.len() != self.variables.len() {
            return Err(SemanticError::GenericArityMismatch {
                generic: self.name.clone(),
                expected: self.variables.len(),
                found: bindings.len(),
                span: span.into(),
            });
        }

        for (variable, binding) in self.variables.iter().zip(bindings.iter()) {
            if let Some(constraint) = variable.failing_constraint(binding, registry) {
                return Err(SemanticError::GenericConstraintViolation {
                    variable: variable.name.clone(),
                    binding: binding.to_string(),
                    constraint: constraint.display_name(),
                    span: span.into(),
                });
            }
        }

        // memoized: identical binding tuples return the identical object
        if let Some(cached) = self.generates.borrow().iter().find(|generate| {
            generate.bindings.len() == bindings.len()
                && generate
                    .bindings
                    .iter()
                    .zip(bindings.iter())
                    .all(|(a, b)| a.equals(b))
        }) {
            return Ok(Rc::clone(cached));
        }

        let mut substitutions = HashMap::new();
        for (variable, binding) in self.variables.iter().zip(bindings.iter()) {
            substitutions.insert(variable.name.clone(), binding.clone());
        }

        let concrete = substitute(&self.template, &substitutions);
        let generate = Rc::new(Generate { bindings, concrete });
        self.generates.borrow_mut().push(Rc::clone(&generate));
        Ok(generate)
    }

    /// Infer bindings from call arguments; the template must be a function.
    /// Failure is recoverable: the caller falls back to requiring explicit
    /// generic specification.
    pub fn infer(&self, args: &ArgumentList) -> Option<Vec<DataType>> {
        let function = match &self.template.kind {
            TypeKind::Function(function) => Rc::clone(function),
            _ => return None,
        };

        let mut bound = HashMap::new();

        for (position, supplied) in args.unnamed.iter().enumerate() {
            let parameter = function.parameters.get(position).or_else(|| {
                function
                    .parameters
                    .last()
                    .filter(|parameter| parameter.indefinite)
            })?;
            if !unify(&parameter.data_type, supplied, &mut bound) {
                return None;
            }
        }

        for (name, supplied) in args.named.iter() {
            let parameter = function
                .parameters
                .iter()
                .find(|parameter| &parameter.name == name)?;
            if !unify(&parameter.data_type, supplied, &mut bound) {
                return None;
            }
        }

        self.collect_bindings(&bound)
    }

    /// Infer bindings from an initializer list; the template must be a struct
    pub fn infer_named(&self, fields: &IndexMap<String, DataType>) -> Option<Vec<DataType>> {
        let st = match &self.template.kind {
            TypeKind::Struct(st) | TypeKind::StructInstance(st) => Rc::clone(st),
            _ => return None,
        };

        let mut bound = HashMap::new();
        for (name, supplied) in fields.iter() {
            let declared = st.member_type(name)?;
            if !unify(&declared, supplied, &mut bound) {
                return None;
            }
        }

        self.collect_bindings(&bound)
    }

    fn collect_bindings(&self, bound: &HashMap<String, DataType>) -> Option<Vec<DataType>> {
        self.variables
            .iter()
            .map(|variable| {
                bound
                    .get(&variable.name)
                    .cloned()
                    .or_else(|| variable.default.clone())
            })
            .collect()
    }
}

/// Unify a placeholder-bearing declared type against a supplied type,
/// recording the first type bound to each placeholder. A placeholder bound
/// twice must unify consistently with its first binding.
pub(crate) fn unify(
    declared: &DataType,
    supplied: &DataType,
    bound: &mut HashMap<String, DataType>,
) -> bool {
    match (&declared.kind, &supplied.kind) {
        (TypeKind::GenericPlaceholder(name), _) => match bound.get(name) {
            Some(existing) => {
                if existing.coerce(supplied) {
                    true
                } else if supplied.coerce(existing) {
                    bound.insert(name.clone(), supplied.clone());
                    true
                } else {
                    false
                }
            }
            None => {
                bound.insert(name.clone(), supplied.clone());
                true
            }
        },
        (TypeKind::GenericAlias { replacement, .. }, _) => unify(replacement, supplied, bound),
        (_, TypeKind::GenericAlias { replacement, .. }) => unify(declared, replacement, bound),

        (
            TypeKind::Array { element, .. },
            TypeKind::Array {
                element: other_element,
                ..
            },
        )
        | (TypeKind::List { element }, TypeKind::List { element: other_element })
        | (TypeKind::List { element }, TypeKind::Array { element: other_element, .. }) => {
            unify(element, other_element, bound)
        }

        (
            TypeKind::Dict { key, value },
            TypeKind::Dict {
                key: other_key,
                value: other_value,
            },
        ) => unify(key, other_key, bound) && unify(value, other_value, bound),

        (
            TypeKind::Pointer { pointee, depth, .. },
            TypeKind::Pointer {
                pointee: other_pointee,
                depth: other_depth,
                ..
            },
        ) => depth == other_depth && unify(pointee, other_pointee, bound),

        (TypeKind::Reference(pointee), TypeKind::Reference(other_pointee)) => {
            unify(pointee, other_pointee, bound)
        }

        (TypeKind::Tuple(elements), TypeKind::Tuple(other_elements)) => {
            elements.len() == other_elements.len()
                && elements
                    .iter()
                    .zip(other_elements.iter())
                    .all(|(a, b)| unify(a, b, bound))
        }

        (TypeKind::Function(declared_fn), TypeKind::Function(supplied_fn)) => {
            declared_fn.parameters.len() == supplied_fn.parameters.len()
                && declared_fn.is_async == supplied_fn.is_async
                && declared_fn
                    .parameters
                    .iter()
                    .zip(supplied_fn.parameters.iter())
                    .all(|(a, b)| unify(&a.data_type, &b.data_type, bound))
                && unify(&declared_fn.return_type, &supplied_fn.return_type, bound)
        }

        _ => declared.coerce(supplied),
    }
}

/// Substitute placeholders throughout a template, recursively, including
/// nested generic fields. Nominal payloads are rebuilt behind fresh `Rc`s so
/// distinct instantiations never share mutable state.
pub fn substitute(template: &DataType, bindings: &HashMap<String, DataType>) -> DataType {
    let kind = match &template.kind {
        TypeKind::GenericPlaceholder(name) => match bindings.get(name) {
            Some(binding) => binding.kind.clone(),
            None => template.kind.clone(),
        },
        TypeKind::GenericAlias { name, replacement } => TypeKind::GenericAlias {
            name: name.clone(),
            replacement: Box::new(substitute(replacement, bindings)),
        },
        TypeKind::Array { element, size } => TypeKind::Array {
            element: Box::new(substitute(element, bindings)),
            size: *size,
        },
        TypeKind::List { element } => TypeKind::List {
            element: Box::new(substitute(element, bindings)),
        },
        TypeKind::Dict { key, value } => TypeKind::Dict {
            key: Box::new(substitute(key, bindings)),
            value: Box::new(substitute(value, bindings)),
        },
        TypeKind::Pointer {
            pointee,
            depth,
            owned,
        } => TypeKind::Pointer {
            pointee: Box::new(substitute(pointee, bindings)),
            depth: *depth,
            owned: *owned,
        },
        TypeKind::Reference(pointee) => {
            TypeKind::Reference(Box::new(substitute(pointee, bindings)))
        }
        TypeKind::Tuple(elements) => TypeKind::Tuple(
            elements
                .iter()
                .map(|element| substitute(element, bindings))
                .collect(),
        ),
        TypeKind::Function(function) => TypeKind::Function(Rc::new(FunctionType::new(
            function
                .parameters
                .iter()
                .map(|parameter| Parameter {
                    name: parameter.name.clone(),
                    data_type: substitute(&parameter.data_type, bindings),
                    optional: parameter.optional,
                    indefinite: parameter.indefinite,
                    constant: parameter.constant,
                })
                .collect(),
            substitute(&function.return_type, bindings),
            function.is_async,
        ))),
        TypeKind::Struct(st) => TypeKind::Struct(substitute_struct(st, bindings)),
        TypeKind::StructInstance(st) => TypeKind::StructInstance(substitute_struct(st, bindings)),
        TypeKind::Interface(it) => TypeKind::Interface(substitute_interface(it, bindings)),
        TypeKind::InterfaceInstance(it) => {
            TypeKind::InterfaceInstance(substitute_interface(it, bindings))
        }
        TypeKind::TypeClass(tc) => TypeKind::TypeClass(substitute_type_class(tc, bindings)),
        TypeKind::TypeClassVariant {
            variant,
            needs_construction,
        } => {
            // rebuild through the parent so the variant keeps a live backlink
            let substituted = variant
                .parent()
                .and_then(|parent| substitute_type_class(&parent, bindings).variant(&variant.name))
                .unwrap_or_else(|| {
                    let standalone = TypeClassType::new(
                        variant.parent_name(),
                        vec![(
                            variant.name.clone(),
                            variant
                                .values
                                .iter()
                                .map(|value| substitute(value, bindings))
                                .collect(),
                        )],
                    );
                    standalone.variants[0].clone()
                });
            TypeKind::TypeClassVariant {
                variant: substituted,
                needs_construction: *needs_construction,
            }
        }
        TypeKind::Generic(generic) => TypeKind::Generic(GenericType::new(
            generic.name.clone(),
            generic.variables.clone(),
            substitute(&generic.template, bindings),
        )),
        other => other.clone(),
    };

    DataType {
        kind,
        constant: template.constant,
    }
}

fn substitute_struct(st: &Rc<StructType>, bindings: &HashMap<String, DataType>) -> Rc<StructType> {
    let substituted = StructType::new(st.name.clone());
    for (name, member) in st.members().iter() {
        substituted.add_member(Symbol::with_modifiers(
            name.clone(),
            substitute(&member.data_type, bindings),
            member.modifiers.clone(),
        ));
    }
    for constructor in st.constructors() {
        if let TypeKind::Function(function) =
            substitute(&DataType::new(TypeKind::Function(constructor)), bindings).kind
        {
            substituted.add_constructor(function);
        }
    }
    substituted
}

fn substitute_interface(
    it: &Rc<InterfaceType>,
    bindings: &HashMap<String, DataType>,
) -> Rc<InterfaceType> {
    let substituted = match &it.name {
        Some(name) => InterfaceType::declared(name.clone(), it.super_form),
        None => InterfaceType::implicit(),
    };
    for (name, method) in it.methods().iter() {
        substituted.add_method(
            Symbol::with_modifiers(
                name.clone(),
                substitute(&method.symbol.data_type, bindings),
                method.symbol.modifiers.clone(),
            ),
            method.status,
        );
    }
    substituted
}

fn substitute_type_class(
    tc: &Rc<TypeClassType>,
    bindings: &HashMap<String, DataType>,
) -> Rc<TypeClassType> {
    TypeClassType::new(
        tc.name.clone(),
        tc.variants
            .iter()
            .map(|variant| {
                (
                    variant.name.clone(),
                    variant
                        .values
                        .iter()
                        .map(|value| substitute(value, bindings))
                        .collect(),
                )
            })
            .collect(),
    )
}

/// A set of same-named generic function templates
#[derive(Debug)]
pub struct GenericGroup {
    pub name: String,
    pub templates: Vec<Rc<GenericType>>,
}

impl GenericGroup {
    pub fn new(name: impl Into<String>, templates: Vec<Rc<GenericType>>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            templates,
        })
    }

    /// Infer-then-instantiate each template and select the unique one whose
    /// produced function matches the arguments
    pub fn get_function(
        &self,
        args: &ArgumentList,
        registry: &mut InterfaceRegistry,
        span: Span,
    ) -> SemanticResult<(Rc<Generate>, Rc<FunctionType>)> {
        let mut matches = Vec::new();

        for template in &self.templates {
            let Some(bindings) = template.infer(args) else {
                continue;
            };
            let Ok(generate) = template.create_generic(bindings, registry, span) else {
                continue;
            };
            if let TypeKind::Function(function) = &generate.concrete.kind {
                if check_arguments(function, args).is_ok() {
                    matches.push((generate.clone(), Rc::clone(function)));
                }
            }
        }

        match matches.len() {
            0 => Err(SemanticError::NoMatchingOverload {
                group: self.name.clone(),
                span: span.into(),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(SemanticError::AmbiguousOverload {
                group: self.name.clone(),
                span: span.into(),
            }),
        }
    }
}
