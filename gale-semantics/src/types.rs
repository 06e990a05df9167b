//! Type model and coercion algebra for the Gale semantic core
//!
//! `DataType` is the closed tagged union every expression resolves to.
//! Coercion is directional and structural: `target.coerce(candidate)` asks
//! whether a value of the candidate type may be used where the target type is
//! expected. Equality is exact-shape identity and must agree on constancy.
//! Both predicates are total; callers turn `false` into diagnostics.

use crate::generics::{GenericGroup, GenericType};
use crate::interfaces::InterfaceType;
use crate::overload::FunctionGroup;
use crate::symbols::Symbol;
use indexmap::IndexMap;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Classifier tag for every type variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClassifier {
    Simple,
    Array,
    List,
    Dict,
    Pointer,
    Reference,
    Tuple,
    Function,
    FunctionGroup,
    Struct,
    StructInstance,
    Interface,
    InterfaceInstance,
    TypeClass,
    TypeClassInstance,
    Generic,
    GenericGroup,
    GenericAlias,
    GenericPlaceholder,
    Package,
    SelfRef,
    Void,
    Incomplete,
}

/// Sub-kind of a primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleKind {
    Bool,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Str,
}

/// A primitive type: sub-kind plus signedness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleType {
    pub kind: SimpleKind,
    pub unsigned: bool,
}

impl SimpleType {
    pub fn new(kind: SimpleKind) -> Self {
        Self {
            kind,
            unsigned: false,
        }
    }

    pub fn unsigned(kind: SimpleKind) -> Self {
        Self {
            kind,
            unsigned: true,
        }
    }

    /// Widening rank for numeric sub-kinds; non-numeric kinds have none
    fn rank(kind: SimpleKind) -> Option<u8> {
        match kind {
            SimpleKind::Byte => Some(1),
            SimpleKind::Short => Some(2),
            SimpleKind::Int => Some(3),
            SimpleKind::Long => Some(4),
            SimpleKind::Float => Some(5),
            SimpleKind::Double => Some(6),
            SimpleKind::Bool | SimpleKind::Char | SimpleKind::Str => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self.kind,
            SimpleKind::Byte | SimpleKind::Short | SimpleKind::Int | SimpleKind::Long
        )
    }

    /// Sub-kind coercion: identical kinds, declared widening, and the two
    /// char promotions. Equal ranks never cross signedness.
    pub fn coerce(&self, other: &SimpleType) -> bool {
        if self == other {
            return true;
        }

        match (self.kind, other.kind) {
            (SimpleKind::Str, SimpleKind::Char) => true,
            (SimpleKind::Int | SimpleKind::Long, SimpleKind::Char) => true,
            _ => match (Self::rank(self.kind), Self::rank(other.kind)) {
                (Some(target), Some(source)) => {
                    target > source || (target == source && self.unsigned == other.unsigned)
                }
                _ => false,
            },
        }
    }
}

/// A declared function parameter
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub data_type: DataType,
    pub optional: bool,
    pub indefinite: bool,
    pub constant: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            optional: false,
            indefinite: false,
            constant: false,
        }
    }

    pub fn optional(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            optional: true,
            ..Self::new(name, data_type)
        }
    }

    /// Trailing variadic parameter absorbing remaining positional arguments
    pub fn indefinite(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            indefinite: true,
            ..Self::new(name, data_type)
        }
    }
}

/// A function signature: named parameters, return type, async-ness
#[derive(Debug, Clone)]
pub struct FunctionType {
    pub parameters: Vec<Parameter>,
    pub return_type: DataType,
    pub is_async: bool,
}

impl FunctionType {
    pub fn new(parameters: Vec<Parameter>, return_type: DataType, is_async: bool) -> Self {
        Self {
            parameters,
            return_type,
            is_async,
        }
    }

    /// Function-type compatibility: per-parameter exact equality (including
    /// the optional/indefinite flags), coercible return type, equal async-ness.
    pub fn compatible(&self, other: &FunctionType) -> bool {
        if self.is_async != other.is_async || self.parameters.len() != other.parameters.len() {
            return false;
        }

        self.parameters
            .iter()
            .zip(other.parameters.iter())
            .all(|(a, b)| {
                a.optional == b.optional
                    && a.indefinite == b.indefinite
                    && a.data_type.equals(&b.data_type)
            })
            && self.return_type.coerce(&other.return_type)
    }
}

/// A struct: ordered, named member map plus a constructor set
#[derive(Debug)]
pub struct StructType {
    pub name: String,
    members: RefCell<IndexMap<String, Symbol>>,
    constructors: RefCell<Vec<Rc<FunctionType>>>,
}

impl StructType {
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            members: RefCell::new(IndexMap::new()),
            constructors: RefCell::new(Vec::new()),
        })
    }

    /// Add a member; false on a duplicate name
    pub fn add_member(&self, symbol: Symbol) -> bool {
        let mut members = self.members.borrow_mut();
        if members.contains_key(&symbol.name) {
            return false;
        }
        members.insert(symbol.name.clone(), symbol);
        true
    }

    pub fn members(&self) -> Ref<'_, IndexMap<String, Symbol>> {
        self.members.borrow()
    }

    pub fn member_type(&self, name: &str) -> Option<DataType> {
        self.members
            .borrow()
            .get(name)
            .map(|symbol| symbol.data_type.clone())
    }

    pub fn member_count(&self) -> usize {
        self.members.borrow().len()
    }

    /// Add a constructor; false on a duplicate signature
    pub fn add_constructor(&self, constructor: Rc<FunctionType>) -> bool {
        let mut constructors = self.constructors.borrow_mut();
        if constructors.iter().any(|existing| {
            existing.parameters.len() == constructor.parameters.len()
                && existing
                    .parameters
                    .iter()
                    .zip(constructor.parameters.iter())
                    .all(|(a, b)| a.data_type.equals(&b.data_type))
        }) {
            return false;
        }
        constructors.push(constructor);
        true
    }

    pub fn constructors(&self) -> Vec<Rc<FunctionType>> {
        self.constructors.borrow().clone()
    }

    /// Synthesize a zero-argument default constructor when none was declared
    pub fn ensure_default_constructor(&self) {
        if self.constructors.borrow().is_empty() {
            self.constructors.borrow_mut().push(Rc::new(FunctionType::new(
                Vec::new(),
                DataType::void(),
                false,
            )));
        }
    }

    fn structural_equals(&self, other: &StructType) -> bool {
        if self.name != other.name {
            return false;
        }
        let ours = self.members.borrow();
        let theirs = other.members.borrow();
        ours.len() == theirs.len()
            && ours
                .iter()
                .zip(theirs.iter())
                .all(|((an, a), (bn, b))| an == bn && a.data_type.equals(&b.data_type))
    }
}

/// A sum type: named variants carrying zero or more value types
#[derive(Debug)]
pub struct TypeClassType {
    pub name: String,
    pub variants: Vec<Rc<TypeClassVariant>>,
}

/// One named variant of a type class
#[derive(Debug)]
pub struct TypeClassVariant {
    pub name: String,
    pub values: Vec<DataType>,
    parent: RefCell<Weak<TypeClassType>>,
}

impl TypeClassType {
    pub fn new(name: impl Into<String>, variants: Vec<(String, Vec<DataType>)>) -> Rc<Self> {
        let type_class = Rc::new(Self {
            name: name.into(),
            variants: variants
                .into_iter()
                .map(|(variant_name, values)| {
                    Rc::new(TypeClassVariant {
                        name: variant_name,
                        values,
                        parent: RefCell::new(Weak::new()),
                    })
                })
                .collect(),
        });
        for variant in &type_class.variants {
            *variant.parent.borrow_mut() = Rc::downgrade(&type_class);
        }
        type_class
    }

    pub fn variant(&self, name: &str) -> Option<Rc<TypeClassVariant>> {
        self.variants.iter().find(|v| v.name == name).cloned()
    }
}

impl TypeClassVariant {
    pub fn parent(&self) -> Option<Rc<TypeClassType>> {
        self.parent.borrow().upgrade()
    }

    pub fn parent_name(&self) -> String {
        self.parent()
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }
}

/// A package: namespace of exported symbols
#[derive(Debug)]
pub struct PackageType {
    pub name: String,
    exports: IndexMap<String, Symbol>,
}

impl PackageType {
    pub fn new(name: impl Into<String>, exports: IndexMap<String, Symbol>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            exports,
        })
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.exports.get(name).cloned()
    }
}

/// Self-referential marker used while a type's own body is being defined.
/// The real type is patched in once the declaration completes; ownership of
/// the self-reference is always through this shared indirection.
#[derive(Debug)]
pub struct SelfCell {
    pub name: String,
    resolved: RefCell<Option<DataType>>,
}

impl SelfCell {
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            resolved: RefCell::new(None),
        })
    }

    pub fn resolve(&self, data_type: DataType) {
        *self.resolved.borrow_mut() = Some(data_type);
    }

    pub fn resolved(&self) -> Option<DataType> {
        self.resolved.borrow().clone()
    }
}

/// The closed set of type variants
#[derive(Debug, Clone)]
pub enum TypeKind {
    Simple(SimpleType),
    Array {
        element: Box<DataType>,
        /// `None` = unsized
        size: Option<usize>,
    },
    List {
        element: Box<DataType>,
    },
    Dict {
        key: Box<DataType>,
        value: Box<DataType>,
    },
    Pointer {
        pointee: Box<DataType>,
        depth: u32,
        owned: bool,
    },
    Reference(Box<DataType>),
    Tuple(Vec<DataType>),
    Function(Rc<FunctionType>),
    FunctionGroup(Rc<FunctionGroup>),
    Struct(Rc<StructType>),
    StructInstance(Rc<StructType>),
    Interface(Rc<InterfaceType>),
    InterfaceInstance(Rc<InterfaceType>),
    TypeClass(Rc<TypeClassType>),
    TypeClassVariant {
        variant: Rc<TypeClassVariant>,
        /// Value-carrying variants must be constructed exactly once
        needs_construction: bool,
    },
    Generic(Rc<GenericType>),
    GenericGroup(Rc<GenericGroup>),
    GenericAlias {
        name: String,
        replacement: Box<DataType>,
    },
    GenericPlaceholder(String),
    Package(Rc<PackageType>),
    SelfRef(Rc<SelfCell>),
    Void,
    Incomplete,
}

/// A type plus its constancy flag
#[derive(Debug, Clone)]
pub struct DataType {
    pub kind: TypeKind,
    pub constant: bool,
}

impl DataType {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            constant: false,
        }
    }

    pub fn simple(simple: SimpleType) -> Self {
        Self::new(TypeKind::Simple(simple))
    }

    pub fn bool_type() -> Self {
        Self::simple(SimpleType::new(SimpleKind::Bool))
    }

    pub fn int() -> Self {
        Self::simple(SimpleType::new(SimpleKind::Int))
    }

    pub fn long() -> Self {
        Self::simple(SimpleType::new(SimpleKind::Long))
    }

    pub fn float() -> Self {
        Self::simple(SimpleType::new(SimpleKind::Float))
    }

    pub fn double() -> Self {
        Self::simple(SimpleType::new(SimpleKind::Double))
    }

    pub fn char_type() -> Self {
        Self::simple(SimpleType::new(SimpleKind::Char))
    }

    pub fn str_type() -> Self {
        Self::simple(SimpleType::new(SimpleKind::Str))
    }

    pub fn void() -> Self {
        Self::new(TypeKind::Void)
    }

    pub fn incomplete() -> Self {
        Self::new(TypeKind::Incomplete)
    }

    pub fn array(element: DataType, size: Option<usize>) -> Self {
        Self::new(TypeKind::Array {
            element: Box::new(element),
            size,
        })
    }

    pub fn list(element: DataType) -> Self {
        Self::new(TypeKind::List {
            element: Box::new(element),
        })
    }

    pub fn dict(key: DataType, value: DataType) -> Self {
        Self::new(TypeKind::Dict {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn pointer(pointee: DataType, depth: u32, owned: bool) -> Self {
        Self::new(TypeKind::Pointer {
            pointee: Box::new(pointee),
            depth,
            owned,
        })
    }

    pub fn reference(pointee: DataType) -> Self {
        Self::new(TypeKind::Reference(Box::new(pointee)))
    }

    pub fn tuple(elements: Vec<DataType>) -> Self {
        Self::new(TypeKind::Tuple(elements))
    }

    pub fn function(function: FunctionType) -> Self {
        Self::new(TypeKind::Function(Rc::new(function)))
    }

    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(TypeKind::GenericPlaceholder(name.into()))
    }

    /// A constant-qualified copy of this type
    pub fn const_copy(&self) -> DataType {
        DataType {
            kind: self.kind.clone(),
            constant: true,
        }
    }

    pub fn classify(&self) -> TypeClassifier {
        match &self.kind {
            TypeKind::Simple(_) => TypeClassifier::Simple,
            TypeKind::Array { .. } => TypeClassifier::Array,
            TypeKind::List { .. } => TypeClassifier::List,
            TypeKind::Dict { .. } => TypeClassifier::Dict,
            TypeKind::Pointer { .. } => TypeClassifier::Pointer,
            TypeKind::Reference(_) => TypeClassifier::Reference,
            TypeKind::Tuple(_) => TypeClassifier::Tuple,
            TypeKind::Function(_) => TypeClassifier::Function,
            TypeKind::FunctionGroup(_) => TypeClassifier::FunctionGroup,
            TypeKind::Struct(_) => TypeClassifier::Struct,
            TypeKind::StructInstance(_) => TypeClassifier::StructInstance,
            TypeKind::Interface(_) => TypeClassifier::Interface,
            TypeKind::InterfaceInstance(_) => TypeClassifier::InterfaceInstance,
            TypeKind::TypeClass(_) => TypeClassifier::TypeClass,
            TypeKind::TypeClassVariant { .. } => TypeClassifier::TypeClassInstance,
            TypeKind::Generic(_) => TypeClassifier::Generic,
            TypeKind::GenericGroup(_) => TypeClassifier::GenericGroup,
            TypeKind::GenericAlias { .. } => TypeClassifier::GenericAlias,
            TypeKind::GenericPlaceholder(_) => TypeClassifier::GenericPlaceholder,
            TypeKind::Package(_) => TypeClassifier::Package,
            TypeKind::SelfRef(_) => TypeClassifier::SelfRef,
            TypeKind::Void => TypeClassifier::Void,
            TypeKind::Incomplete => TypeClassifier::Incomplete,
        }
    }

    /// Directional structural coercion: may a value of type `other` be used
    /// where `self` is expected? Total; never errors.
    pub fn coerce(&self, other: &DataType) -> bool {
        // deferred sub-expressions fit anywhere until context arrives
        if matches!(other.kind, TypeKind::Incomplete) {
            return true;
        }

        // a non-constant target never accepts a constant-only source
        if !self.constant && other.constant {
            return false;
        }

        // super-form interfaces are never usable as literal value types
        if let TypeKind::Interface(it) | TypeKind::InterfaceInstance(it) = &other.kind {
            if it.super_form {
                return false;
            }
        }

        if matches!(
            other.kind,
            TypeKind::Void | TypeKind::GenericPlaceholder(_)
        ) {
            return true;
        }

        // references auto-deref on the source side only
        if !matches!(self.kind, TypeKind::Reference(_)) {
            if let TypeKind::Reference(pointee) = &other.kind {
                return self.coerce(pointee);
            }
        }

        if let TypeKind::GenericAlias { replacement, .. } = &other.kind {
            return self.coerce(replacement);
        }

        if let TypeKind::SelfRef(cell) = &other.kind {
            if !matches!(self.kind, TypeKind::SelfRef(_)) {
                return match cell.resolved() {
                    Some(resolved) => self.coerce(&resolved),
                    None => false,
                };
            }
        }

        self.coerce_kind(other)
    }

    fn coerce_kind(&self, other: &DataType) -> bool {
        match (&self.kind, &other.kind) {
            (TypeKind::Void, _) | (TypeKind::Incomplete, _) => true,
            (TypeKind::GenericPlaceholder(_), _) => true,
            (TypeKind::GenericAlias { replacement, .. }, _) => replacement.coerce(other),

            (TypeKind::Simple(target), TypeKind::Simple(source)) => target.coerce(source),

            (
                TypeKind::Array { element, size },
                TypeKind::Array {
                    element: other_element,
                    size: other_size,
                },
            ) => {
                element.coerce(other_element)
                    && match size {
                        None => true,
                        Some(expected) => *other_size == Some(*expected),
                    }
            }

            // lists accept both lists and arrays with coercible elements
            (TypeKind::List { element }, TypeKind::List { element: other_element })
            | (TypeKind::List { element }, TypeKind::Array { element: other_element, .. }) => {
                element.coerce(other_element)
            }

            (
                TypeKind::Dict { key, value },
                TypeKind::Dict {
                    key: other_key,
                    value: other_value,
                },
            ) => key.coerce(other_key) && value.coerce(other_value),

            (
                TypeKind::Pointer { pointee, depth, .. },
                TypeKind::Pointer {
                    pointee: other_pointee,
                    depth: other_depth,
                    ..
                },
            ) => {
                depth == other_depth
                    && (pointee.equals(other_pointee)
                        || matches!(pointee.kind, TypeKind::Void)
                        || matches!(other_pointee.kind, TypeKind::Void))
            }

            (TypeKind::Reference(pointee), TypeKind::Reference(other_pointee)) => {
                pointee.equals(other_pointee)
            }

            (TypeKind::Tuple(elements), TypeKind::Tuple(other_elements)) => {
                elements.len() == other_elements.len()
                    && elements
                        .iter()
                        .zip(other_elements.iter())
                        .all(|(a, b)| a.coerce(b))
            }

            (TypeKind::Function(target), TypeKind::Function(source)) => target.compatible(source),

            (TypeKind::StructInstance(target), TypeKind::StructInstance(source)) => {
                Rc::ptr_eq(target, source) || target.structural_equals(source)
            }

            (TypeKind::InterfaceInstance(target), _) => target.coerces_from(other),

            (TypeKind::TypeClass(target), TypeKind::TypeClass(source)) => {
                Rc::ptr_eq(target, source) || target.name == source.name
            }
            (TypeKind::TypeClass(target), TypeKind::TypeClassVariant { variant, .. }) => variant
                .parent()
                .map(|parent| Rc::ptr_eq(target, &parent) || target.name == parent.name)
                .unwrap_or(false),

            (
                TypeKind::TypeClassVariant { variant, .. },
                TypeKind::TypeClassVariant {
                    variant: other_variant,
                    ..
                },
            ) => {
                Rc::ptr_eq(variant, other_variant)
                    || (variant.name == other_variant.name
                        && variant.parent_name() == other_variant.parent_name())
            }

            // a type is always compatible with itself while being defined
            (TypeKind::SelfRef(_), TypeKind::SelfRef(_)) => true,
            (TypeKind::SelfRef(cell), _) => cell
                .resolved()
                .map(|resolved| resolved.coerce(other))
                .unwrap_or(false),

            _ => self.equals(other),
        }
    }

    /// Exact-shape identity, independent of coercion; constancy must agree
    pub fn equals(&self, other: &DataType) -> bool {
        if let TypeKind::GenericAlias { replacement, .. } = &other.kind {
            return self.equals(replacement);
        }
        if let TypeKind::GenericAlias { replacement, .. } = &self.kind {
            return replacement.equals(other);
        }

        if self.constant != other.constant {
            return false;
        }

        self.kind_equals(other)
    }

    fn kind_equals(&self, other: &DataType) -> bool {
        match (&self.kind, &other.kind) {
            (TypeKind::Simple(a), TypeKind::Simple(b)) => a == b,
            (
                TypeKind::Array { element, size },
                TypeKind::Array {
                    element: other_element,
                    size: other_size,
                },
            ) => size == other_size && element.equals(other_element),
            (TypeKind::List { element }, TypeKind::List { element: other_element }) => {
                element.equals(other_element)
            }
            (
                TypeKind::Dict { key, value },
                TypeKind::Dict {
                    key: other_key,
                    value: other_value,
                },
            ) => key.equals(other_key) && value.equals(other_value),
            (
                TypeKind::Pointer {
                    pointee,
                    depth,
                    owned,
                },
                TypeKind::Pointer {
                    pointee: other_pointee,
                    depth: other_depth,
                    owned: other_owned,
                },
            ) => depth == other_depth && owned == other_owned && pointee.equals(other_pointee),
            (TypeKind::Reference(a), TypeKind::Reference(b)) => a.equals(b),
            (TypeKind::Tuple(a), TypeKind::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (TypeKind::Function(a), TypeKind::Function(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.is_async == b.is_async
                        && a.parameters.len() == b.parameters.len()
                        && a.return_type.equals(&b.return_type)
                        && a.parameters
                            .iter()
                            .zip(b.parameters.iter())
                            .all(|(x, y)| {
                                x.optional == y.optional
                                    && x.indefinite == y.indefinite
                                    && x.data_type.equals(&y.data_type)
                            }))
            }
            (TypeKind::FunctionGroup(a), TypeKind::FunctionGroup(b)) => Rc::ptr_eq(a, b),
            (TypeKind::Struct(a), TypeKind::Struct(b))
            | (TypeKind::StructInstance(a), TypeKind::StructInstance(b)) => {
                Rc::ptr_eq(a, b) || a.structural_equals(b)
            }
            (TypeKind::Interface(a), TypeKind::Interface(b))
            | (TypeKind::InterfaceInstance(a), TypeKind::InterfaceInstance(b)) => {
                Rc::ptr_eq(a, b) || a.structural_equals(b)
            }
            (TypeKind::TypeClass(a), TypeKind::TypeClass(b)) => {
                Rc::ptr_eq(a, b) || a.name == b.name
            }
            (
                TypeKind::TypeClassVariant { variant, .. },
                TypeKind::TypeClassVariant {
                    variant: other_variant,
                    ..
                },
            ) => {
                Rc::ptr_eq(variant, other_variant)
                    || (variant.name == other_variant.name
                        && variant.parent_name() == other_variant.parent_name())
            }
            (TypeKind::Generic(a), TypeKind::Generic(b)) => Rc::ptr_eq(a, b),
            (TypeKind::GenericGroup(a), TypeKind::GenericGroup(b)) => Rc::ptr_eq(a, b),
            (TypeKind::GenericPlaceholder(a), TypeKind::GenericPlaceholder(b)) => a == b,
            (TypeKind::Package(a), TypeKind::Package(b)) => Rc::ptr_eq(a, b),
            (TypeKind::SelfRef(_), TypeKind::SelfRef(_)) => true,
            (TypeKind::SelfRef(cell), _) => cell
                .resolved()
                .map(|resolved| resolved.kind_equals(other))
                .unwrap_or(false),
            (_, TypeKind::SelfRef(cell)) => cell
                .resolved()
                .map(|resolved| self.kind_equals(&resolved))
                .unwrap_or(false),
            (TypeKind::Void, TypeKind::Void) => true,
            (TypeKind::Incomplete, TypeKind::Incomplete) => true,
            _ => false,
        }
    }

    /// Shape identity ignoring the constancy flag, used for cache keys and
    /// bind registration where constancy is not part of the identity
    pub fn same_shape(&self, other: &DataType) -> bool {
        self.kind_equals(other)
    }

    /// True for integer-classified simple types; subscripts and slice bounds
    /// must satisfy this
    pub fn is_integral(&self) -> bool {
        match &self.kind {
            TypeKind::Simple(simple) => simple.is_integral(),
            _ => false,
        }
    }
}

impl fmt::Display for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unsigned {
            write!(f, "u")?;
        }
        let name = match self.kind {
            SimpleKind::Bool => "bool",
            SimpleKind::Byte => "byte",
            SimpleKind::Char => "char",
            SimpleKind::Short => "short",
            SimpleKind::Int => "int",
            SimpleKind::Long => "long",
            SimpleKind::Float => "float",
            SimpleKind::Double => "double",
            SimpleKind::Str => "str",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Simple(simple) => write!(f, "{simple}"),
            TypeKind::Array { element, size } => match size {
                Some(size) => write!(f, "array<{element}, {size}>"),
                None => write!(f, "array<{element}>"),
            },
            TypeKind::List { element } => write!(f, "list<{element}>"),
            TypeKind::Dict { key, value } => write!(f, "dict<{key}, {value}>"),
            TypeKind::Pointer { pointee, depth, .. } => {
                for _ in 0..*depth {
                    write!(f, "*")?;
                }
                write!(f, "{pointee}")
            }
            TypeKind::Reference(pointee) => write!(f, "&{pointee}"),
            TypeKind::Tuple(elements) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, ")")
            }
            TypeKind::Function(function) => {
                if function.is_async {
                    write!(f, "async ")?;
                }
                write!(f, "func(")?;
                for (i, parameter) in function.parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", parameter.name, parameter.data_type)?;
                }
                write!(f, ") -> {}", function.return_type)
            }
            TypeKind::FunctionGroup(group) => write!(f, "function group `{}`", group.name),
            TypeKind::Struct(st) | TypeKind::StructInstance(st) => write!(f, "{}", st.name),
            TypeKind::Interface(it) | TypeKind::InterfaceInstance(it) => {
                write!(f, "{}", it.display_name())
            }
            TypeKind::TypeClass(tc) => write!(f, "{}", tc.name),
            TypeKind::TypeClassVariant { variant, .. } => {
                write!(f, "{}::{}", variant.parent_name(), variant.name)
            }
            TypeKind::Generic(generic) => write!(f, "{}", generic.display_name()),
            TypeKind::GenericGroup(group) => write!(f, "generic group `{}`", group.name),
            TypeKind::GenericAlias { name, replacement } => write!(f, "{name} = {replacement}"),
            TypeKind::GenericPlaceholder(name) => write!(f, "{name}"),
            TypeKind::Package(package) => write!(f, "package {}", package.name),
            TypeKind::SelfRef(cell) => write!(f, "{}", cell.name),
            TypeKind::Void => write!(f, "void"),
            TypeKind::Incomplete => write!(f, "<incomplete>"),
        }
    }
}
