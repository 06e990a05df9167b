//! Interfaces, implicit interfaces, and dispatch-table layout
//!
//! Every concrete type owns a lazily-derived implicit interface (its method
//! set); explicit interfaces are additionally declared and bound to
//! implementing types. An interface's method map is ordered, and that order
//! is load-bearing: it defines dispatch-table slot order, the ABI the code
//! generator indexes positionally.

use crate::error::{SemanticError, SemanticResult};
use crate::symbols::Symbol;
use crate::types::{DataType, TypeKind};
use gale_syntax::Span;
use indexmap::IndexMap;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// Override status of an interface method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodStatus {
    /// Declared without a body; every binder must supply one
    Abstract,
    /// Given a default body; a binder may override it
    Virtual,
    /// Not overridable
    Concrete,
}

/// One entry in an interface's ordered method map
#[derive(Debug, Clone)]
pub struct InterfaceMethod {
    pub symbol: Symbol,
    pub status: MethodStatus,
}

/// An interface: ordered method map, super-form flag, registered binders
#[derive(Debug)]
pub struct InterfaceType {
    /// `None` for the implicit interface of a concrete type
    pub name: Option<String>,
    /// Abstract-only interfaces are never usable as literal value types
    pub super_form: bool,
    methods: RefCell<IndexMap<String, InterfaceMethod>>,
    binds: RefCell<Vec<DataType>>,
    /// Explicit interfaces this type's interface derives from
    implements: RefCell<Vec<Rc<InterfaceType>>>,
}

impl InterfaceType {
    pub fn implicit() -> Rc<Self> {
        Rc::new(Self {
            name: None,
            super_form: false,
            methods: RefCell::new(IndexMap::new()),
            binds: RefCell::new(Vec::new()),
            implements: RefCell::new(Vec::new()),
        })
    }

    pub fn declared(name: impl Into<String>, super_form: bool) -> Rc<Self> {
        Rc::new(Self {
            name: Some(name.into()),
            super_form,
            methods: RefCell::new(IndexMap::new()),
            binds: RefCell::new(Vec::new()),
            implements: RefCell::new(Vec::new()),
        })
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| "<implicit interface>".to_string())
    }

    /// Add a method; false on a duplicate name. Ordering of insertion is
    /// preserved and defines slot order.
    pub fn add_method(&self, symbol: Symbol, status: MethodStatus) -> bool {
        let mut methods = self.methods.borrow_mut();
        if methods.contains_key(&symbol.name) {
            return false;
        }
        methods.insert(symbol.name.clone(), InterfaceMethod { symbol, status });
        true
    }

    pub fn methods(&self) -> Ref<'_, IndexMap<String, InterfaceMethod>> {
        self.methods.borrow()
    }

    pub fn get_method(&self, name: &str) -> Option<InterfaceMethod> {
        self.methods.borrow().get(name).cloned()
    }

    /// Resolve a method symbol by name, like the original `GetFunction`
    pub fn get_function(&self, name: &str) -> Option<Symbol> {
        self.get_method(name).map(|method| method.symbol)
    }

    pub fn method_count(&self) -> usize {
        self.methods.borrow().len()
    }

    /// Record a type as a binder of this interface
    pub fn register_bind(&self, data_type: DataType) {
        self.binds.borrow_mut().push(data_type);
    }

    pub fn binds(&self) -> Vec<DataType> {
        self.binds.borrow().clone()
    }

    /// Record a parent interface on a type's implicit interface
    pub fn register_implements(&self, interface: Rc<InterfaceType>) {
        self.implements.borrow_mut().push(interface);
    }

    pub fn implements(&self) -> Vec<Rc<InterfaceType>> {
        self.implements.borrow().clone()
    }

    /// May a value of `other` be boxed into this interface? True for a value
    /// of the same interface or of any registered binder type.
    pub fn coerces_from(&self, other: &DataType) -> bool {
        if let TypeKind::Interface(oi) | TypeKind::InterfaceInstance(oi) = &other.kind {
            if self.structural_equals(oi) {
                return true;
            }
        }
        self.binds
            .borrow()
            .iter()
            .any(|bind| bind.same_shape(other))
    }

    pub fn structural_equals(&self, other: &InterfaceType) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.name != other.name || self.super_form != other.super_form {
            return false;
        }
        let ours = self.methods.borrow();
        let theirs = other.methods.borrow();
        ours.len() == theirs.len()
            && ours.iter().zip(theirs.iter()).all(|((an, a), (bn, b))| {
                an == bn && a.status == b.status && a.symbol.data_type.equals(&b.symbol.data_type)
            })
    }

    /// Dispatch-table slot index of a method, accounting for generic methods
    /// occupying one slot per produced instantiation
    pub fn slot_index(&self, name: &str) -> Option<usize> {
        let mut slot = 0usize;
        for (method_name, method) in self.methods.borrow().iter() {
            let width = slot_width(&method.symbol.data_type);
            if method_name == name {
                return Some(slot);
            }
            slot += width;
        }
        None
    }
}

/// Slots contributed by one method: one, or one per Generate for a generic
/// method (table arity tracks actual instantiations, not the template)
fn slot_width(data_type: &DataType) -> usize {
    match &data_type.kind {
        TypeKind::Generic(generic) => generic.generates().len().max(1),
        _ => 1,
    }
}

/// How a resolved method call reaches its target
#[derive(Debug, Clone)]
pub enum MethodDispatch {
    /// Statically bound to the receiver's own method
    Static { symbol: Symbol },
    /// Indexed through the receiver's live dispatch table
    Table { interface: String, slot: usize },
    /// Concrete receiver upcast to the declaring interface's root
    /// implementation of a virtual method
    Upcast { interface: String, slot: usize },
}

/// One slot of a derived method table
#[derive(Debug, Clone)]
pub struct MethodSlot {
    pub name: String,
    pub signature: DataType,
    /// True when the binder supplied its own override
    pub overridden: bool,
    pub declaring_interface: String,
}

/// The ordered method table generated per (interface, binder) pair.
/// Slot order is identical across all binders of the same interface.
#[derive(Debug, Clone)]
pub struct MethodTable {
    pub interface: Rc<InterfaceType>,
    pub binder: String,
    pub slots: Vec<MethodSlot>,
}

impl MethodTable {
    /// Build the binder's table by walking the parent interface's methods in
    /// declared order: the binder's own override for a Virtual method it
    /// supplies, the parent implementation otherwise. Abstract methods the
    /// binder does not supply are an error; Concrete methods may not be
    /// overridden.
    pub fn derive(
        parent: &Rc<InterfaceType>,
        binder: &str,
        overrides: &InterfaceType,
        span: Span,
    ) -> SemanticResult<MethodTable> {
        let mut slots = Vec::new();
        let declaring = parent.display_name();

        for (name, method) in parent.methods().iter() {
            let supplied = overrides.get_method(name);

            match method.status {
                MethodStatus::Abstract => {
                    let supplied = supplied.ok_or_else(|| SemanticError::UnresolvedMember {
                        type_name: binder.to_string(),
                        member: name.clone(),
                        span: span.into(),
                    })?;
                    if !method.symbol.data_type.coerce(&supplied.symbol.data_type) {
                        return Err(SemanticError::resolution(
                            format!(
                                "implementation of `{name}` does not match the declared signature"
                            ),
                            span,
                        ));
                    }
                    push_slots(&mut slots, name, &supplied.symbol.data_type, true, &declaring);
                }
                MethodStatus::Virtual => match supplied {
                    Some(supplied) => {
                        if !method.symbol.data_type.coerce(&supplied.symbol.data_type) {
                            return Err(SemanticError::resolution(
                                format!(
                                    "override of `{name}` does not match the declared signature"
                                ),
                                span,
                            ));
                        }
                        push_slots(&mut slots, name, &supplied.symbol.data_type, true, &declaring);
                    }
                    None => {
                        push_slots(&mut slots, name, &method.symbol.data_type, false, &declaring);
                    }
                },
                MethodStatus::Concrete => {
                    if supplied.is_some() {
                        return Err(SemanticError::resolution(
                            format!("method `{name}` is concrete and cannot be overridden"),
                            span,
                        ));
                    }
                    push_slots(&mut slots, name, &method.symbol.data_type, false, &declaring);
                }
            }
        }

        Ok(MethodTable {
            interface: Rc::clone(parent),
            binder: binder.to_string(),
            slots,
        })
    }
}

fn push_slots(
    slots: &mut Vec<MethodSlot>,
    name: &str,
    data_type: &DataType,
    overridden: bool,
    declaring: &str,
) {
    match &data_type.kind {
        TypeKind::Generic(generic) if !generic.generates().is_empty() => {
            for generate in generic.generates() {
                slots.push(MethodSlot {
                    name: name.to_string(),
                    signature: generate.concrete.clone(),
                    overridden,
                    declaring_interface: declaring.to_string(),
                });
            }
        }
        _ => slots.push(MethodSlot {
            name: name.to_string(),
            signature: data_type.clone(),
            overridden,
            declaring_interface: declaring.to_string(),
        }),
    }
}

/// Globally cached implicit interfaces, keyed by structural identity so two
/// structurally-equal types never get two independent interfaces. Owned by
/// the analysis context of one compilation run.
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    entries: Vec<(DataType, Rc<InterfaceType>)>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent, identity-stable lookup: repeated requests with
    /// structurally-equal keys return the same interface object
    pub fn interface_of(&mut self, data_type: &DataType) -> Rc<InterfaceType> {
        if let Some(existing) = self.find(data_type) {
            return existing;
        }

        let fresh = InterfaceType::implicit();
        self.entries.push((data_type.clone(), Rc::clone(&fresh)));
        fresh
    }

    fn find(&self, data_type: &DataType) -> Option<Rc<InterfaceType>> {
        match &data_type.kind {
            // struct instances share the struct type's interface
            TypeKind::Struct(_) | TypeKind::StructInstance(_) => {
                self.entries.iter().find_map(|(key, interface)| {
                    match (&key.kind, &data_type.kind) {
                        (
                            TypeKind::Struct(a) | TypeKind::StructInstance(a),
                            TypeKind::Struct(b) | TypeKind::StructInstance(b),
                        ) if Rc::ptr_eq(a, b) || key.coerce(data_type) => {
                            Some(Rc::clone(interface))
                        }
                        _ => None,
                    }
                })
            }
            // every variant of a type class shares the parent's interface
            TypeKind::TypeClassVariant { variant, .. } => {
                let parent = variant.parent();
                self.entries.iter().find_map(|(key, interface)| {
                    match (&key.kind, &parent) {
                        (TypeKind::TypeClass(tc), Some(parent)) if Rc::ptr_eq(tc, parent) => {
                            Some(Rc::clone(interface))
                        }
                        _ => None,
                    }
                })
            }
            _ => self.entries.iter().find_map(|(key, interface)| {
                if key.same_shape(data_type) {
                    Some(Rc::clone(interface))
                } else {
                    None
                }
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve a method call per the dispatch model: interface receivers go
/// through their live table at a statically-computed slot; concrete
/// receivers bind statically unless the method is virtual on an interface in
/// their implements-chain, in which case the receiver is upcast.
pub fn resolve_method(
    receiver: &DataType,
    name: &str,
    registry: &mut InterfaceRegistry,
) -> Option<MethodDispatch> {
    if let TypeKind::Interface(it) | TypeKind::InterfaceInstance(it) = &receiver.kind {
        return it.slot_index(name).map(|slot| MethodDispatch::Table {
            interface: it.display_name(),
            slot,
        });
    }

    let own = registry.interface_of(receiver);
    if let Some(method) = own.get_method(name) {
        return Some(MethodDispatch::Static {
            symbol: method.symbol,
        });
    }

    for interface in own.implements() {
        if let Some(method) = interface.get_method(name) {
            if method.status == MethodStatus::Abstract {
                continue;
            }
            if let Some(slot) = interface.slot_index(name) {
                return Some(MethodDispatch::Upcast {
                    interface: interface.display_name(),
                    slot,
                });
            }
        }
    }

    None
}
