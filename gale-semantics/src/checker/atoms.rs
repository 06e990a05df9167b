//! Atom resolution: member access, static access, subscripts and slices,
//! calls, initializer lists, type-class construction, and heap allocation
//!
//! Each operation either returns one resolved expression node or fails with
//! one positioned error. The syntax-walking entry point is `visit_expr`; the
//! semantic operations underneath it are independent of tree shape and are
//! exercised directly by the test suite.

use super::Checker;
use crate::error::{SemanticError, SemanticResult};
use crate::generics::{substitute, unify};
use crate::interfaces::{resolve_method, MethodDispatch};
use crate::intrinsics::{is_reserved_method, SLICE_OVERLOAD, SUBSCRIPT_OVERLOAD};
use crate::overload::{check_arguments, arguments_exact, ArgumentList};
use crate::typed_ast::{
    ExprKind, ExprNode, IdentifierNode, IncompleteNode, TypedNode, ValueKind, ValueNode,
};
use crate::types::{DataType, FunctionType, StructType, TypeClassVariant, TypeKind};
use gale_syntax::{AstNode, Span, SyntaxNode};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

/// The three member-access operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOp {
    /// `.`
    Direct,
    /// `->`
    Deref,
    /// `?->`
    NullableDeref,
}

impl Checker {
    // --- syntax walking ---------------------------------------------------

    /// Resolve an expression node, leaving exactly one typed node on the stack
    pub fn visit_expr(&mut self, node: &AstNode) -> SemanticResult<()> {
        match node.name.as_str() {
            "atom" => self.visit_atom(node),
            "init_list" => self.visit_init_list(node),
            "heap_alloc" => self.visit_heap_alloc(node),
            "await_expr" => self.visit_await(node),
            "from_expr" => self.visit_from(node),
            "tuple" | "list_lit" | "lambda" => self.visit_base_composite(node),
            other => Err(SemanticError::resolution(
                format!("unknown expression production `{other}`"),
                node.span,
            )),
        }
    }

    /// `atom := base trailer*`
    fn visit_atom(&mut self, node: &AstNode) -> SemanticResult<()> {
        let base = node.children.first().ok_or_else(|| {
            SemanticError::resolution("empty atom", node.span)
        })?;
        self.visit_base(base)?;

        for trailer in node.find_all("trailer") {
            self.visit_trailer(trailer)?;
        }
        Ok(())
    }

    fn visit_base(&mut self, base: &SyntaxNode) -> SemanticResult<()> {
        match base {
            SyntaxNode::Leaf(token) => {
                let node = match token.kind.as_str() {
                    "INTEGER_LIT" => TypedNode::Value(ValueNode {
                        kind: ValueKind::Literal,
                        data_type: DataType::int(),
                        value: token.value.clone(),
                    }),
                    "FLOAT_LIT" => TypedNode::Value(ValueNode {
                        kind: ValueKind::Literal,
                        data_type: DataType::double(),
                        value: token.value.clone(),
                    }),
                    "STRING_LIT" => TypedNode::Value(ValueNode {
                        kind: ValueKind::Literal,
                        data_type: DataType::str_type(),
                        value: token.value.clone(),
                    }),
                    "CHAR_LIT" => TypedNode::Value(ValueNode {
                        kind: ValueKind::Literal,
                        data_type: DataType::char_type(),
                        value: token.value.clone(),
                    }),
                    "BOOL_LIT" => TypedNode::Value(ValueNode {
                        kind: ValueKind::Literal,
                        data_type: DataType::bool_type(),
                        value: token.value.clone(),
                    }),
                    "IDENTIFIER" => {
                        let symbol = self.ctx.table.lookup(&token.value).ok_or_else(|| {
                            SemanticError::resolution(
                                format!("undefined symbol `{}`", token.value),
                                token.span,
                            )
                        })?;
                        let mut identifier =
                            IdentifierNode::new(&token.value, symbol.data_type.clone());
                        identifier.constexpr_value = symbol.value.clone();
                        TypedNode::Identifier(identifier)
                    }
                    other => {
                        return Err(SemanticError::resolution(
                            format!("unknown literal kind `{other}`"),
                            token.span,
                        ))
                    }
                };
                self.ctx.stack.push(node);
                Ok(())
            }
            SyntaxNode::Composite(composite) => self.visit_base_composite(composite),
        }
    }

    fn visit_base_composite(&mut self, node: &AstNode) -> SemanticResult<()> {
        match node.name.as_str() {
            "tuple" => {
                let mut elements = Vec::new();
                let mut count = 0usize;
                for child in &node.children {
                    if let Some(expr) = child.as_composite() {
                        self.visit_expr(expr)?;
                        elements.push(self.ctx.stack.last_type());
                        count += 1;
                    }
                }
                self.ctx.stack.push(TypedNode::Expr(ExprNode::new(
                    ExprKind::InitList,
                    DataType::tuple(elements),
                )));
                self.ctx.stack.push_forward(count)?;
                Ok(())
            }
            "list_lit" => {
                let mut element: Option<DataType> = None;
                let mut count = 0usize;
                for child in &node.children {
                    if let Some(expr) = child.as_composite() {
                        self.visit_expr(expr)?;
                        let supplied = self.ctx.stack.last_type();
                        element = Some(match element {
                            None => supplied,
                            Some(current) => {
                                if current.coerce(&supplied) {
                                    current
                                } else if supplied.coerce(&current) {
                                    supplied
                                } else {
                                    return Err(SemanticError::resolution(
                                        format!(
                                            "list elements `{current}` and `{supplied}` have no common type"
                                        ),
                                        node.span,
                                    ));
                                }
                            }
                        });
                        count += 1;
                    }
                }
                let element = element.unwrap_or_else(DataType::void);
                self.ctx.stack.push(TypedNode::Expr(ExprNode::new(
                    ExprKind::InitList,
                    DataType::list(element),
                )));
                self.ctx.stack.push_forward(count)?;
                Ok(())
            }
            // untyped lambdas defer until call context supplies a signature
            "lambda" => {
                self.ctx.stack.push(TypedNode::Incomplete(IncompleteNode {
                    node: node.clone(),
                }));
                Ok(())
            }
            _ => self.visit_expr(node),
        }
    }

    fn visit_trailer(&mut self, trailer: &AstNode) -> SemanticResult<()> {
        let operator = trailer.token(0).ok_or_else(|| {
            SemanticError::resolution("trailer missing its operator", trailer.span)
        })?;
        let receiver = self.ctx.stack.last_type();

        match operator.kind.as_str() {
            "." | "->" | "?->" => {
                let op = match operator.kind.as_str() {
                    "->" => MemberOp::Deref,
                    "?->" => MemberOp::NullableDeref,
                    _ => MemberOp::Direct,
                };
                let member = trailer.token(1).ok_or_else(|| {
                    SemanticError::resolution("member access missing a name", trailer.span)
                })?;

                let resolved = if member.kind == "INTEGER_LIT" {
                    let index = self.integer_literal(member)?;
                    self.tuple_member(&receiver, index, trailer.span)?
                } else {
                    self.member_access(&receiver, op, &member.value, trailer.span)?
                };
                self.ctx.stack.push(TypedNode::Expr(resolved));
                self.ctx.stack.push_forward(1)?;
                Ok(())
            }
            "::" => {
                let member = trailer.token(1).ok_or_else(|| {
                    SemanticError::resolution("static access missing a name", trailer.span)
                })?;
                let resolved = self.static_access(&receiver, &member.value, trailer.span)?;
                self.ctx.stack.push(TypedNode::Expr(resolved));
                self.ctx.stack.push_forward(1)?;
                Ok(())
            }
            "(" => self.visit_call_trailer(trailer, receiver),
            "[" => self.visit_slice_trailer(trailer, receiver),
            "<" => self.visit_generic_trailer(trailer, receiver),
            other => Err(SemanticError::resolution(
                format!("unknown trailer operator `{other}`"),
                trailer.span,
            )),
        }
    }

    /// Explicit generic application in expression position: `name<T, ...>`
    fn visit_generic_trailer(
        &mut self,
        trailer: &AstNode,
        receiver: DataType,
    ) -> SemanticResult<()> {
        let generic = match &receiver.kind {
            TypeKind::Generic(generic) => Rc::clone(generic),
            _ => {
                return Err(SemanticError::resolution(
                    format!("`{receiver}` is not generic and takes no type arguments"),
                    trailer.span,
                ))
            }
        };

        let mut bindings = Vec::new();
        for child in &trailer.children {
            if child.as_composite().is_some() {
                bindings.push(self.resolve_type(child)?);
            }
        }

        let generate = generic.create_generic(bindings, &mut self.ctx.registry, trailer.span)?;
        self.ctx.stack.push(TypedNode::Expr(ExprNode::new(
            ExprKind::CreateGeneric,
            generate.concrete.clone(),
        )));
        self.ctx.stack.push_forward(1)?;
        Ok(())
    }

    // --- member and static access -----------------------------------------

    /// Resolve `.`, `->`, or `?->` member access
    pub fn member_access(
        &mut self,
        receiver: &DataType,
        op: MemberOp,
        member: &str,
        span: Span,
    ) -> SemanticResult<ExprNode> {
        if is_reserved_method(member) {
            return Err(SemanticError::resolution(
                format!("`{member}` is reserved and cannot be accessed directly"),
                span,
            ));
        }

        // `->` and `?->` dereference a single pointer level first
        let target = match op {
            MemberOp::Direct => match &receiver.kind {
                TypeKind::Reference(pointee) => (**pointee).clone(),
                _ => receiver.clone(),
            },
            MemberOp::Deref | MemberOp::NullableDeref => match &receiver.kind {
                TypeKind::Pointer { pointee, depth: 1, .. } => (**pointee).clone(),
                _ => {
                    return Err(SemanticError::resolution(
                        format!("`{receiver}` is not a single-level pointer"),
                        span,
                    ))
                }
            },
        };

        let kind = match op {
            MemberOp::Direct => ExprKind::GetMember,
            MemberOp::Deref => ExprKind::DerefGetMember,
            MemberOp::NullableDeref => ExprKind::NullableDerefGetMember,
        };

        if let TypeKind::StructInstance(st) = &target.kind {
            if let Some(member_type) = st.member_type(member) {
                return Ok(ExprNode::new(kind, member_type));
            }
        }

        match resolve_method(&target, member, &mut self.ctx.registry) {
            Some(dispatch) => {
                let data_type = self.dispatch_type(&target, member, &dispatch, span)?;
                Ok(ExprNode::with_dispatch(kind, data_type, dispatch))
            }
            None => Err(SemanticError::UnresolvedMember {
                type_name: target.to_string(),
                member: member.to_string(),
                span: span.into(),
            }),
        }
    }

    /// Signature type the resolved dispatch target exposes at the call site
    fn dispatch_type(
        &mut self,
        target: &DataType,
        member: &str,
        dispatch: &MethodDispatch,
        span: Span,
    ) -> SemanticResult<DataType> {
        match dispatch {
            MethodDispatch::Static { symbol } => Ok(symbol.data_type.clone()),
            MethodDispatch::Table { .. } | MethodDispatch::Upcast { .. } => {
                let interface = match &target.kind {
                    TypeKind::Interface(it) | TypeKind::InterfaceInstance(it) => Rc::clone(it),
                    _ => self.ctx.registry.interface_of(target),
                };
                interface
                    .get_function(member)
                    .map(|symbol| symbol.data_type)
                    .or_else(|| {
                        interface
                            .implements()
                            .iter()
                            .find_map(|parent| parent.get_function(member))
                            .map(|symbol| symbol.data_type)
                    })
                    .ok_or_else(|| SemanticError::UnresolvedMember {
                        type_name: target.to_string(),
                        member: member.to_string(),
                        span: span.into(),
                    })
            }
        }
    }

    /// Numeric member access on a tuple: the index literal must lie within
    /// the tuple's arity
    pub fn tuple_member(
        &mut self,
        receiver: &DataType,
        index: usize,
        span: Span,
    ) -> SemanticResult<ExprNode> {
        let target = match &receiver.kind {
            TypeKind::Reference(pointee) => (**pointee).clone(),
            _ => receiver.clone(),
        };

        match &target.kind {
            TypeKind::Tuple(elements) => match elements.get(index) {
                Some(element) => Ok(ExprNode::new(ExprKind::GetTupleMember, element.clone())),
                None => Err(SemanticError::TupleIndexOutOfRange {
                    index,
                    arity: elements.len(),
                    span: span.into(),
                }),
            },
            _ => Err(SemanticError::UnresolvedMember {
                type_name: target.to_string(),
                member: index.to_string(),
                span: span.into(),
            }),
        }
    }

    /// `::` resolves package exports and type-class named variants only
    pub fn static_access(
        &mut self,
        receiver: &DataType,
        member: &str,
        span: Span,
    ) -> SemanticResult<ExprNode> {
        match &receiver.kind {
            TypeKind::Package(package) => match package.lookup(member) {
                Some(symbol) => Ok(ExprNode::new(ExprKind::StaticGet, symbol.data_type)),
                None => Err(SemanticError::UnresolvedMember {
                    type_name: package.name.clone(),
                    member: member.to_string(),
                    span: span.into(),
                }),
            },
            TypeKind::TypeClass(type_class) => match type_class.variant(member) {
                Some(variant) => {
                    // an empty variant is a complete value; a value-carrying
                    // one must still be constructed
                    let needs_construction = !variant.values.is_empty();
                    Ok(ExprNode::new(
                        ExprKind::StaticGet,
                        DataType::new(TypeKind::TypeClassVariant {
                            variant,
                            needs_construction,
                        }),
                    ))
                }
                None => Err(SemanticError::UnresolvedMember {
                    type_name: type_class.name.clone(),
                    member: member.to_string(),
                    span: span.into(),
                }),
            },
            _ => Err(SemanticError::InvalidStaticAccess {
                type_name: receiver.to_string(),
                span: span.into(),
            }),
        }
    }

    // --- subscripts and slices --------------------------------------------

    /// Parse a `[...]` trailer: expressions and `:` separators, in order
    fn visit_slice_trailer(&mut self, trailer: &AstNode, receiver: DataType) -> SemanticResult<()> {
        let mut segment = 0usize;
        let mut present = [false; 3];
        let mut colon_count = 0usize;
        let mut indices = Vec::new();

        for child in &trailer.children {
            match child {
                SyntaxNode::Leaf(token) if token.kind == ":" => {
                    segment += 1;
                    colon_count += 1;
                }
                SyntaxNode::Composite(expr) => {
                    self.visit_expr(expr)?;
                    indices.push(self.ctx.stack.last_type());
                    if segment < 3 {
                        present[segment] = true;
                    }
                }
                _ => {}
            }
        }

        let kind = classify_slice(present[0], present[1], present[2], colon_count);
        let resolved = self.subscript(&receiver, kind, &indices, trailer.span)?;
        self.ctx.stack.push(TypedNode::Expr(resolved));
        self.ctx.stack.push_forward(1 + indices.len())?;
        Ok(())
    }

    /// Resolve a classified subscript/slice against a receiver type
    pub fn subscript(
        &mut self,
        receiver: &DataType,
        kind: ExprKind,
        indices: &[DataType],
        span: Span,
    ) -> SemanticResult<ExprNode> {
        let target = match &receiver.kind {
            TypeKind::Reference(pointee) => (**pointee).clone(),
            _ => receiver.clone(),
        };

        match &target.kind {
            TypeKind::Array { element, .. } => {
                self.require_integer_indices(indices, span)?;
                let data_type = if kind == ExprKind::Subscript {
                    (**element).clone()
                } else {
                    DataType::array((**element).clone(), None)
                };
                Ok(ExprNode::new(kind, data_type))
            }
            TypeKind::List { element } => {
                self.require_integer_indices(indices, span)?;
                let data_type = if kind == ExprKind::Subscript {
                    (**element).clone()
                } else {
                    DataType::list((**element).clone())
                };
                Ok(ExprNode::new(kind, data_type))
            }
            TypeKind::Simple(simple) if simple.kind == crate::types::SimpleKind::Str => {
                self.require_integer_indices(indices, span)?;
                let data_type = if kind == ExprKind::Subscript {
                    DataType::char_type()
                } else {
                    DataType::str_type()
                };
                Ok(ExprNode::new(kind, data_type))
            }
            TypeKind::Dict { key, value } => {
                // a map has no element order, so slicing it is meaningless
                if kind != ExprKind::Subscript {
                    return Err(SemanticError::NoSubscriptOverload {
                        type_name: target.to_string(),
                        operation: "slicing".to_string(),
                        span: span.into(),
                    });
                }
                let supplied = indices.first().ok_or_else(|| {
                    SemanticError::resolution("subscript missing its key expression", span)
                })?;
                if !key.coerce(supplied) {
                    return Err(SemanticError::resolution(
                        format!("key of type `{supplied}` does not match `{key}`"),
                        span,
                    ));
                }
                Ok(ExprNode::new(kind, (**value).clone()))
            }
            _ => self.subscript_overload(&target, kind, indices, span),
        }
    }

    /// Operator-overload fallback: `__[]__` for subscripts, `__[:]__` for
    /// every slice shape
    fn subscript_overload(
        &mut self,
        target: &DataType,
        kind: ExprKind,
        indices: &[DataType],
        span: Span,
    ) -> SemanticResult<ExprNode> {
        let (method_name, operation) = if kind == ExprKind::Subscript {
            (SUBSCRIPT_OVERLOAD, "subscripting")
        } else {
            (SLICE_OVERLOAD, "slicing")
        };

        let interface = self.ctx.registry.interface_of(target);
        let method = interface.get_function(method_name).ok_or_else(|| {
            SemanticError::NoSubscriptOverload {
                type_name: target.to_string(),
                operation: operation.to_string(),
                span: span.into(),
            }
        })?;

        let function = match &method.data_type.kind {
            TypeKind::Function(function) => Rc::clone(function),
            _ => {
                return Err(SemanticError::NoSubscriptOverload {
                    type_name: target.to_string(),
                    operation: operation.to_string(),
                    span: span.into(),
                })
            }
        };

        let args = ArgumentList::positional(indices.to_vec());
        if check_arguments(&function, &args).is_err() {
            return Err(SemanticError::NoSubscriptOverload {
                type_name: target.to_string(),
                operation: operation.to_string(),
                span: span.into(),
            });
        }

        Ok(ExprNode::with_dispatch(
            kind,
            function.return_type.clone(),
            MethodDispatch::Static { symbol: method },
        ))
    }

    fn require_integer_indices(&self, indices: &[DataType], span: Span) -> SemanticResult<()> {
        for (position, index) in indices.iter().enumerate() {
            if matches!(index.kind, TypeKind::Incomplete) {
                continue;
            }
            if !index.is_integral() {
                return Err(SemanticError::InvalidIndexType {
                    found: index.to_string(),
                    position,
                    span: span.into(),
                });
            }
        }
        Ok(())
    }

    // --- calls ------------------------------------------------------------

    /// `(...)` trailer: collect arguments, then resolve by receiver kind
    fn visit_call_trailer(&mut self, trailer: &AstNode, receiver: DataType) -> SemanticResult<()> {
        let mut args = ArgumentList::new();
        let mut arg_count = 0usize;

        for child in &trailer.children {
            let Some(expr) = child.as_composite() else {
                continue;
            };
            if expr.name == "named_arg" {
                let name = self.identifier_of(expr)?;
                let value = expr.composite(1).ok_or_else(|| {
                    SemanticError::resolution("named argument missing its value", expr.span)
                })?;
                self.visit_expr(value)?;
                args.named.insert(name, self.ctx.stack.last_type());
            } else {
                // the stack offsets of deferred arguments depend on this order
                if !args.named.is_empty() {
                    return Err(SemanticError::resolution(
                        "a positional argument cannot follow a named argument",
                        expr.span,
                    ));
                }
                self.visit_expr(expr)?;
                args.unnamed.push(self.ctx.stack.last_type());
            }
            arg_count += 1;
        }

        let resolved = self.call(&receiver, &mut args, arg_count, trailer.span)?;
        self.ctx.stack.push(TypedNode::Expr(resolved));
        self.ctx.stack.push_forward(1 + arg_count)?;
        Ok(())
    }

    /// Resolve a call by receiver classification. `arg_count` is the number
    /// of argument nodes currently beneath the top of the stack, used to
    /// back-patch deferred lambda arguments in place.
    pub fn call(
        &mut self,
        receiver: &DataType,
        args: &mut ArgumentList,
        arg_count: usize,
        span: Span,
    ) -> SemanticResult<ExprNode> {
        match &receiver.kind {
            TypeKind::Struct(st) => {
                let constructor = self.select_constructor(st, args, span)?;
                Ok(ExprNode::new(
                    ExprKind::CallConstructor,
                    DataType::new(TypeKind::StructInstance(Rc::clone(st))),
                )
                .with_target(constructor))
            }
            TypeKind::Function(function) => {
                let function = Rc::clone(function);
                self.supply_lambda_context(&function, args, arg_count, span)?;
                if let Err(failure) = check_arguments(&function, args) {
                    return Err(SemanticError::resolution(failure.message, span));
                }
                let kind = if function.is_async {
                    ExprKind::CallAsync
                } else {
                    ExprKind::Call
                };
                Ok(ExprNode::new(kind, function.return_type.clone()).with_target(function))
            }
            TypeKind::FunctionGroup(group) => {
                let function = group.get_function(args, span)?;
                self.supply_lambda_context(&function, args, arg_count, span)?;
                Ok(ExprNode::new(
                    ExprKind::CallFunctionOverload,
                    function.return_type.clone(),
                )
                .with_target(function))
            }
            // infer the bindings, instantiate, then call the concrete result
            TypeKind::Generic(generic) => {
                let bindings = generic.infer(args).ok_or_else(|| {
                    SemanticError::GenericInferenceFailure {
                        generic: generic.display_name(),
                        span: span.into(),
                    }
                })?;
                let generate =
                    generic.create_generic(bindings, &mut self.ctx.registry, span)?;
                let concrete = generate.concrete.clone();
                self.call(&concrete, args, arg_count, span)
            }
            TypeKind::GenericGroup(group) => {
                let (_, function) = group.get_function(args, &mut self.ctx.registry, span)?;
                self.supply_lambda_context(&function, args, arg_count, span)?;
                Ok(ExprNode::new(
                    ExprKind::CallGenericOverload,
                    function.return_type.clone(),
                )
                .with_target(function))
            }
            TypeKind::TypeClassVariant {
                variant,
                needs_construction,
            } => self.construct_variant(variant, *needs_construction, args, span),
            _ => Err(SemanticError::NotCallable {
                type_name: receiver.to_string(),
                span: span.into(),
            }),
        }
    }

    /// Unique constructor whose parameters match the arguments; ambiguity is
    /// reported distinctly from no-match, as for any overload set
    fn select_constructor(
        &mut self,
        st: &Rc<StructType>,
        args: &ArgumentList,
        span: Span,
    ) -> SemanticResult<Rc<FunctionType>> {
        let constructors = st.constructors();
        let mut matches: Vec<&Rc<FunctionType>> = constructors
            .iter()
            .filter(|constructor| check_arguments(constructor, args).is_ok())
            .collect();

        match matches.len() {
            0 => Err(SemanticError::NoMatchingOverload {
                group: st.name.clone(),
                span: span.into(),
            }),
            1 => Ok(Rc::clone(matches.remove(0))),
            _ => {
                let exact: Vec<_> = matches
                    .iter()
                    .filter(|constructor| arguments_exact(constructor, args))
                    .collect();
                if exact.len() == 1 {
                    Ok(Rc::clone(exact[0]))
                } else {
                    Err(SemanticError::AmbiguousOverload {
                        group: st.name.clone(),
                        span: span.into(),
                    })
                }
            }
        }
    }

    /// Positional value-construction of a type-class variant. Not-yet-bound
    /// generic positions are captured from the arguments and back-substituted
    /// into the parent type class.
    pub fn construct_variant(
        &mut self,
        variant: &Rc<TypeClassVariant>,
        needs_construction: bool,
        args: &ArgumentList,
        span: Span,
    ) -> SemanticResult<ExprNode> {
        if !needs_construction {
            return Err(SemanticError::TypeClassConstructionError {
                reason: format!("variant `{}` is already constructed", variant.name),
                span: span.into(),
            });
        }
        if !args.named.is_empty() {
            return Err(SemanticError::TypeClassConstructionError {
                reason: "named arguments are not allowed in variant construction".to_string(),
                span: span.into(),
            });
        }
        if args.unnamed.len() != variant.values.len() {
            return Err(SemanticError::TypeClassConstructionError {
                reason: format!(
                    "variant `{}` carries {} values, {} given",
                    variant.name,
                    variant.values.len(),
                    args.unnamed.len()
                ),
                span: span.into(),
            });
        }

        let mut bound = HashMap::new();
        for (declared, supplied) in variant.values.iter().zip(args.unnamed.iter()) {
            if !unify(declared, supplied, &mut bound) {
                return Err(SemanticError::TypeClassConstructionError {
                    reason: format!(
                        "value of type `{supplied}` does not match declared `{declared}`"
                    ),
                    span: span.into(),
                });
            }
        }

        let constructed = DataType::new(TypeKind::TypeClassVariant {
            variant: Rc::clone(variant),
            needs_construction: false,
        });
        let constructed = if bound.is_empty() {
            constructed
        } else {
            substitute(&constructed, &bound)
        };

        Ok(ExprNode::new(ExprKind::InitTypeClassVariant, constructed))
    }

    /// Give deferred lambda arguments their signatures from the selected
    /// function's parameters, splicing each resolution into the stack slot
    /// the incomplete node occupies. Named arguments sit above the positional
    /// ones, in declaration order.
    fn supply_lambda_context(
        &mut self,
        function: &FunctionType,
        args: &mut ArgumentList,
        arg_count: usize,
        span: Span,
    ) -> SemanticResult<()> {
        if !args.has_incomplete() {
            return Ok(());
        }

        for position in 0..args.unnamed.len() {
            if !matches!(args.unnamed[position].kind, TypeKind::Incomplete) {
                continue;
            }
            let parameter = function.parameters.get(position).ok_or_else(|| {
                SemanticError::resolution("no parameter for deferred argument", span)
            })?;
            let expected = deferred_signature(parameter, span)?;

            // argument i of n sits n-1-i below the top
            let offset = arg_count - 1 - position;
            self.give_context(offset, &expected, span)?;
            args.unnamed[position] = self
                .ctx
                .stack
                .peek(offset)
                .map(TypedNode::data_type)
                .unwrap_or_else(DataType::incomplete);
        }

        let named_names: Vec<String> = args.named.keys().cloned().collect();
        for (index, name) in named_names.iter().enumerate() {
            if !matches!(args.named[name].kind, TypeKind::Incomplete) {
                continue;
            }
            let parameter = function
                .parameters
                .iter()
                .find(|parameter| &parameter.name == name)
                .ok_or_else(|| {
                    SemanticError::resolution(
                        format!("no parameter named `{name}` for deferred argument"),
                        span,
                    )
                })?;
            let expected = deferred_signature(parameter, span)?;

            let offset = arg_count - 1 - (args.unnamed.len() + index);
            self.give_context(offset, &expected, span)?;
            let resolved = self
                .ctx
                .stack
                .peek(offset)
                .map(TypedNode::data_type)
                .unwrap_or_else(DataType::incomplete);
            args.named.insert(name.clone(), resolved);
        }

        if args.has_incomplete() {
            return Err(SemanticError::resolution(
                "a deferred expression was never given a function context",
                span,
            ));
        }
        Ok(())
    }

    /// Resolve the incomplete node at `offset` against an expected function
    /// signature and splice the result into the same slot
    pub fn give_context(
        &mut self,
        offset: usize,
        expected: &FunctionType,
        span: Span,
    ) -> SemanticResult<()> {
        let lambda = match self.ctx.stack.peek(offset) {
            Some(TypedNode::Incomplete(incomplete)) => incomplete.node.clone(),
            _ => {
                return Err(SemanticError::resolution(
                    "no deferred expression at the expected stack slot",
                    span,
                ))
            }
        };

        let resolved = self.resolve_lambda(&lambda, expected)?;
        self.ctx.stack.replace(offset, TypedNode::Expr(resolved))
    }

    /// Type a lambda body under the expected signature: parameters take the
    /// expected types positionally unless annotated
    fn resolve_lambda(
        &mut self,
        lambda: &AstNode,
        expected: &FunctionType,
    ) -> SemanticResult<ExprNode> {
        let mut parameters = Vec::new();
        if let Some(args) = lambda.find("args") {
            for (position, param) in args.find_all("param").enumerate() {
                let name = self.identifier_of(param)?;
                let annotation = param
                    .children
                    .iter()
                    .find_map(SyntaxNode::as_composite);
                let data_type = match annotation {
                    Some(annotation) if annotation.name == "type" => {
                        self.child_type(annotation, 0)?
                    }
                    Some(annotation) => self.resolve_composite_type(annotation)?,
                    None => expected
                        .parameters
                        .get(position)
                        .map(|parameter| parameter.data_type.clone())
                        .ok_or_else(|| {
                            SemanticError::resolution(
                                format!("no context type for lambda parameter `{name}`"),
                                param.span,
                            )
                        })?,
                };
                parameters.push(crate::types::Parameter::new(name, data_type));
            }
        }

        self.ctx.table.descend_scope();
        for parameter in &parameters {
            self.ctx
                .table
                .add_symbol(crate::symbols::Symbol::new(
                    &parameter.name,
                    parameter.data_type.clone(),
                ));
        }

        let body = lambda
            .children
            .iter()
            .rev()
            .find_map(SyntaxNode::as_composite)
            .filter(|child| child.name != "args" && child.name != "param");
        let outcome = match body {
            Some(body) => self.visit_expr(body).map(|_| {
                let data_type = self.ctx.stack.last_type();
                self.ctx.stack.pop();
                data_type
            }),
            None => Err(SemanticError::resolution("lambda has no body", lambda.span)),
        };
        self.ctx.table.ascend_scope();
        let return_type = outcome?;

        let produced = FunctionType::new(parameters, return_type, expected.is_async);
        if !expected.compatible(&produced) {
            return Err(SemanticError::resolution(
                format!(
                    "lambda of type `{}` does not fit the expected `{}`",
                    DataType::function(produced.clone()),
                    DataType::function(expected.clone())
                ),
                lambda.span,
            ));
        }

        Ok(ExprNode::new(
            ExprKind::Lambda,
            DataType::function(produced),
        ))
    }

    // --- initializer lists ------------------------------------------------

    /// `new Name { field: expr, ... }`
    fn visit_init_list(&mut self, node: &AstNode) -> SemanticResult<()> {
        let target_node = node.children.first().ok_or_else(|| {
            SemanticError::resolution("initializer list missing its target type", node.span)
        })?;
        let target = self.resolve_type(target_node)?;

        let mut fields = IndexMap::new();
        let mut count = 0usize;
        for field in node.find_all("field_init") {
            let name = self.identifier_of(field)?;
            if fields.contains_key(&name) {
                return Err(SemanticError::StructInitMismatch {
                    reason: format!("member `{name}` is initialized twice"),
                    span: field.span.into(),
                });
            }
            let value = field.composite(1).ok_or_else(|| {
                SemanticError::resolution("field initializer missing its value", field.span)
            })?;
            self.visit_expr(value)?;
            fields.insert(name, self.ctx.stack.last_type());
            count += 1;
        }

        let resolved = self.struct_init(&target, &fields, node.span)?;
        self.ctx.stack.push(TypedNode::Expr(resolved));
        self.ctx.stack.push_forward(count)?;
        Ok(())
    }

    /// Validate an initializer list against a struct: every named member must
    /// exist, every member must be supplied, every value must coerce
    pub fn struct_init(
        &mut self,
        target: &DataType,
        fields: &IndexMap<String, DataType>,
        span: Span,
    ) -> SemanticResult<ExprNode> {
        let st = match &target.kind {
            TypeKind::Struct(st) | TypeKind::StructInstance(st) => Rc::clone(st),
            TypeKind::Generic(generic) => {
                let bindings = generic.infer_named(fields).ok_or_else(|| {
                    SemanticError::GenericInferenceFailure {
                        generic: generic.display_name(),
                        span: span.into(),
                    }
                })?;
                let generate =
                    generic.create_generic(bindings, &mut self.ctx.registry, span)?;
                let concrete = generate.concrete.clone();
                return self.struct_init(&concrete, fields, span);
            }
            _ => {
                return Err(SemanticError::StructInitMismatch {
                    reason: format!("`{target}` cannot be initialized with a member list"),
                    span: span.into(),
                })
            }
        };

        for (name, supplied) in fields.iter() {
            let declared = st.member_type(name).ok_or_else(|| {
                SemanticError::StructInitMismatch {
                    reason: format!("`{}` has no member `{name}`", st.name),
                    span: span.into(),
                }
            })?;
            if !declared.coerce(supplied) {
                return Err(SemanticError::StructInitMismatch {
                    reason: format!(
                        "member `{name}` expects `{declared}`, found `{supplied}`"
                    ),
                    span: span.into(),
                });
            }
        }

        for name in st.members().keys() {
            if !fields.contains_key(name) {
                return Err(SemanticError::StructInitMismatch {
                    reason: format!("member `{name}` is missing from the initializer"),
                    span: span.into(),
                });
            }
        }

        Ok(ExprNode::new(
            ExprKind::InitList,
            DataType::new(TypeKind::StructInstance(st)),
        ))
    }

    // --- heap allocation --------------------------------------------------

    /// `make <size-expr>`, `make <type> [count]`, `make <struct>(args)`
    fn visit_heap_alloc(&mut self, node: &AstNode) -> SemanticResult<()> {
        let subject = node.children.first().ok_or_else(|| {
            SemanticError::resolution("heap allocation missing its subject", node.span)
        })?;

        // a type annotation subject is a typed allocation; a call-shaped
        // subject allocates a constructed struct; anything else is a raw size
        let resolved = match subject {
            SyntaxNode::Composite(composite) if composite.name == "alloc_type" => {
                let element = self.child_type(composite, 0)?;
                let count = match node.find("alloc_count") {
                    Some(count_node) => {
                        let expr = count_node.composite(0).ok_or_else(|| {
                            SemanticError::resolution("malformed allocation count", count_node.span)
                        })?;
                        self.visit_expr(expr)?;
                        let count_type = self.ctx.stack.last_type();
                        self.ctx.stack.pop();
                        Some(count_type)
                    }
                    None => None,
                };
                self.heap_alloc_type(&element, count.as_ref(), node.span)?
            }
            SyntaxNode::Composite(composite) if composite.name == "alloc_struct" => {
                let target = self.child_type(composite, 0)?;
                let mut args = ArgumentList::new();
                for child in composite.children.iter().skip(1) {
                    if let Some(expr) = child.as_composite() {
                        self.visit_expr(expr)?;
                        args.unnamed.push(self.ctx.stack.last_type());
                        self.ctx.stack.pop();
                    }
                }
                self.heap_alloc_struct(&target, &args, node.span)?
            }
            _ => {
                let expr = subject.as_composite().ok_or_else(|| {
                    SemanticError::resolution("malformed heap allocation", node.span)
                })?;
                self.visit_expr(expr)?;
                let size = self.ctx.stack.last_type();
                self.ctx.stack.pop();
                self.heap_alloc_size(&size, node.span)?
            }
        };

        self.ctx.stack.push(TypedNode::Expr(resolved));
        Ok(())
    }

    /// Raw allocation of `size` bytes yields an owned void pointer
    pub fn heap_alloc_size(&self, size: &DataType, span: Span) -> SemanticResult<ExprNode> {
        if !size.is_integral() {
            return Err(SemanticError::InvalidIndexType {
                found: size.to_string(),
                position: 0,
                span: span.into(),
            });
        }
        Ok(ExprNode::new(
            ExprKind::HeapAllocSize,
            DataType::pointer(DataType::void(), 1, true),
        ))
    }

    /// Typed allocation of `count` elements (default 1) yields an owned
    /// pointer to the element type
    pub fn heap_alloc_type(
        &self,
        element: &DataType,
        count: Option<&DataType>,
        span: Span,
    ) -> SemanticResult<ExprNode> {
        if matches!(
            element.kind,
            TypeKind::List { .. }
                | TypeKind::Dict { .. }
                | TypeKind::Function(_)
                | TypeKind::FunctionGroup(_)
        ) {
            return Err(SemanticError::UnsupportedHeapType {
                type_name: element.to_string(),
                span: span.into(),
            });
        }
        if let Some(count) = count {
            if !count.is_integral() {
                return Err(SemanticError::InvalidIndexType {
                    found: count.to_string(),
                    position: 0,
                    span: span.into(),
                });
            }
        }
        Ok(ExprNode::new(
            ExprKind::HeapAllocType,
            DataType::pointer(element.clone(), 1, true),
        ))
    }

    /// Struct allocation goes through a constructor and yields an owned
    /// pointer to the instance
    pub fn heap_alloc_struct(
        &mut self,
        target: &DataType,
        args: &ArgumentList,
        span: Span,
    ) -> SemanticResult<ExprNode> {
        let st = match &target.kind {
            TypeKind::Struct(st) | TypeKind::StructInstance(st) => Rc::clone(st),
            _ => {
                return Err(SemanticError::UnsupportedHeapType {
                    type_name: target.to_string(),
                    span: span.into(),
                })
            }
        };
        let constructor = self.select_constructor(&st, args, span)?;
        Ok(ExprNode::new(
            ExprKind::HeapAllocStruct,
            DataType::pointer(DataType::new(TypeKind::StructInstance(st)), 1, true),
        )
        .with_target(constructor))
    }

    // --- await and value extraction ---------------------------------------

    /// `await <expr>` is only meaningful on an async call
    fn visit_await(&mut self, node: &AstNode) -> SemanticResult<()> {
        let inner = node.composite(0).ok_or_else(|| {
            SemanticError::resolution("await missing its expression", node.span)
        })?;
        self.visit_expr(inner)?;

        let is_async_call = self
            .ctx
            .stack
            .last()
            .and_then(TypedNode::as_expr)
            .is_some_and(|expr| expr.kind == ExprKind::CallAsync);
        if !is_async_call {
            return Err(SemanticError::resolution(
                "only an async call can be awaited",
                node.span,
            ));
        }

        let data_type = self.ctx.stack.last_type();
        self.ctx
            .stack
            .push(TypedNode::Expr(ExprNode::new(ExprKind::Await, data_type)));
        self.ctx.stack.push_forward(1)?;
        Ok(())
    }

    /// `from <expr>` extracts the carried values of a constructed type-class
    /// variant: a single value directly, several as a tuple
    fn visit_from(&mut self, node: &AstNode) -> SemanticResult<()> {
        let inner = node.composite(0).ok_or_else(|| {
            SemanticError::resolution("from-expression missing its subject", node.span)
        })?;
        self.visit_expr(inner)?;
        let receiver = self.ctx.stack.last_type();

        let resolved = self.extract_value(&receiver, node.span)?;
        self.ctx.stack.push(TypedNode::Expr(resolved));
        self.ctx.stack.push_forward(1)?;
        Ok(())
    }

    pub fn extract_value(&self, receiver: &DataType, span: Span) -> SemanticResult<ExprNode> {
        match &receiver.kind {
            TypeKind::TypeClassVariant {
                variant,
                needs_construction: false,
            } => {
                let data_type = match variant.values.len() {
                    0 => {
                        return Err(SemanticError::TypeClassConstructionError {
                            reason: format!("variant `{}` carries no values", variant.name),
                            span: span.into(),
                        })
                    }
                    1 => variant.values[0].clone(),
                    _ => DataType::tuple(variant.values.clone()),
                };
                Ok(ExprNode::new(ExprKind::ExtractValue, data_type))
            }
            _ => Err(SemanticError::TypeClassConstructionError {
                reason: format!("`{receiver}` is not a constructed variant"),
                span: span.into(),
            }),
        }
    }
}

/// The function signature a deferred argument is resolved against
fn deferred_signature(
    parameter: &crate::types::Parameter,
    span: Span,
) -> SemanticResult<Rc<FunctionType>> {
    match &parameter.data_type.kind {
        TypeKind::Function(expected) => Ok(Rc::clone(expected)),
        _ => Err(SemanticError::resolution(
            format!(
                "deferred expression needs a function context, found `{}`",
                parameter.data_type
            ),
            span,
        )),
    }
}

/// Classify a `[...]` trailer purely from which of {start, stop, step}
/// expressions are present and how many `:` separators appear
pub fn classify_slice(
    has_start: bool,
    has_end: bool,
    has_step: bool,
    colon_count: usize,
) -> ExprKind {
    match colon_count {
        0 => ExprKind::Subscript,
        1 => match (has_start, has_end) {
            (true, true) => ExprKind::Slice,
            (true, false) => ExprKind::SliceBegin,
            (false, true) => ExprKind::SliceEnd,
            (false, false) => ExprKind::SliceCopy,
        },
        _ => match (has_start, has_end, has_step) {
            (true, true, true) => ExprKind::SliceStep,
            (true, false, true) => ExprKind::SliceBeginStep,
            (false, true, true) => ExprKind::SliceEndStep,
            (false, false, true) => ExprKind::SlicePureStep,
            (true, true, false) => ExprKind::Slice,
            (true, false, false) => ExprKind::SliceBegin,
            (false, true, false) => ExprKind::SliceEnd,
            (false, false, false) => ExprKind::SliceCopy,
        },
    }
}
