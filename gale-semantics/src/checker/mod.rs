//! The semantic checker
//!
//! Walks the labeled syntax tree depth-first, resolving every declaration and
//! expression against the symbol table, the generic engine and the interface
//! registry. The first semantic error aborts resolution of the enclosing
//! declaration; nothing is downgraded to a default type.

pub mod atoms;
mod functions;

pub use atoms::{classify_slice, MemberOp};

use crate::context::AnalysisContext;
use crate::error::{SemanticError, SemanticResult};
use crate::generics::{GenericGroup, GenericType, GenericVariable};
use crate::interfaces::{InterfaceType, MethodStatus};
use crate::intrinsics::builtin_type;
use crate::symbols::{Modifier, Symbol};
use crate::typed_ast::{BlockKind, BlockNode, TypedNode};
use crate::types::{DataType, SelfCell, StructType, TypeClassType, TypeKind};
use gale_syntax::{AstNode, Span, SyntaxNode, Token};
use std::rc::Rc;

pub struct Checker {
    pub ctx: AnalysisContext,
}

impl Checker {
    pub fn new() -> Self {
        Self {
            ctx: AnalysisContext::new(),
        }
    }

    pub fn with_context(ctx: AnalysisContext) -> Self {
        Self { ctx }
    }

    /// Resolve a whole program node; the typed root block ends up as the
    /// single node left on the stack
    pub fn visit_program(&mut self, root: &AstNode) -> SemanticResult<()> {
        self.ctx.stack.push(TypedNode::Block(BlockNode::new(BlockKind::Program)));
        for child in &root.children {
            if let SyntaxNode::Composite(decl) = child {
                self.visit_declaration(decl)?;
            }
        }
        Ok(())
    }

    pub fn visit_declaration(&mut self, node: &AstNode) -> SemanticResult<()> {
        match node.name.as_str() {
            "struct_decl" => self.visit_struct(node),
            "interface_decl" => self.visit_interface(node),
            "interface_bind" => self.visit_interface_bind(node),
            "type_class_decl" => self.visit_type_class(node),
            "func_decl" | "async_func_decl" => self.visit_function(node),
            "generic_decl" => self.visit_generic(node),
            "variable_decl" => self.visit_variable(node),
            other => Err(SemanticError::resolution(
                format!("unknown declaration production `{other}`"),
                node.span,
            )),
        }
    }

    // --- type annotations -------------------------------------------------

    /// Resolve a type annotation node to a `DataType`
    pub fn resolve_type(&mut self, node: &SyntaxNode) -> SemanticResult<DataType> {
        match node {
            SyntaxNode::Leaf(token) => self.resolve_named_type(token),
            SyntaxNode::Composite(composite) => self.resolve_composite_type(composite),
        }
    }

    fn resolve_named_type(&mut self, token: &Token) -> SemanticResult<DataType> {
        if let Some(builtin) = builtin_type(&token.value) {
            return Ok(builtin);
        }

        let symbol = self.ctx.table.lookup(&token.value).ok_or_else(|| {
            SemanticError::resolution(format!("undefined type `{}`", token.value), token.span)
        })?;

        match &symbol.data_type.kind {
            TypeKind::Struct(st) => Ok(DataType::new(TypeKind::StructInstance(Rc::clone(st)))),
            TypeKind::Interface(it) => {
                Ok(DataType::new(TypeKind::InterfaceInstance(Rc::clone(it))))
            }
            TypeKind::TypeClass(_)
            | TypeKind::Generic(_)
            | TypeKind::GenericPlaceholder(_)
            | TypeKind::SelfRef(_)
            | TypeKind::GenericAlias { .. } => Ok(symbol.data_type.clone()),
            _ => Err(SemanticError::resolution(
                format!("`{}` does not name a type", token.value),
                token.span,
            )),
        }
    }

    pub(crate) fn resolve_composite_type(&mut self, node: &AstNode) -> SemanticResult<DataType> {
        match node.name.as_str() {
            "list_type" => {
                let element = self.child_type(node, 0)?;
                Ok(DataType::list(element))
            }
            "array_type" => {
                let element = self.child_type(node, 0)?;
                let size = node
                    .token(1)
                    .map(|token| self.integer_literal(token))
                    .transpose()?;
                Ok(DataType::array(element, size))
            }
            "dict_type" => {
                let key = self.child_type(node, 0)?;
                let value = self.child_type(node, 1)?;
                Ok(DataType::dict(key, value))
            }
            "pointer_type" => {
                let depth = node
                    .children
                    .iter()
                    .filter(|child| matches!(child, SyntaxNode::Leaf(t) if t.kind == "*"))
                    .count() as u32;
                let pointee = node
                    .children
                    .iter()
                    .find(|child| !matches!(child, SyntaxNode::Leaf(t) if t.kind == "*"))
                    .ok_or_else(|| {
                        SemanticError::resolution("pointer type missing a pointee", node.span)
                    })?;
                let pointee = self.resolve_type(pointee)?;
                Ok(DataType::pointer(pointee, depth.max(1), false))
            }
            "ref_type" => {
                let pointee = self.child_type(node, 0)?;
                Ok(DataType::reference(pointee))
            }
            "tuple_type" => {
                let mut elements = Vec::new();
                for child in &node.children {
                    elements.push(self.resolve_type(child)?);
                }
                Ok(DataType::tuple(elements))
            }
            "const_type" => {
                let inner = self.child_type(node, 0)?;
                Ok(inner.const_copy())
            }
            "generic_spec" => self.resolve_generic_spec(node),
            other => Err(SemanticError::resolution(
                format!("unknown type production `{other}`"),
                node.span,
            )),
        }
    }

    /// `Name<T1, T2, ...>`, explicit generic instantiation in type position
    fn resolve_generic_spec(&mut self, node: &AstNode) -> SemanticResult<DataType> {
        let base = node
            .children
            .first()
            .ok_or_else(|| SemanticError::resolution("empty generic specifier", node.span))?;
        let base_type = self.resolve_type(base)?;

        let mut bindings = Vec::new();
        for child in node.children.iter().skip(1) {
            bindings.push(self.resolve_type(child)?);
        }

        match &base_type.kind {
            TypeKind::Generic(generic) => {
                let generate =
                    generic.create_generic(bindings, &mut self.ctx.registry, node.span)?;
                Ok(generate.concrete.clone())
            }
            _ => Err(SemanticError::resolution(
                format!("`{base_type}` is not generic and takes no type arguments"),
                node.span,
            )),
        }
    }

    fn child_type(&mut self, node: &AstNode, index: usize) -> SemanticResult<DataType> {
        let child = node.children.get(index).ok_or_else(|| {
            SemanticError::resolution(
                format!("malformed `{}` node", node.name),
                node.span,
            )
        })?;
        self.resolve_type(child)
    }

    pub(crate) fn integer_literal(&self, token: &Token) -> SemanticResult<usize> {
        token.value.parse().map_err(|_| {
            SemanticError::resolution(
                format!("`{}` is not a valid integer literal", token.value),
                token.span,
            )
        })
    }

    // --- declarations -----------------------------------------------------

    /// `struct Name { members... constructors... }`
    fn visit_struct(&mut self, node: &AstNode) -> SemanticResult<()> {
        let name = self.declared_name(node)?;
        let span = node.span;

        // the body may reference the struct's own not-yet-complete type
        let self_cell = SelfCell::new(name.clone());
        self.declare(
            Symbol::new(&name, DataType::new(TypeKind::SelfRef(Rc::clone(&self_cell)))),
            span,
        )?;

        let st = StructType::new(&name);
        for member in node.find_all("member") {
            let member_name = self.identifier_of(member)?;
            let member_type = self.child_type(member, 1)?;
            let mut modifiers = Vec::new();
            if member.find("volatile_mod").is_some() {
                modifiers.push(Modifier::Volatile);
            }
            if !st.add_member(Symbol::with_modifiers(&member_name, member_type, modifiers)) {
                return Err(SemanticError::DuplicateSymbol {
                    name: member_name,
                    span: member.span.into(),
                });
            }
        }

        for constructor in node.find_all("constructor") {
            let parameters = self.resolve_parameters(constructor)?;
            let signature = Rc::new(crate::types::FunctionType::new(
                parameters,
                DataType::void(),
                false,
            ));
            if !st.add_constructor(signature) {
                return Err(SemanticError::resolution(
                    format!("duplicate constructor signature on `{name}`"),
                    constructor.span,
                ));
            }
        }
        st.ensure_default_constructor();

        let struct_type = DataType::new(TypeKind::Struct(Rc::clone(&st)));
        self_cell.resolve(DataType::new(TypeKind::StructInstance(Rc::clone(&st))));
        self.ctx.table.patch_symbol_type(&name, struct_type);

        self.ctx
            .stack
            .push(TypedNode::Block(BlockNode::new(BlockKind::Struct)));
        self.ctx.stack.merge_to_block()?;
        Ok(())
    }

    /// `interface Name { methods... }`. Methods without a body are Abstract,
    /// with a body Virtual, and `final` methods Concrete.
    fn visit_interface(&mut self, node: &AstNode) -> SemanticResult<()> {
        let name = self.declared_name(node)?;
        let span = node.span;

        let mut methods = Vec::new();
        let mut all_abstract = true;
        for method in node.find_all("method") {
            let method_name = self.identifier_of(method)?;
            let signature = self.method_signature(method)?;
            let status = if method.find("block").is_none() {
                MethodStatus::Abstract
            } else if method
                .children
                .iter()
                .any(|child| matches!(child, SyntaxNode::Leaf(t) if t.kind == "final"))
            {
                all_abstract = false;
                MethodStatus::Concrete
            } else {
                all_abstract = false;
                MethodStatus::Virtual
            };
            methods.push((method_name, signature, status, method.span));
        }

        let interface = InterfaceType::declared(&name, all_abstract);
        for (method_name, signature, status, method_span) in methods {
            if !interface.add_method(Symbol::new(&method_name, signature), status) {
                return Err(SemanticError::DuplicateSymbol {
                    name: method_name,
                    span: method_span.into(),
                });
            }
        }

        self.declare(
            Symbol::new(&name, DataType::new(TypeKind::Interface(interface))),
            span,
        )?;

        self.ctx
            .stack
            .push(TypedNode::Block(BlockNode::new(BlockKind::Interface)));
        self.ctx.stack.merge_to_block()?;
        Ok(())
    }

    /// `interface Name for BinderType { overrides... }`
    fn visit_interface_bind(&mut self, node: &AstNode) -> SemanticResult<()> {
        let name = self.declared_name(node)?;
        let span = node.span;

        let symbol = self.ctx.table.lookup(&name).ok_or_else(|| {
            SemanticError::resolution(format!("undefined interface `{name}`"), span)
        })?;
        let interface = match &symbol.data_type.kind {
            TypeKind::Interface(it) => Rc::clone(it),
            _ => {
                return Err(SemanticError::resolution(
                    format!("`{name}` is not an interface"),
                    span,
                ))
            }
        };

        let binder_node = node.children.get(1).ok_or_else(|| {
            SemanticError::resolution("interface bind missing a binder type", span)
        })?;
        let binder_type = self.resolve_type(binder_node)?;
        let binder_name = binder_type.to_string();

        let overrides = InterfaceType::implicit();
        for method in node.find_all("method") {
            let method_name = self.identifier_of(method)?;
            let signature = self.method_signature(method)?;
            if !overrides.add_method(Symbol::new(&method_name, signature), MethodStatus::Concrete) {
                return Err(SemanticError::DuplicateSymbol {
                    name: method_name,
                    span: method.span.into(),
                });
            }
        }

        self.ctx
            .derive_method_table(&interface, &binder_name, &overrides, span)?;

        // the binder now answers for the interface and carries its methods;
        // a method name already claimed by an earlier bind is a conflict
        interface.register_bind(binder_type.clone());
        let implicit = self.ctx.registry.interface_of(&binder_type);
        implicit.register_implements(Rc::clone(&interface));
        for (method_name, method) in overrides.methods().iter() {
            if !implicit.add_method(
                Symbol::new(method_name.clone(), method.symbol.data_type.clone()),
                MethodStatus::Concrete,
            ) {
                return Err(SemanticError::DuplicateSymbol {
                    name: method_name.clone(),
                    span: span.into(),
                });
            }
        }

        self.ctx
            .stack
            .push(TypedNode::Block(BlockNode::new(BlockKind::InterfaceBind)));
        self.ctx.stack.merge_to_block()?;
        Ok(())
    }

    /// `type Name = Variant(values...) | Variant2 | ...`
    fn visit_type_class(&mut self, node: &AstNode) -> SemanticResult<()> {
        let name = self.declared_name(node)?;
        let span = node.span;

        let mut variants = Vec::new();
        for variant in node.find_all("variant") {
            let variant_name = self.identifier_of(variant)?;
            let mut values = Vec::new();
            for child in variant.children.iter().skip(1) {
                values.push(self.resolve_type(child)?);
            }
            if variants.iter().any(|(existing, _): &(String, _)| existing == &variant_name) {
                return Err(SemanticError::DuplicateSymbol {
                    name: variant_name,
                    span: variant.span.into(),
                });
            }
            variants.push((variant_name, values));
        }

        let type_class = TypeClassType::new(&name, variants);
        self.declare(
            Symbol::new(&name, DataType::new(TypeKind::TypeClass(type_class))),
            span,
        )?;

        self.ctx
            .stack
            .push(TypedNode::Block(BlockNode::new(BlockKind::TypeClass)));
        self.ctx.stack.merge_to_block()?;
        Ok(())
    }

    /// `generic<T: Constraint, ...> <declaration>`. The inner declaration's
    /// type is wrapped into a generic template over the declared variables.
    fn visit_generic(&mut self, node: &AstNode) -> SemanticResult<()> {
        let mut variables = Vec::new();
        for var in node.find_all("generic_var") {
            let var_name = self.identifier_of(var)?;
            let mut constraints = Vec::new();
            for child in var.children.iter().skip(1) {
                let constraint = self.resolve_type(child)?;
                match &constraint.kind {
                    TypeKind::Interface(it) | TypeKind::InterfaceInstance(it) => {
                        constraints.push(Rc::clone(it));
                    }
                    _ => {
                        return Err(SemanticError::resolution(
                            format!("`{constraint}` cannot be used as a generic constraint"),
                            var.span,
                        ))
                    }
                }
            }
            variables.push(GenericVariable::constrained(var_name, constraints));
        }

        let inner = node
            .children
            .iter()
            .rev()
            .find_map(SyntaxNode::as_composite)
            .filter(|inner| inner.name != "generic_var")
            .ok_or_else(|| {
                SemanticError::resolution("generic declaration has no body", node.span)
            })?;

        let inner_name = self.declared_name(inner)?;

        // the variables are visible as placeholders while the body resolves,
        // and the body's own symbol lives in the same transient scope
        self.ctx.table.descend_scope();
        for variable in &variables {
            self.ctx
                .table
                .add_symbol(Symbol::new(&variable.name, DataType::placeholder(&variable.name)));
        }
        let template = self.visit_declaration(inner).and_then(|_| {
            self.ctx
                .table
                .lookup(&inner_name)
                .map(|symbol| symbol.data_type)
                .ok_or_else(|| {
                    SemanticError::resolution(
                        format!("generic body `{inner_name}` did not declare a symbol"),
                        node.span,
                    )
                })
        });
        self.ctx.table.ascend_scope();
        let template = template?;

        let generic = GenericType::new(&inner_name, variables, template);
        self.attach_generic(&inner_name, generic, node.span)
    }

    /// Register a generic template, grouping same-named generic functions
    fn attach_generic(
        &mut self,
        name: &str,
        generic: Rc<GenericType>,
        span: Span,
    ) -> SemanticResult<()> {
        let existing = self.ctx.table.lookup(name);
        let patched = match existing.as_ref().map(|symbol| &symbol.data_type.kind) {
            Some(TypeKind::Generic(previous))
                if matches!(previous.template.kind, TypeKind::Function(_)) =>
            {
                let group = GenericGroup::new(name, vec![Rc::clone(previous), generic]);
                DataType::new(TypeKind::GenericGroup(group))
            }
            Some(TypeKind::GenericGroup(group)) => {
                let mut templates = group.templates.clone();
                templates.push(generic);
                DataType::new(TypeKind::GenericGroup(GenericGroup::new(name, templates)))
            }
            _ => DataType::new(TypeKind::Generic(generic)),
        };
        if !self.ctx.table.patch_symbol_type(name, patched.clone()) {
            self.declare(Symbol::new(name, patched), span)?;
        }
        Ok(())
    }

    /// `let name [: type] [= expr]`
    fn visit_variable(&mut self, node: &AstNode) -> SemanticResult<()> {
        let name = self.declared_name(node)?;
        let span = node.span;

        let declared = node
            .find("type")
            .map(|annotation| self.child_type(annotation, 0))
            .transpose()?;

        let initializer = node.find("initializer");
        let inferred = match initializer {
            Some(init) => {
                let init_expr = init.composite(0).ok_or_else(|| {
                    SemanticError::resolution("malformed initializer", init.span)
                })?;
                self.visit_expr(init_expr)?;
                Some(self.ctx.stack.last_type())
            }
            None => None,
        };

        let data_type = match (declared, inferred) {
            (Some(declared), Some(inferred)) => {
                if !declared.coerce(&inferred) {
                    return Err(SemanticError::resolution(
                        format!("initializer of type `{inferred}` does not match `{declared}`"),
                        span,
                    ));
                }
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(inferred)) => inferred,
            (None, None) => {
                return Err(SemanticError::resolution(
                    format!("variable `{name}` needs a type annotation or an initializer"),
                    span,
                ))
            }
        };

        self.declare(Symbol::new(&name, data_type), span)?;
        if initializer.is_some() {
            self.ctx.stack.merge_to_block()?;
        }
        Ok(())
    }

    // --- helpers ----------------------------------------------------------

    pub(crate) fn declare(&mut self, symbol: Symbol, span: Span) -> SemanticResult<()> {
        let name = symbol.name.clone();
        if !self.ctx.table.add_symbol(symbol) {
            return Err(SemanticError::DuplicateSymbol {
                name,
                span: span.into(),
            });
        }
        Ok(())
    }

    /// Name a declaration introduces; a generic wrapper is named by its body
    pub(crate) fn declared_name(&self, node: &AstNode) -> SemanticResult<String> {
        if node.name == "generic_decl" {
            let inner = node
                .children
                .iter()
                .rev()
                .find_map(SyntaxNode::as_composite)
                .filter(|inner| inner.name != "generic_var")
                .ok_or_else(|| {
                    SemanticError::resolution("generic declaration has no body", node.span)
                })?;
            return self.declared_name(inner);
        }
        self.identifier_of(node)
    }

    /// First IDENTIFIER token of a node
    pub(crate) fn identifier_of(&self, node: &AstNode) -> SemanticResult<String> {
        node.children
            .iter()
            .find_map(|child| match child {
                SyntaxNode::Leaf(token) if token.kind == "IDENTIFIER" => {
                    Some(token.value.clone())
                }
                _ => None,
            })
            .ok_or_else(|| {
                SemanticError::resolution(
                    format!("`{}` node is missing its name", node.name),
                    node.span,
                )
            })
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}
