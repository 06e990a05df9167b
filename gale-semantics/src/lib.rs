//! Gale Semantics
//!
//! The semantic core of the Gale compiler: the engine that takes a parsed
//! syntax tree and produces a fully typed, resolved program in which every
//! expression carries a concrete type and every call is bound to a specific
//! callee.
//!
//! ## Architecture
//!
//! - **Type model**: the closed `DataType` tagged union with its directional
//!   structural coercion algebra
//! - **Symbol table**: stacked lexical scopes with package-export views
//! - **Generic engine**: constraint-checked, memoized instantiation plus
//!   call-site and initializer-list inference
//! - **Interface/dispatch model**: implicit interfaces, ordered method maps,
//!   per-(interface, binder) method tables whose slot order is the ABI
//! - **Overload resolution**: one argument-matching algebra shared by plain
//!   calls, constructors, function groups and generic groups
//! - **Checker**: a stack-based tree rewrite resolving member access,
//!   subscripts and slices, calls, initializers and heap allocation
//!
//! The crate consumes the labeled tree contract of `gale-syntax` and exposes
//! structured `miette` diagnostics; formatting and printing are external.

pub mod checker;
pub mod context;
pub mod dependency_graph;
pub mod error;
pub mod generics;
pub mod interfaces;
pub mod intrinsics;
pub mod overload;
pub mod symbols;
pub mod typed_ast;
pub mod types;

pub use checker::Checker;
pub use context::AnalysisContext;
pub use dependency_graph::DeclarationGraph;
pub use error::{SemanticError, SemanticResult};
pub use generics::{Generate, GenericGroup, GenericType, GenericVariable};
pub use interfaces::{
    InterfaceRegistry, InterfaceType, MethodDispatch, MethodStatus, MethodTable,
};
pub use overload::{ArgumentList, FunctionGroup};
pub use symbols::{Modifier, Symbol, SymbolTable};
pub use typed_ast::{BlockNode, ExprKind, ExprNode, NodeStack, TypedNode};
pub use types::{
    DataType, FunctionType, Parameter, SimpleKind, SimpleType, StructType, TypeClassType,
    TypeClassifier, TypeKind,
};

use gale_syntax::{AstNode, SyntaxNode};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::rc::Rc;

/// The artifact handed to code generation: the typed program tree, the
/// populated global table, and the analysis context carrying the method
/// tables and the interface registry
pub struct AnalyzedProgram {
    pub root: BlockNode,
    pub globals: IndexMap<String, Symbol>,
    pub context: AnalysisContext,
}

/// Resolve a whole program. Global declarations are first ordered by their
/// declaration-level type dependencies (by-value references only), then
/// checked in that order; a by-value cycle is a `CyclicDependency` error.
pub fn analyze_program(root: &AstNode) -> SemanticResult<AnalyzedProgram> {
    let mut checker = Checker::new();

    // phase 1: order the declarations
    let declarations = collect_declarations(&checker, root)?;
    let names: HashSet<&String> = declarations.keys().collect();
    let mut graph = DeclarationGraph::new();
    for (name, node) in declarations.iter() {
        let mut references = Vec::new();
        collect_type_references(node, &mut references);
        references.retain(|reference| names.contains(reference));
        graph.add_named(name, &references, node.span);
    }
    let order = graph.resolution_order()?;

    // phase 2: check each declaration, dependencies first
    checker
        .ctx
        .stack
        .push(TypedNode::Block(BlockNode::new(typed_ast::BlockKind::Program)));
    for name in &order {
        if let Some(node) = declarations.get(name) {
            checker.visit_declaration(node)?;
        }
    }

    // phase 3: the resolved types must themselves be free of by-value cycles
    let mut resolved = DeclarationGraph::new();
    for symbol in checker.ctx.table.globals() {
        resolved.add_declaration(&symbol.name, &symbol.data_type, root.span);
    }
    resolved.resolution_order()?;

    let root_block = match checker.ctx.stack.pop() {
        Some(TypedNode::Block(block)) => block,
        _ => {
            return Err(SemanticError::resolution(
                "resolution left the node stack unbalanced",
                root.span,
            ))
        }
    };

    let globals = checker
        .ctx
        .table
        .globals()
        .map(|symbol| (symbol.name.clone(), symbol.clone()))
        .collect();

    Ok(AnalyzedProgram {
        root: root_block,
        globals,
        context: checker.ctx,
    })
}

/// Resolve a program as a named package, additionally producing the package
/// value other compilation units access through `::`
pub fn analyze_package(
    name: &str,
    root: &AstNode,
) -> SemanticResult<(AnalyzedProgram, Rc<types::PackageType>)> {
    let analyzed = analyze_program(root)?;
    let exports = analyzed.context.table.exported_symbols();
    let package = types::PackageType::new(name, exports);
    Ok((analyzed, package))
}

/// Index a program's top-level declarations by the name they introduce.
/// Same-named function declarations are overloads and every one of them must
/// reach the checker to be grouped; any other name collision is an error.
fn collect_declarations<'a>(
    checker: &Checker,
    root: &'a AstNode,
) -> SemanticResult<IndexMap<String, &'a AstNode>> {
    let mut declarations = IndexMap::new();
    for child in &root.children {
        let Some(node) = child.as_composite() else {
            continue;
        };
        // an interface bind attaches to its interface rather than naming
        // a new symbol; it is ordered after the interface it binds
        let name = if node.name == "interface_bind" {
            format!("{}::bind::{}", checker.declared_name(node)?, declarations.len())
        } else {
            checker.declared_name(node)?
        };
        if declarations.contains_key(&name) {
            if matches!(node.name.as_str(), "func_decl" | "async_func_decl") {
                declarations.insert(format!("{name}::overload::{}", declarations.len()), node);
                continue;
            }
            return Err(SemanticError::DuplicateSymbol {
                name,
                span: node.span.into(),
            });
        }
        declarations.insert(name, node);
    }
    Ok(declarations)
}

/// Collect identifier references appearing in type-annotation position,
/// skipping pointer/reference subtrees: an indirection does not constrain
/// declaration order
fn collect_type_references(node: &AstNode, out: &mut Vec<String>) {
    const TYPE_NODES: &[&str] = &[
        "type",
        "list_type",
        "array_type",
        "dict_type",
        "tuple_type",
        "const_type",
        "generic_spec",
        "alloc_type",
        "alloc_struct",
        "interface_bind",
    ];

    match node.name.as_str() {
        "pointer_type" | "ref_type" | "block" => {}
        // the first identifier of these is the declared name, not a reference
        "member" | "variant" | "param" => {
            let mut seen_name = false;
            for child in &node.children {
                match child {
                    SyntaxNode::Leaf(token) if token.kind == "IDENTIFIER" => {
                        if seen_name {
                            out.push(token.value.clone());
                        } else {
                            seen_name = true;
                        }
                    }
                    SyntaxNode::Composite(composite) => collect_identifiers(composite, out),
                    _ => {}
                }
            }
        }
        name if TYPE_NODES.contains(&name) => collect_identifiers(node, out),
        _ => {
            for child in &node.children {
                if let SyntaxNode::Composite(composite) = child {
                    collect_type_references(composite, out);
                }
            }
        }
    }
}

fn collect_identifiers(node: &AstNode, out: &mut Vec<String>) {
    if matches!(node.name.as_str(), "pointer_type" | "ref_type") {
        return;
    }
    for child in &node.children {
        match child {
            SyntaxNode::Leaf(token) if token.kind == "IDENTIFIER" => {
                out.push(token.value.clone());
            }
            SyntaxNode::Composite(composite) => collect_identifiers(composite, out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests;
