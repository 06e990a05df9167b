//! Declaration dependency ordering
//!
//! Global declarations may reference each other in any textual order, so
//! resolution runs over a dependency graph instead of source order. Only
//! by-value mentions create edges; pointer and reference indirections break
//! the dependency because the layout of the pointee is not needed to lay out
//! the pointer.

use crate::error::{SemanticError, SemanticResult};
use crate::types::{DataType, TypeKind};
use gale_syntax::Span;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// The graph of global declarations and their by-value dependencies
#[derive(Debug, Default)]
pub struct DeclarationGraph {
    graph: DiGraph<String, ()>,
    indices: HashMap<String, NodeIndex>,
    spans: HashMap<String, Span>,
}

impl DeclarationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.indices.get(name) {
            return index;
        }
        let index = self.graph.add_node(name.to_string());
        self.indices.insert(name.to_string(), index);
        index
    }

    /// Register a declaration by name with already-collected references,
    /// used by the pre-checking ordering pass over the raw syntax tree
    pub fn add_named(&mut self, name: &str, references: &[String], span: Span) {
        let from = self.node(name);
        self.spans.insert(name.to_string(), span);
        for target in references {
            let to = self.node(target);
            if !self.graph.contains_edge(from, to) {
                self.graph.add_edge(from, to, ());
            }
        }
    }

    /// Register a declaration and the by-value dependencies found in its type
    pub fn add_declaration(&mut self, name: &str, data_type: &DataType, span: Span) {
        let from = self.node(name);
        self.spans.insert(name.to_string(), span);

        let mut referenced = Vec::new();
        collect_component_refs(data_type, &mut referenced);

        // a self-mention by value stays in the graph as a one-node cycle
        for target in referenced {
            let to = self.node(&target);
            if !self.graph.contains_edge(from, to) {
                self.graph.add_edge(from, to, ());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Declarations in dependency-first order. A by-value cycle is an error
    /// naming every declaration on it.
    pub fn resolution_order(&self) -> SemanticResult<Vec<String>> {
        match toposort(&self.graph, None) {
            Ok(sorted) => Ok(sorted
                .into_iter()
                .rev()
                .map(|index| self.graph[index].clone())
                .collect()),
            Err(_) => {
                let cycle = self.find_cycle();
                let span = cycle
                    .first()
                    .and_then(|name| self.spans.get(name))
                    .copied()
                    .unwrap_or_default();
                Err(SemanticError::CyclicDependency {
                    cycle: cycle.join(" -> "),
                    span: span.into(),
                })
            }
        }
    }

    fn find_cycle(&self) -> Vec<String> {
        for component in tarjan_scc(&self.graph) {
            let cyclic = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&index| self.graph.contains_edge(index, index));
            if cyclic {
                return component
                    .into_iter()
                    .map(|index| self.graph[index].clone())
                    .collect();
            }
        }
        Vec::new()
    }
}

/// Dependencies of the declaration itself: its component types, without the
/// declaration's own name (the node, not an edge). A struct member of the
/// struct's own type still surfaces as a self-edge through the member walk.
fn collect_component_refs(data_type: &DataType, out: &mut Vec<String>) {
    match &data_type.kind {
        TypeKind::Struct(st) | TypeKind::StructInstance(st) => {
            for member in st.members().values() {
                collect_value_refs(&member.data_type, out);
            }
        }
        TypeKind::TypeClass(tc) => {
            for variant in &tc.variants {
                for value in &variant.values {
                    collect_value_refs(value, out);
                }
            }
        }
        TypeKind::Interface(_)
        | TypeKind::InterfaceInstance(_)
        | TypeKind::Generic(_)
        | TypeKind::GenericGroup(_) => {}
        _ => collect_value_refs(data_type, out),
    }
}

/// Collect the names of declarations a type mentions by value. Pointer and
/// reference payloads are not entered; function signatures carry their
/// parameter and return types by value only at call boundaries, so they do
/// not constrain declaration layout either.
fn collect_value_refs(data_type: &DataType, out: &mut Vec<String>) {
    match &data_type.kind {
        TypeKind::Struct(st) | TypeKind::StructInstance(st) => {
            out.push(st.name.clone());
            for member in st.members().values() {
                collect_value_refs(&member.data_type, out);
            }
        }
        TypeKind::TypeClass(tc) => {
            out.push(tc.name.clone());
            for variant in &tc.variants {
                for value in &variant.values {
                    collect_value_refs(value, out);
                }
            }
        }
        TypeKind::TypeClassVariant { variant, .. } => {
            out.push(variant.parent_name());
            for value in &variant.values {
                collect_value_refs(value, out);
            }
        }
        TypeKind::Interface(it) | TypeKind::InterfaceInstance(it) => {
            if let Some(name) = &it.name {
                out.push(name.clone());
            }
        }
        TypeKind::Array { element, .. } | TypeKind::List { element } => {
            collect_value_refs(element, out);
        }
        TypeKind::Dict { key, value } => {
            collect_value_refs(key, out);
            collect_value_refs(value, out);
        }
        TypeKind::Tuple(elements) => {
            for element in elements {
                collect_value_refs(element, out);
            }
        }
        TypeKind::GenericAlias { replacement, .. } => collect_value_refs(replacement, out),
        TypeKind::Generic(generic) => {
            out.push(generic.name.clone());
        }
        TypeKind::SelfRef(cell) => {
            out.push(cell.name.clone());
        }
        // indirections break the dependency
        TypeKind::Pointer { .. } | TypeKind::Reference(_) | TypeKind::Function(_) => {}
        _ => {}
    }
}
