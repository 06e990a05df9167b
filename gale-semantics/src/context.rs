//! Per-run analysis state
//!
//! One `AnalysisContext` is created for each compilation run and owns every
//! cache whose identity matters across the run: the implicit-interface
//! registry and the derived method tables. Nothing here is global; two runs
//! never share state.

use crate::interfaces::{InterfaceRegistry, InterfaceType, MethodTable};
use crate::symbols::SymbolTable;
use crate::typed_ast::NodeStack;
use gale_syntax::Span;
use std::rc::Rc;

/// Shared state threaded through every resolution operation of one run
#[derive(Debug)]
pub struct AnalysisContext {
    pub table: SymbolTable,
    pub registry: InterfaceRegistry,
    pub stack: NodeStack,
    /// Method tables derived so far, one per (interface, binder) pair
    method_tables: Vec<MethodTable>,
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self {
            table: SymbolTable::new(),
            registry: InterfaceRegistry::new(),
            stack: NodeStack::new(),
            method_tables: Vec::new(),
        }
    }

    /// Derive and record the method table for a binder of `interface`,
    /// reusing an already-derived table for the same pair
    pub fn derive_method_table(
        &mut self,
        interface: &Rc<InterfaceType>,
        binder: &str,
        overrides: &InterfaceType,
        span: Span,
    ) -> crate::error::SemanticResult<usize> {
        if let Some(index) = self.method_tables.iter().position(|table| {
            Rc::ptr_eq(&table.interface, interface) && table.binder == binder
        }) {
            return Ok(index);
        }
        let table = MethodTable::derive(interface, binder, overrides, span)?;
        self.method_tables.push(table);
        Ok(self.method_tables.len() - 1)
    }

    pub fn method_tables(&self) -> &[MethodTable] {
        &self.method_tables
    }
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new()
    }
}
