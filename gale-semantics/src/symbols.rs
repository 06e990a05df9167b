//! Symbols and the scoped symbol table
//!
//! Scopes form a stack: one is pushed before entering a nested binding region
//! and popped on exit, and lookups walk outward from the innermost scope.
//! Names are unique per scope; shadowing is permitted only across scope
//! boundaries.

use crate::types::DataType;
use indexmap::IndexMap;

/// Declaration modifiers carried by a symbol, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Private,
    Exported,
    Constant,
    Constexpr,
    Volatile,
    Owned,
    Property,
    Partial,
}

/// A named declaration: type, modifiers and, for compile-time constants,
/// the literal value
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub data_type: DataType,
    pub modifiers: Vec<Modifier>,
    pub value: Option<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            modifiers: Vec::new(),
            value: None,
        }
    }

    pub fn with_modifiers(
        name: impl Into<String>,
        data_type: DataType,
        modifiers: Vec<Modifier>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            modifiers,
            value: None,
        }
    }

    /// A compile-time constant symbol carrying its literal value
    pub fn constexpr(name: impl Into<String>, data_type: DataType, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type,
            modifiers: vec![Modifier::Constexpr],
            value: Some(value.into()),
        }
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}

/// A stack of lexical scopes, each an ordered name-to-symbol map
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<IndexMap<String, Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![IndexMap::new()],
        }
    }

    /// Push a new lexical scope; must be paired with `ascend_scope` on every
    /// code path
    pub fn descend_scope(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    /// Pop the innermost scope, discarding its symbols. The global scope is
    /// never popped.
    pub fn ascend_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Add a symbol to the innermost scope; false on a same-scope duplicate.
    /// The caller converts a false result into a `DuplicateSymbol` diagnostic.
    pub fn add_symbol(&mut self, symbol: Symbol) -> bool {
        let scope = self.scopes.last_mut().expect("table always has a scope");
        if scope.contains_key(&symbol.name) {
            return false;
        }
        scope.insert(symbol.name.clone(), symbol);
        true
    }

    /// Innermost-to-outermost search
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }

    /// Replace the type of an already-declared symbol, searching inward-out.
    /// This is the back-patch used for self-referential declarations and
    /// decorator return-type overrides; everything else about a symbol is
    /// immutable once created.
    pub fn patch_symbol_type(&mut self, name: &str, data_type: DataType) -> bool {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(symbol) = scope.get_mut(name) {
                symbol.data_type = data_type;
                return true;
            }
        }
        false
    }

    /// Read-only view of every global-scope symbol
    pub fn globals(&self) -> impl Iterator<Item = &Symbol> {
        self.scopes[0].values()
    }

    /// Read-only external view: the global symbols marked `Exported`, used
    /// for package-level lookup from other compilation units
    pub fn exported_symbols(&self) -> IndexMap<String, Symbol> {
        self.scopes[0]
            .iter()
            .filter(|(_, symbol)| symbol.has_modifier(Modifier::Exported))
            .map(|(name, symbol)| (name.clone(), symbol.clone()))
            .collect()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
