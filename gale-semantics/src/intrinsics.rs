//! Reserved names and builtin type lookup tables

use crate::types::{DataType, SimpleKind, SimpleType};
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Subscript operator overload name
pub const SUBSCRIPT_OVERLOAD: &str = "__[]__";
/// Slice operator overload name
pub const SLICE_OVERLOAD: &str = "__[:]__";

lazy_static! {
    /// Special method names reserved by the language; user declarations may
    /// implement them but never call them directly by name
    pub static ref RESERVED_METHODS: Vec<&'static str> = vec![
        "__finalize__",
        "__copy__",
        "__get__",
        "__set__",
        SUBSCRIPT_OVERLOAD,
        SLICE_OVERLOAD,
    ];

    /// Builtin simple-type names as they appear in source
    pub static ref BUILTIN_TYPES: HashMap<&'static str, SimpleType> = {
        let mut table = HashMap::new();
        table.insert("bool", SimpleType::new(SimpleKind::Bool));
        table.insert("byte", SimpleType::new(SimpleKind::Byte));
        table.insert("char", SimpleType::new(SimpleKind::Char));
        table.insert("short", SimpleType::new(SimpleKind::Short));
        table.insert("int", SimpleType::new(SimpleKind::Int));
        table.insert("long", SimpleType::new(SimpleKind::Long));
        table.insert("float", SimpleType::new(SimpleKind::Float));
        table.insert("double", SimpleType::new(SimpleKind::Double));
        table.insert("str", SimpleType::new(SimpleKind::Str));
        table.insert("ubyte", SimpleType::unsigned(SimpleKind::Byte));
        table.insert("ushort", SimpleType::unsigned(SimpleKind::Short));
        table.insert("uint", SimpleType::unsigned(SimpleKind::Int));
        table.insert("ulong", SimpleType::unsigned(SimpleKind::Long));
        table
    };
}

/// Resolve a builtin type name; `void` is handled alongside the simple types
pub fn builtin_type(name: &str) -> Option<DataType> {
    if name == "void" {
        return Some(DataType::void());
    }
    BUILTIN_TYPES.get(name).map(|simple| DataType::simple(*simple))
}

/// Is `name` one of the reserved special methods?
pub fn is_reserved_method(name: &str) -> bool {
    RESERVED_METHODS.contains(&name)
}
