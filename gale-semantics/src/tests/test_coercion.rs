//! Coercion algebra and equality

use crate::interfaces::{InterfaceType, MethodStatus};
use crate::symbols::Symbol;
use crate::types::{DataType, FunctionType, SimpleKind, SimpleType, StructType, TypeKind};
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn sample_types() -> Vec<DataType> {
    vec![
        DataType::int(),
        DataType::bool_type(),
        DataType::str_type(),
        DataType::double(),
        DataType::simple(SimpleType::unsigned(SimpleKind::Byte)),
        DataType::array(DataType::int(), Some(4)),
        DataType::array(DataType::int(), None),
        DataType::list(DataType::str_type()),
        DataType::dict(DataType::int(), DataType::str_type()),
        DataType::pointer(DataType::int(), 1, false),
        DataType::pointer(DataType::void(), 2, true),
        DataType::reference(DataType::int()),
        DataType::tuple(vec![DataType::int(), DataType::bool_type()]),
        DataType::function(FunctionType::new(vec![], DataType::void(), false)),
        DataType::int().const_copy(),
    ]
}

#[test]
fn test_coercion_reflexivity() {
    for ty in sample_types() {
        assert!(ty.coerce(&ty), "type `{ty}` does not coerce to itself");
    }
}

#[test]
fn test_equality_implies_mutual_coercion() {
    for a in sample_types() {
        for b in sample_types() {
            if matches!(a.kind, TypeKind::Reference(_)) {
                continue;
            }
            if a.equals(&b) {
                assert!(a.coerce(&b), "`{a}` equals `{b}` but does not accept it");
                assert!(b.coerce(&a), "`{b}` equals `{a}` but does not accept it");
            }
        }
    }
}

#[test]
fn test_list_accepts_array_but_not_conversely() {
    let list = DataType::list(DataType::int());
    let array = DataType::array(DataType::int(), None);

    assert!(list.coerce(&array));
    assert!(!array.coerce(&list));
}

#[test]
fn test_numeric_widening() {
    let byte = DataType::simple(SimpleType::new(SimpleKind::Byte));
    let short = DataType::simple(SimpleType::new(SimpleKind::Short));
    let int = DataType::int();
    let long = DataType::long();
    let float = DataType::float();
    let double = DataType::double();

    assert!(short.coerce(&byte));
    assert!(int.coerce(&short));
    assert!(long.coerce(&int));
    assert!(float.coerce(&long));
    assert!(double.coerce(&float));

    assert!(!byte.coerce(&short));
    assert!(!int.coerce(&long));
    assert!(!float.coerce(&double));
}

#[test]
fn test_widening_crosses_sign_only_upward() {
    let uint = DataType::simple(SimpleType::unsigned(SimpleKind::Int));
    let int = DataType::int();
    let long = DataType::long();

    // equal rank never crosses signedness
    assert!(!int.coerce(&uint));
    assert!(!uint.coerce(&int));
    // a strictly higher rank accepts either sign
    assert!(long.coerce(&uint));
}

#[test]
fn test_char_promotions() {
    let ch = DataType::char_type();
    assert!(DataType::str_type().coerce(&ch));
    assert!(DataType::int().coerce(&ch));
    assert!(DataType::long().coerce(&ch));
    assert!(!DataType::bool_type().coerce(&ch));
}

#[test]
fn test_constancy_is_one_way() {
    let int = DataType::int();
    let const_int = int.const_copy();

    // a constant target relaxes; a mutable target never accepts const-only
    assert!(const_int.coerce(&int));
    assert!(!int.coerce(&const_int));
    assert!(!int.equals(&const_int));
}

#[test]
fn test_array_size_rules() {
    let sized = DataType::array(DataType::int(), Some(4));
    let other_size = DataType::array(DataType::int(), Some(8));
    let unsized_array = DataType::array(DataType::int(), None);

    assert!(unsized_array.coerce(&sized));
    assert!(!sized.coerce(&other_size));
    assert!(sized.coerce(&sized));
}

#[test]
fn test_pointer_rules() {
    let int_ptr = DataType::pointer(DataType::int(), 1, false);
    let void_ptr = DataType::pointer(DataType::void(), 1, false);
    let bool_ptr = DataType::pointer(DataType::bool_type(), 1, false);
    let deep_ptr = DataType::pointer(DataType::int(), 2, false);

    assert!(int_ptr.coerce(&void_ptr));
    assert!(void_ptr.coerce(&int_ptr));
    assert!(!int_ptr.coerce(&bool_ptr));
    assert!(!int_ptr.coerce(&deep_ptr));
}

#[test]
fn test_reference_auto_derefs_source_side_only() {
    let int = DataType::int();
    let int_ref = DataType::reference(DataType::int());

    assert!(int.coerce(&int_ref));
    assert!(!int_ref.coerce(&int));
}

#[test]
fn test_void_and_incomplete_coerce_anywhere() {
    let int = DataType::int();
    assert!(int.coerce(&DataType::void()));
    assert!(int.coerce(&DataType::incomplete()));
}

#[test]
fn test_super_form_interface_never_a_value() {
    let iface = InterfaceType::declared("Shape", true);
    iface.add_method(
        Symbol::new(
            "area",
            DataType::function(FunctionType::new(vec![], DataType::double(), false)),
        ),
        MethodStatus::Abstract,
    );
    let value = DataType::new(TypeKind::InterfaceInstance(iface));

    assert!(!DataType::int().coerce(&value));
    assert!(!value.clone().coerce(&value));
}

#[test]
fn test_struct_instance_structural_equality() {
    let a = StructType::new("Point");
    a.add_member(Symbol::new("x", DataType::int()));
    a.add_member(Symbol::new("y", DataType::int()));
    let b = StructType::new("Point");
    b.add_member(Symbol::new("x", DataType::int()));
    b.add_member(Symbol::new("y", DataType::int()));

    let a = DataType::new(TypeKind::StructInstance(a));
    let b = DataType::new(TypeKind::StructInstance(b));
    assert!(a.equals(&b));
    assert!(a.coerce(&b));
}

#[test]
fn test_function_compatibility() {
    let takes_int = FunctionType::new(
        vec![crate::types::Parameter::new("n", DataType::int())],
        DataType::void(),
        false,
    );
    let takes_int_again = takes_int.clone();
    let takes_long = FunctionType::new(
        vec![crate::types::Parameter::new("n", DataType::long())],
        DataType::void(),
        false,
    );
    let async_form = FunctionType::new(
        vec![crate::types::Parameter::new("n", DataType::int())],
        DataType::void(),
        true,
    );

    assert!(takes_int.compatible(&takes_int_again));
    // parameters require exact equality, not coercion
    assert!(!takes_long.compatible(&takes_int));
    assert!(!takes_int.compatible(&async_form));
}

#[test]
fn test_tuple_display() {
    let tuple = DataType::tuple(vec![DataType::int(), DataType::str_type()]);
    assert_eq!(tuple.to_string(), "(int, str)");
}
