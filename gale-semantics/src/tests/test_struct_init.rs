//! Struct initializer lists, constructor selection and heap allocation

use crate::checker::Checker;
use crate::error::SemanticError;
use crate::overload::ArgumentList;
use crate::symbols::Symbol;
use crate::typed_ast::ExprKind;
use crate::types::{DataType, FunctionType, Parameter, StructType, TypeKind};
use gale_syntax::Span;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn point() -> Rc<StructType> {
    let st = StructType::new("Point");
    st.add_member(Symbol::new("x", DataType::int()));
    st.add_member(Symbol::new("y", DataType::int()));
    st.ensure_default_constructor();
    st
}

fn fields(entries: &[(&str, DataType)]) -> IndexMap<String, DataType> {
    entries
        .iter()
        .map(|(name, data_type)| (name.to_string(), data_type.clone()))
        .collect()
}

#[test]
fn test_default_constructor_synthesis() {
    let st = StructType::new("Empty");
    assert!(st.constructors().is_empty());
    st.ensure_default_constructor();
    assert_eq!(st.constructors().len(), 1);
    assert!(st.constructors()[0].parameters.is_empty());

    // synthesis never displaces a declared constructor
    st.ensure_default_constructor();
    assert_eq!(st.constructors().len(), 1);
}

#[test]
fn test_complete_initializer() {
    let mut checker = Checker::new();
    let target = DataType::new(TypeKind::Struct(point()));

    let resolved = checker
        .struct_init(
            &target,
            &fields(&[("x", DataType::int()), ("y", DataType::int())]),
            Span::default(),
        )
        .unwrap();
    assert_eq!(resolved.kind, ExprKind::InitList);
    assert_eq!(resolved.data_type.to_string(), "Point");
    assert!(matches!(resolved.data_type.kind, TypeKind::StructInstance(_)));
}

#[test]
fn test_initializer_values_may_widen() {
    let mut checker = Checker::new();
    let st = StructType::new("Sample");
    st.add_member(Symbol::new("value", DataType::long()));
    let target = DataType::new(TypeKind::Struct(st));

    assert!(checker
        .struct_init(&target, &fields(&[("value", DataType::int())]), Span::default())
        .is_ok());
}

#[test]
fn test_missing_member_rejected() {
    let mut checker = Checker::new();
    let target = DataType::new(TypeKind::Struct(point()));

    let failure = checker.struct_init(
        &target,
        &fields(&[("x", DataType::int())]),
        Span::default(),
    );
    assert!(matches!(
        failure,
        Err(SemanticError::StructInitMismatch { ref reason, .. }) if reason.contains("`y`")
    ));
}

#[test]
fn test_unknown_member_rejected() {
    let mut checker = Checker::new();
    let target = DataType::new(TypeKind::Struct(point()));

    let failure = checker.struct_init(
        &target,
        &fields(&[
            ("x", DataType::int()),
            ("y", DataType::int()),
            ("z", DataType::int()),
        ]),
        Span::default(),
    );
    assert!(matches!(
        failure,
        Err(SemanticError::StructInitMismatch { ref reason, .. }) if reason.contains("`z`")
    ));
}

#[test]
fn test_member_type_mismatch_rejected() {
    let mut checker = Checker::new();
    let target = DataType::new(TypeKind::Struct(point()));

    let failure = checker.struct_init(
        &target,
        &fields(&[("x", DataType::str_type()), ("y", DataType::int())]),
        Span::default(),
    );
    assert!(matches!(
        failure,
        Err(SemanticError::StructInitMismatch { .. })
    ));
}

#[test]
fn test_non_struct_target_rejected() {
    let mut checker = Checker::new();
    let failure = checker.struct_init(
        &DataType::int(),
        &fields(&[("x", DataType::int())]),
        Span::default(),
    );
    assert!(matches!(
        failure,
        Err(SemanticError::StructInitMismatch { .. })
    ));
}

fn constructed_point() -> Rc<StructType> {
    let st = point();
    st.add_constructor(Rc::new(FunctionType::new(
        vec![
            Parameter::new("x", DataType::int()),
            Parameter::new("y", DataType::int()),
        ],
        DataType::void(),
        false,
    )));
    st
}

#[test]
fn test_constructor_call_produces_an_instance() {
    let mut checker = Checker::new();
    let receiver = DataType::new(TypeKind::Struct(constructed_point()));

    let mut args = ArgumentList::positional(vec![DataType::int(), DataType::int()]);
    let resolved = checker.call(&receiver, &mut args, 0, Span::default()).unwrap();
    assert_eq!(resolved.kind, ExprKind::CallConstructor);
    assert!(matches!(resolved.data_type.kind, TypeKind::StructInstance(_)));
    assert_eq!(resolved.target.as_ref().unwrap().parameters.len(), 2);
}

#[test]
fn test_constructor_no_match_names_the_struct() {
    let mut checker = Checker::new();
    let receiver = DataType::new(TypeKind::Struct(constructed_point()));

    let mut args = ArgumentList::positional(vec![DataType::str_type()]);
    let failure = checker.call(&receiver, &mut args, 0, Span::default());
    assert!(matches!(
        failure,
        Err(SemanticError::NoMatchingOverload { ref group, .. }) if group == "Point"
    ));
}

#[test]
fn test_constructor_exact_match_wins_over_widening() {
    let st = point();
    st.add_constructor(Rc::new(FunctionType::new(
        vec![Parameter::new("value", DataType::int())],
        DataType::void(),
        false,
    )));
    st.add_constructor(Rc::new(FunctionType::new(
        vec![Parameter::new("value", DataType::long())],
        DataType::void(),
        false,
    )));

    let mut checker = Checker::new();
    let receiver = DataType::new(TypeKind::Struct(st));
    let mut args = ArgumentList::positional(vec![DataType::int()]);
    let resolved = checker.call(&receiver, &mut args, 0, Span::default()).unwrap();
    let target = resolved.target.unwrap();
    assert_eq!(target.parameters[0].data_type.to_string(), "int");
}

#[test]
fn test_heap_alloc_struct_yields_owned_pointer() {
    let mut checker = Checker::new();
    let target = DataType::new(TypeKind::Struct(constructed_point()));

    let args = ArgumentList::positional(vec![DataType::int(), DataType::int()]);
    let resolved = checker
        .heap_alloc_struct(&target, &args, Span::default())
        .unwrap();
    assert_eq!(resolved.kind, ExprKind::HeapAllocStruct);
    match &resolved.data_type.kind {
        TypeKind::Pointer { pointee, depth: 1, owned: true } => {
            assert!(matches!(pointee.kind, TypeKind::StructInstance(_)));
        }
        other => panic!("expected an owned pointer, got {other:?}"),
    }
}

#[test]
fn test_heap_alloc_type_rejects_managed_types() {
    let checker = Checker::new();
    for unsupported in [
        DataType::list(DataType::int()),
        DataType::dict(DataType::int(), DataType::int()),
        DataType::function(FunctionType::new(vec![], DataType::void(), false)),
    ] {
        let failure = checker.heap_alloc_type(&unsupported, None, Span::default());
        assert!(matches!(
            failure,
            Err(SemanticError::UnsupportedHeapType { .. })
        ));
    }
}

#[test]
fn test_heap_alloc_type_checks_the_count() {
    let checker = Checker::new();

    let counted = checker
        .heap_alloc_type(&DataType::int(), Some(&DataType::long()), Span::default())
        .unwrap();
    assert_eq!(counted.data_type.to_string(), "*int");

    let failure = checker.heap_alloc_type(
        &DataType::int(),
        Some(&DataType::str_type()),
        Span::default(),
    );
    assert!(matches!(failure, Err(SemanticError::InvalidIndexType { .. })));
}

#[test]
fn test_heap_alloc_size_requires_an_integer() {
    let checker = Checker::new();

    let resolved = checker.heap_alloc_size(&DataType::int(), Span::default()).unwrap();
    assert_eq!(resolved.data_type.to_string(), "*void");

    let failure = checker.heap_alloc_size(&DataType::double(), Span::default());
    assert!(matches!(failure, Err(SemanticError::InvalidIndexType { .. })));
}
