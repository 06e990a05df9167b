//! Type classes: static variant access, construction and value extraction

use crate::checker::Checker;
use crate::error::SemanticError;
use crate::overload::ArgumentList;
use crate::typed_ast::ExprKind;
use crate::types::{DataType, TypeClassType, TypeKind};
use gale_syntax::Span;
use pretty_assertions::assert_eq;
use std::rc::Rc;

/// `Option := Some(int) | None`
fn option() -> Rc<TypeClassType> {
    TypeClassType::new(
        "Option",
        vec![
            ("Some".to_string(), vec![DataType::int()]),
            ("None".to_string(), vec![]),
        ],
    )
}

/// `Result := Ok(T) | Err(str)` with an unbound placeholder
fn generic_result() -> Rc<TypeClassType> {
    TypeClassType::new(
        "Result",
        vec![
            ("Ok".to_string(), vec![DataType::placeholder("T")]),
            ("Err".to_string(), vec![DataType::str_type()]),
        ],
    )
}

#[test]
fn test_static_access_resolves_variants() {
    let mut checker = Checker::new();
    let receiver = DataType::new(TypeKind::TypeClass(option()));

    // an empty variant is a complete value already
    let none = checker
        .static_access(&receiver, "None", Span::default())
        .unwrap();
    assert_eq!(none.kind, ExprKind::StaticGet);
    match &none.data_type.kind {
        TypeKind::TypeClassVariant {
            needs_construction, ..
        } => assert!(!needs_construction),
        other => panic!("expected a variant, got {other:?}"),
    }

    // a value-carrying variant still awaits construction
    let some = checker
        .static_access(&receiver, "Some", Span::default())
        .unwrap();
    match &some.data_type.kind {
        TypeKind::TypeClassVariant {
            needs_construction, ..
        } => assert!(needs_construction),
        other => panic!("expected a variant, got {other:?}"),
    }
}

#[test]
fn test_static_access_unknown_variant() {
    let mut checker = Checker::new();
    let receiver = DataType::new(TypeKind::TypeClass(option()));

    let failure = checker.static_access(&receiver, "Maybe", Span::default());
    assert!(matches!(
        failure,
        Err(SemanticError::UnresolvedMember { ref member, .. }) if member == "Maybe"
    ));
}

#[test]
fn test_static_access_requires_package_or_type_class() {
    let mut checker = Checker::new();
    let failure = checker.static_access(&DataType::int(), "anything", Span::default());
    assert!(matches!(
        failure,
        Err(SemanticError::InvalidStaticAccess { ref type_name, .. }) if type_name == "int"
    ));
}

#[test]
fn test_variant_construction() {
    let mut checker = Checker::new();
    let variant = option().variant("Some").unwrap();

    let args = ArgumentList::positional(vec![DataType::int()]);
    let resolved = checker
        .construct_variant(&variant, true, &args, Span::default())
        .unwrap();
    assert_eq!(resolved.kind, ExprKind::InitTypeClassVariant);
    match &resolved.data_type.kind {
        TypeKind::TypeClassVariant {
            needs_construction, ..
        } => assert!(!needs_construction),
        other => panic!("expected a constructed variant, got {other:?}"),
    }
}

#[test]
fn test_variant_construction_is_single_shot() {
    let mut checker = Checker::new();
    let variant = option().variant("Some").unwrap();

    let args = ArgumentList::positional(vec![DataType::int()]);
    let failure = checker.construct_variant(&variant, false, &args, Span::default());
    assert!(matches!(
        failure,
        Err(SemanticError::TypeClassConstructionError { ref reason, .. })
            if reason.contains("already constructed")
    ));
}

#[test]
fn test_variant_construction_rejects_named_arguments() {
    let mut checker = Checker::new();
    let variant = option().variant("Some").unwrap();

    let mut args = ArgumentList::new();
    args.named.insert("value".to_string(), DataType::int());
    let failure = checker.construct_variant(&variant, true, &args, Span::default());
    assert!(matches!(
        failure,
        Err(SemanticError::TypeClassConstructionError { .. })
    ));
}

#[test]
fn test_variant_construction_checks_arity() {
    let mut checker = Checker::new();
    let variant = option().variant("Some").unwrap();

    let args = ArgumentList::positional(vec![DataType::int(), DataType::int()]);
    let failure = checker.construct_variant(&variant, true, &args, Span::default());
    assert!(matches!(
        failure,
        Err(SemanticError::TypeClassConstructionError { ref reason, .. })
            if reason.contains("carries 1 values, 2 given")
    ));
}

#[test]
fn test_variant_construction_checks_value_types() {
    let mut checker = Checker::new();
    let variant = option().variant("Some").unwrap();

    let args = ArgumentList::positional(vec![DataType::str_type()]);
    let failure = checker.construct_variant(&variant, true, &args, Span::default());
    assert!(matches!(
        failure,
        Err(SemanticError::TypeClassConstructionError { .. })
    ));
}

#[test]
fn test_generic_variant_captures_the_placeholder() {
    let mut checker = Checker::new();
    let result = generic_result();
    let variant = result.variant("Ok").unwrap();

    let args = ArgumentList::positional(vec![DataType::bool_type()]);
    let resolved = checker
        .construct_variant(&variant, true, &args, Span::default())
        .unwrap();

    // the captured binding is substituted into the constructed value
    match &resolved.data_type.kind {
        TypeKind::TypeClassVariant { variant, .. } => {
            assert_eq!(variant.values[0].to_string(), "bool");
        }
        other => panic!("expected a constructed variant, got {other:?}"),
    }
}

#[test]
fn test_extract_single_value() {
    let checker = Checker::new();
    let variant = option().variant("Some").unwrap();
    let receiver = DataType::new(TypeKind::TypeClassVariant {
        variant,
        needs_construction: false,
    });

    let resolved = checker.extract_value(&receiver, Span::default()).unwrap();
    assert_eq!(resolved.kind, ExprKind::ExtractValue);
    assert_eq!(resolved.data_type.to_string(), "int");
}

#[test]
fn test_extract_several_values_as_a_tuple() {
    let checker = Checker::new();
    let pair = TypeClassType::new(
        "Pair",
        vec![(
            "Both".to_string(),
            vec![DataType::int(), DataType::str_type()],
        )],
    );
    let receiver = DataType::new(TypeKind::TypeClassVariant {
        variant: pair.variant("Both").unwrap(),
        needs_construction: false,
    });

    let resolved = checker.extract_value(&receiver, Span::default()).unwrap();
    assert_eq!(resolved.data_type.to_string(), "(int, str)");
}

#[test]
fn test_extract_from_an_empty_variant_fails() {
    let checker = Checker::new();
    let receiver = DataType::new(TypeKind::TypeClassVariant {
        variant: option().variant("None").unwrap(),
        needs_construction: false,
    });

    let failure = checker.extract_value(&receiver, Span::default());
    assert!(matches!(
        failure,
        Err(SemanticError::TypeClassConstructionError { ref reason, .. })
            if reason.contains("carries no values")
    ));
}

#[test]
fn test_extract_requires_a_constructed_variant() {
    let checker = Checker::new();
    let failure = checker.extract_value(&DataType::int(), Span::default());
    assert!(matches!(
        failure,
        Err(SemanticError::TypeClassConstructionError { .. })
    ));
}

#[test]
fn test_parent_accepts_every_variant() {
    let option = option();
    let parent = DataType::new(TypeKind::TypeClass(Rc::clone(&option)));
    for variant in &option.variants {
        let value = DataType::new(TypeKind::TypeClassVariant {
            variant: Rc::clone(variant),
            needs_construction: false,
        });
        assert!(parent.coerce(&value));
    }
}
