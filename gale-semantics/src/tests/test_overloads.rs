//! Argument matching and overload selection

use crate::error::SemanticError;
use crate::overload::{arguments_exact, check_arguments, ArgumentList, FunctionGroup};
use crate::types::{DataType, FunctionType, Parameter};
use gale_syntax::Span;
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn takes_int() -> Rc<FunctionType> {
    Rc::new(FunctionType::new(
        vec![Parameter::new("n", DataType::int())],
        DataType::bool_type(),
        false,
    ))
}

fn takes_str() -> Rc<FunctionType> {
    Rc::new(FunctionType::new(
        vec![Parameter::new("s", DataType::str_type())],
        DataType::int(),
        false,
    ))
}

fn sample_group() -> Rc<FunctionGroup> {
    FunctionGroup::new("f", vec![takes_int(), takes_str()])
}

#[test]
fn test_selection_by_argument_type() {
    let group = sample_group();

    let int_call = ArgumentList::positional(vec![DataType::int()]);
    let chosen = group.get_function(&int_call, Span::default()).unwrap();
    assert_eq!(chosen.return_type.to_string(), "bool");

    let str_call = ArgumentList::positional(vec![DataType::str_type()]);
    let chosen = group.get_function(&str_call, Span::default()).unwrap();
    assert_eq!(chosen.return_type.to_string(), "int");
}

#[test]
fn test_no_matching_overload() {
    let group = sample_group();
    let call = ArgumentList::positional(vec![DataType::dict(
        DataType::int(),
        DataType::int(),
    )]);

    let failure = group.get_function(&call, Span::default());
    assert!(matches!(
        failure,
        Err(SemanticError::NoMatchingOverload { ref group, .. }) if group == "f"
    ));
}

#[test]
fn test_exact_match_breaks_coercion_ties() {
    // both overloads accept a short by widening; only int is exact for int
    let takes_long = Rc::new(FunctionType::new(
        vec![Parameter::new("n", DataType::long())],
        DataType::str_type(),
        false,
    ));
    let group = FunctionGroup::new("g", vec![takes_int(), takes_long]);

    let call = ArgumentList::positional(vec![DataType::int()]);
    let chosen = group.get_function(&call, Span::default()).unwrap();
    assert_eq!(chosen.return_type.to_string(), "bool");
}

#[test]
fn test_ambiguous_when_no_exact_winner() {
    let takes_long = Rc::new(FunctionType::new(
        vec![Parameter::new("n", DataType::long())],
        DataType::void(),
        false,
    ));
    let takes_double = Rc::new(FunctionType::new(
        vec![Parameter::new("n", DataType::double())],
        DataType::void(),
        false,
    ));
    let group = FunctionGroup::new("h", vec![takes_long, takes_double]);

    // an int widens into both and equals neither
    let call = ArgumentList::positional(vec![DataType::int()]);
    let failure = group.get_function(&call, Span::default());
    assert!(matches!(
        failure,
        Err(SemanticError::AmbiguousOverload { .. })
    ));
}

#[test]
fn test_duplicate_signature_rejected() {
    let group = sample_group();
    assert!(!group.add(takes_int()));
    assert_eq!(group.functions().len(), 2);
}

#[test]
fn test_named_arguments_fill_by_parameter_name() {
    let function = FunctionType::new(
        vec![
            Parameter::new("a", DataType::int()),
            Parameter::new("b", DataType::str_type()),
        ],
        DataType::void(),
        false,
    );

    let mut args = ArgumentList::positional(vec![DataType::int()]);
    args.named.insert("b".to_string(), DataType::str_type());
    assert!(check_arguments(&function, &args).is_ok());

    let mut unknown = ArgumentList::new();
    unknown.named.insert("c".to_string(), DataType::int());
    assert!(check_arguments(&function, &unknown).is_err());
}

#[test]
fn test_parameter_filled_twice_rejected() {
    let function = FunctionType::new(
        vec![Parameter::new("a", DataType::int())],
        DataType::void(),
        false,
    );

    let mut args = ArgumentList::positional(vec![DataType::int()]);
    args.named.insert("a".to_string(), DataType::int());
    assert!(check_arguments(&function, &args).is_err());
}

#[test]
fn test_missing_required_parameter() {
    let function = FunctionType::new(
        vec![
            Parameter::new("a", DataType::int()),
            Parameter::new("b", DataType::str_type()),
        ],
        DataType::void(),
        false,
    );

    let args = ArgumentList::positional(vec![DataType::int()]);
    let failure = check_arguments(&function, &args).unwrap_err();
    assert!(failure.message.contains("`b`"));
}

#[test]
fn test_optional_parameter_may_be_omitted() {
    let mut optional = Parameter::new("b", DataType::str_type());
    optional.optional = true;
    let function = FunctionType::new(
        vec![Parameter::new("a", DataType::int()), optional],
        DataType::void(),
        false,
    );

    let args = ArgumentList::positional(vec![DataType::int()]);
    assert!(check_arguments(&function, &args).is_ok());
}

#[test]
fn test_indefinite_parameter_absorbs_tail() {
    let mut rest = Parameter::new("rest", DataType::int());
    rest.indefinite = true;
    let function = FunctionType::new(
        vec![Parameter::new("first", DataType::str_type()), rest],
        DataType::void(),
        false,
    );

    let three = ArgumentList::positional(vec![
        DataType::str_type(),
        DataType::int(),
        DataType::int(),
        DataType::int(),
    ]);
    assert!(check_arguments(&function, &three).is_ok());

    // the indefinite tail may also be empty
    let none = ArgumentList::positional(vec![DataType::str_type()]);
    assert!(check_arguments(&function, &none).is_ok());

    // but absorbed arguments still type-check
    let wrong = ArgumentList::positional(vec![DataType::str_type(), DataType::str_type()]);
    assert!(check_arguments(&function, &wrong).is_err());
}

#[test]
fn test_excess_arguments_without_indefinite() {
    let function = FunctionType::new(
        vec![Parameter::new("a", DataType::int())],
        DataType::void(),
        false,
    );
    let args = ArgumentList::positional(vec![DataType::int(), DataType::int()]);
    assert!(check_arguments(&function, &args).is_err());
}

#[test]
fn test_exactness_distinguishes_widened_calls() {
    let function = FunctionType::new(
        vec![Parameter::new("n", DataType::long())],
        DataType::void(),
        false,
    );

    let widened = ArgumentList::positional(vec![DataType::int()]);
    assert!(check_arguments(&function, &widened).is_ok());
    assert!(!arguments_exact(&function, &widened));

    let exact = ArgumentList::positional(vec![DataType::long()]);
    assert!(arguments_exact(&function, &exact));
}
