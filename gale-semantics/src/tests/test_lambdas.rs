//! Deferred lambda arguments and the call-context back-patching that
//! resolves them in place on the node stack

use crate::checker::Checker;
use crate::error::SemanticError;
use crate::overload::ArgumentList;
use crate::typed_ast::{ExprKind, IncompleteNode, TypedNode};
use crate::types::{DataType, FunctionType, Parameter, TypeKind};
use gale_syntax::{leaf, node, AstNode, Span, SyntaxNode};
use pretty_assertions::assert_eq;

fn identity_lambda() -> AstNode {
    let tree = node(
        "lambda",
        vec![
            node("args", vec![node("param", vec![leaf("IDENTIFIER", "n")])]),
            node("atom", vec![leaf("IDENTIFIER", "n")]),
        ],
    );
    match tree {
        SyntaxNode::Composite(lambda) => lambda,
        SyntaxNode::Leaf(_) => unreachable!(),
    }
}

/// `func apply(callback: (int) -> int) -> int`
fn taking_callback() -> DataType {
    let callback = DataType::function(FunctionType::new(
        vec![Parameter::new("value", DataType::int())],
        DataType::int(),
        false,
    ));
    DataType::function(FunctionType::new(
        vec![Parameter::new("callback", callback)],
        DataType::int(),
        false,
    ))
}

fn deferred(checker: &mut Checker) {
    checker.ctx.stack.push(TypedNode::Incomplete(IncompleteNode {
        node: identity_lambda(),
    }));
}

#[test]
fn test_positional_lambda_receives_context() {
    let mut checker = Checker::new();
    deferred(&mut checker);
    let mut args = ArgumentList::positional(vec![DataType::incomplete()]);

    let resolved = checker
        .call(&taking_callback(), &mut args, 1, Span::default())
        .unwrap();

    assert_eq!(resolved.kind, ExprKind::Call);
    assert_eq!(resolved.data_type.to_string(), "int");
    assert!(matches!(args.unnamed[0].kind, TypeKind::Function(_)));
    match checker.ctx.stack.peek(0) {
        Some(TypedNode::Expr(expr)) => assert_eq!(expr.kind, ExprKind::Lambda),
        other => panic!("expected the lambda slot to be resolved, got {other:?}"),
    }
}

#[test]
fn test_named_lambda_receives_context() {
    let mut checker = Checker::new();
    deferred(&mut checker);
    let mut args = ArgumentList::new();
    args.named
        .insert("callback".to_string(), DataType::incomplete());

    let resolved = checker
        .call(&taking_callback(), &mut args, 1, Span::default())
        .unwrap();

    assert_eq!(resolved.kind, ExprKind::Call);
    assert_eq!(resolved.data_type.to_string(), "int");
    assert!(matches!(args.named["callback"].kind, TypeKind::Function(_)));
    // no Incomplete node may survive resolution
    match checker.ctx.stack.peek(0) {
        Some(TypedNode::Expr(expr)) => assert_eq!(expr.kind, ExprKind::Lambda),
        other => panic!("expected the lambda slot to be resolved, got {other:?}"),
    }
}

#[test]
fn test_deferred_named_argument_without_parameter_is_rejected() {
    let mut checker = Checker::new();
    deferred(&mut checker);
    let function = DataType::function(FunctionType::new(vec![], DataType::int(), false));
    let mut args = ArgumentList::new();
    args.named
        .insert("callback".to_string(), DataType::incomplete());

    let failure = checker.call(&function, &mut args, 1, Span::default());
    assert!(matches!(failure, Err(SemanticError::Resolution { .. })));
}

#[test]
fn test_deferred_argument_needs_a_function_parameter() {
    let mut checker = Checker::new();
    deferred(&mut checker);
    let function = DataType::function(FunctionType::new(
        vec![Parameter::new("callback", DataType::int())],
        DataType::int(),
        false,
    ));
    let mut args = ArgumentList::new();
    args.named
        .insert("callback".to_string(), DataType::incomplete());

    let failure = checker.call(&function, &mut args, 1, Span::default());
    assert!(matches!(failure, Err(SemanticError::Resolution { .. })));
}
