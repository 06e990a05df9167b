//! Shift-reduce discipline of the node stack

use crate::typed_ast::{
    BlockKind, BlockNode, ExprKind, ExprNode, NodeStack, StmtKind, StatementNode, TypedNode,
    ValueKind, ValueNode,
};
use crate::types::DataType;
use pretty_assertions::assert_eq;

fn literal(value: &str) -> TypedNode {
    TypedNode::Value(ValueNode {
        kind: ValueKind::Literal,
        data_type: DataType::int(),
        value: value.to_string(),
    })
}

fn literal_value(node: &TypedNode) -> &str {
    match node {
        TypedNode::Value(value) => &value.value,
        other => panic!("expected a literal, got {other:?}"),
    }
}

#[test]
fn test_push_forward_preserves_order() {
    let mut stack = NodeStack::new();
    stack.push(literal("a"));
    stack.push(literal("b"));
    stack.push(TypedNode::Expr(ExprNode::new(
        ExprKind::Call,
        DataType::int(),
    )));

    stack.push_forward(2).unwrap();
    assert_eq!(stack.len(), 1);

    let top = stack.last().unwrap().as_expr().unwrap();
    assert_eq!(literal_value(&top.nodes[0]), "a");
    assert_eq!(literal_value(&top.nodes[1]), "b");
}

#[test]
fn test_push_forward_imbalance() {
    let mut stack = NodeStack::new();
    stack.push(literal("a"));
    stack.push(TypedNode::Expr(ExprNode::new(
        ExprKind::Call,
        DataType::int(),
    )));
    assert!(stack.push_forward(2).is_err());
}

#[test]
fn test_push_forward_needs_a_composite_top() {
    let mut stack = NodeStack::new();
    stack.push(literal("a"));
    stack.push(literal("b"));
    // a value node has no child list to absorb into
    assert!(stack.push_forward(1).is_err());
}

#[test]
fn test_merge_back_attaches_to_the_node_beneath() {
    let mut stack = NodeStack::new();
    stack.push(TypedNode::Statement(StatementNode::new(StmtKind::Return)));
    stack.push(literal("a"));
    stack.push(literal("b"));

    stack.merge_back(2).unwrap();
    assert_eq!(stack.len(), 1);

    match stack.last().unwrap() {
        TypedNode::Statement(statement) => {
            assert_eq!(statement.nodes.len(), 2);
            assert_eq!(literal_value(&statement.nodes[0]), "a");
            assert_eq!(literal_value(&statement.nodes[1]), "b");
        }
        other => panic!("expected a statement, got {other:?}"),
    }
}

#[test]
fn test_merge_back_imbalance() {
    let mut stack = NodeStack::new();
    stack.push(literal("a"));
    assert!(stack.merge_back(1).is_err());
}

#[test]
fn test_merge_to_block_skips_intervening_nodes() {
    let mut stack = NodeStack::new();
    stack.push(TypedNode::Block(BlockNode::new(BlockKind::Function)));
    stack.push(literal("pending"));
    stack.push(TypedNode::Statement(StatementNode::new(
        StmtKind::Expression,
    )));

    stack.merge_to_block().unwrap();
    assert_eq!(stack.len(), 2);

    match stack.peek(1).unwrap() {
        TypedNode::Block(block) => {
            assert_eq!(block.nodes.len(), 1);
            assert!(matches!(block.nodes[0], TypedNode::Statement(_)));
        }
        other => panic!("expected the function block, got {other:?}"),
    }
}

#[test]
fn test_merge_to_block_without_a_block_fails() {
    let mut stack = NodeStack::new();
    stack.push(literal("a"));
    assert!(stack.merge_to_block().is_err());
}

#[test]
fn test_replace_splices_in_place() {
    let mut stack = NodeStack::new();
    stack.push(literal("a"));
    stack.push(literal("b"));
    stack.push(literal("c"));

    stack.replace(1, literal("patched")).unwrap();
    assert_eq!(literal_value(stack.peek(1).unwrap()), "patched");
    assert_eq!(literal_value(stack.peek(0).unwrap()), "c");
    assert_eq!(literal_value(stack.peek(2).unwrap()), "a");

    assert!(stack.replace(3, literal("out of range")).is_err());
}

#[test]
fn test_peek_and_last_type() {
    let mut stack = NodeStack::new();
    assert_eq!(stack.last_type().to_string(), "void");

    stack.push(literal("a"));
    stack.push(TypedNode::Expr(ExprNode::new(
        ExprKind::Subscript,
        DataType::str_type(),
    )));

    assert_eq!(stack.last_type().to_string(), "str");
    assert_eq!(literal_value(stack.peek(1).unwrap()), "a");
    assert!(stack.peek(2).is_none());
}

#[test]
fn test_prepend_child_puts_the_callee_first() {
    let mut stack = NodeStack::new();
    let mut call = ExprNode::new(ExprKind::Call, DataType::int());
    call.nodes.push(literal("arg"));
    stack.push(TypedNode::Expr(call));

    stack.prepend_child(literal("callee")).unwrap();
    let top = stack.last().unwrap().as_expr().unwrap();
    assert_eq!(literal_value(&top.nodes[0]), "callee");
    assert_eq!(literal_value(&top.nodes[1]), "arg");
}

#[test]
fn test_remove_below_top() {
    let mut stack = NodeStack::new();
    stack.push(literal("redundant"));
    stack.push(literal("kept"));

    let removed = stack.remove_below_top().unwrap();
    assert_eq!(literal_value(&removed), "redundant");
    assert_eq!(stack.len(), 1);
    assert_eq!(literal_value(stack.last().unwrap()), "kept");

    assert!(stack.remove_below_top().is_err());
}
