//! End-to-end resolution of whole programs through `analyze_program`

use crate::error::SemanticError;
use crate::interfaces::{resolve_method, MethodDispatch};
use crate::typed_ast::BlockKind;
use crate::types::TypeKind;
use crate::{analyze_program, DataType};
use gale_syntax::{leaf, node, AstNode, SyntaxNode};
use pretty_assertions::assert_eq;

fn program(declarations: Vec<SyntaxNode>) -> AstNode {
    match node("program", declarations) {
        SyntaxNode::Composite(root) => root,
        SyntaxNode::Leaf(_) => unreachable!(),
    }
}

fn member(name: &str, annotation: SyntaxNode) -> SyntaxNode {
    node("member", vec![leaf("IDENTIFIER", name), annotation])
}

fn type_node(name: &str) -> SyntaxNode {
    node("type", vec![leaf("IDENTIFIER", name)])
}

#[test]
fn test_whole_program_resolves() {
    let root = program(vec![
        node(
            "struct_decl",
            vec![
                leaf("IDENTIFIER", "Point"),
                member("x", leaf("IDENTIFIER", "int")),
                member("y", leaf("IDENTIFIER", "int")),
            ],
        ),
        node(
            "func_decl",
            vec![
                leaf("IDENTIFIER", "scale"),
                node(
                    "args",
                    vec![node(
                        "param",
                        vec![leaf("IDENTIFIER", "n"), type_node("int")],
                    )],
                ),
                type_node("int"),
                node(
                    "block",
                    vec![node(
                        "return_stmt",
                        vec![node("atom", vec![leaf("IDENTIFIER", "n")])],
                    )],
                ),
            ],
        ),
        node(
            "variable_decl",
            vec![
                leaf("IDENTIFIER", "limit"),
                type_node("int"),
                node(
                    "initializer",
                    vec![node("atom", vec![leaf("INTEGER_LIT", "42")])],
                ),
            ],
        ),
    ]);

    let analyzed = analyze_program(&root).unwrap();

    assert_eq!(analyzed.root.kind, BlockKind::Program);
    assert_eq!(analyzed.root.nodes.len(), 3);

    assert!(matches!(
        analyzed.globals["Point"].data_type.kind,
        TypeKind::Struct(_)
    ));
    match &analyzed.globals["scale"].data_type.kind {
        TypeKind::Function(function) => {
            assert_eq!(function.parameters.len(), 1);
            assert_eq!(function.return_type.to_string(), "int");
        }
        other => panic!("expected a function, got {other:?}"),
    }
    assert_eq!(analyzed.globals["limit"].data_type.to_string(), "int");
}

#[test]
fn test_declarations_resolve_out_of_textual_order() {
    // Wrapper references Inner before Inner is declared
    let root = program(vec![
        node(
            "struct_decl",
            vec![
                leaf("IDENTIFIER", "Wrapper"),
                member("value", leaf("IDENTIFIER", "Inner")),
            ],
        ),
        node(
            "struct_decl",
            vec![
                leaf("IDENTIFIER", "Inner"),
                member("n", leaf("IDENTIFIER", "int")),
            ],
        ),
    ]);

    let analyzed = analyze_program(&root).unwrap();
    match &analyzed.globals["Wrapper"].data_type.kind {
        TypeKind::Struct(st) => {
            assert_eq!(st.member_type("value").unwrap().to_string(), "Inner");
        }
        other => panic!("expected a struct, got {other:?}"),
    }
}

#[test]
fn test_mutual_by_value_cycle_is_rejected() {
    let root = program(vec![
        node(
            "struct_decl",
            vec![leaf("IDENTIFIER", "A"), member("b", leaf("IDENTIFIER", "B"))],
        ),
        node(
            "struct_decl",
            vec![leaf("IDENTIFIER", "B"), member("a", leaf("IDENTIFIER", "A"))],
        ),
    ]);

    let failure = analyze_program(&root);
    assert!(matches!(
        failure,
        Err(SemanticError::CyclicDependency { ref cycle, .. })
            if cycle.contains('A') && cycle.contains('B')
    ));
}

#[test]
fn test_self_referential_struct_by_value_is_rejected() {
    let root = program(vec![node(
        "struct_decl",
        vec![
            leaf("IDENTIFIER", "Node"),
            member("next", leaf("IDENTIFIER", "Node")),
        ],
    )]);

    let failure = analyze_program(&root);
    assert!(matches!(
        failure,
        Err(SemanticError::CyclicDependency { .. })
    ));
}

#[test]
fn test_pointer_indirection_breaks_the_cycle() {
    let root = program(vec![node(
        "struct_decl",
        vec![
            leaf("IDENTIFIER", "Node"),
            member(
                "next",
                node(
                    "pointer_type",
                    vec![leaf("*", "*"), leaf("IDENTIFIER", "Node")],
                ),
            ),
        ],
    )]);

    let analyzed = analyze_program(&root).unwrap();
    match &analyzed.globals["Node"].data_type.kind {
        TypeKind::Struct(st) => {
            let next = st.member_type("next").unwrap();
            assert!(matches!(next.kind, TypeKind::Pointer { depth: 1, .. }));
            assert_eq!(next.to_string(), "*Node");
        }
        other => panic!("expected a struct, got {other:?}"),
    }
}

#[test]
fn test_interface_bind_produces_a_method_table() {
    let root = program(vec![
        node(
            "interface_decl",
            vec![
                leaf("IDENTIFIER", "Shape"),
                node(
                    "method",
                    vec![leaf("IDENTIFIER", "area"), type_node("int")],
                ),
            ],
        ),
        node(
            "interface_bind",
            vec![
                leaf("IDENTIFIER", "Shape"),
                leaf("IDENTIFIER", "int"),
                node(
                    "method",
                    vec![
                        leaf("IDENTIFIER", "area"),
                        type_node("int"),
                        node("block", vec![]),
                    ],
                ),
            ],
        ),
    ]);

    let analyzed = analyze_program(&root).unwrap();

    let tables = analyzed.context.method_tables();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].binder, "int");
    assert_eq!(tables[0].slots.len(), 1);
    assert_eq!(tables[0].slots[0].name, "area");
    assert!(tables[0].slots[0].overridden);

    // the binder now answers `area` statically
    let mut context = analyzed.context;
    match resolve_method(&DataType::int(), "area", &mut context.registry) {
        Some(MethodDispatch::Static { symbol }) => assert_eq!(symbol.name, "area"),
        other => panic!("expected static dispatch, got {other:?}"),
    }
}

#[test]
fn test_generic_struct_instantiated_from_a_type_annotation() {
    let root = program(vec![
        node(
            "generic_decl",
            vec![
                node("generic_var", vec![leaf("IDENTIFIER", "T")]),
                node(
                    "struct_decl",
                    vec![
                        leaf("IDENTIFIER", "Box"),
                        member("value", leaf("IDENTIFIER", "T")),
                    ],
                ),
            ],
        ),
        node(
            "variable_decl",
            vec![
                leaf("IDENTIFIER", "boxed"),
                node(
                    "type",
                    vec![node(
                        "generic_spec",
                        vec![leaf("IDENTIFIER", "Box"), leaf("IDENTIFIER", "int")],
                    )],
                ),
            ],
        ),
    ]);

    let analyzed = analyze_program(&root).unwrap();

    match &analyzed.globals["Box"].data_type.kind {
        TypeKind::Generic(generic) => assert_eq!(generic.generates().len(), 1),
        other => panic!("expected a generic template, got {other:?}"),
    }
    match &analyzed.globals["boxed"].data_type.kind {
        TypeKind::Struct(st) => {
            assert_eq!(st.member_type("value").unwrap().to_string(), "int");
        }
        other => panic!("expected an instantiated struct, got {other:?}"),
    }
}

#[test]
fn test_same_named_functions_group_into_overloads() {
    let root = program(vec![
        node(
            "func_decl",
            vec![
                leaf("IDENTIFIER", "describe"),
                node(
                    "args",
                    vec![node(
                        "param",
                        vec![leaf("IDENTIFIER", "n"), type_node("int")],
                    )],
                ),
                type_node("str"),
            ],
        ),
        node(
            "func_decl",
            vec![
                leaf("IDENTIFIER", "describe"),
                node(
                    "args",
                    vec![node(
                        "param",
                        vec![leaf("IDENTIFIER", "s"), type_node("str")],
                    )],
                ),
                type_node("str"),
            ],
        ),
    ]);

    let analyzed = analyze_program(&root).unwrap();
    match &analyzed.globals["describe"].data_type.kind {
        TypeKind::FunctionGroup(group) => assert_eq!(group.functions().len(), 2),
        other => panic!("expected a function group, got {other:?}"),
    }
}

#[test]
fn test_duplicate_type_name_is_rejected() {
    let root = program(vec![
        node(
            "struct_decl",
            vec![leaf("IDENTIFIER", "S"), member("a", leaf("IDENTIFIER", "int"))],
        ),
        node(
            "struct_decl",
            vec![leaf("IDENTIFIER", "S"), member("b", leaf("IDENTIFIER", "int"))],
        ),
    ]);

    let failure = analyze_program(&root);
    assert!(matches!(
        failure,
        Err(SemanticError::DuplicateSymbol { ref name, .. }) if name == "S"
    ));
}

#[test]
fn test_conflicting_bind_methods_are_rejected() {
    fn declared_interface(name: &str) -> SyntaxNode {
        node(
            "interface_decl",
            vec![
                leaf("IDENTIFIER", name),
                node(
                    "method",
                    vec![leaf("IDENTIFIER", "area"), type_node("int")],
                ),
            ],
        )
    }
    fn bind(name: &str) -> SyntaxNode {
        node(
            "interface_bind",
            vec![
                leaf("IDENTIFIER", name),
                leaf("IDENTIFIER", "int"),
                node(
                    "method",
                    vec![
                        leaf("IDENTIFIER", "area"),
                        type_node("int"),
                        node("block", vec![]),
                    ],
                ),
            ],
        )
    }

    // two interfaces claiming `area` on the same binder
    let root = program(vec![
        declared_interface("Shape"),
        declared_interface("Figure"),
        bind("Shape"),
        bind("Figure"),
    ]);

    let failure = analyze_program(&root);
    assert!(matches!(
        failure,
        Err(SemanticError::DuplicateSymbol { ref name, .. }) if name == "area"
    ));
}

#[test]
fn test_return_type_mismatch_is_rejected() {
    let root = program(vec![node(
        "func_decl",
        vec![
            leaf("IDENTIFIER", "bad"),
            type_node("int"),
            node(
                "block",
                vec![node(
                    "return_stmt",
                    vec![node("atom", vec![leaf("STRING_LIT", "\"answer\"")])],
                )],
            ),
        ],
    )]);

    let failure = analyze_program(&root);
    assert!(matches!(
        failure,
        Err(SemanticError::InconsistentReturnType { .. })
    ));
}

#[test]
fn test_undefined_member_type_is_reported() {
    let root = program(vec![node(
        "struct_decl",
        vec![
            leaf("IDENTIFIER", "Broken"),
            member("value", leaf("IDENTIFIER", "Missing")),
        ],
    )]);

    let failure = analyze_program(&root);
    assert!(matches!(failure, Err(SemanticError::Resolution { .. })));
}
