//! Function declarations, bodies, and return-type extraction

use super::Checker;
use crate::error::{SemanticError, SemanticResult};
use crate::overload::FunctionGroup;
use crate::symbols::Symbol;
use crate::typed_ast::{BlockKind, BlockNode, StatementNode, StmtKind, TypedNode};
use crate::types::{DataType, FunctionType, Parameter, TypeKind};
use gale_syntax::{AstNode, Span, SyntaxNode};
use std::rc::Rc;

impl Checker {
    /// `func name(args) [-> type] { ... }`, `async func ...`
    pub(crate) fn visit_function(&mut self, node: &AstNode) -> SemanticResult<()> {
        let name = self.declared_name(node)?;
        let span = node.span;
        let is_async = node.name == "async_func_decl";

        let parameters = self.resolve_parameters(node)?;
        let declared_return = node
            .find("type")
            .map(|annotation| self.child_type(annotation, 0))
            .transpose()?;

        let body_return = match node.find("block") {
            Some(block) => Some(self.check_body(
                &parameters,
                declared_return.as_ref(),
                block,
                is_async,
            )?),
            None => None,
        };

        let return_type = declared_return
            .or(body_return)
            .unwrap_or_else(DataType::void);
        let function = Rc::new(FunctionType::new(parameters, return_type, is_async));

        self.attach_function(&name, function, span)
    }

    /// Register a function, grouping same-named overloads
    fn attach_function(
        &mut self,
        name: &str,
        function: Rc<FunctionType>,
        span: Span,
    ) -> SemanticResult<()> {
        match self.ctx.table.lookup(name).map(|symbol| symbol.data_type) {
            Some(existing) => match &existing.kind {
                TypeKind::Function(previous) => {
                    let group = FunctionGroup::new(name, vec![Rc::clone(previous)]);
                    if !group.add(function) {
                        return Err(SemanticError::DuplicateSymbol {
                            name: name.to_string(),
                            span: span.into(),
                        });
                    }
                    self.ctx
                        .table
                        .patch_symbol_type(name, DataType::new(TypeKind::FunctionGroup(group)));
                    Ok(())
                }
                TypeKind::FunctionGroup(group) => {
                    if !group.add(function) {
                        return Err(SemanticError::DuplicateSymbol {
                            name: name.to_string(),
                            span: span.into(),
                        });
                    }
                    Ok(())
                }
                _ => Err(SemanticError::DuplicateSymbol {
                    name: name.to_string(),
                    span: span.into(),
                }),
            },
            None => self.declare(
                Symbol::new(name, DataType::new(TypeKind::Function(function))),
                span,
            ),
        }
    }

    /// Resolve the `args` child of a declaration into parameters. An
    /// indefinite parameter is only valid in the last position.
    pub(crate) fn resolve_parameters(&mut self, node: &AstNode) -> SemanticResult<Vec<Parameter>> {
        let Some(args) = node.find("args") else {
            return Ok(Vec::new());
        };

        let mut parameters: Vec<Parameter> = Vec::new();
        for param in args.find_all("param") {
            if parameters.last().is_some_and(|p| p.indefinite) {
                return Err(SemanticError::resolution(
                    "an indefinite parameter must be the last parameter",
                    param.span,
                ));
            }

            let param_name = self.identifier_of(param)?;
            let annotation = param
                .children
                .iter()
                .find_map(SyntaxNode::as_composite)
                .ok_or_else(|| {
                    SemanticError::resolution(
                        format!("parameter `{param_name}` is missing a type"),
                        param.span,
                    )
                })?;
            // a plain named type arrives wrapped in a `type` node
            let data_type = if annotation.name == "type" {
                self.child_type(annotation, 0)?
            } else {
                self.resolve_composite_type(annotation)?
            };

            let has_flag = |kind: &str| {
                param
                    .children
                    .iter()
                    .any(|child| matches!(child, SyntaxNode::Leaf(t) if t.kind == kind))
            };

            let mut parameter = Parameter::new(param_name, data_type);
            parameter.optional = has_flag("optional");
            parameter.indefinite = has_flag("...");
            parameter.constant = has_flag("const");
            parameters.push(parameter);
        }

        Ok(parameters)
    }

    /// Signature of an interface or bind method declaration
    pub(crate) fn method_signature(&mut self, method: &AstNode) -> SemanticResult<DataType> {
        let parameters = self.resolve_parameters(method)?;
        let return_type = method
            .find("type")
            .map(|annotation| self.child_type(annotation, 0))
            .transpose()?
            .unwrap_or_else(DataType::void);
        let is_async = method
            .children
            .iter()
            .any(|child| matches!(child, SyntaxNode::Leaf(t) if t.kind == "async"));
        Ok(DataType::function(FunctionType::new(
            parameters,
            return_type,
            is_async,
        )))
    }

    /// Check a function body in its own scope and extract the return type
    /// every return path agrees on
    fn check_body(
        &mut self,
        parameters: &[Parameter],
        declared_return: Option<&DataType>,
        block: &AstNode,
        is_async: bool,
    ) -> SemanticResult<DataType> {
        self.ctx.table.descend_scope();

        for parameter in parameters {
            // an indefinite parameter arrives boxed as a list of its element type
            let param_type = if parameter.indefinite {
                DataType::list(parameter.data_type.clone())
            } else if parameter.constant {
                parameter.data_type.const_copy()
            } else {
                parameter.data_type.clone()
            };
            self.ctx
                .table
                .add_symbol(Symbol::new(&parameter.name, param_type));
        }

        let kind = if is_async {
            BlockKind::AsyncFunction
        } else {
            BlockKind::Function
        };
        self.ctx.stack.push(TypedNode::Block(BlockNode::new(kind)));

        let mut returns = Vec::new();
        let walked = self.visit_block(block, &mut returns);
        self.ctx.table.ascend_scope();
        walked?;

        self.ctx.stack.merge_to_block()?;

        self.extract_return_type(declared_return, &returns)
    }

    pub(crate) fn visit_block(
        &mut self,
        block: &AstNode,
        returns: &mut Vec<(DataType, Span)>,
    ) -> SemanticResult<()> {
        for child in &block.children {
            let Some(statement) = child.as_composite() else {
                continue;
            };
            self.visit_statement(statement, returns)?;
        }
        Ok(())
    }

    fn visit_statement(
        &mut self,
        statement: &AstNode,
        returns: &mut Vec<(DataType, Span)>,
    ) -> SemanticResult<()> {
        match statement.name.as_str() {
            "return_stmt" => {
                let returned = match statement.composite(0) {
                    Some(expr) => {
                        self.visit_expr(expr)?;
                        let data_type = self.ctx.stack.last_type();
                        self.ctx
                            .stack
                            .push(TypedNode::Statement(StatementNode::new(StmtKind::Return)));
                        self.ctx.stack.push_forward(1)?;
                        data_type
                    }
                    None => {
                        self.ctx
                            .stack
                            .push(TypedNode::Statement(StatementNode::new(StmtKind::Return)));
                        DataType::void()
                    }
                };
                self.ctx.stack.merge_to_block()?;
                returns.push((returned, statement.span));
                Ok(())
            }
            "yield_stmt" => {
                let expr = statement.composite(0).ok_or_else(|| {
                    SemanticError::resolution("yield requires an expression", statement.span)
                })?;
                self.visit_expr(expr)?;
                let data_type = self.ctx.stack.last_type();
                self.ctx.stack.push(TypedNode::Statement(StatementNode::new(
                    StmtKind::ExpressionReturn,
                )));
                self.ctx.stack.push_forward(1)?;
                self.ctx.stack.merge_to_block()?;
                returns.push((data_type, statement.span));
                Ok(())
            }
            "variable_decl" => self.visit_declaration(statement),
            "block" => {
                self.ctx.table.descend_scope();
                self.ctx
                    .stack
                    .push(TypedNode::Block(BlockNode::new(BlockKind::Block)));
                let walked = self.visit_block(statement, returns);
                self.ctx.table.ascend_scope();
                walked?;
                self.ctx.stack.merge_to_block()?;
                Ok(())
            }
            _ => {
                self.visit_expr(statement)?;
                self.ctx
                    .stack
                    .push(TypedNode::Statement(StatementNode::new(StmtKind::Expression)));
                self.ctx.stack.push_forward(1)?;
                self.ctx.stack.merge_to_block()?;
                Ok(())
            }
        }
    }

    /// All return paths must agree on a single coercible type; the dominant
    /// type is the one every other return coerces into
    fn extract_return_type(
        &self,
        declared: Option<&DataType>,
        returns: &[(DataType, Span)],
    ) -> SemanticResult<DataType> {
        if let Some(declared) = declared {
            for (returned, return_span) in returns {
                if !declared.coerce(returned) {
                    return Err(SemanticError::InconsistentReturnType {
                        span: (*return_span).into(),
                    });
                }
            }
            return Ok(declared.clone());
        }

        let mut dominant: Option<DataType> = None;
        for (returned, return_span) in returns {
            dominant = match dominant {
                None => Some(returned.clone()),
                Some(current) => {
                    if current.coerce(returned) {
                        Some(current)
                    } else if returned.coerce(&current) {
                        Some(returned.clone())
                    } else {
                        return Err(SemanticError::InconsistentReturnType {
                            span: (*return_span).into(),
                        });
                    }
                }
            };
        }

        Ok(dominant.unwrap_or_else(DataType::void))
    }
}
