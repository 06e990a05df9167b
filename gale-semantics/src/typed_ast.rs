//! The fully typed program tree and the node stack that builds it
//!
//! Resolution is a stack-based tree rewrite: visiting a production pushes
//! resolved sub-results onto a shared stack, and the parent production
//! consumes exactly the nodes it produced: `push_forward` absorbs them into
//! the node just pushed, `merge_back` attaches them to the node beneath.

use crate::error::{SemanticError, SemanticResult};
use crate::interfaces::MethodDispatch;
use crate::types::{DataType, FunctionType};
use gale_syntax::AstNode;
use std::rc::Rc;

/// Resolved expression production kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    GetMember,
    DerefGetMember,
    NullableDerefGetMember,
    GetTupleMember,
    StaticGet,
    Subscript,
    SliceBegin,
    SliceEnd,
    Slice,
    SliceBeginStep,
    SliceEndStep,
    SliceStep,
    SlicePureStep,
    SliceCopy,
    Call,
    CallAsync,
    CallConstructor,
    CallFunctionOverload,
    CallGenericOverload,
    CreateGeneric,
    InitList,
    Initializer,
    MemberInitializer,
    InitTypeClassVariant,
    ExtractValue,
    Await,
    HeapAllocSize,
    HeapAllocType,
    HeapAllocStruct,
    Lambda,
}

/// Literal and signature value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Literal,
    Type,
    ConstructorSignature,
    IntegerMember,
}

/// Declaration/region block kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Program,
    Struct,
    Constructor,
    Function,
    AsyncFunction,
    Interface,
    InterfaceBind,
    TypeClass,
    Block,
}

/// Statement production kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtKind {
    Return,
    ExpressionReturn,
    VariableDecl,
    Expression,
}

/// A resolved expression node: production kind, result type, consumed
/// children, and (for call and member nodes) the dispatch target the code
/// generator needs
#[derive(Debug, Clone)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub data_type: DataType,
    pub nodes: Vec<TypedNode>,
    pub dispatch: Option<MethodDispatch>,
    /// Concrete callee of a call/constructor node
    pub target: Option<Rc<FunctionType>>,
}

impl ExprNode {
    pub fn new(kind: ExprKind, data_type: DataType) -> Self {
        Self {
            kind,
            data_type,
            nodes: Vec::new(),
            dispatch: None,
            target: None,
        }
    }

    pub fn with_dispatch(kind: ExprKind, data_type: DataType, dispatch: MethodDispatch) -> Self {
        Self {
            dispatch: Some(dispatch),
            ..Self::new(kind, data_type)
        }
    }

    pub fn with_target(mut self, target: Rc<FunctionType>) -> Self {
        self.target = Some(target);
        self
    }
}

/// A literal or signature value
#[derive(Debug, Clone)]
pub struct ValueNode {
    pub kind: ValueKind,
    pub data_type: DataType,
    pub value: String,
}

/// A resolved identifier reference
#[derive(Debug, Clone)]
pub struct IdentifierNode {
    pub name: String,
    pub data_type: DataType,
    /// Literal value when the symbol is a compile-time constant
    pub constexpr_value: Option<String>,
}

impl IdentifierNode {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            constexpr_value: None,
        }
    }
}

/// A deferred sub-expression (an untyped lambda literal) typed `Incomplete`
/// until call context arrives
#[derive(Debug, Clone)]
pub struct IncompleteNode {
    pub node: AstNode,
}

/// A declaration or lexical block
#[derive(Debug, Clone)]
pub struct BlockNode {
    pub kind: BlockKind,
    pub nodes: Vec<TypedNode>,
}

impl BlockNode {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
        }
    }
}

/// A resolved statement
#[derive(Debug, Clone)]
pub struct StatementNode {
    pub kind: StmtKind,
    pub nodes: Vec<TypedNode>,
}

impl StatementNode {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
        }
    }
}

/// Any node of the typed program tree
#[derive(Debug, Clone)]
pub enum TypedNode {
    Expr(ExprNode),
    Value(ValueNode),
    Identifier(IdentifierNode),
    Incomplete(IncompleteNode),
    Block(BlockNode),
    Statement(StatementNode),
}

impl TypedNode {
    /// The resolved type this node exposes to its consumers
    pub fn data_type(&self) -> DataType {
        match self {
            TypedNode::Expr(node) => node.data_type.clone(),
            TypedNode::Value(node) => node.data_type.clone(),
            TypedNode::Identifier(node) => node.data_type.clone(),
            TypedNode::Incomplete(_) => DataType::incomplete(),
            TypedNode::Block(_) | TypedNode::Statement(_) => DataType::void(),
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<TypedNode>> {
        match self {
            TypedNode::Expr(node) => Some(&mut node.nodes),
            TypedNode::Block(node) => Some(&mut node.nodes),
            TypedNode::Statement(node) => Some(&mut node.nodes),
            TypedNode::Value(_) | TypedNode::Identifier(_) | TypedNode::Incomplete(_) => None,
        }
    }

    pub fn as_expr(&self) -> Option<&ExprNode> {
        match self {
            TypedNode::Expr(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockNode> {
        match self {
            TypedNode::Block(node) => Some(node),
            _ => None,
        }
    }
}

fn imbalance(context: &str) -> SemanticError {
    SemanticError::resolution(
        format!("node stack imbalance during {context}"),
        gale_syntax::Span::default(),
    )
}

/// The shared resolution stack
#[derive(Debug, Default)]
pub struct NodeStack {
    nodes: Vec<TypedNode>,
}

impl NodeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, node: TypedNode) {
        self.nodes.push(node);
    }

    pub fn pop(&mut self) -> Option<TypedNode> {
        self.nodes.pop()
    }

    pub fn last(&self) -> Option<&TypedNode> {
        self.nodes.last()
    }

    /// Type of the top node; `Void` on an empty stack
    pub fn last_type(&self) -> DataType {
        self.last().map(TypedNode::data_type).unwrap_or_else(DataType::void)
    }

    /// Node at `offset` positions below the top
    pub fn peek(&self, offset: usize) -> Option<&TypedNode> {
        let len = self.nodes.len();
        if offset < len {
            self.nodes.get(len - 1 - offset)
        } else {
            None
        }
    }

    /// Replace the node at `offset` positions below the top, used to splice
    /// a deferred node's resolution into the slot it originally occupied
    pub fn replace(&mut self, offset: usize, node: TypedNode) -> SemanticResult<()> {
        let len = self.nodes.len();
        if offset >= len {
            return Err(imbalance("context back-patch"));
        }
        self.nodes[len - 1 - offset] = node;
        Ok(())
    }

    /// The node just pushed absorbs the `count` nodes beneath it, preserving
    /// their original order
    pub fn push_forward(&mut self, count: usize) -> SemanticResult<()> {
        if self.nodes.len() < count + 1 {
            return Err(imbalance("push forward"));
        }
        let mut top = self.nodes.pop().ok_or_else(|| imbalance("push forward"))?;
        let split = self.nodes.len() - count;
        let taken = self.nodes.split_off(split);
        top.children_mut()
            .ok_or_else(|| imbalance("push forward"))?
            .extend(taken);
        self.nodes.push(top);
        Ok(())
    }

    /// The top `count` nodes become trailing children of the node beneath
    /// them
    pub fn merge_back(&mut self, count: usize) -> SemanticResult<()> {
        if self.nodes.len() < count + 1 {
            return Err(imbalance("merge back"));
        }
        let split = self.nodes.len() - count;
        let taken = self.nodes.split_off(split);
        self.nodes
            .last_mut()
            .and_then(TypedNode::children_mut)
            .ok_or_else(|| imbalance("merge back"))?
            .extend(taken);
        Ok(())
    }

    /// Pop the top node into the nearest enclosing block beneath it
    pub fn merge_to_block(&mut self) -> SemanticResult<()> {
        let node = self.nodes.pop().ok_or_else(|| imbalance("merge to block"))?;
        let block = self
            .nodes
            .iter_mut()
            .rev()
            .find(|candidate| matches!(candidate, TypedNode::Block(_)))
            .ok_or_else(|| imbalance("merge to block"))?;
        match block {
            TypedNode::Block(block) => block.nodes.push(node),
            _ => return Err(imbalance("merge to block")),
        }
        Ok(())
    }

    /// Insert a node as the *first* child of the top node (used to put the
    /// callee in front of already-captured arguments)
    pub fn prepend_child(&mut self, node: TypedNode) -> SemanticResult<()> {
        self.nodes
            .last_mut()
            .and_then(TypedNode::children_mut)
            .ok_or_else(|| imbalance("prepend child"))?
            .insert(0, node);
        Ok(())
    }

    /// Remove the node directly beneath the top (the "redundant root" move
    /// of the shift-reduce rewrite)
    pub fn remove_below_top(&mut self) -> SemanticResult<TypedNode> {
        let len = self.nodes.len();
        if len < 2 {
            return Err(imbalance("remove below top"));
        }
        Ok(self.nodes.remove(len - 2))
    }
}
