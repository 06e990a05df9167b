// Gale Syntax Contract
// Labeled syntax tree handed to the semantic core by the parser.

use miette::SourceSpan;

/// Source position information carried by every node and token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// End offset (exclusive)
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.start.into(), span.len)
    }
}

/// A lexed token leaf: kind tag, literal value, source span
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: String,
    pub value: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: impl Into<String>, value: impl Into<String>, span: Span) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            span,
        }
    }
}

/// A labeled composite node: production name plus ordered children
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub name: String,
    pub children: Vec<SyntaxNode>,
    pub span: Span,
}

impl AstNode {
    pub fn new(name: impl Into<String>, children: Vec<SyntaxNode>, span: Span) -> Self {
        Self {
            name: name.into(),
            children,
            span,
        }
    }

    /// Child at `index` as a composite node, if it is one
    pub fn composite(&self, index: usize) -> Option<&AstNode> {
        match self.children.get(index) {
            Some(SyntaxNode::Composite(node)) => Some(node),
            _ => None,
        }
    }

    /// Child at `index` as a token leaf, if it is one
    pub fn token(&self, index: usize) -> Option<&Token> {
        match self.children.get(index) {
            Some(SyntaxNode::Leaf(token)) => Some(token),
            _ => None,
        }
    }

    /// First composite child with the given production name
    pub fn find(&self, name: &str) -> Option<&AstNode> {
        self.children.iter().find_map(|child| match child {
            SyntaxNode::Composite(node) if node.name == name => Some(node),
            _ => None,
        })
    }

    /// All composite children with the given production name
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a AstNode> {
        self.children.iter().filter_map(move |child| match child {
            SyntaxNode::Composite(node) if node.name == name => Some(node),
            _ => None,
        })
    }
}

/// Either branch of the labeled tree
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    Composite(AstNode),
    Leaf(Token),
}

impl SyntaxNode {
    pub fn span(&self) -> Span {
        match self {
            SyntaxNode::Composite(node) => node.span,
            SyntaxNode::Leaf(token) => token.span,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SyntaxNode::Composite(node) => &node.name,
            SyntaxNode::Leaf(_) => "TOKEN",
        }
    }

    pub fn as_composite(&self) -> Option<&AstNode> {
        match self {
            SyntaxNode::Composite(node) => Some(node),
            SyntaxNode::Leaf(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            SyntaxNode::Composite(_) => None,
            SyntaxNode::Leaf(token) => Some(token),
        }
    }
}

/// Convenience constructors used by tests and by parser integration
pub fn node(name: impl Into<String>, children: Vec<SyntaxNode>) -> SyntaxNode {
    let span = children
        .first()
        .map(|first| {
            let start = first.span().start;
            let end = children.last().map(|last| last.span().end()).unwrap_or(start);
            Span::new(start, end.saturating_sub(start))
        })
        .unwrap_or_default();
    SyntaxNode::Composite(AstNode::new(name, children, span))
}

pub fn node_at(name: impl Into<String>, children: Vec<SyntaxNode>, span: Span) -> SyntaxNode {
    SyntaxNode::Composite(AstNode::new(name, children, span))
}

pub fn leaf(kind: impl Into<String>, value: impl Into<String>) -> SyntaxNode {
    SyntaxNode::Leaf(Token::new(kind, value, Span::default()))
}

pub fn leaf_at(kind: impl Into<String>, value: impl Into<String>, span: Span) -> SyntaxNode {
    SyntaxNode::Leaf(Token::new(kind, value, span))
}
