//! Error types for the Gale semantic core
//!
//! Every resolution operation fails with exactly one positioned error value;
//! formatting and printing are external concerns.

use gale_syntax::Span;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Result alias used throughout the semantic core
pub type SemanticResult<T> = Result<T, SemanticError>;

/// The full semantic error taxonomy
#[derive(Error, Diagnostic, Debug)]
pub enum SemanticError {
    #[error("Duplicate symbol: `{name}` is already declared in this scope")]
    #[diagnostic(
        code(gale::semantic::duplicate_symbol),
        help("Rename the symbol or remove the earlier declaration")
    )]
    DuplicateSymbol {
        name: String,
        #[label("redeclared here")]
        span: SourceSpan,
    },

    #[error("Unresolved member: type `{type_name}` has no member `{member}`")]
    #[diagnostic(code(gale::semantic::unresolved_member))]
    UnresolvedMember {
        type_name: String,
        member: String,
        #[label("unknown member")]
        span: SourceSpan,
    },

    #[error("The `::` operator is not valid on type `{type_name}`")]
    #[diagnostic(
        code(gale::semantic::invalid_static_access),
        help("Static access applies only to packages and type classes")
    )]
    InvalidStaticAccess {
        type_name: String,
        #[label("invalid static access")]
        span: SourceSpan,
    },

    #[error("Tuple index {index} is out of range for a tuple of {arity} elements")]
    #[diagnostic(code(gale::semantic::tuple_index_out_of_range))]
    TupleIndexOutOfRange {
        index: usize,
        arity: usize,
        #[label("index out of range")]
        span: SourceSpan,
    },

    #[error("Unable to perform {operation} on type `{type_name}`")]
    #[diagnostic(
        code(gale::semantic::no_subscript_overload),
        help("Provide a matching `__[]__` or `__[:]__` overload for this type")
    )]
    NoSubscriptOverload {
        type_name: String,
        operation: String,
        #[label("no matching subscript overload")]
        span: SourceSpan,
    },

    #[error("Invalid index type `{found}` at position {position}: an integer type is required")]
    #[diagnostic(code(gale::semantic::invalid_index_type))]
    InvalidIndexType {
        found: String,
        position: usize,
        #[label("non-integer index")]
        span: SourceSpan,
    },

    #[error("Unable to call a value of type `{type_name}`")]
    #[diagnostic(code(gale::semantic::not_callable))]
    NotCallable {
        type_name: String,
        #[label("not callable")]
        span: SourceSpan,
    },

    #[error("No function in the group `{group}` matches the given arguments")]
    #[diagnostic(code(gale::semantic::no_matching_overload))]
    NoMatchingOverload {
        group: String,
        #[label("no matching overload")]
        span: SourceSpan,
    },

    #[error("Ambiguous call: multiple functions in the group `{group}` match the given arguments")]
    #[diagnostic(
        code(gale::semantic::ambiguous_overload),
        help("Annotate the arguments so exactly one overload matches")
    )]
    AmbiguousOverload {
        group: String,
        #[label("ambiguous call")]
        span: SourceSpan,
    },

    #[error("Unable to infer the generic arguments of `{generic}`")]
    #[diagnostic(
        code(gale::semantic::generic_inference_failure),
        help("Specify the generic arguments explicitly")
    )]
    GenericInferenceFailure {
        generic: String,
        #[label("inference failed")]
        span: SourceSpan,
    },

    #[error("Type `{binding}` does not satisfy the constraint `{constraint}` of variable `{variable}`")]
    #[diagnostic(code(gale::semantic::generic_constraint_violation))]
    GenericConstraintViolation {
        variable: String,
        binding: String,
        constraint: String,
        #[label("constraint not satisfied")]
        span: SourceSpan,
    },

    #[error("Generic `{generic}` expects {expected} arguments, found {found}")]
    #[diagnostic(code(gale::semantic::generic_arity))]
    GenericArityMismatch {
        generic: String,
        expected: usize,
        found: usize,
        #[label("wrong number of generic arguments")]
        span: SourceSpan,
    },

    #[error("Invalid element type `{type_name}` for heap allocation")]
    #[diagnostic(
        code(gale::semantic::unsupported_heap_type),
        help("Lists, dictionaries and functions cannot be heap-allocated directly")
    )]
    UnsupportedHeapType {
        type_name: String,
        #[label("unsupported heap type")]
        span: SourceSpan,
    },

    #[error("Inconsistent return type in function body")]
    #[diagnostic(
        code(gale::semantic::inconsistent_return_type),
        help("All return paths must agree on a single coercible return type")
    )]
    InconsistentReturnType {
        #[label("conflicting return")]
        span: SourceSpan,
    },

    #[error("Struct initializer mismatch: {reason}")]
    #[diagnostic(code(gale::semantic::struct_init_mismatch))]
    StructInitMismatch {
        reason: String,
        #[label("invalid initializer")]
        span: SourceSpan,
    },

    #[error("Type class construction error: {reason}")]
    #[diagnostic(code(gale::semantic::type_class_construction))]
    TypeClassConstructionError {
        reason: String,
        #[label("invalid construction")]
        span: SourceSpan,
    },

    #[error("Cyclic dependency between declarations: {cycle}")]
    #[diagnostic(
        code(gale::semantic::cyclic_dependency),
        help("Break the cycle with a pointer or reference indirection")
    )]
    CyclicDependency {
        cycle: String,
        #[label("part of a declaration cycle")]
        span: SourceSpan,
    },

    /// Catch-all for structural resolution failures with no dedicated kind
    #[error("{message}")]
    #[diagnostic(code(gale::semantic::resolution))]
    Resolution {
        message: String,
        #[label("here")]
        span: SourceSpan,
    },
}

impl SemanticError {
    /// Generic resolution failure with a position
    pub fn resolution(message: impl Into<String>, span: Span) -> Self {
        Self::Resolution {
            message: message.into(),
            span: span.into(),
        }
    }

    /// The source span the error is labeled with
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::DuplicateSymbol { span, .. }
            | Self::UnresolvedMember { span, .. }
            | Self::InvalidStaticAccess { span, .. }
            | Self::TupleIndexOutOfRange { span, .. }
            | Self::NoSubscriptOverload { span, .. }
            | Self::InvalidIndexType { span, .. }
            | Self::NotCallable { span, .. }
            | Self::NoMatchingOverload { span, .. }
            | Self::AmbiguousOverload { span, .. }
            | Self::GenericInferenceFailure { span, .. }
            | Self::GenericConstraintViolation { span, .. }
            | Self::GenericArityMismatch { span, .. }
            | Self::UnsupportedHeapType { span, .. }
            | Self::InconsistentReturnType { span, .. }
            | Self::StructInitMismatch { span, .. }
            | Self::TypeClassConstructionError { span, .. }
            | Self::CyclicDependency { span, .. }
            | Self::Resolution { span, .. } => *span,
        }
    }
}
