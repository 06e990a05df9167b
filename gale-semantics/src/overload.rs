//! Argument matching and overload resolution
//!
//! `check_arguments` is the single matching algebra used for plain calls,
//! constructor selection, and overload filtering: positional arguments match
//! by position and coercibility, named arguments by parameter name with the
//! remaining positions filled positionally, optional parameters may be
//! omitted, and a trailing indefinite parameter absorbs any number of
//! remaining positionals of its declared element type.

use crate::error::{SemanticError, SemanticResult};
use crate::types::{DataType, FunctionType, TypeKind};
use gale_syntax::Span;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Call-site arguments: unnamed ordered list plus named mapping
#[derive(Debug, Clone, Default)]
pub struct ArgumentList {
    pub unnamed: Vec<DataType>,
    pub named: IndexMap<String, DataType>,
}

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(unnamed: Vec<DataType>) -> Self {
        Self {
            unnamed,
            named: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.unnamed.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unnamed.is_empty() && self.named.is_empty()
    }

    /// Any argument still awaiting call-site context?
    pub fn has_incomplete(&self) -> bool {
        self.unnamed
            .iter()
            .chain(self.named.values())
            .any(|arg| matches!(arg.kind, TypeKind::Incomplete))
    }
}

/// A failed argument match: a message plus the offending argument position
/// when one can be named
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentError {
    pub message: String,
    pub position: Option<usize>,
}

impl ArgumentError {
    fn new(message: impl Into<String>, position: Option<usize>) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Match an argument list against a function's parameters under the
/// coercion rules
pub fn check_arguments(function: &FunctionType, args: &ArgumentList) -> Result<(), ArgumentError> {
    check_with(function, args, DataType::coerce)
}

/// Exact structural match: every supplied argument type equals its
/// parameter type. Used to break ties between multiple coercible overloads.
pub fn arguments_exact(function: &FunctionType, args: &ArgumentList) -> bool {
    check_with(function, args, |a, b| a.same_shape(b)).is_ok()
}

fn check_with(
    function: &FunctionType,
    args: &ArgumentList,
    accepts: impl Fn(&DataType, &DataType) -> bool,
) -> Result<(), ArgumentError> {
    let parameters = &function.parameters;
    let mut filled = vec![false; parameters.len()];

    for (position, supplied) in args.unnamed.iter().enumerate() {
        let slot = if position < parameters.len() {
            position
        } else if parameters.last().is_some_and(|p| p.indefinite) {
            parameters.len() - 1
        } else {
            return Err(ArgumentError::new(
                format!(
                    "function takes {} parameters, {} arguments given",
                    parameters.len(),
                    args.unnamed.len()
                ),
                Some(position),
            ));
        };

        let parameter = &parameters[slot];
        if !accepts(&parameter.data_type, supplied) {
            return Err(ArgumentError::new(
                format!(
                    "argument of type `{supplied}` does not match parameter `{}` of type `{}`",
                    parameter.name, parameter.data_type
                ),
                Some(position),
            ));
        }
        filled[slot] = true;
    }

    for (name, supplied) in args.named.iter() {
        let Some(slot) = parameters.iter().position(|p| &p.name == name) else {
            return Err(ArgumentError::new(
                format!("function has no parameter named `{name}`"),
                None,
            ));
        };
        if filled[slot] && !parameters[slot].indefinite {
            return Err(ArgumentError::new(
                format!("parameter `{name}` is filled both positionally and by name"),
                None,
            ));
        }
        if !accepts(&parameters[slot].data_type, supplied) {
            return Err(ArgumentError::new(
                format!(
                    "argument of type `{supplied}` does not match parameter `{name}` of type `{}`",
                    parameters[slot].data_type
                ),
                None,
            ));
        }
        filled[slot] = true;
    }

    for (slot, parameter) in parameters.iter().enumerate() {
        if !filled[slot] && !parameter.optional && !parameter.indefinite {
            return Err(ArgumentError::new(
                format!("missing argument for parameter `{}`", parameter.name),
                None,
            ));
        }
    }

    Ok(())
}

/// A set of same-named function overloads
#[derive(Debug)]
pub struct FunctionGroup {
    pub name: String,
    functions: RefCell<Vec<Rc<FunctionType>>>,
}

impl FunctionGroup {
    pub fn new(name: impl Into<String>, functions: Vec<Rc<FunctionType>>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            functions: RefCell::new(functions),
        })
    }

    /// Add an overload; false when an identically-shaped signature exists
    pub fn add(&self, function: Rc<FunctionType>) -> bool {
        let mut functions = self.functions.borrow_mut();
        if functions.iter().any(|existing| {
            existing.parameters.len() == function.parameters.len()
                && existing
                    .parameters
                    .iter()
                    .zip(function.parameters.iter())
                    .all(|(a, b)| a.data_type.same_shape(&b.data_type))
        }) {
            return false;
        }
        functions.push(function);
        true
    }

    pub fn functions(&self) -> Vec<Rc<FunctionType>> {
        self.functions.borrow().clone()
    }

    /// Select the unique overload matching `args`. No-match and ambiguity
    /// are reported distinctly.
    pub fn get_function(&self, args: &ArgumentList, span: Span) -> SemanticResult<Rc<FunctionType>> {
        let functions = self.functions.borrow();
        let mut matches: Vec<&Rc<FunctionType>> = functions
            .iter()
            .filter(|function| check_arguments(function, args).is_ok())
            .collect();

        match matches.len() {
            0 => Err(SemanticError::NoMatchingOverload {
                group: self.name.clone(),
                span: span.into(),
            }),
            1 => Ok(Rc::clone(matches.remove(0))),
            _ => {
                let exact: Vec<&&Rc<FunctionType>> = matches
                    .iter()
                    .filter(|function| arguments_exact(function, args))
                    .collect();
                if exact.len() == 1 {
                    Ok(Rc::clone(exact[0]))
                } else {
                    Err(SemanticError::AmbiguousOverload {
                        group: self.name.clone(),
                        span: span.into(),
                    })
                }
            }
        }
    }
}
