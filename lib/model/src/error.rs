use oxrdf::{Term, Variable};
use thiserror::Error;

/// Raised when a [`Binding`](crate::Binding) would bind a variable to two different terms.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Cannot bind {variable} to {new} as it is already bound to {existing}")]
pub struct BindingConflictError {
    /// The variable that is bound twice.
    pub variable: Variable,
    /// The term the variable is already bound to.
    pub existing: Term,
    /// The rejected term.
    pub new: Term,
}
