use ldf_model::{IriParseError, Variable};
use spargebra::SparqlSyntaxError;
use std::convert::Infallible;
use std::error::Error;
use std::io;

/// An error that is raised while compiling a query.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryError {
    /// The query is not valid SPARQL.
    #[error("Syntax error in query: {0}")]
    InvalidQuery(#[from] SparqlSyntaxError),
    /// A prefix or the base IRI of the query options is not a valid IRI.
    #[error("Invalid IRI in the query options: {0}")]
    InvalidIri(#[from] IriParseError),
    /// The query is valid but uses a construct that the client cannot evaluate.
    #[error("The query is not yet supported: {0}")]
    UnsupportedQuery(String),
}

impl QueryError {
    pub fn unsupported<T>(cause: impl Into<String>) -> Result<T, Self> {
        Err(QueryError::UnsupportedQuery(cause.into()))
    }
}

/// An error that is raised while the results of a query are produced.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryEvaluationError {
    /// An error of the source that provides the bindings for the triple patterns.
    #[error(transparent)]
    Source(Box<dyn Error + Send + Sync>),
    /// An error returned during results serialization.
    #[error(transparent)]
    ResultsSerialization(io::Error),
    /// The results are not a RDF graph
    #[error("The query results are not a RDF graph")]
    NotAGraph,
    #[error("An internal error that likely indicates towards a bug in the LDF client: {0}")]
    InternalError(String),
}

impl QueryEvaluationError {
    /// Wraps an error of a pattern matcher.
    pub fn from_source(error: impl Error + Send + Sync + 'static) -> Self {
        Self::Source(Box::new(error))
    }
}

impl From<Infallible> for QueryEvaluationError {
    #[inline]
    fn from(error: Infallible) -> Self {
        match error {}
    }
}

/// An error while evaluating an expression for a single binding.
///
/// These errors never end a query. A filter removes the binding and an order key is treated as the
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum EvaluationError {
    /// The expression refers to a variable that is not bound.
    #[error("The variable {0} is not bound")]
    UnboundVariable(Variable),
    /// An operand has a type that the operator does not accept.
    #[error("Type error: {0}")]
    TypeError(String),
    /// The expression uses an operator or function that is not supported.
    #[error("Unsupported expression: {0}")]
    Unsupported(String),
    /// The pattern of a `REGEX` call is invalid.
    #[error("Invalid regular expression: {0}")]
    Regex(String),
}

impl EvaluationError {
    pub fn type_error<T>(cause: impl Into<String>) -> Result<T, Self> {
        Err(EvaluationError::TypeError(cause.into()))
    }
}
