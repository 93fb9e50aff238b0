//! [SPARQL](https://www.w3.org/TR/sparql11-overview/) implementation.
//!
//! A query is parsed, rewritten into a tree of [Group]s and then compiled by the
//! [QueryCompiler] into a pipeline of streams that starts with a single empty binding.

mod algebra;
pub mod error;
mod eval;
mod expression;
mod group;
mod rewriting;

pub use crate::results::{
    QueryBooleanStream, QueryResults, QuerySolution, QuerySolutionStream, QueryTripleStream,
};
pub use crate::sparql::algebra::{Group, Query, QueryForm, QueryInput, Selection};
pub use eval::QueryCompiler;
pub use expression::{compare_order_keys, is_truthy, ExpressionEvaluator, SimpleExpressionEvaluator};
pub use ldf_model::{Variable, VariableNameParseError};
pub use ldf_physical::SortWindow;
pub use rewriting::GraphPatternRewriter;
pub use spargebra::SparqlSyntaxError;
use std::collections::BTreeMap;

/// Options for SPARQL query compilation.
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    /// Prefixes that can be used in the query without declaring them.
    pub prefixes: BTreeMap<String, String>,
    /// The base IRI that relative IRIs of the query are resolved against.
    pub base_iri: Option<String>,
    /// How many bindings an `ORDER BY` key may buffer.
    ///
    /// A bounded window only produces a total order if no binding is displaced by more than the
    /// window from its sorted position.
    pub sort_window: SortWindow,
}

impl QueryOptions {
    /// Adds a prefix that can be used in the query.
    #[must_use]
    pub fn with_prefix(mut self, name: impl Into<String>, iri: impl Into<String>) -> Self {
        self.prefixes.insert(name.into(), iri.into());
        self
    }
}
