//! This crate compiles SPARQL queries into lazy pipelines of streams.
//!
//! # Executing SPARQL Queries
//!
//! A query passes through the following pipeline:
//!
//! ```text
//! Query String -> SPARQL Algebra (spargebra) -> Groups -> Binding Streams -> Results
//! ```
//!
//! The query string is first parsed by the SPARQL parser of Oxigraph, which produces a SPARQL
//! algebra graph pattern. The [`GraphPatternRewriter`](sparql::GraphPatternRewriter) turns this
//! pattern into a [`Query`](sparql::Query) whose `WHERE` clause is a tree of
//! [`Group`](sparql::Group)s.
//!
//! The [`QueryCompiler`](sparql::QueryCompiler) then builds one stream per group. Every stream
//! extends the bindings of its input, starting with a single empty binding. Basic graph patterns
//! are handed to a [`PatternMatcher`](source::PatternMatcher), which knows where the data comes
//! from. The final bindings are sorted, projected into the shape of the query form, deduplicated
//! and sliced.
//!
//! Nothing is evaluated before the [`QueryResults`](results::QueryResults) are polled. Dropping
//! the results stops the evaluation.

pub mod results;
pub mod source;
pub mod sparql;
