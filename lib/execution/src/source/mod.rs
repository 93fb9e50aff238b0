//! The boundary to the sources that provide the matches of triple patterns.
//!
//! The query compiler does not know where the data comes from. Every basic graph pattern of a
//! query is handed to a [PatternMatcher], which extends the bindings of its input with the
//! matches of the pattern. A matcher for remote fragments pages through the fragments while the
//! stream is polled; [InMemoryPatternMatcher] answers from a local graph.

use crate::sparql::error::QueryEvaluationError;
use futures::stream::BoxStream;
use ldf_model::{Binding, TriplePattern};

mod memory;

pub use memory::InMemoryPatternMatcher;

/// A stream of bindings that flows between the operators of a query.
pub type BindingStream = BoxStream<'static, Result<Binding, QueryEvaluationError>>;

/// Matches basic graph patterns against a source.
pub trait PatternMatcher: Send + Sync {
    /// Returns a stream that extends each binding of `input` with every match of `patterns`.
    ///
    /// The patterns must be joined in the given order. If `optional` is set, an input binding for
    /// which `patterns` has no match is passed on unchanged instead of being dropped.
    ///
    /// The returned stream owns `input`. Dropping it must stop all work for `input`, including
    /// requests that are still pending. Errors of the source are reported as
    /// [QueryEvaluationError::Source] and end the stream.
    fn match_pattern(
        &self,
        input: BindingStream,
        patterns: &[TriplePattern],
        optional: bool,
    ) -> BindingStream;
}
