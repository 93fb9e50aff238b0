//! Turns the groups of a `WHERE` clause into a pipeline of binding streams.

use crate::source::{BindingStream, PatternMatcher};
use crate::sparql::algebra::Group;
use crate::sparql::expression::{is_truthy, ExpressionEvaluator};
use futures::StreamExt;
use ldf_model::{Binding, Expression};
use ldf_physical::{branch, FilterStream, UnionStream};
use std::sync::Arc;
use tracing::trace;

/// Compiles [Group]s into streams.
///
/// The optional flag only affects basic graph patterns. Sequences and unions evaluate their
/// children as mandatory, optional groups evaluate their children as optional, and a filter
/// passes the flag on to its inner group.
pub(crate) struct GroupCompiler<'a> {
    matcher: &'a dyn PatternMatcher,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl<'a> GroupCompiler<'a> {
    pub(crate) fn new(
        matcher: &'a dyn PatternMatcher,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> Self {
        Self { matcher, evaluator }
    }

    /// Chains the streams of `groups`. The output of one group is the input of the next.
    pub(crate) fn compile_groups(
        &self,
        input: BindingStream,
        groups: &[Group],
        optional: bool,
    ) -> BindingStream {
        groups
            .iter()
            .fold(input, |input, group| self.compile_group(input, group, optional))
    }

    pub(crate) fn compile_group(
        &self,
        input: BindingStream,
        group: &Group,
        optional: bool,
    ) -> BindingStream {
        match group {
            Group::Pattern(patterns) => self.matcher.match_pattern(input, patterns, optional),
            Group::Sequence(children) => self.compile_groups(input, children, false),
            Group::Optional(children) => self.compile_groups(input, children, true),
            Group::Union(children) => {
                if children.is_empty() {
                    return input;
                }
                let branches = branch(input, children.len())
                    .into_iter()
                    .zip(children)
                    .map(|(branch, child)| self.compile_group(branch.boxed(), child, false));
                UnionStream::new(branches).boxed()
            }
            Group::Filter { expression, inner } => {
                let inner = self.compile_group(input, inner, optional);
                self.filter(inner, expression.clone())
            }
        }
    }

    fn filter(&self, input: BindingStream, expression: Expression) -> BindingStream {
        let evaluator = Arc::clone(&self.evaluator);
        FilterStream::new(input, move |binding: &Binding| {
            match evaluator.evaluate(&expression, binding) {
                Ok(value) => is_truthy(&value),
                Err(error) => {
                    trace!(%binding, %error, "Filter expression failed, removing binding");
                    false
                }
            }
        })
        .boxed()
    }
}
