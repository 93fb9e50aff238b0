use crate::source::BindingStream;
use crate::sparql::error::QueryEvaluationError;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use ldf_model::{deskolemize, Binding, Variable};
pub use sparesults::QuerySolution;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A stream over [`QuerySolution`]s.
pub struct QuerySolutionStream {
    /// The variables used in the query solutions.
    variables: Arc<[Variable]>,
    inner: BoxStream<'static, Result<QuerySolution, QueryEvaluationError>>,
}

impl QuerySolutionStream {
    /// Construct a new stream of solutions from an ordered list of solution variables and a stream
    /// of solutions that use the same variables.
    pub fn new(
        variables: Arc<[Variable]>,
        inner: impl Stream<Item = Result<QuerySolution, QueryEvaluationError>> + Send + 'static,
    ) -> Self {
        Self {
            variables,
            inner: inner.boxed(),
        }
    }

    /// Projects each binding of `bindings` onto `variables`.
    ///
    /// Skolem IRIs are turned back into blank nodes. Variables that are not bound by a binding are
    /// unbound in the solution.
    pub(crate) fn project(variables: Arc<[Variable]>, bindings: BindingStream) -> Self {
        let projected = Arc::clone(&variables);
        let inner = bindings.map_ok(move |binding| project_binding(&projected, &binding));
        Self::new(variables, inner)
    }

    /// Projects each binding onto the variables it binds, in the order they were bound.
    ///
    /// `variables` are the declared variables of the stream. A solution may carry variables that
    /// are not declared, for example if a pattern matcher binds additional variables.
    pub(crate) fn project_all(variables: Arc<[Variable]>, bindings: BindingStream) -> Self {
        let inner = bindings.map_ok(|binding| {
            let (variables, values): (Vec<_>, Vec<_>) = binding
                .iter()
                .map(|(variable, term)| (variable.clone(), Some(deskolemize(term.clone()))))
                .unzip();
            QuerySolution::from((Arc::<[Variable]>::from(variables), values))
        });
        Self::new(variables, inner)
    }

    /// The variables used in the solutions.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        self.variables.as_ref()
    }
}

impl Stream for QuerySolutionStream {
    type Item = Result<QuerySolution, QueryEvaluationError>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

fn project_binding(variables: &Arc<[Variable]>, binding: &Binding) -> QuerySolution {
    let values = variables
        .iter()
        .map(|variable| binding.get(variable).cloned().map(deskolemize))
        .collect::<Vec<_>>();
    (Arc::clone(variables), values).into()
}

/// Serializes a solution into a key that is equal for equal solutions.
pub(crate) fn solution_key(solution: &QuerySolution) -> String {
    let mut key = String::new();
    for (variable, value) in solution.variables().iter().zip(solution.values()) {
        key.push_str(&variable.to_string());
        key.push('=');
        match value {
            Some(term) => key.push_str(&term.to_string()),
            None => key.push_str("UNDEF"),
        }
        key.push('\t');
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use ldf_model::{skolemize, BlankNode, Literal, NamedNode, Term};

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    #[tokio::test]
    async fn test_project_keeps_variable_order() {
        let binding = Binding::new()
            .extend(&var("b"), &Literal::new_simple_literal("b").into())
            .unwrap()
            .extend(&var("a"), &Literal::new_simple_literal("a").into())
            .unwrap();
        let variables: Arc<[Variable]> = Arc::new([var("a"), var("c"), var("b")]);

        let solutions = QuerySolutionStream::project(
            variables,
            stream::iter([Ok(binding)]).boxed(),
        );
        assert_eq!(solutions.variables(), &[var("a"), var("c"), var("b")]);

        let solutions: Vec<_> = solutions.try_collect().await.unwrap();
        assert_eq!(solutions.len(), 1);
        assert_eq!(
            solutions[0].values(),
            &[
                Some(Literal::new_simple_literal("a").into()),
                None,
                Some(Literal::new_simple_literal("b").into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_project_deskolemizes_values() {
        let blank_node = BlankNode::new_unchecked("b1");
        let skolem: Term = skolemize(blank_node.as_ref(), "http://localhost").into();
        let binding = Binding::new().extend(&var("x"), &skolem).unwrap();

        let solutions: Vec<_> =
            QuerySolutionStream::project(Arc::new([var("x")]), stream::iter([Ok(binding)]).boxed())
                .try_collect()
                .await
                .unwrap();
        assert_eq!(solutions[0].get("x"), Some(&Term::from(blank_node)));
    }

    #[tokio::test]
    async fn test_project_all_uses_variables_of_each_binding() {
        let first = Binding::new()
            .extend(&var("b"), &Literal::new_simple_literal("b").into())
            .unwrap()
            .extend(&var("a"), &Literal::new_simple_literal("a").into())
            .unwrap();
        let second = Binding::new()
            .extend(&var("hidden"), &Literal::new_simple_literal("h").into())
            .unwrap();

        let solutions = QuerySolutionStream::project_all(
            Arc::new([var("a")]),
            stream::iter([Ok(first), Ok(second)]).boxed(),
        );
        assert_eq!(solutions.variables(), &[var("a")]);

        let solutions: Vec<_> = solutions.try_collect().await.unwrap();
        assert_eq!(solutions[0].variables(), &[var("b"), var("a")]);
        assert_eq!(solutions[1].variables(), &[var("hidden")]);
        assert_eq!(
            solutions[1].get("hidden"),
            Some(&Literal::new_simple_literal("h").into())
        );
    }

    #[test]
    fn test_solution_key_distinguishes_variables() {
        let iri: Term = NamedNode::new_unchecked("http://example.com/a").into();
        let left = QuerySolution::from((Arc::from([var("a")]), vec![Some(iri.clone())]));
        let right = QuerySolution::from((Arc::from([var("b")]), vec![Some(iri)]));
        assert_ne!(solution_key(&left), solution_key(&right));
    }

    #[test]
    fn test_solution_key_distinguishes_unbound() {
        let variables: Arc<[Variable]> = Arc::new([var("a"), var("b")]);
        let iri: Term = NamedNode::new_unchecked("http://example.com/a").into();
        let left = QuerySolution::from((Arc::clone(&variables), vec![Some(iri.clone()), None]));
        let right = QuerySolution::from((Arc::clone(&variables), vec![None, Some(iri.clone())]));
        let same = QuerySolution::from((variables, vec![Some(iri), None]));

        assert_ne!(solution_key(&left), solution_key(&right));
        assert_eq!(solution_key(&left), solution_key(&same));
    }
}
