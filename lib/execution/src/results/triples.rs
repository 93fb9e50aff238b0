use crate::source::BindingStream;
use crate::sparql::error::QueryEvaluationError;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use ldf_model::{
    deskolemize, BlankNode, Binding, Graph, NamedNode, NamedNodePattern, Subject, Term,
    TermPattern, Triple, TriplePattern,
};
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// A stream over the triples that compose a graph solution.
pub struct QueryTripleStream {
    inner: BoxStream<'static, Result<Triple, QueryEvaluationError>>,
}

impl QueryTripleStream {
    pub fn new(
        inner: impl Stream<Item = Result<Triple, QueryEvaluationError>> + Send + 'static,
    ) -> Self {
        Self {
            inner: inner.boxed(),
        }
    }

    /// Instantiates `template` for each binding of `bindings`.
    pub(crate) fn construct(template: Vec<TriplePattern>, bindings: BindingStream) -> Self {
        Self::new(ConstructProjection::new(template, bindings))
    }

    pub async fn collect_as_graph(&mut self) -> Result<Graph, QueryEvaluationError> {
        let mut graph = Graph::new();
        while let Some(triple) = self.next().await {
            let triple = triple?;
            graph.insert(triple.as_ref());
        }
        Ok(graph)
    }
}

impl Stream for QueryTripleStream {
    type Item = Result<Triple, QueryEvaluationError>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Instantiates a CONSTRUCT template for each binding.
///
/// Template triples without variables and blank nodes are emitted once before the first binding is
/// pulled. Blank nodes of the template are replaced by fresh blank nodes for each binding, shared by
/// all triples instantiated from that binding. A triple is skipped
/// if one of its variables is unbound or if a value cannot be used at its position.
struct ConstructProjection {
    source: Option<BindingStream>,
    template: Vec<TriplePattern>,
    pending: VecDeque<Triple>,
}

impl ConstructProjection {
    fn new(template: Vec<TriplePattern>, source: BindingStream) -> Self {
        let (constant, template): (Vec<_>, Vec<_>) =
            template.into_iter().partition(is_ground);
        let mut pending = VecDeque::new();
        instantiate(&constant, &Binding::new(), &mut pending);
        Self {
            source: Some(source),
            template,
            pending,
        }
    }
}

impl Stream for ConstructProjection {
    type Item = Result<Triple, QueryEvaluationError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(triple) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(triple)));
            }
            let Some(source) = this.source.as_mut() else {
                return Poll::Ready(None);
            };
            match ready!(source.poll_next_unpin(cx)) {
                Some(Ok(binding)) => instantiate(&this.template, &binding, &mut this.pending),
                Some(Err(error)) => {
                    this.source = None;
                    return Poll::Ready(Some(Err(error)));
                }
                None => this.source = None,
            }
        }
    }
}

fn is_ground(pattern: &TriplePattern) -> bool {
    let is_ground_term =
        |term: &TermPattern| matches!(term, TermPattern::NamedNode(_) | TermPattern::Literal(_));
    is_ground_term(&pattern.subject)
        && matches!(pattern.predicate, NamedNodePattern::NamedNode(_))
        && is_ground_term(&pattern.object)
}

fn instantiate(template: &[TriplePattern], binding: &Binding, output: &mut VecDeque<Triple>) {
    let mut blank_nodes = HashMap::new();
    for pattern in template {
        let subject: Option<Subject> = template_value(&pattern.subject, binding, &mut blank_nodes)
            .and_then(|term| term.try_into().ok());
        let predicate: Option<NamedNode> = match &pattern.predicate {
            NamedNodePattern::NamedNode(node) => Some(node.clone()),
            NamedNodePattern::Variable(variable) => binding
                .get(variable)
                .cloned()
                .map(deskolemize)
                .and_then(|term| term.try_into().ok()),
        };
        let object = template_value(&pattern.object, binding, &mut blank_nodes);
        if let (Some(subject), Some(predicate), Some(object)) = (subject, predicate, object) {
            output.push_back(Triple::new(subject, predicate, object));
        }
    }
}

fn template_value(
    pattern: &TermPattern,
    binding: &Binding,
    blank_nodes: &mut HashMap<BlankNode, BlankNode>,
) -> Option<Term> {
    match pattern {
        TermPattern::NamedNode(node) => Some(node.clone().into()),
        TermPattern::Literal(literal) => Some(literal.clone().into()),
        TermPattern::BlankNode(node) => Some(
            blank_nodes
                .entry(node.clone())
                .or_insert_with(BlankNode::default)
                .clone()
                .into(),
        ),
        TermPattern::Variable(variable) => binding.get(variable).cloned().map(deskolemize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, TryStreamExt};
    use ldf_model::{Literal, Variable};

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{name}"))
    }

    fn pattern(subject: TermPattern, predicate: NamedNode, object: TermPattern) -> TriplePattern {
        TriplePattern {
            subject,
            predicate: predicate.into(),
            object,
        }
    }

    fn binding(name: &str, term: impl Into<Term>) -> Binding {
        Binding::new()
            .extend(&Variable::new_unchecked(name), &term.into())
            .unwrap()
    }

    async fn construct(template: Vec<TriplePattern>, bindings: Vec<Binding>) -> Vec<Triple> {
        QueryTripleStream::construct(template, stream::iter(bindings.into_iter().map(Ok)).boxed())
            .try_collect()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_constant_triples_are_emitted_once() {
        let template = vec![pattern(ex("s").into(), ex("p"), ex("o").into())];
        let triples = construct(template, vec![binding("x", ex("a")), binding("x", ex("b"))]).await;
        assert_eq!(triples, vec![Triple::new(ex("s"), ex("p"), ex("o"))]);
    }

    #[tokio::test]
    async fn test_blank_nodes_are_fresh_per_binding() {
        let blank = TermPattern::BlankNode(BlankNode::new_unchecked("b"));
        let template = vec![
            pattern(blank.clone(), ex("p"), Variable::new_unchecked("x").into()),
            pattern(blank, ex("q"), ex("o").into()),
        ];
        let triples = construct(template, vec![binding("x", ex("a")), binding("x", ex("b"))]).await;
        assert_eq!(triples.len(), 4);
        assert_eq!(triples[0].subject, triples[1].subject);
        assert_eq!(triples[2].subject, triples[3].subject);
        assert_ne!(triples[0].subject, triples[2].subject);
        assert!(matches!(triples[0].subject, Subject::BlankNode(_)));
    }

    #[tokio::test]
    async fn test_blank_node_only_triples_are_instantiated_per_binding() {
        let blank = TermPattern::BlankNode(BlankNode::new_unchecked("b"));
        let template = vec![
            pattern(blank.clone(), ex("p"), Variable::new_unchecked("x").into()),
            pattern(blank, ex("q"), ex("o").into()),
            pattern(ex("s").into(), ex("p"), ex("o").into()),
        ];
        let triples = construct(template, vec![binding("x", ex("a")), binding("x", ex("b"))]).await;
        assert_eq!(triples.len(), 5);
        assert_eq!(triples[0], Triple::new(ex("s"), ex("p"), ex("o")));
        let typed = triples
            .iter()
            .filter(|triple| triple.predicate == ex("q"))
            .count();
        assert_eq!(typed, 2);
        assert_eq!(triples[1].subject, triples[2].subject);
        assert_eq!(triples[3].subject, triples[4].subject);
        assert_ne!(triples[1].subject, triples[3].subject);
    }

    #[tokio::test]
    async fn test_unbound_and_ill_typed_values_skip_the_triple() {
        let template = vec![
            pattern(Variable::new_unchecked("x").into(), ex("p"), ex("o").into()),
            pattern(ex("s").into(), ex("p"), Variable::new_unchecked("y").into()),
        ];
        let triples = construct(
            template,
            vec![binding("x", Literal::new_simple_literal("literal subject"))],
        )
        .await;
        assert!(triples.is_empty());
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let template = vec![pattern(
            Variable::new_unchecked("x").into(),
            ex("p"),
            ex("o").into(),
        )];
        let bindings = stream::iter([
            Ok(binding("x", ex("a"))),
            Err(QueryEvaluationError::InternalError("boom".to_owned())),
            Ok(binding("x", ex("b"))),
        ])
        .boxed();
        let mut triples = QueryTripleStream::construct(template, bindings);
        assert!(triples.next().await.is_some_and(|t| t.is_ok()));
        assert!(triples.next().await.is_some_and(|t| t.is_err()));
        assert!(triples.next().await.is_none());
    }
}
