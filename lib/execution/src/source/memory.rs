use crate::source::{BindingStream, PatternMatcher};
use crate::sparql::error::QueryEvaluationError;
use futures::{Stream, StreamExt};
use ldf_model::{
    skolemize, Binding, Graph, NamedNodePattern, SubjectRef, Term, TermPattern, TermRef, Triple,
    TriplePattern, TripleRef, Variable, DEFAULT_SKOLEM_BASE,
};
use oxrdfio::{RdfFormat, RdfParseError, RdfParser};
use std::io::Read;
use std::{iter, vec};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

/// Blank nodes of a basic graph pattern are matched as variables with this prefix. They never
/// leave the matcher.
const BLANK_NODE_VARIABLE_PREFIX: &str = "__blank_";

/// A [PatternMatcher] that answers basic graph patterns from an in-memory graph.
///
/// The blank nodes of the graph are skolemized when the matcher is created, so they can be joined
/// like IRIs. The query results turn them back into blank nodes.
///
/// ```
/// use ldf_execution::source::InMemoryPatternMatcher;
/// use oxrdfio::RdfFormat;
///
/// let data = "<http://example.com/s> <http://example.com/p> _:o .";
/// let matcher = InMemoryPatternMatcher::from_reader(RdfFormat::NTriples, data.as_bytes())?;
/// assert_eq!(matcher.len(), 1);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryPatternMatcher {
    graph: Arc<Graph>,
}

impl InMemoryPatternMatcher {
    /// Creates a matcher for `graph` that skolemizes blank nodes below [DEFAULT_SKOLEM_BASE].
    pub fn new(graph: &Graph) -> Self {
        Self::with_skolem_base(graph, DEFAULT_SKOLEM_BASE)
    }

    /// Creates a matcher for `graph` that skolemizes blank nodes below `base`.
    pub fn with_skolem_base(graph: &Graph, base: &str) -> Self {
        let mut skolemized = Graph::new();
        for triple in graph {
            let subject = match triple.subject {
                SubjectRef::BlankNode(node) => skolemize(node, base).into(),
                subject => subject.into_owned(),
            };
            let object = match triple.object {
                TermRef::BlankNode(node) => skolemize(node, base).into(),
                object => object.into_owned(),
            };
            skolemized.insert(&Triple::new(subject, triple.predicate, object));
        }
        Self {
            graph: Arc::new(skolemized),
        }
    }

    /// Parses an RDF document into a new matcher. Quads of named graphs are added to the graph
    /// of the matcher, too.
    ///
    /// # Errors
    ///
    /// If the document cannot be parsed.
    pub fn from_reader(format: RdfFormat, reader: impl Read) -> Result<Self, RdfParseError> {
        let mut graph = Graph::new();
        for quad in RdfParser::from_format(format).for_reader(reader) {
            let quad = quad?;
            graph.insert(TripleRef::new(&quad.subject, &quad.predicate, &quad.object));
        }
        Ok(Self::new(&graph))
    }

    /// The number of triples of the graph.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }
}

impl PatternMatcher for InMemoryPatternMatcher {
    fn match_pattern(
        &self,
        input: BindingStream,
        patterns: &[TriplePattern],
        optional: bool,
    ) -> BindingStream {
        let mut hidden = Vec::new();
        let patterns = patterns
            .iter()
            .map(|pattern| CompiledPattern::new(pattern, &mut hidden))
            .collect();
        MatchStream::new(input, Arc::clone(&self.graph), patterns, hidden, optional).boxed()
    }
}

/// A position of a triple pattern.
#[derive(Debug)]
enum Slot {
    Constant(Term),
    Variable(Variable),
}

impl Slot {
    fn from_term_pattern(pattern: &TermPattern, hidden: &mut Vec<Variable>) -> Self {
        match pattern {
            TermPattern::NamedNode(node) => Slot::Constant(node.clone().into()),
            TermPattern::Literal(literal) => Slot::Constant(literal.clone().into()),
            TermPattern::Variable(variable) => Slot::Variable(variable.clone()),
            TermPattern::BlankNode(node) => {
                let variable = Variable::new_unchecked(format!(
                    "{BLANK_NODE_VARIABLE_PREFIX}{}",
                    node.as_str()
                ));
                if !hidden.contains(&variable) {
                    hidden.push(variable.clone());
                }
                Slot::Variable(variable)
            }
        }
    }

    /// The term this slot is restricted to for `binding`.
    fn value<'a>(&'a self, binding: &'a Binding) -> Option<&'a Term> {
        match self {
            Slot::Constant(term) => Some(term),
            Slot::Variable(variable) => binding.get(variable),
        }
    }

    /// Matches `value` against this slot. Returns the extended binding on success.
    fn apply(&self, binding: Binding, value: TermRef<'_>) -> Option<Binding> {
        match self {
            Slot::Constant(term) => (term.as_ref() == value).then_some(binding),
            Slot::Variable(variable) => binding.extend(variable, &value.into_owned()).ok(),
        }
    }
}

#[derive(Debug)]
struct CompiledPattern {
    subject: Slot,
    predicate: Slot,
    object: Slot,
}

impl CompiledPattern {
    fn new(pattern: &TriplePattern, hidden: &mut Vec<Variable>) -> Self {
        let predicate = match &pattern.predicate {
            NamedNodePattern::NamedNode(node) => Slot::Constant(node.clone().into()),
            NamedNodePattern::Variable(variable) => Slot::Variable(variable.clone()),
        };
        Self {
            subject: Slot::from_term_pattern(&pattern.subject, hidden),
            predicate,
            object: Slot::from_term_pattern(&pattern.object, hidden),
        }
    }

    /// Returns the triples that may match this pattern for `binding`, using the graph index of
    /// the first restricted position.
    fn candidates<'a>(
        &'a self,
        graph: &'a Graph,
        binding: &'a Binding,
    ) -> Box<dyn Iterator<Item = TripleRef<'a>> + 'a> {
        if let Some(subject) = self.subject.value(binding) {
            return match subject {
                Term::NamedNode(node) => Box::new(graph.triples_for_subject(node)),
                Term::BlankNode(node) => Box::new(graph.triples_for_subject(node)),
                Term::Literal(_) => Box::new(iter::empty()),
            };
        }
        if let Some(predicate) = self.predicate.value(binding) {
            return match predicate {
                Term::NamedNode(node) => Box::new(graph.triples_for_predicate(node)),
                Term::BlankNode(_) | Term::Literal(_) => Box::new(iter::empty()),
            };
        }
        if let Some(object) = self.object.value(binding) {
            return Box::new(graph.triples_for_object(object));
        }
        Box::new(graph.iter())
    }

    fn apply(&self, binding: &Binding, triple: TripleRef<'_>) -> Option<Binding> {
        let binding = self.subject.apply(binding.clone(), triple.subject.into())?;
        let binding = self.predicate.apply(binding, triple.predicate.into())?;
        self.object.apply(binding, triple.object)
    }
}

/// A partial match of a basic graph pattern. `binding` matches the first `depth` patterns and
/// `candidates` holds the triples that are left to try for the next one.
struct Frame {
    depth: usize,
    binding: Binding,
    candidates: vec::IntoIter<Triple>,
}

/// Extends each input binding with the matches of a basic graph pattern.
///
/// Matches are enumerated depth-first and emitted as soon as they are found. Only the candidates
/// of the current path are kept. The next input binding is pulled after all matches of the current
/// one have been emitted.
struct MatchStream {
    input: Option<BindingStream>,
    graph: Arc<Graph>,
    patterns: Vec<CompiledPattern>,
    hidden: Vec<Variable>,
    optional: bool,
    stack: Vec<Frame>,
    /// The current input binding until it has a match. Only kept for optional patterns.
    unmatched: Option<Binding>,
}

impl MatchStream {
    fn new(
        input: BindingStream,
        graph: Arc<Graph>,
        patterns: Vec<CompiledPattern>,
        hidden: Vec<Variable>,
        optional: bool,
    ) -> Self {
        Self {
            input: Some(input),
            graph,
            patterns,
            hidden,
            optional,
            stack: Vec::new(),
            unmatched: None,
        }
    }

    fn start(&mut self, binding: Binding) {
        if self.optional {
            self.unmatched = Some(binding.clone());
        }
        self.push_frame(0, binding);
    }

    fn push_frame(&mut self, depth: usize, binding: Binding) {
        let candidates = self.patterns[depth]
            .candidates(&self.graph, &binding)
            .map(TripleRef::into_owned)
            .collect::<Vec<_>>()
            .into_iter();
        self.stack.push(Frame {
            depth,
            binding,
            candidates,
        });
    }

    /// Returns the next match of the current input binding.
    fn next_match(&mut self) -> Option<Binding> {
        while let Some(frame) = self.stack.last_mut() {
            let Some(triple) = frame.candidates.next() else {
                self.stack.pop();
                continue;
            };
            let depth = frame.depth;
            let Some(extended) = self.patterns[depth].apply(&frame.binding, triple.as_ref()) else {
                continue;
            };
            if depth + 1 == self.patterns.len() {
                self.unmatched = None;
                return Some(self.visible(extended));
            }
            self.push_frame(depth + 1, extended);
        }
        None
    }

    fn visible(&self, binding: Binding) -> Binding {
        if self.hidden.is_empty() {
            return binding;
        }
        binding
            .iter()
            .filter(|(variable, _)| !self.hidden.contains(variable))
            .map(|(variable, term)| (variable.clone(), term.clone()))
            .collect()
    }
}

impl Stream for MatchStream {
    type Item = Result<Binding, QueryEvaluationError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(binding) = this.next_match() {
                return Poll::Ready(Some(Ok(binding)));
            }
            if let Some(binding) = this.unmatched.take() {
                return Poll::Ready(Some(Ok(binding)));
            }
            let Some(input) = this.input.as_mut() else {
                return Poll::Ready(None);
            };
            match ready!(input.poll_next_unpin(cx)) {
                Some(Ok(binding)) if this.patterns.is_empty() => {
                    return Poll::Ready(Some(Ok(binding)));
                }
                Some(Ok(binding)) => this.start(binding),
                Some(Err(error)) => {
                    this.input = None;
                    return Poll::Ready(Some(Err(error)));
                }
                None => this.input = None,
            }
        }
    }
}
