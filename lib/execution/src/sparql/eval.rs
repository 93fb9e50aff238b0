use crate::results::{
    solution_key, QueryBooleanStream, QueryResults, QuerySolutionStream,
    QueryTripleStream,
};
use crate::source::{BindingStream, PatternMatcher};
use crate::sparql::algebra::{Group, Query, QueryForm, QueryInput, Selection};
use crate::sparql::error::{QueryError, QueryEvaluationError};
use crate::sparql::expression::{compare_order_keys, ExpressionEvaluator, SimpleExpressionEvaluator};
use crate::sparql::group::GroupCompiler;
use crate::sparql::QueryOptions;
use futures::stream::BoxStream;
use futures::{stream, Stream, StreamExt};
use ldf_model::{
    Binding, Expression, NamedNodePattern, OrderExpression, Term, TermPattern, Triple,
    TriplePattern, Variable,
};
use ldf_physical::{DistinctStream, SliceStream, SortStream, SortWindow};
use std::sync::Arc;
use tracing::{debug, trace};

/// Compiles queries into lazy result streams.
///
/// The compiler is cheap to clone and can compile any number of queries. Each compiled query owns
/// its own pipeline; nothing is evaluated before the results are polled.
///
/// ```
/// use futures::TryStreamExt;
/// use ldf_execution::results::QueryResults;
/// use ldf_execution::source::InMemoryPatternMatcher;
/// use ldf_execution::sparql::{QueryCompiler, QueryOptions};
/// use oxrdfio::RdfFormat;
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new()?.block_on(async {
/// let data = "<http://example.com/a> <http://example.com/p> <http://example.com/b> .";
/// let matcher = InMemoryPatternMatcher::from_reader(RdfFormat::NTriples, data.as_bytes())?;
/// let compiler = QueryCompiler::new(Arc::new(matcher));
///
/// let results = compiler.compile("SELECT ?o WHERE { ?s ?p ?o }", &QueryOptions::default())?;
/// let QueryResults::Solutions(solutions) = results else {
///     unreachable!()
/// };
/// let solutions: Vec<_> = solutions.try_collect().await?;
/// assert_eq!(solutions.len(), 1);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// # })?;
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Clone)]
pub struct QueryCompiler {
    matcher: Arc<dyn PatternMatcher>,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

/// The projection that turns the bindings of the `WHERE` clause into results.
enum Projection {
    Select(Arc<[Variable]>),
    /// `SELECT *` declares the visible variables but projects what each binding binds.
    SelectAll(Arc<[Variable]>),
    Construct(Vec<TriplePattern>),
    Ask,
}

impl QueryCompiler {
    /// Creates a compiler that matches basic graph patterns with `matcher` and evaluates
    /// expressions with the [SimpleExpressionEvaluator].
    pub fn new(matcher: Arc<dyn PatternMatcher>) -> Self {
        Self {
            matcher,
            evaluator: Arc::new(SimpleExpressionEvaluator),
        }
    }

    /// Replaces the evaluator for `FILTER` and `ORDER BY` expressions.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Compiles `query` into a result stream.
    ///
    /// # Errors
    ///
    /// Returns [QueryError::InvalidQuery] if the query text cannot be parsed and
    /// [QueryError::UnsupportedQuery] if it uses a construct that cannot be evaluated. Errors of
    /// the pattern matcher are reported by the returned stream.
    pub fn compile(
        &self,
        query: impl Into<QueryInput>,
        options: &QueryOptions,
    ) -> Result<QueryResults, QueryError> {
        let mut query = query.into().into_query(options)?;
        debug!(%query, "Compiling query");

        let projection = match &query.form {
            QueryForm::Select(Selection::Variables(variables)) => {
                Projection::Select(variables.clone().into())
            }
            QueryForm::Select(Selection::All) => {
                Projection::SelectAll(query.visible_variables().into())
            }
            QueryForm::Construct(template) => Projection::Construct(template.clone()),
            QueryForm::Describe(targets) => {
                let template = describe_template(targets);
                query.where_groups.push(Group::Pattern(template.clone()));
                Projection::Construct(template)
            }
            QueryForm::Ask => Projection::Ask,
        };

        let input = stream::iter([Ok(Binding::new())]).boxed();
        let groups = GroupCompiler::new(self.matcher.as_ref(), Arc::clone(&self.evaluator));
        let mut bindings = groups.compile_groups(input, &query.where_groups, false);

        // The sort streams are stable, so the least significant key is sorted first.
        for key in query.order.iter().rev() {
            bindings = self.sort(bindings, key, options.sort_window);
        }

        Ok(match projection {
            Projection::Select(variables) => {
                let solutions = QuerySolutionStream::project(Arc::clone(&variables), bindings);
                let solutions = apply_modifiers(solutions, &query, solution_key);
                QuerySolutionStream::new(variables, solutions).into()
            }
            Projection::SelectAll(variables) => {
                let solutions = QuerySolutionStream::project_all(Arc::clone(&variables), bindings);
                let solutions = apply_modifiers(solutions, &query, solution_key);
                QuerySolutionStream::new(variables, solutions).into()
            }
            Projection::Construct(template) => {
                let triples = QueryTripleStream::construct(template, bindings);
                QueryTripleStream::new(apply_modifiers(triples, &query, triple_key)).into()
            }
            Projection::Ask => {
                if query.offset > 0 || query.limit.is_some() {
                    bindings = SliceStream::new(bindings, query.offset, query.limit).boxed();
                }
                QueryBooleanStream::ask(bindings).into()
            }
        })
    }

    fn sort(&self, bindings: BindingStream, key: &OrderExpression, window: SortWindow) -> BindingStream {
        let (expression, descending) = match key {
            OrderExpression::Asc(expression) => (expression.clone(), false),
            OrderExpression::Desc(expression) => (expression.clone(), true),
        };
        let evaluator = Arc::clone(&self.evaluator);
        let compare = move |lhs: &Binding, rhs: &Binding| {
            let lhs = order_key(evaluator.as_ref(), &expression, lhs);
            let rhs = order_key(evaluator.as_ref(), &expression, rhs);
            let ordering = compare_order_keys(lhs.as_ref(), rhs.as_ref());
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        };
        SortStream::with_comparator(bindings, compare, window).boxed()
    }
}

fn order_key(
    evaluator: &dyn ExpressionEvaluator,
    expression: &Expression,
    binding: &Binding,
) -> Option<Term> {
    match evaluator.evaluate(expression, binding) {
        Ok(key) => Some(key),
        Err(error) => {
            trace!(%binding, %error, "Order key cannot be evaluated, using the empty string");
            None
        }
    }
}

/// Creates the template `?target ?__predicate{i} ?__object{i}` for each target.
fn describe_template(targets: &[NamedNodePattern]) -> Vec<TriplePattern> {
    targets
        .iter()
        .enumerate()
        .map(|(i, target)| TriplePattern {
            subject: match target {
                NamedNodePattern::NamedNode(node) => TermPattern::NamedNode(node.clone()),
                NamedNodePattern::Variable(variable) => TermPattern::Variable(variable.clone()),
            },
            predicate: Variable::new_unchecked(format!("__predicate{i}")).into(),
            object: Variable::new_unchecked(format!("__object{i}")).into(),
        })
        .collect()
}

/// Wraps projected results with the `DISTINCT`, `OFFSET` and `LIMIT` modifiers of `query`.
fn apply_modifiers<S, T>(
    results: S,
    query: &Query,
    key: fn(&T) -> String,
) -> BoxStream<'static, Result<T, QueryEvaluationError>>
where
    S: Stream<Item = Result<T, QueryEvaluationError>> + Send + 'static,
    T: Send + 'static,
{
    let mut results = results.boxed();
    if query.distinct {
        results = DistinctStream::new(results, key).boxed();
    }
    if query.offset > 0 || query.limit.is_some() {
        results = SliceStream::new(results, query.offset, query.limit).boxed();
    }
    results
}

fn triple_key(triple: &Triple) -> String {
    triple.to_string()
}
