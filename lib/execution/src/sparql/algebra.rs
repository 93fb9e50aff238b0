//! The query model that is evaluated by the client.
//!
//! Parsed SPARQL queries are rewritten into this model by the
//! [`GraphPatternRewriter`](crate::sparql::rewriting::GraphPatternRewriter). The model can also be
//! built by hand, which allows evaluating queries that have not been written in SPARQL syntax.

use crate::sparql::error::QueryError;
use crate::sparql::rewriting::GraphPatternRewriter;
use crate::sparql::QueryOptions;
use ldf_model::{
    Expression, NamedNode, NamedNodePattern, OrderExpression, TermPattern, TriplePattern, Variable,
};
use std::fmt;

/// A query that is ready to be compiled.
///
/// ```
/// use ldf_execution::sparql::{Query, QueryForm, QueryOptions, Selection};
///
/// let query = Query::parse(
///     "SELECT ?s WHERE { ?s ?p ?o } LIMIT 10",
///     &QueryOptions::default(),
/// )?;
/// assert!(matches!(query.form, QueryForm::Select(Selection::Variables(_))));
/// assert_eq!(query.limit, Some(10));
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    /// The shape of the results.
    pub form: QueryForm,
    /// The groups of the `WHERE` clause. They are evaluated one after another.
    pub where_groups: Vec<Group>,
    /// The `ORDER BY` keys, most significant first.
    pub order: Vec<OrderExpression>,
    /// The number of results to skip.
    pub offset: usize,
    /// The maximum number of results.
    pub limit: Option<usize>,
    /// Whether duplicate results are removed.
    pub distinct: bool,
}

impl Query {
    /// Creates a new query without any solution modifiers.
    pub fn new(form: QueryForm, where_groups: Vec<Group>) -> Self {
        Self {
            form,
            where_groups,
            order: Vec::new(),
            offset: 0,
            limit: None,
            distinct: false,
        }
    }

    /// Parses a SPARQL query using the prefixes and base IRI of `options`.
    ///
    /// # Errors
    ///
    /// Returns [QueryError::InvalidIri] if a prefix of `options` is not a valid IRI,
    /// [QueryError::InvalidQuery] if `query` is not valid SPARQL and
    /// [QueryError::UnsupportedQuery] if the query uses a construct that the client cannot
    /// evaluate.
    pub fn parse(query: &str, options: &QueryOptions) -> Result<Self, QueryError> {
        // Declarations of the query itself come later and take precedence.
        let prologue = options
            .prefixes
            .iter()
            .map(|(prefix_name, prefix_iri)| -> Result<String, QueryError> {
                let prefix_iri = NamedNode::new(prefix_iri.as_str())?;
                Ok(format!("PREFIX {prefix_name}: {prefix_iri} "))
            })
            .collect::<Result<String, _>>()?;
        let query =
            spargebra::Query::parse(&format!("{prologue}{query}"), options.base_iri.as_deref())?;
        GraphPatternRewriter::new().rewrite(&query)
    }

    /// Returns the variables that are bound by the patterns of the `WHERE` clause in the order of
    /// their first occurrence.
    pub fn visible_variables(&self) -> Vec<Variable> {
        let mut variables = Vec::new();
        for group in &self.where_groups {
            group.collect_variables(&mut variables);
        }
        variables
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.form {
            QueryForm::Select(Selection::All) => f.write_str("SELECT *")?,
            QueryForm::Select(Selection::Variables(variables)) => {
                f.write_str("SELECT")?;
                for variable in variables {
                    write!(f, " {variable}")?;
                }
            }
            QueryForm::Construct(template) => write!(f, "CONSTRUCT ({} triples)", template.len())?,
            QueryForm::Describe(targets) => {
                f.write_str("DESCRIBE")?;
                for target in targets {
                    write!(f, " {target}")?;
                }
            }
            QueryForm::Ask => f.write_str("ASK")?,
        }
        write!(f, " WHERE ({} groups)", self.where_groups.len())?;
        if self.distinct {
            f.write_str(" DISTINCT")?;
        }
        if !self.order.is_empty() {
            write!(f, " ORDER BY ({} keys)", self.order.len())?;
        }
        if self.offset > 0 {
            write!(f, " OFFSET {}", self.offset)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        Ok(())
    }
}

/// The shape of the results of a [Query].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryForm {
    /// Produces one solution per binding.
    Select(Selection),
    /// Instantiates the template for every binding.
    Construct(Vec<TriplePattern>),
    /// Produces the triples that have one of the targets as their subject.
    Describe(Vec<NamedNodePattern>),
    /// Produces whether there is at least one binding.
    Ask,
}

/// The variables of a `SELECT` query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// The given variables in the given order.
    Variables(Vec<Variable>),
    /// Every variable of a binding, in the order in which they were bound.
    All,
}

/// A node of the `WHERE` clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Group {
    /// A basic graph pattern that is handed to the pattern matcher.
    Pattern(Vec<TriplePattern>),
    /// The children are evaluated one after another. Each child extends the bindings of the
    /// previous one.
    Sequence(Vec<Group>),
    /// Like [Group::Sequence], but the pattern matcher is asked to keep bindings without a match.
    Optional(Vec<Group>),
    /// Each child is evaluated on its own copy of the input and the results are merged.
    Union(Vec<Group>),
    /// Removes the bindings of `inner` for which `expression` is not true.
    Filter {
        expression: Expression,
        inner: Box<Group>,
    },
}

impl Group {
    fn collect_variables(&self, variables: &mut Vec<Variable>) {
        match self {
            Group::Pattern(patterns) => {
                for pattern in patterns {
                    for variable in pattern_variables(pattern) {
                        if !variables.contains(variable) {
                            variables.push(variable.clone());
                        }
                    }
                }
            }
            Group::Sequence(children) | Group::Optional(children) | Group::Union(children) => {
                for child in children {
                    child.collect_variables(variables);
                }
            }
            Group::Filter { inner, .. } => inner.collect_variables(variables),
        }
    }
}

fn pattern_variables(pattern: &TriplePattern) -> impl Iterator<Item = &Variable> {
    let subject = match &pattern.subject {
        TermPattern::Variable(variable) => Some(variable),
        _ => None,
    };
    let predicate = match &pattern.predicate {
        NamedNodePattern::Variable(variable) => Some(variable),
        NamedNodePattern::NamedNode(_) => None,
    };
    let object = match &pattern.object {
        TermPattern::Variable(variable) => Some(variable),
        _ => None,
    };
    [subject, predicate, object].into_iter().flatten()
}

/// Either the text of a query or an already parsed [Query].
#[derive(Clone, Debug)]
pub enum QueryInput {
    Text(String),
    Parsed(Query),
}

impl QueryInput {
    /// Returns the parsed query.
    ///
    /// # Errors
    ///
    /// See [Query::parse].
    pub fn into_query(self, options: &QueryOptions) -> Result<Query, QueryError> {
        match self {
            QueryInput::Text(text) => Query::parse(&text, options),
            QueryInput::Parsed(query) => Ok(query),
        }
    }
}

impl From<&str> for QueryInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for QueryInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Query> for QueryInput {
    fn from(value: Query) -> Self {
        Self::Parsed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(subject: &str, predicate: &str, object: &str) -> TriplePattern {
        fn term(value: &str) -> TermPattern {
            match value.strip_prefix('?') {
                Some(name) => Variable::new_unchecked(name).into(),
                None => NamedNode::new_unchecked(value).into(),
            }
        }
        let predicate = match predicate.strip_prefix('?') {
            Some(name) => Variable::new_unchecked(name).into(),
            None => NamedNode::new_unchecked(predicate).into(),
        };
        TriplePattern {
            subject: term(subject),
            predicate,
            object: term(object),
        }
    }

    #[test]
    fn test_visible_variables_in_order_of_occurrence() {
        let query = Query::new(
            QueryForm::Select(Selection::All),
            vec![
                Group::Pattern(vec![triple("?s", "?p", "http://example.com/o")]),
                Group::Union(vec![
                    Group::Pattern(vec![triple("?o", "http://example.com/p", "?s")]),
                    Group::Pattern(vec![triple("?x", "?p", "?o")]),
                ]),
            ],
        );
        let variables = query.visible_variables();
        let names = variables.iter().map(Variable::as_str).collect::<Vec<_>>();
        assert_eq!(names, ["s", "p", "o", "x"]);
    }

    #[test]
    fn test_display() {
        let mut query = Query::new(
            QueryForm::Select(Selection::Variables(vec![Variable::new_unchecked("s")])),
            vec![Group::Pattern(vec![triple("?s", "?p", "?o")])],
        );
        query.distinct = true;
        query.limit = Some(5);
        assert_eq!(query.to_string(), "SELECT ?s WHERE (1 groups) DISTINCT LIMIT 5");
    }
}
