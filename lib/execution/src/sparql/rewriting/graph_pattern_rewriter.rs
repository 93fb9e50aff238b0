use crate::sparql::algebra::{Group, Query, QueryForm, Selection};
use crate::sparql::error::QueryError;
use ldf_model::{Expression, NamedNode, NamedNodePattern, OrderExpression, Variable};
use spargebra::algebra::GraphPattern;

/// Rewrites a parsed SPARQL query into a [Query].
///
/// The solution modifiers that wrap the `WHERE` clause become fields of the query and the
/// remaining graph pattern is rewritten into a [Group] tree. Graph patterns without a counterpart
/// in the group tree are rejected with [QueryError::UnsupportedQuery].
#[derive(Debug, Default)]
pub struct GraphPatternRewriter;

/// The solution modifiers that have been peeled off a graph pattern.
struct SolutionModifiers<'a> {
    pattern: &'a GraphPattern,
    projection: Option<Vec<Variable>>,
    order: Vec<OrderExpression>,
    offset: usize,
    limit: Option<usize>,
    distinct: bool,
    /// Variables that are bound to a constant IRI (e.g., `DESCRIBE <iri>`).
    constants: Vec<(Variable, NamedNode)>,
}

impl GraphPatternRewriter {
    pub fn new() -> Self {
        Self
    }

    pub fn rewrite(&self, query: &spargebra::Query) -> Result<Query, QueryError> {
        match query {
            spargebra::Query::Select {
                dataset, pattern, ..
            } => {
                if dataset.is_some() {
                    return QueryError::unsupported("FROM clauses are not supported");
                }
                let modifiers = peel_solution_modifiers(pattern, false);
                let selection = match &modifiers.projection {
                    Some(variables) => Selection::Variables(variables.clone()),
                    None => Selection::All,
                };
                self.rewrite_query(QueryForm::Select(selection), modifiers)
            }
            spargebra::Query::Construct {
                template,
                dataset,
                pattern,
                ..
            } => {
                if dataset.is_some() {
                    return QueryError::unsupported("FROM clauses are not supported");
                }
                let modifiers = peel_solution_modifiers(pattern, false);
                self.rewrite_query(QueryForm::Construct(template.clone()), modifiers)
            }
            spargebra::Query::Describe {
                dataset, pattern, ..
            } => {
                if dataset.is_some() {
                    return QueryError::unsupported("FROM clauses are not supported");
                }
                let modifiers = peel_solution_modifiers(pattern, true);
                let targets = modifiers
                    .projection
                    .iter()
                    .flatten()
                    .map(|variable| {
                        modifiers
                            .constants
                            .iter()
                            .find(|(constant, _)| constant == variable)
                            .map_or_else(
                                || NamedNodePattern::Variable(variable.clone()),
                                |(_, node)| NamedNodePattern::NamedNode(node.clone()),
                            )
                    })
                    .collect();
                self.rewrite_query(QueryForm::Describe(targets), modifiers)
            }
            spargebra::Query::Ask {
                dataset, pattern, ..
            } => {
                if dataset.is_some() {
                    return QueryError::unsupported("FROM clauses are not supported");
                }
                let modifiers = peel_solution_modifiers(pattern, false);
                self.rewrite_query(QueryForm::Ask, modifiers)
            }
        }
    }

    fn rewrite_query(
        &self,
        form: QueryForm,
        modifiers: SolutionModifiers<'_>,
    ) -> Result<Query, QueryError> {
        let where_groups = match self.rewrite_graph_pattern(modifiers.pattern)? {
            Group::Sequence(children) => children,
            group => vec![group],
        };
        Ok(Query {
            form,
            where_groups,
            order: modifiers.order,
            offset: modifiers.offset,
            limit: modifiers.limit,
            distinct: modifiers.distinct,
        })
    }

    fn rewrite_graph_pattern(&self, pattern: &GraphPattern) -> Result<Group, QueryError> {
        match pattern {
            GraphPattern::Bgp { patterns } if patterns.is_empty() => Ok(Group::Sequence(Vec::new())),
            GraphPattern::Bgp { patterns } => Ok(Group::Pattern(patterns.clone())),
            GraphPattern::Join { left, right } => {
                let mut children = Vec::new();
                push_sequence_child(&mut children, self.rewrite_graph_pattern(left)?);
                push_sequence_child(&mut children, self.rewrite_graph_pattern(right)?);
                Ok(Group::Sequence(children))
            }
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => {
                let mut right = self.rewrite_graph_pattern(right)?;
                if let Some(expression) = expression {
                    right = Group::Filter {
                        expression: expression.clone(),
                        inner: Box::new(right),
                    };
                }
                let mut children = Vec::new();
                push_sequence_child(&mut children, self.rewrite_graph_pattern(left)?);
                children.push(Group::Optional(vec![right]));
                Ok(Group::Sequence(children))
            }
            GraphPattern::Filter { expr, inner } => Ok(Group::Filter {
                expression: expr.clone(),
                inner: Box::new(self.rewrite_graph_pattern(inner)?),
            }),
            GraphPattern::Union { left, right } => {
                let mut children = Vec::new();
                for child in [left, right] {
                    match self.rewrite_graph_pattern(child)? {
                        Group::Union(grandchildren) => children.extend(grandchildren),
                        group => children.push(group),
                    }
                }
                Ok(Group::Union(children))
            }
            pattern => QueryError::unsupported(format!(
                "{} cannot be evaluated by the client",
                pattern_name(pattern)
            )),
        }
    }
}

fn push_sequence_child(children: &mut Vec<Group>, group: Group) {
    match group {
        Group::Sequence(grandchildren) => children.extend(grandchildren),
        group => children.push(group),
    }
}

/// Peels the solution modifiers in the order in which the SPARQL parser nests them.
fn peel_solution_modifiers(pattern: &GraphPattern, describe: bool) -> SolutionModifiers<'_> {
    let mut modifiers = SolutionModifiers {
        pattern,
        projection: None,
        order: Vec::new(),
        offset: 0,
        limit: None,
        distinct: false,
        constants: Vec::new(),
    };

    if let GraphPattern::Slice {
        inner,
        start,
        length,
    } = modifiers.pattern
    {
        modifiers.offset = *start;
        modifiers.limit = *length;
        modifiers.pattern = inner;
    }
    if let GraphPattern::Distinct { inner } | GraphPattern::Reduced { inner } = modifiers.pattern {
        modifiers.distinct = true;
        modifiers.pattern = inner;
    }
    if let GraphPattern::Project { inner, variables } = modifiers.pattern {
        modifiers.projection = Some(variables.clone());
        modifiers.pattern = inner;
    }
    if let GraphPattern::OrderBy { inner, expression } = modifiers.pattern {
        modifiers.order.clone_from(expression);
        modifiers.pattern = inner;
    }
    if describe {
        while let GraphPattern::Extend {
            inner,
            variable,
            expression: Expression::NamedNode(node),
        } = modifiers.pattern
        {
            modifiers.constants.push((variable.clone(), node.clone()));
            modifiers.pattern = inner;
        }
    }
    modifiers
}

fn pattern_name(pattern: &GraphPattern) -> &'static str {
    match pattern {
        GraphPattern::Path { .. } => "Property paths",
        GraphPattern::Graph { .. } => "GRAPH",
        GraphPattern::Extend { .. } => "BIND",
        GraphPattern::Minus { .. } => "MINUS",
        GraphPattern::Values { .. } => "VALUES",
        GraphPattern::Group { .. } => "Aggregates",
        GraphPattern::Service { .. } => "SERVICE",
        GraphPattern::Project { .. }
        | GraphPattern::Slice { .. }
        | GraphPattern::OrderBy { .. }
        | GraphPattern::Distinct { .. }
        | GraphPattern::Reduced { .. } => "Sub-queries",
        _ => "The graph pattern",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::QueryOptions;

    fn parse(query: &str) -> Result<Query, QueryError> {
        Query::parse(query, &QueryOptions::default())
    }

    #[test]
    fn test_bgp_is_single_pattern_group() {
        let query = parse("SELECT ?s WHERE { ?s ?p ?o . ?o ?q ?r }").unwrap();
        assert_eq!(query.where_groups.len(), 1);
        assert!(matches!(&query.where_groups[0], Group::Pattern(patterns) if patterns.len() == 2));
        assert_eq!(
            query.form,
            QueryForm::Select(Selection::Variables(vec![Variable::new_unchecked("s")]))
        );
    }

    #[test]
    fn test_optional_becomes_sequence_with_optional_group() {
        let query = parse("SELECT * WHERE { ?s ?p ?o OPTIONAL { ?o ?q ?r } }").unwrap();
        assert_eq!(query.where_groups.len(), 2);
        assert!(matches!(&query.where_groups[0], Group::Pattern(_)));
        assert!(matches!(
            &query.where_groups[1],
            Group::Optional(children) if matches!(children.as_slice(), [Group::Pattern(_)])
        ));
    }

    #[test]
    fn test_optional_with_filter() {
        let query =
            parse("SELECT * WHERE { ?s ?p ?o OPTIONAL { ?o ?q ?r FILTER(?r > 2) } }").unwrap();
        let Group::Optional(children) = &query.where_groups[1] else {
            panic!("Expected an optional group");
        };
        assert!(matches!(children.as_slice(), [Group::Filter { .. }]));
    }

    #[test]
    fn test_unions_are_flattened() {
        let query = parse(
            "SELECT * WHERE { { ?s <http://a> ?o } UNION { ?s <http://b> ?o } UNION { ?s <http://c> ?o } }",
        )
        .unwrap();
        assert!(matches!(
            query.where_groups.as_slice(),
            [Group::Union(children)] if children.len() == 3
        ));
    }

    #[test]
    fn test_filter_wraps_pattern() {
        let query = parse("ASK { ?s ?p ?o FILTER(isIRI(?o)) }").unwrap();
        assert_eq!(query.form, QueryForm::Ask);
        assert!(matches!(
            query.where_groups.as_slice(),
            [Group::Filter { inner, .. }] if matches!(inner.as_ref(), Group::Pattern(_))
        ));
    }

    #[test]
    fn test_solution_modifiers() {
        let query = parse(
            "SELECT DISTINCT ?s WHERE { ?s ?p ?o } ORDER BY DESC(?s) ?o LIMIT 5 OFFSET 2",
        )
        .unwrap();
        assert!(query.distinct);
        assert_eq!(query.order.len(), 2);
        assert!(matches!(query.order[0], OrderExpression::Desc(_)));
        assert_eq!(query.offset, 2);
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_prefixes_from_options() {
        let mut options = QueryOptions::default();
        options
            .prefixes
            .insert("ex".to_owned(), "http://example.com/".to_owned());
        let query = Query::parse("SELECT ?s WHERE { ?s ex:p ?o }", &options).unwrap();
        let Group::Pattern(patterns) = &query.where_groups[0] else {
            panic!("Expected a pattern group");
        };
        assert_eq!(
            patterns[0].predicate,
            NamedNodePattern::NamedNode(NamedNode::new_unchecked("http://example.com/p"))
        );
    }

    #[test]
    fn test_query_prefixes_override_options() {
        let options = QueryOptions::default().with_prefix("ex", "http://other.example.com/");
        let query = Query::parse(
            "PREFIX ex: <http://example.com/> SELECT ?s WHERE { ?s ex:p ?o }",
            &options,
        )
        .unwrap();
        let Group::Pattern(patterns) = &query.where_groups[0] else {
            panic!("Expected a pattern group");
        };
        assert_eq!(
            patterns[0].predicate,
            NamedNodePattern::NamedNode(NamedNode::new_unchecked("http://example.com/p"))
        );
    }

    #[test]
    fn test_invalid_prefix_iri() {
        let options = QueryOptions::default().with_prefix("ex", "not an iri");
        let result = Query::parse("SELECT ?s WHERE { ?s ex:p ?o }", &options);
        assert!(matches!(result, Err(QueryError::InvalidIri(_))));
    }

    #[test]
    fn test_describe_with_iri() {
        let query = parse("DESCRIBE <http://example.com/s>").unwrap();
        assert_eq!(
            query.form,
            QueryForm::Describe(vec![NamedNodePattern::NamedNode(NamedNode::new_unchecked(
                "http://example.com/s"
            ))])
        );
        assert!(query.where_groups.is_empty());
    }

    #[test]
    fn test_invalid_query() {
        assert!(matches!(
            parse("SELECT ?s WHERE { ?s ?p"),
            Err(QueryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_unsupported_pattern() {
        let error = parse("SELECT * WHERE { ?s ?p ?o MINUS { ?s <http://a> ?o } }").unwrap_err();
        assert!(matches!(&error, QueryError::UnsupportedQuery(message) if message.contains("MINUS")));
    }

    #[test]
    fn test_from_is_unsupported() {
        assert!(matches!(
            parse("SELECT * FROM <http://example.com/g> WHERE { ?s ?p ?o }"),
            Err(QueryError::UnsupportedQuery(_))
        ));
    }
}
