//! The results of a query.
//!
//! Each query form has its own stream type. All of them are lazy. Nothing is evaluated before the
//! first item is polled, and dropping a stream stops the evaluation.

use crate::sparql::error::QueryEvaluationError;
use futures::{stream, StreamExt};
use ldf_model::{Variable, VariableRef};
use oxrdfio::{RdfFormat, RdfSerializer};
use sparesults::{
    QueryResultsFormat, QueryResultsParseError, QueryResultsParser, QueryResultsSerializer,
    ReaderQueryResultsParserOutput,
};
use std::io::{Read, Write};
use std::sync::Arc;

mod boolean;
mod query_solution;
mod triples;

pub use boolean::QueryBooleanStream;
pub use query_solution::QuerySolutionStream;
pub(crate) use query_solution::solution_key;
pub use sparesults::QuerySolution;
pub use triples::QueryTripleStream;

/// Results of a [SPARQL query](https://www.w3.org/TR/sparql11-query/).
pub enum QueryResults {
    /// Results of a [SELECT](https://www.w3.org/TR/sparql11-query/#select) query.
    Solutions(QuerySolutionStream),
    /// Result of a [ASK](https://www.w3.org/TR/sparql11-query/#ask) query.
    Boolean(QueryBooleanStream),
    /// Results of a [CONSTRUCT](https://www.w3.org/TR/sparql11-query/#construct) or
    /// [DESCRIBE](https://www.w3.org/TR/sparql11-query/#describe) query.
    Graph(QueryTripleStream),
}

impl QueryResults {
    /// Reads a SPARQL query results serialization.
    ///
    /// The solutions are read eagerly.
    pub fn read(reader: impl Read, format: QueryResultsFormat) -> Result<Self, QueryResultsParseError> {
        Ok(match QueryResultsParser::from_format(format).for_reader(reader)? {
            ReaderQueryResultsParserOutput::Solutions(solutions) => {
                let variables: Arc<[Variable]> = solutions.variables().into();
                let solutions = solutions
                    .map(|solution| solution.map_err(QueryEvaluationError::from_source))
                    .collect::<Vec<_>>();
                Self::Solutions(QuerySolutionStream::new(variables, stream::iter(solutions)))
            }
            ReaderQueryResultsParserOutput::Boolean(value) => Self::Boolean(value.into()),
        })
    }

    /// Writes the query results (solutions or boolean).
    ///
    /// Graph results are written as solutions with the variables `subject`, `predicate` and
    /// `object`.
    pub async fn write<W: Write>(
        self,
        writer: W,
        format: QueryResultsFormat,
    ) -> Result<W, QueryEvaluationError> {
        let serializer = QueryResultsSerializer::from_format(format);
        match self {
            Self::Boolean(value) => serializer.serialize_boolean_to_writer(writer, value.value().await?),
            Self::Solutions(mut solutions) => {
                let mut serializer = serializer
                    .serialize_solutions_to_writer(writer, solutions.variables().to_vec())
                    .map_err(QueryEvaluationError::ResultsSerialization)?;
                while let Some(solution) = solutions.next().await {
                    serializer
                        .serialize(&solution?)
                        .map_err(QueryEvaluationError::ResultsSerialization)?;
                }
                serializer.finish()
            }
            Self::Graph(mut triples) => {
                let s = VariableRef::new_unchecked("subject");
                let p = VariableRef::new_unchecked("predicate");
                let o = VariableRef::new_unchecked("object");
                let mut serializer = serializer
                    .serialize_solutions_to_writer(
                        writer,
                        vec![s.into_owned(), p.into_owned(), o.into_owned()],
                    )
                    .map_err(QueryEvaluationError::ResultsSerialization)?;

                while let Some(triple) = triples.next().await {
                    let triple = triple?;
                    serializer
                        .serialize([
                            (s, &triple.subject.into()),
                            (p, &triple.predicate.into()),
                            (o, &triple.object),
                        ])
                        .map_err(QueryEvaluationError::ResultsSerialization)?;
                }

                serializer.finish()
            }
        }
        .map_err(QueryEvaluationError::ResultsSerialization)
    }

    /// Writes the graph query results.
    ///
    /// This method fails if it is called on the `Solution` or `Boolean` results.
    pub async fn write_graph<W: Write>(
        self,
        writer: W,
        format: impl Into<RdfFormat>,
    ) -> Result<W, QueryEvaluationError> {
        if let Self::Graph(mut triples) = self {
            let mut serializer = RdfSerializer::from_format(format.into()).for_writer(writer);

            while let Some(triple) = triples.next().await {
                serializer
                    .serialize_triple(&triple?)
                    .map_err(QueryEvaluationError::ResultsSerialization)?;
            }

            serializer
                .finish()
                .map_err(QueryEvaluationError::ResultsSerialization)
        } else {
            Err(QueryEvaluationError::NotAGraph)
        }
    }
}

impl From<QuerySolutionStream> for QueryResults {
    #[inline]
    fn from(value: QuerySolutionStream) -> Self {
        Self::Solutions(value)
    }
}

impl From<QueryBooleanStream> for QueryResults {
    #[inline]
    fn from(value: QueryBooleanStream) -> Self {
        Self::Boolean(value)
    }
}

impl From<QueryTripleStream> for QueryResults {
    #[inline]
    fn from(value: QueryTripleStream) -> Self {
        Self::Graph(value)
    }
}
