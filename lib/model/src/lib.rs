mod binding;
mod error;
mod skolem;
mod xsd;

pub use binding::*;
pub use error::*;
pub use skolem::*;
pub use xsd::*;

// Re-export some oxrdf types.
pub use oxrdf::vocab;
pub use oxrdf::{
    BlankNode, BlankNodeRef, Graph, IriParseError, Literal, LiteralRef, NamedNode, NamedNodeRef,
    Quad, Subject, SubjectRef, Term, TermRef, Triple, TripleRef, Variable, VariableNameParseError,
    VariableRef,
};

// Re-export the XSD value types of numeric literals.
pub use oxsdatatypes::{Decimal, Double, Float, Integer};

// Re-export the parts of the SPARQL algebra that the query model is built from.
pub use spargebra::algebra::{Expression, Function, OrderExpression};
pub use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};
