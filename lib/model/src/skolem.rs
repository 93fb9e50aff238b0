use oxrdf::{BlankNode, BlankNodeRef, NamedNode, Term};
use regex::Regex;
use std::sync::LazyLock;

/// The base that is used to skolemize blank nodes if no other base is given.
pub const DEFAULT_SKOLEM_BASE: &str = "http://localhost";

#[allow(clippy::expect_used, reason = "The pattern is a valid regex")]
static GENID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/]+/\.well-known/genid/(.+)$").expect("Valid genid pattern")
});

/// Replaces a blank node by a [Skolem IRI](https://www.w3.org/TR/rdf11-concepts/#section-skolemization)
/// below `base` (e.g., `http://example.com`).
pub fn skolemize(blank_node: BlankNodeRef<'_>, base: &str) -> NamedNode {
    let base = base.trim_end_matches('/');
    NamedNode::new_unchecked(format!("{base}/.well-known/genid/{}", blank_node.as_str()))
}

/// Returns whether `term` is a Skolem IRI.
pub fn is_skolemized(term: &Term) -> bool {
    matches!(term, Term::NamedNode(node) if GENID.is_match(node.as_str()))
}

/// Turns a Skolem IRI back into a blank node. Any other term is returned unchanged.
///
/// Characters of the Skolem identifier that are not allowed in a blank node label are replaced by
/// `_`.
pub fn deskolemize(term: Term) -> Term {
    let Term::NamedNode(node) = term else {
        return term;
    };
    let Some(id) = GENID.captures(node.as_str()).and_then(|c| c.get(1)) else {
        return node.into();
    };
    let label = id
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();
    BlankNode::new_unchecked(label).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::Literal;

    #[test]
    fn test_skolemize_roundtrip() {
        let blank_node = BlankNode::new_unchecked("b0");
        let skolem = skolemize(blank_node.as_ref(), "http://example.com/");
        assert_eq!(
            skolem.as_str(),
            "http://example.com/.well-known/genid/b0"
        );
        assert!(is_skolemized(&skolem.clone().into()));
        assert_eq!(deskolemize(skolem.into()), Term::from(blank_node));
    }

    #[test]
    fn test_deskolemize_replaces_invalid_characters() {
        let term = NamedNode::new_unchecked("https://example.com/.well-known/genid/a-b.c");
        assert_eq!(
            deskolemize(term.into()),
            Term::from(BlankNode::new_unchecked("a_b_c"))
        );
    }

    #[test]
    fn test_deskolemize_keeps_other_terms() {
        let iri: Term = NamedNode::new_unchecked("http://example.com/genid/a").into();
        assert_eq!(deskolemize(iri.clone()), iri);

        let literal: Term = Literal::new_simple_literal("http://example.com/.well-known/genid/a").into();
        assert_eq!(deskolemize(literal.clone()), literal);
    }
}
