//! Evaluation of SPARQL expressions against a single [Binding].

use crate::sparql::error::EvaluationError;
use ldf_model::vocab::xsd;
use ldf_model::{Binding, Expression, Function, Literal, Numeric, NumericPair, Term};
use regex::RegexBuilder;
use std::cmp::Ordering;

/// Evaluates the expressions of `FILTER` and `ORDER BY` clauses.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluates `expression` for the variables of `binding`.
    ///
    /// # Errors
    ///
    /// If the expression cannot be evaluated for this binding (e.g., an unbound variable or a type
    /// error). The error only affects this binding.
    fn evaluate(&self, expression: &Expression, binding: &Binding) -> Result<Term, EvaluationError>;
}

/// An [ExpressionEvaluator] for the operators and functions that are common in filters.
///
/// Supported are the logical and comparison operators, arithmetic on numeric literals, `IN`,
/// `IF`, `COALESCE`, `BOUND`, the accessors `STR`, `LANG` and `DATATYPE`, the type tests, and the
/// string functions `STRLEN`, `UCASE`, `LCASE`, `CONTAINS`, `STRSTARTS`, `STRENDS`,
/// `LANGMATCHES` and `REGEX`. Everything else is reported as [EvaluationError::Unsupported].
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleExpressionEvaluator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ExpressionEvaluator for SimpleExpressionEvaluator {
    fn evaluate(&self, expression: &Expression, binding: &Binding) -> Result<Term, EvaluationError> {
        match expression {
            Expression::NamedNode(node) => Ok(node.clone().into()),
            Expression::Literal(literal) => Ok(literal.clone().into()),
            Expression::Variable(variable) => binding
                .get(variable)
                .cloned()
                .ok_or_else(|| EvaluationError::UnboundVariable(variable.clone())),
            Expression::Or(lhs, rhs) => {
                let lhs = self.evaluate_boolean(lhs, binding);
                let rhs = self.evaluate_boolean(rhs, binding);
                match (lhs, rhs) {
                    (Ok(true), _) | (_, Ok(true)) => Ok(boolean(true)),
                    (Ok(false), Ok(false)) => Ok(boolean(false)),
                    (Err(error), _) | (_, Err(error)) => Err(error),
                }
            }
            Expression::And(lhs, rhs) => {
                let lhs = self.evaluate_boolean(lhs, binding);
                let rhs = self.evaluate_boolean(rhs, binding);
                match (lhs, rhs) {
                    (Ok(false), _) | (_, Ok(false)) => Ok(boolean(false)),
                    (Ok(true), Ok(true)) => Ok(boolean(true)),
                    (Err(error), _) | (_, Err(error)) => Err(error),
                }
            }
            Expression::Not(inner) => Ok(boolean(!self.evaluate_boolean(inner, binding)?)),
            Expression::Equal(lhs, rhs) => {
                let lhs = self.evaluate(lhs, binding)?;
                let rhs = self.evaluate(rhs, binding)?;
                Ok(boolean(equals(&lhs, &rhs)))
            }
            Expression::SameTerm(lhs, rhs) => {
                Ok(boolean(self.evaluate(lhs, binding)? == self.evaluate(rhs, binding)?))
            }
            Expression::Greater(lhs, rhs) => self.compare(lhs, rhs, binding, Ordering::is_gt),
            Expression::GreaterOrEqual(lhs, rhs) => {
                self.compare(lhs, rhs, binding, Ordering::is_ge)
            }
            Expression::Less(lhs, rhs) => self.compare(lhs, rhs, binding, Ordering::is_lt),
            Expression::LessOrEqual(lhs, rhs) => self.compare(lhs, rhs, binding, Ordering::is_le),
            Expression::In(needle, haystack) => {
                let needle = self.evaluate(needle, binding)?;
                let mut error = None;
                for candidate in haystack {
                    match self.evaluate(candidate, binding) {
                        Ok(candidate) if equals(&needle, &candidate) => return Ok(boolean(true)),
                        Ok(_) => {}
                        Err(e) => error = Some(e),
                    }
                }
                error.map_or(Ok(boolean(false)), Err)
            }
            Expression::Add(lhs, rhs) => {
                self.arithmetic(ArithmeticOperator::Add, lhs, rhs, binding)
            }
            Expression::Subtract(lhs, rhs) => {
                self.arithmetic(ArithmeticOperator::Subtract, lhs, rhs, binding)
            }
            Expression::Multiply(lhs, rhs) => {
                self.arithmetic(ArithmeticOperator::Multiply, lhs, rhs, binding)
            }
            Expression::Divide(lhs, rhs) => {
                self.arithmetic(ArithmeticOperator::Divide, lhs, rhs, binding)
            }
            Expression::UnaryPlus(inner) => {
                let value = self.evaluate(inner, binding)?;
                numeric(&value)?;
                Ok(value)
            }
            Expression::UnaryMinus(inner) => {
                let value = numeric(&self.evaluate(inner, binding)?)?
                    .checked_neg()
                    .ok_or_else(|| EvaluationError::TypeError("Numeric overflow".to_owned()))?;
                Ok(Literal::from(value).into())
            }
            Expression::Bound(variable) => Ok(boolean(binding.contains(variable))),
            Expression::If(condition, then, otherwise) => {
                if self.evaluate_boolean(condition, binding)? {
                    self.evaluate(then, binding)
                } else {
                    self.evaluate(otherwise, binding)
                }
            }
            Expression::Coalesce(alternatives) => {
                let mut last_error = None;
                for alternative in alternatives {
                    match self.evaluate(alternative, binding) {
                        Ok(value) => return Ok(value),
                        Err(error) => last_error = Some(error),
                    }
                }
                Err(last_error.unwrap_or_else(|| {
                    EvaluationError::TypeError("COALESCE without a bound value".to_owned())
                }))
            }
            Expression::FunctionCall(function, arguments) => {
                self.call(function, arguments, binding)
            }
            Expression::Exists(_) => Err(EvaluationError::Unsupported("EXISTS".to_owned())),
        }
    }
}

impl SimpleExpressionEvaluator {
    fn evaluate_boolean(
        &self,
        expression: &Expression,
        binding: &Binding,
    ) -> Result<bool, EvaluationError> {
        effective_boolean_value(&self.evaluate(expression, binding)?)
    }

    fn compare(
        &self,
        lhs: &Expression,
        rhs: &Expression,
        binding: &Binding,
        accept: impl FnOnce(Ordering) -> bool,
    ) -> Result<Term, EvaluationError> {
        let lhs = self.evaluate(lhs, binding)?;
        let rhs = self.evaluate(rhs, binding)?;
        Ok(boolean(accept(compare_terms(&lhs, &rhs)?)))
    }

    fn arithmetic(
        &self,
        operator: ArithmeticOperator,
        lhs: &Expression,
        rhs: &Expression,
        binding: &Binding,
    ) -> Result<Term, EvaluationError> {
        let lhs = numeric(&self.evaluate(lhs, binding)?)?;
        let rhs = numeric(&self.evaluate(rhs, binding)?)?;
        Ok(Literal::from(apply_arithmetic(operator, lhs, rhs)?).into())
    }

    fn call(
        &self,
        function: &Function,
        arguments: &[Expression],
        binding: &Binding,
    ) -> Result<Term, EvaluationError> {
        let arguments = arguments
            .iter()
            .map(|argument| self.evaluate(argument, binding))
            .collect::<Result<Vec<_>, _>>()?;
        match (function, arguments.as_slice()) {
            (Function::Str, [Term::NamedNode(node)]) => {
                Ok(Literal::new_simple_literal(node.as_str()).into())
            }
            (Function::Str, [Term::Literal(literal)]) => {
                Ok(Literal::new_simple_literal(literal.value()).into())
            }
            (Function::Lang, [Term::Literal(literal)]) => {
                Ok(Literal::new_simple_literal(literal.language().unwrap_or_default()).into())
            }
            (Function::Datatype, [Term::Literal(literal)]) => {
                Ok(literal.datatype().into_owned().into())
            }
            (Function::IsIri, [term]) => Ok(boolean(term.is_named_node())),
            (Function::IsBlank, [term]) => Ok(boolean(term.is_blank_node())),
            (Function::IsLiteral, [term]) => Ok(boolean(term.is_literal())),
            (Function::IsNumeric, [term]) => Ok(boolean(numeric(term).is_ok())),
            (Function::StrLen, [term]) => {
                let length = string_literal(term)?.value().chars().count();
                let length = i64::try_from(length)
                    .map_err(|_| EvaluationError::TypeError("String too long".to_owned()))?;
                Ok(Literal::from(length).into())
            }
            (Function::UCase, [term]) => {
                let literal = string_literal(term)?;
                Ok(with_language_of(literal, literal.value().to_uppercase()).into())
            }
            (Function::LCase, [term]) => {
                let literal = string_literal(term)?;
                Ok(with_language_of(literal, literal.value().to_lowercase()).into())
            }
            (Function::Contains, [haystack, needle]) => {
                let (haystack, needle) = string_arguments(haystack, needle)?;
                Ok(boolean(haystack.contains(needle)))
            }
            (Function::StrStarts, [haystack, needle]) => {
                let (haystack, needle) = string_arguments(haystack, needle)?;
                Ok(boolean(haystack.starts_with(needle)))
            }
            (Function::StrEnds, [haystack, needle]) => {
                let (haystack, needle) = string_arguments(haystack, needle)?;
                Ok(boolean(haystack.ends_with(needle)))
            }
            (Function::LangMatches, [tag, range]) => {
                let tag = string_literal(tag)?.value();
                let range = string_literal(range)?.value();
                Ok(boolean(language_matches(tag, range)))
            }
            (Function::Regex, [text, pattern]) => regex_matches(text, pattern, None),
            (Function::Regex, [text, pattern, flags]) => regex_matches(text, pattern, Some(flags)),
            (
                Function::Str
                | Function::Lang
                | Function::Datatype
                | Function::IsIri
                | Function::IsBlank
                | Function::IsLiteral
                | Function::IsNumeric
                | Function::StrLen
                | Function::UCase
                | Function::LCase
                | Function::Contains
                | Function::StrStarts
                | Function::StrEnds
                | Function::LangMatches
                | Function::Regex,
                _,
            ) => EvaluationError::type_error(format!(
                "Invalid arguments for {function}: {}",
                arguments
                    .iter()
                    .map(Term::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            (function, _) => Err(EvaluationError::Unsupported(function.to_string())),
        }
    }
}

/// Returns whether a filter keeps a binding for which the filter expression evaluated to `value`.
///
/// Only literals with the lexical form `false` or `0` reject the binding.
pub fn is_truthy(value: &Term) -> bool {
    !matches!(value, Term::Literal(literal) if matches!(literal.value(), "false" | "0"))
}

/// Compares two `ORDER BY` keys. A key that could not be evaluated is passed as [None] and sorts
/// like the empty string.
///
/// Two numeric literals are compared by their value. Any other pair of keys is compared by
/// their lexical forms.
pub fn compare_order_keys(lhs: Option<&Term>, rhs: Option<&Term>) -> Ordering {
    if let (Some(Term::Literal(lhs)), Some(Term::Literal(rhs))) = (lhs, rhs) {
        let lhs = Numeric::from_literal(lhs.as_ref());
        let rhs = Numeric::from_literal(rhs.as_ref());
        if let Some(ordering) = lhs.zip(rhs).and_then(|(l, r)| l.partial_cmp_numeric(r)) {
            return ordering;
        }
    }
    let lhs = lhs.map_or("", lexical_form);
    let rhs = rhs.map_or("", lexical_form);
    lhs.cmp(rhs)
}

fn boolean(value: bool) -> Term {
    Literal::from(value).into()
}

fn lexical_form(term: &Term) -> &str {
    match term {
        Term::NamedNode(node) => node.as_str(),
        Term::BlankNode(node) => node.as_str(),
        Term::Literal(literal) => literal.value(),
    }
}

fn numeric(term: &Term) -> Result<Numeric, EvaluationError> {
    match term {
        Term::Literal(literal) => Numeric::from_literal(literal.as_ref())
            .ok_or_else(|| EvaluationError::TypeError(format!("{term} is not a number"))),
        _ => EvaluationError::type_error(format!("{term} is not a number")),
    }
}

fn string_literal(term: &Term) -> Result<&Literal, EvaluationError> {
    match term {
        Term::Literal(literal)
            if literal.datatype() == xsd::STRING || literal.language().is_some() =>
        {
            Ok(literal)
        }
        _ => EvaluationError::type_error(format!("{term} is not a string")),
    }
}

fn string_arguments<'a>(
    lhs: &'a Term,
    rhs: &'a Term,
) -> Result<(&'a str, &'a str), EvaluationError> {
    let lhs = string_literal(lhs)?;
    let rhs = string_literal(rhs)?;
    if rhs.language().is_some() && lhs.language() != rhs.language() {
        return EvaluationError::type_error("Incompatible language tags");
    }
    Ok((lhs.value(), rhs.value()))
}

fn with_language_of(literal: &Literal, value: String) -> Literal {
    match literal.language() {
        Some(language) => Literal::new_language_tagged_literal_unchecked(value, language),
        None => Literal::new_simple_literal(value),
    }
}

fn language_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    if tag.len() < range.len() || !tag.is_char_boundary(range.len()) {
        return false;
    }
    let (prefix, rest) = tag.split_at(range.len());
    prefix.eq_ignore_ascii_case(range) && (rest.is_empty() || rest.starts_with('-'))
}

fn regex_matches(
    text: &Term,
    pattern: &Term,
    flags: Option<&Term>,
) -> Result<Term, EvaluationError> {
    let text = string_literal(text)?.value();
    let mut builder = RegexBuilder::new(string_literal(pattern)?.value());
    if let Some(flags) = flags {
        for flag in string_literal(flags)?.value().chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                _ => return EvaluationError::type_error(format!("Unknown regex flag {flag}")),
            };
        }
    }
    let regex = builder
        .build()
        .map_err(|error| EvaluationError::Regex(error.to_string()))?;
    Ok(boolean(regex.is_match(text)))
}

fn effective_boolean_value(term: &Term) -> Result<bool, EvaluationError> {
    let Term::Literal(literal) = term else {
        return EvaluationError::type_error(format!("{term} has no boolean value"));
    };
    if literal.datatype() == xsd::BOOLEAN {
        return match literal.value() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => EvaluationError::type_error(format!("{term} is not a valid boolean")),
        };
    }
    if literal.datatype() == xsd::STRING {
        return Ok(!literal.value().is_empty());
    }
    Ok(numeric(term)?.effective_boolean_value())
}

fn equals(lhs: &Term, rhs: &Term) -> bool {
    match (numeric(lhs), numeric(rhs)) {
        (Ok(lhs), Ok(rhs)) => lhs.partial_cmp_numeric(rhs) == Some(Ordering::Equal),
        _ => lhs == rhs,
    }
}

fn compare_terms(lhs: &Term, rhs: &Term) -> Result<Ordering, EvaluationError> {
    match (numeric(lhs), numeric(rhs)) {
        (Ok(l), Ok(r)) => l
            .partial_cmp_numeric(r)
            .ok_or_else(|| EvaluationError::TypeError(format!("{lhs} and {rhs} are unordered"))),
        _ => Ok(lexical_form(lhs).cmp(lexical_form(rhs))),
    }
}

fn apply_arithmetic(
    operator: ArithmeticOperator,
    lhs: Numeric,
    rhs: Numeric,
) -> Result<Numeric, EvaluationError> {
    let operands = NumericPair::promote(lhs, rhs);
    let value = match operator {
        ArithmeticOperator::Add => operands.checked_add(),
        ArithmeticOperator::Subtract => operands.checked_sub(),
        ArithmeticOperator::Multiply => operands.checked_mul(),
        ArithmeticOperator::Divide => operands.checked_div(),
    };
    value.ok_or_else(|| {
        EvaluationError::TypeError(format!("Numeric overflow or division by zero in {operator:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldf_model::{NamedNode, Variable};
    use spargebra::algebra::GraphPattern;

    fn evaluate_filter(filter: &str, binding: &Binding) -> Result<Term, EvaluationError> {
        let query = format!("SELECT * WHERE {{ ?s ?p ?o FILTER({filter}) }}");
        let query = spargebra::Query::parse(&query, None).unwrap();
        let spargebra::Query::Select { pattern, .. } = query else {
            panic!("Expected a SELECT query");
        };
        let mut pattern = &pattern;
        loop {
            match pattern {
                GraphPattern::Project { inner, .. } => pattern = inner,
                GraphPattern::Filter { expr, .. } => {
                    return SimpleExpressionEvaluator.evaluate(expr, binding);
                }
                _ => panic!("Unexpected pattern {pattern}"),
            }
        }
    }

    fn binding() -> Binding {
        [
            (Variable::new_unchecked("n"), Literal::from(5).into()),
            (
                Variable::new_unchecked("name"),
                Literal::new_language_tagged_literal_unchecked("Alice", "en-us").into(),
            ),
            (
                Variable::new_unchecked("iri"),
                NamedNode::new_unchecked("http://example.com/alice").into(),
            ),
        ]
        .into_iter()
        .collect()
    }

    fn truthy(filter: &str) -> bool {
        evaluate_filter(filter, &binding()).is_ok_and(|value| is_truthy(&value))
    }

    #[test]
    fn test_comparison_and_arithmetic() {
        assert!(truthy("?n > 4"));
        assert!(!truthy("?n < 4"));
        assert!(truthy("?n * 2 = 10"));
        assert!(truthy("?n / 2 = 2.5"));
        assert!(truthy("-?n < 0"));
        assert!(truthy("?n != 6"));
        assert!(truthy("?n IN (1, 5)"));
        assert!(!truthy("?n NOT IN (1, 5)"));
    }

    #[test]
    fn test_decimal_arithmetic_is_exact() {
        let empty = Binding::new();
        assert!(evaluate_filter("0.1 + 0.2 = 0.3", &empty).is_ok_and(|value| is_truthy(&value)));
        assert_eq!(
            evaluate_filter("1.5 * 2", &empty).unwrap(),
            Literal::new_typed_literal("3.0", xsd::DECIMAL).into()
        );
        assert!(matches!(
            evaluate_filter("?n / 0", &binding()),
            Err(EvaluationError::TypeError(_))
        ));
    }

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        let value = evaluate_filter("?n + 1", &binding()).unwrap();
        assert_eq!(value, Literal::from(6).into());
    }

    #[test]
    fn test_logical_operators_with_errors() {
        assert!(truthy("BOUND(?unbound) || ?n = 5"));
        assert!(truthy("?unbound = 1 || ?n = 5"));
        assert!(!truthy("?unbound = 1 && ?n = 5"));
        assert!(evaluate_filter("?unbound = 1 && ?n = 6", &binding())
            .is_ok_and(|value| !is_truthy(&value)));
        assert!(truthy("!BOUND(?unbound)"));
    }

    #[test]
    fn test_string_functions() {
        assert!(truthy("LANGMATCHES(LANG(?name), \"en\")"));
        assert!(truthy("STRSTARTS(STR(?iri), \"http://example.com/\")"));
        assert!(truthy("CONTAINS(UCASE(?name), \"ALI\"@en-us)"));
        assert!(truthy("STRLEN(?name) = 5"));
        assert!(truthy("REGEX(?name, \"^ali\", \"i\")"));
        assert!(!truthy("REGEX(?name, \"^ali\")"));
        assert!(truthy("isIRI(?iri) && isLiteral(?name) && isNumeric(?n)"));
        assert!(truthy("DATATYPE(?n) = <http://www.w3.org/2001/XMLSchema#integer>"));
    }

    #[test]
    fn test_unbound_variable_is_error() {
        assert_eq!(
            evaluate_filter("?missing", &binding()),
            Err(EvaluationError::UnboundVariable(Variable::new_unchecked(
                "missing"
            )))
        );
    }

    #[test]
    fn test_type_errors() {
        assert!(matches!(
            evaluate_filter("?iri + 1", &binding()),
            Err(EvaluationError::TypeError(_))
        ));
        assert!(matches!(
            evaluate_filter("STRLEN(?iri)", &binding()),
            Err(EvaluationError::TypeError(_))
        ));
    }

    #[test]
    fn test_unsupported_function() {
        assert!(matches!(
            evaluate_filter("ABS(?n) = 5", &binding()),
            Err(EvaluationError::Unsupported(_))
        ));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Literal::from(false).into()));
        assert!(!is_truthy(&Literal::new_simple_literal("0").into()));
        assert!(!is_truthy(&Literal::from(0).into()));
        assert!(is_truthy(&Literal::from(true).into()));
        assert!(is_truthy(&Literal::new_simple_literal("").into()));
        assert!(is_truthy(&NamedNode::new_unchecked("http://example.com/false").into()));
    }

    #[test]
    fn test_order_keys() {
        let two: Term = Literal::from(2).into();
        let ten: Term = Literal::from(10).into();
        assert_eq!(compare_order_keys(Some(&two), Some(&ten)), Ordering::Less);

        let b: Term = Literal::new_simple_literal("b").into();
        let aa: Term = Literal::new_simple_literal("aa").into();
        assert_eq!(compare_order_keys(Some(&b), Some(&aa)), Ordering::Greater);

        assert_eq!(compare_order_keys(None, Some(&aa)), Ordering::Less);
        assert_eq!(compare_order_keys(None, None), Ordering::Equal);
    }
}
