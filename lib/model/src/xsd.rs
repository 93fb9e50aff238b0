use oxrdf::vocab::xsd;
use oxrdf::{Literal, LiteralRef, NamedNodeRef};
use oxsdatatypes::{Decimal, Double, Float, Integer};
use std::cmp::Ordering;

/// Checks if the datatype is one of the integer datatypes.
pub fn is_integer_datatype(datatype: NamedNodeRef<'_>) -> bool {
    static INTEGER_DATATYPES: &[NamedNodeRef<'_>; 13] = &[
        xsd::INTEGER,
        xsd::BYTE,
        xsd::SHORT,
        xsd::INT,
        xsd::LONG,
        xsd::UNSIGNED_BYTE,
        xsd::UNSIGNED_SHORT,
        xsd::UNSIGNED_INT,
        xsd::UNSIGNED_LONG,
        xsd::POSITIVE_INTEGER,
        xsd::NEGATIVE_INTEGER,
        xsd::NON_POSITIVE_INTEGER,
        xsd::NON_NEGATIVE_INTEGER,
    ];
    INTEGER_DATATYPES.contains(&datatype)
}

/// Checks if the datatype is a numeric datatype.
pub fn is_numeric_datatype(datatype: NamedNodeRef<'_>) -> bool {
    is_integer_datatype(datatype)
        || datatype == xsd::DECIMAL
        || datatype == xsd::FLOAT
        || datatype == xsd::DOUBLE
}

/// A numeric literal value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Numeric {
    Integer(Integer),
    Decimal(Decimal),
    Float(Float),
    Double(Double),
}

impl Numeric {
    /// Parses a numeric literal. Returns [None] for non-numeric or ill-typed literals.
    pub fn from_literal(literal: LiteralRef<'_>) -> Option<Self> {
        let datatype = literal.datatype();
        let value = literal.value();
        if is_integer_datatype(datatype) {
            value.parse().ok().map(Self::Integer)
        } else if datatype == xsd::DECIMAL {
            value.parse().ok().map(Self::Decimal)
        } else if datatype == xsd::FLOAT {
            value.parse().ok().map(Self::Float)
        } else if datatype == xsd::DOUBLE {
            value.parse().ok().map(Self::Double)
        } else {
            None
        }
    }

    /// Compares two numbers after promoting them to a common type.
    pub fn partial_cmp_numeric(self, other: Self) -> Option<Ordering> {
        match NumericPair::promote(self, other) {
            NumericPair::Integer(lhs, rhs) => Some(lhs.cmp(&rhs)),
            NumericPair::Decimal(lhs, rhs) => Some(lhs.cmp(&rhs)),
            NumericPair::Float(lhs, rhs) => lhs.partial_cmp(&rhs),
            NumericPair::Double(lhs, rhs) => lhs.partial_cmp(&rhs),
        }
    }

    /// Returns [None] on overflow.
    pub fn checked_neg(self) -> Option<Self> {
        match self {
            Self::Integer(value) => value.checked_neg().map(Self::Integer),
            Self::Decimal(value) => value.checked_neg().map(Self::Decimal),
            Self::Float(value) => Some(Self::Float(-value)),
            Self::Double(value) => Some(Self::Double(-value)),
        }
    }

    /// Zero and NaN are false, every other number is true.
    pub fn effective_boolean_value(self) -> bool {
        match self {
            Self::Integer(value) => value != Integer::from(0),
            Self::Decimal(value) => value != Decimal::from(0),
            Self::Float(value) => {
                let value = f32::from(value);
                value != 0.0 && !value.is_nan()
            }
            Self::Double(value) => {
                let value = f64::from(value);
                value != 0.0 && !value.is_nan()
            }
        }
    }
}

impl From<Numeric> for Literal {
    fn from(value: Numeric) -> Self {
        match value {
            Numeric::Integer(value) => Literal::new_typed_literal(value.to_string(), xsd::INTEGER),
            Numeric::Decimal(value) => {
                let mut lexical = value.to_string();
                if !lexical.contains('.') {
                    lexical.push_str(".0");
                }
                Literal::new_typed_literal(lexical, xsd::DECIMAL)
            }
            Numeric::Float(value) => Literal::new_typed_literal(value.to_string(), xsd::FLOAT),
            Numeric::Double(value) => Literal::new_typed_literal(value.to_string(), xsd::DOUBLE),
        }
    }
}

/// Two numbers promoted to their common type.
///
/// Integers promote to decimals, decimals to floats and floats to doubles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumericPair {
    Integer(Integer, Integer),
    Decimal(Decimal, Decimal),
    Float(Float, Float),
    Double(Double, Double),
}

impl NumericPair {
    pub fn promote(lhs: Numeric, rhs: Numeric) -> Self {
        match (lhs, rhs) {
            (Numeric::Integer(lhs), Numeric::Integer(rhs)) => Self::Integer(lhs, rhs),
            (Numeric::Integer(lhs), Numeric::Decimal(rhs)) => Self::Decimal(lhs.into(), rhs),
            (Numeric::Decimal(lhs), Numeric::Integer(rhs)) => Self::Decimal(lhs, rhs.into()),
            (Numeric::Decimal(lhs), Numeric::Decimal(rhs)) => Self::Decimal(lhs, rhs),
            (Numeric::Double(lhs), rhs) => Self::Double(lhs, double(rhs)),
            (lhs, Numeric::Double(rhs)) => Self::Double(double(lhs), rhs),
            (Numeric::Float(lhs), Numeric::Float(rhs)) => Self::Float(lhs, rhs),
            (Numeric::Float(lhs), Numeric::Integer(rhs)) => Self::Float(lhs, rhs.into()),
            (Numeric::Float(lhs), Numeric::Decimal(rhs)) => Self::Float(lhs, rhs.into()),
            (Numeric::Integer(lhs), Numeric::Float(rhs)) => Self::Float(lhs.into(), rhs),
            (Numeric::Decimal(lhs), Numeric::Float(rhs)) => Self::Float(lhs.into(), rhs),
        }
    }

    /// Returns [None] on overflow.
    pub fn checked_add(self) -> Option<Numeric> {
        match self {
            Self::Integer(lhs, rhs) => lhs.checked_add(rhs).map(Numeric::Integer),
            Self::Decimal(lhs, rhs) => lhs.checked_add(rhs).map(Numeric::Decimal),
            Self::Float(lhs, rhs) => Some(Numeric::Float(lhs + rhs)),
            Self::Double(lhs, rhs) => Some(Numeric::Double(lhs + rhs)),
        }
    }

    /// Returns [None] on overflow.
    pub fn checked_sub(self) -> Option<Numeric> {
        match self {
            Self::Integer(lhs, rhs) => lhs.checked_sub(rhs).map(Numeric::Integer),
            Self::Decimal(lhs, rhs) => lhs.checked_sub(rhs).map(Numeric::Decimal),
            Self::Float(lhs, rhs) => Some(Numeric::Float(lhs - rhs)),
            Self::Double(lhs, rhs) => Some(Numeric::Double(lhs - rhs)),
        }
    }

    /// Returns [None] on overflow.
    pub fn checked_mul(self) -> Option<Numeric> {
        match self {
            Self::Integer(lhs, rhs) => lhs.checked_mul(rhs).map(Numeric::Integer),
            Self::Decimal(lhs, rhs) => lhs.checked_mul(rhs).map(Numeric::Decimal),
            Self::Float(lhs, rhs) => Some(Numeric::Float(lhs * rhs)),
            Self::Double(lhs, rhs) => Some(Numeric::Double(lhs * rhs)),
        }
    }

    /// Dividing two integers results in a decimal. Returns [None] on overflow and for a decimal
    /// division by zero.
    pub fn checked_div(self) -> Option<Numeric> {
        match self {
            Self::Integer(lhs, rhs) => Decimal::from(lhs).checked_div(rhs).map(Numeric::Decimal),
            Self::Decimal(lhs, rhs) => lhs.checked_div(rhs).map(Numeric::Decimal),
            Self::Float(lhs, rhs) => Some(Numeric::Float(lhs / rhs)),
            Self::Double(lhs, rhs) => Some(Numeric::Double(lhs / rhs)),
        }
    }
}

fn double(value: Numeric) -> Double {
    match value {
        Numeric::Integer(value) => value.into(),
        Numeric::Decimal(value) => value.into(),
        Numeric::Float(value) => value.into(),
        Numeric::Double(value) => value,
    }
}
