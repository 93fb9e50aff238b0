use crate::BindingConflictError;
use oxrdf::{Term, Variable, VariableRef};
use std::fmt;
use std::sync::Arc;

/// An immutable assignment of RDF terms to variables.
///
/// The entries keep the order in which the variables were bound. Cloning a binding is cheap as the
/// entries are shared. Extending a binding never changes it but returns a new one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Binding {
    entries: Arc<Vec<(Variable, Term)>>,
}

impl Binding {
    /// Creates a binding without any variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the term bound to `variable`, if any.
    pub fn get<'a>(&self, variable: impl Into<VariableRef<'a>>) -> Option<&Term> {
        let variable = variable.into();
        self.entries
            .iter()
            .find(|(v, _)| v.as_ref() == variable)
            .map(|(_, t)| t)
    }

    /// Returns whether `variable` is bound.
    pub fn contains<'a>(&self, variable: impl Into<VariableRef<'a>>) -> bool {
        self.get(variable).is_some()
    }

    /// The number of bound variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the bound variables in binding order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.entries.iter().map(|(v, _)| v)
    }

    /// Iterates over the entries in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.entries.iter().map(|(v, t)| (v, t))
    }

    /// Returns a binding that additionally binds `variable` to `term`.
    ///
    /// Binding a variable again to the same term returns an equal binding.
    ///
    /// # Errors
    ///
    /// If `variable` is already bound to a different term.
    pub fn extend(&self, variable: &Variable, term: &Term) -> Result<Self, BindingConflictError> {
        match self.get(variable) {
            Some(existing) if existing == term => Ok(self.clone()),
            Some(existing) => Err(BindingConflictError {
                variable: variable.clone(),
                existing: existing.clone(),
                new: term.clone(),
            }),
            None => {
                let mut entries = Vec::with_capacity(self.entries.len() + 1);
                entries.extend(self.entries.iter().cloned());
                entries.push((variable.clone(), term.clone()));
                Ok(Self {
                    entries: Arc::new(entries),
                })
            }
        }
    }
}

impl FromIterator<(Variable, Term)> for Binding {
    /// Collects the entries into a binding. Only the first term of a repeated variable is kept.
    fn from_iter<I: IntoIterator<Item = (Variable, Term)>>(iter: I) -> Self {
        let mut entries: Vec<(Variable, Term)> = Vec::new();
        for (variable, term) in iter {
            if !entries.iter().any(|(v, _)| *v == variable) {
                entries.push((variable, term));
            }
        }
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (variable, term)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{variable}: {term}")?;
        }
        f.write_str("}")
    }
}
