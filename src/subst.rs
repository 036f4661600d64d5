use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;

use crate::tree::{Term, Var};

/// Bindings from variables to terms, not closed under composition: looking up a
/// variable yields exactly the term it was bound to.
///
/// Persistent: [Substitution::extend] links one new binding in front of the
/// existing ones and leaves `self` untouched, so a caller can keep an older
/// substitution around and retry from it after a failed extension.
///
/// Lookups walk the chain, so [Substitution::get] is linear in the number of
/// bindings and unifying a large term costs quadratic time. `len`, `iter` and
/// `==` also allocate a set or map per call. Fine for the small bindings
/// unification produces; not meant as a general-purpose map.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    head: Option<Arc<Binding>>,
}

#[derive(Debug)]
struct Binding {
    var: Var,
    value: Term,
    next: Option<Arc<Binding>>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&self, var: Var, value: Term) -> Substitution {
        Substitution {
            head: Some(Arc::new(Binding {
                var,
                value,
                next: self.head.clone(),
            })),
        }
    }

    pub fn get(&self, var: Var) -> Option<&Term> {
        self.bindings()
            .find(|binding| binding.var == var)
            .map(|binding| &binding.value)
    }

    pub fn contains(&self, var: Var) -> bool {
        self.get(var).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Newest binding first. A variable bound twice through `extend` is yielded
    /// once, with its newest value.
    pub fn iter(&self) -> impl Iterator<Item = (Var, &Term)> {
        let mut seen = HashSet::new();
        self.bindings()
            .filter(move |binding| seen.insert(binding.var))
            .map(|binding| (binding.var, &binding.value))
    }

    pub fn to_map(&self) -> BTreeMap<Var, Term> {
        self.iter().map(|(v, t)| (v, t.clone())).collect()
    }

    fn bindings(&self) -> impl Iterator<Item = &Binding> {
        std::iter::successors(self.head.as_deref(), |binding| binding.next.as_deref())
    }
}

impl PartialEq for Substitution {
    fn eq(&self, other: &Self) -> bool {
        self.to_map() == other.to_map()
    }
}

impl Eq for Substitution {}

impl FromIterator<(Var, Term)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (Var, Term)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Substitution::new(), |s, (var, value)| s.extend(var, value))
    }
}

// Long chains would otherwise be dropped recursively.
impl Drop for Substitution {
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(binding) = next {
            match Arc::try_unwrap(binding) {
                Ok(mut binding) => next = binding.next.take(),
                Err(_) => break,
            }
        }
    }
}

/// Printed in variable order, whatever order the bindings were added in.
impl Display for Substitution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for (var, value) in self.to_map() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{var}: {value}")?;
            first = false;
        }
        write!(f, "}}")
    }
}
