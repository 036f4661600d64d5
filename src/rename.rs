use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::tree::{mk_node, Term, Var};

// Next identifier handed out by `fresh_var`. Only moves forward.
static NEXT_VAR: AtomicUsize = AtomicUsize::new(0);

/// A variable no earlier call in this process has received.
pub fn fresh_var() -> Var {
    Var::new(NEXT_VAR.fetch_add(1, Ordering::Relaxed))
}

/// Moves the fresh-variable counter past every variable of `terms`, so that
/// variables minted afterwards never clash with them.
pub fn reserve_vars<'a>(terms: impl IntoIterator<Item = &'a Term>) {
    if let Some(first) = terms
        .into_iter()
        .filter_map(|t| t.vars().last().copied())
        .map(|v| v.id() + 1)
        .max()
    {
        NEXT_VAR.fetch_max(first, Ordering::Relaxed);
    }
}

/// Scope of one renaming: a variable met twice within the same session is
/// renamed to the same fresh variable. Separate sessions never share a fresh
/// variable.
#[derive(Debug, Default)]
pub struct RenameSession {
    seen: HashMap<Var, Var>,
}

impl RenameSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fresh variable `var` was renamed to, if it has been met.
    pub fn renamed(&self, var: Var) -> Option<Var> {
        self.seen.get(&var).copied()
    }

    pub fn standardize_apart(&mut self, term: &Term) -> Term {
        standardize_apart(term, self)
    }
}

/// Renames every variable of `term` to a fresh one. Reusing `session` across
/// several terms renames them consistently with each other.
pub fn standardize_apart(term: &Term, session: &mut RenameSession) -> Term {
    reserve_vars([term]);
    rename(term, &mut session.seen)
}

fn rename(term: &Term, seen: &mut HashMap<Var, Var>) -> Term {
    match term {
        Term::Var(v) => Term::Var(*seen.entry(*v).or_insert_with(fresh_var)),
        Term::Node(node) if node.args().is_empty() => term.clone(),
        Term::Node(node) => mk_node(
            node.label().clone(),
            node.args()
                .iter()
                .map(|arg| rename(arg, seen))
                .collect::<Vec<_>>(),
        ),
    }
}
