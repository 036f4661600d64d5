//! First-order syntactic unification over [Term]s.
//!
//! Failure is `None`. Every entry point takes the incoming substitution as an
//! `Option` and returns `None` straight away when it is already a failure, so
//! chains of calls can be threaded without checking in between.

use easy_ext::ext;
use itertools::Itertools;

use crate::subst::Substitution;
use crate::tree::{mk_node, Conjunction, Label, Term, Var};

/// Shapes the engine knows how to unify. Dispatch between ordered argument
/// lists and unordered conjunctions happens here, by type.
pub trait Unify {
    fn unify_with(&self, other: &Self, s: Substitution, unifier: &Unifier) -> Option<Substitution>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unifier {
    /// Only variables may be bound; a variable never unifies with a non-variable.
    pub variables_only: bool,
}

impl Unifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variables_only() -> Self {
        Unifier {
            variables_only: true,
        }
    }

    pub fn unify<T: Unify + ?Sized>(
        &self,
        x: &T,
        y: &T,
        s: Option<Substitution>,
    ) -> Option<Substitution> {
        x.unify_with(y, s?, self)
    }

    pub fn unify_var(&self, var: Var, x: &Term, s: Substitution) -> Option<Substitution> {
        if let Some(bound) = s.get(var) {
            let bound = bound.clone();
            return self.unify(&bound, x, Some(s));
        }
        if occurs_check(var, x, &s) {
            log::trace!("occurs check: {var} in {x}");
            return None;
        }
        log::trace!("bind {var} := {x}");
        Some(extend(&s, var, x.clone()))
    }
}

#[ext(SubstitutionExt)]
pub impl Option<Substitution> {
    /// Continues a unification chain: `unify(x, y, self)`.
    fn and_unify<T: Unify + ?Sized>(self, unifier: &Unifier, x: &T, y: &T) -> Option<Substitution> {
        unifier.unify(x, y, self)
    }
}

impl Unify for Term {
    fn unify_with(&self, other: &Self, s: Substitution, unifier: &Unifier) -> Option<Substitution> {
        log::trace!("unify {} {}", self, other);
        if unifier.variables_only && self.is_variable() != other.is_variable() {
            return None;
        }
        if self == other {
            return Some(s);
        }
        match (self, other) {
            (Term::Var(v), y) => unifier.unify_var(*v, y, s),
            (x, Term::Var(v)) => unifier.unify_var(*v, x, s),
            (Term::Node(x), Term::Node(y)) => unifier
                .unify(x.label(), y.label(), Some(s))
                .and_unify(unifier, x.args(), y.args()),
        }
    }
}

// Labels never hold variables.
impl Unify for Label {
    fn unify_with(&self, other: &Self, s: Substitution, _unifier: &Unifier) -> Option<Substitution> {
        (self == other).then_some(s)
    }
}

impl Unify for [Term] {
    fn unify_with(&self, other: &Self, s: Substitution, unifier: &Unifier) -> Option<Substitution> {
        if self.len() != other.len() {
            return None;
        }
        self.iter()
            .zip(other)
            .try_fold(s, |s, (x, y)| x.unify_with(y, s, unifier))
    }
}

impl Unify for Conjunction {
    fn unify_with(&self, other: &Self, s: Substitution, unifier: &Unifier) -> Option<Substitution> {
        if self.len() != other.len() {
            return None;
        }
        if self == other {
            return Some(s);
        }
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("conjunction search: {} against {}", self, other);
        }
        for (index, perm) in self.terms().iter().permutations(self.len()).enumerate() {
            let result = perm
                .iter()
                .zip(other.terms())
                .try_fold(s.clone(), |s, (x, y)| x.unify_with(y, s, unifier));
            if result.is_some() {
                log::debug!("conjunction matched at permutation {index}");
                return result;
            }
        }
        None
    }
}

pub fn unify<T: Unify + ?Sized>(x: &T, y: &T, s: Option<Substitution>) -> Option<Substitution> {
    Unifier::new().unify(x, y, s)
}

pub fn unify_var(var: Var, x: &Term, s: Option<Substitution>) -> Option<Substitution> {
    Unifier::new().unify_var(var, x, s?)
}

/// Does `var` occur in `term`, looking through the bindings of `s`?
/// `s` must be acyclic, as every substitution built by [unify] is.
pub fn occurs_check(var: Var, term: &Term, s: &Substitution) -> bool {
    match term {
        Term::Var(v) if *v == var => true,
        Term::Var(v) => s.get(*v).is_some_and(|bound| occurs_check(var, bound, s)),
        Term::Node(node) => node.args().iter().any(|arg| occurs_check(var, arg, s)),
    }
}

pub fn extend(s: &Substitution, var: Var, value: Term) -> Substitution {
    s.extend(var, value)
}

/// Applies `s` one level deep: a bound variable is replaced by its value as-is,
/// even if that value mentions other bound variables.
pub fn substitute(s: &Substitution, term: &Term) -> Term {
    match term {
        Term::Var(v) => s.get(*v).cloned().unwrap_or_else(|| term.clone()),
        Term::Node(node) if node.args().is_empty() => term.clone(),
        Term::Node(node) => mk_node(
            node.label().clone(),
            node.args().iter().map(|arg| substitute(s, arg)),
        ),
    }
}

/// Repeats [substitute] until nothing changes. Loops forever on a cyclic `s`.
pub fn substitute_fully(s: &Substitution, term: &Term) -> Term {
    let mut current = term.clone();
    loop {
        let next = substitute(s, &current);
        if next == current {
            return next;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{mk_leaf, mk_var, Symbol};
    use std::collections::HashMap;

    fn sym(value: &str) -> Symbol {
        Symbol::intern(value).unwrap()
    }

    fn leaf(value: &str) -> Term {
        mk_leaf(sym(value))
    }

    fn app<const N: usize>(f: &str, args: [Term; N]) -> Term {
        mk_node(sym(f), args)
    }

    fn empty() -> Option<Substitution> {
        Some(Substitution::new())
    }

    fn subst<const N: usize>(bindings: [(usize, Term); N]) -> Substitution {
        bindings
            .into_iter()
            .map(|(v, t)| (Var::new(v), t))
            .collect()
    }

    fn samples() -> Vec<Term> {
        vec![
            mk_var(1),
            mk_var(2),
            leaf("A"),
            leaf("B"),
            app("f", [mk_var(1), leaf("C")]),
            app("f", [leaf("B"), mk_var(1)]),
            app("f", [mk_var(1), mk_var(2)]),
            app("f", [leaf("A"), leaf("B")]),
            app("g", [mk_var(1)]),
            app("f", [app("g", [mk_var(2)]), mk_var(2)]),
            app("f", [app("g", [leaf("A")]), mk_var(3)]),
        ]
    }

    #[test]
    fn reflexive_without_bindings() {
        for t in samples() {
            assert_eq!(unify(&t, &t, empty()), empty(), "{t}");
        }
    }

    // equal up to a one-to-one renaming of variables
    fn is_variant(a: &Term, b: &Term, map: &mut HashMap<Var, Var>, back: &mut HashMap<Var, Var>) -> bool {
        match (a, b) {
            (Term::Var(u), Term::Var(v)) => {
                *map.entry(*u).or_insert(*v) == *v && *back.entry(*v).or_insert(*u) == *u
            }
            (Term::Node(m), Term::Node(n)) => {
                m.label() == n.label()
                    && m.args().len() == n.args().len()
                    && m.args()
                        .iter()
                        .zip(n.args())
                        .all(|(a, b)| is_variant(a, b, map, back))
            }
            _ => false,
        }
    }

    #[test]
    fn symmetric_bindings() {
        for x in samples() {
            for y in samples() {
                let xy = unify(&x, &y, empty());
                let yx = unify(&y, &x, empty());
                let (Some(xy), Some(yx)) = (xy.clone(), yx.clone()) else {
                    assert_eq!(xy.is_some(), yx.is_some(), "{x} vs {y}");
                    continue;
                };
                let instance = substitute_fully(&xy, &x);
                assert_eq!(instance, substitute_fully(&xy, &y), "{x} vs {y}");
                let swapped = substitute_fully(&yx, &y);
                assert_eq!(swapped, substitute_fully(&yx, &x), "{y} vs {x}");
                assert!(
                    is_variant(&instance, &swapped, &mut HashMap::new(), &mut HashMap::new()),
                    "{x} vs {y}: {instance} and {swapped}"
                );
            }
        }
    }

    #[test]
    fn swapped_variables_bind_the_other_way() {
        let xy = unify(&mk_var(1), &mk_var(2), empty()).expect("unifiable");
        let yx = unify(&mk_var(2), &mk_var(1), empty()).expect("unifiable");
        assert_eq!(xy.to_string(), "{$1: $2}");
        assert_eq!(yx.to_string(), "{$2: $1}");
    }

    #[test]
    fn ground_bindings_agree_in_both_directions() {
        let x = app("f", [mk_var(1), app("g", [mk_var(2)])]);
        let y = app("f", [leaf("A"), app("g", [leaf("B")])]);
        let xy = unify(&x, &y, empty()).expect("unifiable");
        let yx = unify(&y, &x, empty()).expect("unifiable");
        for t in [&x, &y] {
            assert_eq!(substitute_fully(&xy, t), substitute_fully(&yx, t), "{t}");
        }
    }

    #[test]
    fn binds_argument_positions() {
        let x = app("f", [mk_var(1), mk_var(2)]);
        let y = app("f", [leaf("A"), leaf("B")]);
        let s = unify(&x, &y, empty()).expect("unifiable");
        assert_eq!(s, subst([(1, leaf("A")), (2, leaf("B"))]));
        assert_eq!(s.to_string(), "{$1: A, $2: B}");
    }

    #[test]
    fn conflicting_binding_fails() {
        let x = app("f", [mk_var(1), leaf("C")]);
        let y = app("f", [leaf("B"), mk_var(1)]);
        assert_eq!(unify(&x, &y, empty()), None);
    }

    #[test]
    fn failure_propagates() {
        assert_eq!(unify(&leaf("A"), &leaf("A"), None), None);
        assert_eq!(empty().and_unify(&Unifier::new(), &leaf("A"), &leaf("B")), None);
        assert_eq!(None::<Substitution>.and_unify(&Unifier::new(), &mk_var(1), &leaf("B")), None);
    }

    #[test]
    fn mismatched_shapes_fail() {
        assert_eq!(unify(&leaf("A"), &leaf("B"), empty()), None);
        assert_eq!(unify(&app("f", [leaf("A")]), &app("g", [leaf("A")]), empty()), None);
        assert_eq!(
            unify(&app("f", [leaf("A")]), &app("f", [leaf("A"), leaf("B")]), empty()),
            None
        );
        assert_eq!(unify(&leaf("f"), &app("f", [leaf("A")]), empty()), None);
    }

    #[test]
    fn occurs_check_rejects_cycles() {
        let x = mk_var(1);
        let fx = app("f", [mk_var(1)]);
        assert_eq!(unify(&x, &fx, empty()), None);
        assert_eq!(unify(&fx, &x, empty()), None);

        // through a binding: $2 := f($1), then $1 against $2
        let s = subst([(2, app("f", [mk_var(1)]))]);
        assert_eq!(unify(&mk_var(1), &mk_var(2), Some(s)), None);
    }

    #[test]
    fn occurs_check_cases() {
        let s = subst([(2, app("g", [mk_var(1)]))]);
        let v = Var::new(1);
        assert!(occurs_check(v, &mk_var(1), &s));
        assert!(occurs_check(v, &app("f", [leaf("A"), app("h", [mk_var(1)])]), &s));
        assert!(occurs_check(v, &mk_var(2), &s));
        assert!(occurs_check(v, &app("f", [mk_var(2)]), &s));
        assert!(!occurs_check(v, &mk_var(3), &s));
        assert!(!occurs_check(v, &leaf("A"), &s));
        assert!(!occurs_check(v, &app("f", [leaf("A"), mk_var(3)]), &s));
    }

    #[test]
    fn unify_var_chases_one_binding() {
        let s = subst([(1, mk_var(2))]);
        let s = unify_var(Var::new(1), &leaf("A"), Some(s)).expect("unifiable");
        assert_eq!(s.get(Var::new(1)), Some(&mk_var(2)));
        assert_eq!(s.get(Var::new(2)), Some(&leaf("A")));
    }

    #[test]
    fn variable_against_variable() {
        let s = unify(&mk_var(1), &mk_var(2), empty()).expect("unifiable");
        assert_eq!(s, subst([(1, mk_var(2))]));
    }

    #[test]
    fn failed_extension_keeps_earlier_substitution() {
        let s1 = unify(&mk_var(1), &leaf("A"), empty()).expect("unifiable");
        let attempt = unify(&app("f", [mk_var(2), mk_var(1)]), &app("f", [leaf("B"), leaf("C")]), Some(s1.clone()));
        assert_eq!(attempt, None);
        assert_eq!(s1, subst([(1, leaf("A"))]));
        let retry = unify(&mk_var(2), &leaf("C"), Some(s1)).expect("unifiable");
        assert_eq!(retry, subst([(1, leaf("A")), (2, leaf("C"))]));
    }

    #[test]
    fn variables_only_mode() {
        let unifier = Unifier::variables_only();
        assert_eq!(unifier.unify(&mk_var(1), &leaf("A"), empty()), None);
        assert_eq!(unifier.unify(&leaf("A"), &mk_var(1), empty()), None);
        assert_eq!(
            unifier.unify(&mk_var(1), &mk_var(2), empty()),
            Some(subst([(1, mk_var(2))]))
        );
        // applies below the root too
        let x = app("f", [mk_var(1), mk_var(2)]);
        assert_eq!(unifier.unify(&x, &app("f", [mk_var(3), mk_var(4)]), empty()).map(|s| s.len()), Some(2));
        assert_eq!(unifier.unify(&x, &app("f", [mk_var(3), leaf("B")]), empty()), None);
        assert_eq!(unifier.unify(&leaf("A"), &leaf("A"), empty()), empty());
    }

    #[test]
    fn conjunction_ignores_order() {
        let p = app("P", [leaf("a")]);
        let q = app("Q", [leaf("b")]);
        let x = Conjunction::new([p.clone(), q.clone()]);
        let y = Conjunction::new([q.clone(), p.clone()]);
        assert_eq!(unify(&x, &y, empty()), empty());
        // positionally the same pair does not unify
        assert_eq!(unify(x.terms(), y.terms(), empty()), None);
    }

    #[test]
    fn conjunction_binds_variables() {
        let x = Conjunction::new([app("P", [mk_var(1)]), app("Q", [mk_var(2)])]);
        let y = Conjunction::new([app("Q", [leaf("b")]), app("P", [leaf("a")])]);
        let s = unify(&x, &y, empty()).expect("unifiable");
        assert_eq!(s, subst([(1, leaf("a")), (2, leaf("b"))]));
    }

    #[test]
    fn conjunction_failures() {
        let x = Conjunction::new([leaf("P"), leaf("Q")]);
        let y = Conjunction::new([leaf("P"), leaf("R")]);
        assert_eq!(unify(&x, &y, empty()), None);
        let z = Conjunction::new([leaf("P")]);
        assert_eq!(unify(&x, &z, empty()), None);
        assert_eq!(unify(&Conjunction::default(), &Conjunction::default(), empty()), empty());
    }

    #[test]
    fn substitute_is_one_level() {
        let s = subst([(1, app("g", [mk_var(2)])), (2, leaf("A"))]);
        let t = app("f", [mk_var(1), mk_var(3)]);
        assert_eq!(
            substitute(&s, &t),
            app("f", [app("g", [mk_var(2)]), mk_var(3)])
        );
        assert_eq!(
            substitute_fully(&s, &t),
            app("f", [app("g", [leaf("A")]), mk_var(3)])
        );
    }

    #[test]
    fn substitute_with_disjoint_bindings_is_identity() {
        let s = subst([(7, leaf("Z")), (8, app("g", [mk_var(9)]))]);
        for t in samples() {
            assert_eq!(substitute(&s, &t), t);
        }
    }

    #[test]
    fn substitution_makes_sides_equal() {
        let x = app("f", [app("g", [mk_var(2)]), mk_var(2)]);
        let y = app("f", [mk_var(1), leaf("A")]);
        let s = unify(&x, &y, empty()).expect("unifiable");
        assert_eq!(substitute_fully(&s, &x), substitute_fully(&s, &y));
    }
}
