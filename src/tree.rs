use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, Weak};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Interned symbol. Two symbols with the same text share one allocation, so
/// equality and hashing go through the pointer while ordering compares text.
#[derive(Debug, Clone)]
pub struct Symbol(Arc<str>);

static SYMBOL_TABLE: Lazy<Mutex<HashMap<String, Weak<str>>>> = Lazy::new(Default::default);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid symbol {0:?}")]
pub struct InvalidSymbolError(pub String);

impl Symbol {
    pub fn intern(value: &str) -> Result<Symbol, InvalidSymbolError> {
        static RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^[^\s(){};$][^\s(){};]*$").expect("valid symbol regex"));
        if !RE.is_match(value) {
            return Err(InvalidSymbolError(value.to_owned()));
        }
        let mut table = SYMBOL_TABLE.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = table.get(value).and_then(Weak::upgrade) {
            return Ok(Symbol(existing));
        }
        let owned: Arc<str> = Arc::from(value);
        table.insert(value.to_owned(), Arc::downgrade(&owned));
        Ok(Symbol(owned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Symbol {
    type Error = InvalidSymbolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Symbol::intern(value)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).cast::<u8>().hash(state);
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        self.as_str().cmp(other.as_str())
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of an atom owned by the host graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u64);

impl Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A leaf payload mirroring a node of the host graph. Only the handle takes
/// part in comparisons; the type name and name are kept for printing.
#[derive(Debug, Clone)]
pub struct AtomRef {
    pub handle: Handle,
    pub type_name: Symbol,
    pub name: Arc<str>,
}

impl AtomRef {
    pub fn new(handle: Handle, type_name: Symbol, name: impl Into<Arc<str>>) -> Self {
        AtomRef {
            handle,
            type_name,
            name: name.into(),
        }
    }
}

impl PartialEq for AtomRef {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for AtomRef {}

impl Hash for AtomRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl Display for AtomRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.type_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Symbol(Symbol),
    Atom(AtomRef),
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Symbol(s) => write!(f, "{s}"),
            Label::Atom(a) => write!(f, "{a}"),
        }
    }
}

impl From<Symbol> for Label {
    fn from(value: Symbol) -> Self {
        Label::Symbol(value)
    }
}

impl From<AtomRef> for Label {
    fn from(value: AtomRef) -> Self {
        Label::Atom(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(usize);

impl Var {
    pub fn new(id: usize) -> Self {
        Var(id)
    }

    pub fn id(self) -> usize {
        self.0
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum Term {
    Var(Var),
    Node(Arc<TermNode>),
}

/// Built only through [`mk_leaf`] and [`mk_node`], which keep atom labels
/// on leaves.
#[derive(Debug)]
pub struct TermNode {
    label: Label,
    args: Vec<Term>,
}

impl TermNode {
    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }
}

#[inline]
pub fn mk_var(id: usize) -> Term {
    Term::Var(Var(id))
}

#[inline]
pub fn mk_leaf(label: impl Into<Label>) -> Term {
    Term::Node(Arc::new(TermNode {
        label: label.into(),
        args: vec![],
    }))
}

/// An atom label on a node with children is replaced by the atom's type name,
/// so atom references only ever appear on leaves.
pub fn mk_node<T: Into<Term>>(label: impl Into<Label>, args: impl IntoIterator<Item = T>) -> Term {
    let args: Vec<Term> = args.into_iter().map(Into::into).collect();
    let label = match label.into() {
        Label::Atom(atom) if !args.is_empty() => Label::Symbol(atom.type_name),
        label => label,
    };
    Term::Node(Arc::new(TermNode { label, args }))
}

impl From<Var> for Term {
    fn from(value: Var) -> Self {
        Term::Var(value)
    }
}

impl From<Symbol> for Term {
    fn from(value: Symbol) -> Self {
        mk_leaf(value)
    }
}

impl From<AtomRef> for Term {
    fn from(value: AtomRef) -> Self {
        mk_leaf(value)
    }
}

impl From<Label> for Term {
    fn from(value: Label) -> Self {
        mk_leaf(value)
    }
}

impl TryFrom<&str> for Term {
    type Error = InvalidSymbolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(mk_leaf(Symbol::intern(value)?))
    }
}

/// Comparison key of a term. [Term]'s `Eq`, `Hash` and `Ord` agree with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalKey {
    Var(usize),
    Atom(Handle),
    Node(Symbol, Vec<CanonicalKey>),
}

impl Term {
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    pub fn is_leaf(&self) -> bool {
        match self {
            Term::Var(_) => true,
            Term::Node(node) => node.args.is_empty(),
        }
    }

    pub fn as_var(&self) -> Option<Var> {
        match self {
            Term::Var(v) => Some(*v),
            Term::Node(_) => None,
        }
    }

    pub fn label(&self) -> Option<&Label> {
        match self {
            Term::Var(_) => None,
            Term::Node(node) => Some(&node.label),
        }
    }

    pub fn args(&self) -> &[Term] {
        match self {
            Term::Var(_) => &[],
            Term::Node(node) => &node.args,
        }
    }

    pub fn to_canonical_key(&self) -> CanonicalKey {
        match self {
            Term::Var(v) => CanonicalKey::Var(v.0),
            Term::Node(node) => match &node.label {
                Label::Atom(atom) => CanonicalKey::Atom(atom.handle),
                Label::Symbol(s) => CanonicalKey::Node(
                    s.clone(),
                    node.args.iter().map(Term::to_canonical_key).collect(),
                ),
            },
        }
    }

    pub fn vars(&self) -> BTreeSet<Var> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut BTreeSet<Var>) {
        match self {
            Term::Var(v) => {
                vars.insert(*v);
            }
            Term::Node(node) => {
                for arg in &node.args {
                    arg.collect_vars(vars);
                }
            }
        }
    }

    pub fn is_ground(&self) -> bool {
        match self {
            Term::Var(_) => false,
            Term::Node(node) => node.args.iter().all(Term::is_ground),
        }
    }

    // same order as the variants of CanonicalKey
    fn rank(&self) -> u8 {
        match self {
            Term::Var(_) => 0,
            Term::Node(node) => match node.label {
                Label::Atom(_) => 1,
                Label::Symbol(_) => 2,
            },
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Term::Var(v1), Term::Var(v2)) => v1 == v2,
            (Term::Node(n1), Term::Node(n2)) => Arc::ptr_eq(n1, n2) || self.cmp(other).is_eq(),
            _ => false,
        }
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Term::Var(v) => v.hash(state),
            Term::Node(node) => match &node.label {
                Label::Atom(atom) => atom.handle.hash(state),
                Label::Symbol(s) => {
                    s.hash(state);
                    node.args.hash(state);
                }
            },
        }
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Term::Var(v1), Term::Var(v2)) => v1.cmp(v2),
            (Term::Node(n1), Term::Node(n2)) => match (&n1.label, &n2.label) {
                (Label::Atom(a1), Label::Atom(a2)) => a1.handle.cmp(&a2.handle),
                (Label::Symbol(s1), Label::Symbol(s2)) => {
                    s1.cmp(s2).then_with(|| n1.args.cmp(&n2.args))
                }
                _ => self.rank().cmp(&other.rank()),
            },
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Var(v) => write!(f, "{v}"),
            Term::Node(node) => {
                if node.args.is_empty() {
                    return write!(f, "{}", node.label);
                }
                write!(f, "({}", node.label)?;
                for arg in &node.args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// An unordered aggregate of terms. Unification tries every permutation of the
/// left side, so the cost grows with the factorial of the length; keep these small.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Conjunction(Vec<Term>);

impl Conjunction {
    pub fn new(terms: impl IntoIterator<Item = Term>) -> Self {
        Conjunction(terms.into_iter().collect())
    }

    pub fn terms(&self) -> &[Term] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Term> for Conjunction {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        Conjunction::new(iter)
    }
}

impl Display for Conjunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for t in &self.0 {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{t}")?;
            first = false;
        }
        write!(f, "}}")
    }
}
