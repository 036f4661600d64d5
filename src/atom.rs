//! Boundary to a host atom graph (a hypergraph knowledge base).
//!
//! The graph owns its atoms: nodes carry a type and a name, links carry a type and
//! an ordered outgoing set. Terms mirror nodes as leaves wrapping an [AtomRef]
//! and mirror links as inner nodes labeled with the link type.

use anyhow::Context;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::tree::{mk_leaf, mk_node, AtomRef, Handle, Label, Symbol, Term, Var};

pub static VARIABLE_NODE: Lazy<Symbol> =
    Lazy::new(|| Symbol::intern("VariableNode").expect("valid type name"));

pub trait AtomGraph {
    type Atom: Clone;

    fn atom_ref(&self, atom: &Self::Atom) -> AtomRef;

    /// `None` for a node, the outgoing set for a link.
    fn outgoing(&self, atom: &Self::Atom) -> Option<Vec<Self::Atom>>;

    fn get(&self, handle: Handle) -> Option<Self::Atom>;

    /// Inserts a node, or returns the existing one with the same type and name.
    fn add_node(&mut self, type_name: &Symbol, name: &str) -> anyhow::Result<Self::Atom>;

    /// Inserts a link, or returns the existing one with the same type and outgoing set.
    fn add_link(&mut self, type_name: &Symbol, outgoing: Vec<Self::Atom>) -> anyhow::Result<Self::Atom>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("atom {0} is not in the graph")]
    UnknownAtom(Handle),
}

pub fn variable_node_name(var: Var) -> String {
    format!("${}", var.id())
}

pub fn term_from_external_node<G: AtomGraph + ?Sized>(graph: &G, atom: &G::Atom) -> Term {
    match graph.outgoing(atom) {
        None => mk_leaf(graph.atom_ref(atom)),
        Some(outgoing) => {
            let type_name = graph.atom_ref(atom).type_name;
            let args: Vec<Term> = outgoing
                .iter()
                .map(|child| term_from_external_node(graph, child))
                .collect();
            mk_node(type_name, args)
        }
    }
}

pub fn term_to_external<G: AtomGraph + ?Sized>(term: &Term, graph: &mut G) -> anyhow::Result<G::Atom> {
    match term {
        Term::Var(v) => graph
            .add_node(&VARIABLE_NODE, &variable_node_name(*v))
            .with_context(|| format!("failed to add variable node for {v}")),
        Term::Node(node) => match node.label() {
            // mk_node keeps atom labels on leaves
            Label::Atom(atom) => graph
                .get(atom.handle)
                .ok_or_else(|| ExportError::UnknownAtom(atom.handle).into()),
            Label::Symbol(type_name) => {
                let outgoing = node
                    .args()
                    .iter()
                    .map(|arg| term_to_external(arg, graph))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                graph
                    .add_link(type_name, outgoing)
                    .with_context(|| format!("failed to add link for {term}"))
            }
        },
    }
}
