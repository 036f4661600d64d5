use anyhow::Context;

pub mod atom;
pub mod lex;
pub mod parse;
pub mod rename;
pub mod subst;
pub mod tree;
pub mod unify;

pub use subst::Substitution;
pub use tree::{mk_leaf, mk_node, mk_var, Conjunction, Label, Symbol, Term, Var};
pub use unify::{
    extend, occurs_check, substitute, substitute_fully, unify, unify_var, Unifier, Unify,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub variables_only: bool,
    /// Read both operands as `{...}` conjunctions.
    pub conjunction: bool,
    /// Also report both operands with the unifier applied.
    pub apply: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Unified {
        subst: Substitution,
        /// Both operands after substitution, when requested.
        applied: Option<(String, String)>,
    },
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Unified { subst, applied } => {
                write!(f, "{subst}")?;
                if let Some((left, right)) = applied {
                    write!(f, "\n{left}\n{right}")?;
                }
                Ok(())
            }
            Outcome::Failed => write!(f, "fail"),
        }
    }
}

pub fn process(left: &str, right: &str, options: &Options) -> anyhow::Result<Outcome> {
    let unifier = Unifier {
        variables_only: options.variables_only,
    };
    let empty = Some(Substitution::new());

    if options.conjunction {
        let x = parse::parse_conjunction("<left>", left).context("parse error")?;
        let y = parse::parse_conjunction("<right>", right).context("parse error")?;
        let Some(subst) = unifier.unify(&x, &y, empty) else {
            return Ok(Outcome::Failed);
        };
        let applied = options.apply.then(|| {
            let apply = |c: &Conjunction| {
                c.terms()
                    .iter()
                    .map(|t| substitute_fully(&subst, t))
                    .collect::<Conjunction>()
                    .to_string()
            };
            (apply(&x), apply(&y))
        });
        return Ok(Outcome::Unified { subst, applied });
    }

    let x = parse::parse_term("<left>", left).context("parse error")?;
    let y = parse::parse_term("<right>", right).context("parse error")?;
    let Some(subst) = unifier.unify(&x, &y, empty) else {
        return Ok(Outcome::Failed);
    };
    let applied = options.apply.then(|| {
        (
            substitute_fully(&subst, &x).to_string(),
            substitute_fully(&subst, &y).to_string(),
        )
    });
    Ok(Outcome::Unified { subst, applied })
}
