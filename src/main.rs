use std::process::ExitCode;

use clap::{Arg, ArgAction, CommandFactory, FromArgMatches, Parser};
use treeunify::{process, Options, Outcome};

#[derive(Parser, Debug)]
#[command(
    name = "treeunify",
    version,
    disable_version_flag = true,
    after_help = "Terms: $<n> is a variable, (f a b) a node, a bare word a leaf."
)]
struct Cli {
    /// Only variables may be bound to each other
    #[arg(long)]
    vars_only: bool,

    /// Read both operands as unordered conjunctions {t ...}
    #[arg(long)]
    conj: bool,

    /// Also print both operands with the unifier applied
    #[arg(long)]
    apply: bool,

    left: String,
    right: String,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            variables_only: self.vars_only,
            conjunction: self.conj,
            apply: self.apply,
        }
    }
}

// `-v` rather than clap's default `-V`
fn command() -> clap::Command {
    Cli::command().arg(
        Arg::new("version")
            .short('v')
            .long("version")
            .action(ArgAction::Version)
            .help("Print version"),
    )
}

fn main() -> ExitCode {
    env_logger::init();

    // usage errors exit with status 2
    let cli = Cli::from_arg_matches(&command().get_matches()).unwrap_or_else(|e| e.exit());

    match process(&cli.left, &cli.right, &cli.options()) {
        Ok(outcome @ Outcome::Unified { .. }) => {
            println!("{outcome}");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Failed) => {
            println!("fail");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
