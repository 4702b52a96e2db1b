//! CLI command definitions and handlers.

pub mod classify;
pub mod engine;
pub mod evaluate;
pub mod models;

use clap::{Parser, Subcommand};

/// Wes Classifier - find Wes Anderson frames in a pile of images
#[derive(Parser)]
#[command(name = "wes-classifier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Classify arguments used when no subcommand is given.
    #[command(flatten)]
    pub classify: classify::ClassifyArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Classify images and print the matches
    Classify(classify::ClassifyArgs),
    /// Measure accuracy on a directory with one subdirectory per label
    Evaluate(evaluate::EvaluateArgs),
    /// Manage the model artifacts
    Models(models::ModelsArgs),
}

impl Commands {
    /// Name as typed on the command line.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Classify(_) => "classify",
            Self::Evaluate(_) => "evaluate",
            Self::Models(_) => "models",
        }
    }
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// At least one match, or a non-classify command succeeded.
    Success = 0,
    /// Classification ran but nothing matched.
    NoMatches = 1,
    /// Fatal error.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
