//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use eyre::Result;

#[derive(Debug, Parser)]
#[command(name = "kal")]
#[command(about = "Streaming lattice-based speech recognition")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode a WAV file and print one JSON line per utterance
    Decode(crate::decode::Args),
}

/// Where to look for a model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ModelSource {
    /// Local directory if it exists, otherwise the Hugging Face Hub
    #[default]
    Auto,
    /// Local directory
    Path,
    /// Hugging Face cache only, no network
    Cache,
    /// Hugging Face Hub
    Api,
}

/// Model selection shared by subcommands.
#[derive(clap::Args, Debug)]
pub struct ModelArgs {
    /// Model directory or Hugging Face repo id
    pub model_id: String,

    /// How to resolve the model id
    #[arg(long, value_enum, default_value_t = ModelSource::Auto)]
    pub model_source: ModelSource,
}

/// Execute CLI command - separated for testing.
pub fn run_cli(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Decode(args) => crate::decode::execute(args.try_into()?),
    }
}
