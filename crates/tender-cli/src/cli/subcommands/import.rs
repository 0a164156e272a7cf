use std::path::PathBuf;

use clap::Subcommand;

/// Import commands. Each reads one JSON bundle.
#[derive(Clone, Debug, Subcommand)]
pub enum ImportCommands {
    /// Store an estimate bundle under a project.
    Estimate {
        #[arg(long)]
        project: String,
        file: PathBuf,
    },
    /// Store an offer bundle against an estimate.
    Offer {
        #[arg(long)]
        estimate: String,
        file: PathBuf,
    },
}
