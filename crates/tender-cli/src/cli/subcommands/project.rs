use clap::Subcommand;

/// Project commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ProjectCommands {
    /// Create a project.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Get a project by ID.
    Get { id: String },
    /// List projects, newest first.
    List {
        #[arg(long)]
        limit: Option<u32>,
    },
}
