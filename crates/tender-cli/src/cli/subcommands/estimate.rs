use clap::Subcommand;

/// Estimate commands.
#[derive(Clone, Debug, Subcommand)]
pub enum EstimateCommands {
    /// List estimates of a project.
    List {
        #[arg(long)]
        project: String,
    },
    /// Get an estimate by ID.
    Get { id: String },
    /// Show the WBS tree of an estimate.
    Tree { id: String },
    /// List baseline lines of a project, an estimate, or a WBS subtree.
    Items {
        #[arg(long, conflicts_with = "estimate", required_unless_present = "estimate")]
        project: Option<String>,
        #[arg(long)]
        estimate: Option<String>,
        /// WBS node path; requires --estimate.
        #[arg(long, requires = "estimate")]
        node: Option<String>,
    },
    /// Show the price list of an estimate.
    #[command(name = "price-list")]
    PriceList { id: String },
    /// Recompute the stored WBS nodes of an estimate.
    #[command(name = "rebuild-wbs")]
    RebuildWbs { id: String },
    /// Delete an estimate with its catalog, lines, nodes and offers.
    Delete { id: String },
}
