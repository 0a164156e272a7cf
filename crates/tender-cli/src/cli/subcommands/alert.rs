use clap::Subcommand;

/// Alert commands.
#[derive(Clone, Debug, Subcommand)]
pub enum AlertCommands {
    /// List alerts.
    List {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        offer: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long = "type")]
        alert_type: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Get an alert by ID.
    Get { id: String },
    /// Resolve or ignore an open alert.
    Resolve {
        id: String,
        /// Target status: resolved or ignored.
        #[arg(long)]
        status: String,
        #[arg(long)]
        note: Option<String>,
        #[arg(long = "by")]
        resolved_by: Option<String>,
        /// Price-list item chosen for the alert's offer line.
        #[arg(long)]
        select: Option<String>,
        /// Take the selected item's price.
        #[arg(long, requires = "select")]
        apply_price: bool,
    },
    /// Open/resolved/ignored tallies per offer or per estimate.
    Summary {
        #[arg(long)]
        project: String,
        /// Grouping: offer or estimate.
        #[arg(long, default_value = "offer")]
        by: String,
    },
}
