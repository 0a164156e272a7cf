use clap::{Args, Subcommand};

use crate::cli::subcommands::{
    AlertCommands, EstimateCommands, ImportCommands, OfferCommands, OfferItemCommands,
    ProjectCommands,
};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Projects.
    Project {
        #[command(subcommand)]
        action: ProjectCommands,
    },
    /// Estimates, their lines and WBS.
    Estimate {
        #[command(subcommand)]
        action: EstimateCommands,
    },
    /// Store bundles produced by the import service.
    Import {
        #[command(subcommand)]
        action: ImportCommands,
    },
    /// Run a reconciliation pass over an offer.
    Reconcile(ReconcileArgs),
    /// Offers.
    Offer {
        #[command(subcommand)]
        action: OfferCommands,
    },
    /// Offer lines.
    #[command(name = "offer-item")]
    OfferItem {
        #[command(subcommand)]
        action: OfferItemCommands,
    },
    /// Reconciliation alerts.
    Alert {
        #[command(subcommand)]
        action: AlertCommands,
    },
    /// Merge estimates of a project into a new one.
    Merge(MergeArgs),
    /// Query the audit trail.
    Audit(AuditArgs),
    /// Dump JSON schema for an import or request payload.
    Schema(SchemaArgs),
}

#[derive(Clone, Debug, Args)]
pub struct ReconcileArgs {
    pub offer_id: String,
    /// WBS node path restricting the pass (e.g. `1/1.2`).
    #[arg(long)]
    pub scope: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct MergeArgs {
    #[arg(long)]
    pub project: String,
    /// Source estimate; repeat for each source, in priority order.
    #[arg(long = "estimate", required = true, num_args = 1)]
    pub estimates: Vec<String>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub price_list_name: Option<String>,
    /// Make the merged estimate the project baseline.
    #[arg(long)]
    pub baseline: bool,
}

#[derive(Clone, Debug, Args)]
pub struct AuditArgs {
    #[arg(long)]
    pub entity_type: Option<String>,
    #[arg(long)]
    pub entity_id: Option<String>,
    #[arg(long)]
    pub action: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Payload name (e.g. `estimate-import`, `offer-import`, `resolve-alert`).
    pub type_name: String,
}
