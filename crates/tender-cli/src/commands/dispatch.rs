use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Project { action } => commands::project::handle(&action, ctx, flags).await,
        Commands::Estimate { action } => commands::estimate::handle(&action, ctx, flags).await,
        Commands::Import { action } => commands::import::handle(&action, ctx, flags).await,
        Commands::Reconcile(args) => commands::reconcile::handle(&args, ctx, flags).await,
        Commands::Offer { action } => commands::offer::handle(&action, ctx, flags).await,
        Commands::OfferItem { action } => commands::offer_item::handle(&action, ctx, flags).await,
        Commands::Alert { action } => commands::alert::handle(&action, ctx, flags).await,
        Commands::Merge(args) => commands::merge::handle(&args, ctx, flags).await,
        Commands::Audit(args) => commands::audit::handle(&args, ctx, flags).await,
        Commands::Schema(_) => unreachable!("schema is pre-dispatched in main"),
    }
}
