use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::OfferCommands;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct DeleteResponse<'a> {
    deleted: &'a str,
}

/// Handle `tnd offer`.
pub async fn handle(action: &OfferCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        OfferCommands::List { estimate } => output(&ctx.service.list_offers(estimate).await?, flags.format),
        OfferCommands::Get { id } => output(&ctx.service.get_offer(id).await?, flags.format),
        OfferCommands::Items { id } => output(&ctx.service.list_offer_items(id).await?, flags.format),
        OfferCommands::Delete { id } => {
            ctx.service.delete_offer(id).await?;
            output(&DeleteResponse { deleted: id }, flags.format)
        }
    }
}
