use crate::cli::GlobalFlags;
use crate::cli::subcommands::OfferItemCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `tnd offer-item`.
pub async fn handle(action: &OfferItemCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        OfferItemCommands::Get { id } => output(&ctx.service.get_offer_item(id).await?, flags.format),
        OfferItemCommands::Map {
            id,
            price_list_item,
            apply_price,
        } => {
            let outcome = ctx.service.map_offer_item(id, price_list_item, *apply_price).await?;
            output(&outcome, flags.format)
        }
    }
}
