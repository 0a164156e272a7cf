use tender_core::requests::{EstimateImport, OfferImport};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ImportCommands;
use crate::commands::shared::parse::read_json;
use crate::context::AppContext;
use crate::output::output;

/// Handle `tnd import`.
pub async fn handle(action: &ImportCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        ImportCommands::Estimate { project, file } => {
            let bundle: EstimateImport = read_json(file)?;
            let report = ctx.service.import_estimate(project, &bundle).await?;
            output(&report, flags.format)
        }
        ImportCommands::Offer { estimate, file } => {
            let bundle: OfferImport = read_json(file)?;
            let report = ctx.service.import_offer(estimate, &bundle).await?;
            output(&report, flags.format)
        }
    }
}
