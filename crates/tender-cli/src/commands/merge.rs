use tender_core::requests::MergeRequest;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::MergeArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `tnd merge`.
pub async fn handle(args: &MergeArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let outcome = ctx.service.merge_estimates(&args.project, &merge_request(args)).await?;
    output(&outcome, flags.format)
}

fn merge_request(args: &MergeArgs) -> MergeRequest {
    MergeRequest {
        estimate_ids: args.estimates.clone(),
        name: args.name.clone(),
        price_list_name: args.price_list_name.clone(),
        set_as_baseline: args.baseline,
    }
}
