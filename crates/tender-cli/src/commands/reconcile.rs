use crate::cli::GlobalFlags;
use crate::cli::root_commands::ReconcileArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `tnd reconcile`.
pub async fn handle(args: &ReconcileArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let report = ctx
        .service
        .reconcile_offer(&args.offer_id, args.scope.as_deref())
        .await?;
    output(&report, flags.format)
}
