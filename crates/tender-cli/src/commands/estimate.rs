use serde::Serialize;
use tender_core::filter::ItemFilter;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::EstimateCommands;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct RebuildResponse<'a> {
    estimate_id: &'a str,
    wbs_nodes: u32,
}

#[derive(Debug, Serialize)]
struct DeleteResponse<'a> {
    deleted: &'a str,
}

/// Handle `tnd estimate`.
pub async fn handle(action: &EstimateCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        EstimateCommands::List { project } => {
            output(&ctx.service.list_estimates(project).await?, flags.format)
        }
        EstimateCommands::Get { id } => output(&ctx.service.get_estimate(id).await?, flags.format),
        EstimateCommands::Tree { id } => output(&ctx.service.wbs_tree(id).await?, flags.format),
        EstimateCommands::Items {
            project,
            estimate,
            node,
        } => {
            let filter = item_filter(project.as_deref(), estimate.as_deref(), node.as_deref())?;
            output(&ctx.service.list_estimate_items(&filter).await?, flags.format)
        }
        EstimateCommands::PriceList { id } => {
            output(&ctx.service.list_price_list(id).await?, flags.format)
        }
        EstimateCommands::RebuildWbs { id } => {
            let wbs_nodes = ctx.service.rebuild_wbs(id).await?;
            output(
                &RebuildResponse {
                    estimate_id: id,
                    wbs_nodes,
                },
                flags.format,
            )
        }
        EstimateCommands::Delete { id } => {
            ctx.service.delete_estimate(id).await?;
            output(&DeleteResponse { deleted: id }, flags.format)
        }
    }
}

fn item_filter(
    project: Option<&str>,
    estimate: Option<&str>,
    node: Option<&str>,
) -> anyhow::Result<ItemFilter> {
    match (project, estimate, node) {
        (_, Some(estimate_id), Some(node_id)) => Ok(ItemFilter::WbsScope {
            estimate_id: estimate_id.to_string(),
            node_id: node_id.to_string(),
        }),
        (_, Some(estimate_id), None) => Ok(ItemFilter::Estimate {
            estimate_id: estimate_id.to_string(),
        }),
        (Some(project_id), None, _) => Ok(ItemFilter::Project {
            project_id: project_id.to_string(),
        }),
        (None, None, _) => anyhow::bail!("either --project or --estimate is required"),
    }
}
