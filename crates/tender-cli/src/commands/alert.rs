use tender_core::enums::{AlertStatus, AlertType};
use tender_core::requests::ResolveAlertRequest;
use tender_db::repos::{AlertFilter, SummaryGroup};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::AlertCommands;
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `tnd alert`.
pub async fn handle(action: &AlertCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        AlertCommands::List {
            project,
            offer,
            status,
            alert_type,
            limit,
        } => {
            let filter = AlertFilter {
                project_id: project.clone(),
                offer_id: offer.clone(),
                status: status
                    .as_deref()
                    .map(|value| parse_enum::<AlertStatus>(value, "status"))
                    .transpose()?,
                alert_type: alert_type
                    .as_deref()
                    .map(|value| parse_enum::<AlertType>(value, "type"))
                    .transpose()?,
                limit: Some(effective_limit(
                    *limit,
                    flags.limit,
                    ctx.config.general.default_limit,
                )),
            };
            output(&ctx.service.list_alerts(&filter).await?, flags.format)
        }
        AlertCommands::Get { id } => output(&ctx.service.get_alert(id).await?, flags.format),
        AlertCommands::Resolve {
            id,
            status,
            note,
            resolved_by,
            select,
            apply_price,
        } => {
            let request = ResolveAlertRequest {
                status: Some(parse_enum::<AlertStatus>(status, "status")?),
                resolution_note: note.clone(),
                resolved_by: resolved_by.clone(),
                selected_price_list_item_id: select.clone(),
                apply_approved_price: *apply_price,
            };
            output(&ctx.service.resolve_alert(id, &request).await?, flags.format)
        }
        AlertCommands::Summary { project, by } => {
            let group = parse_enum::<SummaryGroup>(by, "grouping")?;
            output(&ctx.service.alert_summary(project, group).await?, flags.format)
        }
    }
}
