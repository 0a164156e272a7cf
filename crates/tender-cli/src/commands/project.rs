use crate::cli::GlobalFlags;
use crate::cli::subcommands::ProjectCommands;
use crate::commands::shared::limit::effective_limit;
use crate::context::AppContext;
use crate::output::output;

/// Handle `tnd project`.
pub async fn handle(action: &ProjectCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        ProjectCommands::Create { name, description } => {
            let project = ctx.service.create_project(name, description.as_deref()).await?;
            output(&project, flags.format)
        }
        ProjectCommands::Get { id } => output(&ctx.service.get_project(id).await?, flags.format),
        ProjectCommands::List { limit } => {
            let limit = effective_limit(*limit, flags.limit, ctx.config.general.default_limit);
            output(&ctx.service.list_projects(limit).await?, flags.format)
        }
    }
}
