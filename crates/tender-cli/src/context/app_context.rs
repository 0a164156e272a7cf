use anyhow::Context;
use tender_config::TenderConfig;
use tender_db::service::TenderService;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: TenderService,
    pub config: TenderConfig,
}

impl AppContext {
    /// Open the configured store, creating its directory when needed.
    pub async fn init(config: TenderConfig) -> anyhow::Result<Self> {
        if let Some(dir) = config.database.parent_dir() {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create store directory {}", dir.display()))?;
        }

        let service = TenderService::new_local(&config.database.path, config.reconcile.settings())
            .await
            .with_context(|| format!("failed to open store at {}", config.database.path))?;

        tracing::debug!(store = %config.database.path, "application context ready");
        Ok(Self { service, config })
    }
}

#[cfg(test)]
mod tests {
    use tender_config::TenderConfig;

    use super::AppContext;

    #[tokio::test]
    async fn init_creates_store_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = TenderConfig::default();
        config.database.path = dir
            .path()
            .join("nested")
            .join("tender.db")
            .to_string_lossy()
            .into_owned();

        let ctx = AppContext::init(config).await.expect("context should init");
        assert!(dir.path().join("nested").is_dir());
        assert!(ctx.service.list_projects(10).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn init_accepts_in_memory_store() {
        let mut config = TenderConfig::default();
        config.database.path = ":memory:".into();
        let ctx = AppContext::init(config).await.expect("context should init");
        assert_eq!(ctx.config.general.default_limit, 50);
    }
}
