use crate::graphql::{build_schema, MenuSchema};
use anyhow::Result;
use hidu::db::{self, Database};
use hidu::services::{AppConfig, MenuService};
use hidu::validation::Validator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MenuService>,
    pub schema: MenuSchema,
    pub config: AppConfig,
}

impl AppState {
    /// Open the configured store and wire the service graph
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let storage_uri = config.storage_uri();
        let db = db::open(&config.storage, &storage_uri).await?;
        Ok(Self::new(db, config))
    }

    /// Wire the service graph over an already opened store
    pub fn new(db: Arc<dyn Database>, config: AppConfig) -> Self {
        let service = Arc::new(MenuService::new(db));
        let schema = build_schema(service.clone(), Validator::default());

        Self {
            service,
            schema,
            config,
        }
    }
}
