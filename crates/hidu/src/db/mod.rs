pub mod lance;
pub mod mongo;
pub mod schema;

use crate::services::{
    CreateMenuItemInput, MenuFilters, MenuItem, StorageBackend, StorageConfig,
    UpdateMenuItemInput,
};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;

/// Failures reported by a store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The business identifier is already taken
    #[error("duplicate business id: {0}")]
    Duplicate(String),

    /// The store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Current time truncated to the millisecond precision every backend stores
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Database trait for menu item storage.
///
/// Every write touches at most one document. Implementations assign the
/// storage identifier and both timestamps; callers never set them.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait::async_trait]
pub trait Database: Send + Sync {
    /// Insert a new item, failing with [`StoreError::Duplicate`] if the business id exists
    async fn insert(&self, input: &CreateMenuItemInput) -> StoreResult<MenuItem>;

    /// Get an item by business id
    async fn get(&self, business_id: &str) -> StoreResult<Option<MenuItem>>;

    /// List items matching the filters, in store order
    async fn list(&self, filters: &MenuFilters) -> StoreResult<Vec<MenuItem>>;

    /// Distinct category values currently present
    async fn categories(&self) -> StoreResult<Vec<String>>;

    /// Merge the supplied fields into an item. `None` if the item does not exist
    async fn update(
        &self,
        business_id: &str,
        patch: &UpdateMenuItemInput,
    ) -> StoreResult<Option<MenuItem>>;

    /// Delete an item, returning whether a record was removed
    async fn delete(&self, business_id: &str) -> StoreResult<bool>;

    /// Negate `is_available` in a single store operation
    async fn toggle_availability(&self, business_id: &str) -> StoreResult<Option<MenuItem>>;

    /// Check that the store answers
    async fn ping(&self) -> StoreResult<()>;
}

/// Open the store a storage config points at, creating indexes or tables as needed.
pub async fn open(config: &StorageConfig, uri: &str) -> anyhow::Result<Arc<dyn Database>> {
    let db: Arc<dyn Database> = match StorageBackend::for_uri(uri) {
        StorageBackend::Mongo => {
            let mongo = mongo::MongoDatabase::connect(uri, config).await?;
            mongo.init().await?;
            Arc::new(mongo)
        },
        StorageBackend::Lance => {
            let lance = lance::LanceDatabase::with_table(uri, &config.collection).await?;
            lance.init().await?;
            Arc::new(lance)
        },
    };

    tracing::info!("Opened {} store", StorageBackend::for_uri(uri));
    Ok(db)
}
