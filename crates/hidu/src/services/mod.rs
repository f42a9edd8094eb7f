pub mod config;
pub mod menu;
pub mod types;

pub use config::ConfigService;
pub use menu::{MenuService, SeedMode, SeedReport};
pub use types::{
    AppConfig, CreateMenuItemInput, MenuFilters, MenuItem, ServerConfig, StorageBackend,
    StorageConfig, UpdateMenuItemInput,
};

use crate::db::StoreError;
use crate::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(id) => {
                ServiceError::Conflict(format!("Menu item with id '{}' already exists", id))
            },
            StoreError::Unavailable(reason) => ServiceError::StoreUnavailable(reason),
            StoreError::Other(e) => ServiceError::Internal(e),
        }
    }
}
