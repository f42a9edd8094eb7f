use super::types::{CreateMenuItemInput, MenuFilters, MenuItem, UpdateMenuItemInput};
use super::ServiceError;
use crate::db::Database;
use crate::validation::{ValidationErrors, Validator, Violation};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// How [`MenuService::seed`] treats entries whose business id already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedMode {
    /// Leave the stored item alone and count the entry as skipped
    #[default]
    SkipExisting,
    /// Stop at the first existing id
    Strict,
}

/// Outcome of a seed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

fn not_found(business_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Menu item with id \"{}\" not found", business_id))
}

/// Repository for menu item operations.
///
/// Payloads are expected to have passed the [`Validator`] already; the
/// service only enforces existence and uniqueness.
pub struct MenuService {
    db: Arc<dyn Database>,
}

impl MenuService {
    /// Create a new menu service
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// List items matching every supplied filter
    pub async fn list_items(&self, filters: MenuFilters) -> Result<Vec<MenuItem>, ServiceError> {
        Ok(self.db.list(&filters).await?)
    }

    /// Get an item by business id
    pub async fn get_item(&self, business_id: &str) -> Result<MenuItem, ServiceError> {
        self.find_item(business_id)
            .await?
            .ok_or_else(|| not_found(business_id))
    }

    /// Get an item by business id, `None` if absent
    pub async fn find_item(&self, business_id: &str) -> Result<Option<MenuItem>, ServiceError> {
        Ok(self.db.get(business_id).await?)
    }

    /// Distinct categories, sorted
    pub async fn list_categories(&self) -> Result<Vec<String>, ServiceError> {
        let mut categories = self.db.categories().await?;
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    /// Create a new item
    pub async fn create_item(&self, input: CreateMenuItemInput) -> Result<MenuItem, ServiceError> {
        let item = self.db.insert(&input).await?;
        tracing::info!("Created menu item {}", item.business_id);
        Ok(item)
    }

    /// Merge a partial update into an existing item
    pub async fn update_item(
        &self,
        business_id: &str,
        patch: UpdateMenuItemInput,
    ) -> Result<MenuItem, ServiceError> {
        let item = self
            .db
            .update(business_id, &patch)
            .await?
            .ok_or_else(|| not_found(business_id))?;
        tracing::info!("Updated menu item {}", business_id);
        Ok(item)
    }

    /// Delete an item permanently
    pub async fn delete_item(&self, business_id: &str) -> Result<bool, ServiceError> {
        if !self.db.delete(business_id).await? {
            return Err(not_found(business_id));
        }
        tracing::info!("Deleted menu item {}", business_id);
        Ok(true)
    }

    /// Flip `is_available` and return the updated item
    pub async fn toggle_availability(&self, business_id: &str) -> Result<MenuItem, ServiceError> {
        let item = self
            .db
            .toggle_availability(business_id)
            .await?
            .ok_or_else(|| not_found(business_id))?;
        tracing::info!(
            "Menu item {} is now {}",
            business_id,
            if item.is_available { "available" } else { "unavailable" }
        );
        Ok(item)
    }

    /// Bulk-create items from untyped catalog entries.
    ///
    /// Every entry is validated before anything is written, so an invalid
    /// catalog leaves the store untouched.
    pub async fn seed(
        &self,
        validator: &Validator,
        entries: Vec<Value>,
        mode: SeedMode,
    ) -> Result<SeedReport, ServiceError> {
        let mut inputs = Vec::with_capacity(entries.len());
        let mut violations = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            match validator.parse_create(entry) {
                Ok(input) => inputs.push(input),
                Err(errors) => violations.extend(errors.violations.into_iter().map(|v| {
                    Violation::new(
                        format!("[{}].{}", index, v.field),
                        format!("item {}: {}", index, v.message),
                    )
                })),
            }
        }
        if !violations.is_empty() {
            return Err(ValidationErrors { violations }.into());
        }

        let mut report = SeedReport::default();
        for input in inputs {
            let business_id = input.business_id.clone();
            match self.create_item(input).await {
                Ok(_) => report.created.push(business_id),
                Err(ServiceError::Conflict(_)) if mode == SeedMode::SkipExisting => {
                    tracing::debug!("Skipping existing menu item {}", business_id);
                    report.skipped.push(business_id);
                },
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Seeded {} menu item(s), skipped {}",
            report.created.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Check that the store answers
    pub async fn ping(&self) -> Result<(), ServiceError> {
        Ok(self.db.ping().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MockDatabase, StoreError};
    use crate::testing::{sample_input, TestDatabase};
    use serde_json::json;

    fn service() -> (Arc<TestDatabase>, MenuService) {
        let db = Arc::new(TestDatabase::new());
        let service = MenuService::new(db.clone());
        (db, service)
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let (_, service) = service();

        let item = service
            .create_item(sample_input("cf-001", "coffee"))
            .await
            .unwrap();

        assert!(!item.is_popular);
        assert!(!item.is_best_seller);
        assert!(!item.is_new);
        assert!(item.is_available);
        assert!(!item.storage_id.is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_is_conflict() {
        let (db, service) = service();
        service
            .create_item(sample_input("cf-001", "coffee"))
            .await
            .unwrap();

        let err = service
            .create_item(sample_input("cf-001", "tea"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(db.len(), 1);
        assert_eq!(service.get_item("cf-001").await.unwrap().category, "coffee");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (_, service) = service();

        let err = service.get_item("nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(err.to_string().contains("nope"));
        assert!(service.find_item("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let (_, service) = service();

        let err = service
            .update_item("nope", UpdateMenuItemInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let (_, service) = service();

        let err = service.delete_item("nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn toggle_missing_is_not_found() {
        let (_, service) = service();

        let err = service.toggle_availability("nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn categories_are_sorted_and_distinct() {
        let mut mock = MockDatabase::new();
        mock.expect_categories()
            .returning(|| Ok(vec!["tea".into(), "coffee".into(), "tea".into()]));
        let service = MenuService::new(Arc::new(mock));

        assert_eq!(
            service.list_categories().await.unwrap(),
            vec!["coffee", "tea"]
        );
    }

    #[tokio::test]
    async fn unavailable_store_maps_to_store_unavailable() {
        let (db, service) = service();
        db.set_unavailable(true);

        let err = service.list_items(MenuFilters::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::StoreUnavailable(_)));
        assert!(matches!(
            service.ping().await.unwrap_err(),
            ServiceError::StoreUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn other_store_errors_are_internal() {
        let mut mock = MockDatabase::new();
        mock.expect_get()
            .returning(|_| Err(StoreError::Other(anyhow::anyhow!("corrupt row"))));
        let service = MenuService::new(Arc::new(mock));

        let err = service.get_item("cf-001").await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
    }

    #[tokio::test]
    async fn seed_skips_existing_by_default() {
        let (db, service) = service();
        service
            .create_item(sample_input("cf-001", "coffee"))
            .await
            .unwrap();

        let entries = vec![
            serde_json::to_value(sample_input("cf-001", "coffee")).unwrap(),
            serde_json::to_value(sample_input("tea-001", "tea")).unwrap(),
        ];
        let report = service
            .seed(&Validator::default(), entries, SeedMode::SkipExisting)
            .await
            .unwrap();

        assert_eq!(report.created, vec!["tea-001"]);
        assert_eq!(report.skipped, vec!["cf-001"]);
        assert_eq!(db.len(), 2);
    }

    #[tokio::test]
    async fn strict_seed_fails_on_existing() {
        let (_, service) = service();
        service
            .create_item(sample_input("cf-001", "coffee"))
            .await
            .unwrap();

        let entries = vec![serde_json::to_value(sample_input("cf-001", "coffee")).unwrap()];
        let err = service
            .seed(&Validator::default(), entries, SeedMode::Strict)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn invalid_seed_entry_writes_nothing() {
        let (db, service) = service();

        let mut bad = serde_json::to_value(sample_input("tea-001", "tea")).unwrap();
        bad["price"] = json!(-1);
        let entries = vec![
            serde_json::to_value(sample_input("cf-001", "coffee")).unwrap(),
            bad,
        ];

        let err = service
            .seed(&Validator::default(), entries, SeedMode::SkipExisting)
            .await
            .unwrap_err();

        match err {
            ServiceError::Validation(errors) => assert!(errors.has_field("[1].price")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(db.is_empty());
    }
}
