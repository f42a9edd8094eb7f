use super::{now, schema, Database, StoreError, StoreResult};
use crate::services::{CreateMenuItemInput, MenuFilters, MenuItem, UpdateMenuItemInput};
use anyhow::Context;
use arrow_array::RecordBatchIterator;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::collections::BTreeSet;
use std::path::Path;
use tokio::sync::{Mutex, RwLock};

const DEFAULT_TABLE: &str = "menuitems";

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn id_filter(business_id: &str) -> String {
    format!("id = {}", quote(business_id))
}

/// Build the LanceDB predicate for listing filters
fn list_filter(filters: &MenuFilters) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(category) = filters.category() {
        parts.push(format!("category = {}", quote(category)));
    }
    if let Some(available) = filters.is_available {
        parts.push(format!("is_available = {}", available));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}

/// LanceDB implementation supporting local paths and S3 URIs.
///
/// LanceDB has no unique index, so every write runs under `write_lock`:
/// duplicate checks and read-modify-write cycles are serialized within the
/// process. Updates land as one merge commit keyed on the business id.
/// Two processes writing the same table are not coordinated.
pub struct LanceDatabase {
    uri: String,
    table_name: String,
    connection: RwLock<Option<lancedb::Connection>>,
    write_lock: Mutex<()>,
}

impl LanceDatabase {
    /// Create a new LanceDB instance from a URI (local path or s3://...)
    pub async fn new(uri: &str) -> anyhow::Result<Self> {
        Self::with_table(uri, DEFAULT_TABLE).await
    }

    /// Same as [`LanceDatabase::new`] with a custom table name
    pub async fn with_table(uri: &str, table_name: &str) -> anyhow::Result<Self> {
        if !uri.starts_with("s3://") {
            let path = Path::new(uri);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        Ok(Self {
            uri: uri.to_string(),
            table_name: table_name.to_string(),
            connection: RwLock::new(None),
            write_lock: Mutex::new(()),
        })
    }

    /// Initialize the database, creating the table if needed
    pub async fn init(&self) -> anyhow::Result<()> {
        if !self.uri.starts_with("s3://") {
            tokio::fs::create_dir_all(&self.uri)
                .await
                .context("Failed to create database directory")?;
        }

        let db = lancedb::connect(&self.uri)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        let table_names = db.table_names().execute().await?;
        if !table_names.contains(&self.table_name) {
            db.create_empty_table(&self.table_name, schema::create_schema())
                .execute()
                .await
                .with_context(|| format!("Failed to create {} table", self.table_name))?;
            tracing::debug!("Created table {}", self.table_name);
        }

        *self.connection.write().await = Some(db);
        Ok(())
    }

    /// Get or create a connection
    async fn get_connection(&self) -> StoreResult<lancedb::Connection> {
        let conn = self.connection.read().await;
        if let Some(ref db) = *conn {
            return Ok(db.clone());
        }
        drop(conn);

        let db = lancedb::connect(&self.uri)
            .execute()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        *self.connection.write().await = Some(db.clone());
        Ok(db)
    }

    async fn open_table(&self) -> StoreResult<lancedb::Table> {
        let db = self.get_connection().await?;
        let table = db
            .open_table(&self.table_name)
            .execute()
            .await
            .with_context(|| format!("Failed to open {} table", self.table_name))?;
        Ok(table)
    }

    async fn query(&self, filter: Option<String>) -> StoreResult<Vec<MenuItem>> {
        let table = self.open_table().await?;

        let mut query = table.query();
        if let Some(filter) = filter {
            query = query.only_if(filter);
        }

        let mut stream = query.execute().await.context("Failed to query menu items")?;
        let mut items = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .context("Failed to read menu items")?
        {
            items.extend(schema::batch_to_items(&batch)?);
        }

        Ok(items)
    }

    async fn find(&self, business_id: &str) -> StoreResult<Option<MenuItem>> {
        let items = self.query(Some(id_filter(business_id))).await?;
        Ok(items.into_iter().next())
    }

    async fn add(&self, table: &lancedb::Table, item: &MenuItem) -> StoreResult<()> {
        let batch = schema::items_to_batch(std::slice::from_ref(item))?;
        let schema = batch.schema();

        table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .context("Failed to write menu item")?;
        Ok(())
    }

    /// Overwrite the stored row for `item` in a single commit, matched on
    /// the business id. Callers hold `write_lock`.
    async fn replace(&self, item: &MenuItem) -> StoreResult<()> {
        let table = self.open_table().await?;
        let batch = schema::items_to_batch(std::slice::from_ref(item))?;
        let schema = batch.schema();

        let mut merge = table.merge_insert(&["id"]);
        merge.when_matched_update_all(None);
        merge
            .execute(Box::new(RecordBatchIterator::new(vec![Ok(batch)], schema)))
            .await
            .context("Failed to update menu item")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Database for LanceDatabase {
    async fn insert(&self, input: &CreateMenuItemInput) -> StoreResult<MenuItem> {
        let _guard = self.write_lock.lock().await;

        if self.find(&input.business_id).await?.is_some() {
            return Err(StoreError::Duplicate(input.business_id.clone()));
        }

        let item = MenuItem::from_input(MenuItem::generate_storage_id(), input, now());
        let table = self.open_table().await?;
        self.add(&table, &item).await?;

        tracing::debug!("Inserted menu item: {}", item.business_id);
        Ok(item)
    }

    async fn get(&self, business_id: &str) -> StoreResult<Option<MenuItem>> {
        self.find(business_id).await
    }

    async fn list(&self, filters: &MenuFilters) -> StoreResult<Vec<MenuItem>> {
        self.query(list_filter(filters)).await
    }

    async fn categories(&self) -> StoreResult<Vec<String>> {
        let items = self.query(None).await?;
        let categories: BTreeSet<String> = items.into_iter().map(|i| i.category).collect();
        Ok(categories.into_iter().collect())
    }

    async fn update(
        &self,
        business_id: &str,
        patch: &UpdateMenuItemInput,
    ) -> StoreResult<Option<MenuItem>> {
        let _guard = self.write_lock.lock().await;

        let Some(mut item) = self.find(business_id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut item, now());
        self.replace(&item).await?;

        tracing::debug!("Updated menu item: {}", business_id);
        Ok(Some(item))
    }

    async fn delete(&self, business_id: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;

        if self.find(business_id).await?.is_none() {
            return Ok(false);
        }

        let table = self.open_table().await?;
        table
            .delete(&id_filter(business_id))
            .await
            .context("Failed to delete menu item")?;

        tracing::debug!("Deleted menu item: {}", business_id);
        Ok(true)
    }

    async fn toggle_availability(&self, business_id: &str) -> StoreResult<Option<MenuItem>> {
        let _guard = self.write_lock.lock().await;

        let Some(mut item) = self.find(business_id).await? else {
            return Ok(None);
        };
        item.is_available = !item.is_available;
        item.touch(now());
        self.replace(&item).await?;

        tracing::debug!(
            "Toggled menu item {} to is_available={}",
            business_id,
            item.is_available
        );
        Ok(Some(item))
    }

    async fn ping(&self) -> StoreResult<()> {
        let db = self.get_connection().await?;
        db.table_names()
            .execute()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
