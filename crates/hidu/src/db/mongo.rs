use super::{now, Database, StoreError, StoreResult};
use crate::services::{
    CreateMenuItemInput, MenuFilters, MenuItem, StorageConfig, UpdateMenuItemInput,
};
use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DUPLICATE_KEY: i32 = 11000;

/// Stored shape of a menu item. Field names match documents written by
/// earlier deployments of the menu service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MenuItemDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    object_id: Option<ObjectId>,
    id: String,
    name: String,
    description: String,
    price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    price_large: Option<f64>,
    category: String,
    image_url: String,
    #[serde(default)]
    is_popular: bool,
    #[serde(default)]
    is_best_seller: bool,
    #[serde(default)]
    is_new: bool,
    #[serde(default = "default_available")]
    is_available: bool,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

fn default_available() -> bool {
    true
}

fn to_bson_time(time: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(time.timestamp_millis())
}

fn from_bson_time(time: bson::DateTime) -> anyhow::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(time.timestamp_millis())
        .single()
        .with_context(|| format!("Invalid timestamp: {}", time))
}

impl MenuItemDocument {
    fn from_item(item: &MenuItem) -> Self {
        Self {
            object_id: None,
            id: item.business_id.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price,
            price_large: item.price_large,
            category: item.category.clone(),
            image_url: item.image_url.clone(),
            is_popular: item.is_popular,
            is_best_seller: item.is_best_seller,
            is_new: item.is_new,
            is_available: item.is_available,
            created_at: to_bson_time(item.created_at),
            updated_at: to_bson_time(item.updated_at),
        }
    }

    fn into_item(self) -> anyhow::Result<MenuItem> {
        Ok(MenuItem {
            storage_id: self.object_id.map(|oid| oid.to_hex()).unwrap_or_default(),
            business_id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            price_large: self.price_large,
            category: self.category,
            image_url: self.image_url,
            is_popular: self.is_popular,
            is_best_seller: self.is_best_seller,
            is_new: self.is_new,
            is_available: self.is_available,
            created_at: from_bson_time(self.created_at)?,
            updated_at: from_bson_time(self.updated_at)?,
        })
    }
}

fn list_filter(filters: &MenuFilters) -> Document {
    let mut filter = Document::new();
    if let Some(category) = filters.category() {
        filter.insert("category", category);
    }
    if let Some(available) = filters.is_available {
        filter.insert("isAvailable", available);
    }
    filter
}

/// `$set` update for a patch. Only supplied fields are written.
fn patch_update(patch: &UpdateMenuItemInput, now: DateTime<Utc>) -> anyhow::Result<Document> {
    let mut set = bson::to_document(patch).context("Failed to encode update")?;
    set.insert("updatedAt", to_bson_time(now));
    Ok(doc! { "$set": set })
}

/// Aggregation pipeline that negates `isAvailable` server-side.
///
/// A missing flag reads as available, so it toggles to `false`. `updatedAt`
/// uses the application clock and never falls behind `createdAt`.
fn toggle_pipeline(now: DateTime<Utc>) -> Vec<Document> {
    vec![doc! {
        "$set": {
            "isAvailable": { "$not": [{ "$ifNull": ["$isAvailable", true] }] },
            "updatedAt": { "$max": [to_bson_time(now), "$createdAt"] },
        }
    }]
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn store_error(err: mongodb::error::Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Other(err.into()),
    }
}

/// MongoDB implementation.
///
/// Uniqueness of the business id is enforced by a unique index created in
/// [`MongoDatabase::init`]; every write is a single-document operation.
pub struct MongoDatabase {
    client: Client,
    collection: Collection<MenuItemDocument>,
}

impl MongoDatabase {
    /// Connect lazily; the driver only reaches the server on first use.
    ///
    /// A database named in the URI path wins over `config.database`.
    pub async fn connect(uri: &str, config: &StorageConfig) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .context("Invalid MongoDB URI")?;

        let timeout = Duration::from_millis(config.connect_timeout_ms);
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);
        options.app_name.get_or_insert_with(|| "hidu".to_string());

        let database = options
            .default_database
            .clone()
            .unwrap_or_else(|| config.database.clone());

        let client = Client::with_options(options).context("Failed to build MongoDB client")?;
        let collection = client
            .database(&database)
            .collection::<MenuItemDocument>(&config.collection);

        tracing::debug!(
            "MongoDB collection {}.{} selected",
            database,
            config.collection
        );
        Ok(Self { client, collection })
    }

    /// Create the unique business id index and the category index
    pub async fn init(&self) -> anyhow::Result<()> {
        let unique_id = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let by_category = IndexModel::builder().keys(doc! { "category": 1 }).build();

        self.collection
            .create_indexes([unique_id, by_category])
            .await
            .context("Failed to create menu item indexes")?;
        Ok(())
    }

    fn into_items(docs: Vec<MenuItemDocument>) -> StoreResult<Vec<MenuItem>> {
        docs.into_iter()
            .map(|d| d.into_item().map_err(StoreError::from))
            .collect()
    }

    fn into_item(doc: Option<MenuItemDocument>) -> StoreResult<Option<MenuItem>> {
        Ok(doc.map(MenuItemDocument::into_item).transpose()?)
    }
}

#[async_trait::async_trait]
impl Database for MongoDatabase {
    async fn insert(&self, input: &CreateMenuItemInput) -> StoreResult<MenuItem> {
        let mut item = MenuItem::from_input(String::new(), input, now());

        let result = self
            .collection
            .insert_one(MenuItemDocument::from_item(&item))
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::Duplicate(input.business_id.clone())
                } else {
                    store_error(e)
                }
            })?;

        item.storage_id = match result.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };

        tracing::debug!("Inserted menu item: {}", item.business_id);
        Ok(item)
    }

    async fn get(&self, business_id: &str) -> StoreResult<Option<MenuItem>> {
        let doc = self
            .collection
            .find_one(doc! { "id": business_id })
            .await
            .map_err(store_error)?;
        Self::into_item(doc)
    }

    async fn list(&self, filters: &MenuFilters) -> StoreResult<Vec<MenuItem>> {
        let cursor = self
            .collection
            .find(list_filter(filters))
            .await
            .map_err(store_error)?;
        let docs: Vec<MenuItemDocument> = cursor.try_collect().await.map_err(store_error)?;
        Self::into_items(docs)
    }

    async fn categories(&self) -> StoreResult<Vec<String>> {
        let values = self
            .collection
            .distinct("category", doc! {})
            .await
            .map_err(store_error)?;

        Ok(values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    async fn update(
        &self,
        business_id: &str,
        patch: &UpdateMenuItemInput,
    ) -> StoreResult<Option<MenuItem>> {
        let update = patch_update(patch, now())?;
        let doc = self
            .collection
            .find_one_and_update(doc! { "id": business_id }, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(store_error)?;

        tracing::debug!("Updated menu item: {}", business_id);
        Self::into_item(doc)
    }

    async fn delete(&self, business_id: &str) -> StoreResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "id": business_id })
            .await
            .map_err(store_error)?;

        tracing::debug!("Deleted {} menu item(s): {}", result.deleted_count, business_id);
        Ok(result.deleted_count > 0)
    }

    async fn toggle_availability(&self, business_id: &str) -> StoreResult<Option<MenuItem>> {
        let doc = self
            .collection
            .find_one_and_update(doc! { "id": business_id }, toggle_pipeline(now()))
            .return_document(ReturnDocument::After)
            .await
            .map_err(store_error)?;

        Self::into_item(doc)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
