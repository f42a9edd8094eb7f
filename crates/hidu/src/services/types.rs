use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A menu item as stored and served.
///
/// `storage_id` is assigned by the store on insert and never accepted from
/// clients. `business_id` is the human-assigned key (e.g. `cf-001`) that every
/// operation addresses items by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
#[cfg_attr(feature = "graphql", graphql(complex, name = "MenuItem"))]
pub struct MenuItem {
    #[serde(rename = "_id")]
    #[cfg_attr(feature = "graphql", graphql(skip))]
    pub storage_id: String,
    #[serde(rename = "id")]
    #[cfg_attr(feature = "graphql", graphql(name = "id"))]
    pub business_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_large: Option<f64>,
    pub category: String,
    pub image_url: String,
    pub is_popular: bool,
    pub is_best_seller: bool,
    pub is_new: bool,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "graphql")]
#[async_graphql::ComplexObject]
impl MenuItem {
    /// Store-assigned identifier
    #[graphql(name = "_id")]
    async fn storage_id_field(&self) -> async_graphql::ID {
        async_graphql::ID(self.storage_id.clone())
    }
}

impl MenuItem {
    /// Generate a storage identifier for backends without native ids.
    ///
    /// Same length as a Mongo ObjectId hex string, drawn from a reduced
    /// alphabet so ids stay unambiguous when read aloud or copied by hand.
    pub fn generate_storage_id() -> String {
        const ALPHABET: &[char] = &[
            '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j',
            'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
        ];
        nanoid::nanoid!(24, ALPHABET)
    }

    /// Build a fresh record from a create payload, applying field defaults.
    pub fn from_input(storage_id: String, input: &CreateMenuItemInput, now: DateTime<Utc>) -> Self {
        Self {
            storage_id,
            business_id: input.business_id.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            price_large: input.price_large,
            category: input.category.clone(),
            image_url: input.image_url.clone(),
            is_popular: input.is_popular.unwrap_or(false),
            is_best_seller: input.is_best_seller.unwrap_or(false),
            is_new: input.is_new.unwrap_or(false),
            is_available: input.is_available.unwrap_or(true),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move `updated_at` forward, never behind `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }
}

/// Payload for creating a menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[cfg_attr(feature = "graphql", derive(async_graphql::InputObject))]
pub struct CreateMenuItemInput {
    #[serde(rename = "id")]
    #[cfg_attr(feature = "graphql", graphql(name = "id"))]
    pub business_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_large: Option<f64>,
    pub category: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_popular: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_best_seller: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

/// Partial update payload. Only fields that are `Some` are merged.
///
/// The business identifier is not part of the patch; it is immutable and
/// passed alongside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[cfg_attr(feature = "graphql", derive(async_graphql::InputObject))]
pub struct UpdateMenuItemInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_large: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_popular: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_best_seller: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

impl UpdateMenuItemInput {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the supplied fields into `item` and refresh its `updated_at`.
    pub fn apply_to(&self, item: &mut MenuItem, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(price_large) = self.price_large {
            item.price_large = Some(price_large);
        }
        if let Some(category) = &self.category {
            item.category = category.clone();
        }
        if let Some(image_url) = &self.image_url {
            item.image_url = image_url.clone();
        }
        if let Some(is_popular) = self.is_popular {
            item.is_popular = is_popular;
        }
        if let Some(is_best_seller) = self.is_best_seller {
            item.is_best_seller = is_best_seller;
        }
        if let Some(is_new) = self.is_new {
            item.is_new = is_new;
        }
        if let Some(is_available) = self.is_available {
            item.is_available = is_available;
        }
        item.touch(now);
    }
}

/// Listing filters. Filters are conjunctive; `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuFilters {
    pub category: Option<String>,
    pub is_available: Option<bool>,
}

impl MenuFilters {
    /// Category filter with empty strings treated as absent.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }

    /// Whether `item` passes every supplied filter.
    pub fn matches(&self, item: &MenuItem) -> bool {
        self.category().is_none_or(|c| item.category == c)
            && self.is_available.is_none_or(|a| item.is_available == a)
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed to call the API from a browser
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            cors_origin: "http://localhost:4321".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for storage backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage URI: `mongodb://...`, `mongodb+srv://...`, a local path or `s3://bucket/path`.
    /// Default: ".hidu/db/menu.lance" (relative to project root)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Mongo database name
    pub database: String,
    /// Collection (Mongo) or table (LanceDB) name
    pub collection: String,
    /// Mongo server selection / connect timeout
    pub connect_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: "hidu".to_string(),
            collection: "menuitems".to_string(),
            connect_timeout_ms: 5000,
        }
    }
}

/// Which store implementation a URI selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Lance,
}

impl StorageBackend {
    pub fn for_uri(uri: &str) -> Self {
        if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
            StorageBackend::Mongo
        } else {
            StorageBackend::Lance
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StorageBackend::Mongo => "mongodb",
            StorageBackend::Lance => "lancedb",
        };
        write!(f, "{}", s)
    }
}

/// Application configuration shared by the server and the CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}
