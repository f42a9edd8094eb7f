//! Test utilities for the hidu crate
//!
//! This module provides reusable test doubles for unit and integration testing:
//! an in-memory `Database` and a few sample menu items.

use crate::db::{now, Database, StoreError, StoreResult};
use crate::services::{CreateMenuItemInput, MenuFilters, MenuItem, UpdateMenuItemInput};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory database implementation for testing.
///
/// Items are kept in insertion order. Every operation holds the same lock, so
/// writes behave atomically like a real single-document store.
pub struct TestDatabase {
    items: Mutex<Vec<MenuItem>>,
    unavailable: AtomicBool,
}

impl TestDatabase {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("test store offline".to_string()));
        }
        Ok(())
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Database for TestDatabase {
    async fn insert(&self, input: &CreateMenuItemInput) -> StoreResult<MenuItem> {
        self.check()?;
        let mut items = self.items.lock().unwrap();
        if items.iter().any(|i| i.business_id == input.business_id) {
            return Err(StoreError::Duplicate(input.business_id.clone()));
        }

        let item = MenuItem::from_input(MenuItem::generate_storage_id(), input, now());
        items.push(item.clone());
        Ok(item)
    }

    async fn get(&self, business_id: &str) -> StoreResult<Option<MenuItem>> {
        self.check()?;
        let items = self.items.lock().unwrap();
        Ok(items.iter().find(|i| i.business_id == business_id).cloned())
    }

    async fn list(&self, filters: &MenuFilters) -> StoreResult<Vec<MenuItem>> {
        self.check()?;
        let items = self.items.lock().unwrap();
        Ok(items.iter().filter(|i| filters.matches(i)).cloned().collect())
    }

    async fn categories(&self) -> StoreResult<Vec<String>> {
        self.check()?;
        let items = self.items.lock().unwrap();
        let categories: BTreeSet<String> = items.iter().map(|i| i.category.clone()).collect();
        Ok(categories.into_iter().collect())
    }

    async fn update(
        &self,
        business_id: &str,
        patch: &UpdateMenuItemInput,
    ) -> StoreResult<Option<MenuItem>> {
        self.check()?;
        let mut items = self.items.lock().unwrap();
        Ok(items
            .iter_mut()
            .find(|i| i.business_id == business_id)
            .map(|item| {
                patch.apply_to(item, now());
                item.clone()
            }))
    }

    async fn delete(&self, business_id: &str) -> StoreResult<bool> {
        self.check()?;
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|i| i.business_id != business_id);
        Ok(items.len() < before)
    }

    async fn toggle_availability(&self, business_id: &str) -> StoreResult<Option<MenuItem>> {
        self.check()?;
        let mut items = self.items.lock().unwrap();
        Ok(items
            .iter_mut()
            .find(|i| i.business_id == business_id)
            .map(|item| {
                item.is_available = !item.is_available;
                item.touch(now());
                item.clone()
            }))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check()
    }
}

/// A valid create payload for `business_id` in `category`
pub fn sample_input(business_id: &str, category: &str) -> CreateMenuItemInput {
    CreateMenuItemInput {
        business_id: business_id.to_string(),
        name: format!("Món {}", business_id),
        description: format!("Đồ uống {} pha theo công thức nhà Hidu", category),
        price: 25000.0,
        price_large: None,
        category: category.to_string(),
        image_url: format!("/images/menu/{}.jpg", business_id),
        is_popular: None,
        is_best_seller: None,
        is_new: None,
        is_available: None,
    }
}

/// A stored item built from [`sample_input`]
pub fn sample_item(business_id: &str, category: &str) -> MenuItem {
    MenuItem::from_input(
        MenuItem::generate_storage_id(),
        &sample_input(business_id, category),
        now(),
    )
}
