//! In-process `ItemStore` used by the handler tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{not_found, ItemStore};
use crate::error::{AppError, AppResult};
use crate::models::{HealthReport, Item, ItemFields, ItemId, PoolStats};

#[derive(Debug, Default)]
pub struct MemoryItemStore {
    rows: RwLock<BTreeMap<ItemId, Item>>,
    /// When set, every data operation fails as if the connection dropped.
    offline: bool,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Every row including soft-deleted ones.
    pub async fn raw_rows(&self) -> Vec<Item> {
        self.rows.read().await.values().cloned().collect()
    }

    fn check_online(&self) -> AppResult<()> {
        if self.offline {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn create(&self, fields: &ItemFields) -> AppResult<ItemId> {
        self.check_online()?;
        let mut rows = self.rows.write().await;
        let id = rows.keys().next_back().map_or(1, |last| last + 1);
        let now = Utc::now();
        rows.insert(
            id,
            Item {
                id,
                created_at: now,
                updated_at: now,
                deleted_at: None,
                name: fields.name.clone(),
                price: fields.price,
                in_stock: fields.in_stock,
            },
        );
        Ok(id)
    }

    async fn get(&self, id: ItemId) -> AppResult<Item> {
        self.check_online()?;
        self.rows
            .read()
            .await
            .get(&id)
            .filter(|item| item.deleted_at.is_none())
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn list(&self) -> AppResult<Vec<Item>> {
        self.check_online()?;
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|item| item.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn update(&self, id: ItemId, fields: &ItemFields) -> AppResult<()> {
        self.check_online()?;
        let mut rows = self.rows.write().await;
        let item = rows
            .get_mut(&id)
            .filter(|item| item.deleted_at.is_none())
            .ok_or_else(|| not_found(id))?;
        item.name = fields.name.clone();
        item.price = fields.price;
        item.in_stock = fields.in_stock;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: ItemId) -> AppResult<()> {
        self.check_online()?;
        if let Some(item) = self.rows.write().await.get_mut(&id) {
            item.deleted_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn migrate(&self) -> AppResult<()> {
        Ok(())
    }

    async fn health(&self) -> HealthReport {
        if self.offline {
            return HealthReport::down("connection refused");
        }
        HealthReport::up(PoolStats::default())
    }

    async fn close(&self) {}
}
