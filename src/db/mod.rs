use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgPool, Postgres};
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use crate::models::{HealthReport, Item, ItemFields, ItemId, PoolStats};

#[cfg(test)]
pub mod memory;
mod monitor;

use monitor::PoolMonitor;

pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Persistence contract for items. Handlers only see this trait; the
/// composition root decides which implementation backs it.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Inserts a live row and returns its id.
    async fn create(&self, fields: &ItemFields) -> AppResult<ItemId>;

    /// Fetches a live item; soft-deleted rows are `NotFound`.
    async fn get(&self, id: ItemId) -> AppResult<Item>;

    /// All live items, in id order. Empty store is an empty vec.
    async fn list(&self) -> AppResult<Vec<Item>>;

    async fn update(&self, id: ItemId, fields: &ItemFields) -> AppResult<()>;

    /// Soft delete. Missing or already-deleted ids succeed silently.
    async fn delete(&self, id: ItemId) -> AppResult<()>;

    async fn migrate(&self) -> AppResult<()>;

    async fn health(&self) -> HealthReport;

    async fn close(&self);
}

pub(crate) fn not_found(id: ItemId) -> AppError {
    AppError::NotFound(format!("record not found, ID: {id}"))
}

// ── Postgres ──────────────────────────────────────────────────────────────────

pub struct PgItemStore {
    pool: PgPool,
    monitor: Arc<PoolMonitor>,
    max_connections: u32,
    database: String,
}

impl PgItemStore {
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let monitor = Arc::new(PoolMonitor::new(config.idle_timeout, config.max_lifetime));
        let on_connect = Arc::clone(&monitor);
        let on_acquire = Arc::clone(&monitor);
        let on_release = Arc::clone(&monitor);

        // The reaper enforces both limits; the hooks only see connections
        // that cross a limit while they are being handed around.
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .after_connect(move |_conn, _meta| {
                on_connect.record_open();
                Box::pin(async move { Ok::<_, sqlx::Error>(()) })
            })
            .before_acquire(move |_conn, meta| {
                let keep = on_acquire.admit(meta.age, meta.idle_for);
                Box::pin(async move { Ok::<_, sqlx::Error>(keep) })
            })
            .after_release(move |_conn, meta| {
                let keep = on_release.admit(meta.age, Duration::ZERO);
                Box::pin(async move { Ok::<_, sqlx::Error>(keep) })
            })
            .connect_with(config.connect_options())
            .await?;

        Ok(Self {
            pool,
            monitor,
            max_connections: config.max_connections,
            database: config.name.clone(),
        })
    }

    /// Checks a connection out of the pool, recording a wait when none was
    /// free and the pool was already at its ceiling.
    async fn acquire(&self) -> AppResult<PoolConnection<Postgres>> {
        let saturated =
            self.pool.num_idle() == 0 && self.pool.size() >= self.max_connections;
        let start = Instant::now();
        let conn = self.pool.acquire().await?;
        if saturated {
            self.monitor.record_wait(start.elapsed());
        }
        Ok(conn)
    }

    /// Pings on a pooled connection and snapshots the pool while still
    /// holding it. The probe's connection is reported as idle.
    async fn probe(&self) -> AppResult<PoolStats> {
        let mut conn = self.acquire().await?;
        conn.ping().await?;
        let idle = u32::try_from(self.pool.num_idle())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        Ok(self.monitor.snapshot(self.pool.size(), idle))
    }

    /// The write half of `update`, run after the existence check.
    async fn write_update(&self, id: ItemId, fields: &ItemFields) -> AppResult<()> {
        // Re-checking deleted_at keeps a concurrent delete from being undone.
        let mut conn = self.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE items
            SET name       = $1,
                price      = $2,
                in_stock   = $3,
                updated_at = $4
            WHERE id = $5 AND deleted_at IS NULL
            "#,
        )
        .bind(&fields.name)
        .bind(fields.price)
        .bind(fields.in_stock)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            debug!(id, error = %e, "Item update statement failed");
            AppError::UpdateFailed(id)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::UpdateFailed(id));
        }
        Ok(())
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn create(&self, fields: &ItemFields) -> AppResult<ItemId> {
        let mut conn = self.acquire().await?;
        let (id,): (ItemId,) = sqlx::query_as(
            r#"
            INSERT INTO items (name, price, in_stock)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&fields.name)
        .bind(fields.price)
        .bind(fields.in_stock)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    async fn get(&self, id: ItemId) -> AppResult<Item> {
        let mut conn = self.acquire().await?;
        sqlx::query_as::<_, Item>(
            r#"
            SELECT id, created_at, updated_at, deleted_at, name, price, in_stock
            FROM items
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found(id))
    }

    async fn list(&self) -> AppResult<Vec<Item>> {
        let mut conn = self.acquire().await?;
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, created_at, updated_at, deleted_at, name, price, in_stock
            FROM items
            WHERE deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    async fn update(&self, id: ItemId, fields: &ItemFields) -> AppResult<()> {
        self.get(id).await?;
        self.write_update(id, fields).await
    }

    async fn delete(&self, id: ItemId) -> AppResult<()> {
        let mut conn = self.acquire().await?;
        let result = sqlx::query(
            "UPDATE items SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

        debug!(id, rows = result.rows_affected(), "Soft delete applied");
        Ok(())
    }

    async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn health(&self) -> HealthReport {
        match tokio::time::timeout(HEALTH_PROBE_TIMEOUT, self.probe()).await {
            Ok(Ok(stats)) => HealthReport::up(stats),
            Ok(Err(e)) => {
                error!(error = %e, "Database health probe failed");
                HealthReport::down(e)
            }
            Err(_) => {
                error!(timeout = ?HEALTH_PROBE_TIMEOUT, "Database health probe timed out");
                HealthReport::down(format!("ping timed out after {HEALTH_PROBE_TIMEOUT:?}"))
            }
        }
    }

    async fn close(&self) {
        self.pool.close().await;
        info!(database = %self.database, "Disconnected from database");
    }
}
