//! Promo strip repository
//!
//! Database operations for announcement banners. The "active" filter lives in
//! the service layer since the window check is pure time logic.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::PromoStrip;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Promo strip repository trait
#[async_trait]
pub trait PromoStripRepository: Send + Sync {
    /// Insert a new strip, returning it with the assigned id
    async fn create(&self, strip: &PromoStrip) -> Result<PromoStrip>;

    /// Get a strip by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<PromoStrip>>;

    /// List all strips, newest first
    async fn list(&self) -> Result<Vec<PromoStrip>>;

    /// List enabled strips, newest first
    async fn list_enabled(&self) -> Result<Vec<PromoStrip>>;

    /// Update all mutable strip fields
    async fn update(&self, strip: &PromoStrip) -> Result<()>;

    /// Delete a strip
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based promo strip repository implementation
pub struct SqlxPromoStripRepository {
    pool: DynDatabasePool,
}

impl SqlxPromoStripRepository {
    /// Create a new SQLx promo strip repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PromoStripRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PromoStripRepository for SqlxPromoStripRepository {
    async fn create(&self, strip: &PromoStrip) -> Result<PromoStrip> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_strip_sqlite(self.pool.as_sqlite().unwrap(), strip).await
            }
            DatabaseDriver::Mysql => create_strip_mysql(self.pool.as_mysql().unwrap(), strip).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PromoStrip>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_strip_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_strip_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self) -> Result<Vec<PromoStrip>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_strips_sqlite(self.pool.as_sqlite().unwrap(), false).await
            }
            DatabaseDriver::Mysql => list_strips_mysql(self.pool.as_mysql().unwrap(), false).await,
        }
    }

    async fn list_enabled(&self) -> Result<Vec<PromoStrip>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_strips_sqlite(self.pool.as_sqlite().unwrap(), true).await
            }
            DatabaseDriver::Mysql => list_strips_mysql(self.pool.as_mysql().unwrap(), true).await,
        }
    }

    async fn update(&self, strip: &PromoStrip) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_strip_sqlite(self.pool.as_sqlite().unwrap(), strip).await
            }
            DatabaseDriver::Mysql => update_strip_mysql(self.pool.as_mysql().unwrap(), strip).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_strip_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_strip_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

const STRIP_COLUMNS: &str = "id, text, link_url, background_color, text_color, starts_at, expires_at, enabled, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_strip_sqlite(pool: &SqlitePool, strip: &PromoStrip) -> Result<PromoStrip> {
    let result = sqlx::query(
        r#"
        INSERT INTO promo_strips (text, link_url, background_color, text_color, starts_at, expires_at, enabled, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&strip.text)
    .bind(&strip.link_url)
    .bind(&strip.background_color)
    .bind(&strip.text_color)
    .bind(strip.starts_at)
    .bind(strip.expires_at)
    .bind(strip.enabled)
    .bind(strip.created_at)
    .bind(strip.updated_at)
    .execute(pool)
    .await
    .context("Failed to create promo strip")?;

    let mut created = strip.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_strip_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<PromoStrip>> {
    let query = format!("SELECT {} FROM promo_strips WHERE id = ?", STRIP_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get promo strip")?;

    Ok(row.map(|row| row_to_strip_sqlite(&row)))
}

async fn list_strips_sqlite(pool: &SqlitePool, enabled_only: bool) -> Result<Vec<PromoStrip>> {
    let query = if enabled_only {
        format!(
            "SELECT {} FROM promo_strips WHERE enabled = 1 ORDER BY created_at DESC",
            STRIP_COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM promo_strips ORDER BY created_at DESC",
            STRIP_COLUMNS
        )
    };

    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .await
        .context("Failed to list promo strips")?;

    Ok(rows.iter().map(row_to_strip_sqlite).collect())
}

async fn update_strip_sqlite(pool: &SqlitePool, strip: &PromoStrip) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE promo_strips
        SET text = ?, link_url = ?, background_color = ?, text_color = ?,
            starts_at = ?, expires_at = ?, enabled = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&strip.text)
    .bind(&strip.link_url)
    .bind(&strip.background_color)
    .bind(&strip.text_color)
    .bind(strip.starts_at)
    .bind(strip.expires_at)
    .bind(strip.enabled)
    .bind(strip.id)
    .execute(pool)
    .await
    .context("Failed to update promo strip")?;

    Ok(())
}

async fn delete_strip_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM promo_strips WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete promo strip")?;

    Ok(())
}

fn row_to_strip_sqlite(row: &sqlx::sqlite::SqliteRow) -> PromoStrip {
    PromoStrip {
        id: row.get("id"),
        text: row.get("text"),
        link_url: row.get("link_url"),
        background_color: row.get("background_color"),
        text_color: row.get("text_color"),
        starts_at: row.get("starts_at"),
        expires_at: row.get("expires_at"),
        enabled: row.get("enabled"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_strip_mysql(pool: &MySqlPool, strip: &PromoStrip) -> Result<PromoStrip> {
    let result = sqlx::query(
        r#"
        INSERT INTO promo_strips (text, link_url, background_color, text_color, starts_at, expires_at, enabled, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&strip.text)
    .bind(&strip.link_url)
    .bind(&strip.background_color)
    .bind(&strip.text_color)
    .bind(strip.starts_at)
    .bind(strip.expires_at)
    .bind(strip.enabled)
    .bind(strip.created_at)
    .bind(strip.updated_at)
    .execute(pool)
    .await
    .context("Failed to create promo strip")?;

    let mut created = strip.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn get_strip_mysql(pool: &MySqlPool, id: i64) -> Result<Option<PromoStrip>> {
    let query = format!("SELECT {} FROM promo_strips WHERE id = ?", STRIP_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get promo strip")?;

    Ok(row.map(|row| row_to_strip_mysql(&row)))
}

async fn list_strips_mysql(pool: &MySqlPool, enabled_only: bool) -> Result<Vec<PromoStrip>> {
    let query = if enabled_only {
        format!(
            "SELECT {} FROM promo_strips WHERE enabled = 1 ORDER BY created_at DESC",
            STRIP_COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM promo_strips ORDER BY created_at DESC",
            STRIP_COLUMNS
        )
    };

    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .await
        .context("Failed to list promo strips")?;

    Ok(rows.iter().map(row_to_strip_mysql).collect())
}

async fn update_strip_mysql(pool: &MySqlPool, strip: &PromoStrip) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE promo_strips
        SET text = ?, link_url = ?, background_color = ?, text_color = ?,
            starts_at = ?, expires_at = ?, enabled = ?
        WHERE id = ?
        "#,
    )
    .bind(&strip.text)
    .bind(&strip.link_url)
    .bind(&strip.background_color)
    .bind(&strip.text_color)
    .bind(strip.starts_at)
    .bind(strip.expires_at)
    .bind(strip.enabled)
    .bind(strip.id)
    .execute(pool)
    .await
    .context("Failed to update promo strip")?;

    Ok(())
}

async fn delete_strip_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM promo_strips WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete promo strip")?;

    Ok(())
}

fn row_to_strip_mysql(row: &sqlx::mysql::MySqlRow) -> PromoStrip {
    let enabled: i8 = row.get("enabled");

    PromoStrip {
        id: row.get("id"),
        text: row.get("text"),
        link_url: row.get("link_url"),
        background_color: row.get("background_color"),
        text_color: row.get("text_color"),
        starts_at: row.get("starts_at"),
        expires_at: row.get("expires_at"),
        enabled: enabled != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
