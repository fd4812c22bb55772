//! Settings repository
//!
//! Key/value store for runtime-editable configuration: SMTP parameters, the
//! site title, the Discord channel routing, and anything else admins can
//! change without a redeploy.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// A single setting row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    /// Setting key
    pub key: String,
    /// Setting value
    pub value: String,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Settings repository trait
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Get a setting value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a setting value (insert or update)
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Get all settings
    async fn get_all(&self) -> Result<Vec<Setting>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;
}

/// SQLx-based settings repository implementation
pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    /// Create a new SQLx settings repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_sqlite(self.pool.as_sqlite().unwrap(), key).await,
            DatabaseDriver::Mysql => get_mysql(self.pool.as_mysql().unwrap(), key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => set_sqlite(self.pool.as_sqlite().unwrap(), key, value).await,
            DatabaseDriver::Mysql => set_mysql(self.pool.as_mysql().unwrap(), key, value).await,
        }
    }

    async fn get_all(&self) -> Result<Vec<Setting>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_all_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => get_all_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), key).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), key).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_sqlite(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to get setting")?;

    Ok(row.map(|row| row.get("value")))
}

async fn set_sqlite(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .context("Failed to set setting")?;

    Ok(())
}

async fn get_all_sqlite(pool: &SqlitePool) -> Result<Vec<Setting>> {
    let rows = sqlx::query("SELECT key, value, updated_at FROM settings ORDER BY key")
        .fetch_all(pool)
        .await
        .context("Failed to get all settings")?;

    Ok(rows
        .iter()
        .map(|row| Setting {
            key: row.get("key"),
            value: row.get("value"),
            updated_at: row.get("updated_at"),
        })
        .collect())
}

async fn delete_sqlite(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await
        .context("Failed to delete setting")?;

    Ok(())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_mysql(pool: &MySqlPool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM settings WHERE `key` = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to get setting")?;

    Ok(row.map(|row| row.get("value")))
}

async fn set_mysql(pool: &MySqlPool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (`key`, value) VALUES (?, ?)
        ON DUPLICATE KEY UPDATE value = VALUES(value)
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .context("Failed to set setting")?;

    Ok(())
}

async fn get_all_mysql(pool: &MySqlPool) -> Result<Vec<Setting>> {
    let rows = sqlx::query("SELECT `key`, value, updated_at FROM settings ORDER BY `key`")
        .fetch_all(pool)
        .await
        .context("Failed to get all settings")?;

    Ok(rows
        .iter()
        .map(|row| Setting {
            key: row.get("key"),
            value: row.get("value"),
            updated_at: row.get("updated_at"),
        })
        .collect())
}

async fn delete_mysql(pool: &MySqlPool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE `key` = ?")
        .bind(key)
        .execute(pool)
        .await
        .context("Failed to delete setting")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxSettingsRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSettingsRepository::new(pool)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let repo = setup().await;

        assert!(repo.get("site_title").await.unwrap().is_none());

        repo.set("site_title", "Studiobase").await.unwrap();
        assert_eq!(
            repo.get("site_title").await.unwrap().as_deref(),
            Some("Studiobase")
        );
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let repo = setup().await;

        repo.set("smtp_host", "smtp.old.test").await.unwrap();
        repo.set("smtp_host", "smtp.new.test").await.unwrap();

        assert_eq!(
            repo.get("smtp_host").await.unwrap().as_deref(),
            Some("smtp.new.test")
        );
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup().await;

        repo.set("temp", "x").await.unwrap();
        repo.delete("temp").await.unwrap();
        assert!(repo.get("temp").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_all_sorted_by_key() {
        let repo = setup().await;

        repo.set("b_key", "2").await.unwrap();
        repo.set("a_key", "1").await.unwrap();

        let all = repo.get_all().await.unwrap();
        assert_eq!(all[0].key, "a_key");
        assert_eq!(all[1].key, "b_key");
    }
}
