//! Banned email repository
//!
//! Addresses are stored lowercased; `is_banned` lowercases the candidate
//! before the lookup so the check is case-insensitive.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::BannedEmail;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Banned email repository trait
#[async_trait]
pub trait BannedEmailRepository: Send + Sync {
    /// Ban an address. Already-banned addresses are left untouched.
    async fn ban(&self, email: &str, reason: Option<&str>) -> Result<()>;

    /// Remove a ban
    async fn unban(&self, email: &str) -> Result<()>;

    /// Check whether an address is banned (case-insensitive)
    async fn is_banned(&self, email: &str) -> Result<bool>;

    /// List all banned addresses, newest first
    async fn list(&self) -> Result<Vec<BannedEmail>>;
}

/// SQLx-based banned email repository implementation
pub struct SqlxBannedEmailRepository {
    pool: DynDatabasePool,
}

impl SqlxBannedEmailRepository {
    /// Create a new SQLx banned email repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BannedEmailRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BannedEmailRepository for SqlxBannedEmailRepository {
    async fn ban(&self, email: &str, reason: Option<&str>) -> Result<()> {
        let email = email.trim().to_lowercase();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                ban_sqlite(self.pool.as_sqlite().unwrap(), &email, reason).await
            }
            DatabaseDriver::Mysql => ban_mysql(self.pool.as_mysql().unwrap(), &email, reason).await,
        }
    }

    async fn unban(&self, email: &str) -> Result<()> {
        let email = email.trim().to_lowercase();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => unban_sqlite(self.pool.as_sqlite().unwrap(), &email).await,
            DatabaseDriver::Mysql => unban_mysql(self.pool.as_mysql().unwrap(), &email).await,
        }
    }

    async fn is_banned(&self, email: &str) -> Result<bool> {
        let email = email.trim().to_lowercase();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                is_banned_sqlite(self.pool.as_sqlite().unwrap(), &email).await
            }
            DatabaseDriver::Mysql => is_banned_mysql(self.pool.as_mysql().unwrap(), &email).await,
        }
    }

    async fn list(&self) -> Result<Vec<BannedEmail>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn ban_sqlite(pool: &SqlitePool, email: &str, reason: Option<&str>) -> Result<()> {
    sqlx::query(
        "INSERT INTO banned_emails (email, reason) VALUES (?, ?) ON CONFLICT(email) DO NOTHING",
    )
    .bind(email)
    .bind(reason)
    .execute(pool)
    .await
    .context("Failed to ban email")?;

    Ok(())
}

async fn unban_sqlite(pool: &SqlitePool, email: &str) -> Result<()> {
    sqlx::query("DELETE FROM banned_emails WHERE email = ?")
        .bind(email)
        .execute(pool)
        .await
        .context("Failed to unban email")?;

    Ok(())
}

async fn is_banned_sqlite(pool: &SqlitePool, email: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM banned_emails WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await
        .context("Failed to check banned email")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<BannedEmail>> {
    let rows = sqlx::query(
        "SELECT id, email, reason, created_at FROM banned_emails ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list banned emails")?;

    Ok(rows
        .iter()
        .map(|row| BannedEmail {
            id: row.get("id"),
            email: row.get("email"),
            reason: row.get("reason"),
            created_at: row.get("created_at"),
        })
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn ban_mysql(pool: &MySqlPool, email: &str, reason: Option<&str>) -> Result<()> {
    sqlx::query("INSERT IGNORE INTO banned_emails (email, reason) VALUES (?, ?)")
        .bind(email)
        .bind(reason)
        .execute(pool)
        .await
        .context("Failed to ban email")?;

    Ok(())
}

async fn unban_mysql(pool: &MySqlPool, email: &str) -> Result<()> {
    sqlx::query("DELETE FROM banned_emails WHERE email = ?")
        .bind(email)
        .execute(pool)
        .await
        .context("Failed to unban email")?;

    Ok(())
}

async fn is_banned_mysql(pool: &MySqlPool, email: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM banned_emails WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await
        .context("Failed to check banned email")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn list_mysql(pool: &MySqlPool) -> Result<Vec<BannedEmail>> {
    let rows = sqlx::query(
        "SELECT id, email, reason, created_at FROM banned_emails ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list banned emails")?;

    Ok(rows
        .iter()
        .map(|row| BannedEmail {
            id: row.get("id"),
            email: row.get("email"),
            reason: row.get("reason"),
            created_at: row.get("created_at"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxBannedEmailRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxBannedEmailRepository::new(pool)
    }

    #[tokio::test]
    async fn test_ban_and_check() {
        let repo = setup().await;

        assert!(!repo.is_banned("spam@bad.test").await.unwrap());
        repo.ban("spam@bad.test", Some("spam")).await.unwrap();
        assert!(repo.is_banned("spam@bad.test").await.unwrap());
    }

    #[tokio::test]
    async fn test_ban_is_case_insensitive() {
        let repo = setup().await;

        repo.ban("Spam@Bad.Test", None).await.unwrap();
        assert!(repo.is_banned("spam@bad.test").await.unwrap());
        assert!(repo.is_banned("SPAM@BAD.TEST").await.unwrap());

        let entries = repo.list().await.unwrap();
        assert_eq!(entries[0].email, "spam@bad.test");
    }

    #[tokio::test]
    async fn test_double_ban_is_harmless() {
        let repo = setup().await;

        repo.ban("dup@bad.test", Some("first")).await.unwrap();
        repo.ban("dup@bad.test", Some("second")).await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unban() {
        let repo = setup().await;

        repo.ban("temp@bad.test", None).await.unwrap();
        repo.unban("TEMP@bad.test").await.unwrap();
        assert!(!repo.is_banned("temp@bad.test").await.unwrap());
    }
}
