//! Submission repository
//!
//! Database operations for the three public form targets: contact messages,
//! newsletter subscriptions and website-setup quote requests. They share one
//! repository since each is a single insert-and-list table.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ContactSubmission, NewsletterSubscription, WebsiteSetupSubmission};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Submission repository trait
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Store a contact form submission
    async fn create_contact(&self, submission: &ContactSubmission) -> Result<ContactSubmission>;

    /// List contact submissions, newest first
    async fn list_contacts(&self) -> Result<Vec<ContactSubmission>>;

    /// Delete a contact submission
    async fn delete_contact(&self, id: i64) -> Result<()>;

    /// Subscribe an email to the newsletter. Returns false if it was already
    /// subscribed.
    async fn subscribe_newsletter(&self, email: &str) -> Result<bool>;

    /// Unsubscribe an email from the newsletter
    async fn unsubscribe_newsletter(&self, email: &str) -> Result<()>;

    /// List newsletter subscriptions, newest first
    async fn list_subscriptions(&self) -> Result<Vec<NewsletterSubscription>>;

    /// Store a website-setup quote request
    async fn create_website_setup(
        &self,
        submission: &WebsiteSetupSubmission,
    ) -> Result<WebsiteSetupSubmission>;

    /// List website-setup requests, newest first
    async fn list_website_setups(&self) -> Result<Vec<WebsiteSetupSubmission>>;

    /// Delete a website-setup request
    async fn delete_website_setup(&self, id: i64) -> Result<()>;
}

/// SQLx-based submission repository implementation
pub struct SqlxSubmissionRepository {
    pool: DynDatabasePool,
}

impl SqlxSubmissionRepository {
    /// Create a new SQLx submission repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubmissionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubmissionRepository for SqlxSubmissionRepository {
    async fn create_contact(&self, submission: &ContactSubmission) -> Result<ContactSubmission> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_contact_sqlite(self.pool.as_sqlite().unwrap(), submission).await
            }
            DatabaseDriver::Mysql => {
                create_contact_mysql(self.pool.as_mysql().unwrap(), submission).await
            }
        }
    }

    async fn list_contacts(&self) -> Result<Vec<ContactSubmission>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_contacts_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_contacts_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn delete_contact(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_row_sqlite(self.pool.as_sqlite().unwrap(), "contact_submissions", id).await
            }
            DatabaseDriver::Mysql => {
                delete_row_mysql(self.pool.as_mysql().unwrap(), "contact_submissions", id).await
            }
        }
    }

    async fn subscribe_newsletter(&self, email: &str) -> Result<bool> {
        let email = email.trim().to_lowercase();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                subscribe_sqlite(self.pool.as_sqlite().unwrap(), &email).await
            }
            DatabaseDriver::Mysql => subscribe_mysql(self.pool.as_mysql().unwrap(), &email).await,
        }
    }

    async fn unsubscribe_newsletter(&self, email: &str) -> Result<()> {
        let email = email.trim().to_lowercase();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                unsubscribe_sqlite(self.pool.as_sqlite().unwrap(), &email).await
            }
            DatabaseDriver::Mysql => unsubscribe_mysql(self.pool.as_mysql().unwrap(), &email).await,
        }
    }

    async fn list_subscriptions(&self) -> Result<Vec<NewsletterSubscription>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_subscriptions_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => list_subscriptions_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn create_website_setup(
        &self,
        submission: &WebsiteSetupSubmission,
    ) -> Result<WebsiteSetupSubmission> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_setup_sqlite(self.pool.as_sqlite().unwrap(), submission).await
            }
            DatabaseDriver::Mysql => {
                create_setup_mysql(self.pool.as_mysql().unwrap(), submission).await
            }
        }
    }

    async fn list_website_setups(&self) -> Result<Vec<WebsiteSetupSubmission>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_setups_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_setups_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn delete_website_setup(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_row_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    "website_setup_submissions",
                    id,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                delete_row_mysql(
                    self.pool.as_mysql().unwrap(),
                    "website_setup_submissions",
                    id,
                )
                .await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_contact_sqlite(
    pool: &SqlitePool,
    submission: &ContactSubmission,
) -> Result<ContactSubmission> {
    let result = sqlx::query(
        "INSERT INTO contact_submissions (name, email, message, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&submission.name)
    .bind(&submission.email)
    .bind(&submission.message)
    .bind(submission.created_at)
    .execute(pool)
    .await
    .context("Failed to create contact submission")?;

    let mut created = submission.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn list_contacts_sqlite(pool: &SqlitePool) -> Result<Vec<ContactSubmission>> {
    let rows = sqlx::query(
        "SELECT id, name, email, message, created_at FROM contact_submissions ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list contact submissions")?;

    Ok(rows
        .iter()
        .map(|row| ContactSubmission {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            message: row.get("message"),
            created_at: row.get("created_at"),
        })
        .collect())
}

// table comes from a fixed set of callers, never from user input
async fn delete_row_sqlite(pool: &SqlitePool, table: &str, id: i64) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to delete from {}", table))?;

    Ok(())
}

async fn subscribe_sqlite(pool: &SqlitePool, email: &str) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO newsletter_subscriptions (email) VALUES (?) ON CONFLICT(email) DO NOTHING",
    )
    .bind(email)
    .execute(pool)
    .await
    .context("Failed to subscribe to newsletter")?;

    Ok(result.rows_affected() == 1)
}

async fn unsubscribe_sqlite(pool: &SqlitePool, email: &str) -> Result<()> {
    sqlx::query("DELETE FROM newsletter_subscriptions WHERE email = ?")
        .bind(email)
        .execute(pool)
        .await
        .context("Failed to unsubscribe from newsletter")?;

    Ok(())
}

async fn list_subscriptions_sqlite(pool: &SqlitePool) -> Result<Vec<NewsletterSubscription>> {
    let rows = sqlx::query(
        "SELECT id, email, subscribed_at FROM newsletter_subscriptions ORDER BY subscribed_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list newsletter subscriptions")?;

    Ok(rows
        .iter()
        .map(|row| NewsletterSubscription {
            id: row.get("id"),
            email: row.get("email"),
            subscribed_at: row.get("subscribed_at"),
        })
        .collect())
}

async fn create_setup_sqlite(
    pool: &SqlitePool,
    submission: &WebsiteSetupSubmission,
) -> Result<WebsiteSetupSubmission> {
    let result = sqlx::query(
        r#"
        INSERT INTO website_setup_submissions (name, email, company, website_type, budget, details, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&submission.name)
    .bind(&submission.email)
    .bind(&submission.company)
    .bind(&submission.website_type)
    .bind(&submission.budget)
    .bind(&submission.details)
    .bind(submission.created_at)
    .execute(pool)
    .await
    .context("Failed to create website setup submission")?;

    let mut created = submission.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn list_setups_sqlite(pool: &SqlitePool) -> Result<Vec<WebsiteSetupSubmission>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, email, company, website_type, budget, details, created_at
        FROM website_setup_submissions
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list website setup submissions")?;

    Ok(rows.iter().map(row_to_setup_sqlite).collect())
}

fn row_to_setup_sqlite(row: &sqlx::sqlite::SqliteRow) -> WebsiteSetupSubmission {
    WebsiteSetupSubmission {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        company: row.get("company"),
        website_type: row.get("website_type"),
        budget: row.get("budget"),
        details: row.get("details"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_contact_mysql(
    pool: &MySqlPool,
    submission: &ContactSubmission,
) -> Result<ContactSubmission> {
    let result = sqlx::query(
        "INSERT INTO contact_submissions (name, email, message, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&submission.name)
    .bind(&submission.email)
    .bind(&submission.message)
    .bind(submission.created_at)
    .execute(pool)
    .await
    .context("Failed to create contact submission")?;

    let mut created = submission.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn list_contacts_mysql(pool: &MySqlPool) -> Result<Vec<ContactSubmission>> {
    let rows = sqlx::query(
        "SELECT id, name, email, message, created_at FROM contact_submissions ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list contact submissions")?;

    Ok(rows
        .iter()
        .map(|row| ContactSubmission {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            message: row.get("message"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn delete_row_mysql(pool: &MySqlPool, table: &str, id: i64) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to delete from {}", table))?;

    Ok(())
}

async fn subscribe_mysql(pool: &MySqlPool, email: &str) -> Result<bool> {
    let result = sqlx::query("INSERT IGNORE INTO newsletter_subscriptions (email) VALUES (?)")
        .bind(email)
        .execute(pool)
        .await
        .context("Failed to subscribe to newsletter")?;

    Ok(result.rows_affected() == 1)
}

async fn unsubscribe_mysql(pool: &MySqlPool, email: &str) -> Result<()> {
    sqlx::query("DELETE FROM newsletter_subscriptions WHERE email = ?")
        .bind(email)
        .execute(pool)
        .await
        .context("Failed to unsubscribe from newsletter")?;

    Ok(())
}

async fn list_subscriptions_mysql(pool: &MySqlPool) -> Result<Vec<NewsletterSubscription>> {
    let rows = sqlx::query(
        "SELECT id, email, subscribed_at FROM newsletter_subscriptions ORDER BY subscribed_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list newsletter subscriptions")?;

    Ok(rows
        .iter()
        .map(|row| NewsletterSubscription {
            id: row.get("id"),
            email: row.get("email"),
            subscribed_at: row.get("subscribed_at"),
        })
        .collect())
}

async fn create_setup_mysql(
    pool: &MySqlPool,
    submission: &WebsiteSetupSubmission,
) -> Result<WebsiteSetupSubmission> {
    let result = sqlx::query(
        r#"
        INSERT INTO website_setup_submissions (name, email, company, website_type, budget, details, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&submission.name)
    .bind(&submission.email)
    .bind(&submission.company)
    .bind(&submission.website_type)
    .bind(&submission.budget)
    .bind(&submission.details)
    .bind(submission.created_at)
    .execute(pool)
    .await
    .context("Failed to create website setup submission")?;

    let mut created = submission.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn list_setups_mysql(pool: &MySqlPool) -> Result<Vec<WebsiteSetupSubmission>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, email, company, website_type, budget, details, created_at
        FROM website_setup_submissions
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list website setup submissions")?;

    Ok(rows.iter().map(row_to_setup_mysql).collect())
}

fn row_to_setup_mysql(row: &sqlx::mysql::MySqlRow) -> WebsiteSetupSubmission {
    WebsiteSetupSubmission {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        company: row.get("company"),
        website_type: row.get("website_type"),
        budget: row.get("budget"),
        details: row.get("details"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup() -> SqlxSubmissionRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSubmissionRepository::new(pool)
    }

    #[tokio::test]
    async fn test_contact_submission() {
        let repo = setup().await;

        let created = repo
            .create_contact(&ContactSubmission {
                id: 0,
                name: "Jordan".to_string(),
                email: "jordan@example.com".to_string(),
                message: "Need a redesign".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(created.id > 0);

        let contacts = repo.list_contacts().await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].message, "Need a redesign");

        repo.delete_contact(created.id).await.unwrap();
        assert!(repo.list_contacts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newsletter_subscribe_dedups() {
        let repo = setup().await;

        assert!(repo.subscribe_newsletter("sub@example.com").await.unwrap());
        assert!(!repo.subscribe_newsletter("Sub@Example.com").await.unwrap());

        let subs = repo.list_subscriptions().await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].email, "sub@example.com");

        repo.unsubscribe_newsletter("SUB@example.com").await.unwrap();
        assert!(repo.list_subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_website_setup_submission() {
        let repo = setup().await;

        let created = repo
            .create_website_setup(&WebsiteSetupSubmission {
                id: 0,
                name: "Sam".to_string(),
                email: "sam@example.com".to_string(),
                company: Some("Samco".to_string()),
                website_type: "ecommerce".to_string(),
                budget: Some("$5k-$10k".to_string()),
                details: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(created.id > 0);

        let setups = repo.list_website_setups().await.unwrap();
        assert_eq!(setups.len(), 1);
        assert_eq!(setups[0].website_type, "ecommerce");

        repo.delete_website_setup(created.id).await.unwrap();
        assert!(repo.list_website_setups().await.unwrap().is_empty());
    }
}
