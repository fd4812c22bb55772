//! Work request repository
//!
//! Database operations for customer work requests. Status transition rules
//! are enforced in the service layer; this layer just reads and writes rows.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    ListParams, PagedResult, WorkRequest, WorkRequestPriority, WorkRequestStatus,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Work request repository trait
#[async_trait]
pub trait WorkRequestRepository: Send + Sync {
    /// Insert a new work request, returning it with the assigned id
    async fn create(&self, request: &WorkRequest) -> Result<WorkRequest>;

    /// Get a work request by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<WorkRequest>>;

    /// List work requests for one customer, newest first
    async fn list_by_customer(&self, customer_id: i64) -> Result<Vec<WorkRequest>>;

    /// List all work requests, optionally filtered by status, newest first
    async fn list(
        &self,
        status: Option<WorkRequestStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<WorkRequest>>;

    /// Update status and admin note
    async fn update_status(
        &self,
        id: i64,
        status: WorkRequestStatus,
        admin_note: Option<&str>,
    ) -> Result<()>;

    /// Count requests in a given status
    async fn count_by_status(&self, status: WorkRequestStatus) -> Result<i64>;
}

/// SQLx-based work request repository implementation
pub struct SqlxWorkRequestRepository {
    pool: DynDatabasePool,
}

impl SqlxWorkRequestRepository {
    /// Create a new SQLx work request repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn WorkRequestRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl WorkRequestRepository for SqlxWorkRequestRepository {
    async fn create(&self, request: &WorkRequest) -> Result<WorkRequest> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_request_sqlite(self.pool.as_sqlite().unwrap(), request).await
            }
            DatabaseDriver::Mysql => {
                create_request_mysql(self.pool.as_mysql().unwrap(), request).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<WorkRequest>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_request_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_request_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_by_customer(&self, customer_id: i64) -> Result<Vec<WorkRequest>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_customer_sqlite(self.pool.as_sqlite().unwrap(), customer_id).await
            }
            DatabaseDriver::Mysql => {
                list_by_customer_mysql(self.pool.as_mysql().unwrap(), customer_id).await
            }
        }
    }

    async fn list(
        &self,
        status: Option<WorkRequestStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<WorkRequest>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_requests_sqlite(self.pool.as_sqlite().unwrap(), status, params).await
            }
            DatabaseDriver::Mysql => {
                list_requests_mysql(self.pool.as_mysql().unwrap(), status, params).await
            }
        }
    }

    async fn update_status(
        &self,
        id: i64,
        status: WorkRequestStatus,
        admin_note: Option<&str>,
    ) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_status_sqlite(self.pool.as_sqlite().unwrap(), id, status, admin_note).await
            }
            DatabaseDriver::Mysql => {
                update_status_mysql(self.pool.as_mysql().unwrap(), id, status, admin_note).await
            }
        }
    }

    async fn count_by_status(&self, status: WorkRequestStatus) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_by_status_sqlite(self.pool.as_sqlite().unwrap(), status).await
            }
            DatabaseDriver::Mysql => {
                count_by_status_mysql(self.pool.as_mysql().unwrap(), status).await
            }
        }
    }
}

const REQUEST_COLUMNS: &str =
    "id, customer_id, title, details, priority, status, admin_note, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_request_sqlite(pool: &SqlitePool, request: &WorkRequest) -> Result<WorkRequest> {
    let result = sqlx::query(
        r#"
        INSERT INTO work_requests (customer_id, title, details, priority, status, admin_note, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(request.customer_id)
    .bind(&request.title)
    .bind(&request.details)
    .bind(request.priority.to_string())
    .bind(request.status.to_string())
    .bind(&request.admin_note)
    .bind(request.created_at)
    .bind(request.updated_at)
    .execute(pool)
    .await
    .context("Failed to create work request")?;

    let mut created = request.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_request_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<WorkRequest>> {
    let query = format!("SELECT {} FROM work_requests WHERE id = ?", REQUEST_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get work request")?;

    match row {
        Some(row) => Ok(Some(row_to_request_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_by_customer_sqlite(pool: &SqlitePool, customer_id: i64) -> Result<Vec<WorkRequest>> {
    let query = format!(
        "SELECT {} FROM work_requests WHERE customer_id = ? ORDER BY created_at DESC",
        REQUEST_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(customer_id)
        .fetch_all(pool)
        .await
        .context("Failed to list work requests for customer")?;

    rows.iter().map(row_to_request_sqlite).collect()
}

async fn list_requests_sqlite(
    pool: &SqlitePool,
    status: Option<WorkRequestStatus>,
    params: &ListParams,
) -> Result<PagedResult<WorkRequest>> {
    let (_, per_page, offset) = params.normalize();

    let (rows, total) = match status {
        Some(status) => {
            let query = format!(
                "SELECT {} FROM work_requests WHERE status = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
                REQUEST_COLUMNS
            );
            let rows = sqlx::query(&query)
                .bind(status.to_string())
                .bind(per_page)
                .bind(offset)
                .fetch_all(pool)
                .await
                .context("Failed to list work requests")?;
            let total = count_by_status_sqlite(pool, status).await?;
            (rows, total)
        }
        None => {
            let query = format!(
                "SELECT {} FROM work_requests ORDER BY created_at DESC LIMIT ? OFFSET ?",
                REQUEST_COLUMNS
            );
            let rows = sqlx::query(&query)
                .bind(per_page)
                .bind(offset)
                .fetch_all(pool)
                .await
                .context("Failed to list work requests")?;
            let total: i64 = sqlx::query("SELECT COUNT(*) as count FROM work_requests")
                .fetch_one(pool)
                .await
                .context("Failed to count work requests")?
                .get("count");
            (rows, total)
        }
    };

    let items: Result<Vec<WorkRequest>> = rows.iter().map(row_to_request_sqlite).collect();
    Ok(PagedResult::new(items?, total as u64, params))
}

async fn update_status_sqlite(
    pool: &SqlitePool,
    id: i64,
    status: WorkRequestStatus,
    admin_note: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE work_requests
        SET status = ?, admin_note = COALESCE(?, admin_note), updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(status.to_string())
    .bind(admin_note)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update work request status")?;

    Ok(())
}

async fn count_by_status_sqlite(pool: &SqlitePool, status: WorkRequestStatus) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM work_requests WHERE status = ?")
        .bind(status.to_string())
        .fetch_one(pool)
        .await
        .context("Failed to count work requests")?;

    Ok(row.get("count"))
}

fn row_to_request_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<WorkRequest> {
    let priority: String = row.get("priority");
    let status: String = row.get("status");

    Ok(WorkRequest {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        title: row.get("title"),
        details: row.get("details"),
        priority: WorkRequestPriority::from_str(&priority)?,
        status: WorkRequestStatus::from_str(&status)?,
        admin_note: row.get("admin_note"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_request_mysql(pool: &MySqlPool, request: &WorkRequest) -> Result<WorkRequest> {
    let result = sqlx::query(
        r#"
        INSERT INTO work_requests (customer_id, title, details, priority, status, admin_note, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(request.customer_id)
    .bind(&request.title)
    .bind(&request.details)
    .bind(request.priority.to_string())
    .bind(request.status.to_string())
    .bind(&request.admin_note)
    .bind(request.created_at)
    .bind(request.updated_at)
    .execute(pool)
    .await
    .context("Failed to create work request")?;

    let mut created = request.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn get_request_mysql(pool: &MySqlPool, id: i64) -> Result<Option<WorkRequest>> {
    let query = format!("SELECT {} FROM work_requests WHERE id = ?", REQUEST_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get work request")?;

    match row {
        Some(row) => Ok(Some(row_to_request_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_by_customer_mysql(pool: &MySqlPool, customer_id: i64) -> Result<Vec<WorkRequest>> {
    let query = format!(
        "SELECT {} FROM work_requests WHERE customer_id = ? ORDER BY created_at DESC",
        REQUEST_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(customer_id)
        .fetch_all(pool)
        .await
        .context("Failed to list work requests for customer")?;

    rows.iter().map(row_to_request_mysql).collect()
}

async fn list_requests_mysql(
    pool: &MySqlPool,
    status: Option<WorkRequestStatus>,
    params: &ListParams,
) -> Result<PagedResult<WorkRequest>> {
    let (_, per_page, offset) = params.normalize();

    let (rows, total) = match status {
        Some(status) => {
            let query = format!(
                "SELECT {} FROM work_requests WHERE status = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
                REQUEST_COLUMNS
            );
            let rows = sqlx::query(&query)
                .bind(status.to_string())
                .bind(per_page)
                .bind(offset)
                .fetch_all(pool)
                .await
                .context("Failed to list work requests")?;
            let total = count_by_status_mysql(pool, status).await?;
            (rows, total)
        }
        None => {
            let query = format!(
                "SELECT {} FROM work_requests ORDER BY created_at DESC LIMIT ? OFFSET ?",
                REQUEST_COLUMNS
            );
            let rows = sqlx::query(&query)
                .bind(per_page)
                .bind(offset)
                .fetch_all(pool)
                .await
                .context("Failed to list work requests")?;
            let total: i64 = sqlx::query("SELECT COUNT(*) as count FROM work_requests")
                .fetch_one(pool)
                .await
                .context("Failed to count work requests")?
                .get("count");
            (rows, total)
        }
    };

    let items: Result<Vec<WorkRequest>> = rows.iter().map(row_to_request_mysql).collect();
    Ok(PagedResult::new(items?, total as u64, params))
}

async fn update_status_mysql(
    pool: &MySqlPool,
    id: i64,
    status: WorkRequestStatus,
    admin_note: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE work_requests
        SET status = ?, admin_note = COALESCE(?, admin_note)
        WHERE id = ?
        "#,
    )
    .bind(status.to_string())
    .bind(admin_note)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update work request status")?;

    Ok(())
}

async fn count_by_status_mysql(pool: &MySqlPool, status: WorkRequestStatus) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM work_requests WHERE status = ?")
        .bind(status.to_string())
        .fetch_one(pool)
        .await
        .context("Failed to count work requests")?;

    Ok(row.get("count"))
}

fn row_to_request_mysql(row: &sqlx::mysql::MySqlRow) -> Result<WorkRequest> {
    let priority: String = row.get("priority");
    let status: String = row.get("status");

    Ok(WorkRequest {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        title: row.get("title"),
        details: row.get("details"),
        priority: WorkRequestPriority::from_str(&priority)?,
        status: WorkRequestStatus::from_str(&status)?,
        admin_note: row.get("admin_note"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::customer::{CustomerRepository, SqlxCustomerRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Customer, CustomerStatus};
    use chrono::Utc;

    async fn setup() -> (SqlxWorkRequestRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let now = Utc::now();
        let customers = SqlxCustomerRepository::new(pool.clone());
        let customer = customers
            .create(&Customer {
                id: 0,
                name: "Widget Co".to_string(),
                email: "wr@widget.test".to_string(),
                company: None,
                phone: None,
                notes: None,
                user_id: None,
                status: CustomerStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("Failed to create customer");

        (SqlxWorkRequestRepository::new(pool), customer.id)
    }

    fn sample_request(customer_id: i64) -> WorkRequest {
        let now = Utc::now();
        WorkRequest {
            id: 0,
            customer_id,
            title: "Fix contact form".to_string(),
            details: "Form submissions bounce on mobile Safari".to_string(),
            priority: WorkRequestPriority::High,
            status: WorkRequestStatus::Pending,
            admin_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, customer_id) = setup().await;

        let created = repo.create(&sample_request(customer_id)).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.status, WorkRequestStatus::Pending);
        assert_eq!(found.priority, WorkRequestPriority::High);
    }

    #[tokio::test]
    async fn test_list_by_customer() {
        let (repo, customer_id) = setup().await;
        repo.create(&sample_request(customer_id)).await.unwrap();
        repo.create(&sample_request(customer_id)).await.unwrap();

        let requests = repo.list_by_customer(customer_id).await.unwrap();
        assert_eq!(requests.len(), 2);

        let none = repo.list_by_customer(customer_id + 99).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_status_filter_and_counts() {
        let (repo, customer_id) = setup().await;
        let a = repo.create(&sample_request(customer_id)).await.unwrap();
        repo.create(&sample_request(customer_id)).await.unwrap();

        repo.update_status(a.id, WorkRequestStatus::Approved, Some("on it"))
            .await
            .unwrap();

        let pending = repo
            .list(Some(WorkRequestStatus::Pending), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(pending.total, 1);

        assert_eq!(
            repo.count_by_status(WorkRequestStatus::Approved).await.unwrap(),
            1
        );

        let approved = repo.get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(approved.status, WorkRequestStatus::Approved);
        assert_eq!(approved.admin_note.as_deref(), Some("on it"));
    }

    #[tokio::test]
    async fn test_update_status_keeps_note_when_none() {
        let (repo, customer_id) = setup().await;
        let request = repo.create(&sample_request(customer_id)).await.unwrap();

        repo.update_status(request.id, WorkRequestStatus::Approved, Some("scheduled"))
            .await
            .unwrap();
        repo.update_status(request.id, WorkRequestStatus::Completed, None)
            .await
            .unwrap();

        let done = repo.get_by_id(request.id).await.unwrap().unwrap();
        assert_eq!(done.status, WorkRequestStatus::Completed);
        assert_eq!(done.admin_note.as_deref(), Some("scheduled"));
    }
}
