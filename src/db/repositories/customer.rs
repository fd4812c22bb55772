//! Customer repository
//!
//! Database operations for customers and their provisioned services. The two
//! tables are tightly coupled (services always hang off a customer) so they
//! share a repository.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    Customer, CustomerServiceEntry, CustomerServiceStatus, CustomerStatus, ListParams, PagedResult,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Customer repository trait
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Insert a new customer, returning it with the assigned id
    async fn create(&self, customer: &Customer) -> Result<Customer>;

    /// Get customer by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Customer>>;

    /// Get customer by contact email
    async fn get_by_email(&self, email: &str) -> Result<Option<Customer>>;

    /// Get the customer linked to a portal user account
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Customer>>;

    /// List customers, newest first
    async fn list(&self, params: &ListParams) -> Result<PagedResult<Customer>>;

    /// Update all mutable customer fields
    async fn update(&self, customer: &Customer) -> Result<()>;

    /// Delete a customer (cascades to services and work requests)
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count all customers
    async fn count(&self) -> Result<i64>;

    /// Add a provisioned service for a customer
    async fn add_service(&self, service: &CustomerServiceEntry) -> Result<CustomerServiceEntry>;

    /// List services for a customer
    async fn list_services(&self, customer_id: i64) -> Result<Vec<CustomerServiceEntry>>;

    /// Update a provisioned service
    async fn update_service(&self, service: &CustomerServiceEntry) -> Result<()>;

    /// Remove a provisioned service
    async fn delete_service(&self, service_id: i64) -> Result<()>;
}

/// SQLx-based customer repository implementation
pub struct SqlxCustomerRepository {
    pool: DynDatabasePool,
}

impl SqlxCustomerRepository {
    /// Create a new SQLx customer repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CustomerRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CustomerRepository for SqlxCustomerRepository {
    async fn create(&self, customer: &Customer) -> Result<Customer> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_customer_sqlite(self.pool.as_sqlite().unwrap(), customer).await
            }
            DatabaseDriver::Mysql => {
                create_customer_mysql(self.pool.as_mysql().unwrap(), customer).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Customer>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_customer_sqlite(self.pool.as_sqlite().unwrap(), "id", &id.to_string()).await
            }
            DatabaseDriver::Mysql => {
                get_customer_mysql(self.pool.as_mysql().unwrap(), "id", &id.to_string()).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Customer>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_customer_sqlite(self.pool.as_sqlite().unwrap(), "email", email).await
            }
            DatabaseDriver::Mysql => {
                get_customer_mysql(self.pool.as_mysql().unwrap(), "email", email).await
            }
        }
    }

    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Customer>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_customer_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    "user_id",
                    &user_id.to_string(),
                )
                .await
            }
            DatabaseDriver::Mysql => {
                get_customer_mysql(
                    self.pool.as_mysql().unwrap(),
                    "user_id",
                    &user_id.to_string(),
                )
                .await
            }
        }
    }

    async fn list(&self, params: &ListParams) -> Result<PagedResult<Customer>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_customers_sqlite(self.pool.as_sqlite().unwrap(), params).await
            }
            DatabaseDriver::Mysql => {
                list_customers_mysql(self.pool.as_mysql().unwrap(), params).await
            }
        }
    }

    async fn update(&self, customer: &Customer) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_customer_sqlite(self.pool.as_sqlite().unwrap(), customer).await
            }
            DatabaseDriver::Mysql => {
                update_customer_mysql(self.pool.as_mysql().unwrap(), customer).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_customer_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                delete_customer_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_customers_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_customers_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn add_service(&self, service: &CustomerServiceEntry) -> Result<CustomerServiceEntry> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                add_service_sqlite(self.pool.as_sqlite().unwrap(), service).await
            }
            DatabaseDriver::Mysql => {
                add_service_mysql(self.pool.as_mysql().unwrap(), service).await
            }
        }
    }

    async fn list_services(&self, customer_id: i64) -> Result<Vec<CustomerServiceEntry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_services_sqlite(self.pool.as_sqlite().unwrap(), customer_id).await
            }
            DatabaseDriver::Mysql => {
                list_services_mysql(self.pool.as_mysql().unwrap(), customer_id).await
            }
        }
    }

    async fn update_service(&self, service: &CustomerServiceEntry) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_service_sqlite(self.pool.as_sqlite().unwrap(), service).await
            }
            DatabaseDriver::Mysql => {
                update_service_mysql(self.pool.as_mysql().unwrap(), service).await
            }
        }
    }

    async fn delete_service(&self, service_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_service_sqlite(self.pool.as_sqlite().unwrap(), service_id).await
            }
            DatabaseDriver::Mysql => {
                delete_service_mysql(self.pool.as_mysql().unwrap(), service_id).await
            }
        }
    }
}

const CUSTOMER_COLUMNS: &str =
    "id, name, email, company, phone, notes, user_id, status, created_at, updated_at";

const SERVICE_COLUMNS: &str =
    "id, customer_id, name, description, monthly_price_cents, status, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_customer_sqlite(pool: &SqlitePool, customer: &Customer) -> Result<Customer> {
    let result = sqlx::query(
        r#"
        INSERT INTO customers (name, email, company, phone, notes, user_id, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.company)
    .bind(&customer.phone)
    .bind(&customer.notes)
    .bind(customer.user_id)
    .bind(customer.status.to_string())
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(pool)
    .await
    .context("Failed to create customer")?;

    let mut created = customer.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_customer_sqlite(
    pool: &SqlitePool,
    column: &str,
    value: &str,
) -> Result<Option<Customer>> {
    let query = format!(
        "SELECT {} FROM customers WHERE {} = ?",
        CUSTOMER_COLUMNS, column
    );
    let row = sqlx::query(&query)
        .bind(value)
        .fetch_optional(pool)
        .await
        .context("Failed to get customer")?;

    match row {
        Some(row) => Ok(Some(row_to_customer_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_customers_sqlite(
    pool: &SqlitePool,
    params: &ListParams,
) -> Result<PagedResult<Customer>> {
    let (_, per_page, offset) = params.normalize();

    let query = format!(
        "SELECT {} FROM customers ORDER BY created_at DESC LIMIT ? OFFSET ?",
        CUSTOMER_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list customers")?;

    let items: Result<Vec<Customer>> = rows.iter().map(row_to_customer_sqlite).collect();
    let total = count_customers_sqlite(pool).await? as u64;

    Ok(PagedResult::new(items?, total, params))
}

async fn update_customer_sqlite(pool: &SqlitePool, customer: &Customer) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE customers
        SET name = ?, email = ?, company = ?, phone = ?, notes = ?, user_id = ?, status = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.company)
    .bind(&customer.phone)
    .bind(&customer.notes)
    .bind(customer.user_id)
    .bind(customer.status.to_string())
    .bind(customer.id)
    .execute(pool)
    .await
    .context("Failed to update customer")?;

    Ok(())
}

async fn delete_customer_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM customers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete customer")?;

    Ok(())
}

async fn count_customers_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM customers")
        .fetch_one(pool)
        .await
        .context("Failed to count customers")?;

    Ok(row.get("count"))
}

async fn add_service_sqlite(
    pool: &SqlitePool,
    service: &CustomerServiceEntry,
) -> Result<CustomerServiceEntry> {
    let result = sqlx::query(
        r#"
        INSERT INTO customer_services (customer_id, name, description, monthly_price_cents, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(service.customer_id)
    .bind(&service.name)
    .bind(&service.description)
    .bind(service.monthly_price_cents)
    .bind(service.status.to_string())
    .bind(service.created_at)
    .bind(service.updated_at)
    .execute(pool)
    .await
    .context("Failed to add customer service")?;

    let mut created = service.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn list_services_sqlite(
    pool: &SqlitePool,
    customer_id: i64,
) -> Result<Vec<CustomerServiceEntry>> {
    let query = format!(
        "SELECT {} FROM customer_services WHERE customer_id = ? ORDER BY created_at",
        SERVICE_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(customer_id)
        .fetch_all(pool)
        .await
        .context("Failed to list customer services")?;

    rows.iter().map(row_to_service_sqlite).collect()
}

async fn update_service_sqlite(pool: &SqlitePool, service: &CustomerServiceEntry) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE customer_services
        SET name = ?, description = ?, monthly_price_cents = ?, status = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&service.name)
    .bind(&service.description)
    .bind(service.monthly_price_cents)
    .bind(service.status.to_string())
    .bind(service.id)
    .execute(pool)
    .await
    .context("Failed to update customer service")?;

    Ok(())
}

async fn delete_service_sqlite(pool: &SqlitePool, service_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM customer_services WHERE id = ?")
        .bind(service_id)
        .execute(pool)
        .await
        .context("Failed to delete customer service")?;

    Ok(())
}

fn row_to_customer_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Customer> {
    let status: String = row.get("status");

    Ok(Customer {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        company: row.get("company"),
        phone: row.get("phone"),
        notes: row.get("notes"),
        user_id: row.get("user_id"),
        status: CustomerStatus::from_str(&status)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_service_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<CustomerServiceEntry> {
    let status: String = row.get("status");

    Ok(CustomerServiceEntry {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        name: row.get("name"),
        description: row.get("description"),
        monthly_price_cents: row.get("monthly_price_cents"),
        status: CustomerServiceStatus::from_str(&status)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_customer_mysql(pool: &MySqlPool, customer: &Customer) -> Result<Customer> {
    let result = sqlx::query(
        r#"
        INSERT INTO customers (name, email, company, phone, notes, user_id, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.company)
    .bind(&customer.phone)
    .bind(&customer.notes)
    .bind(customer.user_id)
    .bind(customer.status.to_string())
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(pool)
    .await
    .context("Failed to create customer")?;

    let mut created = customer.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn get_customer_mysql(
    pool: &MySqlPool,
    column: &str,
    value: &str,
) -> Result<Option<Customer>> {
    let query = format!(
        "SELECT {} FROM customers WHERE {} = ?",
        CUSTOMER_COLUMNS, column
    );
    let row = sqlx::query(&query)
        .bind(value)
        .fetch_optional(pool)
        .await
        .context("Failed to get customer")?;

    match row {
        Some(row) => Ok(Some(row_to_customer_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_customers_mysql(
    pool: &MySqlPool,
    params: &ListParams,
) -> Result<PagedResult<Customer>> {
    let (_, per_page, offset) = params.normalize();

    let query = format!(
        "SELECT {} FROM customers ORDER BY created_at DESC LIMIT ? OFFSET ?",
        CUSTOMER_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list customers")?;

    let items: Result<Vec<Customer>> = rows.iter().map(row_to_customer_mysql).collect();
    let total = count_customers_mysql(pool).await? as u64;

    Ok(PagedResult::new(items?, total, params))
}

async fn update_customer_mysql(pool: &MySqlPool, customer: &Customer) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE customers
        SET name = ?, email = ?, company = ?, phone = ?, notes = ?, user_id = ?, status = ?
        WHERE id = ?
        "#,
    )
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.company)
    .bind(&customer.phone)
    .bind(&customer.notes)
    .bind(customer.user_id)
    .bind(customer.status.to_string())
    .bind(customer.id)
    .execute(pool)
    .await
    .context("Failed to update customer")?;

    Ok(())
}

async fn delete_customer_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM customers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete customer")?;

    Ok(())
}

async fn count_customers_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM customers")
        .fetch_one(pool)
        .await
        .context("Failed to count customers")?;

    Ok(row.get("count"))
}

async fn add_service_mysql(
    pool: &MySqlPool,
    service: &CustomerServiceEntry,
) -> Result<CustomerServiceEntry> {
    let result = sqlx::query(
        r#"
        INSERT INTO customer_services (customer_id, name, description, monthly_price_cents, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(service.customer_id)
    .bind(&service.name)
    .bind(&service.description)
    .bind(service.monthly_price_cents)
    .bind(service.status.to_string())
    .bind(service.created_at)
    .bind(service.updated_at)
    .execute(pool)
    .await
    .context("Failed to add customer service")?;

    let mut created = service.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn list_services_mysql(
    pool: &MySqlPool,
    customer_id: i64,
) -> Result<Vec<CustomerServiceEntry>> {
    let query = format!(
        "SELECT {} FROM customer_services WHERE customer_id = ? ORDER BY created_at",
        SERVICE_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(customer_id)
        .fetch_all(pool)
        .await
        .context("Failed to list customer services")?;

    rows.iter().map(row_to_service_mysql).collect()
}

async fn update_service_mysql(pool: &MySqlPool, service: &CustomerServiceEntry) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE customer_services
        SET name = ?, description = ?, monthly_price_cents = ?, status = ?
        WHERE id = ?
        "#,
    )
    .bind(&service.name)
    .bind(&service.description)
    .bind(service.monthly_price_cents)
    .bind(service.status.to_string())
    .bind(service.id)
    .execute(pool)
    .await
    .context("Failed to update customer service")?;

    Ok(())
}

async fn delete_service_mysql(pool: &MySqlPool, service_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM customer_services WHERE id = ?")
        .bind(service_id)
        .execute(pool)
        .await
        .context("Failed to delete customer service")?;

    Ok(())
}

fn row_to_customer_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Customer> {
    let status: String = row.get("status");

    Ok(Customer {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        company: row.get("company"),
        phone: row.get("phone"),
        notes: row.get("notes"),
        user_id: row.get("user_id"),
        status: CustomerStatus::from_str(&status)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_service_mysql(row: &sqlx::mysql::MySqlRow) -> Result<CustomerServiceEntry> {
    let status: String = row.get("status");

    Ok(CustomerServiceEntry {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        name: row.get("name"),
        description: row.get("description"),
        monthly_price_cents: row.get("monthly_price_cents"),
        status: CustomerServiceStatus::from_str(&status)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup() -> SqlxCustomerRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxCustomerRepository::new(pool)
    }

    fn sample_customer(email: &str) -> Customer {
        let now = Utc::now();
        Customer {
            id: 0,
            name: "Acme Corp".to_string(),
            email: email.to_string(),
            company: Some("Acme".to_string()),
            phone: None,
            notes: None,
            user_id: None,
            status: CustomerStatus::Lead,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_customer() {
        let repo = setup().await;

        let created = repo.create(&sample_customer("ops@acme.test")).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.email, "ops@acme.test");
        assert_eq!(found.status, CustomerStatus::Lead);

        let by_email = repo.get_by_email("ops@acme.test").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn test_update_customer() {
        let repo = setup().await;
        let mut customer = repo.create(&sample_customer("c@x.test")).await.unwrap();

        customer.status = CustomerStatus::Active;
        customer.notes = Some("signed annual contract".to_string());
        repo.update(&customer).await.unwrap();

        let reloaded = repo.get_by_id(customer.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, CustomerStatus::Active);
        assert_eq!(reloaded.notes.as_deref(), Some("signed annual contract"));
    }

    #[tokio::test]
    async fn test_list_customers_pagination() {
        let repo = setup().await;
        for i in 0..5 {
            repo.create(&sample_customer(&format!("c{}@x.test", i)))
                .await
                .unwrap();
        }

        let page = repo
            .list(&ListParams { page: 1, per_page: 2 })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages(), 3);
    }

    #[tokio::test]
    async fn test_services_lifecycle() {
        let repo = setup().await;
        let customer = repo.create(&sample_customer("svc@x.test")).await.unwrap();

        let now = Utc::now();
        let service = repo
            .add_service(&CustomerServiceEntry {
                id: 0,
                customer_id: customer.id,
                name: "Hosting".to_string(),
                description: Some("Shared hosting plan".to_string()),
                monthly_price_cents: 2500,
                status: CustomerServiceStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        assert!(service.id > 0);

        let services = repo.list_services(customer.id).await.unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].monthly_price_cents, 2500);

        let mut updated = service.clone();
        updated.status = CustomerServiceStatus::Paused;
        repo.update_service(&updated).await.unwrap();

        let services = repo.list_services(customer.id).await.unwrap();
        assert_eq!(services[0].status, CustomerServiceStatus::Paused);

        repo.delete_service(service.id).await.unwrap();
        assert!(repo.list_services(customer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_customer_cascades_services() {
        let repo = setup().await;
        let customer = repo.create(&sample_customer("gone@x.test")).await.unwrap();

        let now = Utc::now();
        repo.add_service(&CustomerServiceEntry {
            id: 0,
            customer_id: customer.id,
            name: "SEO".to_string(),
            description: None,
            monthly_price_cents: 10000,
            status: CustomerServiceStatus::Active,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

        repo.delete(customer.id).await.unwrap();
        assert!(repo.get_by_id(customer.id).await.unwrap().is_none());
        assert!(repo.list_services(customer.id).await.unwrap().is_empty());
    }
}
