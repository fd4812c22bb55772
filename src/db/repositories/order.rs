//! Order repository
//!
//! Database operations for checkout orders and the template purchase ledger.
//! The paid transition is guarded in SQL: an UPDATE that only matches pending
//! rows, so a duplicate provider callback is a no-op.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Order, OrderItemKind, OrderStatus, PagedResult, TemplatePurchase};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Order repository trait
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order
    async fn create(&self, order: &Order) -> Result<()>;

    /// Get an order by its UUID
    async fn get_by_id(&self, id: &str) -> Result<Option<Order>>;

    /// List orders, newest first
    async fn list(&self, params: &ListParams) -> Result<PagedResult<Order>>;

    /// Record the provider checkout session on a pending order
    async fn set_provider_session(&self, id: &str, session_id: &str) -> Result<()>;

    /// Mark a pending order paid. Returns false if the order was not pending
    /// (already paid, failed, or missing).
    async fn mark_paid(&self, id: &str) -> Result<bool>;

    /// Mark a pending order failed. Returns false if the order was not pending.
    async fn mark_failed(&self, id: &str) -> Result<bool>;

    /// Record a completed template purchase
    async fn record_template_purchase(&self, purchase: &TemplatePurchase) -> Result<()>;

    /// List template purchases for a buyer
    async fn list_purchases_by_email(&self, email: &str) -> Result<Vec<TemplatePurchase>>;

    /// Count orders in a given status
    async fn count_by_status(&self, status: OrderStatus) -> Result<i64>;
}

/// SQLx-based order repository implementation
pub struct SqlxOrderRepository {
    pool: DynDatabasePool,
}

impl SqlxOrderRepository {
    /// Create a new SQLx order repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn OrderRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl OrderRepository for SqlxOrderRepository {
    async fn create(&self, order: &Order) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_order_sqlite(self.pool.as_sqlite().unwrap(), order).await,
            DatabaseDriver::Mysql => create_order_mysql(self.pool.as_mysql().unwrap(), order).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Order>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_order_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_order_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, params: &ListParams) -> Result<PagedResult<Order>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_orders_sqlite(self.pool.as_sqlite().unwrap(), params).await,
            DatabaseDriver::Mysql => list_orders_mysql(self.pool.as_mysql().unwrap(), params).await,
        }
    }

    async fn set_provider_session(&self, id: &str, session_id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_provider_session_sqlite(self.pool.as_sqlite().unwrap(), id, session_id).await
            }
            DatabaseDriver::Mysql => {
                set_provider_session_mysql(self.pool.as_mysql().unwrap(), id, session_id).await
            }
        }
    }

    async fn mark_paid(&self, id: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                transition_from_pending_sqlite(self.pool.as_sqlite().unwrap(), id, OrderStatus::Paid)
                    .await
            }
            DatabaseDriver::Mysql => {
                transition_from_pending_mysql(self.pool.as_mysql().unwrap(), id, OrderStatus::Paid)
                    .await
            }
        }
    }

    async fn mark_failed(&self, id: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                transition_from_pending_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    id,
                    OrderStatus::Failed,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                transition_from_pending_mysql(self.pool.as_mysql().unwrap(), id, OrderStatus::Failed)
                    .await
            }
        }
    }

    async fn record_template_purchase(&self, purchase: &TemplatePurchase) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                record_purchase_sqlite(self.pool.as_sqlite().unwrap(), purchase).await
            }
            DatabaseDriver::Mysql => {
                record_purchase_mysql(self.pool.as_mysql().unwrap(), purchase).await
            }
        }
    }

    async fn list_purchases_by_email(&self, email: &str) -> Result<Vec<TemplatePurchase>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_purchases_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                list_purchases_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn count_by_status(&self, status: OrderStatus) -> Result<i64> {
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

const ORDER_COLUMNS: &str = "id, customer_email, item_kind, item_name, amount_cents, currency, status, provider_session_id, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_order_sqlite(pool: &SqlitePool, order: &Order) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (id, customer_email, item_kind, item_name, amount_cents, currency, status, provider_session_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_email)
    .bind(order.item_kind.to_string())
    .bind(&order.item_name)
    .bind(order.amount_cents)
    .bind(&order.currency)
    .bind(order.status.to_string())
    .bind(&order.provider_session_id)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(pool)
    .await
    .context("Failed to create order")?;

    Ok(())
}

async fn get_order_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Order>> {
    let query = format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get order")?;

    match row {
        Some(row) => Ok(Some(row_to_order_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_orders_sqlite(pool: &SqlitePool, params: &ListParams) -> Result<PagedResult<Order>> {
    let (_, per_page, offset) = params.normalize();

    let query = format!(
        "SELECT {} FROM orders ORDER BY created_at DESC LIMIT ? OFFSET ?",
        ORDER_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list orders")?;

    let total: i64 = sqlx::query("SELECT COUNT(*) as count FROM orders")
        .fetch_one(pool)
        .await
        .context("Failed to count orders")?
        .get("count");

    let items: Result<Vec<Order>> = rows.iter().map(row_to_order_sqlite).collect();
    Ok(PagedResult::new(items?, total as u64, params))
}

async fn set_provider_session_sqlite(pool: &SqlitePool, id: &str, session_id: &str) -> Result<()> {
    sqlx::query(
        "UPDATE orders SET provider_session_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(session_id)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to set provider session")?;

    Ok(())
}

async fn transition_from_pending_sqlite(
    pool: &SqlitePool,
    id: &str,
    to: OrderStatus,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE orders SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND status = 'pending'",
    )
    .bind(to.to_string())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to transition order status")?;

    Ok(result.rows_affected() == 1)
}

async fn record_purchase_sqlite(pool: &SqlitePool, purchase: &TemplatePurchase) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO template_purchases (order_id, template_name, buyer_email, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&purchase.order_id)
    .bind(&purchase.template_name)
    .bind(&purchase.buyer_email)
    .bind(purchase.created_at)
    .execute(pool)
    .await
    .context("Failed to record template purchase")?;

    Ok(())
}

async fn list_purchases_sqlite(pool: &SqlitePool, email: &str) -> Result<Vec<TemplatePurchase>> {
    let rows = sqlx::query(
        r#"
        SELECT id, order_id, template_name, buyer_email, created_at
        FROM template_purchases
        WHERE buyer_email = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(email)
    .fetch_all(pool)
    .await
    .context("Failed to list template purchases")?;

    Ok(rows
        .iter()
        .map(|row| TemplatePurchase {
            id: row.get("id"),
            order_id: row.get("order_id"),
            template_name: row.get("template_name"),
            buyer_email: row.get("buyer_email"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn count_by_status_sqlite(pool: &SqlitePool, status: OrderStatus) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM orders WHERE status = ?")
        .bind(status.to_string())
        .fetch_one(pool)
        .await
        .context("Failed to count orders")?;

    Ok(row.get("count"))
}

fn row_to_order_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Order> {
    let item_kind: String = row.get("item_kind");
    let status: String = row.get("status");

    Ok(Order {
        id: row.get("id"),
        customer_email: row.get("customer_email"),
        item_kind: OrderItemKind::from_str(&item_kind)?,
        item_name: row.get("item_name"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        status: OrderStatus::from_str(&status)?,
        provider_session_id: row.get("provider_session_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_order_mysql(pool: &MySqlPool, order: &Order) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (id, customer_email, item_kind, item_name, amount_cents, currency, status, provider_session_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_email)
    .bind(order.item_kind.to_string())
    .bind(&order.item_name)
    .bind(order.amount_cents)
    .bind(&order.currency)
    .bind(order.status.to_string())
    .bind(&order.provider_session_id)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(pool)
    .await
    .context("Failed to create order")?;

    Ok(())
}

async fn get_order_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Order>> {
    let query = format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get order")?;

    match row {
        Some(row) => Ok(Some(row_to_order_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_orders_mysql(pool: &MySqlPool, params: &ListParams) -> Result<PagedResult<Order>> {
    let (_, per_page, offset) = params.normalize();

    let query = format!(
        "SELECT {} FROM orders ORDER BY created_at DESC LIMIT ? OFFSET ?",
        ORDER_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list orders")?;

    let total: i64 = sqlx::query("SELECT COUNT(*) as count FROM orders")
        .fetch_one(pool)
        .await
        .context("Failed to count orders")?
        .get("count");

    let items: Result<Vec<Order>> = rows.iter().map(row_to_order_mysql).collect();
    Ok(PagedResult::new(items?, total as u64, params))
}

async fn set_provider_session_mysql(pool: &MySqlPool, id: &str, session_id: &str) -> Result<()> {
    sqlx::query("UPDATE orders SET provider_session_id = ? WHERE id = ?")
        .bind(session_id)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set provider session")?;

    Ok(())
}

async fn transition_from_pending_mysql(
    pool: &MySqlPool,
    id: &str,
    to: OrderStatus,
) -> Result<bool> {
    let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND status = 'pending'")
        .bind(to.to_string())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to transition order status")?;

    Ok(result.rows_affected() == 1)
}

async fn record_purchase_mysql(pool: &MySqlPool, purchase: &TemplatePurchase) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO template_purchases (order_id, template_name, buyer_email, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&purchase.order_id)
    .bind(&purchase.template_name)
    .bind(&purchase.buyer_email)
    .bind(purchase.created_at)
    .execute(pool)
    .await
    .context("Failed to record template purchase")?;

    Ok(())
}

async fn list_purchases_mysql(pool: &MySqlPool, email: &str) -> Result<Vec<TemplatePurchase>> {
    let rows = sqlx::query(
        r#"
        SELECT id, order_id, template_name, buyer_email, created_at
        FROM template_purchases
        WHERE buyer_email = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(email)
    .fetch_all(pool)
    .await
    .context("Failed to list template purchases")?;

    Ok(rows
        .iter()
        .map(|row| TemplatePurchase {
            id: row.get("id"),
            order_id: row.get("order_id"),
            template_name: row.get("template_name"),
            buyer_email: row.get("buyer_email"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn count_by_status_mysql(pool: &MySqlPool, status: OrderStatus) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM orders WHERE status = ?")
        .bind(status.to_string())
        .fetch_one(pool)
        .await
        .context("Failed to count orders")?;

    Ok(row.get("count"))
}

fn row_to_order_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Order> {
    let item_kind: String = row.get("item_kind");
    let status: String = row.get("status");

    Ok(Order {
        id: row.get("id"),
        customer_email: row.get("customer_email"),
        item_kind: OrderItemKind::from_str(&item_kind)?,
        item_name: row.get("item_name"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        status: OrderStatus::from_str(&status)?,
        provider_session_id: row.get("provider_session_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;
    use uuid::Uuid;

    async fn setup() -> SqlxOrderRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxOrderRepository::new(pool)
    }

    fn sample_order(kind: OrderItemKind) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4().to_string(),
            customer_email: "buyer@example.com".to_string(),
            item_kind: kind,
            item_name: "Portfolio Template".to_string(),
            amount_cents: 4900,
            currency: "USD".to_string(),
            status: OrderStatus::Pending,
            provider_session_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup().await;

        let order = sample_order(OrderItemKind::Template);
        repo.create(&order).await.unwrap();

        let found = repo.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(found.status, OrderStatus::Pending);
        assert_eq!(found.amount_cents, 4900);
    }

    #[tokio::test]
    async fn test_mark_paid_is_idempotent() {
        let repo = setup().await;
        let order = sample_order(OrderItemKind::Template);
        repo.create(&order).await.unwrap();

        assert!(repo.mark_paid(&order.id).await.unwrap());
        // Second callback for the same order must be a no-op
        assert!(!repo.mark_paid(&order.id).await.unwrap());

        let paid = repo.get_by_id(&order.id).await.unwrap().unwrap();
        assert!(paid.is_paid());
    }

    #[tokio::test]
    async fn test_paid_order_cannot_fail() {
        let repo = setup().await;
        let order = sample_order(OrderItemKind::Service);
        repo.create(&order).await.unwrap();

        assert!(repo.mark_paid(&order.id).await.unwrap());
        assert!(!repo.mark_failed(&order.id).await.unwrap());

        let still_paid = repo.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(still_paid.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_mark_missing_order() {
        let repo = setup().await;
        assert!(!repo.mark_paid("no-such-order").await.unwrap());
    }

    #[tokio::test]
    async fn test_provider_session() {
        let repo = setup().await;
        let order = sample_order(OrderItemKind::Template);
        repo.create(&order).await.unwrap();

        repo.set_provider_session(&order.id, "cs_12345").await.unwrap();
        let found = repo.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(found.provider_session_id.as_deref(), Some("cs_12345"));
    }

    #[tokio::test]
    async fn test_template_purchase_ledger() {
        let repo = setup().await;
        let order = sample_order(OrderItemKind::Template);
        repo.create(&order).await.unwrap();
        repo.mark_paid(&order.id).await.unwrap();

        repo.record_template_purchase(&TemplatePurchase {
            id: 0,
            order_id: order.id.clone(),
            template_name: order.item_name.clone(),
            buyer_email: order.customer_email.clone(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        let purchases = repo
            .list_purchases_by_email("buyer@example.com")
            .await
            .unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].template_name, "Portfolio Template");

        // order_id is unique, a second ledger row for the same order fails
        assert!(repo
            .record_template_purchase(&TemplatePurchase {
                id: 0,
                order_id: order.id.clone(),
                template_name: order.item_name.clone(),
                buyer_email: order.customer_email.clone(),
                created_at: Utc::now(),
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_count_by_status() {
        let repo = setup().await;
        let a = sample_order(OrderItemKind::Template);
        let b = sample_order(OrderItemKind::Service);
        repo.create(&a).await.unwrap();
        repo.create(&b).await.unwrap();
        repo.mark_paid(&a.id).await.unwrap();

        assert_eq!(repo.count_by_status(OrderStatus::Paid).await.unwrap(), 1);
        assert_eq!(repo.count_by_status(OrderStatus::Pending).await.unwrap(), 1);
    }
}
