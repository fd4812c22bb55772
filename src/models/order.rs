//! Order model
//!
//! Orders track checkout attempts against the payment provider. The status
//! machine: pending -> paid | failed. `Paid` is terminal and idempotent - a
//! second provider callback for a paid order changes nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A checkout order.
///
/// The id is a UUID generated server-side and used as the provider reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order id (UUID string)
    pub id: String,
    /// Buyer email
    pub customer_email: String,
    /// What is being purchased
    pub item_kind: OrderItemKind,
    /// Human-readable item name (template name or service name)
    pub item_name: String,
    /// Amount in cents
    pub amount_cents: i64,
    /// ISO 4217 currency code
    pub currency: String,
    /// Payment status
    pub status: OrderStatus,
    /// Checkout session id returned by the provider
    pub provider_session_id: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Check if the order has been paid
    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }
}

/// Order payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, awaiting payment
    Pending,
    /// Payment confirmed (terminal)
    Paid,
    /// Checkout creation or payment failed (terminal)
    Failed,
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "failed" => Ok(OrderStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid order status: {}", s)),
        }
    }
}

/// What kind of item an order is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderItemKind {
    /// A site template purchase
    Template,
    /// A one-off service payment
    Service,
}

impl fmt::Display for OrderItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderItemKind::Template => write!(f, "template"),
            OrderItemKind::Service => write!(f, "service"),
        }
    }
}

impl FromStr for OrderItemKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "template" => Ok(OrderItemKind::Template),
            "service" => Ok(OrderItemKind::Service),
            _ => Err(anyhow::anyhow!("Invalid order item kind: {}", s)),
        }
    }
}

/// A completed template purchase, written once when a template order is paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatePurchase {
    /// Unique identifier
    pub id: i64,
    /// The paid order (unique)
    pub order_id: String,
    /// Purchased template
    pub template_name: String,
    /// Buyer email
    pub buyer_email: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating a payment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    /// Buyer email
    pub customer_email: String,
    /// Item kind
    pub item_kind: OrderItemKind,
    /// Item name
    pub item_name: String,
    /// Amount in cents (must be positive)
    pub amount_cents: i64,
    /// Currency code (optional, defaults to USD)
    pub currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_roundtrip() {
        assert_eq!(OrderStatus::from_str("paid").unwrap(), OrderStatus::Paid);
        assert_eq!(OrderStatus::Failed.to_string(), "failed");
        assert!(OrderStatus::from_str("refunded").is_err());
    }

    #[test]
    fn test_item_kind_roundtrip() {
        assert_eq!(
            OrderItemKind::from_str("template").unwrap(),
            OrderItemKind::Template
        );
        assert_eq!(OrderItemKind::Service.to_string(), "service");
        assert!(OrderItemKind::from_str("subscription").is_err());
    }
}
