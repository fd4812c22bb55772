//! Customer model
//!
//! Customers are the agency's clients. A customer may optionally be linked to
//! a portal user account, and may have any number of provisioned services
//! (hosting, maintenance plans, etc).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A customer record managed by agency staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Contact email (unique)
    pub email: String,
    /// Company name (optional)
    pub company: Option<String>,
    /// Phone number (optional)
    pub phone: Option<String>,
    /// Internal staff notes
    pub notes: Option<String>,
    /// Linked portal user account, if one exists
    pub user_id: Option<i64>,
    /// Lifecycle status
    pub status: CustomerStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Customer lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    /// Prospective customer, no active engagement yet
    Lead,
    /// Active customer
    Active,
    /// Past customer, kept for records
    Archived,
}

impl Default for CustomerStatus {
    fn default() -> Self {
        Self::Lead
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerStatus::Lead => write!(f, "lead"),
            CustomerStatus::Active => write!(f, "active"),
            CustomerStatus::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for CustomerStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lead" => Ok(CustomerStatus::Lead),
            "active" => Ok(CustomerStatus::Active),
            "archived" => Ok(CustomerStatus::Archived),
            _ => Err(anyhow::anyhow!("Invalid customer status: {}", s)),
        }
    }
}

/// A service provisioned for a customer (hosting, care plan, SEO retainer).
///
/// Named `CustomerServiceEntry` to keep it distinct from the business-logic
/// `CustomerService` in the services layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerServiceEntry {
    /// Unique identifier
    pub id: i64,
    /// Owning customer
    pub customer_id: i64,
    /// Service name
    pub name: String,
    /// Description (optional)
    pub description: Option<String>,
    /// Monthly price in cents
    pub monthly_price_cents: i64,
    /// Current status
    pub status: CustomerServiceStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Status of a provisioned service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerServiceStatus {
    /// Billed and running
    Active,
    /// Temporarily suspended, can resume
    Paused,
    /// Ended; kept for billing history
    Cancelled,
}

impl Default for CustomerServiceStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for CustomerServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerServiceStatus::Active => write!(f, "active"),
            CustomerServiceStatus::Paused => write!(f, "paused"),
            CustomerServiceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for CustomerServiceStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(CustomerServiceStatus::Active),
            "paused" => Ok(CustomerServiceStatus::Paused),
            "cancelled" => Ok(CustomerServiceStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid service status: {}", s)),
        }
    }
}

/// Input for creating a customer
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomerInput {
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Company (optional)
    pub company: Option<String>,
    /// Phone (optional)
    pub phone: Option<String>,
    /// Staff notes (optional)
    pub notes: Option<String>,
}

/// Input for updating a customer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCustomerInput {
    /// New name (optional)
    pub name: Option<String>,
    /// New email (optional)
    pub email: Option<String>,
    /// New company (optional)
    pub company: Option<String>,
    /// New phone (optional)
    pub phone: Option<String>,
    /// New notes (optional)
    pub notes: Option<String>,
    /// New status (optional)
    pub status: Option<CustomerStatus>,
    /// Link or relink a portal user account (optional)
    pub user_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_status_roundtrip() {
        assert_eq!(CustomerStatus::from_str("lead").unwrap(), CustomerStatus::Lead);
        assert_eq!(
            CustomerStatus::from_str("Archived").unwrap(),
            CustomerStatus::Archived
        );
        assert_eq!(CustomerStatus::Active.to_string(), "active");
        assert!(CustomerStatus::from_str("gone").is_err());
    }

    #[test]
    fn test_customer_status_default_is_lead() {
        assert_eq!(CustomerStatus::default(), CustomerStatus::Lead);
    }

    #[test]
    fn test_service_status_roundtrip() {
        assert_eq!(
            CustomerServiceStatus::from_str("paused").unwrap(),
            CustomerServiceStatus::Paused
        );
        assert_eq!(CustomerServiceStatus::Cancelled.to_string(), "cancelled");
        assert_eq!(
            CustomerServiceStatus::default(),
            CustomerServiceStatus::Active
        );
        assert!(CustomerServiceStatus::from_str("stopped").is_err());
    }
}
