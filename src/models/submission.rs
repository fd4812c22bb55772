//! Public form submissions
//!
//! Three public forms write to the database: the contact form, the newsletter
//! signup, and the website-setup quote request. All of them are rejected when
//! the sender's email is banned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contact form submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSubmission {
    /// Unique identifier
    pub id: i64,
    /// Sender name
    pub name: String,
    /// Sender email
    pub email: String,
    /// Message body
    pub message: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A newsletter subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterSubscription {
    /// Unique identifier
    pub id: i64,
    /// Subscriber email (unique)
    pub email: String,
    /// Subscription timestamp
    pub subscribed_at: DateTime<Utc>,
}

/// A website-setup quote request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteSetupSubmission {
    /// Unique identifier
    pub id: i64,
    /// Requester name
    pub name: String,
    /// Requester email
    pub email: String,
    /// Company (optional)
    pub company: Option<String>,
    /// Kind of site wanted (e.g. "ecommerce", "portfolio")
    pub website_type: String,
    /// Budget range as free text (optional)
    pub budget: Option<String>,
    /// Additional details (optional)
    pub details: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
