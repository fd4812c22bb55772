//! Banned email model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An email address blocked from public forms and checkout.
///
/// Addresses are stored lowercased; lookups lowercase the candidate first so
/// the ban is case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannedEmail {
    /// Unique identifier
    pub id: i64,
    /// Banned address (lowercase, unique)
    pub email: String,
    /// Why it was banned (optional)
    pub reason: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
