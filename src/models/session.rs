//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated session.
///
/// The id is an opaque token handed to the client; it is presented either as
/// a bearer token or a cookie on subsequent requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session token
    pub id: String,
    /// Owning user
    pub user_id: i64,
    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check whether the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_expiry() {
        let live = Session {
            id: "tok".to_string(),
            user_id: 1,
            expires_at: Utc::now() + Duration::hours(1),
            created_at: Utc::now(),
        };
        assert!(!live.is_expired());

        let dead = Session {
            id: "tok".to_string(),
            user_id: 1,
            expires_at: Utc::now() - Duration::seconds(1),
            created_at: Utc::now(),
        };
        assert!(dead.is_expired());
    }
}
