//! Work request model
//!
//! Work requests are filed by portal customers and reviewed by staff. The
//! status machine is strict: pending requests can be approved or declined,
//! approved requests can be completed, and nothing else moves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A customer work request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRequest {
    /// Unique identifier
    pub id: i64,
    /// Requesting customer
    pub customer_id: i64,
    /// Short title
    pub title: String,
    /// Full description of the requested work
    pub details: String,
    /// Customer-set priority
    pub priority: WorkRequestPriority,
    /// Current status
    pub status: WorkRequestStatus,
    /// Note from staff, set on approve/decline/complete
    pub admin_note: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Work request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkRequestStatus {
    /// Awaiting staff review
    Pending,
    /// Accepted, work in progress
    Approved,
    /// Rejected by staff
    Declined,
    /// Work finished
    Completed,
}

impl WorkRequestStatus {
    /// Whether a transition from `self` to `next` is allowed.
    ///
    /// Pending -> Approved | Declined; Approved -> Completed. Declined and
    /// Completed are terminal.
    pub fn can_transition(self, next: WorkRequestStatus) -> bool {
        matches!(
            (self, next),
            (WorkRequestStatus::Pending, WorkRequestStatus::Approved)
                | (WorkRequestStatus::Pending, WorkRequestStatus::Declined)
                | (WorkRequestStatus::Approved, WorkRequestStatus::Completed)
        )
    }

    /// Whether this status is terminal
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkRequestStatus::Declined | WorkRequestStatus::Completed
        )
    }
}

impl Default for WorkRequestStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for WorkRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkRequestStatus::Pending => write!(f, "pending"),
            WorkRequestStatus::Approved => write!(f, "approved"),
            WorkRequestStatus::Declined => write!(f, "declined"),
            WorkRequestStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for WorkRequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(WorkRequestStatus::Pending),
            "approved" => Ok(WorkRequestStatus::Approved),
            "declined" => Ok(WorkRequestStatus::Declined),
            "completed" => Ok(WorkRequestStatus::Completed),
            _ => Err(anyhow::anyhow!("Invalid work request status: {}", s)),
        }
    }
}

/// Customer-facing priority hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkRequestPriority {
    /// Not time-sensitive
    Low,
    /// Default priority
    Normal,
    /// Time-sensitive
    High,
}

impl Default for WorkRequestPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for WorkRequestPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkRequestPriority::Low => write!(f, "low"),
            WorkRequestPriority::Normal => write!(f, "normal"),
            WorkRequestPriority::High => write!(f, "high"),
        }
    }
}

impl FromStr for WorkRequestPriority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(WorkRequestPriority::Low),
            "normal" => Ok(WorkRequestPriority::Normal),
            "high" => Ok(WorkRequestPriority::High),
            _ => Err(anyhow::anyhow!("Invalid work request priority: {}", s)),
        }
    }
}

/// Input for filing a work request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkRequestInput {
    /// Short title
    pub title: String,
    /// Full description
    pub details: String,
    /// Priority (optional, defaults to Normal)
    pub priority: Option<WorkRequestPriority>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use WorkRequestStatus::*;

        assert!(Pending.can_transition(Approved));
        assert!(Pending.can_transition(Declined));
        assert!(Approved.can_transition(Completed));
    }

    #[test]
    fn test_forbidden_transitions() {
        use WorkRequestStatus::*;

        assert!(!Pending.can_transition(Completed));
        assert!(!Pending.can_transition(Pending));
        assert!(!Approved.can_transition(Declined));
        assert!(!Approved.can_transition(Pending));
        assert!(!Declined.can_transition(Approved));
        assert!(!Completed.can_transition(Pending));
    }

    #[test]
    fn test_terminal_states() {
        assert!(WorkRequestStatus::Declined.is_terminal());
        assert!(WorkRequestStatus::Completed.is_terminal());
        assert!(!WorkRequestStatus::Pending.is_terminal());
        assert!(!WorkRequestStatus::Approved.is_terminal());
    }

    #[test]
    fn test_status_roundtrip() {
        assert_eq!(
            WorkRequestStatus::from_str("approved").unwrap(),
            WorkRequestStatus::Approved
        );
        assert_eq!(WorkRequestStatus::Completed.to_string(), "completed");
        assert!(WorkRequestStatus::from_str("cancelled").is_err());
    }

    #[test]
    fn test_priority_roundtrip() {
        assert_eq!(
            WorkRequestPriority::from_str("HIGH").unwrap(),
            WorkRequestPriority::High
        );
        assert_eq!(WorkRequestPriority::default(), WorkRequestPriority::Normal);
        assert!(WorkRequestPriority::from_str("urgent").is_err());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn status_strategy() -> impl Strategy<Value = WorkRequestStatus> {
        prop_oneof![
            Just(WorkRequestStatus::Pending),
            Just(WorkRequestStatus::Approved),
            Just(WorkRequestStatus::Declined),
            Just(WorkRequestStatus::Completed),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn terminal_states_have_no_outgoing_transitions(
            from in status_strategy(),
            to in status_strategy(),
        ) {
            if from.is_terminal() {
                prop_assert!(!from.can_transition(to));
            }
        }

        #[test]
        fn no_transition_returns_to_pending(from in status_strategy()) {
            prop_assert!(!from.can_transition(WorkRequestStatus::Pending));
        }

        #[test]
        fn no_status_transitions_to_itself(status in status_strategy()) {
            prop_assert!(!status.can_transition(status));
        }

        #[test]
        fn status_display_parses_back(status in status_strategy()) {
            let parsed = WorkRequestStatus::from_str(&status.to_string()).unwrap();
            prop_assert_eq!(parsed, status);
        }
    }
}
