//! Work request service
//!
//! Portal customers file requests; staff move them through the status
//! machine. Every transition is validated here before it touches the
//! database, and new requests ping the staff Discord channel.

use crate::db::repositories::WorkRequestRepository;
use crate::models::{
    CreateWorkRequestInput, ListParams, PagedResult, WorkRequest, WorkRequestStatus,
};
use crate::services::discord::DiscordNotifier;
use chrono::Utc;
use std::sync::Arc;

/// Work request service errors
#[derive(Debug, thiserror::Error)]
pub enum WorkRequestServiceError {
    #[error("Work request not found")]
    NotFound,

    #[error("Cannot move a {from} request to {to}")]
    InvalidTransition {
        from: WorkRequestStatus,
        to: WorkRequestStatus,
    },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Work request management service
pub struct WorkRequestService {
    requests: Arc<dyn WorkRequestRepository>,
    discord: Arc<DiscordNotifier>,
}

impl WorkRequestService {
    /// Create a new work request service
    pub fn new(requests: Arc<dyn WorkRequestRepository>, discord: Arc<DiscordNotifier>) -> Self {
        Self { requests, discord }
    }

    /// File a new request for a customer. Starts in Pending.
    pub async fn create_request(
        &self,
        customer_id: i64,
        input: CreateWorkRequestInput,
    ) -> Result<WorkRequest, WorkRequestServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(WorkRequestServiceError::Validation(
                "Title is required".into(),
            ));
        }
        if input.details.trim().is_empty() {
            return Err(WorkRequestServiceError::Validation(
                "Details are required".into(),
            ));
        }

        let now = Utc::now();
        let request = WorkRequest {
            id: 0,
            customer_id,
            title,
            details: input.details,
            priority: input.priority.unwrap_or_default(),
            status: WorkRequestStatus::Pending,
            admin_note: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.requests.create(&request).await?;
        tracing::info!(request_id = created.id, customer_id, "New work request filed");

        self.discord
            .send_embed(
                "New work request",
                &[
                    ("Request", format!("#{} {}", created.id, created.title)),
                    ("Priority", created.priority.to_string()),
                ],
            )
            .await;

        Ok(created)
    }

    /// Get a request by id.
    pub async fn get_request(&self, id: i64) -> Result<WorkRequest, WorkRequestServiceError> {
        self.requests
            .get_by_id(id)
            .await?
            .ok_or(WorkRequestServiceError::NotFound)
    }

    /// List a customer's own requests, newest first.
    pub async fn list_for_customer(
        &self,
        customer_id: i64,
    ) -> Result<Vec<WorkRequest>, WorkRequestServiceError> {
        Ok(self.requests.list_by_customer(customer_id).await?)
    }

    /// List all requests, optionally filtered by status (staff).
    pub async fn list_requests(
        &self,
        status: Option<WorkRequestStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<WorkRequest>, WorkRequestServiceError> {
        Ok(self.requests.list(status, params).await?)
    }

    /// Approve a pending request.
    pub async fn approve(
        &self,
        id: i64,
        admin_note: Option<String>,
    ) -> Result<WorkRequest, WorkRequestServiceError> {
        self.transition(id, WorkRequestStatus::Approved, admin_note)
            .await
    }

    /// Decline a pending request.
    pub async fn decline(
        &self,
        id: i64,
        admin_note: Option<String>,
    ) -> Result<WorkRequest, WorkRequestServiceError> {
        self.transition(id, WorkRequestStatus::Declined, admin_note)
            .await
    }

    /// Mark an approved request as completed.
    pub async fn complete(
        &self,
        id: i64,
        admin_note: Option<String>,
    ) -> Result<WorkRequest, WorkRequestServiceError> {
        self.transition(id, WorkRequestStatus::Completed, admin_note)
            .await
    }

    async fn transition(
        &self,
        id: i64,
        to: WorkRequestStatus,
        admin_note: Option<String>,
    ) -> Result<WorkRequest, WorkRequestServiceError> {
        let request = self
            .requests
            .get_by_id(id)
            .await?
            .ok_or(WorkRequestServiceError::NotFound)?;

        if !request.status.can_transition(to) {
            return Err(WorkRequestServiceError::InvalidTransition {
                from: request.status,
                to,
            });
        }

        self.requests
            .update_status(id, to, admin_note.as_deref())
            .await?;
        tracing::info!(request_id = id, from = %request.status, to = %to, "Work request transitioned");

        self.requests
            .get_by_id(id)
            .await?
            .ok_or(WorkRequestServiceError::NotFound)
    }

    /// Count requests awaiting review.
    pub async fn count_pending(&self) -> Result<i64, WorkRequestServiceError> {
        Ok(self
            .requests
            .count_by_status(WorkRequestStatus::Pending)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{CustomerRepository, SqlxCustomerRepository, SqlxWorkRequestRepository};
    use crate::models::{Customer, CustomerStatus};

    async fn setup() -> (WorkRequestService, i64) {
        let pool = crate::db::create_test_pool()
            .await
            .expect("Failed to create test pool");
        crate::db::migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let customers = SqlxCustomerRepository::boxed(pool.clone());
        let now = Utc::now();
        let customer = customers
            .create(&Customer {
                id: 0,
                name: "Acme".to_string(),
                email: "acme@example.test".to_string(),
                company: None,
                phone: None,
                notes: None,
                user_id: None,
                status: CustomerStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let service = WorkRequestService::new(
            SqlxWorkRequestRepository::boxed(pool),
            Arc::new(DiscordNotifier::new(None)),
        );
        (service, customer.id)
    }

    fn input(title: &str) -> CreateWorkRequestInput {
        CreateWorkRequestInput {
            title: title.to_string(),
            details: "Please do the thing.".to_string(),
            priority: None,
        }
    }

    #[tokio::test]
    async fn test_new_request_is_pending() {
        let (service, customer_id) = setup().await;
        let request = service.create_request(customer_id, input("Fix header")).await.unwrap();

        assert_eq!(request.status, WorkRequestStatus::Pending);
        assert!(request.admin_note.is_none());
    }

    #[tokio::test]
    async fn test_approve_then_complete() {
        let (service, customer_id) = setup().await;
        let request = service.create_request(customer_id, input("Fix header")).await.unwrap();

        let approved = service
            .approve(request.id, Some("Scheduled for Monday".to_string()))
            .await
            .unwrap();
        assert_eq!(approved.status, WorkRequestStatus::Approved);
        assert_eq!(approved.admin_note.as_deref(), Some("Scheduled for Monday"));

        let completed = service.complete(request.id, None).await.unwrap();
        assert_eq!(completed.status, WorkRequestStatus::Completed);
        // Note survives a transition that passes None
        assert_eq!(completed.admin_note.as_deref(), Some("Scheduled for Monday"));
    }

    #[tokio::test]
    async fn test_cannot_complete_pending() {
        let (service, customer_id) = setup().await;
        let request = service.create_request(customer_id, input("Fix header")).await.unwrap();

        let result = service.complete(request.id, None).await;
        assert!(matches!(
            result,
            Err(WorkRequestServiceError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_declined_is_terminal() {
        let (service, customer_id) = setup().await;
        let request = service.create_request(customer_id, input("Fix header")).await.unwrap();

        service.decline(request.id, Some("Out of scope".to_string())).await.unwrap();

        assert!(service.approve(request.id, None).await.is_err());
        assert!(service.complete(request.id, None).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let (service, customer_id) = setup().await;
        let result = service.create_request(customer_id, input("  ")).await;
        assert!(matches!(result, Err(WorkRequestServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_count_pending() {
        let (service, customer_id) = setup().await;
        service.create_request(customer_id, input("One")).await.unwrap();
        let two = service.create_request(customer_id, input("Two")).await.unwrap();
        service.approve(two.id, None).await.unwrap();

        assert_eq!(service.count_pending().await.unwrap(), 1);
    }
}
