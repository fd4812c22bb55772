//! Customer service
//!
//! CRM operations for agency staff plus the lookups the customer portal
//! needs. Customer emails are unique and stored lowercased.

use crate::db::repositories::CustomerRepository;
use crate::models::{
    CreateCustomerInput, Customer, CustomerServiceEntry, CustomerServiceStatus, CustomerStatus,
    ListParams, PagedResult, UpdateCustomerInput,
};
use chrono::Utc;
use std::sync::Arc;

/// Customer service errors
#[derive(Debug, thiserror::Error)]
pub enum CustomerServiceError {
    #[error("Customer not found")]
    NotFound,

    #[error("A customer with this email already exists")]
    EmailTaken,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Customer management service
pub struct CustomerService {
    customers: Arc<dyn CustomerRepository>,
}

impl CustomerService {
    /// Create a new customer service
    pub fn new(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }

    /// Create a customer record.
    pub async fn create_customer(
        &self,
        input: CreateCustomerInput,
    ) -> Result<Customer, CustomerServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CustomerServiceError::Validation("Name is required".into()));
        }
        let email = normalize_email(&input.email)?;

        if self.customers.get_by_email(&email).await?.is_some() {
            return Err(CustomerServiceError::EmailTaken);
        }

        let now = Utc::now();
        let customer = Customer {
            id: 0,
            name,
            email,
            company: input.company,
            phone: input.phone,
            notes: input.notes,
            user_id: None,
            status: CustomerStatus::default(),
            created_at: now,
            updated_at: now,
        };

        let created = self.customers.create(&customer).await?;
        tracing::info!(customer_id = created.id, "Created customer");
        Ok(created)
    }

    /// Update a customer record.
    pub async fn update_customer(
        &self,
        id: i64,
        input: UpdateCustomerInput,
    ) -> Result<Customer, CustomerServiceError> {
        let mut customer = self
            .customers
            .get_by_id(id)
            .await?
            .ok_or(CustomerServiceError::NotFound)?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CustomerServiceError::Validation("Name is required".into()));
            }
            customer.name = name;
        }
        if let Some(email) = input.email {
            let email = normalize_email(&email)?;
            if email != customer.email {
                if self.customers.get_by_email(&email).await?.is_some() {
                    return Err(CustomerServiceError::EmailTaken);
                }
                customer.email = email;
            }
        }
        if let Some(company) = input.company {
            customer.company = Some(company);
        }
        if let Some(phone) = input.phone {
            customer.phone = Some(phone);
        }
        if let Some(notes) = input.notes {
            customer.notes = Some(notes);
        }
        if let Some(status) = input.status {
            customer.status = status;
        }
        if let Some(user_id) = input.user_id {
            customer.user_id = Some(user_id);
        }
        customer.updated_at = Utc::now();

        self.customers.update(&customer).await?;
        Ok(customer)
    }

    /// Delete a customer and everything attached to them.
    pub async fn delete_customer(&self, id: i64) -> Result<(), CustomerServiceError> {
        if self.customers.get_by_id(id).await?.is_none() {
            return Err(CustomerServiceError::NotFound);
        }
        self.customers.delete(id).await?;
        tracing::info!(customer_id = id, "Deleted customer");
        Ok(())
    }

    /// Get a customer by id.
    pub async fn get_customer(&self, id: i64) -> Result<Customer, CustomerServiceError> {
        self.customers
            .get_by_id(id)
            .await?
            .ok_or(CustomerServiceError::NotFound)
    }

    /// Get the customer record linked to a portal user, if any.
    pub async fn get_by_user_id(
        &self,
        user_id: i64,
    ) -> Result<Option<Customer>, CustomerServiceError> {
        Ok(self.customers.get_by_user_id(user_id).await?)
    }

    /// List customers (paginated).
    pub async fn list_customers(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<Customer>, CustomerServiceError> {
        Ok(self.customers.list(params).await?)
    }

    /// Provision a service for a customer.
    pub async fn add_service(
        &self,
        customer_id: i64,
        name: String,
        description: Option<String>,
        monthly_price_cents: i64,
    ) -> Result<CustomerServiceEntry, CustomerServiceError> {
        if self.customers.get_by_id(customer_id).await?.is_none() {
            return Err(CustomerServiceError::NotFound);
        }
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(CustomerServiceError::Validation(
                "Service name is required".into(),
            ));
        }
        if monthly_price_cents < 0 {
            return Err(CustomerServiceError::Validation(
                "Price cannot be negative".into(),
            ));
        }

        let now = Utc::now();
        let entry = CustomerServiceEntry {
            id: 0,
            customer_id,
            name,
            description,
            monthly_price_cents,
            status: CustomerServiceStatus::Active,
            created_at: now,
            updated_at: now,
        };
        Ok(self.customers.add_service(&entry).await?)
    }

    /// List the services provisioned for a customer.
    pub async fn list_services(
        &self,
        customer_id: i64,
    ) -> Result<Vec<CustomerServiceEntry>, CustomerServiceError> {
        if self.customers.get_by_id(customer_id).await?.is_none() {
            return Err(CustomerServiceError::NotFound);
        }
        Ok(self.customers.list_services(customer_id).await?)
    }

    /// Pause a provisioned service; it can be resumed later.
    pub async fn pause_service(
        &self,
        customer_id: i64,
        service_id: i64,
    ) -> Result<CustomerServiceEntry, CustomerServiceError> {
        self.set_service_status(customer_id, service_id, CustomerServiceStatus::Paused)
            .await
    }

    /// Resume a paused service.
    pub async fn resume_service(
        &self,
        customer_id: i64,
        service_id: i64,
    ) -> Result<CustomerServiceEntry, CustomerServiceError> {
        self.set_service_status(customer_id, service_id, CustomerServiceStatus::Active)
            .await
    }

    /// Cancel a provisioned service.
    pub async fn cancel_service(
        &self,
        customer_id: i64,
        service_id: i64,
    ) -> Result<CustomerServiceEntry, CustomerServiceError> {
        self.set_service_status(customer_id, service_id, CustomerServiceStatus::Cancelled)
            .await
    }

    async fn set_service_status(
        &self,
        customer_id: i64,
        service_id: i64,
        status: CustomerServiceStatus,
    ) -> Result<CustomerServiceEntry, CustomerServiceError> {
        let mut entry = self
            .customers
            .list_services(customer_id)
            .await?
            .into_iter()
            .find(|s| s.id == service_id)
            .ok_or(CustomerServiceError::NotFound)?;

        entry.status = status;
        entry.updated_at = Utc::now();
        self.customers.update_service(&entry).await?;
        Ok(entry)
    }

    /// Remove a provisioned service entirely.
    pub async fn delete_service(
        &self,
        customer_id: i64,
        service_id: i64,
    ) -> Result<(), CustomerServiceError> {
        let exists = self
            .customers
            .list_services(customer_id)
            .await?
            .iter()
            .any(|s| s.id == service_id);
        if !exists {
            return Err(CustomerServiceError::NotFound);
        }
        self.customers.delete_service(service_id).await?;
        Ok(())
    }
}

fn normalize_email(email: &str) -> Result<String, CustomerServiceError> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') || email.len() > 255 {
        return Err(CustomerServiceError::Validation(
            "A valid email address is required".into(),
        ));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxCustomerRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> CustomerService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        CustomerService::new(SqlxCustomerRepository::boxed(pool))
    }

    fn input(name: &str, email: &str) -> CreateCustomerInput {
        CreateCustomerInput {
            name: name.to_string(),
            email: email.to_string(),
            company: None,
            phone: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_email() {
        let service = setup().await;
        let customer = service
            .create_customer(input("Acme", "  Sales@Acme.TEST "))
            .await
            .unwrap();
        assert_eq!(customer.email, "sales@acme.test");
        assert_eq!(customer.status, CustomerStatus::Lead);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let service = setup().await;
        service.create_customer(input("A", "dup@acme.test")).await.unwrap();

        let result = service.create_customer(input("B", "DUP@acme.test")).await;
        assert!(matches!(result, Err(CustomerServiceError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_update_status_and_link_user() {
        let service = setup().await;
        let customer = service.create_customer(input("Acme", "a@acme.test")).await.unwrap();

        let updated = service
            .update_customer(
                customer.id,
                UpdateCustomerInput {
                    status: Some(CustomerStatus::Active),
                    user_id: None,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, CustomerStatus::Active);
    }

    #[tokio::test]
    async fn test_service_lifecycle() {
        let service = setup().await;
        let customer = service.create_customer(input("Acme", "a@acme.test")).await.unwrap();

        let entry = service
            .add_service(customer.id, "Hosting".to_string(), None, 2500)
            .await
            .unwrap();
        assert_eq!(entry.status, CustomerServiceStatus::Active);

        let paused = service.pause_service(customer.id, entry.id).await.unwrap();
        assert_eq!(paused.status, CustomerServiceStatus::Paused);

        let resumed = service.resume_service(customer.id, entry.id).await.unwrap();
        assert_eq!(resumed.status, CustomerServiceStatus::Active);

        let cancelled = service.cancel_service(customer.id, entry.id).await.unwrap();
        assert_eq!(cancelled.status, CustomerServiceStatus::Cancelled);

        service.delete_service(customer.id, entry.id).await.unwrap();
        assert!(service.list_services(customer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let service = setup().await;
        let customer = service.create_customer(input("Acme", "a@acme.test")).await.unwrap();

        let result = service
            .add_service(customer.id, "Hosting".to_string(), None, -1)
            .await;
        assert!(matches!(result, Err(CustomerServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_customer() {
        let service = setup().await;
        assert!(matches!(
            service.get_customer(999).await,
            Err(CustomerServiceError::NotFound)
        ));
        assert!(matches!(
            service.list_services(999).await,
            Err(CustomerServiceError::NotFound)
        ));
    }
}
