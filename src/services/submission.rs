//! Submission service
//!
//! Handles the three public forms: contact, newsletter signup, and the
//! website-setup quote request. Senders with banned emails are turned away
//! before anything is stored. Discord pings and the setup notification email
//! are best-effort side effects.

use crate::db::repositories::{BannedEmailRepository, SubmissionRepository};
use crate::models::{ContactSubmission, NewsletterSubscription, WebsiteSetupSubmission};
use crate::services::discord::DiscordNotifier;
use crate::services::email::EmailService;
use chrono::Utc;
use std::sync::Arc;

/// Submission service errors
#[derive(Debug, thiserror::Error)]
pub enum SubmissionServiceError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Contact form input
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Website-setup form input
#[derive(Debug, Clone, serde::Deserialize)]
pub struct WebsiteSetupInput {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub website_type: String,
    pub budget: Option<String>,
    pub details: Option<String>,
}

/// Public form submission service
pub struct SubmissionService {
    submissions: Arc<dyn SubmissionRepository>,
    banned_emails: Arc<dyn BannedEmailRepository>,
    discord: Arc<DiscordNotifier>,
    email: Arc<EmailService>,
}

impl SubmissionService {
    /// Create a new submission service
    pub fn new(
        submissions: Arc<dyn SubmissionRepository>,
        banned_emails: Arc<dyn BannedEmailRepository>,
        discord: Arc<DiscordNotifier>,
        email: Arc<EmailService>,
    ) -> Self {
        Self {
            submissions,
            banned_emails,
            discord,
            email,
        }
    }

    /// Handle a contact form submission.
    pub async fn submit_contact(
        &self,
        input: ContactInput,
    ) -> Result<ContactSubmission, SubmissionServiceError> {
        let name = required(&input.name, "Name")?;
        let email = self.checked_email(&input.email).await?;
        let message = required(&input.message, "Message")?;
        if message.len() > 10_000 {
            return Err(SubmissionServiceError::Validation(
                "Message is too long".into(),
            ));
        }

        let submission = ContactSubmission {
            id: 0,
            name,
            email,
            message,
            created_at: Utc::now(),
        };
        let created = self.submissions.create_contact(&submission).await?;
        tracing::info!(submission_id = created.id, "Contact form submitted");

        self.discord
            .send_embed(
                "New contact message",
                &[
                    ("From", format!("{} <{}>", created.name, created.email)),
                    ("Message", excerpt(&created.message)),
                ],
            )
            .await;

        Ok(created)
    }

    /// Subscribe an email to the newsletter. Returns false when the address
    /// was already subscribed.
    pub async fn subscribe_newsletter(&self, email: &str) -> Result<bool, SubmissionServiceError> {
        let email = self.checked_email(email).await?;
        let added = self.submissions.subscribe_newsletter(&email).await?;
        if added {
            tracing::info!("New newsletter subscription");
        }
        Ok(added)
    }

    /// Remove an email from the newsletter.
    pub async fn unsubscribe_newsletter(&self, email: &str) -> Result<(), SubmissionServiceError> {
        let email = normalize_email(email)?;
        Ok(self.submissions.unsubscribe_newsletter(&email).await?)
    }

    /// Handle a website-setup quote request.
    ///
    /// Returns the stored submission and whether the confirmation email to
    /// the submitter went out. Email failure never fails the submission.
    pub async fn submit_website_setup(
        &self,
        input: WebsiteSetupInput,
    ) -> Result<(WebsiteSetupSubmission, bool), SubmissionServiceError> {
        let name = required(&input.name, "Name")?;
        let email = self.checked_email(&input.email).await?;
        let website_type = required(&input.website_type, "Website type")?;

        let submission = WebsiteSetupSubmission {
            id: 0,
            name,
            email,
            company: input.company,
            website_type,
            budget: input.budget,
            details: input.details,
            created_at: Utc::now(),
        };
        let created = self.submissions.create_website_setup(&submission).await?;
        tracing::info!(submission_id = created.id, "Website setup request submitted");

        self.discord
            .send_embed(
                "New website setup request",
                &[
                    ("From", format!("{} <{}>", created.name, created.email)),
                    ("Type", created.website_type.clone()),
                    (
                        "Budget",
                        created.budget.clone().unwrap_or_else(|| "-".to_string()),
                    ),
                ],
            )
            .await;
        let email_sent = self.email.send_website_setup_confirmation(&created).await;
        self.email.notify_website_setup(&created).await;

        Ok((created, email_sent))
    }

    /// List contact submissions, newest first (staff).
    pub async fn list_contacts(&self) -> Result<Vec<ContactSubmission>, SubmissionServiceError> {
        Ok(self.submissions.list_contacts().await?)
    }

    /// Delete a contact submission (staff).
    pub async fn delete_contact(&self, id: i64) -> Result<(), SubmissionServiceError> {
        Ok(self.submissions.delete_contact(id).await?)
    }

    /// List newsletter subscriptions (staff).
    pub async fn list_subscriptions(
        &self,
    ) -> Result<Vec<NewsletterSubscription>, SubmissionServiceError> {
        Ok(self.submissions.list_subscriptions().await?)
    }

    /// List website-setup requests, newest first (staff).
    pub async fn list_website_setups(
        &self,
    ) -> Result<Vec<WebsiteSetupSubmission>, SubmissionServiceError> {
        Ok(self.submissions.list_website_setups().await?)
    }

    /// Delete a website-setup request (staff).
    pub async fn delete_website_setup(&self, id: i64) -> Result<(), SubmissionServiceError> {
        Ok(self.submissions.delete_website_setup(id).await?)
    }

    async fn checked_email(&self, email: &str) -> Result<String, SubmissionServiceError> {
        let email = normalize_email(email)?;
        if self.banned_emails.is_banned(&email).await? {
            // Deliberately the same wording as a validation failure so the
            // form does not reveal that the address is banned
            return Err(SubmissionServiceError::Validation(
                "A valid email address is required".into(),
            ));
        }
        Ok(email)
    }
}

fn required(value: &str, field: &str) -> Result<String, SubmissionServiceError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(SubmissionServiceError::Validation(format!(
            "{} is required",
            field
        )));
    }
    Ok(value)
}

fn normalize_email(email: &str) -> Result<String, SubmissionServiceError> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') || email.len() > 255 {
        return Err(SubmissionServiceError::Validation(
            "A valid email address is required".into(),
        ));
    }
    Ok(email)
}

fn excerpt(message: &str) -> String {
    const MAX: usize = 200;
    if message.len() <= MAX {
        return message.to_string();
    }
    let mut end = MAX;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &message[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxBannedEmailRepository, SqlxSettingsRepository, SqlxSubmissionRepository,
    };
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (SubmissionService, Arc<dyn BannedEmailRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let banned = SqlxBannedEmailRepository::boxed(pool.clone());
        let email = Arc::new(EmailService::new(SqlxSettingsRepository::boxed(pool.clone())));
        let service = SubmissionService::new(
            SqlxSubmissionRepository::boxed(pool),
            banned.clone(),
            Arc::new(DiscordNotifier::new(None)),
            email,
        );
        (service, banned)
    }

    #[tokio::test]
    async fn test_contact_submission() {
        let (service, _) = setup().await;

        let created = service
            .submit_contact(ContactInput {
                name: " Jo ".to_string(),
                email: "JO@Example.test".to_string(),
                message: "Hi there".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(created.name, "Jo");
        assert_eq!(created.email, "jo@example.test");
        assert_eq!(service.list_contacts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_banned_email_rejected_without_leaking() {
        let (service, banned) = setup().await;
        banned.ban("spam@example.test", None).await.unwrap();

        let result = service
            .submit_contact(ContactInput {
                name: "Spammer".to_string(),
                email: "SPAM@example.test".to_string(),
                message: "Buy now".to_string(),
            })
            .await;

        match result {
            Err(SubmissionServiceError::Validation(msg)) => {
                assert!(!msg.to_lowercase().contains("ban"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|s| s.id)),
        }
        assert!(service.list_contacts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newsletter_dedups() {
        let (service, _) = setup().await;

        assert!(service.subscribe_newsletter("reader@example.test").await.unwrap());
        assert!(!service.subscribe_newsletter("Reader@Example.test").await.unwrap());
        assert_eq!(service.list_subscriptions().await.unwrap().len(), 1);

        service.unsubscribe_newsletter("reader@example.test").await.unwrap();
        assert!(service.list_subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_website_setup_submission() {
        let (service, _) = setup().await;

        let (created, email_sent) = service
            .submit_website_setup(WebsiteSetupInput {
                name: "Sam".to_string(),
                email: "sam@example.test".to_string(),
                company: Some("Acme".to_string()),
                website_type: "ecommerce".to_string(),
                budget: Some("5-10k".to_string()),
                details: None,
            })
            .await
            .unwrap();

        assert_eq!(created.website_type, "ecommerce");
        // SMTP is unconfigured in tests
        assert!(!email_sent);
        assert_eq!(service.list_website_setups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let (service, _) = setup().await;
        let result = service.subscribe_newsletter("not-an-email").await;
        assert!(matches!(result, Err(SubmissionServiceError::Validation(_))));
    }
}
